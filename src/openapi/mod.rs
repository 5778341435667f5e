use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FarmOps API",
        version = "1.0.0",
        description = r#"
# FarmOps Mushroom Farm API

Backend for a mushroom farm's day-to-day operations.

## Features

- **Production Batches**: Six-stage cultivation workflow from batch creation to post-harvest
- **Approval Gate**: Manager review of high-risk or contaminated batches before processing
- **Contamination Logs**: Incident recording and verification per batch
- **Planning**: Milestones and tasks tied to batches
- **Finance**: Income and expense ledger with summaries
- **HR**: Employees, attendance and payroll
- **Sales**: Customers, products and orders
- **Dashboard**: Production statistics

## Authentication

Everything under `/api` except the account endpoints requires a JWT:

```
Authorization: Bearer <your-jwt-token>
```

Tokens are issued by `POST /api/auth/login`.

## Error Handling

Errors share one envelope:

```json
{
  "error": "Bad Request",
  "message": "Validation failed",
  "requestId": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "production-batches", description = "Cultivation workflow and approval gate"),
        (name = "contamination-logs", description = "Contamination incidents"),
        (name = "planning", description = "Milestones and tasks"),
        (name = "finance", description = "Financial transactions"),
        (name = "hr", description = "Employees, attendance and payroll"),
        (name = "sales", description = "Customers, products and orders"),
        (name = "dashboard", description = "Production statistics"),
        (name = "auth", description = "Registration, login and password recovery"),
        (name = "users", description = "Account administration")
    ),
    paths(
        // Production batches
        crate::handlers::production_batches::list_batches,
        crate::handlers::production_batches::create_batch,
        crate::handlers::production_batches::get_batch,
        crate::handlers::production_batches::patch_batch,
        crate::handlers::production_batches::advance_supply_chain,
        crate::handlers::production_batches::pending_approval,
        crate::handlers::production_batches::approve_batch,
        crate::handlers::production_batches::reject_batch,
        crate::handlers::production_batches::delete_batch,

        // Contamination logs
        crate::handlers::contamination_logs::create_log,
        crate::handlers::contamination_logs::list_logs,
        crate::handlers::contamination_logs::get_log,
        crate::handlers::contamination_logs::verify_log,

        // Planning
        crate::handlers::planning::list_milestones,
        crate::handlers::planning::create_milestone,
        crate::handlers::planning::get_milestone,
        crate::handlers::planning::update_milestone,
        crate::handlers::planning::delete_milestone,
        crate::handlers::planning::list_tasks,
        crate::handlers::planning::create_task,
        crate::handlers::planning::get_task,
        crate::handlers::planning::update_task,
        crate::handlers::planning::delete_task,

        // Finance
        crate::handlers::finance::record_transaction,
        crate::handlers::finance::list_transactions,
        crate::handlers::finance::transaction_summary,
        crate::handlers::finance::get_transaction,
        crate::handlers::finance::delete_transaction,

        // HR
        crate::handlers::hr::create_employee,
        crate::handlers::hr::list_employees,
        crate::handlers::hr::get_employee,
        crate::handlers::hr::update_employee,
        crate::handlers::hr::delete_employee,
        crate::handlers::hr::attendance_summary,
        crate::handlers::hr::record_attendance,
        crate::handlers::hr::list_attendance,
        crate::handlers::hr::delete_attendance,
        crate::handlers::hr::create_payroll,
        crate::handlers::hr::list_payroll,
        crate::handlers::hr::get_payroll,
        crate::handlers::hr::mark_paid,

        // Sales
        crate::handlers::sales::create_customer,
        crate::handlers::sales::list_customers,
        crate::handlers::sales::get_customer,
        crate::handlers::sales::update_customer,
        crate::handlers::sales::delete_customer,
        crate::handlers::sales::create_product,
        crate::handlers::sales::list_products,
        crate::handlers::sales::get_product,
        crate::handlers::sales::update_product,
        crate::handlers::sales::delete_product,
        crate::handlers::sales::create_order,
        crate::handlers::sales::list_orders,
        crate::handlers::sales::sales_summary,
        crate::handlers::sales::get_order,
        crate::handlers::sales::update_order_status,
        crate::handlers::sales::delete_order,

        // Dashboard
        crate::handlers::dashboard::get_stats,

        // Accounts
        crate::handlers::auth::register,
        crate::handlers::auth::verify_email,
        crate::handlers::auth::login,
        crate::handlers::auth::forgot_password,
        crate::handlers::auth::reset_password,
        crate::handlers::auth::me,
        crate::handlers::users::list_users,
        crate::handlers::users::change_role,
    ),
    components(
        schemas(
            // Workflow types
            crate::workflow::stages::ProductionStage,
            crate::workflow::stages::SupplyChainStage,
            crate::workflow::payload::BatchCreationStage,
            crate::workflow::payload::InoculationStage,
            crate::workflow::payload::IncubationStage,
            crate::workflow::payload::FruitingStage,
            crate::workflow::payload::HarvestingStage,
            crate::workflow::payload::PostHarvestStage,
            crate::services::production_batches::BatchView,
            crate::services::production_batches::CreateBatchRequest,
            crate::services::production_batches::UpdateBatchRequest,
            crate::entities::production_batch::Model,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Registers the JWT bearer scheme referenced by every protected path.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_workflow_paths_and_bearer_scheme() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("FarmOps API"));
        assert!(json.contains("/api/production-batches/{id}/approve"));
        assert!(json.contains("/api/contamination-logs"));
        assert!(json.contains("\"Bearer\""));
    }
}
