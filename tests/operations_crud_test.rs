mod common;

use std::str::FromStr;

use axum::http::{Method, StatusCode};
use common::TestApp;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        other => Decimal::from_str(&other.to_string()).expect("decimal number"),
    }
}

#[tokio::test]
async fn milestones_and_tasks_follow_batches() {
    let app = TestApp::new().await;
    let batch_id = app.create_batch("B-PLAN").await["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/milestones",
            Some(json!({
                "title": "First flush",
                "batchId": batch_id,
                "dueDate": "2024-07-01"
            })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "planned");
    let milestone_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/tasks",
            Some(json!({
                "title": "Mist room A",
                "milestoneId": milestone_id,
                "batchId": batch_id,
                "assignedTo": "WRK-1",
                "priority": "high"
            })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "todo");
    let task_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/tasks/{task_id}"),
            Some(json!({ "status": "done" })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["completedAt"].is_string());

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/tasks?milestoneId={milestone_id}&status=done"),
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(body["data"]["total"], 1);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/milestones/{milestone_id}"),
            None,
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .call(Method::GET, &format!("/api/tasks/{task_id}"), None, &app.worker_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["milestoneId"].is_null());
}

#[tokio::test]
async fn milestone_for_unknown_batch_is_not_found() {
    let app = TestApp::new().await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/milestones",
            Some(json!({ "title": "Ghost", "batchId": uuid::Uuid::new_v4() })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn finance_summary_nets_income_and_expense() {
    let app = TestApp::new().await;

    for (kind, category, amount) in [
        ("income", "mushroom sales", "1500.00"),
        ("income", "mushroom sales", "250.50"),
        ("expense", "substrate", "400.25"),
    ] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/financial-transactions",
                Some(json!({
                    "transactionType": kind,
                    "category": category,
                    "amount": amount,
                    "transactionDate": "2024-06-01"
                })),
                &app.manager_token,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = app
        .call(
            Method::GET,
            "/api/financial-transactions/summary",
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let summary = &body["data"];
    assert_eq!(decimal(&summary["totalIncome"]), dec!(1750.50));
    assert_eq!(decimal(&summary["totalExpense"]), dec!(400.25));
    assert_eq!(decimal(&summary["net"]), dec!(1350.25));
    assert_eq!(summary["transactionCount"], 3);
    assert_eq!(summary["byCategory"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn workers_cannot_write_finance() {
    let app = TestApp::new().await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/financial-transactions",
            Some(json!({ "transactionType": "expense", "category": "fuel", "amount": "10" })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let app = TestApp::new().await;
    let (status, _) = app
        .call(
            Method::POST,
            "/api/financial-transactions",
            Some(json!({ "transactionType": "expense", "category": "fuel", "amount": "0" })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn create_employee(app: &TestApp, employee_id: &str) -> String {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/employees",
            Some(json!({
                "employeeId": employee_id,
                "firstName": "Kofi",
                "lastName": "Mensah",
                "position": "Grower",
                "hourlyRate": "12.50",
                "hireDate": "2024-01-15"
            })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn attendance_hours_and_summary() {
    let app = TestApp::new().await;
    let employee = create_employee(&app, "EMP-100").await;

    for (date, status, check_in, check_out) in [
        ("2024-06-03", "present", Some("08:00"), Some("16:30")),
        ("2024-06-04", "late", Some("09:15"), Some("17:00")),
        ("2024-06-05", "absent", None, None),
    ] {
        let (code, body) = app
            .call(
                Method::POST,
                "/api/attendance",
                Some(json!({
                    "employeeId": employee,
                    "date": date,
                    "status": status,
                    "checkInTime": check_in,
                    "checkOutTime": check_out
                })),
                &app.manager_token,
            )
            .await;
        assert_eq!(code, StatusCode::CREATED, "{body}");
    }

    let (status, _) = app
        .call(
            Method::POST,
            "/api/attendance",
            Some(json!({ "employeeId": employee, "date": "2024-06-03", "status": "present" })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/employees/{employee}/attendance-summary"),
            None,
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let summary = &body["data"];
    assert_eq!(summary["presentDays"], 1);
    assert_eq!(summary["lateDays"], 1);
    assert_eq!(summary["absentDays"], 1);
    assert_eq!(summary["totalHours"], 16.25);
}

#[tokio::test]
async fn check_out_before_check_in_is_rejected() {
    let app = TestApp::new().await;
    let employee = create_employee(&app, "EMP-101").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/attendance",
            Some(json!({
                "employeeId": employee,
                "status": "present",
                "checkInTime": "17:00",
                "checkOutTime": "08:00"
            })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payroll_computes_net_and_pays_once() {
    let app = TestApp::new().await;
    let employee = create_employee(&app, "EMP-102").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/payroll",
            Some(json!({
                "employeeId": employee,
                "periodStart": "2024-06-01",
                "periodEnd": "2024-06-30",
                "basePay": "2000",
                "overtimePay": "150.75",
                "deductions": "300.25"
            })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(decimal(&body["data"]["netPay"]), dec!(1850.50));
    assert_eq!(body["data"]["status"], "pending");
    let payroll_id = body["data"]["id"].as_str().unwrap().to_string();

    let pay_uri = format!("/api/payroll/{payroll_id}/pay");
    let (status, body) = app.call(Method::POST, &pay_uri, None, &app.manager_token).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "paid");

    let (status, _) = app.call(Method::POST, &pay_uri, None, &app.manager_token).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/payroll",
            Some(json!({
                "employeeId": employee,
                "periodStart": "2024-07-01",
                "periodEnd": "2024-07-31",
                "basePay": "100",
                "deductions": "500"
            })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_with_inline_customer_and_status_rules() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/products",
            Some(json!({ "sku": "oys-1kg", "name": "Oyster 1kg", "unitPrice": "8.40" })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["sku"], "OYS-1KG");
    let product_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(json!({
                "customer": { "name": "Green Grocer", "email": "buyer@grocer.test" },
                "productId": product_id,
                "quantity": "5"
            })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = &body["data"];
    assert_eq!(decimal(&order["totalAmount"]), dec!(42.00));
    assert_eq!(order["status"], "pending");
    assert!(order["orderNumber"].as_str().unwrap().starts_with("ORD-"));
    let order_id = order["id"].as_str().unwrap().to_string();
    let customer_id = order["customerId"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/customers/{customer_id}"),
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Green Grocer");

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/customers/{customer_id}"),
            None,
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let status_uri = format!("/api/orders/{order_id}/status");
    for next in ["confirmed", "delivered"] {
        let (status, body) = app
            .call(Method::PATCH, &status_uri, Some(json!({ "status": next })), &app.worker_token)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["status"], next);
    }

    let (status, _) = app
        .call(
            Method::PATCH,
            &status_uri,
            Some(json!({ "status": "cancelled" })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::GET, "/api/orders/summary", None, &app.worker_token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["orderCount"], 1);
    assert_eq!(decimal(&body["data"]["totalRevenue"]), dec!(42));
}

#[tokio::test]
async fn order_needs_exactly_one_customer_reference() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/orders",
            Some(json!({ "quantity": "1", "unitPrice": "3" })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dashboard_reflects_batches_and_logs() {
    let app = TestApp::new().await;
    let first = app.create_batch("B-DASH-1").await["id"].as_str().unwrap().to_string();
    app.create_batch("B-DASH-2").await;

    for (payload, target) in [
        (json!({}), "inoculation"),
        (json!({}), "incubation"),
        (json!({}), "fruiting"),
        (json!({}), "harvesting"),
        (json!({ "harvestedWeightKg": 20.5 }), "post_harvest"),
    ] {
        let (status, body) = app.submit_stage(&first, payload, target, &app.manager_token).await;
        assert_eq!(status, StatusCode::OK, "{target}: {body}");
    }
    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/production-batches/{first}"),
            Some(json!({ "contaminationRate": 12 })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .call(
            Method::POST,
            "/api/contamination-logs",
            Some(json!({ "batchId": first, "contaminationType": "Cobweb", "severity": "high" })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call(Method::GET, "/api/dashboard/stats", None, &app.worker_token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let stats = &body["data"];
    assert_eq!(stats["totalBatches"], 2);
    assert_eq!(stats["activeBatches"], 1);
    assert_eq!(stats["contaminatedBatches"], 1);
    assert_eq!(stats["pendingApprovals"], 1);
    assert_eq!(stats["highRiskBatches"], 1);
    assert_eq!(stats["batchesByStage"]["batch_creation"], 1);
    assert_eq!(stats["batchesByStage"]["post_harvest"], 1);
    assert_eq!(stats["totalHarvestedKg"], 20.5);
    assert_eq!(stats["unverifiedContaminationLogs"], 1);
}
