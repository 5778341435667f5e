use chrono::{NaiveDate, Utc};
use metrics::counter;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::db::{with_transaction, DbPool};
use crate::entities::customer::{self, Entity as Customer};
use crate::entities::order::{self, Entity as Order, OrderStatus};
use crate::entities::product::{self, Entity as Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::finance::validate_positive_amount;
use crate::workflow::payload::lenient;
use crate::workflow::Actor;

fn validate_non_negative_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(ValidationError::new("price_must_not_be_negative"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 50))]
    pub customer_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 20))]
    pub unit: Option<String>,
    #[validate(custom = "validate_non_negative_price")]
    pub unit_price: Decimal,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_price")]
    pub unit_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_order_customer"))]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    /// Creates the customer in the same transaction as the order.
    #[serde(default)]
    #[validate]
    pub customer: Option<CustomerRequest>,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub batch_id: Option<Uuid>,
    #[validate(custom = "validate_positive_amount")]
    pub quantity: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_price")]
    pub unit_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub order_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn validate_order_customer(request: &CreateOrderRequest) -> Result<(), ValidationError> {
    match (&request.customer_id, &request.customer) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(ValidationError::new("exactly_one_of_customer_id_or_customer")),
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl OrderFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(status) = self.status {
            cond = cond.add(order::Column::Status.eq(status));
        }
        if let Some(customer_id) = self.customer_id {
            cond = cond.add(order::Column::CustomerId.eq(customer_id));
        }
        if let Some(from) = self.from {
            cond = cond.add(order::Column::OrderDate.gte(from));
        }
        if let Some(to) = self.to {
            cond = cond.add(order::Column::OrderDate.lte(to));
        }
        cond
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_revenue: Decimal,
    pub order_count: u64,
    pub average_order_value: Decimal,
    pub cancelled_count: u64,
    pub by_status: BTreeMap<String, u64>,
}

/// Revenue and averages skip cancelled orders; `by_status` counts every order.
pub fn summarize_orders(orders: &[order::Model]) -> SalesSummary {
    let mut total_revenue = Decimal::ZERO;
    let mut order_count = 0u64;
    let mut cancelled_count = 0u64;
    let mut by_status = BTreeMap::new();

    for o in orders {
        *by_status.entry(o.status.to_string()).or_insert(0) += 1;
        if o.status == OrderStatus::Cancelled {
            cancelled_count += 1;
            continue;
        }
        total_revenue += o.total_amount;
        order_count += 1;
    }

    let average_order_value = if order_count == 0 {
        Decimal::ZERO
    } else {
        (total_revenue / Decimal::from(order_count)).round_dp(2)
    };

    SalesSummary {
        total_revenue,
        order_count,
        average_order_value,
        cancelled_count,
        by_status,
    }
}

/// `ORD-YYYYMMDD-XXXXXX` with a random uppercase alphanumeric suffix.
pub fn generate_order_number(date: NaiveDate) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{}", date.format("%Y%m%d"), suffix)
}

/// Delivered and cancelled orders are final.
pub fn check_status_change(from: OrderStatus, to: OrderStatus) -> Result<(), ServiceError> {
    match from {
        OrderStatus::Delivered | OrderStatus::Cancelled if from != to => {
            Err(ServiceError::InvalidOperation(format!(
                "order is {} and can no longer change status",
                from
            )))
        }
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct SalesService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SalesService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    // Customers

    #[instrument(skip(self, request))]
    pub async fn create_customer(
        &self,
        request: CustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        Ok(customer_active_model(request).insert(&*self.db_pool).await?)
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        Customer::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let mut query = Customer::find();
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let term = term.trim().to_string();
            query = query.filter(
                Condition::any()
                    .add(customer::Column::Name.contains(&term))
                    .add(customer::Column::Email.contains(&term)),
            );
        }
        let paginator = query
            .order_by_asc(customer::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, request))]
    pub async fn update_customer(
        &self,
        id: Uuid,
        request: CustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        let mut active = self.get_customer(id).await?.into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.email = Set(request.email);
        active.phone = Set(request.phone);
        active.address = Set(request.address);
        active.customer_type = Set(request.customer_type);
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_customer(&self, id: Uuid) -> Result<(), ServiceError> {
        let has_orders = Order::find()
            .filter(order::Column::CustomerId.eq(id))
            .count(&*self.db_pool)
            .await?
            > 0;
        if has_orders {
            return Err(ServiceError::Conflict(format!(
                "Customer {} has orders and cannot be deleted",
                id
            )));
        }
        let result = Customer::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Customer {} not found", id)));
        }
        Ok(())
    }

    // Products

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let sku = request.sku.trim().to_uppercase();

        let taken = Product::find()
            .filter(product::Column::Sku.eq(sku.clone()))
            .one(&*self.db_pool)
            .await?
            .is_some();
        if taken {
            return Err(ServiceError::Conflict(format!("Product SKU {} already exists", sku)));
        }

        let model = product::ActiveModel {
            sku: Set(sku),
            name: Set(request.name.trim().to_string()),
            category: Set(request.category),
            unit: Set(request.unit.unwrap_or_else(|| "kg".to_string())),
            unit_price: Set(request.unit_price.round_dp(2)),
            stock_quantity: Set(request.stock_quantity.unwrap_or(0)),
            ..Default::default()
        };
        model
            .insert(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_db_write(e, "product SKU"))
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        active_only: bool,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut cond = Condition::all();
        if active_only {
            cond = cond.add(product::Column::IsActive.eq(true));
        }
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let term = term.trim().to_string();
            cond = cond.add(
                Condition::any()
                    .add(product::Column::Name.contains(&term))
                    .add(product::Column::Sku.contains(&term.to_uppercase())),
            );
        }
        let paginator = Product::find()
            .filter(cond)
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let mut active = self.get_product(id).await?.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if request.category.is_some() {
            active.category = Set(request.category);
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit);
        }
        if let Some(price) = request.unit_price {
            active.unit_price = Set(price.round_dp(2));
        }
        if let Some(qty) = request.stock_quantity {
            active.stock_quantity = Set(qty);
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Product::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }
        Ok(())
    }

    // Orders

    /// Creates an order, and its customer when one is given inline, in a
    /// single transaction.
    #[instrument(skip(self, request, actor))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: &Actor,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;

        let catalogue_price = match request.product_id {
            Some(product_id) => Some(self.get_product(product_id).await?.unit_price),
            None => None,
        };
        let unit_price = request.unit_price.or(catalogue_price).ok_or_else(|| {
            ServiceError::InvalidInput("unitPrice is required when no product is given".into())
        })?;
        if let Some(customer_id) = request.customer_id {
            self.get_customer(customer_id).await?;
        }

        let order_date = request.order_date.unwrap_or_else(|| Utc::now().date_naive());
        let quantity = request.quantity;
        let total_amount = (quantity * unit_price).round_dp(2);
        let created_by = actor.display_id();

        let created = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let customer_id = match (request.customer_id, request.customer) {
                    (Some(id), _) => id,
                    (None, Some(inline)) => customer_active_model(inline).insert(txn).await?.id,
                    (None, None) => {
                        return Err(ServiceError::InvalidInput(
                            "customerId or customer is required".into(),
                        ))
                    }
                };

                let model = order::ActiveModel {
                    order_number: Set(generate_order_number(order_date)),
                    customer_id: Set(customer_id),
                    product_id: Set(request.product_id),
                    batch_id: Set(request.batch_id),
                    quantity: Set(quantity),
                    unit_price: Set(unit_price),
                    total_amount: Set(total_amount),
                    status: Set(OrderStatus::Pending),
                    order_date: Set(order_date),
                    notes: Set(request.notes),
                    created_by: Set(Some(created_by)),
                    ..Default::default()
                };
                model
                    .insert(txn)
                    .await
                    .map_err(|e| ServiceError::from_db_write(e, "order number"))
            })
        })
        .await?;

        counter!("farmops_orders_created_total", 1);
        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id: created.id,
                customer_id: created.customer_id,
            })
            .await;
        info!(order_number = %created.order_number, total = %created.total_amount, "order created");
        Ok(created)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<order::Model, ServiceError> {
        Order::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(filter.condition())
            .order_by_desc(order::Column::OrderDate)
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let existing = self.get_order(id).await?;
        let old_status = existing.status;
        check_status_change(old_status, status)?;
        if old_status == status {
            return Ok(existing);
        }

        let mut active = existing.into_active_model();
        active.status = Set(status);
        let updated = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: updated.id,
                old_status: old_status.to_string(),
                new_status: status.to_string(),
            })
            .await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Order::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Order {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn sales_summary(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<SalesSummary, ServiceError> {
        let filter = OrderFilter {
            from,
            to,
            ..Default::default()
        };
        let orders = Order::find()
            .filter(filter.condition())
            .all(&*self.db_pool)
            .await?;
        Ok(summarize_orders(&orders))
    }
}

fn customer_active_model(request: CustomerRequest) -> customer::ActiveModel {
    customer::ActiveModel {
        name: Set(request.name.trim().to_string()),
        email: Set(request.email),
        phone: Set(request.phone),
        address: Set(request.address),
        customer_type: Set(request.customer_type),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn order_with(status: OrderStatus, total: Decimal) -> order::Model {
        order::Model {
            id: Uuid::new_v4(),
            order_number: "ORD-20240601-ABC123".into(),
            customer_id: Uuid::new_v4(),
            product_id: None,
            batch_id: None,
            quantity: dec!(1),
            unit_price: total,
            total_amount: total,
            status,
            order_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            notes: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn order_number_has_date_and_suffix() {
        let n = generate_order_number(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(n.starts_with("ORD-20240601-"));
        let suffix = &n["ORD-20240601-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn cancelled_orders_do_not_count_as_revenue() {
        let orders = vec![
            order_with(OrderStatus::Delivered, dec!(100)),
            order_with(OrderStatus::Pending, dec!(50)),
            order_with(OrderStatus::Cancelled, dec!(999)),
        ];
        let s = summarize_orders(&orders);
        assert_eq!(s.total_revenue, dec!(150));
        assert_eq!(s.order_count, 2);
        assert_eq!(s.average_order_value, dec!(75));
        assert_eq!(s.cancelled_count, 1);
        assert_eq!(s.by_status.get("cancelled"), Some(&1));
    }

    #[rstest]
    #[case(OrderStatus::Pending, OrderStatus::Confirmed, true)]
    #[case(OrderStatus::Shipped, OrderStatus::Cancelled, true)]
    #[case(OrderStatus::Delivered, OrderStatus::Pending, false)]
    #[case(OrderStatus::Cancelled, OrderStatus::Confirmed, false)]
    #[case(OrderStatus::Cancelled, OrderStatus::Cancelled, true)]
    fn terminal_orders_are_final(
        #[case] from: OrderStatus,
        #[case] to: OrderStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(check_status_change(from, to).is_ok(), allowed);
    }

    #[test]
    fn order_needs_exactly_one_customer_source() {
        let mut request = CreateOrderRequest {
            customer_id: None,
            customer: None,
            product_id: None,
            batch_id: None,
            quantity: dec!(2),
            unit_price: Some(dec!(4.5)),
            order_date: None,
            notes: None,
        };
        assert_matches!(request.validate(), Err(_));

        request.customer_id = Some(Uuid::new_v4());
        assert!(request.validate().is_ok());

        request.customer = Some(CustomerRequest {
            name: "Green Grocer".into(),
            email: None,
            phone: None,
            address: None,
            customer_type: None,
        });
        assert_matches!(request.validate(), Err(_));
    }
}
