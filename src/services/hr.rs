use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::db::DbPool;
use crate::entities::attendance::{self, AttendanceStatus, Entity as Attendance};
use crate::entities::employee::{self, EmployeeStatus, Entity as Employee};
use crate::entities::payroll::{self, Entity as Payroll, PayrollStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::workflow::payload::lenient;
use crate::workflow::Actor;

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(ValidationError::new("must_not_be_negative"))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 1, max = 50))]
    pub employee_id: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub position: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub monthly_salary: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(min = 1, max = 100))]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub monthly_salary: Option<Decimal>,
    #[serde(default)]
    pub status: Option<EmployeeStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttendanceRequest {
    pub employee_id: Uuid,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub date: Option<NaiveDate>,
    pub status: AttendanceStatus,
    #[serde(default, deserialize_with = "lenient::opt_time")]
    pub check_in_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "lenient::opt_time")]
    pub check_out_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AttendanceFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(employee_id) = self.employee_id {
            cond = cond.add(attendance::Column::EmployeeId.eq(employee_id));
        }
        if let Some(status) = self.status {
            cond = cond.add(attendance::Column::Status.eq(status));
        }
        if let Some(from) = self.from {
            cond = cond.add(attendance::Column::Date.gte(from));
        }
        if let Some(to) = self.to {
            cond = cond.add(attendance::Column::Date.lte(to));
        }
        cond
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub employee_id: Uuid,
    pub present_days: u32,
    pub absent_days: u32,
    pub late_days: u32,
    pub leave_days: u32,
    pub total_hours: f64,
    pub average_hours: f64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_payroll_period"))]
pub struct CreatePayrollRequest {
    pub employee_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[validate(custom = "validate_non_negative")]
    pub base_pay: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub overtime_pay: Option<Decimal>,
    #[serde(default)]
    #[validate(custom = "validate_non_negative")]
    pub deductions: Option<Decimal>,
}

fn validate_payroll_period(request: &CreatePayrollRequest) -> Result<(), ValidationError> {
    if request.period_end < request.period_start {
        return Err(ValidationError::new("period_end_before_start"));
    }
    Ok(())
}

/// Hours between check-in and check-out, rounded to two places.
pub fn hours_between(check_in: NaiveTime, check_out: NaiveTime) -> Result<f64, ServiceError> {
    if check_out < check_in {
        return Err(ServiceError::InvalidInput(
            "checkOutTime must not be earlier than checkInTime".into(),
        ));
    }
    let minutes = (check_out - check_in).num_minutes() as f64;
    Ok((minutes / 60.0 * 100.0).round() / 100.0)
}

pub fn summarize_attendance(employee_id: Uuid, rows: &[attendance::Model]) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        employee_id,
        present_days: 0,
        absent_days: 0,
        late_days: 0,
        leave_days: 0,
        total_hours: 0.0,
        average_hours: 0.0,
    };
    let mut worked_days = 0u32;

    for row in rows {
        match row.status {
            AttendanceStatus::Present => summary.present_days += 1,
            AttendanceStatus::Absent => summary.absent_days += 1,
            AttendanceStatus::Late => summary.late_days += 1,
            AttendanceStatus::Leave => summary.leave_days += 1,
        }
        if row.status.counts_as_present() {
            worked_days += 1;
            summary.total_hours += row.hours_worked.unwrap_or(0.0);
        }
    }

    summary.total_hours = (summary.total_hours * 100.0).round() / 100.0;
    if worked_days > 0 {
        summary.average_hours =
            (summary.total_hours / f64::from(worked_days) * 100.0).round() / 100.0;
    }
    summary
}

/// base + overtime - deductions; a negative result is refused.
pub fn net_pay(base: Decimal, overtime: Decimal, deductions: Decimal) -> Result<Decimal, ServiceError> {
    let net = base + overtime - deductions;
    if net.is_sign_negative() && !net.is_zero() {
        return Err(ServiceError::InvalidInput(
            "deductions exceed gross pay".into(),
        ));
    }
    Ok(net.round_dp(2))
}

#[derive(Clone)]
pub struct HrService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl HrService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(employee_id = %request.employee_id))]
    pub async fn create_employee(
        &self,
        request: CreateEmployeeRequest,
    ) -> Result<employee::Model, ServiceError> {
        request.validate()?;
        let employee_id = request.employee_id.trim().to_string();

        let existing = Employee::find()
            .filter(employee::Column::EmployeeId.eq(employee_id.clone()))
            .one(&*self.db_pool)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Employee {} already exists",
                employee_id
            )));
        }

        let model = employee::ActiveModel {
            employee_id: Set(employee_id),
            first_name: Set(request.first_name.trim().to_string()),
            last_name: Set(request.last_name.trim().to_string()),
            email: Set(request.email),
            phone: Set(request.phone),
            position: Set(request.position),
            department: Set(request.department),
            hire_date: Set(request.hire_date.unwrap_or_else(|| Utc::now().date_naive())),
            hourly_rate: Set(request.hourly_rate),
            monthly_salary: Set(request.monthly_salary),
            ..Default::default()
        };
        let created = model
            .insert(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_db_write(e, "employee id"))?;
        info!(id = %created.id, "employee created");
        Ok(created)
    }

    pub async fn get_employee(&self, id: Uuid) -> Result<employee::Model, ServiceError> {
        Employee::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Employee {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_employees(
        &self,
        status: Option<EmployeeStatus>,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<employee::Model>, u64), ServiceError> {
        let mut cond = Condition::all();
        if let Some(status) = status {
            cond = cond.add(employee::Column::Status.eq(status));
        }
        if let Some(term) = search.filter(|s| !s.trim().is_empty()) {
            let term = term.trim().to_string();
            cond = cond.add(
                Condition::any()
                    .add(employee::Column::FirstName.contains(&term))
                    .add(employee::Column::LastName.contains(&term))
                    .add(employee::Column::EmployeeId.contains(&term)),
            );
        }

        let paginator = Employee::find()
            .filter(cond)
            .order_by_asc(employee::Column::LastName)
            .order_by_asc(employee::Column::FirstName)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self, request))]
    pub async fn update_employee(
        &self,
        id: Uuid,
        request: UpdateEmployeeRequest,
    ) -> Result<employee::Model, ServiceError> {
        request.validate()?;
        let mut active = self.get_employee(id).await?.into_active_model();

        if let Some(v) = request.first_name {
            active.first_name = Set(v);
        }
        if let Some(v) = request.last_name {
            active.last_name = Set(v);
        }
        if request.email.is_some() {
            active.email = Set(request.email);
        }
        if request.phone.is_some() {
            active.phone = Set(request.phone);
        }
        if let Some(v) = request.position {
            active.position = Set(v);
        }
        if request.department.is_some() {
            active.department = Set(request.department);
        }
        if request.hourly_rate.is_some() {
            active.hourly_rate = Set(request.hourly_rate);
        }
        if request.monthly_salary.is_some() {
            active.monthly_salary = Set(request.monthly_salary);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }

        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_employee(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Employee::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Employee {} not found", id)));
        }
        Ok(())
    }

    /// One row per employee per day; a second entry for the same day is a
    /// conflict.
    #[instrument(skip(self, request, actor), fields(employee_id = %request.employee_id))]
    pub async fn record_attendance(
        &self,
        request: RecordAttendanceRequest,
        actor: &Actor,
    ) -> Result<attendance::Model, ServiceError> {
        request.validate()?;
        self.get_employee(request.employee_id).await?;

        let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
        let duplicate = Attendance::find()
            .filter(attendance::Column::EmployeeId.eq(request.employee_id))
            .filter(attendance::Column::Date.eq(date))
            .one(&*self.db_pool)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Attendance for {} on {} already recorded",
                request.employee_id, date
            )));
        }

        let hours_worked = match (request.check_in_time, request.check_out_time) {
            (Some(check_in), Some(check_out)) => Some(hours_between(check_in, check_out)?),
            _ => None,
        };

        let model = attendance::ActiveModel {
            employee_id: Set(request.employee_id),
            date: Set(date),
            status: Set(request.status),
            check_in_time: Set(request.check_in_time),
            check_out_time: Set(request.check_out_time),
            hours_worked: Set(hours_worked),
            notes: Set(request.notes),
            recorded_by: Set(Some(actor.display_id())),
            ..Default::default()
        };
        model
            .insert(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_db_write(e, "attendance record"))
    }

    #[instrument(skip(self))]
    pub async fn list_attendance(
        &self,
        filter: AttendanceFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<attendance::Model>, u64), ServiceError> {
        let paginator = Attendance::find()
            .filter(filter.condition())
            .order_by_desc(attendance::Column::Date)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn delete_attendance(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Attendance::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Attendance record {} not found", id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn attendance_summary(
        &self,
        employee_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AttendanceSummary, ServiceError> {
        self.get_employee(employee_id).await?;
        let filter = AttendanceFilter {
            employee_id: Some(employee_id),
            status: None,
            from,
            to,
        };
        let rows = Attendance::find()
            .filter(filter.condition())
            .all(&*self.db_pool)
            .await?;
        Ok(summarize_attendance(employee_id, &rows))
    }

    #[instrument(skip(self, request), fields(employee_id = %request.employee_id))]
    pub async fn create_payroll(
        &self,
        request: CreatePayrollRequest,
    ) -> Result<payroll::Model, ServiceError> {
        request.validate()?;
        self.get_employee(request.employee_id).await?;

        let overtime = request.overtime_pay.unwrap_or(Decimal::ZERO);
        let deductions = request.deductions.unwrap_or(Decimal::ZERO);
        let net = net_pay(request.base_pay, overtime, deductions)?;

        let model = payroll::ActiveModel {
            employee_id: Set(request.employee_id),
            period_start: Set(request.period_start),
            period_end: Set(request.period_end),
            base_pay: Set(request.base_pay),
            overtime_pay: Set(overtime),
            deductions: Set(deductions),
            net_pay: Set(net),
            status: Set(PayrollStatus::Pending),
            paid_at: Set(None),
            ..Default::default()
        };
        Ok(model.insert(&*self.db_pool).await?)
    }

    pub async fn get_payroll(&self, id: Uuid) -> Result<payroll::Model, ServiceError> {
        Payroll::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payroll record {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_payroll(
        &self,
        employee_id: Option<Uuid>,
        status: Option<PayrollStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<payroll::Model>, u64), ServiceError> {
        let mut cond = Condition::all();
        if let Some(employee_id) = employee_id {
            cond = cond.add(payroll::Column::EmployeeId.eq(employee_id));
        }
        if let Some(status) = status {
            cond = cond.add(payroll::Column::Status.eq(status));
        }
        let paginator = Payroll::find()
            .filter(cond)
            .order_by_desc(payroll::Column::PeriodEnd)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn mark_paid(&self, id: Uuid) -> Result<payroll::Model, ServiceError> {
        let record = self.get_payroll(id).await?;
        if record.status == PayrollStatus::Paid {
            return Err(ServiceError::Conflict(format!(
                "Payroll record {} is already paid",
                id
            )));
        }

        let mut active = record.into_active_model();
        active.status = Set(PayrollStatus::Paid);
        active.paid_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::PayrollPaid(updated.id))
            .await;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn row(status: AttendanceStatus, hours: Option<f64>) -> attendance::Model {
        attendance::Model {
            id: Uuid::new_v4(),
            employee_id: Uuid::nil(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            status,
            check_in_time: None,
            check_out_time: None,
            hours_worked: hours,
            notes: None,
            recorded_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn hours_are_computed_from_clock_times() {
        assert_eq!(hours_between(t(8, 0), t(16, 30)).unwrap(), 8.5);
        assert_eq!(hours_between(t(9, 0), t(9, 20)).unwrap(), 0.33);
        assert_matches!(hours_between(t(17, 0), t(8, 0)), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn late_days_count_towards_hours() {
        let rows = vec![
            row(AttendanceStatus::Present, Some(8.0)),
            row(AttendanceStatus::Late, Some(6.0)),
            row(AttendanceStatus::Absent, None),
            row(AttendanceStatus::Leave, None),
        ];
        let s = summarize_attendance(Uuid::nil(), &rows);
        assert_eq!((s.present_days, s.late_days, s.absent_days, s.leave_days), (1, 1, 1, 1));
        assert_eq!(s.total_hours, 14.0);
        assert_eq!(s.average_hours, 7.0);
    }

    #[test]
    fn summary_without_worked_days_has_zero_average() {
        let s = summarize_attendance(Uuid::nil(), &[row(AttendanceStatus::Absent, None)]);
        assert_eq!(s.average_hours, 0.0);
    }

    #[test]
    fn net_pay_subtracts_deductions() {
        assert_eq!(net_pay(dec!(1500), dec!(120.50), dec!(200)).unwrap(), dec!(1420.50));
        assert_matches!(net_pay(dec!(100), dec!(0), dec!(150)), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn payroll_period_must_not_end_before_it_starts() {
        let request = CreatePayrollRequest {
            employee_id: Uuid::new_v4(),
            period_start: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            period_end: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            base_pay: dec!(1000),
            overtime_pay: None,
            deductions: None,
        };
        assert!(request.validate().is_err());
    }
}
