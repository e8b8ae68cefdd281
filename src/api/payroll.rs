use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::domain::payroll::{PayComponents, gross_salary, net_salary, validate_components};
use crate::model::payroll::{Payroll, PayrollStatus};

#[derive(Deserialize, ToSchema)]
pub struct CreatePayroll {
    #[schema(example = 1001)]
    pub employee_id: u64,

    /// Year-month pay period
    #[schema(example = "2025-03")]
    pub pay_period: String,

    #[schema(example = 50000.0)]
    pub basic_salary: f64,
    #[schema(example = 5000.0)]
    pub allowances: f64,
    #[schema(example = 0.0)]
    pub overtime: f64,
    #[schema(example = 0.0)]
    pub bonus: f64,
    #[schema(example = 0.0)]
    pub commission: f64,
    #[schema(example = 2000.0)]
    pub deductions: f64,
    #[schema(example = 3000.0)]
    pub tax_deduction: f64,
    #[schema(example = 0.0)]
    pub provident_fund: f64,
    #[schema(example = 0.0)]
    pub insurance: f64,
}

impl CreatePayroll {
    fn components(&self) -> PayComponents {
        PayComponents {
            basic_salary: self.basic_salary,
            allowances: self.allowances,
            overtime: self.overtime,
            bonus: self.bonus,
            commission: self.commission,
            deductions: self.deductions,
            tax_deduction: self.tax_deduction,
            provident_fund: self.provident_fund,
            insurance: self.insurance,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if !is_valid_period(&self.pay_period) {
            return Err("pay_period must look like YYYY-MM");
        }
        validate_components(&self.components())
    }
}

/// "2025-03" style year-month identifier.
fn is_valid_period(period: &str) -> bool {
    let bytes = period.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return false;
    }
    let year_ok = period[..4].chars().all(|c| c.is_ascii_digit());
    let month_ok = matches!(period[5..].parse::<u8>(), Ok(m) if (1..=12).contains(&m));
    year_ok && month_ok
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayroll {
    pub basic_salary: Option<f64>,
    pub allowances: Option<f64>,
    pub overtime: Option<f64>,
    pub bonus: Option<f64>,
    pub commission: Option<f64>,
    pub deductions: Option<f64>,
    pub tax_deduction: Option<f64>,
    pub provident_fund: Option<f64>,
    pub insurance: Option<f64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
    #[schema(example = 1001)]
    pub employee_id: Option<u64>,
    #[schema(example = "2025-03")]
    pub pay_period: Option<String>,
    #[schema(example = "draft")]
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Payroll>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

async fn fetch_payroll(pool: &MySqlPool, id: u64) -> Result<Option<Payroll>, sqlx::Error> {
    sqlx::query_as::<_, Payroll>("SELECT * FROM payroll WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn parse_status(raw: &str) -> actix_web::Result<PayrollStatus> {
    raw.parse::<PayrollStatus>()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt payroll status"))
}

#[utoipa::path(
    post,
    path = "/api/v1/hr/payroll",
    request_body = CreatePayroll,
    responses(
        (status = 201, description = "Payroll created", body = Object, example = json!({
            "message": "Payroll created successfully",
            "gross_salary": 55000.0,
            "net_salary": 50000.0
        })),
        (status = 400, description = "Validation failure or duplicate pay period"),
        (status = 404, description = "Employee not found"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if let Err(msg) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    let employee_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ? LIMIT 1)",
    )
    .bind(payload.employee_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Employee existence check failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if !employee_exists {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Employee not found"
        })));
    }

    let duplicate = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM payroll WHERE employee_id = ? AND pay_period = ? LIMIT 1)",
    )
    .bind(payload.employee_id)
    .bind(&payload.pay_period)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Payroll duplicate check failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if duplicate {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Payroll already exists for this employee and pay period"
        })));
    }

    let components = payload.components();
    let gross = gross_salary(&components);
    let net = net_salary(&components);

    let result = sqlx::query(
        r#"
        INSERT INTO payroll
        (employee_id, pay_period, basic_salary, allowances, overtime, bonus, commission,
         deductions, tax_deduction, provident_fund, insurance, gross_salary, net_salary, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'draft')
        "#,
    )
    .bind(payload.employee_id)
    .bind(&payload.pay_period)
    .bind(components.basic_salary)
    .bind(components.allowances)
    .bind(components.overtime)
    .bind(components.bonus)
    .bind(components.commission)
    .bind(components.deductions)
    .bind(components.tax_deduction)
    .bind(components.provident_fund)
    .bind(components.insurance)
    .bind(gross)
    .bind(net)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Payroll created successfully",
            "gross_salary": gross,
            "net_salary": net
        }))),
        Err(e) => {
            // unique (employee_id, pay_period) closes the check-then-insert race
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": "Payroll already exists for this employee and pay period"
                    })));
                }
            }
            error!(error = %e, "Failed to create payroll");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/hr/payroll/{payroll_id}",
    request_body = UpdatePayroll,
    params(("payroll_id", description = "Payroll ID")),
    responses(
        (status = 200, description = "Payroll updated, totals re-derived"),
        (status = 400, description = "Payroll is not in draft"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdatePayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let payroll_id = path.into_inner();

    let current = match fetch_payroll(pool.get_ref(), payroll_id).await.map_err(|e| {
        error!(error = %e, payroll_id, "Failed to fetch payroll");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(c) => c,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Payroll record not found"
            })));
        }
    };

    if !parse_status(&current.status)?.is_editable() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Only draft payroll can be edited"
        })));
    }

    let components = PayComponents {
        basic_salary: body.basic_salary.unwrap_or(current.basic_salary),
        allowances: body.allowances.unwrap_or(current.allowances),
        overtime: body.overtime.unwrap_or(current.overtime),
        bonus: body.bonus.unwrap_or(current.bonus),
        commission: body.commission.unwrap_or(current.commission),
        deductions: body.deductions.unwrap_or(current.deductions),
        tax_deduction: body.tax_deduction.unwrap_or(current.tax_deduction),
        provident_fund: body.provident_fund.unwrap_or(current.provident_fund),
        insurance: body.insurance.unwrap_or(current.insurance),
    };

    if let Err(msg) = validate_components(&components) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    let gross = gross_salary(&components);
    let net = net_salary(&components);

    sqlx::query(
        r#"
        UPDATE payroll
        SET basic_salary = ?, allowances = ?, overtime = ?, bonus = ?, commission = ?,
            deductions = ?, tax_deduction = ?, provident_fund = ?, insurance = ?,
            gross_salary = ?, net_salary = ?
        WHERE id = ? AND status = 'draft'
        "#,
    )
    .bind(components.basic_salary)
    .bind(components.allowances)
    .bind(components.overtime)
    .bind(components.bonus)
    .bind(components.commission)
    .bind(components.deductions)
    .bind(components.tax_deduction)
    .bind(components.provident_fund)
    .bind(components.insurance)
    .bind(gross)
    .bind(net)
    .bind(payroll_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, payroll_id, "Failed to update payroll");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Payroll updated successfully",
        "gross_salary": gross,
        "net_salary": net
    })))
}

/// Advance one processing step: draft -> processed -> paid.
#[utoipa::path(
    patch,
    path = "/api/v1/hr/payroll/{payroll_id}/process",
    params(("payroll_id", description = "Payroll ID")),
    responses(
        (status = 200, description = "Payroll advanced", body = Object, example = json!({
            "message": "Payroll status updated",
            "status": "processed"
        })),
        (status = 400, description = "Payroll already paid or cancelled"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn process_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let payroll_id = path.into_inner();

    let current = match fetch_payroll(pool.get_ref(), payroll_id).await.map_err(|e| {
        error!(error = %e, payroll_id, "Failed to fetch payroll");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(c) => c,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Payroll record not found"
            })));
        }
    };

    let next = match parse_status(&current.status)?.next_processing_step() {
        Some(n) => n,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Payroll is already in a terminal state"
            })));
        }
    };

    let sql = advance_sql(next);

    // Guard on the status we read so a concurrent advance loses cleanly.
    let result = sqlx::query(&sql)
        .bind(next.as_ref())
        .bind(payroll_id)
        .bind(&current.status)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, payroll_id, "Failed to advance payroll");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Payroll status changed concurrently, retry"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Payroll status updated",
        "status": next.as_ref()
    })))
}

/// Cancel a draft payroll run. Processed or paid runs are immutable.
#[utoipa::path(
    delete,
    path = "/api/v1/hr/payroll/{payroll_id}",
    params(("payroll_id", description = "Payroll ID")),
    responses(
        (status = 200, description = "Payroll cancelled"),
        (status = 400, description = "Payroll is not in draft"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn cancel_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let payroll_id = path.into_inner();

    let result = sqlx::query(
        "UPDATE payroll SET status = 'cancelled' WHERE id = ? AND status = 'draft'",
    )
    .bind(payroll_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, payroll_id, "Failed to cancel payroll");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Payroll not found or not in draft"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Payroll cancelled"
    })))
}

/// Statement for one processing step. Guards on the status the handler read
/// and stamps the matching timestamp column.
fn advance_sql(next: PayrollStatus) -> String {
    let timestamp_column = match next {
        PayrollStatus::Processed => "processed_at",
        _ => "paid_at",
    };
    format!(
        "UPDATE payroll SET status = ?, {} = NOW() WHERE id = ? AND status = ?",
        timestamp_column
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/hr/payroll/{payroll_id}",
    params(("payroll_id", description = "Payroll ID")),
    responses(
        (status = 200, description = "Payroll record"),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let payroll_id = path.into_inner();

    let payroll = fetch_payroll(pool.get_ref(), payroll_id).await.map_err(|e| {
        error!(error = %e, payroll_id, "Failed to fetch payroll");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match payroll {
        Some(p) => {
            auth.require_self_or_hr(p.employee_id)?;
            Ok(HttpResponse::Ok().json(p))
        }
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Payroll not found"
        }))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/hr/payroll",
    params(PayrollQuery),
    responses((status = 200, body = PaginatedPayrollResponse)),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayrollQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let pagination = Pagination::from_params(query.page, query.per_page);

    let mut filter = SqlFilter::new();
    if let Some(emp_id) = query.employee_id {
        filter.push("employee_id = ?", BindValue::U64(emp_id));
    }
    if let Some(period) = &query.pay_period {
        filter.push("pay_period = ?", BindValue::Str(period.clone()));
    }
    if let Some(status) = &query.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }

    let count_sql = format!("SELECT COUNT(*) FROM payroll{}", filter.where_clause());

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count payrolls");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM payroll{} ORDER BY pay_period DESC, id DESC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let data = filter
        .bind_query_as(sqlx::query_as::<_, Payroll>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch payroll list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pay_period_format() {
        assert!(is_valid_period("2025-03"));
        assert!(is_valid_period("1999-12"));
        assert!(!is_valid_period("2025-13"));
        assert!(!is_valid_period("2025-00"));
        assert!(!is_valid_period("2025-3"));
        assert!(!is_valid_period("202503"));
        assert!(!is_valid_period("2025/03"));
    }

    #[test]
    fn advance_statement_guards_on_the_read_status() {
        let sql = advance_sql(PayrollStatus::Processed);
        assert!(sql.contains("processed_at = NOW()"));
        assert!(sql.ends_with("WHERE id = ? AND status = ?"));

        let sql = advance_sql(PayrollStatus::Paid);
        assert!(sql.contains("paid_at = NOW()"));
        assert!(sql.ends_with("WHERE id = ? AND status = ?"));
    }
}
