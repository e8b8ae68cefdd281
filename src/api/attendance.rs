use crate::auth::auth::AuthUser;
use crate::domain::attendance::{hours_worked, overtime_hours, status_for_check_in};
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::model::attendance::{Attendance, AttendanceStatus};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    pub employee_id: Option<u64>,
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Attendance>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Manual record by HR, for days without a check-in/check-out pair
/// (absent, on leave, holiday, work from home).
#[derive(Deserialize, ToSchema)]
pub struct RecordAttendance {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "absent")]
    pub status: AttendanceStatus,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/hr/attendance/check-in",
    responses(
        (status = 200, description = "Checked in", body = Object, example = json!({
            "message": "Checked in successfully",
            "status": "present"
        })),
        (status = 400, description = "Already checked in today"),
        (status = 401), (status = 403),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id_required()?;

    let now = Local::now();
    let today = now.date_naive();
    let time = now.time();
    let status = status_for_check_in(time);

    let result = sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, check_in, status)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(today)
    .bind(time)
    .bind(status.as_ref())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Checked in successfully",
            "status": status.as_ref()
        }))),

        Err(e) => {
            // Duplicate check-in for same day
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": "Already checked in today"
                    })));
                }
            }

            error!(error = %e, employee_id, "Check-in failed");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// Check-out endpoint
#[utoipa::path(
    patch,
    path = "/api/v1/hr/attendance/check-out",
    responses(
        (status = 200, description = "Checked out", body = Object, example = json!({
            "message": "Checked out successfully",
            "hours_worked": 8.5,
            "overtime_hours": 0.5
        })),
        (status = 400, description = "No active check-in found for today"),
        (status = 401), (status = 403),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id_required()?;

    let now = Local::now();
    let today = now.date_naive();
    let time = now.time();

    let open = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT * FROM attendance
        WHERE employee_id = ? AND date = ? AND check_in IS NOT NULL AND check_out IS NULL
        "#,
    )
    .bind(employee_id)
    .bind(today)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-out lookup failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let open = match open {
        Some(row) => row,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "No active check-in found for today"
            })));
        }
    };

    // check_in is guaranteed by the WHERE clause
    let check_in = open
        .check_in
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Missing check-in time"))?;

    let hours = hours_worked(check_in, time);
    let overtime = overtime_hours(hours);

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = ?, hours_worked = ?, overtime_hours = ?
        WHERE id = ? AND check_out IS NULL
        "#,
    )
    .bind(time)
    .bind(hours)
    .bind(overtime)
    .bind(open.id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-out failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "No active check-in found for today"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked out successfully",
        "hours_worked": hours,
        "overtime_hours": overtime
    })))
}

/// Record attendance manually (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/v1/hr/attendance",
    request_body = RecordAttendance,
    responses(
        (status = 201, description = "Attendance recorded"),
        (status = 400, description = "Record already exists for this day"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn record_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RecordAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

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

    let result = sqlx::query(
        "INSERT INTO attendance (employee_id, date, status) VALUES (?, ?, ?)",
    )
    .bind(payload.employee_id)
    .bind(payload.date)
    .bind(payload.status.as_ref())
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Attendance recorded"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": "Attendance already recorded for this day"
                    })));
                }
            }
            error!(error = %e, "Failed to record attendance");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/v1/hr/attendance",
    params(AttendanceQuery),
    responses((status = 200, body = AttendanceListResponse)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let mut filter = SqlFilter::new();

    if auth.is_employee() {
        let own = auth.employee_id_required()?;
        filter.push("employee_id = ?", BindValue::U64(own));
    } else if let Some(emp_id) = query.employee_id {
        filter.push("employee_id = ?", BindValue::U64(emp_id));
    }

    if let Some(status) = &query.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(from) = query.from {
        filter.push("date >= ?", BindValue::Date(from));
    }
    if let Some(to) = query.to {
        filter.push("date <= ?", BindValue::Date(to));
    }

    let pagination = Pagination::from_params(query.page, query.per_page);

    let count_sql = format!("SELECT COUNT(*) FROM attendance{}", filter.where_clause());

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM attendance{} ORDER BY date ASC, id ASC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let data = filter
        .bind_query_as(sqlx::query_as::<_, Attendance>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}
