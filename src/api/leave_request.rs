use crate::auth::auth::AuthUser;
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::domain::leave;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::utils::balance_cache;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
    pub reason: Option<String>,
}

impl CreateLeave {
    fn validate(&self) -> Result<(), &'static str> {
        if self.start_date > self.end_date {
            return Err("start_date cannot be after end_date");
        }
        Ok(())
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateLeave {
    #[schema(example = "2026-01-06", format = "date", value_type = String)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-08", format = "date", value_type = String)]
    pub end_date: Option<NaiveDate>,
    pub leave_type: Option<LeaveType>,
}

#[derive(Deserialize, ToSchema)]
pub struct DecideLeave {
    /// Optional approver/rejecter comments
    pub comments: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = "annual")]
    pub leave_type: Option<String>,
    /// Requests overlapping or after this date
    pub from: Option<NaiveDate>,
    /// Requests overlapping or before this date
    pub to: Option<NaiveDate>,
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveBalanceResponse {
    pub employee_id: u64,
    pub year: i32,
    #[schema(example = 21)]
    pub entitlement: u32,
    #[schema(example = 6)]
    pub taken: u32,
    #[schema(example = 15)]
    pub remaining: u32,
}

/// True when the employee already has a pending or approved request that
/// overlaps [start, end]. `exclude_id` skips the row being edited.
async fn has_overlap(
    pool: &MySqlPool,
    employee_id: u64,
    start: NaiveDate,
    end: NaiveDate,
    exclude_id: Option<u64>,
) -> Result<bool, sqlx::Error> {
    let mut sql = String::from(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM leave_requests
            WHERE employee_id = ?
            AND status IN ('pending', 'approved')
            AND start_date <= ?
            AND end_date >= ?
        "#,
    );
    if exclude_id.is_some() {
        sql.push_str(" AND id <> ?");
    }
    sql.push(')');

    let mut q = sqlx::query_scalar::<_, bool>(&sql)
        .bind(employee_id)
        .bind(end)
        .bind(start);
    if let Some(id) = exclude_id {
        q = q.bind(id);
    }
    q.fetch_one(pool).await
}

async fn fetch_leave(pool: &MySqlPool, id: u64) -> Result<Option<LeaveRequest>, sqlx::Error> {
    sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leave_requests WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn parse_status(raw: &str) -> actix_web::Result<LeaveStatus> {
    raw.parse::<LeaveStatus>()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt leave status"))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/hr/leave-requests",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "status": "pending",
            "day_count": 3
         })
        ),
        (status = 400, description = "Invalid dates or overlapping request"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id_required()?;

    if let Err(msg) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    let overlap = has_overlap(
        pool.get_ref(),
        employee_id,
        payload.start_date,
        payload.end_date,
        None,
    )
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Overlap check failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if overlap {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Overlaps an existing pending or approved leave request"
        })));
    }

    let day_count = leave::day_count(payload.start_date, payload.end_date);

    sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type, start_date, end_date, day_count, status, approver_comments)
        VALUES (?, ?, ?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type.as_ref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(day_count)
    .bind(&payload.reason)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Leave request submitted",
        "status": "pending",
        "day_count": day_count
    })))
}

/* =========================
List leave requests
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/hr/leave-requests",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // Employees see their own history, HR/Admin see everything
    let mut filter = SqlFilter::new();

    if auth.is_employee() {
        let own = auth.employee_id_required()?;
        filter.push("employee_id = ?", BindValue::U64(own));
    } else if let Some(emp_id) = query.employee_id {
        filter.push("employee_id = ?", BindValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_deref() {
        filter.push("status = ?", BindValue::Str(status.to_string()));
    }
    if let Some(leave_type) = query.leave_type.as_deref() {
        filter.push("leave_type = ?", BindValue::Str(leave_type.to_string()));
    }
    if let Some(from) = query.from {
        filter.push("end_date >= ?", BindValue::Date(from));
    }
    if let Some(to) = query.to {
        filter.push("start_date <= ?", BindValue::Date(to));
    }

    let pagination = Pagination::from_params(query.page, query.per_page);

    let count_sql = format!(
        "SELECT COUNT(*) FROM leave_requests{}",
        filter.where_clause()
    );

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count leave requests");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM leave_requests{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let leaves = filter
        .bind_query_as(sqlx::query_as::<_, LeaveRequest>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

/// Fetch one leave request
#[utoipa::path(
    get,
    path = "/api/v1/hr/leave-requests/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request")),
    responses(
        (status = 200, description = "Leave request found"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = fetch_leave(pool.get_ref(), leave_id).await.map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match leave {
        Some(data) => {
            auth.require_self_or_hr(data.employee_id)?;
            Ok(HttpResponse::Ok().json(data))
        }
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Leave request not found"
        }))),
    }
}

/* =========================
Update leave (owner, pending only)
========================= */
#[utoipa::path(
    patch,
    path = "/api/v1/hr/leave-requests/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request")),
    request_body = UpdateLeave,
    responses(
        (status = 200, description = "Leave request updated"),
        (status = 400, description = "Not pending, invalid dates, or overlap"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn update_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateLeave>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = match fetch_leave(pool.get_ref(), leave_id).await.map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(l) => l,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Leave request not found"
            })));
        }
    };

    auth.require_self_or_hr(leave.employee_id)?;

    if !parse_status(&leave.status)?.is_editable() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Only pending requests can be edited"
        })));
    }

    let start_date = body.start_date.unwrap_or(leave.start_date);
    let end_date = body.end_date.unwrap_or(leave.end_date);
    if start_date > end_date {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "start_date cannot be after end_date"
        })));
    }

    let overlap = has_overlap(
        pool.get_ref(),
        leave.employee_id,
        start_date,
        end_date,
        Some(leave_id),
    )
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Overlap check failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if overlap {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Overlaps an existing pending or approved leave request"
        })));
    }

    let leave_type = body
        .leave_type
        .map(|t| t.as_ref().to_string())
        .unwrap_or(leave.leave_type);
    let day_count = leave::day_count(start_date, end_date);

    sqlx::query(
        r#"
        UPDATE leave_requests
        SET start_date = ?, end_date = ?, leave_type = ?, day_count = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(start_date)
    .bind(end_date)
    .bind(&leave_type)
    .bind(day_count)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Failed to update leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request updated",
        "day_count": day_count
    })))
}

async fn decide_leave(
    auth: AuthUser,
    pool: &MySqlPool,
    leave_id: u64,
    decision: LeaveStatus,
    comments: Option<String>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let leave = match fetch_leave(pool, leave_id).await.map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(l) => l,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Leave request not found"
            })));
        }
    };

    if !parse_status(&leave.status)?.can_transition_to(decision) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Leave request not found or already processed"
        })));
    }

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, approved_by = ?, approved_at = NOW(), approver_comments = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(decision.as_ref())
    .bind(auth.user_id)
    .bind(&comments)
    .bind(leave_id)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Leave decision failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Leave request not found or already processed"
        })));
    }

    if decision == LeaveStatus::Approved {
        balance_cache::invalidate(leave.employee_id, leave.start_date.year()).await;
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": match decision {
            LeaveStatus::Approved => "Leave approved",
            _ => "Leave rejected",
        }
    })))
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    patch,
    path = "/api/v1/hr/leave-requests/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    request_body = DecideLeave,
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<DecideLeave>,
) -> actix_web::Result<impl Responder> {
    decide_leave(
        auth,
        pool.get_ref(),
        path.into_inner(),
        LeaveStatus::Approved,
        body.into_inner().comments,
    )
    .await
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    patch,
    path = "/api/v1/hr/leave-requests/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    request_body = DecideLeave,
    responses(
        (status = 200, description = "Leave rejected"),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<DecideLeave>,
) -> actix_web::Result<impl Responder> {
    decide_leave(
        auth,
        pool.get_ref(),
        path.into_inner(),
        LeaveStatus::Rejected,
        body.into_inner().comments,
    )
    .await
}

/// Cancel own leave (pending or approved)
#[utoipa::path(
    patch,
    path = "/api/v1/hr/leave-requests/{leave_id}/cancel",
    params(("leave_id" = u64, Path, description = "ID of the leave request to cancel")),
    responses(
        (status = 200, description = "Leave cancelled"),
        (status = 400, description = "Cannot cancel in current state"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = match fetch_leave(pool.get_ref(), leave_id).await.map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(l) => l,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Leave request not found"
            })));
        }
    };

    auth.require_self_or_hr(leave.employee_id)?;

    let status = parse_status(&leave.status)?;
    if !status.can_transition_to(LeaveStatus::Cancelled) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Cannot cancel a request in its current state"
        })));
    }

    sqlx::query("UPDATE leave_requests SET status = 'cancelled' WHERE id = ?")
        .bind(leave_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Cancel leave failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    // an approved request returning days changes the balance
    if status == LeaveStatus::Approved {
        balance_cache::invalidate(leave.employee_id, leave.start_date.year()).await;
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave cancelled"
    })))
}

/// Delete own pending leave request
#[utoipa::path(
    delete,
    path = "/api/v1/hr/leave-requests/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to delete")),
    responses(
        (status = 200, description = "Leave request deleted"),
        (status = 400, description = "Only pending requests can be deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = match fetch_leave(pool.get_ref(), leave_id).await.map_err(|e| {
        error!(error = %e, leave_id, "Failed to fetch leave request");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(l) => l,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Leave request not found"
            })));
        }
    };

    // hard delete is owner-only, unlike cancel
    if auth.employee_id != Some(leave.employee_id) {
        return Err(actix_web::error::ErrorForbidden("Not your record"));
    }

    if !parse_status(&leave.status)?.is_editable() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Only pending requests can be deleted"
        })));
    }

    sqlx::query("DELETE FROM leave_requests WHERE id = ? AND status = 'pending'")
        .bind(leave_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Delete leave failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Leave request deleted"
    })))
}

/// Remaining leave balance for the calendar year
#[utoipa::path(
    get,
    path = "/api/v1/hr/leave-requests/balance",
    responses(
        (status = 200, description = "Remaining balance", body = LeaveBalanceResponse),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id_required()?;
    let year = Utc::now().date_naive().year();

    // Cache holds the approved-day sum; taken can exceed the entitlement,
    // only remaining floors at zero.
    let taken = match balance_cache::get(employee_id, year).await {
        Some(cached) => cached,
        None => {
            let taken = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT CAST(COALESCE(SUM(day_count), 0) AS SIGNED)
                FROM leave_requests
                WHERE employee_id = ? AND status = 'approved' AND YEAR(start_date) = ?
                "#,
            )
            .bind(employee_id)
            .bind(year)
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, employee_id, "Failed to sum approved leave days");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

            let taken = taken.max(0) as u32;
            balance_cache::put(employee_id, year, taken).await;
            taken
        }
    };

    Ok(HttpResponse::Ok().json(balance_response(employee_id, year, taken)))
}

fn balance_response(employee_id: u64, year: i32, taken: u32) -> LeaveBalanceResponse {
    LeaveBalanceResponse {
        employee_id,
        year,
        entitlement: leave::ANNUAL_ENTITLEMENT,
        taken,
        remaining: leave::remaining_balance(taken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taken_is_not_capped_by_the_entitlement() {
        let b = balance_response(7, 2026, 30);
        assert_eq!(b.taken, 30);
        assert_eq!(b.remaining, 0);

        let b = balance_response(7, 2026, 18);
        assert_eq!(b.taken, 18);
        assert_eq!(b.remaining, 3);
    }
}
