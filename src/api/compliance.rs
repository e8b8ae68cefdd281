use crate::auth::auth::AuthUser;
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::model::compliance::{ComplianceItem, ComplianceStatus, ComplianceType};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Clone, ToSchema)]
pub struct CreateCompliance {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "training")]
    pub compliance_type: ComplianceType,
    #[schema(example = "Fire safety training")]
    pub title: String,
    #[schema(example = "2026-03-31", format = "date", value_type = String)]
    pub due_date: Option<NaiveDate>,
    #[schema(example = "2027-03-31", format = "date", value_type = String)]
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl CreateCompliance {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if let (Some(due), Some(expiry)) = (self.due_date, self.expiry_date) {
            if expiry < due {
                return Err("expiry_date cannot be before due_date".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, ToSchema)]
pub struct BulkCreateCompliance {
    pub items: Vec<CreateCompliance>,
}

#[derive(Serialize, ToSchema)]
pub struct BulkCreateResult {
    #[schema(example = 8)]
    pub created: u32,
    #[schema(example = 2)]
    pub failed: u32,
    /// One entry per failed item: index + reason
    pub errors: Vec<BulkItemError>,
}

#[derive(Serialize, ToSchema)]
pub struct BulkItemError {
    pub index: usize,
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCompliance {
    pub title: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[schema(example = "not_applicable")]
    pub status: Option<ComplianceStatus>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ComplianceQuery {
    pub employee_id: Option<u64>,
    pub compliance_type: Option<String>,
    pub status: Option<String>,
    /// Items due on or before this date
    pub due_before: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ComplianceListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<ComplianceItem>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

async fn insert_item(
    pool: &MySqlPool,
    item: &CreateCompliance,
) -> Result<(), String> {
    item.validate()?;

    let employee_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ? LIMIT 1)",
    )
    .bind(item.employee_id)
    .fetch_one(pool)
    .await
    .map_err(|e| format!("employee lookup failed: {}", e))?;

    if !employee_exists {
        return Err(format!("employee {} not found", item.employee_id));
    }

    sqlx::query(
        r#"
        INSERT INTO compliance_items
        (employee_id, compliance_type, title, status, due_date, expiry_date, notes)
        VALUES (?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(item.employee_id)
    .bind(item.compliance_type.as_ref())
    .bind(&item.title)
    .bind(item.due_date)
    .bind(item.expiry_date)
    .bind(&item.notes)
    .execute(pool)
    .await
    .map_err(|e| format!("insert failed: {}", e))?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/v1/hr/compliance",
    request_body = CreateCompliance,
    responses(
        (status = 201, description = "Compliance item created"),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Compliance"
)]
pub async fn create_compliance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCompliance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    match insert_item(pool.get_ref(), &payload).await {
        Ok(()) => Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Compliance item created",
            "status": "pending"
        }))),
        Err(msg) if msg.contains("not found") => {
            Ok(HttpResponse::NotFound().json(serde_json::json!({ "message": msg })))
        }
        Err(msg) => Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg }))),
    }
}

/// Bulk create. Continues past individual failures and reports them per item.
#[utoipa::path(
    post,
    path = "/api/v1/hr/compliance/bulk",
    request_body = BulkCreateCompliance,
    responses(
        (status = 200, description = "Per-item outcome", body = BulkCreateResult),
        (status = 400, description = "Empty batch")
    ),
    security(("bearer_auth" = [])),
    tag = "Compliance"
)]
pub async fn bulk_create_compliance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BulkCreateCompliance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.items.is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "items must not be empty"
        })));
    }

    let mut created = 0u32;
    let mut errors = Vec::new();

    for (index, item) in payload.items.iter().enumerate() {
        match insert_item(pool.get_ref(), item).await {
            Ok(()) => created += 1,
            Err(message) => errors.push(BulkItemError { index, message }),
        }
    }

    Ok(HttpResponse::Ok().json(BulkCreateResult {
        created,
        failed: errors.len() as u32,
        errors,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/hr/compliance",
    params(ComplianceQuery),
    responses((status = 200, body = ComplianceListResponse)),
    security(("bearer_auth" = [])),
    tag = "Compliance"
)]
pub async fn list_compliance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ComplianceQuery>,
) -> actix_web::Result<impl Responder> {
    let mut filter = SqlFilter::new();

    if auth.is_employee() {
        let own = auth.employee_id_required()?;
        filter.push("employee_id = ?", BindValue::U64(own));
    } else if let Some(emp_id) = query.employee_id {
        filter.push("employee_id = ?", BindValue::U64(emp_id));
    }

    if let Some(compliance_type) = &query.compliance_type {
        filter.push("compliance_type = ?", BindValue::Str(compliance_type.clone()));
    }
    if let Some(status) = &query.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(due_before) = query.due_before {
        filter.push("due_date <= ?", BindValue::Date(due_before));
    }

    let pagination = Pagination::from_params(query.page, query.per_page);

    let count_sql = format!(
        "SELECT COUNT(*) FROM compliance_items{}",
        filter.where_clause()
    );

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count compliance items");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM compliance_items{} ORDER BY due_date ASC, id ASC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let data = filter
        .bind_query_as(sqlx::query_as::<_, ComplianceItem>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch compliance list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(ComplianceListResponse {
        data,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/hr/compliance/{item_id}",
    params(("item_id", Path, description = "Compliance item ID")),
    responses((status = 200), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Compliance"
)]
pub async fn get_compliance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let item_id = path.into_inner();

    let item = sqlx::query_as::<_, ComplianceItem>("SELECT * FROM compliance_items WHERE id = ?")
        .bind(item_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, item_id, "Failed to fetch compliance item");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    match item {
        Some(i) => {
            auth.require_self_or_hr(i.employee_id)?;
            Ok(HttpResponse::Ok().json(i))
        }
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Compliance item not found"
        }))),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/hr/compliance/{item_id}",
    params(("item_id", Path, description = "Compliance item ID")),
    request_body = UpdateCompliance,
    responses(
        (status = 200, description = "Compliance item updated"),
        (status = 400, description = "Item is in a terminal state"),
        (status = 404, description = "Compliance item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Compliance"
)]
pub async fn update_compliance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateCompliance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let item_id = path.into_inner();

    let item = match sqlx::query_as::<_, ComplianceItem>(
        "SELECT * FROM compliance_items WHERE id = ?",
    )
    .bind(item_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, item_id, "Failed to fetch compliance item");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(i) => i,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Compliance item not found"
            })));
        }
    };

    let current: ComplianceStatus = item
        .status
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt compliance status"))?;

    if current.is_terminal() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Compliance item is in a terminal state"
        })));
    }

    // pending may only be reclassified as not_applicable here; completion
    // goes through /complete so the verifier is stamped
    if let Some(status) = body.status {
        if status != ComplianceStatus::NotApplicable {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Status may only be set to not_applicable; use /complete instead"
            })));
        }
    }

    sqlx::query(
        r#"
        UPDATE compliance_items
        SET title = COALESCE(?, title),
            due_date = COALESCE(?, due_date),
            expiry_date = COALESCE(?, expiry_date),
            notes = COALESCE(?, notes),
            status = COALESCE(?, status)
        WHERE id = ?
        "#,
    )
    .bind(&body.title)
    .bind(body.due_date)
    .bind(body.expiry_date)
    .bind(&body.notes)
    .bind(body.status.map(|s| s.as_ref().to_string()))
    .bind(item_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, item_id, "Failed to update compliance item");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Compliance item updated"
    })))
}

/// Mark an item completed, stamping the verifier and completion date.
#[utoipa::path(
    patch,
    path = "/api/v1/hr/compliance/{item_id}/complete",
    params(("item_id", Path, description = "Compliance item ID")),
    responses(
        (status = 200, description = "Compliance item completed"),
        (status = 400, description = "Item not pending"),
        (status = 404, description = "Compliance item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Compliance"
)]
pub async fn complete_compliance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let item_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE compliance_items
        SET status = 'completed', completed_date = CURDATE(), verified_by = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(auth.user_id)
    .bind(item_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, item_id, "Failed to complete compliance item");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Compliance item not found or not pending"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Compliance item completed"
    })))
}

/// Time-based sweep: completed items whose expiry date has passed flip to
/// expired. Idempotent; safe to trigger from a scheduler or by hand.
#[utoipa::path(
    post,
    path = "/api/v1/hr/compliance/sweep-expired",
    responses(
        (status = 200, description = "Sweep result", body = Object, example = json!({
            "message": "Sweep complete",
            "expired": 3
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Compliance"
)]
pub async fn sweep_expired(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let today = Utc::now().date_naive();

    let result = sqlx::query(
        r#"
        UPDATE compliance_items
        SET status = 'expired'
        WHERE status = 'completed' AND expiry_date IS NOT NULL AND expiry_date < ?
        "#,
    )
    .bind(today)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Compliance expiry sweep failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let expired = result.rows_affected();
    info!(expired, "Compliance expiry sweep complete");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Sweep complete",
        "expired": expired
    })))
}
