use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::domain::export::{
    build_csv, build_html_table, content_type, file_extension, is_downloadable,
    retention_deadline,
};
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::model::attendance::Attendance;
use crate::model::bill::Bill;
use crate::model::export_job::{ExportFormat, ExportJob, ExportSource, ExportStatus};
use crate::model::invoice::Invoice;
use crate::model::payroll::Payroll;
use crate::model::role::Role;
use actix_web::http::header;
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use std::path::Path;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, Default, Clone, ToSchema)]
pub struct ExportFilters {
    pub status: Option<String>,
    #[schema(format = "date", value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    #[schema(format = "date", value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    #[schema(example = "2026-01")]
    pub pay_period: Option<String>,
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateExport {
    #[schema(example = "csv")]
    pub format: ExportFormat,
    #[schema(example = "invoices")]
    pub source: ExportSource,
    pub filters: Option<ExportFilters>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ExportQuery {
    pub status: Option<String>,
    pub source: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ExportListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<ExportJob>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

struct Extracted {
    headers: &'static [&'static str],
    rows: Vec<Vec<String>>,
}

fn opt<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(|x| x.to_string()).unwrap_or_default()
}

async fn fetch_invoice_rows(pool: &MySqlPool, filters: &ExportFilters) -> sqlx::Result<Extracted> {
    let mut filter = SqlFilter::new();
    if let Some(status) = &filters.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(from) = filters.from {
        filter.push("invoice_date >= ?", BindValue::Date(from));
    }
    if let Some(to) = filters.to {
        filter.push("invoice_date <= ?", BindValue::Date(to));
    }

    let sql = format!(
        "SELECT * FROM invoices{} ORDER BY invoice_date ASC, id ASC",
        filter.where_clause()
    );
    let rows = filter
        .bind_query_as(sqlx::query_as::<_, Invoice>(&sql))
        .fetch_all(pool)
        .await?;

    Ok(Extracted {
        headers: &[
            "invoice_no",
            "customer_name",
            "customer_gstin",
            "invoice_date",
            "status",
            "subtotal",
            "cgst",
            "sgst",
            "igst",
            "cess",
            "grand_total",
            "paid_total",
        ],
        rows: rows
            .into_iter()
            .map(|i| {
                vec![
                    i.invoice_no,
                    i.customer_name,
                    opt(&i.customer_gstin),
                    i.invoice_date.to_string(),
                    i.status,
                    i.subtotal.to_string(),
                    i.cgst.to_string(),
                    i.sgst.to_string(),
                    i.igst.to_string(),
                    i.cess.to_string(),
                    i.grand_total.to_string(),
                    i.paid_total.to_string(),
                ]
            })
            .collect(),
    })
}

async fn fetch_bill_rows(pool: &MySqlPool, filters: &ExportFilters) -> sqlx::Result<Extracted> {
    let mut filter = SqlFilter::new();
    if let Some(status) = &filters.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(from) = filters.from {
        filter.push("bill_date >= ?", BindValue::Date(from));
    }
    if let Some(to) = filters.to {
        filter.push("bill_date <= ?", BindValue::Date(to));
    }

    let sql = format!(
        "SELECT * FROM bills{} ORDER BY bill_date ASC, id ASC",
        filter.where_clause()
    );
    let rows = filter
        .bind_query_as(sqlx::query_as::<_, Bill>(&sql))
        .fetch_all(pool)
        .await?;

    Ok(Extracted {
        headers: &[
            "bill_no",
            "vendor_name",
            "vendor_gstin",
            "bill_date",
            "status",
            "subtotal",
            "cgst",
            "sgst",
            "igst",
            "cess",
            "grand_total",
            "paid_total",
        ],
        rows: rows
            .into_iter()
            .map(|b| {
                vec![
                    b.bill_no,
                    b.vendor_name,
                    opt(&b.vendor_gstin),
                    b.bill_date.to_string(),
                    b.status,
                    b.subtotal.to_string(),
                    b.cgst.to_string(),
                    b.sgst.to_string(),
                    b.igst.to_string(),
                    b.cess.to_string(),
                    b.grand_total.to_string(),
                    b.paid_total.to_string(),
                ]
            })
            .collect(),
    })
}

async fn fetch_payroll_rows(pool: &MySqlPool, filters: &ExportFilters) -> sqlx::Result<Extracted> {
    let mut filter = SqlFilter::new();
    if let Some(status) = &filters.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(period) = &filters.pay_period {
        filter.push("pay_period = ?", BindValue::Str(period.clone()));
    }
    if let Some(emp_id) = filters.employee_id {
        filter.push("employee_id = ?", BindValue::U64(emp_id));
    }

    let sql = format!(
        "SELECT * FROM payroll{} ORDER BY pay_period ASC, employee_id ASC",
        filter.where_clause()
    );
    let rows = filter
        .bind_query_as(sqlx::query_as::<_, Payroll>(&sql))
        .fetch_all(pool)
        .await?;

    Ok(Extracted {
        headers: &[
            "employee_id",
            "pay_period",
            "status",
            "basic_salary",
            "gross_salary",
            "net_salary",
        ],
        rows: rows
            .into_iter()
            .map(|p| {
                vec![
                    p.employee_id.to_string(),
                    p.pay_period,
                    p.status,
                    p.basic_salary.to_string(),
                    p.gross_salary.to_string(),
                    p.net_salary.to_string(),
                ]
            })
            .collect(),
    })
}

async fn fetch_attendance_rows(
    pool: &MySqlPool,
    filters: &ExportFilters,
) -> sqlx::Result<Extracted> {
    let mut filter = SqlFilter::new();
    if let Some(status) = &filters.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(from) = filters.from {
        filter.push("date >= ?", BindValue::Date(from));
    }
    if let Some(to) = filters.to {
        filter.push("date <= ?", BindValue::Date(to));
    }
    if let Some(emp_id) = filters.employee_id {
        filter.push("employee_id = ?", BindValue::U64(emp_id));
    }

    let sql = format!(
        "SELECT * FROM attendance{} ORDER BY date ASC, employee_id ASC",
        filter.where_clause()
    );
    let rows = filter
        .bind_query_as(sqlx::query_as::<_, Attendance>(&sql))
        .fetch_all(pool)
        .await?;

    Ok(Extracted {
        headers: &[
            "employee_id",
            "date",
            "status",
            "check_in",
            "check_out",
            "hours_worked",
            "overtime_hours",
        ],
        rows: rows
            .into_iter()
            .map(|a| {
                vec![
                    a.employee_id.to_string(),
                    a.date.to_string(),
                    a.status,
                    opt(&a.check_in),
                    opt(&a.check_out),
                    opt(&a.hours_worked),
                    opt(&a.overtime_hours),
                ]
            })
            .collect(),
    })
}

fn render(format: ExportFormat, source: ExportSource, extracted: &Extracted) -> String {
    match format {
        ExportFormat::Csv => build_csv(extracted.headers, &extracted.rows),
        // Spreadsheet apps import HTML tables; a native xlsx writer can
        // replace this rendition without touching the job plumbing.
        ExportFormat::Xlsx | ExportFormat::Html => build_html_table(
            &format!("{} export", source),
            extracted.headers,
            &extracted.rows,
        ),
    }
}

/// Create an export job. Processing happens inline before the response
/// returns, so the job comes back completed or failed.
#[utoipa::path(
    post,
    path = "/api/v1/finance/exports",
    request_body = CreateExport,
    responses(
        (status = 201, description = "Export job processed", body = Object, example = json!({
            "message": "Export completed",
            "job_id": 7,
            "status": "completed",
            "total_rows": 120
        })),
        (status = 400), (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Exports"
)]
pub async fn create_export(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateExport>,
) -> actix_web::Result<impl Responder> {
    match payload.source {
        ExportSource::Payroll | ExportSource::Attendance => auth.require_hr_or_admin()?,
        ExportSource::Invoices | ExportSource::Bills => auth.require_manager_or_above()?,
    }

    let filters = payload.filters.clone().unwrap_or_default();
    let filters_json = serde_json::to_string(&filters).map_err(|e| {
        error!(error = %e, "Failed to serialize export filters");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let insert = sqlx::query(
        r#"
        INSERT INTO export_jobs (format, source, filters, status, requested_by)
        VALUES (?, ?, ?, 'pending', ?)
        "#,
    )
    .bind(payload.format.as_ref())
    .bind(payload.source.as_ref())
    .bind(&filters_json)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert export job");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let job_id = insert.last_insert_id();

    sqlx::query("UPDATE export_jobs SET status = 'processing' WHERE id = ?")
        .bind(job_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, job_id, "Failed to mark export processing");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let extracted = match payload.source {
        ExportSource::Invoices => fetch_invoice_rows(pool.get_ref(), &filters).await,
        ExportSource::Bills => fetch_bill_rows(pool.get_ref(), &filters).await,
        ExportSource::Payroll => fetch_payroll_rows(pool.get_ref(), &filters).await,
        ExportSource::Attendance => fetch_attendance_rows(pool.get_ref(), &filters).await,
    };

    let extracted = match extracted {
        Ok(e) => e,
        Err(e) => {
            error!(error = %e, job_id, "Export source query failed");
            fail_job(pool.get_ref(), job_id, "source query failed").await;
            return Ok(HttpResponse::Created().json(serde_json::json!({
                "message": "Export failed",
                "job_id": job_id,
                "status": "failed"
            })));
        }
    };

    let content = render(payload.format, payload.source, &extracted);

    let dir = Path::new(&config.uploads_dir).join("exports");
    let file_name = format!("export_{}.{}", job_id, file_extension(payload.format));
    let file_path = dir.join(&file_name);

    let write_result = std::fs::create_dir_all(&dir)
        .and_then(|_| std::fs::write(&file_path, content.as_bytes()));

    if let Err(e) = write_result {
        error!(error = %e, job_id, "Failed to write export artifact");
        fail_job(pool.get_ref(), job_id, "artifact write failed").await;
        return Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Export failed",
            "job_id": job_id,
            "status": "failed"
        })));
    }

    let total_rows = extracted.rows.len() as u32;
    let file_size = content.len() as u64;
    let expires_at = retention_deadline(Utc::now());

    sqlx::query(
        r#"
        UPDATE export_jobs
        SET status = 'completed', total_rows = ?, written_rows = ?,
            file_path = ?, file_size = ?, expires_at = ?
        WHERE id = ?
        "#,
    )
    .bind(total_rows)
    .bind(total_rows)
    .bind(file_path.to_string_lossy().as_ref())
    .bind(file_size)
    .bind(expires_at)
    .bind(job_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, job_id, "Failed to mark export completed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    info!(job_id, total_rows, file_size, "Export completed");

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Export completed",
        "job_id": job_id,
        "status": "completed",
        "total_rows": total_rows
    })))
}

async fn fail_job(pool: &MySqlPool, job_id: u64, message: &str) {
    if let Err(e) = sqlx::query(
        "UPDATE export_jobs SET status = 'failed', error_message = ? WHERE id = ?",
    )
    .bind(message)
    .bind(job_id)
    .execute(pool)
    .await
    {
        error!(error = %e, job_id, "Failed to mark export failed");
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/exports",
    params(ExportQuery),
    responses((status = 200, body = ExportListResponse)),
    security(("bearer_auth" = [])),
    tag = "Exports"
)]
pub async fn list_exports(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ExportQuery>,
) -> actix_web::Result<impl Responder> {
    let mut filter = SqlFilter::new();

    // Non-HR users see only their own jobs
    if !matches!(auth.role, Role::Admin | Role::Hr) {
        filter.push("requested_by = ?", BindValue::U64(auth.user_id));
    }
    if let Some(status) = &query.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(source) = &query.source {
        filter.push("source = ?", BindValue::Str(source.clone()));
    }

    let pagination = Pagination::from_params(query.page, query.per_page);

    let count_sql = format!("SELECT COUNT(*) FROM export_jobs{}", filter.where_clause());

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count export jobs");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM export_jobs{} ORDER BY id DESC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let data = filter
        .bind_query_as(sqlx::query_as::<_, ExportJob>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch export jobs");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(ExportListResponse {
        data,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

async fn load_job(
    pool: &MySqlPool,
    job_id: u64,
) -> actix_web::Result<Option<ExportJob>> {
    sqlx::query_as::<_, ExportJob>("SELECT * FROM export_jobs WHERE id = ?")
        .bind(job_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, job_id, "Failed to fetch export job");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/exports/{job_id}",
    params(("job_id", Path, description = "Export job ID")),
    responses((status = 200), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Exports"
)]
pub async fn get_export(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let job_id = path.into_inner();

    let job = match load_job(pool.get_ref(), job_id).await? {
        Some(j) => j,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Export job not found"
            })));
        }
    };

    if job.requested_by != auth.user_id {
        auth.require_hr_or_admin()?;
    }

    Ok(HttpResponse::Ok().json(job))
}

/// Stream the artifact back. Each download bumps the counter.
#[utoipa::path(
    get,
    path = "/api/v1/finance/exports/{job_id}/download",
    params(("job_id", Path, description = "Export job ID")),
    responses(
        (status = 200, description = "Artifact bytes"),
        (status = 404, description = "Job not found"),
        (status = 410, description = "Artifact expired or unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Exports"
)]
pub async fn download_export(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let job_id = path.into_inner();

    let job = match load_job(pool.get_ref(), job_id).await? {
        Some(j) => j,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Export job not found"
            })));
        }
    };

    if job.requested_by != auth.user_id {
        auth.require_hr_or_admin()?;
    }

    let status: ExportStatus = job
        .status
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt export status"))?;
    let format: ExportFormat = job
        .format
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt export format"))?;

    if !is_downloadable(status, job.file_path.is_some(), job.expires_at, Utc::now()) {
        return Ok(HttpResponse::Gone().json(serde_json::json!({
            "message": "Export artifact has expired or is not available"
        })));
    }

    // checked above
    let file_path = job
        .file_path
        .as_deref()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Missing file path"))?;

    let bytes = match std::fs::read(file_path) {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, job_id, file_path, "Export artifact missing on disk");
            return Ok(HttpResponse::Gone().json(serde_json::json!({
                "message": "Export artifact has expired or is not available"
            })));
        }
    };

    sqlx::query("UPDATE export_jobs SET download_count = download_count + 1 WHERE id = ?")
        .bind(job_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, job_id, "Failed to bump download counter");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let file_name = Path::new(file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("export_{}", job_id));

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type(format)))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ))
        .body(bytes))
}

/// Cancel a job that has not started processing.
#[utoipa::path(
    patch,
    path = "/api/v1/finance/exports/{job_id}/cancel",
    params(("job_id", Path, description = "Export job ID")),
    responses(
        (status = 200, description = "Job cancelled"),
        (status = 400, description = "Job already started or finished"),
        (status = 404, description = "Job not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Exports"
)]
pub async fn cancel_export(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let job_id = path.into_inner();

    let job = match load_job(pool.get_ref(), job_id).await? {
        Some(j) => j,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Export job not found"
            })));
        }
    };

    if job.requested_by != auth.user_id {
        auth.require_hr_or_admin()?;
    }

    let result = sqlx::query(
        "UPDATE export_jobs SET status = 'cancelled' WHERE id = ? AND status = 'pending'",
    )
    .bind(job_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, job_id, "Failed to cancel export job");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Job already started or finished"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Job cancelled"
    })))
}
