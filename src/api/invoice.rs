use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::domain::gst::{is_valid_gst_rate, is_valid_gstin, line_amount, line_tax, split_tax};
use crate::domain::payroll::round2;
use crate::model::invoice::{DocumentStatus, Invoice, InvoiceItem, InvoicePayment};
use crate::utils::docno_filter;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateInvoiceItem {
    #[schema(example = "Consulting hours")]
    pub description: String,
    #[schema(example = 10.0)]
    pub quantity: f64,
    #[schema(example = 1500.0)]
    pub rate: f64,
    #[schema(example = 18.0)]
    pub gst_rate: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateInvoice {
    #[schema(example = "INV-2026-0042")]
    pub invoice_no: String,
    #[schema(example = "Acme Traders")]
    pub customer_name: String,
    #[schema(example = "27AAPFU0939F1ZV")]
    pub customer_gstin: Option<String>,
    #[schema(example = "27")]
    pub customer_state_code: String,
    pub billing_address: Option<String>,
    #[schema(example = "2026-01-15", format = "date", value_type = String)]
    pub invoice_date: NaiveDate,
    #[schema(example = "2026-02-15", format = "date", value_type = String)]
    pub due_date: Option<NaiveDate>,
    #[schema(example = 0.0)]
    pub cess: Option<f64>,
    pub items: Vec<CreateInvoiceItem>,
}

impl CreateInvoice {
    fn validate(&self) -> Result<(), String> {
        if self.invoice_no.trim().is_empty() {
            return Err("invoice_no must not be empty".to_string());
        }
        if self.customer_name.trim().is_empty() {
            return Err("customer_name must not be empty".to_string());
        }
        if self.customer_state_code.len() != 2
            || !self.customer_state_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err("customer_state_code must be a two-digit GST state code".to_string());
        }
        if let Some(gstin) = &self.customer_gstin {
            if !is_valid_gstin(gstin) {
                return Err("customer_gstin is not a valid GSTIN".to_string());
            }
        }
        if let Some(due) = self.due_date {
            if due < self.invoice_date {
                return Err("due_date cannot be before invoice_date".to_string());
            }
        }
        if let Some(cess) = self.cess {
            if !(cess >= 0.0 && cess.is_finite()) {
                return Err("cess must be a non-negative amount".to_string());
            }
        }
        if self.items.is_empty() {
            return Err("invoice must have at least one line item".to_string());
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                return Err(format!("item {}: description must not be empty", i));
            }
            if !(item.quantity > 0.0 && item.quantity.is_finite()) {
                return Err(format!("item {}: quantity must be positive", i));
            }
            if !(item.rate >= 0.0 && item.rate.is_finite()) {
                return Err(format!("item {}: rate must be non-negative", i));
            }
            if !is_valid_gst_rate(item.gst_rate) {
                return Err(format!(
                    "item {}: gst_rate must be one of 0, 5, 12, 18, 28",
                    i
                ));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateInvoice {
    pub customer_name: Option<String>,
    pub customer_gstin: Option<String>,
    pub customer_state_code: Option<String>,
    pub billing_address: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub cess: Option<f64>,
    /// Replaces all line items when present; totals are recomputed.
    pub items: Option<Vec<CreateInvoiceItem>>,
}

#[derive(Deserialize, ToSchema)]
pub struct TransitionRequest {
    #[schema(example = "pending")]
    pub status: DocumentStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordPayment {
    #[schema(example = 5000.0)]
    pub amount: f64,
    #[schema(example = "bank_transfer")]
    pub mode: String,
    #[schema(example = "UTR-99182736")]
    pub reference: Option<String>,
    #[schema(example = "2026-02-01", format = "date", value_type = String)]
    pub paid_on: NaiveDate,
}

impl RecordPayment {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.amount > 0.0 && self.amount.is_finite()) {
            return Err("amount must be positive".to_string());
        }
        if self.mode.trim().is_empty() {
            return Err("mode must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct InvoiceQuery {
    pub status: Option<String>,
    /// Matches invoice_no, customer_name or customer_gstin
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct InvoiceListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Invoice>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct InvoiceDetail {
    #[schema(value_type = Object)]
    pub invoice: Invoice,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<InvoiceItem>,
    #[schema(value_type = Vec<Object>)]
    pub payments: Vec<InvoicePayment>,
}

struct ComputedLine {
    amount: f64,
    tax: f64,
}

struct ComputedTotals {
    lines: Vec<ComputedLine>,
    subtotal: f64,
    cgst: f64,
    sgst: f64,
    igst: f64,
    cess: f64,
    grand_total: f64,
}

/// Line amounts, tax split and totals are always derived here; client-sent
/// numbers are never trusted.
fn compute_totals(
    items: &[CreateInvoiceItem],
    customer_state: &str,
    company_state: &str,
    cess: f64,
) -> ComputedTotals {
    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal = 0.0;
    let mut total_tax = 0.0;

    for item in items {
        let amount = line_amount(item.quantity, item.rate);
        let tax = line_tax(amount, item.gst_rate);
        subtotal += amount;
        total_tax += tax;
        lines.push(ComputedLine { amount, tax });
    }

    let subtotal = round2(subtotal);
    let split = split_tax(round2(total_tax), customer_state, company_state);
    let cess = round2(cess);
    let grand_total = round2(subtotal + split.cgst + split.sgst + split.igst + cess);

    ComputedTotals {
        lines,
        subtotal,
        cgst: split.cgst,
        sgst: split.sgst,
        igst: split.igst,
        cess,
        grand_total,
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/invoices",
    request_body = CreateInvoice,
    responses(
        (status = 201, description = "Invoice created as draft"),
        (status = 400, description = "Validation failure or duplicate invoice number"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn create_invoice(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateInvoice>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    if let Err(msg) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    // Filter says "maybe": confirm against the table before rejecting, the
    // unique index stays authoritative either way.
    if docno_filter::might_exist(&payload.invoice_no) {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM invoices WHERE invoice_no = ? LIMIT 1)",
        )
        .bind(&payload.invoice_no)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Invoice number lookup failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

        if exists {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Invoice number already exists"
            })));
        }
    }

    let totals = compute_totals(
        &payload.items,
        &payload.customer_state_code,
        &config.company_state_code,
        payload.cess.unwrap_or(0.0),
    );

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let insert = sqlx::query(
        r#"
        INSERT INTO invoices
        (invoice_no, customer_name, customer_gstin, customer_state_code, billing_address,
         invoice_date, due_date, subtotal, cgst, sgst, igst, cess, grand_total,
         paid_total, status, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 'draft', ?)
        "#,
    )
    .bind(&payload.invoice_no)
    .bind(&payload.customer_name)
    .bind(&payload.customer_gstin)
    .bind(&payload.customer_state_code)
    .bind(&payload.billing_address)
    .bind(payload.invoice_date)
    .bind(payload.due_date)
    .bind(totals.subtotal)
    .bind(totals.cgst)
    .bind(totals.sgst)
    .bind(totals.igst)
    .bind(totals.cess)
    .bind(totals.grand_total)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await;

    let invoice_id = match insert {
        Ok(r) => r.last_insert_id(),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": "Invoice number already exists"
                    })));
                }
            }
            error!(error = %e, "Failed to insert invoice");
            return Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ));
        }
    };

    for (item, line) in payload.items.iter().zip(&totals.lines) {
        sqlx::query(
            r#"
            INSERT INTO invoice_items
            (invoice_id, description, quantity, rate, gst_rate, amount, tax)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(invoice_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.rate)
        .bind(item.gst_rate)
        .bind(line.amount)
        .bind(line.tax)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id, "Failed to insert invoice item");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, invoice_id, "Failed to commit invoice");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    docno_filter::insert(&payload.invoice_no);

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Invoice created",
        "invoice_id": invoice_id,
        "status": "draft",
        "grand_total": totals.grand_total
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/invoices",
    params(InvoiceQuery),
    responses((status = 200, body = InvoiceListResponse)),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn list_invoices(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<InvoiceQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let mut filter = SqlFilter::new();

    if let Some(status) = &query.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", search);
        filter.push_many(
            "(invoice_no LIKE ? OR customer_name LIKE ? OR customer_gstin LIKE ?)",
            vec![
                BindValue::Str(pattern.clone()),
                BindValue::Str(pattern.clone()),
                BindValue::Str(pattern),
            ],
        );
    }
    if let Some(from) = query.from {
        filter.push("invoice_date >= ?", BindValue::Date(from));
    }
    if let Some(to) = query.to {
        filter.push("invoice_date <= ?", BindValue::Date(to));
    }

    let pagination = Pagination::from_params(query.page, query.per_page);

    let count_sql = format!("SELECT COUNT(*) FROM invoices{}", filter.where_clause());

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count invoices");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM invoices{} ORDER BY invoice_date DESC, id DESC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let data = filter
        .bind_query_as(sqlx::query_as::<_, Invoice>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch invoice list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(InvoiceListResponse {
        data,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/invoices/{invoice_id}",
    params(("invoice_id", Path, description = "Invoice ID")),
    responses((status = 200, body = InvoiceDetail), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn get_invoice(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let invoice_id = path.into_inner();

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?")
        .bind(invoice_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id, "Failed to fetch invoice");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let invoice = match invoice {
        Some(i) => i,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Invoice not found"
            })));
        }
    };

    let items = sqlx::query_as::<_, InvoiceItem>(
        "SELECT * FROM invoice_items WHERE invoice_id = ? ORDER BY id ASC",
    )
    .bind(invoice_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, invoice_id, "Failed to fetch invoice items");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let payments = sqlx::query_as::<_, InvoicePayment>(
        "SELECT * FROM invoice_payments WHERE invoice_id = ? ORDER BY paid_on ASC, id ASC",
    )
    .bind(invoice_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, invoice_id, "Failed to fetch invoice payments");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(InvoiceDetail {
        invoice,
        items,
        payments,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/finance/invoices/{invoice_id}",
    params(("invoice_id", Path, description = "Invoice ID")),
    request_body = UpdateInvoice,
    responses(
        (status = 200, description = "Invoice updated"),
        (status = 400, description = "Invoice is not editable"),
        (status = 404, description = "Invoice not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn update_invoice(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<UpdateInvoice>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let invoice_id = path.into_inner();

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?")
        .bind(invoice_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id, "Failed to fetch invoice");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let invoice = match invoice {
        Some(i) => i,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Invoice not found"
            })));
        }
    };

    let current: DocumentStatus = invoice
        .status
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt invoice status"))?;

    if !current.is_editable() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Only draft invoices can be edited"
        })));
    }

    if let Some(gstin) = &body.customer_gstin {
        if !is_valid_gstin(gstin) {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "customer_gstin is not a valid GSTIN"
            })));
        }
    }

    let customer_state = body
        .customer_state_code
        .clone()
        .unwrap_or_else(|| invoice.customer_state_code.clone());
    if customer_state.len() != 2 || !customer_state.chars().all(|c| c.is_ascii_digit()) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "customer_state_code must be a two-digit GST state code"
        })));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // Replacing the items (or moving the place of supply) invalidates every
    // derived figure, so recompute from whichever item set ends up current.
    let recompute_items: Vec<CreateInvoiceItem> = match &body.items {
        Some(items) => {
            if items.is_empty() {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "message": "invoice must have at least one line item"
                })));
            }
            for (i, item) in items.iter().enumerate() {
                if !(item.quantity > 0.0 && item.quantity.is_finite()) {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": format!("item {}: quantity must be positive", i)
                    })));
                }
                if !(item.rate >= 0.0 && item.rate.is_finite()) {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": format!("item {}: rate must be non-negative", i)
                    })));
                }
                if !is_valid_gst_rate(item.gst_rate) {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": format!("item {}: gst_rate must be one of 0, 5, 12, 18, 28", i)
                    })));
                }
            }
            items
                .iter()
                .map(|i| CreateInvoiceItem {
                    description: i.description.clone(),
                    quantity: i.quantity,
                    rate: i.rate,
                    gst_rate: i.gst_rate,
                })
                .collect()
        }
        None => sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ? ORDER BY id ASC",
        )
        .bind(invoice_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id, "Failed to fetch invoice items");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .into_iter()
        .map(|i| CreateInvoiceItem {
            description: i.description,
            quantity: i.quantity,
            rate: i.rate,
            gst_rate: i.gst_rate,
        })
        .collect(),
    };

    let cess = body.cess.unwrap_or(invoice.cess);
    let totals = compute_totals(
        &recompute_items,
        &customer_state,
        &config.company_state_code,
        cess,
    );

    if body.items.is_some() {
        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?")
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id, "Failed to clear invoice items");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

        for (item, line) in recompute_items.iter().zip(&totals.lines) {
            sqlx::query(
                r#"
                INSERT INTO invoice_items
                (invoice_id, description, quantity, rate, gst_rate, amount, tax)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(invoice_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.rate)
            .bind(item.gst_rate)
            .bind(line.amount)
            .bind(line.tax)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, invoice_id, "Failed to insert invoice item");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;
        }
    }

    sqlx::query(
        r#"
        UPDATE invoices
        SET customer_name = COALESCE(?, customer_name),
            customer_gstin = COALESCE(?, customer_gstin),
            customer_state_code = ?,
            billing_address = COALESCE(?, billing_address),
            invoice_date = COALESCE(?, invoice_date),
            due_date = COALESCE(?, due_date),
            subtotal = ?, cgst = ?, sgst = ?, igst = ?, cess = ?, grand_total = ?
        WHERE id = ? AND status = 'draft'
        "#,
    )
    .bind(&body.customer_name)
    .bind(&body.customer_gstin)
    .bind(&customer_state)
    .bind(&body.billing_address)
    .bind(body.invoice_date)
    .bind(body.due_date)
    .bind(totals.subtotal)
    .bind(totals.cgst)
    .bind(totals.sgst)
    .bind(totals.igst)
    .bind(totals.cess)
    .bind(totals.grand_total)
    .bind(invoice_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, invoice_id, "Failed to update invoice");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, invoice_id, "Failed to commit invoice update");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Invoice updated",
        "grand_total": totals.grand_total
    })))
}

/// Move an invoice along its lifecycle. Illegal jumps are rejected.
#[utoipa::path(
    patch,
    path = "/api/v1/finance/invoices/{invoice_id}/status",
    params(("invoice_id", Path, description = "Invoice ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status changed"),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Invoice not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn transition_invoice(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<TransitionRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let invoice_id = path.into_inner();
    let next = body.status;

    let current_str = sqlx::query_scalar::<_, String>("SELECT status FROM invoices WHERE id = ?")
        .bind(invoice_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id, "Failed to fetch invoice status");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let current_str = match current_str {
        Some(s) => s,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Invoice not found"
            })));
        }
    };

    let current: DocumentStatus = current_str
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt invoice status"))?;

    if !current.can_transition_to(next) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("Cannot move invoice from {} to {}", current, next)
        })));
    }

    // Guard on the status we read so a concurrent transition loses cleanly.
    let result = sqlx::query("UPDATE invoices SET status = ? WHERE id = ? AND status = ?")
        .bind(next.as_ref())
        .bind(invoice_id)
        .bind(current.as_ref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id, "Failed to transition invoice");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Invoice status changed concurrently, retry"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Status changed",
        "status": next.as_ref()
    })))
}

/// Record a payment. The invoice flips to paid once receipts cover the
/// grand total.
#[utoipa::path(
    post,
    path = "/api/v1/finance/invoices/{invoice_id}/payments",
    params(("invoice_id", Path, description = "Invoice ID")),
    request_body = RecordPayment,
    responses(
        (status = 201, description = "Payment recorded"),
        (status = 400, description = "Invoice does not accept payments"),
        (status = 404, description = "Invoice not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Invoices"
)]
pub async fn add_invoice_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<RecordPayment>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let invoice_id = path.into_inner();

    if let Err(msg) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ? FOR UPDATE")
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id, "Failed to fetch invoice");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let invoice = match invoice {
        Some(i) => i,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Invoice not found"
            })));
        }
    };

    let current: DocumentStatus = invoice
        .status
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt invoice status"))?;

    if !current.accepts_payments() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Invoice does not accept payments in its current status"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO invoice_payments (invoice_id, amount, mode, reference, paid_on)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(invoice_id)
    .bind(body.amount)
    .bind(&body.mode)
    .bind(&body.reference)
    .bind(body.paid_on)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, invoice_id, "Failed to insert invoice payment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let paid_total = round2(invoice.paid_total + body.amount);
    let settled = paid_total >= invoice.grand_total;

    let new_status = if settled {
        DocumentStatus::Paid
    } else {
        current
    };

    sqlx::query("UPDATE invoices SET paid_total = ?, status = ? WHERE id = ?")
        .bind(paid_total)
        .bind(new_status.as_ref())
        .bind(invoice_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, invoice_id, "Failed to update invoice paid total");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, invoice_id, "Failed to commit payment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Payment recorded",
        "paid_total": paid_total,
        "status": new_status.as_ref()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<CreateInvoiceItem> {
        vec![
            CreateInvoiceItem {
                description: "Widget".to_string(),
                quantity: 2.0,
                rate: 500.0,
                gst_rate: 18.0,
            },
            CreateInvoiceItem {
                description: "Gadget".to_string(),
                quantity: 1.0,
                rate: 1000.0,
                gst_rate: 5.0,
            },
        ]
    }

    #[test]
    fn totals_split_intra_state() {
        let t = compute_totals(&items(), "27", "27", 0.0);
        assert_eq!(t.subtotal, 2000.0);
        // 180 + 50 tax, split evenly
        assert_eq!(t.cgst, 115.0);
        assert_eq!(t.sgst, 115.0);
        assert_eq!(t.igst, 0.0);
        assert_eq!(t.grand_total, 2230.0);
    }

    #[test]
    fn totals_go_to_igst_inter_state() {
        let t = compute_totals(&items(), "29", "27", 0.0);
        assert_eq!(t.cgst, 0.0);
        assert_eq!(t.sgst, 0.0);
        assert_eq!(t.igst, 230.0);
        assert_eq!(t.grand_total, 2230.0);
    }

    #[test]
    fn cess_is_added_on_top() {
        let t = compute_totals(&items(), "27", "27", 100.0);
        assert_eq!(t.grand_total, 2330.0);
    }

    #[test]
    fn create_rejects_bad_slab_and_empty_items() {
        let mut req = CreateInvoice {
            invoice_no: "INV-1".to_string(),
            customer_name: "Acme".to_string(),
            customer_gstin: None,
            customer_state_code: "27".to_string(),
            billing_address: None,
            invoice_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            due_date: None,
            cess: None,
            items: vec![],
        };
        assert!(req.validate().is_err());

        req.items = items();
        req.items[0].gst_rate = 10.0;
        assert!(req.validate().is_err());

        req.items[0].gst_rate = 18.0;
        assert!(req.validate().is_ok());
    }
}
