use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::domain::gst::{is_valid_gst_rate, is_valid_gstin, line_amount, line_tax, split_tax};
use crate::domain::payroll::round2;
use crate::model::bill::{Bill, BillItem, BillPayment};
use crate::model::invoice::DocumentStatus;
use crate::utils::docno_filter;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

use super::invoice::{RecordPayment, TransitionRequest};

#[derive(Deserialize, ToSchema)]
pub struct CreateBillItem {
    #[schema(example = "Raw material")]
    pub description: String,
    #[schema(example = 50.0)]
    pub quantity: f64,
    #[schema(example = 120.0)]
    pub rate: f64,
    #[schema(example = 12.0)]
    pub gst_rate: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBill {
    #[schema(example = "BILL-2026-0017")]
    pub bill_no: String,
    #[schema(example = "Sharma Supplies")]
    pub vendor_name: String,
    #[schema(example = "29AAPFU0939F1ZV")]
    pub vendor_gstin: Option<String>,
    #[schema(example = "29")]
    pub vendor_state_code: String,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub bill_date: NaiveDate,
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub due_date: Option<NaiveDate>,
    #[schema(example = 0.0)]
    pub cess: Option<f64>,
    pub items: Vec<CreateBillItem>,
}

fn validate_items(items: &[CreateBillItem]) -> Result<(), String> {
    if items.is_empty() {
        return Err("bill must have at least one line item".to_string());
    }
    for (i, item) in items.iter().enumerate() {
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

impl CreateBill {
    fn validate(&self) -> Result<(), String> {
        if self.bill_no.trim().is_empty() {
            return Err("bill_no must not be empty".to_string());
        }
        if self.vendor_name.trim().is_empty() {
            return Err("vendor_name must not be empty".to_string());
        }
        if self.vendor_state_code.len() != 2
            || !self.vendor_state_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err("vendor_state_code must be a two-digit GST state code".to_string());
        }
        if let Some(gstin) = &self.vendor_gstin {
            if !is_valid_gstin(gstin) {
                return Err("vendor_gstin is not a valid GSTIN".to_string());
            }
        }
        if let Some(due) = self.due_date {
            if due < self.bill_date {
                return Err("due_date cannot be before bill_date".to_string());
            }
        }
        if let Some(cess) = self.cess {
            if !(cess >= 0.0 && cess.is_finite()) {
                return Err("cess must be a non-negative amount".to_string());
            }
        }
        validate_items(&self.items)
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateBill {
    pub vendor_name: Option<String>,
    pub vendor_gstin: Option<String>,
    pub vendor_state_code: Option<String>,
    pub bill_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub cess: Option<f64>,
    /// Replaces all line items when present; totals are recomputed.
    pub items: Option<Vec<CreateBillItem>>,
}

struct BillTotals {
    /// (amount, tax) per line, in item order
    lines: Vec<(f64, f64)>,
    subtotal: f64,
    cgst: f64,
    sgst: f64,
    igst: f64,
    cess: f64,
    grand_total: f64,
}

// Purchase-side GST mirrors the sales side: the vendor's state decides
// whether tax splits into CGST/SGST or books as IGST.
fn compute_totals(
    items: &[CreateBillItem],
    vendor_state: &str,
    company_state: &str,
    cess: f64,
) -> BillTotals {
    let mut subtotal = 0.0;
    let mut total_tax = 0.0;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let amount = line_amount(item.quantity, item.rate);
        let tax = line_tax(amount, item.gst_rate);
        subtotal += amount;
        total_tax += tax;
        lines.push((amount, tax));
    }
    let subtotal = round2(subtotal);
    let split = split_tax(round2(total_tax), vendor_state, company_state);
    let cess = round2(cess);
    let grand_total = round2(subtotal + split.cgst + split.sgst + split.igst + cess);

    BillTotals {
        lines,
        subtotal,
        cgst: split.cgst,
        sgst: split.sgst,
        igst: split.igst,
        cess,
        grand_total,
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BillQuery {
    pub status: Option<String>,
    /// Matches bill_no, vendor_name or vendor_gstin
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct BillListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Bill>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct BillDetail {
    #[schema(value_type = Object)]
    pub bill: Bill,
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<BillItem>,
    #[schema(value_type = Vec<Object>)]
    pub payments: Vec<BillPayment>,
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/bills",
    request_body = CreateBill,
    responses(
        (status = 201, description = "Bill created as draft"),
        (status = 400, description = "Validation failure or duplicate bill number"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn create_bill(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateBill>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    if let Err(msg) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    if docno_filter::might_exist(&payload.bill_no) {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bills WHERE bill_no = ? LIMIT 1)",
        )
        .bind(&payload.bill_no)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Bill number lookup failed");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

        if exists {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Bill number already exists"
            })));
        }
    }

    let totals = compute_totals(
        &payload.items,
        &payload.vendor_state_code,
        &config.company_state_code,
        payload.cess.unwrap_or(0.0),
    );

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let insert = sqlx::query(
        r#"
        INSERT INTO bills
        (bill_no, vendor_name, vendor_gstin, vendor_state_code, bill_date, due_date,
         subtotal, cgst, sgst, igst, cess, grand_total, paid_total, status, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 'draft', ?)
        "#,
    )
    .bind(&payload.bill_no)
    .bind(&payload.vendor_name)
    .bind(&payload.vendor_gstin)
    .bind(&payload.vendor_state_code)
    .bind(payload.bill_date)
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

    let bill_id = match insert {
        Ok(r) => r.last_insert_id(),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": "Bill number already exists"
                    })));
                }
            }
            error!(error = %e, "Failed to insert bill");
            return Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ));
        }
    };

    for (item, (amount, tax)) in payload.items.iter().zip(&totals.lines) {
        sqlx::query(
            r#"
            INSERT INTO bill_items
            (bill_id, description, quantity, rate, gst_rate, amount, tax)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(bill_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.rate)
        .bind(item.gst_rate)
        .bind(amount)
        .bind(tax)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, bill_id, "Failed to insert bill item");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, bill_id, "Failed to commit bill");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    docno_filter::insert(&payload.bill_no);

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Bill created",
        "bill_id": bill_id,
        "status": "draft",
        "grand_total": totals.grand_total
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/bills",
    params(BillQuery),
    responses((status = 200, body = BillListResponse)),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn list_bills(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<BillQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let mut filter = SqlFilter::new();

    if let Some(status) = &query.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(search) = &query.search {
        let pattern = format!("%{}%", search);
        filter.push_many(
            "(bill_no LIKE ? OR vendor_name LIKE ? OR vendor_gstin LIKE ?)",
            vec![
                BindValue::Str(pattern.clone()),
                BindValue::Str(pattern.clone()),
                BindValue::Str(pattern),
            ],
        );
    }
    if let Some(from) = query.from {
        filter.push("bill_date >= ?", BindValue::Date(from));
    }
    if let Some(to) = query.to {
        filter.push("bill_date <= ?", BindValue::Date(to));
    }

    let pagination = Pagination::from_params(query.page, query.per_page);

    let count_sql = format!("SELECT COUNT(*) FROM bills{}", filter.where_clause());

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count bills");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM bills{} ORDER BY bill_date DESC, id DESC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let data = filter
        .bind_query_as(sqlx::query_as::<_, Bill>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch bill list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(BillListResponse {
        data,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/bills/{bill_id}",
    params(("bill_id", Path, description = "Bill ID")),
    responses((status = 200, body = BillDetail), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn get_bill(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let bill_id = path.into_inner();

    let bill = sqlx::query_as::<_, Bill>("SELECT * FROM bills WHERE id = ?")
        .bind(bill_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, bill_id, "Failed to fetch bill");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let bill = match bill {
        Some(b) => b,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Bill not found"
            })));
        }
    };

    let items =
        sqlx::query_as::<_, BillItem>("SELECT * FROM bill_items WHERE bill_id = ? ORDER BY id ASC")
            .bind(bill_id)
            .fetch_all(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, bill_id, "Failed to fetch bill items");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

    let payments = sqlx::query_as::<_, BillPayment>(
        "SELECT * FROM bill_payments WHERE bill_id = ? ORDER BY paid_on ASC, id ASC",
    )
    .bind(bill_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, bill_id, "Failed to fetch bill payments");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(BillDetail {
        bill,
        items,
        payments,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/finance/bills/{bill_id}",
    params(("bill_id", Path, description = "Bill ID")),
    request_body = UpdateBill,
    responses(
        (status = 200, description = "Bill updated"),
        (status = 400, description = "Bill is not editable"),
        (status = 404, description = "Bill not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn update_bill(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    body: web::Json<UpdateBill>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let bill_id = path.into_inner();

    let bill = sqlx::query_as::<_, Bill>("SELECT * FROM bills WHERE id = ?")
        .bind(bill_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, bill_id, "Failed to fetch bill");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let bill = match bill {
        Some(b) => b,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Bill not found"
            })));
        }
    };

    let current: DocumentStatus = bill
        .status
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt bill status"))?;

    if !current.is_editable() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Only draft bills can be edited"
        })));
    }

    if let Some(gstin) = &body.vendor_gstin {
        if !is_valid_gstin(gstin) {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "vendor_gstin is not a valid GSTIN"
            })));
        }
    }

    let vendor_state = body
        .vendor_state_code
        .clone()
        .unwrap_or_else(|| bill.vendor_state_code.clone());
    if vendor_state.len() != 2 || !vendor_state.chars().all(|c| c.is_ascii_digit()) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "vendor_state_code must be a two-digit GST state code"
        })));
    }

    if let Some(items) = &body.items {
        if let Err(msg) = validate_items(items) {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
        }
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    // Replacing the items (or moving the vendor's state) invalidates every
    // derived figure, so recompute from whichever item set ends up current.
    let recompute_items: Vec<CreateBillItem> = match &body.items {
        Some(items) => items
            .iter()
            .map(|i| CreateBillItem {
                description: i.description.clone(),
                quantity: i.quantity,
                rate: i.rate,
                gst_rate: i.gst_rate,
            })
            .collect(),
        None => sqlx::query_as::<_, BillItem>(
            "SELECT * FROM bill_items WHERE bill_id = ? ORDER BY id ASC",
        )
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, bill_id, "Failed to fetch bill items");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?
        .into_iter()
        .map(|i| CreateBillItem {
            description: i.description,
            quantity: i.quantity,
            rate: i.rate,
            gst_rate: i.gst_rate,
        })
        .collect(),
    };

    let cess = body.cess.unwrap_or(bill.cess);
    let totals = compute_totals(
        &recompute_items,
        &vendor_state,
        &config.company_state_code,
        cess,
    );

    if body.items.is_some() {
        sqlx::query("DELETE FROM bill_items WHERE bill_id = ?")
            .bind(bill_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, bill_id, "Failed to clear bill items");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

        for (item, (amount, tax)) in recompute_items.iter().zip(&totals.lines) {
            sqlx::query(
                r#"
                INSERT INTO bill_items
                (bill_id, description, quantity, rate, gst_rate, amount, tax)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(bill_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.rate)
            .bind(item.gst_rate)
            .bind(amount)
            .bind(tax)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, bill_id, "Failed to insert bill item");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;
        }
    }

    sqlx::query(
        r#"
        UPDATE bills
        SET vendor_name = COALESCE(?, vendor_name),
            vendor_gstin = COALESCE(?, vendor_gstin),
            vendor_state_code = ?,
            bill_date = COALESCE(?, bill_date),
            due_date = COALESCE(?, due_date),
            subtotal = ?, cgst = ?, sgst = ?, igst = ?, cess = ?, grand_total = ?
        WHERE id = ? AND status = 'draft'
        "#,
    )
    .bind(&body.vendor_name)
    .bind(&body.vendor_gstin)
    .bind(&vendor_state)
    .bind(body.bill_date)
    .bind(body.due_date)
    .bind(totals.subtotal)
    .bind(totals.cgst)
    .bind(totals.sgst)
    .bind(totals.igst)
    .bind(totals.cess)
    .bind(totals.grand_total)
    .bind(bill_id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, bill_id, "Failed to update bill");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, bill_id, "Failed to commit bill update");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Bill updated",
        "grand_total": totals.grand_total
    })))
}

/// Move a bill along its lifecycle. Same state machine as invoices.
#[utoipa::path(
    patch,
    path = "/api/v1/finance/bills/{bill_id}/status",
    params(("bill_id", Path, description = "Bill ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status changed"),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Bill not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn transition_bill(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<TransitionRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let bill_id = path.into_inner();
    let next = body.status;

    let current_str = sqlx::query_scalar::<_, String>("SELECT status FROM bills WHERE id = ?")
        .bind(bill_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, bill_id, "Failed to fetch bill status");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let current_str = match current_str {
        Some(s) => s,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Bill not found"
            })));
        }
    };

    let current: DocumentStatus = current_str
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt bill status"))?;

    if !current.can_transition_to(next) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": format!("Cannot move bill from {} to {}", current, next)
        })));
    }

    let result = sqlx::query("UPDATE bills SET status = ? WHERE id = ? AND status = ?")
        .bind(next.as_ref())
        .bind(bill_id)
        .bind(current.as_ref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, bill_id, "Failed to transition bill");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Bill status changed concurrently, retry"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Status changed",
        "status": next.as_ref()
    })))
}

/// Record a payment against a bill; flips to paid once settled.
#[utoipa::path(
    post,
    path = "/api/v1/finance/bills/{bill_id}/payments",
    params(("bill_id", Path, description = "Bill ID")),
    request_body = RecordPayment,
    responses(
        (status = 201, description = "Payment recorded"),
        (status = 400, description = "Bill does not accept payments"),
        (status = 404, description = "Bill not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Bills"
)]
pub async fn add_bill_payment(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<RecordPayment>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let bill_id = path.into_inner();

    if let Err(msg) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let bill = sqlx::query_as::<_, Bill>("SELECT * FROM bills WHERE id = ? FOR UPDATE")
        .bind(bill_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, bill_id, "Failed to fetch bill");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let bill = match bill {
        Some(b) => b,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Bill not found"
            })));
        }
    };

    let current: DocumentStatus = bill
        .status
        .parse()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt bill status"))?;

    if !current.accepts_payments() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Bill does not accept payments in its current status"
        })));
    }

    sqlx::query(
        r#"
        INSERT INTO bill_payments (bill_id, amount, mode, reference, paid_on)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(bill_id)
    .bind(body.amount)
    .bind(&body.mode)
    .bind(&body.reference)
    .bind(body.paid_on)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        error!(error = %e, bill_id, "Failed to insert bill payment");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let paid_total = round2(bill.paid_total + body.amount);
    let new_status = if paid_total >= bill.grand_total {
        DocumentStatus::Paid
    } else {
        current
    };

    sqlx::query("UPDATE bills SET paid_total = ?, status = ? WHERE id = ?")
        .bind(paid_total)
        .bind(new_status.as_ref())
        .bind(bill_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, bill_id, "Failed to update bill paid total");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, bill_id, "Failed to commit payment");
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

    fn item(quantity: f64, rate: f64, gst_rate: f64) -> CreateBillItem {
        CreateBillItem {
            description: "Raw material".into(),
            quantity,
            rate,
            gst_rate,
        }
    }

    #[test]
    fn vendor_state_decides_the_split() {
        // Intra-state purchase splits into CGST/SGST
        let t = compute_totals(&[item(10.0, 200.0, 18.0)], "27", "27", 0.0);
        assert_eq!(t.subtotal, 2000.0);
        assert_eq!(t.cgst, 180.0);
        assert_eq!(t.sgst, 180.0);
        assert_eq!(t.igst, 0.0);
        assert_eq!(t.grand_total, 2360.0);

        // Inter-state books the whole tax as IGST
        let t = compute_totals(&[item(10.0, 200.0, 18.0)], "29", "27", 0.0);
        assert_eq!(t.cgst, 0.0);
        assert_eq!(t.sgst, 0.0);
        assert_eq!(t.igst, 360.0);
        assert_eq!(t.grand_total, 2360.0);
    }

    #[test]
    fn updated_items_recompute_the_grand_total() {
        // One item set, then a replacement set with a different slab
        let before = compute_totals(&[item(1.0, 1000.0, 12.0)], "29", "27", 0.0);
        assert_eq!(before.grand_total, 1120.0);

        let after = compute_totals(&[item(2.0, 1000.0, 5.0)], "29", "27", 50.0);
        assert_eq!(after.subtotal, 2000.0);
        assert_eq!(after.igst, 100.0);
        assert_eq!(after.cess, 50.0);
        assert_eq!(after.grand_total, 2150.0);
    }

    #[test]
    fn item_validation_rejects_empty_sets_and_bad_slabs() {
        assert!(validate_items(&[]).is_err());
        assert!(validate_items(&[item(10.0, 200.0, 7.0)]).is_err());
        assert!(validate_items(&[item(0.0, 200.0, 18.0)]).is_err());
        assert!(validate_items(&[item(10.0, -1.0, 18.0)]).is_err());
        assert!(validate_items(&[item(10.0, 200.0, 18.0)]).is_ok());
    }
}
