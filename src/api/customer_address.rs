use crate::auth::auth::AuthUser;
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::domain::gst::is_valid_gstin;
use crate::model::customer_address::CustomerAddress;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateCustomerAddress {
    #[schema(example = "Acme Traders")]
    pub customer_name: String,
    #[schema(example = "12 MG Road")]
    pub line1: String,
    pub line2: Option<String>,
    #[schema(example = "Pune")]
    pub city: String,
    #[schema(example = "27")]
    pub state_code: String,
    #[schema(example = "411001")]
    pub pincode: String,
    #[schema(example = "27AAPFU0939F1ZV")]
    pub gstin: Option<String>,
}

impl CreateCustomerAddress {
    fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("customer_name must not be empty".to_string());
        }
        if self.line1.trim().is_empty() {
            return Err("line1 must not be empty".to_string());
        }
        if self.city.trim().is_empty() {
            return Err("city must not be empty".to_string());
        }
        if self.state_code.len() != 2 || !self.state_code.chars().all(|c| c.is_ascii_digit()) {
            return Err("state_code must be a two-digit GST state code".to_string());
        }
        if self.pincode.len() != 6 || !self.pincode.chars().all(|c| c.is_ascii_digit()) {
            return Err("pincode must be six digits".to_string());
        }
        if let Some(gstin) = &self.gstin {
            if !is_valid_gstin(gstin) {
                return Err("gstin is not a valid GSTIN".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AddressQuery {
    /// Matches customer_name or city
    pub search: Option<String>,
    pub state_code: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AddressListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<CustomerAddress>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/finance/customer-addresses",
    request_body = CreateCustomerAddress,
    responses(
        (status = 201, description = "Address created"),
        (status = 400, description = "Validation failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Addresses"
)]
pub async fn create_address(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCustomerAddress>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    if let Err(msg) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO customer_addresses
        (customer_name, line1, line2, city, state_code, pincode, gstin, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.customer_name)
    .bind(&payload.line1)
    .bind(&payload.line2)
    .bind(&payload.city)
    .bind(&payload.state_code)
    .bind(&payload.pincode)
    .bind(&payload.gstin)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert customer address");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Address created",
        "address_id": result.last_insert_id()
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/finance/customer-addresses",
    params(AddressQuery),
    responses((status = 200, body = AddressListResponse)),
    security(("bearer_auth" = [])),
    tag = "Customer Addresses"
)]
pub async fn list_addresses(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AddressQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let mut filter = SqlFilter::new();

    if let Some(search) = &query.search {
        let pattern = format!("%{}%", search);
        filter.push_many(
            "(customer_name LIKE ? OR city LIKE ?)",
            vec![BindValue::Str(pattern.clone()), BindValue::Str(pattern)],
        );
    }
    if let Some(state_code) = &query.state_code {
        filter.push("state_code = ?", BindValue::Str(state_code.clone()));
    }

    let pagination = Pagination::from_params(query.page, query.per_page);

    let count_sql = format!(
        "SELECT COUNT(*) FROM customer_addresses{}",
        filter.where_clause()
    );

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count customer addresses");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM customer_addresses{} ORDER BY customer_name ASC, id ASC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let data = filter
        .bind_query_as(sqlx::query_as::<_, CustomerAddress>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch customer addresses");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(AddressListResponse {
        data,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/finance/customer-addresses/{address_id}",
    params(("address_id", Path, description = "Address ID")),
    responses(
        (status = 200, description = "Address deleted"),
        (status = 403, description = "Not the creator"),
        (status = 404, description = "Address not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Customer Addresses"
)]
pub async fn delete_address(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let address_id = path.into_inner();

    let address = sqlx::query_as::<_, CustomerAddress>(
        "SELECT * FROM customer_addresses WHERE id = ?",
    )
    .bind(address_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, address_id, "Failed to fetch customer address");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let address = match address {
        Some(a) => a,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Address not found"
            })));
        }
    };

    // Managers delete only what they created; HR/Admin can delete any.
    if address.created_by != auth.user_id {
        auth.require_hr_or_admin()?;
    }

    sqlx::query("DELETE FROM customer_addresses WHERE id = ?")
        .bind(address_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, address_id, "Failed to delete customer address");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Address deleted"
    })))
}
