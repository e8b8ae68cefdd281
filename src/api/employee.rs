use crate::{
    auth::auth::AuthUser,
    domain::filter::{BindValue, Pagination, SqlFilter},
    model::employee::Employee,
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-3000")]
    pub employee_code: String,
    #[schema(example = "Asha")]
    pub first_name: String,
    #[schema(example = "Nair")]
    pub last_name: String,
    #[schema(example = "asha@company.com", format = "email")]
    pub email: String,
    #[schema(example = "+919812345678")]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub department_id: u64,
    #[schema(example = 2)]
    pub job_title_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: chrono::NaiveDate,
}

impl CreateEmployee {
    fn validate(&self) -> Result<(), &'static str> {
        if self.employee_code.trim().is_empty() {
            return Err("employee_code must not be empty");
        }
        if self.first_name.trim().is_empty() {
            return Err("first_name must not be empty");
        }
        if !self.email.contains('@') {
            return Err("email is not valid");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub job_title_id: Option<u64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Columns a PATCH may touch. Derived/identity columns stay out.
const UPDATABLE_COLUMNS: &[&str] = &[
    "employee_code",
    "first_name",
    "last_name",
    "email",
    "phone",
    "department_id",
    "job_title_id",
    "hire_date",
    "status",
];

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/v1/hr/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "message": "Employee created successfully"
        })),
        (status = 400, description = "Validation failure or duplicate employee code"),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if let Err(msg) = payload.validate() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": msg })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, first_name, last_name, email, phone, department_id, job_title_id, hire_date, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active')
        "#,
    )
    .bind(&payload.employee_code)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(payload.department_id)
    .bind(payload.job_title_id)
    .bind(payload.hire_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Employee created successfully"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(json!({
                        "message": "Employee code or email already exists"
                    })));
                }
            }
            error!(error = %e, "Failed to create employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/hr/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let pagination = Pagination::from_params(query.page, query.per_page);

    let mut filter = SqlFilter::new();

    if let Some(department_id) = query.department_id {
        filter.push("department_id = ?", BindValue::U64(department_id));
    }
    if let Some(job_title_id) = query.job_title_id {
        filter.push("job_title_id = ?", BindValue::U64(job_title_id));
    }
    if let Some(status) = &query.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }
    if let Some(search) = &query.search {
        let like = BindValue::Str(format!("%{}%", search));
        filter.push_many(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)",
            vec![like.clone(), like.clone(), like],
        );
    }

    let count_sql = format!("SELECT COUNT(*) FROM employees{}", filter.where_clause());
    debug!(sql = %count_sql, "Counting employees");

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %count_sql, "Failed to count employees");
            ErrorInternalServerError("Database error")
        })?;

    let data_sql = format!(
        "SELECT * FROM employees{} ORDER BY id DESC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let employees = filter
        .bind_query_as(sqlx::query_as::<_, Employee>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, sql = %data_sql, "Failed to fetch employees");
            ErrorInternalServerError("Database error")
        })?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/v1/hr/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            ErrorInternalServerError("Internal Server Error")
        })?;

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        }))),
    }
}

/// Update Employee
#[utoipa::path(
    patch,
    path = "/api/v1/hr/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated successfully"),
        (status = 400, description = "Unknown or non-updatable field"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();

    let update = build_update_sql("employees", &body, UPDATABLE_COLUMNS, "id", employee_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Employee not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee updated successfully"
    })))
}

/// Delete Employee. Owned child rows (attendance, leave, payroll) go with it.
#[utoipa::path(
    delete,
    path = "/api/v1/hr/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Employee not found"
                })));
            }

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }
        Err(e) => {
            error!(error = %e, employee_id, "Failed to delete employee");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}
