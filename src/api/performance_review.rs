use crate::auth::auth::AuthUser;
use crate::domain::filter::{BindValue, Pagination, SqlFilter};
use crate::model::performance_review::{PerformanceReview, ReviewStatus};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateReview {
    #[schema(example = 1001)]
    pub employee_id: u64,
    /// e.g. "2025-H1"
    #[schema(example = "2025-H1")]
    pub review_period: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateReview {
    #[schema(example = 4, minimum = 1, maximum = 5)]
    pub technical_rating: Option<u8>,
    pub communication_rating: Option<u8>,
    pub teamwork_rating: Option<u8>,
    pub leadership_rating: Option<u8>,
    pub punctuality_rating: Option<u8>,
    pub initiative_rating: Option<u8>,
    pub overall_rating: Option<u8>,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
    pub goals: Option<String>,
}

impl UpdateReview {
    fn validate(&self) -> Result<(), &'static str> {
        let ratings = [
            self.technical_rating,
            self.communication_rating,
            self.teamwork_rating,
            self.leadership_rating,
            self.punctuality_rating,
            self.initiative_rating,
            self.overall_rating,
        ];
        if ratings.iter().flatten().any(|r| !(1..=5).contains(r)) {
            return Err("Ratings must be between 1 and 5");
        }
        Ok(())
    }
}

/// Reviewer submits final ratings; the reviewed employee may only add a
/// self-assessment comment.
#[derive(Deserialize, ToSchema)]
pub struct CompleteReview {
    pub ratings: Option<UpdateReview>,
    pub employee_comments: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ReviewQuery {
    pub employee_id: Option<u64>,
    pub reviewer_id: Option<u64>,
    pub review_period: Option<String>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct ReviewListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<PerformanceReview>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

async fn fetch_review(pool: &MySqlPool, id: u64) -> Result<Option<PerformanceReview>, sqlx::Error> {
    sqlx::query_as::<_, PerformanceReview>("SELECT * FROM performance_reviews WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

fn parse_status(raw: &str) -> actix_web::Result<ReviewStatus> {
    raw.parse::<ReviewStatus>()
        .map_err(|_| actix_web::error::ErrorInternalServerError("Corrupt review status"))
}

#[utoipa::path(
    post,
    path = "/api/v1/hr/performance-reviews",
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review created in draft"),
        (status = 400, description = "A review already exists for this period"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn create_review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateReview>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    if payload.review_period.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "review_period must not be empty"
        })));
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

    let result = sqlx::query(
        r#"
        INSERT INTO performance_reviews (employee_id, reviewer_id, review_period, status)
        VALUES (?, ?, ?, 'draft')
        "#,
    )
    .bind(payload.employee_id)
    .bind(auth.user_id)
    .bind(&payload.review_period)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(serde_json::json!({
            "message": "Performance review created",
            "status": "draft"
        }))),
        Err(e) => {
            // one review per (employee, period)
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                        "message": "A review already exists for this employee and period"
                    })));
                }
            }
            error!(error = %e, "Failed to create review");
            Err(actix_web::error::ErrorInternalServerError(
                "Internal Server Error",
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/hr/performance-reviews",
    params(ReviewQuery),
    responses((status = 200, body = ReviewListResponse)),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn list_reviews(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReviewQuery>,
) -> actix_web::Result<impl Responder> {
    let mut filter = SqlFilter::new();

    if auth.is_employee() {
        let own = auth.employee_id_required()?;
        filter.push("employee_id = ?", BindValue::U64(own));
    } else if let Some(emp_id) = query.employee_id {
        filter.push("employee_id = ?", BindValue::U64(emp_id));
    }

    if let Some(reviewer_id) = query.reviewer_id {
        filter.push("reviewer_id = ?", BindValue::U64(reviewer_id));
    }
    if let Some(period) = &query.review_period {
        filter.push("review_period = ?", BindValue::Str(period.clone()));
    }
    if let Some(status) = &query.status {
        filter.push("status = ?", BindValue::Str(status.clone()));
    }

    let pagination = Pagination::from_params(query.page, query.per_page);

    let count_sql = format!(
        "SELECT COUNT(*) FROM performance_reviews{}",
        filter.where_clause()
    );

    let total = filter
        .bind_query_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count reviews");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let data_sql = format!(
        "SELECT * FROM performance_reviews{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        filter.where_clause()
    );

    let data = filter
        .bind_query_as(sqlx::query_as::<_, PerformanceReview>(&data_sql))
        .bind(pagination.per_page as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch review list");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(ReviewListResponse {
        data,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/hr/performance-reviews/{review_id}",
    params(("review_id", Path, description = "Review ID")),
    responses((status = 200), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn get_review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let review_id = path.into_inner();

    let review = fetch_review(pool.get_ref(), review_id).await.map_err(|e| {
        error!(error = %e, review_id, "Failed to fetch review");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match review {
        Some(r) => {
            auth.require_self_or_hr(r.employee_id)?;
            Ok(HttpResponse::Ok().json(r))
        }
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Review not found"
        }))),
    }
}

#[utoipa::path(
    patch,
    path = "/api/v1/hr/performance-reviews/{review_id}",
    params(("review_id", Path, description = "Review ID")),
    request_body = UpdateReview,
    responses(
        (status = 200, description = "Review updated"),
        (status = 400, description = "Review is completed or approved"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn update_review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateReview>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let review_id = path.into_inner();

    if let Err(msg) = body.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    let review = match fetch_review(pool.get_ref(), review_id).await.map_err(|e| {
        error!(error = %e, review_id, "Failed to fetch review");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(r) => r,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Review not found"
            })));
        }
    };

    if !parse_status(&review.status)?.is_editable() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Completed or approved reviews cannot be edited"
        })));
    }

    sqlx::query(
        r#"
        UPDATE performance_reviews
        SET technical_rating = COALESCE(?, technical_rating),
            communication_rating = COALESCE(?, communication_rating),
            teamwork_rating = COALESCE(?, teamwork_rating),
            leadership_rating = COALESCE(?, leadership_rating),
            punctuality_rating = COALESCE(?, punctuality_rating),
            initiative_rating = COALESCE(?, initiative_rating),
            overall_rating = COALESCE(?, overall_rating),
            strengths = COALESCE(?, strengths),
            improvements = COALESCE(?, improvements),
            goals = COALESCE(?, goals),
            status = 'in_progress'
        WHERE id = ?
        "#,
    )
    .bind(body.technical_rating)
    .bind(body.communication_rating)
    .bind(body.teamwork_rating)
    .bind(body.leadership_rating)
    .bind(body.punctuality_rating)
    .bind(body.initiative_rating)
    .bind(body.overall_rating)
    .bind(&body.strengths)
    .bind(&body.improvements)
    .bind(&body.goals)
    .bind(review_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, review_id, "Failed to update review");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Review updated"
    })))
}

/// Complete a review. The reviewer locks in ratings; the reviewed employee
/// may only attach their self-assessment comment.
#[utoipa::path(
    patch,
    path = "/api/v1/hr/performance-reviews/{review_id}/complete",
    params(("review_id", Path, description = "Review ID")),
    request_body = CompleteReview,
    responses(
        (status = 200, description = "Review completed"),
        (status = 400, description = "Invalid state or missing ratings"),
        (status = 403, description = "Neither reviewer nor reviewed employee"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn complete_review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<CompleteReview>,
) -> actix_web::Result<impl Responder> {
    let review_id = path.into_inner();

    let review = match fetch_review(pool.get_ref(), review_id).await.map_err(|e| {
        error!(error = %e, review_id, "Failed to fetch review");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(r) => r,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Review not found"
            })));
        }
    };

    let is_reviewer = auth.user_id == review.reviewer_id;
    let is_reviewed = auth.employee_id == Some(review.employee_id);

    if !is_reviewer && !is_reviewed {
        return Err(actix_web::error::ErrorForbidden(
            "Only the reviewer or the reviewed employee may act here",
        ));
    }

    if is_reviewed && !is_reviewer {
        // Self-assessment path; never changes status or ratings.
        let comments = match &body.employee_comments {
            Some(c) if !c.trim().is_empty() => c,
            _ => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "message": "employee_comments required"
                })));
            }
        };

        sqlx::query("UPDATE performance_reviews SET employee_comments = ? WHERE id = ?")
            .bind(comments)
            .bind(review_id)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, review_id, "Failed to save self-assessment");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Self-assessment recorded"
        })));
    }

    if !parse_status(&review.status)?.can_transition_to(ReviewStatus::Completed) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Review cannot be completed from its current state"
        })));
    }

    let ratings = match &body.ratings {
        Some(r) => r,
        None => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "message": "Final ratings required to complete a review"
            })));
        }
    };

    if let Err(msg) = ratings.validate() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({ "message": msg })));
    }

    let overall = ratings.overall_rating.or(review.overall_rating);
    if overall.is_none() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "overall_rating required to complete a review"
        })));
    }

    sqlx::query(
        r#"
        UPDATE performance_reviews
        SET technical_rating = COALESCE(?, technical_rating),
            communication_rating = COALESCE(?, communication_rating),
            teamwork_rating = COALESCE(?, teamwork_rating),
            leadership_rating = COALESCE(?, leadership_rating),
            punctuality_rating = COALESCE(?, punctuality_rating),
            initiative_rating = COALESCE(?, initiative_rating),
            overall_rating = COALESCE(?, overall_rating),
            strengths = COALESCE(?, strengths),
            improvements = COALESCE(?, improvements),
            goals = COALESCE(?, goals),
            status = 'completed',
            completed_at = NOW()
        WHERE id = ? AND status IN ('draft', 'in_progress')
        "#,
    )
    .bind(ratings.technical_rating)
    .bind(ratings.communication_rating)
    .bind(ratings.teamwork_rating)
    .bind(ratings.leadership_rating)
    .bind(ratings.punctuality_rating)
    .bind(ratings.initiative_rating)
    .bind(ratings.overall_rating)
    .bind(&ratings.strengths)
    .bind(&ratings.improvements)
    .bind(&ratings.goals)
    .bind(review_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, review_id, "Failed to complete review");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Review completed"
    })))
}

/// Approve a completed review (HR/Admin)
#[utoipa::path(
    patch,
    path = "/api/v1/hr/performance-reviews/{review_id}/approve",
    params(("review_id", Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review approved"),
        (status = 400, description = "Review is not completed"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn approve_review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let review_id = path.into_inner();

    let result = sqlx::query(
        "UPDATE performance_reviews SET status = 'approved' WHERE id = ? AND status = 'completed'",
    )
    .bind(review_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, review_id, "Failed to approve review");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Review not found or not completed"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Review approved"
    })))
}

/// Delete a draft review
#[utoipa::path(
    delete,
    path = "/api/v1/hr/performance-reviews/{review_id}",
    params(("review_id", Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 400, description = "Only draft reviews can be deleted"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn delete_review(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_manager_or_above()?;

    let review_id = path.into_inner();

    let review = match fetch_review(pool.get_ref(), review_id).await.map_err(|e| {
        error!(error = %e, review_id, "Failed to fetch review");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })? {
        Some(r) => r,
        None => {
            return Ok(HttpResponse::NotFound().json(serde_json::json!({
                "message": "Review not found"
            })));
        }
    };

    // only the creating reviewer may discard their draft
    if review.reviewer_id != auth.user_id {
        return Err(actix_web::error::ErrorForbidden("Not your review"));
    }

    let result = sqlx::query("DELETE FROM performance_reviews WHERE id = ? AND status = 'draft'")
        .bind(review_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, review_id, "Failed to delete review");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Only draft reviews can be deleted"
        })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Review deleted"
    })))
}
