use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminSession;
use crate::clients::notify::Mailer;
use crate::database::Database;
use crate::models::{
    ApiResponse, ApprovalOutcome, CreateBusinessRequest, CreateCommitteeMemberRequest,
    CreateGalleryImageRequest, CreatePostRequest, NotifyRequest, RegistrationQueue,
    RegistrationStatus, SubmitRegistrationRequest, UpdatePostRequest,
};

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "venture-directory-service",
        "timestamp": chrono::Utc::now()
    }))
}

// ============================================================================
// BUSINESS REGISTRATIONS (Approval Workflow)
// ============================================================================

#[post("/api/registrations")]
pub async fn submit_registration(
    db: web::Data<Database>,
    payload: web::Json<SubmitRegistrationRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    if let Err(message) = body.validate_institutional_email() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
    }

    let new_registration = body.into_new_registration();
    match db.create_registration(new_registration).await {
        Ok(registration) => HttpResponse::Created().json(ApiResponse::success(registration)),
        Err(err) => {
            log::error!("Failed to create registration: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create registration".into()))
        }
    }
}

#[get("/admin/registrations")]
pub async fn list_registrations(db: web::Data<Database>) -> impl Responder {
    match db.list_registrations().await {
        Ok(registrations) => {
            HttpResponse::Ok().json(ApiResponse::success(RegistrationQueue::partition(
                registrations,
            )))
        }
        Err(err) => {
            log::error!("Failed to list registrations: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list registrations".into()))
        }
    }
}

#[post("/admin/registrations/{registration_id}/approve")]
pub async fn approve_registration(
    db: web::Data<Database>,
    mailer: web::Data<Mailer>,
    registration_id: web::Path<Uuid>,
) -> impl Responder {
    let registration_id = registration_id.into_inner();

    let outcome = match db.approve_registration(registration_id).await {
        Ok(Some((registration, business))) => ApprovalOutcome {
            registration,
            business,
        },
        Ok(None) => return already_reviewed_response(&db, registration_id).await,
        Err(err) => {
            log::error!("Failed to approve registration: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to approve registration".into()));
        }
    };

    mailer.dispatch_in_background(NotifyRequest {
        email: outcome.registration.email.clone(),
        business_name: outcome.registration.name.clone(),
        founder: Some(outcome.registration.founder.clone()),
        status: RegistrationStatus::Approved,
    });

    HttpResponse::Ok().json(ApiResponse::success(outcome))
}

#[post("/admin/registrations/{registration_id}/reject")]
pub async fn reject_registration(
    db: web::Data<Database>,
    mailer: web::Data<Mailer>,
    registration_id: web::Path<Uuid>,
) -> impl Responder {
    let registration_id = registration_id.into_inner();

    let registration = match db.reject_registration(registration_id).await {
        Ok(Some(registration)) => registration,
        Ok(None) => return already_reviewed_response(&db, registration_id).await,
        Err(err) => {
            log::error!("Failed to reject registration: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to reject registration".into()));
        }
    };

    mailer.dispatch_in_background(NotifyRequest {
        email: registration.email.clone(),
        business_name: registration.name.clone(),
        founder: Some(registration.founder.clone()),
        status: RegistrationStatus::Rejected,
    });

    HttpResponse::Ok().json(ApiResponse::success(registration))
}

/// A review action that matched no pending row is either a missing
/// registration or one already in a terminal state.
async fn already_reviewed_response(db: &Database, registration_id: Uuid) -> HttpResponse {
    match db.get_registration_by_id(registration_id).await {
        Ok(Some(_)) => HttpResponse::Conflict().json(ApiResponse::<()>::error(
            "Registration has already been reviewed".into(),
        )),
        Ok(None) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Registration not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch registration: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch registration".into()))
        }
    }
}

// ============================================================================
// NOTIFICATION RELAY
// ============================================================================

#[post("/api/registration/notify")]
pub async fn relay_notification(
    mailer: web::Data<Mailer>,
    payload: web::Json<NotifyRequest>,
) -> impl Responder {
    if !mailer.is_configured() {
        log::error!("Notification relay called but no email provider credential is configured");
        return HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
            "Email service not configured on server".into(),
        ));
    }

    match mailer.send_registration_notice(&payload).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success("Notification sent".to_string())),
        Err(err) => {
            log::error!("Failed to send notification email: {err}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to send notification email".into()))
        }
    }
}

// ============================================================================
// BUSINESS DIRECTORY
// ============================================================================

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[get("/api/businesses")]
pub async fn list_businesses(
    db: web::Data<Database>,
    query: web::Query<ListQuery>,
) -> impl Responder {
    let limit = query.limit.map(|value| value.clamp(1, 100));

    match db.list_businesses(limit).await {
        Ok(businesses) => HttpResponse::Ok().json(ApiResponse::success(businesses)),
        Err(err) => {
            log::error!("Failed to list businesses: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list businesses".into()))
        }
    }
}

#[post("/admin/businesses")]
pub async fn create_business(
    db: web::Data<Database>,
    payload: web::Json<CreateBusinessRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let new_business = body.into_new_business(Utc::now());
    match db.create_business(new_business).await {
        Ok(business) => HttpResponse::Created().json(ApiResponse::success(business)),
        Err(err) => {
            log::error!("Failed to create business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create business".into()))
        }
    }
}

#[put("/admin/businesses/{business_id}")]
pub async fn update_business(
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
    payload: web::Json<CreateBusinessRequest>,
) -> impl Responder {
    let business_id = business_id.into_inner();
    let body = payload.into_inner();

    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let mut existing = match db.get_business(business_id).await {
        Ok(Some(business)) => business,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Business not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch business: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load business".into()));
        }
    };

    body.apply_to_existing(&mut existing);

    match db.update_business(existing).await {
        Ok(updated) => HttpResponse::Ok().json(ApiResponse::success(updated)),
        Err(err) => {
            log::error!("Failed to update business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update business".into()))
        }
    }
}

#[delete("/admin/businesses/{business_id}")]
pub async fn delete_business(
    db: web::Data<Database>,
    business_id: web::Path<Uuid>,
) -> impl Responder {
    let business_id = business_id.into_inner();
    match db.delete_business(business_id).await {
        Ok(0) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Business not found".into()))
        }
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(err) => {
            log::error!("Failed to delete business: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete business".into()))
        }
    }
}

// ============================================================================
// BLOG POSTS
// ============================================================================

#[get("/api/posts")]
pub async fn list_published_posts(db: web::Data<Database>) -> impl Responder {
    match db.list_published_posts().await {
        Ok(posts) => HttpResponse::Ok().json(ApiResponse::success(posts)),
        Err(err) => {
            log::error!("Failed to list posts: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list posts".into()))
        }
    }
}

#[get("/api/posts/{slug}")]
pub async fn get_published_post(db: web::Data<Database>, slug: web::Path<String>) -> impl Responder {
    let slug = slug.into_inner();
    match db.get_published_post_by_slug(&slug).await {
        Ok(Some(post)) => HttpResponse::Ok().json(ApiResponse::success(post)),
        Ok(None) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Post not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch post: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch post".into()))
        }
    }
}

#[get("/admin/posts")]
pub async fn list_all_posts(db: web::Data<Database>) -> impl Responder {
    match db.list_posts().await {
        Ok(posts) => HttpResponse::Ok().json(ApiResponse::success(posts)),
        Err(err) => {
            log::error!("Failed to list posts: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list posts".into()))
        }
    }
}

#[post("/api/posts")]
pub async fn create_post(
    admin: AdminSession,
    db: web::Data<Database>,
    payload: web::Json<CreatePostRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let new_post = body.into_new_post(Utc::now());
    match db.create_post(new_post).await {
        Ok(post) => {
            log::info!("Post '{}' created by {}", post.slug, admin.email);
            HttpResponse::Created().json(ApiResponse::success(post))
        }
        Err(err) if is_unique_violation(&err) => HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("A post with this slug already exists".into())),
        Err(err) => {
            log::error!("Failed to create post: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create post".into()))
        }
    }
}

#[patch("/api/posts/{post_id}")]
pub async fn update_post(
    admin: AdminSession,
    db: web::Data<Database>,
    post_id: web::Path<Uuid>,
    payload: web::Json<UpdatePostRequest>,
) -> impl Responder {
    let post_id = post_id.into_inner();

    let mut existing = match db.get_post(post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => {
            return HttpResponse::NotFound()
                .json(ApiResponse::<()>::error("Post not found".into()));
        }
        Err(err) => {
            log::error!("Failed to fetch post: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load post".into()));
        }
    };

    payload.into_inner().apply_to_existing(&mut existing, Utc::now());

    match db.update_post(existing).await {
        Ok(updated) => {
            log::info!("Post '{}' updated by {}", updated.slug, admin.email);
            HttpResponse::Ok().json(ApiResponse::success(updated))
        }
        Err(err) if is_unique_violation(&err) => HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("A post with this slug already exists".into())),
        Err(err) => {
            log::error!("Failed to update post: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update post".into()))
        }
    }
}

#[delete("/api/posts/{post_id}")]
pub async fn delete_post(
    admin: AdminSession,
    db: web::Data<Database>,
    post_id: web::Path<Uuid>,
) -> impl Responder {
    let post_id = post_id.into_inner();
    match db.delete_post(post_id).await {
        Ok(0) => HttpResponse::NotFound().json(ApiResponse::<()>::error("Post not found".into())),
        Ok(_) => {
            log::info!("Post {} deleted by {}", post_id, admin.email);
            HttpResponse::NoContent().finish()
        }
        Err(err) => {
            log::error!("Failed to delete post: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete post".into()))
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

// ============================================================================
// COMMITTEE ROSTER
// ============================================================================

#[get("/api/committee")]
pub async fn list_committee_members(db: web::Data<Database>) -> impl Responder {
    match db.list_committee_members().await {
        Ok(members) => HttpResponse::Ok().json(ApiResponse::success(members)),
        Err(err) => {
            log::error!("Failed to list committee members: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list committee members".into()))
        }
    }
}

#[post("/admin/committee")]
pub async fn create_committee_member(
    db: web::Data<Database>,
    payload: web::Json<CreateCommitteeMemberRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    match db
        .create_committee_member(body.name, body.position, body.year, body.image_url)
        .await
    {
        Ok(member) => HttpResponse::Created().json(ApiResponse::success(member)),
        Err(err) => {
            log::error!("Failed to create committee member: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create committee member".into()))
        }
    }
}

#[put("/admin/committee/{member_id}")]
pub async fn update_committee_member(
    db: web::Data<Database>,
    member_id: web::Path<Uuid>,
    payload: web::Json<CreateCommitteeMemberRequest>,
) -> impl Responder {
    let member_id = member_id.into_inner();
    let body = payload.into_inner();

    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    match db
        .update_committee_member(member_id, body.name, body.position, body.year, body.image_url)
        .await
    {
        Ok(Some(member)) => HttpResponse::Ok().json(ApiResponse::success(member)),
        Ok(None) => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("Committee member not found".into())),
        Err(err) => {
            log::error!("Failed to update committee member: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update committee member".into()))
        }
    }
}

#[delete("/admin/committee/{member_id}")]
pub async fn delete_committee_member(
    db: web::Data<Database>,
    member_id: web::Path<Uuid>,
) -> impl Responder {
    let member_id = member_id.into_inner();
    match db.delete_committee_member(member_id).await {
        Ok(0) => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("Committee member not found".into())),
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(err) => {
            log::error!("Failed to delete committee member: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete committee member".into()))
        }
    }
}

// ============================================================================
// PHOTO GALLERY
// ============================================================================

#[get("/api/gallery")]
pub async fn list_gallery_images(db: web::Data<Database>) -> impl Responder {
    match db.list_gallery_images().await {
        Ok(images) => HttpResponse::Ok().json(ApiResponse::success(images)),
        Err(err) => {
            log::error!("Failed to list gallery images: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list gallery images".into()))
        }
    }
}

#[post("/admin/gallery")]
pub async fn create_gallery_image(
    db: web::Data<Database>,
    payload: web::Json<CreateGalleryImageRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    match db
        .create_gallery_image(body.url, body.caption, body.height)
        .await
    {
        Ok(image) => HttpResponse::Created().json(ApiResponse::success(image)),
        Err(err) => {
            log::error!("Failed to create gallery image: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create gallery image".into()))
        }
    }
}

#[put("/admin/gallery/{image_id}")]
pub async fn update_gallery_image(
    db: web::Data<Database>,
    image_id: web::Path<Uuid>,
    payload: web::Json<CreateGalleryImageRequest>,
) -> impl Responder {
    let image_id = image_id.into_inner();
    let body = payload.into_inner();

    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    match db
        .update_gallery_image(image_id, body.url, body.caption, body.height)
        .await
    {
        Ok(Some(image)) => HttpResponse::Ok().json(ApiResponse::success(image)),
        Ok(None) => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("Gallery image not found".into())),
        Err(err) => {
            log::error!("Failed to update gallery image: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to update gallery image".into()))
        }
    }
}

#[delete("/admin/gallery/{image_id}")]
pub async fn delete_gallery_image(
    db: web::Data<Database>,
    image_id: web::Path<Uuid>,
) -> impl Responder {
    let image_id = image_id.into_inner();
    match db.delete_gallery_image(image_id).await {
        Ok(0) => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("Gallery image not found".into())),
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(err) => {
            log::error!("Failed to delete gallery image: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to delete gallery image".into()))
        }
    }
}

// ============================================================================
// ADMIN DASHBOARD
// ============================================================================

#[get("/admin/dashboard")]
pub async fn admin_dashboard(db: web::Data<Database>) -> impl Responder {
    match db.get_dashboard_stats().await {
        Ok(stats) => HttpResponse::Ok().json(ApiResponse::success(stats)),
        Err(err) => {
            log::error!("Failed to fetch dashboard stats: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch dashboard stats".into()))
        }
    }
}
