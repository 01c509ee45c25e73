use actix_session::{Session, SessionExt};
use actix_web::{
    body::EitherBody,
    dev::{self, forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    get, post, web, Error, FromRequest, HttpRequest, HttpResponse, Responder,
};
use serde::Serialize;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use serde_json::json;
use std::future::{ready, Ready as StdReady};
use validator::Validate;

use crate::database::Database;
use crate::models::{ApiResponse, LoginRequest};

const SESSION_ADMIN_KEY: &str = "admin_email";
const LOGIN_PATH: &str = "/admin/auth";
const DASHBOARD_PATH: &str = "/admin/dashboard";

/// Where a request should be redirected, given its path and whether a valid
/// session exists. `None` means let it through. Admin routes without a session
/// bounce to the login route carrying the originally requested path; the login
/// route with a session bounces to the dashboard.
pub fn guard_redirect(path: &str, authenticated: bool) -> Option<String> {
    if !authenticated && path.starts_with("/admin") && !path.starts_with(LOGIN_PATH) {
        return Some(format!("{}?redirectedFrom={}", LOGIN_PATH, path));
    }

    if authenticated && path.trim_end_matches('/') == LOGIN_PATH {
        return Some(DASHBOARD_PATH.to_string());
    }

    None
}

/// Any failure to read session state counts as unauthenticated.
fn session_is_authenticated(session: &Session) -> bool {
    matches!(session.get::<String>(SESSION_ADMIN_KEY), Ok(Some(_)))
}

// ============================================================================
// SESSION GUARD MIDDLEWARE (admin route tree)
// ============================================================================

pub struct SessionGuard;

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SessionGuardMiddleware { service })
    }
}

pub struct SessionGuardMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for SessionGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let session = req.get_session();
        let authenticated = session_is_authenticated(&session);

        if let Some(location) = guard_redirect(req.path(), authenticated) {
            return Box::pin(async move {
                let (http_req, _payload) = req.into_parts();
                let res = HttpResponse::Found()
                    .append_header(("location", location))
                    .finish()
                    .map_into_right_body();
                Ok(ServiceResponse::new(http_req, res))
            });
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

// ============================================================================
// SESSION EXTRACTOR (JSON mutation surface)
// ============================================================================

/// Extractor for handlers that mutate content over the JSON API: a missing
/// session rejects the request with a 401 body instead of a redirect.
pub struct AdminSession {
    pub email: String,
}

impl FromRequest for AdminSession {
    type Error = actix_web::Error;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        match session.get::<String>(SESSION_ADMIN_KEY) {
            Ok(Some(email)) => ready(Ok(AdminSession { email })),
            _ => ready(Err(actix_web::error::InternalError::from_response(
                "Unauthorized",
                HttpResponse::Unauthorized().json(json!({ "error": "Unauthorized" })),
            )
            .into())),
        }
    }
}

// ============================================================================
// LOGIN / LOGOUT
// ============================================================================

#[post("/admin/auth/login")]
pub async fn login(
    db: web::Data<Database>,
    session: Session,
    payload: web::Json<LoginRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let admin = match db.get_admin_by_email(&body.email).await {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            return HttpResponse::Unauthorized()
                .json(ApiResponse::<()>::error("Invalid email or password".into()));
        }
        Err(err) => {
            log::error!("Failed to look up admin account: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to sign in".into()));
        }
    };

    let verified = bcrypt::verify(&body.password, &admin.password_hash).unwrap_or_else(|err| {
        log::error!("Password verification error: {err:?}");
        false
    });

    if !verified {
        return HttpResponse::Unauthorized()
            .json(ApiResponse::<()>::error("Invalid email or password".into()));
    }

    if let Err(err) = session.insert(SESSION_ADMIN_KEY, &admin.email) {
        log::error!("Failed to persist session: {err:?}");
        return HttpResponse::InternalServerError()
            .json(ApiResponse::<()>::error("Failed to sign in".into()));
    }

    HttpResponse::Ok().json(ApiResponse::success(admin.email))
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub email: Option<String>,
}

/// Session introspection for the admin views: one source of truth instead of
/// per-page auth flags.
#[get("/admin/auth/session")]
pub async fn session_info(session: Session) -> impl Responder {
    let email = session.get::<String>(SESSION_ADMIN_KEY).ok().flatten();
    HttpResponse::Ok().json(ApiResponse::success(SessionInfo {
        authenticated: email.is_some(),
        email,
    }))
}

#[post("/admin/auth/logout")]
pub async fn logout(session: Session) -> impl Responder {
    session.purge();
    HttpResponse::Ok().json(ApiResponse::success("Signed out".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_route_without_session_redirects_to_login_with_origin() {
        let target = guard_redirect("/admin/registrations", false);
        assert_eq!(
            target.as_deref(),
            Some("/admin/auth?redirectedFrom=/admin/registrations")
        );
    }

    #[test]
    fn login_route_without_session_is_exempt() {
        assert_eq!(guard_redirect("/admin/auth", false), None);
        assert_eq!(guard_redirect("/admin/auth/login", false), None);
    }

    #[test]
    fn login_route_with_session_redirects_to_dashboard() {
        assert_eq!(
            guard_redirect("/admin/auth", true).as_deref(),
            Some("/admin/dashboard")
        );
        assert_eq!(
            guard_redirect("/admin/auth/", true).as_deref(),
            Some("/admin/dashboard")
        );
    }

    #[test]
    fn authenticated_admin_routes_pass_through() {
        assert_eq!(guard_redirect("/admin/dashboard", true), None);
        assert_eq!(guard_redirect("/admin/registrations", true), None);
    }

    #[test]
    fn public_routes_are_never_redirected() {
        assert_eq!(guard_redirect("/api/businesses", false), None);
        assert_eq!(guard_redirect("/api/posts", true), None);
    }

    #[actix_web::test]
    async fn extractor_rejects_a_request_without_a_session() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let result = AdminSession::from_request(&req, &mut dev::Payload::None).await;
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn extractor_carries_the_signed_in_email() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        req.get_session()
            .insert(SESSION_ADMIN_KEY, "admin@ashesi.edu.gh")
            .expect("seed session");

        let admin = AdminSession::from_request(&req, &mut dev::Payload::None)
            .await
            .expect("a seeded session extracts");
        assert_eq!(admin.email, "admin@ashesi.edu.gh");
    }
}
