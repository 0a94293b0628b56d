use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{Principal, User};
use crate::storage::UPLOADS_ROUTE;

pub use error::{ApiError, WebError};
pub use extract::{Admin, SignedIn, Viewer};
pub use state::{App, Templates};

mod auth;
mod blog;
mod counters;
mod error;
mod extract;
mod form;
mod guestbook;
mod json;
mod pages;
mod projects;
mod state;

#[cfg(test)]
mod tests;

pub type Result<T, E = WebError> = std::result::Result<T, E>;

/// Admin forms carry an image, which is well over the default body limit.
const UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

/// What every page template gets: the page title and description plus who is looking.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub title: String,
    pub description: String,
    pub user: Option<User>,
    pub signed_in: bool,
    pub is_admin: bool,
}

impl Layout {
    pub fn new(title: impl Into<String>, description: impl Into<String>, viewer: Option<&Principal>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            user: viewer.map(|principal| principal.user.clone()),
            signed_in: viewer.is_some(),
            is_admin: viewer.is_some_and(Principal::is_admin),
        }
    }
}

pub fn create_router(app: App) -> Router {
    let uploads = ServeDir::new(app.storage.root());
    let sessions = app.sessions.layer();

    Router::new()
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/projects", get(projects::index).post(projects::create))
        .route("/projects/new", get(projects::new_form))
        .route("/projects/:id", get(projects::show))
        .route("/projects/:id/like", post(projects::like))
        .route("/projects/:id/delete", post(projects::delete))
        .route("/blog", get(blog::index).post(blog::create))
        .route("/blog/new", get(blog::new_form))
        .route("/blog/:id", get(blog::show))
        .route("/blog/:id/like", post(blog::like))
        .route("/blog/:id/delete", post(blog::delete))
        .route("/guestbook", get(guestbook::index).post(guestbook::sign))
        .route("/auth/signin", post(auth::signin))
        .route("/auth/signout", post(auth::signout))
        .nest("/api", json_routes())
        .nest_service(UPLOADS_ROUTE, uploads)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(sessions)
                .layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .with_state(app)
}

fn json_routes() -> Router<App> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/projects", get(json::projects))
        .route("/projects/:id", get(json::project).delete(json::delete_project))
        .route("/blog", get(json::posts))
        .route("/blog/:id", get(json::post).delete(json::delete_post))
        .route("/feedback", get(json::feedback))
        .layer(cors)
}
