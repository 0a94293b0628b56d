//! Read-only JSON views of the store, plus admin deletes for scripts.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use snafu::OptionExt as _;

use crate::model::{BlogPost, Feedback, Project};

use super::error::{ApiError, NotFoundSnafu, WebError};
use super::extract::Viewer;
use super::state::App;

type Result<T> = std::result::Result<T, ApiError>;

pub async fn projects(State(app): State<App>) -> Result<Json<Vec<Project>>> {
    Ok(Json(Project::all(&app.database).await?))
}

pub async fn project(State(app): State<App>, Path(id): Path<String>) -> Result<Json<Project>> {
    let project = Project::get(&id, &app.database)
        .await?
        .context(NotFoundSnafu { what: "project" })?;

    Ok(Json(project))
}

pub async fn posts(State(app): State<App>) -> Result<Json<Vec<BlogPost>>> {
    Ok(Json(BlogPost::all(&app.database).await?))
}

pub async fn post(State(app): State<App>, Path(id): Path<String>) -> Result<Json<BlogPost>> {
    let post = BlogPost::get(&id, &app.database)
        .await?
        .context(NotFoundSnafu { what: "post" })?;

    Ok(Json(post))
}

pub async fn feedback(State(app): State<App>) -> Result<Json<Vec<Feedback>>> {
    Ok(Json(Feedback::all(&app.database).await?))
}

fn require_admin(viewer: &Viewer) -> Result<()> {
    match viewer.principal() {
        Some(principal) if principal.is_admin() => Ok(()),
        Some(_) => Err(WebError::Forbidden.into()),
        None => Err(WebError::Unauthenticated.into()),
    }
}

#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn delete_project(
    State(app): State<App>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    require_admin(&viewer)?;

    if Project::delete(&id, &app.database).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(NotFoundSnafu { what: "project" }.build().into())
    }
}

#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn delete_post(
    State(app): State<App>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    require_admin(&viewer)?;

    if BlogPost::delete(&id, &app.database).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(NotFoundSnafu { what: "post" }.build().into())
    }
}
