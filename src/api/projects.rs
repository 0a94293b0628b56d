use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use axum_template::RenderHtml;
use serde::Serialize;
use snafu::OptionExt as _;

use crate::model::{display_date, EntityRef, NewProject, Project, Status};
use crate::counter::LikeState;

use super::error::{ApiError, InvalidFieldSnafu, NotFoundSnafu, WebError};
use super::extract::{Admin, Viewer};
use super::form::Submission;
use super::state::App;
use super::{counters, Layout, Result};

const UPLOAD_PREFIX: &str = "projects";

#[derive(Debug, Serialize)]
struct ProjectView {
    #[serde(flatten)]
    project: Project,
    created: String,
    started: Option<String>,
    ended: Option<String>,
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        Self {
            created: display_date(project.created_at),
            started: project.start_date.map(display_date),
            ended: project.end_date.map(display_date),
            project,
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexPage {
    layout: Layout,
    projects: Vec<ProjectView>,
}

#[derive(Debug, Serialize)]
struct ShowPage {
    layout: Layout,
    project: ProjectView,
    views: u64,
    likes: u64,
}

#[derive(Debug, Serialize)]
struct NewPage {
    layout: Layout,
}

#[tracing::instrument(skip_all)]
pub async fn index(State(app): State<App>, viewer: Viewer) -> Result<impl IntoResponse> {
    let projects = Project::all(&app.database).await?;

    let page = IndexPage {
        layout: Layout::new("Projects", "Things I have built.", viewer.principal()),
        projects: projects.into_iter().map(ProjectView::from).collect(),
    };

    Ok(RenderHtml("projects/index.html", app.templates, page))
}

#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn show(State(app): State<App>, viewer: Viewer, Path(id): Path<String>) -> Result<impl IntoResponse> {
    let project = Project::get(&id, &app.database)
        .await?
        .context(NotFoundSnafu { what: "project" })?;

    let widgets = counters::mount(
        &app,
        &viewer,
        EntityRef::project(&id),
        project.views,
        project.likes,
    )
    .await?;

    let page = ShowPage {
        layout: Layout::new(&project.title, &project.description, viewer.principal()),
        views: widgets.views.views(),
        likes: widgets.likes.likes(),
        project: project.into(),
    };

    Ok(RenderHtml("projects/show.html", app.templates, page))
}

pub async fn new_form(State(app): State<App>, Admin(principal): Admin) -> impl IntoResponse {
    let layout = Layout::new("New project", "Add a project to the portfolio.", Some(&principal));

    RenderHtml("projects/new.html", app.templates, NewPage { layout })
}

/// Reads the admin form into a project. Everything is validated before anything is uploaded or written.
fn validate(submission: &Submission) -> Result<NewProject> {
    let image = submission.image()?;
    tracing::debug!(filename = %image.filename, "validating project form");

    let status = match submission.optional("status") {
        Some(text) => text.parse::<Status>().ok().context(InvalidFieldSnafu {
            field: "status",
            reason: "expected planned, in-progress or completed",
        })?,
        None => Status::default(),
    };

    let mut project = NewProject::new(
        submission.required("title")?,
        submission.required("description")?,
        String::new(),
    );
    project.live_url = submission.optional("live_url");
    project.github_url = submission.optional("github_url");
    project.category = submission.text("category");
    project.status = status;
    project.start_date = submission.date("start_date")?;
    project.end_date = submission.date("end_date")?;
    project.technologies = submission.list("technologies");
    project.features = submission.list("features");

    Ok(project)
}

#[tracing::instrument(skip_all, fields(admin = %principal.user.email))]
pub async fn create(
    State(app): State<App>,
    Admin(principal): Admin,
    multipart: Multipart,
) -> Result<Redirect> {
    let submission = Submission::read(multipart).await?;
    let mut project = validate(&submission)?;

    let image = submission.image()?;
    let url = app
        .storage
        .upload(UPLOAD_PREFIX, &image.filename, &image.bytes)
        .await?;
    project.image_url = url.to_string();

    let created = project.insert(&app.database).await?;
    Ok(Redirect::to(&format!("/projects/{}", created.id.key())))
}

pub async fn like(
    State(app): State<App>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Json<LikeState>, ApiError> {
    let signed = viewer.0.ok_or(WebError::Unauthenticated)?;
    let state = counters::like(&app, &signed, EntityRef::project(id)).await?;

    Ok(Json(state))
}

#[tracing::instrument(skip_all, fields(id = %id, admin = %principal.user.email))]
pub async fn delete(
    State(app): State<App>,
    Admin(principal): Admin,
    Path(id): Path<String>,
) -> Result<Redirect> {
    if !Project::delete(&id, &app.database).await? {
        return NotFoundSnafu { what: "project" }.fail();
    }

    Ok(Redirect::to("/projects"))
}
