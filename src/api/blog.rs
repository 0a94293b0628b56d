use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect};
use axum::Json;
use axum_template::RenderHtml;
use serde::Serialize;
use snafu::OptionExt as _;

use crate::auth::Principal;
use crate::model::{display_date, Block, BlogPost, Body, EntityRef, NewBlogPost};
use crate::counter::LikeState;

use super::error::{ApiError, NotFoundSnafu, WebError};
use super::extract::{Admin, Viewer};
use super::form::Submission;
use super::state::App;
use super::{counters, Layout, Result};

const UPLOAD_PREFIX: &str = "blog";

#[derive(Debug, Serialize)]
struct PostCard {
    id: String,
    title: String,
    image_url: String,
    excerpt: String,
    created: String,
    views: u64,
    likes: u64,
}

impl From<BlogPost> for PostCard {
    fn from(post: BlogPost) -> Self {
        Self {
            id: post.id.key(),
            excerpt: post.excerpt(),
            created: display_date(post.created_at),
            title: post.title,
            image_url: post.image_url,
            views: post.views,
            likes: post.likes,
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexPage {
    layout: Layout,
    posts: Vec<PostCard>,
}

#[derive(Debug, Serialize)]
struct ShowPage {
    layout: Layout,
    id: String,
    title: String,
    image_url: String,
    created: String,
    blocks: Vec<Block>,
    views: u64,
    likes: u64,
}

#[derive(Debug, Serialize)]
struct NewPage {
    layout: Layout,
}

#[tracing::instrument(skip_all)]
pub async fn index(State(app): State<App>, viewer: Viewer) -> Result<impl IntoResponse> {
    let posts = BlogPost::all(&app.database).await?;

    let page = IndexPage {
        layout: Layout::new("Blog", "Notes and write-ups.", viewer.principal()),
        posts: posts.into_iter().map(PostCard::from).collect(),
    };

    Ok(RenderHtml("blog/index.html", app.templates, page))
}

#[tracing::instrument(skip_all, fields(id = %id))]
pub async fn show(State(app): State<App>, viewer: Viewer, Path(id): Path<String>) -> Result<impl IntoResponse> {
    let post = BlogPost::get(&id, &app.database)
        .await?
        .context(NotFoundSnafu { what: "post" })?;

    let widgets = counters::mount(&app, &viewer, EntityRef::blog(&id), post.views, post.likes).await?;

    let page = ShowPage {
        layout: Layout::new(&post.title, post.description(), viewer.principal()),
        id: post.id.key(),
        blocks: post.content.blocks(),
        created: display_date(post.created_at),
        title: post.title,
        image_url: post.image_url,
        views: widgets.views.views(),
        likes: widgets.likes.likes(),
    };

    Ok(RenderHtml("blog/show.html", app.templates, page))
}

pub async fn new_form(State(app): State<App>, Admin(principal): Admin) -> impl IntoResponse {
    let layout = Layout::new("New post", "Write a new blog post.", Some(&principal));

    RenderHtml("blog/new.html", app.templates, NewPage { layout })
}

fn validate(submission: &Submission, author: &Principal) -> Result<NewBlogPost> {
    submission.image()?;

    let title = submission.required("title")?;
    let content = Body::parse(&submission.required("content")?);

    Ok(NewBlogPost::new(title, content, String::new(), author.user.id.key()))
}

#[tracing::instrument(skip_all, fields(admin = %principal.user.email))]
pub async fn create(
    State(app): State<App>,
    Admin(principal): Admin,
    multipart: Multipart,
) -> Result<Redirect> {
    let submission = Submission::read(multipart).await?;
    let mut post = validate(&submission, &principal)?;

    let image = submission.image()?;
    let url = app
        .storage
        .upload(UPLOAD_PREFIX, &image.filename, &image.bytes)
        .await?;
    post.image_url = url.to_string();

    let created = post.insert(&app.database).await?;
    Ok(Redirect::to(&format!("/blog/{}", created.id.key())))
}

pub async fn like(
    State(app): State<App>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Json<LikeState>, ApiError> {
    let signed = viewer.0.ok_or(WebError::Unauthenticated)?;
    let state = counters::like(&app, &signed, EntityRef::blog(id)).await?;

    Ok(Json(state))
}

#[tracing::instrument(skip_all, fields(id = %id, admin = %principal.user.email))]
pub async fn delete(
    State(app): State<App>,
    Admin(principal): Admin,
    Path(id): Path<String>,
) -> Result<Redirect> {
    if !BlogPost::delete(&id, &app.database).await? {
        return NotFoundSnafu { what: "post" }.fail();
    }

    Ok(Redirect::to("/blog"))
}
