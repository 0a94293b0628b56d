use axum::extract::State;
use axum::response::IntoResponse;
use axum_template::RenderHtml;
use serde::Serialize;

use crate::model::{display_date, BlogPost, Project};

use super::extract::Viewer;
use super::state::App;
use super::{Layout, Result};

/// How many of the newest projects and posts the home page features.
const FEATURED: usize = 3;

#[derive(Debug, Serialize)]
struct Featured {
    id: String,
    title: String,
    summary: String,
    image_url: String,
    created: String,
}

#[derive(Debug, Serialize)]
struct HomePage {
    layout: Layout,
    projects: Vec<Featured>,
    posts: Vec<Featured>,
}

#[derive(Debug, Serialize)]
struct AboutPage {
    layout: Layout,
}

#[tracing::instrument(skip_all)]
pub async fn home(State(app): State<App>, viewer: Viewer) -> Result<impl IntoResponse> {
    let projects = Project::all(&app.database).await?;
    let posts = BlogPost::all(&app.database).await?;

    let page = HomePage {
        layout: Layout::new("Home", "Projects, writing and a guestbook.", viewer.principal()),
        projects: projects
            .into_iter()
            .take(FEATURED)
            .map(|project| Featured {
                id: project.id.key(),
                created: display_date(project.created_at),
                title: project.title,
                summary: project.description,
                image_url: project.image_url,
            })
            .collect(),
        posts: posts
            .into_iter()
            .take(FEATURED)
            .map(|post| Featured {
                id: post.id.key(),
                created: display_date(post.created_at),
                summary: post.excerpt(),
                title: post.title,
                image_url: post.image_url,
            })
            .collect(),
    };

    Ok(RenderHtml("home.html", app.templates, page))
}

pub async fn about(State(app): State<App>, viewer: Viewer) -> impl IntoResponse {
    let page = AboutPage {
        layout: Layout::new("About", "Who I am and what I work on.", viewer.principal()),
    };

    RenderHtml("about.html", app.templates, page)
}
