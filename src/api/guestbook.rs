use axum::extract::State;
use axum::response::{IntoResponse, Redirect};
use axum::Form;
use axum_template::RenderHtml;
use serde::{Deserialize, Serialize};

use crate::model::{display_date, Feedback, NewFeedback};

use super::error::WebError;
use super::extract::{SignedIn, Viewer};
use super::state::App;
use super::{Layout, Result};

#[derive(Debug, Serialize)]
struct Entry {
    user_id: String,
    content: String,
    rating: u8,
    created: String,
}

impl From<Feedback> for Entry {
    fn from(feedback: Feedback) -> Self {
        Self {
            created: display_date(feedback.created_at),
            user_id: feedback.user_id,
            content: feedback.content,
            rating: feedback.rating,
        }
    }
}

#[derive(Debug, Serialize)]
struct GuestbookPage {
    layout: Layout,
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct SignGuestbook {
    #[serde(default)]
    content: String,
}

#[tracing::instrument(skip_all)]
pub async fn index(State(app): State<App>, viewer: Viewer) -> Result<impl IntoResponse> {
    let entries = Feedback::all(&app.database).await?;

    let page = GuestbookPage {
        layout: Layout::new("Guestbook", "Leave a note.", viewer.principal()),
        entries: entries.into_iter().map(Entry::from).collect(),
    };

    Ok(RenderHtml("guestbook.html", app.templates, page))
}

#[tracing::instrument(skip_all, fields(email = %signed.principal.user.email))]
pub async fn sign(
    State(app): State<App>,
    signed: SignedIn,
    Form(form): Form<SignGuestbook>,
) -> Result<Redirect> {
    let content = form.content.trim();
    if content.is_empty() {
        return Err(WebError::InvalidField {
            field: "content".into(),
            reason: "write something first".into(),
        });
    }

    NewFeedback::new(signed.principal.user.id.key(), content.to_string())
        .insert(&app.database)
        .await?;

    Ok(Redirect::to("/guestbook"))
}
