use snafu::OptionExt as _;

use crate::counter::{LikeButton, LikeState, ViewCounter, Widgets};
use crate::model::{BlogPost, EntityRef, Kind, Project};

use super::error::{NotFoundSnafu, WebError};
use super::extract::{SignedIn, Viewer};
use super::state::App;

/// Mounts the counters of a detail page: one view is counted for every render, then the widgets are remembered
/// in the viewer's session so later like taps have somewhere to accumulate.
pub async fn mount(
    state: &App,
    viewer: &Viewer,
    target: EntityRef,
    views: u64,
    likes: u64,
) -> Result<Widgets, WebError> {
    let widgets = Widgets {
        views: ViewCounter::mount(&target, views, &state.database).await,
        likes: LikeButton::for_target(&target, likes),
    };

    if let Some(signed) = &viewer.0 {
        signed.session.save_widgets(&target, widgets).await?;
    }

    Ok(widgets)
}

/// Applies one like tap for the viewer.
///
/// A session that never rendered the page gets its widgets seeded from the stored counts, without counting a view.
#[tracing::instrument(skip(state, signed), fields(email = %signed.principal.user.email))]
pub async fn like(state: &App, signed: &SignedIn, target: EntityRef) -> Result<LikeState, WebError> {
    let mut widgets = match signed.session.widgets(&target).await? {
        Some(widgets) => widgets,
        None => {
            let (views, likes) = stored_counts(state, &target).await?;
            Widgets::seeded(&target, views, likes)
        }
    };

    let tap = widgets
        .likes
        .press(&target, Some(&signed.principal), &state.database)
        .await?;
    signed.session.save_widgets(&target, widgets).await?;

    Ok(widgets.likes.state(tap))
}

async fn stored_counts(state: &App, target: &EntityRef) -> Result<(u64, u64), WebError> {
    let counts = match target.kind {
        Kind::Project => Project::get(&target.key, &state.database)
            .await?
            .map(|project| (project.views, project.likes)),
        Kind::Blog => BlogPost::get(&target.key, &state.database)
            .await?
            .map(|post| (post.views, post.likes)),
    };

    counts.context(NotFoundSnafu {
        what: target.to_string(),
    })
}
