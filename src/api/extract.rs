//! Request extractors that resolve the viewer from the session set up by the session layer.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use crate::auth::Principal;
use crate::session::VisitorSession;

use super::error::WebError;
use super::state::App;

/// A viewer with a live session.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session: VisitorSession,
    pub principal: Principal,
}

impl SignedIn {
    async fn resolve(parts: &Parts) -> Result<Option<SignedIn>, WebError> {
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(None);
        };

        let session = VisitorSession::new(session);
        let principal = session.principal().await?;

        Ok(principal.map(|principal| SignedIn { session, principal }))
    }
}

#[axum::async_trait]
impl FromRequestParts<App> for SignedIn {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &App) -> Result<Self, Self::Rejection> {
        SignedIn::resolve(parts).await?.ok_or(WebError::Unauthenticated)
    }
}

/// Whoever is looking at the page, signed in or not.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<SignedIn>);

impl Viewer {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref().map(|signed| &signed.principal)
    }
}

#[axum::async_trait]
impl FromRequestParts<App> for Viewer {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &App) -> Result<Self, Self::Rejection> {
        Ok(Viewer(SignedIn::resolve(parts).await?))
    }
}

/// The signed-in admin. Anyone else gets the permission-denied page before the handler runs.
#[derive(Debug, Clone)]
pub struct Admin(pub Principal);

#[axum::async_trait]
impl FromRequestParts<App> for Admin {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &App) -> Result<Self, Self::Rejection> {
        match SignedIn::resolve(parts).await? {
            Some(signed) if signed.principal.is_admin() => Ok(Admin(signed.principal)),
            _ => Err(WebError::Forbidden),
        }
    }
}
