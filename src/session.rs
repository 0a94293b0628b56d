//! What the site remembers about a signed-in visitor, kept in a `tower-sessions` session.

use serde::{Deserialize, Serialize};
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::auth::{Principal, Role, User};
use crate::counter::Widgets;
use crate::database::Record;
use crate::model::EntityRef;

pub use tower_sessions::session::Error as SessionError;

/// Name of the cookie that carries the session id.
pub const SESSION_COOKIE: &str = "folio_session";

/// A session ends after this long without a request.
pub const IDLE_EXPIRY: Duration = Duration::hours(12);

const PRINCIPAL_KEY: &str = "principal";

/// The session store and the cookie settings it is served with.
#[derive(Debug, Clone)]
pub struct Sessions {
    store: MemoryStore,
    idle: Duration,
    secure: bool,
}

impl Sessions {
    pub fn new(idle: Duration, secure: bool) -> Self {
        Self {
            store: MemoryStore::default(),
            idle,
            secure,
        }
    }

    pub fn layer(&self) -> SessionManagerLayer<MemoryStore> {
        SessionManagerLayer::new(self.store.clone())
            .with_name(SESSION_COOKIE)
            .with_expiry(Expiry::OnInactivity(self.idle))
            .with_secure(self.secure)
            .with_same_site(SameSite::Lax)
            .with_http_only(true)
            .with_path("/")
    }
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new(IDLE_EXPIRY, false)
    }
}

/// The session form of a [Principal]. The role is kept as resolved at sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredPrincipal {
    uid: String,
    email: String,
    name: String,
    photo_url: String,
    role: Role,
}

impl From<&Principal> for StoredPrincipal {
    fn from(principal: &Principal) -> Self {
        Self {
            uid: principal.user.id.key(),
            email: principal.user.email.clone(),
            name: principal.user.name.clone(),
            photo_url: principal.user.photo_url.clone(),
            role: principal.role,
        }
    }
}

impl From<StoredPrincipal> for Principal {
    fn from(stored: StoredPrincipal) -> Self {
        let user = User {
            id: Record::new(stored.uid),
            email: stored.email,
            name: stored.name,
            photo_url: stored.photo_url,
        };

        Principal::new(user, stored.role)
    }
}

fn widgets_key(target: &EntityRef) -> String {
    format!("widgets:{target}")
}

/// Typed access to one visitor's session.
#[derive(Debug, Clone)]
pub struct VisitorSession(Session);

impl VisitorSession {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub async fn principal(&self) -> Result<Option<Principal>, SessionError> {
        let stored: Option<StoredPrincipal> = self.0.get(PRINCIPAL_KEY).await?;
        Ok(stored.map(Principal::from))
    }

    /// Stores the principal under a fresh session id.
    pub async fn sign_in(&self, principal: &Principal) -> Result<(), SessionError> {
        self.0.cycle_id().await?;
        self.0
            .insert(PRINCIPAL_KEY, StoredPrincipal::from(principal))
            .await
    }

    /// Drops everything, mounted widgets included, and expires the cookie.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        self.0.flush().await
    }

    pub async fn widgets(&self, target: &EntityRef) -> Result<Option<Widgets>, SessionError> {
        self.0.get(&widgets_key(target)).await
    }

    /// Replaces whatever the session had for the target. A fresh mount therefore clears its like progress.
    pub async fn save_widgets(&self, target: &EntityRef, widgets: Widgets) -> Result<(), SessionError> {
        self.0.insert(&widgets_key(target), widgets).await
    }
}
