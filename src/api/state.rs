use std::sync::Arc;

use axum::extract::FromRef;
use axum_template::engine::Engine;
use tera::Tera;

use crate::auth::Authenticator;
use crate::database::Database;
use crate::session::Sessions;
use crate::storage::Storage;

pub type Templates = Engine<Tera>;

/// Everything a handler may need. Built once by the entry point and cloned into every request.
#[derive(Clone, FromRef)]
pub struct App {
    pub database: Database,
    pub sessions: Sessions,
    pub authenticator: Arc<Authenticator>,
    pub storage: Arc<Storage>,
    pub templates: Templates,
}

impl App {
    pub fn new(
        database: Database,
        authenticator: Authenticator,
        storage: Storage,
        sessions: Sessions,
        tera: Tera,
    ) -> Self {
        App {
            database,
            sessions,
            authenticator: Arc::new(authenticator),
            storage: Arc::new(storage),
            templates: Engine::from(tera),
        }
    }
}
