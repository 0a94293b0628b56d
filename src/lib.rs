pub mod api;
pub mod auth;
pub mod config;
pub mod counter;
pub mod database;
pub mod error;
pub mod logger;
pub mod model;
pub mod session;
pub mod storage;

pub mod prelude {
    pub use derive_new::new;
    pub use serde::{Deserialize, Serialize};
    pub use snafu::{Location, OptionExt as _, ResultExt as _, Snafu};
    pub use tracing::instrument;

    pub use crate::database::{Database, DatabaseQueryError, Only, Record, Table};
    pub use crate::{define_relation, define_table};
}
