use std::ops::Deref;

use serde::Deserialize;
use snafu::{Location, ResultExt as _, Snafu};
use surrealdb::engine::any::Any;
use surrealdb::opt::{auth, IntoQuery};
use surrealdb::Surreal;
use url::Url;

pub use surrealdb::sql::Thing;

/// Helper trait for executing arbitrary SurrealQL queries.
pub mod query;

/// Macros for defining table methods.
pub mod macros;

/// Typed record ids.
pub mod record;

pub use query::{Bindings, DatabaseQueryError, Only};
pub use record::Record;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

const SETUP: &str = include_str!("../../schema.surrealql");

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatabaseError {
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    Connect {
        url: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot sign in to the database as `{username}` at {location}: {source}"))]
    Signin {
        username: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot select namespace `{namespace}` and database `{database}`: {source}"))]
    SelectDatabase {
        namespace: String,
        database: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to apply the database schema at {location}: {source}"))]
    Setup {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Represents a type that is stored in a table.
pub trait Table {
    /// Returns the ID of the record.
    fn id(&self) -> &Thing;

    /// Returns the name of the table associated with the record.
    fn table() -> &'static str;
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: Url,
    #[serde(rename = "surreal_ns")]
    pub namespace: String,
    #[serde(rename = "surreal_db")]
    pub database: String,
    #[serde(flatten)]
    pub credentials: Option<DatabaseCredentials>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseCredentials {
    #[serde(rename = "surreal_name")]
    pub username: String,
    #[serde(rename = "surreal_pass")]
    pub password: String,
}

/// Handle to the document store.
///
/// The handle is cheap to clone; every clone shares the same underlying connection. It is created once by the
/// application entry point and handed to whatever needs persistence.
#[derive(Debug, Clone)]
pub struct Database {
    database: Surreal<Any>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let database = surrealdb::engine::any::connect(config.url.as_str())
            .await
            .context(ConnectSnafu {
                url: config.url.to_string(),
            })?;

        if let Some(credentials) = &config.credentials {
            database
                .signin(auth::Database {
                    namespace: &config.namespace,
                    database: &config.database,
                    username: &credentials.username,
                    password: &credentials.password,
                })
                .await
                .context(SigninSnafu {
                    username: &credentials.username,
                })?;
        }

        Self::prepare(database, &config.namespace, &config.database).await
    }

    /// Opens a fresh in-memory database with the schema applied.
    pub async fn memory() -> Result<Self> {
        let database = surrealdb::engine::any::connect("mem://")
            .await
            .context(ConnectSnafu { url: "mem://" })?;

        Self::prepare(database, "folio", "folio").await
    }

    async fn prepare(database: Surreal<Any>, namespace: &str, name: &str) -> Result<Self> {
        database
            .use_ns(namespace)
            .use_db(name)
            .await
            .context(SelectDatabaseSnafu {
                namespace,
                database: name,
            })?;

        database
            .query(SETUP)
            .await
            .and_then(|response| response.check())
            .context(SetupSnafu)?;
        tracing::info!(namespace, database = name, "database is ready");

        Ok(Self { database })
    }

    /// Create a builder to execute arbitrary SQL code on the database.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let posts: Vec<BlogPost> = db.sql("SELECT * FROM blog WHERE likes > $likes")
    ///     .bind(("likes", 10))
    ///     .fetch_first()
    ///     .await?;
    /// ```
    pub fn sql(&self, query: impl IntoQuery) -> Bindings<'_> {
        Bindings::new(self.database.query(query))
    }
}

impl Deref for Database {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.database
    }
}
