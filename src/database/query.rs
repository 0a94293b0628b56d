use std::ops::Deref;

use serde::de::DeserializeOwned;
use snafu::{Location, OptionExt as _, ResultExt as _, Snafu};
use surrealdb::opt::QueryResult;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatabaseQueryError {
    #[snafu(display("failed to execute the query at {location}: {source}"))]
    MalformedQuery {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    Deserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("expected exactly one result at {location}, but got none"))]
    NoResults {
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("expected exactly one result at {location}, but got more"))]
    TooManyResults {
        #[snafu(implicit)]
        location: Location,
    },
}

/// A query waiting for its parameters. Parameters can be bound using the [Bindings::bind] method which takes any
/// serializable data structure.
///
/// # Example
/// ```ignore
/// let projects: Vec<Project> = database.sql("SELECT * FROM projects WHERE category = $category")
///     .bind(("category", "web"))
///     .fetch_first()
///     .await?;
/// ```
#[derive(Debug)]
pub struct Bindings<'a> {
    query: surrealdb::method::Query<'a, surrealdb::engine::any::Any>,
}

impl<'a> Bindings<'a> {
    pub(crate) fn new(query: surrealdb::method::Query<'a, surrealdb::engine::any::Any>) -> Self {
        Self { query }
    }

    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the query and return a [surrealdb::Response] which is SurrealDB's way to represent a list of statements returned from the database.
    ///
    /// Statement errors are surfaced here rather than when the individual results are taken.
    pub async fn execute(self) -> Result<surrealdb::Response, DatabaseQueryError> {
        let response = self
            .query
            .await
            .and_then(|response| response.check())
            .context(MalformedQuerySnafu)?;
        tracing::trace!(?response, "executed query");
        Ok(response)
    }

    /// Execute the query and return the first result as a deserialized value.
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<T, DatabaseQueryError>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        let result = statements.take::<T>(0).context(DeserializeSnafu)?;
        Ok(result)
    }

    /// Execute the query and require the first statement to produce exactly one value.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<Only<T>, DatabaseQueryError> {
        let values: Vec<T> = self.fetch_first().await?;
        Only::try_from(values)
    }
}

/// Exactly one value produced by a statement.
#[derive(Debug)]
pub struct Only<T>(pub T);

impl<T> TryFrom<Vec<T>> for Only<T> {
    type Error = DatabaseQueryError;

    fn try_from(mut value: Vec<T>) -> Result<Self, Self::Error> {
        match value.len() {
            0 => NoResultsSnafu.fail(),
            1 => value.pop().map(Only).context(NoResultsSnafu),
            _ => TooManyResultsSnafu.fail(),
        }
    }
}

impl<T> Deref for Only<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
