use surrealdb::sql::Thing;

use crate::counter::CounterMutator;
use crate::prelude::*;

use super::{BlogPost, Project};

/// A numeric field on a countable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Counter {
    Views,
    Likes,
}

impl Counter {
    pub fn field(self) -> &'static str {
        match self {
            Counter::Views => "views",
            Counter::Likes => "likes",
        }
    }
}

/// The kinds of entity that carry view and like counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Project,
    Blog,
}

impl Kind {
    pub fn table(self) -> &'static str {
        match self {
            Kind::Project => Project::table(),
            Kind::Blog => BlogPost::table(),
        }
    }
}

/// Points at one countable entity without loading it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, new)]
pub struct EntityRef {
    pub kind: Kind,
    pub key: String,
}

impl EntityRef {
    pub fn project(key: impl Into<String>) -> Self {
        Self::new(Kind::Project, key.into())
    }

    pub fn blog(key: impl Into<String>) -> Self {
        Self::new(Kind::Blog, key.into())
    }

    pub fn thing(&self) -> Thing {
        Thing::from((self.kind.table(), self.key.as_str()))
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.table(), self.key)
    }
}

impl Database {
    /// Adds one to `counter` on the target and returns the value the increment produced.
    ///
    /// The update and the read happen in the same statement, which only touches the target record. `WHERE id` keeps
    /// a target that does not exist absent; it yields `None`.
    #[instrument(skip(self), fields(target = %target))]
    pub async fn increment(
        &self,
        target: &EntityRef,
        counter: Counter,
    ) -> Result<Option<u64>, DatabaseQueryError> {
        let query = format!(
            "UPDATE $id SET {field} += 1 WHERE id RETURN VALUE {field}",
            field = counter.field(),
        );

        let values: Vec<u64> = self
            .sql(query)
            .bind(("id", target.thing()))
            .fetch_first()
            .await?;

        let value = values.into_iter().next();
        tracing::debug!(?counter, ?value, "incremented counter");
        Ok(value)
    }
}

impl CounterMutator for Database {
    type Error = DatabaseQueryError;

    async fn increment(
        &self,
        target: &EntityRef,
        counter: Counter,
    ) -> Result<Option<u64>, Self::Error> {
        Database::increment(self, target, counter).await
    }
}
