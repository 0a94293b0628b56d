use crate::prelude::*;

use super::timestamp::{normalize_or, now, EpochMillis, StoredTime};

pub const DEFAULT_RATING: u8 = 5;

#[derive(Debug, Clone, Deserialize)]
struct StoredFeedback {
    id: Record<Feedback>,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    content: String,
    #[serde(default = "default_rating")]
    rating: u8,
    #[serde(default)]
    created_at: Option<StoredTime>,
}

fn default_rating() -> u8 {
    DEFAULT_RATING
}

/// A guestbook entry. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feedback {
    #[serde(serialize_with = "super::serialize_key")]
    pub id: Record<Feedback>,
    pub user_id: String,
    pub content: String,
    pub rating: u8,
    pub created_at: EpochMillis,
}

define_table!("feedback" : Feedback = id);

impl Feedback {
    fn from_stored(stored: StoredFeedback, read_at: EpochMillis) -> Self {
        Self {
            id: stored.id,
            user_id: stored.user_id,
            content: stored.content,
            rating: stored.rating,
            created_at: normalize_or(stored.created_at.as_ref(), read_at),
        }
    }

    /// Every guestbook entry, newest first.
    #[instrument(skip(db))]
    pub async fn all(db: &Database) -> Result<Vec<Feedback>, DatabaseQueryError> {
        let stored: Vec<StoredFeedback> = db.sql("SELECT * FROM feedback").fetch_first().await?;
        let read_at = now();

        let mut entries: Vec<Feedback> = stored
            .into_iter()
            .map(|entry| Feedback::from_stored(entry, read_at))
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(entries)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct NewFeedback {
    #[new(default)]
    pub id: Record<Feedback>,
    pub user_id: String,
    pub content: String,
    #[new(value = "DEFAULT_RATING")]
    pub rating: u8,
    #[new(value = "now()")]
    pub created_at: EpochMillis,
}

impl NewFeedback {
    #[instrument(skip(self, db), fields(user_id = %self.user_id))]
    pub async fn insert(&self, db: &Database) -> Result<Feedback, DatabaseQueryError> {
        let Only(stored) = db
            .sql("CREATE $id CONTENT $content RETURN AFTER")
            .bind(("id", &self.id))
            .bind(("content", self))
            .fetch_one::<StoredFeedback>()
            .await?;

        tracing::info!("signed the guestbook");
        Ok(Feedback::from_stored(stored, self.created_at))
    }
}
