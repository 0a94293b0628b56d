use serde::Deserializer;

use crate::prelude::*;

use super::timestamp::{normalize_or, now, EpochMillis, StoredTime};

const EXCERPT_LENGTH: usize = 150;
const DESCRIPTION_LENGTH: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Link,
    Button,
    /// A block type this site does not render. It is kept in the store and skipped on pages.
    #[serde(other)]
    Unknown,
}

/// One block of a structured blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Block {
    pub fn is_rendered(&self) -> bool {
        self.kind != BlockKind::Unknown
    }
}

/// Post content is either a list of blocks or, for older posts, a single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Body {
    Blocks(Vec<Block>),
    Text(String),
}

/// Reads a `null` field the same way as a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for Body {
    fn default() -> Self {
        Body::Blocks(Vec::new())
    }
}

impl Body {
    /// Reads submitted content: a JSON array of blocks, anything else is kept as plain text.
    pub fn parse(input: &str) -> Body {
        serde_json::from_str::<Vec<Block>>(input).map(Body::Blocks).unwrap_or_else(|_| Body::Text(input.to_string()))
    }

    /// The teaser shown on cards.
    pub fn excerpt(&self) -> String {
        match self {
            Body::Text(text) => format!("{}...", truncate(text, EXCERPT_LENGTH)),
            Body::Blocks(blocks) => blocks
                .iter()
                .find(|block| block.kind == BlockKind::Paragraph)
                .map(|block| block.content.clone())
                .unwrap_or_default(),
        }
    }

    /// The page description used in metadata.
    pub fn description(&self) -> String {
        match self {
            Body::Text(text) => truncate(text, DESCRIPTION_LENGTH).to_string(),
            Body::Blocks(blocks) => blocks
                .iter()
                .find(|block| block.is_rendered())
                .map(|block| truncate(&block.content, DESCRIPTION_LENGTH).to_string())
                .unwrap_or_default(),
        }
    }

    /// The blocks a page renders. Legacy text becomes one paragraph per blank-line separated chunk.
    pub fn blocks(&self) -> Vec<Block> {
        match self {
            Body::Blocks(blocks) => blocks.iter().filter(|block| block.is_rendered()).cloned().collect(),
            Body::Text(text) => text
                .split("\n\n")
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty())
                .map(|chunk| Block::new(BlockKind::Paragraph, chunk.to_string(), None))
                .collect(),
        }
    }
}

fn truncate(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[derive(Debug, Clone, Deserialize)]
struct StoredPost {
    id: Record<BlogPost>,
    #[serde(default)]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    content: Body,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    author_id: String,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    created_at: Option<StoredTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlogPost {
    #[serde(serialize_with = "super::serialize_key")]
    pub id: Record<BlogPost>,
    pub title: String,
    pub content: Body,
    pub image_url: String,
    pub author_id: String,
    pub views: u64,
    pub likes: u64,
    pub created_at: EpochMillis,
}

define_table!("blog" : BlogPost = id);

impl BlogPost {
    fn from_stored(stored: StoredPost, read_at: EpochMillis) -> Self {
        Self {
            id: stored.id,
            title: stored.title,
            content: stored.content,
            image_url: stored.image_url,
            author_id: stored.author_id,
            views: stored.views,
            likes: stored.likes,
            created_at: normalize_or(stored.created_at.as_ref(), read_at),
        }
    }

    #[instrument(skip(db))]
    pub async fn all(db: &Database) -> Result<Vec<BlogPost>, DatabaseQueryError> {
        let stored: Vec<StoredPost> = db.sql("SELECT * FROM blog").fetch_first().await?;
        let read_at = now();

        let mut posts: Vec<BlogPost> = stored
            .into_iter()
            .map(|post| BlogPost::from_stored(post, read_at))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(posts)
    }

    #[instrument(skip(db))]
    pub async fn get(key: &str, db: &Database) -> Result<Option<BlogPost>, DatabaseQueryError> {
        let stored: Option<StoredPost> = db
            .sql("SELECT * FROM $id")
            .bind(("id", Record::<BlogPost>::new(key.to_owned())))
            .fetch_first()
            .await?;

        Ok(stored.map(|post| BlogPost::from_stored(post, now())))
    }

    #[instrument(skip(db))]
    pub async fn delete(key: &str, db: &Database) -> Result<bool, DatabaseQueryError> {
        let removed: Vec<serde_json::Value> = db
            .sql("DELETE $id RETURN BEFORE")
            .bind(("id", Record::<BlogPost>::new(key.to_owned())))
            .fetch_first()
            .await?;

        tracing::info!(removed = !removed.is_empty(), "deleted blog post");
        Ok(!removed.is_empty())
    }

    pub fn excerpt(&self) -> String {
        self.content.excerpt()
    }

    pub fn description(&self) -> String {
        self.content.description()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct NewBlogPost {
    #[new(default)]
    pub id: Record<BlogPost>,
    pub title: String,
    pub content: Body,
    pub image_url: String,
    pub author_id: String,
    #[new(value = "0")]
    pub views: u64,
    #[new(value = "0")]
    pub likes: u64,
    #[new(value = "now()")]
    pub created_at: EpochMillis,
}

impl NewBlogPost {
    #[instrument(skip(self, db), fields(id = %self.id, title = %self.title))]
    pub async fn insert(&self, db: &Database) -> Result<BlogPost, DatabaseQueryError> {
        let Only(stored) = db
            .sql("CREATE $id CONTENT $content RETURN AFTER")
            .bind(("id", &self.id))
            .bind(("content", self))
            .fetch_one::<StoredPost>()
            .await?;

        tracing::info!("created blog post");
        Ok(BlogPost::from_stored(stored, self.created_at))
    }

    #[cfg(test)]
    pub fn sample(title: &str) -> Self {
        Self::new(
            title.to_string(),
            Body::Blocks(vec![
                Block::new(BlockKind::Heading1, title.to_string(), None),
                Block::new(BlockKind::Paragraph, format!("{title} body"), None),
            ]),
            format!("https://example.com/uploads/blog/{title}.png"),
            "author".to_string(),
        )
    }
}
