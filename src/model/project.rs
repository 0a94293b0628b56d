use crate::prelude::*;

use super::timestamp::{normalize, normalize_or, now, EpochMillis, StoredTime};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Planned,
    InProgress,
    Completed,
}

impl std::str::FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim() {
            "planned" => Ok(Status::Planned),
            "in-progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            other => UnknownStatusSnafu { text: other }.fail(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("unknown project status `{text}`"))]
pub struct UnknownStatus {
    pub text: String,
}

/// A project document exactly as it is stored.
#[derive(Debug, Clone, Deserialize)]
struct StoredProject {
    id: Record<Project>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    live_url: Option<String>,
    #[serde(default)]
    github_url: Option<String>,
    #[serde(default)]
    technologies: Option<Vec<String>>,
    #[serde(default)]
    category: String,
    #[serde(default)]
    status: Status,
    #[serde(default)]
    start_date: Option<StoredTime>,
    #[serde(default)]
    end_date: Option<StoredTime>,
    #[serde(default)]
    features: Option<Vec<String>>,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    created_at: Option<StoredTime>,
}

/// A portfolio project with its timestamps normalized to epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    #[serde(serialize_with = "super::serialize_key")]
    pub id: Record<Project>,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub technologies: Vec<String>,
    pub category: String,
    pub status: Status,
    pub start_date: Option<EpochMillis>,
    pub end_date: Option<EpochMillis>,
    pub features: Vec<String>,
    pub views: u64,
    pub likes: u64,
    pub created_at: EpochMillis,
}

define_table!("projects" : Project = id);

impl Project {
    fn from_stored(stored: StoredProject, read_at: EpochMillis) -> Self {
        Self {
            id: stored.id,
            title: stored.title,
            description: stored.description,
            image_url: stored.image_url,
            live_url: stored.live_url.filter(|url| !url.is_empty()),
            github_url: stored.github_url.filter(|url| !url.is_empty()),
            technologies: stored.technologies.unwrap_or_default(),
            category: stored.category,
            status: stored.status,
            start_date: normalize(stored.start_date.as_ref()),
            end_date: normalize(stored.end_date.as_ref()),
            features: stored.features.unwrap_or_default(),
            views: stored.views,
            likes: stored.likes,
            created_at: normalize_or(stored.created_at.as_ref(), read_at),
        }
    }

    /// Every project, newest first.
    #[instrument(skip(db))]
    pub async fn all(db: &Database) -> Result<Vec<Project>, DatabaseQueryError> {
        let stored: Vec<StoredProject> = db.sql("SELECT * FROM projects").fetch_first().await?;
        let read_at = now();

        let mut projects: Vec<Project> = stored
            .into_iter()
            .map(|project| Project::from_stored(project, read_at))
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(projects)
    }

    #[instrument(skip(db))]
    pub async fn get(key: &str, db: &Database) -> Result<Option<Project>, DatabaseQueryError> {
        let stored: Option<StoredProject> = db
            .sql("SELECT * FROM $id")
            .bind(("id", Record::<Project>::new(key.to_owned())))
            .fetch_first()
            .await?;

        Ok(stored.map(|project| Project::from_stored(project, now())))
    }

    /// Removes the project. There is no soft delete; the document is gone.
    #[instrument(skip(db))]
    pub async fn delete(key: &str, db: &Database) -> Result<bool, DatabaseQueryError> {
        let removed: Vec<serde_json::Value> = db
            .sql("DELETE $id RETURN BEFORE")
            .bind(("id", Record::<Project>::new(key.to_owned())))
            .fetch_first()
            .await?;

        tracing::info!(removed = !removed.is_empty(), "deleted project");
        Ok(!removed.is_empty())
    }
}

/// A project about to be written by the admin form.
#[derive(Debug, Clone, PartialEq, Serialize, new)]
pub struct NewProject {
    #[new(default)]
    pub id: Record<Project>,
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[new(default)]
    pub live_url: Option<String>,
    #[new(default)]
    pub github_url: Option<String>,
    #[new(default)]
    pub technologies: Vec<String>,
    #[new(default)]
    pub category: String,
    #[new(default)]
    pub status: Status,
    #[new(default)]
    pub start_date: Option<EpochMillis>,
    #[new(default)]
    pub end_date: Option<EpochMillis>,
    #[new(default)]
    pub features: Vec<String>,
    #[new(value = "0")]
    pub views: u64,
    #[new(value = "0")]
    pub likes: u64,
    #[new(value = "now()")]
    pub created_at: EpochMillis,
}

impl NewProject {
    #[instrument(skip(self, db), fields(id = %self.id, title = %self.title))]
    pub async fn insert(&self, db: &Database) -> Result<Project, DatabaseQueryError> {
        let Only(stored) = db
            .sql("CREATE $id CONTENT $content RETURN AFTER")
            .bind(("id", &self.id))
            .bind(("content", self))
            .fetch_one::<StoredProject>()
            .await?;

        tracing::info!("created project");
        Ok(Project::from_stored(stored, self.created_at))
    }

    #[cfg(test)]
    pub fn sample(title: &str) -> Self {
        Self::new(
            title.to_string(),
            format!("{title} description"),
            format!("https://example.com/uploads/projects/{title}.png"),
        )
    }
}
