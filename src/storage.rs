use std::path::{Path, PathBuf};

use snafu::{Location, OptionExt as _, ResultExt as _, Snafu};
use url::Url;

use crate::model::now;

/// Path under which uploaded files are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("failed to write upload `{}`", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{base}` cannot carry an upload path"))]
    PublicUrl {
        base: Url,
        #[snafu(implicit)]
        location: Location,
    },
}

/// Binary object store backed by a local directory.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    public_url: Url,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, public_url: Url) -> Self {
        Self {
            root: root.into(),
            public_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores `bytes` under `<prefix>/<epoch-ms>-<filename>` and returns the public download url. Every path
    /// segment of the url is percent-encoded, so names with `#`, `?` or spaces still point at the stored file.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(&self, prefix: &str, filename: &str, bytes: &[u8]) -> Result<Url, StorageError> {
        let name = format!("{}-{}", now(), file_name(filename));
        let path = self.root.join(prefix).join(&name);

        let mut url = self.public_url.clone();
        url.path_segments_mut()
            .ok()
            .context(PublicUrlSnafu {
                base: self.public_url.clone(),
            })?
            .pop_if_empty()
            .extend([UPLOADS_ROUTE.trim_start_matches('/'), prefix, name.as_str()]);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(WriteSnafu { path: parent })?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .context(WriteSnafu { path: &path })?;

        tracing::info!(%url, "stored upload");
        Ok(url)
    }
}

/// Keeps only the last path component of a client supplied file name.
fn file_name(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();

    match name {
        "" | "." | ".." => "upload".to_string(),
        name => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("folio-{name}-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn client_paths_are_stripped() {
        assert_eq!(file_name("cover.png"), "cover.png");
        assert_eq!(file_name("../../etc/passwd"), "passwd");
        assert_eq!(file_name("C:\\photos\\me.jpg"), "me.jpg");
        assert_eq!(file_name(".."), "upload");
        assert_eq!(file_name(""), "upload");
    }

    #[tokio::test]
    async fn uploads_are_written_and_addressable() {
        let root = scratch_dir("upload");
        let storage = Storage::new(&root, Url::parse("http://localhost:3000/site").unwrap());

        let url = storage.upload("projects", "cover.png", b"png").await.unwrap();

        let path = url.path();
        assert!(path.starts_with("/site/uploads/projects/"), "{path}");
        assert!(path.ends_with("-cover.png"), "{path}");

        let stored = path.trim_start_matches("/site/uploads/");
        let bytes = tokio::fs::read(root.join(stored)).await.unwrap();
        assert_eq!(bytes, b"png");

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn unsafe_characters_are_encoded_in_the_url() {
        let root = scratch_dir("encoded");
        let storage = Storage::new(&root, Url::parse("http://localhost:3000").unwrap());

        for filename in ["cover #2.png", "what?.png"] {
            let url = storage.upload("projects", filename, b"png").await.unwrap();

            assert_eq!(url.fragment(), None, "{url}");
            assert_eq!(url.query(), None, "{url}");

            let segments: Vec<&str> = url.path_segments().unwrap().collect();
            assert_eq!(segments[..2], ["uploads", "projects"]);

            let encoded = segments[2];
            let stored = encoded.replace("%20", " ").replace("%23", "#").replace("%3F", "?");
            assert!(stored.ends_with(&format!("-{filename}")), "{encoded}");

            let bytes = tokio::fs::read(root.join("projects").join(&stored)).await.unwrap();
            assert_eq!(bytes, b"png");
        }

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn nothing_is_written_without_a_usable_public_url() {
        let root = scratch_dir("mailto");
        let storage = Storage::new(&root, Url::parse("mailto:admin@example.com").unwrap());

        let result = storage.upload("blog", "a.png", b"png").await;

        assert!(matches!(result, Err(StorageError::PublicUrl { .. })));
        assert!(!root.exists());
    }
}
