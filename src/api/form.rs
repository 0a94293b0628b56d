use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::Multipart;
use snafu::OptionExt as _;

use crate::model::{parse_date, EpochMillis};

use super::error::{InvalidFieldSnafu, WebError};

/// A file picked in an admin form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

/// A fully read multipart submission: every text field by name, plus the `image` file if one was picked.
#[derive(Debug, Default)]
pub struct Submission {
    fields: HashMap<String, Vec<String>>,
    image: Option<Upload>,
}

impl Submission {
    pub const IMAGE_FIELD: &'static str = "image";

    #[tracing::instrument(skip_all)]
    pub async fn read(mut multipart: Multipart) -> Result<Submission, WebError> {
        let mut submission = Submission::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == Self::IMAGE_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;

                // browsers send an empty part when no file was chosen
                if !filename.is_empty() && !bytes.is_empty() {
                    submission.image = Some(Upload { filename, bytes });
                }
                continue;
            }

            let value = field.text().await?;
            submission.fields.entry(name).or_default().push(value);
        }

        Ok(submission)
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn text(&self, name: &str) -> String {
        self.first(name).unwrap_or_default().to_string()
    }

    pub fn optional(&self, name: &str) -> Option<String> {
        self.first(name).map(str::to_string)
    }

    pub fn required(&self, name: &str) -> Result<String, WebError> {
        self.optional(name).context(InvalidFieldSnafu {
            field: name,
            reason: "it must not be empty",
        })
    }

    /// Every value submitted under `name`, trimmed, without blanks or repeats.
    pub fn list(&self, name: &str) -> Vec<String> {
        let mut list: Vec<String> = Vec::new();

        for value in self.fields.get(name).into_iter().flatten() {
            let value = value.trim();
            if !value.is_empty() && !list.iter().any(|seen| seen == value) {
                list.push(value.to_string());
            }
        }

        list
    }

    /// A `YYYY-MM-DD` field as midnight UTC. Absent fields are `None`; malformed ones are rejected.
    pub fn date(&self, name: &str) -> Result<Option<EpochMillis>, WebError> {
        let Some(text) = self.first(name) else {
            return Ok(None);
        };

        parse_date(text).map(Some).context(InvalidFieldSnafu {
            field: name,
            reason: "expected a date like 2024-03-01",
        })
    }

    pub fn image(&self) -> Result<&Upload, WebError> {
        self.image.as_ref().ok_or(WebError::MissingImage)
    }
}

#[cfg(test)]
impl Submission {
    pub fn with_fields(fields: &[(&str, &str)]) -> Self {
        let mut submission = Submission::default();
        for (name, value) in fields {
            submission
                .fields
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        submission
    }

    pub fn attach_image(&mut self, filename: &str, bytes: &'static [u8]) {
        self.image = Some(Upload {
            filename: filename.to_string(),
            bytes: Bytes::from_static(bytes),
        });
    }
}
