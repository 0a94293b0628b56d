use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use snafu::ResultExt as _;
use url::Url;

use crate::auth::Authenticator;
use crate::database::DatabaseConfig;
use crate::error::{ApplicationError, ConfigLoadSnafu};
use crate::session::{Sessions, IDLE_EXPIRY};
use crate::storage::Storage;

/// Application settings, read from the environment (and a `.env` file when present).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(rename = "host_address")]
    pub host: SocketAddr,
    #[serde(flatten)]
    pub database: DatabaseConfig,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    pub admin_email: String,
    pub auth_secret: String,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    pub public_url: Url,
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("templates")
}

impl Config {
    pub fn from_env() -> Result<Config, ApplicationError> {
        envy::from_env::<Config>().context(ConfigLoadSnafu)
    }

    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(SecretString::new(self.auth_secret.clone()), &self.admin_email)
    }

    pub fn storage(&self) -> Storage {
        Storage::new(&self.upload_dir, self.public_url.clone())
    }

    /// Session cookies are only marked secure when the site is served over https.
    pub fn sessions(&self) -> Sessions {
        Sessions::new(IDLE_EXPIRY, self.public_url.scheme() == "https")
    }

    /// Glob matching every page template.
    pub fn template_glob(&self) -> String {
        format!("{}/**/*.html", self.template_dir.display())
    }
}
