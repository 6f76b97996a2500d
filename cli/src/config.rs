use anyhow::{Context, Result};
use chrono_tz::Tz;
use directories::ProjectDirs;
use std::path::PathBuf;

const DEFAULT_ADMIN_NAME: &str = "Admin";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub timezone: Tz,
    pub admin_name: String,
    pub admin_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok(), || {
            let proj_dirs = ProjectDirs::from("", "", "chores")
                .context("Could not determine home directory")?;
            Ok(proj_dirs.data_dir().to_path_buf())
        })?;

        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!(
                "Failed to create data directory: {}",
                config.data_dir.display()
            )
        })?;
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        Ok(config)
    }

    /// Resolve settings from `lookup` (the environment in production), falling
    /// back to `default_data_dir` only when `CHORES_DATA_DIR` is unset.
    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_data_dir: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = match var("CHORES_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        let db_path = var("CHORES_DB_PATH").map_or_else(|| data_dir.join("chores.db"), PathBuf::from);

        let timezone = match var("CHORES_TIMEZONE") {
            Some(name) => chores_core::week::parse_timezone(&name)
                .with_context(|| format!("Invalid CHORES_TIMEZONE '{name}'"))?,
            None => chrono_tz::UTC,
        };

        Ok(Config {
            db_path,
            data_dir,
            timezone,
            admin_name: var("CHORES_ADMIN_NAME").unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
            admin_email: var("CHORES_ADMIN_EMAIL"),
        })
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)`; `newly_created` is true on first run.
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        std::fs::write(&path, &key).context("Failed to write API key file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set API key file permissions")?;
        }
        eprintln!("Generated new chores API key: {key}");
        eprintln!("Send it as: Authorization: Bearer {key}");
        Ok((key, true))
    }
}
