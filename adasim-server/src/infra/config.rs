//! Environment-driven server configuration.

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub detector: DetectorConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory holding uploaded and processed media. Video references
    /// stored on runs resolve relative to this root.
    pub root: PathBuf,
}

impl Config {
    /// Load configuration from the environment. `.env` values are
    /// honored when the caller loaded them beforehand.
    pub fn from_env() -> anyhow::Result<Self> {
        let host =
            std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("SERVER_PORT") {
            Ok(raw) => raw.parse().context("invalid SERVER_PORT")?,
            Err(_) => 3000,
        };

        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL is required")?;

        let detector_url = std::env::var("DETECTOR_URL")
            .unwrap_or_else(|_| "http://localhost:5001/".into());
        let detector_url =
            Url::parse(&detector_url).context("invalid DETECTOR_URL")?;

        let detector_timeout = match std::env::var("DETECTOR_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse().context("invalid DETECTOR_TIMEOUT_SECS")?,
            ),
            Err(_) => adasim_core::detector::http::DEFAULT_TIMEOUT,
        };

        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig { url: database_url },
            detector: DetectorConfig {
                url: detector_url,
                timeout: detector_timeout,
            },
            media: MediaConfig { root: media_root },
        })
    }

    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.media.root).with_context(|| {
            format!("creating media root {}", self.media.root.display())
        })?;
        Ok(())
    }
}
