//! Runtime configuration, read once from the environment at startup and
//! passed down explicitly; nothing in the service reads env vars after boot.

use std::env;
use uuid::Uuid;

pub struct Config {
    pub host: String,
    pub port: u16,
    /// SQLite database file holding templates, drafts, and quotas.
    pub db_path: String,
    /// Root directory for stored draft artifacts.
    pub blob_root: String,
    /// Public base URL used when building access URLs.
    pub base_url: String,
    /// Secret behind access-URL signature tokens.
    pub url_secret: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Config {
        let host = env_or("DRAFTGEN_HOST", "127.0.0.1");
        let port = env_or("DRAFTGEN_PORT", "8080").parse().unwrap_or(8080);
        let base_url = env::var("DRAFTGEN_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));
        // Without a configured secret, previously issued links stop
        // verifying after a restart; fine for local runs.
        let url_secret =
            env::var("DRAFTGEN_URL_SECRET").unwrap_or_else(|_| Uuid::new_v4().to_string());

        Config {
            host,
            port,
            db_path: env_or("DRAFTGEN_DB", "draftgen.sqlite"),
            blob_root: env_or("DRAFTGEN_BLOBS", "./blobs"),
            base_url,
            url_secret,
        }
    }
}
