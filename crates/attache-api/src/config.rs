//! Server configuration loaded from the environment.

use std::env;

use anyhow::{anyhow, Context, Result};
use attache_core::{LambdaSettings, VersionSpec};
use attache_storage::{StorageConfig, Storages, CACHE, STORE};

const DEFAULT_PORT: u16 = 4000;
const DISPATCH_QUEUE_SIZE: usize = 1000;
const DISPATCH_MAX_CONCURRENT: usize = 8;
const MAX_CALLBACK_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// In-memory records are used when unset
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// record type → table, from `RECORD_TABLES=User=users,Post=posts`
    pub record_tables: Vec<(String, String)>,
    pub dispatch_queue_size: usize,
    pub dispatch_max_concurrent: usize,
    pub max_body_bytes: usize,
    pub cache_bucket: String,
    pub cache_prefix: Option<String>,
    pub store_bucket: String,
    pub store_prefix: Option<String>,
    /// The function every dispatch is sent to
    pub processing_function: Option<String>,
    /// Versions requested from the function, from `PROCESSING_VERSIONS=size40=40x40,...`
    pub processing_versions: Vec<VersionSpec>,
    pub lambda: LambdaSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port = match env::var("PORT") {
            Ok(value) => value
                .parse()
                .map_err(|_| anyhow!("PORT must be a valid number"))?,
            Err(_) => DEFAULT_PORT,
        };

        let lambda = LambdaSettings::from_env().context("Invalid Lambda configuration")?;

        let record_tables = match env::var("RECORD_TABLES") {
            Ok(value) => parse_record_tables(&value)?,
            Err(_) => Vec::new(),
        };

        let processing_versions = match env::var("PROCESSING_VERSIONS") {
            Ok(value) => parse_versions(&value)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            port,
            database_url: non_empty_var("DATABASE_URL"),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),
            record_tables,
            dispatch_queue_size: parse_or("DISPATCH_QUEUE_SIZE", DISPATCH_QUEUE_SIZE).max(1),
            dispatch_max_concurrent: parse_or("DISPATCH_MAX_CONCURRENT", DISPATCH_MAX_CONCURRENT)
                .max(1),
            max_body_bytes: parse_or("MAX_CALLBACK_BODY_BYTES", MAX_CALLBACK_BODY_BYTES),
            cache_bucket: non_empty_var("CACHE_BUCKET")
                .context("CACHE_BUCKET must be set")?,
            cache_prefix: non_empty_var("CACHE_PREFIX"),
            store_bucket: non_empty_var("STORE_BUCKET")
                .context("STORE_BUCKET must be set")?,
            store_prefix: non_empty_var("STORE_PREFIX"),
            processing_function: non_empty_var("PROCESSING_FUNCTION"),
            processing_versions,
            lambda,
        })
    }

    pub fn storages(&self) -> Storages {
        let mut cache = StorageConfig::new(&self.cache_bucket);
        if let Some(prefix) = &self.cache_prefix {
            cache = cache.with_prefix(prefix);
        }
        let mut store = StorageConfig::new(&self.store_bucket);
        if let Some(prefix) = &self.store_prefix {
            store = store.with_prefix(prefix);
        }
        Storages::new().with(CACHE, cache).with(STORE, store)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn parse_record_tables(value: &str) -> Result<Vec<(String, String)>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (record_type, table) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid RECORD_TABLES entry: {}", entry))?;
            Ok((record_type.trim().to_string(), table.trim().to_string()))
        })
        .collect()
}

/// `size40=40x40,thumb=100x100:webp` → version specs targeting the store.
fn parse_versions(value: &str) -> Result<Vec<VersionSpec>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, spec) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid PROCESSING_VERSIONS entry: {}", entry))?;
            let (size, format) = match spec.split_once(':') {
                Some((size, format)) => (size, Some(format)),
                None => (spec, None),
            };
            let (width, height) = size
                .split_once('x')
                .and_then(|(w, h)| Some((w.parse().ok()?, h.parse().ok()?)))
                .ok_or_else(|| anyhow!("Invalid size in PROCESSING_VERSIONS entry: {}", entry))?;

            let mut version = VersionSpec::new(name.trim(), STORE).resize(width, height);
            if let Some(format) = format {
                version = version.format(format);
            }
            Ok(version)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        let versions = parse_versions("size40=40x40, thumb=100x80:webp").unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].name, "size40");
        assert_eq!(versions[0].storage, STORE);
        assert_eq!((versions[0].width, versions[0].height), (Some(40), Some(40)));
        assert_eq!(versions[1].format.as_deref(), Some("webp"));
        assert_eq!(versions[1].height, Some(80));

        assert!(parse_versions("size40=40").is_err());
        assert!(parse_versions("size40").is_err());
        assert!(parse_versions("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_record_tables() {
        let tables = parse_record_tables("User=users, BlogPost=blog_posts").unwrap();
        assert_eq!(
            tables,
            vec![
                ("User".to_string(), "users".to_string()),
                ("BlogPost".to_string(), "blog_posts".to_string())
            ]
        );
        assert!(parse_record_tables("users").is_err());
    }
}
