use std::time::Duration;

use anyhow::{bail, Context};

use crate::assets::{AssetMatcher, AssetNaming, DEFAULT_ASSET_PREFIX};
use crate::cleanup::RetryPolicy;
use crate::upload::UploadLimits;

pub const MIN_SECRET_LEN: usize = 32;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub access_secret: String,
    pub frontend_urls: Vec<String>,
    pub storage: StorageSettings,
    pub assets: AssetSettings,
    pub uploads: UploadLimits,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub public_url: Option<String>,
    pub public_read_acl: bool,
}

impl StorageSettings {
    /// Base URL under which stored objects are publicly reachable.
    pub fn public_url(&self) -> String {
        if let Some(url) = &self.public_url {
            return url.trim_end_matches('/').to_string();
        }
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }
}

/// How asset URLs are recognised, resolved and cleaned up.
#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub prefix: String,
    pub url_markers: Vec<String>,
    pub delete_retry: RetryPolicy,
}

impl AssetSettings {
    pub fn naming(&self) -> AssetNaming {
        AssetNaming::new(self.prefix.clone())
    }

    pub fn matcher(&self) -> AssetMatcher {
        AssetMatcher::new(self.url_markers.iter().cloned())
    }
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ASSET_PREFIX.into(),
            url_markers: vec!["amazonaws.com".into()],
            delete_retry: RetryPolicy::default(),
        }
    }
}

fn opt_env(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed_env<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match opt_env(name) {
        Some(v) => v.parse().map_err(|e| anyhow::anyhow!("{name}={v:?} is invalid: {e}")),
        None => Ok(default),
    }
}

fn list_env(name: &str) -> Vec<String> {
    opt_env(name)
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let access_secret = opt_env("ACCESS_SECRET").context("ACCESS_SECRET must be set")?;
        if access_secret.len() < MIN_SECRET_LEN {
            bail!("ACCESS_SECRET must be at least {MIN_SECRET_LEN} characters long");
        }

        let storage = StorageSettings {
            bucket: opt_env("S3_BUCKET_NAME").context("S3_BUCKET_NAME must be set")?,
            region: opt_env("AWS_REGION").unwrap_or_else(|| "us-east-1".into()),
            endpoint: opt_env("S3_ENDPOINT"),
            access_key_id: opt_env("AWS_ACCESS_KEY_ID"),
            secret_access_key: opt_env("AWS_SECRET_ACCESS_KEY"),
            public_url: opt_env("S3_PUBLIC_URL"),
            public_read_acl: parsed_env("S3_PUBLIC_READ_ACL", true)?,
        };

        // The store's own base URL always marks an asset; extra markers cover legacy hosts.
        let mut url_markers = vec![storage.public_url()];
        url_markers.extend(list_env("ASSET_URL_MARKERS"));

        let assets = AssetSettings {
            prefix: opt_env("ASSET_PREFIX").unwrap_or_else(|| DEFAULT_ASSET_PREFIX.into()),
            url_markers,
            delete_retry: RetryPolicy {
                max_attempts: parsed_env("DELETE_MAX_ATTEMPTS", 3u32)?.max(1),
                base_delay: Duration::from_millis(parsed_env("DELETE_BACKOFF_MS", 100u64)?),
            },
        };

        let mut frontend_urls = list_env("FRONTEND_URL");
        if frontend_urls.is_empty() {
            frontend_urls.push("http://localhost:5173".into());
        }

        Ok(Self {
            bind_addr: opt_env("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed_env("PORT", 8000u16)?,
            database_url: opt_env("DATABASE_URL"),
            db_max_connections: parsed_env("DB_MAX_CONNECTIONS", 5u32)?,
            access_secret,
            frontend_urls,
            storage,
            assets,
            uploads: UploadLimits {
                max_file_bytes: parsed_env("UPLOAD_MAX_BYTES", UploadLimits::default().max_file_bytes)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> StorageSettings {
        StorageSettings {
            bucket: "media".into(),
            region: "ap-south-1".into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            public_url: None,
            public_read_acl: true,
        }
    }

    #[test]
    fn public_url_defaults_to_virtual_hosted_aws() {
        assert_eq!(storage().public_url(), "https://media.s3.ap-south-1.amazonaws.com");
    }

    #[test]
    fn public_url_uses_path_style_for_custom_endpoints() {
        let s = StorageSettings { endpoint: Some("http://localhost:9000/".into()), ..storage() };
        assert_eq!(s.public_url(), "http://localhost:9000/media");
        let s = StorageSettings { public_url: Some("https://cdn.example.com/".into()), ..s };
        assert_eq!(s.public_url(), "https://cdn.example.com");
    }
}
