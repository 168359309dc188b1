//! Asset references: how storage keys are minted, how they are recovered
//! from the URLs handed out by the object store, and how asset URLs are
//! found inside arbitrary content trees.

use std::collections::BTreeSet;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

pub const DEFAULT_ASSET_PREFIX: &str = "Dashboard";

/// Storage key conventions for a single namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNaming {
    prefix: String,
}

impl Default for AssetNaming {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_PREFIX)
    }
}

impl AssetNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_matches('/').to_string();
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Fresh storage key for an uploaded file: `<prefix>/<millis>_<rand>_<name>`.
    pub fn mint_key(&self, original_name: &str) -> String {
        let nonce = Uuid::new_v4().simple().to_string();
        format!(
            "{}/{}_{}_{}",
            self.prefix,
            Utc::now().timestamp_millis(),
            &nonce[..8],
            sanitize_file_name(original_name)
        )
    }

    /// Recover the storage key from an asset URL previously returned by the store.
    ///
    /// The trailing path segment is percent-decoded and the namespace prefix is
    /// prepended when missing. Empty or malformed input yields `None`; callers
    /// treat that as "nothing to delete".
    pub fn resolve_key(&self, url: &str) -> Option<String> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let path = url.split(['?', '#']).next()?;
        // An absolute URL must carry a path after its authority.
        let path = match path.split_once("://") {
            Some((scheme, rest)) => {
                if scheme.is_empty() || scheme.contains('/') {
                    return None;
                }
                let (_authority, path) = rest.split_once('/')?;
                path
            }
            None => path,
        };
        let segment = path.rsplit('/').next()?;
        if segment.is_empty() {
            return None;
        }
        let decoded = urlencoding::decode(segment).ok()?;
        let decoded = decoded.trim();
        if decoded.is_empty() || decoded == "." || decoded == ".." || decoded.contains('\0') {
            return None;
        }
        let namespace = format!("{}/", self.prefix);
        if decoded.starts_with(&namespace) {
            Some(decoded.to_string())
        } else {
            Some(format!("{namespace}{decoded}"))
        }
    }
}

/// Public URL of `key` under `base_url`. The final path segment is
/// percent-encoded so `AssetNaming::resolve_key` recovers `key` verbatim.
pub fn asset_url(base_url: &str, key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    match key.rsplit_once('/') {
        Some((dir, name)) => format!("{base}/{dir}/{}", urlencoding::encode(name)),
        None => format!("{base}/{}", urlencoding::encode(key)),
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Recognises asset references by a fixed set of substrings (the store's
/// public URL, its domain).
#[derive(Debug, Clone, Default)]
pub struct AssetMatcher {
    markers: Vec<String>,
}

impl AssetMatcher {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers = markers
            .into_iter()
            .map(Into::into)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        Self { markers }
    }

    pub fn is_asset(&self, candidate: &str) -> bool {
        self.markers.iter().any(|m| candidate.contains(m.as_str()))
    }

    /// Every string leaf of `node`, at any depth, that looks like an asset URL.
    pub fn extract_asset_refs(&self, node: &Value) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.walk(node, &mut found);
        found
    }

    fn walk(&self, node: &Value, found: &mut BTreeSet<String>) {
        match node {
            Value::String(s) => {
                if self.is_asset(s) {
                    found.insert(s.clone());
                }
            }
            Value::Array(items) => items.iter().for_each(|item| self.walk(item, found)),
            Value::Object(map) => map.values().for_each(|item| self.walk(item, found)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_keys_live_under_prefix_and_resolve_back() {
        let naming = AssetNaming::new("Dashboard/");
        let key = naming.mint_key("my cover/photo.png");
        assert!(key.starts_with("Dashboard/"));
        assert!(key.ends_with("_my cover_photo.png"));
        let url = asset_url("https://bucket.s3.us-east-1.amazonaws.com", &key);
        assert!(!url.contains(' '));
        assert_eq!(naming.resolve_key(&url), Some(key));
    }

    #[test]
    fn blank_names_get_a_placeholder() {
        assert_eq!(sanitize_file_name("  "), "upload");
    }
}
