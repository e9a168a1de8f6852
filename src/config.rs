//! Environment-driven configuration for both binaries.
//!
//! Everything is read once at startup; there is no config file.

use std::{env, path::PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_API_URL: &str = "http://localhost:5001";
pub const DEFAULT_MODEL_DIR: &str = "models";

/// The one browser origin the relay accepts besides origin-less requests.
pub const ALLOWED_ORIGIN: &str = "http://localhost:8082";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Gcs,
    Memory,
}

#[derive(Clone)]
pub struct GcsCredentials {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    pub bucket: String,
}

impl std::fmt::Debug for GcsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcsCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub port: u16,
    pub store: StoreKind,
    pub gcs: Option<GcsCredentials>,
    /// Bucket name used for public URLs; also set for the memory store.
    pub bucket: String,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|err| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
                reason: err.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let store = match lookup("MAKEUP_STORE").as_deref().map(str::trim) {
            None | Some("") | Some("gcs") => StoreKind::Gcs,
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "MAKEUP_STORE",
                    value: other.to_string(),
                    reason: "expected `gcs` or `memory`".to_string(),
                });
            }
        };

        match store {
            StoreKind::Gcs => {
                let required = |name: &'static str| {
                    lookup(name)
                        .filter(|v| !v.trim().is_empty())
                        .ok_or(ConfigError::Missing(name))
                };
                let gcs = GcsCredentials {
                    project_id: required("GCLOUD_PROJECT_ID")?,
                    client_email: required("GCLOUD_CLIENT_EMAIL")?,
                    private_key: unescape_private_key(&required("GCLOUD_PRIVATE_KEY")?),
                    bucket: required("GCLOUD_BUCKET_NAME")?,
                };
                Ok(Self {
                    port,
                    store,
                    bucket: gcs.bucket.clone(),
                    gcs: Some(gcs),
                })
            }
            StoreKind::Memory => Ok(Self {
                port,
                store,
                gcs: None,
                bucket: lookup("GCLOUD_BUCKET_NAME").unwrap_or_else(|| "local".to_string()),
            }),
        }
    }
}

/// Keys pasted into a single env line carry literal `\n` sequences.
pub fn unescape_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub model_dir: PathBuf,
    pub face_model_url: Option<String>,
    pub landmark_model_url: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_url: non_empty("API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model_dir: non_empty("MAKEUP_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
            face_model_url: non_empty("MAKEUP_FACE_MODEL_URL"),
            landmark_model_url: non_empty("MAKEUP_LANDMARK_MODEL_URL"),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn relay_defaults_to_port_5001() {
        let cfg = RelayConfig::from_lookup(lookup(&[("MAKEUP_STORE", "memory")])).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.store, StoreKind::Memory);
        assert!(cfg.gcs.is_none());
    }

    #[test]
    fn gcs_requires_every_credential() {
        let err = RelayConfig::from_lookup(lookup(&[
            ("GCLOUD_PROJECT_ID", "proj"),
            ("GCLOUD_CLIENT_EMAIL", "svc@proj.iam.gserviceaccount.com"),
            ("GCLOUD_BUCKET_NAME", "looks"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GCLOUD_PRIVATE_KEY")));
    }

    #[test]
    fn gcs_private_key_newlines_are_expanded() {
        let cfg = RelayConfig::from_lookup(lookup(&[
            ("GCLOUD_PROJECT_ID", "proj"),
            ("GCLOUD_CLIENT_EMAIL", "svc@proj.iam.gserviceaccount.com"),
            ("GCLOUD_PRIVATE_KEY", "-----BEGIN-----\\nabc\\n-----END-----"),
            ("GCLOUD_BUCKET_NAME", "looks"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        let gcs = cfg.gcs.unwrap();
        assert_eq!(gcs.private_key, "-----BEGIN-----\nabc\n-----END-----");
        assert_eq!(cfg.bucket, "looks");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn bad_port_is_reported() {
        let err =
            RelayConfig::from_lookup(lookup(&[("MAKEUP_STORE", "memory"), ("PORT", "abc")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn client_defaults() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.model_dir, PathBuf::from("models"));
        assert!(cfg.face_model_url.is_none());

        let cfg = ClientConfig::from_lookup(lookup(&[("API_URL", "http://relay:9000/")]));
        assert_eq!(cfg.api_url, "http://relay:9000");
    }
}
