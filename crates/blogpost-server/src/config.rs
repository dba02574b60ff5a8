use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

use blogpost_api::Features;

/// Server settings, read from `BLOGPOST_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub features: Features,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: get("BLOGPOST_HOST", "0.0.0.0"),
            port: parse_var("BLOGPOST_PORT", &get("BLOGPOST_PORT", "5000"))?,
            db_path: get("BLOGPOST_DB_PATH", "blogpost.db").into(),
            upload_dir: get("BLOGPOST_UPLOAD_DIR", "./uploads").into(),
            max_upload_bytes: parse_var(
                "BLOGPOST_MAX_UPLOAD_BYTES",
                &get("BLOGPOST_MAX_UPLOAD_BYTES", "10485760"),
            )?,
            features: Features {
                uploads_enabled: parse_bool(
                    "BLOGPOST_UPLOADS_ENABLED",
                    &get("BLOGPOST_UPLOADS_ENABLED", "true"),
                )?,
                enforce_ownership: parse_bool(
                    "BLOGPOST_ENFORCE_OWNERSHIP",
                    &get("BLOGPOST_ENFORCE_OWNERSHIP", "true"),
                )?,
            },
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{} has invalid value {:?}", key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{} has invalid boolean value {:?}", key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_path, PathBuf::from("blogpost.db"));
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.features.uploads_enabled);
        assert!(config.features.enforce_ownership);
        assert_eq!(config.addr().unwrap().port(), 5000);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("BLOGPOST_PORT", "8080"),
            ("BLOGPOST_UPLOADS_ENABLED", "off"),
            ("BLOGPOST_ENFORCE_OWNERSHIP", "FALSE"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(!config.features.uploads_enabled);
        assert!(!config.features.enforce_ownership);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[("BLOGPOST_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("BLOGPOST_PORT"));

        let err = config(&[("BLOGPOST_UPLOADS_ENABLED", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("BLOGPOST_UPLOADS_ENABLED"));
    }
}
