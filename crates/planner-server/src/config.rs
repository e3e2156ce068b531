use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info};

const CONFIG_ENV: &str = "PLANNER_SERVER_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "planner-server.toml";

/// Account created at startup when no user with its email exists.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    pub pool_size: u32,
    pub admin: Option<AdminSeed>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database: PathBuf::from("planner.db"),
            pool_size: 8,
            admin: None,
        }
    }
}

impl ServerConfig {
    /// Reads `explicit`, else `PLANNER_SERVER_CONFIG`, else
    /// `planner-server.toml` when present, then applies `PORT` and
    /// `PLANNER_DB`.
    #[tracing::instrument]
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(|| {
                    let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                    candidate.exists().then_some(candidate)
                }),
        };

        let mut cfg = match path {
            Some(path) => {
                info!(config = %path.display(), "loading server config");
                Self::from_file(&path)?
            }
            None => {
                debug!("no server config file; using defaults");
                Self::default()
            }
        };
        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT `{port}`"))?;
        }
        if let Some(db) = lookup("PLANNER_DB").filter(|db| !db.trim().is_empty()) {
            self.database = PathBuf::from(db.trim());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|err| anyhow!("invalid host `{}`: {err}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn toml_with_admin_section() {
        let cfg = ServerConfig::from_toml(
            r#"
port = 8080
database = "/var/lib/planner/planner.db"

[admin]
name = "Admin"
email = "admin@example.com"
password = "change-me"
"#,
        )
        .expect("valid config");

        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.pool_size, 8);
        assert_eq!(
            cfg.admin.as_ref().map(|admin| admin.email.as_str()),
            Some("admin@example.com")
        );
        assert_eq!(
            cfg.socket_addr().expect("addr"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("addr")
        );
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [("PORT", "4000"), ("PLANNER_DB", "other.db")].into();
        let mut cfg = ServerConfig::default();
        cfg.apply_env(|key| env.get(key).map(|v| v.to_string()))
            .expect("valid env");
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.database, PathBuf::from("other.db"));

        let mut cfg = ServerConfig::default();
        assert!(cfg.apply_env(|_| Some("not-a-port".to_string())).is_err());
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(ServerConfig::from_toml("port = \"three thousand\"").is_err());
        let cfg = ServerConfig {
            host: "localhost".to_string(),
            ..ServerConfig::default()
        };
        assert!(cfg.socket_addr().is_err());
    }
}
