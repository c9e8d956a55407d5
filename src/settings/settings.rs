use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub http: Http,
    pub log: Log,
    pub storage: Storage,
}

#[derive(Deserialize)]
pub struct Auth {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    /// Overridden by `JWT_SIGNING_KEY` when that variable is set.
    #[serde(default)]
    pub signing_key: Option<String>,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    #[serde(default)]
    pub tls: Option<Tls>,
}

#[derive(Debug, Deserialize)]
pub struct Tls {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Deserialize)]
pub struct Storage {
    pub backend: String, // "mysql" or "memory"
    #[serde(default)]
    pub dsn: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("backend", &self.backend)
            .field("dsn", &self.dsn.as_deref().map(redact_dsn))
            .field("max_connections", &self.max_connections)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

/// Hides the userinfo of a connection URL, keeping scheme, host and path.
fn redact_dsn(dsn: &str) -> String {
    let Some((scheme, rest)) = dsn.split_once("://") else {
        return "<redacted>".to_string();
    };
    match rest.rsplit_once('@') {
        Some((_, host)) => format!("{scheme}://<redacted>@{host}"),
        None => dsn.to_string(),
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(text: &str) -> Result<Settings> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow!(e))
    }

    #[test]
    fn optional_sections_take_defaults() {
        let settings = from_toml(
            r#"
[auth]
issuer = "matecircle"
audience = "matecircle-clients"
access_ttl_secs = 3600

[http]
address = "127.0.0.1:8001"

[log]
filter = "info"

[storage]
backend = "memory"
"#,
        )
        .unwrap();

        assert!(settings.http.tls.is_none());
        assert!(settings.auth.signing_key.is_none());
        assert_eq!(settings.storage.max_connections, 10);
        assert!(!settings.storage.run_migrations);
    }

    #[test]
    fn signing_key_is_not_printed() {
        let auth = Auth {
            issuer: "i".to_string(),
            audience: "a".to_string(),
            access_ttl_secs: 1,
            signing_key: Some("super-secret".to_string()),
        };
        assert!(!format!("{auth:?}").contains("super-secret"));
    }

    #[test]
    fn dsn_credentials_are_not_printed() {
        let storage = Storage {
            backend: "mysql".to_string(),
            dsn: Some("mysql://app:hunter2@db:3306/matecircle".to_string()),
            max_connections: 10,
            run_migrations: true,
        };

        let printed = format!("{storage:?}");
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("app:"));
        assert!(printed.contains("db:3306/matecircle"));
    }

    #[test]
    fn dsn_without_userinfo_is_kept() {
        assert_eq!(redact_dsn("mysql://db:3306/x"), "mysql://db:3306/x");
        assert_eq!(redact_dsn("not a url"), "<redacted>");
    }
}
