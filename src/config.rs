use anyhow::{Context, Result, bail};
use logapi::backend::graphql::DEFAULT_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("logctl"))
}

/// Get the config file path
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Config File
// ============================================================================

/// `~/.config/logctl/config.toml`
///
/// ```toml
/// default_profile = "prod"
///
/// [profiles.prod]
/// address = "https://logs.example.com"
/// token_file = "~/.secrets/logs-token"
/// timeout_secs = 60
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LogctlConfig {
    #[serde(default)]
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub address: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// File holding the token; `~` is expanded
    #[serde(default)]
    pub token_file: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Profile {
    /// Token from `token`, or read from `token_file`
    fn load_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        let Some(file) = &self.token_file else {
            return Ok(None);
        };
        let path = PathBuf::from(shellexpand::tilde(file).as_ref());
        let token = fs::read_to_string(&path)
            .with_context(|| format!("Could not read token file {}", path.display()))?;
        Ok(Some(token.trim().to_string()))
    }
}

impl LogctlConfig {
    /// Load the config file, or an empty config if there is none
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            log::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config format in {}", path.display()))
    }

    /// Resolve connection settings; flags and environment win over the file
    pub fn connection(&self, overrides: &Overrides) -> Result<Connection> {
        let profile = match overrides.profile.as_deref().or(self.default_profile.as_deref()) {
            Some(name) => self
                .profiles
                .get(name)
                .cloned()
                .with_context(|| format!("Profile '{name}' not found in config"))?,
            None => Profile::default(),
        };

        let Some(address) = overrides.address.clone().or(profile.address.clone()) else {
            bail!(
                "No cluster address configured. Use --address, LOGCTL_ADDRESS or a profile in ~/.config/logctl/config.toml"
            );
        };
        let token = match &overrides.token {
            Some(token) => token.clone(),
            None => match profile.load_token()? {
                Some(token) => token,
                None => bail!(
                    "No API token configured. Use --token, LOGCTL_TOKEN or a profile in ~/.config/logctl/config.toml"
                ),
            },
        };
        let timeout = profile.timeout_secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        Ok(Connection {
            address,
            token,
            timeout,
        })
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub address: Option<String>,
    pub token: Option<String>,
    pub profile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub address: String,
    pub token: String,
    pub timeout: Duration,
}

impl Connection {
    pub fn client(&self) -> logapi::Client {
        logapi::Client::with_timeout(&self.address, &self.token, self.timeout)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CONFIG: &str = r#"
default_profile = "prod"

[profiles.prod]
address = "https://prod.example.com"
token = "prod-secret"
timeout_secs = 60

[profiles.dev]
address = "http://localhost:8080"
token = "dev-secret"
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_profile() {
        let file = write_config(CONFIG);
        let config = LogctlConfig::load_from(file.path()).unwrap();

        let conn = config.connection(&Overrides::default()).unwrap();
        assert_eq!(conn.address, "https://prod.example.com");
        assert_eq!(conn.token, "prod-secret");
        assert_eq!(conn.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides_win() {
        let file = write_config(CONFIG);
        let config = LogctlConfig::load_from(file.path()).unwrap();

        let conn = config
            .connection(&Overrides {
                profile: Some("dev".into()),
                token: Some("flag-secret".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(conn.address, "http://localhost:8080");
        assert_eq!(conn.token, "flag-secret");
        assert_eq!(conn.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_unknown_profile() {
        let file = write_config(CONFIG);
        let config = LogctlConfig::load_from(file.path()).unwrap();

        let err = config
            .connection(&Overrides {
                profile: Some("staging".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("staging"));
    }

    #[test]
    fn test_missing_address_and_token() {
        let config = LogctlConfig::default();
        let err = config.connection(&Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("address"));

        let err = config
            .connection(&Overrides {
                address: Some("http://localhost".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_token_file() {
        let mut token = NamedTempFile::new().unwrap();
        writeln!(token, "file-secret").unwrap();
        let config = LogctlConfig {
            default_profile: Some("p".into()),
            profiles: BTreeMap::from([(
                "p".to_string(),
                Profile {
                    address: Some("http://localhost".into()),
                    token_file: Some(token.path().display().to_string()),
                    ..Default::default()
                },
            )]),
        };

        let conn = config.connection(&Overrides::default()).unwrap();
        assert_eq!(conn.token, "file-secret");
    }

    #[test]
    fn test_invalid_config() {
        let file = write_config("profiles = 3");
        assert!(LogctlConfig::load_from(file.path()).is_err());
    }
}
