//! Configuration management
//!
//! Loads the agent configuration from a TOML file, layers `CAMPNET__*`
//! environment overrides on top, and validates the result. A one-time
//! interactive setup can write a fresh config when none exists yet.

use crate::error::ConfigError;
use crate::models::{Credentials, EligibilityRule};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "CAMPNET";

/// Root configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub eligibility: EligibilityConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub settle: SettleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GlobalConfig {
    /// Seconds between two polling ticks
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PortalConfig {
    /// Portal origin, e.g. `https://campnet.example.edu:8090`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: String::new(),
            password: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    PortalReachability,
    AllowedSsids,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EligibilityConfig {
    #[serde(default = "default_rule")]
    pub rule: RuleKind,

    /// SSIDs accepted by the `allowed_ssids` rule
    #[serde(default)]
    pub ssids: Vec<String>,

    /// Minimum seconds between two platform SSID lookups
    #[serde(default = "default_identity_refresh")]
    pub identity_refresh_secs: u64,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            rule: default_rule(),
            ssids: Vec::new(),
            identity_refresh_secs: default_identity_refresh(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_url")]
    pub url: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: default_probe_url(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Portals usually serve a self-signed certificate
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

/// Pauses after portal POSTs before re-checking connectivity
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SettleConfig {
    #[serde(default = "default_after_login_ms")]
    pub after_login_ms: u64,

    #[serde(default = "default_after_logout_ms")]
    pub after_logout_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            after_login_ms: default_after_login_ms(),
            after_logout_ms: default_after_logout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file path
    #[serde(default)]
    pub log_file: String,

    /// The log file is rotated once at startup when it grows past this size
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: String::new(),
            max_log_bytes: default_max_log_bytes(),
        }
    }
}

// Default value functions
fn default_check_interval() -> u64 {
    10
}

fn default_base_url() -> String {
    "https://campnet.bits-goa.ac.in:8090".to_string()
}

fn default_rule() -> RuleKind {
    RuleKind::PortalReachability
}

fn default_identity_refresh() -> u64 {
    60
}

fn default_probe_url() -> String {
    "https://connectivitycheck.gstatic.com/generate_204".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_after_login_ms() -> u64 {
    1000
}

fn default_after_logout_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_bytes() -> u64 {
    500_000
}

impl Config {
    /// Candidate config locations, in lookup order
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![path.to_path_buf()];
        }

        let mut paths = vec![PathBuf::from("config.toml")];
        if let Some(user) = Self::user_config_path() {
            paths.push(user);
        }
        paths.push(PathBuf::from("/etc/campnet/config.toml"));
        paths
    }

    /// Per-user config location used by interactive setup
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("campnet").join("config.toml"))
    }

    /// First existing candidate from [`Config::search_paths`]
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let candidates = Self::search_paths(explicit);

        candidates
            .iter()
            .find(|p| p.exists())
            .cloned()
            .ok_or_else(|| {
                ConfigError::NotFound(
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                )
            })
    }

    /// Locate, load and validate the configuration.
    ///
    /// Returns the config together with the file it was read from.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let path = Self::locate(explicit)?;

        tracing::debug!("Loading config from: {}", path.display());
        let cfg = Self::load_file(&path)?;
        cfg.validate()?;
        Ok((cfg, path))
    }

    /// Read one file plus environment overrides, without validation
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = Self::file_source(path)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("eligibility.ssids"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Read one file as written on disk, ignoring environment overrides
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::file_source(path).build()?.try_deserialize()?)
    }

    fn file_source(path: &Path) -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.portal.username.trim().is_empty() {
            return Err(ConfigError::MissingField("portal.username"));
        }
        if self.portal.password.is_empty() {
            return Err(ConfigError::MissingField("portal.password"));
        }
        if self.global.check_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "global.check_interval",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if let Err(e) = reqwest::Url::parse(&self.portal.base_url) {
            return Err(ConfigError::Invalid {
                field: "portal.base_url",
                reason: e.to_string(),
            });
        }
        if self.eligibility.rule == RuleKind::AllowedSsids && self.eligibility.ssids.is_empty() {
            return Err(ConfigError::Invalid {
                field: "eligibility.ssids",
                reason: "the allowed_ssids rule needs at least one SSID".to_string(),
            });
        }
        Ok(())
    }

    /// Write the config as pretty TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |reason: String| ConfigError::Write {
            path: path.to_path_buf(),
            reason,
        };

        let contents = toml::to_string_pretty(self).map_err(|e| write_err(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        std::fs::write(path, contents).map_err(|e| write_err(e.to_string()))?;

        tracing::info!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.global.check_interval)
    }

    pub fn identity_refresh(&self) -> Duration {
        Duration::from_secs(self.eligibility.identity_refresh_secs)
    }

    pub fn settle_after_login(&self) -> Duration {
        Duration::from_millis(self.settle.after_login_ms)
    }

    pub fn settle_after_logout(&self) -> Duration {
        Duration::from_millis(self.settle.after_logout_ms)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.portal.username.clone(),
            password: self.portal.password.clone(),
        }
    }

    pub fn eligibility_rule(&self) -> EligibilityRule {
        match self.eligibility.rule {
            RuleKind::PortalReachability => EligibilityRule::PortalReachability,
            RuleKind::AllowedSsids => EligibilityRule::AllowedIdentifiers(
                self.eligibility.ssids.iter().cloned().collect(),
            ),
        }
    }
}

/// Prompt for credentials, merge them into `base` and persist it at `path`.
///
/// The password is echoed; run this from a private terminal.
pub fn interactive_setup<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    base: Config,
    path: &Path,
) -> Result<Config, ConfigError> {
    let username = prompt(input, output, "Portal username: ")?;
    let password = prompt(input, output, "Portal password: ")?;

    let mut cfg = base;
    cfg.portal.username = username;
    cfg.portal.password = password;
    cfg.validate()?;
    cfg.save(path)?;
    Ok(cfg)
}

/// Load the config, running interactive setup when `terminal` is given and
/// no file exists or the found file lacks credentials.
///
/// A missing file is created at `explicit` or the per-user location; a file
/// without credentials is rewritten in place, keeping its other settings.
pub fn load_or_setup<R: BufRead, W: Write>(
    explicit: Option<&Path>,
    terminal: Option<(&mut R, &mut W)>,
) -> Result<(Config, PathBuf), ConfigError> {
    let err = match Config::load(explicit) {
        Ok(found) => return Ok(found),
        Err(e) => e,
    };
    let Some((input, output)) = terminal else {
        return Err(err);
    };

    let (base, path) = if matches!(err, ConfigError::NotFound(_)) {
        let target = explicit
            .map(Path::to_path_buf)
            .or_else(Config::user_config_path);
        let Some(path) = target else {
            return Err(err);
        };
        (Config::default(), path)
    } else if matches!(err, ConfigError::MissingField(_)) {
        let path = Config::locate(explicit)?;
        (Config::read_file(&path)?, path)
    } else {
        return Err(err);
    };

    let note = format!(
        "No usable configuration found; starting setup for {}\n",
        path.display()
    );
    let _ = output.write_all(note.as_bytes());
    let cfg = interactive_setup(input, output, base, &path)?;
    Ok((cfg, path))
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &'static str,
) -> Result<String, ConfigError> {
    let stdin_err = |source: std::io::Error| ConfigError::Read {
        path: PathBuf::from("<stdin>"),
        source,
    };

    output.write_all(label.as_bytes()).map_err(stdin_err)?;
    output.flush().map_err(stdin_err)?;

    let mut line = String::new();
    input.read_line(&mut line).map_err(stdin_err)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
