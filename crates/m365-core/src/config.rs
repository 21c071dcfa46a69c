//! Server settings.
//!
//! Settings come from an optional YAML file, then environment variables
//! override individual keys. Environment names are the upper-case field
//! names (`AZURE_TENANT_ID`, `AUTH_METHOD`, ...); lower-case spellings are
//! accepted too.

use crate::error::{AdminError, Result};
use crate::validation::is_valid_guid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "m365-admin.yaml";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

const LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

// ---------------------------------------------------------------------------
// AuthMethod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum AuthMethod {
    #[default]
    DeviceCode,
    Interactive,
    ClientSecret,
    Certificate,
    /// Pre-acquired bearer token supplied through `graph_access_token`.
    AccessToken,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::DeviceCode => "device_code",
            AuthMethod::Interactive => "interactive",
            AuthMethod::ClientSecret => "client_secret",
            AuthMethod::Certificate => "certificate",
            AuthMethod::AccessToken => "access_token",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = AdminError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "device_code" => Ok(AuthMethod::DeviceCode),
            "interactive" => Ok(AuthMethod::Interactive),
            "client_secret" => Ok(AuthMethod::ClientSecret),
            "certificate" => Ok(AuthMethod::Certificate),
            "access_token" => Ok(AuthMethod::AccessToken),
            _ => Err(AdminError::InvalidConfig(format!(
                "invalid auth method '{s}': must be one of device_code, interactive, \
                 client_secret, certificate, access_token"
            ))),
        }
    }
}

impl TryFrom<String> for AuthMethod {
    type Error = AdminError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub azure_tenant_id: String,
    pub azure_client_id: String,
    pub auth_method: AuthMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_certificate_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_certificate_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_access_token: Option<String>,
    pub graph_base_url: String,
    pub authority_url: String,

    pub database_path: PathBuf,

    pub mcp_server_name: String,
    pub mcp_server_version: String,

    pub log_level: String,

    pub enable_audit_logging: bool,
    pub rate_limit_enabled: bool,
    pub max_requests_per_minute: u32,
    /// Upper bound for every single remote call; unset means wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            azure_tenant_id: String::new(),
            azure_client_id: String::new(),
            auth_method: AuthMethod::default(),
            azure_client_secret: None,
            azure_certificate_path: None,
            azure_certificate_password: None,
            graph_access_token: None,
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            database_path: PathBuf::from("./data/m365_admin.db"),
            mcp_server_name: "m365-admin".to_string(),
            mcp_server_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "INFO".to_string(),
            enable_audit_logging: true,
            rate_limit_enabled: true,
            max_requests_per_minute: 60,
            remote_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `./m365-admin.yaml` when present), then
    /// apply process environment overrides. Does not validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_yaml(&std::fs::read_to_string(p)?)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_yaml(&std::fs::read_to_string(default)?)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Override fields from an environment lookup. `lookup` receives the
    /// upper-case name first, then the lower-case one.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).or_else(|| lookup(&name.to_ascii_lowercase()));

        if let Some(v) = get("AZURE_TENANT_ID") {
            self.azure_tenant_id = v;
        }
        if let Some(v) = get("AZURE_CLIENT_ID") {
            self.azure_client_id = v;
        }
        if let Some(v) = get("AUTH_METHOD") {
            self.auth_method = v.parse()?;
        }
        if let Some(v) = get("AZURE_CLIENT_SECRET") {
            self.azure_client_secret = Some(v);
        }
        if let Some(v) = get("AZURE_CERTIFICATE_PATH") {
            self.azure_certificate_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("AZURE_CERTIFICATE_PASSWORD") {
            self.azure_certificate_password = Some(v);
        }
        if let Some(v) = get("GRAPH_ACCESS_TOKEN") {
            self.graph_access_token = Some(v);
        }
        if let Some(v) = get("GRAPH_BASE_URL") {
            self.graph_base_url = v;
        }
        if let Some(v) = get("AUTHORITY_URL") {
            self.authority_url = v;
        }
        if let Some(v) = get("DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Some(v) = get("MCP_SERVER_NAME") {
            self.mcp_server_name = v;
        }
        if let Some(v) = get("MCP_SERVER_VERSION") {
            self.mcp_server_version = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = get("ENABLE_AUDIT_LOGGING") {
            self.enable_audit_logging = parse_bool("ENABLE_AUDIT_LOGGING", &v)?;
        }
        if let Some(v) = get("RATE_LIMIT_ENABLED") {
            self.rate_limit_enabled = parse_bool("RATE_LIMIT_ENABLED", &v)?;
        }
        if let Some(v) = get("MAX_REQUESTS_PER_MINUTE") {
            self.max_requests_per_minute = parse_number("MAX_REQUESTS_PER_MINUTE", &v)?;
        }
        if let Some(v) = get("REMOTE_TIMEOUT_SECS") {
            self.remote_timeout_secs = Some(parse_number("REMOTE_TIMEOUT_SECS", &v)?);
        }
        Ok(())
    }

    /// Full validation, required before talking to the remote service.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("azure_tenant_id", &self.azure_tenant_id),
            ("azure_client_id", &self.azure_client_id),
        ] {
            if value.is_empty() {
                return Err(AdminError::InvalidConfig(format!("{name} is required")));
            }
            if !is_valid_guid(value) {
                return Err(AdminError::InvalidConfig(format!(
                    "{name} has invalid GUID format: {value}"
                )));
            }
        }
        if self.remote_timeout_secs == Some(0) {
            return Err(AdminError::InvalidConfig(
                "remote_timeout_secs must be at least 1 (omit it for no limit)".into(),
            ));
        }
        self.normalized_log_level()?;
        self.validate_auth_config()
    }

    /// Check that the selected auth method has what it needs.
    pub fn validate_auth_config(&self) -> Result<()> {
        match self.auth_method {
            AuthMethod::ClientSecret if self.azure_client_secret.is_none() => {
                Err(AdminError::InvalidConfig(
                    "client_secret authentication selected but AZURE_CLIENT_SECRET not configured"
                        .into(),
                ))
            }
            AuthMethod::Certificate
                if !self
                    .azure_certificate_path
                    .as_deref()
                    .is_some_and(Path::exists) =>
            {
                Err(AdminError::InvalidConfig(
                    "certificate authentication selected but AZURE_CERTIFICATE_PATH not \
                     configured or file not found"
                        .into(),
                ))
            }
            AuthMethod::AccessToken if self.graph_access_token.is_none() => {
                Err(AdminError::InvalidConfig(
                    "access_token authentication selected but GRAPH_ACCESS_TOKEN not configured"
                        .into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Upper-cased log level, checked against the accepted names.
    pub fn normalized_log_level(&self) -> Result<String> {
        let upper = self.log_level.to_ascii_uppercase();
        if LOG_LEVELS.contains(&upper.as_str()) {
            Ok(upper)
        } else {
            Err(AdminError::InvalidConfig(format!(
                "invalid log level '{}': must be one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )))
        }
    }

    /// The log level as a `tracing` filter directive.
    pub fn tracing_directive(&self) -> &'static str {
        match self.log_level.to_ascii_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AdminError::InvalidConfig(format!(
            "{name} must be a boolean, got '{value}'"
        ))),
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AdminError::InvalidConfig(format!("{name} must be a number, got '{value}'")))
}
