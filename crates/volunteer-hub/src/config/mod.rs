use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::volunteers::notifications::DispatchMode;
use crate::volunteers::policy::{DEFAULT_ACTIVE_TASK_STATE, DEFAULT_CLOSED_TASK_STATES};

const DEFAULT_RESUME_URL_TTL_SECS: i64 = 900;
const DEFAULT_RESUME_BASE_URL: &str = "https://resumes.local";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub volunteers: VolunteerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            volunteers: VolunteerConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Volunteer lifecycle rules and collaborator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolunteerConfig {
    /// Task state in which placements notify the volunteer.
    pub active_task_state: String,
    /// Reject placements outside `active_task_state` instead of only
    /// skipping the notification.
    pub enforce_active_task: bool,
    /// Task states that no longer accept applications.
    pub closed_task_states: Vec<String>,
    pub dispatch_mode: DispatchMode,
    pub resume_url_ttl_secs: i64,
    pub resume_base_url: String,
    /// Optional JSON file seeding the in-memory task catalog.
    pub tasks_path: Option<PathBuf>,
}

impl VolunteerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let active_task_state = env::var("VOLUNTEER_ACTIVE_TASK_STATE")
            .map(|value| value.trim().to_string())
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.active_task_state);

        let enforce_active_task = match env::var("VOLUNTEER_ENFORCE_ACTIVE_TASK") {
            Ok(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidFlag {
                name: "VOLUNTEER_ENFORCE_ACTIVE_TASK",
            })?,
            Err(_) => defaults.enforce_active_task,
        };

        let closed_task_states = match env::var("VOLUNTEER_CLOSED_TASK_STATES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|state| !state.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => defaults.closed_task_states,
        };

        let dispatch_mode = match env::var("VOLUNTEER_NOTIFICATION_MODE") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "inline" => DispatchMode::Inline,
                "background" => DispatchMode::Background,
                _ => return Err(ConfigError::InvalidNotificationMode { value: raw }),
            },
            Err(_) => defaults.dispatch_mode,
        };

        let resume_url_ttl_secs = match env::var("VOLUNTEER_RESUME_URL_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or(ConfigError::InvalidResumeTtl)?,
            Err(_) => defaults.resume_url_ttl_secs,
        };

        let resume_base_url =
            env::var("VOLUNTEER_RESUME_BASE_URL").unwrap_or(defaults.resume_base_url);
        let tasks_path = env::var("VOLUNTEER_TASKS_PATH").ok().map(PathBuf::from);

        Ok(Self {
            active_task_state,
            enforce_active_task,
            closed_task_states,
            dispatch_mode,
            resume_url_ttl_secs,
            resume_base_url,
            tasks_path,
        })
    }
}

impl Default for VolunteerConfig {
    fn default() -> Self {
        Self {
            active_task_state: DEFAULT_ACTIVE_TASK_STATE.to_string(),
            enforce_active_task: false,
            closed_task_states: DEFAULT_CLOSED_TASK_STATES
                .iter()
                .map(|state| state.to_string())
                .collect(),
            dispatch_mode: DispatchMode::Background,
            resume_url_ttl_secs: DEFAULT_RESUME_URL_TTL_SECS,
            resume_base_url: DEFAULT_RESUME_BASE_URL.to_string(),
            tasks_path: None,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { name: &'static str },
    InvalidNotificationMode { value: String },
    InvalidResumeTtl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { name } => write!(f, "{name} must be true or false"),
            ConfigError::InvalidNotificationMode { value } => write!(
                f,
                "VOLUNTEER_NOTIFICATION_MODE must be 'inline' or 'background', found '{value}'"
            ),
            ConfigError::InvalidResumeTtl => {
                write!(f, "VOLUNTEER_RESUME_URL_TTL_SECS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
