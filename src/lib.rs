//! afkbot
//!
//! Keeps a persistent automated client session on a remote game server,
//! jumping periodically so the server's idle-disconnect timer never fires,
//! and exposes a small read-only HTTP status surface for uptime monitors.

pub mod client;
pub mod supervisor;
pub mod web;

use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use client::ConnectOptions;
use supervisor::SessionView;

/// Application configuration, read from the environment once at startup
/// and fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Target server host
    pub host: String,
    /// Target server port
    pub port: u16,
    /// Display identity presented to the server
    pub username: String,
    /// Credential; used for connect and the post-spawn login command only if non-empty
    pub password: String,
    /// Protocol-version pin; empty or "auto" means negotiate
    pub version: String,
    /// Period between keepalive pulses
    pub keepalive_interval: Duration,
    /// How long the movement input stays asserted per pulse
    pub pulse_duration: Duration,
    /// Fixed delay before each reconnect attempt
    pub reconnect_delay: Duration,
    /// Status HTTP listen port
    pub web_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 25565,
            username: "AFKBot".to_string(),
            password: String::new(),
            version: String::new(),
            keepalive_interval: Duration::from_millis(60_000),
            pulse_duration: Duration::from_millis(200),
            reconnect_delay: Duration::from_millis(5_000),
            web_port: 3000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_string("AFKBOT_HOST", &defaults.host),
            port: env_parse("AFKBOT_PORT", defaults.port),
            username: env_string("AFKBOT_USERNAME", &defaults.username),
            password: env_string("AFKBOT_PASSWORD", ""),
            version: env_string("AFKBOT_VERSION", ""),
            keepalive_interval: Duration::from_millis(env_parse(
                "AFKBOT_KEEPALIVE_INTERVAL_MS",
                defaults.keepalive_interval.as_millis() as u64,
            )),
            pulse_duration: Duration::from_millis(env_parse(
                "AFKBOT_PULSE_MS",
                defaults.pulse_duration.as_millis() as u64,
            )),
            reconnect_delay: Duration::from_millis(env_parse(
                "AFKBOT_RECONNECT_DELAY_MS",
                defaults.reconnect_delay.as_millis() as u64,
            )),
            // Hosted platforms inject PORT; the explicit variable wins.
            web_port: match std::env::var("AFKBOT_WEB_PORT") {
                Ok(v) if !v.is_empty() => parse_or("AFKBOT_WEB_PORT", &v, defaults.web_port),
                _ => env_parse("PORT", defaults.web_port),
            },
        }
    }

    /// Connection options handed to the protocol client on every attempt.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: if self.password.is_empty() {
                None
            } else {
                Some(self.password.clone())
            },
            protocol_version: self.protocol_version(),
        }
    }

    /// Pinned protocol version, or `None` for auto-negotiation.
    pub fn protocol_version(&self) -> Option<u32> {
        let v = self.version.trim();
        if v.is_empty() || v.eq_ignore_ascii_case("auto") {
            return None;
        }
        match v.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Unparseable AFKBOT_VERSION {:?} - falling back to auto", v);
                None
            }
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => parse_or(name, &v, default),
        _ => default,
    }
}

fn parse_or<T: std::str::FromStr + Copy>(name: &str, value: &str, default: T) -> T {
    match value.parse() {
        Ok(n) => n,
        Err(_) => {
            warn!("Unparseable value {:?} for {} - using default", value, name);
            default
        }
    }
}

/// Application state shared between the supervisor and the web server.
pub struct AppState {
    /// Configuration loaded at startup
    pub config: AppConfig,
    /// Read-only view of the supervisor's current session, if any
    pub session: SessionView,
    /// Process-wide shutdown signal
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            session: SessionView::default(),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Get log directory path (shared across modules)
pub fn log_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("afkbot").join("logs"))
}

/// Initialize logging: console layer plus a daily-rolling file log when a
/// log directory is available.
pub fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false);

    if let Some(log_dir) = log_dir() {
        let _ = std::fs::create_dir_all(&log_dir);
        let file_appender = tracing_appender::rolling::daily(&log_dir, "afkbot.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        None
    }
}

pub use supervisor::Supervisor;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 25565);
        assert_eq!(config.username, "AFKBot");
        assert_eq!(config.keepalive_interval, Duration::from_millis(60_000));
        assert_eq!(config.pulse_duration, Duration::from_millis(200));
        assert_eq!(config.reconnect_delay, Duration::from_millis(5_000));
        assert_eq!(config.web_port, 3000);
    }

    #[test]
    fn protocol_version_auto_sentinel() {
        let mut config = AppConfig::default();
        assert_eq!(config.protocol_version(), None);

        config.version = "auto".to_string();
        assert_eq!(config.protocol_version(), None);

        config.version = "Auto".to_string();
        assert_eq!(config.protocol_version(), None);

        config.version = "762".to_string();
        assert_eq!(config.protocol_version(), Some(762));

        config.version = "not-a-number".to_string();
        assert_eq!(config.protocol_version(), None);
    }

    #[test]
    fn empty_password_is_omitted_from_connect_options() {
        let config = AppConfig::default();
        let opts = config.connect_options();
        assert_eq!(opts.password, None);

        let config = AppConfig {
            password: "hunter2".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.connect_options().password.as_deref(), Some("hunter2"));
    }
}
