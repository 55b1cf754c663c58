//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "veridia";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 120;
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_EMAIL_ENDPOINT: &str = "api.mailgun.net";
const DEFAULT_EMAIL_FROM: &str = "Veridia <no-reply@veridia.in>";

/// Command-line arguments for the Veridia binary.
#[derive(Debug, Parser)]
#[command(name = "veridia", version, about = "Veridia community API server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VERIDIA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Veridia HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u64>,

    /// Override the rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub email: EmailSettings,
    pub payments: PaymentSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

/// Mail provider credentials. When `enabled` is false outbound mail is
/// logged instead of delivered, which keeps local setups credential-free.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub enabled: bool,
    pub api_key: String,
    pub domain: String,
    pub endpoint: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VERIDIA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    auth: RawAuthSettings,
    email: RawEmailSettings,
    payments: RawPaymentSettings,
    rate_limit: RawRateLimitSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(window) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(max);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            auth,
            email,
            payments,
            rate_limit,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            auth: build_auth_settings(auth)?,
            email: build_email_settings(email)?,
            payments: build_payment_settings(payments)?,
            rate_limit: build_rate_limit_settings(rate_limit)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = non_zero_u32(max_value.into(), "database.max_connections")?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let jwt_secret = auth.jwt_secret.unwrap_or_default();
    if jwt_secret.trim().is_empty() {
        return Err(LoadError::invalid(
            "auth.jwt_secret",
            "a signing secret is required",
        ));
    }

    let ttl_hours = auth.token_ttl_hours.unwrap_or(DEFAULT_TOKEN_TTL_HOURS);
    if ttl_hours == 0 {
        return Err(LoadError::invalid(
            "auth.token_ttl_hours",
            "must be greater than zero",
        ));
    }

    Ok(AuthSettings {
        jwt_secret,
        token_ttl: Duration::from_secs(ttl_hours * 3600),
    })
}

fn build_email_settings(email: RawEmailSettings) -> Result<EmailSettings, LoadError> {
    let enabled = email.enabled.unwrap_or(false);
    let api_key = email.api_key.unwrap_or_default();
    let domain = email.domain.unwrap_or_default();

    if enabled {
        if api_key.trim().is_empty() {
            return Err(LoadError::invalid(
                "email.api_key",
                "required when email is enabled",
            ));
        }
        if domain.trim().is_empty() {
            return Err(LoadError::invalid(
                "email.domain",
                "required when email is enabled",
            ));
        }
    }

    Ok(EmailSettings {
        enabled,
        api_key,
        domain,
        endpoint: email
            .endpoint
            .unwrap_or_else(|| DEFAULT_EMAIL_ENDPOINT.to_string()),
        from: email.from.unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
    })
}

fn build_payment_settings(payments: RawPaymentSettings) -> Result<PaymentSettings, LoadError> {
    let key_id = payments.key_id.unwrap_or_default();
    if key_id.trim().is_empty() {
        return Err(LoadError::invalid(
            "payments.key_id",
            "a provider key id is required",
        ));
    }
    let key_secret = payments.key_secret.unwrap_or_default();
    if key_secret.trim().is_empty() {
        return Err(LoadError::invalid(
            "payments.key_secret",
            "a provider key secret is required",
        ));
    }

    // Webhook verification falls back to the key secret when no dedicated
    // secret is configured.
    let webhook_secret = payments
        .webhook_secret
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| key_secret.clone());

    Ok(PaymentSettings {
        key_id,
        key_secret,
        webhook_secret,
        currency: payments
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    })
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window_seconds_val = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "rate_limit.window_seconds")?;

    let max_requests_val = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = non_zero_u32(max_requests_val, "rate_limit.max_requests")?;

    Ok(RateLimitSettings {
        window_seconds,
        max_requests,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    jwt_secret: Option<String>,
    token_ttl_hours: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEmailSettings {
    enabled: Option<bool>,
    api_key: Option<String>,
    domain: Option<String>,
    endpoint: Option<String>,
    from: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPaymentSettings {
    key_id: Option<String>,
    key_secret: Option<String>,
    webhook_secret: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_raw() -> RawSettings {
        let mut raw = RawSettings::default();
        raw.auth.jwt_secret = Some("test-signing-secret".to_string());
        raw.payments.key_id = Some("rzp_test_key".to_string());
        raw.payments.key_secret = Some("rzp_test_secret".to_string());
        raw
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = minimal_raw();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn missing_jwt_secret_is_rejected() {
        let mut raw = minimal_raw();
        raw.auth.jwt_secret = None;
        let err = Settings::from_raw(raw).expect_err("must fail");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "auth.jwt_secret",
                ..
            }
        ));
    }

    #[test]
    fn webhook_secret_falls_back_to_key_secret() {
        let raw = minimal_raw();
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.payments.webhook_secret, "rzp_test_secret");
        assert_eq!(settings.payments.currency, "INR");
    }

    #[test]
    fn enabled_email_requires_credentials() {
        let mut raw = minimal_raw();
        raw.email.enabled = Some(true);
        let err = Settings::from_raw(raw).expect_err("must fail");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "email.api_key",
                ..
            }
        ));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = minimal_raw();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["veridia"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "veridia",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--database-url",
            "postgres://override",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(
                    serve.overrides.database_url.as_deref(),
                    Some("postgres://override")
                );
            }
        }
    }

    #[test]
    fn token_ttl_defaults_to_a_day() {
        let settings = Settings::from_raw(minimal_raw()).expect("valid settings");
        assert_eq!(settings.auth.token_ttl, Duration::from_secs(24 * 3600));
    }
}
