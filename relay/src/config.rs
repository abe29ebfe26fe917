//! Configuration module for environment variable parsing.
//!
//! Every setting has a default, so the relay starts with an empty environment
//! and delivers through the local MTA on port 25.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Which mail transport the dispatcher hands reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    Smtp,
    Mailgun,
    Console,
}

impl FromStr for MailTransport {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "mailgun" => Ok(Self::Mailgun),
            "console" => Ok(Self::Console),
            _ => Err(()),
        }
    }
}

/// Connection security for the SMTP transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpTls {
    None,
    StartTls,
    Tls,
}

impl FromStr for SmtpTls {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "starttls" => Ok(Self::StartTls),
            "tls" => Ok(Self::Tls),
            _ => Err(()),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Host used for the synthetic `no-reply@<host>` sender.
    /// Falls back to the request's Host header when unset.
    pub server_name: Option<String>,

    /// Largest request body the relay will buffer
    pub max_body_bytes: usize,

    /// Upper bound on a single dispatch attempt in milliseconds
    pub mail_timeout_ms: u64,

    // =========================================================================
    // Mail Transport Configuration
    // =========================================================================

    pub mail_transport: MailTransport,

    pub smtp_host: String,

    pub smtp_port: u16,

    pub smtp_tls: SmtpTls,

    pub smtp_user: Option<String>,

    pub smtp_password: Option<String>,

    /// Mailgun API key for the HTTP transport
    pub mailgun_api_key: Option<String>,

    /// Mailgun sending domain
    pub mailgun_domain: Option<String>,

    /// Mailgun API base URL (EU accounts use https://api.eu.mailgun.net)
    pub mailgun_api_base: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            server_name: None,
            max_body_bytes: 10 * 1024 * 1024,
            mail_timeout_ms: 10_000,
            mail_transport: MailTransport::Smtp,
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            smtp_tls: SmtpTls::None,
            smtp_user: None,
            smtp_password: None,
            mailgun_api_key: None,
            mailgun_domain: None,
            mailgun_api_base: "https://api.mailgun.net".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_or("PORT", defaults.port),

            server_name: non_empty("SERVER_NAME"),

            max_body_bytes: parse_or("MAX_BODY_BYTES", defaults.max_body_bytes),

            mail_timeout_ms: parse_or("MAIL_TIMEOUT_MS", defaults.mail_timeout_ms),

            mail_transport: parse_or("MAIL_TRANSPORT", defaults.mail_transport),

            smtp_host: non_empty("SMTP_HOST").unwrap_or(defaults.smtp_host),

            smtp_port: parse_or("SMTP_PORT", defaults.smtp_port),

            smtp_tls: parse_or("SMTP_TLS", defaults.smtp_tls),

            smtp_user: non_empty("SMTP_USER"),

            smtp_password: env::var("SMTP_PASSWORD").ok(),

            mailgun_api_key: non_empty("MAILGUN_API_KEY"),

            mailgun_domain: non_empty("MAILGUN_DOMAIN"),

            mailgun_api_base: non_empty("MAILGUN_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.mailgun_api_base),
        }
    }

    /// Dispatch timeout as a `Duration`.
    pub fn mail_timeout(&self) -> Duration {
        Duration::from_millis(self.mail_timeout_ms)
    }
}

/// Parse an environment variable, keeping the default when it is unset or malformed.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read an environment variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
