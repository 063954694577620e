//! Configuration management for ddns-updater.
//!
//! Settings come from the process environment (each key may also be passed as
//! a long flag) and are validated once, before any network activity.

use crate::error::{DdnsError, Result};
use crate::providers::DEFAULT_API_URL;
use crate::target::RecordType;
use clap::Parser;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use totp_rs::Secret;
use tracing::level_filters::LevelFilter;

/// Raw settings as read from the environment.
#[derive(Parser, Clone)]
#[command(name = "ddns-updater")]
#[command(about = "Keeps DNS records pointed at this host's public IP address")]
#[command(version)]
pub struct Settings {
    /// Provider account name
    #[arg(long, env = "USERNAME")]
    pub username: Option<String>,

    /// Provider account password
    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Provider-internal domain number
    #[arg(long, env = "DOMAIN_NUMBER")]
    pub domain_number: Option<String>,

    /// Provider-internal contract identifier
    #[arg(long, env = "CONTRACT")]
    pub contract: Option<String>,

    /// Parent domain to manage
    #[arg(long, env = "DOMAIN")]
    pub domain: Option<String>,

    /// Base32 TOTP seed for two-factor login
    #[arg(long, env = "OTP_KEY", default_value = "", hide_env_values = true)]
    pub otp_key: String,

    /// Default record type (A or AAAA)
    #[arg(long, env = "RRTYPE", default_value = "A")]
    pub rrtype: String,

    /// Subdomains to update, e.g. "vpn,nas{AAAA}"
    #[arg(long, env = "SUBDOMAIN", default_value = "")]
    pub subdomain: String,

    /// Minutes between checks
    #[arg(long, env = "INTERVAL", default_value = "180")]
    pub interval: String,

    /// Log level (INFO, WARNING, ERROR or DEBUG)
    #[arg(long, env = "LOGGING", default_value = "INFO")]
    pub logging: String,

    /// Base URL of the provider API. The default is a placeholder; set this
    /// to your provider's endpoint.
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Nameserver to query instead of the system resolver (IP or IP:port)
    #[arg(long, env = "NAMESERVER")]
    pub nameserver: Option<String>,

    /// Run a single check and exit
    #[arg(long)]
    pub once: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("username", &self.username)
            .field("domain_number", &self.domain_number)
            .field("contract", &self.contract)
            .field("domain", &self.domain)
            .field("rrtype", &self.rrtype)
            .field("subdomain", &self.subdomain)
            .field("interval", &self.interval)
            .field("logging", &self.logging)
            .field("api_url", &self.api_url)
            .field("nameserver", &self.nameserver)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

/// Log verbosity accepted by `LOGGING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Provider account credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Base32 TOTP seed; empty when the account has no second factor.
    pub otp_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("otp_key", &if self.otp_key.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

/// Validated configuration, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub domain_number: String,
    pub contract: String,
    pub domain: String,
    pub default_record_type: RecordType,
    pub subdomain: String,
    pub interval: Duration,
    pub log_level: LogLevel,
    pub api_url: String,
    pub nameserver: Option<SocketAddr>,
    pub once: bool,
}

impl Config {
    /// Whether `API_URL` was left at the built-in placeholder endpoint.
    pub fn uses_placeholder_api_url(&self) -> bool {
        self.api_url == DEFAULT_API_URL
    }
}

impl Settings {
    /// Read settings from the environment and command line.
    pub fn load() -> Self {
        Self::parse()
    }

    /// Log level to initialise logging with, even when validation later fails.
    pub fn log_level_or_default(&self) -> LogLevel {
        self.logging.parse().unwrap_or(LogLevel::Info)
    }

    /// Check every setting, reporting all problems at once.
    pub fn validate(self) -> Result<Config> {
        let mut problems = Vec::new();

        let username = required(&mut problems, self.username, "USERNAME");
        let password = required(&mut problems, self.password, "PASSWORD");
        let domain_number = required(&mut problems, self.domain_number, "DOMAIN_NUMBER");
        let contract = required(&mut problems, self.contract, "CONTRACT");
        let domain = required(&mut problems, self.domain, "DOMAIN");
        let domain = domain.trim_end_matches('.').to_string();

        let default_record_type = self.rrtype.parse().unwrap_or_else(|_| {
            problems.push("RRTYPE must be either 'A' or 'AAAA'".to_string());
            RecordType::A
        });

        let interval = parse_interval(&self.interval).unwrap_or_else(|e| {
            problems.push(e);
            Duration::ZERO
        });

        let log_level = self.logging.parse().unwrap_or_else(|_| {
            problems.push(
                "LOGGING must be one of 'INFO', 'WARNING', 'ERROR' or 'DEBUG'".to_string(),
            );
            LogLevel::Info
        });

        let otp_key = self.otp_key.trim().to_string();
        if !otp_key.is_empty() && Secret::Encoded(otp_key.clone()).to_bytes().is_err() {
            problems.push("OTP_KEY must be a base32 encoded secret".to_string());
        }

        let api_url = self.api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("https://") || api_url.starts_with("http://")) {
            problems.push("API_URL must be an http:// or https:// URL".to_string());
        }

        let nameserver = match self.nameserver.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => match parse_nameserver(value) {
                Some(addr) => Some(addr),
                None => {
                    problems.push(format!(
                        "NAMESERVER must be an IP address with optional port, got '{}'",
                        value
                    ));
                    None
                }
            },
        };

        if !problems.is_empty() {
            return Err(DdnsError::Config(problems));
        }

        Ok(Config {
            credentials: Credentials {
                username,
                password,
                otp_key,
            },
            domain_number,
            contract,
            domain,
            default_record_type,
            subdomain: self.subdomain,
            interval,
            log_level,
            api_url,
            nameserver,
            once: self.once,
        })
    }
}

fn required(problems: &mut Vec<String>, value: Option<String>, key: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            problems.push(format!("Please define {}", key));
            String::new()
        }
    }
}

/// Parse `INTERVAL`, given in whole minutes.
fn parse_interval(value: &str) -> std::result::Result<Duration, String> {
    let minutes: u64 = value
        .trim()
        .parse()
        .map_err(|_| format!("INTERVAL must be a number of minutes, got '{}'", value))?;
    if minutes == 0 {
        return Err("INTERVAL must be at least one minute".to_string());
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("INTERVAL of {} minutes is too large", minutes))
}

fn parse_nameserver(value: &str) -> Option<SocketAddr> {
    value
        .parse::<SocketAddr>()
        .ok()
        .or_else(|| value.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, 53)))
}
