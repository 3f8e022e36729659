//! Connection settings for a [Session](crate::client::Session).

use std::fmt;
use std::time::Duration;

use crate::error::{RconError, Result};
use crate::packet::MAX_BODY_LENGTH;

/// Environment variables read by [Config::from_env].
pub const ENV_HOST: &str = "RCON_HOST";
pub const ENV_PORT: &str = "RCON_PORT";
pub const ENV_PASSWORD: &str = "RCON_PASSWORD";
pub const ENV_TIMEOUT_MS: &str = "RCON_TIMEOUT_MS";

/// Everything a session needs to reach and authenticate against one server.
/// Fixed for the lifetime of the session.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Shared rcon secret.
    pub password: String,
    /// Upper bound for connecting, and for every single read or write.
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 27015,
            password: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Defaults overridden by `RCON_HOST`, `RCON_PORT`, `RCON_PASSWORD` and
    /// `RCON_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(host) = lookup(ENV_HOST) {
            config.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.port = port.parse().map_err(|_| {
                RconError::Config(format!("{} is not a port: {:?}", ENV_PORT, port))
            })?;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            config.password = password;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            let ms: u64 = ms.parse().map_err(|_| {
                RconError::Config(format!("{} is not a number: {:?}", ENV_TIMEOUT_MS, ms))
            })?;
            config.timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RconError::Config("host is empty".to_string()));
        }
        if self.port == 0 {
            return Err(RconError::Config("port must not be 0".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(RconError::Config("timeout must not be zero".to_string()));
        }
        if self.password.len() > MAX_BODY_LENGTH {
            return Err(RconError::Config(format!(
                "password is {} bytes, at most {} fit in a packet",
                self.password.len(),
                MAX_BODY_LENGTH
            )));
        }
        Ok(())
    }

    /// `host:port`, as handed to the resolver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [Config]
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
