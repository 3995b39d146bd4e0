use std::time::Duration;

use crate::core::config::CacheConfig;
use crate::{Client, Error};

/// Builder for configuring and creating a pooled [`Client`].
///
/// Nothing is dialed here; connections are opened lazily on first use.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use dataplane::ClientBuilder;
///
/// let client = ClientBuilder::new()
///     .address("redis://localhost:6379")
///     .password("secret")
///     .database(0)
///     .max_active(16)
///     .idle_timeout(Duration::from_secs(30))
///     .build()
///     .unwrap();
/// assert_eq!(client.pool().config().max_active, 16);
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    config: CacheConfig,
    invalid_address: Option<Error>,
}

impl ClientBuilder {
    /// Creates a new [`ClientBuilder`] with default pool settings.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[inline]
    pub fn from_config(config: CacheConfig) -> Self {
        Self {
            config,
            invalid_address: None,
        }
    }

    /// Sets the server address as `redis://[:password@]host[:port][/db]`.
    ///
    /// Settings are applied in call order: the address replaces host and
    /// port, plus password and database when it carries them, and any
    /// setter called afterwards overrides it. An unparsable address is
    /// reported by [`build`](Self::build).
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.invalid_address = self.config.apply_url(&address.into()).err();
        self
    }

    /// Sets the server host.
    #[inline]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the server port.
    #[inline]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the password for authentication.
    #[inline]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Sets the database index selected after connecting.
    #[inline]
    pub fn database(mut self, database: u32) -> Self {
        self.config.database = database;
        self
    }

    /// Sets the maximum number of idle connections kept.
    #[inline]
    pub fn max_idle(mut self, max_idle: usize) -> Self {
        self.config.max_idle = max_idle;
        self
    }

    /// Sets the maximum number of connections lent out at once (0 = unbounded).
    #[inline]
    pub fn max_active(mut self, max_active: usize) -> Self {
        self.config.max_active = max_active;
        self
    }

    /// Closes idle connections older than `timeout` instead of reusing them.
    #[inline]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets the connection timeout.
    #[inline]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.dial_timeout = timeout;
        self
    }

    /// Sets the read timeout. `None` means no timeout.
    #[inline]
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.read_timeout = timeout.unwrap_or(Duration::ZERO);
        self
    }

    /// Sets the write timeout. `None` means no timeout.
    #[inline]
    pub fn write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.write_timeout = timeout.unwrap_or(Duration::ZERO);
        self
    }

    /// Waits for a free connection when the pool is exhausted instead of
    /// failing with [`Error::PoolExhausted`].
    #[inline]
    pub fn wait(mut self, wait: bool) -> Self {
        self.config.wait = wait;
        self
    }

    /// Pings idle connections older than `interval` before lending them.
    #[inline]
    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.config.health_check_interval = interval;
        self
    }

    /// Resolves the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the address cannot be parsed or
    /// the resulting settings are unusable.
    pub fn into_config(self) -> Result<CacheConfig, Error> {
        if let Some(err) = self.invalid_address {
            return Err(err);
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Builds the [`Client`] and its connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the configuration is invalid.
    #[inline]
    pub fn build(self) -> Result<Client, Error> {
        Ok(Client::new(self.into_config()?))
    }
}
