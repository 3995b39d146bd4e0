use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

/// Connection and pool settings for a cache [`Client`](crate::Client).
///
/// Deserializable so an application config loader can hand it over
/// directly; durations are given in whole seconds.
///
/// ```
/// use dataplane::CacheConfig;
///
/// let config: CacheConfig =
///     serde_json::from_str(r#"{"host": "cache", "db": 2, "max_active": 8}"#).unwrap();
/// assert_eq!(config.address(), "cache:6379");
/// assert_eq!(config.database, 2);
/// assert!(config.wait);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct CacheConfig {
    /// Server host name or IP.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Password sent with AUTH after dialing, if set.
    pub password: Option<String>,
    /// Logical database selected after dialing.
    #[serde(alias = "db")]
    pub database: u32,
    /// Maximum number of idle connections kept for reuse.
    pub max_idle: usize,
    /// Maximum number of connections lent out at once, 0 for unbounded.
    pub max_active: usize,
    /// Idle connections older than this are closed instead of reused, 0 disables.
    #[serde(deserialize_with = "seconds")]
    pub idle_timeout: Duration,
    /// Deadline for establishing a connection.
    #[serde(deserialize_with = "seconds")]
    pub dial_timeout: Duration,
    /// Deadline for each read, 0 disables.
    #[serde(deserialize_with = "seconds")]
    pub read_timeout: Duration,
    /// Deadline for each write, 0 disables.
    #[serde(deserialize_with = "seconds")]
    pub write_timeout: Duration,
    /// Wait for a connection when `max_active` is reached instead of failing.
    pub wait: bool,
    /// Idle connections older than this are pinged before reuse.
    #[serde(deserialize_with = "seconds")]
    pub health_check_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            database: 0,
            max_idle: 256,
            max_active: 0,
            idle_timeout: Duration::from_secs(120),
            dial_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(30),
            wait: true,
            health_check_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Builds a config from `redis://[:password@]host[:port][/db]`, keeping
    /// the default pool settings.
    ///
    /// The password may be percent-encoded, e.g. `redis://:p%40ss@host` for
    /// the password `p@ss`.
    pub fn from_url(address: &str) -> Result<Self> {
        let mut config = Self::default();
        config.apply_url(address)?;
        Ok(config)
    }

    /// Overwrites the connection settings carried by `address`.
    ///
    /// Host and port are always replaced. Password and database are only
    /// replaced when the address contains them.
    pub(crate) fn apply_url(&mut self, address: &str) -> Result<()> {
        let parsed = url::Url::parse(address).map_err(|_| Error::InvalidArgument {
            message: "invalid address format".to_string(),
        })?;

        if parsed.scheme() != "redis" {
            return Err(Error::InvalidArgument {
                message: "invalid scheme, expected redis://".to_string(),
            });
        }

        let host = parsed.host_str().ok_or_else(|| Error::InvalidArgument {
            message: "missing host in address".to_string(),
        })?;

        let database = match parsed.path().trim_start_matches('/') {
            "" => None,
            db => Some(db.parse::<u32>().map_err(|_| Error::InvalidArgument {
                message: format!("invalid database index: {db}"),
            })?),
        };

        let password = parsed
            .password()
            .map(|raw| {
                percent_decode_str(raw)
                    .decode_utf8()
                    .map(|p| p.into_owned())
                    .map_err(|_| Error::InvalidArgument {
                        message: "password is not valid UTF-8".to_string(),
                    })
            })
            .transpose()?;

        self.host = host.to_string();
        self.port = parsed.port().unwrap_or(6379);
        if password.is_some() {
            self.password = password;
        }
        if let Some(database) = database {
            self.database = database;
        }
        Ok(())
    }

    /// `host:port` as dialed.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rejects settings that can never produce a connection.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::InvalidArgument {
                message: "host is required".to_string(),
            });
        }
        if self.port == 0 {
            return Err(Error::InvalidArgument {
                message: "port must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Maps a zero duration to "no deadline".
pub(crate) fn deadline(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}
