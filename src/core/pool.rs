//! Bounded connection pool with scoped borrowing.
//!
//! Connections are created lazily, lent out through a [`PooledConnection`]
//! guard and handed back when the guard drops. Idle connections are reused
//! most-recently-returned first and pinged before reuse once they have sat
//! idle longer than the health-check interval.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, instrument, warn};

use crate::core::command;
use crate::core::config::CacheConfig;
use crate::core::connection::Connection;
use crate::core::reply;
use crate::{Error, Result};

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections sitting in the idle set.
    pub idle: usize,
    /// Connections currently lent out.
    pub active: usize,
}

struct PoolInner {
    config: CacheConfig,
    idle: Mutex<VecDeque<Connection>>,
    /// Present only when `max_active` is non-zero.
    permits: Option<Arc<Semaphore>>,
    active: AtomicUsize,
    closed: AtomicBool,
}

impl PoolInner {
    fn put(&self, mut conn: Connection) {
        if conn.is_broken() {
            warn!(address = %conn.address(), "closing broken connection");
            return;
        }
        if conn.pending() > 0 {
            warn!(pending = conn.pending(), "closing connection with unread replies");
            return;
        }

        let mut idle = self.idle.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if idle.len() >= self.config.max_idle {
            debug!(max_idle = self.config.max_idle, "idle set full, closing connection");
            return;
        }
        conn.touch();
        idle.push_back(conn);
    }
}

/// A pool of connections to one cache server.
///
/// Cheap to clone; clones share the same connections.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Creates an empty pool. No connection is dialed until the first
    /// [`acquire`](Pool::acquire).
    pub fn new(config: CacheConfig) -> Self {
        let permits = (config.max_active > 0).then(|| Arc::new(Semaphore::new(config.max_active)));
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(VecDeque::with_capacity(config.max_idle.min(64))),
                permits,
                active: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// The configuration the pool was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Borrows a connection.
    ///
    /// When `max_active` connections are already lent out this waits for one
    /// to be released if the pool is configured to wait, and otherwise fails
    /// with [`Error::PoolExhausted`].
    ///
    /// # Errors
    ///
    /// [`Error::PoolExhausted`], [`Error::PoolClosed`] after
    /// [`shutdown`](Pool::shutdown), or the dial error if a new connection
    /// was needed and could not be made.
    #[instrument(skip(self), level = "debug")]
    pub async fn acquire(&self) -> Result<PooledConnection> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }

        let permit = match &self.inner.permits {
            None => None,
            Some(permits) if self.inner.config.wait => Some(
                permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::PoolClosed)?,
            ),
            Some(permits) => Some(permits.clone().try_acquire_owned().map_err(|e| match e {
                TryAcquireError::NoPermits => Error::PoolExhausted {
                    max_active: self.inner.config.max_active,
                },
                TryAcquireError::Closed => Error::PoolClosed,
            })?),
        };

        // Shutdown may have happened while waiting for the permit.
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }

        let conn = match self.take_idle().await {
            Some(conn) => conn,
            None => Connection::dial(&self.inner.config).await?,
        };

        self.inner.active.fetch_add(1, Ordering::AcqRel);
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    async fn take_idle(&self) -> Option<Connection> {
        loop {
            let mut conn = self.inner.idle.lock().pop_back()?;

            let idle_timeout = self.inner.config.idle_timeout;
            if !idle_timeout.is_zero() && conn.idle_for() > idle_timeout {
                debug!(idle_for = ?conn.idle_for(), "closing expired idle connection");
                continue;
            }

            if self.validate(&mut conn).await {
                return Some(conn);
            }
            warn!(address = %conn.address(), "idle connection failed liveness probe");
        }
    }

    /// Checks an idle connection before it is lent out.
    ///
    /// Only connections idle for at least the health-check interval are
    /// probed with a PING; fresher ones pass without a round trip.
    pub async fn validate(&self, conn: &mut Connection) -> bool {
        if conn.idle_for() < self.inner.config.health_check_interval {
            return true;
        }
        match conn.execute(&command::ping()).await.and_then(reply::to_unit) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "liveness probe failed");
                false
            }
        }
    }

    /// Returns a connection to the pool. Equivalent to dropping the guard.
    pub fn release(&self, conn: PooledConnection) {
        drop(conn);
    }

    /// Closes every idle connection and refuses further lending.
    ///
    /// Tasks blocked in [`acquire`](Pool::acquire) wake with
    /// [`Error::PoolClosed`]. Connections still lent out are closed when
    /// their guards drop. Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(permits) = &self.inner.permits {
            permits.close();
        }
        let drained: Vec<Connection> = self.inner.idle.lock().drain(..).collect();
        debug!(closed = drained.len(), "pool shut down");
    }

    /// Returns true after [`shutdown`](Pool::shutdown).
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Current idle and active counts.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.inner.idle.lock().len(),
            active: self.inner.active.load(Ordering::Acquire),
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("address", &self.inner.config.address())
            .field("stats", &self.stats())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A connection borrowed from a [`Pool`].
///
/// Dereferences to [`Connection`]. When dropped, the connection goes back
/// to the idle set, or is closed if it is broken, the idle set is full or
/// the pool has been shut down.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection already released")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.active.fetch_sub(1, Ordering::AcqRel);
            self.pool.put(conn);
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("conn", &self.conn)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockServer;
    use std::time::Duration;

    fn config_for(server: &MockServer) -> CacheConfig {
        let mut config = CacheConfig::default();
        config.host = "127.0.0.1".to_string();
        config.port = server.port();
        config
    }

    async fn roundtrip(conn: &mut PooledConnection) {
        let reply = conn.execute(&command::exists("probe")).await.unwrap();
        assert_eq!(reply, crate::Frame::Integer(0));
    }

    #[tokio::test]
    async fn test_reuses_released_connection() {
        let server = MockServer::start().await;
        let pool = Pool::new(config_for(&server));

        let mut conn = pool.acquire().await.unwrap();
        roundtrip(&mut conn).await;
        assert_eq!(pool.stats(), PoolStats { idle: 0, active: 1 });
        drop(conn);
        assert_eq!(pool.stats(), PoolStats { idle: 1, active: 0 });

        let mut conn = pool.acquire().await.unwrap();
        roundtrip(&mut conn).await;
        assert_eq!(server.connections_accepted(), 1);
    }

    #[tokio::test]
    async fn test_fresh_idle_connection_is_not_probed() {
        let server = MockServer::start().await;
        let pool = Pool::new(config_for(&server));

        drop(pool.acquire().await.unwrap());
        drop(pool.acquire().await.unwrap());
        assert_eq!(server.command_count("PING"), 0);
    }

    #[tokio::test]
    async fn test_stale_idle_connection_is_probed_once() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.health_check_interval = Duration::ZERO;
        let pool = Pool::new(config);

        drop(pool.acquire().await.unwrap());
        assert_eq!(server.command_count("PING"), 0);
        drop(pool.acquire().await.unwrap());
        assert_eq!(server.command_count("PING"), 1);
        assert_eq!(server.connections_accepted(), 1);
    }

    #[tokio::test]
    async fn test_max_idle_closes_excess() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.max_idle = 1;
        let pool = Pool::new(config);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.stats().idle, 1);
    }

    #[tokio::test]
    async fn test_broken_connection_is_discarded() {
        let server = MockServer::start().await;
        let pool = Pool::new(config_for(&server));

        let mut conn = pool.acquire().await.unwrap();
        conn.mark_broken();
        drop(conn);
        assert_eq!(pool.stats(), PoolStats { idle: 0, active: 0 });
    }

    #[tokio::test]
    async fn test_unread_replies_discard_connection() {
        let server = MockServer::start().await;
        let pool = Pool::new(config_for(&server));

        let mut conn = pool.acquire().await.unwrap();
        conn.send(&command::ping());
        conn.flush().await.unwrap();
        drop(conn);
        assert_eq!(pool.stats().idle, 0);
    }

    #[tokio::test]
    async fn test_fail_fast_when_exhausted() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.max_active = 1;
        config.wait = false;
        let pool = Pool::new(config);

        let held = pool.acquire().await.unwrap();
        match pool.acquire().await {
            Err(Error::PoolExhausted { max_active }) => assert_eq!(max_active, 1),
            other => panic!("Expected PoolExhausted, got {other:?}"),
        }
        drop(held);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_until_released() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.max_active = 1;
        let pool = Pool::new(config);

        let mut held = pool.acquire().await.unwrap();
        roundtrip(&mut held).await;
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap().unwrap();
        assert_eq!(server.connections_accepted(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_terminal() {
        let server = MockServer::start().await;
        let pool = Pool::new(config_for(&server));

        drop(pool.acquire().await.unwrap());
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_closed());
        assert_eq!(pool.stats().idle, 0);
        assert!(matches!(pool.acquire().await, Err(Error::PoolClosed)));
    }

    #[tokio::test]
    async fn test_shutdown_wakes_waiters() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.max_active = 1;
        let pool = Pool::new(config);

        let held = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.shutdown();

        assert!(matches!(waiter.await.unwrap(), Err(Error::PoolClosed)));
        drop(held);
        assert_eq!(pool.stats().idle, 0);
    }

    #[tokio::test]
    async fn test_expired_idle_connection_is_replaced() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.idle_timeout = Duration::from_millis(20);
        let pool = Pool::new(config);

        roundtrip(&mut pool.acquire().await.unwrap()).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        roundtrip(&mut pool.acquire().await.unwrap()).await;
        assert_eq!(server.connections_accepted(), 2);
    }
}
