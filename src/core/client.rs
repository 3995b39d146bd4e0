use std::collections::HashMap;

use bytes::Bytes;
use tracing::debug;

use crate::capability::Cache;
use crate::core::builder::ClientBuilder;
use crate::core::command::{self, Cmd, ToArgs};
use crate::core::config::CacheConfig;
use crate::core::pipeline::PipelineExecutor;
use crate::core::pool::{Pool, PooledConnection};
use crate::core::reply;
use crate::proto::frame::Frame;
use crate::{Error, Result};

/// Pooled cache client.
///
/// Cloning is cheap and every clone shares one [`Pool`]. Each operation
/// borrows a connection, runs its command and hands the connection back,
/// so a `Client` can be used from many tasks at once.
///
/// # Example
///
/// ```no_run
/// use dataplane::{Cache, Client};
///
/// #[tokio::main]
/// async fn main() -> dataplane::Result<()> {
///     let client = Client::open("redis://127.0.0.1:6379")?;
///     client.set("greeting", "hello").await?;
///     assert_eq!(client.get_string("greeting").await?, "hello");
///     client.shutdown();
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    pool: Pool,
}

impl Client {
    /// Creates a client over a fresh pool. No connection is opened until the
    /// first command.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            pool: Pool::new(config),
        }
    }

    /// Creates a client for `redis://[:password@]host[:port][/db]` with the
    /// default pool settings.
    pub fn open(address: &str) -> Result<Self> {
        let config = CacheConfig::from_url(address)?;
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Starts a [`ClientBuilder`].
    #[inline]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The underlying pool.
    #[inline]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn conn(&self) -> Result<PooledConnection> {
        self.pool.acquire().await.map_err(Error::unavailable)
    }

    async fn query(&self, cmd: Cmd) -> Result<Frame> {
        let mut conn = self.conn().await?;
        let frame = conn.execute(&cmd).await?;
        reply::check(frame)
    }
}

impl Cache for Client {
    async fn del(&self, key: &str) -> Result<bool> {
        reply::to_bool(self.query(command::del(key)).await?)
    }

    async fn dels(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let commands: Vec<Cmd> = keys.iter().map(|key| command::del(key)).collect();
        self.execute_batch_last_reply_only(&commands).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        reply::to_bool(self.query(command::exists(key)).await?)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool> {
        reply::to_bool(self.query(command::expire(key, seconds)).await?)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        reply::to_i64(self.query(command::incr(key)).await?)
    }

    async fn ping(&self) -> Result<()> {
        reply::to_unit(self.query(command::ping()).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        reply::to_bytes(self.query(command::get(key)).await?)
    }

    async fn get_int(&self, key: &str) -> Result<i32> {
        reply::to_i32(self.query(command::get(key)).await?)
    }

    async fn get_int64(&self, key: &str) -> Result<i64> {
        reply::to_i64(self.query(command::get(key)).await?)
    }

    async fn get_float64(&self, key: &str) -> Result<f64> {
        reply::to_f64(self.query(command::get(key)).await?)
    }

    async fn get_string(&self, key: &str) -> Result<String> {
        reply::to_string(self.query(command::get(key)).await?)
    }

    async fn set<V>(&self, key: &str, value: &V) -> Result<()>
    where
        V: ToArgs + ?Sized,
    {
        let cmd = command::set(key, value)?;
        reply::to_unit(self.query(cmd).await?)
    }

    async fn set_ex<V>(&self, key: &str, value: &V, seconds: u64) -> Result<()>
    where
        V: ToArgs + ?Sized,
    {
        let cmd = command::set_ex(key, value, seconds)?;
        reply::to_unit(self.query(cmd).await?)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Bytes>> {
        reply::to_bytes(self.query(command::hget(key, field)).await?)
    }

    async fn hget_int(&self, key: &str, field: &str) -> Result<i32> {
        reply::to_i32(self.query(command::hget(key, field)).await?)
    }

    async fn hget_int64(&self, key: &str, field: &str) -> Result<i64> {
        reply::to_i64(self.query(command::hget(key, field)).await?)
    }

    async fn hget_float64(&self, key: &str, field: &str) -> Result<f64> {
        reply::to_f64(self.query(command::hget(key, field)).await?)
    }

    async fn hget_string(&self, key: &str, field: &str) -> Result<String> {
        reply::to_string(self.query(command::hget(key, field)).await?)
    }

    async fn hset<F, V>(&self, key: &str, field: &F, value: &V) -> Result<i64>
    where
        F: ToArgs + ?Sized,
        V: ToArgs + ?Sized,
    {
        let cmd = command::hset(key, field, value)?;
        reply::to_i64(self.query(cmd).await?)
    }

    async fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<Bytes>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        reply::to_vec_bytes(self.query(command::hmget(key, fields)).await?)
    }

    async fn hmset<F, V>(&self, key: &str, fields: &[(F, V)]) -> Result<()>
    where
        F: ToArgs,
        V: ToArgs,
    {
        if fields.is_empty() {
            return Err(Error::InvalidArgument {
                message: "hmset requires at least one field".to_string(),
            });
        }
        let cmd = command::hmset(key, fields)?;
        reply::to_unit(self.query(cmd).await?)
    }

    async fn hdel<F>(&self, key: &str, field: &F) -> Result<i64>
    where
        F: ToArgs + ?Sized,
    {
        let cmd = command::hdel(key, field)?;
        reply::to_i64(self.query(cmd).await?)
    }

    async fn hdels<F>(&self, key: &str, fields: &[F]) -> Result<i64>
    where
        F: ToArgs,
    {
        if fields.is_empty() {
            return Ok(0);
        }
        let cmd = command::hdel(key, fields)?;
        reply::to_i64(self.query(cmd).await?)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        reply::to_string_map(self.query(command::hgetall(key)).await?)
    }

    async fn sadd<M>(&self, key: &str, members: &M) -> Result<i64>
    where
        M: ToArgs + ?Sized,
    {
        let cmd = command::sadd(key, members)?;
        reply::to_i64(self.query(cmd).await?)
    }

    async fn srem<M>(&self, key: &str, members: &M) -> Result<i64>
    where
        M: ToArgs + ?Sized,
    {
        let cmd = command::srem(key, members)?;
        reply::to_i64(self.query(cmd).await?)
    }

    async fn sismember<M>(&self, key: &str, member: &M) -> Result<bool>
    where
        M: ToArgs + ?Sized,
    {
        let cmd = command::sismember(key, member)?;
        reply::to_bool(self.query(cmd).await?)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        reply::to_vec_string(self.query(command::smembers(key)).await?)
    }

    async fn sinter(&self, keys: &[&str]) -> Result<Vec<String>> {
        reply::to_vec_string(self.query(command::sinter(keys)).await?)
    }

    async fn sunion(&self, keys: &[&str]) -> Result<Vec<String>> {
        reply::to_vec_string(self.query(command::sunion(keys)).await?)
    }

    async fn sdiff(&self, keys: &[&str]) -> Result<Vec<String>> {
        reply::to_vec_string(self.query(command::sdiff(keys)).await?)
    }

    async fn zadd<M>(&self, key: &str, score: f64, member: &M) -> Result<i64>
    where
        M: ToArgs + ?Sized,
    {
        let cmd = command::zadd(key, score, member)?;
        reply::to_i64(self.query(cmd).await?)
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        reply::to_vec_string(self.query(command::zrange(key, start, stop)).await?)
    }

    async fn zrange_by_score<A, B>(&self, key: &str, min: &A, max: &B) -> Result<Vec<String>>
    where
        A: ToArgs + ?Sized,
        B: ToArgs + ?Sized,
    {
        let cmd = command::zrange_by_score(key, min, max)?;
        reply::to_vec_string(self.query(cmd).await?)
    }

    async fn zrem_range_by_score<A, B>(&self, key: &str, min: &A, max: &B) -> Result<i64>
    where
        A: ToArgs + ?Sized,
        B: ToArgs + ?Sized,
    {
        let cmd = command::zrem_range_by_score(key, min, max)?;
        reply::to_i64(self.query(cmd).await?)
    }

    async fn zcard(&self, key: &str) -> Result<i64> {
        reply::to_i64(self.query(command::zcard(key)).await?)
    }

    async fn zscore<M>(&self, key: &str, member: &M) -> Result<f64>
    where
        M: ToArgs + ?Sized,
    {
        let cmd = command::zscore(key, member)?;
        reply::to_f64(self.query(cmd).await?)
    }

    async fn zinterstore(&self, destination: &str, keys: &[&str]) -> Result<i64> {
        if keys.is_empty() {
            return Err(Error::InvalidArgument {
                message: "zinterstore requires at least one source key".to_string(),
            });
        }
        reply::to_i64(self.query(command::zinterstore(destination, keys)).await?)
    }

    async fn rpop(&self, key: &str) -> Result<Option<Bytes>> {
        reply::to_bytes(self.query(command::rpop(key)).await?)
    }

    async fn execute_batch_last_reply_only(&self, commands: &[Cmd]) -> Result<Frame> {
        if commands.is_empty() {
            return Err(Error::InvalidArgument {
                message: "pipeline requires at least one command".to_string(),
            });
        }
        let mut conn = self.conn().await?;
        let reply = PipelineExecutor::new(&mut conn).execute_last(commands).await?;
        debug!(commands = commands.len(), "batch executed");
        Ok(reply)
    }

    fn shutdown(&self) {
        self.pool.shutdown();
    }
}
