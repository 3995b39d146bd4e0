//! Capability traits implemented by the concrete clients.
//!
//! Application code that only needs "a cache" or "a publisher" can depend on
//! these instead of on [`Client`](crate::Client), [`Producer`](crate::mq::Producer)
//! or [`Invoker`](crate::rpc::Invoker), which keeps it testable against fakes.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;

use crate::core::command::{Cmd, ToArgs};
use crate::payload::Payload;
use crate::Result;

/// Key/value cache operations.
///
/// Every call borrows one pooled connection for its duration. Values are
/// anything implementing [`ToArgs`]: strings, byte buffers, numbers,
/// [`Json`](crate::Json) wrappers or [`Payload`]s.
pub trait Cache: Send + Sync {
    // Keys

    /// Deletes `key`; returns whether it existed.
    fn del(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Deletes every key in one pipelined round trip. An empty slice sends
    /// nothing.
    fn dels(&self, keys: &[&str]) -> impl Future<Output = Result<()>> + Send;

    /// Returns whether `key` exists.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Sets a time-to-live on `key`; returns false if the key does not exist.
    fn expire(&self, key: &str, seconds: u64) -> impl Future<Output = Result<bool>> + Send;

    /// Atomically increments `key` and returns the new value.
    fn incr(&self, key: &str) -> impl Future<Output = Result<i64>> + Send;

    /// Checks that the server is reachable.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    // Strings

    /// Returns the value of `key`, `None` if it is absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Returns the value of `key` as a 32-bit integer.
    fn get_int(&self, key: &str) -> impl Future<Output = Result<i32>> + Send;

    /// Returns the value of `key` as a 64-bit integer.
    fn get_int64(&self, key: &str) -> impl Future<Output = Result<i64>> + Send;

    /// Returns the value of `key` as a float.
    fn get_float64(&self, key: &str) -> impl Future<Output = Result<f64>> + Send;

    /// Returns the value of `key` as UTF-8 text.
    fn get_string(&self, key: &str) -> impl Future<Output = Result<String>> + Send;

    /// Stores `value` under `key`.
    fn set<V>(&self, key: &str, value: &V) -> impl Future<Output = Result<()>> + Send
    where
        V: ToArgs + ?Sized;

    /// Stores `value` under `key` with a time-to-live.
    fn set_ex<V>(
        &self,
        key: &str,
        value: &V,
        seconds: u64,
    ) -> impl Future<Output = Result<()>> + Send
    where
        V: ToArgs + ?Sized;

    // Hashes

    /// Returns one hash field, `None` if absent.
    fn hget(&self, key: &str, field: &str) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Returns one hash field as a 32-bit integer.
    fn hget_int(&self, key: &str, field: &str) -> impl Future<Output = Result<i32>> + Send;

    /// Returns one hash field as a 64-bit integer.
    fn hget_int64(&self, key: &str, field: &str) -> impl Future<Output = Result<i64>> + Send;

    /// Returns one hash field as a float.
    fn hget_float64(&self, key: &str, field: &str) -> impl Future<Output = Result<f64>> + Send;

    /// Returns one hash field as UTF-8 text.
    fn hget_string(&self, key: &str, field: &str) -> impl Future<Output = Result<String>> + Send;

    /// Sets one hash field; returns 1 if the field is new, 0 if it was updated.
    fn hset<F, V>(&self, key: &str, field: &F, value: &V) -> impl Future<Output = Result<i64>> + Send
    where
        F: ToArgs + ?Sized,
        V: ToArgs + ?Sized;

    /// Returns several hash fields in request order, `None` for absent ones.
    fn hmget(
        &self,
        key: &str,
        fields: &[&str],
    ) -> impl Future<Output = Result<Vec<Option<Bytes>>>> + Send;

    /// Sets several hash fields at once.
    fn hmset<F, V>(&self, key: &str, fields: &[(F, V)]) -> impl Future<Output = Result<()>> + Send
    where
        F: ToArgs,
        V: ToArgs;

    /// Removes one hash field; returns the number removed.
    fn hdel<F>(&self, key: &str, field: &F) -> impl Future<Output = Result<i64>> + Send
    where
        F: ToArgs + ?Sized;

    /// Removes several hash fields; returns the number removed.
    fn hdels<F>(&self, key: &str, fields: &[F]) -> impl Future<Output = Result<i64>> + Send
    where
        F: ToArgs;

    /// Returns every field and value of a hash.
    fn hgetall(&self, key: &str) -> impl Future<Output = Result<HashMap<String, String>>> + Send;

    // Sets

    /// Adds one member or a sequence of members; returns how many were new.
    fn sadd<M>(&self, key: &str, members: &M) -> impl Future<Output = Result<i64>> + Send
    where
        M: ToArgs + ?Sized;

    /// Removes one member or a sequence of members; returns how many were removed.
    fn srem<M>(&self, key: &str, members: &M) -> impl Future<Output = Result<i64>> + Send
    where
        M: ToArgs + ?Sized;

    /// Returns whether `member` is in the set.
    fn sismember<M>(&self, key: &str, member: &M) -> impl Future<Output = Result<bool>> + Send
    where
        M: ToArgs + ?Sized;

    /// Returns every member of the set.
    fn smembers(&self, key: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Returns the intersection of the given sets.
    fn sinter(&self, keys: &[&str]) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Returns the union of the given sets.
    fn sunion(&self, keys: &[&str]) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Returns the members of the first set missing from the others.
    fn sdiff(&self, keys: &[&str]) -> impl Future<Output = Result<Vec<String>>> + Send;

    // Sorted sets

    /// Adds `member` with `score`; returns 1 if it was new.
    fn zadd<M>(&self, key: &str, score: f64, member: &M) -> impl Future<Output = Result<i64>> + Send
    where
        M: ToArgs + ?Sized;

    /// Returns members by rank, lowest score first.
    fn zrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Returns members whose score lies between `min` and `max`.
    fn zrange_by_score<A, B>(
        &self,
        key: &str,
        min: &A,
        max: &B,
    ) -> impl Future<Output = Result<Vec<String>>> + Send
    where
        A: ToArgs + ?Sized,
        B: ToArgs + ?Sized;

    /// Removes members whose score lies between `min` and `max`; returns the
    /// number removed.
    fn zrem_range_by_score<A, B>(
        &self,
        key: &str,
        min: &A,
        max: &B,
    ) -> impl Future<Output = Result<i64>> + Send
    where
        A: ToArgs + ?Sized,
        B: ToArgs + ?Sized;

    /// Returns the number of members.
    fn zcard(&self, key: &str) -> impl Future<Output = Result<i64>> + Send;

    /// Returns the score of `member`.
    fn zscore<M>(&self, key: &str, member: &M) -> impl Future<Output = Result<f64>> + Send
    where
        M: ToArgs + ?Sized;

    /// Stores the intersection of `keys` in `destination`; returns its size.
    fn zinterstore(
        &self,
        destination: &str,
        keys: &[&str],
    ) -> impl Future<Output = Result<i64>> + Send;

    // Lists

    /// Removes and returns the last element, `None` if the list is empty.
    fn rpop(&self, key: &str) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    // Admin

    /// Sends `commands` as one pipelined batch and returns the reply to the
    /// last one.
    fn execute_batch_last_reply_only(
        &self,
        commands: &[Cmd],
    ) -> impl Future<Output = Result<crate::Frame>> + Send;

    /// Closes the underlying pool.
    fn shutdown(&self);
}

/// Publishes payloads to a message broker.
pub trait Publisher: Send + Sync {
    /// Publishes `payload` to every configured topic.
    fn publish(&self, payload: Payload) -> impl Future<Output = Result<()>> + Send;

    /// Releases the transport.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;

    /// Identifier of the last message the broker confirmed.
    fn last_confirmed_id(&self) -> u64;
}

/// Calls methods on remote services.
pub trait ServiceInvoker: Send + Sync {
    /// Posts `payload` to `method` on `app_id` and returns the response body.
    fn invoke_service(
        &self,
        app_id: &str,
        method: &str,
        payload: Payload,
    ) -> impl Future<Output = Result<Bytes>> + Send;
}
