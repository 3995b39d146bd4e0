//! In-process RESP server for tests.
//!
//! Speaks enough of the protocol for every command the [`Cache`](crate::Cache)
//! surface issues, keeps its data in memory and counts what it sees, so tests
//! can assert on round trips without a real server.
//!
//! ```no_run
//! use dataplane::testing::MockServer;
//! use dataplane::{Cache, Client};
//!
//! # async fn demo() -> dataplane::Result<()> {
//! let server = MockServer::start().await;
//! let client = Client::open(&server.url())?;
//! client.set("k", "v").await?;
//! assert_eq!(server.command_count("SET"), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::proto::codec::{Decoder, Encoder};
use crate::proto::frame::Frame;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_INTEGER: &str = "ERR value is not an integer or out of range";
const NOT_FLOAT: &str = "ERR value is not a valid float";
const SYNTAX: &str = "ERR syntax error";

type Reply = Result<Frame, Frame>;

enum Value {
    Str(Bytes),
    Hash(HashMap<Bytes, Bytes>),
    Set(BTreeSet<Bytes>),
    ZSet(HashMap<Bytes, f64>),
    List(VecDeque<Bytes>),
}

impl Value {
    fn is_empty(&self) -> bool {
        match self {
            Value::Str(_) => false,
            Value::Hash(h) => h.is_empty(),
            Value::Set(s) => s.is_empty(),
            Value::ZSet(z) => z.is_empty(),
            Value::List(l) => l.is_empty(),
        }
    }
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }
}

#[derive(Default)]
struct Store {
    entries: HashMap<Bytes, Entry>,
}

macro_rules! typed_access {
    ($read:ident, $write:ident, $variant:ident, $ty:ty) => {
        fn $read(&mut self, key: &[u8]) -> Result<Option<&$ty>, Frame> {
            match self.value(key) {
                None => Ok(None),
                Some(Value::$variant(v)) => Ok(Some(v)),
                Some(_) => Err(Frame::error(WRONGTYPE)),
            }
        }

        fn $write(&mut self, key: &Bytes) -> Result<&mut $ty, Frame> {
            self.purge(key);
            let entry = self
                .entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(Value::$variant(Default::default())));
            match &mut entry.value {
                Value::$variant(v) => Ok(v),
                _ => Err(Frame::error(WRONGTYPE)),
            }
        }
    };
}

impl Store {
    fn purge(&mut self, key: &[u8]) {
        let expired = self
            .entries
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            self.entries.remove(key);
        }
    }

    fn value(&mut self, key: &[u8]) -> Option<&Value> {
        self.purge(key);
        self.entries.get(key).map(|e| &e.value)
    }

    fn contains(&mut self, key: &[u8]) -> bool {
        self.value(key).is_some()
    }

    fn drop_if_empty(&mut self, key: &[u8]) {
        if self.entries.get(key).is_some_and(|e| e.value.is_empty()) {
            self.entries.remove(key);
        }
    }

    typed_access!(hash, hash_mut, Hash, HashMap<Bytes, Bytes>);
    typed_access!(set, set_mut, Set, BTreeSet<Bytes>);
    typed_access!(zset, zset_mut, ZSet, HashMap<Bytes, f64>);
    typed_access!(list, list_mut, List, VecDeque<Bytes>);

    fn string(&mut self, key: &[u8]) -> Result<Option<&Bytes>, Frame> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::Str(b)) => Ok(Some(b)),
            Some(_) => Err(Frame::error(WRONGTYPE)),
        }
    }

    fn members(&mut self, key: &[u8]) -> Result<BTreeSet<Bytes>, Frame> {
        Ok(self.set(key)?.cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct Session {
    authenticated: bool,
}

struct State {
    store: Mutex<Store>,
    password: Option<String>,
    accepted: AtomicUsize,
    commands: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
}

impl State {
    fn handle(&self, session: &mut Session, frame: Frame) -> Frame {
        let args = match frame {
            Frame::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Frame::BulkString(Some(b)) => Some(b),
                    _ => None,
                })
                .collect::<Option<Vec<Bytes>>>(),
            _ => None,
        };
        let Some(args) = args.filter(|a| !a.is_empty()) else {
            return Frame::error("ERR Protocol error: expected array of bulk strings");
        };

        let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
        *self.commands.lock().entry(name.clone()).or_default() += 1;

        if self.failing.lock().contains(&name) {
            return Frame::error(&format!("ERR {name} disabled by test"));
        }
        if self.password.is_some() && !session.authenticated && name != "AUTH" {
            return Frame::error("NOAUTH Authentication required.");
        }

        match self.run(session, &name, &args[1..]) {
            Ok(frame) | Err(frame) => frame,
        }
    }

    fn run(&self, session: &mut Session, name: &str, args: &[Bytes]) -> Reply {
        let mut store = self.store.lock();
        let arity = |min: usize| -> Result<(), Frame> {
            if args.len() < min {
                Err(Frame::error(&format!(
                    "ERR wrong number of arguments for '{}' command",
                    name.to_ascii_lowercase()
                )))
            } else {
                Ok(())
            }
        };

        match name {
            "PING" => Ok(match args.first() {
                Some(msg) => Frame::bulk(msg.clone()),
                None => Frame::simple("PONG"),
            }),
            "AUTH" => {
                arity(1)?;
                match &self.password {
                    None => Err(Frame::error(
                        "ERR AUTH called without any password configured",
                    )),
                    Some(pw) if pw.as_bytes() == args[0].as_ref() => {
                        session.authenticated = true;
                        Ok(Frame::simple("OK"))
                    }
                    Some(_) => Err(Frame::error(
                        "WRONGPASS invalid username-password pair or user is disabled.",
                    )),
                }
            }
            "SELECT" => {
                arity(1)?;
                match int(&args[0])? {
                    0..=15 => Ok(Frame::simple("OK")),
                    _ => Err(Frame::error("ERR DB index is out of range")),
                }
            }

            "GET" => {
                arity(1)?;
                Ok(Frame::BulkString(store.string(&args[0])?.cloned()))
            }
            "SET" => {
                arity(2)?;
                let expires_at = match &args[2..] {
                    [] => None,
                    [opt, secs] if opt.eq_ignore_ascii_case(b"EX") => match int(secs)? {
                        s if s > 0 => Some(Instant::now() + Duration::from_secs(s as u64)),
                        _ => return Err(Frame::error("ERR invalid expire time in 'set' command")),
                    },
                    _ => return Err(Frame::error(SYNTAX)),
                };
                store.entries.insert(
                    args[0].clone(),
                    Entry {
                        value: Value::Str(args[1].clone()),
                        expires_at,
                    },
                );
                Ok(Frame::simple("OK"))
            }
            "DEL" => {
                arity(1)?;
                let removed = args
                    .iter()
                    .filter(|key| store.contains(key) && store.entries.remove(*key).is_some())
                    .count();
                Ok(Frame::Integer(removed as i64))
            }
            "EXISTS" => {
                arity(1)?;
                let found = args.iter().filter(|key| store.contains(key)).count();
                Ok(Frame::Integer(found as i64))
            }
            "EXPIRE" => {
                arity(2)?;
                let secs = int(&args[1])?;
                store.purge(&args[0]);
                match store.entries.get_mut(&args[0]) {
                    Some(entry) => {
                        entry.expires_at =
                            Some(Instant::now() + Duration::from_secs(secs.max(0) as u64));
                        Ok(Frame::Integer(1))
                    }
                    None => Ok(Frame::Integer(0)),
                }
            }
            "TTL" => {
                arity(1)?;
                store.purge(&args[0]);
                Ok(Frame::Integer(match store.entries.get(&args[0]) {
                    None => -2,
                    Some(Entry {
                        expires_at: None, ..
                    }) => -1,
                    Some(Entry {
                        expires_at: Some(at),
                        ..
                    }) => {
                        let left = at.saturating_duration_since(Instant::now());
                        ((left.as_millis() + 500) / 1000) as i64
                    }
                }))
            }
            "INCR" => {
                arity(1)?;
                let current = match store.string(&args[0])? {
                    Some(b) => int(b).map_err(|_| Frame::error(NOT_INTEGER))?,
                    None => 0,
                };
                let next = current
                    .checked_add(1)
                    .ok_or_else(|| Frame::error("ERR increment or decrement would overflow"))?;
                let value = Value::Str(Bytes::from(next.to_string()));
                match store.entries.get_mut(&args[0]) {
                    Some(entry) => entry.value = value,
                    None => {
                        store.entries.insert(args[0].clone(), Entry::new(value));
                    }
                }
                Ok(Frame::Integer(next))
            }

            "HGET" => {
                arity(2)?;
                let value = store.hash(&args[0])?.and_then(|h| h.get(&args[1]).cloned());
                Ok(Frame::BulkString(value))
            }
            "HSET" | "HMSET" => {
                if args.len() < 3 || args.len() % 2 == 0 {
                    return Err(Frame::error(&format!(
                        "ERR wrong number of arguments for '{}' command",
                        name.to_ascii_lowercase()
                    )));
                }
                let hash = store.hash_mut(&args[0])?;
                let added = args[1..]
                    .chunks(2)
                    .filter(|pair| hash.insert(pair[0].clone(), pair[1].clone()).is_none())
                    .count();
                Ok(if name == "HSET" {
                    Frame::Integer(added as i64)
                } else {
                    Frame::simple("OK")
                })
            }
            "HMGET" => {
                arity(2)?;
                let hash = store.hash(&args[0])?;
                Ok(Frame::Array(
                    args[1..]
                        .iter()
                        .map(|f| Frame::BulkString(hash.and_then(|h| h.get(f).cloned())))
                        .collect(),
                ))
            }
            "HDEL" => {
                arity(2)?;
                let removed = match store.hash(&args[0])? {
                    None => 0,
                    Some(_) => {
                        let hash = store.hash_mut(&args[0])?;
                        args[1..].iter().filter(|f| hash.remove(*f).is_some()).count()
                    }
                };
                store.drop_if_empty(&args[0]);
                Ok(Frame::Integer(removed as i64))
            }
            "HGETALL" => {
                arity(1)?;
                let items = store
                    .hash(&args[0])?
                    .map(|h| {
                        h.iter()
                            .flat_map(|(f, v)| [Frame::bulk(f.clone()), Frame::bulk(v.clone())])
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Frame::Array(items))
            }

            "SADD" => {
                arity(2)?;
                let set = store.set_mut(&args[0])?;
                let added = args[1..].iter().filter(|m| set.insert((*m).clone())).count();
                Ok(Frame::Integer(added as i64))
            }
            "SREM" => {
                arity(2)?;
                let removed = match store.set(&args[0])? {
                    None => 0,
                    Some(_) => {
                        let set = store.set_mut(&args[0])?;
                        args[1..].iter().filter(|m| set.remove(*m)).count()
                    }
                };
                store.drop_if_empty(&args[0]);
                Ok(Frame::Integer(removed as i64))
            }
            "SISMEMBER" => {
                arity(2)?;
                let found = store.set(&args[0])?.is_some_and(|s| s.contains(&args[1]));
                Ok(Frame::Integer(found as i64))
            }
            "SMEMBERS" => {
                arity(1)?;
                Ok(bulk_array(store.members(&args[0])?))
            }
            "SINTER" | "SUNION" | "SDIFF" => {
                arity(1)?;
                let mut acc = store.members(&args[0])?;
                for key in &args[1..] {
                    let other = store.members(key)?;
                    acc = match name {
                        "SINTER" => acc.intersection(&other).cloned().collect(),
                        "SUNION" => acc.union(&other).cloned().collect(),
                        _ => acc.difference(&other).cloned().collect(),
                    };
                }
                Ok(bulk_array(acc))
            }

            "ZADD" => {
                if args.len() < 3 || args.len() % 2 == 0 {
                    return Err(Frame::error("ERR wrong number of arguments for 'zadd' command"));
                }
                let pairs = args[1..]
                    .chunks(2)
                    .map(|pair| -> Result<(f64, Bytes), Frame> {
                        Ok((float(&pair[0])?, pair[1].clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let zset = store.zset_mut(&args[0])?;
                let added = pairs
                    .into_iter()
                    .filter(|(score, member)| zset.insert(member.clone(), *score).is_none())
                    .count();
                Ok(Frame::Integer(added as i64))
            }
            "ZRANGE" => {
                arity(3)?;
                let (start, stop) = (int(&args[1])?, int(&args[2])?);
                let items = ranked(store.zset(&args[0])?);
                let len = items.len() as i64;
                let start = (if start < 0 { len + start } else { start }).max(0);
                let stop = (if stop < 0 { len + stop } else { stop }).min(len - 1);
                if start > stop {
                    return Ok(Frame::Array(Vec::new()));
                }
                Ok(bulk_array(
                    items[start as usize..=stop as usize]
                        .iter()
                        .map(|(m, _)| m.clone()),
                ))
            }
            "ZRANGEBYSCORE" => {
                arity(3)?;
                let (min, max) = (bound(&args[1])?, bound(&args[2])?);
                let items = ranked(store.zset(&args[0])?);
                Ok(bulk_array(
                    items
                        .into_iter()
                        .filter(|(_, s)| min.below(*s) && max.above(*s))
                        .map(|(m, _)| m),
                ))
            }
            "ZREMRANGEBYSCORE" => {
                arity(3)?;
                let (min, max) = (bound(&args[1])?, bound(&args[2])?);
                if store.zset(&args[0])?.is_none() {
                    return Ok(Frame::Integer(0));
                }
                let zset = store.zset_mut(&args[0])?;
                let before = zset.len();
                zset.retain(|_, s| !(min.below(*s) && max.above(*s)));
                let removed = before - zset.len();
                store.drop_if_empty(&args[0]);
                Ok(Frame::Integer(removed as i64))
            }
            "ZCARD" => {
                arity(1)?;
                Ok(Frame::Integer(store.zset(&args[0])?.map_or(0, |z| z.len()) as i64))
            }
            "ZSCORE" => {
                arity(2)?;
                let score = store.zset(&args[0])?.and_then(|z| z.get(&args[1]).copied());
                Ok(Frame::BulkString(score.map(|s| Bytes::from(s.to_string()))))
            }
            "ZINTERSTORE" => {
                arity(3)?;
                let numkeys = usize::try_from(int(&args[1])?).map_err(|_| Frame::error(SYNTAX))?;
                if numkeys == 0 || args.len() != 2 + numkeys {
                    return Err(Frame::error(SYNTAX));
                }
                let mut sources = Vec::with_capacity(numkeys);
                for key in &args[2..] {
                    sources.push(store.zset(key)?.cloned().unwrap_or_default());
                }
                let (first, rest) = sources.split_first().ok_or_else(|| Frame::error(SYNTAX))?;
                let result: HashMap<Bytes, f64> = first
                    .iter()
                    .filter_map(|(member, score)| {
                        rest.iter()
                            .map(|z| z.get(member))
                            .try_fold(*score, |acc, s| s.map(|s| acc + s))
                            .map(|total| (member.clone(), total))
                    })
                    .collect();
                let card = result.len() as i64;
                store.entries.remove(&args[0]);
                if card > 0 {
                    store
                        .entries
                        .insert(args[0].clone(), Entry::new(Value::ZSet(result)));
                }
                Ok(Frame::Integer(card))
            }

            "RPUSH" => {
                arity(2)?;
                let list = store.list_mut(&args[0])?;
                list.extend(args[1..].iter().cloned());
                Ok(Frame::Integer(list.len() as i64))
            }
            "RPOP" => {
                arity(1)?;
                let popped = match store.list(&args[0])? {
                    None => None,
                    Some(_) => store.list_mut(&args[0])?.pop_back(),
                };
                store.drop_if_empty(&args[0]);
                Ok(Frame::BulkString(popped))
            }

            _ => Err(Frame::error(&format!(
                "ERR unknown command '{}'",
                name.to_ascii_lowercase()
            ))),
        }
    }
}

#[derive(Clone, Copy)]
struct Bound {
    value: f64,
    exclusive: bool,
}

impl Bound {
    fn below(self, score: f64) -> bool {
        if self.exclusive {
            self.value < score
        } else {
            self.value <= score
        }
    }

    fn above(self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

fn int(arg: &[u8]) -> Result<i64, Frame> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Frame::error(NOT_INTEGER))
}

fn float(arg: &[u8]) -> Result<f64, Frame> {
    match arg.to_ascii_lowercase().as_slice() {
        b"inf" | b"+inf" => Ok(f64::INFINITY),
        b"-inf" => Ok(f64::NEG_INFINITY),
        other => std::str::from_utf8(other)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|f| !f.is_nan())
            .ok_or_else(|| Frame::error(NOT_FLOAT)),
    }
}

fn bound(arg: &[u8]) -> Result<Bound, Frame> {
    let (exclusive, raw) = match arg.strip_prefix(b"(") {
        Some(rest) => (true, rest),
        None => (false, arg),
    };
    let value = float(raw).map_err(|_| Frame::error("ERR min or max is not a float"))?;
    Ok(Bound { value, exclusive })
}

fn ranked(zset: Option<&HashMap<Bytes, f64>>) -> Vec<(Bytes, f64)> {
    let mut items: Vec<(Bytes, f64)> = zset
        .map(|z| z.iter().map(|(m, s)| (m.clone(), *s)).collect())
        .unwrap_or_default();
    items.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    items
}

fn bulk_array(items: impl IntoIterator<Item = Bytes>) -> Frame {
    Frame::Array(items.into_iter().map(Frame::bulk).collect())
}

async fn serve(state: Arc<State>, mut socket: TcpStream) {
    let mut decoder = Decoder::new();
    let mut encoder = Encoder::new();
    let mut session = Session::default();
    let mut buf = [0u8; 4096];

    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        decoder.append(&buf[..n]);

        loop {
            match decoder.decode() {
                Ok(Some(frame)) => encoder.encode(&state.handle(&mut session, frame)),
                Ok(None) => break,
                Err(_) => return,
            }
        }

        if !encoder.is_empty() {
            let data = encoder.take();
            if socket.write_all(&data).await.is_err() {
                return;
            }
        }
    }
}

/// A RESP server on an ephemeral localhost port.
///
/// Stops accepting and drops every client connection on
/// [`shutdown`](MockServer::shutdown) or when dropped.
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<State>,
    accept: Mutex<Option<JoinHandle<()>>>,
    sessions: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MockServer {
    /// Starts a server that needs no authentication.
    pub async fn start() -> Self {
        Self::spawn(None).await
    }

    /// Starts a server that rejects every command until AUTH succeeds.
    pub async fn with_password(password: &str) -> Self {
        Self::spawn(Some(password.to_string())).await
    }

    async fn spawn(password: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let state = Arc::new(State {
            store: Mutex::new(Store::default()),
            password,
            accepted: AtomicUsize::new(0),
            commands: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        });
        let sessions = Arc::new(Mutex::new(Vec::new()));

        let accept = {
            let state = Arc::clone(&state);
            let sessions = Arc::clone(&sessions);
            tokio::spawn(async move {
                while let Ok((socket, _)) = listener.accept().await {
                    state.accepted.fetch_add(1, Ordering::SeqCst);
                    let handle = tokio::spawn(serve(Arc::clone(&state), socket));
                    sessions.lock().push(handle);
                }
            })
        };

        Self {
            addr,
            state,
            accept: Mutex::new(Some(accept)),
            sessions,
        }
    }

    /// Port the server listens on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `redis://` URL for this server.
    pub fn url(&self) -> String {
        format!("redis://{}", self.addr)
    }

    /// Number of TCP connections accepted so far.
    pub fn connections_accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    /// How many times the server has received `name` (case-insensitive).
    pub fn command_count(&self, name: &str) -> usize {
        self.state
            .commands
            .lock()
            .get(&name.to_ascii_uppercase())
            .copied()
            .unwrap_or(0)
    }

    /// Total commands received.
    pub fn total_commands(&self) -> usize {
        self.state.commands.lock().values().sum()
    }

    /// Makes every later `name` command answer with an error reply.
    pub fn fail_command(&self, name: &str) {
        self.state.failing.lock().insert(name.to_ascii_uppercase());
    }

    /// Remaining time-to-live of `key`, `None` if it has none or is absent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut store = self.state.store.lock();
        store.purge(key.as_bytes());
        store
            .entries
            .get(key.as_bytes())
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Stops accepting and closes every open client connection.
    pub async fn shutdown(&self) {
        let accept = self.accept.lock().take();
        if let Some(handle) = accept {
            handle.abort();
            let _ = handle.await;
        }
        let sessions: Vec<_> = std::mem::take(&mut *self.sessions.lock());
        for handle in &sessions {
            handle.abort();
        }
        for handle in sessions {
            let _ = handle.await;
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(handle) = self.accept.lock().take() {
            handle.abort();
        }
        for handle in self.sessions.lock().drain(..) {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer")
            .field("addr", &self.addr)
            .field("accepted", &self.connections_accepted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(state: &State, session: &mut Session, words: &[&str]) -> Frame {
        let frame = Frame::Array(words.iter().map(|w| Frame::bulk(w.to_string())).collect());
        state.handle(session, frame)
    }

    fn state(password: Option<&str>) -> State {
        State {
            store: Mutex::new(Store::default()),
            password: password.map(str::to_string),
            accepted: AtomicUsize::new(0),
            commands: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    #[test]
    fn test_wrong_type() {
        let state = state(None);
        let mut session = Session::default();
        call(&state, &mut session, &["SET", "k", "v"]);
        let reply = call(&state, &mut session, &["SADD", "k", "m"]);
        assert_eq!(reply, Frame::error(WRONGTYPE));
    }

    #[test]
    fn test_noauth_until_auth() {
        let state = state(Some("pw"));
        let mut session = Session::default();
        assert!(call(&state, &mut session, &["PING"]).error_message().is_some());
        assert!(call(&state, &mut session, &["AUTH", "nope"]).error_message().is_some());
        assert_eq!(call(&state, &mut session, &["AUTH", "pw"]), Frame::simple("OK"));
        assert_eq!(call(&state, &mut session, &["PING"]), Frame::simple("PONG"));
    }

    #[test]
    fn test_zrange_by_score_bounds() {
        let state = state(None);
        let mut session = Session::default();
        call(&state, &mut session, &["ZADD", "z", "1", "a", "2", "b", "3", "c"]);
        let reply = call(&state, &mut session, &["ZRANGEBYSCORE", "z", "(1", "+inf"]);
        assert_eq!(
            reply,
            Frame::Array(vec![Frame::bulk("b"), Frame::bulk("c")])
        );
    }

    #[test]
    fn test_zinterstore_sums_scores() {
        let state = state(None);
        let mut session = Session::default();
        call(&state, &mut session, &["ZADD", "a", "1", "x", "2", "y"]);
        call(&state, &mut session, &["ZADD", "b", "10", "x"]);
        let reply = call(&state, &mut session, &["ZINTERSTORE", "out", "2", "a", "b"]);
        assert_eq!(reply, Frame::Integer(1));
        assert_eq!(
            call(&state, &mut session, &["ZSCORE", "out", "x"]),
            Frame::bulk("11")
        );
    }

    #[test]
    fn test_counts_commands() {
        let state = state(None);
        let mut session = Session::default();
        call(&state, &mut session, &["ping"]);
        call(&state, &mut session, &["PING"]);
        assert_eq!(state.commands.lock()["PING"], 2);
    }
}
