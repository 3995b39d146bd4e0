use bytes::Bytes;
use serde::Serialize;

use crate::proto::frame::Frame;
use crate::Result;

/// A command ready to be sent to the server: a verb followed by its
/// arguments, all binary-safe.
///
/// # Example
///
/// ```
/// use dataplane::core::command::Cmd;
///
/// let cmd = Cmd::new("SET").arg("key").arg("value");
/// assert_eq!(cmd.name(), "SET");
///
/// let flat = Cmd::new("SADD").arg("tags").args(&["a", "b"]).unwrap();
/// assert_eq!(flat.as_args().len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cmd {
    args: Vec<Bytes>,
}

impl Cmd {
    /// Creates a new command with the given name.
    #[inline]
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self {
            args: vec![name.into()],
        }
    }

    /// Appends a single raw argument.
    #[inline]
    pub fn arg<T: Into<Bytes>>(mut self, arg: T) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a value, flattening sequences into several arguments.
    ///
    /// Fails with [`Error::Serialization`](crate::Error::Serialization) if a
    /// [`Json`] value cannot be encoded.
    #[inline]
    pub fn args<A: ToArgs + ?Sized>(mut self, value: &A) -> Result<Self> {
        value.write_args(&mut self.args)?;
        Ok(self)
    }

    /// The command verb.
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.args[0]).into_owned()
    }

    /// The verb followed by every argument, as sent on the wire.
    pub fn as_args(&self) -> &[Bytes] {
        &self.args
    }

    /// Converts the command to a RESP Array frame.
    #[inline]
    pub fn into_frame(self) -> Frame {
        Frame::Array(self.args.into_iter().map(Frame::bulk).collect())
    }
}

/// Values that can be written as one or more command arguments.
///
/// Scalars become one argument in their textual form (`bool` as `1`/`0`),
/// sequences are flattened element by element and [`Json`] values are
/// serialized first.
pub trait ToArgs: Send + Sync {
    /// Appends the argument form of `self` to `out`.
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()>;
}

macro_rules! display_args {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToArgs for $t {
                fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
                    out.push(Bytes::from(self.to_string()));
                    Ok(())
                }
            }
        )*
    };
}

display_args!(i8, i16, i32, i64, isize, u16, u32, u64, usize, f32, f64);

impl ToArgs for bool {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        out.push(Bytes::from_static(if *self { b"1" } else { b"0" }));
        Ok(())
    }
}

impl ToArgs for str {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        out.push(Bytes::copy_from_slice(self.as_bytes()));
        Ok(())
    }
}

impl ToArgs for String {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        self.as_str().write_args(out)
    }
}

impl ToArgs for Bytes {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        out.push(self.clone());
        Ok(())
    }
}

impl<T: ToArgs + ?Sized> ToArgs for &T {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        (**self).write_args(out)
    }
}

impl<T: ToArgs> ToArgs for [T] {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        for item in self {
            item.write_args(out)?;
        }
        Ok(())
    }
}

impl<T: ToArgs, const N: usize> ToArgs for [T; N] {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        self.as_slice().write_args(out)
    }
}

impl<T: ToArgs> ToArgs for Vec<T> {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        self.as_slice().write_args(out)
    }
}

/// Stores any serializable value as its JSON text.
///
/// ```
/// use dataplane::core::command::{Cmd, Json};
///
/// let cmd = Cmd::new("SET").arg("user:1").args(&Json(vec![1, 2])).unwrap();
/// assert_eq!(cmd.as_args()[2].as_ref(), b"[1,2]");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize + Send + Sync> ToArgs for Json<T> {
    fn write_args(&self, out: &mut Vec<Bytes>) -> Result<()> {
        out.push(Bytes::from(serde_json::to_vec(&self.0)?));
        Ok(())
    }
}

fn keyed(name: &'static str, key: &str) -> Cmd {
    Cmd::new(name).arg(key.to_owned())
}

fn multi_key(name: &'static str, keys: &[&str]) -> Cmd {
    keys.iter()
        .fold(Cmd::new(name), |cmd, key| cmd.arg((*key).to_owned()))
}

/// Creates a PING command.
#[inline]
pub fn ping() -> Cmd {
    Cmd::new("PING")
}

/// Creates an AUTH command with password only.
#[inline]
pub fn auth(password: &str) -> Cmd {
    Cmd::new("AUTH").arg(password.to_owned())
}

/// Creates a SELECT command.
#[inline]
pub fn select(db: u32) -> Cmd {
    Cmd::new("SELECT").arg(db.to_string())
}

/// Creates a DEL command for one key.
#[inline]
pub fn del(key: &str) -> Cmd {
    keyed("DEL", key)
}

/// Creates an EXISTS command.
#[inline]
pub fn exists(key: &str) -> Cmd {
    keyed("EXISTS", key)
}

/// Creates an EXPIRE command.
#[inline]
pub fn expire(key: &str, seconds: u64) -> Cmd {
    keyed("EXPIRE", key).arg(seconds.to_string())
}

/// Creates an INCR command.
#[inline]
pub fn incr(key: &str) -> Cmd {
    keyed("INCR", key)
}

/// Creates a GET command.
#[inline]
pub fn get(key: &str) -> Cmd {
    keyed("GET", key)
}

/// Creates a SET command.
#[inline]
pub fn set<V: ToArgs + ?Sized>(key: &str, value: &V) -> Result<Cmd> {
    keyed("SET", key).args(value)
}

/// Creates a `SET key value EX seconds` command.
#[inline]
pub fn set_ex<V: ToArgs + ?Sized>(key: &str, value: &V, seconds: u64) -> Result<Cmd> {
    Ok(set(key, value)?.arg("EX").arg(seconds.to_string()))
}

/// Creates an HGET command.
#[inline]
pub fn hget(key: &str, field: &str) -> Cmd {
    keyed("HGET", key).arg(field.to_owned())
}

/// Creates an HSET command.
#[inline]
pub fn hset<F, V>(key: &str, field: &F, value: &V) -> Result<Cmd>
where
    F: ToArgs + ?Sized,
    V: ToArgs + ?Sized,
{
    keyed("HSET", key).args(field)?.args(value)
}

/// Creates an HMGET command.
#[inline]
pub fn hmget(key: &str, fields: &[&str]) -> Cmd {
    fields
        .iter()
        .fold(keyed("HMGET", key), |cmd, field| cmd.arg((*field).to_owned()))
}

/// Creates an HMSET command.
#[inline]
pub fn hmset<F: ToArgs, V: ToArgs>(key: &str, fields: &[(F, V)]) -> Result<Cmd> {
    let mut cmd = keyed("HMSET", key);
    for (field, value) in fields {
        cmd = cmd.args(field)?.args(value)?;
    }
    Ok(cmd)
}

/// Creates an HDEL command; `fields` may be one field or a sequence.
#[inline]
pub fn hdel<F: ToArgs + ?Sized>(key: &str, fields: &F) -> Result<Cmd> {
    keyed("HDEL", key).args(fields)
}

/// Creates an HGETALL command.
#[inline]
pub fn hgetall(key: &str) -> Cmd {
    keyed("HGETALL", key)
}

/// Creates an SADD command; `members` may be one member or a sequence.
#[inline]
pub fn sadd<M: ToArgs + ?Sized>(key: &str, members: &M) -> Result<Cmd> {
    keyed("SADD", key).args(members)
}

/// Creates an SREM command; `members` may be one member or a sequence.
#[inline]
pub fn srem<M: ToArgs + ?Sized>(key: &str, members: &M) -> Result<Cmd> {
    keyed("SREM", key).args(members)
}

/// Creates an SISMEMBER command.
#[inline]
pub fn sismember<M: ToArgs + ?Sized>(key: &str, member: &M) -> Result<Cmd> {
    keyed("SISMEMBER", key).args(member)
}

/// Creates an SMEMBERS command.
#[inline]
pub fn smembers(key: &str) -> Cmd {
    keyed("SMEMBERS", key)
}

/// Creates an SINTER command.
#[inline]
pub fn sinter(keys: &[&str]) -> Cmd {
    multi_key("SINTER", keys)
}

/// Creates an SUNION command.
#[inline]
pub fn sunion(keys: &[&str]) -> Cmd {
    multi_key("SUNION", keys)
}

/// Creates an SDIFF command.
#[inline]
pub fn sdiff(keys: &[&str]) -> Cmd {
    multi_key("SDIFF", keys)
}

/// Creates a ZADD command with a single score/member pair.
#[inline]
pub fn zadd<M: ToArgs + ?Sized>(key: &str, score: f64, member: &M) -> Result<Cmd> {
    keyed("ZADD", key).args(&score)?.args(member)
}

/// Creates a ZRANGE command over ranks.
#[inline]
pub fn zrange(key: &str, start: i64, stop: i64) -> Cmd {
    keyed("ZRANGE", key)
        .arg(start.to_string())
        .arg(stop.to_string())
}

/// Creates a ZRANGEBYSCORE command. Bounds may be numbers or strings such
/// as `-inf` or `(5`.
#[inline]
pub fn zrange_by_score<A, B>(key: &str, min: &A, max: &B) -> Result<Cmd>
where
    A: ToArgs + ?Sized,
    B: ToArgs + ?Sized,
{
    keyed("ZRANGEBYSCORE", key).args(min)?.args(max)
}

/// Creates a ZREMRANGEBYSCORE command.
#[inline]
pub fn zrem_range_by_score<A, B>(key: &str, min: &A, max: &B) -> Result<Cmd>
where
    A: ToArgs + ?Sized,
    B: ToArgs + ?Sized,
{
    keyed("ZREMRANGEBYSCORE", key).args(min)?.args(max)
}

/// Creates a ZCARD command.
#[inline]
pub fn zcard(key: &str) -> Cmd {
    keyed("ZCARD", key)
}

/// Creates a ZSCORE command.
#[inline]
pub fn zscore<M: ToArgs + ?Sized>(key: &str, member: &M) -> Result<Cmd> {
    keyed("ZSCORE", key).args(member)
}

/// Creates a `ZINTERSTORE dest numkeys key...` command.
#[inline]
pub fn zinterstore(destination: &str, keys: &[&str]) -> Cmd {
    keys.iter().fold(
        keyed("ZINTERSTORE", destination).arg(keys.len().to_string()),
        |cmd, key| cmd.arg((*key).to_owned()),
    )
}

/// Creates an RPOP command.
#[inline]
pub fn rpop(key: &str) -> Cmd {
    keyed("RPOP", key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::collections::HashMap;

    fn words(cmd: &Cmd) -> Vec<String> {
        cmd.as_args()
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    #[test]
    fn test_ping_cmd() {
        assert_eq!(
            ping().into_frame(),
            Frame::Array(vec![Frame::BulkString(Some("PING".into()))])
        );
    }

    #[test]
    fn test_set_ex_cmd() {
        let cmd = set_ex("key", "value", 30).unwrap();
        assert_eq!(words(&cmd), ["SET", "key", "value", "EX", "30"]);
    }

    #[test]
    fn test_set_stringifies_scalars() {
        assert_eq!(words(&set("n", &42).unwrap()), ["SET", "n", "42"]);
        assert_eq!(words(&set("f", &1.5).unwrap()), ["SET", "f", "1.5"]);
        assert_eq!(words(&set("b", &true).unwrap()), ["SET", "b", "1"]);
    }

    #[test]
    fn test_set_json_value() {
        let mut user = HashMap::new();
        user.insert("name", "ann");
        let cmd = set("user", &Json(user)).unwrap();
        assert_eq!(words(&cmd), ["SET", "user", r#"{"name":"ann"}"#]);
    }

    #[test]
    fn test_json_serialization_failure() {
        // Maps with non-string keys cannot be represented as JSON objects.
        let mut bad = HashMap::new();
        bad.insert((1, 2), "x");
        let err = set("k", &Json(bad)).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn test_sadd_single_and_many() {
        assert_eq!(words(&sadd("s", "a").unwrap()), ["SADD", "s", "a"]);
        assert_eq!(
            words(&sadd("s", &vec!["a", "b", "c"]).unwrap()),
            ["SADD", "s", "a", "b", "c"]
        );
        assert_eq!(words(&srem("s", &[1, 2]).unwrap()), ["SREM", "s", "1", "2"]);
    }

    #[test]
    fn test_hmset_cmd() {
        let cmd = hmset("h", &[("a", 1), ("b", 2)]).unwrap();
        assert_eq!(words(&cmd), ["HMSET", "h", "a", "1", "b", "2"]);
    }

    #[test]
    fn test_hmget_cmd() {
        assert_eq!(words(&hmget("h", &["a", "b"])), ["HMGET", "h", "a", "b"]);
    }

    #[test]
    fn test_hdel_flattens_fields() {
        assert_eq!(
            words(&hdel("h", &vec!["a", "b"]).unwrap()),
            ["HDEL", "h", "a", "b"]
        );
    }

    #[test]
    fn test_zadd_and_range_by_score() {
        assert_eq!(words(&zadd("z", 10.0, "x").unwrap()), ["ZADD", "z", "10", "x"]);
        assert_eq!(
            words(&zrange_by_score("z", &0, &"(15").unwrap()),
            ["ZRANGEBYSCORE", "z", "0", "(15"]
        );
    }

    #[test]
    fn test_zinterstore_prefixes_key_count() {
        assert_eq!(
            words(&zinterstore("dest", &["a", "b"])),
            ["ZINTERSTORE", "dest", "2", "a", "b"]
        );
    }

    #[test]
    fn test_multi_key_set_algebra() {
        assert_eq!(words(&sinter(&["a", "b"])), ["SINTER", "a", "b"]);
        assert_eq!(words(&sunion(&["a"])), ["SUNION", "a"]);
        assert_eq!(words(&sdiff(&["a", "b", "c"])), ["SDIFF", "a", "b", "c"]);
    }

    #[test]
    fn test_binary_arguments_are_preserved() {
        let cmd = set("bin", &Bytes::from_static(b"\x00\xff\r\n")).unwrap();
        assert_eq!(cmd.as_args()[2].as_ref(), b"\x00\xff\r\n");
    }
}
