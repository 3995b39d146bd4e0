//! Message publishing over a caller-supplied broker transport.
//!
//! The broker client itself (connection setup, partitioning, acks) lives
//! behind [`MessageTransport`]; [`Producer`] only fans a payload out to the
//! configured topics.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use tracing::{debug, instrument};

use crate::capability::Publisher;
use crate::payload::Payload;
use crate::proto::error::BoxError;
use crate::{Error, Result};

/// One message bound for a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Destination topic.
    pub topic: String,
    /// Partitioning key; `None` lets the broker spread messages.
    pub key: Option<Bytes>,
    /// Message body.
    pub value: Bytes,
}

/// A connected broker client able to send batches of messages.
pub trait MessageTransport: Send + Sync {
    /// Sends every message in one call.
    fn send_messages(
        &self,
        messages: Vec<Message>,
    ) -> BoxFuture<'_, std::result::Result<(), BoxError>>;

    /// Closes the underlying client.
    fn close(&self) -> BoxFuture<'_, std::result::Result<(), BoxError>>;
}

/// Publishes payloads to a fixed set of topics.
///
/// ```no_run
/// use std::sync::Arc;
/// use dataplane::mq::{Message, MessageTransport, Producer};
/// use dataplane::{BoxError, Payload, Publisher};
/// use futures::future::{BoxFuture, FutureExt};
///
/// struct Discard;
///
/// impl MessageTransport for Discard {
///     fn send_messages(&self, _: Vec<Message>) -> BoxFuture<'_, Result<(), BoxError>> {
///         async { Ok(()) }.boxed()
///     }
///
///     fn close(&self) -> BoxFuture<'_, Result<(), BoxError>> {
///         async { Ok(()) }.boxed()
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> dataplane::Result<()> {
///     let producer = Producer::new(Arc::new(Discard), ["orders"])?;
///     producer.publish(Payload::from("created")).await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Producer {
    transport: Arc<dyn MessageTransport>,
    topics: Vec<String>,
}

impl Producer {
    /// Wraps a connected transport.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if no topic is given.
    pub fn new<I, T>(transport: Arc<dyn MessageTransport>, topics: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let topics: Vec<String> = topics.into_iter().map(Into::into).collect();
        if topics.is_empty() {
            return Err(Error::InvalidArgument {
                message: "producer requires at least one topic".to_string(),
            });
        }
        Ok(Self { transport, topics })
    }

    /// Topics every payload is sent to.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}

impl Publisher for Producer {
    #[instrument(skip_all, fields(topics = self.topics.len()), level = "debug")]
    async fn publish(&self, payload: Payload) -> Result<()> {
        let value = payload.into_bytes()?;
        let messages: Vec<Message> = self
            .topics
            .iter()
            .map(|topic| Message {
                topic: topic.clone(),
                key: None,
                value: value.clone(),
            })
            .collect();

        self.transport
            .send_messages(messages)
            .await
            .map_err(|source| Error::Transport {
                context: format!("publish to {}", self.topics.join(",")),
                source,
            })?;
        debug!(bytes = value.len(), "payload published");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.transport
            .close()
            .await
            .map_err(|source| Error::Transport {
                context: "close producer".to_string(),
                source,
            })
    }

    fn last_confirmed_id(&self) -> u64 {
        0
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("topics", &self.topics)
            .finish_non_exhaustive()
    }
}
