//! Service invocation over a caller-supplied sidecar transport.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::capability::ServiceInvoker;
use crate::payload::Payload;
use crate::proto::error::BoxError;
use crate::{Error, Result};

/// Content type of every request body sent and every reply built here.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A request or response body with its media type.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    /// Media type of `data`.
    pub content_type: String,
    /// Encoded body.
    pub data: Bytes,
    /// Type URL echoed back from the incoming request, if any.
    pub data_type_url: Option<String>,
}

/// A connected client able to call a method on another application.
pub trait ServiceTransport: Send + Sync {
    /// Invokes `method` on `app_id` with `verb` and returns the response body.
    fn invoke_method(
        &self,
        app_id: &str,
        method: &str,
        verb: &str,
        content: Content,
    ) -> BoxFuture<'_, std::result::Result<Bytes, BoxError>>;
}

/// Calls remote service methods with JSON-typed bodies.
#[derive(Clone)]
pub struct Invoker {
    transport: Arc<dyn ServiceTransport>,
}

impl Invoker {
    /// Wraps a connected transport.
    pub fn new(transport: Arc<dyn ServiceTransport>) -> Self {
        Self { transport }
    }
}

impl ServiceInvoker for Invoker {
    #[instrument(skip(self, payload), level = "debug")]
    async fn invoke_service(&self, app_id: &str, method: &str, payload: Payload) -> Result<Bytes> {
        let data = payload.into_bytes()?;
        let content = Content {
            content_type: CONTENT_TYPE_JSON.to_string(),
            data: data.clone(),
            data_type_url: None,
        };

        self.transport
            .invoke_method(app_id, method, "post", content)
            .await
            .map_err(|source| {
                warn!(error = %source, "service invocation failed");
                Error::Transport {
                    context: format!(
                        "invoke method, app: {app_id}, method: {method}, content: {}",
                        String::from_utf8_lossy(&data)
                    ),
                    source,
                }
            })
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker").finish_non_exhaustive()
    }
}

/// Builds the JSON response for an incoming invocation.
///
/// Returns `None` if `response` cannot be serialized.
pub fn reply<T: Serialize + ?Sized>(response: &T, data_type_url: Option<&str>) -> Option<Content> {
    let data = serde_json::to_vec(response).ok()?;
    Some(Content {
        content_type: CONTENT_TYPE_JSON.to_string(),
        data: Bytes::from(data),
        data_type_url: data_type_url.map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::FutureExt;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Echo {
        calls: Mutex<Vec<(String, String, String, Content)>>,
        fail: bool,
    }

    impl ServiceTransport for Echo {
        fn invoke_method(
            &self,
            app_id: &str,
            method: &str,
            verb: &str,
            content: Content,
        ) -> BoxFuture<'_, std::result::Result<Bytes, BoxError>> {
            let call = (app_id.to_string(), method.to_string(), verb.to_string(), content);
            async move {
                if self.fail {
                    return Err("sidecar not running".into());
                }
                let body = call.3.data.clone();
                self.calls.lock().push(call);
                Ok(body)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_text_passes_through() {
        let transport = Arc::new(Echo::default());
        let invoker = Invoker::new(transport.clone());

        let resp = invoker
            .invoke_service("billing", "charge", Payload::from("raw"))
            .await
            .unwrap();
        assert_eq!(resp.as_ref(), b"raw");

        let calls = transport.calls.lock();
        let (app, method, verb, content) = &calls[0];
        assert_eq!(app, "billing");
        assert_eq!(method, "charge");
        assert_eq!(verb, "post");
        assert_eq!(content.content_type, CONTENT_TYPE_JSON);
    }

    #[tokio::test]
    async fn test_structured_is_encoded() {
        let transport = Arc::new(Echo::default());
        let invoker = Invoker::new(transport);

        let payload = Payload::json(&serde_json::json!({"amount": 5})).unwrap();
        let resp = invoker.invoke_service("billing", "charge", payload).await.unwrap();
        assert_eq!(resp.as_ref(), br#"{"amount":5}"#);
    }

    #[tokio::test]
    async fn test_error_carries_context() {
        let transport = Arc::new(Echo {
            fail: true,
            ..Echo::default()
        });
        let invoker = Invoker::new(transport);

        let err = invoker
            .invoke_service("billing", "charge", Payload::from("body"))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("app: billing"));
        assert!(message.contains("method: charge"));
        assert!(message.contains("content: body"));
        assert!(message.contains("sidecar not running"));
    }

    #[test]
    fn test_reply_builds_json_content() {
        let content = reply(&vec![1, 2], Some("type.googleapis.com/List")).unwrap();
        assert_eq!(content.content_type, CONTENT_TYPE_JSON);
        assert_eq!(content.data.as_ref(), b"[1,2]");
        assert_eq!(content.data_type_url.as_deref(), Some("type.googleapis.com/List"));
    }

    #[test]
    fn test_reply_unserializable() {
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple key");
        assert!(reply(&bad, None).is_none());
    }
}
