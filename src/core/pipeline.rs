//! Send-all, read-last command batches.

use tracing::{debug, warn};

use crate::core::command::Cmd;
use crate::core::connection::Connection;
use crate::proto::frame::Frame;
use crate::{Error, Result};

/// Progress of a batch through its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing in flight.
    Idle,
    /// Commands are being buffered.
    Sending,
    /// The buffer has been written; replies are outstanding.
    Flushed,
    /// Every reply has been read.
    ReplyRead,
    /// An I/O or protocol failure left the connection out of sync.
    Failed,
}

/// Runs command batches over a borrowed connection.
///
/// All commands are buffered, written with a single flush, and every reply
/// is read back so the connection stays in step with the server. Only the
/// final reply is handed to the caller.
#[derive(Debug)]
pub struct PipelineExecutor<'a> {
    conn: &'a mut Connection,
    state: PipelineState,
}

impl<'a> PipelineExecutor<'a> {
    /// Wraps a connection with no commands in flight.
    pub fn new(conn: &'a mut Connection) -> Self {
        Self {
            conn,
            state: PipelineState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Sends `commands` in order and returns the reply to the last one.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an empty batch.
    /// - [`Error::Server`] carrying the first error reply in the batch, if
    ///   any command was rejected. Later commands still ran.
    /// - I/O and protocol errors, after which the connection is marked broken.
    pub async fn execute_last(&mut self, commands: &[Cmd]) -> Result<Frame> {
        if commands.is_empty() {
            return Err(Error::InvalidArgument {
                message: "pipeline requires at least one command".to_string(),
            });
        }

        self.state = PipelineState::Sending;
        for cmd in commands {
            self.conn.send(cmd);
        }
        if let Err(e) = self.conn.flush().await {
            return Err(self.fail(e));
        }
        self.state = PipelineState::Flushed;

        let mut first_error = None;
        let mut last = Frame::Null;
        for _ in 0..commands.len() {
            match self.conn.receive().await {
                Ok(frame) => {
                    if first_error.is_none() {
                        first_error = frame.error_message();
                    }
                    last = frame;
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
        self.state = PipelineState::ReplyRead;
        debug!(commands = commands.len(), "pipeline replies read");

        self.state = PipelineState::Idle;
        match first_error {
            Some(message) => Err(Error::Server { message }),
            None => Ok(last),
        }
    }

    fn fail(&mut self, e: Error) -> Error {
        warn!(state = ?self.state, error = %e, "pipeline failed");
        self.state = PipelineState::Failed;
        self.conn.mark_broken();
        e
    }
}
