// Device reader port
//
// The panel decoder is an opaque producer of DeviceMessage values. `read`
// waits until the next message is available; errors are transient from the
// coordinator's point of view and never stop the ingest loop.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::error::{RelayError, Result};
use crate::message::DeviceMessage;

#[async_trait]
pub trait DeviceReader: Send {
    /// Wait for the next decoded message
    async fn read(&mut self) -> Result<DeviceMessage>;
}

/// Reader that replays a fixed script, then never yields again.
///
/// Useful for tests and for driving the coordinator from recorded traffic.
pub struct ScriptedReader {
    script: VecDeque<Result<DeviceMessage>>,
}

impl ScriptedReader {
    pub fn new(script: impl IntoIterator<Item = Result<DeviceMessage>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn from_messages(messages: impl IntoIterator<Item = DeviceMessage>) -> Self {
        Self::new(messages.into_iter().map(Ok))
    }
}

#[async_trait]
impl DeviceReader for ScriptedReader {
    async fn read(&mut self) -> Result<DeviceMessage> {
        match self.script.pop_front() {
            Some(next) => next,
            None => {
                // park instead of spinning on end of input
                std::future::pending::<()>().await;
                Err(RelayError::device("end of script"))
            }
        }
    }
}
