//! Write dispatcher.
//!
//! Takes due writes off a channel, sends the WebSocket echo and the `/set`
//! request for each, and reports the outcome. The echo does not wait for the
//! HTTP reply, so the two can reach the device in either order.

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use ledpanel_core::WriteRequest;
use ledpanel_protocol::SetCommand;

use crate::http::DeviceApi;
use crate::live::EchoSender;

/// Result of one write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Succeeded {
        write: WriteRequest,
        /// `currentState` from the reply, when the device sent one
        state: Option<Value>,
    },
    Failed {
        write: WriteRequest,
        error: String,
    },
}

pub struct WriteDispatcher {
    api: DeviceApi,
    echo: Option<EchoSender>,
}

impl WriteDispatcher {
    pub fn new(api: DeviceApi, echo: Option<EchoSender>) -> Self {
        Self { api, echo }
    }

    /// Send one write and wait for the device's answer.
    pub async fn dispatch(&self, write: WriteRequest) -> WriteOutcome {
        let cmd = SetCommand::from(write.clone());

        if let Some(echo) = &self.echo {
            echo.send(&cmd);
        }

        match self.api.set(&cmd).await {
            Ok(response) => {
                debug!(name = %cmd.name, value = %cmd.value, "Write accepted");
                WriteOutcome::Succeeded {
                    write,
                    state: response.current_state,
                }
            }
            Err(e) => {
                warn!(name = %cmd.name, value = %cmd.value, error = %e, "Write failed");
                WriteOutcome::Failed {
                    write,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Process writes in order until either channel closes.
    pub fn spawn(
        self,
        mut writes: mpsc::Receiver<WriteRequest>,
        outcomes: mpsc::Sender<WriteOutcome>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(write) = writes.recv().await {
                let outcome = self.dispatch(write).await;
                if outcomes.send(outcome).await.is_err() {
                    break;
                }
            }
        })
    }
}
