//! Agent delivery via the host agent CLI.
//!
//! Invokes `<command> agent --session-id <id> --deliver --channel <channel>
//! --message <text>` with a hard 30s deadline. Failures are surfaced to the
//! caller as errors; the pipeline logs them and never retries.

use async_trait::async_trait;
use betterclaw_core::delivery::AgentDelivery;
use betterclaw_core::error::DeliveryError;
use tokio::process::Command;
use tracing::debug;

/// Hard deadline for one delivery invocation.
const DELIVERY_TIMEOUT_SECS: u64 = 30;

/// Shells out to the host agent CLI to push a message into the session.
pub struct AgentCliDelivery {
    command: String,
    session_id: String,
    channel: String,
}

impl AgentCliDelivery {
    pub fn new(
        command: impl Into<String>,
        session_id: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self { command: command.into(), session_id: session_id.into(), channel: channel.into() }
    }
}

#[async_trait]
impl AgentDelivery for AgentCliDelivery {
    async fn deliver(&self, message: &str) -> Result<(), DeliveryError> {
        debug!(command = %self.command, channel = %self.channel, "Delivering to agent session");

        let mut command = Command::new(&self.command);
        command
            .args([
                "agent",
                "--session-id",
                &self.session_id,
                "--deliver",
                "--channel",
                &self.channel,
                "--message",
                message,
            ])
            .kill_on_drop(true);

        let deadline = std::time::Duration::from_secs(DELIVERY_TIMEOUT_SECS);
        let output = tokio::time::timeout(deadline, command.output())
            .await
            .map_err(|_| DeliveryError::Timeout(DELIVERY_TIMEOUT_SECS))?
            .map_err(|e| DeliveryError::Spawn(e.to_string()))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DeliveryError::CommandFailed { code, stderr });
        }
        Ok(())
    }
}
