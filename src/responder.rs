//! NATS replies for answered valuation requests

use crate::service::ValuationResponse;
use anyhow::Result;
use async_nats::{Client, Message};
use tracing::{debug, warn};

/// Publishes a response to the reply subject of a request
#[derive(Clone)]
pub struct Responder {
    client: Client,
}

impl Responder {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Reply to `request`; fire-and-forget publishes are acknowledged by log only.
    pub async fn reply(&self, request: &Message, response: &ValuationResponse) -> Result<()> {
        let Some(reply_subject) = request.reply.clone() else {
            warn!(subject = %request.subject, "Request has no reply subject, dropping response");
            return Ok(());
        };

        let payload = serde_json::to_vec(response)?;
        self.client.publish(reply_subject.clone(), payload.into()).await?;

        debug!(reply_subject = %reply_subject, "Published valuation response");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
