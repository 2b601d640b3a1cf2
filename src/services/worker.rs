use crate::services::processor::RenditionProcessor;
use anyhow::Result;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Long-polls the notification queue and feeds message bodies to the
/// processor. A message is deleted once its dispatch returns; a payload
/// that cannot be parsed stays on the queue for the redelivery policy.
pub struct QueueWorker {
    client: Client,
    queue_url: String,
    processor: Arc<RenditionProcessor>,
    shutdown: watch::Receiver<bool>,
}

impl QueueWorker {
    pub fn new(
        client: Client,
        queue_url: String,
        processor: Arc<RenditionProcessor>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            queue_url,
            processor,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!("🚀 Queue worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("🛑 Queue worker shutting down");
                        break;
                    }
                }
                received = receive_batch(&self.client, &self.queue_url) => match received {
                    Ok(messages) => {
                        for message in messages {
                            self.handle_message(message).await;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "failed to poll queue");
                        sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    async fn handle_message(&self, message: Message) {
        let Some(body) = message.body() else {
            debug!("message without body, skipping");
            return;
        };

        match self.processor.dispatch(body).await {
            Ok(()) => self.delete_message(&message).await,
            Err(e) => {
                // Redelivery is the queue's business, not ours.
                error!(error = %e, "failed to dispatch notification");
            }
        }
    }

    async fn delete_message(&self, message: &Message) {
        let Some(handle) = message.receipt_handle() else {
            return;
        };
        if let Err(e) = self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(handle)
            .send()
            .await
        {
            error!(error = %e, "failed to delete message from queue");
        }
    }
}

async fn receive_batch(client: &Client, queue_url: &str) -> Result<Vec<Message>> {
    let output = client
        .receive_message()
        .queue_url(queue_url)
        .max_number_of_messages(10)
        .wait_time_seconds(20)
        .send()
        .await?;
    Ok(output.messages.unwrap_or_default())
}
