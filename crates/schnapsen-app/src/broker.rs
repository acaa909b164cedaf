//! AMQP binding for the task and registration channels. Tasks are delivered
//! at least once: acceptance acks immediately so no other worker competes
//! for the match, a game/mode mismatch nacks with requeue so another
//! consumer can take the delivery, and screening stays side-effect free so
//! redelivery is always safe.

use anyhow::{Context, Result};
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use schnapsen_agent::decision::MovePredictor;
use schnapsen_agent::dispatcher::{AgentProfile, Connector, Dispatcher, Task};
use tracing::{error, info, warn};

const TARGET: &str = "schnapsen_app::broker";
const CONSUMER_TAG: &str = "schnapsen-agent";

pub struct Broker {
    channel: Channel,
}

impl Broker {
    pub async fn connect(amqp_url: &str) -> Result<Self> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default())
            .await
            .context("connecting to the broker")?;
        let channel = connection
            .create_channel()
            .await
            .context("opening the broker channel")?;
        Ok(Self { channel })
    }

    async fn declare(&self, queue: &str) -> Result<()> {
        self.channel
            .queue_declare(queue, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .with_context(|| format!("declaring queue {queue}"))?;
        Ok(())
    }

    /// Publishes one profile per identity×mode pair; fire-and-forget, no
    /// acknowledgement expected.
    pub async fn publish_profiles(&self, queue: &str, profiles: &[AgentProfile]) -> Result<()> {
        self.declare(queue).await?;
        for profile in profiles {
            let payload = serde_json::to_vec(profile).context("serializing a profile")?;
            self.channel
                .basic_publish(
                    "",
                    queue,
                    BasicPublishOptions::default(),
                    &payload,
                    BasicProperties::default(),
                )
                .await
                .context("publishing a profile")?
                .await
                .context("confirming a profile publish")?;
            info!(
                target: TARGET,
                display_name = %profile.display_name,
                mode = %profile.mode,
                elo = profile.elo,
                "registered"
            );
        }
        Ok(())
    }

    /// Consumes assignments until the broker connection dies. One failed
    /// session never stops the loop.
    pub async fn consume_tasks<C, P>(&self, queue: &str, dispatcher: &Dispatcher<C, P>) -> Result<()>
    where
        C: Connector,
        P: MovePredictor,
    {
        self.declare(queue).await?;
        let mut consumer = self
            .channel
            .basic_consume(
                queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .context("starting the task consumer")?;

        info!(target: TARGET, queue, "consuming tasks");
        while let Some(delivery) = consumer.next().await {
            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(err) => {
                    error!(target: TARGET, %err, "task delivery failed");
                    continue;
                }
            };

            let task: Task = match serde_json::from_slice(&delivery.data) {
                Ok(task) => task,
                Err(err) => {
                    warn!(target: TARGET, %err, "dropping an unparseable task");
                    // Poison message: requeueing would loop it forever.
                    delivery
                        .nack(BasicNackOptions {
                            requeue: false,
                            ..BasicNackOptions::default()
                        })
                        .await
                        .context("nacking an unparseable task")?;
                    continue;
                }
            };

            match dispatcher.screen(&task) {
                Ok(acceptance) => {
                    delivery
                        .ack(BasicAckOptions::default())
                        .await
                        .context("acking an accepted task")?;
                    if let Err(err) = dispatcher.launch(task, acceptance).await {
                        error!(target: TARGET, %err, "session launch failed");
                    }
                }
                Err(mismatch) => {
                    info!(target: TARGET, %mismatch, "task rejected");
                    delivery
                        .nack(BasicNackOptions {
                            requeue: true,
                            ..BasicNackOptions::default()
                        })
                        .await
                        .context("nacking a mismatched task")?;
                }
            }
        }
        Ok(())
    }
}
