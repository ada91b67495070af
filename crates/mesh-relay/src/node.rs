//! Relay node: a single-writer actor around [`RelayEngine`].
//!
//! All link-layer events and local sends are queued to one tokio task, which
//! applies them to the engine one at a time. Outbound transmissions run as
//! separate tasks so a slow or dead link never stalls the worker.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::engine::{
    Dispatch, Forwarding, RelayEngine, RelayOutcome, RelayStats, ReceivedMessage, SendOutcome,
    SendPlan, SendTarget,
};
use crate::error::RelayError;
use crate::link::LinkLayer;
use crate::protocol::{LinkId, OriginId};

/// Events and requests processed by the node's worker.
#[derive(Debug)]
enum NodeCommand {
    LinkUp(LinkId),
    LinkDown(LinkId),
    Payload {
        link: LinkId,
        payload: Vec<u8>,
    },
    Send {
        content: Vec<u8>,
        display_name: String,
        target: SendTarget,
        reply: oneshot::Sender<Result<SendOutcome, RelayError>>,
    },
    Stats {
        reply: oneshot::Sender<RelayStats>,
    },
    TransmitFailed {
        link: LinkId,
    },
    Shutdown,
}

/// Receiving end for messages delivered by a node.
pub type MessageInbox = mpsc::UnboundedReceiver<ReceivedMessage>;

/// Cloneable handle for feeding a running relay node.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    origin: OriginId,
    commands: mpsc::Sender<NodeCommand>,
}

impl RelayHandle {
    /// Returns the node's origin id.
    #[must_use]
    pub const fn origin_id(&self) -> &OriginId {
        &self.origin
    }

    /// Reports that a link came up.
    ///
    /// # Errors
    ///
    /// Returns an error if the node has stopped.
    pub async fn link_up(&self, link: impl Into<LinkId>) -> Result<(), RelayError> {
        self.submit(NodeCommand::LinkUp(link.into())).await
    }

    /// Reports that a link went down.
    ///
    /// # Errors
    ///
    /// Returns an error if the node has stopped.
    pub async fn link_down(&self, link: impl Into<LinkId>) -> Result<(), RelayError> {
        self.submit(NodeCommand::LinkDown(link.into())).await
    }

    /// Reports a payload received on `link`.
    ///
    /// # Errors
    ///
    /// Returns an error if the node has stopped.
    pub async fn payload_received(
        &self,
        link: impl Into<LinkId>,
        payload: Vec<u8>,
    ) -> Result<(), RelayError> {
        self.submit(NodeCommand::Payload {
            link: link.into(),
            payload,
        })
        .await
    }

    /// Originates a message, to one link or to every connected link.
    ///
    /// A broadcast resolves as soon as the payload is handed to the link
    /// layer. A targeted send resolves once that link's transmit completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the display name contains the field delimiter or
    /// the node has stopped.
    pub async fn send(
        &self,
        content: impl Into<Vec<u8>>,
        display_name: impl Into<String>,
        target: Option<LinkId>,
    ) -> Result<SendOutcome, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.submit(NodeCommand::Send {
            content: content.into(),
            display_name: display_name.into(),
            target: target.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RelayError::NodeStopped)?
    }

    /// Broadcasts a message to every connected link.
    ///
    /// # Errors
    ///
    /// See [`RelayHandle::send`].
    pub async fn broadcast(
        &self,
        content: impl Into<Vec<u8>>,
        display_name: impl Into<String>,
    ) -> Result<SendOutcome, RelayError> {
        self.send(content, display_name, None).await
    }

    /// Returns a snapshot of the node's counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the node has stopped.
    pub async fn stats(&self) -> Result<RelayStats, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.submit(NodeCommand::Stats { reply }).await?;
        rx.await.map_err(|_| RelayError::NodeStopped)
    }

    /// Stops the node's worker after it drains queued events.
    ///
    /// # Errors
    ///
    /// Returns an error if the node has already stopped.
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        self.submit(NodeCommand::Shutdown).await
    }

    async fn submit(&self, command: NodeCommand) -> Result<(), RelayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RelayError::NodeStopped)
    }
}

/// A spawned relay node.
#[derive(Debug)]
pub struct RelayNode {
    /// Handle for feeding events and sends.
    pub handle: RelayHandle,
    /// Messages surfaced to the application.
    pub inbox: MessageInbox,
    /// The worker task.
    pub task: JoinHandle<()>,
}

impl RelayNode {
    /// Spawns a relay node on the current tokio runtime.
    ///
    /// The origin id is taken from the link layer once, at startup, and used
    /// for every message this node originates.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn spawn(config: RelayConfig, link_layer: Arc<dyn LinkLayer>) -> Result<Self, RelayError> {
        config.validate()?;

        let origin = link_layer.local_identity();
        let (commands, rx) = mpsc::channel(config.event_buffer);
        let (deliveries, inbox) = mpsc::unbounded_channel();

        let worker = Worker {
            engine: RelayEngine::new(origin.clone(), config),
            link_layer,
            deliveries,
            feedback: commands.downgrade(),
        };
        info!(origin = %origin, "relay node starting");
        let task = tokio::spawn(worker.run(rx));

        Ok(Self {
            handle: RelayHandle { origin, commands },
            inbox,
            task,
        })
    }
}

struct Worker {
    engine: RelayEngine,
    link_layer: Arc<dyn LinkLayer>,
    deliveries: mpsc::UnboundedSender<ReceivedMessage>,
    /// Lets transmit tasks report failures without keeping the queue open.
    feedback: mpsc::WeakSender<NodeCommand>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::Receiver<NodeCommand>) {
        let mut cleanup = tokio::time::interval(self.engine.config().cleanup_interval());
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(NodeCommand::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                _ = cleanup.tick() => {
                    let evicted = self.engine.evict_expired(clock_now());
                    if evicted > 0 {
                        debug!(evicted, remaining = self.engine.cache().len(), "evicted expired fingerprints");
                    }
                }
            }
        }

        info!(origin = %self.engine.local_origin(), "relay node stopped");
    }

    fn apply(&mut self, command: NodeCommand) {
        match command {
            NodeCommand::LinkUp(link) => {
                self.engine.link_up(link);
            }
            NodeCommand::LinkDown(link) => {
                self.engine.link_down(&link);
            }
            NodeCommand::Payload { link, payload } => {
                let outcome = self.engine.handle_payload(&payload, &link, clock_now());
                if let RelayOutcome::Delivered { message, forwarding } = outcome {
                    if self.deliveries.send(message).is_err() {
                        debug!("message inbox closed, delivery discarded");
                    }
                    if let Forwarding::To(dispatch) = forwarding {
                        self.fan_out(dispatch);
                    }
                }
            }
            NodeCommand::Send {
                content,
                display_name,
                target,
                reply,
            } => {
                let targeted = matches!(target, SendTarget::Link(_));
                match self
                    .engine
                    .prepare_send(content, &display_name, target, clock_now())
                {
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                    Ok(SendPlan::Finished(outcome)) => {
                        let _ = reply.send(Ok(outcome));
                    }
                    Ok(SendPlan::Transmit(dispatch)) if targeted => {
                        self.transmit_with_reply(dispatch, reply);
                    }
                    Ok(SendPlan::Transmit(dispatch)) => {
                        self.fan_out(dispatch);
                        let _ = reply.send(Ok(SendOutcome::Dispatched));
                    }
                }
            }
            NodeCommand::Stats { reply } => {
                let _ = reply.send(self.engine.stats());
            }
            NodeCommand::TransmitFailed { link } => {
                debug!(link = %link, "transmit failure recorded");
                self.engine.record_transmit_failure();
            }
            NodeCommand::Shutdown => {}
        }
    }

    /// Spawns one fire-and-forget transmit per target.
    fn fan_out(&self, dispatch: Dispatch) {
        for link in dispatch.targets {
            let link_layer = Arc::clone(&self.link_layer);
            let payload = Arc::clone(&dispatch.payload);
            let feedback = self.feedback.clone();
            tokio::spawn(async move {
                if let Err(e) = link_layer.transmit(link.clone(), payload).await {
                    warn!(link = %link, error = %e, "transmit failed");
                    report_failure(&feedback, link).await;
                }
            });
        }
    }

    /// Spawns a single transmit whose result answers a targeted send.
    fn transmit_with_reply(
        &self,
        dispatch: Dispatch,
        reply: oneshot::Sender<Result<SendOutcome, RelayError>>,
    ) {
        let Some(link) = dispatch.targets.into_iter().next() else {
            let _ = reply.send(Ok(SendOutcome::NoPeers));
            return;
        };
        let link_layer = Arc::clone(&self.link_layer);
        let feedback = self.feedback.clone();
        tokio::spawn(async move {
            let outcome = match link_layer.transmit(link.clone(), dispatch.payload).await {
                Ok(()) => SendOutcome::Dispatched,
                Err(e) => {
                    warn!(link = %link, error = %e, "targeted send failed");
                    report_failure(&feedback, link).await;
                    SendOutcome::TransmitFailed
                }
            };
            let _ = reply.send(Ok(outcome));
        });
    }
}

/// Current time on the tokio clock, so paused test time drives expiry.
fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn report_failure(feedback: &mpsc::WeakSender<NodeCommand>, link: LinkId) {
    if let Some(sender) = feedback.upgrade() {
        let _ = sender.send(NodeCommand::TransmitFailed { link }).await;
    }
}
