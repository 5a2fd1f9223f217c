//! The per-user coordinator actor.
//!
//! One actor owns everything for one user identity: the interaction store,
//! the attached connections, and the audio pipeline. Commands arrive on a
//! single mailbox and are processed strictly in order, so two audio units
//! can never interleave and every connection observes the same event
//! sequence.

use std::sync::Arc;

use bytes::Bytes;
use roadie_types::{InteractionSummary, ServerEvent};
use tokio::sync::{mpsc, oneshot};

use crate::error::{Result, RoadieError};
use crate::hub;
use crate::inference::{ResponseGenerator, Transcriber};
use crate::pipeline::{AudioPipeline, PipelineDeadlines};
use crate::registry::{ConnectionHandle, ConnectionId, SessionRegistry};
use crate::store::InteractionStore;

const MAILBOX_CAPACITY: usize = 64;

enum Command {
    Attach {
        conn: ConnectionHandle,
        interaction_id: String,
        reply: oneshot::Sender<Result<String>>,
    },
    Detach {
        conn_id: ConnectionId,
    },
    Audio {
        conn_id: ConnectionId,
        audio: Bytes,
    },
    CreateInteraction {
        reply: oneshot::Sender<Result<String>>,
    },
    ListInteractions {
        reply: oneshot::Sender<Result<Vec<InteractionSummary>>>,
    },
}

/// Cloneable mailbox handle. Every connection task for the same user talks
/// to the same actor through one of these.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
}

impl CoordinatorHandle {
    /// Binds a connection to an interaction and returns the session key.
    /// The interaction's current snapshot is pushed to the connection when
    /// it exists.
    pub async fn attach(&self, conn: ConnectionHandle, interaction_id: String) -> Result<String> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Attach {
            conn,
            interaction_id,
            reply,
        })
        .await?;
        rx.await.map_err(|_| mailbox_closed())?
    }

    pub async fn detach(&self, conn_id: ConnectionId) -> Result<()> {
        self.send(Command::Detach { conn_id }).await
    }

    /// Queues one audio unit. The reply arrives as events on the attached
    /// connections, not as a return value.
    pub async fn submit_audio(&self, conn_id: ConnectionId, audio: Bytes) -> Result<()> {
        self.send(Command::Audio { conn_id, audio }).await
    }

    pub async fn create_interaction(&self) -> Result<String> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::CreateInteraction { reply }).await?;
        rx.await.map_err(|_| mailbox_closed())?
    }

    pub async fn list_interactions(&self) -> Result<Vec<InteractionSummary>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ListInteractions { reply }).await?;
        rx.await.map_err(|_| mailbox_closed())?
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| mailbox_closed())
    }
}

fn mailbox_closed() -> RoadieError {
    RoadieError::internal("coordinator mailbox is closed")
}

pub struct Coordinator {
    identity: String,
    store: Arc<InteractionStore>,
    pipeline: AudioPipeline,
    registry: SessionRegistry,
    rx: mpsc::Receiver<Command>,
}

impl Coordinator {
    /// Prepares the store and starts the actor task. The handle is the only
    /// way in; the task ends when the last handle is dropped.
    pub async fn spawn(
        identity: String,
        store: InteractionStore,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ResponseGenerator>,
        deadlines: PipelineDeadlines,
    ) -> Result<CoordinatorHandle> {
        store.ensure_schema().await?;
        let store = Arc::new(store);
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let actor = Coordinator {
            identity,
            pipeline: AudioPipeline::new(store.clone(), transcriber, generator, deadlines),
            store,
            registry: SessionRegistry::new(),
            rx,
        };
        tokio::spawn(actor.run());
        Ok(CoordinatorHandle { tx })
    }

    async fn run(mut self) {
        tracing::info!(identity = %self.identity, "coordinator started");
        while let Some(command) = self.rx.recv().await {
            self.handle(command).await;
        }
        tracing::info!(identity = %self.identity, "coordinator stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Attach {
                conn,
                interaction_id,
                reply,
            } => {
                let _ = reply.send(self.attach(conn, interaction_id).await);
            }
            Command::Detach { conn_id } => {
                if self.registry.unregister(conn_id).is_some() {
                    tracing::debug!(
                        identity = %self.identity,
                        connection_id = %conn_id,
                        "connection detached"
                    );
                }
            }
            Command::Audio { conn_id, audio } => {
                self.process_audio(conn_id, &audio).await;
            }
            Command::CreateInteraction { reply } => {
                let _ = reply.send(self.store.create_interaction().await);
            }
            Command::ListInteractions { reply } => {
                let _ = reply.send(self.store.list_interactions().await);
            }
        }
    }

    async fn attach(&mut self, conn: ConnectionHandle, interaction_id: String) -> Result<String> {
        if interaction_id.trim().is_empty() {
            return Err(RoadieError::validation("interactionId must not be blank"));
        }
        let snapshot = self.store.get_interaction(&interaction_id).await?;
        let session_key = self.registry.register(conn.clone(), interaction_id.clone());
        tracing::info!(
            identity = %self.identity,
            connection_id = %conn.id(),
            interaction_id,
            attached = self.registry.len(),
            "connection attached"
        );
        if let Some(interaction) = snapshot {
            hub::notify(&conn, &ServerEvent::interaction_details(interaction))?;
        }
        Ok(session_key)
    }

    /// Runs the pipeline for one audio unit. On failure the originating
    /// connection gets an error event and is dropped from the registry,
    /// which closes its socket once the event has drained; everyone else
    /// stays attached and the actor keeps running.
    async fn process_audio(&mut self, conn_id: ConnectionId, audio: &[u8]) {
        let Some(session) = self.registry.lookup(conn_id) else {
            tracing::warn!(
                identity = %self.identity,
                connection_id = %conn_id,
                "dropping audio from unattached connection"
            );
            return;
        };
        let interaction_id = session.interaction_id().to_string();

        if let Err(e) = self
            .pipeline
            .process(&self.registry, &interaction_id, audio)
            .await
        {
            tracing::error!(
                identity = %self.identity,
                connection_id = %conn_id,
                interaction_id,
                code = e.code(),
                error = %e,
                "audio pipeline failed"
            );
            if let Some(session) = self.registry.unregister(conn_id) {
                let _ = hub::notify(session.conn(), &ServerEvent::error(e.to_string()));
            }
        }
    }
}
