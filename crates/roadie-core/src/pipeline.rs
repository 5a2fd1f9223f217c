//! The audio-to-reply pipeline, run to completion for one audio unit at a
//! time.
//!
//! Every stage broadcasts its lifecycle to all attached connections:
//! placeholder before the work, final message after the write. The user
//! message is persisted as soon as transcription lands, so a later
//! generation failure never loses what the user said.

use std::sync::Arc;
use std::time::Duration;

use roadie_types::{Message, Role, ServerEvent};
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{PipelineStage, Result, RoadieError};
use crate::hub;
use crate::inference::{ResponseGenerator, Transcriber};
use crate::registry::SessionRegistry;
use crate::store::InteractionStore;

/// Upper bounds on the two model calls. A stage that overruns fails with
/// a timeout error instead of wedging the actor.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDeadlines {
    pub transcription: Duration,
    pub generation: Duration,
}

impl Default for PipelineDeadlines {
    fn default() -> Self {
        Self {
            transcription: Duration::from_secs(30),
            generation: Duration::from_secs(60),
        }
    }
}

pub struct AudioPipeline {
    store: Arc<InteractionStore>,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ResponseGenerator>,
    deadlines: PipelineDeadlines,
}

impl AudioPipeline {
    pub fn new(
        store: Arc<InteractionStore>,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ResponseGenerator>,
        deadlines: PipelineDeadlines,
    ) -> Self {
        Self {
            store,
            transcriber,
            generator,
            deadlines,
        }
    }

    /// Transcribes one audio unit, persists the user message, generates the
    /// assistant reply against the full history, and persists that too.
    /// Returns the assistant message; the caller decides what an error
    /// means for the originating connection.
    pub async fn process(
        &self,
        registry: &SessionRegistry,
        interaction_id: &str,
        audio: &[u8],
    ) -> Result<Message> {
        let user_message_id = Uuid::new_v4().to_string();
        hub::broadcast(
            registry,
            &ServerEvent::processing(Role::User, &user_message_id, interaction_id),
        )?;

        let transcript = timeout(self.deadlines.transcription, self.transcriber.transcribe(audio))
            .await
            .map_err(|_| {
                RoadieError::timeout(PipelineStage::Transcription, self.deadlines.transcription)
            })??;
        tracing::debug!(interaction_id, chars = transcript.len(), "audio transcribed");

        let user_message = self
            .store
            .append_message(interaction_id, Role::User, &transcript, &user_message_id)
            .await?;
        hub::broadcast(registry, &ServerEvent::message(&user_message))?;

        let assistant_message_id = Uuid::new_v4().to_string();
        hub::broadcast(
            registry,
            &ServerEvent::processing(Role::Assistant, &assistant_message_id, interaction_id),
        )?;

        // Reload so the reply is generated against the history including
        // the message persisted just above.
        let interaction = self
            .store
            .get_interaction(interaction_id)
            .await?
            .ok_or_else(|| {
                RoadieError::database(format!("interaction '{interaction_id}' not found"))
            })?;

        let reply = timeout(self.deadlines.generation, self.generator.respond(&interaction))
            .await
            .map_err(|_| {
                RoadieError::timeout(PipelineStage::Generation, self.deadlines.generation)
            })??;

        let assistant_message = self
            .store
            .append_message(interaction_id, Role::Assistant, &reply, &assistant_message_id)
            .await?;
        hub::broadcast(registry, &ServerEvent::message(&assistant_message))?;

        Ok(assistant_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::inference::{MockResponseGenerator, MockTranscriber};
    use crate::registry::{ConnectionHandle, ConnectionId};

    async fn store_with_interaction() -> (tempfile::TempDir, Arc<InteractionStore>, String) {
        let dir = tempfile::tempdir().unwrap();
        let store = InteractionStore::open(&dir.path().join("store.db"))
            .await
            .unwrap();
        store.ensure_schema().await.unwrap();
        let id = store.create_interaction().await.unwrap();
        (dir, Arc::new(store), id)
    }

    fn attached_registry() -> (SessionRegistry, mpsc::Receiver<String>) {
        let mut registry = SessionRegistry::new();
        let (tx, rx) = mpsc::channel(16);
        registry.register(
            ConnectionHandle::new(ConnectionId::new(), tx),
            "unused".to_string(),
        );
        (registry, rx)
    }

    fn pipeline(
        store: Arc<InteractionStore>,
        transcriber: MockTranscriber,
        generator: MockResponseGenerator,
        deadlines: PipelineDeadlines,
    ) -> AudioPipeline {
        AudioPipeline::new(store, Arc::new(transcriber), Arc::new(generator), deadlines)
    }

    #[tokio::test]
    async fn happy_path_persists_both_messages_and_broadcasts_four_events() {
        // Arrange
        let (_dir, store, interaction_id) = store_with_interaction().await;
        let (registry, mut rx) = attached_registry();

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .once()
            .returning(|_| Box::pin(async move { Ok("book a rehearsal".to_string()) }));

        // The generator echoes the last message so the test proves the
        // history it saw already contained the freshly persisted transcript.
        let mut generator = MockResponseGenerator::new();
        generator.expect_respond().once().returning(|interaction| {
            let last = interaction.messages.last().unwrap().content.clone();
            Box::pin(async move { Ok(format!("heard: {last}")) })
        });

        let pipeline = pipeline(
            store.clone(),
            transcriber,
            generator,
            PipelineDeadlines::default(),
        );

        // Act
        let assistant = pipeline
            .process(&registry, &interaction_id, b"audio-bytes")
            .await
            .unwrap();

        // Assert
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.content, "heard: book a rehearsal");

        let stored = store
            .get_interaction(&interaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[0].role, Role::User);
        assert_eq!(stored.messages[0].content, "book a rehearsal");
        assert_eq!(stored.messages[1], assistant);

        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str::<serde_json::Value>(&frame).unwrap());
        }
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0]["status"], "processing");
        assert_eq!(frames[0]["role"], "user");
        assert_eq!(frames[1]["content"], "book a rehearsal");
        assert_eq!(frames[2]["status"], "processing");
        assert_eq!(frames[2]["role"], "assistant");
        assert_eq!(frames[3]["content"], "heard: book a rehearsal");
        assert_eq!(frames[0]["messageId"], frames[1]["messageId"]);
        assert_eq!(frames[2]["messageId"], frames[3]["messageId"]);
        assert_ne!(frames[0]["messageId"], frames[2]["messageId"]);
    }

    #[tokio::test]
    async fn transcription_failure_persists_nothing() {
        // Arrange
        let (_dir, store, interaction_id) = store_with_interaction().await;
        let (registry, _rx) = attached_registry();

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().once().returning(|_| {
            Box::pin(async move { Err(RoadieError::transcription("model rejected the audio")) })
        });
        let mut generator = MockResponseGenerator::new();
        generator.expect_respond().never();

        let pipeline = pipeline(
            store.clone(),
            transcriber,
            generator,
            PipelineDeadlines::default(),
        );

        // Act
        let err = pipeline
            .process(&registry, &interaction_id, b"audio")
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, RoadieError::Transcription(_)));
        let stored = store
            .get_interaction(&interaction_id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.messages.is_empty());
    }

    #[tokio::test]
    async fn slow_transcription_times_out() {
        // Arrange
        let (_dir, store, interaction_id) = store_with_interaction().await;
        let (registry, _rx) = attached_registry();

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().once().returning(|_| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok("too late".to_string())
            })
        });
        let mut generator = MockResponseGenerator::new();
        generator.expect_respond().never();

        let deadlines = PipelineDeadlines {
            transcription: Duration::from_millis(5),
            generation: Duration::from_secs(60),
        };
        let pipeline = pipeline(store.clone(), transcriber, generator, deadlines);

        // Act
        let err = pipeline
            .process(&registry, &interaction_id, b"audio")
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(
            err,
            RoadieError::Timeout {
                stage: PipelineStage::Transcription,
                ..
            }
        ));
        let stored = store
            .get_interaction(&interaction_id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.messages.is_empty());
    }

    #[tokio::test]
    async fn slow_generation_times_out_but_keeps_the_user_message() {
        // Arrange
        let (_dir, store, interaction_id) = store_with_interaction().await;
        let (registry, _rx) = attached_registry();

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .once()
            .returning(|_| Box::pin(async move { Ok("hello".to_string()) }));
        let mut generator = MockResponseGenerator::new();
        generator.expect_respond().once().returning(|_| {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok("too late".to_string())
            })
        });

        let deadlines = PipelineDeadlines {
            transcription: Duration::from_secs(30),
            generation: Duration::from_millis(5),
        };
        let pipeline = pipeline(store.clone(), transcriber, generator, deadlines);

        // Act
        let err = pipeline
            .process(&registry, &interaction_id, b"audio")
            .await
            .unwrap_err();

        // Assert: the transcript survived the failed reply.
        assert!(matches!(
            err,
            RoadieError::Timeout {
                stage: PipelineStage::Generation,
                ..
            }
        ));
        let stored = store
            .get_interaction(&interaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn unknown_interaction_fails_with_database_kind() {
        // Arrange
        let (_dir, store, _id) = store_with_interaction().await;
        let (registry, _rx) = attached_registry();

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .once()
            .returning(|_| Box::pin(async move { Ok("hello".to_string()) }));
        let mut generator = MockResponseGenerator::new();
        generator.expect_respond().never();

        let pipeline = pipeline(
            store,
            transcriber,
            generator,
            PipelineDeadlines::default(),
        );

        // Act: the foreign key constraint rejects the write.
        let err = pipeline
            .process(&registry, "no-such-interaction", b"audio")
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, RoadieError::Database(_)));
    }
}
