//! Message router: decides, per inbound message, between continuing an
//! active contact flow, starting a new one, or answering from the CV
//! knowledge base.

use tracing::{error, info};

use crate::chat::intent::detect_contact_intent;
use crate::contact::service::{get_active_request, initialize_contact_flow, process_contact_flow};
use crate::errors::AppError;
use crate::knowledge::store::{VectorStore, DEFAULT_TOP_K};
use crate::llm_client::prompts::build_system_prompt;
use crate::llm_client::CompletionProvider;
use crate::state::AppState;

const MSG_CONTACT_INVITATION: &str =
    "¡Claro! Me encantaría ponerte en contacto con Enrique. Para empezar, ¿cuál es tu nombre?";
const MSG_RAG_FALLBACK: &str =
    "Lo siento, tuve un problema interno al buscar esa información. ¿Podrías intentar de nuevo?";

/// Processes one inbound message for a session.
///
/// An active contact flow overrides everything else: a question asked
/// mid-flow is treated as flow input, not as a CV question. Persistence
/// errors propagate; provider and store errors never leave this module.
pub async fn process_message(
    state: &AppState,
    question: &str,
    session_id: &str,
) -> Result<String, AppError> {
    info!("Processing message for session: {session_id}");

    if let Some(active) = get_active_request(&state.db, session_id).await? {
        return process_contact_flow(&state.db, state.notifier.as_ref(), active, question).await;
    }

    if detect_contact_intent(question) {
        initialize_contact_flow(&state.db, session_id).await?;
        return Ok(MSG_CONTACT_INVITATION.to_string());
    }

    Ok(knowledge_answer(state.llm.as_ref(), &state.knowledge, question).await)
}

/// RAG leg of the router. Every failure — embedding, search, generation,
/// timeout — is logged and replaced by the fixed fallback answer.
async fn knowledge_answer(
    provider: &dyn CompletionProvider,
    store: &VectorStore,
    question: &str,
) -> String {
    match try_knowledge_answer(provider, store, question).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("RAG flow error: {e}");
            MSG_RAG_FALLBACK.to_string()
        }
    }
}

async fn try_knowledge_answer(
    provider: &dyn CompletionProvider,
    store: &VectorStore,
    question: &str,
) -> Result<String, AppError> {
    // Skip the embedding call outright when there is nothing to search.
    let context = if store.is_empty().await {
        String::new()
    } else {
        let query_embedding = provider
            .embed(question)
            .await
            .map_err(|e| AppError::Llm(e.to_string()))?;
        store.search(&query_embedding, DEFAULT_TOP_K).await?
    };

    let system_prompt = build_system_prompt(&context);
    provider
        .complete(&system_prompt, question)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f64>, LlmError> {
            Ok(vec![1.0, 0.0])
        }
        async fn complete(&self, _system: &str, _question: &str) -> Result<String, LlmError> {
            Err(LlmError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }
    }

    /// Echoes the system prompt so tests can observe the retrieved context,
    /// and counts embed calls.
    struct EchoProvider {
        embed_calls: AtomicUsize,
    }

    impl EchoProvider {
        fn new() -> Self {
            Self {
                embed_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f64>, LlmError> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }
        async fn complete(&self, system: &str, _question: &str) -> Result<String, LlmError> {
            Ok(system.to_string())
        }
    }

    async fn seeded_store(dir: &tempfile::TempDir) -> VectorStore {
        let store = VectorStore::new(dir.path().join("cv-embeddings.json"));
        let corpus = serde_json::to_vec(&serde_json::json!([
            {"text": "experiencia en Rust", "embedding": [1.0, 0.0]},
            {"text": "estudios", "embedding": [0.0, 1.0]},
        ]))
        .unwrap();
        store.replace(&corpus).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_fallback_string() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;

        let answer = knowledge_answer(&FailingProvider, &store, "¿Qué lenguajes sabes?").await;
        assert_eq!(answer, MSG_RAG_FALLBACK);
    }

    #[tokio::test]
    async fn test_retrieved_context_reaches_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store(&dir).await;
        let provider = EchoProvider::new();

        let answer = knowledge_answer(&provider, &store, "¿Qué lenguajes sabes?").await;
        assert!(answer.contains("experiencia en Rust"));
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_store_skips_embedding_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::new(dir.path().join("cv-embeddings.json"));
        let provider = EchoProvider::new();

        let answer = knowledge_answer(&provider, &store, "hola").await;
        assert_eq!(provider.embed_calls.load(Ordering::SeqCst), 0);
        // The persona prompt still goes out, just with no CV context.
        assert!(answer.contains("Información del CV:"));
    }
}
