use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{Level, event, instrument};

use handle_errors::Error;

use crate::completion::CompletionService;
use crate::context::{AssembledContext, ContextAssembler};
use crate::types::chat::{ChatMessage, ChatRole, Conversation};

pub const APOLOGY: &str = "I'm sorry, I couldn't generate a response right now. Please try again.";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_SESSION_TTL_SECS: i64 = 15 * 60;
/// 프롬프트에 넣는 직전 대화 수
pub const PROMPT_HISTORY_TURNS: usize = 5;

const PREAMBLE: &str = "You are an AI assistant for a university content-sharing platform. \
Answer using the platform content below when it is relevant and point to documents by their link. \
If the answer is not in the platform content you may use general knowledge, but say that it does not come from the platform. \
Format the answer in Markdown.";

/// 세션별 대화 기록 보관소
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// 메시지 하나를 덧붙이고 덧붙이기 전의 기록을 돌려준다.
    /// 읽기와 쓰기는 하나의 원자적 단위다. `cutoff` 전부터 쉬고 있던 세션은 비우고 시작한다.
    async fn append(
        &self,
        session_id: &str,
        message: ChatMessage,
        limit: usize,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> Vec<ChatMessage>;
    /// `cutoff`보다 오래 쉬고 있는 세션을 지우고 지운 개수를 돌려준다.
    async fn sweep(&self, cutoff: DateTime<Utc>) -> usize;
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Conversation>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        InMemorySessionStore::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append(
        &self,
        session_id: &str,
        message: ChatMessage,
        limit: usize,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> Vec<ChatMessage> {
        let mut sessions = self.sessions.write().await;
        let conversation = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Conversation::new(now));
        if conversation.last_activity < cutoff {
            *conversation = Conversation::new(now);
        }

        let earlier = conversation.messages.clone();
        conversation.push(message, limit, now);
        earlier
    }

    async fn sweep(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, conversation| conversation.last_activity >= cutoff);
        before - sessions.len()
    }
}

#[cfg(test)]
impl InMemorySessionStore {
    pub async fn get(&self, session_id: &str) -> Option<Conversation> {
        self.sessions.read().await.get(session_id).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub history_limit: usize,
    pub session_ttl: Duration,
    pub completion_timeout: std::time::Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        ChatSettings {
            history_limit: DEFAULT_HISTORY_LIMIT,
            session_ttl: Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            completion_timeout: std::time::Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
pub struct ChatOrchestrator {
    sessions: Arc<dyn SessionStore>,
    assembler: ContextAssembler,
    completion: Arc<dyn CompletionService>,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        assembler: ContextAssembler,
        completion: Arc<dyn CompletionService>,
        settings: ChatSettings,
    ) -> Self {
        ChatOrchestrator {
            sessions,
            assembler,
            completion,
            settings,
        }
    }

    pub async fn respond(&self, session_id: &str, message: &str) -> String {
        self.respond_at(session_id, message, Utc::now()).await
    }

    /// 항상 글을 돌려준다. 문맥 조립이나 모델 호출에서 난 에러는 대화 기록에 남는 답이 된다.
    #[instrument(skip(self, message))]
    pub async fn respond_at(&self, session_id: &str, message: &str, now: DateTime<Utc>) -> String {
        let cutoff = now - self.settings.session_ttl;
        let limit = self.settings.history_limit;

        // 기록은 메시지 단위로 덧붙인다. 모델 응답을 기다리는 동안에는 잠금을 쥐지 않는다.
        let history = self
            .sessions
            .append(
                session_id,
                ChatMessage {
                    role: ChatRole::User,
                    content: message.to_string(),
                },
                limit,
                now,
                cutoff,
            )
            .await;
        let earlier = recent_turns(&history, PROMPT_HISTORY_TURNS);

        let evicted = self.sessions.sweep(cutoff).await;
        if evicted > 0 {
            event!(Level::DEBUG, evicted, "swept idle chat sessions");
        }

        let reply = match self.generate(earlier, message, now).await {
            Ok(text) => text,
            Err(e) => {
                event!(Level::ERROR, "Chat completion failed: {}", e);
                format!("I encountered an error: {}", e)
            }
        };

        self.sessions
            .append(
                session_id,
                ChatMessage {
                    role: ChatRole::Assistant,
                    content: reply.clone(),
                },
                limit,
                now,
                cutoff,
            )
            .await;

        reply
    }

    async fn generate(
        &self,
        earlier: &[ChatMessage],
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<String, Error> {
        let context = self.assembler.gather(now).await;
        let prompt = build_prompt(earlier, &context, message, now);

        let timeout = self.settings.completion_timeout;
        match tokio::time::timeout(timeout, self.completion.complete(&prompt)).await {
            Err(_) => Err(Error::CompletionTimeout(timeout.as_secs())),
            Ok(Err(e)) => Err(e),
            Ok(Ok(Some(text))) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => Ok(APOLOGY.to_string()),
        }
    }
}

fn recent_turns(messages: &[ChatMessage], turns: usize) -> &[ChatMessage] {
    &messages[messages.len().saturating_sub(turns)..]
}

pub fn build_prompt(
    earlier: &[ChatMessage],
    context: &AssembledContext,
    message: &str,
    now: DateTime<Utc>,
) -> String {
    let links = if context.document_links.is_empty() {
        "No documents available.".to_string()
    } else {
        context
            .document_links
            .iter()
            .map(|l| format!("- {}: {}", l.title, l.link))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let history = if earlier.is_empty() {
        "This is the start of the conversation.".to_string()
    } else {
        earlier
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{}\n\nCurrent date: {}\n\n=== DOCUMENT LINKS ===\n{}\n\n=== CONVERSATION SO FAR ===\n{}\n\n=== PLATFORM CONTENT ===\n{}\n\n=== USER QUESTION ===\n{}",
        PREAMBLE,
        now.format("%Y-%m-%d"),
        links,
        history,
        context.text,
        message
    )
}
