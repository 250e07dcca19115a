use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// 세션 하나의 대화 기록
#[derive(Debug, Clone)]
pub struct Conversation {
    pub messages: Vec<ChatMessage>,
    pub last_activity: DateTime<Utc>,
}

impl Conversation {
    pub fn new(now: DateTime<Utc>) -> Self {
        Conversation {
            messages: Vec::new(),
            last_activity: now,
        }
    }

    /// 메시지를 추가하고 한도를 넘는 오래된 메시지부터 버린다.
    pub fn push(&mut self, message: ChatMessage, limit: usize, now: DateTime<Utc>) {
        self.messages.push(message);
        if self.messages.len() > limit {
            let overflow = self.messages.len() - limit;
            self.messages.drain(..overflow);
        }
        self.last_activity = now;
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatResponse {
    pub response: String,
}
