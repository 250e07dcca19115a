use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::account::AccountId;
use crate::types::answer::RankedAnswer;

pub const DEFAULT_QUESTION_STATUS: &str = "Open";

#[derive(Serialize, Debug, Deserialize, Clone)]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub views: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_status() -> String {
    DEFAULT_QUESTION_STATUS.to_string()
}

#[derive(Serialize, Debug, Clone, Copy, Eq, Hash, Deserialize, PartialEq, PartialOrd, Ord)]
pub struct QuestionId(pub i32);

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
}

/// 질문 상세 화면: 질문과 정렬된 답변 목록
#[derive(Serialize, Debug, Clone)]
pub struct QuestionDetail {
    pub question: Question,
    pub answers: Vec<RankedAnswer>,
}

/// 최근 질문 하나와, 있다면 대표 답변 하나
#[derive(Debug, Clone)]
pub struct QaThread {
    pub question: Question,
    pub answer: Option<ThreadAnswer>,
}

#[derive(Debug, Clone)]
pub struct ThreadAnswer {
    pub content: String,
    pub is_accepted: bool,
    pub author_name: String,
}
