use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::account::AccountId;
use crate::types::question::QuestionId;
use crate::types::vote::VoteType;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash, Copy, PartialOrd, Ord)]
pub struct AnswerId(pub i32);

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Answer {
    pub id: AnswerId,
    pub content: String,
    pub question_id: QuestionId,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub upvotes: i32,
    pub downvotes: i32,
    pub is_accepted: bool,
}

impl Answer {
    pub fn score(&self) -> i32 {
        self.upvotes - self.downvotes
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NewAnswer {
    pub content: String,
    pub question_id: QuestionId,
}

/// 상세 화면에 내려줄 답변: 점수와 요청한 사용자의 투표 상태를 함께 담는다.
#[derive(Serialize, Debug, Clone)]
pub struct RankedAnswer {
    #[serde(flatten)]
    pub answer: Answer,
    pub score: i32,
    pub user_vote: Option<VoteType>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptanceStatus {
    pub is_accepted: bool,
}
