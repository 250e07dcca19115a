use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::account::AccountId;
use crate::types::answer::AnswerId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }
}

impl FromStr for VoteType {
    type Err = handle_errors::Error;

    fn from_str(vote_type: &str) -> Result<Self, Self::Err> {
        match vote_type {
            "up" => Ok(VoteType::Up),
            "down" => Ok(VoteType::Down),
            _ => Err(handle_errors::Error::InvalidVoteType(vote_type.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub account_id: AccountId,
    pub answer_id: AnswerId,
    pub vote_type: VoteType,
}

/// 투표 요청 본문. 문자열이 아니거나 빠진 값도 400으로 돌려주기 위해
/// 아무 JSON 값이나 받은 뒤 `vote_type()`에서 검사한다.
#[derive(Deserialize, Debug, Clone)]
pub struct VoteRequest {
    #[serde(default)]
    pub vote_type: serde_json::Value,
}

impl VoteRequest {
    pub fn vote_type(&self) -> Result<VoteType, handle_errors::Error> {
        match &self.vote_type {
            serde_json::Value::String(vote_type) => vote_type.parse(),
            other => Err(handle_errors::Error::InvalidVoteType(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTally {
    pub upvotes: i32,
    pub downvotes: i32,
    pub score: i32,
}

impl VoteTally {
    pub fn new(upvotes: i32, downvotes: i32) -> Self {
        VoteTally {
            upvotes,
            downvotes,
            score: upvotes - downvotes,
        }
    }
}
