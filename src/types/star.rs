use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::account::AccountId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Document,
    Answer,
    Question,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Document => "document",
            ItemType::Answer => "answer",
            ItemType::Question => "question",
        }
    }

    /// 별표 대상이 저장된 테이블
    pub fn table(&self) -> &'static str {
        match self {
            ItemType::Document => "documents",
            ItemType::Answer => "answers",
            ItemType::Question => "questions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemType::Document => "Document",
            ItemType::Answer => "Answer",
            ItemType::Question => "Question",
        }
    }
}

impl FromStr for ItemType {
    type Err = handle_errors::Error;

    fn from_str(item_type: &str) -> Result<Self, Self::Err> {
        match item_type.to_ascii_lowercase().as_str() {
            "document" => Ok(ItemType::Document),
            "answer" => Ok(ItemType::Answer),
            "question" => Ok(ItemType::Question),
            _ => Err(handle_errors::Error::InvalidItemType(item_type.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Star {
    pub account_id: AccountId,
    pub item_type: ItemType,
    pub item_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarStatus {
    pub starred: bool,
    pub star_count: i64,
}
