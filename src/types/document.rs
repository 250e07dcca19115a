use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::account::AccountId;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub i32);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Pending,
    Verified,
    Unverified,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "Pending",
            DocumentStatus::Verified => "Verified",
            DocumentStatus::Unverified => "Unverified",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = handle_errors::Error;

    fn from_str(status: &str) -> Result<Self, Self::Err> {
        match status.to_ascii_lowercase().as_str() {
            "pending" => Ok(DocumentStatus::Pending),
            "verified" => Ok(DocumentStatus::Verified),
            "unverified" => Ok(DocumentStatus::Unverified),
            _ => Err(handle_errors::Error::InvalidStatus(status.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub file_path: Option<String>,
    pub status: DocumentStatus,
    pub account_id: AccountId,
    pub verified_by: Option<AccountId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub views: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub file_path: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StatusUpdate {
    pub status: String,
}
