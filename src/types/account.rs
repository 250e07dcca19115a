use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 로그인 토큰에서 꺼낸 세션 정보
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Session {
    pub exp: DateTime<Utc>,
    pub account_id: AccountId,
    pub nbf: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Account {
    pub id: Option<AccountId>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    /// 이름이 없으면 이메일의 @ 앞부분을 표시 이름으로 쓴다.
    pub fn display_name(&self) -> String {
        display_name(self.name.as_deref(), &self.email)
    }
}

pub fn display_name(name: Option<&str>, email: &str) -> String {
    match name {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => email.split('@').next().unwrap_or(email).to_string(),
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub i32);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Professor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Professor => "Professor",
            Role::Admin => "Admin",
        }
    }

    /// 문서 검증은 교수와 관리자만 할 수 있다.
    pub fn can_verify_documents(&self) -> bool {
        matches!(self, Role::Professor | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = handle_errors::Error;

    fn from_str(role: &str) -> Result<Self, Self::Err> {
        match role.to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "professor" => Ok(Role::Professor),
            "admin" => Ok(Role::Admin),
            _ => Err(handle_errors::Error::InvalidRole(role.to_string())),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Login {
    pub email: String,
    pub password: String,
}
