use serde::{Deserialize, Serialize};

use crate::types::account::Account;
use crate::types::document::Document;
use crate::types::question::Question;

/// 프로필 화면에 보여주는 최근 문서와 질문 수
pub const RECENT_ITEMS: usize = 10;

#[derive(Serialize, Debug, Clone)]
pub struct Profile {
    pub account: Account,
    pub documents: Vec<Document>,
    pub questions: Vec<Question>,
    pub stats: ProfileStats,
}

/// 계정이 작성한 전체 문서, 질문, 답변 수
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileStats {
    pub documents: i64,
    pub questions: i64,
    pub answers: i64,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// 앞뒤 공백을 지우고 빈 값은 `None`으로 바꾼다.
    pub fn normalized(self) -> ProfileUpdate {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        ProfileUpdate {
            name: clean(self.name),
            bio: clean(self.bio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_cleared() {
        let update = ProfileUpdate {
            name: Some("  Jane Doe ".to_string()),
            bio: Some("   ".to_string()),
        }
        .normalized();
        assert_eq!(update.name.as_deref(), Some("Jane Doe"));
        assert_eq!(update.bio, None);
    }
}
