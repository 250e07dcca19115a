use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::document::Document;
use crate::types::question::Question;

/// 피드와 검색 결과에 섞여 나오는 항목
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum FeedItem {
    Document(Document),
    Question {
        #[serde(flatten)]
        question: Question,
        answer_count: i64,
    },
}

impl FeedItem {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            FeedItem::Document(document) => Some(document.created_at),
            FeedItem::Question { question, .. } => question.created_at,
        }
    }
}

/// 작성 시각이 없는 항목은 맨 뒤로 보내고 최신 항목부터 정렬한다.
pub fn sort_newest_first(items: &mut [FeedItem]) {
    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}

/// 검색어가 제목, 설명, 태그 중 하나에 대소문자 구분 없이 들어 있는지 확인한다.
pub fn matches_term(term: &str, title: &str, description: Option<&str>, tags: Option<&[String]>) -> bool {
    let term = term.to_lowercase();
    title.to_lowercase().contains(&term)
        || description.is_some_and(|d| d.to_lowercase().contains(&term))
        || tags.is_some_and(|tags| tags.iter().any(|t| t.to_lowercase().contains(&term)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::question::QuestionId;
    use chrono::Duration;

    fn question(id: i32, created_at: Option<DateTime<Utc>>) -> FeedItem {
        FeedItem::Question {
            question: Question {
                id: QuestionId(id),
                title: format!("q{}", id),
                content: String::new(),
                tags: None,
                status: "Open".to_string(),
                account_id: None,
                views: 0,
                created_at,
            },
            answer_count: 0,
        }
    }

    #[test]
    fn newest_items_come_first_and_undated_last() {
        let now = Utc::now();
        let mut items = vec![
            question(1, Some(now - Duration::days(2))),
            question(2, None),
            question(3, Some(now)),
        ];
        sort_newest_first(&mut items);
        let ids: Vec<i32> = items
            .iter()
            .map(|item| match item {
                FeedItem::Question { question, .. } => question.id.0,
                FeedItem::Document(d) => d.id.0,
            })
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn term_matching_covers_title_description_and_tags() {
        let tags = vec!["Databases".to_string()];
        assert!(matches_term("flask", "Intro to Flask", None, None));
        assert!(matches_term("guide", "x", Some("A Guide"), None));
        assert!(matches_term("database", "x", None, Some(&tags)));
        assert!(!matches_term("rust", "x", Some("y"), Some(&tags)));
    }
}
