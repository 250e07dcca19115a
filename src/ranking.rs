use std::cmp::Ordering;

use crate::types::answer::Answer;

/// 채택된 답변, 점수가 높은 답변, 먼저 작성된 답변 순으로 정렬한다.
/// 세 기준이 모두 같으면 원래 순서를 유지한다.
pub fn rank(mut answers: Vec<Answer>) -> Vec<Answer> {
    answers.sort_by(compare);
    answers
}

pub fn compare(a: &Answer, b: &Answer) -> Ordering {
    b.is_accepted
        .cmp(&a.is_accepted)
        .then_with(|| b.score().cmp(&a.score()))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::account::AccountId;
    use crate::types::answer::AnswerId;
    use crate::types::question::QuestionId;
    use chrono::{TimeZone, Utc};

    fn answer(id: i32, accepted: bool, score: i32, t: i64) -> Answer {
        Answer {
            id: AnswerId(id),
            content: format!("answer {}", id),
            question_id: QuestionId(1),
            account_id: AccountId(1),
            created_at: Utc.timestamp_opt(t, 0).unwrap(),
            upvotes: score.max(0),
            downvotes: (-score).max(0),
            is_accepted: accepted,
        }
    }

    #[test]
    fn accepted_answer_beats_higher_scores() {
        let ranked = rank(vec![
            answer(1, false, 2, 1),
            answer(2, true, -5, 2),
            answer(3, false, 2, 0),
        ]);
        let ids: Vec<i32> = ranked.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn score_orders_unaccepted_answers() {
        let ranked = rank(vec![
            answer(1, false, -1, 0),
            answer(2, false, 7, 5),
            answer(3, false, 3, 1),
        ]);
        let ids: Vec<i32> = ranked.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let ranked = rank(vec![answer(9, false, 0, 3), answer(4, false, 0, 3)]);
        let ids: Vec<i32> = ranked.iter().map(|a| a.id.0).collect();
        assert_eq!(ids, vec![9, 4]);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(rank(Vec::new()).is_empty());
    }
}
