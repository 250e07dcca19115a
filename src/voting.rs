//! 투표 상태 전이
//!
//! 저장소 백엔드는 기존 투표를 잠근 상태로 읽은 다음 여기서 계산한 전이를
//! 같은 트랜잭션 안에서 적용한다.

use crate::types::vote::VoteType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// 기존 투표가 없다: 투표를 추가하고 해당 카운터를 1 올린다.
    Cast(VoteType),
    /// 같은 종류로 다시 눌렀다: 투표를 지우고 해당 카운터를 1 내린다.
    Retract(VoteType),
    /// 다른 종류로 바꿨다: 이전 카운터는 1 내리고 새 카운터는 1 올린다.
    Switch { from: VoteType, to: VoteType },
}

impl VoteTransition {
    pub fn decide(existing: Option<VoteType>, requested: VoteType) -> Self {
        match existing {
            None => VoteTransition::Cast(requested),
            Some(current) if current == requested => VoteTransition::Retract(requested),
            Some(current) => VoteTransition::Switch {
                from: current,
                to: requested,
            },
        }
    }

    /// 전이 후 남는 투표. None이면 투표 행이 없어야 한다.
    pub fn resulting_vote(&self) -> Option<VoteType> {
        match *self {
            VoteTransition::Cast(vote_type) => Some(vote_type),
            VoteTransition::Retract(_) => None,
            VoteTransition::Switch { to, .. } => Some(to),
        }
    }

    /// (upvotes 변화량, downvotes 변화량)
    pub fn counter_deltas(&self) -> (i32, i32) {
        match *self {
            VoteTransition::Cast(vote_type) => delta(vote_type, 1),
            VoteTransition::Retract(vote_type) => delta(vote_type, -1),
            VoteTransition::Switch { from, to } => {
                let (up_from, down_from) = delta(from, -1);
                let (up_to, down_to) = delta(to, 1);
                (up_from + up_to, down_from + down_to)
            }
        }
    }
}

fn delta(vote_type: VoteType, amount: i32) -> (i32, i32) {
    match vote_type {
        VoteType::Up => (amount, 0),
        VoteType::Down => (0, amount),
    }
}

/// 채택 토글 후 대상 답변의 상태. 형제 답변은 항상 미채택이 된다.
pub fn toggled_acceptance(currently_accepted: bool) -> bool {
    !currently_accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_vote_is_cast() {
        let t = VoteTransition::decide(None, VoteType::Up);
        assert_eq!(t, VoteTransition::Cast(VoteType::Up));
        assert_eq!(t.counter_deltas(), (1, 0));
        assert_eq!(t.resulting_vote(), Some(VoteType::Up));
    }

    #[test]
    fn same_vote_twice_retracts() {
        let t = VoteTransition::decide(Some(VoteType::Down), VoteType::Down);
        assert_eq!(t, VoteTransition::Retract(VoteType::Down));
        assert_eq!(t.counter_deltas(), (0, -1));
        assert_eq!(t.resulting_vote(), None);
    }

    #[test]
    fn switching_moves_one_vote_between_counters() {
        let t = VoteTransition::decide(Some(VoteType::Up), VoteType::Down);
        assert_eq!(t.counter_deltas(), (-1, 1));
        assert_eq!(t.resulting_vote(), Some(VoteType::Down));

        let t = VoteTransition::decide(Some(VoteType::Down), VoteType::Up);
        assert_eq!(t.counter_deltas(), (1, -1));
    }

    #[test]
    fn acceptance_flips() {
        assert!(toggled_acceptance(false));
        assert!(!toggled_acceptance(true));
    }
}
