use tracing::{Level, event, instrument};

use crate::store::Store;
use crate::types::account::Session;
use crate::types::answer::AnswerId;
use crate::types::vote::{VoteRequest, VoteType};

/// 같은 표를 다시 누르면 취소, 반대 표를 누르면 전환된다.
#[instrument(skip(store))]
pub async fn vote(
    id: i32,
    session: Session,
    store: Store,
    request: VoteRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let vote_type: VoteType = request.vote_type()?;

    match store
        .apply_vote(session.account_id, AnswerId(id), vote_type)
        .await
    {
        Ok(tally) => {
            event!(Level::INFO, answer_id = id, score = tally.score, "vote applied");
            Ok(warp::reply::json(&tally))
        }
        Err(e) => Err(warp::reject::custom(e)),
    }
}

/// 질문 작성자만 채택을 바꿀 수 있다. 질문마다 채택된 답변은 많아야 하나다.
#[instrument(skip(store))]
pub async fn accept_answer(
    id: i32,
    session: Session,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store
        .toggle_acceptance(session.account_id, AnswerId(id))
        .await
    {
        Ok(status) => Ok(warp::reply::json(&status)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}
