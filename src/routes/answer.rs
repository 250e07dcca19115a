use tracing::instrument;

use crate::store::Store;
use crate::types::account::Session;
use crate::types::answer::NewAnswer;

#[instrument(skip(store, new_answer))]
pub async fn add_answer(
    session: Session,
    store: Store,
    new_answer: NewAnswer,
) -> Result<impl warp::Reply, warp::Rejection> {
    let account_id = session.account_id;
    // 없는 질문에 답을 달면 404
    store.get_question(new_answer.question_id).await?;

    match store.add_answer(new_answer, account_id).await {
        Ok(answer) => Ok(warp::reply::json(&answer)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}
