use std::collections::HashMap;
use tracing::{Level, event, info, instrument};
use warp::http::StatusCode;

use handle_errors::Error;

use crate::ranking;
use crate::store::Store;
use crate::types::account::Session;
use crate::types::answer::{AnswerId, RankedAnswer};
use crate::types::pagination::{Pagination, extract_pagination};
use crate::types::question::{NewQuestion, Question, QuestionDetail, QuestionId};

#[instrument]
pub async fn get_questions(
    params: HashMap<String, String>,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    event!(target: "campus_qa", Level::INFO, "querying questions");
    let mut pagination = Pagination::default();

    if !params.is_empty() {
        event!(Level::INFO, pagination = true);
        pagination = extract_pagination(params)?;
    } else {
        info!(pagination = false);
    }
    match store
        .get_questions(pagination.limit, pagination.offset)
        .await
    {
        Ok(res) => Ok(warp::reply::json(&res)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

/// 질문 하나와 정렬된 답변, 요청한 사용자가 각 답변에 던진 표를 돌려준다.
/// 조회할 때마다 조회 수가 하나 오른다.
#[instrument(skip(store))]
pub async fn get_question(
    id: i32,
    session: Session,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    let id = QuestionId(id);
    store.record_question_view(id).await?;
    let question = store.get_question(id).await?;

    let answers = ranking::rank(store.get_answers(id).await?);
    let answer_ids: Vec<AnswerId> = answers.iter().map(|a| a.id).collect();
    let votes: HashMap<AnswerId, _> = store
        .get_votes(session.account_id, &answer_ids)
        .await?
        .into_iter()
        .map(|vote| (vote.answer_id, vote.vote_type))
        .collect();

    let answers = answers
        .into_iter()
        .map(|answer| RankedAnswer {
            score: answer.score(),
            user_vote: votes.get(&answer.id).copied(),
            answer,
        })
        .collect();

    Ok(warp::reply::json(&QuestionDetail { question, answers }))
}

#[instrument(skip(store, new_question), fields(title = %new_question.title))]
pub async fn add_question(
    session: Session,
    store: Store,
    new_question: NewQuestion,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.add_question(new_question, session.account_id).await {
        Ok(question) => Ok(warp::reply::json(&question)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

/// 질문을 만든 계정이 아니면 `Unauthorized`
async fn ensure_owner(store: &Store, id: i32, session: &Session) -> Result<(), Error> {
    if store.is_question_owner(id, &session.account_id).await? {
        Ok(())
    } else {
        event!(
            Level::WARN,
            question_id = id,
            account_id = session.account_id.0,
            "question owned by another account"
        );
        Err(Error::Unauthorized)
    }
}

#[instrument(skip(store, question))]
pub async fn update_question(
    id: i32,
    session: Session,
    store: Store,
    question: Question,
) -> Result<impl warp::Reply, warp::Rejection> {
    ensure_owner(&store, id, &session).await?;
    let updated = store
        .update_question(question, id, session.account_id)
        .await?;
    Ok(warp::reply::json(&updated))
}

#[instrument(skip(store))]
pub async fn delete_question(
    id: i32,
    session: Session,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    ensure_owner(&store, id, &session).await?;
    if store.delete_question(id, session.account_id).await? {
        Ok(warp::reply::with_status(
            format!("Question {} deleted", id),
            StatusCode::OK,
        ))
    } else {
        Err(warp::reject::custom(Error::NotFound(format!("Question {}", id))))
    }
}
