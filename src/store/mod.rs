use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use handle_errors::Error;

use crate::types::{
    account::{Account, AccountId},
    answer::{AcceptanceStatus, Answer, AnswerId, NewAnswer},
    document::{Document, DocumentId, DocumentStatus, NewDocument},
    feed::FeedItem,
    profile::{Profile, ProfileUpdate},
    question::{NewQuestion, QaThread, Question, QuestionId},
    star::{ItemType, Star, StarStatus},
    vote::{Vote, VoteTally, VoteType},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// 핸들러 사이에서 복제해 넘기는 저장소 핸들
pub type Store = Arc<dyn ContentStore>;

/// 계정, 질문, 답변, 문서, 투표, 별표를 보관하는 저장소.
///
/// `apply_vote`, `toggle_star`, `toggle_acceptance`는 각각 하나의 원자적
/// 단위로 실행된다. 에러가 나면 어떤 카운터도 바뀌지 않는다.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug {
    async fn add_account(&self, account: Account) -> Result<Account, Error>;
    async fn get_account(&self, email: &str) -> Result<Account, Error>;
    async fn get_account_by_id(&self, id: AccountId) -> Result<Account, Error>;
    /// 계정과 최근 문서, 질문, 작성 통계
    async fn get_profile(&self, id: AccountId) -> Result<Profile, Error>;
    async fn update_profile(&self, id: AccountId, update: ProfileUpdate)
    -> Result<Account, Error>;

    async fn get_questions(&self, limit: Option<u32>, offset: u32)
    -> Result<Vec<Question>, Error>;
    async fn get_question(&self, id: QuestionId) -> Result<Question, Error>;
    async fn record_question_view(&self, id: QuestionId) -> Result<(), Error>;
    async fn add_question(
        &self,
        new_question: NewQuestion,
        account_id: AccountId,
    ) -> Result<Question, Error>;
    async fn update_question(
        &self,
        question: Question,
        id: i32,
        account_id: AccountId,
    ) -> Result<Question, Error>;
    async fn delete_question(&self, id: i32, account_id: AccountId) -> Result<bool, Error>;
    async fn is_question_owner(&self, id: i32, account_id: &AccountId) -> Result<bool, Error>;

    async fn add_answer(&self, new_answer: NewAnswer, account_id: AccountId)
    -> Result<Answer, Error>;
    async fn get_answers(&self, question_id: QuestionId) -> Result<Vec<Answer>, Error>;
    async fn get_votes(
        &self,
        account_id: AccountId,
        answer_ids: &[AnswerId],
    ) -> Result<Vec<Vote>, Error>;

    async fn add_document(
        &self,
        new_document: NewDocument,
        account_id: AccountId,
    ) -> Result<Document, Error>;
    async fn get_document(&self, id: DocumentId) -> Result<Document, Error>;
    async fn record_document_view(&self, id: DocumentId) -> Result<(), Error>;
    async fn set_document_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        verifier: AccountId,
    ) -> Result<Document, Error>;

    /// 검증된 문서와 모든 질문, 최신순
    async fn get_feed(&self) -> Result<Vec<FeedItem>, Error>;
    async fn search(&self, term: &str) -> Result<Vec<FeedItem>, Error>;
    async fn recent_verified_documents(&self, since: DateTime<Utc>)
    -> Result<Vec<Document>, Error>;
    /// `since` 이후의 질문마다 대표 답변 하나(채택 > 점수 > 작성 시각)를 붙인다.
    async fn recent_threads(&self, since: DateTime<Utc>) -> Result<Vec<QaThread>, Error>;

    async fn apply_vote(
        &self,
        account_id: AccountId,
        answer_id: AnswerId,
        vote_type: VoteType,
    ) -> Result<VoteTally, Error>;
    async fn toggle_star(
        &self,
        account_id: AccountId,
        item_type: ItemType,
        item_id: i32,
    ) -> Result<StarStatus, Error>;
    async fn get_stars(&self, account_id: AccountId) -> Result<Vec<Star>, Error>;
    async fn toggle_acceptance(
        &self,
        caller: AccountId,
        answer_id: AnswerId,
    ) -> Result<AcceptanceStatus, Error>;
}
