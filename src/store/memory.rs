use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ranking;
use crate::store::ContentStore;
use crate::types::{
    account::{Account, AccountId},
    answer::{AcceptanceStatus, Answer, AnswerId, NewAnswer},
    document::{Document, DocumentId, DocumentStatus, NewDocument},
    feed::{self, FeedItem},
    profile::{Profile, ProfileStats, ProfileUpdate, RECENT_ITEMS},
    question::{DEFAULT_QUESTION_STATUS, NewQuestion, QaThread, Question, QuestionId, ThreadAnswer},
    star::{ItemType, Star, StarStatus},
    vote::{Vote, VoteTally, VoteType},
};
use crate::voting::{self, VoteTransition};

use handle_errors::Error;

/// 프로세스 메모리에 모든 테이블을 두는 저장소.
///
/// 테이블 전체를 하나의 RwLock으로 감싸므로 쓰기 연산은 모두 직렬화된다.
/// 테스트와 데이터베이스 없이 띄우는 로컬 실행에 쓴다.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i32,
    accounts: BTreeMap<AccountId, Account>,
    questions: BTreeMap<QuestionId, Question>,
    answers: BTreeMap<AnswerId, Answer>,
    documents: BTreeMap<DocumentId, Document>,
    votes: HashMap<(AccountId, AnswerId), VoteType>,
    stars: BTreeMap<(AccountId, ItemType, i32), DateTime<Utc>>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn answer_count(&self, question_id: QuestionId) -> i64 {
        self.answers
            .values()
            .filter(|a| a.question_id == question_id)
            .count() as i64
    }

    fn item_exists(&self, item_type: ItemType, item_id: i32) -> bool {
        match item_type {
            ItemType::Document => self.documents.contains_key(&DocumentId(item_id)),
            ItemType::Answer => self.answers.contains_key(&AnswerId(item_id)),
            ItemType::Question => self.questions.contains_key(&QuestionId(item_id)),
        }
    }

    fn author_name(&self, account_id: AccountId) -> String {
        self.accounts
            .get(&account_id)
            .map(|account| account.display_name())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn add_account(&self, account: Account) -> Result<Account, Error> {
        let mut tables = self.tables.write().await;
        if tables.accounts.values().any(|a| a.email == account.email) {
            return Err(Error::AccountAlreadyExists);
        }
        let id = AccountId(tables.next_id());
        let account = Account {
            id: Some(id),
            created_at: Some(Utc::now()),
            ..account
        };
        tables.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, email: &str) -> Result<Account, Error> {
        let tables = self.tables.read().await;
        tables
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned()
            .ok_or_else(|| Error::NotFound("Account".to_string()))
    }

    async fn get_account_by_id(&self, id: AccountId) -> Result<Account, Error> {
        let tables = self.tables.read().await;
        tables
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Account".to_string()))
    }

    async fn get_profile(&self, id: AccountId) -> Result<Profile, Error> {
        let tables = self.tables.read().await;
        let account = tables
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Account".to_string()))?;

        let mut documents: Vec<Document> = tables
            .documents
            .values()
            .filter(|d| d.account_id == id)
            .cloned()
            .collect();
        let mut questions: Vec<Question> = tables
            .questions
            .values()
            .filter(|q| q.account_id == Some(id))
            .cloned()
            .collect();
        let stats = ProfileStats {
            documents: documents.len() as i64,
            questions: questions.len() as i64,
            answers: tables.answers.values().filter(|a| a.account_id == id).count() as i64,
        };

        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        documents.truncate(RECENT_ITEMS);
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        questions.truncate(RECENT_ITEMS);

        Ok(Profile {
            account,
            documents,
            questions,
            stats,
        })
    }

    async fn update_profile(
        &self,
        id: AccountId,
        update: ProfileUpdate,
    ) -> Result<Account, Error> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Account".to_string()))?;
        account.name = update.name;
        account.bio = update.bio;
        Ok(account.clone())
    }

    async fn get_questions(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<Question>, Error> {
        let tables = self.tables.read().await;
        let questions = tables.questions.values().skip(offset as usize).cloned();
        Ok(match limit {
            Some(limit) => questions.take(limit as usize).collect(),
            None => questions.collect(),
        })
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, Error> {
        let tables = self.tables.read().await;
        tables
            .questions
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Question {}", id.0)))
    }

    async fn record_question_view(&self, id: QuestionId) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        if let Some(question) = tables.questions.get_mut(&id) {
            question.views += 1;
        }
        Ok(())
    }

    async fn add_question(
        &self,
        new_question: NewQuestion,
        account_id: AccountId,
    ) -> Result<Question, Error> {
        let mut tables = self.tables.write().await;
        let id = QuestionId(tables.next_id());
        let question = Question {
            id,
            title: new_question.title,
            content: new_question.content,
            tags: new_question.tags,
            status: DEFAULT_QUESTION_STATUS.to_string(),
            account_id: Some(account_id),
            views: 0,
            created_at: Some(Utc::now()),
        };
        tables.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn update_question(
        &self,
        question: Question,
        id: i32,
        account_id: AccountId,
    ) -> Result<Question, Error> {
        let mut tables = self.tables.write().await;
        match tables.questions.get_mut(&QuestionId(id)) {
            Some(stored) if stored.account_id == Some(account_id) => {
                stored.title = question.title;
                stored.content = question.content;
                stored.tags = question.tags;
                Ok(stored.clone())
            }
            _ => Err(Error::NotFound(format!("Question {}", id))),
        }
    }

    async fn delete_question(&self, id: i32, account_id: AccountId) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;
        let id = QuestionId(id);
        if tables.questions.get(&id).and_then(|q| q.account_id) != Some(account_id) {
            return Ok(false);
        }
        tables.questions.remove(&id);
        // 답변과 그 투표, 질문과 답변에 달린 별표도 함께 지운다.
        let removed: Vec<AnswerId> = tables
            .answers
            .values()
            .filter(|a| a.question_id == id)
            .map(|a| a.id)
            .collect();
        for answer_id in &removed {
            tables.answers.remove(answer_id);
        }
        tables.votes.retain(|(_, answer_id), _| !removed.contains(answer_id));
        tables.stars.retain(|(_, item_type, item_id), _| match item_type {
            ItemType::Question => *item_id != id.0,
            ItemType::Answer => !removed.contains(&AnswerId(*item_id)),
            ItemType::Document => true,
        });
        Ok(true)
    }

    async fn is_question_owner(&self, id: i32, account_id: &AccountId) -> Result<bool, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .get(&QuestionId(id))
            .is_some_and(|q| q.account_id == Some(*account_id)))
    }

    async fn add_answer(
        &self,
        new_answer: NewAnswer,
        account_id: AccountId,
    ) -> Result<Answer, Error> {
        let mut tables = self.tables.write().await;
        if !tables.questions.contains_key(&new_answer.question_id) {
            return Err(Error::NotFound(format!(
                "Question {}",
                new_answer.question_id.0
            )));
        }
        let id = AnswerId(tables.next_id());
        let answer = Answer {
            id,
            content: new_answer.content,
            question_id: new_answer.question_id,
            account_id,
            created_at: Utc::now(),
            upvotes: 0,
            downvotes: 0,
            is_accepted: false,
        };
        tables.answers.insert(id, answer.clone());
        Ok(answer)
    }

    async fn get_answers(&self, question_id: QuestionId) -> Result<Vec<Answer>, Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect())
    }

    async fn get_votes(
        &self,
        account_id: AccountId,
        answer_ids: &[AnswerId],
    ) -> Result<Vec<Vote>, Error> {
        let tables = self.tables.read().await;
        Ok(answer_ids
            .iter()
            .filter_map(|answer_id| {
                tables
                    .votes
                    .get(&(account_id, *answer_id))
                    .map(|vote_type| Vote {
                        account_id,
                        answer_id: *answer_id,
                        vote_type: *vote_type,
                    })
            })
            .collect())
    }

    async fn add_document(
        &self,
        new_document: NewDocument,
        account_id: AccountId,
    ) -> Result<Document, Error> {
        let mut tables = self.tables.write().await;
        let id = DocumentId(tables.next_id());
        let document = Document {
            id,
            title: new_document.title,
            description: new_document.description,
            content: new_document.content,
            tags: new_document.tags,
            file_path: new_document.file_path,
            status: DocumentStatus::Pending,
            account_id,
            verified_by: None,
            verified_at: None,
            views: 0,
            created_at: Utc::now(),
        };
        tables.documents.insert(id, document.clone());
        Ok(document)
    }

    async fn get_document(&self, id: DocumentId) -> Result<Document, Error> {
        let tables = self.tables.read().await;
        tables
            .documents
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Document {}", id.0)))
    }

    async fn record_document_view(&self, id: DocumentId) -> Result<(), Error> {
        let mut tables = self.tables.write().await;
        if let Some(document) = tables.documents.get_mut(&id) {
            document.views += 1;
        }
        Ok(())
    }

    async fn set_document_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        verifier: AccountId,
    ) -> Result<Document, Error> {
        let mut tables = self.tables.write().await;
        let document = tables
            .documents
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Document {}", id.0)))?;
        document.status = status;
        match status {
            DocumentStatus::Verified => {
                document.verified_by = Some(verifier);
                document.verified_at = Some(Utc::now());
            }
            _ => {
                document.verified_by = None;
                document.verified_at = None;
            }
        }
        Ok(document.clone())
    }

    async fn get_feed(&self) -> Result<Vec<FeedItem>, Error> {
        let tables = self.tables.read().await;
        let documents = tables
            .documents
            .values()
            .filter(|d| d.status == DocumentStatus::Verified)
            .cloned()
            .map(FeedItem::Document);
        let questions = tables.questions.values().map(|q| FeedItem::Question {
            question: q.clone(),
            answer_count: tables.answer_count(q.id),
        });
        let mut items: Vec<FeedItem> = documents.chain(questions).collect();
        feed::sort_newest_first(&mut items);
        Ok(items)
    }

    async fn search(&self, term: &str) -> Result<Vec<FeedItem>, Error> {
        let tables = self.tables.read().await;
        let documents = tables
            .documents
            .values()
            .filter(|d| d.status == DocumentStatus::Verified)
            .filter(|d| {
                feed::matches_term(term, &d.title, d.description.as_deref(), d.tags.as_deref())
            })
            .cloned()
            .map(FeedItem::Document);
        let questions = tables
            .questions
            .values()
            .filter(|q| feed::matches_term(term, &q.title, Some(&q.content), q.tags.as_deref()))
            .map(|q| FeedItem::Question {
                question: q.clone(),
                answer_count: tables.answer_count(q.id),
            });
        let mut items: Vec<FeedItem> = documents.chain(questions).collect();
        feed::sort_newest_first(&mut items);
        Ok(items)
    }

    async fn recent_verified_documents(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Document>, Error> {
        let tables = self.tables.read().await;
        let mut documents: Vec<Document> = tables
            .documents
            .values()
            .filter(|d| d.status == DocumentStatus::Verified && d.created_at >= since)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn recent_threads(&self, since: DateTime<Utc>) -> Result<Vec<QaThread>, Error> {
        let tables = self.tables.read().await;
        let mut threads: Vec<QaThread> = tables
            .questions
            .values()
            .filter(|q| q.created_at.is_some_and(|created| created >= since))
            .map(|question| {
                let answers: Vec<Answer> = tables
                    .answers
                    .values()
                    .filter(|a| a.question_id == question.id)
                    .cloned()
                    .collect();
                let answer = ranking::rank(answers)
                    .into_iter()
                    .next()
                    .map(|a| ThreadAnswer {
                        author_name: tables.author_name(a.account_id),
                        content: a.content,
                        is_accepted: a.is_accepted,
                    });
                QaThread {
                    question: question.clone(),
                    answer,
                }
            })
            .collect();
        threads.sort_by(|a, b| b.question.created_at.cmp(&a.question.created_at));
        Ok(threads)
    }

    async fn apply_vote(
        &self,
        account_id: AccountId,
        answer_id: AnswerId,
        vote_type: VoteType,
    ) -> Result<VoteTally, Error> {
        // 쓰기 잠금을 끝까지 쥐고 있어 읽기-계산-쓰기가 끼어들지 않는다.
        let mut tables = self.tables.write().await;
        if !tables.answers.contains_key(&answer_id) {
            return Err(Error::NotFound(format!("Answer {}", answer_id.0)));
        }

        let key = (account_id, answer_id);
        let transition = VoteTransition::decide(tables.votes.get(&key).copied(), vote_type);
        match transition.resulting_vote() {
            Some(new_type) => {
                tables.votes.insert(key, new_type);
            }
            None => {
                tables.votes.remove(&key);
            }
        }

        let (up, down) = transition.counter_deltas();
        let answer = tables
            .answers
            .get_mut(&answer_id)
            .ok_or_else(|| Error::NotFound(format!("Answer {}", answer_id.0)))?;
        answer.upvotes += up;
        answer.downvotes += down;
        Ok(VoteTally::new(answer.upvotes, answer.downvotes))
    }

    async fn toggle_star(
        &self,
        account_id: AccountId,
        item_type: ItemType,
        item_id: i32,
    ) -> Result<StarStatus, Error> {
        let mut tables = self.tables.write().await;
        if !tables.item_exists(item_type, item_id) {
            return Err(Error::NotFound(format!("{} {}", item_type.label(), item_id)));
        }

        let key = (account_id, item_type, item_id);
        let starred = if tables.stars.remove(&key).is_some() {
            false
        } else {
            tables.stars.insert(key, Utc::now());
            true
        };
        let star_count = tables
            .stars
            .keys()
            .filter(|(_, t, id)| *t == item_type && *id == item_id)
            .count() as i64;

        Ok(StarStatus {
            starred,
            star_count,
        })
    }

    async fn get_stars(&self, account_id: AccountId) -> Result<Vec<Star>, Error> {
        let tables = self.tables.read().await;
        let mut stars: Vec<Star> = tables
            .stars
            .iter()
            .filter(|((owner, _, _), _)| *owner == account_id)
            .map(|((_, item_type, item_id), created_at)| Star {
                account_id,
                item_type: *item_type,
                item_id: *item_id,
                created_at: *created_at,
            })
            .collect();
        stars.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(stars)
    }

    async fn toggle_acceptance(
        &self,
        caller: AccountId,
        answer_id: AnswerId,
    ) -> Result<AcceptanceStatus, Error> {
        let mut tables = self.tables.write().await;
        let (question_id, currently_accepted) = match tables.answers.get(&answer_id) {
            Some(answer) => (answer.question_id, answer.is_accepted),
            None => return Err(Error::NotFound(format!("Answer {}", answer_id.0))),
        };
        let owner = tables.questions.get(&question_id).and_then(|q| q.account_id);
        if owner != Some(caller) {
            return Err(Error::Unauthorized);
        }

        let is_accepted = voting::toggled_acceptance(currently_accepted);
        for answer in tables
            .answers
            .values_mut()
            .filter(|a| a.question_id == question_id)
        {
            answer.is_accepted = answer.id == answer_id && is_accepted;
        }
        Ok(AcceptanceStatus { is_accepted })
    }
}

#[cfg(test)]
impl MemoryStore {
    /// 테스트에서 작성 시각을 과거로 옮길 때 쓴다.
    pub async fn backdate_question(&self, id: QuestionId, created_at: DateTime<Utc>) {
        if let Some(question) = self.tables.write().await.questions.get_mut(&id) {
            question.created_at = Some(created_at);
        }
    }

    pub async fn backdate_document(&self, id: DocumentId, created_at: DateTime<Utc>) {
        if let Some(document) = self.tables.write().await.documents.get_mut(&id) {
            document.created_at = created_at;
        }
    }

    pub async fn vote_rows(&self, answer_id: AnswerId) -> Vec<VoteType> {
        self.tables
            .read()
            .await
            .votes
            .iter()
            .filter(|((_, id), _)| *id == answer_id)
            .map(|(_, vote_type)| *vote_type)
            .collect()
    }
}
