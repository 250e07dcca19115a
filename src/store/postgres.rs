use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};

use crate::store::ContentStore;
use crate::types::{
    account::{Account, AccountId, Role, display_name},
    answer::{AcceptanceStatus, Answer, AnswerId, NewAnswer},
    document::{Document, DocumentId, DocumentStatus, NewDocument},
    feed::{self, FeedItem},
    profile::{Profile, ProfileStats, ProfileUpdate, RECENT_ITEMS},
    question::{NewQuestion, QaThread, Question, QuestionId, ThreadAnswer},
    star::{ItemType, Star, StarStatus},
    vote::{Vote, VoteTally, VoteType},
};
use crate::voting::{self, VoteTransition};

use handle_errors::Error;

const QUESTION_COLUMNS: &str = "id, title, content, tags, status, views, account_id, created_at";
const ANSWER_COLUMNS: &str =
    "id, content, corresponding_question, account_id, created_at, upvotes, downvotes, is_accepted";
const DOCUMENT_COLUMNS: &str = "id, title, description, content, tags, file_path, status, \
     account_id, verified_by, verified_at, views, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pub connection: PgPool,
}

impl PgStore {
    pub async fn new(db_url: &str, max_connections: u32) -> Self {
        let db_pool = match PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await
        {
            Ok(pool) => pool,
            Err(e) => panic!("DB 연결을 하지 못했습니다: {}", e), // 데이터베이스에 연결하지 못하면 애플리케이션을 종료한다.
        };

        PgStore {
            connection: db_pool,
        }
    }

    async fn item_exists(&self, item_type: ItemType, item_id: i32) -> Result<bool, Error> {
        // 테이블 이름은 ItemType이 정하는 고정 문자열이라 그대로 넣어도 된다.
        let sql = format!("SELECT 1 FROM {} WHERE id = $1", item_type.table());
        match sqlx::query(&sql)
            .bind(item_id)
            .fetch_optional(&self.connection)
            .await
        {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(db_error(e)),
        }
    }
}

fn db_error(error: sqlx::Error) -> Error {
    tracing::event!(tracing::Level::ERROR, "{:?}", error);
    Error::DatabaseQueryError(error)
}

/// 별표 INSERT 결과를 별표 상태로 바꾼다.
/// 동시에 들어온 같은 요청이 먼저 넣어 유일 제약에 걸렸다면 이미 별표가 달린 상태다.
fn star_insert_outcome(result: Result<(), sqlx::Error>) -> Result<bool, Error> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if handle_errors::is_unique_violation(&e) => Ok(true),
        Err(e) => Err(db_error(e)),
    }
}

fn question_from_row(row: &PgRow) -> Question {
    Question {
        id: QuestionId(row.get("id")),
        title: row.get("title"),
        content: row.get("content"),
        tags: row.get("tags"),
        status: row.get("status"),
        account_id: Some(AccountId(row.get("account_id"))),
        views: row.get("views"),
        created_at: Some(row.get("created_at")),
    }
}

fn answer_from_row(row: &PgRow) -> Answer {
    Answer {
        id: AnswerId(row.get("id")),
        content: row.get("content"),
        question_id: QuestionId(row.get("corresponding_question")),
        account_id: AccountId(row.get("account_id")),
        created_at: row.get("created_at"),
        upvotes: row.get("upvotes"),
        downvotes: row.get("downvotes"),
        is_accepted: row.get("is_accepted"),
    }
}

fn document_from_row(row: &PgRow) -> Document {
    let status: String = row.get("status");
    Document {
        id: DocumentId(row.get("id")),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        tags: row.get("tags"),
        file_path: row.get("file_path"),
        status: status.parse().unwrap_or_else(|_| {
            tracing::warn!(status = %status, "unknown document status, treating as pending");
            DocumentStatus::Pending
        }),
        account_id: AccountId(row.get("account_id")),
        verified_by: row.get::<Option<i32>, _>("verified_by").map(AccountId),
        verified_at: row.get("verified_at"),
        views: row.get("views"),
        created_at: row.get("created_at"),
    }
}

fn account_from_row(row: &PgRow) -> Account {
    let role: String = row.get("role");
    Account {
        id: Some(AccountId(row.get("id"))),
        email: row.get("email"),
        password: row.get("password"),
        role: role.parse().unwrap_or_else(|_| {
            tracing::warn!(role = %role, "unknown account role, treating as student");
            Role::Student
        }),
        name: row.get("name"),
        bio: row.get("bio"),
        created_at: Some(row.get("created_at")),
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn add_account(&self, account: Account) -> Result<Account, Error> {
        match sqlx::query(
            "INSERT INTO accounts (email, password, role, name, bio)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password, role, name, bio, created_at",
        )
        .bind(account.email)
        .bind(account.password)
        .bind(account.role.as_str())
        .bind(account.name)
        .bind(account.bio)
        .map(|row: PgRow| account_from_row(&row))
        .fetch_one(&self.connection)
        .await
        {
            Ok(account) => Ok(account),
            Err(error) => {
                if let Some(db_err) = error.as_database_error() {
                    tracing::event!(
                        tracing::Level::ERROR,
                        code = ?db_err.code(),
                        db_message = db_err.message(),
                        constraint = ?db_err.constraint()
                    );
                }
                Err(Error::DatabaseQueryError(error))
            }
        }
    }

    async fn get_account(&self, email: &str) -> Result<Account, Error> {
        match sqlx::query("SELECT * from accounts where email = $1")
            .bind(email)
            .map(|row: PgRow| account_from_row(&row))
            .fetch_optional(&self.connection)
            .await
        {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(Error::NotFound("Account".to_string())),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn get_account_by_id(&self, id: AccountId) -> Result<Account, Error> {
        match sqlx::query("SELECT * from accounts where id = $1")
            .bind(id.0)
            .map(|row: PgRow| account_from_row(&row))
            .fetch_optional(&self.connection)
            .await
        {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(Error::NotFound("Account".to_string())),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn get_profile(&self, id: AccountId) -> Result<Profile, Error> {
        let account = self.get_account_by_id(id).await?;

        let documents_sql = format!(
            "SELECT {} FROM documents WHERE account_id = $1 ORDER BY created_at DESC LIMIT $2",
            DOCUMENT_COLUMNS
        );
        let documents = sqlx::query(&documents_sql)
            .bind(id.0)
            .bind(RECENT_ITEMS as i64)
            .map(|row: PgRow| document_from_row(&row))
            .fetch_all(&self.connection)
            .await
            .map_err(db_error)?;

        let questions_sql = format!(
            "SELECT {} FROM questions WHERE account_id = $1 ORDER BY created_at DESC LIMIT $2",
            QUESTION_COLUMNS
        );
        let questions = sqlx::query(&questions_sql)
            .bind(id.0)
            .bind(RECENT_ITEMS as i64)
            .map(|row: PgRow| question_from_row(&row))
            .fetch_all(&self.connection)
            .await
            .map_err(db_error)?;

        let stats = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM documents WHERE account_id = $1) AS documents,
                (SELECT COUNT(*) FROM questions WHERE account_id = $1) AS questions,
                (SELECT COUNT(*) FROM answers WHERE account_id = $1) AS answers",
        )
        .bind(id.0)
        .map(|row: PgRow| ProfileStats {
            documents: row.get("documents"),
            questions: row.get("questions"),
            answers: row.get("answers"),
        })
        .fetch_one(&self.connection)
        .await
        .map_err(db_error)?;

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
        match sqlx::query(
            "UPDATE accounts SET name = $1, bio = $2
            WHERE id = $3
            RETURNING id, email, password, role, name, bio, created_at",
        )
        .bind(update.name)
        .bind(update.bio)
        .bind(id.0)
        .map(|row: PgRow| account_from_row(&row))
        .fetch_optional(&self.connection)
        .await
        {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(Error::NotFound("Account".to_string())),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn get_questions(
        &self,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<Question>, Error> {
        // LIMIT에 NULL을 넘기면 PostgreSQL은 제한을 두지 않는다.
        let sql = format!(
            "SELECT {} from questions ORDER BY id LIMIT $1 OFFSET $2",
            QUESTION_COLUMNS
        );
        match sqlx::query(&sql)
            .bind(limit.map(i64::from))
            .bind(i64::from(offset))
            .map(|row: PgRow| question_from_row(&row))
            .fetch_all(&self.connection)
            .await
        {
            Ok(questions) => Ok(questions),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, Error> {
        let sql = format!("SELECT {} from questions WHERE id = $1", QUESTION_COLUMNS);
        match sqlx::query(&sql)
            .bind(id.0)
            .map(|row: PgRow| question_from_row(&row))
            .fetch_optional(&self.connection)
            .await
        {
            Ok(Some(question)) => Ok(question),
            Ok(None) => Err(Error::NotFound(format!("Question {}", id.0))),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn record_question_view(&self, id: QuestionId) -> Result<(), Error> {
        match sqlx::query("UPDATE questions SET views = views + 1 WHERE id = $1")
            .bind(id.0)
            .execute(&self.connection)
            .await
        {
            Ok(_) => Ok(()),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn add_question(
        &self,
        new_question: NewQuestion,
        account_id: AccountId,
    ) -> Result<Question, Error> {
        let sql = format!(
            "INSERT INTO questions (title, content, tags, account_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}",
            QUESTION_COLUMNS
        );
        match sqlx::query(&sql)
            .bind(new_question.title)
            .bind(new_question.content)
            .bind(new_question.tags)
            .bind(account_id.0)
            .map(|row: PgRow| question_from_row(&row))
            .fetch_one(&self.connection)
            .await
        {
            Ok(question) => Ok(question),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn update_question(
        &self,
        question: Question,
        id: i32,
        account_id: AccountId,
    ) -> Result<Question, Error> {
        // 질문을 수정하려는 계정이 해당 질문을 소유하는지 WHERE 절에서 한 번 더 확인한다.
        let sql = format!(
            "UPDATE questions
            SET title = $1, content = $2, tags = $3
            WHERE id = $4 and account_id = $5
            RETURNING {}",
            QUESTION_COLUMNS
        );
        match sqlx::query(&sql)
            .bind(question.title)
            .bind(question.content)
            .bind(question.tags)
            .bind(id)
            .bind(account_id.0)
            .map(|row: PgRow| question_from_row(&row))
            .fetch_optional(&self.connection)
            .await
        {
            Ok(Some(question)) => Ok(question),
            Ok(None) => Err(Error::NotFound(format!("Question {}", id))),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn delete_question(&self, id: i32, account_id: AccountId) -> Result<bool, Error> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        // stars.item_id에는 외래 키가 없으므로 질문과 그 답변에 달린 별표를 직접 지운다.
        sqlx::query(
            "DELETE FROM stars
            WHERE EXISTS (SELECT 1 FROM questions WHERE id = $1 AND account_id = $2)
              AND ((item_type = $3 AND item_id = $1)
                OR (item_type = $4 AND item_id IN
                    (SELECT id FROM answers WHERE corresponding_question = $1)))",
        )
        .bind(id)
        .bind(account_id.0)
        .bind(ItemType::Question.as_str())
        .bind(ItemType::Answer.as_str())
        .execute(&mut tx)
        .await
        .map_err(db_error)?;

        // 답변과 투표는 ON DELETE CASCADE로 함께 지워진다.
        let deleted = sqlx::query("DELETE FROM questions WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id.0)
            .execute(&mut tx)
            .await
            .map_err(db_error)?
            .rows_affected();
        if deleted == 0 {
            return Ok(false);
        }

        tx.commit().await.map_err(db_error)?;
        Ok(true)
    }

    async fn is_question_owner(&self, id: i32, account_id: &AccountId) -> Result<bool, Error> {
        match sqlx::query("SELECT 1 from questions where id = $1 and account_id = $2")
            .bind(id)
            .bind(account_id.0)
            .fetch_optional(&self.connection) // fetch_optional은 None이나 결과 값 하나를 돌려준다.
            .await
        {
            Ok(question) => Ok(question.is_some()),
            Err(e) => Err(db_error(e)),
        }
    }

    async fn add_answer(
        &self,
        new_answer: NewAnswer,
        account_id: AccountId,
    ) -> Result<Answer, Error> {
        let sql = format!(
            "INSERT INTO answers (content, corresponding_question, account_id)
            VALUES ($1, $2, $3)
            RETURNING {}",
            ANSWER_COLUMNS
        );
        match sqlx::query(&sql)
            .bind(new_answer.content)
            .bind(new_answer.question_id.0)
            .bind(account_id.0)
            .map(|row: PgRow| answer_from_row(&row))
            .fetch_one(&self.connection)
            .await
        {
            Ok(answer) => Ok(answer),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn get_answers(&self, question_id: QuestionId) -> Result<Vec<Answer>, Error> {
        let sql = format!(
            "SELECT {} FROM answers WHERE corresponding_question = $1 ORDER BY id",
            ANSWER_COLUMNS
        );
        match sqlx::query(&sql)
            .bind(question_id.0)
            .map(|row: PgRow| answer_from_row(&row))
            .fetch_all(&self.connection)
            .await
        {
            Ok(answers) => Ok(answers),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn get_votes(
        &self,
        account_id: AccountId,
        answer_ids: &[AnswerId],
    ) -> Result<Vec<Vote>, Error> {
        if answer_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = answer_ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query(
            "SELECT answer_id, vote_type FROM votes WHERE account_id = $1 AND answer_id = ANY($2)",
        )
        .bind(account_id.0)
        .bind(ids)
        .map(|row: PgRow| {
            (
                row.get::<i32, _>("answer_id"),
                row.get::<String, _>("vote_type"),
            )
        })
        .fetch_all(&self.connection)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|(answer_id, vote_type)| -> Result<Vote, Error> {
                Ok(Vote {
                    account_id,
                    answer_id: AnswerId(answer_id),
                    vote_type: vote_type.parse()?,
                })
            })
            .collect()
    }

    async fn add_document(
        &self,
        new_document: NewDocument,
        account_id: AccountId,
    ) -> Result<Document, Error> {
        let sql = format!(
            "INSERT INTO documents (title, description, content, tags, file_path, account_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}",
            DOCUMENT_COLUMNS
        );
        match sqlx::query(&sql)
            .bind(new_document.title)
            .bind(new_document.description)
            .bind(new_document.content)
            .bind(new_document.tags)
            .bind(new_document.file_path)
            .bind(account_id.0)
            .map(|row: PgRow| document_from_row(&row))
            .fetch_one(&self.connection)
            .await
        {
            Ok(document) => Ok(document),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn get_document(&self, id: DocumentId) -> Result<Document, Error> {
        let sql = format!("SELECT {} FROM documents WHERE id = $1", DOCUMENT_COLUMNS);
        match sqlx::query(&sql)
            .bind(id.0)
            .map(|row: PgRow| document_from_row(&row))
            .fetch_optional(&self.connection)
            .await
        {
            Ok(Some(document)) => Ok(document),
            Ok(None) => Err(Error::NotFound(format!("Document {}", id.0))),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn record_document_view(&self, id: DocumentId) -> Result<(), Error> {
        match sqlx::query("UPDATE documents SET views = views + 1 WHERE id = $1")
            .bind(id.0)
            .execute(&self.connection)
            .await
        {
            Ok(_) => Ok(()),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn set_document_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        verifier: AccountId,
    ) -> Result<Document, Error> {
        let (verified_by, verified_at) = match status {
            DocumentStatus::Verified => (Some(verifier.0), Some(Utc::now())),
            _ => (None, None),
        };
        let sql = format!(
            "UPDATE documents SET status = $1, verified_by = $2, verified_at = $3
            WHERE id = $4
            RETURNING {}",
            DOCUMENT_COLUMNS
        );
        match sqlx::query(&sql)
            .bind(status.as_str())
            .bind(verified_by)
            .bind(verified_at)
            .bind(id.0)
            .map(|row: PgRow| document_from_row(&row))
            .fetch_optional(&self.connection)
            .await
        {
            Ok(Some(document)) => Ok(document),
            Ok(None) => Err(Error::NotFound(format!("Document {}", id.0))),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn get_feed(&self) -> Result<Vec<FeedItem>, Error> {
        let documents_sql = format!(
            "SELECT {} FROM documents WHERE status = 'Verified' ORDER BY created_at DESC",
            DOCUMENT_COLUMNS
        );
        let documents = sqlx::query(&documents_sql)
            .map(|row: PgRow| FeedItem::Document(document_from_row(&row)))
            .fetch_all(&self.connection)
            .await
            .map_err(db_error)?;

        let questions = sqlx::query(
            "SELECT q.id, q.title, q.content, q.tags, q.status, q.views, q.account_id, q.created_at,
                (SELECT COUNT(*) FROM answers a WHERE a.corresponding_question = q.id) AS answer_count
            FROM questions q
            ORDER BY q.created_at DESC",
        )
        .map(|row: PgRow| FeedItem::Question {
            question: question_from_row(&row),
            answer_count: row.get("answer_count"),
        })
        .fetch_all(&self.connection)
        .await
        .map_err(db_error)?;

        let mut items: Vec<FeedItem> = documents.into_iter().chain(questions).collect();
        feed::sort_newest_first(&mut items);
        Ok(items)
    }

    async fn search(&self, term: &str) -> Result<Vec<FeedItem>, Error> {
        let pattern = format!("%{}%", term);
        let documents_sql = format!(
            "SELECT {} FROM documents
            WHERE status = 'Verified'
              AND (title ILIKE $1 OR description ILIKE $1 OR array_to_string(tags, ',') ILIKE $1)",
            DOCUMENT_COLUMNS
        );
        let documents = sqlx::query(&documents_sql)
            .bind(&pattern)
            .map(|row: PgRow| FeedItem::Document(document_from_row(&row)))
            .fetch_all(&self.connection)
            .await
            .map_err(db_error)?;

        let questions = sqlx::query(
            "SELECT q.id, q.title, q.content, q.tags, q.status, q.views, q.account_id, q.created_at,
                (SELECT COUNT(*) FROM answers a WHERE a.corresponding_question = q.id) AS answer_count
            FROM questions q
            WHERE q.title ILIKE $1 OR q.content ILIKE $1 OR array_to_string(q.tags, ',') ILIKE $1",
        )
        .bind(&pattern)
        .map(|row: PgRow| FeedItem::Question {
            question: question_from_row(&row),
            answer_count: row.get("answer_count"),
        })
        .fetch_all(&self.connection)
        .await
        .map_err(db_error)?;

        let mut items: Vec<FeedItem> = documents.into_iter().chain(questions).collect();
        feed::sort_newest_first(&mut items);
        Ok(items)
    }

    async fn recent_verified_documents(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Document>, Error> {
        let sql = format!(
            "SELECT {} FROM documents
            WHERE status = 'Verified' AND created_at >= $1
            ORDER BY created_at DESC",
            DOCUMENT_COLUMNS
        );
        match sqlx::query(&sql)
            .bind(since)
            .map(|row: PgRow| document_from_row(&row))
            .fetch_all(&self.connection)
            .await
        {
            Ok(documents) => Ok(documents),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn recent_threads(&self, since: DateTime<Utc>) -> Result<Vec<QaThread>, Error> {
        // 질문마다 답변 정렬 기준과 같은 순서로 첫 번째 답변 하나만 붙인다.
        match sqlx::query(
            "SELECT q.id, q.title, q.content, q.tags, q.status, q.views, q.account_id, q.created_at,
                a.content AS answer_content,
                a.is_accepted AS answer_accepted,
                u.name AS answer_author_name,
                u.email AS answer_author_email
            FROM questions q
            LEFT JOIN LATERAL (
                SELECT content, is_accepted, account_id FROM answers
                WHERE corresponding_question = q.id
                ORDER BY is_accepted DESC, upvotes - downvotes DESC, created_at ASC
                LIMIT 1
            ) a ON TRUE
            LEFT JOIN accounts u ON u.id = a.account_id
            WHERE q.created_at >= $1
            ORDER BY q.created_at DESC",
        )
        .bind(since)
        .map(|row: PgRow| {
            let answer = row
                .get::<Option<String>, _>("answer_content")
                .map(|content| ThreadAnswer {
                    content,
                    is_accepted: row
                        .get::<Option<bool>, _>("answer_accepted")
                        .unwrap_or(false),
                    author_name: display_name(
                        row.get::<Option<String>, _>("answer_author_name").as_deref(),
                        &row
                            .get::<Option<String>, _>("answer_author_email")
                            .unwrap_or_default(),
                    ),
                });
            QaThread {
                question: question_from_row(&row),
                answer,
            }
        })
        .fetch_all(&self.connection)
        .await
        {
            Ok(threads) => Ok(threads),
            Err(error) => Err(db_error(error)),
        }
    }

    async fn apply_vote(
        &self,
        account_id: AccountId,
        answer_id: AnswerId,
        vote_type: VoteType,
    ) -> Result<VoteTally, Error> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        // 답변 행을 잠가서 같은 답변에 대한 투표가 차례로 처리되도록 한다.
        let locked = sqlx::query("SELECT id FROM answers WHERE id = $1 FOR UPDATE")
            .bind(answer_id.0)
            .fetch_optional(&mut tx)
            .await
            .map_err(db_error)?;
        if locked.is_none() {
            return Err(Error::NotFound(format!("Answer {}", answer_id.0)));
        }

        let existing = sqlx::query(
            "SELECT vote_type FROM votes WHERE account_id = $1 AND answer_id = $2",
        )
        .bind(account_id.0)
        .bind(answer_id.0)
        .map(|row: PgRow| row.get::<String, _>("vote_type"))
        .fetch_optional(&mut tx)
        .await
        .map_err(db_error)?;
        let existing = existing
            .map(|vote_type| vote_type.parse::<VoteType>())
            .transpose()?;

        let transition = VoteTransition::decide(existing, vote_type);
        match transition.resulting_vote() {
            None => {
                sqlx::query("DELETE FROM votes WHERE account_id = $1 AND answer_id = $2")
                    .bind(account_id.0)
                    .bind(answer_id.0)
                    .execute(&mut tx)
                    .await
                    .map_err(db_error)?;
            }
            Some(new_type) => {
                sqlx::query(
                    "INSERT INTO votes (account_id, answer_id, vote_type) VALUES ($1, $2, $3)
                    ON CONFLICT (account_id, answer_id) DO UPDATE SET vote_type = EXCLUDED.vote_type",
                )
                .bind(account_id.0)
                .bind(answer_id.0)
                .bind(new_type.as_str())
                .execute(&mut tx)
                .await
                .map_err(db_error)?;
            }
        }

        let (up, down) = transition.counter_deltas();
        let tally = sqlx::query(
            "UPDATE answers SET upvotes = upvotes + $1, downvotes = downvotes + $2
            WHERE id = $3
            RETURNING upvotes, downvotes",
        )
        .bind(up)
        .bind(down)
        .bind(answer_id.0)
        .map(|row: PgRow| VoteTally::new(row.get("upvotes"), row.get("downvotes")))
        .fetch_one(&mut tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(?transition, answer_id = answer_id.0, "vote applied");
        Ok(tally)
    }

    async fn toggle_star(
        &self,
        account_id: AccountId,
        item_type: ItemType,
        item_id: i32,
    ) -> Result<StarStatus, Error> {
        if !self.item_exists(item_type, item_id).await? {
            return Err(Error::NotFound(format!("{} {}", item_type.label(), item_id)));
        }

        // 지울 별표가 있었다면 해제, 없었다면 새로 단다.
        let removed = sqlx::query(
            "DELETE FROM stars WHERE account_id = $1 AND item_type = $2 AND item_id = $3",
        )
        .bind(account_id.0)
        .bind(item_type.as_str())
        .bind(item_id)
        .execute(&self.connection)
        .await
        .map_err(db_error)?
        .rows_affected();

        let starred = if removed > 0 {
            false
        } else {
            let inserted = sqlx::query(
                "INSERT INTO stars (account_id, item_type, item_id) VALUES ($1, $2, $3)",
            )
            .bind(account_id.0)
            .bind(item_type.as_str())
            .bind(item_id)
            .execute(&self.connection)
            .await
            .map(|_| ());
            star_insert_outcome(inserted)?
        };

        let star_count = sqlx::query(
            "SELECT COUNT(*) AS star_count FROM stars WHERE item_type = $1 AND item_id = $2",
        )
        .bind(item_type.as_str())
        .bind(item_id)
        .map(|row: PgRow| row.get::<i64, _>("star_count"))
        .fetch_one(&self.connection)
        .await
        .map_err(db_error)?;

        Ok(StarStatus {
            starred,
            star_count,
        })
    }

    async fn get_stars(&self, account_id: AccountId) -> Result<Vec<Star>, Error> {
        let rows = sqlx::query(
            "SELECT item_type, item_id, created_at FROM stars
            WHERE account_id = $1 ORDER BY created_at DESC",
        )
        .bind(account_id.0)
        .map(|row: PgRow| {
            (
                row.get::<String, _>("item_type"),
                row.get::<i32, _>("item_id"),
                row.get::<DateTime<Utc>, _>("created_at"),
            )
        })
        .fetch_all(&self.connection)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|(item_type, item_id, created_at)| -> Result<Star, Error> {
                Ok(Star {
                    account_id,
                    item_type: item_type.parse()?,
                    item_id,
                    created_at,
                })
            })
            .collect()
    }

    async fn toggle_acceptance(
        &self,
        caller: AccountId,
        answer_id: AnswerId,
    ) -> Result<AcceptanceStatus, Error> {
        let mut tx = self.connection.begin().await.map_err(db_error)?;

        let target = sqlx::query(
            "SELECT a.corresponding_question, q.account_id AS owner
            FROM answers a JOIN questions q ON q.id = a.corresponding_question
            WHERE a.id = $1",
        )
        .bind(answer_id.0)
        .map(|row: PgRow| (row.get::<i32, _>("corresponding_question"), row.get::<i32, _>("owner")))
        .fetch_optional(&mut tx)
        .await
        .map_err(db_error)?;

        let (question_id, owner) = match target {
            Some(target) => target,
            None => return Err(Error::NotFound(format!("Answer {}", answer_id.0))),
        };
        if owner != caller.0 {
            return Err(Error::Unauthorized);
        }

        // 같은 질문의 답변을 모두 잠근 뒤 현재 상태를 다시 읽는다.
        let siblings = sqlx::query(
            "SELECT id, is_accepted FROM answers
            WHERE corresponding_question = $1 ORDER BY id FOR UPDATE",
        )
        .bind(question_id)
        .map(|row: PgRow| (row.get::<i32, _>("id"), row.get::<bool, _>("is_accepted")))
        .fetch_all(&mut tx)
        .await
        .map_err(db_error)?;

        let currently_accepted = siblings
            .iter()
            .find(|(id, _)| *id == answer_id.0)
            .map(|(_, accepted)| *accepted)
            .ok_or_else(|| Error::NotFound(format!("Answer {}", answer_id.0)))?;
        let is_accepted = voting::toggled_acceptance(currently_accepted);

        sqlx::query(
            "UPDATE answers SET is_accepted = FALSE
            WHERE corresponding_question = $1 AND id <> $2",
        )
        .bind(question_id)
        .bind(answer_id.0)
        .execute(&mut tx)
        .await
        .map_err(db_error)?;

        sqlx::query("UPDATE answers SET is_accepted = $1 WHERE id = $2")
            .bind(is_accepted)
            .bind(answer_id.0)
            .execute(&mut tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(AcceptanceStatus { is_accepted })
    }
}
