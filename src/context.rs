use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{Level, event, instrument};

use handle_errors::Error;

use crate::store::Store;
use crate::types::document::Document;
use crate::types::question::QaThread;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const NO_DATA: &str = "No recent documents or questions found in the database.";
pub const STORE_UNAVAILABLE: &str = "Error: Could not fetch data from the database.";
pub const DOCUMENTS_HEADER: &str = "=== AVAILABLE DOCUMENTS ===";
pub const QA_HEADER: &str = "=== RECENT Q&A ===";
pub const NO_ANSWER: &str = "No answer yet";
const TRUNCATION_MARKER: &str = "\n[context truncated]";

/// 문맥을 만들 때 읽는 두 가지 데이터. 저장소 전체 대신 이 두 조회만 요구한다.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn verified_documents_since(&self, since: DateTime<Utc>) -> Result<Vec<Document>, Error>;
    async fn threads_since(&self, since: DateTime<Utc>) -> Result<Vec<QaThread>, Error>;
}

#[async_trait]
impl ContextSource for Store {
    async fn verified_documents_since(&self, since: DateTime<Utc>) -> Result<Vec<Document>, Error> {
        self.recent_verified_documents(since).await
    }

    async fn threads_since(&self, since: DateTime<Utc>) -> Result<Vec<QaThread>, Error> {
        self.recent_threads(since).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub text: String,
    pub document_links: Vec<DocumentLink>,
}

impl AssembledContext {
    fn sentinel(text: &str) -> Self {
        AssembledContext {
            text: text.to_string(),
            document_links: Vec::new(),
        }
    }
}

/// 최근 검증 문서와 최근 질문/답변을 채팅 프롬프트에 넣을 글 덩어리로 만든다.
#[derive(Clone)]
pub struct ContextAssembler {
    source: Arc<dyn ContextSource>,
    window_days: i64,
    max_chars: usize,
}

impl std::fmt::Debug for ContextAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ContextAssembler")
            .field("window_days", &self.window_days)
            .field("max_chars", &self.max_chars)
            .finish()
    }
}

impl ContextAssembler {
    pub fn new(source: Arc<dyn ContextSource>, window_days: i64, max_chars: usize) -> Self {
        ContextAssembler {
            source,
            window_days,
            max_chars,
        }
    }

    pub async fn assemble_context(&self) -> String {
        self.gather(Utc::now()).await.text
    }

    /// 저장소 에러는 밖으로 내보내지 않고 고정 문구로 바꾼다.
    #[instrument(skip(self))]
    pub async fn gather(&self, now: DateTime<Utc>) -> AssembledContext {
        let since = now - Duration::days(self.window_days);
        let fetched = tokio::try_join!(
            self.source.verified_documents_since(since),
            self.source.threads_since(since)
        );
        let (documents, threads) = match fetched {
            Ok(rows) => rows,
            Err(e) => {
                event!(Level::ERROR, "Cannot assemble chat context: {}", e);
                return AssembledContext::sentinel(STORE_UNAVAILABLE);
            }
        };

        if documents.is_empty() && threads.is_empty() {
            return AssembledContext::sentinel(NO_DATA);
        }

        let document_links = documents
            .iter()
            .map(|d| DocumentLink {
                title: d.title.clone(),
                link: format!("/documents/{}", d.id.0),
            })
            .collect();

        let text = truncate_chars(render(&documents, &threads), self.max_chars);
        event!(
            Level::DEBUG,
            documents = documents.len(),
            threads = threads.len(),
            chars = text.chars().count(),
            "assembled chat context"
        );
        AssembledContext {
            text,
            document_links,
        }
    }
}

fn render(documents: &[Document], threads: &[QaThread]) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !documents.is_empty() {
        sections.push(format!("\n{}", DOCUMENTS_HEADER));
        for document in documents {
            sections.push(format!(
                "Document: {}\nDescription: {}\nFile: {}",
                document.title,
                document.description.as_deref().unwrap_or("No description"),
                document.file_path.as_deref().unwrap_or("No file attached"),
            ));
        }
    }

    if !threads.is_empty() {
        sections.push(format!("\n{}", QA_HEADER));
        for thread in threads {
            let (answer, answered_by) = match &thread.answer {
                Some(answer) => (
                    answer.content.as_str(),
                    format!(
                        "Answered by: {}{}",
                        answer.author_name,
                        if answer.is_accepted { " (accepted)" } else { "" }
                    ),
                ),
                None => (NO_ANSWER, "No answers yet".to_string()),
            };
            sections.push(format!(
                "\nQ: {}\nDetails: {}\nA: {}\n{}",
                thread.question.title, thread.question.content, answer, answered_by
            ));
        }
    }

    sections.join("\n")
}

/// 문자 경계에서 자르고 잘렸다는 표시를 붙인다.
fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut truncated = text[..cut].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text,
    }
}
