#![warn(clippy::all)]

use handle_errors::return_error;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use warp::{Filter, http::Method};

mod chat;
mod completion;
mod config;
mod context;
mod ranking;
mod routes;
mod store;
mod types;
mod voting;

use crate::chat::{ChatOrchestrator, ChatSettings, InMemorySessionStore};
use crate::completion::GeminiClient;
use crate::config::Backend;
use crate::context::ContextAssembler;
use crate::routes::authentication::TokenKey;
use crate::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() {
    let config = crate::config::Config::new().expect("Config can't be set");

    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!(
            "campus_qa={},handle_errors={},warp=error",
            config.log_level, config.log_level
        )
    });
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        // 각 범위가 닫힐 때 이벤트를 기록한다.
        .with_span_events(FmtSpan::CLOSE)
        .init();

    if config.uses_development_key() {
        tracing::warn!("paseto_key is the built-in development key");
    }

    let store: Store = match config.backend {
        Backend::Postgres => {
            let store = PgStore::new(&config.database_url, config.db_max_connections).await;
            sqlx::migrate!()
                .run(&store.connection)
                .await
                .expect("Cannot run migration");
            Arc::new(store)
        }
        Backend::Memory => {
            tracing::warn!("using the in-memory store, data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let completion = GeminiClient::new(
        &config.completion_url,
        &config.completion_model,
        config.completion_api_key.clone(),
        std::time::Duration::from_secs(config.completion_timeout_secs),
    )
    .expect("Cannot build completion client");
    if config.completion_api_key.is_none() {
        tracing::warn!("completion_api_key is not set, chat answers will report an error");
    }

    let assembler = ContextAssembler::new(
        Arc::new(store.clone()),
        config.context_window_days,
        config.context_max_chars,
    );
    let chat = Arc::new(ChatOrchestrator::new(
        Arc::new(InMemorySessionStore::new()),
        assembler,
        Arc::new(completion),
        ChatSettings {
            history_limit: config.chat_history_limit,
            session_ttl: chrono::Duration::seconds(config.chat_session_ttl_secs),
            completion_timeout: std::time::Duration::from_secs(config.completion_timeout_secs),
        },
    ));

    let routes = build_routes(
        store,
        chat,
        TokenKey::new(&config.paseto_key),
        config.institution_domain.clone(),
    );

    tracing::info!("campus_qa listening on port {}", config.port);
    warp::serve(routes).run(([0, 0, 0, 0], config.port)).await;
}

fn build_routes(
    store: Store,
    chat: Arc<ChatOrchestrator>,
    key: TokenKey,
    institution_domain: String,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let store_filter = warp::any().map(move || store.clone());
    let chat_filter = warp::any().map(move || chat.clone());
    let key_filter = {
        let key = key.clone();
        warp::any().map(move || key.clone())
    };
    let domain_filter = warp::any().map(move || institution_domain.clone());
    let auth = routes::authentication::auth(key);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_header("Content-Type")
        .allow_header("Authorization")
        .allow_methods(&[Method::PUT, Method::DELETE, Method::POST, Method::GET]);

    let registration = warp::post()
        .and(warp::path("registration"))
        .and(warp::path::end())
        .and(domain_filter)
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(routes::authentication::register);

    let login = warp::post()
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(key_filter)
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(routes::authentication::login);

    let get_questions = warp::get()
        .and(warp::path("questions"))
        .and(warp::path::end())
        .and(warp::query())
        .and(store_filter.clone())
        .and_then(routes::question::get_questions)
        .with(warp::trace(|info| {
            tracing::info_span!(
                "get_questions request",
                method = %info.method(),
                path = %info.path(),
                id = %uuid::Uuid::new_v4(),
            )
        }));

    let get_question = warp::get()
        .and(warp::path("questions"))
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::question::get_question);

    let add_question = warp::post()
        .and(warp::path("questions"))
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(routes::question::add_question);

    let update_question = warp::put()
        .and(warp::path("questions"))
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(routes::question::update_question);

    let delete_question = warp::delete()
        .and(warp::path("questions"))
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::question::delete_question);

    let add_answer = warp::post()
        .and(warp::path("answers"))
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and(warp::body::form())
        .and_then(routes::answer::add_answer);

    let vote = warp::post()
        .and(warp::path!("answers" / i32 / "vote"))
        .and(auth.clone())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(routes::vote::vote)
        .with(warp::trace(|info| {
            tracing::info_span!(
                "vote request",
                path = %info.path(),
                id = %uuid::Uuid::new_v4(),
            )
        }));

    let accept_answer = warp::post()
        .and(warp::path!("answers" / i32 / "accept"))
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::vote::accept_answer);

    let toggle_star = warp::post()
        .and(warp::path!("stars" / String / i32))
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::star::toggle_star);

    let get_stars = warp::get()
        .and(warp::path("stars"))
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::star::get_stars);

    let add_document = warp::post()
        .and(warp::path("documents"))
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(routes::document::add_document);

    let get_document = warp::get()
        .and(warp::path("documents"))
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::document::get_document);

    let update_document_status = warp::put()
        .and(warp::path!("documents" / i32 / "status"))
        .and(auth.clone())
        .and(store_filter.clone())
        .and(warp::body::json())
        .and_then(routes::document::update_document_status);

    let feed = warp::get()
        .and(warp::path("feed"))
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::feed::get_feed);

    let search = warp::get()
        .and(warp::path("search"))
        .and(warp::path::end())
        .and(warp::query())
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::feed::search);

    let get_profile = warp::get()
        .and(warp::path("profile"))
        .and(warp::path::param::<i32>())
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter.clone())
        .and_then(routes::profile::get_profile);

    let update_profile = warp::put()
        .and(warp::path("profile"))
        .and(warp::path::end())
        .and(auth.clone())
        .and(store_filter)
        .and(warp::body::json())
        .and_then(routes::profile::update_profile);

    let chat = warp::post()
        .and(warp::path("chat"))
        .and(warp::path::end())
        .and(auth)
        .and(warp::cookie::optional::<String>("chat_session"))
        .and(chat_filter)
        .and(warp::body::json())
        .and_then(routes::chat::chat)
        .with(warp::trace(|info| {
            tracing::info_span!(
                "chat request",
                path = %info.path(),
                id = %uuid::Uuid::new_v4(),
            )
        }));

    get_questions
        .or(get_question)
        .or(add_question)
        .or(update_question)
        .or(delete_question)
        .or(add_answer)
        .or(vote)
        .or(accept_answer)
        .or(toggle_star)
        .or(get_stars)
        .or(add_document)
        .or(get_document)
        .or(update_document_status)
        .or(feed)
        .or(search)
        .or(get_profile)
        .or(update_profile)
        .or(chat)
        .or(registration)
        .or(login)
        .with(cors)
        .with(warp::trace::request())
        .recover(return_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionService;
    use crate::config::DEVELOPMENT_PASETO_KEY;
    use crate::context::DEFAULT_WINDOW_DAYS;
    use crate::routes::authentication::issue_token;
    use crate::store::ContentStore;
    use crate::types::account::AccountId;
    use crate::types::answer::NewAnswer;
    use crate::types::question::NewQuestion;
    use async_trait::async_trait;
    use handle_errors::Error;
    use warp::http::StatusCode;

    #[derive(Debug)]
    struct EchoCompletion;

    #[async_trait]
    impl CompletionService for EchoCompletion {
        async fn complete(&self, _prompt: &str) -> Result<Option<String>, Error> {
            Ok(Some("echo".to_string()))
        }
    }

    /// 받은 프롬프트를 모두 남기는 가짜 모델
    #[derive(Debug, Default)]
    struct RecordingCompletion {
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingCompletion {
        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionService for RecordingCompletion {
        async fn complete(&self, prompt: &str) -> Result<Option<String>, Error> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(Some("noted".to_string()))
        }
    }

    fn app_routes(
        store: MemoryStore,
        key: TokenKey,
        completion: Arc<dyn CompletionService>,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let store: Store = Arc::new(store);
        let assembler =
            ContextAssembler::new(Arc::new(store.clone()), DEFAULT_WINDOW_DAYS, 12_000);
        let chat = Arc::new(ChatOrchestrator::new(
            Arc::new(InMemorySessionStore::new()),
            assembler,
            completion,
            ChatSettings::default(),
        ));
        build_routes(store, chat, key, "university.edu".to_string())
    }

    /// 모델은 항상 "echo"로 답한다.
    fn echo_routes(
        store: MemoryStore,
        key: TokenKey,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        app_routes(store, key, Arc::new(EchoCompletion))
    }

    struct Harness {
        store: MemoryStore,
        key: TokenKey,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                store: MemoryStore::new(),
                key: TokenKey::new(DEVELOPMENT_PASETO_KEY),
            }
        }

        fn token(&self, account_id: i32) -> String {
            issue_token(&self.key, AccountId(account_id)).unwrap()
        }

        /// 계정 1이 만든 질문에 계정 2가 답을 단다.
        async fn answered_question(&self) -> (i32, i32) {
            let question = self
                .store
                .add_question(
                    NewQuestion {
                        title: "Exam date?".to_string(),
                        content: "When is the midterm?".to_string(),
                        tags: None,
                    },
                    AccountId(1),
                )
                .await
                .unwrap();
            let answer = self
                .store
                .add_answer(
                    NewAnswer {
                        content: "Next week".to_string(),
                        question_id: question.id,
                    },
                    AccountId(2),
                )
                .await
                .unwrap();
            (question.id.0, answer.id.0)
        }
    }

    #[tokio::test]
    async fn vote_requires_token() {
        let harness = Harness::new();
        let (_, answer_id) = harness.answered_question().await;

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/answers/{}/vote", answer_id))
            .json(&serde_json::json!({ "vote_type": "up" }))
            .reply(&echo_routes(harness.store.clone(), harness.key.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn vote_rejects_unknown_vote_type() {
        let harness = Harness::new();
        let (_, answer_id) = harness.answered_question().await;

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/answers/{}/vote", answer_id))
            .header("Authorization", harness.token(3))
            .json(&serde_json::json!({ "vote_type": "sideways" }))
            .reply(&echo_routes(harness.store.clone(), harness.key.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn vote_returns_tally() {
        let harness = Harness::new();
        let (_, answer_id) = harness.answered_question().await;

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/answers/{}/vote", answer_id))
            .header("Authorization", harness.token(3))
            .json(&serde_json::json!({ "vote_type": "down" }))
            .reply(&echo_routes(harness.store.clone(), harness.key.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "upvotes": 0, "downvotes": 1, "score": -1 })
        );
    }

    #[tokio::test]
    async fn vote_on_missing_answer_is_not_found() {
        let harness = Harness::new();
        let res = warp::test::request()
            .method("POST")
            .path("/answers/999/vote")
            .header("Authorization", harness.token(3))
            .json(&serde_json::json!({ "vote_type": "up" }))
            .reply(&echo_routes(harness.store.clone(), harness.key.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn only_question_author_can_accept() {
        let harness = Harness::new();
        let (_, answer_id) = harness.answered_question().await;
        let routes = echo_routes(harness.store.clone(), harness.key.clone());

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/answers/{}/accept", answer_id))
            .header("Authorization", harness.token(2))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = warp::test::request()
            .method("POST")
            .path(&format!("/answers/{}/accept", answer_id))
            .header("Authorization", harness.token(1))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body, serde_json::json!({ "is_accepted": true }));
    }

    #[tokio::test]
    async fn star_rejects_unknown_item_type_and_missing_item() {
        let harness = Harness::new();
        let routes = echo_routes(harness.store.clone(), harness.key.clone());

        let res = warp::test::request()
            .method("POST")
            .path("/stars/video/1")
            .header("Authorization", harness.token(1))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = warp::test::request()
            .method("POST")
            .path("/stars/document/42")
            .header("Authorization", harness.token(1))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_rejects_empty_message_and_answers_otherwise() {
        let harness = Harness::new();
        let routes = echo_routes(harness.store.clone(), harness.key.clone());

        let res = warp::test::request()
            .method("POST")
            .path("/chat")
            .header("Authorization", harness.token(1))
            .json(&serde_json::json!({ "message": "   " }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = warp::test::request()
            .method("POST")
            .path("/chat")
            .json(&serde_json::json!({ "message": "hello" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = warp::test::request()
            .method("POST")
            .path("/chat")
            .header("Authorization", harness.token(1))
            .header("Cookie", "chat_session=abc")
            .json(&serde_json::json!({ "message": "hello" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body, serde_json::json!({ "response": "echo" }));
    }

    #[tokio::test]
    async fn registration_enforces_domain_and_login_issues_token() {
        let harness = Harness::new();
        let routes = echo_routes(harness.store.clone(), harness.key.clone());

        let res = warp::test::request()
            .method("POST")
            .path("/registration")
            .json(&serde_json::json!({ "email": "kim@gmail.com", "password": "long enough" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = warp::test::request()
            .method("POST")
            .path("/registration")
            .json(&serde_json::json!({ "email": "kim@university.edu", "password": "short" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = warp::test::request()
            .method("POST")
            .path("/registration")
            .json(&serde_json::json!({ "email": "Kim@University.edu", "password": "long enough" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = warp::test::request()
            .method("POST")
            .path("/login")
            .json(&serde_json::json!({ "email": "kim@university.edu", "password": "wrong password" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = warp::test::request()
            .method("POST")
            .path("/login")
            .json(&serde_json::json!({ "email": "kim@university.edu", "password": "long enough" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let token: String = serde_json::from_slice(res.body()).unwrap();

        let res = warp::test::request()
            .method("GET")
            .path("/feed")
            .header("Authorization", token)
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn question_detail_lists_ranked_answers_with_own_vote() {
        let harness = Harness::new();
        let (question_id, answer_id) = harness.answered_question().await;
        harness
            .store
            .apply_vote(
                AccountId(3),
                crate::types::answer::AnswerId(answer_id),
                crate::types::vote::VoteType::Up,
            )
            .await
            .unwrap();

        let res = warp::test::request()
            .method("GET")
            .path(&format!("/questions/{}", question_id))
            .header("Authorization", harness.token(3))
            .reply(&echo_routes(harness.store.clone(), harness.key.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["question"]["views"], 1);
        assert_eq!(body["answers"][0]["score"], 1);
        assert_eq!(body["answers"][0]["user_vote"], "up");
    }

    #[tokio::test]
    async fn malformed_vote_body_is_bad_request() {
        let harness = Harness::new();
        let (_, answer_id) = harness.answered_question().await;
        let routes = echo_routes(harness.store.clone(), harness.key.clone());

        for body in [
            serde_json::json!({ "vote_type": 5 }),
            serde_json::json!({}),
        ] {
            let res = warp::test::request()
                .method("POST")
                .path(&format!("/answers/{}/vote", answer_id))
                .header("Authorization", harness.token(3))
                .json(&body)
                .reply(&routes)
                .await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", body);
        }
    }

    #[tokio::test]
    async fn chat_history_is_private_to_each_account() {
        let harness = Harness::new();
        let completion = Arc::new(RecordingCompletion::default());
        let routes = app_routes(
            harness.store.clone(),
            harness.key.clone(),
            completion.clone(),
        );

        let send = |account_id: i32, cookie: Option<&str>, message: &str| {
            let mut request = warp::test::request()
                .method("POST")
                .path("/chat")
                .header("Authorization", harness.token(account_id))
                .json(&serde_json::json!({ "message": message }));
            if let Some(cookie) = cookie {
                request = request.header("Cookie", format!("chat_session={}", cookie));
            }
            request
        };

        let res = send(7, None, "my password hint is TURTLE").reply(&routes).await;
        assert_eq!(res.status(), StatusCode::OK);

        // 다른 계정의 기본 세션 키를 쿠키로 보내도 그 대화를 볼 수 없다.
        send(1, Some("account:7"), "what was my hint?")
            .reply(&routes)
            .await;
        assert!(!completion.last_prompt().contains("TURTLE"));

        send(1, Some("abc"), "my locker is 42").reply(&routes).await;
        send(2, Some("abc"), "hello").reply(&routes).await;
        assert!(!completion.last_prompt().contains("my locker is 42"));

        send(1, Some("abc"), "which locker?").reply(&routes).await;
        assert!(completion.last_prompt().contains("User: my locker is 42"));
    }

    #[tokio::test]
    async fn profile_shows_activity_and_accepts_edits() {
        let harness = Harness::new();
        let account = harness
            .store
            .add_account(crate::types::account::Account {
                id: None,
                email: "choi@university.edu".to_string(),
                password: "hash".to_string(),
                role: crate::types::account::Role::Student,
                name: None,
                bio: None,
                created_at: None,
            })
            .await
            .unwrap();
        let account_id = account.id.unwrap().0;
        harness
            .store
            .add_question(
                NewQuestion {
                    title: "Lab hours?".to_string(),
                    content: "When is the lab open?".to_string(),
                    tags: None,
                },
                AccountId(account_id),
            )
            .await
            .unwrap();
        let routes = echo_routes(harness.store.clone(), harness.key.clone());

        let res = warp::test::request()
            .method("PUT")
            .path("/profile")
            .json(&serde_json::json!({ "name": "Choi" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = warp::test::request()
            .method("PUT")
            .path("/profile")
            .header("Authorization", harness.token(account_id))
            .json(&serde_json::json!({ "name": "  Choi ", "bio": "Chemistry, year 2" }))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["name"], "Choi");
        assert!(body.get("password").is_none());

        let res = warp::test::request()
            .method("GET")
            .path(&format!("/profile/{}", account_id))
            .header("Authorization", harness.token(99))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["account"]["bio"], "Chemistry, year 2");
        assert_eq!(body["questions"][0]["title"], "Lab hours?");
        assert_eq!(
            body["stats"],
            serde_json::json!({ "documents": 0, "questions": 1, "answers": 0 })
        );

        let res = warp::test::request()
            .method("GET")
            .path("/profile/999")
            .header("Authorization", harness.token(99))
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn questions_list_honours_pagination() {
        let harness = Harness::new();
        harness.answered_question().await;
        harness.answered_question().await;
        let routes = echo_routes(harness.store.clone(), harness.key.clone());

        let res = warp::test::request()
            .method("GET")
            .path("/questions")
            .reply(&routes)
            .await;
        let all: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);

        let res = warp::test::request()
            .method("GET")
            .path("/questions?limit=1&offset=1")
            .reply(&routes)
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let page: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(page.as_array().unwrap().len(), 1);
        assert_eq!(page[0]["id"], all[1]["id"]);
    }
}
