use std::sync::Arc;
use tracing::instrument;

use handle_errors::Error;

use crate::chat::ChatOrchestrator;
use crate::types::account::Session;
use crate::types::chat::{ChatRequest, ChatResponse};

/// 채팅 세션 키. 항상 로그인한 계정 id가 앞에 붙는다.
/// `chat_session` 쿠키가 있으면 계정 안에서 대화를 다시 나눈다.
fn session_key(cookie: Option<String>, session: &Session) -> String {
    match cookie {
        Some(cookie) if !cookie.trim().is_empty() => {
            format!("account:{}:{}", session.account_id.0, cookie)
        }
        _ => format!("account:{}", session.account_id.0),
    }
}

/// 모델 호출이 실패해도 200으로 답한다. 실패 내용은 응답 본문에 담긴다.
#[instrument(skip(chat, request))]
pub async fn chat(
    session: Session,
    cookie: Option<String>,
    chat: Arc<ChatOrchestrator>,
    request: ChatRequest,
) -> Result<impl warp::Reply, warp::Rejection> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(warp::reject::custom(Error::EmptyMessage));
    }

    let key = session_key(cookie, &session);
    let response = chat.respond(&key, message).await;
    Ok(warp::reply::json(&ChatResponse { response }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::account::AccountId;
    use chrono::Utc;

    fn session(account_id: i32) -> Session {
        Session {
            exp: Utc::now(),
            account_id: AccountId(account_id),
            nbf: Utc::now(),
        }
    }

    #[test]
    fn session_key_is_scoped_to_account() {
        assert_eq!(session_key(Some("abc".to_string()), &session(7)), "account:7:abc");
        assert_eq!(session_key(Some(" ".to_string()), &session(7)), "account:7");
        assert_eq!(session_key(None, &session(7)), "account:7");

        assert_ne!(
            session_key(Some("abc".to_string()), &session(1)),
            session_key(Some("abc".to_string()), &session(2))
        );
        // 다른 계정의 키를 쿠키로 보내도 그 계정의 대화가 되지 않는다.
        assert_ne!(
            session_key(Some("account:7".to_string()), &session(1)),
            session_key(None, &session(7))
        );
    }
}
