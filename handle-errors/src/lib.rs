use argon2::Error as ArgonError;
use warp::{
    Rejection, Reply,
    filters::{body::BodyDeserializeError, cors::CorsForbidden},
    http::StatusCode,
    reject::Reject,
};

use reqwest::Error as ReqwestError;
use reqwest_middleware::Error as MiddlewareReqwestError;

use tracing::{Level, event, instrument};

#[derive(Debug)]
pub enum Error {
    ParseError(std::num::ParseIntError),
    MissingParameters,
    WrongPassword,
    MissingToken,
    CannotDecryptToken,
    CannotEncryptToken,
    Unauthorized,
    NotFound(String),
    InvalidVoteType(String),
    InvalidItemType(String),
    InvalidStatus(String),
    InvalidRole(String),
    InvalidEmailDomain(String),
    PasswordTooShort,
    AccountAlreadyExists,
    EmptyMessage,
    ArgonLibraryError(ArgonError),
    DatabaseQueryError(sqlx::Error),
    ReqwestAPIError(ReqwestError),
    MiddlewareReqwestAPIError(MiddlewareReqwestError),
    ClientError(ExternalApiError), // 외부 API가 4xx를 돌려준 경우
    ServerError(ExternalApiError), // 외부 API가 5xx를 돌려준 경우
    CompletionTimeout(u64),
}

#[derive(Debug, Clone)]
pub struct ExternalApiError {
    pub status: u16,
    pub message: String,
}

impl std::fmt::Display for ExternalApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Status: {}, Message: {}", self.status, self.message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &*self {
            Error::ParseError(err) => {
                write!(f, "Cannot parse parameter: {}", err)
            }
            Error::MissingParameters => {
                write!(f, "Missing parameters")
            }
            Error::WrongPassword => {
                write!(f, "Wrong password")
            }
            Error::MissingToken => {
                write!(f, "Not logged in")
            }
            Error::CannotDecryptToken => {
                write!(f, "Cannot decrypt token")
            }
            Error::CannotEncryptToken => {
                write!(f, "Cannot issue token")
            }
            Error::Unauthorized => {
                write!(f, "No permission to change the underlying resource")
            }
            Error::NotFound(what) => {
                write!(f, "{} not found", what)
            }
            Error::InvalidVoteType(vote_type) => {
                write!(f, "Invalid vote type: {}", vote_type)
            }
            Error::InvalidItemType(item_type) => {
                write!(f, "Invalid item type: {}", item_type)
            }
            Error::InvalidStatus(status) => {
                write!(f, "Invalid document status: {}", status)
            }
            Error::InvalidRole(role) => {
                write!(f, "Invalid account role: {}", role)
            }
            Error::InvalidEmailDomain(domain) => {
                write!(f, "Please use your {} email address", domain)
            }
            Error::PasswordTooShort => {
                write!(f, "Password must be at least 8 characters long")
            }
            Error::AccountAlreadyExists => {
                write!(f, "Account already exists")
            }
            Error::EmptyMessage => {
                write!(f, "Message is required")
            }
            Error::ArgonLibraryError(_) => {
                write!(f, "Cannot verify password")
            }
            Error::DatabaseQueryError(_) => {
                write!(f, "Cannot update, invalid data.")
            }
            Error::ReqwestAPIError(err) => {
                write!(f, "External API error: {}", err)
            }
            Error::MiddlewareReqwestAPIError(err) => {
                write!(f, "External API error: {}", err)
            }
            Error::ClientError(err) => {
                write!(f, "External Client error: {}", err)
            }
            Error::ServerError(err) => {
                write!(f, "External Server error: {}", err)
            }
            Error::CompletionTimeout(secs) => {
                write!(f, "Completion service did not answer within {} seconds", secs)
            }
        }
    }
}

impl Reject for Error {}
impl Reject for ExternalApiError {}

const DUPLICATE_KEY: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(err) => err.code().as_deref() == Some(DUPLICATE_KEY),
        _ => false,
    }
}

/// 같은 요청을 다시 보내면 성공할 수 있는 저장소 에러인지 알려준다.
/// 풀 대기 시간 초과, 연결 끊김, 직렬화 실패, 교착 상태가 여기에 해당한다.
fn is_transient_db_error(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(err) => matches!(
            err.code().as_deref(),
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) | Some(LOCK_NOT_AVAILABLE)
        ),
        _ => false,
    }
}

impl Error {
    /// 클라이언트에게 돌려줄 상태 코드와 문구.
    /// 5xx 계열은 내부 사정을 감추고 고정 문구만 내보낸다.
    pub fn response_parts(&self) -> (StatusCode, String) {
        match self {
            Error::DatabaseQueryError(e) if is_transient_db_error(e) => (
                // 트랜잭션은 이미 롤백되었으므로 클라이언트가 그대로 재시도하면 된다.
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage temporarily unavailable, please retry".to_string(),
            ),
            Error::DatabaseQueryError(e) if is_unique_violation(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Account already exists".to_string(),
            ),
            Error::DatabaseQueryError(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Cannot update data".to_string(),
            ),
            Error::AccountAlreadyExists => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            Error::MissingToken | Error::CannotDecryptToken => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            Error::WrongPassword => (
                StatusCode::UNAUTHORIZED,
                "Wrong E-Mail/Password combination".to_string(),
            ),
            Error::Unauthorized => (StatusCode::FORBIDDEN, self.to_string()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::InvalidVoteType(_)
            | Error::InvalidItemType(_)
            | Error::InvalidStatus(_)
            | Error::InvalidRole(_)
            | Error::InvalidEmailDomain(_)
            | Error::PasswordTooShort
            | Error::EmptyMessage
            | Error::ParseError(_)
            | Error::MissingParameters => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::CannotEncryptToken
            | Error::ArgonLibraryError(_)
            | Error::ReqwestAPIError(_)
            | Error::MiddlewareReqwestAPIError(_)
            | Error::ClientError(_)
            | Error::ServerError(_)
            | Error::CompletionTimeout(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
        }
    }
}

#[instrument]
pub async fn return_error(r: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(error) = r.find::<Error>() {
        let (status, message) = error.response_parts();
        if status.is_server_error() {
            event!(Level::ERROR, "{:?}", error);
        } else {
            event!(Level::INFO, status = status.as_u16(), "{}", error);
        }
        Ok(warp::reply::with_status(message, status))
    } else if let Some(error) = r.find::<CorsForbidden>() {
        event!(Level::ERROR, "CORS forbidden error: {}", error);
        Ok(warp::reply::with_status(
            error.to_string(),
            StatusCode::FORBIDDEN,
        ))
    } else if let Some(error) = r.find::<BodyDeserializeError>() {
        event!(Level::ERROR, "Cannot deserialize request body: {}", error);
        Ok(warp::reply::with_status(
            error.to_string(),
            StatusCode::UNPROCESSABLE_ENTITY,
        ))
    } else {
        event!(Level::WARN, "Requested route was not found");
        Ok(warp::reply::with_status(
            "Route not found".to_string(),
            StatusCode::NOT_FOUND,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_their_status() {
        let cases = [
            (Error::MissingToken, StatusCode::UNAUTHORIZED),
            (Error::Unauthorized, StatusCode::FORBIDDEN),
            (Error::NotFound("Answer 3".to_string()), StatusCode::NOT_FOUND),
            (Error::InvalidVoteType("sideways".to_string()), StatusCode::BAD_REQUEST),
            (Error::EmptyMessage, StatusCode::BAD_REQUEST),
            (Error::AccountAlreadyExists, StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (error, status) in cases {
            assert_eq!(error.response_parts().0, status, "{}", error);
        }
    }

    /// SQLSTATE 코드만 가진 데이터베이스 에러
    #[derive(Debug)]
    struct SqlState(&'static str);

    impl std::fmt::Display for SqlState {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for SqlState {}

    impl sqlx::error::DatabaseError for SqlState {
        fn message(&self) -> &str {
            self.0
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(std::borrow::Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(SqlState(code)))
    }

    #[test]
    fn pool_timeout_and_deadlock_are_retryable() {
        let error = Error::DatabaseQueryError(sqlx::Error::PoolTimedOut);
        assert_eq!(error.response_parts().0, StatusCode::SERVICE_UNAVAILABLE);

        let error = Error::DatabaseQueryError(db_error(DEADLOCK_DETECTED));
        assert_eq!(error.response_parts().0, StatusCode::SERVICE_UNAVAILABLE);

        let error = Error::DatabaseQueryError(sqlx::Error::RowNotFound);
        assert_eq!(error.response_parts().0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn duplicate_key_is_a_unique_violation() {
        assert!(is_unique_violation(&db_error(DUPLICATE_KEY)));
        assert!(!is_unique_violation(&db_error(SERIALIZATION_FAILURE)));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));

        let error = Error::DatabaseQueryError(db_error(DUPLICATE_KEY));
        assert_eq!(
            error.response_parts(),
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Account already exists".to_string()
            )
        );
    }

    #[test]
    fn unknown_role_is_a_bad_request() {
        let error = Error::InvalidRole("janitor".to_string());
        assert_eq!(
            error.response_parts(),
            (
                StatusCode::BAD_REQUEST,
                "Invalid account role: janitor".to_string()
            )
        );
    }

    #[test]
    fn external_failures_hide_details() {
        let error = Error::ServerError(ExternalApiError {
            status: 503,
            message: "upstream secret".to_string(),
        });
        assert_eq!(
            error.response_parts(),
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string()
            )
        );
    }
}
