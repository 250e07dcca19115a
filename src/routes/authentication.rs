use argon2::{self, Config};
use chrono::prelude::*;
use rand::Rng;
use std::future;
use std::sync::Arc;
use tracing::{Level, event, instrument};
use warp::Filter;
use warp::http::StatusCode;

use handle_errors::Error;

use crate::store::Store;
use crate::types::account::{Account, AccountId, Login, Registration, Role, Session};

const MIN_PASSWORD_LEN: usize = 8;

/// PASETO v2.local 대칭 키
#[derive(Clone)]
pub struct TokenKey(Arc<[u8]>);

impl TokenKey {
    pub fn new(key: &str) -> Self {
        TokenKey(Arc::from(key.as_bytes()))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "TokenKey(***)")
    }
}

pub fn verify_token(key: &TokenKey, token: &str) -> Result<Session, Error> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token);
    let token = paseto::tokens::validate_local_token(
        token,
        None,
        key.as_bytes(),
        &paseto::tokens::TimeBackend::Chrono,
    )
    .map_err(|_| Error::CannotDecryptToken)?;

    serde_json::from_value::<Session>(token).map_err(|_| Error::CannotDecryptToken)
}

#[instrument(skip(store, registration), fields(email = %registration.email))]
pub async fn register(
    domain: String,
    store: Store,
    registration: Registration,
) -> Result<impl warp::Reply, warp::Rejection> {
    let email = registration.email.trim().to_lowercase();
    if !email.ends_with(&format!("@{}", domain.to_lowercase())) {
        return Err(warp::reject::custom(Error::InvalidEmailDomain(domain)));
    }
    if registration.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(warp::reject::custom(Error::PasswordTooShort));
    }

    let account = Account {
        id: None,
        email,
        password: hash_password(registration.password.as_bytes())?,
        role: Role::Student,
        name: registration.name.filter(|name| !name.trim().is_empty()),
        bio: None,
        created_at: None,
    };

    match store.add_account(account).await {
        Ok(_) => Ok(warp::reply::with_status("Account added", StatusCode::OK)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

pub fn hash_password(password: &[u8]) -> Result<String, Error> {
    let salt = rand::thread_rng().r#gen::<[u8; 32]>();
    let config = Config::default();
    argon2::hash_encoded(password, &salt, &config).map_err(Error::ArgonLibraryError)
}

#[instrument(skip(key, store, login), fields(email = %login.email))]
pub async fn login(
    key: TokenKey,
    store: Store,
    login: Login,
) -> Result<impl warp::Reply, warp::Rejection> {
    let account = match store.get_account(&login.email.trim().to_lowercase()).await {
        Ok(account) => account,
        // 없는 계정과 틀린 비밀번호를 구분해 알려주지 않는다.
        Err(Error::NotFound(_)) => return Err(warp::reject::custom(Error::WrongPassword)),
        Err(e) => return Err(warp::reject::custom(e)),
    };

    match verify_password(&account.password, login.password.as_bytes()) {
        Ok(true) => {
            let account_id = account
                .id
                .ok_or_else(|| Error::NotFound("Account".to_string()))?;
            Ok(warp::reply::json(&issue_token(&key, account_id)?))
        }
        Ok(false) => {
            event!(Level::WARN, "wrong password");
            Err(warp::reject::custom(Error::WrongPassword))
        }
        Err(e) => Err(warp::reject::custom(Error::ArgonLibraryError(e))),
    }
}

fn verify_password(hash: &str, password: &[u8]) -> Result<bool, argon2::Error> {
    argon2::verify_encoded(hash, password)
}

pub fn issue_token(key: &TokenKey, account_id: AccountId) -> Result<String, Error> {
    let now = Utc::now();
    let expires = now + chrono::Duration::days(1);

    paseto::tokens::PasetoBuilder::new()
        .set_encryption_key(&Vec::from(key.as_bytes()))
        .set_expiration(&expires)
        .set_not_before(&now)
        .set_claim("account_id", serde_json::json!(account_id))
        .build()
        .map_err(|_| Error::CannotEncryptToken)
}

/// `Authorization` 헤더의 토큰을 풀어 `Session`을 꺼낸다.
/// 헤더가 없으면 `MissingToken`, 풀 수 없으면 `CannotDecryptToken`으로 거절한다.
pub fn auth(key: TokenKey) -> impl Filter<Extract = (Session,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("Authorization").and_then(move |token: Option<String>| {
        let session = match token {
            Some(token) => verify_token(&key, &token).map_err(warp::reject::custom),
            None => Err(warp::reject::custom(Error::MissingToken)),
        };

        future::ready(session)
    })
}
