use tracing::instrument;

use crate::store::Store;
use crate::types::account::{AccountId, Session};
use crate::types::profile::ProfileUpdate;

#[instrument(skip(store))]
pub async fn get_profile(
    id: i32,
    _session: Session,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.get_profile(AccountId(id)).await {
        Ok(profile) => Ok(warp::reply::json(&profile)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

/// 로그인한 계정 자신의 이름과 소개만 고칠 수 있다.
#[instrument(skip(store, update))]
pub async fn update_profile(
    session: Session,
    store: Store,
    update: ProfileUpdate,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store
        .update_profile(session.account_id, update.normalized())
        .await
    {
        Ok(account) => Ok(warp::reply::json(&account)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}
