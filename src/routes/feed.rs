use std::collections::HashMap;
use tracing::{Level, event, instrument};

use handle_errors::Error;

use crate::store::Store;
use crate::types::account::Session;
use crate::types::feed::FeedItem;

#[instrument(skip(store))]
pub async fn get_feed(_session: Session, store: Store) -> Result<impl warp::Reply, warp::Rejection> {
    match store.get_feed().await {
        Ok(items) => Ok(warp::reply::json(&items)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

/// `/search?q=...`. 빈 검색어는 빈 목록을 돌려준다.
#[instrument(skip(store))]
pub async fn search(
    params: HashMap<String, String>,
    _session: Session,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    let term = match params.get("q") {
        Some(term) => term.trim(),
        None => return Err(warp::reject::custom(Error::MissingParameters)),
    };
    if term.is_empty() {
        return Ok(warp::reply::json(&Vec::<FeedItem>::new()));
    }

    match store.search(term).await {
        Ok(items) => {
            event!(Level::DEBUG, hits = items.len(), "search finished");
            Ok(warp::reply::json(&items))
        }
        Err(e) => Err(warp::reject::custom(e)),
    }
}
