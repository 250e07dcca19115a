use tracing::instrument;

use crate::store::Store;
use crate::types::account::Session;
use crate::types::star::ItemType;

#[instrument(skip(store))]
pub async fn toggle_star(
    item_type: String,
    item_id: i32,
    session: Session,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    let item_type: ItemType = item_type.parse()?;

    match store
        .toggle_star(session.account_id, item_type, item_id)
        .await
    {
        Ok(status) => Ok(warp::reply::json(&status)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

#[instrument(skip(store))]
pub async fn get_stars(session: Session, store: Store) -> Result<impl warp::Reply, warp::Rejection> {
    match store.get_stars(session.account_id).await {
        Ok(stars) => Ok(warp::reply::json(&stars)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}
