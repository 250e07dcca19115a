use tracing::{Level, event, instrument};

use handle_errors::Error;

use crate::store::Store;
use crate::types::account::Session;
use crate::types::document::{DocumentId, DocumentStatus, NewDocument, StatusUpdate};

#[instrument(skip(store, new_document), fields(title = %new_document.title))]
pub async fn add_document(
    session: Session,
    store: Store,
    new_document: NewDocument,
) -> Result<impl warp::Reply, warp::Rejection> {
    match store.add_document(new_document, session.account_id).await {
        Ok(document) => Ok(warp::reply::json(&document)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

#[instrument(skip(store))]
pub async fn get_document(
    id: i32,
    _session: Session,
    store: Store,
) -> Result<impl warp::Reply, warp::Rejection> {
    let id = DocumentId(id);
    store.record_document_view(id).await?;

    match store.get_document(id).await {
        Ok(document) => Ok(warp::reply::json(&document)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}

/// 교수와 관리자만 문서 상태를 바꿀 수 있다.
#[instrument(skip(store))]
pub async fn update_document_status(
    id: i32,
    session: Session,
    store: Store,
    update: StatusUpdate,
) -> Result<impl warp::Reply, warp::Rejection> {
    let status: DocumentStatus = update.status.parse()?;
    let account = store.get_account_by_id(session.account_id).await?;
    if !account.role.can_verify_documents() {
        event!(
            Level::WARN,
            role = account.role.as_str(),
            "document status change refused"
        );
        return Err(warp::reject::custom(Error::Unauthorized));
    }

    match store
        .set_document_status(DocumentId(id), status, session.account_id)
        .await
    {
        Ok(document) => Ok(warp::reply::json(&document)),
        Err(e) => Err(warp::reject::custom(e)),
    }
}
