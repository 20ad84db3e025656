//! HTTP handlers

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap},
    Json,
};
use ledger_core::{Collection, DocPath, Document};
use ledger_store::{DocumentWrite, Precondition};
use std::sync::Arc;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::dto::*;
use crate::error::{ApiError, ApiResult};
use crate::metrics::{record_confirmation, record_upload};
use crate::orchestrator::{ConfirmError, ConfirmOutcome, UploadReceipt};
use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: state.config.version.clone(),
        environment: state.config.environment.to_string(),
        payment_provider: state.orchestrator.provider_name().to_string(),
        uptime_secs: state.uptime_secs(),
        total_requests: state.request_count().await,
    })
}

/// POST /payment-intents
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    body: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> ApiResult<Json<CreatePaymentIntentResponse>> {
    let Json(request) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    let intent = state
        .orchestrator
        .create_payment_intent(Some(&principal), request.amount)
        .await?;
    Ok(Json(intent.into()))
}

/// POST /payments/confirm
///
/// Domain failures are answered with 200 and `success: false`.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuthUser,
    body: Bytes,
) -> Json<ConfirmOutcome> {
    let result = match serde_json::from_slice::<ConfirmPaymentRequest>(&body) {
        Ok(request) => {
            state
                .orchestrator
                .confirm_payment(auth.principal(), &request.payment_intent_id)
                .await
        }
        Err(_) => Err(ConfirmError::Validation(
            "request body must be {\"paymentIntentId\": string}".to_string(),
        )),
    };

    record_confirmation(match &result {
        Ok(_) => "credited",
        Err(e) => e.outcome(),
    });
    Json(ConfirmOutcome::from(&result))
}

/// GET /documents/:collection/:key
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuthUser,
    Path((collection, key)): Path<(String, String)>,
) -> ApiResult<Json<DocumentResponse>> {
    let path = doc_path(&collection, key)?;
    let stored = state
        .store
        .get(auth.principal(), &path)
        .await?
        .ok_or_else(|| ApiError::not_found("document", path.to_string()))?;
    Ok(Json(stored.into()))
}

/// PUT /documents/:collection/:key
///
/// `If-Match: <version>` makes the write conditional on the stored
/// version, `If-None-Match: *` on the document being absent.
pub async fn put_document(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuthUser,
    Path((collection, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Result<Json<Document>, JsonRejection>,
) -> ApiResult<Json<WriteDocumentResponse>> {
    let path = doc_path(&collection, key)?;
    let Json(data) = body.map_err(|e| ApiError::validation(e.body_text()))?;
    let precondition = precondition(&headers)?;

    let result = state
        .store
        .commit(
            auth.principal(),
            vec![DocumentWrite {
                path: path.clone(),
                data,
                precondition,
            }],
        )
        .await?;
    let version = result
        .versions
        .first()
        .copied()
        .ok_or_else(|| ApiError::internal("commit returned no version"))?;
    Ok(Json(WriteDocumentResponse::new(&path, version, result.commit_time)))
}

/// PUT /uploads/:upload_intent_id
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    auth: MaybeAuthUser,
    Path(upload_intent_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<UploadReceipt>> {
    let result = state
        .orchestrator
        .complete_upload(auth.principal(), &upload_intent_id, &body)
        .await;
    record_upload(match &result {
        Ok(receipt) if receipt.newly_settled => "settled",
        Ok(_) => "replaced",
        Err(e) => e.outcome(),
    });
    Ok(Json(result?))
}

fn doc_path(collection: &str, key: String) -> ApiResult<DocPath> {
    let collection: Collection = collection
        .parse()
        .map_err(|_| ApiError::not_found("collection", collection))?;
    Ok(DocPath::new(collection, key))
}

fn precondition(headers: &HeaderMap) -> ApiResult<Precondition> {
    if let Some(value) = headers.get(header::IF_MATCH) {
        let version = value
            .to_str()
            .ok()
            .map(|v| v.trim().trim_matches('"'))
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| ApiError::validation("If-Match must be a document version"))?;
        return Ok(Precondition::Version(version));
    }
    match headers.get(header::IF_NONE_MATCH).map(|v| v.to_str()) {
        Some(Ok("*")) => Ok(Precondition::MustNotExist),
        Some(_) => Err(ApiError::validation("If-None-Match only supports *")),
        None => Ok(Precondition::None),
    }
}


