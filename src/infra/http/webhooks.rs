use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use metrics::counter;
use serde::Deserialize;
use tracing::{info, warn};

use crate::application::{
    error::HttpError,
    webhook::{SIGNATURE_HEADER, check_signature},
};

use super::public::HttpState;

const SOURCE: &str = "infra::http::webhooks";
const INVALID_SIGNATURE_MESSAGE: &str = "the given signature is invalid";

/// Push notification body; only used for logging.
#[derive(Debug, Default, Deserialize)]
struct Delivery {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    after: Option<String>,
}

/// Liveness probe used by webhook senders when the hook is registered.
pub(super) async fn ping() -> StatusCode {
    StatusCode::OK
}

pub(super) async fn refresh(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // A header that is not visible ASCII reads as malformed, not missing.
    let signature = headers
        .get(SIGNATURE_HEADER)
        .map(|value| value.to_str().unwrap_or_default());

    if let Err(err) = check_signature(&state.secret, &body, signature) {
        counter!("taccuino_webhook_rejected_total").increment(1);
        warn!(
            target = "taccuino::webhook",
            header = SIGNATURE_HEADER,
            reason = err.reason(),
            error = %err,
            "Webhook signature rejected"
        );
        return HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            INVALID_SIGNATURE_MESSAGE,
            err.to_string(),
        )
        .into_response();
    }

    let delivery = serde_json::from_slice::<Delivery>(&body).unwrap_or_default();
    info!(
        target = "taccuino::webhook",
        git_ref = delivery.git_ref.as_deref().unwrap_or(""),
        after = delivery.after.as_deref().unwrap_or(""),
        bytes = body.len(),
        "Webhook accepted; refreshing content"
    );

    // Detached so a sender hanging up mid-refresh cannot skip the cache clear.
    let refresh = state.refresh.clone();
    match tokio::spawn(async move { refresh.refresh().await }).await {
        Ok(Ok(_)) => StatusCode::OK.into_response(),
        Ok(Err(err)) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        )
        .into_response(),
        Err(err) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &err,
        )
        .into_response(),
    }
}
