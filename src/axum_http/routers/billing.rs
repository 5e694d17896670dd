use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    axum_http::error_responses::error_response,
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::subscriptions::SubscriptionRecordRepository,
        value_objects::billing::{CheckoutSessionRequest, PortalSessionRequest},
    },
    infra::record_store::{http::HttpRecordStore, repositories::subscriptions::SubscriptionRecordStore},
    payments::stripe_client::StripeClient,
    usecases::billing::{BillingError, BillingUseCase, PlanCatalog, StripeGateway},
};

pub struct BillingRouterState<S, G>
where
    S: SubscriptionRecordRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    usecase: BillingUseCase<S, G>,
    fallback_origin: String,
    debug_errors: bool,
}

impl<S, G> BillingRouterState<S, G>
where
    S: SubscriptionRecordRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    pub fn new(usecase: BillingUseCase<S, G>, fallback_origin: String, debug_errors: bool) -> Self {
        Self {
            usecase,
            fallback_origin,
            debug_errors,
        }
    }
}

pub fn routes(record_store: Arc<HttpRecordStore>, config: Arc<DotEnvyConfig>) -> Router {
    let subscription_repo = SubscriptionRecordStore::new(Arc::clone(&record_store));
    let stripe_client = StripeClient::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
    );
    let usecase = BillingUseCase::new(
        Arc::new(subscription_repo),
        Arc::new(stripe_client),
        PlanCatalog::from(&config.stripe),
    );
    let state = BillingRouterState::new(
        usecase,
        config.app.base_url.clone(),
        config.app.debug_errors,
    );

    Router::new()
        .route("/checkout-session", post(create_checkout_session))
        .route("/portal-session", post(create_portal_session))
        .route("/webhook", post(stripe_webhook))
        .with_state(Arc::new(state))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionResponse {
    session_id: String,
    request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PortalSessionResponse {
    url: String,
    request_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookAck {
    received: bool,
    request_id: String,
}

fn billing_error_response(err: BillingError, request_id: &str, debug_errors: bool) -> Response {
    let detail = if debug_errors { err.detail() } else { None };
    error_response(err.status_code(), err.to_string(), request_id, detail)
}

pub async fn create_checkout_session<S, G>(
    State(state): State<Arc<BillingRouterState<S, G>>>,
    headers: HeaderMap,
    Json(request): Json<CheckoutSessionRequest>,
) -> impl IntoResponse
where
    S: SubscriptionRecordRepository + Send + Sync,
    G: StripeGateway + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let origin = super::request_origin(&headers, &state.fallback_origin);

    let response = match state.usecase.create_checkout_session(request, &origin).await {
        Ok(session_id) => Json(CheckoutSessionResponse {
            session_id,
            request_id: request_id.clone(),
        })
        .into_response(),
        Err(err) => {
            warn!(
                %request_id,
                status = err.status_code().as_u16(),
                error = %err,
                "billing: checkout session request failed"
            );
            billing_error_response(err, &request_id, state.debug_errors)
        }
    };
    super::with_request_id(response, &request_id)
}

pub async fn create_portal_session<S, G>(
    State(state): State<Arc<BillingRouterState<S, G>>>,
    headers: HeaderMap,
    Json(request): Json<PortalSessionRequest>,
) -> impl IntoResponse
where
    S: SubscriptionRecordRepository + Send + Sync,
    G: StripeGateway + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();
    let origin = super::request_origin(&headers, &state.fallback_origin);

    let response = match state.usecase.create_portal_session(request, &origin).await {
        Ok(url) => Json(PortalSessionResponse {
            url,
            request_id: request_id.clone(),
        })
        .into_response(),
        Err(err) => {
            warn!(
                %request_id,
                status = err.status_code().as_u16(),
                error = %err,
                "billing: portal session request failed"
            );
            billing_error_response(err, &request_id, state.debug_errors)
        }
    };
    super::with_request_id(response, &request_id)
}

/// Takes the raw body; signature verification works over the unparsed
/// bytes.
pub async fn stripe_webhook<S, G>(
    State(state): State<Arc<BillingRouterState<S, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    S: SubscriptionRecordRepository + Send + Sync,
    G: StripeGateway + Send + Sync,
{
    let request_id = Uuid::new_v4().to_string();

    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    else {
        warn!(%request_id, "billing: webhook request missing signature header");
        let err = BillingError::InvalidSignature;
        let response = billing_error_response(err, &request_id, state.debug_errors);
        return super::with_request_id(response, &request_id);
    };

    let response = match state.usecase.handle_stripe_webhook(&body, signature).await {
        Ok(()) => {
            info!(%request_id, "billing: webhook processed");
            Json(WebhookAck {
                received: true,
                request_id: request_id.clone(),
            })
            .into_response()
        }
        Err(err) => {
            warn!(
                %request_id,
                status = err.status_code().as_u16(),
                error = %err,
                "billing: webhook handling failed"
            );
            billing_error_response(err, &request_id, state.debug_errors)
        }
    };
    super::with_request_id(response, &request_id)
}
