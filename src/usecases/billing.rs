use std::{collections::HashMap, sync::Arc};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    config::config_model::StripeConfig,
    domain::{
        repositories::subscriptions::SubscriptionRecordRepository,
        value_objects::{
            billing::{CheckoutSessionRequest, PortalSessionRequest, SubscriptionPatch},
            enums::{plan_types::PlanType, subscription_statuses::SubscriptionStatus},
        },
    },
    payments::stripe_client::{
        CheckoutSessionParams, CreatedCheckoutSession, StripeClient, StripeEvent,
        WebhookVerifyError,
    },
};

/// Unconfigured deployments carry this placeholder in env examples; it
/// must never reach the provider.
const PLACEHOLDER_PRICE_ID: &str = "price_xxx";

const TRIAL_PERIOD_DAYS: u32 = 30;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_customer(&self, email: &str, user_id: &str) -> AnyResult<String>;

    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> AnyResult<CreatedCheckoutSession>;

    async fn create_portal_session(&self, customer_id: &str, return_url: &str)
    -> AnyResult<String>;

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<StripeEvent, WebhookVerifyError>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_customer(&self, email: &str, user_id: &str) -> AnyResult<String> {
        self.create_customer(email, user_id).await
    }

    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> AnyResult<CreatedCheckoutSession> {
        self.create_checkout_session(params).await
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AnyResult<String> {
        self.create_portal_session(customer_id, return_url).await
    }

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<StripeEvent, WebhookVerifyError> {
        self.verify_webhook_signature(payload, signature)
    }
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("missing required fields: {0}")]
    InvalidRequest(String),
    #[error("billing is not configured: {0}")]
    Configuration(&'static str),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("subscription record not found")]
    RecordNotFound,
    #[error("no billing customer on record")]
    MissingBillingCustomer,
    #[error("billing provider request failed")]
    Provider(#[source] anyhow::Error),
    #[error("webhook processing failed")]
    Processing(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BillingError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            BillingError::InvalidRequest(_)
            | BillingError::InvalidSignature
            | BillingError::MissingBillingCustomer => StatusCode::BAD_REQUEST,
            BillingError::RecordNotFound => StatusCode::NOT_FOUND,
            BillingError::Configuration(_)
            | BillingError::Provider(_)
            | BillingError::Processing(_)
            | BillingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Diagnostic detail for debug-enabled responses. Terse variants have
    /// nothing beyond their display message.
    pub fn detail(&self) -> Option<String> {
        match self {
            BillingError::Provider(source)
            | BillingError::Processing(source)
            | BillingError::Internal(source) => Some(format!("{source:#}")),
            _ => None,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BillingError>;

/// Static plan-tier to price-id mapping from environment configuration.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    monthly_price_id: String,
    yearly_price_id: String,
}

impl PlanCatalog {
    pub fn new(monthly_price_id: String, yearly_price_id: String) -> Self {
        Self {
            monthly_price_id,
            yearly_price_id,
        }
    }

    pub fn resolve(&self, plan_type: PlanType) -> UseCaseResult<&str> {
        let price_id = match plan_type {
            PlanType::Monthly => self.monthly_price_id.as_str(),
            PlanType::Yearly => self.yearly_price_id.as_str(),
        };

        if price_id.is_empty() || price_id == PLACEHOLDER_PRICE_ID {
            return Err(BillingError::Configuration("price id is not configured"));
        }

        Ok(price_id)
    }
}

impl From<&StripeConfig> for PlanCatalog {
    fn from(config: &StripeConfig) -> Self {
        Self::new(
            config.monthly_price_id.clone(),
            config.yearly_price_id.clone(),
        )
    }
}

pub struct BillingUseCase<S, G>
where
    S: SubscriptionRecordRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    stripe_client: Arc<G>,
    plans: PlanCatalog,
}

impl<S, G> BillingUseCase<S, G>
where
    S: SubscriptionRecordRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, stripe_client: Arc<G>, plans: PlanCatalog) -> Self {
        Self {
            subscription_repo,
            stripe_client,
            plans,
        }
    }

    /// Ensures a billing customer exists, opens a Checkout Session for the
    /// selected plan tier, and seeds a provisional subscription record.
    /// Returns the session id for the client redirect.
    pub async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
        origin: &str,
    ) -> UseCaseResult<String> {
        let user_id = non_empty(request.user_id.as_deref())
            .ok_or_else(|| BillingError::InvalidRequest("userId is required".to_string()))?;
        let email = non_empty(request.email.as_deref())
            .ok_or_else(|| BillingError::InvalidRequest("email is required".to_string()))?;
        let plan_type = non_empty(request.plan_type.as_deref())
            .and_then(PlanType::from_str)
            .ok_or_else(|| {
                BillingError::InvalidRequest("planType must be monthly or yearly".to_string())
            })?;
        let coupon_code = non_empty(request.coupon_code.as_deref()).map(|value| value.to_string());

        info!(
            %user_id,
            plan_type = %plan_type,
            has_coupon = coupon_code.is_some(),
            "billing: create checkout session requested"
        );

        let price_id = self.plans.resolve(plan_type).map_err(|err| {
            warn!(
                %user_id,
                plan_type = %plan_type,
                status = err.status_code().as_u16(),
                "billing: unresolved price id for plan"
            );
            err
        })?;

        // Best-effort: a store read failure degrades to "no existing
        // customer" because the provider tolerates a duplicate customer.
        let existing_customer_id = match self.subscription_repo.find_by_user_id(user_id).await {
            Ok(record) => record.and_then(|record| record.stripe_customer_id),
            Err(err) => {
                warn!(
                    %user_id,
                    db_error = ?err,
                    "billing: record read failed, continuing without customer id"
                );
                None
            }
        };

        let customer_id = match existing_customer_id {
            Some(customer_id) => {
                debug!(%user_id, %customer_id, "billing: reusing existing billing customer");
                customer_id
            }
            None => self
                .stripe_client
                .create_customer(email, user_id)
                .await
                .map_err(|err| {
                    error!(
                        %user_id,
                        error = ?err,
                        "billing: stripe customer creation failed"
                    );
                    BillingError::Provider(err)
                })?,
        };

        let metadata = HashMap::from([
            ("userId".to_string(), user_id.to_string()),
            ("planType".to_string(), plan_type.to_string()),
        ]);

        let params = CheckoutSessionParams {
            price_id: price_id.to_string(),
            customer_id: Some(customer_id.clone()),
            success_url: format!("{origin}/dashboard?success=true"),
            cancel_url: format!("{origin}/signup?canceled=true"),
            trial_period_days: TRIAL_PERIOD_DAYS,
            coupon: coupon_code.clone(),
            metadata,
        };

        let session = self
            .stripe_client
            .create_checkout_session(&params)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    plan_type = %plan_type,
                    price_id = %params.price_id,
                    customer_id = %customer_id,
                    error = ?err,
                    "billing: stripe checkout session creation failed"
                );
                BillingError::Provider(err)
            })?;

        // Best-effort provisional seed; the webhook path backfills it.
        let now = Utc::now();
        let mut seed = Map::new();
        seed.insert("userId".to_string(), Value::from(user_id));
        seed.insert("stripeCustomerId".to_string(), Value::from(customer_id));
        seed.insert(
            "status".to_string(),
            Value::from(SubscriptionStatus::Incomplete.to_string()),
        );
        seed.insert(
            "planType".to_string(),
            Value::from(plan_type.to_string()),
        );
        seed.insert(
            "couponCode".to_string(),
            coupon_code.map(Value::from).unwrap_or(Value::Null),
        );
        seed.insert("createdAt".to_string(), serde_json::json!(now));
        seed.insert("updatedAt".to_string(), serde_json::json!(now));

        if let Err(err) = self.subscription_repo.merge(user_id, seed).await {
            warn!(
                %user_id,
                db_error = ?err,
                "billing: provisional record write failed, webhook will backfill"
            );
        }

        info!(
            %user_id,
            session_id = %session.id,
            "billing: checkout session created"
        );

        Ok(session.id)
    }

    /// Produces a redirect URL to the provider's self-service billing
    /// portal for the user's billing customer.
    pub async fn create_portal_session(
        &self,
        request: PortalSessionRequest,
        origin: &str,
    ) -> UseCaseResult<String> {
        let user_id = non_empty(request.user_id.as_deref())
            .ok_or_else(|| BillingError::InvalidRequest("userId is required".to_string()))?;

        info!(%user_id, "billing: portal session requested");

        let record = self
            .subscription_repo
            .find_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "billing: failed to load subscription record for portal"
                );
                BillingError::Internal(err)
            })?
            .ok_or_else(|| {
                let err = BillingError::RecordNotFound;
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "billing: no subscription record for portal"
                );
                err
            })?;

        let customer_id = record.stripe_customer_id.ok_or_else(|| {
            let err = BillingError::MissingBillingCustomer;
            warn!(
                %user_id,
                status = err.status_code().as_u16(),
                "billing: record has no billing customer id"
            );
            err
        })?;

        let return_url = format!("{origin}/dashboard");
        let url = self
            .stripe_client
            .create_portal_session(&customer_id, &return_url)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %customer_id,
                    error = ?err,
                    "billing: stripe portal session creation failed"
                );
                BillingError::Provider(err)
            })?;

        info!(%user_id, "billing: portal session created");

        Ok(url)
    }

    /// Verifies the inbound event and applies its reconciliation patches
    /// to the subscription store. A store failure surfaces so the
    /// provider redelivers; partial application is acceptable because
    /// every patch is an idempotent full-field overwrite.
    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<()> {
        let event = self
            .stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| match err {
                WebhookVerifyError::MissingSecret => {
                    error!("billing: webhook secret is not configured");
                    BillingError::Configuration("webhook secret is not configured")
                }
                WebhookVerifyError::Signature(reason) | WebhookVerifyError::Payload(reason) => {
                    warn!(%reason, "billing: webhook verification failed");
                    BillingError::InvalidSignature
                }
            })?;

        info!(
            event_id = ?event.id,
            event_type = %event.type_,
            "billing: stripe webhook verified"
        );

        let patches = reconcile_event(&event, Utc::now());
        if patches.is_empty() {
            debug!(event_type = %event.type_, "billing: event produced no patches");
            return Ok(());
        }

        for patch in patches {
            self.subscription_repo
                .merge(&patch.user_id, patch.fields)
                .await
                .map_err(|err| {
                    error!(
                        user_id = %patch.user_id,
                        event_type = %event.type_,
                        db_error = ?err,
                        "billing: record write failed, provider will redeliver"
                    );
                    BillingError::Processing(err)
                })?;
        }

        Ok(())
    }
}

/// Maps a verified provider event onto subscription-record merge patches.
///
/// Pure with respect to the store: events unrelated to a managed
/// subscription (no userId metadata) yield no patches and are simply
/// acknowledged upstream. Every patch overwrites whole fields with the
/// event's values, which is what makes replays and out-of-order
/// delivery safe.
pub fn reconcile_event(event: &StripeEvent, now: DateTime<Utc>) -> Vec<SubscriptionPatch> {
    match event.type_.as_str() {
        "checkout.session.completed" => reconcile_checkout_completed(event, now),
        "customer.subscription.created" | "customer.subscription.updated" => {
            reconcile_subscription_upsert(event, now)
        }
        "customer.subscription.deleted" => reconcile_subscription_deleted(event, now),
        _ => {
            debug!(event_type = %event.type_, "billing: unhandled stripe event type");
            Vec::new()
        }
    }
}

fn reconcile_checkout_completed(event: &StripeEvent, now: DateTime<Utc>) -> Vec<SubscriptionPatch> {
    let Some(session) = StripeClient::extract_checkout_session(event) else {
        warn!("billing: checkout session payload did not parse");
        return Vec::new();
    };

    let metadata = session.metadata.unwrap_or_default();
    let (Some(user_id), Some(customer_id)) = (
        metadata.get("userId").filter(|value| !value.is_empty()),
        session.customer.as_deref(),
    ) else {
        debug!("billing: checkout session without userId metadata or customer, skipping");
        return Vec::new();
    };

    let discount_applied = session
        .total_details
        .and_then(|details| details.amount_discount)
        .is_some_and(|amount| amount > 0);
    let coupon_code = if discount_applied {
        let code = metadata.get("promotionCode").cloned();
        if code.is_none() {
            // Known data-quality gap: the session event does not expand
            // the promotion code. Stored as null rather than a sentinel.
            warn!(%user_id, "billing: discount applied but promotion code unresolved");
        }
        code
    } else {
        None
    };

    let mut fields = Map::new();
    fields.insert("userId".to_string(), Value::from(user_id.as_str()));
    fields.insert("stripeCustomerId".to_string(), Value::from(customer_id));
    fields.insert(
        "stripeSubscriptionId".to_string(),
        session
            .subscription
            .map(Value::from)
            .unwrap_or(Value::Null),
    );
    fields.insert(
        "status".to_string(),
        Value::from(SubscriptionStatus::Trialing.to_string()),
    );
    fields.insert(
        "couponCode".to_string(),
        coupon_code.map(Value::from).unwrap_or(Value::Null),
    );
    fields.insert("createdAt".to_string(), serde_json::json!(now));
    fields.insert("updatedAt".to_string(), serde_json::json!(now));

    vec![SubscriptionPatch::new(user_id.clone(), fields)]
}

fn reconcile_subscription_upsert(event: &StripeEvent, now: DateTime<Utc>) -> Vec<SubscriptionPatch> {
    let Some(subscription) = StripeClient::extract_subscription(event) else {
        warn!("billing: subscription payload did not parse");
        return Vec::new();
    };

    let Some(user_id) = subscription
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get("userId"))
        .filter(|value| !value.is_empty())
        .cloned()
    else {
        debug!("billing: subscription event without userId metadata, skipping");
        return Vec::new();
    };

    let mut fields = Map::new();
    fields.insert(
        "stripeSubscriptionId".to_string(),
        subscription.id.clone().map(Value::from).unwrap_or(Value::Null),
    );
    if let Some(status) = subscription.status.as_deref() {
        // Provider value is authoritative; stored verbatim.
        fields.insert("status".to_string(), Value::from(status));
    }
    fields.insert(
        "currentPeriodStart".to_string(),
        epoch_to_json(subscription.current_period_start),
    );
    fields.insert(
        "currentPeriodEnd".to_string(),
        epoch_to_json(subscription.current_period_end),
    );
    fields.insert(
        "trialStart".to_string(),
        epoch_to_json(subscription.trial_start),
    );
    fields.insert(
        "trialEnd".to_string(),
        epoch_to_json(subscription.trial_end),
    );
    if let Some(plan_type) = subscription
        .billing_interval()
        .and_then(PlanType::from_billing_interval)
    {
        fields.insert("planType".to_string(), Value::from(plan_type.to_string()));
    }
    fields.insert(
        "couponCode".to_string(),
        subscription
            .promotion_code()
            .map(Value::from)
            .unwrap_or(Value::Null),
    );
    fields.insert("updatedAt".to_string(), serde_json::json!(now));

    vec![SubscriptionPatch::new(user_id, fields)]
}

fn reconcile_subscription_deleted(
    event: &StripeEvent,
    now: DateTime<Utc>,
) -> Vec<SubscriptionPatch> {
    let Some(subscription) = StripeClient::extract_subscription(event) else {
        warn!("billing: subscription payload did not parse");
        return Vec::new();
    };

    let Some(user_id) = subscription
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get("userId"))
        .filter(|value| !value.is_empty())
        .cloned()
    else {
        debug!("billing: subscription delete without userId metadata, skipping");
        return Vec::new();
    };

    let mut fields = Map::new();
    fields.insert(
        "status".to_string(),
        Value::from(SubscriptionStatus::Canceled.to_string()),
    );
    fields.insert("updatedAt".to_string(), serde_json::json!(now));

    vec![SubscriptionPatch::new(user_id, fields)]
}

fn epoch_to_json(seconds: Option<i64>) -> Value {
    seconds
        .and_then(ts_to_datetime)
        .map(|datetime| serde_json::json!(datetime))
        .unwrap_or(Value::Null)
}

fn ts_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::subscriptions::SubscriptionRecord;
    use crate::domain::repositories::subscriptions::MockSubscriptionRecordRepository;
    use mockall::predicate::eq;

    fn catalog() -> PlanCatalog {
        PlanCatalog::new("price_monthly_1".to_string(), "price_yearly_1".to_string())
    }

    fn checkout_request() -> CheckoutSessionRequest {
        CheckoutSessionRequest {
            user_id: Some("u1".to_string()),
            email: Some("agent@example.com".to_string()),
            plan_type: Some("monthly".to_string()),
            coupon_code: None,
        }
    }

    fn record_with_customer(customer_id: &str) -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: "u1".to_string(),
            stripe_customer_id: Some(customer_id.to_string()),
            stripe_subscription_id: None,
            status: SubscriptionStatus::Incomplete,
            plan_type: None,
            current_period_start: None,
            current_period_end: None,
            trial_start: None,
            trial_end: None,
            coupon_code: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn event_from_json(value: serde_json::Value) -> StripeEvent {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn checkout_creates_customer_session_and_incomplete_seed() {
        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_find_by_user_id()
            .with(eq("u1"))
            .returning(|_| Ok(None));
        repo.expect_merge()
            .withf(|user_id, fields| {
                user_id == "u1"
                    && fields.get("status") == Some(&Value::from("incomplete"))
                    && fields.get("stripeCustomerId") == Some(&Value::from("cus_new"))
                    && fields.get("planType") == Some(&Value::from("monthly"))
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_create_customer()
            .with(eq("agent@example.com"), eq("u1"))
            .times(1)
            .returning(|_, _| Ok("cus_new".to_string()));
        stripe
            .expect_create_checkout_session()
            .withf(|params| {
                params.price_id == "price_monthly_1"
                    && params.customer_id.as_deref() == Some("cus_new")
                    && params.trial_period_days == 30
                    && params.success_url == "https://app.test/dashboard?success=true"
                    && params.cancel_url == "https://app.test/signup?canceled=true"
                    && params.metadata.get("userId").map(String::as_str) == Some("u1")
                    && params.metadata.get("planType").map(String::as_str) == Some("monthly")
            })
            .times(1)
            .returning(|_| {
                Ok(CreatedCheckoutSession {
                    id: "cs_123".to_string(),
                    url: None,
                })
            });

        let usecase = BillingUseCase::new(Arc::new(repo), Arc::new(stripe), catalog());
        let session_id = usecase
            .create_checkout_session(checkout_request(), "https://app.test")
            .await
            .unwrap();
        assert_eq!(session_id, "cs_123");
    }

    #[tokio::test]
    async fn checkout_reuses_existing_billing_customer() {
        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_find_by_user_id()
            .returning(|_| Ok(Some(record_with_customer("cus_123"))));
        repo.expect_merge().returning(|_, _| Ok(()));

        let mut stripe = MockStripeGateway::new();
        stripe.expect_create_customer().times(0);
        stripe
            .expect_create_checkout_session()
            .withf(|params| params.customer_id.as_deref() == Some("cus_123"))
            .times(1)
            .returning(|_| {
                Ok(CreatedCheckoutSession {
                    id: "cs_456".to_string(),
                    url: None,
                })
            });

        let usecase = BillingUseCase::new(Arc::new(repo), Arc::new(stripe), catalog());
        let session_id = usecase
            .create_checkout_session(checkout_request(), "https://app.test")
            .await
            .unwrap();
        assert_eq!(session_id, "cs_456");
    }

    #[tokio::test]
    async fn checkout_with_placeholder_price_fails_without_side_effects() {
        let repo = MockSubscriptionRecordRepository::new();
        let mut stripe = MockStripeGateway::new();
        stripe.expect_create_customer().times(0);
        stripe.expect_create_checkout_session().times(0);

        let plans = PlanCatalog::new("price_xxx".to_string(), "price_yearly_1".to_string());
        let usecase = BillingUseCase::new(Arc::new(repo), Arc::new(stripe), plans);
        let result = usecase
            .create_checkout_session(checkout_request(), "https://app.test")
            .await;
        assert!(matches!(result, Err(BillingError::Configuration(_))));
    }

    #[tokio::test]
    async fn checkout_rejects_missing_fields() {
        let usecase = BillingUseCase::new(
            Arc::new(MockSubscriptionRecordRepository::new()),
            Arc::new(MockStripeGateway::new()),
            catalog(),
        );

        let mut request = checkout_request();
        request.email = Some("   ".to_string());
        let result = usecase
            .create_checkout_session(request, "https://app.test")
            .await;
        assert!(matches!(result, Err(BillingError::InvalidRequest(_))));

        let mut request = checkout_request();
        request.plan_type = Some("weekly".to_string());
        let result = usecase
            .create_checkout_session(request, "https://app.test")
            .await;
        assert!(matches!(result, Err(BillingError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn checkout_survives_record_read_failure() {
        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_find_by_user_id()
            .returning(|_| Err(anyhow::anyhow!("store unavailable")));
        repo.expect_merge().returning(|_, _| Ok(()));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_create_customer()
            .times(1)
            .returning(|_, _| Ok("cus_fresh".to_string()));
        stripe.expect_create_checkout_session().returning(|_| {
            Ok(CreatedCheckoutSession {
                id: "cs_789".to_string(),
                url: None,
            })
        });

        let usecase = BillingUseCase::new(Arc::new(repo), Arc::new(stripe), catalog());
        let session_id = usecase
            .create_checkout_session(checkout_request(), "https://app.test")
            .await
            .unwrap();
        assert_eq!(session_id, "cs_789");
    }

    #[tokio::test]
    async fn checkout_survives_seed_write_failure() {
        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_find_by_user_id().returning(|_| Ok(None));
        repo.expect_merge()
            .returning(|_, _| Err(anyhow::anyhow!("store unavailable")));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_create_customer()
            .returning(|_, _| Ok("cus_new".to_string()));
        stripe.expect_create_checkout_session().returning(|_| {
            Ok(CreatedCheckoutSession {
                id: "cs_321".to_string(),
                url: None,
            })
        });

        let usecase = BillingUseCase::new(Arc::new(repo), Arc::new(stripe), catalog());
        let session_id = usecase
            .create_checkout_session(checkout_request(), "https://app.test")
            .await
            .unwrap();
        assert_eq!(session_id, "cs_321");
    }

    #[tokio::test]
    async fn portal_requires_record_and_customer() {
        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_find_by_user_id().returning(|_| Ok(None));
        let usecase = BillingUseCase::new(
            Arc::new(repo),
            Arc::new(MockStripeGateway::new()),
            catalog(),
        );
        let result = usecase
            .create_portal_session(
                PortalSessionRequest {
                    user_id: Some("u1".to_string()),
                },
                "https://app.test",
            )
            .await;
        assert!(matches!(result, Err(BillingError::RecordNotFound)));

        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_find_by_user_id().returning(|_| {
            let mut record = record_with_customer("cus_1");
            record.stripe_customer_id = None;
            Ok(Some(record))
        });
        let usecase = BillingUseCase::new(
            Arc::new(repo),
            Arc::new(MockStripeGateway::new()),
            catalog(),
        );
        let result = usecase
            .create_portal_session(
                PortalSessionRequest {
                    user_id: Some("u1".to_string()),
                },
                "https://app.test",
            )
            .await;
        assert!(matches!(result, Err(BillingError::MissingBillingCustomer)));
    }

    #[tokio::test]
    async fn portal_returns_provider_url() {
        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_find_by_user_id()
            .returning(|_| Ok(Some(record_with_customer("cus_123"))));

        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_create_portal_session()
            .with(eq("cus_123"), eq("https://app.test/dashboard"))
            .times(1)
            .returning(|_, _| Ok("https://billing.stripe.com/p/session/xyz".to_string()));

        let usecase = BillingUseCase::new(Arc::new(repo), Arc::new(stripe), catalog());
        let url = usecase
            .create_portal_session(
                PortalSessionRequest {
                    user_id: Some("u1".to_string()),
                },
                "https://app.test",
            )
            .await
            .unwrap();
        assert!(url.contains("billing.stripe.com"));
    }

    #[tokio::test]
    async fn webhook_with_invalid_signature_never_touches_the_store() {
        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_merge().times(0);

        let mut stripe = MockStripeGateway::new();
        stripe.expect_verify_webhook_signature().returning(|_, _| {
            Err(WebhookVerifyError::Signature("signature mismatch".to_string()))
        });

        let usecase = BillingUseCase::new(Arc::new(repo), Arc::new(stripe), catalog());
        let result = usecase.handle_stripe_webhook(b"{}", "t=1,v1=bad").await;
        assert!(matches!(result, Err(BillingError::InvalidSignature)));
    }

    #[tokio::test]
    async fn webhook_without_configured_secret_is_a_configuration_error() {
        let mut stripe = MockStripeGateway::new();
        stripe
            .expect_verify_webhook_signature()
            .returning(|_, _| Err(WebhookVerifyError::MissingSecret));

        let usecase = BillingUseCase::new(
            Arc::new(MockSubscriptionRecordRepository::new()),
            Arc::new(stripe),
            catalog(),
        );
        let result = usecase.handle_stripe_webhook(b"{}", "t=1,v1=00").await;
        assert!(matches!(result, Err(BillingError::Configuration(_))));
    }

    #[tokio::test]
    async fn webhook_store_failure_surfaces_as_processing_error() {
        let mut repo = MockSubscriptionRecordRepository::new();
        repo.expect_merge()
            .returning(|_, _| Err(anyhow::anyhow!("store unavailable")));

        let mut stripe = MockStripeGateway::new();
        stripe.expect_verify_webhook_signature().returning(|_, _| {
            Ok(event_from_json(serde_json::json!({
                "id": "evt_1",
                "type": "customer.subscription.deleted",
                "data": {"object": {"id": "sub_1", "metadata": {"userId": "u1"}}}
            })))
        });

        let usecase = BillingUseCase::new(Arc::new(repo), Arc::new(stripe), catalog());
        let result = usecase.handle_stripe_webhook(b"{}", "t=1,v1=00").await;
        assert!(matches!(result, Err(BillingError::Processing(_))));
    }

    #[test]
    fn reconcile_checkout_completed_seeds_trialing_record() {
        let event = event_from_json(serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_1",
                "customer": "cus_123",
                "subscription": "sub_1",
                "metadata": {"userId": "u1", "planType": "monthly"},
                "total_details": {"amount_discount": 0}
            }}
        }));

        let patches = reconcile_event(&event, Utc::now());
        assert_eq!(patches.len(), 1);
        let patch = &patches[0];
        assert_eq!(patch.user_id, "u1");
        assert_eq!(patch.fields.get("status"), Some(&Value::from("trialing")));
        assert_eq!(
            patch.fields.get("stripeCustomerId"),
            Some(&Value::from("cus_123"))
        );
        assert_eq!(
            patch.fields.get("stripeSubscriptionId"),
            Some(&Value::from("sub_1"))
        );
        assert_eq!(patch.fields.get("couponCode"), Some(&Value::Null));
    }

    #[test]
    fn reconcile_checkout_discount_captures_metadata_promotion_code() {
        let event = event_from_json(serde_json::json!({
            "type": "checkout.session.completed",
            "data": {"object": {
                "customer": "cus_123",
                "metadata": {"userId": "u1", "promotionCode": "SPRING20"},
                "total_details": {"amount_discount": 500}
            }}
        }));

        let patches = reconcile_event(&event, Utc::now());
        assert_eq!(
            patches[0].fields.get("couponCode"),
            Some(&Value::from("SPRING20"))
        );
    }

    #[test]
    fn reconcile_subscription_updated_converts_periods_and_plan_type() {
        let event = event_from_json(serde_json::json!({
            "type": "customer.subscription.updated",
            "data": {"object": {
                "id": "sub_1",
                "status": "active",
                "metadata": {"userId": "u1"},
                "current_period_start": 1700000000,
                "current_period_end": 1702592000,
                "items": {"data": [{"price": {"recurring": {"interval": "year"}}}]}
            }}
        }));

        let patches = reconcile_event(&event, Utc::now());
        assert_eq!(patches.len(), 1);
        let fields = &patches[0].fields;
        assert_eq!(fields.get("status"), Some(&Value::from("active")));
        assert_eq!(fields.get("planType"), Some(&Value::from("yearly")));
        assert_eq!(
            fields.get("currentPeriodStart"),
            Some(&serde_json::json!(ts_to_datetime(1700000000).unwrap()))
        );
        assert_eq!(
            fields.get("currentPeriodEnd"),
            Some(&serde_json::json!(ts_to_datetime(1702592000).unwrap()))
        );
        assert_eq!(fields.get("trialStart"), Some(&Value::Null));
        assert_eq!(fields.get("trialEnd"), Some(&Value::Null));
    }

    #[test]
    fn reconcile_subscription_deleted_is_idempotent() {
        let event = event_from_json(serde_json::json!({
            "type": "customer.subscription.deleted",
            "data": {"object": {"id": "sub_1", "metadata": {"userId": "u1"}}}
        }));

        let now = Utc::now();
        let first = reconcile_event(&event, now);
        let replay = reconcile_event(&event, now);
        assert_eq!(first, replay);
        assert_eq!(
            first[0].fields.get("status"),
            Some(&Value::from("canceled"))
        );
    }

    #[test]
    fn reconcile_skips_events_without_user_metadata() {
        let event = event_from_json(serde_json::json!({
            "type": "customer.subscription.updated",
            "data": {"object": {"id": "sub_1", "status": "active", "metadata": {}}}
        }));
        assert!(reconcile_event(&event, Utc::now()).is_empty());

        let event = event_from_json(serde_json::json!({
            "type": "invoice.payment_succeeded",
            "data": {"object": {}}
        }));
        assert!(reconcile_event(&event, Utc::now()).is_empty());
    }
}
