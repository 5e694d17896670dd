use std::collections::HashMap;

use anyhow::Result;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: Option<String>,
}

#[derive(Debug, Error)]
pub enum WebhookVerifyError {
    /// Deployment misconfiguration, not a client error.
    #[error("webhook signing secret is not configured")]
    MissingSecret,
    #[error("invalid webhook signature: {0}")]
    Signature(String),
    #[error("invalid webhook payload: {0}")]
    Payload(String),
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
    pub total_details: Option<StripeTotalDetails>,
}

#[derive(Debug, Deserialize)]
pub struct StripeTotalDetails {
    pub amount_discount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionObject {
    pub id: Option<String>,
    pub status: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub trial_start: Option<i64>,
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
    #[serde(default)]
    pub discounts: Vec<StripeDiscount>,
}

impl StripeSubscriptionObject {
    /// Billing interval of the first line item's recurring price.
    pub fn billing_interval(&self) -> Option<&str> {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.recurring.as_ref())
            .and_then(|recurring| recurring.interval.as_deref())
    }

    /// Coupon id of the first expanded discount, when present. Discounts
    /// delivered as bare ids cannot be resolved from the event alone.
    pub fn promotion_code(&self) -> Option<String> {
        self.discounts.first().and_then(|discount| match discount {
            StripeDiscount::Object {
                coupon: Some(coupon),
            } => coupon.id.clone(),
            _ => None,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub recurring: Option<StripeRecurring>,
}

#[derive(Debug, Deserialize)]
pub struct StripeRecurring {
    pub interval: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StripeDiscount {
    Id(String),
    Object { coupon: Option<StripeCoupon> },
}

#[derive(Debug, Deserialize)]
pub struct StripeCoupon {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

/// Everything needed to open a Checkout Session for one plan tier.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub price_id: String,
    pub customer_id: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub trial_period_days: u32,
    pub coupon: Option<String>,
    /// Attached to both the session and the resulting subscription so
    /// webhook events can be attributed back to a user.
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CreatedCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, webhook_secret: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            webhook_secret,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (stripe_error_type, stripe_error_code, stripe_error_param, stripe_error_message) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => {
                    let details = envelope.error;
                    (details.type_, details.code, details.param, details.message)
                }
                Err(_) => (None, None, None, None),
            };

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?stripe_error_type,
            stripe_error_code = ?stripe_error_code,
            stripe_error_param = ?stripe_error_param,
            stripe_error_message = ?stripe_error_message,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, type={:?}, code={:?}, request_id={:?})",
            context,
            status,
            stripe_error_type,
            stripe_error_code,
            request_id
        );
    }

    /// Creates a Stripe customer carrying the user id in metadata.
    /// https://stripe.com/docs/api/customers/create
    pub async fn create_customer(&self, email: &str, user_id: &str) -> Result<String> {
        let body = [
            ("email", email.to_string()),
            ("metadata[userId]", user_id.to_string()),
        ];

        let resp = self
            .http
            .post("https://api.stripe.com/v1/customers")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create customer").await?;

        #[derive(Deserialize)]
        struct CustomerResp {
            id: String,
        }

        let parsed: CustomerResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// Creates a subscription-mode Checkout Session.
    /// https://stripe.com/docs/payments/checkout
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CreatedCheckoutSession> {
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][price]".to_string(), params.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
            ("allow_promotion_codes".to_string(), "true".to_string()),
            (
                "subscription_data[trial_period_days]".to_string(),
                params.trial_period_days.to_string(),
            ),
        ];

        if let Some(customer) = params.customer_id.as_ref() {
            body.push(("customer".to_string(), customer.clone()));
        }

        if let Some(coupon) = params.coupon.as_ref() {
            body.push(("discounts[0][coupon]".to_string(), coupon.clone()));
        }

        for (key, value) in &params.metadata {
            body.push((format!("metadata[{}]", key), value.clone()));
            body.push((
                format!("subscription_data[metadata][{}]", key),
                value.clone(),
            ));
        }

        let resp = self
            .http
            .post("https://api.stripe.com/v1/checkout/sessions")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        #[derive(Deserialize)]
        struct CheckoutResp {
            id: String,
            url: Option<String>,
        }

        let parsed: CheckoutResp = resp.json().await?;
        Ok(CreatedCheckoutSession {
            id: parsed.id,
            url: parsed.url,
        })
    }

    /// Creates a Billing Portal session and returns its URL.
    /// https://stripe.com/docs/api/customer_portal/sessions/create
    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String> {
        let body = [
            ("customer", customer_id.to_string()),
            ("return_url", return_url.to_string()),
        ];

        let resp = self
            .http
            .post("https://api.stripe.com/v1/billing_portal/sessions")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create portal session").await?;

        #[derive(Deserialize)]
        struct PortalResp {
            url: String,
        }

        let parsed: PortalResp = resp.json().await?;
        Ok(parsed.url)
    }

    /// Verifies the webhook signature and parses the event.
    /// https://stripe.com/docs/webhooks/signatures
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookVerifyError> {
        let webhook_secret = self
            .webhook_secret
            .as_deref()
            .ok_or(WebhookVerifyError::MissingSecret)?;

        let mut timestamp: Option<String> = None;
        let mut signature: Option<String> = None;

        for part in signature_header.split(',') {
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest.to_string());
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signature = Some(rest.to_string());
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            WebhookVerifyError::Signature("missing timestamp in stripe-signature".to_string())
        })?;
        let signature = signature.ok_or_else(|| {
            WebhookVerifyError::Signature("missing v1 in stripe-signature".to_string())
        })?;

        // The provider signs `{timestamp}.{raw body}`; feeding the raw
        // bytes keeps non-UTF-8 bodies verifiable.
        let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
            .map_err(|err| WebhookVerifyError::Signature(err.to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let provided = hex::decode(&signature)
            .map_err(|_| WebhookVerifyError::Signature("v1 is not hex".to_string()))?;

        // Constant-time comparison via the Mac verifier.
        mac.verify_slice(&provided)
            .map_err(|_| WebhookVerifyError::Signature("signature mismatch".to_string()))?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|err| WebhookVerifyError::Payload(err.to_string()))?;
        Ok(event)
    }

    pub fn extract_checkout_session(event: &StripeEvent) -> Option<StripeCheckoutSession> {
        serde_json::from_value(event.data.object.clone()).ok()
    }

    pub fn extract_subscription(event: &StripeEvent) -> Option<StripeSubscriptionObject> {
        serde_json::from_value(event.data.object.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn verify_webhook_signature_accepts_valid_signature() {
        let client = StripeClient::new("sk_test".to_string(), Some("whsec_test".to_string()));
        let payload = br#"{"id":"evt_1","type":"customer.subscription.deleted","data":{"object":{}}}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_test", "1700000000", payload));

        let event = client.verify_webhook_signature(payload, &header).unwrap();
        assert_eq!(event.type_, "customer.subscription.deleted");
    }

    #[test]
    fn verify_webhook_signature_rejects_tampered_payload() {
        let client = StripeClient::new("sk_test".to_string(), Some("whsec_test".to_string()));
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_test", "1700000000", payload));

        let tampered = br#"{"type":"checkout.session.completed","data":{"object":{"x":1}}}"#;
        let result = client.verify_webhook_signature(tampered, &header);
        assert!(matches!(result, Err(WebhookVerifyError::Signature(_))));
    }

    #[test]
    fn verify_webhook_signature_rejects_wrong_secret() {
        let client = StripeClient::new("sk_test".to_string(), Some("whsec_other".to_string()));
        let payload = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let header = format!("t=1700000000,v1={}", sign("whsec_test", "1700000000", payload));

        let result = client.verify_webhook_signature(payload, &header);
        assert!(matches!(result, Err(WebhookVerifyError::Signature(_))));
    }

    #[test]
    fn verify_webhook_signature_accepts_non_utf8_body() {
        let client = StripeClient::new("sk_test".to_string(), Some("whsec_test".to_string()));
        let payload: &[u8] = b"\xff\xfe not json";
        let header = format!("t=1700000000,v1={}", sign("whsec_test", "1700000000", payload));

        // Verification passes on the raw bytes; only event parsing fails.
        let result = client.verify_webhook_signature(payload, &header);
        assert!(matches!(result, Err(WebhookVerifyError::Payload(_))));
    }

    #[test]
    fn verify_webhook_signature_requires_configured_secret() {
        let client = StripeClient::new("sk_test".to_string(), None);
        let result = client.verify_webhook_signature(b"{}", "t=1,v1=00");
        assert!(matches!(result, Err(WebhookVerifyError::MissingSecret)));
    }

    #[test]
    fn extract_subscription_reads_interval_and_coupon() {
        let payload = serde_json::json!({
            "type": "customer.subscription.updated",
            "data": {
                "object": {
                    "id": "sub_1",
                    "status": "active",
                    "metadata": {"userId": "u1"},
                    "items": {"data": [{"price": {"recurring": {"interval": "year"}}}]},
                    "discounts": [{"coupon": {"id": "SPRING20"}}]
                }
            }
        });
        let event: StripeEvent = serde_json::from_value(payload).unwrap();
        let subscription = StripeClient::extract_subscription(&event).unwrap();
        assert_eq!(subscription.billing_interval(), Some("year"));
        assert_eq!(subscription.promotion_code(), Some("SPRING20".to_string()));
    }

    #[test]
    fn discount_ids_do_not_resolve_to_promotion_codes() {
        let subscription: StripeSubscriptionObject = serde_json::from_value(serde_json::json!({
            "id": "sub_1",
            "discounts": ["di_123"]
        }))
        .unwrap();
        assert_eq!(subscription.promotion_code(), None);
    }
}
