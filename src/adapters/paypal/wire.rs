//! PayPal REST payloads.
//!
//! Only the fields the billing engine reads are modelled; everything else in
//! a response is ignored.

use serde::{Deserialize, Serialize};

use crate::domain::subscription::PaymentMethodSummary;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

/// Finds the payer approval link among HATEOAS links.
pub fn approval_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel == "approve" || l.rel == "payer-action")
        .map(|l| l.href.clone())
}

// ════════════════════════════════════════════════════════════════════════════════
// Orders
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct OrderBody<'a> {
    pub intent: &'static str,
    pub purchase_units: Vec<PurchaseUnit<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_context: Option<ApplicationContext<'a>>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseUnit<'a> {
    pub reference_id: &'a str,
    pub custom_id: &'a str,
    pub description: &'a str,
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct Amount {
    pub currency_code: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ApplicationContext<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_action: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub struct CaptureResponse {
    pub status: String,
    #[serde(default)]
    pub payer: Option<Payer>,
    #[serde(default)]
    pub purchase_units: Vec<CapturedUnit>,
}

impl CaptureResponse {
    pub fn capture_id(&self) -> Option<String> {
        self.purchase_units
            .iter()
            .filter_map(|u| u.payments.as_ref())
            .flat_map(|p| p.captures.iter())
            .map(|c| c.id.clone())
            .next()
    }
}

#[derive(Debug, Deserialize)]
pub struct Payer {
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub name: Option<PayerName>,
}

#[derive(Debug, Deserialize)]
pub struct PayerName {
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
}

impl PayerName {
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.given_name.as_deref(), self.surname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[derive(Debug, Deserialize)]
pub struct CapturedUnit {
    #[serde(default)]
    pub payments: Option<CapturedPayments>,
}

#[derive(Debug, Deserialize)]
pub struct CapturedPayments {
    #[serde(default)]
    pub captures: Vec<CaptureDetail>,
}

#[derive(Debug, Deserialize)]
pub struct CaptureDetail {
    pub id: String,
}

/// Error body PayPal returns on 4xx/5xx.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub name: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub issue: Option<String>,
}

impl ErrorBody {
    pub fn first_issue(&self) -> Option<&str> {
        self.details.iter().find_map(|d| d.issue.as_deref())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct SubscriptionBody<'a> {
    pub plan_id: &'a str,
    pub custom_id: &'a str,
    pub application_context: ApplicationContext<'a>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub billing_info: Option<BillingInfo>,
    #[serde(default)]
    pub subscriber: Option<Subscriber>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
pub struct BillingInfo {
    #[serde(default)]
    pub next_billing_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub last_payment: Option<LastPayment>,
}

#[derive(Debug, Deserialize)]
pub struct LastPayment {
    #[serde(default)]
    pub time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct Subscriber {
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub payment_source: Option<PaymentSource>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentSource {
    #[serde(default)]
    pub card: Option<CardSource>,
}

#[derive(Debug, Deserialize)]
pub struct CardSource {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last_digits: Option<String>,
}

impl Subscriber {
    /// Card on file, or the PayPal wallet identified by a masked email.
    pub fn payment_method(&self) -> Option<PaymentMethodSummary> {
        if let Some(card) = self.payment_source.as_ref().and_then(|s| s.card.as_ref()) {
            return Some(PaymentMethodSummary {
                method_type: card
                    .brand
                    .as_deref()
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_else(|| "card".to_string()),
                mask: card.last_digits.clone(),
            });
        }
        self.email_address.as_deref().map(|email| PaymentMethodSummary {
            method_type: "paypal".to_string(),
            mask: Some(mask_email(email)),
        })
    }
}

fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook verification
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
pub struct VerifySignatureBody<'a> {
    pub auth_algo: &'a str,
    pub cert_url: &'a str,
    pub transmission_id: &'a str,
    pub transmission_sig: &'a str,
    pub transmission_time: &'a str,
    pub webhook_id: &'a str,
    pub webhook_event: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct VerifySignatureResponse {
    pub verification_status: String,
}
