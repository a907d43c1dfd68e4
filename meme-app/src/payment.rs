//! Donation relay client.
//!
//! Validates the donation form locally, then POSTs `{phone, amount, name}` to
//! the relay endpoint. Nothing is sent when validation fails, and every
//! failure is classified so the user sees a distinct message for a timeout,
//! a network failure, or a rejected request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default request timeout.
pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimum phone number length.
pub const MIN_PHONE_LEN: usize = 9;

/// Minimum donor name length.
pub const MIN_NAME_LEN: usize = 2;

/// Name used when the donor leaves it blank.
pub const ANONYMOUS_DONOR: &str = "Donor";

/// Problems with the form, caught before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Phone or amount left empty.
    #[error("Fill all required fields")]
    MissingFields,
    /// Phone number too short.
    #[error("Invalid phone number: needs at least {MIN_PHONE_LEN} characters")]
    InvalidPhone,
    /// Amount is not a positive whole number.
    #[error("Amount must be a positive whole number")]
    InvalidAmount,
    /// Name given but too short.
    #[error("Name must be at least {MIN_NAME_LEN} characters")]
    InvalidName,
}

/// Errors from the relay call.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The configured endpoint is not a valid URL.
    #[error("invalid payment endpoint: {0}")]
    InvalidUrl(String),
    /// The request did not complete within the timeout.
    #[error("payment request timed out after {0:?}")]
    Timeout(Duration),
    /// The request could not be sent or the connection failed.
    #[error("payment request failed: {0}")]
    Network(String),
    /// The relay answered but refused the transaction.
    #[error("payment rejected: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the relay.
        message: String,
    },
    /// The relay answered with something that is not a payment response.
    #[error("unexpected payment response: {0}")]
    InvalidResponse(String),
}

impl PaymentError {
    /// What to tell the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUrl(_) => "Payment is not configured correctly.".to_string(),
            Self::Timeout(_) => {
                "The request timed out. Check your connection and try again.".to_string()
            }
            Self::Network(e) => format!("Network error: {e}"),
            Self::Rejected { message, .. } => format!("Transaction failed: {message}"),
            Self::InvalidResponse(_) => {
                "Transaction failed: the payment service sent an unexpected reply.".to_string()
            }
        }
    }
}

/// Raw form input.
#[derive(Debug, Clone, Default)]
pub struct DonationForm {
    /// Mobile-money phone number.
    pub phone: String,
    /// Amount as typed.
    pub amount: String,
    /// Optional donor name.
    pub name: Option<String>,
}

impl DonationForm {
    /// Check the form and build the request body.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<DonationRequest, ValidationError> {
        let phone = self.phone.trim();
        let amount = self.amount.trim();
        if phone.is_empty() || amount.is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if phone.chars().count() < MIN_PHONE_LEN {
            return Err(ValidationError::InvalidPhone);
        }
        let amount = match amount.parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => return Err(ValidationError::InvalidAmount),
        };
        let name = match self.name.as_deref().map(str::trim) {
            None | Some("") => ANONYMOUS_DONOR.to_string(),
            Some(name) if name.chars().count() < MIN_NAME_LEN => {
                return Err(ValidationError::InvalidName)
            }
            Some(name) => name.to_string(),
        };
        Ok(DonationRequest {
            phone: phone.to_string(),
            amount,
            name,
        })
    }
}

/// Validated request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationRequest {
    /// Mobile-money phone number.
    pub phone: String,
    /// Whole amount, greater than zero.
    pub amount: u64,
    /// Donor name.
    pub name: String,
}

/// Relay response body.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentResponse {
    /// `"success"` or `"error"`.
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Alternate error field some relays use.
    #[serde(default)]
    pub error: Option<String>,
    /// Provider payload on success.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl PaymentResponse {
    fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// HTTP client for the donation relay.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    http: Client,
    endpoint: Url,
    timeout: Duration,
}

impl PaymentClient {
    /// Create a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InvalidUrl`] if the URL is malformed, or
    /// [`PaymentError::Network`] if the HTTP client fails to build.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, PaymentError> {
        let endpoint = Url::parse(endpoint).map_err(|e| PaymentError::InvalidUrl(e.to_string()))?;
        let http = Client::builder()
            .user_agent(concat!("meme-viber/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| PaymentError::Network(e.to_string()))?;
        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    /// The relay URL.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send a validated donation.
    ///
    /// # Errors
    ///
    /// Returns a classified [`PaymentError`] for any failure.
    #[tracing::instrument(
        skip(self, request),
        fields(endpoint = %self.endpoint, amount = request.amount)
    )]
    pub async fn donate(&self, request: &DonationRequest) -> Result<PaymentResponse, PaymentError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(&e))?;
        let parsed: Result<PaymentResponse, _> = serde_json::from_str(&body);

        match parsed {
            Ok(reply) if status.is_success() && reply.is_success() => {
                tracing::info!("Donation accepted");
                Ok(reply)
            }
            Ok(reply) => {
                let message = reply.failure_message();
                tracing::warn!(status = status.as_u16(), %message, "Donation rejected");
                Err(PaymentError::Rejected {
                    status: status.as_u16(),
                    message,
                })
            }
            Err(_) if !status.is_success() => {
                tracing::warn!(status = status.as_u16(), "Donation rejected without a body");
                Err(PaymentError::Rejected {
                    status: status.as_u16(),
                    message: status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string(),
                })
            }
            Err(e) => Err(PaymentError::InvalidResponse(e.to_string())),
        }
    }

    fn classify(&self, error: &reqwest::Error) -> PaymentError {
        if error.is_timeout() {
            tracing::warn!(timeout = ?self.timeout, "Donation request timed out");
            PaymentError::Timeout(self.timeout)
        } else if error.is_decode() {
            PaymentError::InvalidResponse(error.to_string())
        } else {
            tracing::warn!(error = %error, "Donation request failed");
            PaymentError::Network(error.to_string())
        }
    }
}

/// Why a donation did not go through.
#[derive(Debug, Error)]
pub enum DonateError {
    /// A submission is already running.
    #[error("a donation is already being submitted")]
    InProgress,
    /// The form is invalid; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The relay call failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl DonateError {
    /// What to tell the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InProgress => "Please wait, your donation is being processed.".to_string(),
            Self::Validation(e) => e.to_string(),
            Self::Payment(e) => e.user_message(),
        }
    }
}

/// One donation form with its submit control.
///
/// `submitting` mirrors the disabled state of the submit button: it is set
/// while a request is in flight and cleared on every exit path.
#[derive(Debug)]
pub struct DonationFlow {
    client: PaymentClient,
    submitting: AtomicBool,
}

/// Clears the submitting flag when dropped.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DonationFlow {
    /// Wrap a client.
    #[must_use]
    pub fn new(client: PaymentClient) -> Self {
        Self {
            client,
            submitting: AtomicBool::new(false),
        }
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Validate and send.
    ///
    /// # Errors
    ///
    /// Returns [`DonateError::Validation`] without touching the network,
    /// [`DonateError::InProgress`] if another submission is running, or
    /// [`DonateError::Payment`] if the relay call fails.
    pub async fn submit(&self, form: &DonationForm) -> Result<PaymentResponse, DonateError> {
        let request = form.validate()?;
        if self
            .submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DonateError::InProgress);
        }
        let _guard = SubmitGuard(&self.submitting);
        Ok(self.client.donate(&request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(phone: &str, amount: &str, name: Option<&str>) -> DonationForm {
        DonationForm {
            phone: phone.into(),
            amount: amount.into(),
            name: name.map(Into::into),
        }
    }

    #[test]
    fn test_short_phone_rejected() {
        assert_eq!(
            form("12345", "10", Some("Al")).validate(),
            Err(ValidationError::InvalidPhone)
        );
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            form("", "10", None).validate(),
            Err(ValidationError::MissingFields)
        );
        assert_eq!(
            form("0712345678", "  ", None).validate(),
            Err(ValidationError::MissingFields)
        );
    }

    #[test]
    fn test_amount_must_be_positive_integer() {
        for amount in ["0", "-5", "10.5", "ten"] {
            assert_eq!(
                form("0712345678", amount, None).validate(),
                Err(ValidationError::InvalidAmount),
                "amount {amount:?}"
            );
        }
    }

    #[test]
    fn test_name_rules() {
        assert_eq!(
            form("0712345678", "10", Some(" A ")).validate(),
            Err(ValidationError::InvalidName)
        );
        let blank = form("0712345678", "10", Some("   ")).validate().expect("valid");
        assert_eq!(blank.name, ANONYMOUS_DONOR);
        let named = form(" 0712345678 ", "10", Some(" Al ")).validate().expect("valid");
        assert_eq!(
            named,
            DonationRequest {
                phone: "0712345678".into(),
                amount: 10,
                name: "Al".into(),
            }
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            PaymentClient::new("not a url", DEFAULT_PAYMENT_TIMEOUT),
            Err(PaymentError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let messages = [
            PaymentError::Timeout(DEFAULT_PAYMENT_TIMEOUT).user_message(),
            PaymentError::Network("refused".into()).user_message(),
            PaymentError::Rejected {
                status: 400,
                message: "bad".into(),
            }
            .user_message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    #[test]
    fn test_request_serializes_to_relay_shape() {
        let body = serde_json::to_value(DonationRequest {
            phone: "0712345678".into(),
            amount: 10,
            name: "Donor".into(),
        })
        .expect("json");
        assert_eq!(
            body,
            serde_json::json!({"phone": "0712345678", "amount": 10, "name": "Donor"})
        );
    }
}
