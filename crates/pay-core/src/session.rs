//! # Payment Session Types
//!
//! Client-side mirror of one checkout attempt and the status snapshots the
//! payment service reports for it.

use crate::money::{Amount, Currency};
use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Provider status of a payment.
///
/// The provider vocabulary is open; anything unrecognized is kept in
/// `Other` and treated as non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PaymentStatus {
    /// Created, waiting for the customer
    #[default]
    Pending,
    /// Authorized, waiting for capture
    WaitingForCapture,
    /// Paid
    Succeeded,
    /// Canceled by the customer or the provider
    Canceled,
    /// Declined
    Failed,
    /// Unknown provider status (passthrough)
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::WaitingForCapture => "waiting_for_capture",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Other(raw) => raw.as_str(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => PaymentStatus::Pending,
            "waiting_for_capture" => PaymentStatus::WaitingForCapture,
            "succeeded" => PaymentStatus::Succeeded,
            "canceled" => PaymentStatus::Canceled,
            "failed" => PaymentStatus::Failed,
            other => PaymentStatus::Other(other.to_string()),
        }
    }

    /// Terminal statuses end polling
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Succeeded | PaymentStatus::Canceled | PaymentStatus::Failed
        )
    }

    /// Canceled or failed
    pub fn is_rejected(&self) -> bool {
        matches!(self, PaymentStatus::Canceled | PaymentStatus::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PaymentStatus::parse(&raw))
    }
}

/// A payment created by the payment service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Provider payment ID
    pub payment_id: String,

    /// Status at creation time
    #[serde(default)]
    pub status: PaymentStatus,

    /// Provider redirect target, consumed once to start checkout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confirmation_url: Option<String>,

    /// Amount as normalized by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,

    /// Currency as reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    /// Creation timestamp (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl PaymentSession {
    /// Create a new pending session
    pub fn new(payment_id: impl Into<String>, confirmation_url: Option<String>) -> Self {
        Self {
            payment_id: payment_id.into(),
            status: PaymentStatus::Pending,
            confirmation_url,
            amount: None,
            currency: None,
            created_at: None,
        }
    }

    /// Take the confirmation URL. Returns `Some` at most once per session.
    pub fn take_confirmation_url(&mut self) -> Option<String> {
        self.confirmation_url.take().filter(|url| !url.is_empty())
    }

    /// Check if the checkout target has not been consumed yet
    pub fn has_confirmation_url(&self) -> bool {
        self.confirmation_url
            .as_deref()
            .map(|url| !url.is_empty())
            .unwrap_or(false)
    }

    /// Currency as reported, defaulting to rubles
    pub fn currency(&self) -> Currency {
        self.currency.clone().unwrap_or_default()
    }
}

/// Status of a payment as reported by one status call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusSnapshot {
    /// Provider payment ID
    pub payment_id: String,

    /// Provider status
    pub status: PaymentStatus,

    /// Provider paid flag
    #[serde(default)]
    pub paid: bool,

    /// Amount as reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,

    /// Creation timestamp, kept exactly as the server sent it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl PaymentStatusSnapshot {
    /// Paid, either by flag or by status
    pub fn is_success(&self) -> bool {
        self.paid || self.status == PaymentStatus::Succeeded
    }

    /// Canceled or failed
    pub fn is_rejected(&self) -> bool {
        self.status.is_rejected()
    }

    /// Polling stops on this snapshot
    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_rejected()
    }

    /// Parsed creation time, if the server sent RFC 3339
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// A QR-code (SBP) payment: the customer scans `qr_data` in a banking app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayment {
    /// ID to poll; the service may send it as a number
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub payment_id: String,

    /// Provider-side payment ID, when reported separately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_payment_id: Option<String>,

    /// Payload to render as a QR code
    #[serde(default)]
    pub qr_data: String,

    /// Status at creation time
    #[serde(default)]
    pub status: PaymentStatus,
}

impl QrPayment {
    /// Check if there is anything to render
    pub fn has_qr_data(&self) -> bool {
        !self.qr_data.trim().is_empty()
    }
}

fn id_from_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    deserializer.deserialize_any(IdVisitor)
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a payment id as a string or an integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }
}
