//! # Delivery Client
//!
//! One HTTP POST per record against the remote scans table.
//!
//! ## Request Shape
//! ```text
//! POST <base_url>/rest/v1/scans
//! Content-Type: application/json
//! apikey: <key>
//! Authorization: Bearer <key>
//! Prefer: return=representation
//!
//! {"uid":"04A39F"}
//! ```
//!
//! ## Outcome Mapping
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────┐
//! │ Situation                    │ Outcome                          │
//! ├──────────────────────────────┼──────────────────────────────────┤
//! │ link down (no request sent)  │ TransportFailure { offline }     │
//! │ refused / timeout / DNS      │ TransportFailure                 │
//! │ 201 Created                  │ Delivered                        │
//! │ anything else (incl. 200)    │ Rejected(status)                 │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! The client never retries and never touches the queue; callers decide
//! what to do with a non-delivered record.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use tagrelay_core::Record;

use crate::config::EndpointSettings;
use crate::device::Connectivity;
use crate::error::{RelayError, RelayResult};

// =============================================================================
// Outcome
// =============================================================================

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Endpoint answered 201 Created.
    Delivered,

    /// Endpoint answered with another status.
    Rejected(u16),

    /// No response. `offline` is set when the request was never sent.
    TransportFailure { offline: bool },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    /// Matching error for anything but `Delivered`.
    pub fn error(&self) -> Option<RelayError> {
        match *self {
            DeliveryOutcome::Delivered => None,
            DeliveryOutcome::Rejected(code) => Some(RelayError::RemoteRejection(code)),
            DeliveryOutcome::TransportFailure { offline: true } => {
                Some(RelayError::ConnectivityUnavailable)
            }
            DeliveryOutcome::TransportFailure { offline: false } => Some(
                RelayError::TransportFailure("no response from endpoint".into()),
            ),
        }
    }
}

// =============================================================================
// Deliver Trait
// =============================================================================

/// Something that can push one record upstream.
#[allow(async_fn_in_trait)]
pub trait Deliver {
    async fn deliver<C: Connectivity>(&self, link: &C, record: &Record) -> DeliveryOutcome;
}

// =============================================================================
// HTTP Client
// =============================================================================

#[derive(Serialize)]
struct ScanPayload<'a> {
    uid: &'a str,
}

/// REST client for the scans table.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl DeliveryClient {
    /// Builds the client once; the underlying connection pool is reused for
    /// every delivery.
    pub fn new(settings: &EndpointSettings) -> RelayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| RelayError::ClientBuild(e.to_string()))?;

        Ok(DeliveryClient {
            http,
            url: settings.scans_url(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Deliver for DeliveryClient {
    async fn deliver<C: Connectivity>(&self, link: &C, record: &Record) -> DeliveryOutcome {
        if !link.is_connected() {
            debug!(record = %record, "Link down, not sending");
            return DeliveryOutcome::TransportFailure { offline: true };
        }

        let body = match serde_json::to_vec(&ScanPayload {
            uid: record.as_str(),
        }) {
            Ok(body) => body,
            Err(e) => {
                warn!(record = %record, error = %e, "Failed to encode payload");
                return DeliveryOutcome::TransportFailure { offline: false };
            }
        };

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("Prefer", "return=representation")
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(record = %record, error = %e, "Delivery transport failure");
                return DeliveryOutcome::TransportFailure { offline: false };
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status == StatusCode::CREATED {
            debug!(record = %record, body = %text, "Record delivered");
            DeliveryOutcome::Delivered
        } else {
            warn!(
                record = %record,
                status = status.as_u16(),
                body = %text,
                "Endpoint rejected record"
            );
            DeliveryOutcome::Rejected(status.as_u16())
        }
    }
}
