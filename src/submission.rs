//! The external collaborator that receives a validated expense request.
//!
//! The form itself never persists anything. By default the request is
//! acknowledged locally; when `SUBMISSION_ENDPOINT` is set the payload is
//! POSTed there as JSON instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::models::expense::RequestDraft;
use crate::models::expense::currency::format_currency;

/// Wire shape expected by the submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRequestPayload {
    pub name: String,
    pub amount: String,
    pub reason: String,
}

impl ExpenseRequestPayload {
    pub fn from_draft(draft: &RequestDraft) -> Self {
        let purpose = draft.purpose().trim();
        let mut reason = format!("{purpose} ({})", format_currency(draft.amount()));
        if let Some(doc) = draft.document() {
            reason.push_str(&format!("; bukti: {}", doc.file_name()));
        }
        reason.push_str(&format!("; status: {}", draft.authorization().label()));

        Self {
            name: purpose.to_string(),
            amount: draft.amount().to_string(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAck {
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{0}")]
    Rejected(String),

    #[error("server tidak dapat dihubungi ({0})")]
    Transport(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

#[async_trait]
pub trait ExpenseSubmitter: Send + Sync {
    async fn submit_expense_request(
        &self,
        payload: &ExpenseRequestPayload,
    ) -> Result<SubmissionAck, SubmissionError>;
}

/// Accepts every request immediately. There is no persistence behind it.
#[derive(Debug, Clone, Default)]
pub struct LocalAcknowledger;

#[async_trait]
impl ExpenseSubmitter for LocalAcknowledger {
    async fn submit_expense_request(
        &self,
        payload: &ExpenseRequestPayload,
    ) -> Result<SubmissionAck, SubmissionError> {
        log::info!("Expense request acknowledged locally: {} / {}", payload.name, payload.amount);
        Ok(SubmissionAck::default())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Sends the payload to a remote endpoint as JSON.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: Client,
    endpoint: String,
}

impl HttpSubmitter {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExpenseSubmitter for HttpSubmitter {
    async fn submit_expense_request(
        &self,
        payload: &ExpenseRequestPayload,
    ) -> Result<SubmissionAck, SubmissionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("server menolak pengajuan (HTTP {})", status.as_u16()));
            return Err(SubmissionError::Rejected(message));
        }

        // An empty or non-JSON success body is still a success.
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

/// Pick the submitter for this process from configuration.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn ExpenseSubmitter>, SubmissionError> {
    match &config.submission_endpoint {
        Some(endpoint) => {
            log::info!("Submitting expense requests to {endpoint}");
            Ok(Arc::new(HttpSubmitter::new(endpoint, config.submission_timeout)?))
        }
        None => {
            log::info!("No SUBMISSION_ENDPOINT set, acknowledging requests locally");
            Ok(Arc::new(LocalAcknowledger))
        }
    }
}
