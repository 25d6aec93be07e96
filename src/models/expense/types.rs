use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Upper bound on an accepted supporting document (5 MiB).
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

/// MIME types the file picker offers and the form accepts.
pub const ACCEPTED_CONTENT_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Smallest amount (whole rupiah) a request may ask for.
pub const MINIMUM_AMOUNT: u64 = 1000;

/// Authorization status of a request. Drafts created client-side can only
/// ever be pending; approval happens elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatus {
    #[default]
    PendingApproval,
}

impl AuthorizationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AuthorizationStatus::PendingApproval => "Menunggu Persetujuan",
        }
    }
}

/// The user-editable fields that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Purpose,
    Amount,
    Document,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Purpose, Field::Amount, Field::Document];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Purpose => "purpose",
            Field::Amount => "amount",
            Field::Document => "document",
        }
    }
}

/// A file exactly as it came out of the picker, before acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A supporting document that passed the type and size checks and is now
/// owned by the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    file_name: String,
    content_type: String,
    data: Arc<[u8]>,
}

impl Document {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Shared view of the bytes, handed to the preview decoder.
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }
}

impl From<DocumentUpload> for Document {
    fn from(upload: DocumentUpload) -> Self {
        Self {
            file_name: upload.file_name,
            content_type: upload.content_type,
            data: upload.data.into(),
        }
    }
}

/// The in-progress expense request.
///
/// `amount` holds the raw digit string; the formatted rupiah display is
/// always derived from it. `authorization` has no setter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDraft {
    pub(crate) purpose: String,
    pub(crate) amount: String,
    pub(crate) document: Option<Document>,
    authorization: AuthorizationStatus,
}

impl RequestDraft {
    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn authorization(&self) -> AuthorizationStatus {
        self.authorization
    }
}

/// Per-field validation messages. A field without an error has no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn set(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Drops the error for `field`; returns whether one was present.
    pub fn clear(&mut self, field: Field) -> bool {
        self.0.remove(&field).is_some()
    }

    pub fn clear_all(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

/// What the page shows: the editable form, or the success panel that
/// resets itself after a delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    #[default]
    Editing,
    Submitted,
}

/// Result of a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitOutcome {
    /// Validation passed and the request was acknowledged.
    Accepted,
    /// One or more fields failed validation; errors are stored.
    Rejected,
    /// Validation passed but the submission collaborator reported a failure.
    Failed,
}

/// Document metadata as exposed in JSON snapshots (bytes are never echoed).
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftSummary {
    pub purpose: String,
    pub amount: String,
    pub amount_display: String,
    pub document: Option<DocumentSummary>,
    pub authorization: AuthorizationStatus,
    pub authorization_label: &'static str,
}

/// Full read-only view of a form session, served by `GET /draft`.
#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
    pub state: DisplayState,
    pub draft: DraftSummary,
    pub errors: ValidationErrors,
    pub has_preview: bool,
    pub submitting: bool,
    pub form_error: Option<String>,
}
