use super::currency;
use super::types::{
    ACCEPTED_CONTENT_TYPES, Document, DocumentUpload, Field, MAX_DOCUMENT_BYTES, MINIMUM_AMOUNT,
    RequestDraft, ValidationErrors,
};

pub const PURPOSE_REQUIRED: &str = "Tujuan pengeluaran harus diisi";
pub const AMOUNT_REQUIRED: &str = "Nominal harus diisi";
pub const AMOUNT_BELOW_MINIMUM: &str = "Nominal minimal Rp 1.000";
pub const DOCUMENT_REQUIRED: &str = "Bukti pendukung harus diunggah";
pub const DOCUMENT_WRONG_TYPE: &str = "Hanya file JPG dan PNG yang diizinkan";
pub const DOCUMENT_TOO_LARGE: &str = "Ukuran file tidak boleh lebih dari 5MB";
pub const DOCUMENT_UNREADABLE: &str = "File tidak dapat dibaca";

/// Reasons a picked file is refused. `Display` is the message shown under
/// the document field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("{}", DOCUMENT_WRONG_TYPE)]
    UnsupportedType { content_type: String },

    #[error("{}", DOCUMENT_TOO_LARGE)]
    TooLarge { size: usize },

    #[error("{}", DOCUMENT_UNREADABLE)]
    Unreadable,
}

/// Validate the purpose: required once surrounding whitespace is trimmed.
pub fn validate_purpose(purpose: &str) -> Option<String> {
    if purpose.trim().is_empty() {
        return Some(PURPOSE_REQUIRED.to_string());
    }
    None
}

/// Validate the stored amount digits: required, then at least Rp 1.000.
pub fn validate_amount(amount: &str) -> Option<String> {
    if amount.is_empty() {
        return Some(AMOUNT_REQUIRED.to_string());
    }
    if currency::is_below(amount, MINIMUM_AMOUNT) {
        return Some(AMOUNT_BELOW_MINIMUM.to_string());
    }
    None
}

pub fn validate_document(document: Option<&Document>) -> Option<String> {
    match document {
        Some(_) => None,
        None => Some(DOCUMENT_REQUIRED.to_string()),
    }
}

/// Type and size gate applied when a file is picked. The declared MIME
/// type is only a UX filter; the preview decoder checks the real bytes.
pub fn check_upload(upload: &DocumentUpload) -> Result<(), DocumentError> {
    let content_type = upload.content_type.trim().to_ascii_lowercase();
    if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(DocumentError::UnsupportedType {
            content_type: upload.content_type.clone(),
        });
    }
    if upload.size() > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge { size: upload.size() });
    }
    Ok(())
}

/// Whole-form validation. Always builds a fresh error set.
pub fn validate_draft(draft: &RequestDraft) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if let Some(msg) = validate_purpose(draft.purpose()) {
        errors.set(Field::Purpose, msg);
    }
    if let Some(msg) = validate_amount(draft.amount()) {
        errors.set(Field::Amount, msg);
    }
    if let Some(msg) = validate_document(draft.document()) {
        errors.set(Field::Document, msg);
    }
    errors
}
