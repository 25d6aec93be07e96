use std::sync::Arc;

use tokio::task::AbortHandle;

use crate::models::expense::currency::{format_currency, strip_non_digits};
use crate::models::expense::preview::{self, PreviewError};
use crate::models::expense::validate::{self, DocumentError};
use crate::models::expense::{
    DisplayState, Document, DocumentSummary, DocumentUpload, DraftSummary, Field, FormSnapshot,
    RequestDraft, SubmitOutcome, ValidationErrors,
};
use crate::submission::{ExpenseRequestPayload, SubmissionAck, SubmissionError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("form is not editable while the submission confirmation is shown")]
    NotEditing,

    #[error("a submission for this form is still in progress")]
    SubmissionInFlight,

    #[error("form state lock poisoned")]
    Poisoned,
}

/// A document accepted by `select_document` whose preview has not been
/// rendered yet. Decoding yields exactly one result.
#[derive(Debug)]
pub struct PendingPreview {
    generation: u64,
    data: Arc<[u8]>,
}

impl PendingPreview {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decode on the blocking pool and return the result tagged with the
    /// generation it belongs to.
    pub async fn decode(self) -> (u64, Result<String, PreviewError>) {
        let generation = self.generation;
        let data = self.data;
        let result = tokio::task::spawn_blocking(move || preview::render_data_url(&data))
            .await
            .unwrap_or_else(|e| Err(PreviewError::Task(e.to_string())));
        (generation, result)
    }
}

/// State and transitions of one expense request form session.
#[derive(Debug, Default)]
pub struct FormController {
    draft: RequestDraft,
    errors: ValidationErrors,
    preview: Option<String>,
    state: DisplayState,
    form_error: Option<String>,
    /// Bumped whenever the document changes; stale preview decodes compare against it.
    document_generation: u64,
    submission_id: u64,
    /// Set between `prepare_submission` and `finish_submission`.
    submitting: bool,
    reset_timer: Option<AbortHandle>,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &RequestDraft {
        &self.draft
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn state(&self) -> DisplayState {
        self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state == DisplayState::Editing
    }

    /// Form-level message from a failed submission, separate from field errors.
    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn submission_id(&self) -> u64 {
        self.submission_id
    }

    /// The amount as the input shows it.
    pub fn amount_display(&self) -> String {
        format_currency(&self.draft.amount)
    }

    fn ensure_editing(&self) -> Result<(), FormError> {
        if !self.is_editing() {
            return Err(FormError::NotEditing);
        }
        if self.submitting {
            return Err(FormError::SubmissionInFlight);
        }
        Ok(())
    }

    /// Store the purpose verbatim; trimming only happens during validation.
    pub fn edit_purpose(&mut self, text: &str) -> Result<(), FormError> {
        self.ensure_editing()?;
        self.draft.purpose = text.to_string();
        self.clear_field_error(Field::Purpose);
        Ok(())
    }

    /// Store only the digits of `raw`.
    pub fn edit_amount(&mut self, raw: &str) -> Result<(), FormError> {
        self.ensure_editing()?;
        self.draft.amount = strip_non_digits(raw);
        self.clear_field_error(Field::Amount);
        Ok(())
    }

    /// Handle a file picker result.
    ///
    /// `None` (picker cancelled) does nothing. A file failing the type or
    /// size check only sets the document error; any previously accepted
    /// document and its preview stay. An accepted file replaces the
    /// document immediately and returns the decode job for its preview.
    pub fn select_document(
        &mut self,
        upload: Option<DocumentUpload>,
    ) -> Result<Option<PendingPreview>, FormError> {
        self.ensure_editing()?;
        let Some(upload) = upload else {
            return Ok(None);
        };

        if let Err(e) = validate::check_upload(&upload) {
            log::warn!("Rejected document {:?}: {:?}", upload.file_name, e);
            self.errors.set(Field::Document, e.to_string());
            return Ok(None);
        }

        let document = Document::from(upload);
        let data = document.bytes();
        self.document_generation += 1;
        self.draft.document = Some(document);
        self.preview = None;
        self.clear_field_error(Field::Document);

        Ok(Some(PendingPreview {
            generation: self.document_generation,
            data,
        }))
    }

    /// Apply a finished preview decode. Results for a document that has
    /// since been replaced or removed are dropped; returns whether the
    /// result was applied.
    ///
    /// A decode failure means the file is not a readable image: the
    /// document is discarded and the document error explains why.
    pub fn complete_preview(
        &mut self,
        generation: u64,
        result: Result<String, PreviewError>,
    ) -> bool {
        if generation != self.document_generation || self.draft.document.is_none() {
            log::debug!("Dropping stale preview for generation {generation}");
            return false;
        }

        match result {
            Ok(url) => {
                self.preview = Some(url);
            }
            Err(e) => {
                log::warn!("Document preview failed: {e}");
                self.draft.document = None;
                self.preview = None;
                self.errors.set(Field::Document, DocumentError::Unreadable.to_string());
            }
        }
        true
    }

    /// Record why a file never reached `select_document`, e.g. because the
    /// upload was cut off for size. The current document stays.
    pub fn reject_document(&mut self, reason: DocumentError) -> Result<(), FormError> {
        self.ensure_editing()?;
        log::warn!("Rejected document before upload finished: {reason:?}");
        self.errors.set(Field::Document, reason.to_string());
        Ok(())
    }

    /// Drop the document and preview. Other fields and errors are untouched.
    pub fn remove_document(&mut self) -> Result<(), FormError> {
        self.ensure_editing()?;
        self.document_generation += 1;
        self.draft.document = None;
        self.preview = None;
        Ok(())
    }

    pub fn clear_field_error(&mut self, field: Field) {
        self.errors.clear(field);
    }

    /// Fresh whole-form validation, without storing the result.
    pub fn validate(&self) -> ValidationErrors {
        validate::validate_draft(&self.draft)
    }

    /// Replace the stored errors with a fresh validation pass; returns
    /// whether the form is valid.
    pub fn revalidate_all(&mut self) -> bool {
        self.errors = self.validate();
        self.errors.is_empty()
    }

    /// Submit without an external collaborator: valid forms go straight
    /// to `Submitted`.
    pub fn submit(&mut self) -> Result<SubmitOutcome, FormError> {
        match self.prepare_submission()? {
            Some(_) => Ok(self.finish_submission(Ok(SubmissionAck::default()))),
            None => Ok(SubmitOutcome::Rejected),
        }
    }

    /// First half of a submit: validate and, if valid, build the payload
    /// and lock the form until `finish_submission` or `abandon_submission`.
    /// Invalid forms keep their errors and nothing else changes.
    pub fn prepare_submission(&mut self) -> Result<Option<ExpenseRequestPayload>, FormError> {
        self.ensure_editing()?;
        self.form_error = None;
        if !self.revalidate_all() {
            log::debug!("Submit rejected: {} field error(s)", self.errors.len());
            return Ok(None);
        }
        self.submitting = true;
        Ok(Some(ExpenseRequestPayload::from_draft(&self.draft)))
    }

    /// Second half of a submit: apply the collaborator's answer. A failure
    /// unlocks the form with its input intact.
    pub fn finish_submission(
        &mut self,
        result: Result<SubmissionAck, SubmissionError>,
    ) -> SubmitOutcome {
        self.submitting = false;
        match result {
            Ok(ack) => {
                self.submission_id += 1;
                self.state = DisplayState::Submitted;
                log::info!(
                    "Expense request submitted (submission {}, reference {:?})",
                    self.submission_id,
                    ack.reference
                );
                SubmitOutcome::Accepted
            }
            Err(e) => {
                log::warn!("Expense request submission failed: {e}");
                self.form_error = Some(format!("Pengajuan gagal dikirim: {e}"));
                SubmitOutcome::Failed
            }
        }
    }

    /// Unlock a form whose submission never got an answer.
    pub fn abandon_submission(&mut self) {
        if self.submitting {
            log::warn!("Submission abandoned before the collaborator answered");
            self.submitting = false;
        }
    }

    /// Remember the timer that will reset this form, cancelling any older one.
    pub fn arm_reset_timer(&mut self, timer: AbortHandle) {
        if let Some(previous) = self.reset_timer.replace(timer) {
            previous.abort();
        }
    }

    /// Called by the reset timer. Only resets if the form is still showing
    /// the confirmation for `submission_id`.
    pub fn reset_after_submission(&mut self, submission_id: u64) -> bool {
        if self.state != DisplayState::Submitted || self.submission_id != submission_id {
            return false;
        }
        self.reset_timer = None;
        self.reset();
        true
    }

    /// Back to a fresh, empty, editable draft.
    pub fn reset(&mut self) {
        self.draft = RequestDraft::default();
        self.errors.clear_all();
        self.preview = None;
        self.form_error = None;
        self.document_generation += 1;
        self.submitting = false;
        self.state = DisplayState::Editing;
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            state: self.state,
            draft: DraftSummary {
                purpose: self.draft.purpose.clone(),
                amount: self.draft.amount.clone(),
                amount_display: self.amount_display(),
                document: self.draft.document().map(|d| DocumentSummary {
                    file_name: d.file_name().to_string(),
                    content_type: d.content_type().to_string(),
                    size: d.size(),
                }),
                authorization: self.draft.authorization(),
                authorization_label: self.draft.authorization().label(),
            },
            errors: self.errors.clone(),
            has_preview: self.preview.is_some(),
            submitting: self.submitting,
            form_error: self.form_error.clone(),
        }
    }
}

impl Drop for FormController {
    fn drop(&mut self) {
        if let Some(timer) = self.reset_timer.take() {
            timer.abort();
        }
    }
}
