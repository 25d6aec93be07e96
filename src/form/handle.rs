use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use super::controller::{FormController, FormError};
use crate::models::expense::preview::PreviewError;
use crate::models::expense::{DocumentUpload, SubmitOutcome};
use crate::submission::ExpenseSubmitter;

/// Owner of one `FormController`. Background work (preview decodes, the
/// post-submit reset) only holds a weak reference, so once the handle is
/// dropped nothing touches the controller again.
#[derive(Debug)]
pub struct FormHandle {
    controller: Arc<Mutex<FormController>>,
    reset_delay: Duration,
    last_seen: Mutex<Instant>,
}

impl FormHandle {
    pub fn new(reset_delay: Duration) -> Self {
        Self {
            controller: Arc::new(Mutex::new(FormController::new())),
            reset_delay,
            last_seen: Mutex::new(Instant::now()),
        }
    }

    pub fn reset_delay(&self) -> Duration {
        self.reset_delay
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, FormController>, FormError> {
        self.controller.lock().map_err(|_| FormError::Poisoned)
    }

    pub fn touch(&self) {
        if let Ok(mut seen) = self.last_seen.lock() {
            *seen = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .map(|seen| seen.elapsed())
            .unwrap_or_default()
    }

    /// Select a document and wait for its preview to be applied.
    pub async fn select_document(&self, upload: Option<DocumentUpload>) -> Result<(), FormError> {
        let pending = self.lock()?.select_document(upload)?;
        if let Some(pending) = pending {
            let (generation, result) = pending.decode().await;
            self.lock()?.complete_preview(generation, result);
        }
        Ok(())
    }

    /// Select a document and decode its preview in the background. The
    /// document is attached as soon as this returns; the preview follows.
    pub fn select_document_detached(&self, upload: Option<DocumentUpload>) -> Result<(), FormError> {
        let pending = self.lock()?.select_document(upload)?;
        if let Some(pending) = pending {
            let weak = Arc::downgrade(&self.controller);
            tokio::spawn(async move {
                let (generation, result) = pending.decode().await;
                apply_preview(&weak, generation, result);
            });
        }
        Ok(())
    }

    /// Submit without a collaborator and arm the reset timer on success.
    pub fn submit(&self) -> Result<SubmitOutcome, FormError> {
        let mut controller = self.lock()?;
        let outcome = controller.submit()?;
        if outcome == SubmitOutcome::Accepted {
            self.schedule_reset(&mut controller);
        }
        Ok(outcome)
    }

    /// Validate, hand the payload to `submitter`, and apply its answer.
    /// The lock is not held while the submitter runs; the controller
    /// refuses edits and further submits until the answer is applied.
    pub async fn submit_with(&self, submitter: &dyn ExpenseSubmitter) -> Result<SubmitOutcome, FormError> {
        let payload = {
            let mut controller = self.lock()?;
            match controller.prepare_submission()? {
                Some(payload) => payload,
                None => return Ok(SubmitOutcome::Rejected),
            }
        };

        let mut in_flight = InFlight {
            controller: self.controller.as_ref(),
            answered: false,
        };
        let result = submitter.submit_expense_request(&payload).await;
        in_flight.answered = true;

        let mut controller = self.lock()?;
        let outcome = controller.finish_submission(result);
        if outcome == SubmitOutcome::Accepted {
            self.schedule_reset(&mut controller);
        }
        Ok(outcome)
    }

    fn schedule_reset(&self, controller: &mut FormController) {
        let deadline = tokio::time::Instant::now() + self.reset_delay;
        let submission_id = controller.submission_id();
        let weak = Arc::downgrade(&self.controller);

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(controller) = weak.upgrade() else {
                log::debug!("Form discarded before reset of submission {submission_id}");
                return;
            };
            let Ok(mut form) = controller.lock() else {
                return;
            };
            if form.reset_after_submission(submission_id) {
                log::info!("Form reset after submission {submission_id}");
            }
        });
        controller.arm_reset_timer(task.abort_handle());
    }
}

/// Unlocks the controller if a `submit_with` future is dropped while
/// waiting on the submitter.
struct InFlight<'a> {
    controller: &'a Mutex<FormController>,
    answered: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.answered {
            return;
        }
        if let Ok(mut form) = self.controller.lock() {
            form.abandon_submission();
        }
    }
}

fn apply_preview(weak: &Weak<Mutex<FormController>>, generation: u64, result: Result<String, PreviewError>) {
    let Some(controller) = weak.upgrade() else {
        log::debug!("Form discarded before preview {generation} finished");
        return;
    };
    if let Ok(mut form) = controller.lock() {
        form.complete_preview(generation, result);
    }
}

