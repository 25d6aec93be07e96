use std::sync::Arc;

use actix_multipart::form::{MultipartForm, bytes::Bytes as FilePart, text::Text};
use actix_multipart::MultipartError;
use actix_session::{Session, SessionExt};
use actix_web::error::{InternalError, PayloadError};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::auth::csrf;
use crate::errors::{AppError, render};
use crate::form::{FormController, FormError, FormHandle, FormRegistry};
use crate::models::expense::DocumentUpload;
use crate::models::expense::validate::DocumentError;
use crate::models::expense::currency::{format_currency, strip_non_digits};
use crate::submission::ExpenseSubmitter;
use crate::templates_structs::{ExpenseFormTemplate, PageContext, SubmittedTemplate};

const FORM_ID_KEY: &str = "form_id";

#[derive(Debug, Deserialize)]
pub struct PurposeForm {
    #[serde(default)]
    pub purpose: String,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct AmountForm {
    #[serde(default)]
    pub amount: String,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CsrfOnlyForm {
    pub csrf_token: String,
}

/// Every button of the main form posts the text fields along, so typed
/// input survives uploads and removals as well as submits.
#[derive(Debug, Deserialize)]
pub struct DraftFieldsForm {
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct FormattedAmount {
    pub digits: String,
    pub display: String,
}

/// Multipart body of the document picker. The part limit sits above the
/// 5 MiB acceptance limit so most oversized files get the acceptance
/// check's message; anything past it is caught by `upload_error`.
#[derive(MultipartForm)]
pub struct DocumentUploadForm {
    #[multipart(limit = "16MB")]
    pub document: Option<FilePart>,
    pub purpose: Option<Text<String>>,
    pub amount: Option<Text<String>>,
    pub csrf_token: Text<String>,
}

/// Look up (or mount) the form belonging to this visitor.
fn current_form(session: &Session, registry: &FormRegistry) -> Result<Arc<FormHandle>, AppError> {
    let stored = session
        .get::<String>(FORM_ID_KEY)
        .map_err(|e| AppError::Session(e.to_string()))?;
    let (id, handle) = registry.open(stored.as_deref());
    if stored.as_deref() != Some(id.as_str()) {
        session
            .insert(FORM_ID_KEY, &id)
            .map_err(|e| AppError::Session(e.to_string()))?;
    }
    Ok(handle)
}

fn back_to_form() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", "/"))
        .finish()
}

fn apply_text_fields(
    controller: &mut FormController,
    purpose: Option<&str>,
    amount: Option<&str>,
) -> Result<(), FormError> {
    if let Some(purpose) = purpose {
        controller.edit_purpose(purpose)?;
    }
    if let Some(amount) = amount {
        controller.edit_amount(amount)?;
    }
    Ok(())
}

/// Multipart extraction failures. An upload cut off by the size limits
/// shows up as the document's size error; anything else stays a 400.
pub fn upload_error(err: MultipartError, req: &HttpRequest) -> actix_web::Error {
    if !matches!(err, MultipartError::Payload(PayloadError::Overflow)) {
        return err.into();
    }

    let session = req.get_session();
    let handle = match (
        session.get::<String>(FORM_ID_KEY),
        req.app_data::<web::Data<FormRegistry>>(),
    ) {
        (Ok(Some(id)), Some(registry)) => registry.get(&id),
        _ => None,
    };
    if let Some(handle) = handle {
        let size = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let rejected = handle
            .lock()
            .and_then(|mut form| form.reject_document(DocumentError::TooLarge { size }));
        if let Err(e) = rejected {
            log::debug!("Oversized upload not recorded: {e}");
        }
    }
    InternalError::from_response(err, back_to_form()).into()
}

/// An empty part with no file name is what browsers send when nothing was picked.
fn into_upload(part: Option<FilePart>) -> Option<DocumentUpload> {
    let part = part?;
    let file_name = part.file_name.unwrap_or_default();
    if file_name.is_empty() && part.data.is_empty() {
        return None;
    }
    let content_type = part
        .content_type
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default();
    Some(DocumentUpload::new(file_name, content_type, part.data.to_vec()))
}

/// GET /
/// Renders the form, or the confirmation while a submission is being shown.
pub async fn index(
    session: Session,
    registry: web::Data<FormRegistry>,
) -> Result<HttpResponse, AppError> {
    let handle = current_form(&session, &registry)?;
    let ctx = PageContext::build(&session);
    let form = handle.lock()?;

    if form.is_editing() {
        render(ExpenseFormTemplate::from_controller(ctx, &form))
    } else {
        render(SubmittedTemplate {
            ctx,
            reset_seconds: handle.reset_delay().as_secs().max(1),
        })
    }
}

/// GET /draft
/// JSON view of the visitor's form.
pub async fn snapshot(
    session: Session,
    registry: web::Data<FormRegistry>,
) -> Result<HttpResponse, AppError> {
    let handle = current_form(&session, &registry)?;
    let snapshot = handle.lock()?.snapshot();
    Ok(HttpResponse::Ok().json(snapshot))
}

/// POST /draft/purpose
pub async fn edit_purpose(
    session: Session,
    registry: web::Data<FormRegistry>,
    form: web::Form<PurposeForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let handle = current_form(&session, &registry)?;
    handle.lock()?.edit_purpose(&form.purpose)?;
    Ok(back_to_form())
}

/// POST /draft/amount
pub async fn edit_amount(
    session: Session,
    registry: web::Data<FormRegistry>,
    form: web::Form<AmountForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let handle = current_form(&session, &registry)?;
    handle.lock()?.edit_amount(&form.amount)?;
    Ok(back_to_form())
}

/// GET /draft/amount/format?value=
/// Formatting only; nothing is stored.
pub async fn format_amount(query: web::Query<FormatQuery>) -> HttpResponse {
    let digits = strip_non_digits(&query.value);
    let display = format_currency(&digits);
    HttpResponse::Ok().json(FormattedAmount { digits, display })
}

/// POST /draft/document
/// Attaches the picked file right away; its preview is decoded in the background.
pub async fn upload_document(
    session: Session,
    registry: web::Data<FormRegistry>,
    MultipartForm(form): MultipartForm<DocumentUploadForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token.0)?;
    let handle = current_form(&session, &registry)?;
    apply_text_fields(
        &mut *handle.lock()?,
        form.purpose.as_ref().map(|t| t.0.as_str()),
        form.amount.as_ref().map(|t| t.0.as_str()),
    )?;
    handle.select_document_detached(into_upload(form.document))?;
    Ok(back_to_form())
}

/// POST /draft/document/remove
pub async fn remove_document(
    session: Session,
    registry: web::Data<FormRegistry>,
    form: web::Form<DraftFieldsForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let handle = current_form(&session, &registry)?;
    let mut controller = handle.lock()?;
    apply_text_fields(&mut controller, form.purpose.as_deref(), form.amount.as_deref())?;
    controller.remove_document()?;
    Ok(back_to_form())
}

/// POST /draft/discard
/// Throws the draft away; the next visit starts from an empty form.
pub async fn discard(
    session: Session,
    registry: web::Data<FormRegistry>,
    form: web::Form<CsrfOnlyForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    if let Ok(Some(id)) = session.get::<String>(FORM_ID_KEY) {
        registry.discard(&id);
    }
    session.remove(FORM_ID_KEY);
    Ok(back_to_form())
}

/// POST /submit
pub async fn submit(
    session: Session,
    registry: web::Data<FormRegistry>,
    submitter: web::Data<dyn ExpenseSubmitter>,
    form: web::Form<DraftFieldsForm>,
) -> Result<HttpResponse, AppError> {
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let handle = current_form(&session, &registry)?;
    apply_text_fields(
        &mut *handle.lock()?,
        form.purpose.as_deref(),
        form.amount.as_deref(),
    )?;

    let outcome = handle.submit_with(submitter.get_ref()).await?;
    log::debug!("Submit outcome: {outcome:?}");
    Ok(back_to_form())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_upload_empty_part_is_none() {
        let part = FilePart {
            data: Default::default(),
            content_type: None,
            file_name: Some(String::new()),
        };
        assert!(into_upload(Some(part)).is_none());
        assert!(into_upload(None).is_none());
    }

    #[test]
    fn test_into_upload_uses_mime_essence() {
        let part = FilePart {
            data: vec![1u8, 2, 3].into(),
            content_type: Some("image/png; charset=binary".parse().unwrap()),
            file_name: Some("nota.png".to_string()),
        };
        let upload = into_upload(Some(part)).unwrap();
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.file_name, "nota.png");
        assert_eq!(upload.size(), 3);
    }
}
