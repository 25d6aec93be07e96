use actix_session::Session;
use askama::Template;

use crate::auth::csrf;
use crate::form::FormController;
use crate::models::expense::Field;

pub const SCHOOL_NAME: &str = "MTs. KH A Wahab Muhsin";
pub const PAGE_SUBTITLE: &str = "Formulir Pengajuan Pengeluaran";

/// Context shared by every page. Templates access it as `ctx.*`.
pub struct PageContext {
    pub school_name: &'static str,
    pub subtitle: &'static str,
    pub csrf_token: String,
}

impl PageContext {
    pub fn build(session: &Session) -> Self {
        Self {
            school_name: SCHOOL_NAME,
            subtitle: PAGE_SUBTITLE,
            csrf_token: csrf::get_or_create_token(session),
        }
    }
}

#[derive(Template)]
#[template(path = "expense/form.html")]
pub struct ExpenseFormTemplate {
    pub ctx: PageContext,
    pub purpose: String,
    pub amount_display: String,
    pub document_name: Option<String>,
    pub preview: Option<String>,
    pub authorization_label: &'static str,
    pub purpose_error: Option<String>,
    pub amount_error: Option<String>,
    pub document_error: Option<String>,
    pub form_error: Option<String>,
}

impl ExpenseFormTemplate {
    pub fn from_controller(ctx: PageContext, form: &FormController) -> Self {
        let draft = form.draft();
        let error = |field: Field| form.errors().get(field).map(str::to_string);
        Self {
            ctx,
            purpose: draft.purpose().to_string(),
            amount_display: form.amount_display(),
            document_name: draft.document().map(|d| d.file_name().to_string()),
            preview: form.preview().map(str::to_string),
            authorization_label: draft.authorization().label(),
            purpose_error: error(Field::Purpose),
            amount_error: error(Field::Amount),
            document_error: error(Field::Document),
            form_error: form.form_error().map(str::to_string),
        }
    }
}

#[derive(Template)]
#[template(path = "expense/submitted.html")]
pub struct SubmittedTemplate {
    pub ctx: PageContext,
    pub reset_seconds: u64,
}
