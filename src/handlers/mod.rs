use actix_multipart::form::MultipartFormConfig;
use actix_web::{HttpResponse, web};

pub mod expense_handlers;

const UPLOAD_MEMORY_LIMIT: usize = 16 * 1024 * 1024;

/// Routes of the expense request form. Static files and middleware are
/// wired in `main`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Buffered in memory; must exceed the 5 MiB acceptance limit so the
    // size check can produce its own message.
    cfg.app_data(
        MultipartFormConfig::default()
            .memory_limit(UPLOAD_MEMORY_LIMIT)
            .total_limit(UPLOAD_MEMORY_LIMIT + 64 * 1024)
            .error_handler(expense_handlers::upload_error),
    )
    .route("/", web::get().to(expense_handlers::index))
    .route("/submit", web::post().to(expense_handlers::submit))
    .route("/draft", web::get().to(expense_handlers::snapshot))
    .route("/draft/purpose", web::post().to(expense_handlers::edit_purpose))
    .route("/draft/amount", web::post().to(expense_handlers::edit_amount))
    .route("/draft/amount/format", web::get().to(expense_handlers::format_amount))
    .route("/draft/document", web::post().to(expense_handlers::upload_document))
    .route("/draft/document/remove", web::post().to(expense_handlers::remove_document))
    .route("/draft/discard", web::post().to(expense_handlers::discard));
}

pub async fn not_found() -> HttpResponse {
    let html = include_str!("../../templates/errors/404.html");
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(html)
}
