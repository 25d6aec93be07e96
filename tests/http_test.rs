//! HTTP-level tests: routing, CSRF, rendering, and the full
//! edit -> upload -> submit flow through the cookie session.

mod common;

use std::sync::Arc;
use std::time::Duration;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use regex::Regex;

use expense_request::form::FormRegistry;
use expense_request::handlers;
use expense_request::submission::{ExpenseSubmitter, LocalAcknowledger};
use common::*;

const BOUNDARY: &str = "----expense-test-boundary";

macro_rules! test_app {
    () => {{
        let submitter: Arc<dyn ExpenseSubmitter> = Arc::new(LocalAcknowledger);
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new(FormRegistry::new(Duration::from_millis(3000))))
                .app_data(web::Data::from(submitter))
                .configure(handlers::configure)
                .default_service(web::to(handlers::not_found)),
        )
        .await
    }};
}

fn session_cookie(resp: &ServiceResponse) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "id")
        .map(|c| c.into_owned())
}

fn csrf_token(html: &str) -> String {
    let re = Regex::new(r#"name="csrf_token" value="([0-9a-f]{64})""#).unwrap();
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .expect("csrf token in page")
}

fn multipart_body(token: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    multipart_body_with_fields(token, &[], file_name, content_type, data)
}

/// Upload body as the single-form page posts it: text fields ride along.
fn multipart_body_with_fields(
    token: &str,
    fields: &[(&str, &str)],
    file_name: &str,
    content_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"csrf_token\"\r\n\r\n{token}\r\n"
    );
    for (name, value) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"document\"; filename=\"{file_name}\"\r\n\
         Content-Type: {content_type}\r\n\r\n"
    ));
    let mut body = body.into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

#[actix_web::test]
async fn test_index_renders_form() {
    let app = test_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_cookie(&resp).is_some());

    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(html.contains("MTs. KH A Wahab Muhsin"));
    assert!(html.contains("Tujuan Pengeluaran"));
    assert!(html.contains("Menunggu Persetujuan"));
    assert!(html.contains(r#"accept="image/jpeg,image/png""#));
    csrf_token(&html);
}

#[actix_web::test]
async fn test_format_amount_endpoint() {
    let app = test_app!();
    let req = test::TestRequest::get()
        .uri("/draft/amount/format?value=Rp%2012.500")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["digits"], "12500");
    assert_eq!(body["display"], "Rp\u{a0}12.500");
}

#[actix_web::test]
async fn test_post_without_csrf_is_forbidden() {
    let app = test_app!();
    let req = test::TestRequest::post()
        .uri("/draft/purpose")
        .set_form([("purpose", "ATK"), ("csrf_token", "nope")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_unknown_route_is_404() {
    let app = test_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/nope").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_invalid_submit_shows_field_errors() {
    let app = test_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let cookie = session_cookie(&resp).unwrap();
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = csrf_token(&html);

    let req = test::TestRequest::post()
        .uri("/submit")
        .cookie(cookie.clone())
        .set_form([("purpose", ""), ("amount", "Rp 50.000"), ("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");

    let req = test::TestRequest::get().uri("/draft").cookie(cookie.clone()).to_request();
    let snapshot: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot["state"], "editing");
    assert_eq!(snapshot["draft"]["amount"], "50000");
    assert!(snapshot["errors"]["purpose"].is_string());
    assert!(snapshot["errors"]["document"].is_string());
    assert!(snapshot["errors"].get("amount").is_none());

    let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
    let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(html.contains("Tujuan pengeluaran harus diisi"));
    assert!(html.contains("Bukti pendukung harus diunggah"));
    assert!(html.contains("Rp\u{a0}50.000"));
}

#[actix_web::test]
async fn test_full_flow_upload_and_submit() {
    let app = test_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let cookie = session_cookie(&resp).unwrap();
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = csrf_token(&html);

    let req = test::TestRequest::post()
        .uri("/draft/document")
        .cookie(cookie.clone())
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(&token, "nota.png", "image/png", &png_bytes()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let mut has_preview = false;
    for _ in 0..100 {
        let req = test::TestRequest::get().uri("/draft").cookie(cookie.clone()).to_request();
        let snapshot: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(snapshot["draft"]["document"]["file_name"], "nota.png");
        if snapshot["has_preview"] == true {
            has_preview = true;
            break;
        }
        actix_web::rt::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(has_preview);

    let req = test::TestRequest::post()
        .uri("/submit")
        .cookie(cookie.clone())
        .set_form([("purpose", PURPOSE), ("amount", AMOUNT), ("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let req = test::TestRequest::get().uri("/").cookie(cookie.clone()).to_request();
    let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(html.contains("Pengajuan Berhasil Dikirim!"));

    let req = test::TestRequest::post()
        .uri("/draft/purpose")
        .cookie(cookie)
        .set_form([("purpose", "lagi"), ("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_rejected_upload_shows_type_error() {
    let app = test_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let cookie = session_cookie(&resp).unwrap();
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = csrf_token(&html);

    let req = test::TestRequest::post()
        .uri("/draft/document")
        .cookie(cookie.clone())
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(&token, "catatan.txt", "text/plain", b"halo"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let req = test::TestRequest::get().uri("/draft").cookie(cookie).to_request();
    let snapshot: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot["errors"]["document"], "Hanya file JPG dan PNG yang diizinkan");
    assert!(snapshot["draft"]["document"].is_null());
}

#[actix_web::test]
async fn test_discard_starts_fresh_form() {
    let app = test_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let cookie = session_cookie(&resp).unwrap();
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = csrf_token(&html);

    let req = test::TestRequest::post()
        .uri("/draft/amount")
        .cookie(cookie.clone())
        .set_form([("amount", "75.000"), ("csrf_token", token.as_str())])
        .to_request();
    test::call_service(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/draft/discard")
        .cookie(cookie.clone())
        .set_form([("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&resp).unwrap_or(cookie);

    let req = test::TestRequest::get().uri("/draft").cookie(cookie).to_request();
    let snapshot: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot["draft"]["amount"], "");
}

#[actix_web::test]
async fn test_upload_keeps_typed_text() {
    let app = test_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let cookie = session_cookie(&resp).unwrap();
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = csrf_token(&html);

    let req = test::TestRequest::post()
        .uri("/draft/document")
        .cookie(cookie.clone())
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body_with_fields(
            &token,
            &[("purpose", PURPOSE), ("amount", "Rp 50.000")],
            "nota.png",
            "image/png",
            &png_bytes(),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let req = test::TestRequest::get().uri("/").cookie(cookie.clone()).to_request();
    let html = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(html.contains(&format!(r#"value="{PURPOSE}""#)));
    assert!(html.contains("Rp\u{a0}50.000"));
    assert!(html.contains("nota.png"));

    // removing the document posts the text fields too
    let req = test::TestRequest::post()
        .uri("/draft/document/remove")
        .cookie(cookie.clone())
        .set_form([("purpose", "Fotokopi"), ("amount", "12.000"), ("csrf_token", token.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let req = test::TestRequest::get().uri("/draft").cookie(cookie).to_request();
    let snapshot: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot["draft"]["purpose"], "Fotokopi");
    assert_eq!(snapshot["draft"]["amount"], "12000");
    assert!(snapshot["draft"]["document"].is_null());
}

#[actix_web::test]
async fn test_upload_past_part_limit_shows_size_error() {
    let app = test_app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let cookie = session_cookie(&resp).unwrap();
    let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let token = csrf_token(&html);

    let huge = vec![0u8; 17 * 1024 * 1024];
    let req = test::TestRequest::post()
        .uri("/draft/document")
        .cookie(cookie.clone())
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(&token, "besar.jpg", "image/jpeg", &huge))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");

    let req = test::TestRequest::get().uri("/draft").cookie(cookie).to_request();
    let snapshot: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot["errors"]["document"], "Ukuran file tidak boleh lebih dari 5MB");
    assert!(snapshot["draft"]["document"].is_null());
}
