use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use expense_request::config::AppConfig;
use expense_request::form::{FormRegistry, registry};
use expense_request::{handlers, submission};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // .env may carry RUST_LOG
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();

    let submitter = submission::from_config(&config).map_err(std::io::Error::other)?;

    // Session encryption key. Load from SESSION_KEY for sessions that survive restarts
    let secret_key = match config.session_key.as_deref() {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let forms = FormRegistry::new(config.reset_delay);
    registry::spawn_sweeper(forms.clone(), config.form_idle_ttl);

    log::info!("Starting server at http://{}", config.bind_addr);

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(false)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(forms.clone()))
            .app_data(web::Data::from(submitter.clone()))
            .service(actix_files::Files::new("/static", "./static"))
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(handlers::not_found))
    })
    .bind(bind_addr)?
    .run()
    .await
}
