mod cors;

use std::{sync::Arc, time::Duration};

use actix_web::{App, HttpServer, web};
use api_auth::services::{
    captcha::{HumanGate, HumanVerdict, RecaptchaGate, StaticHumanGate},
    mailer::HttpMailer,
};
use common::env_config::Config;
use db::{InMemoryPendingAccountStore, PendingAccountStore, PgPendingAccountStore};
use verification::{LogNotificationSink, NotificationSink, TokenService, VerificationOrchestrator};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.is_production();
    let origin = config.cors_allowed_origin.clone();
    let cookie_secure = config.public_base_url.starts_with("https://");
    assert!(
        config.session_secret.len() >= 64,
        "SESSION_SECRET must be at least 64 bytes"
    );

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config.log_file, !is_production).expect("Failed to set up logger");
    }

    // pending accounts
    let accounts: Arc<dyn PendingAccountStore> = match &config.database_url {
        Some(database_url) => {
            let pool = db::setup(database_url, is_production)
                .await
                .expect("Failed to set up database");
            Arc::new(PgPendingAccountStore::new(pool))
        }
        None => {
            log::warn!("DATABASE_URL not set, pending accounts are kept in memory");
            Arc::new(InMemoryPendingAccountStore::new())
        }
    };

    // mailing list
    let directory =
        directory::from_config(&config.directory).expect("Failed to set up supporter directory");
    log::info!(
        "Verifying supporters against {}",
        config.directory.vendor.name()
    );

    let timeout = Duration::from_secs(config.directory.timeout_seconds);

    // outbound mail
    let notifier: Arc<dyn NotificationSink> = match &config.mail.api_key {
        Some(api_key) => Arc::new(
            HttpMailer::new(&config.mail, api_key, timeout).expect("Failed to set up mailer"),
        ),
        None => {
            log::warn!("MAIL_API_KEY not set, verification links are only logged");
            Arc::new(LogNotificationSink)
        }
    };

    // human gate
    let gate: Arc<dyn HumanGate> = if config.recaptcha.private_key.is_empty() {
        assert!(
            !is_production,
            "RECAPTCHA_PRIVATE_KEY must be set in production"
        );
        log::warn!("RECAPTCHA_PRIVATE_KEY not set, every visitor passes the human check");
        Arc::new(StaticHumanGate(HumanVerdict::Human))
    } else {
        Arc::new(
            RecaptchaGate::new(&config.recaptcha, timeout).expect("Failed to set up reCAPTCHA"),
        )
    };
    let gate = web::Data::from(gate);

    let orchestrator = web::Data::new(
        VerificationOrchestrator::new(
            directory,
            accounts,
            TokenService::from_config(&config.token_config),
            notifier,
            &config.public_base_url,
        )
        .with_resend_on_repeat(config.resend_verification_on_repeat),
    );

    // one bucket for all workers
    let rate_limiter = limiter::global_middleware(config.rate_limit_per_second);

    HttpServer::new(move || {
        let secret = config_data.session_secret.as_bytes();
        App::new()
            .app_data(orchestrator.clone())
            .app_data(gate.clone())
            .app_data(web::Data::new(config_data.clone()))
            .wrap(rate_limiter.clone()) // 4th
            .wrap(logger::middleware()) // 3rd
            .wrap(cors::middleware(&origin)) // 2nd
            .wrap(api_auth::session_middleware(cookie_secure, secret)) // 1st
            .service(api_auth::mount_auth())
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
