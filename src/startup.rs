use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_actix_web::TracingLogger;

use crate::authentication::{IdentityVerifier, JwtVerifier};
use crate::clock::{Clock, SystemClock};
use crate::configuration::{DatabaseSettings, Settings};
use crate::lifecycle::{SubscriptionLifecycle, TokenPolicy};
use crate::listing::SubscriberListing;
use crate::notifier::{EmailNotifier, SubscriptionNotifier};
use crate::repository::{NewsletterDirectory, PostgresStore, SubscriberRepository, TokenStore};
use crate::routes::{
    RequestTimeout, confirm, health_check, list_subscribers, subscribe, unsubscribe,
    unsubscribe_by_email,
};

pub struct Collaborators {
    pub newsletters: Arc<dyn NewsletterDirectory>,
    pub subscribers: Arc<dyn SubscriberRepository>,
    pub tokens: Arc<dyn TokenStore>,
    pub notifier: Arc<dyn SubscriptionNotifier>,
    pub clock: Arc<dyn Clock>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

#[derive(Clone)]
pub struct AppState {
    lifecycle: web::Data<SubscriptionLifecycle>,
    listing: web::Data<SubscriberListing>,
    verifier: web::Data<dyn IdentityVerifier>,
    timeout: web::Data<RequestTimeout>,
}

impl AppState {
    pub fn new(collaborators: Collaborators, policy: TokenPolicy, request_timeout: Duration) -> Self {
        let lifecycle = SubscriptionLifecycle::new(
            collaborators.newsletters.clone(),
            collaborators.subscribers.clone(),
            collaborators.tokens,
            collaborators.notifier,
            collaborators.clock,
            policy,
        );
        let listing = SubscriberListing::new(collaborators.newsletters, collaborators.subscribers);

        Self {
            lifecycle: web::Data::new(lifecycle),
            listing: web::Data::new(listing),
            verifier: web::Data::from(collaborators.verifier),
            timeout: web::Data::new(RequestTimeout(request_timeout)),
        }
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.lifecycle.clone())
            .app_data(self.listing.clone())
            .app_data(self.verifier.clone())
            .app_data(self.timeout.clone())
            .route("/health_check", web::get().to(health_check))
            .route("/newsletters/{id}/subscribe", web::post().to(subscribe))
            .route("/newsletters/{id}/subscribers", web::get().to(list_subscribers))
            .route(
                "/newsletters/{id}/subscribers",
                web::delete().to(unsubscribe_by_email),
            )
            .route("/subscribers/confirm", web::get().to(confirm))
            .route("/subscriptions/unsubscribe", web::get().to(unsubscribe));
    }
}

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let store = Arc::new(PostgresStore::new(get_connection_pool(&config.database)));
        store
            .migrate()
            .await
            .context("Failed to migrate the database.")?;

        let email_client = config.email_client.client()?;
        let notifier = EmailNotifier::new(email_client, config.application.base_url.clone());

        let collaborators = Collaborators {
            newsletters: store.clone(),
            subscribers: store.clone(),
            tokens: store,
            notifier: Arc::new(notifier),
            clock: Arc::new(SystemClock),
            verifier: Arc::new(JwtVerifier::new(&config.application.jwt_secret)),
        };
        let state = AppState::new(
            collaborators,
            config.tokens.policy(),
            config.application.request_timeout(),
        );

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(&address)
            .with_context(|| format!("Failed to bind {address}."))?;
        let port = listener.local_addr()?.port();
        let server = run(listener, state)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_pool(db_config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(2))
        .connect_lazy_with(db_config.with_db())
}
