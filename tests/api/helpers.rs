use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use newsletter_subscriptions::{
    authentication::{EditorClaims, JwtVerifier},
    clock::FixedClock,
    domain::NewsletterId,
    lifecycle::{SubscriptionLifecycle, TokenPolicy},
    listing::SubscriberListing,
    notifier::{RecordingNotifier, SentConfirmation},
    repository::InMemoryStore,
    startup::{AppState, Collaborators, run},
    telemetry::{get_subscriber, init_subscriber},
};
use once_cell::sync::Lazy;
use secrecy::SecretString;

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        let _ = init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        let _ = init_subscriber(subscriber);
    }
});

const JWT_SECRET: &str = "test-signing-secret-with-enough-length";

pub const NEWSLETTER: &str = "rust-weekly";
pub const OTHER_NEWSLETTER: &str = "go-weekly";
pub const EDITOR: &str = "editor-alice";
pub const OTHER_EDITOR: &str = "editor-bob";

/// In-process collaborators shared by the HTTP app and the direct engine tests.
pub struct TestCore {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<FixedClock>,
}

impl TestCore {
    pub fn new() -> Self {
        Lazy::force(&TRACING);

        let store = Arc::new(InMemoryStore::new());
        let editor = store.add_editor(EDITOR);
        let other_editor = store.add_editor(OTHER_EDITOR);
        store.add_newsletter(&newsletter_id(NEWSLETTER), &editor);
        store.add_newsletter(&newsletter_id(OTHER_NEWSLETTER), &other_editor);

        Self {
            store,
            notifier: Arc::new(RecordingNotifier::new()),
            clock: Arc::new(FixedClock::new(Utc::now())),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            newsletters: self.store.clone(),
            subscribers: self.store.clone(),
            tokens: self.store.clone(),
            notifier: self.notifier.clone(),
            clock: self.clock.clone(),
            verifier: Arc::new(JwtVerifier::new(&SecretString::from(JWT_SECRET))),
        }
    }

    pub fn lifecycle(&self) -> SubscriptionLifecycle {
        SubscriptionLifecycle::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.clock.clone(),
            TokenPolicy::default(),
        )
    }

    pub fn listing(&self) -> SubscriberListing {
        SubscriberListing::new(self.store.clone(), self.store.clone())
    }

    pub fn last_confirmation(&self) -> SentConfirmation {
        self.notifier
            .last()
            .expect("No confirmation was dispatched.")
    }
}

pub fn newsletter_id(raw: &str) -> NewsletterId {
    NewsletterId::parse(raw).expect("Invalid newsletter id in test setup.")
}

pub fn bearer_for(subject: &str) -> String {
    let claims = EditorClaims {
        sub: subject.to_string(),
        exp: (Utc::now() + chrono::Duration::minutes(10)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign a test credential.")
}

pub struct TestApp {
    pub address: String,
    pub core: TestCore,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_subscription(
        &self,
        newsletter: &str,
        body: serde_json::Value,
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/newsletters/{newsletter}/subscribe", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn subscribe(&self, email: &str) -> SentConfirmation {
        let response = self
            .post_subscription(NEWSLETTER, serde_json::json!({ "email": email }))
            .await;
        assert_eq!(201, response.status().as_u16());
        self.core.last_confirmation()
    }

    pub async fn get_confirm(&self, token: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}/subscribers/confirm", self.address))
            .query(&[("token", token)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_unsubscribe(&self, token: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}/subscriptions/unsubscribe", self.address))
            .query(&[("token", token)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete_subscriber(&self, newsletter: &str, email: &str) -> reqwest::Response {
        self.api_client
            .delete(format!("{}/newsletters/{newsletter}/subscribers", self.address))
            .query(&[("email", email)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_subscribers(
        &self,
        newsletter: &str,
        bearer: Option<&str>,
        query: &[(&str, &str)],
    ) -> reqwest::Response {
        let mut request = self
            .api_client
            .get(format!("{}/newsletters/{newsletter}/subscribers", self.address))
            .query(query);
        if let Some(bearer) = bearer {
            request = request.bearer_auth(bearer);
        }
        request.send().await.expect("Failed to execute request.")
    }
}

pub async fn spawn_app() -> TestApp {
    let core = TestCore::new();
    let state = AppState::new(
        core.collaborators(),
        TokenPolicy::default(),
        Duration::from_secs(5),
    );

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port.");
    let port = listener.local_addr().unwrap().port();
    let server = run(listener, state).expect("Failed to bind address.");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{port}"),
        core,
        api_client: reqwest::Client::new(),
    }
}
