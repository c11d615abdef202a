pub mod authentication;
pub mod clock;
pub mod configuration;
pub mod context;
pub mod domain;
pub mod email_client;
pub mod errors;
pub mod lifecycle;
pub mod listing;
pub mod notifier;
pub mod repository;
pub mod routes;
pub mod startup;
pub mod telemetry;
