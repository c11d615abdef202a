mod health_check;
mod helpers;
mod listing;
mod subscriptions;
