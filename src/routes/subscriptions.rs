use actix_web::{HttpResponse, web};

use super::helpers::RequestTimeout;
use crate::lifecycle::{LifecycleError, SubscriptionLifecycle};

#[derive(serde::Deserialize)]
pub struct SubscribeBody {
    pub email: String,
}

#[derive(serde::Deserialize)]
pub struct UnsubscribeParameters {
    pub email: Option<String>,
}

#[tracing::instrument(
    name = "Subscribe handler",
    skip(body, lifecycle, timeout),
    fields(subscriber_email = %body.email)
)]
pub async fn subscribe(
    newsletter_id: web::Path<String>,
    body: web::Json<SubscribeBody>,
    lifecycle: web::Data<SubscriptionLifecycle>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, LifecycleError> {
    let subscriber = lifecycle
        .subscribe(&timeout.context(), body.into_inner().email, &newsletter_id)
        .await?;

    Ok(HttpResponse::Created().json(subscriber))
}

#[tracing::instrument(name = "Legacy unsubscribe handler", skip(parameters, lifecycle, timeout))]
pub async fn unsubscribe_by_email(
    newsletter_id: web::Path<String>,
    parameters: web::Query<UnsubscribeParameters>,
    lifecycle: web::Data<SubscriptionLifecycle>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, LifecycleError> {
    let email = parameters
        .into_inner()
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| {
            LifecycleError::ValidationError("The email query parameter is required.".into())
        })?;

    lifecycle
        .unsubscribe_by_identity(&timeout.context(), email, &newsletter_id)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
