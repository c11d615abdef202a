use actix_web::{HttpResponse, web};

use super::helpers::RequestTimeout;
use super::subscriptions_confirm::Parameters;
use crate::lifecycle::{LifecycleError, SubscriptionLifecycle};

#[tracing::instrument(name = "Unsubscribe by token", skip(parameters, lifecycle, timeout))]
pub async fn unsubscribe(
    parameters: web::Query<Parameters>,
    lifecycle: web::Data<SubscriptionLifecycle>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, LifecycleError> {
    let token = parameters.into_inner().token.unwrap_or_default();
    lifecycle
        .unsubscribe_by_token(&timeout.context(), &token)
        .await?;

    Ok(HttpResponse::Ok().finish())
}
