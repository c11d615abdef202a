use actix_web::{HttpResponse, web};

use super::helpers::RequestTimeout;
use crate::lifecycle::{LifecycleError, SubscriptionLifecycle};

#[derive(serde::Deserialize)]
pub struct Parameters {
    pub token: Option<String>,
}

#[tracing::instrument(name = "Confirm a pending subscriber", skip(parameters, lifecycle, timeout))]
pub async fn confirm(
    parameters: web::Query<Parameters>,
    lifecycle: web::Data<SubscriptionLifecycle>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, LifecycleError> {
    let token = parameters.into_inner().token.unwrap_or_default();
    lifecycle.confirm(&timeout.context(), &token).await?;

    Ok(HttpResponse::Ok().finish())
}
