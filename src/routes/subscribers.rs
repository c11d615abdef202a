use actix_web::{HttpRequest, HttpResponse, web};

use super::helpers::RequestTimeout;
use crate::authentication::{IdentityVerifier, bearer_credential};
use crate::domain::Subscriber;
use crate::listing::SubscriberListing;

#[derive(serde::Deserialize)]
pub struct PageQuery {
    limit: Option<String>,
    offset: Option<String>,
}

#[derive(serde::Serialize)]
struct SubscribersResponse {
    data: Vec<Subscriber>,
    total: i64,
    limit: i64,
    offset: i64,
}

#[tracing::instrument(
    name = "List newsletter subscribers",
    skip(request, query, listing, verifier, timeout)
)]
pub async fn list_subscribers(
    request: HttpRequest,
    newsletter_id: web::Path<String>,
    query: web::Query<PageQuery>,
    listing: web::Data<SubscriberListing>,
    verifier: web::Data<dyn IdentityVerifier>,
    timeout: web::Data<RequestTimeout>,
) -> Result<HttpResponse, actix_web::Error> {
    let identity = bearer_credential(request.headers())
        .and_then(|credential| verifier.verify(credential))
        .inspect_err(|e| tracing::warn!(error.cause_chain = ?e, "Rejected editor credential"))?;

    let page = listing
        .list_active_subscribers(
            &timeout.context(),
            &identity,
            &newsletter_id,
            query.limit.as_deref(),
            query.offset.as_deref(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(SubscribersResponse {
        data: page.items,
        total: page.total,
        limit: page.limit,
        offset: page.offset,
    }))
}
