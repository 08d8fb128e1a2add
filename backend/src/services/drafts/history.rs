//! Handler for `GET /api/drafts/history`.
//!
//! Lists the caller's drafts newest first. Lapsed access URLs are reissued
//! and persisted by the orchestrator before the page is serialized, so the
//! links in the response are always live.

use crate::services::drafts::{caller_identity, error_response, unauthenticated, DraftService};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::requests::PageQuery;
use log::error;
use serde_json::json;

pub(crate) async fn process(
    req: HttpRequest,
    service: web::Data<DraftService>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    let Some(caller) = caller_identity(&req) else {
        return unauthenticated();
    };
    let query = query.into_inner();

    let outcome =
        web::block(move || service.list_history(&caller.user_id, query.page, query.limit)).await;
    match outcome {
        Ok(Ok((summaries, pagination))) => HttpResponse::Ok().json(json!({
            "data": summaries,
            "pagination": pagination
        })),
        Ok(Err(err)) => error_response(&err),
        Err(e) => {
            error!("history listing task failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": { "code": "INTERNAL", "message": "Please try again." }
            }))
        }
    }
}
