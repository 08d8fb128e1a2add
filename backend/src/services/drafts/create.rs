//! Handler for `POST /api/drafts`.
//!
//! Resolves the caller identity, then runs the synchronous generation
//! sequence on the blocking pool; the handler itself only translates the
//! outcome into the JSON envelope.

use crate::services::drafts::{caller_identity, error_response, unauthenticated, DraftService};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use common::requests::CreateDraftRequest;
use log::error;
use serde_json::json;

pub(crate) async fn process(
    req: HttpRequest,
    service: web::Data<DraftService>,
    payload: web::Json<CreateDraftRequest>,
) -> impl Responder {
    let Some(caller) = caller_identity(&req) else {
        return unauthenticated();
    };
    let body = payload.into_inner();

    let outcome =
        web::block(move || service.create_draft(&caller.user_id, caller.plan, &body)).await;
    match outcome {
        Ok(Ok(created)) => HttpResponse::Ok().json(json!({ "data": created })),
        Ok(Err(err)) => error_response(&err),
        Err(e) => {
            error!("draft creation task failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": { "code": "INTERNAL", "message": "Please try again." }
            }))
        }
    }
}
