//! Signed-URL download route for stored draft artifacts.
//!
//! Access URLs issued by the blob store point here. The route recomputes the
//! signature over the blob path and expiry, refuses tampered links with 403
//! and lapsed ones with 410, then streams the artifact with its guessed
//! content type. A 410 is what the client sees between a URL expiring and
//! the next history listing reissuing it.

use crate::stores::BlobStore;
use actix_web::web::{get, scope};
use actix_web::{web, HttpResponse, Responder, Scope};
use chrono::Utc;
use log::error;
use mime_guess::from_path;
use serde::Deserialize;
use serde_json::json;

const API_PATH: &str = "/api/files";

#[derive(Deserialize)]
pub(crate) struct AccessQuery {
    expires: i64,
    sig: String,
}

pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/{user_id}/{file_name}", get().to(process))
}

pub(crate) async fn process(
    path: web::Path<(String, String)>,
    query: web::Query<AccessQuery>,
    blobs: web::Data<dyn BlobStore>,
) -> impl Responder {
    let (user_id, file_name) = path.into_inner();
    let blob_path = format!("{}/{}", user_id, file_name);

    if !blobs.verify(&blob_path, query.expires, &query.sig) {
        return HttpResponse::Forbidden().json(json!({
            "error": { "code": "INVALID_SIGNATURE", "message": "Access link is not valid" }
        }));
    }
    if query.expires < Utc::now().timestamp() {
        return HttpResponse::Gone().json(json!({
            "error": { "code": "LINK_EXPIRED", "message": "Access link has expired" }
        }));
    }

    let mime = from_path(&file_name).first_or_octet_stream();
    let blobs = blobs.clone();
    let outcome = web::block(move || blobs.open(&blob_path)).await;
    match outcome {
        Ok(Ok(Some(bytes))) => HttpResponse::Ok().content_type(mime.as_ref()).body(bytes),
        Ok(Ok(None)) => HttpResponse::NotFound().json(json!({
            "error": { "code": "NOT_FOUND", "message": "File not found" }
        })),
        Ok(Err(e)) => {
            error!("failed to read blob: {}", e);
            HttpResponse::ServiceUnavailable().json(json!({
                "error": { "code": "STORAGE_ERROR", "message": "Please retry." }
            }))
        }
        Err(e) => {
            error!("file read task failed: {}", e);
            HttpResponse::InternalServerError().json(json!({
                "error": { "code": "INTERNAL", "message": "Please try again." }
            }))
        }
    }
}
