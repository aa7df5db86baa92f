use actix_web::{HttpResponse, error, web};
use log::warn;
use serde::Serialize;
use serde_json::json;
use shared::{VerificationFailure, VerificationInput};

use crate::ledger;
use crate::verification::VerificationHandler;
use crate::verification::handler::VerificationError;
use crate::verification::image_reference::MAX_IMAGE_BYTES;

// Two base64 images plus the JSON around them.
const MAX_VERIFICATION_BODY_BYTES: usize = MAX_IMAGE_BYTES * 3 + 64 * 1024;
// Registrations may carry a reference photo.
const MAX_JSON_BODY_BYTES: usize = MAX_IMAGE_BYTES * 2;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(verification_resource(MAX_VERIFICATION_BODY_BYTES));
    ledger::routes::configure(cfg);
}

fn verification_resource(body_limit: usize) -> actix_web::Resource {
    web::resource("/api/verification")
        .app_data(web::PayloadConfig::new(body_limit))
        .route(web::post().to(verify_face))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BODY_BYTES)
        .error_handler(|err, _req| {
            warn!("Rejected request body: {}", err);
            let response = HttpResponse::BadRequest().json(ErrorResponse {
                error: format!("Invalid request body: {}", err),
            });
            error::InternalError::from_response(err, response).into()
        })
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// The body is read and parsed by hand so that any unreadable, oversized or
// malformed payload maps to the generic invalid-input failure instead of a
// framework error.
async fn verify_face(
    handler: web::Data<VerificationHandler>,
    body: Result<web::Bytes, actix_web::Error>,
) -> HttpResponse {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Verification body could not be read: {}", e);
            return HttpResponse::BadRequest().json(VerificationFailure::invalid_input());
        }
    };
    let input = match serde_json::from_slice::<VerificationInput>(&body) {
        Ok(input) => input,
        Err(e) => {
            warn!("Verification body is not valid JSON input: {}", e);
            return HttpResponse::BadRequest().json(VerificationFailure::invalid_input());
        }
    };

    match handler.try_verify(input).await {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e @ VerificationError::InvalidInput(_)) => HttpResponse::BadRequest().json(e.failure()),
        Err(e @ VerificationError::Matcher(_)) => HttpResponse::BadGateway().json(e.failure()),
    }
}
