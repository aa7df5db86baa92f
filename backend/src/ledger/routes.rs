use actix_web::{HttpResponse, web};
use log::{error, warn};
use serde::Serialize;
use serde_json::json;
use shared::ledger::{CreateLoan, FundMovement, RecordRepayment, RegisterUser};

use super::repository::{LedgerRepository, RepositoryError};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: RepositoryError) -> HttpResponse {
    if e.is_not_found() {
        return HttpResponse::NotFound().json(ErrorResponse {
            error: e.to_string(),
        });
    }
    warn!("Rejected ledger command: {}", e);
    HttpResponse::UnprocessableEntity().json(ErrorResponse {
        error: e.to_string(),
    })
}

// Reads only fail when the backing store does.
fn read_failure(what: &str, e: RepositoryError) -> HttpResponse {
    error!("Failed to load {}: {:?}", what, e);
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: format!("Failed to load {}", what),
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/users")
            .route(web::get().to(list_users))
            .route(web::post().to(register_user)),
    )
    .service(web::resource("/api/users/{user_id}").route(web::get().to(get_user)))
    .service(
        web::resource("/api/users/{user_id}/fund/deposits").route(web::post().to(deposit_to_fund)),
    )
    .service(
        web::resource("/api/users/{user_id}/fund/withdrawals")
            .route(web::post().to(withdraw_from_fund)),
    )
    .service(web::resource("/api/loans").route(web::post().to(create_loan)))
    .service(
        web::resource("/api/loans/{loan_id}/repayments").route(web::post().to(record_repayment)),
    )
    .service(web::resource("/api/transactions").route(web::get().to(list_transactions)))
    .service(web::resource("/api/vault").route(web::get().to(vault_summary)));
}

async fn list_users(repo: web::Data<dyn LedgerRepository>) -> HttpResponse {
    match repo.list_users().await {
        Ok(users) => HttpResponse::Ok().json(users),
        Err(e) => read_failure("users", e),
    }
}

async fn get_user(repo: web::Data<dyn LedgerRepository>, path: web::Path<String>) -> HttpResponse {
    let user_id = path.into_inner();
    match repo.get_user(&user_id).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(profile),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            error: format!("User {} not found", user_id),
        }),
        Err(e) => read_failure("user", e),
    }
}

async fn list_transactions(repo: web::Data<dyn LedgerRepository>) -> HttpResponse {
    match repo.list_transactions().await {
        Ok(transactions) => HttpResponse::Ok().json(transactions),
        Err(e) => read_failure("transactions", e),
    }
}

async fn vault_summary(repo: web::Data<dyn LedgerRepository>) -> HttpResponse {
    match repo.vault_summary().await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => read_failure("vault summary", e),
    }
}

async fn register_user(
    repo: web::Data<dyn LedgerRepository>,
    body: web::Json<RegisterUser>,
) -> HttpResponse {
    match repo.register_user(body.into_inner()).await {
        Ok(user) => HttpResponse::Created().json(user),
        Err(e) => error_response(e),
    }
}

async fn create_loan(
    repo: web::Data<dyn LedgerRepository>,
    body: web::Json<CreateLoan>,
) -> HttpResponse {
    match repo.create_loan(body.into_inner()).await {
        Ok(loan) => HttpResponse::Created().json(loan),
        Err(e) => error_response(e),
    }
}

async fn record_repayment(
    repo: web::Data<dyn LedgerRepository>,
    path: web::Path<String>,
    body: web::Json<RecordRepayment>,
) -> HttpResponse {
    match repo.record_repayment(&path.into_inner(), body.into_inner()).await {
        Ok(loan) => HttpResponse::Ok().json(loan),
        Err(e) => error_response(e),
    }
}

async fn deposit_to_fund(
    repo: web::Data<dyn LedgerRepository>,
    path: web::Path<String>,
    body: web::Json<FundMovement>,
) -> HttpResponse {
    let user_id = path.into_inner();
    match repo.deposit_to_fund(&user_id, body.into_inner()).await {
        Ok(balance) => HttpResponse::Ok().json(json!({
            "userId": user_id,
            "diwaliFundBalancePaise": balance
        })),
        Err(e) => error_response(e),
    }
}

async fn withdraw_from_fund(
    repo: web::Data<dyn LedgerRepository>,
    path: web::Path<String>,
    body: web::Json<FundMovement>,
) -> HttpResponse {
    let user_id = path.into_inner();
    match repo.withdraw_from_fund(&user_id, body.into_inner()).await {
        Ok(balance) => HttpResponse::Ok().json(json!({
            "userId": user_id,
            "diwaliFundBalancePaise": balance
        })),
        Err(e) => error_response(e),
    }
}
