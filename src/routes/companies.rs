use actix_web::{HttpResponse, Responder, get, post, web};

use crate::domain::auth::AuthenticatedUser;
use crate::forms::companies::{AddCompanyForm, MergeCompaniesForm};
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::services::companies as companies_service;

#[get("/companies")]
pub async fn list_companies(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match companies_service::list_companies(repo.get_ref(), &user) {
        Ok(companies) => HttpResponse::Ok().json(companies),
        Err(err) => error_response(err, "list companies"),
    }
}

#[post("/companies")]
pub async fn create_company(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<AddCompanyForm>,
) -> impl Responder {
    match companies_service::create_company(repo.get_ref(), &user, form) {
        Ok(company) => HttpResponse::Created().json(company),
        Err(err) => error_response(err, "create company"),
    }
}

/// A rejected merge is a normal answer, reported with 422 and its reason.
#[post("/companies/merge")]
pub async fn merge_companies(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<MergeCompaniesForm>,
) -> impl Responder {
    match companies_service::merge_companies(repo.get_ref(), &user, form) {
        Ok(outcome) if outcome.is_success() => HttpResponse::Ok().json(outcome),
        Ok(outcome) => HttpResponse::UnprocessableEntity().json(outcome),
        Err(err) => error_response(err, "merge companies"),
    }
}

#[get("/companies/{company_id}")]
pub async fn get_company(
    company_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match companies_service::get_company(repo.get_ref(), &user, company_id.into_inner()) {
        Ok(company) => HttpResponse::Ok().json(company),
        Err(err) => error_response(err, "load company"),
    }
}

#[get("/companies/{company_id}/duplicates")]
pub async fn company_duplicates(
    company_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    server_config: web::Data<ServerConfig>,
) -> impl Responder {
    match companies_service::find_company_duplicates(
        repo.get_ref(),
        &server_config.duplicates,
        &user,
        company_id.into_inner(),
    ) {
        Ok(candidates) => HttpResponse::Ok().json(candidates),
        Err(err) => error_response(err, "find company duplicates"),
    }
}
