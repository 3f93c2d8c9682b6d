use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, Responder, delete, get, post, web};
use serde_json::json;

use crate::domain::auth::AuthenticatedUser;
use crate::forms::leads::{
    AddLeadForm, AssignLeadForm, ConvertLeadForm, LeadListForm, LeadStatusForm, MergeLeadsForm,
};
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::services::hooks::HookRegistry;
use crate::services::{companies as companies_service, leads as leads_service};

#[get("/leads")]
pub async fn list_leads(
    params: web::Query<LeadListForm>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match leads_service::list_leads(repo.get_ref(), &user, params.into_inner()) {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(err) => error_response(err, "list leads"),
    }
}

#[post("/leads")]
pub async fn create_lead(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    hooks: web::Data<HookRegistry>,
    web::Json(form): web::Json<AddLeadForm>,
) -> impl Responder {
    match leads_service::create_lead(repo.get_ref(), hooks.get_ref(), &user, form) {
        Ok(lead) => HttpResponse::Created().json(lead),
        Err(err) => error_response(err, "create lead"),
    }
}

/// Bulk import from a `text/csv` body; either every row is stored or none.
#[post("/leads/import")]
pub async fn import_leads(
    req: HttpRequest,
    body: web::Bytes,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    let is_csv = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/csv"));
    if !is_csv {
        return HttpResponse::UnsupportedMediaType()
            .json(json!({ "error": "expected a text/csv body" }));
    }

    match leads_service::import_leads(repo.get_ref(), &user, &body) {
        Ok(summary) => HttpResponse::Created().json(summary),
        Err(err) => error_response(err, "import leads"),
    }
}

/// Rejected merges answer 422 with their reason, like company merges.
#[post("/leads/merge")]
pub async fn merge_leads(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<MergeLeadsForm>,
) -> impl Responder {
    match companies_service::merge_leads(repo.get_ref(), &user, form) {
        Ok(outcome) if outcome.is_success() => HttpResponse::Ok().json(outcome),
        Ok(outcome) => HttpResponse::UnprocessableEntity().json(outcome),
        Err(err) => error_response(err, "merge leads"),
    }
}

#[get("/leads/{lead_id}")]
pub async fn get_lead(
    lead_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match leads_service::get_lead(repo.get_ref(), &user, lead_id.into_inner()) {
        Ok(lead) => HttpResponse::Ok().json(lead),
        Err(err) => error_response(err, "load lead"),
    }
}

#[post("/leads/{lead_id}/assign")]
pub async fn assign_lead(
    lead_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    hooks: web::Data<HookRegistry>,
    web::Json(form): web::Json<AssignLeadForm>,
) -> impl Responder {
    match leads_service::assign_lead(
        repo.get_ref(),
        hooks.get_ref(),
        &user,
        lead_id.into_inner(),
        form,
    ) {
        Ok(assignment) => HttpResponse::Ok().json(assignment),
        Err(err) => error_response(err, "assign lead"),
    }
}

#[post("/leads/{lead_id}/status")]
pub async fn update_lead_status(
    lead_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<LeadStatusForm>,
) -> impl Responder {
    match leads_service::update_lead_status(repo.get_ref(), &user, lead_id.into_inner(), form) {
        Ok(lead) => HttpResponse::Ok().json(lead),
        Err(err) => error_response(err, "update lead status"),
    }
}

#[post("/leads/{lead_id}/convert")]
pub async fn convert_lead(
    lead_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    hooks: web::Data<HookRegistry>,
    web::Json(form): web::Json<ConvertLeadForm>,
) -> impl Responder {
    match leads_service::convert_lead(
        repo.get_ref(),
        hooks.get_ref(),
        &user,
        lead_id.into_inner(),
        form,
    ) {
        Ok(converted) => HttpResponse::Ok().json(converted),
        Err(err) => error_response(err, "convert lead"),
    }
}

#[delete("/leads/{lead_id}")]
pub async fn delete_lead(
    lead_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match leads_service::delete_lead(repo.get_ref(), &user, lead_id.into_inner()) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(err) => error_response(err, "delete lead"),
    }
}

#[get("/leads/{lead_id}/duplicates")]
pub async fn lead_duplicates(
    lead_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    server_config: web::Data<ServerConfig>,
) -> impl Responder {
    match companies_service::find_lead_duplicates(
        repo.get_ref(),
        &server_config.duplicates,
        &user,
        lead_id.into_inner(),
    ) {
        Ok(duplicates) => HttpResponse::Ok().json(duplicates),
        Err(err) => error_response(err, "find lead duplicates"),
    }
}
