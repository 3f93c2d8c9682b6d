use actix_web::{HttpResponse, Responder, get, post, web};

use crate::domain::auth::AuthenticatedUser;
use crate::forms::support_cases::{ChangePriorityForm, OpenCaseForm};
use crate::models::config::ServerConfig;
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::services::hooks::HookRegistry;
use crate::services::support_cases as cases_service;

#[get("/cases")]
pub async fn list_cases(user: AuthenticatedUser, repo: web::Data<DieselRepository>) -> impl Responder {
    match cases_service::list_cases(repo.get_ref(), &user) {
        Ok(cases) => HttpResponse::Ok().json(cases),
        Err(err) => error_response(err, "list cases"),
    }
}

#[post("/cases")]
pub async fn open_case(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    hooks: web::Data<HookRegistry>,
    server_config: web::Data<ServerConfig>,
    web::Json(form): web::Json<OpenCaseForm>,
) -> impl Responder {
    match cases_service::open_case(
        repo.get_ref(),
        hooks.get_ref(),
        &server_config.sla,
        &user,
        form,
    ) {
        Ok(case) => HttpResponse::Created().json(case),
        Err(err) => error_response(err, "open case"),
    }
}

/// Runs the breach sweep for the caller's team only.
#[post("/cases/sweep")]
pub async fn sweep_cases(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    hooks: web::Data<HookRegistry>,
    server_config: web::Data<ServerConfig>,
) -> impl Responder {
    match cases_service::sweep_team_breaches(
        repo.get_ref(),
        hooks.get_ref(),
        &server_config.sla,
        &user,
    ) {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(err) => error_response(err, "sweep cases"),
    }
}

#[post("/cases/{case_id}/resolve")]
pub async fn resolve_case(
    case_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match cases_service::resolve_case(repo.get_ref(), &user, case_id.into_inner()) {
        Ok(case) => HttpResponse::Ok().json(case),
        Err(err) => error_response(err, "resolve case"),
    }
}

#[post("/cases/{case_id}/priority")]
pub async fn change_priority(
    case_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    server_config: web::Data<ServerConfig>,
    web::Json(form): web::Json<ChangePriorityForm>,
) -> impl Responder {
    match cases_service::change_priority(
        repo.get_ref(),
        &server_config.sla,
        &user,
        case_id.into_inner(),
        form,
    ) {
        Ok(case) => HttpResponse::Ok().json(case),
        Err(err) => error_response(err, "change case priority"),
    }
}
