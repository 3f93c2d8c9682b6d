use actix_web::{HttpResponse, Responder, get, post, web};

use crate::domain::auth::AuthenticatedUser;
use crate::forms::processes::{AddDefinitionForm, ApprovalForm, CancelForm, StepActionForm};
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::services::hooks::HookRegistry;
use crate::services::processes as processes_service;

#[get("/processes")]
pub async fn list_definitions(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match processes_service::list_definitions(repo.get_ref(), &user) {
        Ok(definitions) => HttpResponse::Ok().json(definitions),
        Err(err) => error_response(err, "list process definitions"),
    }
}

#[post("/processes")]
pub async fn create_definition(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<AddDefinitionForm>,
) -> impl Responder {
    match processes_service::create_definition(repo.get_ref(), &user, form) {
        Ok(definition) => HttpResponse::Created().json(definition),
        Err(err) => error_response(err, "create process definition"),
    }
}

/// Running steps of the caller's team that are past their deadline.
#[get("/processes/overdue-steps")]
pub async fn list_overdue_steps(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match processes_service::list_overdue_steps(repo.get_ref(), &user) {
        Ok(steps) => HttpResponse::Ok().json(steps),
        Err(err) => error_response(err, "list overdue steps"),
    }
}

#[post("/processes/{definition_id}/start")]
pub async fn start_process(
    definition_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match processes_service::start_process(repo.get_ref(), &user, definition_id.into_inner()) {
        Ok(execution) => HttpResponse::Created().json(execution),
        Err(err) => error_response(err, "start process"),
    }
}

#[get("/executions/{execution_id}")]
pub async fn get_execution(
    execution_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match processes_service::get_execution_detail(repo.get_ref(), &user, execution_id.into_inner())
    {
        Ok(detail) => HttpResponse::Ok().json(detail),
        Err(err) => error_response(err, "load execution"),
    }
}

#[post("/executions/{execution_id}/next")]
pub async fn execute_next_step(
    execution_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match processes_service::execute_next_step(repo.get_ref(), &user, execution_id.into_inner()) {
        Ok(transition) => HttpResponse::Ok().json(transition),
        Err(err) => error_response(err, "execute next step"),
    }
}

#[post("/executions/{execution_id}/complete")]
pub async fn complete_step(
    execution_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    hooks: web::Data<HookRegistry>,
    web::Json(form): web::Json<StepActionForm>,
) -> impl Responder {
    match processes_service::complete_step(
        repo.get_ref(),
        hooks.get_ref(),
        &user,
        execution_id.into_inner(),
        form,
    ) {
        Ok(transition) => HttpResponse::Ok().json(transition),
        Err(err) => error_response(err, "complete step"),
    }
}

#[post("/executions/{execution_id}/fail")]
pub async fn fail_step(
    execution_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<StepActionForm>,
) -> impl Responder {
    match processes_service::fail_step(repo.get_ref(), &user, execution_id.into_inner(), form) {
        Ok(transition) => HttpResponse::Ok().json(transition),
        Err(err) => error_response(err, "fail step"),
    }
}

#[post("/executions/{execution_id}/approval")]
pub async fn decide_approval(
    execution_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<ApprovalForm>,
) -> impl Responder {
    match processes_service::decide_approval(
        repo.get_ref(),
        &user,
        execution_id.into_inner(),
        form,
    ) {
        Ok(transition) => HttpResponse::Ok().json(transition),
        Err(err) => error_response(err, "record approval"),
    }
}

#[post("/executions/{execution_id}/cancel")]
pub async fn cancel_execution(
    execution_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<CancelForm>,
) -> impl Responder {
    match processes_service::cancel_execution(
        repo.get_ref(),
        &user,
        execution_id.into_inner(),
        form,
    ) {
        Ok(transition) => HttpResponse::Ok().json(transition),
        Err(err) => error_response(err, "cancel execution"),
    }
}
