use actix_web::{HttpResponse, Responder, get, post, web};

use crate::domain::auth::AuthenticatedUser;
use crate::forms::ToggleActiveForm;
use crate::forms::members::AddMemberForm;
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::services::members as members_service;

/// Registers the caller as a member of their team and returns the record.
#[get("/me")]
pub async fn current_member(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match members_service::current_member(repo.get_ref(), &user) {
        Ok(member) => HttpResponse::Ok().json(member),
        Err(err) => error_response(err, "load current member"),
    }
}

#[get("/members")]
pub async fn list_members(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match members_service::list_members(repo.get_ref(), &user) {
        Ok(members) => HttpResponse::Ok().json(members),
        Err(err) => error_response(err, "list members"),
    }
}

#[post("/members")]
pub async fn add_member(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<AddMemberForm>,
) -> impl Responder {
    match members_service::add_member(repo.get_ref(), &user, form) {
        Ok(member) => HttpResponse::Created().json(member),
        Err(err) => error_response(err, "add member"),
    }
}

#[post("/members/{member_id}/active")]
pub async fn set_member_active(
    member_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<ToggleActiveForm>,
) -> impl Responder {
    match members_service::set_member_active(
        repo.get_ref(),
        &user,
        member_id.into_inner(),
        form.is_active,
    ) {
        Ok(member) => HttpResponse::Ok().json(member),
        Err(err) => error_response(err, "toggle member"),
    }
}
