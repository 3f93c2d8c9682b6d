use actix_web::{HttpResponse, Responder, get, post, web};

use crate::domain::auth::AuthenticatedUser;
use crate::forms::ToggleActiveForm;
use crate::forms::extensions::AddExtensionForm;
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::services::extensions as extensions_service;
use crate::services::hooks::HookRegistry;

#[get("/extensions")]
pub async fn list_extensions(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match extensions_service::list_extensions(repo.get_ref(), &user) {
        Ok(extensions) => HttpResponse::Ok().json(extensions),
        Err(err) => error_response(err, "list extensions"),
    }
}

#[post("/extensions")]
pub async fn create_extension(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    hooks: web::Data<HookRegistry>,
    web::Json(form): web::Json<AddExtensionForm>,
) -> impl Responder {
    match extensions_service::create_extension(repo.get_ref(), hooks.get_ref(), &user, form) {
        Ok(extension) => HttpResponse::Created().json(extension),
        Err(err) => error_response(err, "create extension"),
    }
}

#[post("/extensions/{extension_id}/active")]
pub async fn set_extension_active(
    extension_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<ToggleActiveForm>,
) -> impl Responder {
    match extensions_service::set_extension_active(
        repo.get_ref(),
        &user,
        extension_id.into_inner(),
        form.is_active,
    ) {
        Ok(extension) => HttpResponse::Ok().json(extension),
        Err(err) => error_response(err, "toggle extension"),
    }
}
