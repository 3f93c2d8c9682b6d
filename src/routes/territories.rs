use actix_web::{HttpResponse, Responder, get, post, web};

use crate::domain::auth::AuthenticatedUser;
use crate::forms::ToggleActiveForm;
use crate::forms::territories::AddTerritoryForm;
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::services::territories as territories_service;

#[get("/territories")]
pub async fn list_territories(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match territories_service::list_territories(repo.get_ref(), &user) {
        Ok(territories) => HttpResponse::Ok().json(territories),
        Err(err) => error_response(err, "list territories"),
    }
}

#[post("/territories")]
pub async fn create_territory(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<AddTerritoryForm>,
) -> impl Responder {
    match territories_service::create_territory(repo.get_ref(), &user, form) {
        Ok(territory) => HttpResponse::Created().json(territory),
        Err(err) => error_response(err, "create territory"),
    }
}

#[get("/territories/overlaps")]
pub async fn list_overlaps(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match territories_service::list_overlaps(repo.get_ref(), &user) {
        Ok(overlaps) => HttpResponse::Ok().json(overlaps),
        Err(err) => error_response(err, "detect territory overlaps"),
    }
}

#[get("/territories/{territory_id}")]
pub async fn get_territory(
    territory_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match territories_service::get_territory(repo.get_ref(), &user, territory_id.into_inner()) {
        Ok(territory) => HttpResponse::Ok().json(territory),
        Err(err) => error_response(err, "load territory"),
    }
}

#[post("/territories/{territory_id}/active")]
pub async fn set_territory_active(
    territory_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<ToggleActiveForm>,
) -> impl Responder {
    match territories_service::set_territory_active(
        repo.get_ref(),
        &user,
        territory_id.into_inner(),
        form.is_active,
    ) {
        Ok(territory) => HttpResponse::Ok().json(territory),
        Err(err) => error_response(err, "toggle territory"),
    }
}
