use actix_web::{HttpResponse, Responder, get, post, web};

use crate::domain::auth::AuthenticatedUser;
use crate::forms::opportunities::{AddOpportunityForm, ChangeStageForm, OpportunityListForm};
use crate::repository::DieselRepository;
use crate::routes::error_response;
use crate::services::hooks::HookRegistry;
use crate::services::opportunities as opportunities_service;

#[get("/opportunities")]
pub async fn list_opportunities(
    params: web::Query<OpportunityListForm>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> impl Responder {
    match opportunities_service::list_opportunities(repo.get_ref(), &user, params.company_id) {
        Ok(opportunities) => HttpResponse::Ok().json(opportunities),
        Err(err) => error_response(err, "list opportunities"),
    }
}

#[post("/opportunities")]
pub async fn create_opportunity(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<AddOpportunityForm>,
) -> impl Responder {
    match opportunities_service::create_opportunity(repo.get_ref(), &user, form) {
        Ok(opportunity) => HttpResponse::Created().json(opportunity),
        Err(err) => error_response(err, "create opportunity"),
    }
}

#[post("/opportunities/{opportunity_id}/stage")]
pub async fn change_stage(
    opportunity_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    hooks: web::Data<HookRegistry>,
    web::Json(form): web::Json<ChangeStageForm>,
) -> impl Responder {
    match opportunities_service::change_stage(
        repo.get_ref(),
        hooks.get_ref(),
        &user,
        opportunity_id.into_inner(),
        form,
    ) {
        Ok(opportunity) => HttpResponse::Ok().json(opportunity),
        Err(err) => error_response(err, "change opportunity stage"),
    }
}
