//! JSON endpoints mounted under `/api/v1`.

use actix_web::error::InternalError;
use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::services::ServiceError;

pub mod auth;
pub mod companies;
pub mod extensions;
pub mod leads;
pub mod members;
pub mod opportunities;
pub mod processes;
pub mod support_cases;
pub mod territories;

/// Maps a service failure onto an HTTP status with a `{"error": ...}` body.
pub fn error_response(err: ServiceError, context: &str) -> HttpResponse {
    match err {
        ServiceError::Unauthorized => {
            HttpResponse::Unauthorized().json(json!({ "error": "insufficient permissions" }))
        }
        ServiceError::NotFound => HttpResponse::NotFound().json(json!({ "error": "not found" })),
        ServiceError::Form(message) | ServiceError::TypeConstraint(message) => {
            HttpResponse::UnprocessableEntity().json(json!({ "error": message }))
        }
        ServiceError::InvalidState(message) => {
            HttpResponse::Conflict().json(json!({ "error": message }))
        }
        err => {
            log::error!("Failed to {context}: {err}");
            HttpResponse::InternalServerError().json(json!({ "error": "internal error" }))
        }
    }
}

/// Malformed JSON bodies answer 422 in the same shape as validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::UnprocessableEntity().json(json!({ "error": message })),
        )
        .into()
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(members::current_member)
        .service(members::list_members)
        .service(members::add_member)
        .service(members::set_member_active)
        .service(leads::list_leads)
        .service(leads::create_lead)
        .service(leads::import_leads)
        .service(leads::merge_leads)
        .service(leads::get_lead)
        .service(leads::assign_lead)
        .service(leads::update_lead_status)
        .service(leads::convert_lead)
        .service(leads::delete_lead)
        .service(leads::lead_duplicates)
        .service(companies::list_companies)
        .service(companies::create_company)
        .service(companies::merge_companies)
        .service(companies::get_company)
        .service(companies::company_duplicates)
        .service(opportunities::list_opportunities)
        .service(opportunities::create_opportunity)
        .service(opportunities::change_stage)
        .service(support_cases::list_cases)
        .service(support_cases::open_case)
        .service(support_cases::sweep_cases)
        .service(support_cases::resolve_case)
        .service(support_cases::change_priority)
        .service(territories::list_territories)
        .service(territories::create_territory)
        .service(territories::list_overlaps)
        .service(territories::get_territory)
        .service(territories::set_territory_active)
        .service(processes::list_definitions)
        .service(processes::create_definition)
        .service(processes::list_overdue_steps)
        .service(processes::start_process)
        .service(processes::get_execution)
        .service(processes::execute_next_step)
        .service(processes::complete_step)
        .service(processes::fail_step)
        .service(processes::decide_approval)
        .service(processes::cancel_execution)
        .service(extensions::list_extensions)
        .service(extensions::create_extension)
        .service(extensions::set_extension_active);
}
