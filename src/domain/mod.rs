//! Domain aggregates and the pure rule engines of the CRM.

pub mod assignment;
pub mod auth;
pub mod company;
pub mod duplicates;
pub mod extension;
pub mod lead;
pub mod member;
pub mod opportunity;
pub mod process;
pub mod sla;
pub mod support_case;
pub mod territory;
pub mod types;
