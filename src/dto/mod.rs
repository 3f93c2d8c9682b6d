//! Response shapes returned by services that combine several records.

pub mod companies;
pub mod leads;
pub mod processes;
pub mod support_cases;
