mod ingestion_service;
mod reading_validator;

pub use ingestion_service::*;
pub use reading_validator::*;
