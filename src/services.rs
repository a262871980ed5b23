pub mod location_reader;
pub mod location_service;
pub mod location_type_service;
