pub mod location_types;
pub mod locations;
