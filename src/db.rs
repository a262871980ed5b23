pub mod location_repo;
pub use location_repo::{LocationFilter, LocationRepository, LowestLevelParams};
pub mod location_type_repo;
pub use location_type_repo::LocationTypeRepository;
pub mod import_log_repo;
pub use import_log_repo::ImportLogRepository;
