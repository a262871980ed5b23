// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Location Types ---
        handlers::location_types::import_location_types,
        handlers::location_types::export_location_types,
        handlers::location_types::list_location_types,
        handlers::location_types::create_location_type,
        handlers::location_types::update_location_type,

        // --- Locations ---
        handlers::locations::import_locations,
        handlers::locations::export_locations,
        handlers::locations::list_locations,
        handlers::locations::get_location_tree,
        handlers::locations::list_lowest_level_locations,
    ),
    components(
        schemas(
            models::location::LocationType,
            models::location::Location,
            models::location::TreeLocation,
            models::location::ImportLog,
            handlers::location_types::CreateLocationTypePayload,
            handlers::location_types::UpdateLocationTypePayload,
        )
    ),
    tags(
        (name = "Location Types", description = "Taxonomia da hierarquia (importação e manutenção)"),
        (name = "Locations", description = "Hierarquia de localizações do parceiro")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
