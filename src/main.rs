//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    // Inicializa o logger
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização (inclui o seed do tipo
    // "org" e da localização raiz)
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas da taxonomia (tipos de localização)
    let location_type_routes = Router::new()
        .route(
            "/",
            get(handlers::location_types::list_location_types)
                .post(handlers::location_types::create_location_type),
        )
        .route("/{id}", put(handlers::location_types::update_location_type))
        .route("/import", post(handlers::location_types::import_location_types))
        .route("/export", get(handlers::location_types::export_location_types))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Rotas das localizações
    let location_routes = Router::new()
        .route("/", get(handlers::locations::list_locations))
        .route("/import", post(handlers::locations::import_locations))
        .route("/export", get(handlers::locations::export_locations))
        .route("/tree", get(handlers::locations::get_location_tree))
        .route("/lowest", get(handlers::locations::list_lowest_level_locations))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/location-types", location_type_routes)
        .nest("/api/locations", location_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
