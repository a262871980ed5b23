// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{ImportLogRepository, LocationRepository, LocationTypeRepository},
    services::{
        location_reader::LocationReaderService, location_service::LocationService,
        location_type_service::LocationTypeService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    // Os serviços ficam no estado, montados uma vez na subida
    pub location_type_service: LocationTypeService,
    pub location_service: LocationService,
    pub location_reader_service: LocationReaderService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let location_repo = LocationRepository::new(db_pool.clone());
        let location_type_repo = LocationTypeRepository::new(db_pool.clone());
        let import_log_repo = ImportLogRepository::new();

        let location_type_service = LocationTypeService::new(
            location_type_repo.clone(),
            import_log_repo.clone(),
            db_pool.clone(),
        );
        let location_service = LocationService::new(
            location_repo.clone(),
            location_type_repo.clone(),
            import_log_repo,
            db_pool.clone(),
        );
        let location_reader_service = LocationReaderService::new(location_repo, location_type_repo);

        Ok(Self {
            db_pool,
            jwt_secret,
            location_type_service,
            location_service,
            location_reader_service,
        })
    }
}
