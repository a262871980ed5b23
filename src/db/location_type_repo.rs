// src/db/location_type_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::common::error::AppError;
use crate::models::location::LocationType;

#[derive(Clone)]
pub struct LocationTypeRepository {
    pool: PgPool,
}

impl LocationTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Todos os tipos persistidos, do nível raiz para baixo.
    pub async fn get_all_location_types(&self) -> Result<Vec<LocationType>, AppError> {
        let types = sqlx::query_as::<_, LocationType>(
            r#"
            SELECT location_type_id, name, display_name, level,
                   parent_location_type_id, parent_name, created_at, updated_at
            FROM location_types
            ORDER BY level ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }

    /// Apenas os tipos referenciados por um conjunto de nós (a árvore
    /// filtrada por autorização não precisa da taxonomia inteira).
    pub async fn get_location_types_by_ids(&self, ids: &[String]) -> Result<Vec<LocationType>, AppError> {
        let types = sqlx::query_as::<_, LocationType>(
            r#"
            SELECT location_type_id, name, display_name, level,
                   parent_location_type_id, parent_name, created_at, updated_at
            FROM location_types
            WHERE location_type_id = ANY($1)
            ORDER BY level ASC
            "#,
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }

    pub async fn get_location_type_by_id(
        &self,
        location_type_id: &str,
    ) -> Result<Option<LocationType>, AppError> {
        let location_type = sqlx::query_as::<_, LocationType>(
            r#"
            SELECT location_type_id, name, display_name, level,
                   parent_location_type_id, parent_name, created_at, updated_at
            FROM location_types
            WHERE location_type_id = $1
            "#,
        )
        .bind(location_type_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location_type)
    }

    /// Insere ou atualiza um tipo. O serviço chama linha a linha dentro da
    /// transação da importação.
    pub async fn upsert_location_type<'e, E>(
        &self,
        executor: E, // Aceita um executor (pool ou transação)
        location_type: &LocationType,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO location_types
                (location_type_id, name, display_name, level,
                 parent_location_type_id, parent_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            ON CONFLICT (location_type_id) DO UPDATE SET
                name = EXCLUDED.name,
                display_name = EXCLUDED.display_name,
                level = EXCLUDED.level,
                parent_location_type_id = EXCLUDED.parent_location_type_id,
                parent_name = EXCLUDED.parent_name,
                updated_at = now()
            "#,
        )
        .bind(&location_type.location_type_id)
        .bind(&location_type.name)
        .bind(&location_type.display_name)
        .bind(location_type.level)
        .bind(&location_type.parent_location_type_id)
        .bind(&location_type.parent_name)
        .execute(executor)
        .await?;

        Ok(())
    }
}
