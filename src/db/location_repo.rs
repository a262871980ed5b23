// src/db/location_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::common::error::AppError;
use crate::models::location::Location;

// Sempre qualificado com o alias `l`: metade destas colunas também existe em
// location_types e os joins ficariam ambíguos.
const LOCATION_COLUMNS: &str = r#"
    l.location_id, l.partner_internal_id, l.name, l.location_type,
    l.parent_location_id, l.partner_internal_parent_id, l.access_path,
    l.is_archived, l.created_at, l.updated_at
"#;

// Filtro do caminho de leitura. A lista de ids concedidos vem das claims do
// token; vazia significa acesso de retaguarda (sem filtro).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationFilter {
    pub granted_location_ids: Vec<String>,
    pub include_archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LowestLevelParams {
    pub name: String,
    pub limit: i64,
    pub offset: i64,
    pub location_ids: Vec<String>,
}

#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A localização raiz (a do tipo de nível 0, criada pelo seed).
    pub async fn get_root_location(&self) -> Result<Location, AppError> {
        let root = sqlx::query_as::<_, Location>(&format!(
            r#"
            SELECT {LOCATION_COLUMNS}
            FROM locations l
            JOIN location_types t ON t.location_type_id = l.location_type
            WHERE t.level = 0
            LIMIT 1
            "#,
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(root)
    }

    /// O snapshot cru e completo, sem forma de árvore, usado pelo validador
    /// de importação.
    pub async fn get_all_raw_locations(&self) -> Result<Vec<Location>, AppError> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            r#"
            SELECT {LOCATION_COLUMNS}
            FROM locations l
            ORDER BY l.access_path ASC
            "#,
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Lista filtrada por autorização: um id concedido libera o próprio nó e
    /// todos os descendentes (prefixo do access path).
    pub async fn retrieve_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>, AppError> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            r#"
            SELECT {LOCATION_COLUMNS}
            FROM locations l
            WHERE ($1 OR NOT l.is_archived)
              AND (cardinality($2::text[]) = 0
                   OR EXISTS (
                        SELECT 1 FROM unnest($2::text[]) AS g
                        WHERE '/' || l.access_path || '/' LIKE '%/' || g || '/%'
                   ))
            ORDER BY l.access_path ASC
            "#,
        ))
        .bind(filter.include_archived)
        .bind(filter.granted_location_ids.clone())
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Busca paginada restrita ao nível mais profundo da taxonomia.
    pub async fn get_lowest_level_locations(
        &self,
        params: &LowestLevelParams,
    ) -> Result<Vec<Location>, AppError> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            r#"
            SELECT {LOCATION_COLUMNS}
            FROM locations l
            JOIN location_types t ON t.location_type_id = l.location_type
            WHERE t.level = (SELECT MAX(level) FROM location_types)
              AND NOT l.is_archived
              AND ($1 = '' OR l.name ILIKE '%' || $1 || '%')
              AND (cardinality($2::text[]) = 0 OR l.location_id = ANY($2))
            ORDER BY l.name ASC, l.location_id ASC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(&params.name)
        .bind(params.location_ids.clone())
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Insere ou atualiza uma localização. O serviço chama na ordem já
    /// ordenada por (nível, posição no CSV), pai antes do filho.
    pub async fn upsert_location<'e, E>(&self, executor: E, location: &Location) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO locations
                (location_id, partner_internal_id, name, location_type,
                 parent_location_id, partner_internal_parent_id, access_path,
                 is_archived, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            ON CONFLICT (location_id) DO UPDATE SET
                partner_internal_id = EXCLUDED.partner_internal_id,
                name = EXCLUDED.name,
                location_type = EXCLUDED.location_type,
                parent_location_id = EXCLUDED.parent_location_id,
                partner_internal_parent_id = EXCLUDED.partner_internal_parent_id,
                access_path = EXCLUDED.access_path,
                is_archived = EXCLUDED.is_archived,
                updated_at = now()
            "#,
        )
        .bind(&location.location_id)
        .bind(&location.partner_internal_id)
        .bind(&location.name)
        .bind(&location.location_type)
        .bind(&location.parent_location_id)
        .bind(&location.partner_internal_parent_id)
        .bind(&location.access_path)
        .bind(location.is_archived)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Recalcula o access path de toda a tabela a partir da cadeia de pais.
    /// Roda na mesma transação do upsert, depois que os ids finais existem.
    pub async fn update_access_paths<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            WITH RECURSIVE location_paths AS (
                SELECT location_id, location_id::text AS access_path
                FROM locations
                WHERE parent_location_id = ''
                UNION ALL
                SELECT l.location_id, p.access_path || '/' || l.location_id
                FROM locations l
                JOIN location_paths p ON l.parent_location_id = p.location_id
            )
            UPDATE locations
            SET access_path = location_paths.access_path,
                updated_at = now()
            FROM location_paths
            WHERE locations.location_id = location_paths.location_id
              AND locations.access_path IS DISTINCT FROM location_paths.access_path
            "#,
        )
        .execute(executor)
        .await?;

        Ok(())
    }
}
