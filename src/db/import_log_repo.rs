// src/db/import_log_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

// Só escreve dentro da transação da importação, por isso não guarda pool.
#[derive(Clone, Default)]
pub struct ImportLogRepository;

impl ImportLogRepository {
    pub fn new() -> Self {
        Self
    }

    /// Grava o registro de auditoria da importação, na mesma transação do
    /// upsert das linhas.
    pub async fn insert_log<'e, E>(
        &self,
        executor: E,
        user_id: &str,
        import_type: &str,
        payload: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO import_logs (import_log_id, user_id, import_type, payload, created_at)
            VALUES ($1, $2, $3, $4, now())
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(import_type)
        .bind(payload)
        .execute(executor)
        .await?;

        Ok(())
    }
}
