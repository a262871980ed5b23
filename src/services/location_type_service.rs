// src/services/location_type_service.rs

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        csv_utils::{self, CsvRow},
        error::{AppError, ImportRuleViolation, RowError},
    },
    db::{ImportLogRepository, LocationTypeRepository},
    models::location::{LocationType, ORG_TYPE_NAME},
};

pub const LOCATION_TYPE_CSV_COLUMNS: [&str; 3] = ["name", "display_name", "level"];

// Linha decodificada do CSV de tipos. `level` só é confiável quando a linha
// não recebeu erro.
#[derive(Debug, Clone, Default)]
pub struct LocationTypeCsvRow {
    pub row_number: usize,
    pub name: String,
    pub display_name: String,
    pub level: i32,
}

#[derive(Clone)]
pub struct LocationTypeService {
    location_type_repo: LocationTypeRepository,
    import_log_repo: ImportLogRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl LocationTypeService {
    pub fn new(
        location_type_repo: LocationTypeRepository,
        import_log_repo: ImportLogRepository,
        pool: PgPool,
    ) -> Self {
        Self { location_type_repo, import_log_repo, pool }
    }

    /// Importa o CSV de tipos, substituindo a taxonomia inteira.
    ///
    /// Os erros de linha são acumulados e devolvidos juntos; as regras de
    /// compatibilidade com o conjunto persistido abortam o lote com um erro
    /// de negócio antes de qualquer escrita.
    pub async fn import_location_types(&self, user_id: &str, payload: &[u8]) -> Result<usize, AppError> {
        let raw_rows = csv_utils::parse_csv(payload, &LOCATION_TYPE_CSV_COLUMNS)?;
        let rows = parse_location_type_rows(&raw_rows).map_err(AppError::RowErrors)?;

        let existing = self.location_type_repo.get_all_location_types().await?;

        // As regras retroativas só fazem sentido quando já existe taxonomia
        // além do tipo raiz.
        if existing.len() >= 2 {
            check_backward_compatibility(&existing, &rows).map_err(AppError::ImportRule)?;
        }

        let resolved = resolve_location_types(&existing, &rows);

        let mut tx = self.pool.begin().await?;
        for location_type in &resolved {
            self.location_type_repo
                .upsert_location_type(&mut *tx, location_type)
                .await?;
        }
        self.import_log_repo
            .insert_log(&mut *tx, user_id, "location_type", &String::from_utf8_lossy(payload))
            .await?;
        tx.commit().await?;

        tracing::info!("importados {} location types", resolved.len());
        Ok(resolved.len())
    }

    /// Cria um tipo avulso no fim da cadeia.
    pub async fn create_location_type(
        &self,
        user_id: &str,
        name: &str,
        display_name: &str,
        level: i32,
    ) -> Result<LocationType, AppError> {
        let existing = self.location_type_repo.get_all_location_types().await?;

        if existing.iter().any(|t| t.name == name) {
            return Err(AppError::DuplicateLocationTypeName(name.to_string()));
        }
        if existing.iter().any(|t| t.level == level) {
            return Err(AppError::ImportRule(ImportRuleViolation::LevelAlreadyExisted));
        }
        // Um tipo novo só pode estender a cadeia; buracos quebram a
        // invariante de níveis contíguos.
        let max_level = existing.iter().map(|t| t.level).max().unwrap_or(0);
        if level != max_level + 1 {
            return Err(AppError::NonSequentialLevel);
        }

        let parent = existing.iter().max_by_key(|t| t.level).cloned();
        let location_type = LocationType {
            location_type_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            level,
            parent_location_type_id: parent
                .as_ref()
                .map(|p| p.location_type_id.clone())
                .unwrap_or_default(),
            parent_name: parent.map(|p| p.name).unwrap_or_default(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let mut tx = self.pool.begin().await?;
        self.location_type_repo
            .upsert_location_type(&mut *tx, &location_type)
            .await?;
        self.import_log_repo
            .insert_log(&mut *tx, user_id, "location_type", name)
            .await?;
        tx.commit().await?;

        Ok(location_type)
    }

    /// Atualiza display name e/ou nível de um tipo existente.
    pub async fn update_location_type(
        &self,
        location_type_id: &str,
        display_name: Option<&str>,
        level: Option<i32>,
    ) -> Result<LocationType, AppError> {
        let mut location_type = self
            .location_type_repo
            .get_location_type_by_id(location_type_id)
            .await?
            .ok_or(AppError::LocationTypeNotFound)?;

        if let Some(new_level) = level {
            if new_level != location_type.level {
                let existing = self.location_type_repo.get_all_location_types().await?;
                let occupied = existing
                    .iter()
                    .any(|t| t.location_type_id != location_type_id && t.level == new_level);
                if occupied {
                    return Err(AppError::ImportRule(ImportRuleViolation::LevelAlreadyExisted));
                }
                // Mover um tipo por cima de outro inverteria a ordem
                // pai/filho da cadeia.
                let (low, high) = if new_level > location_type.level {
                    (location_type.level, new_level)
                } else {
                    (new_level, location_type.level)
                };
                let crosses = existing.iter().any(|t| {
                    t.location_type_id != location_type_id && t.level > low && t.level < high
                });
                if crosses {
                    return Err(AppError::ImportRule(ImportRuleViolation::LevelSwapped));
                }
                location_type.level = new_level;
            }
        }
        if let Some(display_name) = display_name {
            location_type.display_name = display_name.to_string();
        }

        let mut tx = self.pool.begin().await?;
        self.location_type_repo
            .upsert_location_type(&mut *tx, &location_type)
            .await?;
        tx.commit().await?;

        Ok(location_type)
    }

    /// Exportação com as colunas fixas que o parceiro espera de volta.
    pub async fn export_location_types(&self) -> Result<String, AppError> {
        let types = self.location_type_repo.get_all_location_types().await?;
        let rows: Vec<Vec<String>> = types
            .iter()
            .map(|t| {
                vec![
                    t.location_type_id.clone(),
                    t.name.clone(),
                    t.display_name.clone(),
                    t.level.to_string(),
                ]
            })
            .collect();
        Ok(csv_utils::write_csv(&["location_type_id", "name", "display_name", "level"], &rows))
    }

    pub async fn get_all_location_types(&self) -> Result<Vec<LocationType>, AppError> {
        self.location_type_repo.get_all_location_types().await
    }
}

// ---
// Validação pura (testável sem banco)
// ---

/// Decodifica e valida as linhas do CSV de tipos. O primeiro erro de cada
/// linha vence, mas TODAS as linhas são avaliadas antes de devolver o
/// relatório.
pub fn parse_location_type_rows(raw_rows: &[CsvRow]) -> Result<Vec<LocationTypeCsvRow>, Vec<RowError>> {
    let mut rows: Vec<LocationTypeCsvRow> = Vec::with_capacity(raw_rows.len());
    let mut errors: Vec<Option<RowError>> = Vec::with_capacity(raw_rows.len());

    for raw in raw_rows {
        let (row, error) = decode_row(raw);
        rows.push(row);
        errors.push(error);
    }

    // Unicidade de nome e de nível dentro do lote: a SEGUNDA ocorrência é a
    // linha apontada.
    let mut seen_names: HashMap<String, usize> = HashMap::new();
    let mut seen_levels: HashMap<i32, usize> = HashMap::new();
    for i in 0..rows.len() {
        if errors[i].is_some() {
            continue;
        }
        if seen_names.contains_key(&rows[i].name) {
            errors[i] = Some(RowError::new(
                rows[i].row_number,
                format!("name {} is duplicated", rows[i].name),
            ));
            continue;
        }
        seen_names.insert(rows[i].name.clone(), i);

        if seen_levels.contains_key(&rows[i].level) {
            errors[i] = Some(RowError::new(
                rows[i].row_number,
                format!("level {} is duplicated", rows[i].level),
            ));
            continue;
        }
        seen_levels.insert(rows[i].level, i);
    }

    // Ordem sequencial: 1, 2, 3, … na ordem de submissão. Linhas já
    // inválidas não ancoram a verificação das vizinhas.
    for i in 0..rows.len() {
        if errors[i].is_some() {
            continue;
        }
        let expected = if i == 0 {
            1
        } else if errors[i - 1].is_none() {
            rows[i - 1].level + 1
        } else {
            continue;
        };
        if rows[i].level != expected {
            errors[i] = Some(RowError::new(rows[i].row_number, "level must be in sequential order"));
        }
    }

    let collected: Vec<RowError> = errors.into_iter().flatten().collect();
    if collected.is_empty() {
        Ok(rows)
    } else {
        Err(collected)
    }
}

fn decode_row(raw: &CsvRow) -> (LocationTypeCsvRow, Option<RowError>) {
    let mut row = LocationTypeCsvRow { row_number: raw.row_number, ..Default::default() };
    let fail = |message: String| Some(RowError::new(raw.row_number, message));

    // Aceitamos uma célula booleana extra no fim (o formato legado de
    // exportação carregava is_archived).
    if raw.cells.len() < LOCATION_TYPE_CSV_COLUMNS.len()
        || raw.cells.len() > LOCATION_TYPE_CSV_COLUMNS.len() + 1
    {
        let error = fail(format!(
            "wrong number of columns, expected {}, got {}",
            LOCATION_TYPE_CSV_COLUMNS.len(),
            raw.cells.len()
        ));
        return (row, error);
    }

    let name = match std::str::from_utf8(&raw.cells[0]) {
        Ok(s) => s.trim().to_string(),
        Err(_) => return (row, fail("name is not a valid UTF8 string".into())),
    };
    let display_name = match std::str::from_utf8(&raw.cells[1]) {
        Ok(s) => s.trim().to_string(),
        Err(_) => return (row, fail("display name is not a valid UTF8 string".into())),
    };
    let level_text = match std::str::from_utf8(&raw.cells[2]) {
        Ok(s) => s.trim().to_string(),
        Err(_) => return (row, fail("level is not a valid UTF8 string".into())),
    };

    if name.is_empty() {
        return (row, fail("name can not be empty".into()));
    }
    if display_name.is_empty() {
        return (row, fail("display name can not be empty".into()));
    }
    if name.eq_ignore_ascii_case(ORG_TYPE_NAME) {
        return (row, fail(format!("can not import {ORG_TYPE_NAME}")));
    }

    let level = match level_text.parse::<i32>() {
        Ok(level) => level,
        Err(_) => return (row, fail(format!("{level_text} is not a valid integer"))),
    };
    if level <= 0 {
        row.name = name;
        row.display_name = display_name;
        return (row, fail("level must be greater than 0".into()));
    }

    if let Some(archived_cell) = raw.cells.get(LOCATION_TYPE_CSV_COLUMNS.len()) {
        let text = String::from_utf8_lossy(archived_cell);
        if let Err(message) = csv_utils::parse_bool_cell(text.trim()) {
            return (row, fail(message));
        }
    }

    row.name = name;
    row.display_name = display_name;
    row.level = level;
    (row, None)
}

/// Regras retroativas contra o conjunto persistido. Bloqueiam o lote
/// inteiro, por isso são erros de negócio e não de linha.
pub fn check_backward_compatibility(
    existing: &[LocationType],
    submitted: &[LocationTypeCsvRow],
) -> Result<(), ImportRuleViolation> {
    // 1. Todo tipo já persistido (fora o raiz) precisa reaparecer.
    for location_type in existing.iter().filter(|t| !t.is_org()) {
        if !submitted.iter().any(|row| row.name == location_type.name) {
            return Err(ImportRuleViolation::MustImportAllExistData);
        }
    }

    // 2. O último tipo submetido precisa continuar sendo o mais profundo já
    // persistido: trocar a folha da taxonomia órfãs todas as localizações
    // desse nível.
    let lowest_existing = existing.iter().max_by_key(|t| t.level);
    if let (Some(lowest), Some(last)) = (lowest_existing, submitted.last()) {
        if !lowest.is_org() && last.name != lowest.name {
            return Err(ImportRuleViolation::CanNotUpdateLowestType);
        }
    }

    Ok(())
}

/// Liga cada linha ao id persistido (casado por nome) ou gera um id novo, e
/// encadeia os ponteiros de pai na ordem de submissão.
pub fn resolve_location_types(existing: &[LocationType], rows: &[LocationTypeCsvRow]) -> Vec<LocationType> {
    let by_name: HashMap<&str, &LocationType> =
        existing.iter().map(|t| (t.name.as_str(), t)).collect();
    let org = existing
        .iter()
        .find(|t| t.is_org())
        .cloned()
        .unwrap_or_else(LocationType::org_sentinel);

    let mut resolved: Vec<LocationType> = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let location_type_id = by_name
            .get(row.name.as_str())
            .map(|t| t.location_type_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let (parent_id, parent_name) = if i == 0 {
            (org.location_type_id.clone(), org.name.clone())
        } else {
            (resolved[i - 1].location_type_id.clone(), resolved[i - 1].name.clone())
        };

        resolved.push(LocationType {
            location_type_id,
            name: row.name.clone(),
            display_name: row.display_name.clone(),
            level: row.level,
            parent_location_type_id: parent_id,
            parent_name,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        });
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::csv_utils::parse_csv;

    fn existing_type(id: &str, name: &str, level: i32) -> LocationType {
        LocationType {
            location_type_id: id.to_string(),
            name: name.to_string(),
            display_name: name.to_string(),
            level,
            parent_location_type_id: String::new(),
            parent_name: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn parse(payload: &[u8]) -> Result<Vec<LocationTypeCsvRow>, Vec<RowError>> {
        let raw = parse_csv(payload, &LOCATION_TYPE_CSV_COLUMNS).expect("csv deveria ser bem formado");
        parse_location_type_rows(&raw)
    }

    #[test]
    fn flags_invalid_values_per_row_and_keeps_going() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"name,display_name,level\n");
        payload.extend_from_slice(b"org1,LocType 1,1,bool\n");
        payload.extend_from_slice(b"org2,   ,2\n");
        payload.extend_from_slice(b"org,Loc type xyz,3\n");
        payload.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        payload.extend_from_slice(b",display,4,1\n");

        let errors = parse(&payload).unwrap_err();
        assert_eq!(
            errors,
            vec![
                RowError::new(2, "bool is not a valid boolean"),
                RowError::new(3, "display name can not be empty"),
                RowError::new(4, "can not import org"),
                RowError::new(5, "name is not a valid UTF8 string"),
            ]
        );
    }

    #[test]
    fn flags_duplicated_name_and_level_on_second_occurrence() {
        let errors = parse(
            b"name,display_name,level\n\
              org1,LocType 1,1,1\n\
              org1,Loc Type 2,2\n\
              org3,Loc type 3,3\n\
              org4,Loc type 4,3\n",
        )
        .unwrap_err();
        assert_eq!(
            errors,
            vec![
                RowError::new(3, "name org1 is duplicated"),
                RowError::new(5, "level 3 is duplicated"),
            ]
        );
    }

    #[test]
    fn flags_non_positive_and_non_sequential_levels() {
        let errors = parse(
            b"name,display_name,level\n\
              org1,LocType 1,-1\n\
              org2,Loc Type 2,4\n\
              org3,Loc type 3,3\n",
        )
        .unwrap_err();
        // A linha 2 falha na regra de nível positivo; a linha 3 não é
        // ancorada por uma vizinha inválida; a linha 4 quebra a sequência.
        assert_eq!(
            errors,
            vec![
                RowError::new(2, "level must be greater than 0"),
                RowError::new(4, "level must be in sequential order"),
            ]
        );
    }

    #[test]
    fn flags_level_gap_as_non_sequential() {
        let errors = parse(
            b"name,display_name,level\n\
              org1,LocType 1,1\n\
              org2,Loc Type 2,2\n\
              org3,Loc type 3,4\n",
        )
        .unwrap_err();
        assert_eq!(errors, vec![RowError::new(4, "level must be in sequential order")]);
    }

    #[test]
    fn first_row_must_start_at_level_one() {
        let errors = parse(b"name,display_name,level\nbrand,brand,2\n").unwrap_err();
        assert_eq!(errors, vec![RowError::new(2, "level must be in sequential order")]);
    }

    #[test]
    fn accepts_trailing_boolean_cell() {
        let rows = parse(b"name,display_name,level\nbrand,brand,1,true\ncenter,center,2,0\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].level, 1);
    }

    // Cenários das regras retroativas, com org(0)/brand(1)/center(2) já
    // persistidos.

    fn persisted() -> Vec<LocationType> {
        vec![
            existing_type("location-type-id", "org", 0),
            existing_type("location-type-id2", "brand", 1),
            existing_type("location-type-id22", "center", 2),
        ]
    }

    #[test]
    fn rejects_submission_missing_an_existing_name() {
        let rows = parse(b"name,display_name,level\nbrand,brand,1\n").unwrap();
        assert_eq!(
            check_backward_compatibility(&persisted(), &rows),
            Err(ImportRuleViolation::MustImportAllExistData)
        );
    }

    #[test]
    fn rejects_submission_replacing_the_lowest_type() {
        let rows = parse(
            b"name,display_name,level\n\
              brand,brand,1\n\
              center,center,2\n\
              center1,center1,3\n",
        )
        .unwrap();
        assert_eq!(
            check_backward_compatibility(&persisted(), &rows),
            Err(ImportRuleViolation::CanNotUpdateLowestType)
        );
    }

    #[test]
    fn accepts_resubmission_of_every_existing_type() {
        let rows = parse(b"name,display_name,level\nbrand,brand,1\ncenter,center,2\n").unwrap();
        assert_eq!(check_backward_compatibility(&persisted(), &rows), Ok(()));
    }

    #[test]
    fn accepts_a_new_type_in_the_middle_of_the_chain() {
        let rows = parse(
            b"name,display_name,level\n\
              brand,brand,1\n\
              center1,center1,2\n\
              center,center,3\n",
        )
        .unwrap();
        assert_eq!(check_backward_compatibility(&persisted(), &rows), Ok(()));
    }

    #[test]
    fn resolution_reuses_ids_and_chains_parents() {
        let rows = parse(
            b"name,display_name,level\n\
              brand,brand,1\n\
              center1,center1,2\n\
              center,center,3\n",
        )
        .unwrap();
        let resolved = resolve_location_types(&persisted(), &rows);

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].location_type_id, "location-type-id2");
        assert_eq!(resolved[2].location_type_id, "location-type-id22");
        // O tipo novo recebe um id gerado.
        assert!(!resolved[1].location_type_id.is_empty());
        assert_ne!(resolved[1].location_type_id, "location-type-id2");
        assert_ne!(resolved[1].location_type_id, "location-type-id22");

        assert_eq!(resolved[0].parent_name, "org");
        assert_eq!(resolved[0].parent_location_type_id, "location-type-id");
        assert_eq!(resolved[1].parent_name, "brand");
        assert_eq!(resolved[2].parent_name, "center1");
        assert_eq!(resolved[2].parent_location_type_id, resolved[1].location_type_id);
    }
}
