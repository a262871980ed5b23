// src/services/location_service.rs

use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        csv_utils::{self, CsvRow},
        error::{AppError, ImportRuleViolation, RowError},
    },
    db::{ImportLogRepository, LocationRepository, LocationTypeRepository},
    models::location::{Location, LocationType},
};

pub const LOCATION_CSV_COLUMNS: [&str; 4] =
    ["partner_internal_id", "name", "location_type", "partner_internal_parent_id"];

// Linha decodificada do CSV de localizações. `location_type` carrega o NOME
// submetido até a resolução final trocá-lo pelo id.
#[derive(Debug, Clone, Default)]
pub struct LocationCsvRow {
    pub row_number: usize,
    pub partner_internal_id: String,
    pub name: String,
    pub location_type: String,
    pub partner_internal_parent_id: String,
    pub is_archived: bool,
}

// O snapshot persistido contra o qual o lote é validado.
pub struct LocationSnapshot<'a> {
    pub root: &'a Location,
    pub location_types: &'a [LocationType],
    pub existing_locations: &'a [Location],
}

#[derive(Clone)]
pub struct LocationService {
    location_repo: LocationRepository,
    location_type_repo: LocationTypeRepository,
    import_log_repo: ImportLogRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl LocationService {
    pub fn new(
        location_repo: LocationRepository,
        location_type_repo: LocationTypeRepository,
        import_log_repo: ImportLogRepository,
        pool: PgPool,
    ) -> Self {
        Self { location_repo, location_type_repo, import_log_repo, pool }
    }

    /// Importa o CSV de localizações: valida o lote inteiro contra o
    /// snapshot persistido, resolve ids e persiste tudo numa transação só.
    pub async fn import_locations(&self, user_id: &str, payload: &[u8]) -> Result<usize, AppError> {
        let raw_rows = csv_utils::parse_csv(payload, &LOCATION_CSV_COLUMNS)?;
        let rows = parse_location_rows(&raw_rows).map_err(AppError::RowErrors)?;

        let root = self.location_repo.get_root_location().await?;
        let location_types = self.location_type_repo.get_all_location_types().await?;
        let existing_locations = self.location_repo.get_all_raw_locations().await?;

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &location_types,
            existing_locations: &existing_locations,
        };
        let resolved = validate_and_resolve_locations(&snapshot, &rows)?;

        // Pai sempre antes do filho: `resolved` já sai ordenado por
        // (nível do tipo, posição no CSV).
        let mut tx = self.pool.begin().await?;
        for location in &resolved {
            self.location_repo.upsert_location(&mut *tx, location).await?;
        }
        // O caminho completo só pode ser montado depois que os ids finais
        // estão todos na tabela.
        self.location_repo.update_access_paths(&mut *tx).await?;
        self.import_log_repo
            .insert_log(&mut *tx, user_id, "location", &String::from_utf8_lossy(payload))
            .await?;
        tx.commit().await?;

        tracing::info!("importadas {} localizações", resolved.len());
        Ok(resolved.len())
    }

    /// Exportação com as colunas fixas que o parceiro espera de volta.
    pub async fn export_locations(&self) -> Result<String, AppError> {
        let locations = self.location_repo.get_all_raw_locations().await?;
        let rows: Vec<Vec<String>> = locations
            .iter()
            .map(|l| {
                vec![
                    l.location_id.clone(),
                    l.partner_internal_id.clone(),
                    l.name.clone(),
                    l.location_type.clone(),
                    l.partner_internal_parent_id.clone(),
                ]
            })
            .collect();
        Ok(csv_utils::write_csv(
            &["location_id", "partner_internal_id", "name", "location_type", "partner_internal_parent_id"],
            &rows,
        ))
    }
}

// ---
// Validação pura (testável sem banco)
// ---

/// Decodifica as linhas e aplica as regras que não dependem do snapshot:
/// células UTF-8, colunas obrigatórias, booleano final e duplicidade de
/// partner_internal_id dentro do lote.
pub fn parse_location_rows(raw_rows: &[CsvRow]) -> Result<Vec<LocationCsvRow>, Vec<RowError>> {
    let mut rows: Vec<LocationCsvRow> = Vec::with_capacity(raw_rows.len());
    let mut errors: Vec<Option<RowError>> = Vec::with_capacity(raw_rows.len());

    for raw in raw_rows {
        let (row, error) = decode_row(raw);
        rows.push(row);
        errors.push(error);
    }

    // A duplicidade conta TODA ocorrência anterior, mesmo de uma linha que
    // já falhou em outra regra; a segunda ocorrência é a linha apontada.
    let mut seen: HashSet<&str> = HashSet::new();
    for i in 0..rows.len() {
        let pid = rows[i].partner_internal_id.as_str();
        if pid.is_empty() {
            continue;
        }
        if seen.contains(pid) && errors[i].is_none() {
            errors[i] = Some(RowError::new(
                rows[i].row_number,
                format!("partner internal id {pid} is duplicated"),
            ));
        }
        seen.insert(pid);
    }

    let collected: Vec<RowError> = errors.into_iter().flatten().collect();
    if collected.is_empty() {
        Ok(rows)
    } else {
        Err(collected)
    }
}

fn decode_row(raw: &CsvRow) -> (LocationCsvRow, Option<RowError>) {
    let mut row = LocationCsvRow { row_number: raw.row_number, ..Default::default() };
    let fail = |message: String| Some(RowError::new(raw.row_number, message));

    // Uma célula booleana extra no fim (is_archived) é aceita.
    if raw.cells.len() < LOCATION_CSV_COLUMNS.len() || raw.cells.len() > LOCATION_CSV_COLUMNS.len() + 1 {
        let error = fail(format!(
            "wrong number of columns, expected {}, got {}",
            LOCATION_CSV_COLUMNS.len(),
            raw.cells.len()
        ));
        return (row, error);
    }

    let mut cells: Vec<String> = Vec::with_capacity(LOCATION_CSV_COLUMNS.len());
    for (i, column) in LOCATION_CSV_COLUMNS.iter().enumerate() {
        match std::str::from_utf8(&raw.cells[i]) {
            Ok(s) => cells.push(s.trim().to_string()),
            Err(_) => return (row, fail(format!("{column} is not a valid UTF8 string"))),
        }
    }

    for (i, column) in LOCATION_CSV_COLUMNS.iter().enumerate() {
        // A coluna do pai é a única que pode ficar em branco (pai = raiz).
        if *column != "partner_internal_parent_id" && cells[i].is_empty() {
            return (row, fail(format!("column {column} is required")));
        }
    }

    if let Some(archived_cell) = raw.cells.get(LOCATION_CSV_COLUMNS.len()) {
        let text = String::from_utf8_lossy(archived_cell);
        match csv_utils::parse_bool_cell(text.trim()) {
            Ok(value) => row.is_archived = value,
            Err(message) => return (row, fail(message)),
        }
    }

    row.partner_internal_id = cells[0].clone();
    row.name = cells[1].clone();
    row.location_type = cells[2].clone();
    row.partner_internal_parent_id = cells[3].clone();
    (row, None)
}

/// Valida o lote contra o snapshot e, se tudo passar, devolve as
/// localizações resolvidas (nomes → ids) na ordem de upsert.
///
/// As regras por linha param na primeira falha DAQUELA linha, mas todas as
/// linhas são avaliadas; o gate de completude roda uma vez depois delas.
pub fn validate_and_resolve_locations(
    snapshot: &LocationSnapshot,
    rows: &[LocationCsvRow],
) -> Result<Vec<Location>, AppError> {
    let type_by_name: HashMap<&str, &LocationType> = snapshot
        .location_types
        .iter()
        .map(|t| (t.name.as_str(), t))
        .collect();
    let type_by_id: HashMap<&str, &LocationType> = snapshot
        .location_types
        .iter()
        .map(|t| (t.location_type_id.as_str(), t))
        .collect();
    let existing_by_pid: HashMap<&str, &Location> = snapshot
        .existing_locations
        .iter()
        .filter(|l| !l.partner_internal_id.is_empty())
        .map(|l| (l.partner_internal_id.as_str(), l))
        .collect();
    // Primeira ocorrência de cada pid do lote, para um pai poder ser outra
    // linha nova da mesma submissão.
    let mut batch_by_pid: HashMap<&str, &LocationCsvRow> = HashMap::new();
    for row in rows {
        batch_by_pid.entry(row.partner_internal_id.as_str()).or_insert(row);
    }

    let mut errors: Vec<Option<RowError>> = vec![None; rows.len()];

    // 1. Regras por linha que dependem do snapshot: tipo conhecido, pai
    // resolvível e ordem de níveis.
    for (i, row) in rows.iter().enumerate() {
        let Some(row_type) = type_by_name.get(row.location_type.as_str()) else {
            errors[i] = Some(RowError::new(
                row.row_number,
                format!("location type {} does not exist", row.location_type),
            ));
            continue;
        };

        let parent_type = resolve_parent_type(snapshot, &type_by_name, &type_by_id, &batch_by_pid, row);
        let Some(parent_type) = parent_type else {
            errors[i] = Some(RowError::new(
                row.row_number,
                format!(
                    "parent location with partner internal id {} does not exist",
                    row.partner_internal_parent_id
                ),
            ));
            continue;
        };

        if parent_type.level >= row_type.level {
            errors[i] = Some(RowError::new(
                row.row_number,
                format!(
                    "parent location type {} (level {}) must have a smaller level than {} (level {})",
                    parent_type.name, parent_type.level, row_type.name, row_type.level
                ),
            ));
        }
    }

    if errors.iter().any(Option::is_some) {
        return Err(AppError::RowErrors(errors.into_iter().flatten().collect()));
    }

    // 2. Gate de completude, computado uma vez sobre o lote inteiro: a
    // importação substitui o conjunto todo, então nenhum pid persistido
    // (fora a raiz) pode sumir da submissão.
    let submitted_pids: HashSet<&str> = rows.iter().map(|r| r.partner_internal_id.as_str()).collect();
    for location in snapshot.existing_locations {
        if location.partner_internal_id.is_empty() {
            continue;
        }
        let is_org = type_by_id
            .get(location.location_type.as_str())
            .is_some_and(|t| t.is_org());
        if is_org {
            continue;
        }
        if !submitted_pids.contains(location.partner_internal_id.as_str()) {
            return Err(AppError::ImportRule(ImportRuleViolation::MustImportAllExistData));
        }
    }

    // 3. Regras por linha restantes: nenhum ramo pode ficar sem folha
    // alcançável, e o pai de uma localização existente é imutável.
    let lowest_level = snapshot
        .location_types
        .iter()
        .map(|t| t.level)
        .max()
        .unwrap_or(0);
    for (i, row) in rows.iter().enumerate() {
        let row_type = type_by_name[row.location_type.as_str()];
        if row_type.level != lowest_level {
            let has_child = rows
                .iter()
                .any(|other| other.partner_internal_parent_id == row.partner_internal_id);
            if !has_child {
                errors[i] = Some(RowError::new(
                    row.row_number,
                    "cannot import location which is parent having no child",
                ));
                continue;
            }
        }

        if let Some(existing) = existing_by_pid.get(row.partner_internal_id.as_str()) {
            if existing.partner_internal_parent_id != row.partner_internal_parent_id {
                errors[i] = Some(RowError::new(row.row_number, "cannot change parent of the location"));
            }
        }
    }

    if errors.iter().any(Option::is_some) {
        return Err(AppError::RowErrors(errors.into_iter().flatten().collect()));
    }

    // 4. Resolução: ids reaproveitados ou gerados, pais ligados, caminho
    // provisório apontando para a raiz (o caminho real é recalculado pela
    // camada de persistência com os ids finais).
    let mut id_by_pid: HashMap<&str, String> = HashMap::new();
    for row in rows {
        let location_id = existing_by_pid
            .get(row.partner_internal_id.as_str())
            .map(|l| l.location_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        id_by_pid.insert(row.partner_internal_id.as_str(), location_id);
    }

    let mut resolved: Vec<(i32, usize, Location)> = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let row_type = type_by_name[row.location_type.as_str()];
        let parent_location_id = if row.partner_internal_parent_id.is_empty() {
            snapshot.root.location_id.clone()
        } else if let Some(id) = id_by_pid.get(row.partner_internal_parent_id.as_str()) {
            id.clone()
        } else {
            existing_by_pid[row.partner_internal_parent_id.as_str()].location_id.clone()
        };

        resolved.push((
            row_type.level,
            i,
            Location {
                location_id: id_by_pid[row.partner_internal_id.as_str()].clone(),
                partner_internal_id: row.partner_internal_id.clone(),
                name: row.name.clone(),
                location_type: row_type.location_type_id.clone(),
                parent_location_id,
                partner_internal_parent_id: row.partner_internal_parent_id.clone(),
                access_path: snapshot.root.location_id.clone(),
                is_archived: row.is_archived,
                is_unauthorized: false,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
        ));
    }
    resolved.sort_by_key(|(level, position, _)| (*level, *position));

    Ok(resolved.into_iter().map(|(_, _, location)| location).collect())
}

// Pai vazio liga ao tipo da raiz; senão o pai precisa existir no conjunto
// persistido ou no próprio lote (onde a resolução é por NOME de tipo, já que
// as linhas ainda não têm ids).
fn resolve_parent_type<'a>(
    snapshot: &'a LocationSnapshot,
    type_by_name: &HashMap<&str, &'a LocationType>,
    type_by_id: &HashMap<&str, &'a LocationType>,
    batch_by_pid: &HashMap<&str, &LocationCsvRow>,
    row: &LocationCsvRow,
) -> Option<&'a LocationType> {
    if row.partner_internal_parent_id.is_empty() {
        return type_by_id.get(snapshot.root.location_type.as_str()).copied();
    }
    if let Some(existing) = snapshot
        .existing_locations
        .iter()
        .find(|l| l.partner_internal_id == row.partner_internal_parent_id)
    {
        return type_by_id.get(existing.location_type.as_str()).copied();
    }
    if let Some(batch_row) = batch_by_pid.get(row.partner_internal_parent_id.as_str()) {
        if batch_row.partner_internal_id != row.partner_internal_id {
            return type_by_name.get(batch_row.location_type.as_str()).copied();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::csv_utils::parse_csv;

    fn location_type(id: &str, name: &str, level: i32) -> LocationType {
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

    fn location(id: &str, pid: &str, type_id: &str, parent_pid: &str) -> Location {
        Location {
            location_id: id.to_string(),
            partner_internal_id: pid.to_string(),
            name: id.to_string(),
            location_type: type_id.to_string(),
            parent_location_id: String::new(),
            partner_internal_parent_id: parent_pid.to_string(),
            access_path: id.to_string(),
            is_archived: false,
            is_unauthorized: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn taxonomy() -> Vec<LocationType> {
        vec![
            location_type("location-type-0", "org", 0),
            location_type("location-type-1", "brand", 1),
            location_type("location-type-2", "center", 2),
            location_type("location-type-3", "area", 3),
        ]
    }

    fn parse(payload: &[u8]) -> Result<Vec<LocationCsvRow>, Vec<RowError>> {
        let raw = parse_csv(payload, &LOCATION_CSV_COLUMNS).expect("csv deveria ser bem formado");
        parse_location_rows(&raw)
    }

    #[test]
    fn flags_invalid_values_per_row_and_keeps_going() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"partner_internal_id,name,location_type,partner_internal_parent_id\n");
        payload.extend_from_slice(b"pID1,Location 1,location-type-1,location2,yes\n");
        payload.extend_from_slice(b"pIDA,,center,12\n");
        payload.extend_from_slice(b"pIDA,Location 16,locType,\n");
        payload.extend_from_slice(b"pIDB,Location 1,brand,\n");
        payload.extend_from_slice(b"pIDC,");
        payload.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        payload.extend_from_slice(b",brand,\n");

        let errors = parse(&payload).unwrap_err();
        assert_eq!(
            errors,
            vec![
                RowError::new(2, "yes is not a valid boolean"),
                RowError::new(3, "column name is required"),
                // A primeira ocorrência de pIDA falhou em outra regra, mas
                // ainda conta para a duplicidade.
                RowError::new(4, "partner internal id pIDA is duplicated"),
                RowError::new(6, "name is not a valid UTF8 string"),
            ]
        );
    }

    #[test]
    fn resolves_a_valid_batch_reusing_and_generating_ids() {
        let root = location("location-id-0", "", "location-type-0", "");
        let existing = vec![root.clone()];
        let types = taxonomy();
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              partner B,Location 1,brand,\n\
              partner C,Location 2,center,partner B\n\
              partner D,Location 3,area,partner C\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let resolved = validate_and_resolve_locations(&snapshot, &rows).unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].partner_internal_id, "partner B");
        assert_eq!(resolved[0].location_type, "location-type-1");
        // Pai vazio liga à raiz.
        assert_eq!(resolved[0].parent_location_id, "location-id-0");
        // Pai dentro do lote recebe o id recém-gerado daquela linha.
        assert_eq!(resolved[1].parent_location_id, resolved[0].location_id);
        assert_eq!(resolved[2].parent_location_id, resolved[1].location_id);
        // Caminho provisório: só a raiz, até a persistência recalcular.
        assert!(resolved.iter().all(|l| l.access_path == "location-id-0"));
    }

    #[test]
    fn sorts_resolved_rows_by_level_keeping_csv_order_within_a_level() {
        let root = location("location-id-0", "", "location-type-0", "");
        let existing = vec![root.clone()];
        let types = taxonomy();
        // O filho vem antes do pai no arquivo; a saída precisa invertê-los.
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              partner C,Location 2,center,partner B\n\
              partner B,Location 1,brand,\n\
              partner A,Location 0,brand,\n\
              partner E,Location 4,center,partner A\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let resolved = validate_and_resolve_locations(&snapshot, &rows).unwrap();

        let pids: Vec<&str> = resolved.iter().map(|l| l.partner_internal_id.as_str()).collect();
        assert_eq!(pids, vec!["partner B", "partner A", "partner C", "partner E"]);
    }

    #[test]
    fn rejects_unknown_location_type_and_missing_parent() {
        let root = location("location-id-0", "", "location-type-0", "");
        let existing = vec![root.clone()];
        let types = taxonomy();
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              pA,Location 1,locType,\n\
              pB,Location 2,center,ghost\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let err = validate_and_resolve_locations(&snapshot, &rows).unwrap_err();
        match err {
            AppError::RowErrors(errors) => assert_eq!(
                errors,
                vec![
                    RowError::new(2, "location type locType does not exist"),
                    RowError::new(3, "parent location with partner internal id ghost does not exist"),
                ]
            ),
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn rejects_parent_with_level_not_above_the_child() {
        let root = location("location-id-0", "", "location-type-0", "");
        let existing = vec![root.clone()];
        let types = taxonomy();
        // brand (1) não pode ser filho de brand (1).
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              pA,Location 1,brand,\n\
              pB,Location 2,brand,pA\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let err = validate_and_resolve_locations(&snapshot, &rows).unwrap_err();
        match err {
            AppError::RowErrors(errors) => assert_eq!(
                errors,
                vec![RowError::new(
                    3,
                    "parent location type brand (level 1) must have a smaller level than brand (level 1)"
                )]
            ),
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn rejects_a_row_typed_as_org_without_touching_the_others() {
        let root = location("location-id-0", "", "location-type-0", "");
        let existing = vec![root.clone()];
        let types = taxonomy();
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              pA,Location 1,org,\n\
              pB,Location 2,brand,\n\
              pC,Location 3,center,pB\n\
              pD,Location 4,area,pC\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let err = validate_and_resolve_locations(&snapshot, &rows).unwrap_err();
        match err {
            AppError::RowErrors(errors) => {
                // Só a linha do org é apontada; as demais permanecem limpas.
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].row_number, 2);
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn rejects_batch_missing_a_persisted_partner_id() {
        let root = location("location-org", "loc_org", "location-type-0", "");
        let existing = vec![
            root.clone(),
            location("location-brand", "loc_brand", "location-type-1", ""),
            location("location-center", "loc_center", "location-type-2", "loc_brand"),
        ];
        let types = taxonomy();
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              loc_brand,brand,brand,\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let err = validate_and_resolve_locations(&snapshot, &rows).unwrap_err();
        assert!(matches!(
            err,
            AppError::ImportRule(ImportRuleViolation::MustImportAllExistData)
        ));
    }

    #[test]
    fn rejects_non_lowest_row_without_a_child_in_the_batch() {
        let root = location("location-id-0", "", "location-type-0", "");
        let existing = vec![root.clone()];
        let types = vec![
            location_type("location-type-0", "org", 0),
            location_type("location-type-1", "brand", 1),
            location_type("location-type-2", "center", 2),
        ];
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              brand,brand,brand,\n\
              loc_center,center,center,brand\n\
              brand1,brand1,brand,\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let err = validate_and_resolve_locations(&snapshot, &rows).unwrap_err();
        match err {
            AppError::RowErrors(errors) => assert_eq!(
                errors,
                vec![RowError::new(4, "cannot import location which is parent having no child")]
            ),
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn rejects_changing_the_parent_of_an_existing_location() {
        let root = location("location-id-0", "", "location-type-0", "");
        let existing = vec![
            root.clone(),
            location("location-brand", "pA", "location-type-1", ""),
            location("location-center", "cA", "location-type-2", "pA"),
        ];
        let types = vec![
            location_type("location-type-0", "org", 0),
            location_type("location-type-1", "brand", 1),
            location_type("location-type-2", "center", 2),
        ];
        // cA existia sob pA e agora aponta para pB.
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              pA,Brand A,brand,\n\
              cB,Center B,center,pA\n\
              pB,Brand B,brand,\n\
              cA,Center A,center,pB\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let err = validate_and_resolve_locations(&snapshot, &rows).unwrap_err();
        match err {
            AppError::RowErrors(errors) => assert_eq!(
                errors,
                vec![RowError::new(5, "cannot change parent of the location")]
            ),
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn reuses_the_persisted_id_for_an_existing_partner_id() {
        let root = location("location-id-0", "", "location-type-0", "");
        let existing = vec![
            root.clone(),
            location("location-brand", "pA", "location-type-1", ""),
            location("location-center", "cA", "location-type-2", "pA"),
        ];
        let types = vec![
            location_type("location-type-0", "org", 0),
            location_type("location-type-1", "brand", 1),
            location_type("location-type-2", "center", 2),
        ];
        let rows = parse(
            b"partner_internal_id,name,location_type,partner_internal_parent_id\n\
              pA,Brand A,brand,\n\
              cA,Center A,center,pA\n",
        )
        .unwrap();

        let snapshot = LocationSnapshot {
            root: &root,
            location_types: &types,
            existing_locations: &existing,
        };
        let resolved = validate_and_resolve_locations(&snapshot, &rows).unwrap();
        assert_eq!(resolved[0].location_id, "location-brand");
        assert_eq!(resolved[1].location_id, "location-center");
        assert_eq!(resolved[1].parent_location_id, "location-brand");
    }
}
