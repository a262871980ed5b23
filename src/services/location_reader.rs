// src/services/location_reader.rs

use std::collections::HashMap;

use anyhow::anyhow;

use crate::{
    common::error::AppError,
    db::{LocationFilter, LocationRepository, LocationTypeRepository, LowestLevelParams},
    models::location::{Location, LocationType, TreeLocation, UNAUTHORIZED_NAME},
};

#[derive(Clone)]
pub struct LocationReaderService {
    location_repo: LocationRepository,
    location_type_repo: LocationTypeRepository,
}

impl LocationReaderService {
    pub fn new(location_repo: LocationRepository, location_type_repo: LocationTypeRepository) -> Self {
        Self { location_repo, location_type_repo }
    }

    /// Lista plana para o chamador autorizado, completada com os ancestrais
    /// "UnAuthorized" que os access paths implicam.
    ///
    /// Este caminho conhece a taxonomia inteira, então usa o sintetizador
    /// por nível.
    pub async fn list_locations(
        &self,
        granted_location_ids: &[String],
        include_archived: bool,
    ) -> Result<Vec<Location>, AppError> {
        let filter = LocationFilter {
            granted_location_ids: granted_location_ids.to_vec(),
            include_archived,
        };
        let locations = self.location_repo.retrieve_locations(&filter).await?;
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        let location_types = self.location_type_repo.get_all_location_types().await?;
        generate_unauthorized_locations(&locations, &location_types)
    }

    /// A árvore completa do chamador: lista autorizada, ancestrais
    /// sintetizados pelo caminho e montagem com ordenação determinística.
    ///
    /// Aqui só buscamos os tipos que o conjunto autorizado referencia, por
    /// isso o sintetizador por caminho (que dispensa a cadeia completa).
    pub async fn get_location_tree(
        &self,
        user_id: &str,
        granted_location_ids: &[String],
    ) -> Result<TreeLocation, AppError> {
        let filter = LocationFilter {
            granted_location_ids: granted_location_ids.to_vec(),
            include_archived: true,
        };
        let locations = self.location_repo.retrieve_locations(&filter).await?;
        if locations.is_empty() {
            return Err(AppError::InternalServerError(anyhow!(
                "user {user_id} does not have access to any location"
            )));
        }

        let mut type_ids: Vec<String> = locations
            .iter()
            .map(|l| l.location_type.clone())
            .filter(|id| !id.is_empty())
            .collect();
        type_ids.sort();
        type_ids.dedup();
        let location_types = self.location_type_repo.get_location_types_by_ids(&type_ids).await?;

        let expanded = build_unauthorized_ancestors(&locations)?;

        // O nível mais profundo é o do conjunto ATUAL, não o do esquema
        // global: uma árvore filtrada ainda marca as próprias folhas.
        let lowest_level = location_types.iter().map(|t| t.level).max().unwrap_or(0);
        let types_by_id: HashMap<String, LocationType> = location_types
            .into_iter()
            .map(|t| (t.location_type_id.clone(), t))
            .collect();

        build_location_tree(&expanded, &types_by_id, lowest_level)
    }

    /// Busca paginada restrita ao nível mais profundo da taxonomia.
    pub async fn retrieve_lowest_level_locations(
        &self,
        params: &LowestLevelParams,
    ) -> Result<Vec<Location>, AppError> {
        self.location_repo.get_lowest_level_locations(params).await
    }
}

fn data_inconsistency(message: &'static str) -> AppError {
    AppError::InternalServerError(anyhow!(message))
}

// Um ancestral que o chamador não pode ver diretamente, mas cuja existência
// o access path de um descendente implica.
fn unauthorized_placeholder(
    location_id: &str,
    location_type: &str,
    parent_location_id: &str,
    access_path: String,
) -> Location {
    Location {
        location_id: location_id.to_string(),
        partner_internal_id: String::new(),
        name: UNAUTHORIZED_NAME.to_string(),
        location_type: location_type.to_string(),
        parent_location_id: parent_location_id.to_string(),
        partner_internal_parent_id: String::new(),
        access_path,
        is_archived: false,
        is_unauthorized: true,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

// ---
// 1. Sintetizador por caminho (O(n log n))
// ---

/// Expande a lista autorizada no menor conjunto que contém a cadeia
/// completa de ancestrais de cada nó, compartilhando ancestrais comuns.
///
/// Um nó cujo id não aparece no próprio access path denuncia um snapshot
/// corrompido: erro interno, nunca de usuário.
pub fn build_unauthorized_ancestors(authorized: &[Location]) -> Result<Vec<Location>, AppError> {
    let mut visited: HashMap<String, Location> = HashMap::new();

    for location in authorized {
        // O nó autorizado sempre vence um placeholder sintetizado antes por
        // outro ramo.
        visited.insert(location.location_id.clone(), location.clone());

        let mut current = location.clone();
        loop {
            let segments: Vec<&str> = current.access_path.split('/').collect();
            if segments.len() <= 1 {
                break; // raiz alcançada
            }
            let index = segments
                .iter()
                .position(|s| *s == current.location_id)
                .ok_or_else(|| data_inconsistency("could not find id in access path"))?;
            if index == 0 {
                break;
            }

            let parent_id = segments[index - 1];
            if visited.contains_key(parent_id) {
                break; // outro ramo já alcançou este ancestral
            }

            let parent_path = segments[..index].join("/");
            let grandparent_id = if index >= 2 { segments[index - 2] } else { "" };
            let parent = unauthorized_placeholder(parent_id, "", grandparent_id, parent_path);
            visited.insert(parent.location_id.clone(), parent.clone());
            current = parent;
        }
    }

    Ok(visited.into_values().collect())
}

// ---
// 2. Sintetizador por nível
// ---

/// Ordena os tipos numa cadeia estrita pai → filho. Qualquer coisa que não
/// forme uma cadeia única (duas raízes, dois filhos do mesmo pai, tipo
/// inalcançável) é um erro duro.
pub fn sort_location_types(location_types: &[LocationType]) -> Result<Vec<LocationType>, AppError> {
    let mut child_of: HashMap<&str, &LocationType> = HashMap::new();
    for location_type in location_types {
        let previous = child_of.insert(location_type.parent_location_type_id.as_str(), location_type);
        if previous.is_some() {
            return Err(data_inconsistency("wrong location_type"));
        }
    }

    let mut chain: Vec<LocationType> = Vec::with_capacity(location_types.len());
    let mut parent_id = "";
    while let Some(location_type) = child_of.get(parent_id).copied() {
        chain.push(location_type.clone());
        parent_id = location_type.location_type_id.as_str();
        if chain.len() > location_types.len() {
            return Err(data_inconsistency("wrong location_type"));
        }
    }
    if chain.len() != location_types.len() {
        return Err(data_inconsistency("wrong location_type"));
    }

    Ok(chain)
}

/// Versão por nível da síntese de ancestrais: agrupa os nós autorizados por
/// profundidade do access path e, do nível mais fundo para cima, cria o
/// placeholder de cada pai ausente no balde do nível acima.
///
/// O pai é derivado do ACCESS PATH, não do campo parent_location_id; nós
/// autorizados passam intocados mesmo quando os dois discordam.
pub fn generate_unauthorized_locations(
    authorized: &[Location],
    location_types: &[LocationType],
) -> Result<Vec<Location>, AppError> {
    let chain = sort_location_types(location_types)?;
    if authorized.is_empty() {
        return Ok(Vec::new());
    }

    let mut levels: Vec<HashMap<String, Location>> = vec![HashMap::new(); chain.len()];
    for location in authorized {
        let depth = location.depth();
        if depth >= levels.len() {
            return Err(data_inconsistency("wrong location_type"));
        }
        levels[depth].insert(location.location_id.clone(), location.clone());
    }

    // Semeia a raiz quando nenhum nó autorizado ocupa o nível 0.
    if levels[0].is_empty() {
        let root_id = authorized[0]
            .path_segments()
            .first()
            .map(|s| s.to_string())
            .ok_or_else(|| data_inconsistency("could not find id in access path"))?;
        let root = unauthorized_placeholder(&root_id, &chain[0].location_type_id, "", root_id.clone());
        levels[0].insert(root_id, root);
    }

    // De baixo para cima: placeholders entram no balde do nível acima para
    // que as passagens seguintes os enxerguem.
    for depth in (1..levels.len()).rev() {
        let (lower, upper) = levels.split_at_mut(depth);
        let parent_bucket = &mut lower[depth - 1];

        for node in upper[0].values() {
            let segments: Vec<&str> = node.access_path.split('/').collect();
            let parent_id = segments[depth - 1];
            if parent_bucket.contains_key(parent_id) {
                continue;
            }
            let parent_path = segments[..depth].join("/");
            let grandparent_id = if depth >= 2 { segments[depth - 2] } else { "" };
            let parent = unauthorized_placeholder(
                parent_id,
                &chain[depth - 1].location_type_id,
                grandparent_id,
                parent_path,
            );
            parent_bucket.insert(parent.location_id.clone(), parent);
        }
    }

    Ok(levels.into_iter().flat_map(HashMap::into_values).collect())
}

// ---
// 3. Montagem da árvore
// ---

/// Monta a lista plana (já completa de ancestrais) numa árvore única.
///
/// A ordenação dos irmãos por (updated_at, created_at) é contrato público
/// de exibição; nunca dependemos da ordem de iteração de mapa.
pub fn build_location_tree(
    locations: &[Location],
    types_by_id: &HashMap<String, LocationType>,
    lowest_level: i32,
) -> Result<TreeLocation, AppError> {
    let root = locations
        .iter()
        .find(|l| l.is_root())
        .ok_or_else(|| data_inconsistency("could not find root location"))?;

    let mut children_index: HashMap<String, Vec<Location>> = HashMap::new();
    for location in locations {
        if location.is_root() {
            continue;
        }
        children_index
            .entry(location.parent_location_id.clone())
            .or_default()
            .push(location.clone());
    }

    let mut tree = to_tree_node(root, types_by_id, lowest_level);
    attach_children(&mut tree, &mut children_index, types_by_id, lowest_level);
    Ok(tree)
}

fn to_tree_node(
    location: &Location,
    types_by_id: &HashMap<String, LocationType>,
    lowest_level: i32,
) -> TreeLocation {
    let is_lowest_level = types_by_id
        .get(&location.location_type)
        .is_some_and(|t| t.level == lowest_level);
    TreeLocation::from_location(location, is_lowest_level)
}

fn attach_children(
    node: &mut TreeLocation,
    children_index: &mut HashMap<String, Vec<Location>>,
    types_by_id: &HashMap<String, LocationType>,
    lowest_level: i32,
) {
    let mut children = children_index.remove(&node.location_id).unwrap_or_default();
    children.sort_by_key(|l| (l.updated_at, l.created_at));

    node.children = children
        .iter()
        .map(|l| to_tree_node(l, types_by_id, lowest_level))
        .collect();
    for child in &mut node.children {
        attach_children(child, children_index, types_by_id, lowest_level);
    }
}
