// src/models/location.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// Nome reservado do tipo raiz. Ele nunca entra por importação:
// o seed das migrações cria o tipo "org" (nível 0) e a localização raiz.
pub const ORG_TYPE_NAME: &str = "org";

// Nome exibido para os ancestrais sintetizados que o chamador
// não está autorizado a ver diretamente.
pub const UNAUTHORIZED_NAME: &str = "UnAuthorized";

// ---
// 1. LocationType (O "Nível" da hierarquia: org, brand, area, center, place)
// ---
// Os níveis válidos formam uma sequência contígua começando no nível 0
// (reservado ao tipo raiz "org"); nenhum par de tipos divide nível ou nome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationType {
    pub location_type_id: String,
    pub name: String,
    pub display_name: String,
    pub level: i32,
    // Vazio ("") no tipo raiz. Mantemos String em vez de Option porque os
    // algoritmos de ordenação/síntese tratam "" como "sem pai".
    pub parent_location_type_id: String,
    pub parent_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocationType {
    /// O sentinela do tipo raiz, usado nas comparações de regra de negócio
    /// no lugar de comparações soltas de string contra "org".
    pub fn org_sentinel() -> Self {
        Self {
            location_type_id: String::new(),
            name: ORG_TYPE_NAME.to_string(),
            display_name: ORG_TYPE_NAME.to_string(),
            level: 0,
            parent_location_type_id: String::new(),
            parent_name: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_org(&self) -> bool {
        self.level == 0
    }
}

// ---
// 2. Location (O nó da hierarquia)
// ---
// Invariantes: `access_path` é a cadeia de location_ids da raiz até o nó
// (inclusive), unida por "/"; `parent_location_id` é o segmento
// imediatamente anterior ao id do nó; a raiz tem caminho de 1 segmento.
// A profundidade (segmentos do caminho) é sempre `nível do tipo + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub location_id: String,
    pub partner_internal_id: String,
    pub name: String,
    // Id do LocationType (durante a importação carrega o NOME do tipo até a
    // resolução final).
    pub location_type: String,
    pub parent_location_id: String,
    pub partner_internal_parent_id: String,
    pub access_path: String,
    pub is_archived: bool,
    // Derivado por requisição, nunca persistido.
    #[sqlx(default)]
    pub is_unauthorized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Segmentos do access path, da raiz até o nó.
    pub fn path_segments(&self) -> Vec<&str> {
        self.access_path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Profundidade do nó na árvore (raiz = 0).
    pub fn depth(&self) -> usize {
        self.path_segments().len().saturating_sub(1)
    }

    pub fn is_root(&self) -> bool {
        !self.access_path.is_empty() && !self.access_path.contains('/')
    }
}

// ---
// 3. TreeLocation (A projeção em árvore, montada por requisição)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeLocation {
    pub location_id: String,
    pub name: String,
    pub parent_location_id: String,
    pub location_type: String,
    pub is_archived: bool,
    pub access_path: String,
    pub is_unauthorized: bool,
    // true sse o nível do tipo deste nó é o mais profundo entre os tipos
    // referenciados pelo conjunto ATUAL de nós (não pelo esquema global).
    pub is_lowest_level: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub children: Vec<TreeLocation>,
}

impl TreeLocation {
    pub fn from_location(location: &Location, is_lowest_level: bool) -> Self {
        Self {
            location_id: location.location_id.clone(),
            name: location.name.clone(),
            parent_location_id: location.parent_location_id.clone(),
            location_type: location.location_type.clone(),
            is_archived: location.is_archived,
            access_path: location.access_path.clone(),
            is_unauthorized: location.is_unauthorized,
            is_lowest_level,
            created_at: location.created_at,
            updated_at: location.updated_at,
            children: Vec::new(),
        }
    }
}

// ---
// 4. ImportLog (O registro de auditoria de cada importação)
// ---
// Gravado na mesma transação do upsert.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportLog {
    pub import_log_id: String,
    pub user_id: String,
    pub import_type: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}
