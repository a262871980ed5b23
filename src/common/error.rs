use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

// ---
// 1. Erro de linha (CSV)
// ---
// Cada linha ofensora carrega o seu número 1-based (o cabeçalho é a linha 1,
// então os dados começam na linha 2). A primeira regra violada numa linha
// vence; regras em linhas diferentes são todas avaliadas.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_number: usize,
    pub description: String,
}

impl RowError {
    pub fn new(row_number: usize, description: impl Into<String>) -> Self {
        Self { row_number, description: description.into() }
    }
}

// ---
// 2. Erros de negócio (abortam o lote inteiro)
// ---
// Cada código mapeia para uma chave de mensagem localizável fixa; o cliente
// resolve a tradução.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportRuleViolation {
    MustImportAllExistData,
    CanNotUpdateLowestType,
    LevelAlreadyExisted,
    LevelSwapped,
}

impl ImportRuleViolation {
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::MustImportAllExistData => "resources.masters.message.mustImportAllExistData",
            Self::CanNotUpdateLowestType => "resources.masters.message.canNotUpdateLowestType",
            Self::LevelAlreadyExisted => "resources.masters.message.levelAlreadyExisted",
            Self::LevelSwapped => "resources.masters.message.levelSwapped",
        }
    }
}

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("no data in csv file")]
    EmptyCsv,

    // Cabeçalho errado, contagem de colunas errada etc. A mensagem já vem
    // pronta do parser.
    #[error("{0}")]
    InvalidCsvFormat(String),

    // Erros de linha agregados: nunca paramos na primeira linha inválida,
    // o chamador recebe o relatório completo.
    #[error("data is not valid, please check")]
    RowErrors(Vec<RowError>),

    #[error("{}", .0.message_key())]
    ImportRule(ImportRuleViolation),

    #[error("location type não encontrado")]
    LocationTypeNotFound,

    #[error("name {0} already exists")]
    DuplicateLocationTypeName(String),

    #[error("level must be in sequential order")]
    NonSequentialLevel,

    #[error("Token inválido")]
    InvalidToken,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // Falhas de consistência de dados dos sintetizadores (ex.: id ausente do
    // próprio access path) chegam por aqui: são erros internos, não de
    // usuário.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // O relatório completo por linha, no mesmo formato em que os
            // validadores o acumularam.
            AppError::RowErrors(rows) => {
                let body = Json(json!({
                    "error": "data is not valid, please check",
                    "details": rows,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::EmptyCsv => {
                return bad_request("no data in csv file");
            }
            AppError::InvalidCsvFormat(message) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
            }
            AppError::ImportRule(violation) => {
                return bad_request(violation.message_key());
            }
            AppError::DuplicateLocationTypeName(name) => {
                let body = Json(json!({ "error": format!("name {name} already exists") }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::NonSequentialLevel => {
                return bad_request("level must be in sequential order");
            }

            AppError::LocationTypeNotFound => (StatusCode::NOT_FOUND, "Location type não encontrado."),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "Token de autenticação inválido ou ausente."),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` vai logar a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
