//! Definições de erro para a biblioteca portal-data
//!
//! Este módulo define os tipos de erro usados pela biblioteca

use thiserror::Error;

/// Erros das operações do portal (repositório, política de acesso e sessão)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("Entidade não encontrada: {0}")]
    NotFound(String),

    #[error("Dados inválidos: {0}")]
    Validation(String),

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Valor inválido: {0}")]
    InvalidValue(String),

    #[error("Erro de criptografia: {0}")]
    Crypto(String),

    #[error("Erro de snapshot: {0}")]
    Snapshot(String),
}

impl PortalError {
    pub(crate) fn not_found(kind: &str, id: &str) -> Self {
        PortalError::NotFound(format!("{} '{}'", kind, id))
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(error: serde_json::Error) -> Self {
        PortalError::Snapshot(error.to_string())
    }
}

/// Alias de resultado usado pelas operações que não tocam o sistema de arquivos
pub type PortalResult<T> = std::result::Result<T, PortalError>;
