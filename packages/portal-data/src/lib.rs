//! Portal Data - Camada de dados compartilhada do portal de clientes
//!
//! Esta biblioteca fornece:
//! - Modelos de dados do portal (clínicas, tarefas, relatórios, métricas...)
//! - Repositório em memória com operações de CRUD por clínica
//! - Política de acesso centralizada (usuário, administrador, administrador master)
//! - Sessão com contexto de clínica e operações autorizadas
//! - Snapshot em JSON com credenciais de terceiros seladas

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

pub mod accounts;
pub mod crypto;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod notify;
pub mod policy;
pub mod session;
pub mod snapshot;
pub mod store;

pub use error::{PortalError, PortalResult};
pub use store::DataService;

/// Configuração do portal
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// E-mail que identifica o administrador master
    pub master_admin_email: String,
    /// Destinatário das notificações enviadas à agência
    pub admin_notification_recipient: String,
    /// Arquivo de snapshot; `None` mantém os dados apenas em memória
    pub snapshot_path: Option<PathBuf>,
    /// Sela as credenciais de terceiros ao gravar, quando houver chave
    pub seal_credentials: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            master_admin_email: policy::DEFAULT_MASTER_ADMIN_EMAIL.to_string(),
            admin_notification_recipient: "admin".to_string(),
            snapshot_path: None,
            seal_credentials: true,
        }
    }
}

/// Cria o repositório do portal, carregando o snapshot configurado se existir
pub fn init_portal(config: &PortalConfig, key: Option<&crypto::EncryptionKey>) -> Result<DataService> {
    let mut db = DataService::new();

    match &config.snapshot_path {
        Some(path) if path.exists() => {
            let snapshot = snapshot::load_snapshot(path, key)
                .context("Falha ao carregar o snapshot do portal")?;
            db.restore(snapshot)
                .context("Falha ao restaurar o snapshot do portal")?;
            info!("Portal inicializado a partir de {}: {:?}", path.display(), db);
        }
        Some(path) => {
            info!("Snapshot {} ainda não existe, iniciando vazio", path.display());
        }
        None => {
            info!("Portal inicializado em memória");
        }
    }

    Ok(db)
}

/// Grava o repositório no snapshot configurado; sem caminho, não faz nada
pub fn persist_portal(
    db: &DataService,
    config: &PortalConfig,
    key: Option<&crypto::EncryptionKey>,
) -> Result<()> {
    let Some(path) = &config.snapshot_path else {
        return Ok(());
    };
    let key = if config.seal_credentials { key } else { None };
    snapshot::save_snapshot(db, path, key).context("Falha ao persistir o portal")
}
