//! Snapshot do repositório em JSON
//!
//! Permite gravar e recarregar o estado do `DataService` entre execuções.
//! Com uma chave, a senha do Naver de cada clínica é removida das
//! configurações e gravada selada em `sealedCredentials`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::crypto::{open_str, seal_str, EncryptionKey, SealedSecret};
use crate::error::{PortalError, PortalResult};
use crate::models::{Client, ClinicFile, ClinicSettings, Metric, Month, Payment, Report, Task};
use crate::store::DataService;

/// Versão atual do formato do snapshot
pub const SNAPSHOT_VERSION: u32 = 1;

/// Estado completo do repositório
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Vec<Metric>>,
    #[serde(default)]
    pub settings: BTreeMap<String, ClinicSettings>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub files: Vec<ClinicFile>,
    /// Senhas seladas por id de clínica
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sealed_credentials: BTreeMap<String, SealedSecret>,
}

impl Snapshot {
    /// Move cada `naver_pw` não vazio para `sealed_credentials`.
    /// Retorna quantas credenciais foram seladas.
    pub fn seal_credentials(&mut self, key: &EncryptionKey) -> PortalResult<usize> {
        let mut sealed = 0;
        for (client_id, settings) in self.settings.iter_mut() {
            if settings.naver_pw.is_empty() {
                continue;
            }
            let secret = seal_str(&settings.naver_pw, key)?;
            self.sealed_credentials.insert(client_id.clone(), secret);
            settings.naver_pw.clear();
            sealed += 1;
        }
        Ok(sealed)
    }

    /// Devolve as credenciais seladas às configurações de cada clínica
    pub fn open_credentials(&mut self, key: &EncryptionKey) -> PortalResult<usize> {
        let mut opened = BTreeMap::new();
        for (client_id, secret) in &self.sealed_credentials {
            opened.insert(client_id.clone(), open_str(secret, key)?);
        }

        let count = opened.len();
        for (client_id, password) in opened {
            self.settings
                .entry(client_id.clone())
                .or_insert_with(|| ClinicSettings::empty(client_id))
                .naver_pw = password;
        }
        self.sealed_credentials.clear();
        Ok(count)
    }
}

impl DataService {
    /// Cópia de todas as coleções
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            clients: self.clients.clone(),
            tasks: self.tasks.clone(),
            reports: self.reports.clone(),
            metrics: self.metrics.clone(),
            settings: self.settings.clone(),
            payments: self.payments.clone(),
            files: self.files.clone(),
            sealed_credentials: BTreeMap::new(),
        }
    }

    /// Substitui todas as coleções pelas do snapshot. O notificador é mantido.
    pub fn restore(&mut self, snapshot: Snapshot) -> PortalResult<()> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(PortalError::Snapshot(format!(
                "Versão {} não suportada (máxima {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        if !snapshot.sealed_credentials.is_empty() {
            return Err(PortalError::Snapshot(
                "Snapshot ainda contém credenciais seladas".to_string(),
            ));
        }

        // um registro por mês, o último gravado prevalece
        let metrics: BTreeMap<String, Vec<Metric>> = snapshot
            .metrics
            .into_iter()
            .map(|(client_id, series)| {
                let by_month: BTreeMap<Month, Metric> =
                    series.into_iter().map(|m| (m.month, m)).collect();
                (client_id, by_month.into_values().collect::<Vec<_>>())
            })
            .collect();

        self.clients = snapshot.clients;
        self.tasks = snapshot.tasks;
        self.reports = snapshot.reports;
        self.metrics = metrics;
        self.settings = snapshot.settings;
        self.payments = snapshot.payments;
        self.files = snapshot.files;
        Ok(())
    }
}

/// Grava o snapshot do repositório em `path`, selando credenciais se houver chave
pub fn save_snapshot(db: &DataService, path: &Path, key: Option<&EncryptionKey>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .context("Falha ao criar diretório para o snapshot")?;
        }
    }

    let mut snapshot = db.snapshot();
    if let Some(key) = key {
        let sealed = snapshot.seal_credentials(key)?;
        info!("{} credenciais seladas", sealed);
    }

    let json = serde_json::to_string_pretty(&snapshot)
        .context("Falha ao serializar o snapshot")?;

    // grava ao lado e renomeia para não deixar arquivo pela metade
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, json)
        .with_context(|| format!("Falha ao gravar {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Falha ao mover snapshot para {}", path.display()))?;

    info!("Snapshot gravado em {}", path.display());
    Ok(())
}

/// Lê um snapshot gravado por `save_snapshot`, abrindo credenciais seladas
pub fn load_snapshot(path: &Path, key: Option<&EncryptionKey>) -> Result<Snapshot> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Falha ao ler {}", path.display()))?;
    let mut snapshot: Snapshot = serde_json::from_str(&json)
        .with_context(|| format!("Snapshot inválido em {}", path.display()))?;

    if snapshot.version > SNAPSHOT_VERSION {
        bail!(
            "Snapshot {} usa a versão {}, esta biblioteca lê até a {}",
            path.display(),
            snapshot.version,
            SNAPSHOT_VERSION
        );
    }

    if !snapshot.sealed_credentials.is_empty() {
        match key {
            Some(key) => {
                let opened = snapshot
                    .open_credentials(key)
                    .context("Falha ao abrir credenciais seladas")?;
                info!("{} credenciais abertas", opened);
            }
            None => {
                warn!("Snapshot {} tem credenciais seladas e nenhuma chave", path.display());
                bail!("Snapshot contém credenciais seladas, mas nenhuma chave foi informada");
            }
        }
    }

    Ok(snapshot)
}
