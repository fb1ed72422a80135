//! Cadastro de contas de clínicas e de administradores
//!
//! O tipo de cadastro define o papel gravado na conta: clínicas sempre como
//! `user`, administradores sempre como `admin`, independentemente do formulário.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PortalError, PortalResult};
use crate::models::{new_id, Client, ClientStatus, UserRole};
use crate::policy::{Action, Resource};
use crate::session::Session;
use crate::store::{DataService, DeletedClient};

/// Tela de cadastro em uso
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Client,
    Admin,
}

impl AccountKind {
    pub fn role(self) -> UserRole {
        match self {
            AccountKind::Client => UserRole::User,
            AccountKind::Admin => UserRole::Admin,
        }
    }

    pub fn resource(self) -> Resource {
        match self {
            AccountKind::Client => Resource::ClientAccounts,
            AccountKind::Admin => Resource::AdminAccounts,
        }
    }
}

/// Campos editáveis do formulário de conta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountForm {
    pub clinic_name: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub status: ClientStatus,
    #[serde(default)]
    pub business_number: Option<String>,
    #[serde(default)]
    pub representative: Option<String>,
}

impl AccountForm {
    /// Nome da clínica, nome do responsável e e-mail são obrigatórios
    pub fn validate(&self) -> PortalResult<()> {
        let missing: Vec<&str> = [
            ("clinicName", &self.clinic_name),
            ("name", &self.name),
            ("email", &self.email),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PortalError::Validation(format!(
                "Campos obrigatórios vazios: {}",
                missing.join(", ")
            )))
        }
    }

    fn apply_to(self, client: &mut Client, kind: AccountKind) {
        client.clinic_name = self.clinic_name;
        client.name = self.name;
        client.email = self.email;
        client.phone = self.phone;
        client.status = self.status;
        client.business_number = self.business_number;
        client.representative = self.representative;
        client.role = kind.role();
    }
}

/// Cria uma conta nova do tipo informado
pub fn register_account(
    session: &Session,
    db: &mut DataService,
    kind: AccountKind,
    form: AccountForm,
) -> PortalResult<Client> {
    session
        .policy()
        .authorize(session.user(), kind.resource(), Action::Create, None)?;
    form.validate()?;

    let mut client = Client::new(new_id("u"), "", "", "", kind.role());
    form.apply_to(&mut client, kind);

    info!("{} cadastrou a conta {}", session.user().id, client.id);
    Ok(db.add_client(client))
}

/// Atualiza uma conta existente com os dados do formulário
pub fn edit_account(
    session: &Session,
    db: &mut DataService,
    kind: AccountKind,
    id: &str,
    form: AccountForm,
) -> PortalResult<Client> {
    session
        .policy()
        .authorize(session.user(), kind.resource(), Action::Edit, None)?;
    form.validate()?;

    // só contas do tipo informado
    let mut client = db
        .client(id)
        .filter(|c| c.role == kind.role())
        .cloned()
        .ok_or_else(|| PortalError::not_found("conta", id))?;
    form.apply_to(&mut client, kind);
    db.update_client(client)
}

/// Remove a conta e tudo o que pertence a ela
pub fn remove_account(
    session: &Session,
    db: &mut DataService,
    kind: AccountKind,
    id: &str,
) -> PortalResult<DeletedClient> {
    session
        .policy()
        .authorize(session.user(), kind.resource(), Action::Delete, None)?;

    if db.client(id).map(|c| c.role) != Some(kind.role()) {
        return Err(PortalError::not_found("conta", id));
    }
    db.delete_client(id)
}

/// Contas do tipo cujo nome ou nome da clínica contém o termo
pub fn search_accounts(db: &DataService, kind: AccountKind, term: &str) -> Vec<Client> {
    let term = term.to_lowercase();
    db.clients()
        .into_iter()
        .filter(|c| c.role == kind.role())
        .filter(|c| {
            c.name.to_lowercase().contains(&term) || c.clinic_name.to_lowercase().contains(&term)
        })
        .collect()
}
