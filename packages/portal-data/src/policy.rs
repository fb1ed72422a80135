//! Política de acesso do portal
//!
//! Todas as decisões de visibilidade e edição passam por
//! `AccessPolicy::evaluate`, checadas em ordem e negadas por padrão:
//! 1. Contas de administrador → somente o administrador master
//! 2. Contas de clínicas → administradores
//! 3. Recursos de uma clínica → administradores, para qualquer clínica
//! 4. Recursos de uma clínica → o próprio usuário, somente leitura, exceto
//!    pedido de tarefa e edição das configurações
//! 5. Caso contrário → negado

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PortalError, PortalResult};
use crate::models::{User, UserRole};

/// E-mail do administrador master usado quando a configuração não define outro
pub const DEFAULT_MASTER_ADMIN_EMAIL: &str = "kwad@kohwoonc.com";

/// Área do portal sobre a qual se pede acesso
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Dashboard,
    Tasks,
    Metrics,
    Reports,
    Payments,
    Files,
    Settings,
    /// Cadastro de clínicas
    ClientAccounts,
    /// Cadastro de administradores
    AdminAccounts,
}

impl Resource {
    /// Recursos que pertencem ao contexto de uma clínica
    pub fn is_client_scoped(self) -> bool {
        !matches!(self, Resource::ClientAccounts | Resource::AdminAccounts)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Dashboard => "dashboard",
            Resource::Tasks => "tasks",
            Resource::Metrics => "metrics",
            Resource::Reports => "reports",
            Resource::Payments => "payments",
            Resource::Files => "files",
            Resource::Settings => "settings",
            Resource::ClientAccounts => "client_accounts",
            Resource::AdminAccounts => "admin_accounts",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    /// Pedido rápido de tarefa feito pela clínica
    Request,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Request => "request",
        };
        f.write_str(name)
    }
}

/// Regra que decidiu o acesso
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    MasterAdmin,
    Admin,
    /// Usuário agindo sobre a própria clínica
    OwnClient,
    Denied,
}

/// Resultado de uma checagem de acesso
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }
}

/// Entrada do menu lateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItem {
    Dashboard,
    Reports,
    Payments,
    Files,
    Settings,
    Clients,
    Admins,
}

impl MenuItem {
    /// Caminho da rota (`/dashboard`, `/clients`...)
    pub fn id(self) -> &'static str {
        match self {
            MenuItem::Dashboard => "dashboard",
            MenuItem::Reports => "reports",
            MenuItem::Payments => "payments",
            MenuItem::Files => "files",
            MenuItem::Settings => "settings",
            MenuItem::Clients => "clients",
            MenuItem::Admins => "admins",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Dashboard => "대시보드",
            MenuItem::Reports => "보고서",
            MenuItem::Payments => "결제 관리",
            MenuItem::Files => "파일함",
            MenuItem::Settings => "설정",
            MenuItem::Clients => "고객 관리",
            MenuItem::Admins => "관리자 계정 관리",
        }
    }

    /// Recurso exibido pela entrada
    pub fn resource(self) -> Resource {
        match self {
            MenuItem::Dashboard => Resource::Dashboard,
            MenuItem::Reports => Resource::Reports,
            MenuItem::Payments => Resource::Payments,
            MenuItem::Files => Resource::Files,
            MenuItem::Settings => Resource::Settings,
            MenuItem::Clients => Resource::ClientAccounts,
            MenuItem::Admins => Resource::AdminAccounts,
        }
    }
}

const BASE_MENU: [MenuItem; 5] = [
    MenuItem::Dashboard,
    MenuItem::Reports,
    MenuItem::Payments,
    MenuItem::Files,
    MenuItem::Settings,
];

/// Regras de acesso por papel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    master_admin_email: String,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MASTER_ADMIN_EMAIL)
    }
}

impl AccessPolicy {
    pub fn new(master_admin_email: impl Into<String>) -> Self {
        Self {
            master_admin_email: master_admin_email.into(),
        }
    }

    pub fn master_admin_email(&self) -> &str {
        &self.master_admin_email
    }

    /// Administrador identificado pelo e-mail master
    pub fn is_master_admin(&self, user: &User) -> bool {
        user.role == UserRole::Admin
            && user.email.trim().eq_ignore_ascii_case(&self.master_admin_email)
    }

    /// Decide se `user` pode executar `action` sobre `resource`.
    ///
    /// `target_client` é a clínica em contexto; é obrigatório para usuários
    /// comuns em recursos de clínica e ignorado nos cadastros de contas.
    pub fn evaluate(
        &self,
        user: &User,
        resource: Resource,
        action: Action,
        target_client: Option<&str>,
    ) -> AccessDecision {
        match resource {
            Resource::AdminAccounts => {
                if self.is_master_admin(user) {
                    AccessDecision::allow(AccessReason::MasterAdmin)
                } else {
                    AccessDecision::deny()
                }
            }
            Resource::ClientAccounts => {
                if user.role == UserRole::Admin {
                    AccessDecision::allow(AccessReason::Admin)
                } else {
                    AccessDecision::deny()
                }
            }
            _ if user.role == UserRole::Admin => AccessDecision::allow(AccessReason::Admin),
            _ => {
                if target_client != Some(user.id.as_str()) {
                    return AccessDecision::deny();
                }
                let permitted = matches!(
                    (resource, action),
                    (_, Action::View) | (Resource::Tasks, Action::Request) | (Resource::Settings, Action::Edit)
                );
                if permitted {
                    AccessDecision::allow(AccessReason::OwnClient)
                } else {
                    AccessDecision::deny()
                }
            }
        }
    }

    /// Como `evaluate`, mas devolve `PortalError::Forbidden` quando negado
    pub fn authorize(
        &self,
        user: &User,
        resource: Resource,
        action: Action,
        target_client: Option<&str>,
    ) -> PortalResult<AccessReason> {
        let decision = self.evaluate(user, resource, action, target_client);
        if decision.allowed {
            Ok(decision.reason)
        } else {
            Err(PortalError::Forbidden(format!(
                "{} não pode executar '{}' em '{}'",
                user.id, action, resource
            )))
        }
    }

    /// Somente administradores escolhem a clínica em contexto
    pub fn can_select_client(&self, user: &User) -> bool {
        user.role == UserRole::Admin
    }

    /// Entradas do menu lateral visíveis para o usuário
    pub fn navigation(&self, user: &User) -> Vec<MenuItem> {
        let mut items = BASE_MENU.to_vec();
        if user.role == UserRole::Admin {
            items.push(MenuItem::Clients);
            if self.is_master_admin(user) {
                items.push(MenuItem::Admins);
            }
        }
        items
    }

    /// Guarda de rota: a entrada precisa estar no menu do usuário
    pub fn can_open(&self, user: &User, item: MenuItem) -> bool {
        self.navigation(user).contains(&item)
    }
}
