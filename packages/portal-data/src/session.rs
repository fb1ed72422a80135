//! Sessão de um usuário logado
//!
//! A sessão guarda o usuário, a clínica em contexto e a política de acesso.
//! Cada operação autoriza a ação antes de delegar ao `DataService`.

use std::fmt;

use tracing::{info, warn};

use crate::dashboard::DashboardView;
use crate::error::{PortalError, PortalResult};
use crate::models::{
    new_id, today, ClinicFile, ClinicSettings, FileCategory, Metric, Month, Payment,
    PaymentStatus, Report, ReportStatus, ReportType, Task, TaskStatus, User, UserRole,
};
use crate::notify::NotificationChannel;
use crate::policy::{AccessPolicy, AccessReason, Action, Resource};
use crate::store::DataService;
use crate::PortalConfig;

/// Responsável exibido em pedidos recém-criados
pub const UNASSIGNED: &str = "미정";

/// Credencial de login associada a um usuário
#[derive(Clone)]
pub struct LoginEntry {
    pub login: String,
    pub password: String,
    pub user: User,
}

impl fmt::Debug for LoginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginEntry")
            .field("login", &self.login)
            .field("password", &"***")
            .field("user", &self.user.id)
            .finish()
    }
}

/// Tabela de credenciais fornecida pela aplicação
#[derive(Debug, Clone, Default)]
pub struct LoginTable {
    entries: Vec<LoginEntry>,
}

impl LoginTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, login: impl Into<String>, password: impl Into<String>, user: User) -> Self {
        self.entries.push(LoginEntry {
            login: login.into(),
            password: password.into(),
            user,
        });
        self
    }

    /// Retorna o usuário cujo login e senha conferem
    pub fn authenticate(&self, login: &str, password: &str) -> PortalResult<User> {
        let login = login.trim();
        match self
            .entries
            .iter()
            .find(|e| e.login == login && e.password == password)
        {
            Some(entry) => {
                info!("Login de {} ({})", entry.user.id, entry.user.role);
                Ok(entry.user.clone())
            }
            None => {
                warn!("Falha de login para {}", login);
                Err(PortalError::InvalidCredentials)
            }
        }
    }
}

/// Dados de um novo relatório informados pelo administrador
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDraft {
    pub title: String,
    pub report_type: ReportType,
    pub month: Month,
    pub document_url: String,
    pub summary: Option<String>,
}

/// Dados de um arquivo enviado; a categoria vem do nome
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub file_type: String,
    pub size: String,
    pub url: String,
}

/// Usuário logado e a clínica em contexto
#[derive(Debug, Clone)]
pub struct Session {
    user: User,
    selected_client_id: String,
    policy: AccessPolicy,
    admin_recipient: String,
}

impl Session {
    /// Abre a sessão. Usuários ficam presos à própria clínica; administradores
    /// começam pela clínica mais recente cadastrada, se houver.
    pub fn start(user: User, config: &PortalConfig, db: &DataService) -> Self {
        let selected_client_id = match user.role {
            UserRole::User => user.id.clone(),
            UserRole::Admin => db
                .clients()
                .into_iter()
                .find(|c| c.role == UserRole::User)
                .map(|c| c.id)
                .unwrap_or_default(),
        };

        Self {
            user,
            selected_client_id,
            policy: AccessPolicy::new(config.master_admin_email.clone()),
            admin_recipient: config.admin_notification_recipient.clone(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn selected_client_id(&self) -> &str {
        &self.selected_client_id
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn is_master_admin(&self) -> bool {
        self.policy.is_master_admin(&self.user)
    }

    /// Troca a clínica em contexto (somente administradores)
    pub fn select_client(&mut self, db: &DataService, client_id: &str) -> PortalResult<()> {
        if !self.policy.can_select_client(&self.user) {
            return Err(PortalError::Forbidden(format!(
                "{} não pode trocar de clínica",
                self.user.id
            )));
        }
        if db.client(client_id).is_none() {
            return Err(PortalError::not_found("conta", client_id));
        }
        self.selected_client_id = client_id.to_string();
        Ok(())
    }

    /// Autoriza a ação sobre a clínica em contexto
    pub fn authorize(&self, resource: Resource, action: Action) -> PortalResult<AccessReason> {
        self.authorize_for(resource, action, &self.selected_client_id)
    }

    fn authorize_for(&self, resource: Resource, action: Action, client_id: &str) -> PortalResult<AccessReason> {
        self.policy
            .authorize(&self.user, resource, action, Some(client_id))
    }

    /// Clínica em contexto, desde que ainda exista no repositório.
    /// Toda gravação passa por aqui; contexto vazio ou removido é `NotFound`.
    fn context_client(&self, db: &DataService) -> PortalResult<String> {
        existing_client(db, &self.selected_client_id)
    }

    // --- Painel ---

    /// Métricas e quadro de tarefas da clínica em contexto
    pub fn dashboard(&self, db: &DataService) -> PortalResult<DashboardView> {
        self.authorize(Resource::Dashboard, Action::View)?;
        Ok(DashboardView::build(
            &db.metrics(&self.selected_client_id),
            &db.tasks(&self.selected_client_id),
        ))
    }

    // --- Tarefas ---

    pub fn tasks(&self, db: &DataService) -> PortalResult<Vec<Task>> {
        self.authorize(Resource::Tasks, Action::View)?;
        Ok(db.tasks(&self.selected_client_id))
    }

    /// Pedido rápido de tarefa: avisa o administrador e cria a tarefa não
    /// iniciada com progresso zero
    pub fn request_task(&self, db: &mut DataService, title: &str) -> PortalResult<Task> {
        self.authorize(Resource::Tasks, Action::Request)?;
        let client_id = self.context_client(db)?;

        let title = title.trim();
        if title.is_empty() {
            return Err(PortalError::Validation("O pedido precisa de um título".to_string()));
        }

        db.send_notification(
            NotificationChannel::Kakao,
            &self.admin_recipient,
            &format!("New Task from {}: {}", client_id, title),
        );

        let mut task = Task::new(
            new_id("t"),
            client_id,
            title,
            self.user.name.clone(),
        );
        task.description = Some(String::new());
        task.progress = Some(0);
        task.assignee = Some(UNASSIGNED.to_string());

        Ok(db.add_task(task))
    }

    /// Muda o status de uma tarefa (arrastar entre colunas)
    pub fn move_task(&self, db: &mut DataService, task_id: &str, status: TaskStatus) -> PortalResult<Task> {
        let mut task = db
            .task(task_id)
            .cloned()
            .ok_or_else(|| PortalError::not_found("tarefa", task_id))?;
        self.authorize_for(Resource::Tasks, Action::Edit, &task.client_id)?;

        task.status = status;
        let task = db.update_task(task)?;
        if status == TaskStatus::InProgress {
            info!("[ALIMTALK] Tarefa '{}' passou para {}", task.title, status);
        }
        Ok(task)
    }

    /// Grava a tarefa editada no modal
    pub fn save_task(&self, db: &mut DataService, task: Task) -> PortalResult<Task> {
        let owner = db
            .task(&task.id)
            .map(|t| t.client_id.clone())
            .ok_or_else(|| PortalError::not_found("tarefa", &task.id))?;
        self.authorize_for(Resource::Tasks, Action::Edit, &owner)?;
        self.authorize_for(Resource::Tasks, Action::Edit, &task.client_id)?;
        existing_client(db, &task.client_id)?;
        db.update_task(task)
    }

    pub fn remove_task(&self, db: &mut DataService, task_id: &str) -> PortalResult<Task> {
        let owner = db
            .task(task_id)
            .map(|t| t.client_id.clone())
            .ok_or_else(|| PortalError::not_found("tarefa", task_id))?;
        self.authorize_for(Resource::Tasks, Action::Delete, &owner)?;
        db.delete_task(task_id)
    }

    // --- Métricas ---

    pub fn metrics(&self, db: &DataService) -> PortalResult<Vec<Metric>> {
        self.authorize(Resource::Metrics, Action::View)?;
        Ok(db.metrics(&self.selected_client_id))
    }

    /// Métrica gravada para o mês, ou uma zerada para preencher o formulário
    pub fn metric_draft(&self, db: &DataService, month: Month) -> PortalResult<Metric> {
        Ok(self
            .metrics(db)?
            .into_iter()
            .find(|m| m.month == month)
            .unwrap_or_else(|| Metric::empty(month)))
    }

    pub fn save_metric(&self, db: &mut DataService, metric: Metric) -> PortalResult<Vec<Metric>> {
        self.authorize(Resource::Metrics, Action::Edit)?;
        let client_id = self.context_client(db)?;
        Ok(db.update_metric(&client_id, metric))
    }

    // --- Relatórios ---

    pub fn reports(&self, db: &DataService) -> PortalResult<Vec<Report>> {
        self.authorize(Resource::Reports, Action::View)?;
        Ok(db.reports(&self.selected_client_id))
    }

    /// Relatórios publicados para o mês
    pub fn reports_for_month(&self, db: &DataService, month: Month) -> PortalResult<Vec<Report>> {
        Ok(self
            .reports(db)?
            .into_iter()
            .filter(|r| r.month == month)
            .collect())
    }

    pub fn publish_report(&self, db: &mut DataService, draft: ReportDraft) -> PortalResult<Report> {
        self.authorize(Resource::Reports, Action::Create)?;
        let client_id = self.context_client(db)?;

        if draft.title.trim().is_empty() || draft.document_url.trim().is_empty() {
            return Err(PortalError::Validation(
                "Título e link do documento são obrigatórios".to_string(),
            ));
        }

        let report = Report {
            id: new_id("r"),
            client_id,
            title: draft.title.trim().to_string(),
            report_type: draft.report_type,
            date: today(),
            month: draft.month,
            document_url: draft.document_url.trim().to_string(),
            status: ReportStatus::Published,
            summary: draft.summary,
        };
        Ok(db.add_report(report))
    }

    pub fn remove_report(&self, db: &mut DataService, report_id: &str) -> PortalResult<Report> {
        let owner = db
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .map(|r| r.client_id.clone())
            .ok_or_else(|| PortalError::not_found("relatório", report_id))?;
        self.authorize_for(Resource::Reports, Action::Delete, &owner)?;
        db.delete_report(report_id)
    }

    // --- Pagamentos ---

    pub fn payments(&self, db: &DataService) -> PortalResult<Vec<Payment>> {
        self.authorize(Resource::Payments, Action::View)?;
        Ok(db.payments(&self.selected_client_id))
    }

    pub fn set_payment_status(
        &self,
        db: &mut DataService,
        payment_id: &str,
        status: PaymentStatus,
    ) -> PortalResult<Payment> {
        let owner = db
            .payments
            .iter()
            .find(|p| p.id == payment_id)
            .map(|p| p.client_id.clone())
            .ok_or_else(|| PortalError::not_found("cobrança", payment_id))?;
        self.authorize_for(Resource::Payments, Action::Edit, &owner)?;
        db.update_payment_status(payment_id, status)
    }

    // --- Arquivos ---

    pub fn files(&self, db: &DataService) -> PortalResult<Vec<ClinicFile>> {
        self.authorize(Resource::Files, Action::View)?;
        Ok(db.files(&self.selected_client_id))
    }

    /// Registra um arquivo na clínica em contexto, classificado pelo nome
    pub fn upload_file(&self, db: &mut DataService, upload: FileUpload) -> PortalResult<ClinicFile> {
        self.authorize(Resource::Files, Action::Create)?;
        let client_id = self.context_client(db)?;

        if upload.name.trim().is_empty() {
            return Err(PortalError::Validation("O arquivo precisa de um nome".to_string()));
        }

        let file = ClinicFile {
            id: new_id("f"),
            client_id,
            category: FileCategory::classify(&upload.name),
            name: upload.name,
            file_type: upload.file_type,
            size: upload.size,
            date: today(),
            url: upload.url,
        };
        Ok(db.add_file(file))
    }

    // --- Configurações ---

    pub fn settings(&self, db: &DataService) -> PortalResult<ClinicSettings> {
        self.authorize(Resource::Settings, Action::View)?;
        Ok(db.settings(&self.selected_client_id))
    }

    /// Grava as configurações da clínica; alterações feitas pela própria
    /// clínica são avisadas ao administrador por e-mail
    pub fn save_settings(&self, db: &mut DataService, settings: ClinicSettings) -> PortalResult<()> {
        self.authorize(Resource::Settings, Action::Edit)?;
        let client_id = self.context_client(db)?;
        db.update_settings(&client_id, settings);

        if self.user.role != UserRole::Admin {
            db.send_notification(
                NotificationChannel::Email,
                &self.admin_recipient,
                &format!("Clinic info updated by {}", self.user.id),
            );
        }
        Ok(())
    }
}

fn existing_client(db: &DataService, client_id: &str) -> PortalResult<String> {
    match db.client(client_id) {
        Some(client) => Ok(client.id.clone()),
        None => Err(PortalError::not_found("conta", client_id)),
    }
}
