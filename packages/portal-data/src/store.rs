//! Repositório em memória do portal
//!
//! `DataService` guarda todas as coleções do portal em memória. Uma instância
//! é criada pela aplicação (ver `init_portal`) e passada por referência a quem
//! precisa dela; não existe instância global.
//!
//! Atualizações e remoções de ids inexistentes retornam
//! `PortalError::NotFound` e não alteram nenhuma coleção.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::error::{PortalError, PortalResult};
use crate::models::{
    Client, ClinicFile, ClinicSettings, Metric, Payment, PaymentStatus, Report, Task,
};
use crate::notify::{Notification, NotificationChannel, Notifier, TracingNotifier};

/// Registro identificado por um id opaco
trait Keyed {
    fn key(&self) -> &str;
}

macro_rules! keyed {
    ($($ty:ty),+) => {
        $(impl Keyed for $ty {
            fn key(&self) -> &str {
                &self.id
            }
        })+
    };
}

keyed!(Client, Task, Report, Payment, ClinicFile);

/// Substitui o registro com o mesmo id; `false` se não existir
fn replace_by_id<T: Keyed>(items: &mut [T], record: T) -> bool {
    match items.iter_mut().find(|item| item.key() == record.key()) {
        Some(slot) => {
            *slot = record;
            true
        }
        None => false,
    }
}

fn remove_by_id<T: Keyed>(items: &mut Vec<T>, id: &str) -> Option<T> {
    let index = items.iter().position(|item| item.key() == id)?;
    Some(items.remove(index))
}

/// Resumo da remoção em cascata de uma clínica
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedClient {
    pub client: Client,
    pub tasks: usize,
    pub reports: usize,
    pub metrics: usize,
    pub payments: usize,
    pub files: usize,
    /// Indica se havia configurações gravadas
    pub settings: bool,
}

/// Repositório em memória com as coleções do portal
pub struct DataService {
    pub(crate) clients: Vec<Client>,
    pub(crate) tasks: Vec<Task>,
    pub(crate) reports: Vec<Report>,
    pub(crate) metrics: BTreeMap<String, Vec<Metric>>,
    pub(crate) settings: BTreeMap<String, ClinicSettings>,
    pub(crate) payments: Vec<Payment>,
    pub(crate) files: Vec<ClinicFile>,
    notifier: Box<dyn Notifier>,
}

impl fmt::Debug for DataService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataService")
            .field("clients", &self.clients.len())
            .field("tasks", &self.tasks.len())
            .field("reports", &self.reports.len())
            .field("metrics", &self.metrics.len())
            .field("settings", &self.settings.len())
            .field("payments", &self.payments.len())
            .field("files", &self.files.len())
            .finish()
    }
}

impl Default for DataService {
    fn default() -> Self {
        Self::new()
    }
}

impl DataService {
    /// Repositório vazio que notifica via log
    pub fn new() -> Self {
        Self::with_notifier(TracingNotifier)
    }

    /// Repositório vazio com um destino de notificações próprio
    pub fn with_notifier(notifier: impl Notifier + 'static) -> Self {
        Self {
            clients: Vec::new(),
            tasks: Vec::new(),
            reports: Vec::new(),
            metrics: BTreeMap::new(),
            settings: BTreeMap::new(),
            payments: Vec::new(),
            files: Vec::new(),
            notifier: Box::new(notifier),
        }
    }

    // --- Clínicas ---

    /// Cópia de todas as contas, das mais recentes para as mais antigas
    pub fn clients(&self) -> Vec<Client> {
        self.clients.clone()
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    /// Insere a conta no início da lista e cria suas configurações padrão.
    /// Nenhum campo é validado aqui.
    pub fn add_client(&mut self, client: Client) -> Client {
        self.settings
            .insert(client.id.clone(), ClinicSettings::seeded_from(&client));
        self.clients.insert(0, client.clone());
        info!("Conta {} cadastrada ({})", client.id, client.role);
        client
    }

    pub fn update_client(&mut self, client: Client) -> PortalResult<Client> {
        if !replace_by_id(&mut self.clients, client.clone()) {
            warn!("Atualização ignorada: conta {} não existe", client.id);
            return Err(PortalError::not_found("conta", &client.id));
        }
        debug!("Conta {} atualizada", client.id);
        Ok(client)
    }

    /// Remove a conta junto com tarefas, relatórios, métricas, configurações,
    /// pagamentos e arquivos da clínica
    pub fn delete_client(&mut self, id: &str) -> PortalResult<DeletedClient> {
        let client = remove_by_id(&mut self.clients, id).ok_or_else(|| {
            warn!("Remoção ignorada: conta {} não existe", id);
            PortalError::not_found("conta", id)
        })?;

        fn drain_owned<T>(items: &mut Vec<T>, owner: impl Fn(&T) -> bool) -> usize {
            let before = items.len();
            items.retain(|item| !owner(item));
            before - items.len()
        }

        let deleted = DeletedClient {
            tasks: drain_owned(&mut self.tasks, |t| t.client_id == id),
            reports: drain_owned(&mut self.reports, |r| r.client_id == id),
            payments: drain_owned(&mut self.payments, |p| p.client_id == id),
            files: drain_owned(&mut self.files, |f| f.client_id == id),
            metrics: self.metrics.remove(id).map_or(0, |m| m.len()),
            settings: self.settings.remove(id).is_some(),
            client,
        };

        info!(
            "Conta {} removida com {} tarefas, {} relatórios, {} métricas, {} pagamentos e {} arquivos",
            id, deleted.tasks, deleted.reports, deleted.metrics, deleted.payments, deleted.files
        );
        Ok(deleted)
    }

    // --- Métricas ---

    /// Métricas da clínica em ordem crescente de mês
    pub fn metrics(&self, client_id: &str) -> Vec<Metric> {
        self.metrics.get(client_id).cloned().unwrap_or_default()
    }

    /// Grava a métrica do mês, substituindo a existente. Retorna a série
    /// completa da clínica.
    pub fn update_metric(&mut self, client_id: &str, metric: Metric) -> Vec<Metric> {
        let series = self.metrics.entry(client_id.to_string()).or_default();

        match series.iter_mut().find(|m| m.month == metric.month) {
            Some(existing) => {
                debug!("Métrica {} de {} substituída", metric.month, client_id);
                *existing = metric;
            }
            None => {
                debug!("Métrica {} de {} adicionada", metric.month, client_id);
                series.push(metric);
                series.sort_by_key(|m| m.month);
            }
        }

        series.clone()
    }

    // --- Tarefas ---

    pub fn tasks(&self, client_id: &str) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.client_id == client_id)
            .cloned()
            .collect()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn add_task(&mut self, task: Task) -> Task {
        self.tasks.insert(0, task.clone());
        info!("Tarefa {} criada para {}", task.id, task.client_id);
        task
    }

    pub fn update_task(&mut self, task: Task) -> PortalResult<Task> {
        if !replace_by_id(&mut self.tasks, task.clone()) {
            warn!("Atualização ignorada: tarefa {} não existe", task.id);
            return Err(PortalError::not_found("tarefa", &task.id));
        }
        debug!("Tarefa {} atualizada ({})", task.id, task.status);
        Ok(task)
    }

    pub fn delete_task(&mut self, id: &str) -> PortalResult<Task> {
        let task = remove_by_id(&mut self.tasks, id)
            .ok_or_else(|| PortalError::not_found("tarefa", id))?;
        info!("Tarefa {} removida. Restantes: {}", id, self.tasks.len());
        Ok(task)
    }

    // --- Relatórios ---

    pub fn reports(&self, client_id: &str) -> Vec<Report> {
        self.reports
            .iter()
            .filter(|r| r.client_id == client_id)
            .cloned()
            .collect()
    }

    pub fn add_report(&mut self, report: Report) -> Report {
        self.reports.insert(0, report.clone());
        info!("Relatório {} publicado para {} ({})", report.id, report.client_id, report.month);
        report
    }

    pub fn update_report(&mut self, report: Report) -> PortalResult<Report> {
        if !replace_by_id(&mut self.reports, report.clone()) {
            warn!("Atualização ignorada: relatório {} não existe", report.id);
            return Err(PortalError::not_found("relatório", &report.id));
        }
        debug!("Relatório {} atualizado", report.id);
        Ok(report)
    }

    pub fn delete_report(&mut self, id: &str) -> PortalResult<Report> {
        let report = remove_by_id(&mut self.reports, id)
            .ok_or_else(|| PortalError::not_found("relatório", id))?;
        info!("Relatório {} removido", id);
        Ok(report)
    }

    // --- Configurações ---

    /// Configurações gravadas, ou um registro vazio que não é persistido
    pub fn settings(&self, client_id: &str) -> ClinicSettings {
        self.settings
            .get(client_id)
            .cloned()
            .unwrap_or_else(|| ClinicSettings::empty(client_id))
    }

    pub fn update_settings(&mut self, client_id: &str, mut settings: ClinicSettings) {
        settings.client_id = client_id.to_string();
        self.settings.insert(client_id.to_string(), settings);
        info!("[API] Configurações atualizadas para {}", client_id);
    }

    // --- Pagamentos ---

    pub fn payments(&self, client_id: &str) -> Vec<Payment> {
        self.payments
            .iter()
            .filter(|p| p.client_id == client_id)
            .cloned()
            .collect()
    }

    pub fn add_payment(&mut self, payment: Payment) -> Payment {
        self.payments.insert(0, payment.clone());
        info!("Cobrança {} registrada para {}", payment.id, payment.client_id);
        payment
    }

    pub fn update_payment_status(&mut self, id: &str, status: PaymentStatus) -> PortalResult<Payment> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| PortalError::not_found("cobrança", id))?;
        payment.status = status;
        debug!("Cobrança {} marcada como {}", id, status);
        Ok(payment.clone())
    }

    pub fn delete_payment(&mut self, id: &str) -> PortalResult<Payment> {
        let payment = remove_by_id(&mut self.payments, id)
            .ok_or_else(|| PortalError::not_found("cobrança", id))?;
        info!("Cobrança {} removida", id);
        Ok(payment)
    }

    // --- Arquivos ---

    pub fn files(&self, client_id: &str) -> Vec<ClinicFile> {
        self.files
            .iter()
            .filter(|f| f.client_id == client_id)
            .cloned()
            .collect()
    }

    pub fn add_file(&mut self, file: ClinicFile) -> ClinicFile {
        self.files.insert(0, file.clone());
        info!("Arquivo {} enviado para {} ({})", file.name, file.client_id, file.category);
        file
    }

    pub fn delete_file(&mut self, id: &str) -> PortalResult<ClinicFile> {
        let file = remove_by_id(&mut self.files, id)
            .ok_or_else(|| PortalError::not_found("arquivo", id))?;
        info!("Arquivo {} removido", id);
        Ok(file)
    }

    /// Arquivos da clínica cujo nome contém o termo, sem diferenciar maiúsculas
    pub fn search_files(&self, client_id: &str, term: &str) -> Vec<ClinicFile> {
        let term = term.to_lowercase();
        self.files
            .iter()
            .filter(|f| f.client_id == client_id && f.name.to_lowercase().contains(&term))
            .cloned()
            .collect()
    }

    // --- Integrações ---

    /// Entrega uma notificação ao notificador configurado. Sempre retorna
    /// `true`: falhas de entrega não são observáveis por aqui.
    pub fn send_notification(&self, channel: NotificationChannel, to: &str, message: &str) -> bool {
        self.notifier.deliver(&Notification {
            channel,
            to: to.to_string(),
            message: message.to_string(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileCategory, Month, PaymentType, ReportStatus, ReportType, TaskStatus, UserRole};
    use crate::notify::RecordingNotifier;
    use chrono::NaiveDate;

    fn month(value: &str) -> Month {
        value.parse().unwrap()
    }

    fn metric(value: &str, new_patients: i64) -> Metric {
        Metric {
            month: month(value),
            new_patients,
            roas: 200.0,
            cac: 5000.0,
            spend: 50000.0,
        }
    }

    fn test_client(id: &str) -> Client {
        Client::new(id, "Test Clinic", "Dr.Kim", "a@b.com", UserRole::User)
    }

    fn report(id: &str, client_id: &str, value: &str) -> Report {
        Report {
            id: id.to_string(),
            client_id: client_id.to_string(),
            title: "Relatório mensal".to_string(),
            report_type: ReportType::Performance,
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            month: month(value),
            document_url: "https://notion.so/report".to_string(),
            status: ReportStatus::Published,
            summary: None,
        }
    }

    fn payment(id: &str, client_id: &str) -> Payment {
        Payment {
            id: id.to_string(),
            client_id: client_id.to_string(),
            month: month("2025-01"),
            amount: 1_500_000,
            status: PaymentStatus::Pending,
            payment_type: PaymentType::Regular,
            invoice_url: None,
            contract_url: None,
            estimate_url: None,
            due_date: NaiveDate::from_ymd_opt(2025, 1, 25).unwrap(),
            description: None,
        }
    }

    fn file(id: &str, client_id: &str, name: &str) -> ClinicFile {
        ClinicFile {
            id: id.to_string(),
            client_id: client_id.to_string(),
            name: name.to_string(),
            file_type: "PDF".to_string(),
            size: "1.2 MB".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            category: FileCategory::classify(name),
            url: "#".to_string(),
        }
    }

    #[test]
    fn test_add_client_prepends_and_seeds_settings() {
        let mut db = DataService::new();
        db.add_client(test_client("c0"));
        db.add_client(test_client("c1"));

        let clients = db.clients();
        assert_eq!(clients[0].id, "c1");
        assert_eq!(clients.iter().filter(|c| c.id == "c1").count(), 1);

        let settings = db.settings("c1");
        assert_eq!(settings.client_id, "c1");
        assert_eq!(settings.name, "Test Clinic");
        assert_eq!(settings.representative, "Dr.Kim");
    }

    #[test]
    fn test_clients_returns_a_copy() {
        let mut db = DataService::new();
        db.add_client(test_client("c1"));

        let mut copy = db.clients();
        copy.clear();
        assert_eq!(db.clients().len(), 1);
    }

    #[test]
    fn test_update_client_unknown_id_is_not_found() {
        let mut db = DataService::new();
        db.add_client(test_client("c1"));

        let before = db.clients();

        let result = db.update_client(test_client("ghost"));
        assert!(matches!(result, Err(PortalError::NotFound(_))));
        assert_eq!(db.clients(), before);
    }

    #[test]
    fn test_update_client_replaces_record() {
        let mut db = DataService::new();
        db.add_client(test_client("c1"));

        let mut edited = test_client("c1");
        edited.clinic_name = "Renamed Clinic".to_string();
        db.update_client(edited).unwrap();

        assert_eq!(db.client("c1").unwrap().clinic_name, "Renamed Clinic");
        assert_eq!(db.clients().len(), 1);
    }

    #[test]
    fn test_delete_client_cascades() {
        let mut db = DataService::new();
        db.add_client(test_client("c1"));
        db.add_client(test_client("c2"));
        db.add_task(Task::new("t1", "c1", "Banner", "Dr.Kim"));
        db.add_task(Task::new("t2", "c2", "Blog", "Dr.Lee"));
        db.add_report(report("r1", "c1", "2025-01"));
        db.update_metric("c1", metric("2025-01", 10));
        db.add_payment(payment("p1", "c1"));
        db.add_file(file("f1", "c1", "계약서.pdf"));

        let deleted = db.delete_client("c1").unwrap();
        assert_eq!(deleted.client.id, "c1");
        assert_eq!(deleted.tasks, 1);
        assert_eq!(deleted.reports, 1);
        assert_eq!(deleted.metrics, 1);
        assert_eq!(deleted.payments, 1);
        assert_eq!(deleted.files, 1);
        assert!(deleted.settings);

        assert!(db.tasks("c1").is_empty());
        assert!(db.reports("c1").is_empty());
        assert!(db.metrics("c1").is_empty());
        assert!(db.payments("c1").is_empty());
        assert!(db.files("c1").is_empty());
        assert_eq!(db.settings("c1"), ClinicSettings::empty("c1"));

        assert_eq!(db.tasks("c2").len(), 1);
        assert!(matches!(db.delete_client("c1"), Err(PortalError::NotFound(_))));
    }

    #[test]
    fn test_update_metric_upserts_by_month() {
        let mut db = DataService::new();
        db.update_metric("c1", metric("2025-01", 10));
        let stored = db.update_metric("c1", metric("2025-01", 20));

        assert_eq!(stored.len(), 1);
        assert_eq!(db.metrics("c1").len(), 1);
        assert_eq!(db.metrics("c1")[0].new_patients, 20);
    }

    #[test]
    fn test_metrics_sorted_by_month() {
        let mut db = DataService::new();
        for m in ["2025-03", "2024-11", "2025-01", "2024-12"] {
            db.update_metric("c1", metric(m, 1));
        }

        let months: Vec<String> = db.metrics("c1").iter().map(|m| m.month.to_string()).collect();
        assert_eq!(months, vec!["2024-11", "2024-12", "2025-01", "2025-03"]);
        assert!(db.metrics("other").is_empty());
    }

    #[test]
    fn test_task_lifecycle() {
        let mut db = DataService::new();
        db.add_task(Task::new("t1", "c1", "Banner", "Dr.Kim"));

        let mut task = db.task("t1").cloned().unwrap();
        task.status = TaskStatus::Completed;
        db.update_task(task).unwrap();
        assert_eq!(db.tasks("c1")[0].status, TaskStatus::Completed);
        // status e progresso são independentes
        assert_eq!(db.tasks("c1")[0].progress, None);

        db.delete_task("t1").unwrap();
        assert!(db.tasks("c1").iter().all(|t| t.id != "t1"));
    }

    #[test]
    fn test_missing_task_updates_leave_collection_unchanged() {
        let mut db = DataService::new();
        db.add_task(Task::new("t1", "c1", "Banner", "Dr.Kim"));
        let before = db.tasks("c1");

        let ghost = Task::new("ghost", "c1", "Nada", "Dr.Kim");
        assert!(matches!(db.update_task(ghost), Err(PortalError::NotFound(_))));
        assert!(matches!(db.delete_task("ghost"), Err(PortalError::NotFound(_))));
        assert_eq!(db.tasks("c1"), before);
    }

    #[test]
    fn test_tasks_newest_first() {
        let mut db = DataService::new();
        db.add_task(Task::new("t1", "c1", "Primeira", "Dr.Kim"));
        db.add_task(Task::new("t2", "c1", "Segunda", "Dr.Kim"));
        db.add_task(Task::new("t3", "c2", "Outra clínica", "Dr.Lee"));

        let ids: Vec<String> = db.tasks("c1").into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t2", "t1"]);
    }

    #[test]
    fn test_reports_crud() {
        let mut db = DataService::new();
        db.add_report(report("r1", "c1", "2025-01"));
        db.add_report(report("r2", "c1", "2025-02"));
        assert_eq!(db.reports("c1")[0].id, "r2");

        let mut edited = report("r1", "c1", "2025-01");
        edited.summary = Some("ROAS em alta".to_string());
        db.update_report(edited).unwrap();
        assert_eq!(db.reports("c1")[1].summary.as_deref(), Some("ROAS em alta"));

        assert!(db.update_report(report("ghost", "c1", "2025-01")).is_err());
        db.delete_report("r2").unwrap();
        assert_eq!(db.reports("c1").len(), 1);
    }

    #[test]
    fn test_settings_default_is_not_persisted() {
        let mut db = DataService::new();
        let settings = db.settings("c9");
        assert_eq!(settings, ClinicSettings::empty("c9"));
        assert!(!db.settings.contains_key("c9"));

        let mut edited = settings;
        edited.client_id = "wrong".to_string();
        edited.address = "Seoul".to_string();
        db.update_settings("c9", edited);

        let stored = db.settings("c9");
        assert_eq!(stored.client_id, "c9");
        assert_eq!(stored.address, "Seoul");
    }

    #[test]
    fn test_payment_status_change() {
        let mut db = DataService::new();
        db.add_payment(payment("p1", "c1"));

        let paid = db.update_payment_status("p1", PaymentStatus::Paid).unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(db.payments("c1")[0].status, PaymentStatus::Paid);
        assert!(db.update_payment_status("ghost", PaymentStatus::Paid).is_err());

        db.delete_payment("p1").unwrap();
        assert!(db.payments("c1").is_empty());
    }

    #[test]
    fn test_search_files() {
        let mut db = DataService::new();
        db.add_file(file("f1", "c1", "2024_07_Contract.pdf"));
        db.add_file(file("f2", "c1", "배너_원본.png"));
        db.add_file(file("f3", "c2", "contract_other.pdf"));

        let found = db.search_files("c1", "CONTRACT");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "f1");
        assert_eq!(found[0].category, FileCategory::Contract);
        assert_eq!(db.search_files("c1", "").len(), 2);

        db.delete_file("f1").unwrap();
        assert!(db.delete_file("f1").is_err());
    }

    #[test]
    fn test_send_notification_always_succeeds() {
        let notifier = RecordingNotifier::new();
        let db = DataService::with_notifier(notifier.clone());

        assert!(db.send_notification(NotificationChannel::Email, "admin", "Oi"));
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].message, "Oi");
    }

    #[test]
    fn test_scenario_add_client_then_list() {
        let mut db = DataService::new();
        let client = Client::new("c1", "Test Clinic", "Dr.Kim", "a@b.com", UserRole::User);
        db.add_client(client);
        assert_eq!(db.clients()[0].id, "c1");
    }
}
