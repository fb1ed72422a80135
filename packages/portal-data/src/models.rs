//! Modelos de dados compartilhados do portal
//!
//! Este módulo define as estruturas de dados principais usadas pelo portal de
//! clientes: contas (clínicas e administradores), tarefas, relatórios,
//! métricas mensais, pagamentos, arquivos e configurações da clínica.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::PortalError;

/// Gera `Display`, `FromStr` e `as_str` a partir dos valores usados no JSON
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Representação usada no JSON e nos logs
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = PortalError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok($name::$variant),)+
                    other => Err(PortalError::InvalidValue(format!(
                        "{} desconhecido: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// Gera um identificador opaco no formato `{prefixo}-{uuid}`
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// Data de hoje (UTC), usada como padrão para registros novos
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Papel de uma conta no portal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Operador interno da agência
    Admin,
    /// Clínica cliente
    User,
}

wire_enum!(UserRole { Admin => "admin", User => "user" });

/// Situação contratual de uma clínica
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Inactive,
}

wire_enum!(ClientStatus { Active => "active", Inactive => "inactive" });

/// Estados possíveis de uma tarefa no quadro kanban
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Pedido recebido, ainda não iniciado
    NotStarted,
    /// Em execução pela equipe
    InProgress,
    /// Entregue
    Completed,
    /// Interrompido
    Stopped,
}

wire_enum!(TaskStatus {
    NotStarted => "not_started",
    InProgress => "in_progress",
    Completed => "completed",
    Stopped => "stopped",
});

impl TaskStatus {
    /// Ordem das colunas no quadro
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Stopped,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Service,
    Performance,
}

wire_enum!(ReportType { Service => "service", Performance => "performance" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Published,
    Draft,
}

wire_enum!(ReportStatus { Published => "published", Draft => "draft" });

/// Situação de uma cobrança
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Pending,
    Overdue,
}

wire_enum!(PaymentStatus { Paid => "paid", Pending => "pending", Overdue => "overdue" });

/// Cobrança recorrente (mensalidade) ou avulsa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Regular,
    Irregular,
}

wire_enum!(PaymentType { Regular => "regular", Irregular => "irregular" });

/// Categoria de um arquivo da clínica, atribuída no upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Report,
    Contract,
    Asset,
    Other,
}

wire_enum!(FileCategory {
    Report => "report",
    Contract => "contract",
    Asset => "asset",
    Other => "other",
});

impl FileCategory {
    /// Rótulo exibido no portal
    pub fn label(self) -> &'static str {
        match self {
            FileCategory::Report => "보고서",
            FileCategory::Contract => "계약서",
            FileCategory::Asset => "디자인/자료",
            FileCategory::Other => "기타",
        }
    }

    /// Classifica um arquivo pelo nome, na ordem contrato, relatório, material
    pub fn classify(file_name: &str) -> Self {
        const CONTRACT: &[&str] = &["계약서", "contract"];
        const REPORT: &[&str] = &["보고서", "report", "내역서"];
        const ASSET: &[&str] = &["로고", "원본", "이미지", "배너"];

        let lower = file_name.to_lowercase();
        let has_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if has_any(CONTRACT) {
            FileCategory::Contract
        } else if has_any(REPORT) {
            FileCategory::Report
        } else if has_any(ASSET) {
            FileCategory::Asset
        } else {
            FileCategory::Other
        }
    }
}

/// Mês de referência no formato `YYYY-MM`
///
/// A ordenação é cronológica e coincide com a ordem lexical da forma textual,
/// pois ano e mês são sempre escritos com largura fixa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Cria um mês validado
    pub fn new(year: i32, month: u32) -> Result<Self, PortalError> {
        if !(0..=9999).contains(&year) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(PortalError::InvalidValue(format!(
                "Mês inválido: {}-{}",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    /// Mês que contém a data informada
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Mês corrente (UTC)
    pub fn current() -> Self {
        Self::of(today())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Mês seguinte, usado na navegação de relatórios.
    /// `None` depois de `9999-12`.
    pub fn next(&self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1).ok()
        } else {
            Some(Self { year: self.year, month: self.month + 1 })
        }
    }

    /// Mês anterior; `None` antes de `0000-01`
    pub fn previous(&self) -> Option<Self> {
        if self.month == 1 {
            Self::new(self.year - 1, 12).ok()
        } else {
            Some(Self { year: self.year, month: self.month - 1 })
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = PortalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || PortalError::InvalidValue(format!("Mês deve usar o formato YYYY-MM: {}", value));

        let bytes = value.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
        if !digits(0..4) || !digits(5..7) {
            return Err(invalid());
        }

        let date = NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d")
            .map_err(|_| invalid())?;
        Ok(Self::of(date))
    }
}

impl TryFrom<String> for Month {
    type Error = PortalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

/// Usuário autenticado no portal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub clinic_name: String,
    pub role: UserRole,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Conta de clínica (ou de administrador) com dados cadastrais
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Identificador opaco da conta
    pub id: String,
    /// Nome do responsável
    pub name: String,
    /// Nome da clínica (ou setor, para administradores)
    pub clinic_name: String,
    pub role: UserRole,
    /// E-mail de login; unicidade não é exigida
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Data de cadastro
    pub joined_at: NaiveDate,
    pub status: ClientStatus,
    pub phone: String,
    /// Número de registro da empresa
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representative: Option<String>,
}

impl Client {
    /// Conta ativa, cadastrada hoje, sem telefone nem dados opcionais
    pub fn new(
        id: impl Into<String>,
        clinic_name: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            clinic_name: clinic_name.into(),
            role,
            email: email.into(),
            avatar: None,
            joined_at: today(),
            status: ClientStatus::Active,
            phone: String::new(),
            business_number: None,
            representative: None,
        }
    }

    /// Visão de usuário desta conta
    pub fn as_user(&self) -> User {
        User {
            id: self.id.clone(),
            name: self.name.clone(),
            clinic_name: self.clinic_name.clone(),
            role: self.role,
            email: self.email.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Métrica mensal de desempenho de uma clínica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    /// Mês de referência; chave de unicidade por cliente
    pub month: Month,
    /// Pacientes novos no mês
    pub new_patients: i64,
    /// Custo de aquisição de cliente
    pub cac: f64,
    /// Retorno sobre investimento em anúncios (%)
    pub roas: f64,
    /// Investimento em mídia
    pub spend: f64,
}

impl Metric {
    /// Métrica zerada para o mês informado
    pub fn empty(month: Month) -> Self {
        Self {
            month,
            new_patients: 0,
            cac: 0.0,
            roas: 0.0,
            spend: 0.0,
        }
    }
}

/// Unidade de trabalho solicitada por uma clínica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Clínica dona da tarefa
    pub client_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Data do pedido
    pub date: NaiveDate,
    /// Nome de quem fez o pedido
    pub requester: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Progresso de 0 a 100; não é limitado nem ligado ao status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_contact: Option<String>,
}

impl Task {
    /// Tarefa não iniciada, datada de hoje
    pub fn new(
        id: impl Into<String>,
        client_id: impl Into<String>,
        title: impl Into<String>,
        requester: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            title: title.into(),
            description: None,
            status: TaskStatus::NotStarted,
            date: today(),
            requester: requester.into(),
            due_date: None,
            progress: None,
            assignee: None,
            assignee_contact: None,
        }
    }
}

/// Referência a um documento hospedado externamente
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub client_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    /// Data de publicação
    pub date: NaiveDate,
    /// Mês a que o relatório se refere
    pub month: Month,
    /// URL do documento incorporado (Notion)
    #[serde(rename = "notionUrl")]
    pub document_url: String,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Cobrança emitida para uma clínica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub client_id: String,
    pub month: Month,
    pub amount: i64,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_url: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Arquivo compartilhado com a clínica
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicFile {
    pub id: String,
    pub client_id: String,
    pub name: String,
    /// Formato exibido (PDF, PNG, ZIP...)
    #[serde(rename = "type")]
    pub file_type: String,
    /// Tamanho legível ("3.5 MB")
    pub size: String,
    pub date: NaiveDate,
    pub category: FileCategory,
    pub url: String,
}

/// Dados cadastrais e integrações de uma clínica
///
/// `naver_id`/`naver_pw` são credenciais de terceiros guardadas como texto;
/// ao persistir um snapshot com chave, `naver_pw` é selado (ver `snapshot`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicSettings {
    pub client_id: String,
    pub name: String,
    pub representative: String,
    pub phone: String,
    pub address: String,
    /// Horário de atendimento
    pub hours: String,
    /// Intervalo de almoço
    pub lunch: String,
    pub blog_url: String,
    pub place_url: String,
    pub naver_id: String,
    pub naver_pw: String,
    /// Filosofia da clínica (texto ou URL do Notion)
    pub philosophy: String,
}

impl ClinicSettings {
    /// Registro vazio para a clínica
    pub fn empty(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Configurações iniciais derivadas do cadastro da clínica
    pub fn seeded_from(client: &Client) -> Self {
        Self {
            client_id: client.id.clone(),
            name: client.clinic_name.clone(),
            representative: client.name.clone(),
            phone: client.phone.clone(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_parsing() {
        let month: Month = "2025-01".parse().unwrap();
        assert_eq!(month.year(), 2025);
        assert_eq!(month.month(), 1);
        assert_eq!(month.to_string(), "2025-01");

        assert!("2025-13".parse::<Month>().is_err());
        assert!("2025-00".parse::<Month>().is_err());
        assert!("2025-1".parse::<Month>().is_err());
        assert!("25-01-01".parse::<Month>().is_err());
        assert!("+202-01".parse::<Month>().is_err());
        assert!("".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_order_matches_text_order() {
        let mut months: Vec<Month> = ["2025-02", "2024-12", "2025-10", "2025-01"]
            .iter()
            .map(|m| m.parse().unwrap())
            .collect();
        months.sort();

        let text: Vec<String> = months.iter().map(|m| m.to_string()).collect();
        let mut sorted_text = text.clone();
        sorted_text.sort();

        assert_eq!(text, sorted_text);
        assert_eq!(text[0], "2024-12");
    }

    #[test]
    fn test_month_navigation() {
        let december: Month = "2024-12".parse().unwrap();
        let january = december.next().unwrap();
        assert_eq!(january.to_string(), "2025-01");
        assert_eq!(january.previous(), Some(december));
        assert_eq!(Month::new(2025, 1).unwrap().previous().unwrap().to_string(), "2024-12");
    }

    #[test]
    fn test_month_navigation_stays_in_range() {
        let last = Month::new(9999, 12).unwrap();
        assert_eq!(last.next(), None);
        assert_eq!(last.previous().unwrap().to_string(), "9999-11");

        let first = Month::new(0, 1).unwrap();
        assert_eq!(first.previous(), None);
        assert_eq!(first.next().unwrap().to_string(), "0000-02");
    }

    #[test]
    fn test_enum_wire_values() {
        assert_eq!(TaskStatus::NotStarted.to_string(), "not_started");
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("done".parse::<TaskStatus>().is_err());
        assert_eq!("overdue".parse::<PaymentStatus>().unwrap(), PaymentStatus::Overdue);
        assert_eq!(FileCategory::Asset.label(), "디자인/자료");
    }

    #[test]
    fn test_file_classification() {
        assert_eq!(FileCategory::classify("2024_계약서_최종.pdf"), FileCategory::Contract);
        assert_eq!(FileCategory::classify("Service_CONTRACT.pdf"), FileCategory::Contract);
        assert_eq!(FileCategory::classify("7월_광고비_내역서.xlsx"), FileCategory::Report);
        assert_eq!(FileCategory::classify("monthly-report.pdf"), FileCategory::Report);
        assert_eq!(FileCategory::classify("메인_배너.png"), FileCategory::Asset);
        assert_eq!(FileCategory::classify("2024_07_디자인_시안_v2.png"), FileCategory::Other);
        // contrato tem precedência sobre relatório
        assert_eq!(FileCategory::classify("contract_report.pdf"), FileCategory::Contract);
    }

    #[test]
    fn test_task_json_shape() {
        let mut task = Task::new("t1", "c1", "Banner", "Dr.Kim");
        task.progress = Some(150);

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["clientId"], "c1");
        assert_eq!(json["status"], "not_started");
        assert_eq!(json["progress"], 150);
        assert!(json.get("dueDate").is_none());

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_metric_rejects_bad_month_in_json() {
        let bad = serde_json::json!({
            "month": "2025/01",
            "newPatients": 1,
            "cac": 0.0,
            "roas": 0.0,
            "spend": 0.0
        });
        assert!(serde_json::from_value::<Metric>(bad).is_err());
    }

    #[test]
    fn test_settings_seeded_from_client() {
        let mut client = Client::new("c1", "Test Clinic", "Dr.Kim", "a@b.com", UserRole::User);
        client.phone = "010-0000-0000".to_string();

        let settings = ClinicSettings::seeded_from(&client);
        assert_eq!(settings.client_id, "c1");
        assert_eq!(settings.name, "Test Clinic");
        assert_eq!(settings.representative, "Dr.Kim");
        assert_eq!(settings.phone, "010-0000-0000");
        assert!(settings.address.is_empty());
        assert!(settings.naver_pw.is_empty());
    }

    #[test]
    fn test_new_id_prefix() {
        let a = new_id("u");
        let b = new_id("u");
        assert!(a.starts_with("u-"));
        assert_ne!(a, b);
    }
}
