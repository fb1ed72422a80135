//! Dados derivados exibidos no painel da clínica

use serde::Serialize;

use crate::models::{Metric, Task, TaskStatus};

/// Último mês registrado comparado ao anterior
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSummary {
    pub current: Option<Metric>,
    pub previous: Option<Metric>,
    /// Variação de pacientes novos em %, arredondada
    pub patient_growth: i64,
    /// Variação de ROAS em %, arredondada
    pub roas_growth: i64,
}

/// Variação percentual; zero quando não há base de comparação
fn growth(current: f64, previous: f64) -> i64 {
    if previous == 0.0 {
        return 0;
    }
    // meio ponto arredonda para cima, inclusive em valores negativos
    ((current - previous) / previous * 100.0 + 0.5).floor() as i64
}

impl MetricSummary {
    /// Resumo de uma série em ordem crescente de mês
    pub fn from_metrics(metrics: &[Metric]) -> Self {
        let current = metrics.last().cloned();
        let previous = metrics.len().checked_sub(2).and_then(|i| metrics.get(i)).cloned();

        let (patient_growth, roas_growth) = match (&current, &previous) {
            (Some(cur), Some(prev)) => (
                growth(cur.new_patients as f64, prev.new_patients as f64),
                growth(cur.roas, prev.roas),
            ),
            _ => (0, 0),
        };

        Self {
            current,
            previous,
            patient_growth,
            roas_growth,
        }
    }
}

/// Tarefas agrupadas nas colunas do quadro kanban
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskBoard {
    columns: Vec<(TaskStatus, Vec<Task>)>,
}

impl TaskBoard {
    /// Agrupa por status mantendo a ordem de entrada dentro de cada coluna
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let columns = TaskStatus::ALL
            .iter()
            .map(|&status| {
                let column = tasks.iter().filter(|t| t.status == status).cloned().collect();
                (status, column)
            })
            .collect();
        Self { columns }
    }

    pub fn column(&self, status: TaskStatus) -> &[Task] {
        self.columns
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, tasks)| tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn columns(&self) -> &[(TaskStatus, Vec<Task>)] {
        &self.columns
    }
}

/// Conteúdo do painel de uma clínica
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub summary: MetricSummary,
    pub board: TaskBoard,
}

impl DashboardView {
    pub fn build(metrics: &[Metric], tasks: &[Task]) -> Self {
        Self {
            summary: MetricSummary::from_metrics(metrics),
            board: TaskBoard::from_tasks(tasks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Month;

    fn metric(month: &str, new_patients: i64, roas: f64) -> Metric {
        Metric {
            month: month.parse::<Month>().unwrap(),
            new_patients,
            roas,
            cac: 0.0,
            spend: 0.0,
        }
    }

    #[test]
    fn test_summary_growth() {
        let summary = MetricSummary::from_metrics(&[
            metric("2024-12", 40, 300.0),
            metric("2025-01", 50, 240.0),
        ]);
        assert_eq!(summary.current.as_ref().unwrap().new_patients, 50);
        assert_eq!(summary.previous.as_ref().unwrap().new_patients, 40);
        assert_eq!(summary.patient_growth, 25);
        assert_eq!(summary.roas_growth, -20);
    }

    #[test]
    fn test_summary_rounding() {
        // 1/3 → 33.33%, -1/8 → -12.5% arredonda para -12
        assert_eq!(growth(4.0, 3.0), 33);
        assert_eq!(growth(7.0, 8.0), -12);
        assert_eq!(growth(5.0, 0.0), 0);
    }

    #[test]
    fn test_summary_without_history() {
        let empty = MetricSummary::from_metrics(&[]);
        assert!(empty.current.is_none());
        assert_eq!(empty.patient_growth, 0);

        let single = MetricSummary::from_metrics(&[metric("2025-01", 10, 100.0)]);
        assert!(single.previous.is_none());
        assert_eq!(single.roas_growth, 0);
    }

    #[test]
    fn test_board_columns() {
        let mut done = Task::new("t2", "c1", "Blog", "Dr.Kim");
        done.status = TaskStatus::Completed;
        let tasks = vec![
            Task::new("t3", "c1", "Banner", "Dr.Kim"),
            done,
            Task::new("t1", "c1", "Landing", "Dr.Kim"),
        ];

        let board = TaskBoard::from_tasks(&tasks);
        assert_eq!(board.columns().len(), 4);
        let waiting: Vec<&str> = board
            .column(TaskStatus::NotStarted)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(waiting, vec!["t3", "t1"]);
        assert_eq!(board.column(TaskStatus::Completed).len(), 1);
        assert!(board.column(TaskStatus::Stopped).is_empty());
    }
}
