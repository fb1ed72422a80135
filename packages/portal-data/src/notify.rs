//! Fronteira de integração com mensageria externa (KakaoTalk e e-mail)
//!
//! O envio real não faz parte desta biblioteca. O `Notifier` padrão apenas
//! registra a mensagem no log e sempre reporta sucesso.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Canal de saída de uma notificação
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    /// Alimtalk via KakaoTalk
    Kakao,
    Email,
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationChannel::Kakao => write!(f, "kakao"),
            NotificationChannel::Email => write!(f, "email"),
        }
    }
}

/// Mensagem a ser entregue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: NotificationChannel,
    /// Destinatário (id de conta, e-mail ou alias como `admin`)
    pub to: String,
    pub message: String,
}

/// Destino das notificações do portal
pub trait Notifier: Send + Sync {
    fn deliver(&self, notification: &Notification);
}

/// Notificador padrão: registra no log e não envia nada
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn deliver(&self, notification: &Notification) {
        info!(
            "[Integration] Sending {} to {}: {}",
            notification.channel, notification.to, notification.message
        );
    }
}

/// Notificador que guarda as mensagens entregues, para testes
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: std::sync::Arc<std::sync::Mutex<Vec<Notification>>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cópia das notificações entregues até agora
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Notifier for RecordingNotifier {
    fn deliver(&self, notification: &Notification) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
    }
}
