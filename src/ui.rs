//! Interface de terminal do zapconnect — badges de status e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner do modo watch e `console`
//! para estilização com cores. O [`StatusView`] renderiza o estado da
//! conexão, o payload de QR/pareamento e as notificações transitórias.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::dispatcher::{Notification, NotificationKind};
use crate::lifecycle::{InstanceStatus, StatusReport};
use crate::poller::PollState;

/// Renderizador de status da instância no terminal.
///
/// Conectado em verde, desconectado em vermelho, aguardando QR ou
/// pareamento em amarelo, estados neutros em ciano.
pub struct StatusView {
    green: Style,
    red: Style,
    yellow: Style,
    cyan: Style,
    dim: Style,
}

impl Default for StatusView {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusView {
    pub fn new() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            cyan: Style::new().cyan(),
            dim: Style::new().dim(),
        }
    }

    /// Badge de uma linha para um status.
    pub fn badge(&self, status: InstanceStatus) -> String {
        let (glyph, style) = match status {
            InstanceStatus::Connected => ("●", &self.green),
            InstanceStatus::Disconnected => ("●", &self.red),
            InstanceStatus::WaitingQr | InstanceStatus::WaitingPair => ("◌", &self.yellow),
            InstanceStatus::Created => ("○", &self.cyan),
            InstanceStatus::NoInstance => ("○", &self.dim),
        };
        format!("{} {status}", style.apply_to(glyph))
    }

    /// Imprime o relatório de status formatado em JSON.
    pub fn print_report(&self, report: &StatusReport) {
        println!("{}", self.badge(report.status));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }

    /// Renderiza o payload de connect: QR em base64 ou código de
    /// pareamento, conforme o que o provedor devolveu.
    pub fn print_connect_payload(&self, raw: &Value) {
        if let Some(code) = crate::gateway::pairing_code(raw) {
            println!(
                "  {} Código de pareamento: {}",
                self.yellow.apply_to("◌"),
                self.green.apply_to(code)
            );
            println!("  Digite o código no WhatsApp do número informado.");
        } else if let Some(qr) = crate::gateway::qr_base64(raw) {
            println!(
                "  {} QR code recebido ({} bytes em base64)",
                self.yellow.apply_to("◌"),
                qr.len()
            );
            println!("  Escaneie com o WhatsApp para conectar a instância.");
        } else {
            println!(
                "  {} Resposta do provedor sem QR nem código de pareamento:",
                self.dim.apply_to("?")
            );
            println!("{}", serde_json::to_string_pretty(raw).unwrap_or_default());
        }
    }

    /// Imprime uma notificação transitória com glifo por tipo.
    pub fn print_notification(&self, n: &Notification) {
        match n.kind {
            NotificationKind::Info => {
                println!("  {} {}", self.cyan.apply_to("ℹ"), n.message);
            }
            NotificationKind::Success => {
                println!("  {} {}", self.green.apply_to("✓"), n.message);
            }
            NotificationKind::Error => {
                println!("  {} {}", self.red.apply_to("✗"), n.message);
            }
        }
    }
}

/// Visão "watch": spinner enquanto carrega, badge a cada atualização.
pub struct WatchView {
    view: StatusView,
    pb: ProgressBar,
}

impl WatchView {
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message("aguardando status...");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            view: StatusView::new(),
            pb,
        }
    }

    /// Reflete o estado do poller no terminal.
    pub fn update(&self, state: &PollState) {
        match state {
            PollState::Idle => {}
            PollState::Loading => {
                self.pb.set_message("consultando status...");
            }
            PollState::Loaded(report) => {
                self.pb.println(self.view.badge(report.status));
                self.pb.set_message("aguardando próximo ciclo");
            }
            PollState::Error(msg) => {
                self.pb
                    .println(format!("  {} {msg}", Style::new().red().apply_to("✗")));
                self.pb.set_message("aguardando próximo ciclo");
            }
        }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
