//! Interface de linha de comando do zapconnect baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (status, create,
//! connect, disconnect, pause, delete, watch) e flags globais
//! (--token, --config, --verbose).

use clap::{Parser, Subcommand};

/// zapconnect — Gerenciador de conexão WhatsApp do ZapCorretor.
#[derive(Debug, Parser)]
#[command(name = "zapconnect", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Bearer token do chamador, resolvido para um perfil configurado.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Caminho do arquivo de configuração.
    #[arg(long, global = true, default_value = "zapconnect.toml")]
    pub config: String,

    /// Usa armazenamento em memória; nada é persistido entre execuções.
    #[arg(long, global = true, default_value_t = false)]
    pub ephemeral: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mostra o status atual da instância do chamador.
    Status,

    /// Cria a instância WhatsApp do chamador no gateway.
    Create,

    /// Inicia o fluxo de conexão (QR sem telefone, pareamento com).
    Connect {
        /// Número de telefone para o fluxo de código de pareamento.
        #[arg(long)]
        phone: Option<String>,
    },

    /// Desconecta a instância e limpa as credenciais locais.
    Disconnect,

    /// Pausa a instância no gateway sem limpar credenciais.
    Pause,

    /// Apaga a instância e reseta o registro por completo.
    Delete,

    /// Acompanha o status em ciclo contínuo de polling.
    Watch {
        /// Intervalo entre consultas, em segundos.
        #[arg(long)]
        interval: Option<u64>,
    },
}
