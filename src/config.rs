//! Configuração do zapconnect carregada a partir de `zapconnect.toml`.
//!
//! A struct [`ZapConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `UAZAPI_ADMIN_TOKEN` tem precedência sobre o
//! arquivo para a credencial administrativa.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

use crate::auth::{Profile, Role, StaticTokenResolver};

/// Configuração de nível superior carregada de `zapconnect.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZapConfig {
    /// URL base do gateway Uazapi.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Credencial administrativa da plataforma. Usada apenas para criar
    /// instâncias novas; nunca para operações por instância.
    #[serde(default)]
    pub admin_token: String,

    /// Intervalo do poller de status, em segundos.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Caminho do documento JSON com os registros de instância.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Tabela estática de perfis para resolução de bearer tokens.
    #[serde(default)]
    pub profiles: Vec<ProfileEntry>,
}

/// Uma entrada `[[profiles]]` do arquivo de configuração.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEntry {
    /// Bearer token aceito para este perfil.
    pub token: String,
    /// Identidade estável do perfil (chave do registro de instância).
    pub id: Uuid,
    /// E-mail do dono; origem do nome derivado da instância.
    pub email: String,
    /// Papel do perfil na plataforma.
    pub role: Role,
}

// URL padrão do gateway.
fn default_base_url() -> String {
    "https://free.uazapi.com".to_string()
}

// Intervalo padrão do poller: 60 segundos.
fn default_poll_interval_secs() -> u64 {
    60
}

// Caminho padrão do armazenamento local.
fn default_store_path() -> String {
    "zapconnect-instances.json".to_string()
}

impl Default for ZapConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            admin_token: String::new(),
            poll_interval_secs: default_poll_interval_secs(),
            store_path: default_store_path(),
            profiles: Vec::new(),
        }
    }
}

impl ZapConfig {
    /// Carrega a configuração de `zapconnect.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("zapconnect.toml"))
    }

    /// Carrega a configuração de um caminho específico.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<ZapConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo para a credencial admin.
        if let Ok(token) = std::env::var("UAZAPI_ADMIN_TOKEN")
            && !token.is_empty()
        {
            config.admin_token = token;
        }

        Ok(config)
    }

    /// Constrói o resolvedor de tokens a partir da tabela de perfis.
    pub fn token_resolver(&self) -> StaticTokenResolver {
        StaticTokenResolver::new(self.profiles.iter().map(|entry| {
            (
                entry.token.clone(),
                Profile {
                    id: entry.id,
                    email: entry.email.clone(),
                    role: entry.role,
                },
            )
        }))
    }
}
