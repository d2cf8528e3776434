//! Tipos de dados para requisições e respostas do gateway Uazapi.
//!
//! Apenas a inicialização de instância tem forma tipada; as demais
//! operações repassam o payload bruto do provedor como
//! [`serde_json::Value`], com funções auxiliares para extrair os campos
//! de interesse (status, QR code, código de pareamento).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Corpo da requisição para `POST /instance/init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitRequest {
    /// Nome legível da instância, derivado do e-mail do dono.
    pub name: String,
}

/// Resposta do provedor à inicialização de uma instância.
///
/// O provedor pode devolver o par id/token aninhado em `instance` ou no
/// nível raiz, dependendo da versão da API; [`credentials`] resolve as
/// duas formas.
///
/// [`credentials`]: InitResponse::credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResponse {
    #[serde(default)]
    pub instance: Option<InitInstance>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Par id/token aninhado dentro de `instance` na resposta de init.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitInstance {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl InitResponse {
    /// Extrai o par (id, token) da resposta, se ambos estiverem presentes.
    /// Prefere a forma aninhada; cai para os campos de nível raiz.
    pub fn credentials(&self) -> Option<(String, String)> {
        if let Some(inst) = &self.instance
            && let (Some(id), Some(token)) = (&inst.id, &inst.token)
        {
            return Some((id.clone(), token.clone()));
        }
        match (&self.id, &self.token) {
            (Some(id), Some(token)) => Some((id.clone(), token.clone())),
            _ => None,
        }
    }
}

/// Corpo da requisição para `POST /instance/connect`.
///
/// O campo `phone` só é serializado quando presente: o fluxo de QR code
/// não envia a chave, e o fluxo de pareamento envia o número. Enviar a
/// chave com string vazia confunde o provedor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Extrai a string de status do payload bruto do provedor.
/// Verifica `instance.status` e depois `status` no nível raiz.
pub fn provider_status(raw: &Value) -> Option<&str> {
    raw.pointer("/instance/status")
        .and_then(Value::as_str)
        .or_else(|| raw.get("status").and_then(Value::as_str))
}

/// Extrai a imagem QR em base64 do payload de connect, se presente.
/// Verifica `qrcode_base64` e depois `instance.qrcode`.
pub fn qr_base64(raw: &Value) -> Option<&str> {
    raw.get("qrcode_base64")
        .and_then(Value::as_str)
        .or_else(|| raw.pointer("/instance/qrcode").and_then(Value::as_str))
}

/// Extrai o código de pareamento do payload de connect, se presente.
pub fn pairing_code(raw: &Value) -> Option<&str> {
    raw.get("pairingCode").and_then(Value::as_str)
}
