//! Tipos de erro para o cliente do gateway Uazapi.
//!
//! Define [`GatewayError`] com variantes para erros retornados pela API
//! e falhas de rede. Usa `thiserror` para derivar `Display` e `Error`
//! automaticamente a partir dos atributos `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o gateway de WhatsApp.
///
/// O gerenciador de conexão não distingue tipos de falha do provedor:
/// qualquer resposta não-2xx vira [`ApiError`](GatewayError::ApiError)
/// carregando o status HTTP e o corpo da resposta literalmente, e
/// qualquer falha de transporte vira [`Network`](GatewayError::Network).
#[derive(Debug, Error)]
pub enum GatewayError {
    /// O provedor retornou um status não-2xx. Contém o código HTTP e o
    /// texto do corpo da resposta, repassado sem modificação.
    #[error("provider returned status {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    /// Encapsula o erro original do `reqwest` via `#[from]`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
