pub mod client;
pub mod error;
pub mod types;

pub use client::UazapiClient;
pub use error::GatewayError;
pub use types::{pairing_code, provider_status, qr_base64, ConnectRequest, InitResponse};
