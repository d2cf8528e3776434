//! The connection manager: sole authority over the instance lifecycle.
//!
//! Every operation receives the resolved caller [`Profile`] and touches
//! only that caller's record. Local mutation happens strictly after the
//! provider call succeeds; on upstream failure nothing changes locally.
//! The manager never retries — retries, if wanted, belong to callers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Profile;
use crate::error::ZapError;
use crate::gateway::{provider_status, ConnectRequest, GatewayError, UazapiClient};
use crate::lifecycle::{derive_instance_name, InstanceRecord, InstanceStatus, StatusReport};
use crate::store::InstanceStore;

/// Success shape of the create operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    pub instance_id: String,
}

/// Success shape of disconnect/pause/delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}

pub struct ConnectionManager {
    gateway: UazapiClient,
    store: Box<dyn InstanceStore>,
}

impl ConnectionManager {
    pub fn new(gateway: UazapiClient, store: Box<dyn InstanceStore>) -> Self {
        Self { gateway, store }
    }

    /// Create the caller's instance on the provider and persist the
    /// returned credentials. Enforces one instance per profile: the
    /// precheck is a fast path and the store's `insert_new` is the
    /// uniqueness constraint under a race.
    pub async fn create(&self, caller: &Profile) -> Result<CreateResponse, ZapError> {
        if let Some(existing) = self.store.get(caller.id)?
            && existing.has_instance()
        {
            return Err(ZapError::AlreadyExists);
        }

        let name = derive_instance_name(&caller.email, Utc::now());
        let resp = self.gateway.init(&name).await?;

        let Some((instance_id, instance_token)) = resp.credentials() else {
            return Err(ZapError::Gateway(GatewayError::ApiError {
                status: 502,
                message: "provider response missing instance id/token".into(),
            }));
        };

        let mut record = InstanceRecord::empty(caller.id);
        record.instance_id = Some(instance_id.clone());
        record.instance_token = Some(instance_token);
        record.instance_name = Some(name);
        self.store.insert_new(record)?;

        Ok(CreateResponse { instance_id })
    }

    /// Tri-state status: `no_instance` when the caller owns no credential
    /// pair, otherwise the provider status mapped into the internal
    /// vocabulary plus the raw payload. A provider failure fails the
    /// operation outright — the status is never guessed locally.
    pub async fn status(&self, caller: &Profile) -> Result<StatusReport, ZapError> {
        let Some(record) = self.store.get(caller.id)? else {
            return Ok(StatusReport::no_instance());
        };
        if !record.has_instance() {
            return Ok(StatusReport::no_instance());
        }
        let token = record
            .instance_token
            .as_deref()
            .ok_or(ZapError::InstanceNotFound)?;

        let raw = self.gateway.status(token).await?;
        let status = InstanceStatus::from_provider(provider_status(&raw));

        Ok(StatusReport {
            has_instance: true,
            status,
            raw: Some(raw),
            updated_at: Some(record.updated_at),
        })
    }

    /// Start the QR flow (no phone) or the pairing flow (with phone).
    /// Returns the raw provider payload unmodified; which of the QR or
    /// pairing fields is populated is the provider's business.
    pub async fn connect(
        &self,
        caller: &Profile,
        req: &ConnectRequest,
    ) -> Result<Value, ZapError> {
        if let Some(phone) = &req.phone {
            let trimmed = phone.trim();
            if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
                return Err(ZapError::Validation(
                    "phone must contain only digits".into(),
                ));
            }
        }

        let record = self.require_instance(caller)?;
        let token = record
            .instance_token
            .as_deref()
            .ok_or(ZapError::InstanceNotFound)?;

        let raw = self.gateway.connect(token, req.phone.as_deref()).await?;
        Ok(raw)
    }

    /// Disconnect on the provider, then clear the credential pair. The
    /// instance name survives; only delete resets it.
    pub async fn disconnect(&self, caller: &Profile) -> Result<AckResponse, ZapError> {
        let mut record = self.require_instance(caller)?;
        let token = record
            .instance_token
            .clone()
            .ok_or(ZapError::InstanceNotFound)?;

        self.gateway.disconnect(&token).await?;

        record.clear_credentials();
        self.store.update(record)?;

        Ok(AckResponse {
            message: "Instance disconnected".into(),
        })
    }

    /// Pause on the provider. Credentials stay; only `updated_at` moves.
    pub async fn pause(&self, caller: &Profile) -> Result<AckResponse, ZapError> {
        let mut record = self.require_instance(caller)?;
        let token = record
            .instance_token
            .clone()
            .ok_or(ZapError::InstanceNotFound)?;

        self.gateway.pause(&token).await?;

        record.updated_at = Utc::now();
        self.store.update(record)?;

        Ok(AckResponse {
            message: "Instance paused".into(),
        })
    }

    /// Delete on the provider, then reset the record to its pre-creation
    /// state: id, token AND name are cleared.
    pub async fn delete(&self, caller: &Profile) -> Result<AckResponse, ZapError> {
        let mut record = self.require_instance(caller)?;
        let token = record
            .instance_token
            .clone()
            .ok_or(ZapError::InstanceNotFound)?;

        self.gateway.delete(&token).await?;

        record.clear_all();
        self.store.update(record)?;

        Ok(AckResponse {
            message: "Instance deleted".into(),
        })
    }

    fn require_instance(&self, caller: &Profile) -> Result<InstanceRecord, ZapError> {
        match self.store.get(caller.id)? {
            Some(record) if record.has_instance() => Ok(record),
            _ => Err(ZapError::InstanceNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::store::MemoryStore;
    use uuid::Uuid;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn caller() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "Maria.Silva@corretora.com.br".into(),
            role: Role::Agent,
        }
    }

    fn manager_for(server: &MockServer) -> ConnectionManager {
        ConnectionManager::new(
            UazapiClient::new(server.uri(), "admin-secret".into()),
            Box::new(MemoryStore::new()),
        )
    }

    async fn mount_init(server: &MockServer, id: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path("/instance/init"))
            .and(header("admintoken", "admin-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "instance": {"id": id, "token": token}
            })))
            .mount(server)
            .await;
    }

    async fn mount_status(server: &MockServer, token: &str, status: &str) {
        Mock::given(method("GET"))
            .and(path("/instance/status"))
            .and(header("token", token))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "instance": {"status": status}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn status_without_record_is_no_instance() {
        let server = MockServer::start().await;
        let mgr = manager_for(&server);

        let report = mgr.status(&caller()).await.unwrap();
        assert!(!report.has_instance);
        assert_eq!(report.status, InstanceStatus::NoInstance);
        assert!(report.raw.is_none());
    }

    #[tokio::test]
    async fn create_persists_credentials_and_derived_name() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let store = MemoryStore::new();
        let profile = caller();
        let mgr = ConnectionManager::new(
            UazapiClient::new(server.uri(), "admin-secret".into()),
            Box::new(store),
        );

        let resp = mgr.create(&profile).await.unwrap();
        assert_eq!(resp.instance_id, "inst-1");

        // Second create without an intervening delete fails.
        let err = mgr.create(&profile).await.unwrap_err();
        assert!(matches!(err, ZapError::AlreadyExists));

        mount_status(&server, "tok-1", "").await;
        let report = mgr.status(&profile).await.unwrap();
        assert!(report.has_instance);
        // Name derivation is exercised directly in lifecycle::record tests;
        // here we only care that the record now holds a credential pair.
        assert_eq!(report.status, InstanceStatus::Created);
    }

    #[tokio::test]
    async fn create_fails_when_provider_omits_token_and_persists_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/instance/init"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "instance": {"id": "inst-1"}
            })))
            .mount(&server)
            .await;
        let mgr = manager_for(&server);
        let profile = caller();

        let err = mgr.create(&profile).await.unwrap_err();
        assert!(matches!(err, ZapError::Gateway(_)));

        let report = mgr.status(&profile).await.unwrap();
        assert!(!report.has_instance);
    }

    #[tokio::test]
    async fn status_maps_provider_vocabulary() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let mgr = manager_for(&server);
        let profile = caller();
        mgr.create(&profile).await.unwrap();

        for (provider, expected) in [
            ("connected", InstanceStatus::Connected),
            ("disconnected", InstanceStatus::Disconnected),
            ("qrcode", InstanceStatus::WaitingQr),
            ("pairing", InstanceStatus::WaitingPair),
            ("something-new", InstanceStatus::Created),
        ] {
            server.reset().await;
            mount_status(&server, "tok-1", provider).await;
            let report = mgr.status(&profile).await.unwrap();
            assert!(report.has_instance);
            assert_eq!(report.status, expected, "provider status {provider:?}");
            assert!(report.raw.is_some());
            assert!(report.updated_at.is_some());
        }
    }

    #[tokio::test]
    async fn status_propagates_provider_failure_instead_of_guessing() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let mgr = manager_for(&server);
        let profile = caller();
        mgr.create(&profile).await.unwrap();

        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/instance/status"))
            .respond_with(ResponseTemplate::new(500).set_body_string("gateway down"))
            .mount(&server)
            .await;

        let err = mgr.status(&profile).await.unwrap_err();
        match err {
            ZapError::Gateway(GatewayError::ApiError { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "gateway down");
            }
            other => panic!("expected gateway error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connect_requires_an_initialized_instance() {
        let server = MockServer::start().await;
        let mgr = manager_for(&server);

        let err = mgr
            .connect(&caller(), &ConnectRequest { phone: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::InstanceNotFound));
        assert_eq!(
            err.to_string(),
            "Instance not found. Please initialize first."
        );
    }

    #[tokio::test]
    async fn connect_rejects_malformed_phone_before_any_upstream_call() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let mgr = manager_for(&server);
        let profile = caller();
        mgr.create(&profile).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/instance/connect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;

        for bad in ["", "   ", "+55 11 99999", "abc123"] {
            let err = mgr
                .connect(
                    &profile,
                    &ConnectRequest {
                        phone: Some(bad.to_string()),
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ZapError::Validation(_)), "phone {bad:?}");
        }
    }

    #[tokio::test]
    async fn connect_passes_phone_through_and_returns_raw_payload() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let mgr = manager_for(&server);
        let profile = caller();
        mgr.create(&profile).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/instance/connect"))
            .and(header("token", "tok-1"))
            .and(body_json(serde_json::json!({"phone": "5511999998888"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pairingCode": "ABCD-1234"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let raw = mgr
            .connect(
                &profile,
                &ConnectRequest {
                    phone: Some("5511999998888".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(raw["pairingCode"], "ABCD-1234");
    }

    #[tokio::test]
    async fn disconnect_clears_credentials_but_keeps_name() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let mgr = manager_for(&server);
        let profile = caller();
        mgr.create(&profile).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/instance/disconnect"))
            .and(header("token", "tok-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "ok"})),
            )
            .mount(&server)
            .await;

        let ack = mgr.disconnect(&profile).await.unwrap();
        assert_eq!(ack.message, "Instance disconnected");

        // After disconnect the credential pair is gone, so status is back
        // to the no-instance shape even though the name survived.
        let report = mgr.status(&profile).await.unwrap();
        assert!(!report.has_instance);
        assert_eq!(report.status, InstanceStatus::NoInstance);
    }

    #[tokio::test]
    async fn disconnect_upstream_failure_leaves_record_untouched() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let mgr = manager_for(&server);
        let profile = caller();
        mgr.create(&profile).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/instance/disconnect"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = mgr.disconnect(&profile).await.unwrap_err();
        assert!(matches!(err, ZapError::Gateway(_)));

        // Provider call failed, so no local mutation happened.
        mount_status(&server, "tok-1", "connected").await;
        let report = mgr.status(&profile).await.unwrap();
        assert!(report.has_instance);
        assert_eq!(report.status, InstanceStatus::Connected);
    }

    #[tokio::test]
    async fn pause_keeps_credentials() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let mgr = manager_for(&server);
        let profile = caller();
        mgr.create(&profile).await.unwrap();

        Mock::given(method("POST"))
            .and(path("/instance/pause"))
            .and(header("token", "tok-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "ok"})),
            )
            .mount(&server)
            .await;
        mount_status(&server, "tok-1", "disconnected").await;

        let ack = mgr.pause(&profile).await.unwrap();
        assert_eq!(ack.message, "Instance paused");

        let report = mgr.status(&profile).await.unwrap();
        assert!(report.has_instance);
    }

    #[tokio::test]
    async fn delete_resets_record_fully_and_allows_recreation() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-1", "tok-1").await;
        let mgr = manager_for(&server);
        let profile = caller();
        mgr.create(&profile).await.unwrap();

        Mock::given(method("DELETE"))
            .and(path("/instance"))
            .and(header("token", "tok-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "ok"})),
            )
            .mount(&server)
            .await;

        let ack = mgr.delete(&profile).await.unwrap();
        assert_eq!(ack.message, "Instance deleted");

        let report = mgr.status(&profile).await.unwrap();
        assert!(!report.has_instance);
        assert_eq!(report.status, InstanceStatus::NoInstance);

        // A fresh create succeeds after delete.
        server.reset().await;
        mount_init(&server, "inst-2", "tok-2").await;
        let resp = mgr.create(&profile).await.unwrap();
        assert_eq!(resp.instance_id, "inst-2");
    }

    #[tokio::test]
    async fn end_to_end_lifecycle_scenario() {
        let server = MockServer::start().await;
        mount_init(&server, "inst-x", "tok-x").await;
        let mgr = manager_for(&server);
        let profile = caller();

        // No instance yet.
        let report = mgr.status(&profile).await.unwrap();
        assert_eq!(report.status, InstanceStatus::NoInstance);

        // Create → instance id X.
        let resp = mgr.create(&profile).await.unwrap();
        assert_eq!(resp.instance_id, "inst-x");

        // Fresh instance reports "created".
        mount_status(&server, "tok-x", "initializing").await;
        let report = mgr.status(&profile).await.unwrap();
        assert!(report.has_instance);
        assert_eq!(report.status, InstanceStatus::Created);

        // Connect without phone → QR payload.
        Mock::given(method("POST"))
            .and(path("/instance/connect"))
            .and(body_json(serde_json::json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "qrcode_base64": "aGVsbG8="
            })))
            .mount(&server)
            .await;
        let raw = mgr
            .connect(&profile, &ConnectRequest { phone: None })
            .await
            .unwrap();
        assert_eq!(crate::gateway::qr_base64(&raw), Some("aGVsbG8="));

        // Provider now shows the QR waiting state.
        server.reset().await;
        mount_status(&server, "tok-x", "qrcode").await;
        let report = mgr.status(&profile).await.unwrap();
        assert_eq!(report.status, InstanceStatus::WaitingQr);

        // The user scans; provider reports connected.
        server.reset().await;
        mount_status(&server, "tok-x", "connected").await;
        let report = mgr.status(&profile).await.unwrap();
        assert_eq!(report.status, InstanceStatus::Connected);

        // Disconnect clears the pair; status falls back to no_instance.
        Mock::given(method("POST"))
            .and(path("/instance/disconnect"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "ok"})),
            )
            .mount(&server)
            .await;
        mgr.disconnect(&profile).await.unwrap();
        let report = mgr.status(&profile).await.unwrap();
        assert_eq!(report.status, InstanceStatus::NoInstance);
    }
}
