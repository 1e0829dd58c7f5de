// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed wrappers for the backend endpoints.
//!
//! Auth exchanges are decoded into concrete types because this crate acts on
//! them. Everything else is returned as `serde_json::Value`; the backend owns
//! those schemas.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::credential::{CredentialKey, CredentialPair};
use crate::error::GatewayError;
use crate::gateway::GatewayClient;
use crate::transport::ApiRequest;

/// Response to login and SSO exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<Value>,
}

impl LoginResponse {
    pub fn pair(&self) -> CredentialPair {
        CredentialPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Filters for the patient listing.
#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    /// Balance status, e.g. `outstanding`, `paid`.
    pub status: Option<String>,
    /// Name / account number search text.
    pub search: Option<String>,
    pub page: Option<u32>,
}

/// Content type for an invoice upload, by file extension.
///
/// Only CSV, XLSX and PDF exports are accepted by the backend.
pub fn invoice_content_type(path: &Path) -> Result<&'static str, GatewayError> {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => Ok("text/csv"),
        Some("xlsx") => Ok("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        Some("pdf") => Ok("application/pdf"),
        _ => Err(GatewayError::InvalidRequest(format!(
            "unsupported invoice file {}: expected .csv, .xlsx or .pdf",
            path.display()
        ))),
    }
}

/// Feature API over one shared [`GatewayClient`].
#[derive(Clone)]
pub struct ArApi {
    gateway: Arc<GatewayClient>,
}

impl ArApi {
    pub fn new(gateway: Arc<GatewayClient>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<GatewayClient> {
        &self.gateway
    }

    /// `POST /auth/login`; stores the issued pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, GatewayError> {
        let req = ApiRequest::post("/auth/login")
            .json(json!({ "email": email, "password": password }))
            .anonymous();
        let login: LoginResponse = self.gateway.request_json(req).await?;
        self.gateway.establish_session(&login.pair(), login.user.as_ref());
        Ok(login)
    }

    /// `POST /auth/sso/exchange`; trades an identity-provider token for a pair.
    pub async fn exchange_sso(&self, token: &str) -> Result<LoginResponse, GatewayError> {
        let req =
            ApiRequest::post("/auth/sso/exchange").json(json!({ "token": token })).anonymous();
        let login: LoginResponse = self.gateway.request_json(req).await?;
        self.gateway.establish_session(&login.pair(), login.user.as_ref());
        Ok(login)
    }

    /// Tell the backend (best effort), then wipe local credentials regardless.
    pub async fn logout(&self) -> Result<(), GatewayError> {
        if self.gateway.has_session() {
            let refresh_token = self.gateway.store().get(CredentialKey::RefreshToken);
            let req = ApiRequest::post("/auth/logout")
                .json(json!({ "refresh_token": refresh_token }))
                .anonymous()
                .bearer(self.gateway.store().get(CredentialKey::AccessToken));
            if let Err(e) = self.gateway.request(req).await {
                tracing::debug!(err = %e, "backend logout failed, clearing local session anyway");
            }
        }
        self.gateway.end_session();
        Ok(())
    }

    /// `GET /auth/me`.
    pub async fn current_user(&self) -> Result<Value, GatewayError> {
        self.gateway.request_json(ApiRequest::get("/auth/me")).await
    }

    /// Profile cached at login, without a network call.
    pub fn cached_user(&self) -> Option<Value> {
        let raw = self.gateway.store().get(CredentialKey::User)?;
        serde_json::from_str(&raw).ok()
    }

    /// `GET /patients`.
    pub async fn list_patients(&self, filter: &PatientFilter) -> Result<Value, GatewayError> {
        let mut req = ApiRequest::get("/patients");
        if let Some(ref status) = filter.status {
            req = req.query("status", status);
        }
        if let Some(ref search) = filter.search {
            req = req.query("search", search);
        }
        if let Some(page) = filter.page {
            req = req.query("page", page.to_string());
        }
        self.gateway.request_json(req).await
    }

    /// `GET /patients/{id}`.
    pub async fn patient(&self, id: &str) -> Result<Value, GatewayError> {
        self.gateway.request_json(ApiRequest::get(format!("/patients/{id}"))).await
    }

    /// `POST /invoices/upload` with the file as multipart field `file`.
    pub async fn upload_invoices(&self, path: &Path) -> Result<Value, GatewayError> {
        let content_type = invoice_content_type(path)?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            GatewayError::InvalidRequest(format!("failed to read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "invoices".to_owned());

        tracing::debug!(file = %file_name, size = bytes.len(), "uploading invoices");
        let req = ApiRequest::post("/invoices/upload").file("file", file_name, content_type, bytes);
        self.gateway.request_json(req).await
    }

    /// `POST /calls`; asks the backend to place an outbound call.
    pub async fn initiate_call(&self, patient_id: &str) -> Result<Value, GatewayError> {
        let req = ApiRequest::post("/calls").json(json!({ "patient_id": patient_id }));
        self.gateway.request_json(req).await
    }

    /// `GET /calls`, optionally for one patient.
    pub async fn call_history(&self, patient_id: Option<&str>) -> Result<Value, GatewayError> {
        let mut req = ApiRequest::get("/calls");
        if let Some(id) = patient_id {
            req = req.query("patient_id", id);
        }
        self.gateway.request_json(req).await
    }

    /// `GET /dashboard/stats`.
    pub async fn dashboard_stats(&self) -> Result<Value, GatewayError> {
        self.gateway.request_json(ApiRequest::get("/dashboard/stats")).await
    }

    /// `GET /users`.
    pub async fn list_users(&self) -> Result<Value, GatewayError> {
        self.gateway.request_json(ApiRequest::get("/users")).await
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
