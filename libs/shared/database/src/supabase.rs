use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::records::{
    Appointment, AppointmentStatus, DischargeRecord, Doctor, Invoice, InvoiceStatus, Patient,
};

use crate::store::{AppointmentFilter, CasOutcome, EntityStore, StoreError};

/// Failure classes callers need to tell apart. Carried inside `anyhow::Error`
/// and recovered with `downcast_ref`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.store_api_key().to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = auth_token.unwrap_or(&self.api_key);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", bearer))?);

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, auth_token, body, &[]).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         extra_headers: &[(&str, &str)])
                                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        for (name, value) in extra_headers {
            headers.insert(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(value)?);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(anyhow!(match status.as_u16() {
                401 | 403 => SupabaseError::Auth(error_text),
                404 => SupabaseError::NotFound(error_text),
                409 => SupabaseError::Conflict(error_text),
                code => SupabaseError::Api { status: code, body: error_text },
            }));
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

const RETURN_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");

/// `EntityStore` over the PostgREST interface. Uniqueness and conditional
/// updates are enforced by the database (see `schema.sql`).
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self { client: SupabaseClient::new(config) }
    }

    async fn select<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        self.client
            .request::<Vec<T>>(Method::GET, path, None, None)
            .await
            .map_err(backend_error)
    }

    async fn select_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        Ok(self.select::<T>(path).await?.into_iter().next())
    }

    async fn insert<T: DeserializeOwned>(&self, table: &str, row: Value) -> Result<T, StoreError> {
        let rows: Vec<T> = self
            .client
            .request_with_headers(
                Method::POST,
                &format!("/rest/v1/{}", table),
                None,
                Some(row),
                &[RETURN_REPRESENTATION],
            )
            .await
            .map_err(backend_error)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend(format!("Insert into {} returned no rows", table)))
    }

    async fn upsert<T: DeserializeOwned>(&self, table: &str, row: Value) -> Result<T, StoreError> {
        let rows: Vec<T> = self
            .client
            .request_with_headers(
                Method::POST,
                &format!("/rest/v1/{}", table),
                None,
                Some(row),
                &[("Prefer", "return=representation,resolution=merge-duplicates")],
            )
            .await
            .map_err(backend_error)?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend(format!("Upsert into {} returned no rows", table)))
    }

    /// PATCH guarded by the expected status. An empty result means the guard did
    /// not match, so the row is re-read to tell a stale status from a missing row.
    async fn conditional_status_update<T: DeserializeOwned>(
        &self,
        table: &str,
        id: Uuid,
        expected: &str,
        patch: Value,
    ) -> Result<CasOutcome<T>, StoreError> {
        let path = format!("/rest/v1/{}?id=eq.{}&status=eq.{}", table, id, expected);
        let rows: Vec<T> = self
            .client
            .request_with_headers(Method::PATCH, &path, None, Some(patch), &[RETURN_REPRESENTATION])
            .await
            .map_err(backend_error)?;

        if let Some(updated) = rows.into_iter().next() {
            return Ok(CasOutcome::Updated(updated));
        }

        match self.select_one::<T>(&format!("/rest/v1/{}?id=eq.{}", table, id)).await? {
            Some(current) => Ok(CasOutcome::Stale(current)),
            None => Ok(CasOutcome::Missing),
        }
    }
}

fn backend_error(err: anyhow::Error) -> StoreError {
    match err.downcast_ref::<SupabaseError>() {
        Some(SupabaseError::Conflict(body)) => StoreError::UniqueViolation(body.clone()),
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl EntityStore for SupabaseStore {
    async fn get_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        self.select_one(&format!("/rest/v1/doctors?id=eq.{}", id)).await
    }

    async fn find_doctor_by_user(&self, user_id: Uuid) -> Result<Option<Doctor>, StoreError> {
        self.select_one(&format!("/rest/v1/doctors?user_id=eq.{}", user_id)).await
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        self.select("/rest/v1/doctors?order=last_name.asc,first_name.asc").await
    }

    async fn save_doctor(&self, doctor: Doctor) -> Result<Doctor, StoreError> {
        self.upsert("doctors", serde_json::to_value(&doctor)?).await
    }

    async fn get_patient(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.select_one(&format!("/rest/v1/patients?id=eq.{}", id)).await
    }

    async fn find_patient_by_user(&self, user_id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.select_one(&format!("/rest/v1/patients?user_id=eq.{}", user_id)).await
    }

    async fn save_patient(&self, patient: Patient) -> Result<Patient, StoreError> {
        self.upsert("patients", serde_json::to_value(&patient)?).await
    }

    async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.select_one(&format!("/rest/v1/appointments?id=eq.{}", id)).await
    }

    async fn save_appointment(&self, appointment: Appointment) -> Result<Appointment, StoreError> {
        self.insert("appointments", serde_json::to_value(&appointment)?).await
    }

    async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let mut query = vec!["order=appointment_date.asc,appointment_time.asc".to_string()];
        if let Some(patient_id) = filter.patient_id {
            query.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = filter.doctor_id {
            query.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(status) = filter.status {
            query.push(format!("status=eq.{}", status));
        }

        self.select(&format!("/rest/v1/appointments?{}", query.join("&"))).await
    }

    async fn compare_and_set_appointment_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome<Appointment>, StoreError> {
        let patch = json!({ "status": next, "updated_at": at });
        self.conditional_status_update("appointments", id, &expected.to_string(), patch).await
    }

    async fn save_discharge(&self, record: DischargeRecord) -> Result<DischargeRecord, StoreError> {
        self.insert("discharge_records", serde_json::to_value(&record)?).await
    }

    async fn find_discharge_by_appointment(&self, appointment_id: Uuid) -> Result<Option<DischargeRecord>, StoreError> {
        self.select_one(&format!("/rest/v1/discharge_records?appointment_id=eq.{}", appointment_id)).await
    }

    async fn next_invoice_sequence(&self) -> Result<u64, StoreError> {
        let value: Value = self
            .client
            .request(Method::POST, "/rest/v1/rpc/next_invoice_number", None, Some(json!({})))
            .await
            .map_err(backend_error)?;

        value.as_u64().ok_or_else(|| {
            warn!("Unexpected invoice sequence payload: {}", value);
            StoreError::Backend(format!("Invoice sequence returned {}", value))
        })
    }

    async fn save_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError> {
        self.insert("invoices", serde_json::to_value(&invoice)?).await
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, StoreError> {
        self.select_one(&format!("/rest/v1/invoices?id=eq.{}", id)).await
    }

    async fn find_invoice_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Invoice>, StoreError> {
        self.select_one(&format!("/rest/v1/invoices?appointment_id=eq.{}", appointment_id)).await
    }

    async fn list_invoices_for_patient(&self, patient_id: Uuid) -> Result<Vec<Invoice>, StoreError> {
        self.select(&format!("/rest/v1/invoices?patient_id=eq.{}&order=created_at.asc", patient_id)).await
    }

    async fn compare_and_set_invoice_status(
        &self,
        id: Uuid,
        expected: InvoiceStatus,
        next: InvoiceStatus,
        at: DateTime<Utc>,
    ) -> Result<CasOutcome<Invoice>, StoreError> {
        let patch = if next == InvoiceStatus::Paid {
            json!({ "status": next, "paid_at": at })
        } else {
            json!({ "status": next })
        };
        self.conditional_status_update("invoices", id, &expected.to_string(), patch).await
    }
}
