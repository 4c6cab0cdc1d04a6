//! Hosted database access
//!
//! `WorkoutApi` is the seam between the workout workflow and the hosted
//! Postgres REST endpoint. `SupabaseClient` is the production implementation;
//! tests substitute an in-memory mock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

use crate::config::Config;
use crate::types::{
    CompleteSessionPayload, CompletedSet, LiftlogError, LogSetPayload, Result, Session,
    SessionKind, SessionRow, SetRow, StartSessionPayload,
};

/// Remote operations the workout workflow depends on
#[async_trait]
pub trait WorkoutApi: Send + Sync {
    /// Create a session row and return it with its server id
    async fn start_session(&self, payload: &StartSessionPayload) -> Result<Session>;

    /// Mark a session completed
    async fn complete_session(&self, payload: &CompleteSessionPayload) -> Result<Session>;

    /// Record one completed set
    async fn log_set(&self, payload: &LogSetPayload) -> Result<CompletedSet>;

    /// Sessions started within `[from, to)`, oldest first
    async fn list_sessions(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Session>>;
}

/// PostgREST client for the hosted database
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: String,
}

impl SupabaseClient {
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .api_url
            .clone()
            .ok_or_else(|| LiftlogError::Config("LIFTLOG_API_URL is not set".into()))?;
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LiftlogError::Config("LIFTLOG_API_KEY is not set".into()))?;
        let access_token = config
            .access_token
            .clone()
            .unwrap_or_else(|| api_key.clone());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LiftlogError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            access_token,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.access_token)
            .header("Prefer", "return=representation")
    }

    /// Send a request and decode the single row PostgREST returns
    async fn send_one<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let mut rows: Vec<T> = self.send(builder).await?;
        if rows.is_empty() {
            return Err(LiftlogError::Rejected {
                status: 404,
                message: "no row returned".into(),
            });
        }
        Ok(rows.swap_remove(0))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(convert_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), %body, "request rejected");
            return Err(LiftlogError::from_status(status.as_u16(), body));
        }
        response
            .json()
            .await
            .map_err(|e| LiftlogError::Parse(format!("JSON parse error: {}", e)))
    }
}

/// Map a transport-level reqwest failure onto the error taxonomy.
///
/// Only failures to reach or hear back from the server are network-class;
/// a request that could not be built would fail the same way on replay.
fn convert_error(err: reqwest::Error) -> LiftlogError {
    if err.is_builder() {
        LiftlogError::Config(format!("invalid request: {}", err))
    } else if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        LiftlogError::Network(err.to_string())
    } else if err.is_decode() {
        LiftlogError::Parse(err.to_string())
    } else {
        LiftlogError::Rejected {
            status: err.status().map_or(0, |s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Insert body for `workout_sessions`
fn session_insert(payload: &StartSessionPayload) -> serde_json::Value {
    let started_at = payload.started_at.to_rfc3339();
    match &payload.kind {
        SessionKind::Weights { day_id, day_name } => json!({
            "session_type": "weights",
            "workout_day_id": day_id,
            "name": day_name,
            "started_at": started_at,
        }),
        SessionKind::Cardio {
            template_id,
            template_name,
            distance_km,
        } => json!({
            "session_type": "cardio",
            "template_id": template_id,
            "name": template_name,
            "distance_km": distance_km,
            "started_at": started_at,
        }),
        SessionKind::Mobility {
            template_id,
            template_name,
        } => json!({
            "session_type": "mobility",
            "template_id": template_id,
            "name": template_name,
            "started_at": started_at,
        }),
    }
}

#[derive(Serialize)]
struct SessionCompletion<'a> {
    completed_at: DateTime<Utc>,
    duration_seconds: Option<u32>,
    notes: Option<&'a str>,
}

#[async_trait]
impl WorkoutApi for SupabaseClient {
    async fn start_session(&self, payload: &StartSessionPayload) -> Result<Session> {
        let url = self.table_url("workout_sessions");
        let row: SessionRow = self
            .send_one(self.request(Method::POST, &url).json(&session_insert(payload)))
            .await?;
        Session::try_from(row)
    }

    async fn complete_session(&self, payload: &CompleteSessionPayload) -> Result<Session> {
        let url = self.table_url("workout_sessions");
        let body = SessionCompletion {
            completed_at: payload.completed_at,
            duration_seconds: payload.duration_seconds,
            notes: payload.notes.as_deref(),
        };
        let row: SessionRow = self
            .send_one(
                self.request(Method::PATCH, &url)
                    .query(&[("id", format!("eq.{}", payload.session_id))])
                    .json(&body),
            )
            .await?;
        Session::try_from(row)
    }

    async fn log_set(&self, payload: &LogSetPayload) -> Result<CompletedSet> {
        let url = self.table_url("workout_sets");
        let row: SetRow = self
            .send_one(self.request(Method::POST, &url).json(payload))
            .await?;
        Ok(row.into())
    }

    async fn list_sessions(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Session>> {
        let url = self.table_url("workout_sessions");
        let rows: Vec<SessionRow> = self
            .send(self.request(Method::GET, &url).query(&[
                ("select", "*".to_string()),
                ("started_at", format!("gte.{}", from.to_rfc3339())),
                ("started_at", format!("lt.{}", to.to_rfc3339())),
                ("order", "started_at.asc".to_string()),
            ]))
            .await?;
        rows.into_iter().map(Session::try_from).collect()
    }
}
