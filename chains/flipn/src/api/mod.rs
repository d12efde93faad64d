//! FlipN HTTP API client.
//!
//! Every response is wrapped in `{code, message, data}`; `code == 0` means
//! success. The like endpoint is the exception and may answer with a bare
//! array.

use crate::config::FlipnConfig;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use core_logic::{DecodedKeypair, NetworkError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const AUTH_ENDPOINT: &str = "/account/token";
const LIKE_ENDPOINT: &str = "/project/like";
const PROJECT_ENDPOINT: &str = "/project";
const TRENDS_ENDPOINT: &str = "/project/trends/list";
const ESTIMATE_ENDPOINT: &str = "/estimate";
const BUY_ENDPOINT: &str = "/buy";

/// Longest response body kept in an error message.
const MAX_ERROR_BODY: usize = 300;

/// Message signed to obtain an auth token.
pub fn login_message(time_ms: i64) -> String {
    format!("login FlipN,time:{}", time_ms)
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default, alias = "msg")]
    message: Option<String>,
    #[serde(default)]
    data: Value,
}

/// One page of the trending project list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPage {
    pub projects: Vec<Value>,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuyRequest<'a> {
    in_number: f64,
    in_type: &'a str,
    owner: &'a str,
    token_address: &'a str,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Clone)]
pub struct FlipnClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl FlipnClient {
    pub fn new(config: &FlipnConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&config.api_origin).context("Invalid API origin")?,
        );
        headers.insert(
            REFERER,
            HeaderValue::from_str(&config.api_referer).context("Invalid API referer")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let timeout = config.request_timeout();
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Signs the login message and exchanges it for a bearer token.
    pub async fn authenticate(&self, keypair: &DecodedKeypair) -> Result<String, NetworkError> {
        let time = Utc::now().timestamp_millis();
        let signature = STANDARD.encode(keypair.sign(login_message(time).as_bytes()).to_bytes());

        let request = self.http.get(self.url(AUTH_ENDPOINT)).query(&[
            ("address", keypair.address()),
            ("signature", signature.as_str()),
            ("time", time.to_string().as_str()),
        ]);
        let body = self.send(AUTH_ENDPOINT, request).await?;

        let envelope = parse_envelope(AUTH_ENDPOINT, body)?;
        match envelope.data.as_str().filter(|t| !t.is_empty()) {
            Some(token) => {
                debug!("Authenticated {}", keypair.address());
                Ok(token.to_string())
            }
            None => Err(NetworkError::InvalidResponse {
                endpoint: AUTH_ENDPOINT.to_string(),
                reason: format!(
                    "no token in response (code {}: {})",
                    envelope.code,
                    envelope.message.unwrap_or_default()
                ),
            }),
        }
    }

    /// Likes a project. Returns the raw response body.
    pub async fn like_project(&self, token: &str, project_id: &str) -> Result<Value, NetworkError> {
        let request = self
            .http
            .post(self.url(LIKE_ENDPOINT))
            .query(&[("id", project_id)])
            .header(AUTHORIZATION, token)
            .body("");
        let body = self.send(LIKE_ENDPOINT, request).await?;

        match &body {
            Value::Array(_) => debug!("Like accepted for {}", project_id),
            Value::Object(map) if map.get("code").and_then(Value::as_i64) == Some(0) => {
                debug!("Like accepted for {} (code 0)", project_id)
            }
            other => warn!(
                "Like for {} returned an unexpected body: {}",
                project_id,
                truncate(&other.to_string())
            ),
        }
        Ok(body)
    }

    /// Projects registered for a token address. Null data means none.
    pub async fn projects(&self, token: &str, address: &str) -> Result<Vec<Value>, NetworkError> {
        let request = self
            .http
            .get(self.url(PROJECT_ENDPOINT))
            .query(&[("address", address)])
            .header(AUTHORIZATION, token);
        let envelope = success(PROJECT_ENDPOINT, self.send(PROJECT_ENDPOINT, request).await?)?;

        match envelope.data {
            Value::Array(projects) => Ok(projects),
            Value::Null => Ok(Vec::new()),
            other => Err(NetworkError::InvalidResponse {
                endpoint: PROJECT_ENDPOINT.to_string(),
                reason: format!("expected a project array, got {}", truncate(&other.to_string())),
            }),
        }
    }

    pub async fn trends(
        &self,
        token: &str,
        page: u32,
        limit: u32,
    ) -> Result<ProjectPage, NetworkError> {
        let request = self
            .http
            .get(self.url(TRENDS_ENDPOINT))
            .query(&[("limit", limit), ("page", page)])
            .header(AUTHORIZATION, token);
        let envelope = success(TRENDS_ENDPOINT, self.send(TRENDS_ENDPOINT, request).await?)?;

        let projects = match envelope.data.get("list") {
            Some(Value::Array(list)) => list.clone(),
            _ => {
                warn!("Trends response has no project list");
                Vec::new()
            }
        };
        Ok(ProjectPage {
            has_more: projects.len() == limit as usize,
            projects,
            page,
            limit,
        })
    }

    /// Expected token output for spending `sol_amount`.
    pub async fn estimate(
        &self,
        owner: &str,
        token_address: &str,
        sol_amount: f64,
    ) -> Result<f64, NetworkError> {
        let request = self.http.get(self.url(ESTIMATE_ENDPOINT)).query(&[
            ("inNumber", sol_amount.to_string().as_str()),
            ("inType", "sol"),
            ("owner", owner),
            ("tokenAddress", token_address),
            ("type", "1"),
        ]);
        let envelope = success(ESTIMATE_ENDPOINT, self.send(ESTIMATE_ENDPOINT, request).await?)?;

        let amount = envelope.data.get("estimatedAmount");
        amount
            .and_then(|v| v.as_f64().or_else(|| v.as_str()?.trim().parse().ok()))
            .ok_or_else(|| NetworkError::InvalidResponse {
                endpoint: ESTIMATE_ENDPOINT.to_string(),
                reason: "missing estimatedAmount".to_string(),
            })
    }

    /// Requests an unsigned buy transaction, returned base64 encoded.
    pub async fn buy_transaction(
        &self,
        owner: &str,
        token_address: &str,
        sol_amount: f64,
    ) -> Result<String, NetworkError> {
        let payload = BuyRequest {
            in_number: sol_amount,
            in_type: "sol",
            owner,
            token_address,
            kind: 1,
        };
        let request = self.http.post(self.url(BUY_ENDPOINT)).json(&payload);
        let envelope = success(BUY_ENDPOINT, self.send(BUY_ENDPOINT, request).await?)?;

        envelope
            .data
            .get("transaction")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| NetworkError::InvalidResponse {
                endpoint: BUY_ENDPOINT.to_string(),
                reason: "missing transaction".to_string(),
            })
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Value, NetworkError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(endpoint, self.timeout, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, self.timeout, e))?;

        if !status.is_success() {
            return Err(NetworkError::HttpError {
                status_code: status.as_u16(),
                endpoint: endpoint.to_string(),
                body: truncate(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("invalid JSON ({}): {}", e, truncate(&text)),
        })
    }
}

fn parse_envelope(endpoint: &str, body: Value) -> Result<Envelope, NetworkError> {
    serde_json::from_value(body).map_err(|e| NetworkError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: format!("unexpected response shape: {}", e),
    })
}

fn success(endpoint: &str, body: Value) -> Result<Envelope, NetworkError> {
    let envelope = parse_envelope(endpoint, body)?;
    if envelope.code != 0 {
        return Err(NetworkError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!(
                "API returned code {}: {}",
                envelope.code,
                envelope.message.as_deref().unwrap_or("no message")
            ),
        });
    }
    Ok(envelope)
}

fn transport_error(endpoint: &str, timeout: Duration, e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
            endpoint: endpoint.to_string(),
        }
    } else {
        NetworkError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ERROR_BODY).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_message() {
        assert_eq!(login_message(1700000000000), "login FlipN,time:1700000000000");
    }

    #[test]
    fn test_success_rejects_nonzero_code() {
        let err = success(BUY_ENDPOINT, json!({"code": 500, "message": "sold out"})).unwrap_err();
        match err {
            NetworkError::InvalidResponse { endpoint, reason } => {
                assert_eq!(endpoint, BUY_ENDPOINT);
                assert!(reason.contains("500"));
                assert!(reason.contains("sold out"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_accepts_msg_alias_and_missing_data() {
        let envelope = success(PROJECT_ENDPOINT, json!({"code": 0, "msg": "ok"})).unwrap();
        assert_eq!(envelope.message.as_deref(), Some("ok"));
        assert!(envelope.data.is_null());
    }

    #[test]
    fn test_buy_request_shape() {
        let body = serde_json::to_value(BuyRequest {
            in_number: 0.05,
            in_type: "sol",
            owner: "Owner",
            token_address: "Token",
            kind: 1,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"inNumber": 0.05, "inType": "sol", "owner": "Owner", "tokenAddress": "Token", "type": 1})
        );
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(truncate(&long).len(), MAX_ERROR_BODY + 3);
        assert_eq!(truncate("short"), "short");
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = FlipnConfig {
            api_base_url: "http://localhost:9000/api/".to_string(),
            ..FlipnConfig::default()
        };
        let client = FlipnClient::new(&config).unwrap();
        assert_eq!(client.url(BUY_ENDPOINT), "http://localhost:9000/api/buy");
    }
}
