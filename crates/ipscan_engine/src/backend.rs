use std::time::Duration;

use ipscan_core::{
    CredentialCheck, FieldValue, JobHandle, JobStatus, ProgressSnapshot, Quota, ResultRow,
};
use ipscan_logging::{scan_debug, scan_trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BackendError, BackendFailure};

#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Remote credential check. `None`, or a server without the route,
    /// falls back to the local check: any non-empty key passes.
    pub validate_path: Option<String>,
    pub user_agent: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            validate_path: None,
            user_agent: concat!("ipscan/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// The four remote operations of an analysis run.
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn validate_credential(&self, credential: &str)
        -> Result<CredentialCheck, BackendError>;

    async fn submit_job(
        &self,
        addresses: &[String],
        credential: &str,
    ) -> Result<JobHandle, BackendError>;

    async fn poll_job(&self, job: &JobHandle) -> Result<ProgressSnapshot, BackendError>;

    async fn fetch_results(&self, job: &JobHandle) -> Result<Vec<ResultRow>, BackendError>;
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    ips: String,
    api_key: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    task_id: String,
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    api_key: &'a str,
}

#[derive(Deserialize)]
struct ValidateResponse {
    valid: bool,
    #[serde(default)]
    quota: Option<QuotaBody>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct QuotaBody {
    remaining: u64,
    limit: u64,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    completed: u64,
    #[serde(default)]
    total: u64,
    #[serde(default)]
    current_ip: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: BackendSettings,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: BackendSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| BackendError::new(BackendFailure::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, BackendError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        reqwest::Url::parse(&format!("{base}/{path}"))
            .map_err(|err| BackendError::new(BackendFailure::InvalidBaseUrl, err.to_string()))
    }

    /// Sends the request and returns the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, BackendError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        scan_trace!("backend responded {} with {} bytes", status, body.len());
        if status.is_success() {
            return Ok(body.to_vec());
        }
        match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(ErrorBody { error }) => Err(BackendError::new(BackendFailure::Rejected, error)),
            Err(_) => Err(BackendError::new(
                BackendFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            )),
        }
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Vec<u8>, BackendError> {
        let body = serde_json::to_vec(payload)
            .map_err(|err| BackendError::new(BackendFailure::Decode, err.to_string()))?;
        let request = self
            .client
            .post(self.endpoint(path)?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.send(request).await
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for ReqwestBackend {
    async fn validate_credential(
        &self,
        credential: &str,
    ) -> Result<CredentialCheck, BackendError> {
        let Some(path) = self.settings.validate_path.as_deref() else {
            return Ok(local_credential_check(credential));
        };
        let body = match self
            .post_json(path, &ValidateRequest { api_key: credential })
            .await
        {
            Ok(body) => body,
            // A rejected key is an answer, not a transport failure.
            Err(err) if err.kind == BackendFailure::Rejected => {
                return Ok(CredentialCheck {
                    valid: false,
                    quota: None,
                    error: Some(err.message),
                })
            }
            Err(err) if err.kind == BackendFailure::HttpStatus(404) => {
                scan_debug!("No credential check at {}, accepting locally", path);
                return Ok(local_credential_check(credential));
            }
            Err(err) => return Err(err),
        };
        let parsed: ValidateResponse = decode(&body)?;
        Ok(CredentialCheck {
            valid: parsed.valid,
            quota: parsed.quota.map(|quota| Quota {
                remaining: quota.remaining,
                limit: quota.limit,
            }),
            error: parsed.error,
        })
    }

    async fn submit_job(
        &self,
        addresses: &[String],
        credential: &str,
    ) -> Result<JobHandle, BackendError> {
        let payload = AnalyzeRequest {
            ips: addresses.join("\n"),
            api_key: credential,
        };
        let body = self.post_json("analyze", &payload).await?;
        let parsed: AnalyzeResponse = decode(&body)?;
        scan_debug!("backend accepted {} addresses as {}", addresses.len(), parsed.task_id);
        Ok(JobHandle::new(parsed.task_id))
    }

    async fn poll_job(&self, job: &JobHandle) -> Result<ProgressSnapshot, BackendError> {
        let url = self.endpoint(&format!("status/{}", job.as_str()))?;
        let body = self.send(self.client.get(url)).await?;
        let parsed: StatusResponse = decode(&body)?;
        snapshot_from_status(parsed)
    }

    async fn fetch_results(&self, job: &JobHandle) -> Result<Vec<ResultRow>, BackendError> {
        let url = self.endpoint(&format!("results/{}", job.as_str()))?;
        let body = self.send(self.client.get(url)).await?;
        let records: Vec<serde_json::Map<String, Value>> = decode(&body)?;
        Ok(records.into_iter().map(row_from_record).collect())
    }
}

/// Used when no validation endpoint is configured.
pub fn local_credential_check(credential: &str) -> CredentialCheck {
    if credential.trim().is_empty() {
        CredentialCheck {
            valid: false,
            quota: None,
            error: Some("no API key configured".to_string()),
        }
    } else {
        CredentialCheck {
            valid: true,
            quota: None,
            error: None,
        }
    }
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, BackendError> {
    serde_json::from_slice(body)
        .map_err(|err| BackendError::new(BackendFailure::Decode, err.to_string()))
}

fn snapshot_from_status(body: StatusResponse) -> Result<ProgressSnapshot, BackendError> {
    let (status, error) = match body.status.as_str() {
        "pending" | "running" => (JobStatus::Running, None),
        "completed" => (JobStatus::Completed, None),
        "error" => (
            JobStatus::Error,
            Some(body.error.unwrap_or_else(|| "unknown error".to_string())),
        ),
        "cancelled" => (JobStatus::Error, Some("job cancelled".to_string())),
        other => {
            return Err(BackendError::new(
                BackendFailure::Decode,
                format!("unknown job status {other:?}"),
            ))
        }
    };
    Ok(ProgressSnapshot {
        status,
        completed: body.completed,
        total: body.total,
        current_address: body.current_ip.filter(|ip| !ip.is_empty()),
        error,
    })
}

fn row_from_record(record: serde_json::Map<String, Value>) -> ResultRow {
    ResultRow::new(
        record
            .into_iter()
            .map(|(name, value)| (name, field_from_json(value)))
            .collect(),
    )
}

fn field_from_json(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Missing,
        Value::Bool(b) => FieldValue::Bool(b),
        Value::Number(n) => n.as_f64().map_or(FieldValue::Missing, FieldValue::Number),
        Value::String(text) => FieldValue::Text(text),
        nested @ (Value::Array(_) | Value::Object(_)) => FieldValue::Text(nested.to_string()),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        return BackendError::new(BackendFailure::Timeout, err.to_string());
    }
    BackendError::new(BackendFailure::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> Result<ProgressSnapshot, BackendError> {
        snapshot_from_status(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn pending_reads_as_running_with_zero_progress() {
        let snapshot = status(r#"{"status": "pending", "ip_count": 3}"#).unwrap();
        assert_eq!(snapshot, ProgressSnapshot::running(0, 0));
    }

    #[test]
    fn cancelled_reads_as_error() {
        let snapshot = status(r#"{"status": "cancelled", "completed": 2, "total": 5}"#).unwrap();
        assert_eq!(snapshot.status, JobStatus::Error);
        assert_eq!(snapshot.error.as_deref(), Some("job cancelled"));
    }

    #[test]
    fn unknown_status_is_a_decode_failure() {
        let err = status(r#"{"status": "paused"}"#).unwrap_err();
        assert_eq!(err.kind, BackendFailure::Decode);
    }

    #[test]
    fn nested_json_is_kept_as_text() {
        let record = serde_json::from_str(r#"{"ip": "1.1.1.1", "ports": [80, 443], "asn": null}"#)
            .unwrap();
        let row = row_from_record(record);
        assert_eq!(row.get("ports"), &FieldValue::text("[80,443]"));
        assert!(row.get("asn").is_missing());
    }
}
