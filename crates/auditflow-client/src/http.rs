use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use auditflow_core::audit::{
    AuditOutcome, AuditRequest, AuditResult, ColumnDetection, SelectedFile, WorkbookInfo,
};
use auditflow_core::benchmark::{BenchmarkComparison, BenchmarkRequest};
use auditflow_core::errors::AuditError;
use auditflow_core::practice::PracticeSettings;
use auditflow_core::provider::{AuditEndpoint, BenchmarkEndpoint, PracticeSettingsSource};
use auditflow_settings::ApiSettings;

const AUDIT_PATH: &str = "/audit/trial-balance";
const INSPECT_PATH: &str = "/audit/inspect-workbook";
const BENCHMARK_COMPARE_PATH: &str = "/benchmarks/compare";
const BENCHMARK_INDUSTRIES_PATH: &str = "/benchmarks/industries";
const PRACTICE_SETTINGS_PATH: &str = "/settings/practice";

/// Connection parameters for [`HttpAuditClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub auth_token: Option<SecretString>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            auth_token: None,
        }
    }

    pub fn from_settings(api: &ApiSettings) -> Self {
        Self {
            base_url: api.base_url.clone(),
            connect_timeout: Duration::from_millis(api.connect_timeout_ms),
            request_timeout: Duration::from_millis(api.request_timeout_ms),
            auth_token: api.auth_token.clone(),
        }
    }
}

/// Audit service wire response. Gate branches arrive as 200s.
#[derive(Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum AuditResponse {
    Success {
        result: AuditResult,
    },
    RequiresMapping {
        detection: ColumnDetection,
    },
    RequiresWorkbookSelection {
        workbook_info: WorkbookInfo,
    },
    Error {
        #[serde(default)]
        status: Option<u16>,
        #[serde(default)]
        message: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndustriesResponse {
    Wrapped { industries: Vec<String> },
    Bare(Vec<String>),
}

/// reqwest-backed client for the audit, benchmark and practice-settings endpoints.
#[derive(Clone)]
pub struct HttpAuditClient {
    client: Client,
    base_url: String,
    auth_token: Option<SecretString>,
}

impl HttpAuditClient {
    pub fn new(config: ClientConfig) -> Result<Self, AuditError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AuditError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token.expose_secret()),
            None => req,
        }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    fn file_part(file: &SelectedFile) -> Result<Part, AuditError> {
        Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.content_type())
            .map_err(|e| AuditError::Transport(format!("failed to create multipart: {e}")))
    }

    fn audit_form(request: &AuditRequest) -> Result<Form, AuditError> {
        let mut form = Form::new()
            .part("file", Self::file_part(&request.file)?)
            .text("materiality_threshold", request.materiality_threshold.to_string());

        if let Some(mapping) = &request.column_mapping {
            let json = serde_json::to_string(mapping)
                .map_err(|e| AuditError::Decode(format!("failed to encode column mapping: {e}")))?;
            form = form.text("column_mapping", json);
        }
        if let Some(selection) = &request.sheet_selection {
            form = form.text("selected_sheet", selection.sheet_name.clone());
            if let Some(range) = &selection.range {
                form = form.text("sheet_range", range.clone());
            }
        }
        if !request.account_overrides.is_empty() {
            let json = serde_json::to_string(&request.account_overrides)
                .map_err(|e| AuditError::Decode(format!("failed to encode overrides: {e}")))?;
            form = form.text("account_overrides", json);
        }
        Ok(form)
    }
}

/// Send a request and classify transport failures.
pub(crate) async fn send(req: RequestBuilder) -> Result<Response, AuditError> {
    req.send()
        .await
        .map_err(|e| AuditError::Transport(e.to_string()))
}

/// Read a response body, mapping non-2xx statuses through the error taxonomy.
pub(crate) async fn read_body(resp: Response) -> Result<String, AuditError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AuditError::Transport(e.to_string()))?;
    if !status.is_success() {
        return Err(AuditError::from_status(status.as_u16(), &body));
    }
    Ok(body)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, AuditError> {
    serde_json::from_str(body).map_err(|e| AuditError::Decode(e.to_string()))
}

#[async_trait]
impl AuditEndpoint for HttpAuditClient {
    #[instrument(skip(self, request), fields(file = %request.file.name()))]
    async fn run_audit(&self, request: &AuditRequest) -> Result<AuditOutcome, AuditError> {
        let form = Self::audit_form(request)?;
        let req = self.authorize(self.client.post(self.url(AUDIT_PATH)).multipart(form));
        let body = read_body(send(req).await?).await?;

        match decode::<AuditResponse>(&body)? {
            AuditResponse::Success { result } => Ok(AuditOutcome::Success(result)),
            AuditResponse::RequiresMapping { detection } => {
                debug!(confidence = detection.overall_confidence, "column mapping required");
                Ok(AuditOutcome::RequiresMapping(detection))
            }
            AuditResponse::RequiresWorkbookSelection { workbook_info } => {
                debug!(sheets = workbook_info.sheets.len(), "workbook selection required");
                Ok(AuditOutcome::RequiresWorkbookSelection(workbook_info))
            }
            AuditResponse::Error { status, message } => {
                Err(AuditError::from_status(status.unwrap_or(422), &message))
            }
        }
    }

    #[instrument(skip(self, file), fields(file = %file.name()))]
    async fn inspect_workbook(&self, file: &SelectedFile) -> Result<WorkbookInfo, AuditError> {
        let form = Form::new().part("file", Self::file_part(file)?);
        let req = self.authorize(self.client.post(self.url(INSPECT_PATH)).multipart(form));
        let body = read_body(send(req).await?).await?;
        decode(&body)
    }
}

#[async_trait]
impl BenchmarkEndpoint for HttpAuditClient {
    #[instrument(skip(self, request), fields(industry = %request.industry))]
    async fn compare(&self, request: &BenchmarkRequest) -> Result<BenchmarkComparison, AuditError> {
        let req = self.authorize(
            self.client
                .post(self.url(BENCHMARK_COMPARE_PATH))
                .json(request),
        );
        let body = read_body(send(req).await?).await?;
        decode(&body)
    }

    async fn list_industries(&self) -> Result<Vec<String>, AuditError> {
        let req = self.authorize(self.client.get(self.url(BENCHMARK_INDUSTRIES_PATH)));
        let body = read_body(send(req).await?).await?;
        Ok(match decode::<IndustriesResponse>(&body)? {
            IndustriesResponse::Wrapped { industries } | IndustriesResponse::Bare(industries) => {
                industries
            }
        })
    }
}

#[async_trait]
impl PracticeSettingsSource for HttpAuditClient {
    async fn fetch_practice_settings(&self) -> Result<Option<PracticeSettings>, AuditError> {
        let req = self.authorize(self.client.get(self.url(PRACTICE_SETTINGS_PATH)));
        let resp = send(req).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = read_body(resp).await?;
        decode::<Option<PracticeSettings>>(&body)
    }
}
