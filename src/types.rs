use ::time::{format_description::well_known, OffsetDateTime};
use serde::{Deserialize, Serialize};

use crate::analyzer::Analysis;
use crate::fetcher::FetchedResponse;

/// One URL to probe plus the HTTP method used for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub url: String,
    pub method: String,
}

impl ScanTarget {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
        }
    }
}

/// One intermediate response traversed before the final one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    pub url: String,
    pub status: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Technology {
    pub technology: String,
    pub confidence: Confidence,
}

/// Missing security header, in check order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SecurityIssue {
    MissingHsts,
    MissingCsp,
    MissingXfo,
    MissingXcto,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    #[serde(rename = "A - Excellent")]
    A,
    #[serde(rename = "B - Good")]
    B,
    #[serde(rename = "C - Fair")]
    C,
    #[serde(rename = "D - Poor")]
    D,
    #[serde(rename = "F - Critical")]
    F,
}

impl Rating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Rating::A,
            60..=79 => Rating::B,
            40..=59 => Rating::C,
            20..=39 => Rating::D,
            _ => Rating::F,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::A => "A - Excellent",
            Rating::B => "B - Good",
            Rating::C => "C - Fair",
            Rating::D => "D - Poor",
            Rating::F => "F - Critical",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SecurityReport {
    pub score: u8,
    pub issues: Vec<SecurityIssue>,
    pub rating: Rating,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveKind {
    ApiKey,
    Email,
    Password,
    Secret,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SensitiveFinding {
    #[serde(rename = "type")]
    pub kind: SensitiveKind,
    pub severity: Severity,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SensitiveData {
    pub count: usize,
    pub findings: Vec<SensitiveFinding>,
}

/// Outcome of probing one `ScanTarget`, serialized as one JSONL record.
///
/// Either a success (real HTTP status, `error` absent) or a transport
/// failure (`status == 0`, `error` present). Build it through
/// [`ScanResult::success`] or [`ScanResult::failure`] to keep that split.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub url: String,
    pub method: String,
    pub status: u16,
    #[serde(rename = "time")]
    pub elapsed_seconds: f64,
    #[serde(rename = "size", default, skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_count: Option<usize>,
    #[serde(rename = "redirect_chain", default, skip_serializing_if = "Vec::is_empty")]
    pub redirects: Vec<RedirectHop>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technologies: Vec<Technology>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitive_data: Option<SensitiveData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    pub fn success(target: &ScanTarget, response: FetchedResponse, analysis: Analysis) -> Self {
        let redirect_count = (!response.redirects.is_empty()).then_some(response.redirects.len());
        Self {
            url: target.url.clone(),
            method: target.method.clone(),
            status: response.status,
            elapsed_seconds: round_millis(response.elapsed.as_secs_f64()),
            byte_size: Some(response.byte_size),
            content_type: Some(response.content_type().unwrap_or_default().to_string()),
            timestamp: now_rfc3339(),
            redirect_count,
            redirects: response.redirects,
            technologies: analysis.technologies,
            security: analysis.security,
            sensitive_data: analysis.sensitive_data,
            error: None,
        }
    }

    pub fn failure(target: &ScanTarget, elapsed_seconds: f64, error: impl Into<String>) -> Self {
        Self {
            url: target.url.clone(),
            method: target.method.clone(),
            status: 0,
            elapsed_seconds: round_millis(elapsed_seconds),
            byte_size: None,
            content_type: None,
            timestamp: now_rfc3339(),
            redirect_count: None,
            redirects: Vec::new(),
            technologies: Vec::new(),
            security: None,
            sensitive_data: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == 0
    }
}

fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// RFC3339 UTC timestamp for result records.
pub fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
