//! Header and body heuristics applied to every successful fetch.
//!
//! All rules are plain header-presence and lower-cased substring checks,
//! with no regexes, so results stay reproducible across runs.

use crate::fetcher::FetchedResponse;
use crate::types::{
    Confidence, Rating, SecurityIssue, SecurityReport, SensitiveData, SensitiveFinding,
    SensitiveKind, Severity, Technology,
};

/// Findings derived from one response. Empty parts are omitted from the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub technologies: Vec<Technology>,
    pub security: Option<SecurityReport>,
    pub sensitive_data: Option<SensitiveData>,
}

/// Security headers checked, with the issue tag and penalty for each one missing.
const SECURITY_HEADERS: &[(&str, SecurityIssue, u8)] = &[
    ("Strict-Transport-Security", SecurityIssue::MissingHsts, 10),
    ("Content-Security-Policy", SecurityIssue::MissingCsp, 10),
    ("X-Frame-Options", SecurityIssue::MissingXfo, 8),
    ("X-Content-Type-Options", SecurityIssue::MissingXcto, 7),
];

pub fn analyze(response: &FetchedResponse) -> Analysis {
    Analysis {
        technologies: detect_technologies(response),
        security: score_security(response),
        sensitive_data: detect_sensitive(&response.body),
    }
}

/// `Server` (product before the first `/`) then `X-Powered-By` verbatim.
pub fn detect_technologies(response: &FetchedResponse) -> Vec<Technology> {
    let mut techs = Vec::new();
    if let Some(server) = response.header("Server").filter(|s| !s.is_empty()) {
        let product = server.split('/').next().unwrap_or(server);
        techs.push(Technology {
            technology: product.to_string(),
            confidence: Confidence::High,
        });
    }
    if let Some(powered_by) = response.header("X-Powered-By") {
        techs.push(Technology {
            technology: powered_by.to_string(),
            confidence: Confidence::Medium,
        });
    }
    techs
}

/// Returns `None` when every checked header is present.
pub fn score_security(response: &FetchedResponse) -> Option<SecurityReport> {
    let mut score: u8 = 100;
    let mut issues = Vec::new();
    for &(header, issue, penalty) in SECURITY_HEADERS {
        if !response.has_header(header) {
            issues.push(issue);
            score -= penalty;
        }
    }
    if issues.is_empty() {
        return None;
    }
    Some(SecurityReport {
        score,
        issues,
        rating: Rating::from_score(score),
    })
}

/// Each rule fires at most once per body.
pub fn detect_sensitive(body: &str) -> Option<SensitiveData> {
    let text = body.to_lowercase();
    let mut findings = Vec::new();

    if text.contains("api_key") || text.contains("apikey") {
        findings.push(finding(SensitiveKind::ApiKey, Severity::Critical));
    }
    if text.contains('@') && text.contains('.') && text.contains("mailto:") {
        findings.push(finding(SensitiveKind::Email, Severity::Medium));
    }
    if text.contains("password") || text.contains("passwd") {
        findings.push(finding(SensitiveKind::Password, Severity::Critical));
    }
    if text.contains("secret") {
        findings.push(finding(SensitiveKind::Secret, Severity::High));
    }

    if findings.is_empty() {
        None
    } else {
        Some(SensitiveData {
            count: findings.len(),
            findings,
        })
    }
}

fn finding(kind: SensitiveKind, severity: Severity) -> SensitiveFinding {
    SensitiveFinding { kind, severity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
    use std::time::Duration;

    fn response(headers: &[(&'static str, &'static str)], body: &str) -> FetchedResponse {
        let mut map = HeaderMap::new();
        for &(k, v) in headers {
            map.insert(HeaderName::from_static(k), HeaderValue::from_static(v));
        }
        FetchedResponse {
            status: 200,
            elapsed: Duration::from_millis(1),
            byte_size: body.len() as u64,
            headers: map,
            body: body.to_string(),
            redirects: Vec::new(),
        }
    }

    const ALL_SECURITY: &[(&str, &str)] = &[
        ("strict-transport-security", "max-age=31536000"),
        ("content-security-policy", "default-src 'self'"),
        ("x-frame-options", "DENY"),
        ("x-content-type-options", "nosniff"),
    ];

    #[test]
    fn all_headers_missing_scores_65_b() {
        let report = score_security(&response(&[], "")).unwrap();
        assert_eq!(report.score, 65);
        assert_eq!(report.rating, Rating::B);
        assert_eq!(
            report.issues,
            vec![
                SecurityIssue::MissingHsts,
                SecurityIssue::MissingCsp,
                SecurityIssue::MissingXfo,
                SecurityIssue::MissingXcto,
            ]
        );
    }

    #[test]
    fn all_headers_present_omits_block() {
        assert!(score_security(&response(ALL_SECURITY, "")).is_none());
    }

    #[test]
    fn partial_headers_deduct_only_missing() {
        let report = score_security(&response(&ALL_SECURITY[..2], "")).unwrap();
        assert_eq!(report.score, 85);
        assert_eq!(report.rating, Rating::A);
        assert_eq!(
            report.issues,
            vec![SecurityIssue::MissingXfo, SecurityIssue::MissingXcto]
        );
    }

    #[test]
    fn server_and_powered_by() {
        let techs = detect_technologies(&response(
            &[("server", "nginx/1.25.3"), ("x-powered-by", "PHP/8.2")],
            "",
        ));
        assert_eq!(
            techs,
            vec![
                Technology {
                    technology: "nginx".into(),
                    confidence: Confidence::High
                },
                Technology {
                    technology: "PHP/8.2".into(),
                    confidence: Confidence::Medium
                },
            ]
        );
        assert!(detect_technologies(&response(&[], "")).is_empty());
    }

    #[test]
    fn secret_only_yields_single_high_finding() {
        let data = detect_sensitive("Top SECRET stuff, repeated secret secret").unwrap();
        assert_eq!(data.count, 1);
        assert_eq!(
            data.findings,
            vec![finding(SensitiveKind::Secret, Severity::High)]
        );
    }

    #[test]
    fn email_needs_all_three_markers() {
        assert!(detect_sensitive("contact admin@example.com").is_none());
        let data = detect_sensitive(r#"<a href="mailto:admin@example.com">"#).unwrap();
        assert_eq!(data.findings[0].kind, SensitiveKind::Email);
    }

    #[test]
    fn rules_fire_in_fixed_order() {
        let body = "APIKEY=1 passwd=2 secret=3 mailto:x@y.z";
        let kinds: Vec<_> = detect_sensitive(body)
            .unwrap()
            .findings
            .into_iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                SensitiveKind::ApiKey,
                SensitiveKind::Email,
                SensitiveKind::Password,
                SensitiveKind::Secret,
            ]
        );
    }

    #[test]
    fn clean_response_has_no_findings() {
        let analysis = analyze(&response(ALL_SECURITY, "<html>hello</html>"));
        assert_eq!(analysis, Analysis::default());
    }
}
