//! Image vulnerability scanning via the trivy CLI. Invoked on demand from
//! the HTTP layer, never on the monitoring tick path.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

/// Scan results change rarely for a fixed image digest; repeated dashboard
/// loads should not re-run the scanner.
const CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scanner binary not available: {0}")]
    NotInstalled(String),
    #[error("scan failed: {0}")]
    Failed(String),
    #[error("could not parse scanner output: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VulnerabilitySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityFinding {
    pub id: String,
    pub package: String,
    pub installed_version: String,
    pub fixed_version: Option<String>,
    pub severity: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub image: String,
    pub severity_filter: String,
    pub summary: VulnerabilitySummary,
    pub findings: Vec<VulnerabilityFinding>,
    pub scanned_at: DateTime<Utc>,
}

// Shapes of the trivy JSON report, limited to the fields the dashboard uses.
#[derive(Debug, Deserialize)]
struct TrivyReport {
    #[serde(rename = "Results", default)]
    results: Vec<TrivyResult>,
}

#[derive(Debug, Deserialize)]
struct TrivyResult {
    #[serde(rename = "Vulnerabilities", default)]
    vulnerabilities: Vec<TrivyVulnerability>,
}

#[derive(Debug, Deserialize)]
struct TrivyVulnerability {
    #[serde(rename = "VulnerabilityID")]
    id: String,
    #[serde(rename = "PkgName", default)]
    pkg_name: String,
    #[serde(rename = "InstalledVersion", default)]
    installed_version: String,
    #[serde(rename = "FixedVersion")]
    fixed_version: Option<String>,
    #[serde(rename = "Severity", default)]
    severity: String,
    #[serde(rename = "Title")]
    title: Option<String>,
}

/// Wraps the trivy CLI with an in-memory TTL cache.
pub struct ScannerService {
    binary: String,
    cache: Mutex<HashMap<String, (Instant, ScanReport)>>,
}

impl Default for ScannerService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScannerService {
    pub fn new() -> Self {
        ScannerService {
            binary: std::env::var("TRIVY_PATH").unwrap_or_else(|_| "trivy".to_string()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    pub async fn scan_image(&self, image: &str, severity: &str) -> Result<ScanReport, ScanError> {
        let cache_key = format!("{image}|{severity}");
        {
            let cache = self.cache.lock().await;
            if let Some((at, report)) = cache.get(&cache_key) {
                if at.elapsed() < CACHE_TTL {
                    debug!(image, "serving cached scan report");
                    return Ok(report.clone());
                }
            }
        }

        let output = Command::new(&self.binary)
            .args([
                "image",
                "--quiet",
                "--format",
                "json",
                "--severity",
                severity,
                image,
            ])
            .output()
            .await
            .map_err(|e| ScanError::NotInstalled(e.to_string()))?;

        if !output.status.success() {
            return Err(ScanError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let report = parse_report(image, severity, &String::from_utf8_lossy(&output.stdout))?;
        self.cache
            .lock()
            .await
            .insert(cache_key, (Instant::now(), report.clone()));
        Ok(report)
    }
}

fn parse_report(image: &str, severity: &str, raw: &str) -> Result<ScanReport, ScanError> {
    let parsed: TrivyReport = serde_json::from_str(raw)?;

    let mut summary = VulnerabilitySummary::default();
    let mut findings = Vec::new();
    for result in parsed.results {
        for vuln in result.vulnerabilities {
            match vuln.severity.as_str() {
                "CRITICAL" => summary.critical += 1,
                "HIGH" => summary.high += 1,
                "MEDIUM" => summary.medium += 1,
                "LOW" => summary.low += 1,
                _ => summary.unknown += 1,
            }
            findings.push(VulnerabilityFinding {
                id: vuln.id,
                package: vuln.pkg_name,
                installed_version: vuln.installed_version,
                fixed_version: vuln.fixed_version,
                severity: vuln.severity,
                title: vuln.title,
            });
        }
    }

    Ok(ScanReport {
        image: image.to_string(),
        severity_filter: severity.to_string(),
        summary,
        findings,
        scanned_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Results": [
            {
                "Target": "alpine:3.18",
                "Vulnerabilities": [
                    {
                        "VulnerabilityID": "CVE-2023-0001",
                        "PkgName": "openssl",
                        "InstalledVersion": "3.0.8-r0",
                        "FixedVersion": "3.0.9-r0",
                        "Severity": "CRITICAL",
                        "Title": "example critical issue"
                    },
                    {
                        "VulnerabilityID": "CVE-2023-0002",
                        "PkgName": "zlib",
                        "InstalledVersion": "1.2.13-r0",
                        "Severity": "HIGH"
                    }
                ]
            },
            { "Target": "empty-layer" }
        ]
    }"#;

    #[test]
    fn parses_findings_and_counts_by_severity() {
        let report = parse_report("alpine:3.18", "CRITICAL,HIGH", SAMPLE).unwrap();
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.summary.critical, 1);
        assert_eq!(report.summary.high, 1);
        assert_eq!(report.summary.medium, 0);
        assert_eq!(report.findings[0].id, "CVE-2023-0001");
        assert_eq!(report.findings[1].fixed_version, None);
    }

    #[test]
    fn empty_report_yields_empty_summary() {
        let report = parse_report("scratch", "CRITICAL", "{}").unwrap();
        assert!(report.findings.is_empty());
        assert_eq!(report.summary.critical, 0);
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        assert!(matches!(
            parse_report("img", "HIGH", "not json"),
            Err(ScanError::Parse(_))
        ));
    }
}
