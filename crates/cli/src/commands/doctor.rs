use aurum_core::config::{AppConfig, LoadOptions};
use aurum_core::Catalog;
use serde::Serialize;

use super::{escape_json, CommandResult, EXIT_CONFIG};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exits non-zero only when a check fails; a missing API key is a warning because
/// the storefront still serves fallback prices.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { EXIT_CONFIG } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_catalog(&config));
            checks.push(check_api_key(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["catalog_load", "api_key_presence"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let (overall_status, summary) = if any_fail {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if all_pass {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    } else {
        (CheckStatus::Warn, "doctor: ready with warnings")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    match Catalog::resolve(&config.catalog) {
        Ok((catalog, source)) if !catalog.is_empty() => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Pass,
            details: format!("{} products loaded from {source:?}", catalog.len()),
        },
        Ok((_, source)) => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: format!("catalog from {source:?} has no products"),
        },
        Err(error) => DoctorCheck {
            name: "catalog_load",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_api_key(config: &AppConfig) -> DoctorCheck {
    let spot = &config.spot_price;
    if spot.has_api_key() {
        return DoctorCheck {
            name: "api_key_presence",
            status: CheckStatus::Pass,
            details: format!("live {} prices from {}", spot.commodity, spot.base_url),
        };
    }

    match spot.fallback() {
        Some(price) => DoctorCheck {
            name: "api_key_presence",
            status: CheckStatus::Warn,
            details: format!("no api key configured; serving fallback price {price}/g"),
        },
        None => DoctorCheck {
            name: "api_key_presence",
            status: CheckStatus::Fail,
            details: "no api key configured and fallback pricing is disabled".to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
