//! ---
//! mth_section: "11-test-harness"
//! mth_subsection: "05-reporting"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Run report aggregation and rendering."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::failure::{Failure, ScenarioError, Stage};

/// Every scenario and template validation passed.
pub const EXIT_PASS: u8 = 0;
/// At least one assertion failed or a scenario aborted.
pub const EXIT_FAILURES: u8 = 1;
/// The harness itself could not run (bad fixtures, config or filters).
pub const EXIT_HARNESS_ERROR: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Terminal state of one scenario.
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScenarioState {
    Completed { verdict: Verdict },
    Aborted { stage: Stage, error: ScenarioError },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub module_id: String,
    pub scenario: String,
    #[serde(flatten)]
    pub state: ScenarioState,
    pub resolved_modules: Vec<String>,
    pub failures: Vec<Failure>,
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    pub fn completed(
        module_id: impl Into<String>,
        scenario: impl Into<String>,
        resolved_modules: Vec<String>,
        failures: Vec<Failure>,
        elapsed_ms: u64,
    ) -> Self {
        let verdict = if failures.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        Self {
            module_id: module_id.into(),
            scenario: scenario.into(),
            state: ScenarioState::Completed { verdict },
            resolved_modules,
            failures,
            elapsed_ms,
        }
    }

    pub fn aborted(
        module_id: impl Into<String>,
        scenario: impl Into<String>,
        stage: Stage,
        error: ScenarioError,
        resolved_modules: Vec<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            scenario: scenario.into(),
            state: ScenarioState::Aborted { stage, error },
            resolved_modules,
            failures: Vec::new(),
            elapsed_ms,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(
            self.state,
            ScenarioState::Completed {
                verdict: Verdict::Pass
            }
        )
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.state, ScenarioState::Aborted { .. })
    }

    pub fn aborted_stage(&self) -> Option<Stage> {
        match &self.state {
            ScenarioState::Aborted { stage, .. } => Some(*stage),
            ScenarioState::Completed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ScenarioError> {
        match &self.state {
            ScenarioState::Aborted { error, .. } => Some(error),
            ScenarioState::Completed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateReport {
    pub module_id: String,
    pub name: String,
    pub template: String,
    pub reason: String,
    pub failures: Vec<Failure>,
}

impl TemplateReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub scenarios_passed: usize,
    pub scenarios_failed: usize,
    pub scenarios_aborted: usize,
    pub templates_passed: usize,
    pub templates_failed: usize,
    pub total_failures: usize,
}

impl Summary {
    fn tally(scenarios: &[ScenarioReport], templates: &[TemplateReport]) -> Self {
        let mut summary = Summary::default();
        for scenario in scenarios {
            match &scenario.state {
                ScenarioState::Completed {
                    verdict: Verdict::Pass,
                } => summary.scenarios_passed += 1,
                ScenarioState::Completed {
                    verdict: Verdict::Fail,
                } => summary.scenarios_failed += 1,
                ScenarioState::Aborted { .. } => summary.scenarios_aborted += 1,
            }
            summary.total_failures += scenario.failures.len();
        }
        for template in templates {
            if template.passed() {
                summary.templates_passed += 1;
            } else {
                summary.templates_failed += 1;
            }
            summary.total_failures += template.failures.len();
        }
        summary
    }

    pub fn is_clean(&self) -> bool {
        self.scenarios_failed == 0 && self.scenarios_aborted == 0 && self.templates_failed == 0
    }
}

/// A failure tagged with where it came from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedFailure<'a> {
    pub module_id: &'a str,
    /// Scenario or template validation name.
    pub source: &'a str,
    #[serde(flatten)]
    pub failure: &'a Failure,
}

/// Aggregated outcome of one harness run. Scenario order matches the order
/// scenarios were submitted in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    started_at: DateTime<Utc>,
    summary: Summary,
    scenarios: Vec<ScenarioReport>,
    templates: Vec<TemplateReport>,
}

impl Report {
    pub fn new(
        started_at: DateTime<Utc>,
        scenarios: Vec<ScenarioReport>,
        templates: Vec<TemplateReport>,
    ) -> Self {
        let summary = Summary::tally(&scenarios, &templates);
        Self {
            started_at,
            summary,
            scenarios,
            templates,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn scenarios(&self) -> &[ScenarioReport] {
        &self.scenarios
    }

    pub fn templates(&self) -> &[TemplateReport] {
        &self.templates
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.scenario == name)
    }

    /// Every failure in the run, scenarios first, then templates.
    pub fn failures(&self) -> Vec<TaggedFailure<'_>> {
        let scenario_failures = self.scenarios.iter().flat_map(|s| {
            s.failures.iter().map(move |failure| TaggedFailure {
                module_id: &s.module_id,
                source: &s.scenario,
                failure,
            })
        });
        let template_failures = self.templates.iter().flat_map(|t| {
            t.failures.iter().map(move |failure| TaggedFailure {
                module_id: &t.module_id,
                source: &t.name,
                failure,
            })
        });
        scenario_failures.chain(template_failures).collect()
    }

    pub fn exit_code(&self) -> u8 {
        if self.summary.is_clean() {
            EXIT_PASS
        } else {
            EXIT_FAILURES
        }
    }

    pub fn render_text(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Document<'a> {
            #[serde(flatten)]
            report: &'a Report,
            failures: Vec<TaggedFailure<'a>>,
        }
        serde_json::to_string_pretty(&Document {
            report: self,
            failures: self.failures(),
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "harness run started {}",
            self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        if !self.templates.is_empty() {
            writeln!(f, "templates:")?;
            for template in &self.templates {
                let tag = if template.passed() { "PASS " } else { "FAIL " };
                writeln!(f, "  {tag} {}/{}", template.module_id, template.name)?;
                if !template.passed() {
                    writeln!(f, "          reason: {}", template.reason)?;
                }
                for failure in &template.failures {
                    writeln!(f, "          {failure}")?;
                }
            }
        }
        if !self.scenarios.is_empty() {
            writeln!(f, "scenarios:")?;
            for scenario in &self.scenarios {
                match &scenario.state {
                    ScenarioState::Completed { verdict } => {
                        let tag = match verdict {
                            Verdict::Pass => "PASS ",
                            Verdict::Fail => "FAIL ",
                        };
                        writeln!(
                            f,
                            "  {tag} {}/{} ({} ms)",
                            scenario.module_id, scenario.scenario, scenario.elapsed_ms
                        )?;
                    }
                    ScenarioState::Aborted { stage, error } => {
                        writeln!(
                            f,
                            "  ABORT {}/{} at {stage}: {error}",
                            scenario.module_id, scenario.scenario
                        )?;
                    }
                }
                for failure in &scenario.failures {
                    writeln!(f, "          {failure}")?;
                }
            }
        }
        let s = &self.summary;
        write!(
            f,
            "summary: scenarios {} passed, {} failed, {} aborted; templates {} passed, {} failed; {} failure(s)",
            s.scenarios_passed,
            s.scenarios_failed,
            s.scenarios_aborted,
            s.templates_passed,
            s.templates_failed,
            s.total_failures
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(file: &str, substring: &str) -> Failure {
        Failure::MissingSubstring {
            file: file.into(),
            substring: substring.into(),
        }
    }

    fn sample() -> Report {
        let scenarios = vec![
            ScenarioReport::completed(
                "extension-stripe",
                "stripe-react-checkout",
                vec!["extension-stripe".into()],
                Vec::new(),
                12,
            ),
            ScenarioReport::completed(
                "extension-stripe",
                "stripe-spring-subscriptions",
                vec!["extension-rdbms".into(), "extension-stripe".into()],
                vec![missing("StripeWebhookController.java", "idempotency")],
                40,
            ),
            ScenarioReport::aborted(
                "extension-stripe",
                "stripe-drf-webhooks",
                Stage::Generating,
                ScenarioError::Cancelled,
                vec!["extension-rdbms".into(), "extension-stripe".into()],
                3,
            ),
        ];
        let templates = vec![TemplateReport {
            module_id: "extension-stripe".into(),
            name: "frontend-uses-publishable-key".into(),
            template: "useStripe.ts.mustache".into(),
            reason: "Security".into(),
            failures: vec![Failure::ForbiddenSubstring {
                file: "useStripe.ts.mustache".into(),
                substring: "sk_".into(),
            }],
        }];
        Report::new(Utc::now(), scenarios, templates)
    }

    #[test]
    fn summary_counts_each_outcome() {
        let report = sample();
        assert_eq!(
            report.summary(),
            Summary {
                scenarios_passed: 1,
                scenarios_failed: 1,
                scenarios_aborted: 1,
                templates_passed: 0,
                templates_failed: 1,
                total_failures: 2,
            }
        );
        assert_eq!(report.exit_code(), EXIT_FAILURES);
        assert_eq!(
            report.scenario("stripe-drf-webhooks").and_then(ScenarioReport::aborted_stage),
            Some(Stage::Generating)
        );
    }

    #[test]
    fn clean_report_exits_zero() {
        let report = Report::new(
            Utc::now(),
            vec![ScenarioReport::completed("m", "s", vec!["m".into()], Vec::new(), 1)],
            Vec::new(),
        );
        assert_eq!(report.exit_code(), EXIT_PASS);
    }

    #[test]
    fn json_tags_failures_with_scenario_and_kind() {
        let report = sample();
        let value: serde_json::Value =
            serde_json::from_str(&report.to_json().expect("renders")).expect("valid json");
        assert_eq!(value["summary"]["scenariosAborted"], 1);
        assert_eq!(value["scenarios"][2]["state"], "aborted");
        assert_eq!(value["scenarios"][2]["stage"], "generating");
        assert_eq!(value["scenarios"][2]["error"]["kind"], "cancelled");
        assert_eq!(value["scenarios"][1]["verdict"], "fail");
        assert_eq!(value["failures"][0]["source"], "stripe-spring-subscriptions");
        assert_eq!(value["failures"][0]["kind"], "missing_substring");
        assert_eq!(value["failures"][1]["kind"], "forbidden_substring");
        assert!(value["startedAt"].as_str().is_some());
    }

    #[test]
    fn text_rendering_lists_every_failure() {
        let text = sample().render_text();
        assert!(text.contains("FAIL  extension-stripe/stripe-spring-subscriptions"));
        assert!(text.contains("MissingSubstring(StripeWebhookController.java, \"idempotency\")"));
        assert!(text.contains("ABORT extension-stripe/stripe-drf-webhooks at generating: cancelled"));
        assert!(text.contains("ForbiddenSubstring(useStripe.ts.mustache, \"sk_\")"));
    }
}
