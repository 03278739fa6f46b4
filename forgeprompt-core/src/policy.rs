//! Render Checks - Rule/Policy Separation
//!
//! Rules produce structured violations about a compiled render.
//! Policy decides whether those violations block the render.

use serde::{Deserialize, Serialize};

use crate::prompt::{Prompt, SectionKind};
use crate::resolver::ResolvedAssets;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    #[default]
    Block,
    Warn,
    Log,
}

fn default_true() -> bool { true }

/// Which checks run and how their outcome is enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPolicy {
    #[serde(default)]
    pub failure_mode: FailureMode,
    #[serde(default = "default_true")]
    pub check_task: bool,
    #[serde(default = "default_true")]
    pub check_subject: bool,
    #[serde(default = "default_true")]
    pub check_assets: bool,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::Block,
            check_task: true,
            check_subject: true,
            check_assets: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub passed: bool,
    pub violations: Vec<RenderViolation>,
}

impl CheckResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }
}

/// What a rule gets to look at.
pub struct RenderInput<'a> {
    pub task: &'a str,
    pub prompt: &'a Prompt,
    pub assets: &'a ResolvedAssets,
}

pub trait RenderRule {
    fn name(&self) -> &'static str;
    fn enabled(&self, policy: &RenderPolicy) -> bool;
    fn check(&self, input: &RenderInput<'_>) -> Vec<RenderViolation>;
}

// --- Concrete Rules ---

pub struct TaskPresentRule;

impl RenderRule for TaskPresentRule {
    fn name(&self) -> &'static str { "task_present" }

    fn enabled(&self, policy: &RenderPolicy) -> bool { policy.check_task }

    fn check(&self, input: &RenderInput<'_>) -> Vec<RenderViolation> {
        if !input.task.trim().is_empty() {
            return vec![];
        }
        vec![RenderViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Warning,
            message: "Task instruction is empty".to_string(),
            remediation: vec!["Describe what the image should show".to_string()],
        }]
    }
}

pub struct SubjectPresentRule;

impl RenderRule for SubjectPresentRule {
    fn name(&self) -> &'static str { "subject_present" }

    fn enabled(&self, policy: &RenderPolicy) -> bool { policy.check_subject }

    fn check(&self, input: &RenderInput<'_>) -> Vec<RenderViolation> {
        // Style and scene sections only exist when they carry attributes;
        // a characters section may hold nothing but name headers.
        let has_subject = [SectionKind::Style, SectionKind::Scene]
            .iter()
            .any(|kind| input.prompt.section(*kind).is_some())
            || input
                .prompt
                .section(SectionKind::Characters)
                .map_or(false, |s| s.body.lines().any(|line| line.starts_with("- ")));
        if has_subject || !input.task.trim().is_empty() {
            return vec![];
        }
        vec![RenderViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            message: "Render has no task, characters, style or scene".to_string(),
            remediation: vec![
                "Provide a task instruction".to_string(),
                "Attach at least one definition with attributes".to_string(),
            ],
        }]
    }
}

pub struct AssetsPresentRule;

impl RenderRule for AssetsPresentRule {
    fn name(&self) -> &'static str { "assets_present" }

    fn enabled(&self, policy: &RenderPolicy) -> bool { policy.check_assets }

    fn check(&self, input: &RenderInput<'_>) -> Vec<RenderViolation> {
        if !input.assets.is_empty() {
            return vec![];
        }
        vec![RenderViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Info,
            message: "No reference images resolved".to_string(),
            remediation: vec!["Upload reference images to keep renders consistent".to_string()],
        }]
    }
}

/// Runs the rules and applies the failure mode.
pub struct RenderChecker {
    rules: Vec<Box<dyn RenderRule + Send + Sync>>,
}

impl RenderChecker {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(TaskPresentRule),
                Box::new(SubjectPresentRule),
                Box::new(AssetsPresentRule),
            ],
        }
    }

    pub fn check(&self, input: &RenderInput<'_>, policy: &RenderPolicy) -> CheckResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .filter(|rule| rule.enabled(policy))
            .flat_map(|rule| rule.check(input))
            .collect();

        for violation in &violations {
            tracing::debug!(rule = %violation.rule, severity = ?violation.severity, "render check");
        }

        let has_errors = violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        let passed = match policy.failure_mode {
            FailureMode::Block => !has_errors,
            FailureMode::Warn | FailureMode::Log => true,
        };

        CheckResult { passed, violations }
    }
}

impl Default for RenderChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PromptCompiler;
    use crate::metadata::Definition;
    use serde_json::json;

    fn run(task: &str, policy: &RenderPolicy) -> CheckResult {
        run_with(task, &[], policy)
    }

    fn run_with(task: &str, characters: &[Definition], policy: &RenderPolicy) -> CheckResult {
        let prompt = PromptCompiler::default().compile(task, characters, None, None);
        let assets = ResolvedAssets::default();
        let input = RenderInput { task, prompt: &prompt, assets: &assets };
        RenderChecker::new().check(&input, policy)
    }

    #[test]
    fn test_empty_render_blocks_by_default() {
        let result = run("  ", &RenderPolicy::default());
        assert!(!result.passed);
        assert!(result.has_errors());
        let rules: Vec<_> = result.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["task_present", "subject_present", "assets_present"]);
    }

    #[test]
    fn test_name_only_characters_are_not_a_subject() {
        let bare = vec![Definition::new("c1", "Mira", json!(null))];
        let result = run_with("", &bare, &RenderPolicy::default());
        assert!(!result.passed);
        assert!(result.violations.iter().any(|v| v.rule == "subject_present"));

        let described = vec![Definition::new("c1", "Mira", json!({"hair": {"hair_color": "blue"}}))];
        let result = run_with("", &described, &RenderPolicy::default());
        assert!(result.passed);
        assert!(!result.violations.iter().any(|v| v.rule == "subject_present"));
    }

    #[test]
    fn test_warn_mode_never_blocks() {
        let policy = RenderPolicy { failure_mode: FailureMode::Warn, ..Default::default() };
        let result = run("", &policy);
        assert!(result.passed);
        assert!(result.has_errors());
    }

    #[test]
    fn test_task_alone_passes() {
        let result = run("a lighthouse at dusk", &RenderPolicy::default());
        assert!(result.passed);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].severity, ViolationSeverity::Info);
    }

    #[test]
    fn test_disabled_rules_skipped() {
        let policy = RenderPolicy {
            check_subject: false,
            check_assets: false,
            ..Default::default()
        };
        let result = run("", &policy);
        assert!(result.passed);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn test_policy_defaults_from_json() {
        let policy: RenderPolicy = serde_json::from_str(r#"{"failureMode":"log"}"#).unwrap();
        assert_eq!(policy.failure_mode, FailureMode::Log);
        assert!(policy.check_task && policy.check_subject && policy.check_assets);
    }
}
