//! Render Pipeline - Single Entry Point
//!
//! Resolves asset references and compiles the prompt for one render request,
//! then applies the render policy. The policy is the only place a render can
//! be refused; the resolver and compiler themselves never fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::bindings::BindingTable;
use crate::compiler::PromptCompiler;
use crate::hashing::{compute_prompt_hash, compute_request_hash};
use crate::metadata::Definition;
use crate::policy::{CheckResult, RenderChecker, RenderInput, RenderPolicy};
use crate::prompt::Prompt;
use crate::registry::SchemaRegistry;
use crate::resolver::{AssetResolver, ResolveRequest, ResolvedAssets};
use crate::schema::DefinitionKind;
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Render blocked: {0}")]
    Blocked(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Everything needed for one render, as supplied by the request layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub characters: Vec<Definition>,
    #[serde(default)]
    pub style: Option<Definition>,
    #[serde(default)]
    pub scene: Option<Definition>,
    #[serde(default)]
    pub reference_constraint: Option<Definition>,
}

impl RenderRequest {
    pub fn resolve_request(&self) -> ResolveRequest {
        ResolveRequest {
            characters: self.characters.clone(),
            style: self.style.clone(),
            scene: self.scene.clone(),
            reference_constraint: self.reference_constraint.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaVersion {
    pub kind: DefinitionKind,
    pub version: String,
}

/// Manifest for one planned render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPlan {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub schema_versions: Vec<SchemaVersion>,
    pub prompt: String,
    pub prompt_hash: String,
    pub request_hash: String,
    pub asset_refs: ResolvedAssets,
    pub checks: CheckResult,
}

pub struct RenderPipeline<'r> {
    registry: &'r SchemaRegistry,
    bindings: &'r BindingTable,
    checker: RenderChecker,
    policy: RenderPolicy,
}

impl<'r> RenderPipeline<'r> {
    pub fn new(registry: &'r SchemaRegistry, bindings: &'r BindingTable) -> Self {
        Self {
            registry,
            bindings,
            checker: RenderChecker::new(),
            policy: RenderPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RenderPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RenderPolicy {
        &self.policy
    }

    pub fn compile_prompt(&self, request: &RenderRequest) -> Prompt {
        PromptCompiler::new(self.registry).compile(
            &request.task,
            &request.characters,
            request.style.as_ref().map(|d| &d.metadata),
            request.scene.as_ref().map(|d| &d.metadata),
        )
    }

    pub fn resolve_assets(&self, request: &ResolveRequest) -> ResolvedAssets {
        AssetResolver::new(self.bindings).resolve(request)
    }

    /// Plan a render.
    ///
    /// Checks always run; under `FailureMode::Block` a plan with error
    /// violations is rejected.
    pub fn plan(&self, request: &RenderRequest) -> Result<RenderPlan, PipelineError> {
        let asset_refs = self.resolve_assets(&request.resolve_request());
        let prompt = self.compile_prompt(request);

        let checks = self.checker.check(
            &RenderInput {
                task: &request.task,
                prompt: &prompt,
                assets: &asset_refs,
            },
            &self.policy,
        );

        if !checks.passed {
            let messages: Vec<_> = checks
                .violations
                .iter()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            tracing::warn!(violations = messages.len(), "render blocked by policy");
            return Err(PipelineError::Blocked(messages.join("; ")));
        }

        let prompt = prompt.render();
        let prompt_hash = compute_prompt_hash(&prompt);
        let request_hash = compute_request_hash(request, ENGINE_VERSION)?;

        let schema_versions = self
            .registry
            .versions()
            .into_iter()
            .map(|(kind, version)| SchemaVersion { kind, version })
            .collect();

        let plan = RenderPlan {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            schema_versions,
            prompt,
            prompt_hash,
            request_hash,
            asset_refs,
            checks,
        };

        tracing::info!(
            plan = %plan.id,
            refs = plan.asset_refs.refs.len(),
            prompt_hash = %plan.prompt_hash,
            "render planned"
        );

        Ok(plan)
    }
}

impl Default for RenderPipeline<'static> {
    fn default() -> Self {
        Self::new(SchemaRegistry::builtin(), BindingTable::builtin())
    }
}
