//! ForgePrompt Core - Definition Prompt Compiler
//!
//! # Ground Rules
//! 1. Schemas Are Data
//! 2. Metadata Is Untrusted
//! 3. Primary Slots Shadow Legacy Slots
//! 4. Deterministic Output
//! 5. Lookups Miss, Never Fail
//! 6. Callers Judge Emptiness

pub mod metadata;
pub mod schema;
pub mod registry;
pub mod bindings;
pub mod resolver;
pub mod format;
pub mod prompt;
pub mod compiler;
pub mod policy;
pub mod hashing;
pub mod pipeline;

pub use metadata::{Definition, Metadata, MetadataValue, Scalar};
pub use schema::{option_label, Category, DefinitionKind, Property, PropertyOption, PropertyType, Schema};
pub use registry::{RegistryError, SchemaRegistry};
pub use bindings::{AssetBinding, AssetType, BindingTable};
pub use resolver::{AssetResolver, CollectedAssetRef, ResolveRequest, ResolvedAssets, Scope, ValueSource};
pub use prompt::{Prompt, Section, SectionKind};
pub use compiler::PromptCompiler;
pub use policy::{CheckResult, FailureMode, RenderPolicy, RenderViolation, ViolationSeverity};
pub use hashing::{canonical_json, compute_prompt_hash, compute_request_hash};
pub use pipeline::{PipelineError, RenderPipeline, RenderPlan, RenderRequest};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_ENGINE_VERSION: &str = "1.0.0";
