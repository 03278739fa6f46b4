//! ForgePrompt CLI - Bridge interface for the render service
//!
//! Commands: schema, resolve, compile, plan
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 when the render policy blocks a plan

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use forgeprompt_core::{
    compute_prompt_hash, BindingTable, DefinitionKind, PipelineError, RenderPipeline, RenderPolicy,
    RenderRequest, ResolveRequest, SchemaRegistry,
};

#[derive(Parser)]
#[command(name = "forgeprompt-cli")]
#[command(about = "ForgePrompt CLI - Definition Prompt Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of schema JSON files overriding the built-in schemas
    #[arg(short, long)]
    schemas_dir: Option<PathBuf>,

    /// Render policy JSON file
    #[arg(long)]
    policy: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List schema categories and properties
    Schema {
        /// Only this definition kind
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<DefinitionKind>,
    },

    /// Resolve uploaded-asset references
    Resolve {
        /// JSON payload (ResolveRequest), or @path to read it from a file
        #[arg(short, long)]
        payload: String,
    },

    /// Compile the prompt text
    Compile {
        /// JSON payload (RenderRequest), or @path
        #[arg(short, long)]
        payload: String,
    },

    /// Resolve, compile and check a render
    Plan {
        /// JSON payload (RenderRequest), or @path
        #[arg(short, long)]
        payload: String,
    },
}

fn parse_kind(s: &str) -> Result<DefinitionKind, String> {
    DefinitionKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == s)
        .ok_or_else(|| format!("unknown definition kind: {}", s))
}

fn read_payload(payload: &str) -> Result<String, std::io::Error> {
    match payload.strip_prefix('@') {
        Some(path) => fs::read_to_string(Path::new(path)),
        None => Ok(payload.to_string()),
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: &str) -> Result<T, String> {
    let raw = read_payload(payload).map_err(|e| format!("Cannot read payload: {}", e))?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid payload: {}", e))
}

/// Print `value` and exit with `code`, or with failure if it cannot be encoded.
fn print_json<T: serde::Serialize>(value: &T, code: ExitCode) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(out) => {
            println!("{}", out);
            code
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode output");
            ExitCode::FAILURE
        }
    }
}

fn error_json(message: &str) -> ExitCode {
    print_json(&serde_json::json!({ "success": false, "error": message }), ExitCode::FAILURE)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let loaded;
    let registry = match &cli.schemas_dir {
        Some(dir) => match SchemaRegistry::load_from_dir(dir) {
            Ok(r) => {
                loaded = r;
                &loaded
            }
            Err(e) => return error_json(&format!("Failed to load schemas: {}", e)),
        },
        None => SchemaRegistry::builtin(),
    };

    let policy = match &cli.policy {
        Some(path) => match parse_payload::<RenderPolicy>(&format!("@{}", path.display())) {
            Ok(p) => p,
            Err(e) => return error_json(&e),
        },
        None => RenderPolicy::default(),
    };

    let pipeline = RenderPipeline::new(registry, BindingTable::builtin()).with_policy(policy);

    match cli.command {
        Commands::Schema { kind } => {
            let kinds: Vec<_> = match kind {
                Some(kind) => vec![kind],
                None => DefinitionKind::ALL.to_vec(),
            };
            let schemas: Vec<_> = kinds
                .into_iter()
                .filter_map(|kind| registry.schema(kind))
                .map(|schema| serde_json::json!({
                    "kind": schema.kind,
                    "version": schema.schema_version,
                    "categories": schema.categories.iter().map(|c| serde_json::json!({
                        "key": c.key,
                        "label": c.label,
                        "order": c.order,
                        "properties": c.properties.iter().map(|p| &p.key).collect::<Vec<_>>(),
                    })).collect::<Vec<_>>(),
                }))
                .collect();

            print_json(&schemas, ExitCode::SUCCESS)
        }

        Commands::Resolve { payload } => {
            let request: ResolveRequest = match parse_payload(&payload) {
                Ok(r) => r,
                Err(e) => return error_json(&e),
            };
            let resolved = pipeline.resolve_assets(&request);
            print_json(&serde_json::json!({ "success": true, "refs": resolved }), ExitCode::SUCCESS)
        }

        Commands::Compile { payload } => {
            let request: RenderRequest = match parse_payload(&payload) {
                Ok(r) => r,
                Err(e) => return error_json(&e),
            };
            let prompt = pipeline.compile_prompt(&request).render();
            print_json(
                &serde_json::json!({
                    "success": true,
                    "promptHash": compute_prompt_hash(&prompt),
                    "prompt": prompt,
                }),
                ExitCode::SUCCESS,
            )
        }

        Commands::Plan { payload } => {
            let request: RenderRequest = match parse_payload(&payload) {
                Ok(r) => r,
                Err(e) => return error_json(&e),
            };

            match pipeline.plan(&request) {
                Ok(plan) => print_json(
                    &serde_json::json!({ "success": true, "plan": plan }),
                    ExitCode::SUCCESS,
                ),
                Err(e @ PipelineError::Blocked(_)) => print_json(
                    &serde_json::json!({ "success": false, "error": e.to_string() }),
                    ExitCode::from(2),
                ),
                Err(e) => error_json(&e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_unencodable_output_exits_with_failure() {
        // Tuple keys have no JSON object representation.
        let bad: BTreeMap<(u8, u8), u8> = BTreeMap::from([((1, 2), 3)]);
        let code = print_json(&bad, ExitCode::SUCCESS);
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::FAILURE));

        let code = print_json(&serde_json::json!({ "success": false }), ExitCode::from(2));
        assert_eq!(format!("{:?}", code), format!("{:?}", ExitCode::from(2)));
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("reference_constraint"), Ok(DefinitionKind::ReferenceConstraint));
        assert!(parse_kind("prop").is_err());
    }
}
