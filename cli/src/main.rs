//! podgen: pod controller rule autogeneration from the command line
//!
//! Reads policy documents (YAML, possibly several per file, or JSON) and prints
//! what autogeneration makes of them.
//!
//! Usage:
//!   podgen rules policy.yaml
//!   podgen --config podgen.toml controllers policy.yaml
//!   podgen patches policy.yaml
//!   podgen pod-spec deployment.yaml

mod config;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use podgen_autogen::{extract_pod_spec, Autogen};
use podgen_contracts::{
    error::{PodgenError, PodgenResult},
    policy::Policy,
};
use podgen_core::TracingSink;

use config::{CliConfig, OutputFormat};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Generate pod controller rules from Pod-targeted policy rules.
#[derive(Parser)]
#[command(
    name = "podgen",
    about = "Pod controller rule autogeneration",
    long_about = "Derives Deployment, StatefulSet, Job, CronJob (and other controller)\n\
                  rules from policy rules written against Pods."
)]
struct Cli {
    /// Configuration file. Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "podgen.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print each policy's rules with the generated rules appended.
    Rules { file: PathBuf },
    /// Print requested, supported and effective controllers.
    Controllers { file: PathBuf },
    /// Print the rule names each policy exposes after autogeneration.
    Names { file: PathBuf },
    /// Print the JSON patch that brings each policy's rules up to date.
    Patches { file: PathBuf },
    /// Print the pod spec embedded in a controller resource.
    PodSpec { file: PathBuf },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let config = match CliConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("podgen: {}", e);
            std::process::exit(2);
        }
    };

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run(cli.command, &config) {
        eprintln!("podgen: {}", e);
        std::process::exit(1);
    }
}

// ── Command dispatch ──────────────────────────────────────────────────────────

fn run(command: Command, config: &CliConfig) -> PodgenResult<()> {
    let autogen = Autogen::new();
    let mut sink = TracingSink;

    match command {
        Command::Rules { file } => {
            for mut policy in load_policies(&file, config)? {
                policy.spec.rules = autogen.compute_rules(&policy, &mut sink);
                info!(policy = %policy.metadata.name, rules = policy.spec.rules.len(), "computed rules");
                emit(&policy, config.output)?;
            }
        }
        Command::Controllers { file } => {
            for policy in load_policies(&file, config)? {
                emit(&autogen.controllers(&policy), config.output)?;
            }
        }
        Command::Names { file } => {
            for policy in load_policies(&file, config)? {
                emit(&autogen.autogen_rule_names(&policy), config.output)?;
            }
        }
        Command::Patches { file } => {
            for policy in load_policies(&file, config)? {
                emit(&autogen.rule_patches(&policy, &mut sink), config.output)?;
            }
        }
        Command::PodSpec { file } => {
            for resource in load_documents(&file)? {
                match extract_pod_spec(&resource)? {
                    Some(spec) => emit(&spec, config.output)?,
                    None => debug!(kind = ?resource.get("kind"), "not a pod controller"),
                }
            }
        }
    }
    Ok(())
}

// ── Input ─────────────────────────────────────────────────────────────────────

/// Every non-empty document in `path`, as JSON values.
fn load_documents(path: &Path) -> PodgenResult<Vec<Value>> {
    let contents = std::fs::read_to_string(path).map_err(|e| PodgenError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&contents) {
        let value = Value::deserialize(document).map_err(|e| PodgenError::PolicyParse {
            reason: format!("{}: {}", path.display(), e),
        })?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    debug!(path = %path.display(), documents = documents.len(), "loaded documents");
    Ok(documents)
}

fn load_policies(path: &Path, config: &CliConfig) -> PodgenResult<Vec<Policy>> {
    load_documents(path)?
        .into_iter()
        .map(|document| {
            let mut policy: Policy =
                serde_json::from_value(document).map_err(|e| PodgenError::PolicyParse {
                    reason: format!("{}: {}", path.display(), e),
                })?;
            if let Some(annotation) = config.annotation_override() {
                policy.set_autogen_annotation(annotation);
            }
            Ok(policy)
        })
        .collect()
}

// ── Output ────────────────────────────────────────────────────────────────────

fn emit<T: Serialize>(value: &T, format: OutputFormat) -> PodgenResult<()> {
    let rendered = render(value, format)?;
    println!("{}", rendered.trim_end());
    Ok(())
}

fn render<T: Serialize>(value: &T, format: OutputFormat) -> PodgenResult<String> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map(|s| format!("---\n{s}"))
            .map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
    };
    rendered.map_err(|reason| PodgenError::Render {
        format: format.to_string(),
        reason,
    })
}
