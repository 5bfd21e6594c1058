use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::loader::VerifierConfig;
use crate::config::presets::ProfileRegistry;
use crate::utils::json_schema::VerifyResultV1;
use crate::utils::upstream::EvidenceBatch;
use crate::verdict::orchestrator::Verifier;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick the trustworthy rendition from an evidence batch
    Verify {
        /// Evidence batch (JSON)
        #[arg(long)]
        evidence: PathBuf,
        /// Configuration file (defaults to ./rendverify.json when present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the feature clustering stage
        #[arg(long)]
        feature_check: Option<bool>,
        /// Override the position clustering stage
        #[arg(long)]
        position_check: Option<bool>,
        /// Override the tamper classifier stage
        #[arg(long)]
        inference_check: Option<bool>,
        /// Override the packet validation stage
        #[arg(long)]
        packet_check: Option<bool>,
        /// Tamper classifier URL
        #[arg(long)]
        classifier_endpoint: Option<String>,
        /// Append audit events to this JSON-lines file
        #[arg(long)]
        audit_log: Option<PathBuf>,
        /// Print Prometheus metrics to stderr when done
        #[arg(long)]
        metrics: bool,
    },
    /// Validate transport stream structure of a single rendition
    PacketCheck {
        /// Rendition file
        #[arg(long)]
        file: PathBuf,
        /// Comma-delimited segment offsets
        #[arg(long)]
        positions: String,
        /// Comma-delimited segment lengths
        #[arg(long)]
        lengths: String,
    },
    /// List known encoding profiles
    Profiles,
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Verify {
            evidence,
            config,
            feature_check,
            position_check,
            inference_check,
            packet_check,
            classifier_endpoint,
            audit_log,
            metrics,
        } => {
            let mut config = match config {
                Some(path) => VerifierConfig::load_from_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => VerifierConfig::load_default()?,
            };
            apply_overrides(
                &mut config,
                StageOverrides {
                    feature_check,
                    position_check,
                    inference_check,
                    packet_check,
                },
                classifier_endpoint,
                audit_log,
            );

            if let Some(path) = &config.audit_log {
                crate::observability::audit::init_audit_logger(path)?;
            }

            let started_at = chrono::Utc::now().to_rfc3339();
            let outcome = EvidenceBatch::load(&evidence)
                .and_then(|batch| batch.into_evidence(&ProfileRegistry::new()))
                .and_then(|evidences| {
                    let verifier = Verifier::new(config)?;
                    verifier.verify(&evidences)
                });

            let result = match &outcome {
                Ok(report) => VerifyResultV1::from_report(report, started_at),
                Err(err) => VerifyResultV1::from_error(err, started_at),
            };
            println!("{}", result.to_json()?);

            if metrics {
                eprint!(
                    "{}",
                    crate::observability::metrics::get_metrics().export_prometheus()
                );
            }

            let code = result.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::PacketCheck {
            file,
            positions,
            lengths,
        } => {
            let positions = crate::utils::delimited::parse_positions(&positions)?;
            let lengths = crate::utils::delimited::parse_lengths(&lengths)?;

            match crate::packet::validator::validate_file(&file, &positions, &lengths) {
                Ok(summary) => {
                    println!(
                        "{}: ok ({} segment(s) checked, {} tolerated, {} skipped, {} packets)",
                        file.display(),
                        summary.segments_checked,
                        summary.segments_tolerated,
                        summary.segments_skipped,
                        summary.packets_scanned
                    );
                    Ok(())
                }
                Err(fault) => {
                    println!("{}: failed: {}", file.display(), fault);
                    std::process::exit(1);
                }
            }
        }
        Commands::Profiles => {
            for profile in ProfileRegistry::new().iter() {
                println!(
                    "{:<16} {:>9} {:>3}fps",
                    profile.name, profile.resolution, profile.framerate
                );
            }
            Ok(())
        }
    }
}

struct StageOverrides {
    feature_check: Option<bool>,
    position_check: Option<bool>,
    inference_check: Option<bool>,
    packet_check: Option<bool>,
}

fn apply_overrides(
    config: &mut VerifierConfig,
    stages: StageOverrides,
    classifier_endpoint: Option<String>,
    audit_log: Option<PathBuf>,
) {
    if let Some(enabled) = stages.feature_check {
        config.stages.feature_check = enabled;
    }
    if let Some(enabled) = stages.position_check {
        config.stages.position_check = enabled;
    }
    if let Some(enabled) = stages.inference_check {
        config.stages.inference_check = enabled;
    }
    if let Some(enabled) = stages.packet_check {
        config.stages.packet_check = enabled;
    }
    if let Some(endpoint) = classifier_endpoint {
        config.classifier.endpoint = endpoint;
    }
    if audit_log.is_some() {
        config.audit_log = audit_log;
    }
}
