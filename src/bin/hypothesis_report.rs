use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use confnet_rs::{
    compute_confnet_report, compute_utterance_report, load_confnet, load_utterances, AsrHypothesis,
    HypothesisConfig, HypothesisProcessorBuilder, Meta, Report, REPORT_SCHEMA_VERSION,
};
use indicatif::{ProgressBar, ProgressStyle};

#[path = "hypothesis_report/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Parser)]
#[command(name = "hypothesis_report")]
#[command(about = "Extract features and N-best lists from ASR hypotheses into a JSON report")]
struct Args {
    /// "key => utterance" lines.
    #[arg(long, env = "HYPOTHESIS_REPORT_UTTERANCES")]
    utterances: PathBuf,
    /// Confusion network as JSON: slots of [probability, word] pairs.
    #[arg(long, env = "HYPOTHESIS_REPORT_CONFNET")]
    confnet: Option<PathBuf>,
    #[arg(long, env = "HYPOTHESIS_REPORT_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "HYPOTHESIS_REPORT_OUT", default_value = "hypothesis_report.json")]
    out: PathBuf,
    #[arg(long, env = "HYPOTHESIS_REPORT_LIMIT")]
    limit: Option<usize>,
    #[arg(long, env = "HYPOTHESIS_REPORT_TOP_FEATURES", default_value_t = 10)]
    top_features: usize,
    /// Lowercase every hypothesis, overriding the config file.
    #[arg(long, env = "HYPOTHESIS_REPORT_LOWERCASE", default_value_t = false)]
    lowercase: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => HypothesisConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => HypothesisConfig::default(),
    };
    if args.lowercase {
        config.lowercase = true;
    }
    let feature_type = config.features.feature_type.clone();
    let feature_size = config.features.size;

    let processor = HypothesisProcessorBuilder::new(config)
        .build()
        .map_err(|err| format!("Failed to build hypothesis processor: {err}"))?;

    let utterances = load_utterances(&args.utterances, args.limit).map_err(|err| {
        format!(
            "Failed to load utterances '{}': {err}",
            args.utterances.display()
        )
    })?;

    let progress = ProgressBar::new(utterances.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("starting...");

    let mut utterance_reports = Vec::with_capacity(utterances.len());
    for (id, utterance) in &utterances {
        progress.set_message(id.clone());
        let processed = processor
            .process(AsrHypothesis::Utterance(utterance.clone()))
            .map_err(|err| format!("Failed to process utterance '{id}': {err}"))?;
        utterance_reports.push(compute_utterance_report(
            id,
            utterance,
            &processed,
            args.top_features,
        ));
        progress.inc(1);
    }
    progress.finish_with_message("utterance pass complete");

    let confnet_report = match &args.confnet {
        Some(path) => {
            let confnet = load_confnet(path)
                .map_err(|err| format!("Failed to load confnet '{}': {err}", path.display()))?;
            let processed = processor
                .process(AsrHypothesis::ConfusionNetwork(confnet.clone()))
                .map_err(|err| format!("Failed to process confnet '{}': {err}", path.display()))?;
            Some(compute_confnet_report(&confnet, &processed, args.top_features))
        }
        None => None,
    };

    let report = Report {
        schema_version: REPORT_SCHEMA_VERSION,
        meta: Meta {
            generated_at: Utc::now().to_rfc3339(),
            utterances_path: args.utterances.to_string_lossy().into_owned(),
            confnet_path: args
                .confnet
                .as_ref()
                .map(|path| path.to_string_lossy().into_owned()),
            feature_type,
            feature_size,
            utterance_count: utterance_reports.len(),
        },
        utterances: utterance_reports,
        confnet: confnet_report,
    };

    json_report_formatter::write_report(&args.out, &report)?;
    println!("{}", args.out.display());
    Ok(())
}
