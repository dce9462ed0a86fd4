//! Armory engine - prepare a JSON bundle and print the prepared records
//! together with the pass report.
//!
//! Usage: `armory-engine [bundle.json]` (reads stdin without a path).

use std::io::{self, Read, Write};
use std::sync::Arc;

use anyhow::{bail, Context};
use armory_domain::EntityGraph;
use armory_engine::infrastructure::bundle::{export_bundle, load_bundle};
use armory_engine::infrastructure::settings::load_dotenv;
use armory_engine::infrastructure::telemetry::{init_tracing, DEFAULT_FILTER};
use armory_engine::{PipelineSettings, PrepareGraph, TracingDiagnostics};

fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing(DEFAULT_FILTER);

    let settings = PipelineSettings::from_env()?;
    tracing::info!(strict = settings.strict, attack_mode = settings.attack_mode.as_str(), "Starting Armory engine");

    let input = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?,
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input).context("failed to read stdin")?;
            input
        }
    };
    let bundle = serde_json::from_str(&input).context("bundle is not valid JSON")?;

    let mut graph = EntityGraph::new();
    let loaded = load_bundle(&mut graph, &bundle)?;
    let strict = settings.strict;

    let pipeline = PrepareGraph::standard(settings, Arc::new(TracingDiagnostics));
    let report = pipeline.execute(&mut graph);

    let mut output = export_bundle(&graph);
    if let Some(bundle) = output.as_object_mut() {
        bundle.insert("report".into(), serde_json::to_value(report.summary())?);
        bundle.insert("rejected".into(), serde_json::to_value(&loaded.rejected)?);
    }
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output)?;
    writeln!(stdout)?;

    if report.halted() {
        let first = report.failures().first().map(ToString::to_string).unwrap_or_default();
        bail!("preparation halted: {first}");
    }
    if strict {
        if let Some(first) = loaded.rejected.first() {
            bail!("bundle record {} rejected: {}", first.path, first.message);
        }
    }
    Ok(())
}
