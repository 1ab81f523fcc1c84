use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use lexicon_db::{Engine, Interner, LoadMode, LoadOutcome, SourceDescriptor, SourceKind};

#[tokio::main]
async fn main() -> Result<()> {
    let usage = "usage: cargo run -p lexicon-db --example stats -- <kind> <path> [key...]";
    let mut args = env::args().skip(1);
    let kind = args.next().context(usage)?;
    let path = args.next().map(PathBuf::from).context(usage)?;
    let keys: Vec<String> = args.collect();

    let kind: SourceKind = serde_json::from_value(serde_json::Value::String(kind.clone()))
        .with_context(|| format!("unknown source kind `{kind}`"))?;

    let engine = Arc::new(Engine::new(Arc::new(Interner::new()), LoadMode::Mmap));
    let reports = engine
        .load_all([SourceDescriptor::new("source", kind, &path)])
        .await;
    let report = reports.first().context("no report produced")?;

    println!("Source      : {}", path.display());
    println!("Kind        : {:?}", report.kind);
    println!("Files       : {}", report.files);
    println!("Outcome     : {}", report.outcome.label());
    match &report.outcome {
        LoadOutcome::Loaded { records, keys } => {
            println!("Records     : {records}");
            println!("Keys        : {keys}");
        }
        LoadOutcome::Partial {
            records,
            keys,
            skipped,
        } => {
            println!("Records     : {records}");
            println!("Keys        : {keys}");
            println!("Skipped     : {skipped}");
        }
        LoadOutcome::Failed { error, .. } => bail!("load failed: {error}"),
        _ => {}
    }
    println!("Discarded   : {}", report.discarded);
    println!("Interned    : {}", engine.interner().len());
    println!("Elapsed     : {} ms", report.elapsed.as_millis());

    // Spot-check the requested keys.
    for key in &keys {
        if kind.is_frequency() {
            for hit in engine.lookup_frequency("source", key) {
                println!("{key}: {} (rank {})", hit.token, hit.rank);
            }
        } else {
            for record in engine.lookup("source", key) {
                println!("{key}: {} [{}]", record.spelling(), record.kind());
            }
        }
    }

    Ok(())
}
