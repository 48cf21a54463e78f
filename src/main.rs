use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use upsell::{CancelSignal, RunOutcome, UpsellGen, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY};

#[derive(Parser, Debug)]
#[command(name = "upsell", version, about = "Generate cross-sell recommendations for a product catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate recommendations and write an annotated copy of the catalog.
    Generate {
        /// Catalog file (.csv, .xlsx, .jsonl, .ndjson).
        input: PathBuf,
        /// Output file; defaults to `<input stem>_recommendations.<ext>`.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Model name (overrides UPSELL_MODEL).
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        /// Per-call timeout; an expired call marks its batch as failed.
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
        /// Text file with merchandising guidelines replacing the built-in ones.
        #[arg(long)]
        guidelines: Option<PathBuf>,
        #[arg(long)]
        no_progress: bool,
    },
    /// Show recommendations already stored in a catalog.
    Preview {
        input: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the catalog summary sent to the model.
    Summary { input: PathBuf },
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("catalog");
    let ext = input.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    input.with_file_name(format!("{stem}_recommendations.{ext}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    upsell::init_tracing_once();
    let cli = Cli::parse();
    match cli.command {
        Command::Generate {
            input,
            output,
            batch_size,
            concurrency,
            model,
            temperature,
            timeout_secs,
            guidelines,
            no_progress,
        } => {
            let mut gen = UpsellGen::from_env()
                .batch_size(batch_size)
                .concurrency(concurrency)
                .request_timeout(Duration::from_secs(timeout_secs))
                .progress(!no_progress)
                .progress_label("Generating upsells");
            if let Some(m) = model {
                gen = gen.model(m);
            }
            if let Some(t) = temperature {
                gen = gen.temperature(t);
            }
            if let Some(path) = guidelines {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("read guidelines {}", path.display()))?;
                gen = gen.guidelines(text);
            }

            let catalog = gen.load(&input)?;
            let adapter = gen.gemini_adapter()?;
            let output = output.unwrap_or_else(|| default_output(&input));

            let cancel = CancelSignal::new();
            let watcher = {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        eprintln!("Stopping... waiting for in-flight requests to finish.");
                        cancel.cancel();
                    }
                })
            };

            let (res, results) = gen.generate_collect(&catalog, &adapter, &cancel).await;
            watcher.abort();

            if !results.is_empty() {
                gen.export(&catalog, &results, &output)?;
            }
            let failed = results.iter().filter(|r| r.is_failed()).count();
            match res {
                Ok(report) if report.outcome == RunOutcome::Completed => {
                    println!(
                        "{} products processed ({} failed) -> {}",
                        report.progress.total,
                        failed,
                        output.display()
                    );
                }
                Ok(report) => {
                    println!(
                        "Generation stopped by user after {}/{} products.{}",
                        report.progress.processed,
                        report.progress.total,
                        if results.is_empty() { String::new() } else { format!(" Partial results -> {}", output.display()) }
                    );
                }
                Err(e) => {
                    if !results.is_empty() {
                        eprintln!("Partial results ({} products) -> {}", results.len(), output.display());
                    }
                    return Err(e).context("generation failed");
                }
            }
        }
        Command::Preview { input, limit } => {
            let gen = UpsellGen::new();
            let catalog = gen.load(&input)?;
            let Some(existing) = gen.existing(&catalog) else {
                bail!("{} has no recommendation columns yet; run `upsell generate` first", input.display());
            };
            println!("{} products, {} with stored recommendations", catalog.len(), existing.len());
            for r in existing.iter().take(limit) {
                println!("{}\n  also bought: {}\n  may also like: {}", r.child_id, r.essential.join(", "), r.stylistic.join(", "));
            }
        }
        Command::Summary { input } => {
            let gen = UpsellGen::new();
            let catalog = gen.load(&input)?;
            println!("{}", gen.summary(&catalog));
        }
    }
    Ok(())
}
