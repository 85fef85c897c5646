use anyhow::{Context, Result};
use barcode_batch::{AppConfig, BatchProcessor, LogReporter, PDF_EXTENSIONS};
use barcode_extract::{ExtractSource, SPREADSHEET_EXTENSION};
use barcode_store::{AssetRepository, FsRepository};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bcins", about = "Barcode extraction and PDF stamping", version)]
struct Cli {
    /// JSON settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace base directory (overrides the settings file)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the workspace directories
    Init,

    /// Save barcode images from spreadsheets
    Extract {
        /// Spreadsheet or directory of spreadsheets (default: active excels)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Destination directory (default: active barcodes)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Zero-based column holding the labels
        #[arg(long)]
        column: Option<usize>,
    },

    /// Stamp barcodes onto PDFs, pairing them in name order
    Attach {
        /// PDF directory (default: active pdfs)
        #[arg(long)]
        pdfs: Option<PathBuf>,

        /// Barcode directory (default: active barcodes)
        #[arg(long)]
        barcodes: Option<PathBuf>,

        /// Output directory (default: output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of concurrent workers
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Place one image on the first page of one PDF
    Overlay {
        #[arg(long)]
        pdf: PathBuf,

        #[arg(long)]
        image: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Lower-left corner, in points from the page's left edge
        #[arg(long, default_value = "0")]
        x: f32,

        /// Lower-left corner, in points from the page's bottom edge
        #[arg(long, default_value = "0")]
        y: f32,

        #[arg(long)]
        width: Option<f32>,

        #[arg(long)]
        height: Option<f32>,
    },

    /// Show how many inputs are waiting
    Status,
}

async fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) if path.exists() => AppConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        _ => AppConfig::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_config(&cli).await?;
    let repo: Arc<dyn AssetRepository> = Arc::new(FsRepository::new());
    let layout = config.layout();

    match cli.command {
        Commands::Init => {
            layout.ensure_dirs(repo.as_ref())?;
            if let Some(path) = &cli.config {
                if !path.exists() {
                    config.save(path).await?;
                    println!("Wrote settings → {}", path.display());
                }
            }
            println!("Workspace ready at {}", layout.base.display());
        }

        Commands::Extract {
            input,
            output,
            column,
        } => {
            let input = input.unwrap_or_else(|| layout.active_excels.clone());
            let output = output.unwrap_or_else(|| layout.active_barcodes.clone());
            let column = column.unwrap_or(config.label_column);

            let source = ExtractSource::resolve(repo.as_ref(), &input)?;
            let report = barcode_extract::extract(repo.clone(), source, output.clone(), column)
                .await?;

            println!(
                "Extracted {} barcodes from {} spreadsheet(s) → {}",
                report.saved,
                report.processed,
                output.display()
            );
            for failure in &report.failures {
                println!("  {failure}");
            }
        }

        Commands::Attach {
            pdfs,
            barcodes,
            output,
            workers,
        } => {
            if let Some(workers) = workers {
                config.max_workers = workers;
            }
            let options = config.batch_options();
            let pdfs = pdfs.unwrap_or_else(|| layout.active_pdfs.clone());
            let barcodes = barcodes.unwrap_or_else(|| layout.active_barcodes.clone());
            let output = output.unwrap_or_else(|| layout.output.clone());

            let processor = BatchProcessor::new(repo.clone(), layout.clone(), options);
            let result = processor
                .run(&pdfs, &barcodes, &output, Arc::new(LogReporter))
                .await?;

            println!(
                "Processed {}/{} pairs → {}",
                result.processed,
                result.total,
                output.display()
            );
            if !result.is_clean() {
                println!("Errors:");
                for line in result.preview(options.error_preview_limit) {
                    println!("  {line}");
                }
            }
        }

        Commands::Overlay {
            pdf,
            image,
            output,
            x,
            y,
            width,
            height,
        } => {
            let spec = barcode_overlay::insert_image_file(
                repo.clone(),
                pdf,
                image,
                output.clone(),
                x,
                y,
                width,
                height,
            )
            .await?;
            println!(
                "Placed {}x{} at ({}, {}) → {}",
                spec.width,
                spec.height,
                spec.x,
                spec.y,
                output.display()
            );
        }

        Commands::Status => {
            let count = |dir: &PathBuf, extension: &str| -> Result<usize> {
                if repo.is_dir(dir) {
                    Ok(repo.count(dir, extension)?)
                } else {
                    Ok(0)
                }
            };
            println!("Workspace: {}", layout.base.display());
            println!("  Free barcodes: {}", layout.free_barcodes(repo.as_ref())?);
            println!("  Pending PDFs: {}", count(&layout.active_pdfs, PDF_EXTENSIONS[0])?);
            println!(
                "  Pending spreadsheets: {}",
                count(&layout.active_excels, SPREADSHEET_EXTENSION)?
            );
        }
    }

    Ok(())
}
