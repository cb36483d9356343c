//! `lumachroma` CLI - Colorize grayscale photographs.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lumachroma::{image, pipeline, Config, Pipeline, Workbench};

/// Colorize grayscale photographs with a pretrained chrominance network.
#[derive(Parser, Debug)]
#[command(name = "lumachroma")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Folder holding colorization.onnx, colorization.onnx_data, and pts_in_hull.npy.
    #[arg(long, global = true, env = "LUMACHROMA_MODEL_DIR", value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// ONNX graph, if not in the model folder. Its weight data must sit
    /// beside it as colorization.onnx_data.
    #[arg(long, global = true, value_name = "FILE")]
    topology: Option<PathBuf>,

    /// Cluster-center table, if not in the model folder.
    #[arg(long, global = true, value_name = "FILE")]
    clusters: Option<PathBuf>,

    /// Where the weights can be downloaded, shown when they are missing.
    #[arg(long, global = true, env = "LUMACHROMA_WEIGHTS_URL", value_name = "URL")]
    weights_url: Option<String>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Colorize one image and save the result.
    Colorize {
        /// Input image path.
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output image path; format follows the extension.
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Output JPEG quality (1-100).
        #[arg(short, long, default_value = "95", value_name = "INT")]
        quality: u8,
    },

    /// Colorize every image in a folder.
    Batch {
        /// Folder to read images from.
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,

        /// Folder to write colorized images to, under the same file names.
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Output JPEG quality (1-100).
        #[arg(short, long, default_value = "95", value_name = "INT")]
        quality: u8,
    },

    /// List the images in a folder that can be colorized.
    List {
        /// Folder to browse.
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("lumachroma={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        if let Some(lumachroma::Error::ResourceMissing { remediation, .. }) =
            err.downcast_ref::<lumachroma::Error>()
        {
            eprintln!("\nModel file missing: {remediation}");
        }
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::List { folder } => {
            let images = image::list_images(folder)
                .with_context(|| format!("Failed to read folder {}", folder.display()))?;
            for path in images {
                println!("{}", path.display());
            }
            Ok(())
        }
        Command::Colorize {
            input,
            output,
            quality,
        } => {
            // Validate input file exists
            if !input.exists() {
                anyhow::bail!("Input file does not exist: {}", input.display());
            }

            let mut bench = workbench(args, *quality)?;
            bench
                .select_file(input)
                .with_context(|| format!("Failed to colorize {}", input.display()))?;
            bench
                .save(output)
                .with_context(|| format!("Failed to save {}", output.display()))?;

            println!(
                "Successfully colorized {} -> {}",
                input.display(),
                output.display()
            );
            Ok(())
        }
        Command::Batch {
            folder,
            output_dir,
            quality,
        } => {
            let mut bench = workbench(args, *quality)?;
            bench
                .open_folder(folder)
                .with_context(|| format!("Failed to read folder {}", folder.display()))?;
            std::fs::create_dir_all(output_dir)
                .with_context(|| format!("Failed to create {}", output_dir.display()))?;

            let mut failed = 0usize;
            for index in 0..bench.entries().len() {
                let input = bench.entries()[index].clone();
                let Some(name) = input.file_name() else {
                    continue;
                };
                let output = output_dir.join(name);

                // Unreadable files are skipped
                if let Err(err) = bench.select_entry(index) {
                    tracing::warn!("Skipping {}: {err}", input.display());
                    failed += 1;
                    continue;
                }
                bench
                    .save(&output)
                    .with_context(|| format!("Failed to save {}", output.display()))?;
                println!("{} -> {}", input.display(), output.display());
            }

            if failed > 0 {
                anyhow::bail!("{failed} of {} images could not be colorized", bench.entries().len());
            }
            Ok(())
        }
    }
}

fn workbench(args: &Args, quality: u8) -> Result<Workbench> {
    let config = Config {
        model_dir: args
            .model_dir
            .clone()
            .unwrap_or_else(pipeline::default_model_dir),
        topology: args.topology.clone(),
        clusters: args.clusters.clone(),
        download_source: args.weights_url.clone(),
        output_quality: quality,
    };

    let pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;
    Ok(Workbench::new(pipeline))
}
