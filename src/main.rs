use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use log::{info, warn};

use leaf_necrosis_lib::config::Config;
use leaf_necrosis_lib::image_io::{get_image_files_in_dir, has_extension, LEAF_IMAGE_EXTENSIONS};
use leaf_necrosis_lib::output::{write_results_csv, write_summary, BatchSummary};
use leaf_necrosis_lib::pipeline::process_batch;
use leaf_necrosis_lib::temperature::process_temperature_dir;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "LeafNecrosis - Leaf Necrosis and Chlorosis Quantification")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    /// Write the default configuration to the config path and exit
    #[clap(long)]
    init_config: bool,

    /// Only apply a color temperature shift (>1 warmer, <1 cooler) to the input directory
    #[clap(long, value_name = "FACTOR")]
    temperature: Option<f32>,
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Load the config file, falling back to defaults when it does not exist
fn load_config(path: &str) -> anyhow::Result<Config> {
    if Path::new(path).exists() {
        Config::from_file(path).with_context(|| format!("loading configuration from {}", path))
    } else {
        warn!("Config file {} not found, using defaults", path);
        Ok(Config::default())
    }
}

/// Images to analyze: the input file itself, or the allow-listed files of a directory
fn collect_inputs(input_path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input_path.is_file() {
        if has_extension(input_path, LEAF_IMAGE_EXTENSIONS) {
            return Ok(vec![input_path.to_path_buf()]);
        }
        warn!("Ignoring {}: unsupported extension", input_path.display());
        return Ok(Vec::new());
    }

    get_image_files_in_dir(input_path, LEAF_IMAGE_EXTENSIONS)
        .with_context(|| format!("listing images in {}", input_path.display()))
}

/// Main function
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    if args.init_config {
        Config::default()
            .save_to_file(&args.config)
            .with_context(|| format!("writing default configuration to {}", args.config))?;
        info!("Default configuration written to {}", args.config);
        return Ok(());
    }

    let mut config = load_config(&args.config)?;

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }

    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }

    if let Some(factor) = args.temperature {
        let output_dir = args
            .output
            .clone()
            .unwrap_or_else(|| format!("{}/thermo", config.input_path));
        let written = process_temperature_dir(&config.input_path, &output_dir, factor)?;
        info!("Adjusted {} images into {}", written, output_dir);
        return Ok(());
    }

    config.validate()?;
    config.validate_input_path()?;

    let start_time = Instant::now();

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output_dir = PathBuf::from(&config.output_base_dir).join(&timestamp);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let input_path = PathBuf::from(&config.input_path);
    info!("Processing directory: {}", input_path.display());
    info!("Output directory: {}", output_dir.display());

    let paths = collect_inputs(&input_path)?;
    info!("Found {} images", paths.len());

    let records = process_batch(&paths, &config, &output_dir);

    match BatchSummary::from_records(&records) {
        Some(summary) => {
            let csv_path = output_dir.join(format!("multi_leaf_results_{}.csv", timestamp));
            write_results_csv(&records, &csv_path)?;
            info!("Results saved to {}", csv_path.display());

            let summary_path = output_dir.join("analysis_summary.txt");
            write_summary(&summary, &config, &timestamp, &summary_path)?;
            info!("Summary saved to {}", summary_path.display());

            println!("\nAnalysis Complete:");
            print!("{}", summary);
        }
        None => warn!("No results generated"),
    }

    let elapsed = start_time.elapsed();
    info!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
