use clap::{Parser, Subcommand};
use imgfit::{config, output, process, scan};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "imgfit")]
#[command(about = "Resize images and fit each one into a target file-size window")]
#[command(long_about = "\
Resize images and fit each one into a target file-size window

Every image under the source directory is scaled so its smaller side is
exactly the configured minimum dimension, then re-encoded until the file
lands inside the target size window. The output tree mirrors the source tree.

Output format follows the file extension:

  .jpg .jpeg   JPEG, quality searched, transparency flattened onto white
  .webp        WebP, quality searched, transparency flattened onto white
  .png         PNG, best compression, transparency kept
  .bmp         BMP, transparency flattened onto white
  .tif .tiff   TIFF, transparency kept

Run 'imgfit gen-config' to generate a documented imgfit.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "imgfit.toml", global = true)]
    config: PathBuf,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Source directory shared by commands that walk images.
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Directory to read images from
    #[arg(long, default_value = "assets/app_images")]
    source: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Resize and compress every image under the source directory
    Compress {
        #[command(flatten)]
        source: SourceArgs,

        /// Directory to write results to
        #[arg(long, default_value = "assets/app_images_compressed")]
        output: PathBuf,

        /// Write every output with this extension (e.g. webp) instead of the source's
        #[arg(long, value_name = "EXT")]
        to: Option<String>,

        /// Write a JSON report of every image to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Validate the config and list the images that would be processed
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print a stock imgfit.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Compress {
            source: SourceArgs { source },
            output: output_dir,
            to,
            report,
        } => {
            let settings = config::load_config(&cli.config)?;
            init_thread_pool(&settings.processing);

            let process_config = process::ProcessConfig {
                output_extension: to,
                ..process::ProcessConfig::from_config(&settings)
            };
            output::print_header(&source, &output_dir, &process_config.transcode);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = process::process(&source, &output_dir, &process_config, Some(tx))?;
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            output::print_summary(&summary, &output_dir);

            if let Some(report_path) = report {
                let json = serde_json::to_string_pretty(&summary)?;
                std::fs::write(&report_path, json)?;
                tracing::info!(path = %report_path.display(), "report written");
            }
        }
        Command::Check {
            source: SourceArgs { source },
        } => {
            let settings = config::load_config(&cli.config)?;
            let images = scan::find_images(&source)?;
            output::print_check_output(&settings.transcode(), &source, &images);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Route `tracing` to stderr so status lines on stdout stay clean.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
