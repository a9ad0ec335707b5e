use clap::{Parser, Subcommand};
use image_tweak::handler::{HandlerContext, handle};
use image_tweak::imaging::RustBackend;
use image_tweak::logging::{self, LogFormat};
use image_tweak::process::{self, Collaborators, ProcessConfig};
use image_tweak::request::BatchRequest;
use image_tweak::storage::{FsMetadataStore, FsObjectStore};
use image_tweak::{config, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "image-tweak")]
#[command(about = "Batch image adjustment pipeline")]
#[command(long_about = "\
Batch image adjustment pipeline

Reads a batch request naming source images plus per-image parameter arrays,
renders every image (resize, rotate, contrast/brightness, saturation, filter,
opacity) and writes the results to the object store.

Request body:

  {
    \"uploadId\": \"3f1c\",
    \"imageName\": [\"uploads/a.jpg\", \"uploads/b.png\"],
    \"imageParameters\": {
      \"resX\": [800, 640],
      \"rotationState\": [0, 90],
      \"brightness\": [[50], [80]],
      \"filter\": [\"none\", \"sepia\"],
      \"outputFormat\": [\"png\", \"jpg\"]
    }
  }

Sources are keys relative to the store directory, or inline data: URIs.

Run 'image-tweak gen-config' to generate a documented config.toml.")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Object store root (source images and results)
    #[arg(long, default_value = "store", global = true)]
    store: PathBuf,

    /// Directory for per-upload metadata records
    #[arg(long, default_value = "store/.uploads", global = true)]
    metadata: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one batch request from a JSON file
    Process {
        /// Request body (JSON)
        #[arg(long)]
        request: PathBuf,
    },
    /// Run the HTTP-style handler and print status, headers and body
    Handle {
        /// Request method
        #[arg(long, default_value = "POST")]
        method: String,
        /// Request body file (omit for an empty body)
        #[arg(long)]
        body: Option<PathBuf>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli {
        config: config_dir,
        store,
        metadata,
        log_json,
        command,
    } = Cli::parse();

    match command {
        Command::Process { request } => {
            let process_config = init_runtime(&config_dir, log_json)?;
            let store = FsObjectStore::new(store);
            let metadata = FsMetadataStore::new(metadata);
            let body = std::fs::read_to_string(&request)?;
            let batch = BatchRequest::from_json(&body)?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result =
                process::process_batch(&store, &metadata, &batch, &process_config, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            let outcome = result?;
            println!();
            output::print_batch_response(&outcome.response);
        }
        Command::Handle { method, body } => {
            let process_config = init_runtime(&config_dir, log_json)?;
            let store = FsObjectStore::new(store);
            let metadata = FsMetadataStore::new(metadata);
            let body = match body {
                Some(path) => std::fs::read_to_string(path)?,
                None => String::new(),
            };
            let backend = RustBackend::new();
            let ctx = HandlerContext {
                collaborators: Collaborators {
                    backend: &backend,
                    store: &store,
                    metadata: &metadata,
                },
                config: process_config,
            };
            let response = handle(&method, &body, &ctx);
            output::print_handler_response(&response);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install logging, load `config.toml` and size the thread pool.
fn init_runtime(
    config_dir: &Path,
    log_json: bool,
) -> Result<ProcessConfig, Box<dyn std::error::Error>> {
    let format = if log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    logging::init(format).map_err(|e| e.to_string())?;

    let app_config = config::load_config(config_dir)?;
    init_thread_pool(&app_config.processing);
    Ok(ProcessConfig::from_config(&app_config))
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores. Users can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
