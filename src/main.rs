use clap::{Parser, Subcommand};
use galleryd::{config, logging, server};
use std::path::PathBuf;

/// Flags that override values from the config file.
#[derive(clap::Args, Clone, Default)]
struct OverrideArgs {
    /// Directory served under /gallery
    #[arg(long)]
    gallery: Option<PathBuf>,

    /// Directory for generated thumbnails
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:6112
    #[arg(long)]
    bind: Option<String>,

    /// Address for the metrics listener, e.g. 127.0.0.1:6113
    #[arg(long)]
    metrics_bind: Option<String>,

    /// trace, debug, info, warn or error
    #[arg(long)]
    log_level: Option<String>,

    /// Append logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl From<OverrideArgs> for config::Overrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            gallery: args.gallery,
            cache: args.cache,
            bind: args.bind,
            metrics_bind: args.metrics_bind,
            log_level: args.log_level,
            log_file: args.log_file,
        }
    }
}

#[derive(Parser)]
#[command(name = "galleryd")]
#[command(about = "Serve a photo directory over HTTP with cached thumbnails")]
#[command(long_about = "\
Serve a photo directory over HTTP with cached thumbnails

Directories are listed as plain HTML. Image files are served as-is, or
resized when the URL carries width and/or height:

  GET /gallery/photos/cat.png              original file
  GET /gallery/photos/cat.png?width=200    200px wide JPEG, aspect kept
  GET /gallery/photos/cat.png?height=150   150px high JPEG, aspect kept
  GET /gallery/photos/cat.png?width=200&height=200
                                           fits inside 200x200

Thumbnails are never larger than the source. JPEG and PNG sources are
thumbnailed; other files are always served as-is. Generated thumbnails are
stored under the cache folder and reused on later requests:

  .cache/photos/cat.png/200/auto.jpg

Run 'galleryd gen-config' to print a documented galleryd.toml.")]
#[command(version)]
struct Cli {
    /// Config file (optional; defaults apply when missing)
    #[arg(long, default_value = "galleryd.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gallery server (default)
    Serve(OverrideArgs),
    /// Validate configuration and folders without serving
    Check(OverrideArgs),
    /// Print a stock galleryd.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(OverrideArgs::default())) {
        Command::Serve(args) => {
            let config = config::load_config(&cli.config, args.into())?;
            logging::init(&config.log)?;
            tracing::info!("Starting");
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let stats = runtime.block_on(server::run(&config))?;
            println!("Cache: {stats}");
        }
        Command::Check(args) => {
            let config = config::load_config(&cli.config, args.into())?;
            println!("==> Config OK");
            println!("    bind:    {}", config.server.bind);
            println!("    gallery: {}", config.folders.gallery.display());
            println!("    cache:   {}", config.folders.cache.display());
            if !config.folders.gallery.is_dir() {
                return Err(format!(
                    "gallery folder {} is not a directory",
                    config.folders.gallery.display()
                )
                .into());
            }
            println!("==> Gallery folder is readable");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
