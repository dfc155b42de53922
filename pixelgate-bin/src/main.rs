use anyhow::{Context, Result};
use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};
use log::{info, warn, LevelFilter};
use pixelgate::config::{self, Config};
use pixelgate::{run_bin, signing};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::signal;

#[derive(Parser, Debug)]
#[clap(version, about = "Signed-URL image proxy")]
struct Args {
    /// Path to the YAML config file.
    #[clap(short, long, default_value = "config.yml")]
    config: PathBuf,
    /// Overrides `log_level` from the config file.
    #[clap(short, long)]
    log_level: Option<String>,
    /// Print the signed proxy URL for an image URL and exit.
    #[clap(long, value_name = "URL")]
    sign: Option<String>,
}

fn setup_logger(level: &str) -> Result<()> {
    let level: LevelFilter = level
        .parse()
        .with_context(|| format!("Invalid log level {:?}", level))?;
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {:5} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, missing) = match config::load_file(&args.config).await {
        Ok(config) => (config, false),
        Err(err)
            if err
                .downcast_ref::<std::io::Error>()
                .map(|e| e.kind() == ErrorKind::NotFound)
                .unwrap_or(false) =>
        {
            (Config::default(), true)
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to load {}", args.config.display()))
        }
    };

    if let Some(url) = &args.sign {
        println!("{}", signing::proxy_url_for(&config, url)?);
        return Ok(());
    }

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.to_string());
    setup_logger(&level)?;
    if missing {
        warn!(
            "{} not found, running with default config",
            args.config.display()
        );
    }

    run_bin(config).await?;
    info!("Service started, press Ctrl-C to stop");

    signal::ctrl_c().await?;
    info!("Ctrl-C received, stopping...");

    Ok(())
}
