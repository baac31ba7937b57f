//! dind-setup - Main entry point
//!
//! Provisions a container engine inside a base image: resolves
//! configuration, installs the engine and compose tooling, configures a
//! non-root user, and generates the container-entry init script.

use log::{error, info};

use dind_setup::cli::Cli;
use dind_setup::config::{Paths, ProvisionConfig};
use dind_setup::exec::SystemRunner;
use dind_setup::{installer, sanity};

/// Initialize the logger with appropriate settings
fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;

    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

fn main() {
    init_logger();

    let cli = Cli::parse_args();
    let config = match ProvisionConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            eprintln!("✗ {}", err);
            std::process::exit(err.exit_code());
        }
    };

    if let Some(path) = &cli.save_config {
        match config.save_to_file(path) {
            Ok(()) => {
                info!("configuration written to {}", path.display());
                println!("✓ Configuration written to {}", path.display());
                return;
            }
            Err(err) => {
                error!("{}", err);
                eprintln!("✗ {}", err);
                std::process::exit(err.exit_code());
            }
        }
    }

    if let Err(err) = sanity::require_root() {
        error!("{}", err);
        eprintln!("✗ {}", err);
        std::process::exit(err.exit_code());
    }

    let runner = SystemRunner::new(config.dry_run);
    let paths = Paths::default();
    match installer::provision(&config, &paths, &runner) {
        Ok(()) => {
            info!("done");
        }
        Err(err) => {
            error!("{}", err);
            eprintln!("✗ {}", err);
            std::process::exit(err.exit_code());
        }
    }
}
