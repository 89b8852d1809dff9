//! Headless replay entry point (native).

#[cfg(feature = "native")]
use clap::Parser;
#[cfg(feature = "native")]
use std::path::PathBuf;

/// Replay an annotation script and write each page layer as PNG.
#[cfg(feature = "native")]
#[derive(Debug, Parser)]
#[command(name = "pageink")]
#[command(about = "Replay a PageInk annotation script headlessly")]
struct Cli {
    /// JSON replay script.
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,
    /// Output directory; defaults to the script's configured one.
    #[arg(value_name = "OUT_DIR")]
    out_dir: Option<PathBuf>,
}

#[cfg(feature = "native")]
fn main() {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("Starting PageInk replay of {}", cli.script.display());

    let script = match std::fs::read_to_string(&cli.script)
        .map_err(pageink_app::AppError::from)
        .and_then(|json| pageink_app::ReplayScript::from_json(&json))
    {
        Ok(script) => script,
        Err(err) => {
            log::error!("Failed to load {}: {}", cli.script.display(), err);
            std::process::exit(1);
        }
    };
    let out_dir = cli.out_dir.unwrap_or_else(|| script.config.output_dir.clone());

    match pageink_app::run_script(&script, &out_dir) {
        Ok((report, written)) => {
            log::info!(
                "Committed {} stroke(s), {} active, {} rejected control(s)",
                report.committed.len(),
                report.active,
                report.rejected
            );
            for path in written {
                println!("{}", path.display());
            }
        }
        Err(err) => {
            log::error!("Replay failed: {}", err);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}

#[cfg(all(test, feature = "native"))]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from(["pageink", "script.json"]).unwrap();
        assert_eq!(cli.script, PathBuf::from("script.json"));
        assert!(cli.out_dir.is_none());

        let cli = Cli::try_parse_from(["pageink", "script.json", "out"]).unwrap();
        assert_eq!(cli.out_dir, Some(PathBuf::from("out")));

        assert!(Cli::try_parse_from(["pageink"]).is_err());
    }
}
