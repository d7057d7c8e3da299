use std::path::PathBuf;
use vigil::{Mode, Runtime, VigilConfig, VigilError, init_tracing};

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("vigil error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), VigilError> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let Some(first) = args.first().cloned() else {
        print_usage();
        return Err(VigilError::Config("missing subcommand".to_string()));
    };
    args.remove(0);
    if first == "--help" || first == "-h" {
        print_usage();
        return Ok(());
    }
    let mode: Mode = first.parse()?;

    let mut config_path: Option<PathBuf> = None;
    let mut state_dir: Option<PathBuf> = None;
    let mut remaining = args;
    while let Some(flag) = remaining.first().cloned() {
        remaining.remove(0);
        match flag.as_str() {
            "--config" => config_path = Some(PathBuf::from(take_arg("--config", &mut remaining)?)),
            "--state-dir" => {
                state_dir = Some(PathBuf::from(take_arg("--state-dir", &mut remaining)?))
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => match other.strip_prefix("--config=") {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => return Err(VigilError::Config(format!("unknown flag: {other}"))),
            },
        }
    }

    let mut config = VigilConfig::load(config_path.as_deref())?;
    if let Some(dir) = state_dir {
        config.state_dir = Some(dir);
    }

    init_tracing(&config.log_level, config.log_json)?;
    tracing::info!(
        mode = %mode,
        package = %config.package_id,
        rpc_url = %config.rpc_url,
        "configuration loaded"
    );

    let runtime = Runtime::start(mode, &config).await?;
    runtime.run_until_shutdown().await
}

fn take_arg(flag: &str, remaining: &mut Vec<String>) -> Result<String, VigilError> {
    if remaining.is_empty() {
        return Err(VigilError::Config(format!("missing value for {flag}")));
    }
    Ok(remaining.remove(0))
}

fn print_usage() {
    println!("vigil <index|oracle|agent> [--config vigil.json] [--state-dir PATH]");
}
