// src/bin/drive_checker.rs

use autosweep::{cli, logging, run_drive_checker};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("drive-checker error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse_drive_checker();
    logging::init_logging(args.log_level)?;
    run_drive_checker(args).await
}
