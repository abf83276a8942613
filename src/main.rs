// src/main.rs

use penwatch::errors::ErrorKind;
use penwatch::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("penwatch error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::ShutdownRequested => Ok(()),
        Err(e) => Err(e.into()),
    }
}
