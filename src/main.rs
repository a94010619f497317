// src/main.rs

use rerun::engine::ExitReason;
use rerun::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(reason) => std::process::exit(reason.exit_code()),
        Err(err) => {
            eprintln!("rerun error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<ExitReason> {
    let args = cli::parse();
    logging::init_logging(args.debug)?;
    Ok(run(args).await?)
}
