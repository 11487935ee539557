use clap::Parser;
use courtsnipe_cli::{cli::Cli, logging, run};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(err) = run::execute(cli).await {
        error!(target = "courtsnipe", error = %err, "run failed");
        std::process::exit(1);
    }
}
