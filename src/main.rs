use anyhow::Result;
use clap::Parser;
use simple_bank::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    simple_bank::logging::init_logging(cli.verbose);
    cli.run().await
}
