use anyhow::Result;
use clap::Parser;
use mailrag_cli::{Cli, commands, logging};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.global.verbose);

    commands::run(cli).await
}
