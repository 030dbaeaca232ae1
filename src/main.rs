use anyhow::Context;
use ba_trends::cli::{run, Cli};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await.context("ba-trends run failed")
}
