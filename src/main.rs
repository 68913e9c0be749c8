use anyhow::Result;
use clap::Parser;
use robotblocks_core::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    robotblocks_core::run_cli(&args)
}
