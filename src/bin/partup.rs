use anyhow::Result;
use colored::Colorize;
use partup::cli::{actions, start};
use std::process;

#[tokio::main]
async fn main() -> Result<()> {
    let (coordinator, action, globals) = start()?;

    if let Err(e) = actions::handle(coordinator, action, globals).await {
        eprintln!("{}", format!("{e:#}").red());
        process::exit(1);
    }

    Ok(())
}
