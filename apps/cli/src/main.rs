//! nbindex CLI: index Jupyter notebooks into Solr.
//!
//! Walks a notebook directory, turns every notebook into cell-level and
//! notebook-level search documents, posts them to Solr, and archives the
//! original bytes.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
