// typegraph CLI entry point
use std::io;

use anyhow::Result;
use clap::Parser;

use tg_cli::{init_logging, run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let stdout = io::stdout();
    run(&cli, &mut stdout.lock())
}
