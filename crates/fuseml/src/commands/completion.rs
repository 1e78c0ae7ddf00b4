//! Shell completions generation

use std::io;

use anyhow::Result;
use clap_complete::generate;

use crate::cli::{build_command, CompletionArgs};

pub fn run(args: CompletionArgs) -> Result<()> {
    let mut cmd = build_command()?;
    generate(args.shell, &mut cmd, "fuseml", &mut io::stdout());
    Ok(())
}
