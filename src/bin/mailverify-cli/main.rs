mod args;
mod output;

use std::io::{self, BufRead};

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser};
use mailverify_lib::Verifier;
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};
use crate::output::OutputRow;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let format = cli.format()?;

    let mut emails: Vec<String> = Vec::new();
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            if !line.trim().is_empty() {
                emails.push(line);
            }
        }
    } else if let Some(Commands::Verify { email }) = &cli.cmd {
        emails.push(email.clone());
    } else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let verifier =
        Verifier::from_system_conf(cli.options()).context("initialise DNS resolver and HTTP client")?;

    let rows: Vec<OutputRow> = emails
        .into_iter()
        .map(|email| {
            let outcome = verifier.verify_with_context(&cli.context(), &email);
            OutputRow { email, outcome }
        })
        .collect();

    output::write_reports(&rows, format)?;

    // codes de sortie : 0 délivrable, 2 non délivrable, 1 fatal
    if output::any_undeliverable(&rows) {
        std::process::exit(2);
    }
    Ok(())
}
