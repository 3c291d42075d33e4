use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use mailverify_lib::{Context, SMTP_PORT, VerifyOptions};

#[derive(Parser)]
#[command(name = "mailverify-cli", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long)]
    pub stdin: bool,

    /// format: human|json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// délai maximal par adresse, en millisecondes (0 = aucun)
    #[arg(long = "timeout-ms", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// URL de la liste JSON des domaines jetables
    #[arg(long = "list-url")]
    pub list_url: Option<String>,

    /// expéditeur annoncé dans MAIL FROM
    #[arg(long = "from")]
    pub mail_from: Option<String>,

    /// nom annoncé dans EHLO/HELO
    #[arg(long)]
    pub helo: Option<String>,

    /// port SMTP de l'échangeur
    #[arg(long, default_value_t = SMTP_PORT)]
    pub port: u16,
}

#[derive(Subcommand)]
pub enum Commands {
    Verify {
        /// adresse e-mail à vérifier
        email: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

impl Cli {
    pub fn format(&self) -> Result<Format> {
        match self.format.as_str() {
            "human" => Ok(Format::Human),
            "json" => Ok(Format::Json),
            other => bail!("unknown --format '{other}', use: human|json"),
        }
    }

    pub fn options(&self) -> VerifyOptions {
        let mut options = VerifyOptions {
            smtp_port: self.port,
            ..VerifyOptions::default()
        };
        if let Some(url) = &self.list_url {
            options.disposable_list_url = url.clone();
        }
        if let Some(from) = &self.mail_from {
            options.mail_from = from.clone();
        }
        if let Some(helo) = &self.helo {
            options.helo_domain = helo.clone();
        }
        options
    }

    /// Fresh context for one address.
    pub fn context(&self) -> Context {
        match self.timeout_ms {
            0 => Context::background(),
            ms => Context::with_timeout(Duration::from_millis(ms)),
        }
    }
}
