use anyhow::Result;
use mailverify_lib::{Error, Verification};

use crate::args::Format;

pub struct OutputRow {
    pub email: String,
    pub outcome: Result<Verification, Error>,
}

impl OutputRow {
    pub fn deliverable(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub fn write_reports(rows: &[OutputRow], format: Format) -> Result<()> {
    match format {
        Format::Human => {
            write_human(rows);
            Ok(())
        }
        Format::Json => write_json(rows),
    }
}

pub fn any_undeliverable(rows: &[OutputRow]) -> bool {
    rows.iter().any(|row| !row.deliverable())
}

fn write_human(rows: &[OutputRow]) {
    for row in rows {
        match &row.outcome {
            Ok(verification) => {
                println!(
                    "[OK]    {} via {} (preference {})",
                    row.email, verification.mx.exchange, verification.mx.preference
                );
            }
            Err(err) => println!("[UNDELIVERABLE] {} :: {}", row.email, err.kind()),
        }
    }
}

#[cfg(feature = "with-serde")]
#[derive(serde::Serialize)]
struct JsonRow<'a> {
    email: &'a str,
    deliverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<&'a Verification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[OutputRow]) -> Result<()> {
    let rows: Vec<JsonRow<'_>> = rows
        .iter()
        .map(|row| JsonRow {
            email: &row.email,
            deliverable: row.deliverable(),
            verification: row.outcome.as_ref().ok(),
            error: row.outcome.as_ref().err().map(|err| err.kind().to_string()),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[OutputRow]) -> Result<()> {
    anyhow::bail!("format=json nécessite la feature 'with-serde'")
}
