use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;
use std::{fs, path::PathBuf};

use catalog_pipeline::app::validate_use_case::ValidationSummary;
use catalog_pipeline::domain::ProductOutcome;
use catalog_pipeline::pipeline::processing::contract::{ProductContract, RecordValidator};

/// Check a catalog JSON file against the product contract without writing anything.
#[derive(Parser, Debug)]
#[command(name = "check-blob", version, about = "Dry-run the product contract over a local catalog file")]
struct Cli {
    /// Path to a JSON file shaped like `{"products": [...]}`
    path: PathBuf,

    /// Print each failed record's violations
    #[arg(long, short)]
    verbose: bool,
}

fn load_products(path: &PathBuf) -> Result<Vec<Value>> {
    let data = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let json: Value =
        serde_json::from_str(&data).with_context(|| format!("Failed to parse JSON in {}", path.display()))?;
    match json {
        Value::Object(mut fields) => match fields.remove("products") {
            None => Ok(Vec::new()),
            Some(Value::Array(products)) => Ok(products),
            Some(_) => bail!("'products' in {} is not an array", path.display()),
        },
        _ => bail!("{} does not hold a JSON object", path.display()),
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let products = load_products(&args.path)?;
    let contract = ProductContract::new();

    let mut validated = 0;
    let mut failed = 0;
    for (index, record) in products.iter().enumerate() {
        match contract.check(record) {
            ProductOutcome::Validated(_) => validated += 1,
            ProductOutcome::Failed(entry) => {
                failed += 1;
                if args.verbose {
                    let id = record.get("id").map(Value::to_string).unwrap_or_else(|| format!("#{}", index));
                    eprintln!("product {}:", id);
                    for violation in &entry.errors {
                        eprintln!("- {} [{}]: {}", violation.field, violation.rule, violation.message);
                    }
                }
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&ValidationSummary::new(validated, failed))?);
    if failed > 0 {
        std::process::exit(1)
    }
    Ok(())
}
