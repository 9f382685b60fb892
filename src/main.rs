//! Command-line interface for relaxng-rs

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use relaxng::validators::{DerivativeCheck, RelaxNgSchema, ValidationOptions};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "relaxng")]
#[command(author, version, about = "RELAX NG schema validation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a RELAX NG schema and display pattern statistics
    Inspect {
        /// RELAX NG schema in XML syntax
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Print the statistics as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Validate an XML document against a RELAX NG schema
    Validate {
        /// RELAX NG schema in XML syntax
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Instance document
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// How the derivative check reacts to a rejected document
        #[arg(short, long, default_value = "log", value_parser = parse_derivative_check)]
        derivative_check: DerivativeCheck,

        /// Print the verdict and errors as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn parse_derivative_check(mode: &str) -> Result<DerivativeCheck, String> {
    DerivativeCheck::from_str(&mode.to_ascii_lowercase()).map_err(|e| e.to_string())
}

#[cfg(feature = "cli")]
fn main() {
    let outcome = match Cli::parse().command {
        Commands::Inspect { schema, json } => cmd_inspect(schema, json),
        Commands::Validate {
            schema,
            document,
            derivative_check,
            json,
        } => cmd_validate(schema, document, derivative_check, json),
    };

    // 0 valid, 1 invalid, 2 the schema or document could not be read
    let code = match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    };
    std::process::exit(code);
}

#[cfg(feature = "cli")]
fn cmd_inspect(schema_path: PathBuf, as_json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let schema = RelaxNgSchema::from_file(&schema_path)?;
    let stats = schema.stats();

    if as_json {
        let output = serde_json::json!({
            "schema": schema_path.display().to_string(),
            "start": schema.start().index(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(true);
    }

    println!("Schema: {}", schema_path.display());
    println!();
    println!("Patterns:      {}", stats.patterns);
    println!("  elements:    {}", stats.elements);
    println!("  attributes:  {}", stats.attributes);
    println!("  choices:     {}", stats.choices);
    println!("  groups:      {}", stats.groups);
    println!("  interleaves: {}", stats.interleaves);
    println!("  oneOrMore:   {}", stats.one_or_more);
    println!("Name classes:  {}", stats.name_classes);

    Ok(true)
}

#[cfg(feature = "cli")]
fn cmd_validate(
    schema_path: PathBuf,
    document: PathBuf,
    check: DerivativeCheck,
    as_json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let schema = RelaxNgSchema::from_file(&schema_path)?
        .with_options(ValidationOptions::new().with_derivative_check(check));
    let result = schema.validate_file(&document)?;
    let valid = result.is_valid();

    if as_json {
        let report = serde_json::json!({
            "file": document.display().to_string(),
            "valid": valid,
            "errors": result.errors,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(valid);
    }

    if valid {
        println!("✓ Document is valid");
        return Ok(true);
    }
    println!("✗ Document is invalid ({} errors)", result.errors.len());
    println!("Errors:");
    result.errors.iter().for_each(|error| println!("  - {}", error));
    Ok(false)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("relaxng was built without the `cli` feature");
    std::process::exit(1);
}
