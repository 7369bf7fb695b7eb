use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use proptool_core::config::{DEFAULT_CONFIG_FILENAME, ImportConfig, load_config};
use proptool_core::remote::HttpListingApi;
use proptool_core::report::format_report;
use proptool_core::schema::{self, PropertyType};
use proptool_core::validate::{Diagnostic, has_errors};
use proptool_core::workflow::ImportSession;
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(
    name = "proptool",
    version,
    about = "Validate, normalize, and import property listings against the admin API"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Path to proptool.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Emit diagnostics as JSON instead of a text report")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Print the listing schema: enumerations, fields, and the tag vocabulary")]
    Schema,
    #[command(about = "Normalize a draft and print the result without validating")]
    Normalize(DraftArgs),
    #[command(about = "Validate a draft locally")]
    Validate(ListingArgs),
    #[command(about = "Validate locally, then run the remote validate-only round trip")]
    Check(ListingArgs),
    #[command(about = "Run the full two-phase import")]
    Import(ListingArgs),
}

#[derive(Debug, Args)]
struct DraftArgs {
    #[arg(value_name = "FILE", help = "Draft JSON file, or - for stdin")]
    file: String,
}

#[derive(Debug, Args)]
struct ListingArgs {
    #[arg(
        short = 't',
        long = "property-type",
        value_name = "TYPE",
        help = "Effective property type; overrides any property_type in the draft"
    )]
    property_type: String,
    #[arg(value_name = "FILE", help = "Draft JSON file, or - for stdin")]
    file: String,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Schema => {
            println!("{}", serde_json::to_string_pretty(&schema::summary())?);
            Ok(true)
        }
        Commands::Normalize(args) => {
            let draft: Value = serde_json::from_str(&read_draft(&args.file)?)
                .context("draft is not valid JSON")?;
            let record = proptool_core::normalize::normalize(&draft);
            println!("{}", serde_json::to_string_pretty(&Value::Object(record))?);
            Ok(true)
        }
        Commands::Validate(args) => {
            let mut session = start_session(args)?;
            session.validate_local()?;
            print_diagnostics(session.diagnostics(), cli.json)?;
            Ok(!has_errors(session.diagnostics()))
        }
        Commands::Check(args) => {
            let api = api_client(cli)?;
            let mut session = start_session(args)?;
            let valid = session.validate(&api)?;
            print_diagnostics(session.diagnostics(), cli.json)?;
            if valid && let Some(preview) = session.preview() {
                eprintln!(
                    "remote validation passed: {}",
                    serde_json::to_string(preview)?
                );
            }
            Ok(valid)
        }
        Commands::Import(args) => {
            let api = api_client(cli)?;
            let mut session = start_session(args)?;
            if !session.validate(&api)? {
                print_diagnostics(session.diagnostics(), cli.json)?;
                return Ok(false);
            }
            match session.import(&api)? {
                Some(listing) => {
                    println!("{}", listing.id);
                    Ok(true)
                }
                None => {
                    print_diagnostics(session.diagnostics(), cli.json)?;
                    Ok(false)
                }
            }
        }
    }
}

fn start_session(args: &ListingArgs) -> Result<ImportSession> {
    let Some(property_type) = PropertyType::parse(&args.property_type) else {
        bail!(
            "unknown property type: {} (expected one of {})",
            args.property_type,
            schema::PROPERTY_TYPES.join(", ")
        );
    };
    let mut session = ImportSession::new();
    session.select_category(property_type);
    session.set_draft(read_draft(&args.file)?)?;
    Ok(session)
}

fn api_client(cli: &Cli) -> Result<HttpListingApi> {
    let config = resolve_config(cli)?;
    HttpListingApi::from_config(&config)
}

fn resolve_config(cli: &Cli) -> Result<ImportConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
    load_config(&path)
}

fn read_draft(file: &str) -> Result<String> {
    if file == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read draft from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(file).with_context(|| format!("failed to read {file}"))
}

fn print_diagnostics(diagnostics: &[Diagnostic], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(diagnostics)?);
    } else {
        println!("{}", format_report(diagnostics));
    }
    Ok(())
}
