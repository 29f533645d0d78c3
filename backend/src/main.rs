//! sheethook CLI - spreadsheet edits to JSON webhooks
//!
//! # Main Commands
//!
//! ```bash
//! sheethook serve                                   # Start HTTP server (port 3000)
//! sheethook context context.csv                     # Context sheet export -> context tree
//! sheethook payload epics.csv --row 4 -c context.csv  # Build the payload for an Epics row
//! sheethook payload epics.csv --row 4 -c context.csv --send  # ...and POST it
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! sheethook key <spreadsheet-id> <last-row>         # Show the cache key
//! sheethook trigger --column 10 --value "Groom EPIC"  # Check the trigger rule
//! ```

use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::Value;
use sheethook::{
    api::types::format_delimiter, assemble, context_cache_key, is_target_trigger, map_row,
    parse_grid_file, transform, Config, ParsedGrid, TriggerMeta, WebhookClient,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheethook")]
#[command(about = "Turn spreadsheet edits into JSON context trees and webhook payloads", long_about = None)]
struct Cli {
    /// JSON config file (default: environment / .env)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Build a context tree from a Context sheet export (CSV or JSON)
    Context {
        /// Input file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build the webhook payload for one row of an Epics sheet export
    Payload {
        /// Epics sheet export (header in row 1)
        input: PathBuf,

        /// Sheet row number to send (1-based, header is row 1)
        #[arg(short, long)]
        row: usize,

        /// Context sheet export
        #[arg(short, long)]
        context: Option<PathBuf>,

        /// Spreadsheet identity for the metadata fields
        #[arg(long, default_value = "local")]
        spreadsheet_id: String,

        /// Sheet name for the metadata fields
        #[arg(long, default_value = "Epics")]
        sheet_name: String,

        /// Acting user for the metadata fields
        #[arg(long, default_value = "")]
        user: String,

        /// POST the payload to the configured `epics` webhook
        #[arg(long)]
        send: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the cache key for a spreadsheet at a given size
    Key {
        spreadsheet_id: String,
        last_row: usize,
    },

    /// Check whether an edit would fire the Epics trigger
    Trigger {
        /// Edited column (1-based)
        #[arg(long)]
        column: u32,

        /// New cell value
        #[arg(long)]
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => Config::from_file(p)?,
        None => Config::from_env()?,
    };
    Ok(config)
}

async fn run(command: Commands, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve { port } => sheethook::server::start_server(port, config).await,

        Commands::Context { input, output } => cmd_context(&input, output.as_deref()),

        Commands::Payload {
            input,
            row,
            context,
            spreadsheet_id,
            sheet_name,
            user,
            send,
            output,
        } => {
            let meta = TriggerMeta {
                spreadsheet_id,
                sheet_name,
                row: u32::try_from(row)?,
                user,
                edited_at: Utc::now(),
            };
            cmd_payload(&config, &input, row, context.as_deref(), meta, send, output.as_deref()).await
        }

        Commands::Key { spreadsheet_id, last_row } => {
            println!("{}", context_cache_key(&spreadsheet_id, last_row));
            Ok(())
        }

        Commands::Trigger { column, value } => {
            let fires = is_target_trigger(column, &Value::String(value));
            println!("{}", fires);
            Ok(())
        }
    }
}

fn load_grid(input: &Path) -> Result<ParsedGrid, Box<dyn std::error::Error>> {
    let parsed = parse_grid_file(input)?;
    eprintln!("Reading: {}", input.display());
    eprintln!("   Encoding: {}", parsed.encoding);
    if let Some(d) = parsed.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(d));
    }
    eprintln!("   Rows: {}", parsed.last_row());
    Ok(parsed)
}

fn cmd_context(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = load_grid(input)?;
    let tree = transform(Some(&parsed.grid[..]));
    eprintln!("   Top-level entries: {}", tree.len());

    let json = serde_json::to_string_pretty(&tree)?;
    write_output(&json, output)
}

async fn cmd_payload(
    config: &Config,
    input: &Path,
    row: usize,
    context_path: Option<&Path>,
    meta: TriggerMeta,
    send: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let epics = load_grid(input)?;
    if row < 2 || row > epics.last_row() {
        return Err(format!("row {} is outside data rows 2..={}", row, epics.last_row()).into());
    }

    let row_object = map_row(epics.headers(), &epics.grid[row - 1]);

    let context = match context_path {
        Some(p) => transform(Some(&load_grid(p)?.grid[..])),
        None => Default::default(),
    };

    let payload = assemble(&Value::Object(row_object), &Value::Object(context), Some(&meta));

    if send {
        let url = config
            .webhook_url(sheethook::config::EPICS_OPERATION)
            .ok_or("no webhook configured for 'epics' (set SHEETHOOK_WEBHOOK_EPICS)")?;
        let status = WebhookClient::from_config(config).post(url, &payload).await?;
        eprintln!("Delivered (HTTP {})", status);
    }

    let json = serde_json::to_string_pretty(&payload)?;
    write_output(&json, output)
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
