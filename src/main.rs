mod options;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calexport_core::{
    Destination, ExportConfig, ExportRequest, ExportSummary, FileDirectory, FileStore, check_specs,
    run_export,
};
use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use owo_colors::OwoColorize;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "calexport")]
#[command(about = "Export calendar and contact collections from a calendar server's data store")]
#[command(
    after_help = "Options are applied in order: --collection, --calendars and --contacts \
                  modify the exporter added just before them."
)]
struct Cli {
    /// Configuration file (defaults to ~/.config/calexport/config.toml)
    #[arg(short = 'f', long = "config")]
    config: Option<PathBuf>,

    /// Export the home with this UID
    #[arg(long, action = ArgAction::Append)]
    uid: Vec<String>,

    /// Export the home of a directory record (e.g. "users:user01")
    #[arg(short, long, value_name = "TYPE:SHORTNAME", action = ArgAction::Append)]
    record: Vec<String>,

    /// Export the home of a user, same as --record users:NAME
    #[arg(short, long, action = ArgAction::Append)]
    user: Vec<String>,

    /// Export only this collection of the preceding exporter
    #[arg(short, long, action = ArgAction::Append)]
    collection: Vec<String>,

    /// Export calendars (the default)
    #[arg(long, action = ArgAction::Count)]
    calendars: u8,

    /// Export contacts instead of calendars (requires --directory)
    #[arg(long, action = ArgAction::Count)]
    contacts: u8,

    /// Export every home
    #[arg(long)]
    all: bool,

    /// Write one merged calendar to this file ("-" for stdout)
    #[arg(short, long, default_value = "-", conflicts_with = "directory")]
    output: PathBuf,

    /// Write one file per collection into this directory, replacing its contents
    #[arg(short, long)]
    directory: Option<PathBuf>,

    /// Rewrite attendee and organizer addresses to mailto: where an email is known
    #[arg(long)]
    mailto: bool,

    /// Log debug output
    #[arg(short = 'D', long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    init_logging(cli.debug);

    let ordered = options::ordered_args(&matches);
    let specs = options::build_specs(ordered, cli.all)
        .unwrap_or_else(|e| usage_error(ErrorKind::InvalidValue, e));
    if let Err(e) = check_specs(&specs, cli.directory.is_none()) {
        usage_error(ErrorKind::MissingRequiredArgument, e);
    }

    let destination = match &cli.directory {
        Some(dir) => Destination::Directory(dir.clone()),
        None => open_output(&cli.output).unwrap_or_else(|e| {
            eprintln!("Unable to open output file for writing: {e}");
            std::process::exit(1);
        }),
    };

    let config = ExportConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let directory = FileDirectory::load(&config.directory_file())
        .await
        .context("Failed to load accounts")?;
    let store = FileStore::open(config.data_root());
    tracing::debug!(data_root = %store.root().display(), "opened store");

    let request = ExportRequest {
        specs,
        destination,
        convert_to_mailto: cli.mailto,
    };

    let mut txn = store.new_transaction();
    let summary = run_export(request, &directory, &mut txn).await?;
    print_summary(&summary, &cli.output);

    Ok(())
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "calexport=debug,calexport_core=debug,warn"
    } else {
        "calexport=info,calexport_core=info,warn"
    };

    let filter = if debug {
        EnvFilter::new(default_filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn usage_error(kind: ErrorKind, message: impl std::fmt::Display) -> ! {
    Cli::command().error(kind, message).exit()
}

fn open_output(path: &Path) -> std::io::Result<Destination> {
    let out: Box<dyn Write + Send> = if path == Path::new("-") {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        Box::new(BufWriter::new(File::create(path)?))
    };
    Ok(Destination::Stream(out))
}

fn print_summary(summary: &ExportSummary, output: &Path) {
    let noun = if summary.collections == 1 {
        "collection"
    } else {
        "collections"
    };
    let headline = format!(
        "Exported {} {} ({} entries)",
        summary.collections, noun, summary.objects
    );

    if summary.files.is_empty() {
        let target = if output == Path::new("-") {
            "stdout".to_string()
        } else {
            output.display().to_string()
        };
        eprintln!("{} to {}", headline.green(), target);
    } else {
        eprintln!("{}", headline.green());
        for file in &summary.files {
            eprintln!("   {}", file.display().dimmed());
        }
    }
}
