use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use table_import::config::{parse_delimiter, table_name_from_path, DEFAULT_SCHEMA};
use table_import::{
    connect, import_csv, import_json, Backend, ConnectionConfig, ImportOptions, ImportSummary, JsonDataType,
    RandomPlaceholders,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "table-import")]
#[command(about = "Import CSV and JSON lines into database tables")]
struct Args {
    /// Database backend
    #[arg(long, value_enum, default_value = "postgres", env = "DB_DRIVER")]
    driver: Backend,

    /// Database name (file path for sqlite)
    #[arg(long, default_value = "postgres", env = "DB_NAME")]
    db: String,

    #[arg(long, default_value = "localhost", env = "DB_HOST")]
    host: String,

    #[arg(long, default_value_t = 5432, env = "DB_PORT")]
    port: u16,

    #[arg(long, default_value = "postgres", env = "DB_USER")]
    user: String,

    #[arg(long, default_value = "", env = "DB_PASS", hide_env_values = true)]
    pass: String,

    /// Require SSL for the connection
    #[arg(long, env = "DB_SSL")]
    ssl: bool,

    /// Database schema
    #[arg(long, default_value = DEFAULT_SCHEMA, env = "DB_SCHEMA")]
    schema: String,

    /// Destination table (default: derived from the file name)
    #[arg(long, env = "DB_TABLE")]
    table: Option<String>,

    /// Skip rows that fail to import and write them to stderr
    #[arg(long)]
    ignore_errors: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import CSV into a table of TEXT columns
    Csv {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,

        /// Field delimiter
        #[arg(short, long, default_value = ",")]
        delimiter: String,

        /// Skip the header row when --fields is given
        #[arg(long)]
        skip_header: bool,

        /// Comma-separated list of column names
        #[arg(long)]
        fields: Option<String>,
    },
    /// Import one JSON document per line into a single JSON column
    Json {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,

        /// Column data type
        #[arg(long, value_enum, default_value = "json")]
        data_type: JsonDataType,
    },
}

fn open_input(file: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match file {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Couldn't open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn resolve_table(table: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(table) = table {
        return Ok(table);
    }
    match file.and_then(|f| table_name_from_path(f, &mut RandomPlaceholders::new())) {
        Some(table) => Ok(table),
        None => bail!("--table is required when reading from stdin"),
    }
}

fn print_summary(summary: &ImportSummary) {
    println!("{}", summary.report());
    if let Some(skipped) = summary.skipped_report() {
        println!("{}", skipped);
    }
}

fn run(args: Args) -> Result<()> {
    let config = match args.driver {
        Backend::Postgres => ConnectionConfig::postgres(&args.host, args.port, &args.user, &args.pass, &args.db, args.ssl),
        Backend::Sqlite => ConnectionConfig::sqlite(&args.db),
    };

    let mut sink = connect(&config, &args.schema)?;
    let mut stderr = io::stderr();

    let summary = match args.command {
        Command::Csv {
            file,
            delimiter,
            skip_header,
            fields,
        } => {
            let table = resolve_table(args.table, file.as_deref())?;
            let options = ImportOptions {
                ignore_errors: args.ignore_errors,
                skip_header,
                fields,
                delimiter: parse_delimiter(&delimiter)?,
                ..ImportOptions::new(&args.schema, table)
            };
            let input = open_input(file.as_deref())?;

            info!("Importing CSV into {}", options.qualified_table());
            import_csv(input, &mut *sink, &options, &mut RandomPlaceholders::new(), &mut stderr)?
        }
        Command::Json { file, data_type } => {
            let table = resolve_table(args.table, file.as_deref())?;
            let options = ImportOptions {
                ignore_errors: args.ignore_errors,
                ..ImportOptions::new(&args.schema, table)
            };
            let input = open_input(file.as_deref())?;

            info!("Importing JSON into {}", options.qualified_table());
            import_json(input, &mut *sink, &options, data_type, &mut stderr)?
        }
    };

    print_summary(&summary);
    Ok(())
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
