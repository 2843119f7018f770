use anyhow::{Context as _, Result, bail};
use clap::Parser;
use clidrive::script::parse_duration;
use clidrive::{Context, Db2Cli, EngineConfig, Stream, db2, logging, parse_file};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "clidrive",
    about = "Run a batch script against the DB2 command line processor",
    version
)]
struct Args {
    /// Path to the script file
    #[arg(short, long)]
    script: PathBuf,

    /// Database alias to connect to before the script runs
    #[arg(short, long)]
    database: Option<String>,

    /// Statement delimiter passed to db2 as -td<delimiter>
    #[arg(long, default_value_t = db2::DEFAULT_DELIMITER)]
    delimiter: char,

    /// The db2 executable
    #[arg(long, env = "CLIDRIVE_DB2", default_value = "db2")]
    db2: String,

    /// Extra arguments placed before -td<delimiter> (e.g. a wrapper script path)
    #[arg(long = "db2-arg", allow_hyphen_values = true)]
    db2_args: Vec<String>,

    /// Per-statement timeout (e.g. 300s, 1500ms)
    #[arg(long, env = "CLIDRIVE_TIMEOUT", default_value = "300s", value_parser = parse_duration)]
    timeout: Duration,

    /// Report failed statements and continue with the rest of the script
    #[arg(short, long)]
    keep_going: bool,

    /// Copy everything db2 prints on stdout to this file
    #[arg(long)]
    mirror: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose, args.log_file.as_deref())?;

    let commands = parse_file(&args.script)
        .with_context(|| format!("Failed to parse script file: {}", args.script.display()))?;

    let profile = db2::profile(args.delimiter).command_line_override(
        args.db2.clone(),
        args.db2_args
            .iter()
            .cloned()
            .chain(std::iter::once(format!("-td{}", args.delimiter))),
    );
    let config = EngineConfig::default().with_request_timeout(args.timeout);
    let mut session = Db2Cli::with_profile(profile, args.delimiter, config)
        .await
        .with_context(|| format!("Failed to start {}", args.db2))?;

    if let Some(path) = &args.mirror {
        let file = File::create(path)
            .with_context(|| format!("Failed to create mirror file: {}", path.display()))?;
        session
            .engine()
            .set_mirror(Stream::Stdout, Some(Box::new(BufWriter::new(file))))?;
    }

    if let Some(alias) = &args.database {
        session
            .connect(Some(alias))
            .await
            .with_context(|| format!("Failed to connect to {alias}"))?;
    }

    let mut ctx = Context::new(session, std::io::stdout()).keep_going(args.keep_going);
    let result = ctx.run(&commands).await.context("Failed to execute script");
    let failures = ctx.failures();
    ctx.into_db2().close()?;
    result?;

    if failures > 0 {
        bail!("{failures} statement(s) failed");
    }
    Ok(())
}
