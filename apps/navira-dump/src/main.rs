use clap::Parser;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

mod dump;

use dump::{DumpOptions, OutputMode};

/// `navira-dump` prints the frames and blocks of a CAR file, verifying every block on the way
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CAR file
    car: PathBuf,

    /// Do not check blocks against the hash of their CID
    #[arg(long)]
    no_verify: bool,

    /// Also decode the UnixFS data of dag-pb blocks
    #[arg(long)]
    unixfs: bool,

    /// Print one JSON object per block instead of the text dump
    #[arg(long)]
    json: bool,
}

impl Args {
    fn dump_options(&self) -> DumpOptions {
        DumpOptions {
            verify: !self.no_verify,
            unixfs: self.unixfs,
            mode: if self.json {
                OutputMode::Json
            } else {
                OutputMode::Text
            },
        }
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help and --version print to stdout and exit 0
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            err.print().ok();
            return ExitCode::FAILURE;
        }
    };
    setup_logging();

    info!("Dumping CAR file: {:?}", args.car);
    let mut out = BufWriter::new(std::io::stdout().lock());
    match dump::dump_file(&args.car, &args.dump_options(), &mut out) {
        Ok(blocks) => {
            info!("Dumped {} blocks", blocks);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() {
    use tracing_subscriber::FmtSubscriber;

    const DEFAULT_LOGGING: &str = "navira_dump=info,warn";

    let rust_log = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| if s.is_empty() { None } else { Some(s) })
        .unwrap_or_else(|| DEFAULT_LOGGING.to_owned());

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(rust_log)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .expect("tracing setup failed");
}
