use std::io::{self, Write, stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use csim::trace::TraceRecord;
use csim::{Accesses, Config, Error, Policy, simulate_file};

#[derive(Parser, Debug)]
#[command(
    name = "csim",
    version,
    about = "Set-associative cache simulator for valgrind memory traces",
    after_help = "Examples:\n  $ csim    -S 16  -K 1 -B 16 -p LRU -t traces/yi.trace\n  $ csim -v -S 256 -K 2 -B 16 -p LRU -t traces/yi.trace"
)]
struct Cli {
    /// Print the outcome of every access.
    #[arg(short, long)]
    verbose: bool,

    /// Number of sets (power of 2).
    #[arg(short = 'S', value_name = "num")]
    sets: usize,

    /// Number of lines per set.
    #[arg(short = 'K', value_name = "num")]
    ways: usize,

    /// Number of bytes per line (power of 2).
    #[arg(short = 'B', value_name = "num")]
    block_size: usize,

    /// Eviction policy, one of 'FIFO', 'LRU'.
    #[arg(short = 'p', value_name = "policy")]
    policy: Option<Policy>,

    /// Trace file.
    #[arg(short = 't', value_name = "file")]
    trace: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli, &mut stdout().lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Simulates the trace and writes the verbose lines and the summary to `out`.
fn run(cli: &Cli, out: &mut impl Write) -> Result<(), Error> {
    let config = Config::new(cli.sets, cli.ways, cli.block_size, cli.policy)?;
    log::info!("{config}");

    // the first failed write is reported once the replay is over
    let mut write_error: Option<io::Error> = None;
    let statistics = simulate_file(config, &cli.trace, |record, accesses| {
        if !cli.verbose || write_error.is_some() {
            return;
        }
        if let Err(e) = write_record(&mut *out, record, accesses) {
            write_error = Some(e);
        }
    })?;

    if let Some(e) = write_error {
        return Err(Error::Output(e));
    }

    log::info!("hit rate: {:.3}%", statistics.hit_rate());
    writeln!(out, "{statistics}").map_err(Error::Output)
}

/// Writes `record` followed by the outcome of each of its accesses.
fn write_record(
    out: &mut impl Write,
    record: &TraceRecord,
    accesses: &mut Accesses<'_>,
) -> io::Result<()> {
    write!(out, "{record}")?;
    for outcome in accesses {
        write!(out, " {outcome}")?;
    }
    writeln!(out)
}
