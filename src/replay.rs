use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::Config;
use crate::error::Error;
use crate::simulation::{CacheHit, Simulation, Statistics};
use crate::trace::{Blocks, TraceLine, TraceRecord};

/// Feeds trace records, in order, through a [`Simulation`].
#[derive(Debug)]
pub struct TraceReplayer<'s> {
    simulation: &'s mut Simulation,
    skipped_lines: usize,
}

impl<'s> TraceReplayer<'s> {
    pub fn new(simulation: &'s mut Simulation) -> Self {
        Self {
            simulation,
            skipped_lines: 0,
        }
    }

    /// Number of malformed lines ignored so far.
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Accesses every block the record touches, in ascending order. A modify
    /// walks the whole block sequence a second time after the first.
    ///
    /// Each access happens when the returned iterator yields its outcome.
    pub fn apply(&mut self, record: TraceRecord) -> Accesses<'_> {
        let blocks = record.blocks(self.simulation.config().block_size());

        Accesses {
            simulation: &mut *self.simulation,
            pass: blocks.clone(),
            blocks,
            passes_left: record.passes() - 1,
        }
    }

    /// Parses a single trace line. Returns `None` for instruction fetches
    /// and malformed lines, otherwise the record and its pending accesses.
    pub fn replay_line(&mut self, line: &str) -> Option<(TraceRecord, Accesses<'_>)> {
        match TraceLine::parse(line) {
            Ok(TraceLine::Data(record)) => Some((record, self.apply(record))),
            Ok(TraceLine::Instruction) => None,
            Err(e) => {
                log::debug!("skipping {e}");
                self.skipped_lines += 1;
                None
            }
        }
    }

    /// Replays every line of `reader`. `on_record` sees each data record
    /// together with its accesses; whatever it does not consume is run
    /// afterwards.
    pub fn replay<R: BufRead>(
        &mut self,
        mut reader: R,
        mut on_record: impl FnMut(&TraceRecord, &mut Accesses<'_>),
    ) -> Result<(), Error> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).map_err(Error::ReadTrace)? == 0 {
                break;
            }

            // invalid UTF-8 only ever makes a line malformed
            let line = String::from_utf8_lossy(&buf);
            if let Some((record, mut accesses)) = self.replay_line(&line) {
                on_record(&record, &mut accesses);
                accesses.run();
            }
        }

        if self.skipped_lines > 0 {
            log::debug!("skipped {} malformed trace lines", self.skipped_lines);
        }
        Ok(())
    }

    pub fn replay_str(&mut self, trace: &str) {
        for line in trace.lines() {
            if let Some((_, accesses)) = self.replay_line(line) {
                accesses.run();
            }
        }
    }
}

/// The cache accesses of one trace record, performed one per `next()`.
#[derive(Debug)]
#[must_use = "no access is simulated until the iterator is consumed"]
pub struct Accesses<'a> {
    simulation: &'a mut Simulation,
    blocks: Blocks,
    pass: Blocks,
    passes_left: usize,
}

impl Accesses<'_> {
    /// Performs the remaining accesses, discarding their outcomes.
    pub fn run(self) {
        self.for_each(drop);
    }
}

impl Iterator for Accesses<'_> {
    type Item = CacheHit;

    fn next(&mut self) -> Option<CacheHit> {
        loop {
            if let Some(address) = self.pass.next() {
                return Some(self.simulation.access(address));
            }
            if self.passes_left == 0 {
                return None;
            }
            self.passes_left -= 1;
            self.pass = self.blocks.clone();
        }
    }
}

/// Opens the trace at `path`, then builds a cache from `config` and replays
/// the whole trace through it.
///
/// Nothing is allocated for the cache if the trace cannot be opened.
pub fn simulate_file(
    config: Config,
    path: impl AsRef<Path>,
    on_record: impl FnMut(&TraceRecord, &mut Accesses<'_>),
) -> Result<Statistics, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::OpenTrace {
        path: path.to_path_buf(),
        source,
    })?;

    let mut simulation = Simulation::new(config);
    TraceReplayer::new(&mut simulation).replay(BufReader::new(file), on_record)?;
    Ok(simulation.statistics())
}
