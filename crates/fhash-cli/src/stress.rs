//! # Stress workload
//!
//! Worker threads open files by name through a shared `FileHashTable`,
//! reusing handles other workers already hold, and release them again.
//! A handle stays open until its last holder releases it. At the end the
//! table must be empty, every indexed file closed, and no invariant error
//! reported.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use fhash::{FileHashTable, FileObject, HashError, InsertOutcome, TableConfig, TableStats};
use fhash_config::{log_stress_debug, log_stress_error, log_stress_info, Config};
use rayon::prelude::*;
use serde::Serialize;

/// First simulated descriptor; 0..=2 are the standard streams.
const FIRST_FD: i32 = 3;

#[derive(Args, Debug, Default)]
pub struct StressArgs {
    /// Worker threads (default: config, then CPU count)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Distinct file names shared by the workers
    #[arg(long)]
    files: Option<usize>,

    /// Open/release rounds per worker
    #[arg(long)]
    rounds: Option<usize>,

    /// Table bucket count
    #[arg(long)]
    buckets: Option<usize>,

    /// Trace the whole table on every lookup miss (slow)
    #[arg(long)]
    dump_on_miss: bool,

    /// Print any entries still indexed after the run
    #[arg(long)]
    dump: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

/// Resolved workload parameters.
#[derive(Debug, Clone, Serialize)]
pub struct StressPlan {
    pub threads: usize,
    pub files: usize,
    pub rounds: usize,
}

impl StressPlan {
    fn resolve(config: &Config, args: &StressArgs) -> Result<Self> {
        let threads = args
            .threads
            .or(config.stress.threads)
            .unwrap_or_else(rayon::current_num_threads);
        let plan = Self {
            threads,
            files: args.files.unwrap_or(config.stress.files),
            rounds: args.rounds.unwrap_or(config.stress.rounds),
        };
        if plan.threads == 0 || plan.files == 0 {
            bail!("threads and files must both be at least 1");
        }
        Ok(plan)
    }

    fn name(&self, worker: usize, round: usize) -> String {
        // Stride by a prime so workers overlap on names without moving in lockstep
        format!("stress.file.{}", (worker * 7 + round) % self.files)
    }
}

/// Per-worker counters, summed into the report.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Tally {
    pub lookups: u64,
    pub lookup_hits: u64,
    pub opened: u64,
    pub aliased: u64,
    pub removed: u64,
    /// Descriptors closed when their last holder let go
    pub closed: u64,
    /// Handles found closed while a worker still held them
    pub closed_while_held: u64,
    pub corrupt: u64,
}

impl Tally {
    fn merge(mut self, other: Tally) -> Tally {
        self.lookups += other.lookups;
        self.lookup_hits += other.lookup_hits;
        self.opened += other.opened;
        self.aliased += other.aliased;
        self.removed += other.removed;
        self.closed += other.closed;
        self.closed_while_held += other.closed_while_held;
        self.corrupt += other.corrupt;
        self
    }

    fn record_error(&mut self, worker: usize, err: HashError) {
        log_stress_error!("Index error", worker = worker, error = err.to_string().as_str());
        if err.is_corrupt() {
            self.corrupt += 1;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StressReport {
    pub plan: StressPlan,
    pub buckets: usize,
    pub totals: Tally,
    /// Table occupancy just before the final release
    pub peak: TableStats,
    /// Members left after every worker released its handles
    pub leaked: usize,
    pub elapsed_ms: u128,
}

impl StressReport {
    pub fn is_clean(&self) -> bool {
        self.totals.corrupt == 0
            && self.leaked == 0
            && self.totals.closed_while_held == 0
            && self.totals.closed == self.totals.opened
    }
}

/// Drive `plan` against `table` and report what happened.
pub fn run_workload(table: &FileHashTable, plan: &StressPlan) -> StressReport {
    let start = Instant::now();
    let next_fd = AtomicI32::new(FIRST_FD);

    // Workers hold their handles across the barrier between the two phases
    let (held, tally): (Vec<Vec<Arc<FileObject>>>, Vec<Tally>) = (0..plan.threads)
        .into_par_iter()
        .map(|worker| run_worker(table, plan, worker, &next_fd))
        .unzip();

    let peak = table.stats();

    let totals = held
        .into_par_iter()
        .enumerate()
        .map(|(worker, handles)| {
            let mut tally = Tally::default();
            release(table, worker, handles, &mut tally);
            tally
        })
        .reduce(Tally::default, Tally::merge);
    let totals = tally.into_iter().fold(totals, Tally::merge);

    StressReport {
        plan: plan.clone(),
        buckets: table.bucket_count(),
        totals,
        peak,
        leaked: table.len(),
        elapsed_ms: start.elapsed().as_millis(),
    }
}

fn run_worker(
    table: &FileHashTable,
    plan: &StressPlan,
    worker: usize,
    next_fd: &AtomicI32,
) -> (Vec<Arc<FileObject>>, Tally) {
    let mut tally = Tally::default();
    let mut held: Vec<Arc<FileObject>> = Vec::new();

    for round in 0..plan.rounds {
        let name = plan.name(worker, round);

        tally.lookups += 1;
        let handle = match table.lookup(&name) {
            Ok(Some(existing)) => {
                tally.lookup_hits += 1;
                existing
            }
            Ok(None) => match open(table, &name, next_fd, &mut tally) {
                Ok(handle) => handle,
                Err(err) => {
                    tally.record_error(worker, err);
                    continue;
                }
            },
            Err(err) => {
                tally.record_error(worker, err);
                continue;
            }
        };
        held.push(handle);

        // Close everything every fourth round, except in the last one so that
        // the peak snapshot sees a populated table
        if round % 4 == 3 && round + 1 < plan.rounds {
            release(table, worker, std::mem::take(&mut held), &mut tally);
        }
    }

    log_stress_debug!("Worker finished", worker = worker, held = held.len());
    (held, tally)
}

/// Open `name` and index it, falling back to whichever handle won the race.
fn open(
    table: &FileHashTable,
    name: &str,
    next_fd: &AtomicI32,
    tally: &mut Tally,
) -> Result<Arc<FileObject>, HashError> {
    let fd = next_fd.fetch_add(1, Ordering::Relaxed);
    let fresh = Arc::new(FileObject::opened(name, fd));

    match table.insert(&fresh)? {
        InsertOutcome::Alias(existing) => {
            fresh.close();
            tally.aliased += 1;
            Ok(existing)
        }
        InsertOutcome::Inserted | InsertOutcome::AlreadyHashed => {
            tally.opened += 1;
            Ok(fresh)
        }
    }
}

/// Drop this worker's references. The first holder to let go unindexes the
/// file; whoever drops the last reference closes it.
fn release(table: &FileHashTable, worker: usize, handles: Vec<Arc<FileObject>>, tally: &mut Tally) {
    for handle in handles {
        if !handle.is_open() {
            log_stress_error!("Held handle already closed", worker = worker, file = handle.name());
            tally.closed_while_held += 1;
        }

        match table.remove(&handle) {
            Ok(true) => tally.removed += 1,
            Ok(false) => {}
            Err(err) => tally.record_error(worker, err),
        }

        // None while another worker, or the table, still holds it
        if let Some(file) = Arc::into_inner(handle) {
            file.close();
            tally.closed += 1;
        }
    }
}

pub fn run(config: &Config, args: StressArgs) -> Result<()> {
    let plan = StressPlan::resolve(config, &args)?;
    let table_config = TableConfig {
        buckets: args.buckets.unwrap_or(config.table.buckets),
        dump_on_miss: args.dump_on_miss || config.table.dump_on_miss,
    };
    let table = FileHashTable::from_config(&table_config).context("Failed to build table")?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(plan.threads)
        .build()
        .context("Failed to start worker pool")?;

    log_stress_info!(
        "Starting workload",
        threads = plan.threads,
        files = plan.files,
        rounds = plan.rounds,
        buckets = table.bucket_count(),
    );
    let report = pool.install(|| run_workload(&table, &plan));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    if args.dump {
        // Everything was released; the dump shows only leaked entries
        table.dump_to(std::io::stdout().lock())?;
    }

    if !report.is_clean() {
        bail!(
            "index inconsistent: {} corrupt, {} leaked, {} closed while held, {} of {} closed",
            report.totals.corrupt,
            report.leaked,
            report.totals.closed_while_held,
            report.totals.closed,
            report.totals.opened
        );
    }
    Ok(())
}

fn print_report(report: &StressReport) {
    let t = &report.totals;
    println!();
    println!("  fhash stress");
    println!("  ============");
    println!(
        "  workers: {}  files: {}  rounds: {}  buckets: {}",
        report.plan.threads, report.plan.files, report.plan.rounds, report.buckets
    );
    println!();
    println!("  lookups:  {} ({} hits)", t.lookups, t.lookup_hits);
    println!("  opened:   {}", t.opened);
    println!("  aliased:  {}", t.aliased);
    println!("  removed:  {}", t.removed);
    println!("  closed:   {} ({} while held)", t.closed, t.closed_while_held);
    println!(
        "  peak:     {} members in {} buckets (longest chain {})",
        report.peak.members, report.peak.occupied_buckets, report.peak.longest_chain
    );
    println!("  leaked:   {}", report.leaked);
    println!("  corrupt:  {}", t.corrupt);
    println!("  elapsed:  {} ms", report.elapsed_ms);
}
