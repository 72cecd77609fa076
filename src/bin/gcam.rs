#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use clap::Parser;
use tracing::{Level, info, warn};

use gcam::collector::MmpmonSource;
use gcam::collector::mmpmon::DEFAULT_MMPMON;
use gcam::collector::nodes::DEFAULT_MMLSNODE;
use gcam::config::{
    DEFAULT_STALL_INTERVALS, DEFAULT_STALL_LIMIT, MonitorConfig, NodeSelection, ViewMode,
    interval_from_secs, parse_node_list,
};
use gcam::error::MonitorError;
use gcam::logging::{LogTarget, init_logging};
use gcam::provider::Poller;
use gcam::report::{render_text, run_batch};
use gcam::tui::{App, AppState, SessionInfo};

#[derive(Parser)]
#[command(
    name = "gcam",
    about = "Live per-node, per-filesystem GPFS I/O throughput from mmpmon",
    version = gcam::VERSION
)]
struct Args {
    /// Refresh interval in seconds (at least 1).
    #[arg(short = 'n', long, default_value = "3", env = "GCAM_INTERVAL")]
    interval: f64,

    /// Node on which mmpmon and mmlsnode run; other hosts are reached over ssh.
    #[arg(long, default_value = "localhost", env = "GCAM_HOST")]
    host: String,

    /// Nodeset to monitor, as listed by mmlsnode (default: the first one).
    #[arg(long, env = "GCAM_NODESET")]
    nodeset: Option<String>,

    /// Comma-separated node list; skips mmlsnode and wins over --nodeset.
    #[arg(long, value_name = "N1,N2,...")]
    nodes: Option<String>,

    /// Initial view.
    #[arg(long, default_value_t = ViewMode::Flat)]
    view: ViewMode,

    /// Number of mmpmon repetitions (0 = until interrupted).
    #[arg(long, default_value = "0")]
    runs: u32,

    /// Print each round as plain text instead of starting the TUI.
    #[arg(long)]
    batch: bool,

    /// Do not print the last table when the TUI exits.
    #[arg(long)]
    no_print_last: bool,

    /// Intervals without data before the source is reported stalled.
    #[arg(long, default_value_t = DEFAULT_STALL_INTERVALS)]
    stall_intervals: u32,

    /// Consecutive stall windows before giving up.
    #[arg(long, default_value_t = DEFAULT_STALL_LIMIT)]
    stall_limit: u32,

    /// Path to mmpmon.
    #[arg(long, default_value = DEFAULT_MMPMON, value_name = "PATH")]
    mmpmon: PathBuf,

    /// Path to mmlsnode.
    #[arg(long, default_value = DEFAULT_MMLSNODE, value_name = "PATH")]
    mmlsnode: PathBuf,

    /// Append logs to this file. Without it the TUI logs nothing.
    #[arg(long, env = "GCAM_LOG_FILE", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// More verbose logging (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn to_config(&self) -> Result<MonitorConfig, MonitorError> {
        let nodes = match &self.nodes {
            Some(list) => NodeSelection::Explicit(parse_node_list(list)),
            None => NodeSelection::Discover {
                nodeset: self.nodeset.clone(),
            },
        };
        let config = MonitorConfig {
            host: self.host.clone(),
            interval: interval_from_secs(self.interval)?,
            nodes,
            view: self.view,
            runs: self.runs,
            batch: self.batch,
            print_last: !self.no_print_last,
            stall_intervals: self.stall_intervals,
            stall_limit: self.stall_limit,
            mmpmon: self.mmpmon.clone(),
            mmlsnode: self.mmlsnode.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

fn run(args: Args) -> Result<(), MonitorError> {
    let target = if args.batch {
        LogTarget::FileOrStderr
    } else {
        LogTarget::FileOnly
    };
    init_logging(args.log_file.as_deref(), args.log_level, args.verbose, target)?;

    let config = args.to_config()?;
    if !config.batch && !io::stdout().is_terminal() {
        return Err(MonitorError::NotATerminal);
    }

    info!("gcam {} starting", gcam::VERSION);
    info!(
        "Config: host={}, interval={}s, nodes={}, view={}, runs={}, batch={}",
        config.host,
        config.interval_secs(),
        config.nodes.label(),
        config.view,
        config.runs,
        config.batch
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let s = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        s.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let nodes = match (config.node_discovery(), &config.nodes) {
        (Some(discovery), _) => discovery.discover()?,
        (None, NodeSelection::Explicit(nodes)) => nodes.clone(),
        (None, NodeSelection::Discover { .. }) => Vec::new(),
    };
    info!("Monitoring {} nodes: {}", nodes.len(), nodes.join(","));

    let source = MmpmonSource::new(config.mmpmon_command());
    let mut poller = Poller::new(Box::new(source), &config);
    poller.start(&nodes)?;

    if config.batch {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        run_batch(&mut poller, config.view, &mut out, &shutdown)?;
        return Ok(());
    }

    let session = SessionInfo {
        host: config.host.clone(),
        nodes_label: config.nodes.label(),
        node_count: nodes.len(),
        interval_secs: config.interval_secs(),
    };
    let mut app = App::new(poller, AppState::new(session, config.view), shutdown);
    let result = app.run();
    if config.print_last
        && let Some(table) = app.last_table()
    {
        print!("{}", render_text(table, app.view(), Local::now()));
    }
    result
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("gcam: {e}");
        std::process::exit(e.exit_code());
    }
}
