use clap::Parser;
use linegrab::config::{OutputTemplate, SessionConfig, SourceMode};
use linegrab::timing::TimingMode;
use tracing::{debug, error, trace};

/// Annotate a byte stream with per-line timing information
#[derive(Parser)]
#[command(name = "linegrab")]
#[command(version)]
#[command(
    about = "Read bytes from stdin, a device, or a command and annotate each line with elapsed/delta timing",
    long_about = None
)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Read from a character device instead of stdin
    #[arg(short, long, conflicts_with = "command")]
    device: Option<String>,

    /// Launch a command and read its output
    #[arg(short, long)]
    command: Option<String>,

    /// Read the command's stderr instead of its stdout
    #[arg(long, requires = "command")]
    stderr: bool,

    /// Annotate each line with elapsed and delta seconds
    #[arg(short = 't', long, conflicts_with = "systime")]
    time: bool,

    /// Annotate each line with the wall-clock time
    #[arg(short = 's', long)]
    systime: bool,

    /// strftime-style format for --systime
    #[arg(long, default_value = "%H:%M:%S%.6f")]
    timeformat: String,

    /// Omit the delta when using --systime
    #[arg(long, requires = "systime")]
    nodelta: bool,

    /// Silence the live output; the output file is still written
    #[arg(short = 'Q', long)]
    quiet: bool,

    /// Set basetime when the run starts rather than at the first byte
    #[arg(short = 'l', long)]
    launchtime: bool,

    /// Rebase timing when a line starts with this pattern
    #[arg(short = 'm', long, value_name = "PATTERN")]
    basepat: Option<String>,

    /// Report the first time this pattern appears, at end of run
    #[arg(short = 'i', long, value_name = "PATTERN")]
    inlinepat: Option<String>,

    /// Stop the run as soon as this pattern appears
    #[arg(short = 'q', long, value_name = "PATTERN")]
    quitpat: Option<String>,

    /// Stop the run this many seconds after it starts
    #[arg(short = 'e', long, value_name = "SECONDS")]
    endtime: Option<f64>,

    /// Restart with identical options after a restartable stop
    #[arg(short = 'R', long)]
    restart: bool,

    /// Tee the stream to this file; strftime templates are expanded, a bare
    /// '%' means a default timestamp name, and a date-bearing template
    /// rotates daily
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<String>,

    /// Append to the output file instead of overwriting it
    #[arg(short = 'a', long, requires = "output")]
    append: bool,

    /// Treat carriage returns as newlines instead of discarding them
    #[arg(long)]
    crtonewline: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    debug!("linegrab started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let config = match build_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Fatal error: {}", e);
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = linegrab::session::run_session(&config) {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(if e.is_config() { 2 } else { 1 });
    }
}

fn build_config(cli: Cli) -> linegrab::Result<SessionConfig> {
    let source = match (cli.device, cli.command) {
        (Some(path), _) => SourceMode::Device(path),
        (None, Some(cmd)) => SourceMode::Command(cmd),
        (None, None) => SourceMode::Stdin,
    };

    let timing = if cli.time {
        Some(TimingMode::Relative)
    } else if cli.systime {
        Some(TimingMode::Absolute {
            format: cli.timeformat,
            show_delta: !cli.nodelta,
        })
    } else {
        None
    };

    let output = cli.output.as_deref().map(OutputTemplate::parse).transpose()?;

    Ok(SessionConfig {
        source,
        timing,
        quiet: cli.quiet,
        append: cli.append,
        cr_to_newline: cli.crtonewline,
        read_stderr: cli.stderr,
        base_pattern: cli.basepat,
        inline_pattern: cli.inlinepat,
        quit_pattern: cli.quitpat,
        endtime: cli.endtime,
        restart: cli.restart,
        launchtime: cli.launchtime,
        output,
    })
}
