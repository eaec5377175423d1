use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use tracing::error;
use vecadd_cl::{
    config::{DEFAULT_LEN, DEFAULT_LOCAL_SIZE},
    run, DeviceKind, KernelSource, RunConfig,
};

#[cfg(feature = "metrics")]
use vecadd_cl::summary;

const EXIT_CODES: &str = "\
Exit codes:
  0  walkthrough completed
  1  no OpenCL platform or no device of the requested type (message on stdout),
     or any later OpenCL, kernel-build or I/O failure (logged on stderr)";

/// Walks through the OpenCL host API with a vector addition
#[derive(Parser, Debug)]
#[command(name = "vecadd-cl")]
#[command(version)]
#[command(after_help = EXIT_CODES)]
struct Args {
    /// Device class to run on: cpu, gpu, accelerator, default or all
    #[arg(short = 't', long, default_value_t = DeviceKind::Cpu)]
    device_type: DeviceKind,

    /// Number of elements in each vector
    #[arg(short = 'n', long, default_value_t = DEFAULT_LEN)]
    len: usize,

    /// Work-items per work-group
    #[arg(short = 'l', long, default_value_t = DEFAULT_LOCAL_SIZE)]
    local_size: usize,

    /// OpenCL C source with an `add` kernel (default: bundled kernel_add.cl)
    #[arg(short, long)]
    kernel: Option<PathBuf>,

    /// Log level for stderr; RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl From<Args> for RunConfig {
    fn from(args: Args) -> Self {
        RunConfig {
            device_kind: args.device_type,
            len: args.len,
            local_size: args.local_size,
            source: args.kernel.map_or(KernelSource::Bundled, KernelSource::File),
        }
    }
}

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args.log_level);

    let config = RunConfig::from(args);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let code = match run(&config, &mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_discovery() => {
            // discovery failures are part of the stdout text
            if let Err(io_err) = writeln!(out, "{e}") {
                error!("cannot write to stdout: {io_err}");
            }
            ExitCode::from(1)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    };
    if let Err(e) = out.flush() {
        error!("cannot flush stdout: {e}");
    }

    #[cfg(feature = "metrics")]
    summary();

    code
}
