use crate::domain::config::ConnectionMode;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command line arguments for SeqCom
#[derive(Parser, Debug)]
#[command(
    name = "seqcom",
    version = env!("CARGO_PKG_VERSION"),
    about = "Scripted command sequencer for serial and TCP device links",
    long_about = "Drives a single serial or TCP connection to an external device and replays \
                  indexed command scripts against it with a configurable inter-command delay."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available serial ports
    Ports,
    /// Send a single command over the link and print the device traffic
    Send {
        /// Command text to send
        command: String,

        #[command(flatten)]
        link: LinkArgs,

        /// Seconds to wait for device output after sending
        #[arg(short, long, default_value = "2")]
        wait: u64,
    },
    /// Replay a script file line by line over the link
    Run {
        /// Script file (plain text, one command per line)
        script: PathBuf,

        #[command(flatten)]
        link: LinkArgs,

        /// Inter-command delay in milliseconds
        #[arg(short, long)]
        delay: Option<u64>,
    },
    /// Print the re-numbered generation pass for a script file; sends nothing
    Generate {
        /// Script file (plain text, one command per line)
        script: PathBuf,
    },
}

/// Link selection arguments shared by the sending commands
#[derive(ClapArgs, Debug)]
pub struct LinkArgs {
    /// Connection mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Serial port name (serial mode; defaults to the first discovered port)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate (serial mode)
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Host address (tcp mode)
    #[arg(long)]
    pub host: Option<String>,

    /// TCP port (tcp mode)
    #[arg(long)]
    pub tcp_port: Option<u16>,
}

/// Connection mode argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ModeArg {
    Serial,
    Tcp,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

impl From<ModeArg> for ConnectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Serial => Self::Serial,
            ModeArg::Tcp => Self::Tcp,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
