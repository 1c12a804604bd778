use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-snapshot")]
#[command(about = "Capture website snapshots and resolve sitemaps from an interactive shell")]
#[command(version)]
pub struct Args {
    /// Directory snapshots are written under (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host to open before reading commands
    #[arg(long)]
    pub host: Option<String>,

    /// Snapshot name for --host (defaults to the current time)
    #[arg(short, long, requires = "host")]
    pub name: Option<String>,

    /// Log level (default: RUST_LOG, or info when unset)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Shell command to run before the prompt, e.g. -e "snapshot /" (repeatable)
    #[arg(short = 'e', long = "command")]
    pub commands: Vec<String>,

    /// Exit after running --command entries instead of reading stdin
    #[arg(long)]
    pub batch: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Args {
    /// The command that opens `--host`, if given.
    pub fn host_command(&self) -> Option<String> {
        let host = self.host.as_ref()?;
        Some(match &self.name {
            Some(name) => format!("host {} {}", host, name),
            None => format!("host {}", host),
        })
    }
}
