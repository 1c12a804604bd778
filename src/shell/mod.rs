//! Line-oriented command shell over a [`Session`].

pub mod command;
pub mod session;

pub use command::{Command, ExtractReport, RestoreTarget};
pub use session::Session;

use crate::error::ShellError;
use crate::sitemap;
use crate::snapshot::SnapshotRecord;
use crate::transport::Transport;
use clap::error::ErrorKind;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Snapshot name used when none is given.
pub fn default_snapshot_name() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M").to_string()
}

pub struct Shell<T, R> {
    session: Session<T>,
    input: Lines<R>,
}

impl<T, R> Shell<T, R>
where
    T: Transport + Clone,
    R: AsyncBufRead + Unpin,
{
    pub fn new(session: Session<T>, reader: R) -> Self {
        Self {
            session,
            input: reader.lines(),
        }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Reads and executes commands until `exit` or end of input. Command
    /// failures are logged and the loop keeps going.
    pub async fn run(&mut self) -> Result<(), ShellError> {
        loop {
            let prompt = match self.session.active() {
                Some(active) => format!("{}/{}", active.host, active.name),
                None => String::new(),
            };
            let Some(line) = self.prompt(&prompt).await? else {
                break;
            };

            match self.execute(&line).await {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => ::log::error!("{}", e),
            }
        }
        Ok(())
    }

    /// Parses and runs one command line.
    pub async fn execute(&mut self, line: &str) -> Result<Flow, ShellError> {
        let command = match Command::parse_line(line) {
            Ok(command) => command,
            Err(e) if is_help(&e) => {
                ::log::info!("{}", e.render());
                return Ok(Flow::Continue);
            }
            Err(e) => return Err(e.into()),
        };
        ::log::debug!("Running {:?}", command);

        match command {
            Command::Exit => return Ok(Flow::Exit),
            Command::Host { host, name } => {
                let name = match name {
                    Some(name) => name,
                    None => self.prompt("snapshot name").await?.unwrap_or_default(),
                };
                let name = match name.trim() {
                    "" => default_snapshot_name(),
                    name => name.to_string(),
                };
                let active = self.session.open_host(&host, &name)?;
                ::log::info!("Snapshot dir: {}", active.dir.display());
            }
            Command::Select { snapshot } => {
                let active = self.session.select(&snapshot)?;
                ::log::info!("Snapshot dir: {}", active.dir.display());
            }
            Command::Robots => {
                let robots = self.session.robots().await?;
                ::log::info!("{}", robots.body);
                ::log::info!("{} sitemaps stashed", self.session.stashed_sitemaps().len());
            }
            Command::Sitemap { paths } => {
                let entries = self.session.sitemap(paths).await?;
                for line in sitemap::format_entries(&entries) {
                    ::log::info!("{}", line);
                }
                ::log::info!("{} links stashed", self.session.stashed_urls().len());
            }
            Command::Snapshot { urls } => {
                let records = self.session.snapshot(urls).await?;
                log_records(&records);
            }
            Command::Discover => {
                let found = self.session.discover()?;
                for url in found {
                    ::log::info!("{}", url);
                }
                ::log::info!("{} links stashed", found.len());
            }
            Command::List => {
                let stashed = self.session.stashed_urls();
                for url in stashed {
                    ::log::info!("{}", url);
                }
                ::log::info!("{} links stashed", stashed.len());
            }
            Command::Extract {
                report: ExtractReport::Seo,
            } => {
                let report = self.session.extract_seo()?;
                ::log::info!("SEO report written to {}", report.display());
            }
            Command::Clean => {
                let changed = self.session.clean()?;
                ::log::info!("{} files cleaned", changed);
            }
            Command::Restore {
                target: RestoreTarget::Backup,
            } => {
                let restored = self.session.restore_backup()?;
                ::log::info!("{} files restored", restored);
            }
            Command::Clear => {
                self.session.clear()?;
                ::log::info!("Removed {}", self.session.config().output_dir.display());
            }
            Command::Import { file } => {
                let stashed = self.session.import(&file)?;
                ::log::info!("{} links stashed", stashed.len());
            }
        }

        Ok(Flow::Continue)
    }

    /// Shows `message>` and reads one line. `None` at end of input.
    async fn prompt(&mut self, message: &str) -> Result<Option<String>, ShellError> {
        let mut stdout = std::io::stdout();
        // prompt output is best effort
        let _ = write!(stdout, "\n{}> ", message);
        let _ = stdout.flush();

        self.input.next_line().await.map_err(ShellError::Input)
    }
}

/// Help requested explicitly or implied by a missing subcommand.
fn is_help(error: &clap::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

fn log_records(records: &[SnapshotRecord]) {
    for record in records {
        match record {
            SnapshotRecord::Taken(capture) => ::log::info!("Snapshot taken - {}", capture.url),
            SnapshotRecord::Failed { url, error } => ::log::error!("{} - {}", error, url),
        }
    }
    let taken = records.iter().filter(|record| record.is_taken()).count();
    ::log::info!("{}/{} pages captured", taken, records.len());
}
