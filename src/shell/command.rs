use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// One line of shell input; the first word names the command.
#[derive(Parser, Debug)]
#[command(multicall = true, subcommand_required = true)]
#[command(help_template = "{subcommands}")]
#[command(subcommand_value_name = "COMMAND", subcommand_help_heading = "Commands")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a new snapshot of a host (the name is prompted for when absent)
    Host { host: String, name: Option<String> },

    /// Switch to an existing snapshot of the current host
    Select { snapshot: String },

    /// Fetch robots.txt and stash the sitemaps it lists
    Robots,

    /// Resolve sitemaps (default: the stashed ones) and stash their links
    Sitemap { paths: Vec<String> },

    /// Capture pages (default: the stashed links)
    Snapshot { urls: Vec<String> },

    /// Stash links in saved pages that were not captured yet
    Discover,

    /// Show the stashed links
    List,

    /// Write a report over the saved pages
    Extract {
        #[command(subcommand)]
        report: ExtractReport,
    },

    /// Normalize generated markup, keeping .bak copies
    Clean,

    /// Undo a clean
    Restore {
        #[command(subcommand)]
        target: RestoreTarget,
    },

    /// Delete the whole output directory
    Clear,

    /// Stash one path per line of a file
    Import { file: PathBuf },

    /// Leave the shell
    #[command(visible_aliases = ["quit", "q"])]
    Exit,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractReport {
    /// Title, description, robots and canonical per page into seo.txt
    Seo,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreTarget {
    /// Move every .bak file back over its original
    Backup,
}

impl Command {
    /// Parses a shell line. A blank line means `exit`; `help` and `--help`
    /// come back as clap errors carrying the rendered help.
    pub fn parse_line(line: &str) -> Result<Self, clap::Error> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            return Ok(Command::Exit);
        }
        CommandLine::try_parse_from(words).map(|parsed| parsed.command)
    }
}
