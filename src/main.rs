use clap::Parser;
use env_logger::Env;
use log::LevelFilter;
use site_snapshot::config::ArchiverConfig;
use site_snapshot::shell::{Flow, Session, Shell};
use site_snapshot::transport::{FetchClient, HttpTransport};
use std::io::Write;
use std::process::ExitCode;
use tokio::io::BufReader;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    init_logger(args.log_level.map(LevelFilter::from));

    let mut config = match &args.config {
        Some(path) => match ArchiverConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ArchiverConfig::default(),
    };
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }

    let transport = match HttpTransport::new(&config) {
        Ok(transport) => transport,
        Err(e) => {
            ::log::error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let client = FetchClient::new(transport, config.cache_busting.clone(), config.user_agent.clone());
    ::log::debug!("Writing snapshots under {}", config.output_dir.display());

    let session = Session::new(config, client);
    let mut shell = Shell::new(session, BufReader::new(tokio::io::stdin()));

    let commands = args.host_command().into_iter().chain(args.commands.iter().cloned());
    for line in commands {
        match shell.execute(&line).await {
            Ok(Flow::Exit) => return ExitCode::SUCCESS,
            Ok(Flow::Continue) => {}
            Err(e) => {
                ::log::error!("{}", e);
                if args.batch {
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    if args.batch {
        return ExitCode::SUCCESS;
    }

    match shell.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ::log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` sets the filter, `info` when unset; `level` from
/// `--log-level` overrides both. Shell output is printed bare, warnings and
/// errors carry their level.
fn init_logger(level: Option<LevelFilter>) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
        builder.filter_module("site_snapshot", level);
    }
    builder.filter_module("html5ever", LevelFilter::Error);
    builder.filter_module("selectors", LevelFilter::Warn);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);

    builder.format(|buf, record| match record.level() {
        log::Level::Info => writeln!(buf, "{}", record.args()),
        level => writeln!(buf, "[{}] {}", level, record.args()),
    });

    if let Err(e) = builder.try_init() {
        eprintln!("Failed to initialize logger: {}", e);
    }
}
