use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use kdbx_crypto::{CancellationReason, Progress};

mod cli;

#[derive(Parser)]
#[command(name = "kdbx-crypto")]
#[command(author = "Oleg")]
#[command(version = "0.1.0")]
#[command(about = "Функции вывода ключа и шифры формата KDBX", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Вывести мастер-ключ из пароля и/или файла-ключа
    Derive(cli::derive::DeriveArgs),

    /// Подобрать число итераций под заданное время
    Benchmark(cli::benchmark::BenchmarkArgs),

    /// Показать поддерживаемые алгоритмы
    Algorithms,

    /// Показать параметры KDF по умолчанию в JSON
    Params(cli::params::ParamsArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let progress = Progress::new();
    let interrupt = progress.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        interrupt.cancel(CancellationReason::UserRequested);
    }) {
        warn!(error = %e, "Ctrl-C handler not installed");
    }

    match run(cli, &progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Ошибка:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, progress: &Progress) -> anyhow::Result<()> {
    match cli.command {
        Commands::Derive(args) => cli::derive::run(args, progress),
        Commands::Benchmark(args) => cli::benchmark::run(args, progress),
        Commands::Algorithms => cli::algorithms::run(),
        Commands::Params(args) => cli::params::run(args),
    }
}
