//! # Thread Pool Server - Entry Point
//! src/main.rs
//!
//! - sin subcomando o `serve`: levanta el servidor
//! - `load`: genera carga contra el servidor configurado
//! - `report`: imprime el resumen del archivo de resultados

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;

use threadpool_server::client;
use threadpool_server::config::{Cli, Command, Config, LoadArgs};
use threadpool_server::logging;
use threadpool_server::metrics::ResultsStore;
use threadpool_server::server::Server;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.config.log_options()) {
        eprintln!("no se pudo inicializar el logging: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        None | Some(Command::Serve) => serve(&cli.config),
        Some(Command::Load(args)) => load(&cli.config, args),
        Some(Command::Report) => report(&cli.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "error fatal");
            ExitCode::FAILURE
        }
    }
}

fn serve(config: &Config) -> Result<(), Box<dyn Error>> {
    config.log_summary();

    let server = Server::from_config(config)?;
    let report = server.run()?;

    tracing::info!(
        joined = report.joined,
        timed_out = report.timed_out,
        abandoned = report.abandoned,
        "servidor detenido"
    );
    Ok(())
}

fn load(config: &Config, args: &LoadArgs) -> Result<(), Box<dyn Error>> {
    let options = args.load_options(config);
    let summary = client::run_for(&options, args.duration())?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn report(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = ResultsStore::new(&config.results_file);
    print!("{}", store.summary()?);
    Ok(())
}
