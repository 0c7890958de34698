use clap::Parser;
use miette::IntoDiagnostic;

mod cli;
mod config;

fn main() -> miette::Result<()> {
    let cli = cli::Cli::parse();

    let mut logger = env_logger::Builder::new();
    logger.filter_level(cli.verbose.log_level_filter());
    if let Some(path) = &cli.log_file {
        let file = std::fs::File::create(path).into_diagnostic()?;
        logger.target(env_logger::Target::Pipe(Box::new(file)));
    }
    logger.init();
    log::debug!("cli: {cli:?}");

    cli.run()
}
