use serverpack::cli::commands::{CliArgs, Commands};
use serverpack::cli::handlers::{handle_resolve, handle_stages};
use serverpack::util::logging::{init_logging, parse_level, LoggingConfig};
use serverpack::VERSION;

use clap::Parser;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging(logging_config(&args));

    debug!("serverpack v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Resolve(resolve_args) => handle_resolve(resolve_args, args.quiet),
        Commands::Stages(stages_args) => handle_stages(stages_args),
    };

    std::process::exit(exit_code);
}

fn logging_config(args: &CliArgs) -> LoggingConfig {
    let mut config = LoggingConfig::from_env();

    config.level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        config.level
    };

    config
}
