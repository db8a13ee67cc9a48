use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Buildpack group resolver for web server and Node.js frontend applications
#[derive(Parser, Debug)]
#[command(
    name = "serverpack",
    about = "Resolve the buildpack group for a web server application",
    version,
    author,
    long_about = "serverpack inspects an application directory and its build configuration \
                  and prints the ordered group of buildpacks that would build it: the Node.js \
                  toolchain, exactly one web server (NGINX or Apache HTTPD) and any utility \
                  buildpacks switched on by configuration."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Resolve the buildpack group for an application",
        long_about = "Scans the application directory, reads build configuration from \
                      project.toml, the process environment and --env flags (later sources \
                      win), and prints the resolved group.\n\n\
                      Exit codes: 0 resolved, 1 configuration or scan error, 2 no web server \
                      or package manager detected.\n\n\
                      Examples:\n  \
                      serverpack resolve\n  \
                      serverpack resolve ./app --env BP_WEB_SERVER=httpd\n  \
                      serverpack resolve ./app --no-process-env --format json"
    )]
    Resolve(ResolveArgs),

    #[command(about = "List every buildpack the group can contain, in order")]
    Stages(StagesArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the application (defaults to current directory)"
    )]
    pub app_path: Option<PathBuf>,

    #[arg(
        short = 'e',
        long = "env",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Build configuration option, may be repeated"
    )]
    pub env: Vec<(String, String)>,

    #[arg(long, help = "Ignore build options set in the process environment")]
    pub no_process_env: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct StagesArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid option '{}', expected KEY=VALUE", s)),
    }
}
