mod cli;
mod color;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cli::{chat::chat_cmd, list::list_cmd, settings as settings_cmd, ColorMode, Context};
use switchboard::config::read_config;

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Route chat requests to AI model providers, per tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
    /// Read the configuration from PATH instead of the default locations
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt to a tool's model, or to a specific model
    Chat(ChatArgs),
    /// List models, providers or tools
    List(ListArgs),
    /// Bind a model to a tool
    Use(UseArgs),
    /// Point one tool (or every tool) back at its default model
    Reset(ResetArgs),
    /// Store the secret for a provider
    Key(KeyArgs),
    /// Configure the endpoint of a locally deployed provider
    Endpoint(EndpointArgs),
    /// Show or set a workflow parameter
    Workflow(WorkflowArgs),
    /// Show credential and binding status
    Status,
    /// Write every setting as JSON
    Export(ExportArgs),
    /// Replace settings with a previously exported document
    Import(ImportArgs),
    /// Check that a model or provider answers
    Probe(ProbeArgs),
}

#[derive(Parser, Default)]
pub(crate) struct ChatArgs {
    /// Route the prompt through the model bound to this tool
    #[arg(short, long, conflicts_with = "model")]
    tool: Option<String>,
    /// Send the prompt to this model
    #[arg(short, long)]
    model: Option<String>,
    /// The workflow to run, for workflow-style providers
    #[arg(short, long)]
    workflow_id: Option<String>,
    /// A workflow input, as NAME=VALUE (may be repeated)
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,
    /// The maximum number of tokens to generate
    #[arg(long)]
    max_tokens: Option<u32>,
    /// The prompt; read from standard input when absent
    prompt: Option<String>,
}

/// Possible listings
#[derive(Subcommand)]
pub(crate) enum ListObject {
    /// Catalog models
    Models(ListModelArgs),
    /// Providers and whether they are configured
    Providers,
    /// Tools and their bound models
    Tools,
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Parser)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// List the specified object
    #[command(subcommand)]
    object: ListObject,
}

#[derive(Parser, Default)]
pub(crate) struct ListModelArgs {
    /// Limit listing to the specified provider
    #[arg(short, long)]
    provider: Option<String>,
    /// Limit listing to the models the specified tool supports
    #[arg(short, long)]
    tool: Option<String>,
}

#[derive(Parser)]
pub(crate) struct UseArgs {
    tool: String,
    model: String,
}

#[derive(Parser)]
pub(crate) struct ResetArgs {
    /// The tool to reset; every tool when absent
    tool: Option<String>,
}

#[derive(Parser)]
pub(crate) struct KeyArgs {
    provider: String,
    secret: String,
}

#[derive(Parser)]
pub(crate) struct EndpointArgs {
    provider: String,
    /// The base URL of the deployment
    #[arg(long)]
    url: Option<String>,
    /// An optional bearer token
    #[arg(long)]
    secret: Option<String>,
}

#[derive(Parser)]
pub(crate) struct WorkflowArgs {
    key: String,
    /// The new value; the current value is printed when absent
    value: Option<String>,
}

#[derive(Parser)]
pub(crate) struct ExportArgs {
    /// Write to FILE instead of standard output
    file: Option<PathBuf>,
}

#[derive(Parser)]
pub(crate) struct ImportArgs {
    file: PathBuf,
}

#[derive(Parser)]
pub(crate) struct ProbeArgs {
    /// The model to probe
    #[arg(required_unless_present = "provider", conflicts_with = "provider")]
    model: Option<String>,
    /// Probe every model of a provider until one answers
    #[arg(long)]
    provider: Option<String>,
    /// The workflow to run, for workflow-style providers
    #[arg(short, long)]
    workflow_id: Option<String>,
}

fn init_tracing(directive: Option<&str>, color: ColorMode) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(matches!(color, ColorMode::On))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let color = ColorMode::resolve_auto(cli.color);

    color::configure_color(color);

    let config = match read_config(cli.config) {
        Ok(config) => config,
        Err(err) => die!("{}", err),
    };

    for key in &config.extraneous_keys {
        warn!("config contains extraneous key \"{}\", ignoring", key);
    }

    init_tracing(config.log.as_deref(), color);

    let ctx = Context::load(&config).await;

    match &cli.command {
        Commands::Chat(args) => chat_cmd(&ctx, args).await,
        Commands::List(args) => list_cmd(&ctx, args),
        Commands::Use(args) => settings_cmd::use_cmd(&ctx, args),
        Commands::Reset(args) => settings_cmd::reset_cmd(&ctx, args),
        Commands::Key(args) => settings_cmd::key_cmd(&ctx, args),
        Commands::Endpoint(args) => settings_cmd::endpoint_cmd(&ctx, args),
        Commands::Workflow(args) => settings_cmd::workflow_cmd(&ctx, args),
        Commands::Status => settings_cmd::status_cmd(&ctx),
        Commands::Export(args) => settings_cmd::export_cmd(&ctx, args),
        Commands::Import(args) => settings_cmd::import_cmd(&ctx, args),
        Commands::Probe(args) => settings_cmd::probe_cmd(&ctx, args).await,
    }
}
