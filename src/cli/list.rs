pub(crate) mod table;

use serde::Serialize;
use table::Table;

use switchboard::catalog::{CredentialKind, ModelDescriptor};

use crate::cli::Context;
use crate::{die, ListArgs, ListModelArgs, ListObject, ListingFormat};

#[derive(Serialize)]
struct ModelListing {
    model_id: String,
    name: String,
    provider: String,
    max_tokens: u32,
    streaming: bool,
}

impl From<&ModelDescriptor> for ModelListing {
    fn from(model: &ModelDescriptor) -> Self {
        ModelListing {
            model_id: model.id.clone(),
            name: model.name.clone(),
            provider: model.provider.clone(),
            max_tokens: model.max_tokens,
            streaming: model.supports_streaming,
        }
    }
}

impl From<Vec<ModelListing>> for Table {
    fn from(value: Vec<ModelListing>) -> Self {
        let mut tab = Table::with_header(vec!["MODEL", "PROVIDER", "MAX_TOKENS", "NAME"]);

        for model in value {
            tab.add_row(vec![
                model.model_id,
                model.provider,
                model.max_tokens.to_string(),
                model.name,
            ]);
        }

        tab
    }
}

#[derive(Serialize)]
struct ProviderListing {
    provider: String,
    name: String,
    credential: CredentialKind,
    configured: bool,
}

impl From<Vec<ProviderListing>> for Table {
    fn from(value: Vec<ProviderListing>) -> Self {
        let mut tab = Table::with_header(vec!["PROVIDER", "CREDENTIAL", "STATUS", "NAME"]);

        for provider in value {
            tab.add_row(vec![
                provider.provider,
                provider.credential.to_string(),
                if provider.configured {
                    "configured".to_string()
                } else {
                    "unconfigured".to_string()
                },
                provider.name,
            ]);
        }

        tab
    }
}

#[derive(Serialize)]
struct ToolListing {
    tool: String,
    name: String,
    model: String,
    default_model: String,
    provider: Option<String>,
}

impl From<Vec<ToolListing>> for Table {
    fn from(value: Vec<ToolListing>) -> Self {
        let mut tab = Table::with_header(vec!["TOOL", "MODEL", "PROVIDER", "DEFAULT", "NAME"]);

        for tool in value {
            tab.add_row(vec![
                tool.tool,
                tool.model,
                tool.provider.unwrap_or_else(|| "-".to_string()),
                tool.default_model,
                tool.name,
            ]);
        }

        tab
    }
}

fn get_models(ctx: &Context, args: &ListModelArgs) -> Vec<ModelListing> {
    let catalog = ctx.catalog();

    if let Some(provider) = &args.provider {
        if catalog.provider(provider).is_none() {
            die!("failed to list models: unknown provider \"{}\"", provider);
        }
    }

    if let Some(tool) = &args.tool {
        if catalog.tool(tool).is_none() {
            die!("failed to list models: unknown tool \"{}\"", tool);
        }
    }

    catalog
        .models()
        .filter(|m| args.provider.as_ref().map_or(true, |p| &m.provider == p))
        .filter(|m| {
            args.tool
                .as_ref()
                .map_or(true, |t| catalog.is_model_supported(t, &m.id))
        })
        .map(ModelListing::from)
        .collect()
}

fn get_providers(ctx: &Context) -> Vec<ProviderListing> {
    let credentials = ctx.settings.credentials();

    ctx.catalog()
        .providers()
        .map(|p| ProviderListing {
            provider: p.id.clone(),
            name: p.name.clone(),
            credential: p.credential,
            configured: credentials.is_configured(&p.id),
        })
        .collect()
}

fn get_tools(ctx: &Context) -> Vec<ToolListing> {
    ctx.settings
        .bindings()
        .status()
        .into_iter()
        .filter_map(|(tool_id, status)| {
            let tool = ctx.catalog().tool(&tool_id)?;

            Some(ToolListing {
                tool: tool_id.clone(),
                name: status.tool_name,
                model: status.current_model,
                default_model: tool.default_model.clone(),
                provider: status.provider,
            })
        })
        .collect()
}

fn format_output<O: Into<Table> + Serialize>(object: O, format: ListingFormat) {
    match format {
        ListingFormat::Json => match serde_json::to_string_pretty(&object) {
            Ok(output) => println!("{}", output),
            Err(err) => die!("failed to serialize listing: {}", err),
        },
        ListingFormat::Table => {
            let tab: Table = object.into();

            print!("{}", tab);
        }
        ListingFormat::HeaderlessTable => {
            let mut tab: Table = object.into();

            tab.print_header(false);

            print!("{}", tab);
        }
    }
}

pub(crate) fn list_cmd(ctx: &Context, args: &ListArgs) {
    let format = args.format;

    match &args.object {
        ListObject::Models(model_args) => format_output(get_models(ctx, model_args), format),
        ListObject::Providers => format_output(get_providers(ctx), format),
        ListObject::Tools => format_output(get_tools(ctx), format),
    }
}
