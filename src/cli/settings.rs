//! Commands which inspect or change the stored settings.

use switchboard::credentials::EndpointUpdate;
use switchboard::providers::COZE_LOCAL_DEFAULT_ENDPOINT;
use switchboard::CallOptions;

use crate::cli::list::table::Table;
use crate::cli::Context;
use crate::color::{MaybePaint, MISSING_TEXT, OK_TEXT};
use crate::{die, error, warn};
use crate::{
    EndpointArgs, ExportArgs, ImportArgs, KeyArgs, ProbeArgs, ResetArgs, UseArgs, WorkflowArgs,
};

pub(crate) fn use_cmd(ctx: &Context, args: &UseArgs) {
    let bindings = ctx.settings.bindings();

    if ctx.catalog().tool(&args.tool).is_none() {
        die!("unknown tool \"{}\"", args.tool);
    }

    match bindings.set_model(&args.tool, &args.model) {
        Ok(true) => println!("{} now uses {}", args.tool, args.model),
        Ok(false) => {
            let validation = bindings.validate(&args.tool, &args.model);

            let supported: Vec<String> = bindings
                .supported_model_options(&args.tool)
                .into_iter()
                .map(|option| option.id)
                .collect();

            die!(
                "{}\nsupported models: {}",
                validation.message,
                supported.join(", ")
            );
        }
        Err(err) => die!("{}", err),
    }
}

pub(crate) fn reset_cmd(ctx: &Context, args: &ResetArgs) {
    let bindings = ctx.settings.bindings();

    let result = match &args.tool {
        Some(tool) => {
            if ctx.catalog().tool(tool).is_none() {
                die!("unknown tool \"{}\"", tool);
            }

            bindings.reset_to_default(tool)
        }
        None => bindings.reset_all(),
    };

    if let Err(err) = result {
        die!("{}", err);
    }
}

pub(crate) fn key_cmd(ctx: &Context, args: &KeyArgs) {
    let credentials = ctx.settings.credentials();

    if ctx.catalog().provider(&args.provider).is_none() {
        die!("unknown provider \"{}\"", args.provider);
    }

    let validation = credentials.validate_secret(&args.provider, &args.secret);

    if !validation.valid {
        warn!("{}", validation.reason);
    }

    if let Err(err) = credentials.set_secret(&args.provider, &args.secret) {
        die!("{}", err);
    }
}

pub(crate) fn endpoint_cmd(ctx: &Context, args: &EndpointArgs) {
    let credentials = ctx.settings.credentials();

    match ctx.catalog().provider(&args.provider) {
        Some(provider) if provider.is_local() => {}
        Some(_) => die!("provider \"{}\" is not locally deployed", args.provider),
        None => die!("unknown provider \"{}\"", args.provider),
    }

    if args.url.is_none() && args.secret.is_none() {
        let endpoint = credentials.get_local_endpoint(&args.provider);

        if endpoint.url.is_empty() {
            println!("{} (default)", COZE_LOCAL_DEFAULT_ENDPOINT);
        } else {
            println!("{}", endpoint.url);
        }

        return;
    }

    let update = EndpointUpdate {
        url: args.url.clone(),
        secret: args.secret.clone(),
    };

    if let Err(err) = credentials.set_local_endpoint(&args.provider, update) {
        die!("{}", err);
    }
}

pub(crate) fn workflow_cmd(ctx: &Context, args: &WorkflowArgs) {
    let bindings = ctx.settings.bindings();

    if !ctx.catalog().workflow_keys().any(|k| k == args.key) {
        warn!("\"{}\" is not used by any tool", args.key);
    }

    match &args.value {
        Some(value) => {
            if let Err(err) = bindings.set_workflow_parameter(&args.key, value) {
                die!("{}", err);
            }
        }
        None => println!("{}", bindings.get_workflow_parameter(&args.key)),
    }
}

pub(crate) fn status_cmd(ctx: &Context) {
    let status = ctx.settings.status();

    let mut providers = Table::with_header(vec!["PROVIDER", "STATUS"]);

    for (provider, status) in &status.providers {
        let state = if status.configured {
            OK_TEXT.maybe_paint("configured").to_string()
        } else {
            MISSING_TEXT.maybe_paint("unconfigured").to_string()
        };

        providers.add_row(vec![provider.clone(), state]);
    }

    let mut tools = Table::with_header(vec!["TOOL", "MODEL", "PROVIDER"]);

    for (tool, status) in &status.tools {
        tools.add_row(vec![
            tool.clone(),
            status.current_model.clone(),
            status.provider.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }

    print!("{}\n{}", providers, tools);

    let summary = ctx.settings.summary();

    println!(
        "\n{} of {} providers configured ({:.0}% complete)",
        summary.configured_providers.len(),
        summary.total_providers,
        summary.completeness.overall * 100.0
    );

    let report = ctx.settings.validate_all();

    for warning in &report.warnings {
        warn!("{}", warning);
    }

    for err in &report.errors {
        error!("{}", err);
    }
}

pub(crate) fn export_cmd(ctx: &Context, args: &ExportArgs) {
    let document = match ctx.settings.export_json() {
        Ok(document) => document,
        Err(err) => die!("failed to export settings: {}", err),
    };

    match &args.file {
        Some(path) => {
            if let Err(err) = std::fs::write(path, document + "\n") {
                die!("failed to write \"{}\": {}", path.display(), err);
            }
        }
        None => println!("{}", document),
    }
}

pub(crate) fn import_cmd(ctx: &Context, args: &ImportArgs) {
    let document = match std::fs::read_to_string(&args.file) {
        Ok(document) => document,
        Err(err) => die!("failed to read \"{}\": {}", args.file.display(), err),
    };

    if let Err(err) = ctx.settings.import_json(&document) {
        die!("failed to import settings: {}", err);
    }
}

pub(crate) async fn probe_cmd(ctx: &Context, args: &ProbeArgs) {
    let mut options = CallOptions::default();

    if let Some(workflow_id) = &args.workflow_id {
        options = options.with_workflow_id(workflow_id.as_str());
    }

    let (target, ok) = match (&args.model, &args.provider) {
        (Some(model), _) => {
            if ctx.catalog().model(model).is_none() {
                die!("unknown model \"{}\"", model);
            }

            (model, ctx.dispatcher.probe_model(model, &options).await)
        }
        (None, Some(provider)) => {
            if ctx.catalog().provider(provider).is_none() {
                die!("unknown provider \"{}\"", provider);
            }

            (provider, ctx.dispatcher.probe_provider(provider, &options).await)
        }
        (None, None) => die!("nothing to probe, give a model or --provider"),
    };

    if ok {
        println!("{}: {}", target, OK_TEXT.maybe_paint("ok"));
    } else {
        die!("{} did not answer (run with RUST_LOG=debug for details)", target);
    }
}
