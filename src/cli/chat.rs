use std::io::{self, IsTerminal, Read};

use switchboard::{CallOptions, DispatchError, Message};

use crate::cli::Context;
use crate::{die, ChatArgs};

/// The tool used when neither a tool nor a model is given.
const DEFAULT_TOOL: &str = "ai-chat";

fn parse_param(param: &str) -> Option<(&str, &str)> {
    let (name, value) = param.split_once('=')?;

    if name.is_empty() {
        return None;
    }

    Some((name, value))
}

fn call_options(args: &ChatArgs) -> CallOptions {
    let mut options = CallOptions::default();

    for param in &args.params {
        match parse_param(param) {
            Some((name, value)) => options = options.with_parameter(name, value),
            None => die!("invalid parameter \"{}\", expected NAME=VALUE", param),
        }
    }

    if let Some(workflow_id) = &args.workflow_id {
        options = options.with_workflow_id(workflow_id.as_str());
    }

    if let Some(max_tokens) = args.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }

    options
}

// The prompt comes from the argument or, failing that, from piped standard input
fn read_prompt(args: &ChatArgs) -> String {
    if let Some(prompt) = &args.prompt {
        return prompt.clone();
    }

    let stdin = io::stdin();

    if stdin.is_terminal() {
        die!("no prompt given, pass one as an argument or through standard input");
    }

    let mut buf = String::new();

    if let Err(err) = stdin.lock().read_to_string(&mut buf) {
        die!("failed to read the prompt from standard input: {}", err);
    }

    buf
}

fn hint(err: &DispatchError) -> Option<String> {
    match err {
        DispatchError::MissingCredential(provider) => Some(format!(
            "store a secret with \"switchboard key {} <SECRET>\"",
            provider
        )),
        DispatchError::MissingWorkflowId(_) => {
            Some("pass --workflow-id or store one with \"switchboard workflow\"".to_string())
        }
        _ => None,
    }
}

pub(crate) async fn chat_cmd(ctx: &Context, args: &ChatArgs) {
    let prompt = read_prompt(args);

    if prompt.trim().is_empty() {
        die!("the prompt is empty");
    }

    let options = call_options(args);
    let messages = [Message::user(prompt)];

    let result = match &args.model {
        Some(model) => ctx.dispatcher.invoke(model, &messages, &options).await,
        None => {
            let tool = args.tool.as_deref().unwrap_or(DEFAULT_TOOL);

            ctx.dispatcher.invoke_tool(tool, &messages, &options).await
        }
    };

    match result {
        Ok(text) => println!("{}", text),
        Err(err) => match hint(&err) {
            Some(hint) => die!("{}\n{}", err, hint),
            None => die!("{}", err),
        },
    }
}
