//! Slash-command adapter.
//!
//! A command line such as `/jira settings notifications on` is split into
//! tokens. The longest run of tokens after the trigger that names a route
//! becomes the route key (`settings/notifications`); whatever follows is
//! validated against the route's [`CommandMetadata`] and exposed through
//! [`Action::form_value`] by name and as `$1`, `$2`, ...

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::dispatch::{
    Action, ActionError, BasicAction, CommandMetadata, RequestContext, Responder, Router, Surface,
    encode_json, render_template,
};
use crate::services::SharedServiceContext;

const COMMAND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::command");

/// Response type the chat platform shows only to the caller.
pub const EPHEMERAL: &str = "ephemeral";

/// Slash-command invocation as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArgs {
    /// Platform user that ran the command.
    pub user_id: String,
    /// Channel the command was run in.
    #[serde(default)]
    pub channel_id: String,
    /// Full command line, trigger included.
    pub command: String,
}

/// Reply handed back to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Visibility of the reply.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response_type: String,
    /// Reply text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Name the reply is posted under.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Avatar the reply is posted with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Location the client should navigate to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goto_location: Option<String>,
    /// Post type; empty for a regular post.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub post_type: String,
}

/// Parsed command line.
#[derive(Debug, Clone, Default)]
pub struct CommandInvocation {
    args: CommandArgs,
    key: String,
    positional: Vec<String>,
    named: HashMap<String, String>,
}

impl CommandInvocation {
    /// Arguments reported by the host.
    #[must_use]
    pub fn args(&self) -> &CommandArgs {
        &self.args
    }

    /// Route key the command resolved to; empty for the default route.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Arguments after the route key.
    #[must_use]
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

/// Action for one slash command.
pub struct CommandAction {
    inner: BasicAction,
    invocation: CommandInvocation,
    response: CommandResponse,
}

impl CommandAction {
    /// Parses `args` against `router`.
    ///
    /// The action is returned even when parsing fails so the caller can
    /// respond with the error. On success the second element is the route
    /// key to dispatch; an empty key selects the default route.
    pub fn make(
        router: &Router,
        mut context: RequestContext,
        args: CommandArgs,
    ) -> (Self, Result<String, ActionError>) {
        context.set_caller_id(args.user_id.clone());
        let (invocation, outcome) = match parse(router, &context, &args) {
            Ok(Parsed {
                key,
                positional,
                named,
            }) => (
                CommandInvocation {
                    args,
                    key: key.clone(),
                    positional,
                    named,
                },
                Ok(key),
            ),
            Err(error) => (
                CommandInvocation {
                    args,
                    ..CommandInvocation::default()
                },
                Err(error),
            ),
        };
        let action = Self {
            inner: BasicAction::new(context),
            invocation,
            response: CommandResponse::default(),
        };
        (action, outcome)
    }

    /// Parsed command line.
    #[must_use]
    pub fn invocation(&self) -> &CommandInvocation {
        &self.invocation
    }

    /// Reply assembled so far.
    #[must_use]
    pub fn response(&self) -> &CommandResponse {
        &self.response
    }

    /// Consumes the action, returning its reply.
    #[must_use]
    pub fn into_response(self) -> CommandResponse {
        self.response
    }

    fn reply(&mut self, text: String) {
        let settings = self.inner.context().config().settings();
        self.response = CommandResponse {
            response_type: EPHEMERAL.to_owned(),
            text,
            username: settings.bot_user_name.clone(),
            icon_url: settings.bot_icon_url.clone(),
            goto_location: None,
            post_type: String::new(),
        };
    }
}

struct Parsed {
    key: String,
    positional: Vec<String>,
    named: HashMap<String, String>,
}

fn parse(
    router: &Router,
    context: &RequestContext,
    args: &CommandArgs,
) -> Result<Parsed, ActionError> {
    let argv: Vec<&str> = args.command.split_whitespace().collect();
    let trigger = context.config().settings().command_trigger();
    match argv.first() {
        Some(first) if *first == trigger => {}
        _ => {
            return Err(ActionError::misconfiguration(format!(
                "command {:?} does not start with {trigger:?}",
                args.command
            )));
        }
    }

    let Some((key, consumed)) = (2..=argv.len()).rev().find_map(|end| {
        let key = argv.get(1..end)?.join("/");
        router.lookup(&key).map(|_| (key, end))
    }) else {
        return Ok(Parsed {
            key: String::new(),
            positional: Vec::new(),
            named: HashMap::new(),
        });
    };

    let route = router.resolve(&key).route;
    let metadata = if route.has_metadata() {
        route.metadata::<CommandMetadata>().cloned().ok_or_else(|| {
            ActionError::misconfiguration(format!("route {key:?} has non-command metadata"))
        })?
    } else {
        CommandMetadata::default()
    };

    let positional: Vec<String> = argv
        .get(consumed..)
        .unwrap_or_default()
        .iter()
        .map(|arg| (*arg).to_owned())
        .collect();
    check_arity(&metadata, positional.len(), &argv.join(" "))?;

    let mut named = HashMap::new();
    for (index, arg) in positional.iter().enumerate() {
        if let Some(name) = metadata.arg_names.get(index) {
            named.insert(name.clone(), arg.clone());
        }
        named.insert(format!("${}", index + 1), arg.clone());
    }
    Ok(Parsed {
        key,
        positional,
        named,
    })
}

fn check_arity(metadata: &CommandMetadata, count: usize, command: &str) -> Result<(), ActionError> {
    if let Ok(min) = usize::try_from(metadata.min_args)
        && count < min
    {
        return Err(ActionError::bad_request(format!(
            "expected at least {min} arguments after {command:?}"
        )));
    }
    if let Ok(max) = usize::try_from(metadata.max_args)
        && count > max
    {
        return Err(ActionError::bad_request(format!(
            "expected at most {max} arguments after {command:?}"
        )));
    }
    Ok(())
}

impl Responder for CommandAction {
    fn respond_json(&mut self, value: &Value) -> Result<(), ActionError> {
        let encoded = encode_json(value).map_err(|error| self.respond_error(error))?;
        self.reply(String::from_utf8_lossy(&encoded).into_owned());
        Ok(())
    }

    fn respond_template(
        &mut self,
        key: &str,
        _content_type: &str,
        values: &Value,
    ) -> Result<(), ActionError> {
        let text = render_template(self.inner.context().config().templates(), key, values)
            .map_err(|error| self.respond_error(error))?;
        self.reply(text);
        Ok(())
    }

    fn respond_redirect(&mut self, url: &str) -> Result<(), ActionError> {
        self.response = CommandResponse {
            goto_location: Some(url.to_owned()),
            ..CommandResponse::default()
        };
        Ok(())
    }

    fn respond_error(&mut self, error: ActionError) -> ActionError {
        self.reply(error.to_string());
        error
    }

    fn respond_text(&mut self, text: &str) -> Result<(), ActionError> {
        self.reply(text.to_owned());
        Ok(())
    }
}

impl Action for CommandAction {
    fn context(&self) -> &RequestContext {
        self.inner.context()
    }

    fn context_mut(&mut self) -> &mut RequestContext {
        self.inner.context_mut()
    }

    fn form_value(&self, name: &str) -> Option<&str> {
        self.invocation.value(name)
    }

    fn surface(&self) -> Surface<'_> {
        Surface::Command(&self.invocation)
    }
}

/// After step logging one line per command.
pub fn log_command_action(action: &mut dyn Action) -> Result<(), ActionError> {
    let Surface::Command(invocation) = action.surface() else {
        return Err(ActionError::misconfiguration("a command action is required"));
    };
    let command = invocation.args().command.as_str();
    match action.context().last_error() {
        Some(error) => info!(target: COMMAND_TARGET, command, %error, "command failed"),
        None => debug!(target: COMMAND_TARGET, command, "command served"),
    }
    Ok(())
}

/// Serves slash commands through a router.
#[derive(Clone)]
pub struct CommandSurface {
    router: Arc<Router>,
    services: Arc<SharedServiceContext>,
}

impl CommandSurface {
    /// Pairs a router with the process configuration.
    pub fn new(router: Arc<Router>, services: Arc<SharedServiceContext>) -> Self {
        Self { router, services }
    }

    /// Parses and dispatches `args`.
    pub fn handle(&self, args: CommandArgs) -> CommandResponse {
        let context = RequestContext::new(self.services.snapshot());
        let (mut action, parsed) = CommandAction::make(&self.router, context, args);
        match parsed {
            Ok(key) => self.router.dispatch(&key, &mut action),
            Err(error) => {
                debug!(target: COMMAND_TARGET, %error, "command rejected");
                action.reply(format!("command failed: {error}"));
            }
        }
        action.into_response()
    }
}
