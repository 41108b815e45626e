use anyhow::anyhow;
use serde::Serialize;
use teamctl_api_models::{IncomingWebhook, OutgoingWebhook, Team, TriggerWhen, User};
use tracing::debug;

use crate::cli::{
    IncomingCreateArgs, IncomingModifyArgs, OutgoingCreateArgs, OutgoingModifyArgs,
    WebhookIdArgs, WebhookListArgs,
};
use crate::client::{AppContext, ApiClient, CliError, CliResult, PAGE_SIZE, RemoteError, collect_pages};
use crate::commands::teams::list_all_teams;
use crate::output::Printer;
use crate::resolve::{resolve_channel, resolve_team, resolve_teams, resolve_user};

/// Field overrides for an incoming webhook. `None` leaves the stored value alone.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct IncomingChanges {
    channel_id: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    icon_url: Option<String>,
    channel_locked: Option<bool>,
}

impl IncomingChanges {
    fn apply(self, hook: &mut IncomingWebhook) {
        if let Some(channel_id) = self.channel_id {
            hook.channel_id = channel_id;
        }
        if let Some(display_name) = self.display_name {
            hook.display_name = display_name;
        }
        if let Some(description) = self.description {
            hook.description = description;
        }
        if let Some(icon_url) = self.icon_url {
            hook.icon_url = icon_url;
        }
        if let Some(channel_locked) = self.channel_locked {
            hook.channel_locked = channel_locked;
        }
    }
}

/// Field overrides for an outgoing webhook. List fields replace the stored
/// list only when non-empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct OutgoingChanges {
    channel_id: Option<String>,
    display_name: Option<String>,
    description: Option<String>,
    trigger_words: Vec<String>,
    trigger_when: Option<TriggerWhen>,
    icon_url: Option<String>,
    callback_urls: Vec<String>,
    content_type: Option<String>,
}

impl OutgoingChanges {
    fn apply(self, hook: &mut OutgoingWebhook) {
        if let Some(channel_id) = self.channel_id {
            hook.channel_id = channel_id;
        }
        if let Some(display_name) = self.display_name {
            hook.display_name = display_name;
        }
        if let Some(description) = self.description {
            hook.description = description;
        }
        if !self.trigger_words.is_empty() {
            hook.trigger_words = self.trigger_words;
        }
        if let Some(trigger_when) = self.trigger_when {
            hook.trigger_when = trigger_when;
        }
        if let Some(icon_url) = self.icon_url {
            hook.icon_url = icon_url;
        }
        if !self.callback_urls.is_empty() {
            hook.callback_urls = self.callback_urls;
        }
        if let Some(content_type) = self.content_type {
            hook.content_type = content_type;
        }
    }
}

async fn require_user(api: &ApiClient, token: &str) -> CliResult<User> {
    resolve_user(api, token)
        .await
        .ok_or_else(|| CliError::failure(anyhow!("unable to find user '{token}'")))
}

async fn require_channel_id(api: &ApiClient, token: &str) -> CliResult<String> {
    resolve_channel(api, token)
        .await
        .map(|channel| channel.id)
        .ok_or_else(|| CliError::failure(anyhow!("unable to find channel '{token}'")))
}

async fn optional_owner_id(api: &ApiClient, token: Option<&str>) -> CliResult<String> {
    match token {
        Some(token) => resolve_user(api, token)
            .await
            .map(|owner| owner.id)
            .ok_or_else(|| CliError::failure(anyhow!("unable to find owner user '{token}'"))),
        None => Ok(String::new()),
    }
}

/// Keep a hook when found, log and drop other lookup failures.
fn found<T>(kind: &str, id: &str, result: Result<T, RemoteError>) -> Option<T> {
    match result {
        Ok(hook) => Some(hook),
        Err(err) => {
            if !err.is_not_found() {
                debug!(kind, id, error = %err, "webhook lookup failed");
            }
            None
        }
    }
}

fn describe<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format webhook: {err}")))
}

fn summary(id: &str, display_name: &str) -> String {
    format!("Id: {id}\nDisplay Name: {display_name}")
}

pub(crate) async fn handle_webhook_list(
    ctx: &AppContext,
    args: WebhookListArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    let api = &ctx.api;
    let teams: Vec<(String, Option<Team>)> = if args.teams.is_empty() {
        list_all_teams(api)
            .await?
            .into_iter()
            .map(|team| (team.name.clone(), Some(team)))
            .collect()
    } else {
        resolve_teams(api, &args.teams).await
    };

    for (token, team) in teams {
        let Some(team) = team else {
            printer.print_error(format!("Unable to find team '{token}'"));
            continue;
        };

        let team_id = team.id.as_str();
        let (incoming, outgoing) = tokio::join!(
            collect_pages(move |page| api.list_incoming_webhooks(team_id, page, PAGE_SIZE)),
            collect_pages(move |page| api.list_outgoing_webhooks(team_id, page, PAGE_SIZE)),
        );

        match incoming {
            Ok(hooks) => {
                for hook in &hooks {
                    printer.print(
                        format!("Incoming:\t{} ({})", hook.display_name, hook.id),
                        hook,
                    )?;
                }
            }
            Err(err) => {
                debug!(team_id, error = %err, "incoming webhook listing failed");
                printer.print_error(format!("Unable to list incoming webhooks for '{team_id}'"));
            }
        }
        match outgoing {
            Ok(hooks) => {
                for hook in &hooks {
                    printer.print(
                        format!("Outgoing:\t{} ({})", hook.display_name, hook.id),
                        hook,
                    )?;
                }
            }
            Err(err) => {
                debug!(team_id, error = %err, "outgoing webhook listing failed");
                printer.print_error(format!("Unable to list outgoing webhooks for '{team_id}'"));
            }
        }
    }
    Ok(())
}

pub(crate) async fn handle_webhook_show(
    ctx: &AppContext,
    args: WebhookIdArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let id = args.id.as_str();
    if let Some(hook) = found("incoming", id, ctx.api.get_incoming_webhook(id).await) {
        return printer.print(describe(&hook)?, &hook);
    }
    if let Some(hook) = found("outgoing", id, ctx.api.get_outgoing_webhook(id).await) {
        return printer.print(describe(&hook)?, &hook);
    }
    Err(CliError::failure(anyhow!("Webhook with id '{id}' not found")))
}

pub(crate) async fn handle_webhook_create_incoming(
    ctx: &AppContext,
    args: IncomingCreateArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let api = &ctx.api;
    let channel_id = require_channel_id(api, &args.channel).await?;
    let user = require_user(api, &args.user).await?;
    let owner_id = optional_owner_id(api, args.owner.as_deref()).await?;

    let hook = IncomingWebhook {
        channel_id,
        user_id: owner_id,
        display_name: args.display_name.unwrap_or_default(),
        description: args.description.unwrap_or_default(),
        username: user.username,
        icon_url: args.icon.unwrap_or_default(),
        channel_locked: args.lock_to_channel,
        ..IncomingWebhook::default()
    };
    let created = api
        .create_incoming_webhook(&hook)
        .await
        .map_err(|err| err.with_context("unable to create webhook"))?;
    printer.print(summary(&created.id, &created.display_name), &created)
}

pub(crate) async fn handle_webhook_modify_incoming(
    ctx: &AppContext,
    args: IncomingModifyArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let api = &ctx.api;
    let mut hook = api
        .get_incoming_webhook(&args.id)
        .await
        .map_err(|err| err.with_context(format!("unable to find webhook '{}'", args.id)))?;

    let channel_id = match args.channel.as_deref() {
        Some(token) => Some(require_channel_id(api, token).await?),
        None => None,
    };
    IncomingChanges {
        channel_id,
        display_name: args.display_name,
        description: args.description,
        icon_url: args.icon,
        channel_locked: args.lock_to_channel,
    }
    .apply(&mut hook);

    let updated = api
        .update_incoming_webhook(&hook)
        .await
        .map_err(|err| err.with_context("unable to modify incoming webhook"))?;
    printer.print(format!("Webhook {} successfully updated", updated.id), &updated)
}

pub(crate) async fn handle_webhook_create_outgoing(
    ctx: &AppContext,
    args: OutgoingCreateArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let api = &ctx.api;
    let team = resolve_team(api, &args.team)
        .await
        .ok_or_else(|| CliError::failure(anyhow!("unable to find team '{}'", args.team)))?;
    let user = require_user(api, &args.user).await?;
    let owner_id = optional_owner_id(api, args.owner.as_deref()).await?;
    let channel_id = match args.channel.as_deref() {
        Some(token) => require_channel_id(api, token).await?,
        None => String::new(),
    };

    let hook = OutgoingWebhook {
        team_id: team.id,
        channel_id,
        creator_id: owner_id,
        display_name: args.display_name,
        description: args.description.unwrap_or_default(),
        trigger_words: args.trigger_words,
        trigger_when: args.trigger_when,
        callback_urls: args.urls,
        content_type: args.content_type.unwrap_or_default(),
        username: user.username,
        icon_url: args.icon.unwrap_or_default(),
        ..OutgoingWebhook::default()
    };
    let created = api
        .create_outgoing_webhook(&hook)
        .await
        .map_err(|err| err.with_context("unable to create outgoing webhook"))?;
    printer.print(summary(&created.id, &created.display_name), &created)
}

pub(crate) async fn handle_webhook_modify_outgoing(
    ctx: &AppContext,
    args: OutgoingModifyArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let api = &ctx.api;
    let mut hook = api
        .get_outgoing_webhook(&args.id)
        .await
        .map_err(|err| err.with_context(format!("unable to find webhook '{}'", args.id)))?;

    let channel_id = match args.channel.as_deref() {
        Some(token) => Some(require_channel_id(api, token).await?),
        None => None,
    };
    OutgoingChanges {
        channel_id,
        display_name: args.display_name,
        description: args.description,
        trigger_words: args.trigger_words,
        trigger_when: args.trigger_when,
        icon_url: args.icon,
        callback_urls: args.urls,
        content_type: args.content_type,
    }
    .apply(&mut hook);

    let updated = api
        .update_outgoing_webhook(&hook)
        .await
        .map_err(|err| err.with_context("unable to modify outgoing webhook"))?;
    printer.print(format!("Webhook {} successfully updated", updated.id), &updated)
}

pub(crate) async fn handle_webhook_delete(
    ctx: &AppContext,
    args: WebhookIdArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let api = &ctx.api;
    let id = args.id.as_str();

    if let Some(hook) = found("incoming", id, api.get_incoming_webhook(id).await) {
        api.delete_incoming_webhook(&hook.id)
            .await
            .map_err(|err| err.with_context(format!("unable to delete webhook '{id}'")))?;
        return printer.print(format!("Webhook {} successfully deleted", hook.id), &hook);
    }
    if let Some(hook) = found("outgoing", id, api.get_outgoing_webhook(id).await) {
        api.delete_outgoing_webhook(&hook.id)
            .await
            .map_err(|err| err.with_context(format!("unable to delete webhook '{id}'")))?;
        return printer.print(format!("Webhook {} successfully deleted", hook.id), &hook);
    }
    Err(CliError::failure(anyhow!("Webhook with id '{id}' not found")))
}
