use std::collections::HashMap;

use anyhow::anyhow;
use teamctl_api_models::{Bot, BotCreateRequest, BotPatch, User};

use crate::bulk::{report, run_bulk};
use crate::cli::{BotAssignArgs, BotCreateArgs, BotListArgs, BotTargetsArgs, BotUpdateArgs};
use crate::client::{AppContext, BotFilter, CliError, CliResult, PAGE_SIZE};
use crate::output::Printer;
use crate::resolve::{resolve_user, resolve_users};

pub(crate) async fn handle_bot_create(
    ctx: &AppContext,
    args: BotCreateArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let request = BotCreateRequest {
        username: args.username,
        display_name: args.display_name,
        description: args.description,
    };
    let bot = ctx
        .api
        .create_bot(&request)
        .await
        .map_err(|err| err.with_context("could not create bot"))?;
    printer.print(format!("Created bot {}", bot.user_id), &bot)
}

pub(crate) async fn handle_bot_update(
    ctx: &AppContext,
    args: BotUpdateArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let patch = BotPatch {
        username: args.username,
        display_name: args.display_name,
        description: args.description,
    };
    if patch.is_empty() {
        return Err(CliError::validation(
            "nothing to update: pass --username, --display-name or --description",
        ));
    }

    let user = resolve_user(&ctx.api, &args.bot)
        .await
        .ok_or_else(|| CliError::failure(anyhow!("unable to find user '{}'", args.bot)))?;
    let bot = ctx
        .api
        .patch_bot(&user.id, &patch)
        .await
        .map_err(|err| err.with_context("could not update bot"))?;
    printer.print(
        format!("Updated bot {} ({})", bot.user_id, bot.username),
        &bot,
    )
}

pub(crate) async fn handle_bot_list(
    ctx: &AppContext,
    args: BotListArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    let filter = if args.all {
        BotFilter::IncludeDeleted
    } else if args.orphaned {
        BotFilter::OnlyOrphaned
    } else {
        BotFilter::Active
    };

    let mut page = 0;
    loop {
        let bots = ctx
            .api
            .list_bots(page, PAGE_SIZE, filter)
            .await
            .map_err(|err| err.with_context("failed to fetch bots"))?;
        if bots.is_empty() {
            return Ok(());
        }

        let mut owner_ids: Vec<String> = bots.iter().map(|bot| bot.owner_id.clone()).collect();
        owner_ids.sort();
        owner_ids.dedup();
        let owners: HashMap<String, User> = ctx
            .api
            .get_users_by_ids(&owner_ids)
            .await
            .map_err(|err| err.with_context("failed to fetch bot owners"))?
            .into_iter()
            .map(|user| (user.id.clone(), user))
            .collect();

        for bot in &bots {
            printer.print(bot_line(bot, owners.get(&bot.owner_id)), bot)?;
        }
        page += 1;
    }
}

/// One listing line. The orphan marker depends only on this bot's own owner.
fn bot_line(bot: &Bot, owner: Option<&User>) -> String {
    let owner_name = owner.map_or(bot.owner_id.as_str(), |user| user.username.as_str());
    let state = if bot.is_disabled() { "Disabled" } else { "Enabled" };
    let orphaned = if owner.is_none_or(User::is_deactivated) {
        ", Orphaned"
    } else {
        ""
    };
    format!(
        "{}: {} (Owned by {owner_name}, {state}{orphaned})",
        bot.user_id, bot.username
    )
}

pub(crate) async fn handle_bot_set_enabled(
    ctx: &AppContext,
    args: BotTargetsArgs,
    enable: bool,
    printer: &mut Printer,
) -> CliResult<()> {
    let (verb, past) = if enable {
        ("enable", "Enabled")
    } else {
        ("disable", "Disabled")
    };
    let api = &ctx.api;
    let users = resolve_users(api, &args.bots).await;
    let outcomes = run_bulk(
        users,
        |token| format!("can't find user '{token}'"),
        |token, _, err| format!("could not {verb} bot '{token}': {}", err.detail()),
        move |user: User| async move {
            if enable {
                api.enable_bot(&user.id).await
            } else {
                api.disable_bot(&user.id).await
            }
        },
    )
    .await;
    report(printer, &outcomes, |bot: &Bot| {
        format!("{past} bot {} ({})", bot.user_id, bot.username)
    })
}

pub(crate) async fn handle_bot_assign(
    ctx: &AppContext,
    args: BotAssignArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let bot_user = resolve_user(&ctx.api, &args.bot)
        .await
        .ok_or_else(|| CliError::failure(anyhow!("unable to find user '{}'", args.bot)))?;
    let owner = resolve_user(&ctx.api, &args.owner)
        .await
        .ok_or_else(|| CliError::failure(anyhow!("unable to find user '{}'", args.owner)))?;

    let bot = ctx
        .api
        .assign_bot(&bot_user.id, &owner.id)
        .await
        .map_err(|err| {
            err.with_context(format!(
                "can not assign bot '{}' to user '{}'",
                args.bot, args.owner
            ))
        })?;
    printer.print(
        format!(
            "The bot {} ({}) now belongs to the user {}",
            bot.user_id, bot.username, owner.username
        ),
        &bot,
    )
}
