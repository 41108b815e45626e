//! Command-line surface for administering a team-collaboration server.

use std::env;
use std::ffi::OsString;
use std::io::{self, BufRead, Write};

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use teamctl_api_models::TriggerWhen;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, parse_token, parse_url};
use crate::commands::bots::{
    handle_bot_assign, handle_bot_create, handle_bot_list, handle_bot_set_enabled,
    handle_bot_update,
};
use crate::commands::teams::{
    handle_team_add, handle_team_archive, handle_team_create, handle_team_delete,
    handle_team_list, handle_team_modify, handle_team_remove, handle_team_rename,
    handle_team_restore, handle_team_search,
};
use crate::commands::webhooks::{
    handle_webhook_create_incoming, handle_webhook_create_outgoing, handle_webhook_delete,
    handle_webhook_list, handle_webhook_modify_incoming, handle_webhook_modify_outgoing,
    handle_webhook_show,
};
use crate::confirm::Prompter;
use crate::output::{OutputFormat, Printer};
use crate::telemetry::{CommandReport, LogFormat, Outcome, TelemetryEmitter, init_logging};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_API_URL: &str = "http://127.0.0.1:8065";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// Parses process arguments against the real terminal streams and returns the exit code.
pub async fn run() -> i32 {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    run_with(env::args_os(), &mut input, &mut stdout, &mut stderr).await
}

/// Runs one invocation against caller-supplied streams.
///
/// Command results go to `stdout`. Per-item errors, fatal errors, and
/// confirmation prompts go to `stderr`. Answers to prompts are read from
/// `stdin`. The return value is the process exit code: `0` on success, `1`
/// when the command finished but some items failed, `2` for invalid input
/// and `3` for remote or transport failures.
pub async fn run_with<I, T>(
    args: I,
    stdin: &mut dyn BufRead,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let target: &mut dyn Write = if err.use_stderr() { stderr } else { stdout };
            let _ = write!(target, "{}", err.render());
            return err.exit_code();
        }
    };

    init_logging(&cli.log_level, cli.log_format);
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let telemetry = TelemetryEmitter::from_env();
    debug!(command = command_name, %trace_id, "starting command");

    let server = cli.url.host_str().map(str::to_string);
    let mut printer = Printer::new(cli.output);
    let result = {
        let mut prompter = Prompter::new(stdin, &mut *stderr);
        dispatch(cli, &trace_id, &mut printer, &mut prompter).await
    };
    let flushed = printer
        .flush(&mut *stdout, &mut *stderr)
        .map_err(|err| CliError::failure(anyhow!("failed to write output: {err}")));

    let (exit_code, message, outcome) = match result.and(flushed) {
        Ok(()) if printer.has_errors() => (1, None, Outcome::Partial),
        Ok(()) => (0, None, Outcome::Success),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            let _ = writeln!(stderr, "error: {message}");
            (exit_code, Some(message), Outcome::Error)
        }
    };

    if let Some(emitter) = &telemetry {
        let report = CommandReport {
            command: command_name,
            server: server.as_deref(),
            outcome,
            exit_code,
            failed_items: printer.error_count(),
            message: message.as_deref(),
        };
        emitter.emit(&trace_id, &report).await;
    }

    exit_code
}

async fn dispatch(
    cli: Cli,
    trace_id: &str,
    printer: &mut Printer,
    prompter: &mut Prompter<'_>,
) -> CliResult<()> {
    let token = parse_token(cli.token.clone())?;
    let ctx = AppContext::from_cli(&cli, token, trace_id)?;

    match cli.command {
        Command::Bot(bot) => match bot {
            BotCommand::Create(args) => handle_bot_create(&ctx, args, printer).await,
            BotCommand::Update(args) => handle_bot_update(&ctx, args, printer).await,
            BotCommand::List(args) => handle_bot_list(&ctx, args, printer).await,
            BotCommand::Enable(args) => handle_bot_set_enabled(&ctx, args, true, printer).await,
            BotCommand::Disable(args) => handle_bot_set_enabled(&ctx, args, false, printer).await,
            BotCommand::Assign(args) => handle_bot_assign(&ctx, args, printer).await,
        },
        Command::Team(team) => match team {
            TeamCommand::Create(args) => handle_team_create(&ctx, args, printer).await,
            TeamCommand::Add(args) => handle_team_add(&ctx, args, printer).await,
            TeamCommand::Remove(args) => handle_team_remove(&ctx, args, printer).await,
            TeamCommand::Delete(args) => handle_team_delete(&ctx, args, printer, prompter).await,
            TeamCommand::Archive(args) => {
                handle_team_archive(&ctx, args, printer, prompter).await
            }
            TeamCommand::Restore(args) => handle_team_restore(&ctx, args, printer).await,
            TeamCommand::Modify(args) => handle_team_modify(&ctx, args, printer).await,
            TeamCommand::List => handle_team_list(&ctx, printer).await,
            TeamCommand::Search(args) => handle_team_search(&ctx, args, printer).await,
            TeamCommand::Rename(args) => handle_team_rename(&ctx, args, printer).await,
        },
        Command::Webhook(webhook) => match webhook {
            WebhookCommand::List(args) => handle_webhook_list(&ctx, args, printer).await,
            WebhookCommand::Show(args) => handle_webhook_show(&ctx, args, printer).await,
            WebhookCommand::CreateIncoming(args) => {
                handle_webhook_create_incoming(&ctx, args, printer).await
            }
            WebhookCommand::ModifyIncoming(args) => {
                handle_webhook_modify_incoming(&ctx, args, printer).await
            }
            WebhookCommand::CreateOutgoing(args) => {
                handle_webhook_create_outgoing(&ctx, args, printer).await
            }
            WebhookCommand::ModifyOutgoing(args) => {
                handle_webhook_modify_outgoing(&ctx, args, printer).await
            }
            WebhookCommand::Delete(args) => handle_webhook_delete(&ctx, args, printer).await,
        },
    }
}

#[derive(Parser)]
#[command(
    name = "teamctl",
    version,
    about = "Administrative CLI for team-collaboration servers"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "TEAMCTL_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    pub(crate) url: Url,
    #[arg(long, global = true, env = "TEAMCTL_TOKEN", hide_env_values = true)]
    pub(crate) token: Option<String>,
    #[arg(
        long,
        global = true,
        env = "TEAMCTL_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Select output format for command results"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "TEAMCTL_LOG",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Diagnostic log filter written to stderr, e.g. debug"
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "TEAMCTL_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Manage bot accounts.
    #[command(subcommand)]
    Bot(BotCommand),
    /// Manage teams and team membership.
    #[command(subcommand)]
    Team(TeamCommand),
    /// Manage incoming and outgoing webhooks.
    #[command(subcommand)]
    Webhook(WebhookCommand),
}

#[derive(Subcommand)]
pub(crate) enum BotCommand {
    /// Create a bot.
    Create(BotCreateArgs),
    /// Update a bot's username, display name or description.
    Update(BotUpdateArgs),
    /// List bots with their owners.
    List(BotListArgs),
    /// Enable one or more bots.
    Enable(BotTargetsArgs),
    /// Disable one or more bots.
    Disable(BotTargetsArgs),
    /// Give a bot a new owner.
    Assign(BotAssignArgs),
}

#[derive(Subcommand)]
pub(crate) enum TeamCommand {
    /// Create a team.
    Create(TeamCreateArgs),
    /// Add users to a team.
    Add(TeamMembersArgs),
    /// Remove users from a team.
    Remove(TeamMembersArgs),
    /// Permanently delete teams.
    Delete(TeamDestroyArgs),
    /// Archive teams.
    Archive(TeamDestroyArgs),
    /// Restore archived teams.
    Restore(TeamTargetsArgs),
    /// Change team privacy.
    Modify(TeamModifyArgs),
    /// List all teams.
    List,
    /// Search teams by name.
    Search(TeamSearchArgs),
    /// Rename a team.
    Rename(TeamRenameArgs),
}

#[derive(Subcommand)]
pub(crate) enum WebhookCommand {
    /// List webhooks for the given teams, or for every team.
    List(WebhookListArgs),
    /// Show one webhook.
    Show(WebhookIdArgs),
    /// Create an incoming webhook.
    CreateIncoming(IncomingCreateArgs),
    /// Modify an incoming webhook.
    ModifyIncoming(IncomingModifyArgs),
    /// Create an outgoing webhook.
    CreateOutgoing(OutgoingCreateArgs),
    /// Modify an outgoing webhook.
    ModifyOutgoing(OutgoingModifyArgs),
    /// Delete a webhook.
    Delete(WebhookIdArgs),
}

#[derive(Args)]
pub(crate) struct BotCreateArgs {
    pub(crate) username: String,
    #[arg(long)]
    pub(crate) display_name: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
}

#[derive(Args)]
pub(crate) struct BotUpdateArgs {
    /// Bot to update, by username, email or ID.
    pub(crate) bot: String,
    #[arg(long)]
    pub(crate) username: Option<String>,
    #[arg(long)]
    pub(crate) display_name: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
}

#[derive(Args)]
pub(crate) struct BotListArgs {
    /// Only show bots whose owner is gone or deactivated.
    #[arg(long, conflicts_with = "all")]
    pub(crate) orphaned: bool,
    /// Include disabled bots.
    #[arg(long)]
    pub(crate) all: bool,
}

#[derive(Args)]
pub(crate) struct BotTargetsArgs {
    #[arg(required = true)]
    pub(crate) bots: Vec<String>,
}

#[derive(Args)]
pub(crate) struct BotAssignArgs {
    pub(crate) bot: String,
    pub(crate) owner: String,
}

#[derive(Args)]
pub(crate) struct TeamCreateArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) display_name: String,
    /// Create an invite-only team.
    #[arg(long)]
    pub(crate) private: bool,
    #[arg(long)]
    pub(crate) email: Option<String>,
}

#[derive(Args)]
pub(crate) struct TeamMembersArgs {
    pub(crate) team: String,
    #[arg(required = true)]
    pub(crate) users: Vec<String>,
}

#[derive(Args)]
pub(crate) struct TeamDestroyArgs {
    #[arg(required = true)]
    pub(crate) teams: Vec<String>,
    /// Skip the interactive confirmation.
    #[arg(long)]
    pub(crate) confirm: bool,
}

#[derive(Args)]
pub(crate) struct TeamTargetsArgs {
    #[arg(required = true)]
    pub(crate) teams: Vec<String>,
}

#[derive(Args)]
pub(crate) struct TeamModifyArgs {
    #[arg(required = true)]
    pub(crate) teams: Vec<String>,
    #[arg(long, conflicts_with = "public")]
    pub(crate) private: bool,
    #[arg(long)]
    pub(crate) public: bool,
}

#[derive(Args)]
pub(crate) struct TeamSearchArgs {
    #[arg(required = true)]
    pub(crate) terms: Vec<String>,
}

#[derive(Args)]
pub(crate) struct TeamRenameArgs {
    pub(crate) team: String,
    /// New team name, or `-` to keep the current one.
    pub(crate) new_name: String,
    #[arg(long)]
    pub(crate) display_name: Option<String>,
}

#[derive(Args)]
pub(crate) struct WebhookListArgs {
    pub(crate) teams: Vec<String>,
}

#[derive(Args)]
pub(crate) struct WebhookIdArgs {
    pub(crate) id: String,
}

#[derive(Args)]
pub(crate) struct IncomingCreateArgs {
    /// Target channel as `team:channel` or channel ID.
    #[arg(long)]
    pub(crate) channel: String,
    /// User whose name posts appear under.
    #[arg(long)]
    pub(crate) user: String,
    #[arg(long)]
    pub(crate) owner: Option<String>,
    #[arg(long)]
    pub(crate) display_name: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long)]
    pub(crate) icon: Option<String>,
    #[arg(long)]
    pub(crate) lock_to_channel: bool,
}

#[derive(Args)]
pub(crate) struct IncomingModifyArgs {
    pub(crate) id: String,
    #[arg(long)]
    pub(crate) channel: Option<String>,
    #[arg(long)]
    pub(crate) display_name: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long)]
    pub(crate) icon: Option<String>,
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub(crate) lock_to_channel: Option<bool>,
}

#[derive(Args)]
pub(crate) struct OutgoingCreateArgs {
    #[arg(long)]
    pub(crate) team: String,
    /// User whose name responses appear under.
    #[arg(long)]
    pub(crate) user: String,
    #[arg(long)]
    pub(crate) display_name: String,
    /// Callback URL; repeat for several.
    #[arg(long = "url", required = true)]
    pub(crate) urls: Vec<String>,
    #[arg(long)]
    pub(crate) owner: Option<String>,
    #[arg(long)]
    pub(crate) channel: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long = "trigger-word")]
    pub(crate) trigger_words: Vec<String>,
    #[arg(long, value_parser = parse_trigger_when, default_value_t = TriggerWhen::Exact)]
    pub(crate) trigger_when: TriggerWhen,
    #[arg(long)]
    pub(crate) icon: Option<String>,
    #[arg(long)]
    pub(crate) content_type: Option<String>,
}

#[derive(Args)]
pub(crate) struct OutgoingModifyArgs {
    pub(crate) id: String,
    #[arg(long)]
    pub(crate) channel: Option<String>,
    #[arg(long)]
    pub(crate) display_name: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long = "trigger-word")]
    pub(crate) trigger_words: Vec<String>,
    #[arg(long, value_parser = parse_trigger_when)]
    pub(crate) trigger_when: Option<TriggerWhen>,
    #[arg(long)]
    pub(crate) icon: Option<String>,
    #[arg(long = "url")]
    pub(crate) urls: Vec<String>,
    #[arg(long)]
    pub(crate) content_type: Option<String>,
}

fn parse_trigger_when(input: &str) -> Result<TriggerWhen, String> {
    TriggerWhen::from_name(input).map_err(|err| err.to_string())
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Bot(BotCommand::Create(_)) => "bot_create",
        Command::Bot(BotCommand::Update(_)) => "bot_update",
        Command::Bot(BotCommand::List(_)) => "bot_list",
        Command::Bot(BotCommand::Enable(_)) => "bot_enable",
        Command::Bot(BotCommand::Disable(_)) => "bot_disable",
        Command::Bot(BotCommand::Assign(_)) => "bot_assign",
        Command::Team(TeamCommand::Create(_)) => "team_create",
        Command::Team(TeamCommand::Add(_)) => "team_add",
        Command::Team(TeamCommand::Remove(_)) => "team_remove",
        Command::Team(TeamCommand::Delete(_)) => "team_delete",
        Command::Team(TeamCommand::Archive(_)) => "team_archive",
        Command::Team(TeamCommand::Restore(_)) => "team_restore",
        Command::Team(TeamCommand::Modify(_)) => "team_modify",
        Command::Team(TeamCommand::List) => "team_list",
        Command::Team(TeamCommand::Search(_)) => "team_search",
        Command::Team(TeamCommand::Rename(_)) => "team_rename",
        Command::Webhook(WebhookCommand::List(_)) => "webhook_list",
        Command::Webhook(WebhookCommand::Show(_)) => "webhook_show",
        Command::Webhook(WebhookCommand::CreateIncoming(_)) => "webhook_create_incoming",
        Command::Webhook(WebhookCommand::ModifyIncoming(_)) => "webhook_modify_incoming",
        Command::Webhook(WebhookCommand::CreateOutgoing(_)) => "webhook_create_outgoing",
        Command::Webhook(WebhookCommand::ModifyOutgoing(_)) => "webhook_modify_outgoing",
        Command::Webhook(WebhookCommand::Delete(_)) => "webhook_delete",
    }
}
