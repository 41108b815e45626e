use anyhow::anyhow;
use teamctl_api_models::{Team, TeamCreateRequest, TeamType, User};

use crate::bulk::{report, run_bulk};
use crate::cli::{
    TeamCreateArgs, TeamDestroyArgs, TeamMembersArgs, TeamModifyArgs, TeamRenameArgs,
    TeamSearchArgs, TeamTargetsArgs,
};
use crate::client::{AppContext, ApiClient, CliError, CliResult, PAGE_SIZE, collect_pages};
use crate::collate::dedupe_sorted_by_key;
use crate::confirm::Prompter;
use crate::output::Printer;
use crate::resolve::{resolve_team, resolve_teams, resolve_users};

/// Every team visible to the caller, across all pages.
pub(crate) async fn list_all_teams(api: &ApiClient) -> CliResult<Vec<Team>> {
    collect_pages(move |page| api.list_teams(page, PAGE_SIZE))
        .await
        .map_err(|err| err.with_context("failed to list teams"))
}

async fn require_team(api: &ApiClient, token: &str) -> CliResult<Team> {
    resolve_team(api, token)
        .await
        .ok_or_else(|| CliError::failure(anyhow!("unable to find team '{token}'")))
}

pub(crate) async fn handle_team_create(
    ctx: &AppContext,
    args: TeamCreateArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let name = args.name.trim();
    if name.is_empty() {
        return Err(CliError::validation("team name is required"));
    }
    let display_name = args.display_name.trim();
    if display_name.is_empty() {
        return Err(CliError::validation("team display name is required"));
    }

    let request = TeamCreateRequest {
        name: name.to_string(),
        display_name: display_name.to_string(),
        kind: if args.private {
            TeamType::Invite
        } else {
            TeamType::Open
        },
        email: args.email,
    };
    let team = ctx
        .api
        .create_team(&request)
        .await
        .map_err(|err| err.with_context("team creation failed"))?;
    printer.print(format!("New team {} successfully created", team.name), &team)
}

pub(crate) async fn handle_team_add(
    ctx: &AppContext,
    args: TeamMembersArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    let api = &ctx.api;
    let team = require_team(api, &args.team).await?;
    let team_id = team.id.as_str();
    let users = resolve_users(api, &args.users).await;
    let outcomes = run_bulk(
        users,
        |token| format!("can't find user '{token}'"),
        |token, _, err| format!("Unable to add '{token}' to {}. Error: {}", team.name, err.detail()),
        move |user: User| async move { api.add_team_member(team_id, &user.id).await.map(|_| user) },
    )
    .await;
    report(printer, &outcomes, |user: &User| {
        format!("Added '{}' to {}", user.username, team.name)
    })
}

pub(crate) async fn handle_team_remove(
    ctx: &AppContext,
    args: TeamMembersArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    let api = &ctx.api;
    let team = require_team(api, &args.team).await?;
    let team_id = team.id.as_str();
    let users = resolve_users(api, &args.users).await;
    let outcomes = run_bulk(
        users,
        |token| format!("can't find user '{token}'"),
        |token, _, err| {
            format!("Unable to remove '{token}' from {}. Error: {}", team.name, err.detail())
        },
        move |user: User| async move {
            api.remove_team_member(team_id, &user.id)
                .await
                .map(|_| user)
        },
    )
    .await;
    report(printer, &outcomes, |user: &User| {
        format!("Removed '{}' from {}", user.username, team.name)
    })
}

pub(crate) async fn handle_team_delete(
    ctx: &AppContext,
    args: TeamDestroyArgs,
    printer: &mut Printer,
    prompter: &mut Prompter<'_>,
) -> CliResult<()> {
    if !args.confirm {
        prompter.confirm_twice("delete")?;
    }

    let api = &ctx.api;
    let teams = resolve_teams(api, &args.teams).await;
    let outcomes = run_bulk(
        teams,
        |token| format!("Unable to find team '{token}'"),
        |_, team: &Team, err| format!("Unable to delete team '{}' error: {}", team.name, err.detail()),
        move |team: Team| async move { api.permanent_delete_team(&team.id).await.map(|_| team) },
    )
    .await;
    report(printer, &outcomes, |team: &Team| {
        format!("Deleted team '{}'", team.name)
    })
}

pub(crate) async fn handle_team_archive(
    ctx: &AppContext,
    args: TeamDestroyArgs,
    printer: &mut Printer,
    prompter: &mut Prompter<'_>,
) -> CliResult<()> {
    if !args.confirm {
        prompter.confirm_twice("archive")?;
    }

    let api = &ctx.api;
    let teams = resolve_teams(api, &args.teams).await;
    let outcomes = run_bulk(
        teams,
        |token| format!("Unable to find team '{token}'"),
        |_, team: &Team, err| format!("Unable to archive team '{}' error: {}", team.name, err.detail()),
        move |team: Team| async move { api.archive_team(&team.id).await.map(|_| team) },
    )
    .await;
    report(printer, &outcomes, |team: &Team| {
        format!("Archived team '{}'", team.name)
    })
}

pub(crate) async fn handle_team_restore(
    ctx: &AppContext,
    args: TeamTargetsArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    let api = &ctx.api;
    let teams = resolve_teams(api, &args.teams).await;
    let outcomes = run_bulk(
        teams,
        |token| format!("Unable to find team '{token}'"),
        |_, team: &Team, err| format!("Unable to restore team '{}' error: {}", team.name, err.detail()),
        move |team: Team| async move { api.restore_team(&team.id).await },
    )
    .await;
    report(printer, &outcomes, |team: &Team| {
        format!("Restored team '{}'", team.name)
    })
}

pub(crate) async fn handle_team_modify(
    ctx: &AppContext,
    args: TeamModifyArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    let privacy = match (args.private, args.public) {
        (true, false) => TeamType::Invite,
        (false, true) => TeamType::Open,
        _ => {
            return Err(CliError::validation(
                "exactly one of --private or --public must be given",
            ));
        }
    };

    let api = &ctx.api;
    let teams = resolve_teams(api, &args.teams).await;
    let outcomes = run_bulk(
        teams,
        |token| format!("Unable to find team '{token}'"),
        |_, team: &Team, err| format!("Unable to modify team '{}' error: {}", team.name, err.detail()),
        move |team: Team| async move { api.update_team_privacy(&team.id, privacy).await },
    )
    .await;
    report(printer, &outcomes, |team: &Team| {
        format!("Modified team '{}' ({})", team.name, privacy.label())
    })
}

pub(crate) async fn handle_team_list(ctx: &AppContext, printer: &mut Printer) -> CliResult<()> {
    for team in list_all_teams(&ctx.api).await? {
        let text = if team.is_archived() {
            format!("{} (archived)", team.name)
        } else {
            team.name.clone()
        };
        printer.print(text, &team)?;
    }
    Ok(())
}

pub(crate) async fn handle_team_search(
    ctx: &AppContext,
    args: TeamSearchArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    let mut found = Vec::new();
    for term in &args.terms {
        let teams = ctx
            .api
            .search_teams(term)
            .await
            .map_err(|err| err.with_context(format!("team search for '{term}' failed")))?;
        found.extend(teams);
    }

    for team in dedupe_sorted_by_key(found, |team| team.name.as_str()) {
        printer.print(
            format!("{}: {} ({})", team.name, team.display_name, team.id),
            &team,
        )?;
    }
    Ok(())
}

pub(crate) async fn handle_team_rename(
    ctx: &AppContext,
    args: TeamRenameArgs,
    printer: &mut Printer,
) -> CliResult<()> {
    printer.set_single();
    let new_name = args.new_name.trim();
    if new_name.is_empty() {
        return Err(CliError::validation(
            "a new team name is required; pass '-' to change only the display name",
        ));
    }

    let mut team = resolve_team(&ctx.api, &args.team).await.ok_or_else(|| {
        CliError::failure(anyhow!(
            "unable to find team '{}', to see all teams try 'team list'",
            args.team
        ))
    })?;

    let keep_name = new_name == "-" || new_name == team.name;
    if keep_name && args.display_name.is_none() {
        return Err(CliError::validation(
            "nothing to rename: give a different name or --display-name",
        ));
    }

    let old_name = team.name.clone();
    if !keep_name {
        team.name = new_name.to_string();
    }
    if let Some(display_name) = args.display_name {
        team.display_name = display_name;
    }

    let renamed = ctx
        .api
        .update_team(&team)
        .await
        .map_err(|err| err.with_context(format!("cannot rename team '{old_name}'")))?;
    printer.print(format!("'{old_name}' team renamed"), &renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::context_for;
    use crate::output::OutputFormat;
    use anyhow::Result;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Cursor;

    fn team_json(id: &str, name: &str) -> serde_json::Value {
        json!({"id": id, "name": name, "display_name": name.to_uppercase(), "type": "O"})
    }

    fn mock_team(server: &MockServer, id: &str, name: &str) {
        server.mock(|when, then| {
            when.method(GET).path(format!("/api/v4/teams/name/{name}"));
            then.status(200).json_body(team_json(id, name));
        });
    }

    fn mock_user(server: &MockServer, id: &str, username: &str) {
        server.mock(|when, then| {
            when.method(GET)
                .path(format!("/api/v4/users/username/{username}"));
            then.status(200)
                .json_body(json!({"id": id, "username": username}));
        });
    }

    fn teams(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn create_defaults_to_open_team() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/v4/teams").json_body(json!({
                "name": "alpha",
                "display_name": "Alpha",
                "type": "O"
            }));
            then.status(201).json_body(team_json("t1", "alpha"));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamCreateArgs {
            name: "alpha".to_string(),
            display_name: "Alpha".to_string(),
            private: false,
            email: None,
        };
        handle_team_create(&ctx, args, &mut printer).await?;

        mock.assert();
        assert_eq!(printer.texts(), vec!["New team alpha successfully created"]);
        Ok(())
    }

    #[tokio::test]
    async fn create_rejects_blank_name() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamCreateArgs {
            name: "  ".to_string(),
            display_name: "Alpha".to_string(),
            private: true,
            email: None,
        };
        let err = handle_team_create(&ctx, args, &mut printer)
            .await
            .expect_err("blank name should fail");
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn add_reports_each_user_independently() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_team(&server, "t1", "alpha");
        mock_user(&server, "u1", "validuser");
        let add = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v4/teams/t1/members")
                .json_body(json!({"team_id": "t1", "user_id": "u1", "roles": "", "delete_at": 0}));
            then.status(201)
                .json_body(json!({"team_id": "t1", "user_id": "u1"}));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamMembersArgs {
            team: "alpha".to_string(),
            users: teams(&["validuser", "missinguser"]),
        };
        handle_team_add(&ctx, args, &mut printer).await?;

        add.assert();
        assert_eq!(printer.texts(), vec!["Added 'validuser' to alpha"]);
        assert_eq!(printer.error_lines(), ["can't find user 'missinguser'"]);
        Ok(())
    }

    #[tokio::test]
    async fn remove_from_unknown_team_is_fatal() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamMembersArgs {
            team: "ghost".to_string(),
            users: teams(&["validuser"]),
        };
        let err = handle_team_remove(&ctx, args, &mut printer)
            .await
            .expect_err("unknown team should fail");
        assert_eq!(err.display_message(), "unable to find team 'ghost'");
        Ok(())
    }

    #[tokio::test]
    async fn remove_deletes_membership() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_team(&server, "t1", "alpha");
        mock_user(&server, "u1", "validuser");
        let remove = server.mock(|when, then| {
            when.method(DELETE).path("/api/v4/teams/t1/members/u1");
            then.status(200).json_body(json!({"status": "OK"}));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamMembersArgs {
            team: "alpha".to_string(),
            users: teams(&["validuser"]),
        };
        handle_team_remove(&ctx, args, &mut printer).await?;

        remove.assert();
        assert_eq!(printer.texts(), vec!["Removed 'validuser' from alpha"]);
        Ok(())
    }

    #[tokio::test]
    async fn delete_with_confirm_flag_skips_prompts() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_team(&server, "t1", "alpha");
        let delete = server.mock(|when, then| {
            when.method(DELETE)
                .path("/api/v4/teams/t1")
                .query_param("permanent", "true");
            then.status(200).json_body(json!({"status": "OK"}));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let mut input = Cursor::new(Vec::new());
        let mut prompts = Vec::new();
        let mut prompter = Prompter::new(&mut input, &mut prompts);
        let args = TeamDestroyArgs {
            teams: teams(&["alpha", "ghost"]),
            confirm: true,
        };
        handle_team_delete(&ctx, args, &mut printer, &mut prompter).await?;
        drop(prompter);

        delete.assert();
        assert!(prompts.is_empty());
        assert_eq!(printer.texts(), vec!["Deleted team 'alpha'"]);
        assert_eq!(printer.error_lines(), ["Unable to find team 'ghost'"]);
        Ok(())
    }

    #[tokio::test]
    async fn archive_aborts_without_touching_the_server() -> Result<()> {
        let server = MockServer::start_async().await;
        let lookup = server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/name/alpha");
            then.status(200).json_body(team_json("t1", "alpha"));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let mut input = Cursor::new(b"YES\nyes\n".to_vec());
        let mut prompts = Vec::new();
        let mut prompter = Prompter::new(&mut input, &mut prompts);
        let args = TeamDestroyArgs {
            teams: teams(&["alpha"]),
            confirm: false,
        };
        let err = handle_team_archive(&ctx, args, &mut printer, &mut prompter)
            .await
            .expect_err("lowercase answer should abort");

        assert_eq!(
            err.display_message(),
            "ABORTED: You did not answer YES exactly, in all capitals."
        );
        lookup.assert_calls(0);
        Ok(())
    }

    #[tokio::test]
    async fn archive_after_confirmation_soft_deletes() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_team(&server, "t1", "alpha");
        let archive = server.mock(|when, then| {
            when.method(DELETE).path("/api/v4/teams/t1");
            then.status(200).json_body(json!({"status": "OK"}));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let mut input = Cursor::new(b"YES\nYES\n".to_vec());
        let mut prompts = Vec::new();
        let mut prompter = Prompter::new(&mut input, &mut prompts);
        let args = TeamDestroyArgs {
            teams: teams(&["alpha"]),
            confirm: false,
        };
        handle_team_archive(&ctx, args, &mut printer, &mut prompter).await?;

        archive.assert();
        assert_eq!(printer.texts(), vec!["Archived team 'alpha'"]);
        Ok(())
    }

    #[tokio::test]
    async fn restore_reports_remote_errors_per_team() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_team(&server, "t1", "alpha");
        mock_team(&server, "t2", "beta");
        server.mock(|when, then| {
            when.method(POST).path("/api/v4/teams/t1/restore");
            then.status(400)
                .json_body(json!({"message": "Team is not archived"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/v4/teams/t2/restore");
            then.status(200).json_body(team_json("t2", "beta"));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamTargetsArgs {
            teams: teams(&["alpha", "beta"]),
        };
        handle_team_restore(&ctx, args, &mut printer).await?;

        assert_eq!(printer.texts(), vec!["Restored team 'beta'"]);
        assert_eq!(
            printer.error_lines(),
            ["Unable to restore team 'alpha' error: Team is not archived"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn modify_sets_privacy_code() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_team(&server, "t1", "alpha");
        let privacy = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/v4/teams/t1/privacy")
                .json_body(json!({"privacy": "I"}));
            then.status(200)
                .json_body(json!({"id": "t1", "name": "alpha", "type": "I"}));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamModifyArgs {
            teams: teams(&["alpha"]),
            private: true,
            public: false,
        };
        handle_team_modify(&ctx, args, &mut printer).await?;

        privacy.assert();
        assert_eq!(printer.texts(), vec!["Modified team 'alpha' (private)"]);
        Ok(())
    }

    #[tokio::test]
    async fn modify_requires_a_privacy_flag() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamModifyArgs {
            teams: teams(&["alpha"]),
            private: false,
            public: false,
        };
        let err = handle_team_modify(&ctx, args, &mut printer)
            .await
            .expect_err("missing flag should fail");
        assert!(matches!(err, CliError::Validation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn list_marks_archived_teams() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams").query_param("page", "0");
            then.status(200).json_body(json!([
                {"id": "t1", "name": "alpha"},
                {"id": "t2", "name": "beta", "delete_at": 1_700_000_000_000_i64}
            ]));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        handle_team_list(&ctx, &mut printer).await?;

        assert_eq!(printer.texts(), vec!["alpha", "beta (archived)"]);
        Ok(())
    }

    #[tokio::test]
    async fn search_merges_terms_without_duplicates() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/v4/teams/search")
                .json_body(json!({"term": "a"}));
            then.status(200)
                .json_body(json!([team_json("t3", "zeta"), team_json("t1", "alpha")]));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/v4/teams/search")
                .json_body(json!({"term": "al"}));
            then.status(200).json_body(json!([team_json("t1", "alpha")]));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamSearchArgs {
            terms: teams(&["a", "al"]),
        };
        handle_team_search(&ctx, args, &mut printer).await?;

        assert_eq!(
            printer.texts(),
            vec!["alpha: ALPHA (t1)", "zeta: ZETA (t3)"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn rename_with_dash_changes_only_display_name() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_team(&server, "t1", "alpha");
        let update = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/v4/teams/t1")
                .json_body(json!({
                    "id": "t1",
                    "name": "alpha",
                    "display_name": "Alpha Squad",
                    "description": "",
                    "email": "",
                    "type": "O",
                    "allow_open_invite": false,
                    "create_at": 0,
                    "update_at": 0,
                    "delete_at": 0
                }));
            then.status(200).json_body(json!({
                "id": "t1",
                "name": "alpha",
                "display_name": "Alpha Squad"
            }));
        });

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamRenameArgs {
            team: "alpha".to_string(),
            new_name: "-".to_string(),
            display_name: Some("Alpha Squad".to_string()),
        };
        handle_team_rename(&ctx, args, &mut printer).await?;

        update.assert();
        assert_eq!(printer.texts(), vec!["'alpha' team renamed"]);
        Ok(())
    }

    #[tokio::test]
    async fn rename_to_same_name_without_display_name_is_rejected() -> Result<()> {
        let server = MockServer::start_async().await;
        mock_team(&server, "t1", "alpha");

        let ctx = context_for(&server)?;
        let mut printer = Printer::new(OutputFormat::Text);
        let args = TeamRenameArgs {
            team: "alpha".to_string(),
            new_name: "alpha".to_string(),
            display_name: None,
        };
        let err = handle_team_rename(&ctx, args, &mut printer)
            .await
            .expect_err("no-op rename should fail");
        assert!(matches!(err, CliError::Validation(message) if message.contains("nothing to rename")));
        Ok(())
    }
}
