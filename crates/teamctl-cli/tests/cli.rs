//! End-to-end invocations of the CLI against a mock server.

use std::io::Cursor;

use anyhow::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};

struct Outcome {
    code: i32,
    stdout: String,
    stderr: String,
}

async fn invoke(server: &MockServer, args: &[&str], input: &str) -> Result<Outcome> {
    let mut argv = vec![
        "teamctl".to_string(),
        "--url".to_string(),
        server.base_url(),
        "--token".to_string(),
        "token-1".to_string(),
    ];
    argv.extend(args.iter().map(|arg| (*arg).to_string()));
    invoke_raw(argv, input).await
}

async fn invoke_raw(argv: Vec<String>, input: &str) -> Result<Outcome> {
    let mut stdin = Cursor::new(input.as_bytes().to_vec());
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = teamctl_cli::run_with(argv, &mut stdin, &mut stdout, &mut stderr).await;
    Ok(Outcome {
        code,
        stdout: String::from_utf8(stdout)?,
        stderr: String::from_utf8(stderr)?,
    })
}

#[tokio::test]
async fn archive_without_yes_aborts_before_any_request() -> Result<()> {
    let server = MockServer::start_async().await;
    let lookup = server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams/name/alpha");
        then.status(200).json_body(json!({"id": "t1", "name": "alpha"}));
    });
    let archive = server.mock(|when, then| {
        when.method(DELETE).path("/api/v4/teams/t1");
        then.status(200).json_body(json!({"status": "OK"}));
    });

    let outcome = invoke(&server, &["team", "archive", "alpha"], "YES\nyes\n").await?;

    assert_eq!(outcome.code, 2);
    assert!(outcome.stdout.is_empty());
    assert!(outcome.stderr.contains("Have you performed a database backup?"));
    assert!(outcome.stderr.contains("want to archive the teams specified?"));
    assert!(outcome.stderr.contains("ABORTED: You did not answer YES exactly"));
    lookup.assert_calls(0);
    archive.assert_calls(0);
    Ok(())
}

#[tokio::test]
async fn archive_with_confirm_flag_skips_prompt() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams/name/alpha");
        then.status(200).json_body(json!({"id": "t1", "name": "alpha"}));
    });
    let archive = server.mock(|when, then| {
        when.method(DELETE).path("/api/v4/teams/t1");
        then.status(200).json_body(json!({"status": "OK"}));
    });

    let outcome = invoke(&server, &["team", "archive", "alpha", "--confirm"], "").await?;

    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.stdout, "Archived team 'alpha'\n");
    assert!(!outcome.stderr.contains("YES/NO"));
    archive.assert();
    Ok(())
}

#[tokio::test]
async fn enabling_mixed_bots_reports_partial_success() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/v4/users/username/validuser");
        then.status(200)
            .json_body(json!({"id": "u1", "username": "validuser"}));
    });
    let enable = server.mock(|when, then| {
        when.method(POST).path("/api/v4/bots/u1/enable");
        then.status(200)
            .json_body(json!({"user_id": "u1", "username": "validuser"}));
    });

    let outcome = invoke(&server, &["bot", "enable", "validuser", "missinguser"], "").await?;

    assert_eq!(outcome.code, 1);
    assert_eq!(outcome.stdout, "Enabled bot u1 (validuser)\n");
    assert!(outcome.stderr.contains("can't find user 'missinguser'"));
    enable.assert();
    Ok(())
}

#[tokio::test]
async fn webhook_listing_survives_one_failed_kind() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams/name/alpha");
        then.status(200).json_body(json!({"id": "t1", "name": "alpha"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/v4/hooks/incoming");
        then.status(500).json_body(json!({"message": "store failure"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/api/v4/hooks/outgoing");
        then.status(200).json_body(json!([
            {"id": "o1", "team_id": "t1", "display_name": "Echo"}
        ]));
    });

    let outcome = invoke(&server, &["webhook", "list", "alpha"], "").await?;

    assert_eq!(outcome.code, 1);
    assert_eq!(outcome.stdout, "Outgoing:\tEcho (o1)\n");
    assert!(
        outcome
            .stderr
            .contains("Unable to list incoming webhooks for 't1'")
    );
    Ok(())
}

#[tokio::test]
async fn search_merges_terms_without_duplicates() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/teams/search")
            .json_body(json!({"term": "a"}));
        then.status(200).json_body(json!([
            {"id": "t2", "name": "zeta", "display_name": "Zeta"},
            {"id": "t1", "name": "alpha", "display_name": "Alpha"}
        ]));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/teams/search")
            .json_body(json!({"term": "z"}));
        then.status(200).json_body(json!([
            {"id": "t2", "name": "zeta", "display_name": "Zeta"}
        ]));
    });

    let outcome = invoke(&server, &["team", "search", "a", "z"], "").await?;

    assert_eq!(outcome.code, 0);
    assert_eq!(outcome.stdout, "alpha: Alpha (t1)\nzeta: Zeta (t2)\n");
    Ok(())
}

#[tokio::test]
async fn json_output_renders_entities() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams");
        then.status(200).json_body(json!([
            {"id": "t1", "name": "alpha", "display_name": "Alpha"},
            {"id": "t2", "name": "beta", "display_name": "Beta", "delete_at": 5}
        ]));
    });

    let outcome = invoke(&server, &["--format", "json", "team", "list"], "").await?;

    assert_eq!(outcome.code, 0);
    let parsed: Value = serde_json::from_str(&outcome.stdout)?;
    let names: Vec<&str> = parsed
        .as_array()
        .map(|teams| teams.iter().filter_map(|team| team["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["alpha", "beta"]);
    Ok(())
}

#[tokio::test]
async fn json_team_create_prints_a_bare_object() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/v4/teams");
        then.status(201)
            .json_body(json!({"id": "t1", "name": "alpha", "display_name": "Alpha", "type": "O"}));
    });

    let outcome = invoke(
        &server,
        &["--output", "json", "team", "create", "--name", "alpha", "--display-name", "Alpha"],
        "",
    )
    .await?;

    assert_eq!(outcome.code, 0);
    let parsed: Value = serde_json::from_str(&outcome.stdout)?;
    assert!(parsed.is_object());
    assert_eq!(parsed["name"], json!("alpha"));
    Ok(())
}

#[tokio::test]
async fn missing_token_is_a_usage_error() -> Result<()> {
    let server = MockServer::start_async().await;
    let argv = vec![
        "teamctl".to_string(),
        "--url".to_string(),
        server.base_url(),
        "team".to_string(),
        "list".to_string(),
    ];
    let outcome = invoke_raw(argv, "").await?;

    assert_eq!(outcome.code, 2);
    assert!(outcome.stderr.contains("access token is required"));
    Ok(())
}

#[tokio::test]
async fn conflicting_flags_are_rejected_by_the_parser() -> Result<()> {
    let server = MockServer::start_async().await;
    let outcome = invoke(
        &server,
        &["team", "modify", "alpha", "--private", "--public"],
        "",
    )
    .await?;

    assert_eq!(outcome.code, 2);
    assert!(outcome.stderr.contains("cannot be used with"));
    Ok(())
}

#[tokio::test]
async fn remote_failure_exits_with_code_three() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams");
        then.status(500)
            .json_body(json!({"message": "database unavailable"}));
    });

    let outcome = invoke(&server, &["team", "list"], "").await?;

    assert_eq!(outcome.code, 3);
    assert!(outcome.stderr.contains("database unavailable"));
    Ok(())
}
