//! Token-to-entity resolution for users, teams, and channels.
//!
//! Each resolver tries identifier forms in a fixed order and stops at the
//! first hit. A miss is `None`, never an error: callers decide whether a miss
//! aborts the command (single subject) or becomes a per-item error (bulk).

use teamctl_api_models::{Channel, Team, User};
use tracing::debug;

use crate::client::{ApiClient, RemoteError};

const ID_LENGTH: usize = 26;

/// Whether `token` has the shape of a server-generated identifier.
pub(crate) fn looks_like_id(token: &str) -> bool {
    token.len() == ID_LENGTH
        && token
            .bytes()
            .all(|byte| byte.is_ascii_lowercase() || byte.is_ascii_digit())
}

fn hit<T>(form: &str, token: &str, result: Result<T, RemoteError>) -> Option<T> {
    match result {
        Ok(entity) => Some(entity),
        Err(err) => {
            if !err.is_not_found() {
                debug!(form, token, error = %err, "lookup failed; treating as no match");
            }
            None
        }
    }
}

/// Resolve a user by ID, then username, then email.
pub(crate) async fn resolve_user(api: &ApiClient, token: &str) -> Option<User> {
    if looks_like_id(token)
        && let Some(user) = hit("id", token, api.get_user(token).await)
    {
        return Some(user);
    }
    if let Some(user) = hit("username", token, api.get_user_by_username(token).await) {
        return Some(user);
    }
    if token.contains('@') {
        return hit("email", token, api.get_user_by_email(token).await);
    }
    None
}

/// Resolve a team by ID, then name.
pub(crate) async fn resolve_team(api: &ApiClient, token: &str) -> Option<Team> {
    if looks_like_id(token)
        && let Some(team) = hit("id", token, api.get_team(token).await)
    {
        return Some(team);
    }
    hit("name", token, api.get_team_by_name(token).await)
}

/// Resolve a channel given as `team:channel` or as a bare channel ID.
pub(crate) async fn resolve_channel(api: &ApiClient, token: &str) -> Option<Channel> {
    if let Some((team_token, channel_name)) = token.split_once(':') {
        let team = resolve_team(api, team_token).await?;
        return hit(
            "team:name",
            token,
            api.get_channel_by_name(&team.id, channel_name).await,
        );
    }
    hit("id", token, api.get_channel(token).await)
}

/// Resolve every token, keeping input order and pairing each result with its token.
pub(crate) async fn resolve_users(api: &ApiClient, tokens: &[String]) -> Vec<(String, Option<User>)> {
    let mut resolved = Vec::with_capacity(tokens.len());
    for token in tokens {
        resolved.push((token.clone(), resolve_user(api, token).await));
    }
    resolved
}

/// Resolve every token, keeping input order and pairing each result with its token.
pub(crate) async fn resolve_teams(api: &ApiClient, tokens: &[String]) -> Vec<(String, Option<Team>)> {
    let mut resolved = Vec::with_capacity(tokens.len());
    for token in tokens {
        resolved.push((token.clone(), resolve_team(api, token).await));
    }
    resolved
}
