//! Shared HTTP client, error types, and the typed v4 API surface used by commands.

use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use teamctl_api_models::{
    AppError, Bot, BotCreateRequest, BotPatch, Channel, IncomingWebhook, OutgoingWebhook,
    StatusOk, Team, TeamCreateRequest, TeamMember, TeamPrivacy, TeamSearch, TeamType, User,
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::cli::Cli;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
const API_PREFIX: [&str; 2] = ["api", "v4"];
/// Largest page the server honours for list endpoints.
pub(crate) const PAGE_SIZE: u32 = 200;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Failure of a single remote call.
#[derive(Debug, Error)]
pub(crate) enum RemoteError {
    #[error("base URL '{url}' cannot carry an API path")]
    InvalidBaseUrl { url: String },
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{message} (status {status})")]
    Api { status: StatusCode, message: String },
    #[error("failed to parse response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

impl RemoteError {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// Server-provided detail without transport decoration, used in per-item error lines.
    pub(crate) fn detail(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Classify into a `CliError`, prefixing the message with what was being attempted.
    pub(crate) fn with_context(self, context: impl Into<String>) -> CliError {
        let context = context.into();
        match CliError::from(self) {
            CliError::Validation(message) => CliError::Validation(format!("{context}: {message}")),
            CliError::Failure(error) => CliError::Failure(error.context(context)),
        }
    }
}

impl From<RemoteError> for CliError {
    fn from(error: RemoteError) -> Self {
        match &error {
            RemoteError::Api { status, message, .. }
                if matches!(
                    *status,
                    StatusCode::BAD_REQUEST
                        | StatusCode::CONFLICT
                        | StatusCode::UNPROCESSABLE_ENTITY
                ) =>
            {
                Self::validation(message.clone())
            }
            _ => Self::failure(error),
        }
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) api: ApiClient,
}

impl AppContext {
    /// Build the HTTP client from CLI options, tagging every request with the trace id.
    pub(crate) fn from_cli(cli: &Cli, token: String, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(cli.timeout))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            api: ApiClient::new(client, cli.url.clone(), token),
        })
    }
}

/// Typed client for the server's v4 REST API.
#[derive(Clone)]
pub(crate) struct ApiClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    pub(crate) fn new(http: Client, base_url: Url, token: String) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| RemoteError::InvalidBaseUrl {
                    url: self.base_url.to_string(),
                })?;
            path.pop_if_empty()
                .extend(API_PREFIX.iter().chain(segments.iter()));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.token)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: String,
    ) -> Result<T, RemoteError> {
        debug!(%path, "dispatching request");
        let response = builder
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                path: path.clone(),
                source,
            })?;

        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|source| RemoteError::Decode { path, source })
        } else {
            Err(classify_problem(response).await)
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let path = url.path().to_string();
        self.send(self.request(Method::GET, url), path).await
    }

    async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let path = url.path().to_string();
        self.send(self.request(Method::DELETE, url), path).await
    }

    async fn with_body<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<T, RemoteError> {
        let path = url.path().to_string();
        self.send(self.request(method, url).json(body), path).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let path = url.path().to_string();
        self.send(self.request(Method::POST, url), path).await
    }

    pub(crate) async fn get_user(&self, id: &str) -> Result<User, RemoteError> {
        self.get(self.endpoint(&["users", id])?).await
    }

    pub(crate) async fn get_user_by_username(&self, username: &str) -> Result<User, RemoteError> {
        self.get(self.endpoint(&["users", "username", username])?)
            .await
    }

    pub(crate) async fn get_user_by_email(&self, email: &str) -> Result<User, RemoteError> {
        self.get(self.endpoint(&["users", "email", email])?).await
    }

    pub(crate) async fn get_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, RemoteError> {
        self.with_body(Method::POST, self.endpoint(&["users", "ids"])?, ids)
            .await
    }

    pub(crate) async fn create_bot(&self, request: &BotCreateRequest) -> Result<Bot, RemoteError> {
        self.with_body(Method::POST, self.endpoint(&["bots"])?, request)
            .await
    }

    pub(crate) async fn patch_bot(&self, bot_id: &str, patch: &BotPatch) -> Result<Bot, RemoteError> {
        self.with_body(Method::PUT, self.endpoint(&["bots", bot_id])?, patch)
            .await
    }

    pub(crate) async fn list_bots(
        &self,
        page: u32,
        per_page: u32,
        filter: BotFilter,
    ) -> Result<Vec<Bot>, RemoteError> {
        let mut url = self.endpoint(&["bots"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &page.to_string());
            pairs.append_pair("per_page", &per_page.to_string());
            match filter {
                BotFilter::Active => {}
                BotFilter::IncludeDeleted => {
                    pairs.append_pair("include_deleted", "true");
                }
                BotFilter::OnlyOrphaned => {
                    pairs.append_pair("only_orphaned", "true");
                }
            }
        }
        self.get(url).await
    }

    pub(crate) async fn enable_bot(&self, bot_id: &str) -> Result<Bot, RemoteError> {
        self.post_empty(self.endpoint(&["bots", bot_id, "enable"])?)
            .await
    }

    pub(crate) async fn disable_bot(&self, bot_id: &str) -> Result<Bot, RemoteError> {
        self.post_empty(self.endpoint(&["bots", bot_id, "disable"])?)
            .await
    }

    pub(crate) async fn assign_bot(&self, bot_id: &str, owner_id: &str) -> Result<Bot, RemoteError> {
        self.post_empty(self.endpoint(&["bots", bot_id, "assign", owner_id])?)
            .await
    }

    pub(crate) async fn get_team(&self, id: &str) -> Result<Team, RemoteError> {
        self.get(self.endpoint(&["teams", id])?).await
    }

    pub(crate) async fn get_team_by_name(&self, name: &str) -> Result<Team, RemoteError> {
        self.get(self.endpoint(&["teams", "name", name])?).await
    }

    pub(crate) async fn list_teams(&self, page: u32, per_page: u32) -> Result<Vec<Team>, RemoteError> {
        let mut url = self.endpoint(&["teams"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());
        self.get(url).await
    }

    pub(crate) async fn search_teams(&self, term: &str) -> Result<Vec<Team>, RemoteError> {
        let search = TeamSearch {
            term: term.to_string(),
        };
        self.with_body(Method::POST, self.endpoint(&["teams", "search"])?, &search)
            .await
    }

    pub(crate) async fn create_team(&self, request: &TeamCreateRequest) -> Result<Team, RemoteError> {
        self.with_body(Method::POST, self.endpoint(&["teams"])?, request)
            .await
    }

    pub(crate) async fn update_team(&self, team: &Team) -> Result<Team, RemoteError> {
        self.with_body(Method::PUT, self.endpoint(&["teams", &team.id])?, team)
            .await
    }

    pub(crate) async fn update_team_privacy(
        &self,
        team_id: &str,
        privacy: TeamType,
    ) -> Result<Team, RemoteError> {
        self.with_body(
            Method::PUT,
            self.endpoint(&["teams", team_id, "privacy"])?,
            &TeamPrivacy { privacy },
        )
        .await
    }

    pub(crate) async fn archive_team(&self, team_id: &str) -> Result<StatusOk, RemoteError> {
        self.delete(self.endpoint(&["teams", team_id])?).await
    }

    pub(crate) async fn permanent_delete_team(&self, team_id: &str) -> Result<StatusOk, RemoteError> {
        let mut url = self.endpoint(&["teams", team_id])?;
        url.query_pairs_mut().append_pair("permanent", "true");
        self.delete(url).await
    }

    pub(crate) async fn restore_team(&self, team_id: &str) -> Result<Team, RemoteError> {
        self.post_empty(self.endpoint(&["teams", team_id, "restore"])?)
            .await
    }

    pub(crate) async fn add_team_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<TeamMember, RemoteError> {
        let member = TeamMember {
            team_id: team_id.to_string(),
            user_id: user_id.to_string(),
            ..TeamMember::default()
        };
        self.with_body(
            Method::POST,
            self.endpoint(&["teams", team_id, "members"])?,
            &member,
        )
        .await
    }

    pub(crate) async fn remove_team_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<StatusOk, RemoteError> {
        self.delete(self.endpoint(&["teams", team_id, "members", user_id])?)
            .await
    }

    pub(crate) async fn get_channel(&self, id: &str) -> Result<Channel, RemoteError> {
        self.get(self.endpoint(&["channels", id])?).await
    }

    pub(crate) async fn get_channel_by_name(
        &self,
        team_id: &str,
        name: &str,
    ) -> Result<Channel, RemoteError> {
        self.get(self.endpoint(&["teams", team_id, "channels", "name", name])?)
            .await
    }

    pub(crate) async fn list_incoming_webhooks(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<IncomingWebhook>, RemoteError> {
        let mut url = self.endpoint(&["hooks", "incoming"])?;
        url.query_pairs_mut()
            .append_pair("team_id", team_id)
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());
        self.get(url).await
    }

    pub(crate) async fn list_outgoing_webhooks(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<OutgoingWebhook>, RemoteError> {
        let mut url = self.endpoint(&["hooks", "outgoing"])?;
        url.query_pairs_mut()
            .append_pair("team_id", team_id)
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &per_page.to_string());
        self.get(url).await
    }

    pub(crate) async fn get_incoming_webhook(&self, id: &str) -> Result<IncomingWebhook, RemoteError> {
        self.get(self.endpoint(&["hooks", "incoming", id])?).await
    }

    pub(crate) async fn get_outgoing_webhook(&self, id: &str) -> Result<OutgoingWebhook, RemoteError> {
        self.get(self.endpoint(&["hooks", "outgoing", id])?).await
    }

    pub(crate) async fn create_incoming_webhook(
        &self,
        hook: &IncomingWebhook,
    ) -> Result<IncomingWebhook, RemoteError> {
        self.with_body(Method::POST, self.endpoint(&["hooks", "incoming"])?, hook)
            .await
    }

    pub(crate) async fn update_incoming_webhook(
        &self,
        hook: &IncomingWebhook,
    ) -> Result<IncomingWebhook, RemoteError> {
        self.with_body(
            Method::PUT,
            self.endpoint(&["hooks", "incoming", &hook.id])?,
            hook,
        )
        .await
    }

    pub(crate) async fn delete_incoming_webhook(&self, id: &str) -> Result<StatusOk, RemoteError> {
        self.delete(self.endpoint(&["hooks", "incoming", id])?)
            .await
    }

    pub(crate) async fn create_outgoing_webhook(
        &self,
        hook: &OutgoingWebhook,
    ) -> Result<OutgoingWebhook, RemoteError> {
        self.with_body(Method::POST, self.endpoint(&["hooks", "outgoing"])?, hook)
            .await
    }

    pub(crate) async fn update_outgoing_webhook(
        &self,
        hook: &OutgoingWebhook,
    ) -> Result<OutgoingWebhook, RemoteError> {
        self.with_body(
            Method::PUT,
            self.endpoint(&["hooks", "outgoing", &hook.id])?,
            hook,
        )
        .await
    }

    pub(crate) async fn delete_outgoing_webhook(&self, id: &str) -> Result<StatusOk, RemoteError> {
        self.delete(self.endpoint(&["hooks", "outgoing", id])?)
            .await
    }
}

/// Fetch successive pages until one comes back short.
pub(crate) async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, RemoteError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, RemoteError>>,
{
    let mut collected = Vec::new();
    let mut page = 0;
    loop {
        let batch = fetch(page).await?;
        let last = batch.len() < PAGE_SIZE as usize;
        collected.extend(batch);
        if last {
            return Ok(collected);
        }
        page += 1;
    }
}

/// Which slice of bots `list_bots` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BotFilter {
    Active,
    IncludeDeleted,
    OnlyOrphaned,
}

/// Parse the server URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    let url = input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))?;
    if url.cannot_be_a_base() {
        return Err(format!("invalid URL '{input}': cannot be used as a base"));
    }
    Ok(url)
}

/// Validate the access token provided to the CLI.
pub(crate) fn parse_token(input: Option<String>) -> CliResult<String> {
    input
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::validation("access token is required (pass --token or set TEAMCTL_TOKEN)")
        })
}

/// Classify a non-success HTTP response into a remote error.
pub(crate) async fn classify_problem(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();
    let problem = serde_json::from_slice::<AppError>(&bytes).ok();

    let message = problem
        .as_ref()
        .map(|p| p.message.trim())
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .or_else(|| (!body_text.is_empty()).then(|| body_text.clone()))
        .unwrap_or_else(|| format!("request failed with status {status}"));

    RemoteError::Api { status, message }
}
