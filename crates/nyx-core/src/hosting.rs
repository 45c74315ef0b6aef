//! Hosting Service Abstraction: publishes a release to a remote
//! hosting service behind a narrow trait, so the orchestrator never
//! depends on a concrete provider's wire format.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while publishing to a hosting service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service's base URL or token could not be turned into a client.
    #[error("could not build hosting service client: {0}")]
    ClientBuild(#[from] reqwest::Error),

    /// The service rejected the request (non-2xx response).
    #[error("{service} rejected release publication: HTTP {status} — {body}")]
    Rejected {
        /// Configured service name, for error attribution.
        service: String,
        /// Response status code.
        status: u16,
        /// Response body, truncated to a reasonable length for display.
        body: String,
    },

    /// A configured field required to reach the service was missing.
    #[error("{0} missing required configuration field {1:?}")]
    MissingField(String, &'static str),

    /// A successful response body could not be decoded into the expected
    /// shape.
    #[error("could not decode {service} response: {source}")]
    Decode {
        /// Configured service name, for error attribution.
        service: String,
        /// Underlying deserialization failure.
        source: reqwest::Error,
    },

    /// The caller asked for a capability this provider does not implement.
    #[error("hosting service does not support {0:?}")]
    UnsupportedOperation(Capability),
}

/// A named operation a [`HostingService`] may or may not support. Lets
/// the orchestrator ask before calling rather than matching on errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Create/read releases tied to a repository.
    GitHosting,
    /// Publish a release (and its assets).
    Releases,
    /// Query the authenticated user/token identity.
    Users,
}

/// Result type alias using [`ServiceError`].
pub type ServiceResult<T> = Result<T, ServiceError>;

/// One release publication request, already fully templated.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRequest {
    /// Repository owner, e.g. `"example"`.
    pub owner: String,
    /// Repository name, e.g. `"nyx"`.
    pub repo: String,
    /// Tag the release points at (`v1.2.3`).
    pub tag_name: String,
    /// Release title.
    pub name: String,
    /// Rendered release body (typically the changelog excerpt for this
    /// version).
    pub body: String,
    /// Whether to mark the release a draft.
    pub draft: bool,
    /// Whether to mark the release a pre-release.
    pub prerelease: bool,
}

/// An existing release located by tag, for idempotency and asset checks.
#[derive(Debug, Clone)]
pub struct ReleaseInfo {
    /// Provider-internal identifier for the release.
    pub id: String,
    /// Canonical URL for the release.
    pub url: String,
}

/// The identity a token resolves to, per `GET /user` (or equivalent).
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Account login/username.
    pub login: String,
}

/// A narrow publication surface, implemented once per hosting provider.
/// Mirrors the git facade's approach in `git.rs`: a trait the
/// orchestrator drives, with one concrete, subprocess-free implementation
/// per backend.
pub trait HostingService {
    /// Stable identifier used in `State.publishSucceeded` and error
    /// messages (`"github"`, `"gitlab"`, `"gitea"`).
    fn name(&self) -> &str;

    /// Capabilities this provider implements. The orchestrator consults
    /// this before calling an operation rather than matching on
    /// [`ServiceError::UnsupportedOperation`].
    fn capabilities(&self) -> &[Capability] {
        &[Capability::GitHosting, Capability::Releases]
    }

    /// Publish a release, returning the service's canonical URL for it.
    fn publish_release(&self, request: &ReleaseRequest) -> ServiceResult<String>;

    /// Attach already-uploaded asset paths to an existing release. The
    /// default implementation reports the capability unsupported; only
    /// providers that implement asset upload override it.
    fn publish_release_assets(&self, _release: &ReleaseInfo, _assets: &[camino::Utf8PathBuf]) -> ServiceResult<()> {
        Err(ServiceError::UnsupportedOperation(Capability::Releases))
    }

    /// Look up an existing release by tag, for idempotent re-runs. An
    /// idempotent read: callers may retry it via [`with_retry`].
    fn get_release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> ServiceResult<Option<ReleaseInfo>>;

    /// Resolve the identity the configured token authenticates as. An
    /// idempotent read: callers may retry it via [`with_retry`].
    fn get_authenticated_user(&self) -> ServiceResult<AuthenticatedUser>;
}

/// Backoff delays between retry attempts: 1s, then 4s, for a total
/// of 3 attempts.
const RETRY_BACKOFFS: [Duration; 2] = [Duration::from_secs(1), Duration::from_secs(4)];

/// Retry an idempotent read up to 3 attempts total, backing off per
/// [`RETRY_BACKOFFS`] between attempts. Only safe to wrap around reads —
/// callers must not use this for `publish_release` or other mutations.
pub fn with_retry<T>(op: impl FnMut() -> ServiceResult<T>) -> ServiceResult<T> {
    retry_with_backoffs(op, &RETRY_BACKOFFS)
}

fn retry_with_backoffs<T>(mut op: impl FnMut() -> ServiceResult<T>, backoffs: &[Duration]) -> ServiceResult<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(_) if attempt < backoffs.len() => {
                std::thread::sleep(backoffs[attempt]);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Configuration for a single hosting service instance.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `"github"`, `"gitlab"`, or `"gitea"`.
    pub provider: String,
    /// API base URL, e.g. `https://api.github.com` or a self-hosted
    /// instance's equivalent.
    pub base_url: String,
    /// Bearer token read from the configured environment variable.
    pub token: String,
    /// Request timeout.
    pub timeout: Duration,
}

/// GitHub REST API v3 releases endpoint.
pub struct GitHubService {
    config: ServiceConfig,
    client: Client,
}

impl GitHubService {
    /// Build a client for `config`. Fails only if the token contains
    /// characters invalid in an HTTP header value.
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let client = build_client(&config, "application/vnd.github+json")?;
        Ok(Self { config, client })
    }
}

impl HostingService for GitHubService {
    fn name(&self) -> &str {
        "github"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::GitHosting, Capability::Releases, Capability::Users]
    }

    fn publish_release(&self, request: &ReleaseRequest) -> ServiceResult<String> {
        #[derive(Serialize)]
        struct Body<'a> {
            tag_name: &'a str,
            name: &'a str,
            body: &'a str,
            draft: bool,
            prerelease: bool,
        }

        let url = format!("{}/repos/{}/{}/releases", self.config.base_url, request.owner, request.repo);
        let response = self
            .client
            .post(url)
            .json(&Body {
                tag_name: &request.tag_name,
                name: &request.name,
                body: &request.body,
                draft: request.draft,
                prerelease: request.prerelease,
            })
            .send()?;

        handle_response(self.name(), response)
    }

    fn get_release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> ServiceResult<Option<ReleaseInfo>> {
        let url = format!("{}/repos/{owner}/{repo}/releases/tags/{tag}", self.config.base_url);
        let response = self.client.get(url).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        locate_release(self.name(), response)
    }

    fn get_authenticated_user(&self) -> ServiceResult<AuthenticatedUser> {
        let url = format!("{}/user", self.config.base_url);
        let response = self.client.get(url).send()?;
        locate_user(self.name(), response)
    }
}

/// GitLab releases API.
pub struct GitLabService {
    config: ServiceConfig,
    client: Client,
}

impl GitLabService {
    /// Build a client for `config`.
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let client = build_client(&config, "application/json")?;
        Ok(Self { config, client })
    }
}

impl HostingService for GitLabService {
    fn name(&self) -> &str {
        "gitlab"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::GitHosting, Capability::Releases, Capability::Users]
    }

    fn publish_release(&self, request: &ReleaseRequest) -> ServiceResult<String> {
        #[derive(Serialize)]
        struct Body<'a> {
            tag_name: &'a str,
            name: &'a str,
            description: &'a str,
        }

        let project = format!("{}%2F{}", request.owner, request.repo);
        let url = format!("{}/projects/{}/releases", self.config.base_url, project);
        let response = self
            .client
            .post(url)
            .json(&Body { tag_name: &request.tag_name, name: &request.name, description: &request.body })
            .send()?;

        handle_response(self.name(), response)
    }

    fn get_release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> ServiceResult<Option<ReleaseInfo>> {
        let project = format!("{owner}%2F{repo}");
        let url = format!("{}/projects/{}/releases/{}", self.config.base_url, project, tag);
        let response = self.client.get(url).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        locate_release(self.name(), response)
    }

    fn get_authenticated_user(&self) -> ServiceResult<AuthenticatedUser> {
        let url = format!("{}/user", self.config.base_url);
        let response = self.client.get(url).send()?;
        locate_user(self.name(), response)
    }
}

/// Gitea releases API (GitHub-compatible shape, distinct base path).
pub struct GiteaService {
    config: ServiceConfig,
    client: Client,
}

impl GiteaService {
    /// Build a client for `config`.
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let client = build_client(&config, "application/json")?;
        Ok(Self { config, client })
    }
}

impl HostingService for GiteaService {
    fn name(&self) -> &str {
        "gitea"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::GitHosting, Capability::Releases, Capability::Users]
    }

    fn publish_release(&self, request: &ReleaseRequest) -> ServiceResult<String> {
        #[derive(Serialize)]
        struct Body<'a> {
            tag_name: &'a str,
            name: &'a str,
            body: &'a str,
            draft: bool,
            prerelease: bool,
        }

        let url = format!("{}/repos/{}/{}/releases", self.config.base_url, request.owner, request.repo);
        let response = self
            .client
            .post(url)
            .json(&Body {
                tag_name: &request.tag_name,
                name: &request.name,
                body: &request.body,
                draft: request.draft,
                prerelease: request.prerelease,
            })
            .send()?;

        handle_response(self.name(), response)
    }

    fn get_release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> ServiceResult<Option<ReleaseInfo>> {
        let url = format!("{}/repos/{owner}/{repo}/releases/tags/{tag}", self.config.base_url);
        let response = self.client.get(url).send()?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        locate_release(self.name(), response)
    }

    fn get_authenticated_user(&self) -> ServiceResult<AuthenticatedUser> {
        let url = format!("{}/user", self.config.base_url);
        let response = self.client.get(url).send()?;
        locate_user(self.name(), response)
    }
}

fn build_client(config: &ServiceConfig, accept: &'static str) -> ServiceResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("nyx-release-engine"));
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", config.token)).map_err(|_| {
        ServiceError::MissingField(config.provider.clone(), "token")
    })?);
    headers.insert("Accept", HeaderValue::from_static(accept));

    Ok(Client::builder().default_headers(headers).timeout(config.timeout).build()?)
}

fn handle_response(service: &str, response: reqwest::blocking::Response) -> ServiceResult<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ServiceError::Rejected { service: service.to_string(), status: status.as_u16(), body: body.chars().take(500).collect() });
    }

    #[derive(serde::Deserialize)]
    struct LocatedResponse {
        #[serde(alias = "html_url", alias = "_links")]
        html_url: Option<String>,
    }

    let located: Option<LocatedResponse> = response.json().ok();
    Ok(located.and_then(|l| l.html_url).unwrap_or_default())
}

fn locate_release(service: &str, response: reqwest::blocking::Response) -> ServiceResult<Option<ReleaseInfo>> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ServiceError::Rejected { service: service.to_string(), status: status.as_u16(), body: body.chars().take(500).collect() });
    }

    #[derive(serde::Deserialize)]
    struct Located {
        #[serde(alias = "id", alias = "tag_name")]
        id: serde_json::Value,
        #[serde(alias = "html_url", alias = "url")]
        html_url: Option<String>,
    }

    let located: Located = response.json().map_err(|source| ServiceError::Decode { service: service.to_string(), source })?;
    Ok(Some(ReleaseInfo { id: located.id.to_string(), url: located.html_url.unwrap_or_default() }))
}

fn locate_user(service: &str, response: reqwest::blocking::Response) -> ServiceResult<AuthenticatedUser> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ServiceError::Rejected { service: service.to_string(), status: status.as_u16(), body: body.chars().take(500).collect() });
    }

    #[derive(serde::Deserialize)]
    struct Located {
        #[serde(alias = "login", alias = "username")]
        login: String,
    }

    let located: Located = response.json().map_err(|source| ServiceError::Decode { service: service.to_string(), source })?;
    Ok(AuthenticatedUser { login: located.login })
}

/// Construct the configured [`HostingService`] implementation for
/// `config.provider`.
pub fn build_service(config: ServiceConfig) -> ServiceResult<Box<dyn HostingService>> {
    match config.provider.as_str() {
        "gitlab" => Ok(Box::new(GitLabService::new(config)?)),
        "gitea" => Ok(Box::new(GiteaService::new(config)?)),
        _ => Ok(Box::new(GitHubService::new(config)?)),
    }
}
