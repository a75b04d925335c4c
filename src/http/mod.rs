//! HTTP request wrapper module
//!
//! Normalizes request options, injects the User-Agent and credential
//! headers, selects a proxy, performs exactly one HTTP call, and extracts
//! cookies from the response. No retries, no redirects, no pooling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::{ClientBuilder, StatusCode};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::{HostInfo, HttpMethod, ProxyEnv, RequestOptions, WrapperConfig};
use crate::error::{FetchError, Result};
use crate::session::CredentialStore;

pub mod agent;
pub mod cookies;

/// Request and response header carrying the session identifier.
pub const SESSION_HEADER: &str = "X-Meteor-Session";
/// Request header carrying the auth token.
pub const AUTH_HEADER: &str = "X-Meteor-Auth";

/// Outcome of a completed blocking-mode call.
#[derive(Debug)]
pub struct ResultEnvelope {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
    /// Cookie name → value, from every `Set-Cookie` header. Last header
    /// wins on duplicate names.
    pub set_cookie: HashMap<String, String>,
}

/// Raw transport outcome delivered to callback-mode callers. No cookie map
/// and no session write-back happen on this path.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Options after normalization, ready for dispatch. Wrapper-specific flags
/// have been consumed; what remains maps directly onto the transport.
#[derive(Debug)]
pub struct PreparedRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub body_stream: Option<reqwest::Body>,
    pub proxy: Option<String>,
    pub timeout: Option<Duration>,
    /// Always `true` after normalization.
    pub force_tls: bool,
    /// Always `false` after normalization.
    pub follow_redirects: bool,
    session_requested: bool,
}

/// HTTP request wrapper around the underlying client.
pub struct RequestWrapper {
    config: WrapperConfig,
    credentials: Arc<dyn CredentialStore>,
    proxy_env: ProxyEnv,
    host: HostInfo,
}

impl RequestWrapper {
    /// Create a wrapper, snapshotting the proxy environment and host
    /// identity.
    pub fn new(config: WrapperConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        RequestWrapper {
            config,
            credentials,
            proxy_env: ProxyEnv::from_env(),
            host: HostInfo::detect(),
        }
    }

    /// Replace the proxy environment snapshot (test injection point).
    pub fn with_proxy_env(mut self, proxy_env: ProxyEnv) -> Self {
        self.proxy_env = proxy_env;
        self
    }

    /// Replace the detected host identity (test injection point).
    pub fn with_host_info(mut self, host: HostInfo) -> Self {
        self.host = host;
        self
    }

    /// Normalize options into a dispatch-ready request.
    ///
    /// Consumes the wrapper flags, computes the User-Agent (caller headers
    /// layer on top of it), injects the session/auth headers from the
    /// credential store, resolves the effective proxy, and forces the TLS
    /// and redirect flags.
    pub fn prepare(&self, options: RequestOptions) -> Result<PreparedRequest> {
        let RequestOptions {
            url,
            method,
            headers: caller_headers,
            body,
            body_stream,
            proxy,
            timeout,
            force_tls: _,
            follow_redirects: _,
            use_session_header,
            use_auth_header,
            release_context,
        } = options;

        let url = Url::parse(&url)
            .map_err(|e| FetchError::InvalidUrl(format!("Invalid URL '{}': {}", url, e)))?;

        let mut headers = HashMap::new();
        headers.insert(
            "User-Agent".to_string(),
            agent::compose(
                &self.host,
                release_context.as_ref(),
                self.config.tools_version.as_deref(),
            ),
        );
        // Caller headers win, including a caller-supplied User-Agent.
        for (name, value) in caller_headers {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
            headers.insert(name, value);
        }

        if use_session_header {
            if let Some(session_id) = self.credentials.session_id(&self.config.accounts_domain) {
                headers.insert(SESSION_HEADER.to_string(), session_id);
            }
        }
        if use_auth_header {
            if let Some(token) = self.credentials.session_token(&self.config.accounts_domain) {
                headers.insert(AUTH_HEADER.to_string(), token);
            }
        }

        // An explicit proxy option always wins over the environment.
        let proxy = proxy.or_else(|| self.proxy_env.select(&url).map(str::to_string));
        if let Some(proxy) = &proxy {
            debug!("using proxy {} for {}", proxy, url);
        }

        Ok(PreparedRequest {
            url,
            method,
            headers,
            body,
            body_stream,
            proxy,
            timeout,
            force_tls: true,
            follow_redirects: false,
            session_requested: use_session_header,
        })
    }

    /// Execute a request in blocking mode.
    ///
    /// The calling task is suspended until the single underlying operation
    /// completes and resumes it exactly once; other tasks keep running.
    /// On success the `Set-Cookie` headers are parsed into the envelope,
    /// and when `use_session_header` was requested an updated
    /// `X-Meteor-Session` response header is written back to the
    /// credential store.
    pub async fn perform_request(&self, options: RequestOptions) -> Result<ResultEnvelope> {
        let prepared = self.prepare(options)?;
        let session_requested = prepared.session_requested;
        let raw = dispatch(prepared).await?;

        let set_cookie = cookies::parse_set_cookie(&raw.headers);
        if session_requested {
            if let Some(session_id) = raw
                .headers
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
            {
                debug!("session id updated for {}", self.config.accounts_domain);
                self.credentials
                    .set_session_id(&self.config.accounts_domain, session_id);
            }
        }

        Ok(ResultEnvelope {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            set_cookie,
        })
    }

    /// Execute a request in callback mode.
    ///
    /// The raw transport outcome is handed to the callback as-is: no cookie
    /// parsing and no session write-back. `use_session_header` requires the
    /// blocking-result path and is rejected here before any network
    /// activity. The returned join handle tracks the in-flight request.
    pub fn perform_request_callback(
        &self,
        options: RequestOptions,
        callback: impl FnOnce(Result<RawResponse>) + Send + 'static,
    ) -> Result<JoinHandle<()>> {
        if options.use_session_header {
            return Err(FetchError::Config(
                "use_session_header requires blocking mode and cannot be combined \
                 with a callback"
                    .to_string(),
            ));
        }
        let prepared = self.prepare(options)?;
        Ok(tokio::spawn(async move {
            callback(dispatch(prepared).await);
        }))
    }

    /// Perform a blocking request and return just the body.
    ///
    /// Connectivity failures come back as [`FetchError::Offline`]; a status
    /// in `[400, 600)` raises [`FetchError::Server`] carrying the full
    /// envelope for inspection.
    pub async fn fetch_body(&self, options: RequestOptions) -> Result<String> {
        let envelope = match self.perform_request(options).await {
            Ok(envelope) => envelope,
            Err(FetchError::Http(e)) if e.is_connect() || e.is_timeout() => {
                return Err(FetchError::Offline(e));
            }
            Err(e) => return Err(e),
        };

        if (400..600).contains(&envelope.status.as_u16()) {
            return Err(FetchError::Server(Box::new(envelope)));
        }
        Ok(envelope.body)
    }
}

/// Perform the single underlying HTTP call.
///
/// The client is built per call: redirects off, certificate verification
/// on, and only the proxy resolved during normalization (the transport's
/// own environment handling is disabled).
async fn dispatch(prepared: PreparedRequest) -> Result<RawResponse> {
    // Normalization pins these flags; a request that lost them is never
    // dispatched.
    if !prepared.force_tls || prepared.follow_redirects {
        return Err(FetchError::Config(
            "request was not normalized: TLS verification must stay forced and \
             redirects disabled"
                .to_string(),
        ));
    }

    let mut builder = ClientBuilder::new().redirect(Policy::none()).no_proxy();

    if let Some(proxy) = &prepared.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| FetchError::Proxy(format!("Invalid proxy '{}': {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }
    if let Some(timeout) = prepared.timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder.build().map_err(FetchError::Http)?;

    let mut request = client.request(reqwest::Method::from(&prepared.method), prepared.url);
    for (name, value) in &prepared.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if let Some(body) = prepared.body {
        request = request.body(body);
    }
    // The stream was taken out of the options during normalization; it is
    // handed to the transport here and flows while the request is sent.
    if let Some(stream) = prepared.body_stream {
        request = request.body(stream);
    }

    let response = request.send().await.map_err(FetchError::Http)?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.map_err(FetchError::Http)?;

    Ok(RawResponse {
        status,
        headers,
        body,
    })
}
