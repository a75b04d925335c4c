//! Request options and wrapper configuration for meteor-fetch

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// HTTP method enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        };
        write!(f, "{}", method)
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "PATCH" => Ok(HttpMethod::Patch),
            "TRACE" => Ok(HttpMethod::Trace),
            _ => Err(()),
        }
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::Get
    }
}

impl From<&HttpMethod> for reqwest::Method {
    fn from(method: &HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

/// Release identity used only to compute the User-Agent version component.
///
/// Caller-owned and immutable; stripped from the options before anything is
/// forwarded to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseContext {
    pub release_version: String,
    pub app_release_version: String,
}

/// Snapshot of the proxy-related environment variables.
///
/// Captured once and passed into the wrapper explicitly so tests can inject
/// a fake environment instead of mutating process globals.
#[derive(Debug, Clone, Default)]
pub struct ProxyEnv {
    pub https_proxy: Option<String>,
    pub http_proxy: Option<String>,
}

impl ProxyEnv {
    /// Read `HTTPS_PROXY`/`https_proxy` and `HTTP_PROXY`/`http_proxy`.
    /// Upper-case wins when both case variants are set.
    pub fn from_env() -> Self {
        ProxyEnv {
            https_proxy: env_first(&["HTTPS_PROXY", "https_proxy"]),
            http_proxy: env_first(&["HTTP_PROXY", "http_proxy"]),
        }
    }

    /// Pick the proxy for a target URL: `https` targets prefer the HTTPS
    /// proxy and fall back to the HTTP one; everything else uses the HTTP
    /// proxy only.
    pub fn select(&self, url: &Url) -> Option<&str> {
        if url.scheme() == "https" {
            self.https_proxy.as_deref().or(self.http_proxy.as_deref())
        } else {
            self.http_proxy.as_deref()
        }
    }
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|value| !value.is_empty()))
}

/// Opaque host identity strings embedded in the User-Agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub platform: String,
    pub os_type: String,
    pub os_release: String,
    pub arch: String,
}

impl HostInfo {
    pub fn detect() -> Self {
        HostInfo {
            platform: std::env::consts::OS.to_string(),
            os_type: std::env::consts::FAMILY.to_string(),
            os_release: kernel_release(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

fn kernel_release() -> String {
    #[cfg(target_os = "linux")]
    if let Ok(release) = std::fs::read_to_string("/proc/sys/kernel/osrelease") {
        return release.trim().to_string();
    }
    "unknown".to_string()
}

/// Options for a single request.
///
/// Consumed by value on every call; the wrapper strips its own flags
/// (`use_session_header`, `use_auth_header`, `release_context`, the body
/// stream) during normalization so they never reach the transport.
#[derive(Debug)]
pub struct RequestOptions {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    /// Streaming request body. Attached to the outgoing request at dispatch
    /// time and streamed by the transport, never buffered here.
    pub body_stream: Option<reqwest::Body>,
    /// Explicit proxy URL. Always wins over the environment.
    pub proxy: Option<String>,
    /// Pass-through transport timeout; this module imposes none of its own.
    pub timeout: Option<Duration>,
    /// Overridden to `true` during normalization no matter what the caller
    /// set: certificate verification is never disabled.
    pub force_tls: bool,
    /// Overridden to `false` during normalization: a redirect could leak
    /// credential headers cross-origin.
    pub follow_redirects: bool,
    pub use_session_header: bool,
    pub use_auth_header: bool,
    pub release_context: Option<ReleaseContext>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            url: String::new(),
            method: HttpMethod::default(),
            headers: HashMap::new(),
            body: None,
            body_stream: None,
            proxy: None,
            timeout: None,
            force_tls: true,
            follow_redirects: false,
            use_session_header: false,
            use_auth_header: false,
            release_context: None,
        }
    }
}

impl RequestOptions {
    /// Minimal options for a bare URL.
    pub fn url(url: impl Into<String>) -> Self {
        RequestOptions {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Static configuration for a [`RequestWrapper`](crate::http::RequestWrapper).
#[derive(Debug, Clone)]
pub struct WrapperConfig {
    /// Domain identifier that namespaces stored session/auth credentials.
    pub accounts_domain: String,
    /// Tool build version for the User-Agent. `None` means the local lookup
    /// failed; composition falls back to the "checkout" sentinel.
    pub tools_version: Option<String>,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        WrapperConfig {
            accounts_domain: "www.meteor.com".to_string(),
            tools_version: Some(crate::VERSION.to_string()),
        }
    }
}
