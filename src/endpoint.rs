/*!
 * Endpoint resolution for the translation backend.
 *
 * The HTTP API and the streaming socket are derived together from the runtime
 * context so that they always point at the same deployment:
 * - An explicit override wins, unless it is a loopback address and the page
 *   itself is served from a non-local host
 * - Pages on a standard port (none, 80, 443) go through the reverse proxy on
 *   the same host
 * - Any other port talks to the backend directly on port 8002
 *
 * Resolution is pure: no network I/O happens here.
 */

use log::{debug, warn};
use std::fmt;
use url::Url;

use crate::errors::EndpointError;

/// Port the backend listens on when no reverse proxy sits in front of it
pub const FALLBACK_BACKEND_PORT: u16 = 8002;

/// Path of the streaming translation socket
pub const STREAM_PATH: &str = "/ws/translate";

/// Scheme of the page the client runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// HTTP scheme name
    pub fn http(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Matching WebSocket scheme name (secure stays secure)
    pub fn stream(&self) -> &'static str {
        match self {
            Self::Http => "ws",
            Self::Https => "wss",
        }
    }
}

/// Origin of the page (or configured front-end) the client is served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOrigin {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
}

impl PageOrigin {
    /// Create an origin from its parts
    pub fn new(scheme: Scheme, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// Parse an origin such as `http://192.168.1.20:5173`
    pub fn parse(origin: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(origin.trim())
            .map_err(|e| EndpointError::InvalidOrigin(format!("{}: {}", origin, e)))?;

        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| EndpointError::InvalidOrigin(origin.to_string()))?;

        // Url drops the port when it equals the scheme default
        Ok(Self::new(scheme, host, url.port()))
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Whether the page is served on a port a reverse proxy would use
    pub fn has_standard_port(&self) -> bool {
        matches!(self.port, None | Some(80) | Some(443))
    }

    /// Whether the page host is a loopback/local-only address
    pub fn is_local(&self) -> bool {
        is_local_host(&self.host)
    }
}

impl fmt::Display for PageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}://{}:{}", self.scheme.http(), self.host, port),
            None => write!(f, "{}://{}", self.scheme.http(), self.host),
        }
    }
}

/// Resolved pair of service base URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    http_base: String,
    stream_base: String,
}

impl Endpoints {
    /// Build endpoints from explicit base URLs
    pub fn new(http_base: impl Into<String>, stream_base: impl Into<String>) -> Self {
        Self {
            http_base: trim_trailing_slash(&http_base.into()),
            stream_base: trim_trailing_slash(&stream_base.into()),
        }
    }

    /// Derive endpoints from the page origin and an optional explicit override
    pub fn resolve(origin: Option<&PageOrigin>, api_override: Option<&str>) -> Self {
        if let Some(raw) = api_override.map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(endpoints) = Self::from_override(origin, raw) {
                debug!("Using API override: {}", endpoints.http_base);
                return endpoints;
            }
        }

        let Some(origin) = origin else {
            return Self::new(
                format!("http://localhost:{}", FALLBACK_BACKEND_PORT),
                format!("ws://localhost:{}", FALLBACK_BACKEND_PORT),
            );
        };

        let scheme = origin.scheme();
        let host = origin.host();

        if origin.has_standard_port() {
            // Reverse proxy routes /api and /ws on the same host
            Self::new(
                format!("{}://{}", scheme.http(), host),
                format!("{}://{}", scheme.stream(), host),
            )
        } else {
            Self::new(
                format!("{}://{}:{}", scheme.http(), host, FALLBACK_BACKEND_PORT),
                format!("{}://{}:{}", scheme.stream(), host, FALLBACK_BACKEND_PORT),
            )
        }
    }

    fn from_override(origin: Option<&PageOrigin>, raw: &str) -> Option<Self> {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                warn!("Ignoring API override '{}': {}", raw, e);
                return None;
            }
        };

        let override_host = url.host_str().unwrap_or_default();
        if let Some(origin) = origin {
            if is_local_host(override_host) && !origin.is_local() {
                warn!(
                    "Ignoring local API override '{}' while served from {}",
                    raw, origin
                );
                return None;
            }
        }

        let verbatim = trim_trailing_slash(raw);
        let (http_base, stream_base) = match url.scheme() {
            "http" => (verbatim.clone(), replace_scheme(&verbatim, "http", "ws")),
            "https" => (verbatim.clone(), replace_scheme(&verbatim, "https", "wss")),
            "ws" => (replace_scheme(&verbatim, "ws", "http"), verbatim.clone()),
            "wss" => (replace_scheme(&verbatim, "wss", "https"), verbatim.clone()),
            other => {
                warn!("Ignoring API override with unsupported scheme '{}'", other);
                return None;
            }
        };

        Some(Self::new(http_base, stream_base))
    }

    pub fn http_base(&self) -> &str {
        &self.http_base
    }

    pub fn stream_base(&self) -> &str {
        &self.stream_base
    }

    /// URL of the streaming translation socket
    pub fn stream_url(&self) -> String {
        format!("{}{}", self.stream_base, STREAM_PATH)
    }

    /// URL of the status probe
    pub fn status_url(&self) -> String {
        format!("{}/api/status", self.http_base)
    }

    /// URL of the non-streaming translate fallback
    pub fn translate_url(&self) -> String {
        format!("{}/api/translate", self.http_base)
    }

    /// URL of the model switch call
    pub fn switch_model_url(&self) -> String {
        format!("{}/api/model/switch", self.http_base)
    }

    /// URL of the backend root (health message)
    pub fn root_url(&self) -> String {
        format!("{}/", self.http_base)
    }
}

impl fmt::Display for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http: {}, stream: {}", self.http_base, self.stream_base)
    }
}

/// Whether a host name refers to the local machine only
pub fn is_local_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();
    matches!(host.as_str(), "localhost" | "127.0.0.1" | "::1" | "0.0.0.0")
        || host.ends_with(".localhost")
}

fn trim_trailing_slash(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

// Case-insensitive prefix swap; `Url` would normalize the rest of the string
fn replace_scheme(url: &str, from: &str, to: &str) -> String {
    match url.get(..from.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(from) => format!("{}{}", to, &url[from.len()..]),
        _ => url.to_string(),
    }
}
