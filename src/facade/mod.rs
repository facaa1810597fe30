//! Per-process bootstrap context.
//!
//! [`App`] is the explicit replacement for the global application object:
//! it knows the node's own base URL and drives the bootstrap-time checks
//! (stored URL, database schema) against the config store.

use crate::config::ConfigStore;
use crate::core::constants::SslPolicy;
use crate::update::{UpdateError, UpdateRunner, UpdateStatus};
use crate::util::strings::compare_link;
use regex::Regex;
use std::sync::Arc;

/// Default global directory server queried for contact suggestions.
pub const DEFAULT_DIRECTORY: &str = "https://dir.fedibase.net";

/// Bootstrap context of one process.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use fedibase::config::MemoryConfigStore;
/// use fedibase::core::constants::SslPolicy;
/// use fedibase::facade::App;
///
/// let app = App::new(Arc::new(MemoryConfigStore::new()), "node.tld")
///     .ssl_policy(SslPolicy::Full);
/// assert_eq!(app.base_url(), "https://node.tld");
/// ```
pub struct App {
    config: Arc<dyn ConfigStore>,
    hostname: String,
    ssl_policy: SslPolicy,
    port: Option<u16>,
    url_path: String,
}

impl App {
    pub fn new(config: Arc<dyn ConfigStore>, hostname: &str) -> Self {
        Self {
            config,
            hostname: hostname.to_string(),
            ssl_policy: SslPolicy::None,
            port: None,
            url_path: String::new(),
        }
    }

    pub fn ssl_policy(mut self, policy: SslPolicy) -> Self {
        self.ssl_policy = policy;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sub-path the node is installed under, without surrounding slashes.
    pub fn url_path(mut self, path: &str) -> Self {
        self.url_path = path.trim_matches('/').to_string();
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    fn scheme(&self) -> &'static str {
        match self.ssl_policy {
            SslPolicy::Full => "https",
            SslPolicy::None | SslPolicy::SelfSign => "http",
        }
    }

    fn authority(&self) -> String {
        match self.port {
            Some(port) if port != 80 && port != 443 => format!("{}:{}", self.hostname, port),
            _ => self.hostname.clone(),
        }
    }

    /// The base URL of this node.
    pub fn base_url(&self) -> String {
        let mut url = format!("{}://{}", self.scheme(), self.authority());
        if !self.url_path.is_empty() {
            url.push('/');
            url.push_str(&self.url_path);
        }
        url
    }

    /// The complete URL of the page a request is for.
    pub fn current_page_url(&self, request_uri: &str) -> String {
        format!("{}://{}{}", self.scheme(), self.authority(), request_uri)
    }

    /// Keep the stored base URL in sync with the one actually visited.
    ///
    /// The stored URL is replaced when it is missing or radically different
    /// from the current one; trivial variations (scheme, `www.`, case) are
    /// ignored, and a bare IP address never overwrites an existing setting.
    pub fn check_url(&self) {
        let stored = self
            .config
            .get("system", "url")
            .and_then(|v| v.as_str().map(String::from))
            .filter(|url| !url.is_empty());

        let replace = match &stored {
            None => true,
            Some(stored) => !compare_link(stored, &self.base_url()) && !self.is_ip_hostname(),
        };

        if replace {
            if let Err(e) = self.config.set("system", "url", self.base_url().into()) {
                log::warn!("could not persist system.url: {}", e);
            }
        }
    }

    fn is_ip_hostname(&self) -> bool {
        match Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$") {
            Ok(re) => re.is_match(&self.hostname),
            Err(_) => false,
        }
    }

    /// The directory server to query, configured or default.
    pub fn server_directory(&self) -> String {
        self.config
            .get("system", "directory")
            .and_then(|v| v.as_str().map(String::from))
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_DIRECTORY.to_string())
    }

    /// Bootstrap-time schema check.
    ///
    /// Fatal version errors propagate (the process must not serve requests
    /// against such a database); every other sequencer failure is logged
    /// and contained — the request proceeds against the possibly-stale
    /// schema and a later bootstrap retries.
    pub fn check_db(
        &self,
        runner: &UpdateRunner,
        via_worker: bool,
    ) -> Result<UpdateStatus, UpdateError> {
        match runner.ensure_current(via_worker) {
            Ok(status) => Ok(status),
            Err(err @ UpdateError::UnsupportedVersion { .. }) => Err(err),
            Err(err) => {
                log::warn!("database update did not complete: {}", err);
                Ok(UpdateStatus::Deferred)
            }
        }
    }
}
