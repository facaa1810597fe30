//! Per-request session and authentication context.
//!
//! Carries the authenticated-user state for one request or worker
//! invocation as an explicit object instead of process-global state.

use crate::config::ConfigStore;

/// Resolves a profile URL to a public contact id.
///
/// Backed by the contact table in production; tests use a closure-free fake.
pub trait ContactResolver {
    fn id_for_url(&self, url: &str) -> Option<i64>;
}

/// Session state of one request.
///
/// # Examples
///
/// ```
/// use fedibase::session::Session;
///
/// let session = Session::new().authenticated_local(42, "alice@example.com");
/// assert_eq!(session.local_user(), Some(42));
/// assert_eq!(session.remote_user(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    authenticated: bool,
    uid: Option<i64>,
    my_address: Option<String>,
    visitor_id: Option<i64>,
    visitor_home: Option<String>,
    interactive: bool,
    sysmsg: Vec<String>,
    sysmsg_info: Vec<String>,
    public_contact_id: Option<i64>,
}

impl Session {
    /// An unauthenticated, non-interactive session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session as an interactive browser request. Only interactive
    /// sessions collect user-visible messages.
    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    /// Authenticate as a local user.
    pub fn authenticated_local(mut self, uid: i64, address: &str) -> Self {
        self.authenticated = true;
        self.uid = Some(uid);
        self.my_address = Some(address.to_string());
        self
    }

    /// Authenticate as a remote visitor.
    pub fn authenticated_remote(mut self, visitor_id: i64, visitor_home: &str) -> Self {
        self.authenticated = true;
        self.visitor_id = Some(visitor_id);
        self.visitor_home = Some(visitor_home.to_string());
        self
    }

    /// User id of the locally logged-in user, if any.
    pub fn local_user(&self) -> Option<i64> {
        if self.authenticated {
            self.uid
        } else {
            None
        }
    }

    /// Contact id of an authenticated remote visitor, if any.
    ///
    /// A session can be both local and remote; remote authentication to
    /// local profiles relies on that.
    pub fn remote_user(&self) -> Option<i64> {
        if self.authenticated {
            self.visitor_id
        } else {
            None
        }
    }

    /// Public contact id of the authenticated party, resolved once per
    /// session through `resolver` and memoized.
    pub fn public_contact(&mut self, resolver: &dyn ContactResolver) -> Option<i64> {
        if !self.authenticated {
            self.public_contact_id = None;
            return None;
        }
        if self.public_contact_id.is_none() {
            let address = self.my_address.clone().or_else(|| self.visitor_home.clone())?;
            self.public_contact_id = resolver.id_for_url(&address);
        }
        self.public_contact_id
    }

    /// Whether the logged-in user is listed in the comma-separated
    /// `config.admin_email` setting.
    pub fn is_site_admin(&self, config: &dyn ConfigStore, user_email: &str) -> bool {
        if self.local_user().is_none() {
            return false;
        }
        let admin_email = match config
            .get("config", "admin_email")
            .and_then(|v| v.as_str().map(String::from))
        {
            Some(emails) if !emails.is_empty() => emails,
            _ => return false,
        };
        admin_email
            .split(',')
            .map(|e| e.trim())
            .any(|e| e == user_email)
    }

    /// Queue an error message to show the user at next page load.
    pub fn notice(&mut self, message: &str) {
        if self.interactive {
            self.sysmsg.push(message.to_string());
        }
    }

    /// Queue an informational message to show the user at next page load.
    pub fn info(&mut self, message: &str) {
        if self.interactive {
            self.sysmsg_info.push(message.to_string());
        }
    }

    /// Drain the queued error messages.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sysmsg)
    }

    /// Drain the queued informational messages.
    pub fn take_infos(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sysmsg_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;
    use std::cell::Cell;

    struct FixedResolver {
        id: i64,
        calls: Cell<usize>,
    }

    impl ContactResolver for FixedResolver {
        fn id_for_url(&self, _url: &str) -> Option<i64> {
            self.calls.set(self.calls.get() + 1);
            Some(self.id)
        }
    }

    #[test]
    fn test_unauthenticated_session_has_no_users() {
        let session = Session::new();
        assert_eq!(session.local_user(), None);
        assert_eq!(session.remote_user(), None);
    }

    #[test]
    fn test_local_and_remote_users() {
        let local = Session::new().authenticated_local(7, "bob@node.tld");
        assert_eq!(local.local_user(), Some(7));
        assert_eq!(local.remote_user(), None);

        let remote = Session::new().authenticated_remote(99, "https://other.tld/profile/carol");
        assert_eq!(remote.local_user(), None);
        assert_eq!(remote.remote_user(), Some(99));
    }

    #[test]
    fn test_public_contact_is_memoized() {
        let resolver = FixedResolver { id: 1234, calls: Cell::new(0) };
        let mut session = Session::new().authenticated_local(7, "bob@node.tld");

        assert_eq!(session.public_contact(&resolver), Some(1234));
        assert_eq!(session.public_contact(&resolver), Some(1234));
        assert_eq!(resolver.calls.get(), 1);
    }

    #[test]
    fn test_is_site_admin() {
        let config = MemoryConfigStore::new();
        config
            .set("config", "admin_email", "admin@node.tld, ops@node.tld".into())
            .unwrap();

        let session = Session::new().authenticated_local(1, "admin@node.tld");
        assert!(session.is_site_admin(&config, "admin@node.tld"));
        assert!(session.is_site_admin(&config, "ops@node.tld"));
        assert!(!session.is_site_admin(&config, "mallory@node.tld"));

        // No admin_email configured means nobody is an admin.
        let empty = MemoryConfigStore::new();
        assert!(!session.is_site_admin(&empty, "admin@node.tld"));

        // Unauthenticated sessions are never admins.
        let anon = Session::new();
        assert!(!anon.is_site_admin(&config, "admin@node.tld"));
    }

    #[test]
    fn test_messages_only_collected_when_interactive() {
        let mut session = Session::new();
        session.notice("lost");
        assert!(session.take_notices().is_empty());

        let mut session = Session::new().interactive();
        session.notice("saved");
        session.info("profile updated");
        assert_eq!(session.take_notices(), vec!["saved".to_string()]);
        assert_eq!(session.take_infos(), vec!["profile updated".to_string()]);
        assert!(session.take_infos().is_empty());
    }
}
