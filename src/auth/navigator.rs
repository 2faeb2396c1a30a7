//! User-agent navigation capability
//!
//! Both the login redirect and the post-callback hand-off leave the current
//! page.  The orchestrator only asks a [`Navigator`] to go somewhere; what
//! "going" means depends on the host:
//!
//! - [`SystemBrowserNavigator`] prints the location and, optionally, opens
//!   it in the platform browser.
//! - [`RecordingNavigator`] just remembers every request, for headless hosts
//!   and tests.

use std::sync::Mutex;

use crate::error::{OidcError, Result};

/// A navigation the orchestrator requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Move the top-level context to this location.
    Assign(String),
    /// Reload the top-level context in place.
    Reload,
}

/// Moves the user agent.
pub trait Navigator: Send + Sync {
    /// Navigates the top-level context to `location`.
    fn assign(&self, location: &str) -> Result<()>;

    /// Reloads the top-level context.
    fn reload(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SystemBrowserNavigator
// ---------------------------------------------------------------------------

/// Navigator for command-line hosts.
///
/// Every location is printed to stdout so it can be copied; when
/// `open_browser` is set, absolute `http(s)` locations are also handed to the
/// platform opener.
#[derive(Debug, Clone)]
pub struct SystemBrowserNavigator {
    open_browser: bool,
}

impl SystemBrowserNavigator {
    pub fn new(open_browser: bool) -> Self {
        Self { open_browser }
    }

    /// Attempts to open `url` in the default browser.
    ///
    /// Failures are ignored; the printed URL remains available.
    fn try_open_browser(&self, url: &str) {
        #[cfg(target_os = "macos")]
        {
            let _ = std::process::Command::new("open").arg(url).spawn();
        }
        #[cfg(target_os = "linux")]
        {
            let _ = std::process::Command::new("xdg-open").arg(url).spawn();
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            let _ = url;
        }
    }
}

impl Navigator for SystemBrowserNavigator {
    fn assign(&self, location: &str) -> Result<()> {
        if location.is_empty() {
            return Err(OidcError::Navigation("empty location".to_string()).into());
        }
        println!("{}", location);

        let absolute = location.starts_with("http://") || location.starts_with("https://");
        if self.open_browser && absolute {
            tracing::debug!("Opening browser at {}", location);
            self.try_open_browser(location);
        }
        Ok(())
    }

    fn reload(&self) -> Result<()> {
        println!("Reload requested; restart the application to pick up the new session.");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingNavigator
// ---------------------------------------------------------------------------

/// Navigator that records requests instead of acting on them.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::navigator::{Navigation, Navigator, RecordingNavigator};
///
/// let navigator = RecordingNavigator::new();
/// navigator.assign("/index.html").unwrap();
/// navigator.reload().unwrap();
///
/// assert_eq!(
///     navigator.history(),
///     vec![Navigation::Assign("/index.html".to_string()), Navigation::Reload]
/// );
/// ```
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All navigations requested so far, oldest first.
    pub fn history(&self) -> Vec<Navigation> {
        self.lock().clone()
    }

    /// The most recent navigation, if any.
    pub fn last(&self) -> Option<Navigation> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Navigation>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Navigator for RecordingNavigator {
    fn assign(&self, location: &str) -> Result<()> {
        self.lock().push(Navigation::Assign(location.to_string()));
        Ok(())
    }

    fn reload(&self) -> Result<()> {
        self.lock().push(Navigation::Reload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_navigator_starts_empty() {
        let navigator = RecordingNavigator::new();
        assert!(navigator.history().is_empty());
        assert!(navigator.last().is_none());
    }

    #[test]
    fn test_recording_navigator_last_is_most_recent() {
        let navigator = RecordingNavigator::new();
        navigator.assign("https://a").unwrap();
        navigator.assign("https://b").unwrap();
        assert_eq!(navigator.last(), Some(Navigation::Assign("https://b".to_string())));
    }

    #[test]
    fn test_system_navigator_without_browser_accepts_relative_location() {
        let navigator = SystemBrowserNavigator::new(false);
        assert!(navigator.assign("/index.html?error=x").is_ok());
    }

    #[test]
    fn test_system_navigator_rejects_empty_location() {
        let navigator = SystemBrowserNavigator::new(false);
        assert!(navigator.assign("").is_err());
    }
}
