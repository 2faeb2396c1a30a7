//! Redirect callback parsing
//!
//! The authorization server returns the implicit-flow response in the URL the
//! user agent is redirected to.  Tokens normally arrive in the fragment, while
//! the application's own markers (and some error responses) arrive in the
//! query string, so both are read and merged into one [`AuthResponse`].
//!
//! Parsing is deliberately forgiving: a `key=value` piece that does not split
//! into exactly two parts is dropped instead of failing the whole response.
//! Values stay percent-encoded in the mapping and are decoded by the typed
//! accessors on demand.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

pub const ACCESS_TOKEN: &str = "access_token";
pub const ID_TOKEN: &str = "id_token";
pub const SESSION_STATE: &str = "session_state";
pub const STATE: &str = "state";
pub const NONCE: &str = "nonce";
pub const ERROR: &str = "error";
pub const ERROR_DESCRIPTION: &str = "error_description";
pub const REFRESH: &str = "refresh";

// ---------------------------------------------------------------------------
// AuthResponse
// ---------------------------------------------------------------------------

/// Flat mapping of the parameters carried by one redirect callback.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::callback::parse;
///
/// let response = parse("access_token=a.b.c&id_token=d.e.f", "authorizing=true&state=xyz");
/// assert_eq!(response.access_token().as_deref(), Some("a.b.c"));
/// assert_eq!(response.state().as_deref(), Some("xyz"));
/// assert!(response.error().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthResponse {
    params: HashMap<String, String>,
}

impl AuthResponse {
    /// The raw (still percent-encoded) value for `key`.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The percent-decoded value for `key`.
    ///
    /// Empty values are reported as absent, matching how a falsy parameter
    /// is treated by the rest of the flow.
    pub fn decoded(&self, key: &str) -> Option<String> {
        self.raw(key)
            .filter(|value| !value.is_empty())
            .map(decode_component)
    }

    /// Number of parameters retained.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// `true` when no parameter survived parsing.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameter names, for logging without exposing values.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn access_token(&self) -> Option<String> {
        self.decoded(ACCESS_TOKEN)
    }

    pub fn id_token(&self) -> Option<String> {
        self.decoded(ID_TOKEN)
    }

    pub fn session_state(&self) -> Option<String> {
        self.decoded(SESSION_STATE)
    }

    pub fn state(&self) -> Option<String> {
        self.decoded(STATE)
    }

    pub fn nonce(&self) -> Option<String> {
        self.decoded(NONCE)
    }

    pub fn error(&self) -> Option<String> {
        self.decoded(ERROR)
    }

    pub fn error_description(&self) -> Option<String> {
        self.decoded(ERROR_DESCRIPTION)
    }

    /// Whether the response asks for a full reload of the top-level page.
    ///
    /// Any non-empty value other than `false` counts as a request.
    pub fn refresh_requested(&self) -> bool {
        self.raw(REFRESH)
            .map(|value| !value.is_empty() && value != "false")
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Parses the fragment and query string of a redirect target.
///
/// Both arguments are the text after their delimiter; a leading `#` or `?`
/// is tolerated and stripped.  Fragment entries are applied first and query
/// entries second, so on a key collision the query value wins.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::callback::parse;
///
/// let response = parse("#state=from-fragment&broken&a=b=c", "?state=from-query");
/// assert_eq!(response.state().as_deref(), Some("from-query"));
/// assert_eq!(response.len(), 1);
/// ```
pub fn parse(fragment: &str, query: &str) -> AuthResponse {
    let mut params = HashMap::new();

    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let query = query.strip_prefix('?').unwrap_or(query);

    for source in [fragment, query] {
        for piece in source.split('&') {
            let parts: Vec<&str> = piece.split('=').collect();
            if let [key, value] = parts.as_slice() {
                params.insert((*key).to_string(), (*value).to_string());
            }
        }
    }

    AuthResponse { params }
}

/// Splits a full redirect target URL into its `(fragment, query)` parts,
/// each without its delimiter.
///
/// # Examples
///
/// ```
/// use implicit_oidc::auth::callback::split_redirect_target;
///
/// let (fragment, query) =
///     split_redirect_target("http://localhost:7000/?authorizing=true#access_token=x");
/// assert_eq!(fragment, "access_token=x");
/// assert_eq!(query, "authorizing=true");
/// ```
pub fn split_redirect_target(target: &str) -> (&str, &str) {
    let (before_fragment, fragment) = match target.split_once('#') {
        Some((before, after)) => (before, after),
        None => (target, ""),
    };
    let query = before_fragment
        .split_once('?')
        .map(|(_, after)| after)
        .unwrap_or("");
    (fragment, query)
}

/// Percent-decodes a single value the way `decodeURIComponent` does.
///
/// `+` is left untouched; invalid UTF-8 is replaced rather than rejected.
pub fn decode_component(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
