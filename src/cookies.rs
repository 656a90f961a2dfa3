//! Ordered `Set-Cookie` list.

use cookie::Cookie;

/// Response cookies in emission order.
///
/// Cookie identity is the `(name, domain, path)` triple; adding a cookie
/// whose identity matches an existing entry replaces it without moving it.
/// Cookies are kept out of the header map and serialized as one `Set-Cookie`
/// line each, never merged.
#[derive(Debug, Clone, Default)]
pub struct CookieList {
    inner: Vec<Cookie<'static>>,
}

impl CookieList {
    pub fn new() -> CookieList {
        CookieList { inner: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Add `cookie`, replacing an entry with the same identity in place.
    pub fn add(&mut self, cookie: Cookie<'static>) {
        match self.inner.iter_mut().find(|c| same_identity(c, &cookie)) {
            Some(slot) => *slot = cookie,
            None => self.inner.push(cookie),
        }
    }

    /// First cookie with the given name, ignoring domain and path.
    pub fn get(&self, name: &str) -> Option<&Cookie<'static>> {
        self.inner.iter().find(|c| c.name() == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cookie<'static>> {
        self.inner.iter()
    }

    /// Wire-ready `Set-Cookie` values, one per cookie, in list order.
    pub fn encoded(&self) -> impl Iterator<Item = String> + '_ {
        self.inner.iter().map(|c| c.encoded().to_string())
    }
}

fn same_identity(a: &Cookie<'_>, b: &Cookie<'_>) -> bool {
    a.name() == b.name() && a.domain() == b.domain() && a.path() == b.path()
}
