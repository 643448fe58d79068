//! Platform location
//!
//! The router only needs three things from the platform: the current URL,
//! a way to push a new one and a way to replace the current one.

use std::borrow::Cow;

use parking_lot::Mutex;

/// Platform URL bar / history
pub trait Location: Send + Sync {
    /// Current URL, normalized
    fn path(&self) -> String;

    /// Push `url` as a new history entry
    fn go(&self, url: &str);

    /// Overwrite the current history entry with `url`
    fn replace_state(&self, url: &str);

    fn is_current_path_equal_to(&self, url: &str) -> bool {
        self.path() == normalize_location_path(url)
    }
}

/// Normalizes a location URL
///
/// Ensures a leading `/` and drops a trailing `/` from the path part.
/// Inner `//` is kept, it separates outlets inside parentheses.
///
/// # Examples
///
/// ```
/// use rhtmx_nav::navigation::location::normalize_location_path;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_location_path("/team/33"), Cow::Borrowed("/team/33")));
/// assert_eq!(normalize_location_path("team/33/"), "/team/33");
/// assert_eq!(normalize_location_path("/team/?a=1"), "/team?a=1");
/// assert_eq!(normalize_location_path(""), "/");
/// assert_eq!(normalize_location_path("/a(aux:b//c:d)"), "/a(aux:b//c:d)");
/// ```
pub fn normalize_location_path(url: &str) -> Cow<'_, str> {
    let split = url.find(['?', '#']).unwrap_or(url.len());
    let (path, rest) = url.split_at(split);

    let leading = path.starts_with('/');
    let trailing = path.len() > 1 && path.ends_with('/');
    if leading && !trailing {
        return Cow::Borrowed(url);
    }

    let trimmed = path.trim_end_matches('/').trim_start_matches('/');
    Cow::Owned(format!("/{}{}", trimmed, rest))
}

#[derive(Debug)]
struct History {
    entries: Vec<String>,
    index: usize,
}

/// In-memory history stack for tests and non-browser hosts
#[derive(Debug)]
pub struct MemoryLocation {
    history: Mutex<History>,
}

impl MemoryLocation {
    pub fn new(initial: &str) -> Self {
        Self {
            history: Mutex::new(History {
                entries: vec![normalize_location_path(initial).into_owned()],
                index: 0,
            }),
        }
    }

    /// Every entry, oldest first
    pub fn entries(&self) -> Vec<String> {
        self.history.lock().entries.clone()
    }

    /// Moves one entry back and returns the URL to hand to the router
    pub fn back(&self) -> Option<String> {
        let mut history = self.history.lock();
        if history.index == 0 {
            return None;
        }
        history.index -= 1;
        Some(history.entries[history.index].clone())
    }

    pub fn forward(&self) -> Option<String> {
        let mut history = self.history.lock();
        if history.index + 1 >= history.entries.len() {
            return None;
        }
        history.index += 1;
        Some(history.entries[history.index].clone())
    }
}

impl Default for MemoryLocation {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Location for MemoryLocation {
    fn path(&self) -> String {
        let history = self.history.lock();
        history.entries[history.index].clone()
    }

    fn go(&self, url: &str) {
        let mut history = self.history.lock();
        let next = history.index + 1;
        history.entries.truncate(next);
        history.entries.push(normalize_location_path(url).into_owned());
        history.index = next;
    }

    fn replace_state(&self, url: &str) {
        let mut history = self.history.lock();
        let index = history.index;
        history.entries[index] = normalize_location_path(url).into_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_go_and_back() {
        let location = MemoryLocation::new("/");
        location.go("/a");
        location.go("/b");
        assert_eq!(location.path(), "/b");
        assert_eq!(location.back(), Some("/a".to_string()));
        assert_eq!(location.path(), "/a");
        assert_eq!(location.forward(), Some("/b".to_string()));
        assert_eq!(location.forward(), None);
    }

    #[test]
    fn test_go_drops_forward_entries() {
        let location = MemoryLocation::new("/");
        location.go("/a");
        location.go("/b");
        location.back();
        location.go("/c");
        assert_eq!(location.entries(), vec!["/", "/a", "/c"]);
    }

    #[test]
    fn test_replace_state() {
        let location = MemoryLocation::new("/a");
        location.replace_state("b/");
        assert_eq!(location.entries(), vec!["/b"]);
        assert!(location.is_current_path_equal_to("/b/"));
    }
}
