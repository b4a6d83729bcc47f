use std::fmt::{self, Debug, Formatter};

/// Represents the parameters captured while matching a request path against
/// a registered route pattern.
///
/// For the pattern `/users/:id` and the path `/users/42`, the captured
/// parameters are `{ id: "42" }`. A catch-all segment captures the remainder
/// of the path including its leading slash, so `/static/*filepath` matched
/// against `/static/a/b.css` captures `{ filepath: "/a/b.css" }`.
///
/// Routes rarely capture more than a handful of parameters, so the values
/// are kept in a flat list of pairs and looked up with a linear scan.
#[derive(Clone, Default)]
pub struct RouteParams {
    items: Vec<(String, String)>,
}

impl RouteParams {
    /// Creates an empty `RouteParams`.
    pub fn new() -> RouteParams {
        RouteParams { items: Vec::new() }
    }

    /// Creates an empty `RouteParams` with space for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> RouteParams {
        RouteParams {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Binds a parameter name to a captured value.
    pub fn set<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.items.push((name.into(), value.into()));
    }

    /// Returns the value captured for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over the `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns the number of captured parameters.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no parameters were captured.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    pub(crate) fn reserve(&mut self, capacity: usize) {
        let additional = capacity.saturating_sub(self.items.capacity());
        self.items.reserve(additional);
    }
}

impl Debug for RouteParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.items.iter().map(|(n, v)| (n, v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::RouteParams;

    #[test]
    fn set_and_get() {
        let mut params = RouteParams::with_capacity(2);
        params.set("id", "42");
        params.set("section", "books");

        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("section"), Some("books"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn clear_removes_everything() {
        let mut params = RouteParams::new();
        params.set("id", "42");
        params.clear();

        assert!(params.is_empty());
        assert_eq!(params.get("id"), None);
    }
}
