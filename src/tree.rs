//! The compressed radix tree backing the router.
//!
//! One tree exists per HTTP method. Edges hold byte strings; sibling edges
//! at a node start with distinct bytes, recorded in the node's `indices`
//! table so the matching child is picked without scanning edge labels.
//! Parameter (`:name`) and catch-all (`*name`) segments live in a dedicated
//! wildcard slot: at any position a node has either static children or a
//! wildcard child, never both, which is what makes every lookup
//! unambiguous.
//!
//! Registration happens before serving starts and is not synchronized;
//! lookups never mutate the tree, so the serving phase reads it without
//! locks.

use crate::middleware::Handler;
use crate::types::RouteParams;
use std::fmt::{self, Debug, Formatter};
use std::mem;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum NodeKind {
    Root,
    Static,
    Param,
    CatchAll,
}

/// The outcome of matching a request path against one method tree.
pub(crate) enum Lookup {
    Found {
        handler: Handler,
        params: RouteParams,
    },
    /// No route matched. `tsr` advises that the path with its trailing
    /// slash toggled would have matched.
    Miss { tsr: bool },
}

pub(crate) struct Node {
    path: Vec<u8>,
    indices: Vec<u8>,
    kind: NodeKind,
    children: Vec<Node>,
    wild_child: Option<Box<Node>>,
    handler: Option<Handler>,
    priority: u32,
    max_params: u8,
}

impl Default for Node {
    fn default() -> Node {
        Node::new(NodeKind::Static)
    }
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Node {
        Node {
            path: Vec::new(),
            indices: Vec::new(),
            kind,
            children: Vec::new(),
            wild_child: None,
            handler: None,
            priority: 0,
            max_params: 0,
        }
    }

    /// Upper bound on the number of parameters any route below this node
    /// can capture; the root's value sizes the per-request parameter buffer.
    pub(crate) fn max_params(&self) -> u8 {
        self.max_params
    }

    #[cfg(test)]
    pub(crate) fn priority(&self) -> u32 {
        self.priority
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &[u8] {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn handler_ref(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    /// Registers `pattern` in this tree.
    ///
    /// Panics on a malformed pattern, on a duplicate pattern and on a
    /// wildcard conflict with an already-registered route; registration
    /// failures are programmer errors caught at startup.
    pub(crate) fn insert(&mut self, pattern: &str, handler: Handler) {
        self.priority += 1;
        let params = count_params(pattern);
        if params > self.max_params {
            self.max_params = params;
        }

        // first route in this tree claims the root edge
        if self.path.is_empty() && self.children.is_empty() && self.wild_child.is_none() {
            self.build_edge(pattern, pattern.as_bytes(), handler, params);
            self.kind = NodeKind::Root;
            return;
        }

        self.insert_at(pattern, pattern.as_bytes(), handler, params);
    }

    fn insert_at(&mut self, full: &str, path: &[u8], handler: Handler, params: u8) {
        let lcp = longest_common_prefix(path, &self.path);

        if lcp < self.path.len() {
            // split the edge; the surviving suffix moves into a child
            let child = Node {
                path: self.path[lcp..].to_vec(),
                indices: mem::take(&mut self.indices),
                kind: NodeKind::Static,
                children: mem::take(&mut self.children),
                wild_child: self.wild_child.take(),
                handler: self.handler.take(),
                priority: self.priority - 1,
                max_params: self.max_params,
            };
            self.indices = vec![child.path[0]];
            self.children = vec![child];
            self.path.truncate(lcp);
        }

        if lcp == path.len() {
            if self.handler.is_some() {
                panic!("a handler is already registered for path {:?}", full);
            }
            self.handler = Some(handler);
            return;
        }

        self.insert_child(full, &path[lcp..], handler, params);
    }

    /// Chooses or creates the child consuming `path` (which is non-empty and
    /// shares no prefix with this node's own edge).
    fn insert_child(&mut self, full: &str, path: &[u8], handler: Handler, params: u8) {
        let first = path[0];

        if first == b':' || first == b'*' {
            self.insert_wildcard(full, path, handler, params);
            return;
        }

        // existing static child with the same first byte
        if let Some(i) = self.indices.iter().position(|&b| b == first) {
            let i = self.bump_child(i);
            let child = &mut self.children[i];
            if params > child.max_params {
                child.max_params = params;
            }
            child.insert_at(full, path, handler, params);
            return;
        }

        if let Some(wild) = self.wild_child.as_deref_mut() {
            // re-spelling the identical catch-all terminates here
            if wild.kind == NodeKind::CatchAll && path == &wild.path[..] {
                if wild.handler.is_some() {
                    panic!("a handler is already registered for path {:?}", full);
                }
                wild.handler = Some(handler);
                return;
            }
            panic!(
                "path segment {:?} conflicts with existing wildcard {:?} in path {:?}",
                String::from_utf8_lossy(path),
                String::from_utf8_lossy(&wild.path),
                full
            );
        }

        self.indices.push(first);
        self.children.push(Node::new(NodeKind::Static));
        let i = self.bump_child(self.children.len() - 1);
        self.children[i].build_edge(full, path, handler, params);
    }

    fn insert_wildcard(&mut self, full: &str, path: &[u8], handler: Handler, params: u8) {
        let first = path[0];
        let end = if first == b':' {
            path.iter().position(|&b| b == b'/').unwrap_or(path.len())
        } else {
            path.len()
        };
        let wildcard = &path[..end];

        if first == b'*' && path[1..].contains(&b'/') {
            panic!(
                "catch-all routes are only allowed at the end of the path in path {:?}",
                full
            );
        }
        if wildcard.len() < 2 {
            panic!(
                "wildcards must be named with a non-empty name in path {:?}",
                full
            );
        }
        if wildcard[1..].iter().any(|&b| b == b':' || b == b'*') {
            panic!(
                "only one wildcard per path segment is allowed, has: {:?} in path {:?}",
                String::from_utf8_lossy(wildcard),
                full
            );
        }

        if let Some(wild) = self.wild_child.as_deref_mut() {
            if wild.kind == NodeKind::Param && wild.path == wildcard {
                // identical parameter; descend past it
                wild.priority += 1;
                if params > wild.max_params {
                    wild.max_params = params;
                }
                let rest = &path[wildcard.len()..];
                if rest.is_empty() {
                    if wild.handler.is_some() {
                        panic!("a handler is already registered for path {:?}", full);
                    }
                    wild.handler = Some(handler);
                } else {
                    wild.insert_child(full, rest, handler, params);
                }
                return;
            }
            panic!(
                "wildcard segment {:?} conflicts with existing wildcard {:?} in path {:?}",
                String::from_utf8_lossy(wildcard),
                String::from_utf8_lossy(&wild.path),
                full
            );
        }

        if !self.children.is_empty() {
            panic!(
                "wildcard segment {:?} conflicts with existing children in path {:?}",
                String::from_utf8_lossy(wildcard),
                full
            );
        }

        if first == b':' {
            let mut param = Node::new(NodeKind::Param);
            param.path = wildcard.to_vec();
            param.priority = 1;
            param.max_params = params;
            let rest = &path[wildcard.len()..];
            if rest.is_empty() {
                param.handler = Some(handler);
            } else {
                let mut child = Node::new(NodeKind::Static);
                child.priority = 1;
                child.build_edge(full, rest, handler, params);
                param.indices = vec![rest[0]];
                param.children = vec![child];
            }
            self.wild_child = Some(Box::new(param));
        } else if self.path.last() == Some(&b'/') {
            // the '/' this catch-all needs already belongs to a shared edge
            panic!(
                "catch-all conflicts with existing handle for the path segment root in path {:?}",
                full
            );
        } else {
            panic!("no / before catch-all in path {:?}", full);
        }
    }

    /// Fills a fresh, empty node with `path`, expanding any embedded
    /// wildcard segments into the wildcard slot.
    fn build_edge(&mut self, full: &str, path: &[u8], handler: Handler, params: u8) {
        if params > self.max_params {
            self.max_params = params;
        }

        let Some((start, wildcard, valid)) = find_wildcard(path) else {
            self.path = path.to_vec();
            self.handler = Some(handler);
            return;
        };

        if !valid {
            panic!(
                "only one wildcard per path segment is allowed, has: {:?} in path {:?}",
                String::from_utf8_lossy(wildcard),
                full
            );
        }
        if wildcard.len() < 2 {
            panic!(
                "wildcards must be named with a non-empty name in path {:?}",
                full
            );
        }

        if wildcard[0] == b':' {
            self.path = path[..start].to_vec();
            let mut param = Node::new(NodeKind::Param);
            param.path = wildcard.to_vec();
            param.priority = 1;
            param.max_params = params;
            let rest = &path[start + wildcard.len()..];
            if rest.is_empty() {
                param.handler = Some(handler);
            } else {
                let mut child = Node::new(NodeKind::Static);
                child.priority = 1;
                child.build_edge(full, rest, handler, params);
                param.indices = vec![rest[0]];
                param.children = vec![child];
            }
            self.wild_child = Some(Box::new(param));
        } else {
            if start + wildcard.len() != path.len() {
                panic!(
                    "catch-all routes are only allowed at the end of the path in path {:?}",
                    full
                );
            }
            if start == 0 || path[start - 1] != b'/' {
                panic!("no / before catch-all in path {:?}", full);
            }
            // the preceding '/' moves into the catch-all node so captures
            // keep their leading slash
            self.path = path[..start - 1].to_vec();
            let mut catch_all = Node::new(NodeKind::CatchAll);
            catch_all.path = path[start - 1..].to_vec();
            catch_all.priority = 1;
            catch_all.max_params = params;
            catch_all.handler = Some(handler);
            self.wild_child = Some(Box::new(catch_all));
        }
    }

    /// Bumps the priority of `children[i]` and bubbles it left past lower
    /// priority siblings, keeping `indices` in step. Returns the child's new
    /// position.
    fn bump_child(&mut self, mut i: usize) -> usize {
        self.children[i].priority += 1;
        let priority = self.children[i].priority;
        while i > 0 && self.children[i - 1].priority < priority {
            self.children.swap(i - 1, i);
            self.indices.swap(i - 1, i);
            i -= 1;
        }
        i
    }

    /// Matches `path` against this tree, binding parameter captures.
    pub(crate) fn lookup(&self, path: &str) -> Lookup {
        let mut params = RouteParams::with_capacity(self.max_params as usize);
        let mut node = self;
        let mut path = path.as_bytes();

        loop {
            let prefix: &[u8] = &node.path;

            if path.len() > prefix.len() && &path[..prefix.len()] == prefix {
                path = &path[prefix.len()..];

                let first = path[0];
                if let Some(i) = node.indices.iter().position(|&b| b == first) {
                    node = &node.children[i];
                    continue;
                }

                let Some(wild) = node.wild_child.as_deref() else {
                    // dead end; the bare path may still exist without the
                    // trailing slash
                    let tsr = path == b"/" && node.handler.is_some();
                    return Lookup::Miss { tsr };
                };

                match wild.kind {
                    NodeKind::Param => {
                        let end = path
                            .iter()
                            .position(|&b| b == b'/')
                            .unwrap_or(path.len());
                        if end == 0 {
                            // parameters never match an empty segment
                            return Lookup::Miss { tsr: false };
                        }
                        params.set(
                            String::from_utf8_lossy(&wild.path[1..]).into_owned(),
                            String::from_utf8_lossy(&path[..end]).into_owned(),
                        );

                        if end == path.len() {
                            if let Some(handler) = &wild.handler {
                                return Lookup::Found {
                                    handler: handler.clone(),
                                    params,
                                };
                            }
                            let tsr = wild.has_trailing_slash_route();
                            return Lookup::Miss { tsr };
                        }

                        path = &path[end..];
                        if let Some(i) = wild.indices.iter().position(|&b| b == path[0]) {
                            node = &wild.children[i];
                            continue;
                        }
                        let tsr = path == b"/" && wild.handler.is_some();
                        return Lookup::Miss { tsr };
                    }
                    NodeKind::CatchAll => {
                        // the remainder, leading slash included
                        params.set(
                            String::from_utf8_lossy(&wild.path[2..]).into_owned(),
                            String::from_utf8_lossy(path).into_owned(),
                        );
                        return match &wild.handler {
                            Some(handler) => Lookup::Found {
                                handler: handler.clone(),
                                params,
                            },
                            None => Lookup::Miss { tsr: false },
                        };
                    }
                    _ => return Lookup::Miss { tsr: false },
                }
            }

            if path == prefix {
                if let Some(handler) = &node.handler {
                    return Lookup::Found {
                        handler: handler.clone(),
                        params,
                    };
                }
                // the path exists but carries no handler; advise the
                // trailing-slash variant when one is registered
                let tsr = node.has_trailing_slash_route()
                    || matches!(
                        node.wild_child.as_deref(),
                        Some(wild) if wild.kind == NodeKind::CatchAll && wild.handler.is_some()
                    );
                return Lookup::Miss { tsr };
            }

            // the path diverges from this edge or ends inside it
            let tsr = path == b"/"
                || (prefix.len() == path.len() + 1
                    && prefix[path.len()] == b'/'
                    && path == &prefix[..path.len()]
                    && node.handler.is_some());
            return Lookup::Miss { tsr };
        }
    }

    fn has_trailing_slash_route(&self) -> bool {
        self.children
            .iter()
            .any(|child| child.path == b"/" && child.handler.is_some())
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &String::from_utf8_lossy(&self.path))
            .field("indices", &String::from_utf8_lossy(&self.indices))
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("max_params", &self.max_params)
            .field("handler", &self.handler.is_some())
            .field("children", &self.children)
            .field("wild_child", &self.wild_child)
            .finish()
    }
}

/// Counts the wildcard markers in a pattern; the result bounds the number
/// of parameters any matching request can capture.
pub(crate) fn count_params(pattern: &str) -> u8 {
    let count = pattern
        .bytes()
        .filter(|&b| b == b':' || b == b'*')
        .count();
    count.min(u8::MAX as usize) as u8
}

pub(crate) fn longest_common_prefix(a: &[u8], b: &[u8]) -> usize {
    let max = a.len().min(b.len());
    let mut i = 0;
    while i < max && a[i] == b[i] {
        i += 1;
    }
    i
}

/// Finds the first wildcard segment in `path`: its start offset, the
/// segment itself and whether it is well formed (a second marker inside the
/// same segment makes it invalid).
pub(crate) fn find_wildcard(path: &[u8]) -> Option<(usize, &[u8], bool)> {
    for (start, &byte) in path.iter().enumerate() {
        if byte != b':' && byte != b'*' {
            continue;
        }
        for (end, &byte) in path[start + 1..].iter().enumerate() {
            match byte {
                b'/' => return Some((start, &path[start..start + 1 + end], true)),
                b':' | b'*' => return Some((start, &path[start..start + 1 + end], false)),
                _ => {}
            }
        }
        return Some((start, &path[start..], true));
    }
    None
}
