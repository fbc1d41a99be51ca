//! vastd-router: Zero-dependency segment trie router
//!
//! Maps `(method, path)` pairs to route values for the vastd HTTP service.
//!
//! ## Features
//! - O(k) path lookup where k = number of path segments
//! - Static paths only: `/vast`, `/track`, `/healthz`
//! - Per-path method table
//! - `HEAD` falls back to the `GET` entry of the same path
//! - Zero external dependencies
//!
//! ## Path rules
//! - Empty segments are ignored, so `/track/` and `//track` match `/track`
//! - Segments are compared byte for byte (paths are case-sensitive)
//! - Method names are case-insensitive
//!
//! ## Example
//! ```
//! use vastd_router::Router;
//!
//! let mut router = Router::new();
//! router.insert("GET", "/vast", "document");
//! router.insert("GET", "/track", "pixel");
//!
//! assert_eq!(router.find("GET", "/track"), Some(&"pixel"));
//! assert_eq!(router.find("HEAD", "/vast"), Some(&"document"));
//! assert_eq!(router.find("POST", "/vast"), None);
//! ```

use std::collections::HashMap;

/// Trie node: one per path segment
#[derive(Debug)]
struct Node<T> {
    /// Child segments
    children: HashMap<String, Node<T>>,
    /// Method (upper-case) -> route value, for paths ending here
    methods: HashMap<String, T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            methods: HashMap::new(),
        }
    }
}

/// Segment trie router, generic over the route value
#[derive(Debug)]
pub struct Router<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl<T> Router<T> {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` for `method` on `path`
    ///
    /// Returns the value previously registered for the same method and
    /// path, if any.
    pub fn insert(&mut self, method: &str, path: &str, value: T) -> Option<T> {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        let previous = node.methods.insert(method.to_uppercase(), value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    fn node(&self, path: &str) -> Option<&Node<T>> {
        let mut node = &self.root;
        for segment in segments(path) {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Find the value registered for `method` on `path`
    ///
    /// A `HEAD` lookup with no explicit `HEAD` entry uses the `GET` entry.
    pub fn find(&self, method: &str, path: &str) -> Option<&T> {
        let node = self.node(path)?;
        let method = method.to_uppercase();
        node.methods.get(&method).or_else(|| {
            if method == "HEAD" {
                node.methods.get("GET")
            } else {
                None
            }
        })
    }

    /// Number of registered (method, path) routes
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no route is registered
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
