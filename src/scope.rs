//! Resolution of cross-template references.
//!
//! A `-> name` node splices another template into the expansion. The
//! [`TemplateScope`] trait is the lookup seam the host implements; the
//! expansion engine resolves references through it at expansion time, so a
//! scope may serve templates from memory, storage or any other source.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ast::template::TemplateNode;
use crate::error::ParseError;
use crate::parser;

/// Provides the templates that `-> name` references resolve to.
pub trait TemplateScope {
    /// The template registered under `name`, or `None` when there is no
    /// such template.
    fn get_template(&self, name: &str) -> Option<Arc<TemplateNode>>;
}

/// A scope with no templates at all. Every reference fails to resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl TemplateScope for EmptyScope {
    fn get_template(&self, _name: &str) -> Option<Arc<TemplateNode>> {
        None
    }
}

/// An in-memory scope backed by a name-to-template map.
#[derive(Default)]
pub struct MapScope {
    templates: HashMap<String, Arc<TemplateNode>>,
}

impl MapScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template under a name, replacing any previous entry.
    pub fn define(&mut self, name: impl Into<String>, template: TemplateNode) {
        self.templates.insert(name.into(), Arc::new(template));
    }

    /// Parses `source` and registers the result under `name`.
    pub fn define_source(
        &mut self,
        name: impl Into<String>,
        source: &str,
    ) -> Result<(), ParseError> {
        self.define(name, parser::parse(source)?);
        Ok(())
    }
}

impl TemplateScope for MapScope {
    fn get_template(&self, name: &str) -> Option<Arc<TemplateNode>> {
        self.templates.get(name).cloned()
    }
}

/// Decorates another scope with a lookup cache.
///
/// Both hits and misses are cached, so a reference that fails to resolve
/// does not hit the underlying scope again on the next expansion.
pub struct CachedScope<S> {
    inner: S,
    cache: Mutex<HashMap<String, Option<Arc<TemplateNode>>>>,
}

impl<S: TemplateScope> CachedScope<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: TemplateScope> TemplateScope for CachedScope<S> {
    fn get_template(&self, name: &str) -> Option<Arc<TemplateNode>> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            // A poisoned cache only loses memoization.
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(cached) = cache.get(name) {
            return cached.clone();
        }
        let resolved = self.inner.get_template(name);
        cache.insert(name.to_string(), resolved.clone());
        resolved
    }
}
