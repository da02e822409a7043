use anyhow::Result;
use std::collections::HashSet;

use crate::dom::{Document, NodeId, Selector};

/// A standing subscription for elements matching `selector`
#[derive(Debug)]
pub struct WatchRegistration<H> {
    pub selector: Selector,
    pub handler: H,
    pub fire_once: bool,
    /// Elements already delivered to this registration
    seen: HashSet<NodeId>,
    retired: bool,
}

impl<H> WatchRegistration<H> {
    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

/// Watches a document for elements that may appear after the initial render.
///
/// Each registration delivers every newly matching element exactly once, in
/// document order. A `fire_once` registration delivers its first match and
/// then retires. Registrations are never removed; they live as long as the
/// watcher (the page).
#[derive(Debug)]
pub struct ElementWatcher<H> {
    registrations: Vec<WatchRegistration<H>>,
    /// Document generation at the last poll; `None` forces the next poll
    last_generation: Option<u64>,
}

impl<H> Default for ElementWatcher<H> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
            last_generation: None,
        }
    }
}

impl<H: Clone> ElementWatcher<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for elements matching `selector`.
    /// Elements already present are delivered by the next poll.
    pub fn watch(&mut self, selector: &str, handler: H, fire_once: bool) -> Result<()> {
        let selector = Selector::parse(selector)?;
        self.registrations.push(WatchRegistration {
            selector,
            handler,
            fire_once,
            seen: HashSet::new(),
            retired: false,
        });
        self.last_generation = None;
        Ok(())
    }

    pub fn registrations(&self) -> &[WatchRegistration<H>] {
        &self.registrations
    }

    /// Number of registrations still delivering
    pub fn active(&self) -> usize {
        self.registrations.iter().filter(|r| !r.retired).count()
    }

    /// Collect new matches since the last poll as `(handler, element)` pairs:
    /// registration order first, then document order within a registration.
    /// Returns nothing if the document has not changed since the last poll.
    pub fn poll(&mut self, doc: &Document) -> Vec<(H, NodeId)> {
        if self.last_generation == Some(doc.generation()) {
            return Vec::new();
        }
        self.last_generation = Some(doc.generation());

        let mut deliveries = Vec::new();
        for reg in self.registrations.iter_mut().filter(|r| !r.retired) {
            for node in doc.query_selector_all(doc.root(), &reg.selector) {
                if !reg.seen.insert(node) {
                    continue;
                }
                deliveries.push((reg.handler.clone(), node));
                if reg.fire_once {
                    reg.retired = true;
                    break;
                }
            }
        }
        deliveries
    }
}
