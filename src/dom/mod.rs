//! In-memory model of the host page.
//!
//! The host application owns the real page; the embedding environment mirrors
//! the parts we care about into a [`Document`] and replays our mutations back.
//! Nodes live in an arena and are addressed by [`NodeId`]. Removed nodes stay in
//! the arena (a late async handler may still hold a handle) but are detached.

pub mod selector;

use std::collections::BTreeMap;
use url::Url;

pub use selector::Selector;

// ── Types ──

/// Handle to an element in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// What happens when the user activates an element.
/// Listeners are plain data so the orchestrator can dispatch them with full
/// access to its own state.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    /// Show `url` in the side panel, labelled `name`
    OpenPanel { name: String, url: String },
    /// Tear down the side panel and its close control
    ClosePanel,
}

/// Description of an element to insert
#[derive(Debug, Clone, Default)]
pub struct Element {
    tag: String,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    style: Vec<(String, String)>,
    text: String,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Add one or more space-separated classes
    pub fn class(mut self, classes: &str) -> Self {
        self.classes
            .extend(classes.split_whitespace().map(str::to_string));
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.style.push((property.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn tag_name(&self) -> &str {
        &self.tag
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    /// Inline style, insertion ordered
    style: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<ClickAction>,
}

impl Node {
    fn from_element(el: Element) -> Self {
        Self {
            tag: el.tag,
            classes: el.classes,
            attrs: el.attrs.into_iter().collect(),
            style: el.style,
            text: el.text,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

/// A page: a tree of elements rooted at a synthetic `html` node
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    location: Option<Url>,
    /// Bumped on every change that can alter selector matches
    generation: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::from_element(Element::new("html"))],
            root: NodeId(0),
            location: None,
            generation: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    /// Set the page URL used to resolve relative links.
    /// Unparsable URLs clear the location.
    pub fn set_location(&mut self, href: &str) {
        self.location = Url::parse(href).ok();
    }

    // ── Tree mutation ──

    /// Create a detached element
    pub fn create(&mut self, element: Element) -> NodeId {
        self.nodes.push(Node::from_element(element));
        NodeId(self.nodes.len() - 1)
    }

    /// Create an element and append it as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, element: Element) -> NodeId {
        let node = self.create(element);
        self.append_child(parent, node);
        node
    }

    /// Create an element and insert it as the first child of `parent`
    pub fn prepend(&mut self, parent: NodeId, element: Element) -> NodeId {
        let node = self.create(element);
        self.prepend_child(parent, node);
        node
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.can_adopt(parent, child) {
            return;
        }
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        self.generation += 1;
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.can_adopt(parent, child) {
            return;
        }
        self.detach(child);
        self.nodes[parent.0].children.insert(0, child);
        self.nodes[child.0].parent = Some(parent);
        self.generation += 1;
    }

    /// Detach `node` (and its subtree) from the document.
    /// Removing the root or an already detached node does nothing.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root || self.parent(node).is_none() {
            return;
        }
        self.detach(node);
        self.generation += 1;
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.node_mut(node).and_then(|n| n.parent.take()) {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    /// A node cannot be moved under itself or one of its descendants
    fn can_adopt(&self, parent: NodeId, child: NodeId) -> bool {
        if child == self.root || !self.contains(parent) || !self.contains(child) {
            return false;
        }
        let mut cur = Some(parent);
        while let Some(n) = cur {
            if n == child {
                return false;
            }
            cur = self.parent(n);
        }
        true
    }

    // ── Node accessors ──
    //
    // A handle from another document is out of range here or names an
    // unrelated node. Out-of-range handles read as empty and writes to them
    // are dropped.

    /// Whether `node` is a handle into this document's arena
    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.0)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node.0)
    }

    pub fn tag(&self, node: NodeId) -> &str {
        self.node(node).map_or("", |n| n.tag.as_str())
    }

    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.attr(node, "id")
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        n.attrs.insert(name.to_string(), value.to_string());
        self.generation += 1;
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    pub fn classes(&self, node: NodeId) -> &[String] {
        self.node(node).map_or(&[], |n| n.classes.as_slice())
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        if let Some(n) = self.node_mut(node) {
            n.classes.push(class.to_string());
            self.generation += 1;
        }
    }

    /// Set one inline style property, replacing any previous value
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        match n.style.iter_mut().find(|(p, _)| p == property) {
            Some((_, v)) => *v = value.to_string(),
            None => n.style.push((property.to_string(), value.to_string())),
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.node(node)?
            .style
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Inline style serialized the way the `style` attribute reads
    pub fn style_text(&self, node: NodeId) -> String {
        let Some(n) = self.node(node) else {
            return String::new();
        };
        n.style
            .iter()
            .map(|(p, v)| format!("{p}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replace the element's own text (children are kept)
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            n.text = text.to_string();
        }
    }

    /// Own text followed by all descendant text, in document order
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(n) = self.node(node) else {
            return String::new();
        };
        let mut out = n.text.clone();
        for d in self.descendants(node) {
            out.push_str(&self.nodes[d.0].text);
        }
        out
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Whether the node is still attached under the root
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == self.root {
                return true;
            }
            cur = self.parent(n);
        }
        false
    }

    /// Absolute link target of an anchor, resolved against the page location
    /// like `HTMLAnchorElement.href`.
    pub fn href(&self, node: NodeId) -> Option<String> {
        let raw = self.attr(node, "href")?.trim();
        if raw.is_empty() {
            return None;
        }
        let resolved = match &self.location {
            Some(base) => base.join(raw).ok()?,
            None => Url::parse(raw).ok()?,
        };
        Some(resolved.to_string())
    }

    // ── Listeners ──

    pub fn add_listener(&mut self, node: NodeId, action: ClickAction) {
        if let Some(n) = self.node_mut(node) {
            n.listeners.push(action);
        }
    }

    pub fn listeners(&self, node: NodeId) -> &[ClickAction] {
        self.node(node).map_or(&[], |n| n.listeners.as_slice())
    }

    /// Actions fired by activating `node`: its own listeners, then each
    /// ancestor's, innermost first.
    pub fn bubble_path(&self, node: NodeId) -> Vec<ClickAction> {
        let mut actions = Vec::new();
        let mut cur = Some(node);
        while let Some(n) = cur {
            actions.extend(self.listeners(n).iter().cloned());
            cur = self.parent(n);
        }
        actions
    }

    // ── Queries ──

    /// All descendants of `scope` in document (pre-)order, excluding `scope`
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n.0].children.iter().rev());
        }
        out
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.element_id(*n) == Some(id))
    }

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// Descendants of `scope` matching `selector`, in document order
    pub fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| selector.matches(self, *n))
            .collect()
    }

    pub fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|n| selector.matches(self, *n))
    }
}
