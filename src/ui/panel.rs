use anyhow::Result;

use crate::config::PanelConfig;
use crate::dom::{ClickAction, Document, Element, NodeId, Selector};
use super::styles;

/// Fixed id of the side panel frame
pub const PANEL_ID: &str = "issue-booster";
/// Fixed id of the single close control
pub const CLOSE_CONTROL_ID: &str = "close-issue-booster";

const LAYOUT_SELECTOR: &str = "div.layout-page";
const CONTENT_SELECTOR: &str = "div.content-wrapper";
const TOP_BAR_SELECTOR: &str = ".top-bar-container";

// ── Injection ──

/// Inserts elements the page's content policy would otherwise block
/// (a cross-origin frame). Supplied by the hosting environment.
pub trait ElementInjector {
    /// Append `element` under `parent`; `None` if the host refused
    fn inject(&mut self, doc: &mut Document, parent: NodeId, element: Element) -> Option<NodeId>;
}

/// Injector for environments without a content policy: a plain append
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectInjector;

impl ElementInjector for DirectInjector {
    fn inject(&mut self, doc: &mut Document, parent: NodeId, element: Element) -> Option<NodeId> {
        Some(doc.append(parent, element))
    }
}

// ── State ──

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PanelState {
    #[default]
    Closed,
    Open {
        name: String,
        source_url: String,
        control_id: String,
    },
}

impl PanelState {
    pub fn is_open(&self) -> bool {
        matches!(self, PanelState::Open { .. })
    }
}

/// Owns the single side panel. All transitions go through [`open`](Self::open)
/// and [`close`](Self::close).
#[derive(Debug)]
pub struct PanelManager {
    state: PanelState,
    width_percent: u8,
    layout: Selector,
    content: Selector,
    top_bar: Selector,
}

impl PanelManager {
    pub fn new(config: &PanelConfig) -> Result<Self> {
        Ok(Self {
            state: PanelState::Closed,
            width_percent: config.width_percent,
            layout: Selector::parse(LAYOUT_SELECTOR)?,
            content: Selector::parse(CONTENT_SELECTOR)?,
            top_bar: Selector::parse(TOP_BAR_SELECTOR)?,
        })
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    /// Turn the page into a two-column scroll layout so the panel can sit
    /// next to the content. No-op on pages without the layout anchors.
    pub fn ensure_layout(&self, doc: &mut Document) {
        let Some(layout) = doc.query_selector(doc.root(), &self.layout) else {
            return;
        };
        doc.set_style(layout, "display", "flex");
        doc.set_style(layout, "height", "100vh");
        doc.set_style(layout, "overflow", "hidden");

        let Some(content) = doc.query_selector(doc.root(), &self.content) else {
            return;
        };
        doc.set_style(content, "overflow-y", "scroll");
    }

    /// Show `url` in the panel, replacing any panel already open.
    /// Returns false (and changes nothing visible) when the page has no top bar
    /// or layout to attach to.
    pub fn open<I: ElementInjector>(
        &mut self,
        doc: &mut Document,
        injector: &mut I,
        name: &str,
        url: &str,
    ) -> bool {
        if !self.ensure_close_control(doc, name) {
            return false;
        }

        let Some(layout) = doc.query_selector(doc.root(), &self.layout) else {
            return false;
        };

        self.remove_panel(doc);
        self.state = PanelState::Closed;

        let frame = Element::new("iframe")
            .id(PANEL_ID)
            .attr("src", url)
            .style("width", "100%")
            .style("height", "100vh")
            .style("position", "sticky")
            .style("align-self", "flex-start")
            .style("top", "0")
            .style("flex", &format!("0 0 {}%", self.width_percent));

        if injector.inject(doc, layout, frame).is_none() {
            tracing::warn!(url, "Host refused to inject the side panel");
            return false;
        }

        tracing::debug!(name, url, "Opened side panel");
        self.state = PanelState::Open {
            name: name.to_string(),
            source_url: url.to_string(),
            control_id: CLOSE_CONTROL_ID.to_string(),
        };
        true
    }

    /// Remove the panel and its close control
    pub fn close(&mut self, doc: &mut Document) {
        self.remove_panel(doc);
        if let Some(control) = doc.get_element_by_id(CLOSE_CONTROL_ID) {
            doc.remove(control);
        }
        self.state = PanelState::Closed;
    }

    /// One control for every panel name: created once, relabelled on reuse
    fn ensure_close_control(&self, doc: &mut Document, name: &str) -> bool {
        let label = format!("Close {name}");

        if let Some(control) = doc.get_element_by_id(CLOSE_CONTROL_ID) {
            if let Some(&span) = doc.children(control).first() {
                doc.set_text(span, &label);
            }
            return true;
        }

        let Some(top_bar) = doc.query_selector(doc.root(), &self.top_bar) else {
            return false;
        };
        let button = doc.append(
            top_bar,
            Element::new("button")
                .id(CLOSE_CONTROL_ID)
                .class(styles::CLOSE_BUTTON),
        );
        doc.append(button, Element::new("span").text(&label));
        doc.add_listener(button, ClickAction::ClosePanel);
        true
    }

    fn remove_panel(&self, doc: &mut Document) {
        while let Some(panel) = doc.get_element_by_id(PANEL_ID) {
            doc.remove(panel);
        }
    }
}
