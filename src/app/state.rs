use anyhow::Result;
use std::cell::{Ref, RefCell};

use super::router::{classify_all, PageVariant};
use crate::config::{BoosterConfig, FetchFailurePolicy};
use crate::dom::{ClickAction, Document, NodeId, Selector};
use crate::gitlab::{self, DiffsMetadata, Discussion, Fetch, MergeRequestState};
use crate::stats::{DiffStat, ExclusionPolicy, ThreadStat};
use crate::ui::badge::{render_diff_stat, render_project_path, render_threads_badge, style_related_item};
use crate::ui::panel::{ElementInjector, PanelManager};
use crate::watch::ElementWatcher;

const MR_PANEL: &str = "MR Panel";
const ISSUE_PANEL: &str = "Issue Panel";

// ── Host page selector contract ──

const MERGE_REQUEST_ROW: &str = ".merge-request";
const MERGE_REQUEST_LINK: &str = ".merge-request-title-text a";
const MERGE_REQUEST_META: &str = ".issuable-meta ul, ul.controls";
const RELATED_MERGE_REQUESTS: &str = "#related-merge-requests";
/// Related merge requests, excluding related issues. Rendered asynchronously
/// after the issue itself.
const RELATED_MERGE_REQUEST_ITEMS: &str = ".issue-details.issuable-details.js-issue-details div.js-issue-widgets .related-items-list li:not(.js-related-issues-token-list-item)";
const RELATED_STATUS_ICON: &str = ".item-title svg";
const RELATED_LINK: &str = ".item-title a";
const RELATED_META: &str = ".item-meta .item-attributes-area";
const ISSUE_ROW: &str = "ul.issues-list > li";
const ISSUE_LINK: &str = "a";

struct PageSelectors {
    merge_request_row: Selector,
    merge_request_link: Selector,
    merge_request_meta: Selector,
    related_merge_requests: Selector,
    related_status_icon: Selector,
    related_link: Selector,
    related_meta: Selector,
    issue_link: Selector,
}

impl PageSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            merge_request_row: Selector::parse(MERGE_REQUEST_ROW)?,
            merge_request_link: Selector::parse(MERGE_REQUEST_LINK)?,
            merge_request_meta: Selector::parse(MERGE_REQUEST_META)?,
            related_merge_requests: Selector::parse(RELATED_MERGE_REQUESTS)?,
            related_status_icon: Selector::parse(RELATED_STATUS_ICON)?,
            related_link: Selector::parse(RELATED_LINK)?,
            related_meta: Selector::parse(RELATED_META)?,
            issue_link: Selector::parse(ISSUE_LINK)?,
        })
    }
}

/// What to run for an element the watcher found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    RelatedMergeRequest,
    IssueRow,
}

// ── Orchestrator ──

/// Enhances one browser tab. The host calls [`load`](Self::load) once,
/// [`url_changed`](Self::url_changed) on client-side navigation,
/// [`dom_changed`](Self::dom_changed) whenever the page mutates and
/// [`click`](Self::click) when the user activates an element.
///
/// Every signal takes `&self` and the page as a `RefCell`. The page is only
/// borrowed between fetches, so a click or another signal can run while an
/// enhancement pass is waiting on the network. A handler resumed after its
/// element was removed writes to the detached subtree.
pub struct Booster<F, I> {
    config: BoosterConfig,
    policy: ExclusionPolicy,
    selectors: PageSelectors,
    fetcher: F,
    injector: RefCell<I>,
    panel: RefCell<PanelManager>,
    watcher: RefCell<ElementWatcher<WatchTarget>>,
}

impl<F: Fetch, I: ElementInjector> Booster<F, I> {
    pub fn new(config: BoosterConfig, fetcher: F, injector: I) -> Result<Self> {
        Ok(Self {
            policy: ExclusionPolicy::from_config(&config.diff)?,
            selectors: PageSelectors::new()?,
            panel: RefCell::new(PanelManager::new(&config.panel)?),
            watcher: RefCell::new(ElementWatcher::new()),
            injector: RefCell::new(injector),
            config,
            fetcher,
        })
    }

    pub fn panel(&self) -> Ref<'_, PanelManager> {
        self.panel.borrow()
    }

    pub fn watcher(&self) -> Ref<'_, ElementWatcher<WatchTarget>> {
        self.watcher.borrow()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn load(&self, doc: &RefCell<Document>, href: &str) {
        self.enhance(doc, href).await;
    }

    pub async fn url_changed(&self, doc: &RefCell<Document>, href: &str) {
        self.enhance(doc, href).await;
    }

    /// Classify the page and run every matching routine
    async fn enhance(&self, doc: &RefCell<Document>, href: &str) {
        doc.borrow_mut().set_location(href);
        for variant in classify_all(href) {
            tracing::debug!(?variant, href, "Enhancing page");
            match variant {
                PageVariant::MergeRequestList if self.config.features.merge_request_list => {
                    self.enhance_merge_request_list(doc).await;
                }
                PageVariant::IssueDetail if self.config.features.issue_detail => {
                    self.enhance_issue_detail(doc).await;
                }
                PageVariant::IssueList if self.config.features.issue_list => {
                    self.enhance_issue_list(doc).await;
                }
                _ => {}
            }
        }
    }

    /// Deliver watcher matches until the page settles. Each match is fully
    /// handled before the next one starts.
    pub async fn dom_changed(&self, doc: &RefCell<Document>) {
        loop {
            let deliveries = self.watcher.borrow_mut().poll(&doc.borrow());
            if deliveries.is_empty() {
                break;
            }
            for (target, node) in deliveries {
                match target {
                    WatchTarget::RelatedMergeRequest => {
                        self.enhance_related_merge_request(doc, node).await;
                    }
                    WatchTarget::IssueRow => self.enhance_issue_row(&mut doc.borrow_mut(), node),
                }
            }
        }
    }

    /// Run the click listeners of `node` and its ancestors
    pub fn click(&self, doc: &RefCell<Document>, node: NodeId) {
        let actions = doc.borrow().bubble_path(node);
        let mut doc = doc.borrow_mut();
        let mut panel = self.panel.borrow_mut();
        for action in actions {
            match action {
                ClickAction::OpenPanel { name, url } => {
                    panel.open(&mut doc, &mut *self.injector.borrow_mut(), &name, &url);
                }
                ClickAction::ClosePanel => panel.close(&mut doc),
            }
        }
    }

    // ── Page routines ──

    async fn enhance_merge_request_list(&self, doc: &RefCell<Document>) {
        let rows = {
            let mut d = doc.borrow_mut();
            let rows = d.query_selector_all(d.root(), &self.selectors.merge_request_row);
            self.panel.borrow().ensure_layout(&mut d);
            rows
        };

        for row in rows {
            let (url, meta) = {
                let d = doc.borrow();
                let Some(url) = d
                    .query_selector(row, &self.selectors.merge_request_link)
                    .and_then(|a| d.href(a))
                else {
                    continue;
                };
                (url, d.query_selector(row, &self.selectors.merge_request_meta))
            };

            match meta {
                Some(meta) => {
                    let discussions = gitlab::fetch_discussions(&self.fetcher, &url).await;
                    self.add_thread_meta(&mut doc.borrow_mut(), meta, discussions);
                    let diffs = gitlab::fetch_diffs_metadata(&self.fetcher, &url).await;
                    self.add_diff_meta(&mut doc.borrow_mut(), meta, diffs);
                }
                None => tracing::debug!(url = %url, "Merge request row has no meta list"),
            }

            doc.borrow_mut().add_listener(
                row,
                ClickAction::OpenPanel { name: MR_PANEL.into(), url },
            );
        }
    }

    async fn enhance_issue_detail(&self, doc: &RefCell<Document>) {
        let has_related = {
            let d = doc.borrow();
            d.query_selector(d.root(), &self.selectors.related_merge_requests).is_some()
        };
        if !has_related {
            tracing::debug!("No related merge requests");
            return;
        }

        self.panel.borrow().ensure_layout(&mut doc.borrow_mut());

        let watched = self.watcher.borrow_mut().watch(
            RELATED_MERGE_REQUEST_ITEMS,
            WatchTarget::RelatedMergeRequest,
            true,
        );
        if let Err(e) = watched {
            tracing::warn!(error = %e, "Cannot watch related merge requests");
            return;
        }
        self.dom_changed(doc).await;
    }

    async fn enhance_issue_list(&self, doc: &RefCell<Document>) {
        self.panel.borrow().ensure_layout(&mut doc.borrow_mut());

        let watched = self.watcher.borrow_mut().watch(ISSUE_ROW, WatchTarget::IssueRow, false);
        if let Err(e) = watched {
            tracing::warn!(error = %e, "Cannot watch issue rows");
            return;
        }
        self.dom_changed(doc).await;
    }

    // ── Element handlers ──

    async fn enhance_related_merge_request(&self, doc: &RefCell<Document>, item: NodeId) {
        tracing::debug!(?item, "Inserting merge request meta to related merge request");

        let (state, url) = {
            let mut d = doc.borrow_mut();
            let Some(icon) = d.query_selector(item, &self.selectors.related_status_icon) else {
                return;
            };
            let state = MergeRequestState::from_label(d.attr(icon, "aria-label").unwrap_or_default());

            let Some(url) = d
                .query_selector(item, &self.selectors.related_link)
                .and_then(|a| d.href(a))
            else {
                return;
            };

            d.add_listener(
                item,
                ClickAction::OpenPanel { name: MR_PANEL.into(), url: url.clone() },
            );
            style_related_item(&mut d, item, &state);
            (state, url)
        };

        if state == MergeRequestState::Closed {
            return;
        }

        let diffs = gitlab::fetch_diffs_metadata(&self.fetcher, &url).await;

        let meta = doc.borrow().query_selector(item, &self.selectors.related_meta);
        let Some(meta) = meta else {
            return;
        };

        let project_path = diffs.as_ref().and_then(|d| d.project_path.clone());
        if state == MergeRequestState::Opened {
            let discussions = gitlab::fetch_discussions(&self.fetcher, &url).await;
            let mut d = doc.borrow_mut();
            self.add_thread_meta(&mut d, meta, discussions);
            self.add_diff_meta(&mut d, meta, diffs);
        }

        if let Some(path) = project_path {
            render_project_path(&mut doc.borrow_mut(), meta, &path);
        }
    }

    fn enhance_issue_row(&self, doc: &mut Document, row: NodeId) {
        let Some(url) = doc
            .query_selector(row, &self.selectors.issue_link)
            .and_then(|a| doc.href(a))
        else {
            return;
        };
        doc.add_listener(
            row,
            ClickAction::OpenPanel { name: ISSUE_PANEL.into(), url },
        );
    }

    // ── Metadata ──

    /// Apply the configured failure policy to a fetched document
    fn or_policy_default<T: Default>(&self, document: Option<T>) -> Option<T> {
        match (document, self.config.fetch.on_failure) {
            (Some(doc), _) => Some(doc),
            (None, FetchFailurePolicy::Empty) => Some(T::default()),
            (None, FetchFailurePolicy::Skip) => None,
        }
    }

    fn add_thread_meta(&self, doc: &mut Document, container: NodeId, discussions: Option<Vec<Discussion>>) {
        let Some(discussions) = self.or_policy_default(discussions) else {
            return;
        };
        let stat = ThreadStat::from_discussions(&discussions);
        render_threads_badge(doc, container, &stat);
    }

    fn add_diff_meta(&self, doc: &mut Document, container: NodeId, diffs: Option<DiffsMetadata>) {
        let Some(diffs) = self.or_policy_default(diffs) else {
            return;
        };
        let stat = DiffStat::aggregate(&diffs.diff_files, &self.policy);
        render_diff_stat(doc, container, &stat);
    }
}
