use regex::Regex;
use std::sync::LazyLock;

/// Page variants we enhance, derived from the URL alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageVariant {
    MergeRequestList,
    IssueDetail,
    IssueList,
    None,
}

// A collection segment optionally followed by a numeric id. The collection
// page is any occurrence *without* the id.
static MERGE_REQUESTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/merge_requests(/\d)?").expect("valid regex"));
static ISSUES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/issues(/\d)?").expect("valid regex"));

/// True if some `/<segment>` occurrence is not followed by `/<digit>`
fn has_collection(re: &Regex, href: &str) -> bool {
    re.captures_iter(href).any(|c| c.get(1).is_none())
}

/// True if some `/<segment>` occurrence is followed by `/<digit>`
fn has_item(re: &Regex, href: &str) -> bool {
    re.captures_iter(href).any(|c| c.get(1).is_some())
}

/// Every variant whose pattern matches, in dispatch order.
/// Patterns are tested independently.
pub fn classify_all(href: &str) -> Vec<PageVariant> {
    let mut variants = Vec::new();
    if has_collection(&MERGE_REQUESTS, href) {
        variants.push(PageVariant::MergeRequestList);
    }
    if has_item(&ISSUES, href) {
        variants.push(PageVariant::IssueDetail);
    }
    if has_collection(&ISSUES, href) {
        variants.push(PageVariant::IssueList);
    }
    variants
}

/// First matching variant, or `PageVariant::None`
pub fn classify(href: &str) -> PageVariant {
    classify_all(href)
        .into_iter()
        .next()
        .unwrap_or(PageVariant::None)
}
