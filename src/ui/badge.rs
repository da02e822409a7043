use crate::dom::{Document, Element, NodeId};
use crate::gitlab::MergeRequestState;
use crate::stats::{DiffStat, ThreadStat};

use super::styles;

/// Prepend a "resolved/resolvable threads resolved" badge to `container`.
/// Nothing is rendered when the stat has no tone.
pub fn render_threads_badge(doc: &mut Document, container: NodeId, stat: &ThreadStat) -> Option<NodeId> {
    let tone = stat.tone()?;
    let item = doc.prepend(container, Element::new("li").class(styles::THREADS_ITEM));
    doc.prepend(
        item,
        Element::new("span")
            .class(styles::BADGE)
            .class(styles::badge_variant(tone))
            .text(&stat.label()),
    );
    Some(item)
}

/// Prepend the files / +added / -removed row to `container`, zeros included
pub fn render_diff_stat(doc: &mut Document, container: NodeId, stat: &DiffStat) -> NodeId {
    let row = doc.create(
        Element::new("div")
            .style("display", "flex")
            .style("flex-direction", "row")
            .style("gap", "3px"),
    );

    let files = doc.append(row, Element::new("div").class(styles::DIFF_GROUP));
    doc.append(
        files,
        Element::new("span")
            .class(styles::FILE_COUNT)
            .text(&format!("{} files", stat.file_count)),
    );

    let added = doc.append(row, Element::new("div").class(styles::ADDED_GROUP));
    doc.append(added, Element::new("span").text("+"));
    doc.append(added, Element::new("span").text(&stat.added_lines.to_string()));

    let removed = doc.append(row, Element::new("div").class(styles::REMOVED_GROUP));
    doc.append(removed, Element::new("span").text("-"));
    doc.append(removed, Element::new("span").text(&stat.removed_lines.to_string()));

    doc.prepend_child(container, row);
    row
}

pub fn render_project_path(doc: &mut Document, container: NodeId, project_path: &str) -> NodeId {
    doc.prepend(container, Element::new("span").text(project_path))
}

/// Tint a related merge request row by its state
pub fn style_related_item(doc: &mut Document, item: NodeId, state: &MergeRequestState) {
    match state {
        MergeRequestState::Opened => {
            doc.set_style(item, "background-color", styles::OPENED_BG);
        }
        MergeRequestState::Closed => {
            doc.set_style(item, "background-color", styles::CLOSED_BG);
            doc.set_style(item, "filter", "grayscale(1)");
            doc.set_style(item, "text-decoration", "line-through");
        }
        MergeRequestState::Merged | MergeRequestState::Other(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Selector;

    fn container() -> (Document, NodeId) {
        let mut doc = Document::new();
        let ul = doc.append(doc.root(), Element::new("ul").class("controls"));
        doc.append(ul, Element::new("li").text("existing"));
        (doc, ul)
    }

    #[test]
    fn threads_badge_omitted_when_nothing_to_resolve() {
        let (mut doc, ul) = container();
        let before = doc.children(ul).len();
        assert!(render_threads_badge(&mut doc, ul, &ThreadStat { resolved: 0, resolvable: 0 }).is_none());
        assert_eq!(doc.children(ul).len(), before);
    }

    #[test]
    fn threads_badge_attention_is_prepended() {
        let (mut doc, ul) = container();
        let item = render_threads_badge(&mut doc, ul, &ThreadStat { resolved: 1, resolvable: 2 }).unwrap();
        assert_eq!(doc.children(ul)[0], item);
        let badge = doc.children(item)[0];
        assert!(doc.has_class(badge, "badge-danger"));
        assert!(doc.has_class(badge, "gl-badge"));
        assert_eq!(doc.text_content(item), "1/2 threads resolved");
    }

    #[test]
    fn threads_badge_complete_uses_success_variant() {
        let (mut doc, ul) = container();
        let item = render_threads_badge(&mut doc, ul, &ThreadStat { resolved: 3, resolvable: 3 }).unwrap();
        let badge = doc.children(item)[0];
        assert!(doc.has_class(badge, "badge-success"));
        assert!(!doc.has_class(badge, "badge-danger"));
    }

    #[test]
    fn diff_stat_renders_three_groups_even_when_zero() {
        let (mut doc, ul) = container();
        let row = render_diff_stat(&mut doc, ul, &DiffStat::default());
        assert_eq!(doc.children(ul)[0], row);
        assert_eq!(doc.children(row).len(), 3);
        assert_eq!(doc.text_content(row), "0 files+0-0");
        assert_eq!(doc.style(row, "display"), Some("flex"));
    }

    #[test]
    fn diff_stat_groups_carry_delta_styling() {
        let (mut doc, ul) = container();
        let stat = DiffStat { file_count: 2, added_lines: 10, removed_lines: 4 };
        let row = render_diff_stat(&mut doc, ul, &stat);
        let groups = doc.children(row).to_vec();
        assert!(doc.has_class(groups[1], "gl-text-green-600"));
        assert!(doc.has_class(groups[2], "gl-text-red-500"));
        assert_eq!(doc.text_content(groups[0]), "2 files");
        assert_eq!(doc.text_content(groups[1]), "+10");
        assert_eq!(doc.text_content(groups[2]), "-4");
    }

    #[test]
    fn repeated_rendering_duplicates_fragments() {
        let (mut doc, ul) = container();
        let stat = DiffStat { file_count: 1, added_lines: 1, removed_lines: 1 };
        render_diff_stat(&mut doc, ul, &stat);
        render_diff_stat(&mut doc, ul, &stat);
        let groups = Selector::parse(".diff-stats-group").unwrap();
        assert_eq!(doc.query_selector_all(ul, &groups).len(), 6);
    }

    #[test]
    fn closed_items_are_greyed_and_struck() {
        let (mut doc, ul) = container();
        let li = doc.children(ul)[0];
        style_related_item(&mut doc, li, &MergeRequestState::Closed);
        assert_eq!(doc.style(li, "filter"), Some("grayscale(1)"));
        assert_eq!(doc.style(li, "text-decoration"), Some("line-through"));
    }

    #[test]
    fn merged_items_are_untouched() {
        let (mut doc, ul) = container();
        let li = doc.children(ul)[0];
        style_related_item(&mut doc, li, &MergeRequestState::Merged);
        assert_eq!(doc.style_text(li), "");
        style_related_item(&mut doc, li, &MergeRequestState::Opened);
        assert_eq!(doc.style(li, "background-color"), Some("#f9eeda"));
    }

    #[test]
    fn project_path_is_prepended() {
        let (mut doc, ul) = container();
        let span = render_project_path(&mut doc, ul, "group/project");
        assert_eq!(doc.children(ul)[0], span);
        assert_eq!(doc.text_content(span), "group/project");
    }
}
