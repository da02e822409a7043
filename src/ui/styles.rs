use crate::stats::BadgeTone;

// ── Thread badge ──
pub const THREADS_ITEM: &str = "issuable-comments d-none d-sm-flex";
pub const BADGE: &str = "gl-badge badge badge-pill sm has-tooltip";

// ── Diff stat ──
pub const DIFF_GROUP: &str = "diff-stats-group";
pub const FILE_COUNT: &str = "gl-text-gray-500 bold";
pub const ADDED_GROUP: &str =
    "diff-stats-group gl-text-green-600 gl-display-flex gl-align-items-center bold";
pub const REMOVED_GROUP: &str =
    "diff-stats-group gl-text-red-500 gl-display-flex gl-align-items-center bold";

// ── Related merge requests ──
pub const OPENED_BG: &str = "#f9eeda";
pub const CLOSED_BG: &str = "#c1c1c14d";

// ── Side panel ──
pub const CLOSE_BUTTON: &str =
    "btn btn-default btn-md gl-button btn-close js-note-target-close btn-comment btn-comment-and-close";

pub fn badge_variant(tone: BadgeTone) -> &'static str {
    match tone {
        BadgeTone::Attention => "badge-danger",
        BadgeTone::Complete => "badge-success",
    }
}
