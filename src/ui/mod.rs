pub mod badge;
pub mod panel;
mod styles;

pub use panel::{DirectInjector, ElementInjector, PanelManager, PanelState};
