//! Enhances GitLab merge request and issue pages: review-progress badges,
//! filtered diff statistics and a side panel previewing linked items.
//!
//! The host mirrors the page into a [`dom::Document`], then drives a
//! [`Booster`] with page loads, URL changes, DOM mutations and clicks.

pub mod app;
pub mod config;
pub mod dom;
pub mod gitlab;
pub mod logging;
pub mod stats;
pub mod ui;
pub mod watch;

pub use app::{Booster, PageVariant};
pub use config::{load_config, BoosterConfig};
pub use gitlab::{Fetch, HttpFetcher};
