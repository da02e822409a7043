mod router;
mod state;

pub use router::{classify, classify_all, PageVariant};
pub use state::{Booster, WatchTarget};
