//! User commands
//!
//! Entry points the view layer invokes. Each command validates its input and
//! delegates to a service; results land in `AppState`'s view channels.

pub mod insights;
pub mod market;
pub mod selection;
pub mod session;
pub mod watchlist;

pub use market::{normalize_symbol, search, SearchResult};
pub use selection::{select, Panel, Selection};
pub use watchlist::WatchlistChange;
