//! Market and account state built from WebSocket feeds.
//!
//! [`FeedState`] registers listeners on a [`hlx_ws::ConnectionManager`] and
//! keeps the latest mids, a bounded trade tape and top of book per coin, and
//! the watched account's margin summary.

pub mod error;
pub mod state;

pub use error::{FeedError, FeedResult};
pub use state::{
    AccountSnapshot, Attachment, BookLevel, BookTop, FeedState, Mid, TapeTrade,
    DEFAULT_TAPE_LEN,
};
