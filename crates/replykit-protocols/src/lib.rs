//! Core protocol layer for ReplyKit.
//!
//! This crate defines the contracts the rest of the workspace is built
//! against:
//!
//! - [`Platform`] - the closed set of supported chat platforms
//! - [`ChatContext`] / [`Suggestion`] - what gets extracted from a page and
//!   what comes back from the generation service
//! - [`PlatformAdapter`] - the scraping/insertion capability set, one
//!   implementation per platform
//! - [`PageDriver`] - the seam between adapters and a live browser page
//! - [`KeyValueStore`] - local persistence for settings, selector overrides
//!   and caches
//!
//! Everything here is deliberately free of DOM or HTTP machinery so that
//! adapters and services can be exercised against in-memory fakes.

pub mod adapter;
pub mod context;
pub mod error;
pub mod page;
pub mod platform;
pub mod store;

pub use adapter::{AdapterEvent, CalibrationHandler, PlatformAdapter};
pub use context::{
    clamp_context_window, ChatContext, ExtractOptions, Suggestion, Usage,
    DEFAULT_CONTEXT_WINDOW, MAX_CONTEXT_WINDOW, MIN_CONTEXT_WINDOW, MIN_MESSAGE_LEN,
};
pub use page::{DomChange, ElementInfo, NodeRef, PageDriver, PickedElement};
pub use platform::Platform;
pub use store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
