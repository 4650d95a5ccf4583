//! Platform adapters for ReplyKit.
//!
//! One adapter exists per attached page. All four platforms share the same
//! machinery - debounced observation, duplicate suppression, retrying
//! container lookup, ordered row classification, fallback text extraction -
//! and differ only in their [`rules`]: the selector chains and direction
//! markers that encode each platform's DOM.
//!
//! The `cdp` module carries the DevTools transport and [`driver`] puts the
//! [`PageDriver`](replykit_protocols::PageDriver) seam on top of it;
//! everything above the seam is DOM-agnostic and tested against an
//! in-memory page.

pub mod adapter;
pub mod cdp;
pub mod classify;
pub mod driver;
pub mod extract;
pub mod factory;
pub mod observer;
pub mod rules;
pub mod text;

#[cfg(test)]
pub(crate) mod testpage;

pub use adapter::ChatAdapter;
pub use driver::CdpPageDriver;
pub use factory::AdapterFactory;
pub use observer::ObserverConfig;
