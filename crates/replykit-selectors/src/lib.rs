//! Selector registry and calibration for ReplyKit.
//!
//! Host pages change their markup without notice, so every selector the
//! adapters use is resolved through a three-layer registry: compiled-in
//! defaults, a remotely refreshed layer, and user overrides produced by the
//! interactive calibration flow. Lookups are total - an unknown key yields
//! an empty string and the caller falls back to its own literals.

pub mod calibration;
pub mod defaults;
pub mod derive;
pub mod registry;
pub mod remote;

pub use calibration::{CalibrationFlow, CalibrationState};
pub use defaults::keys;
pub use derive::derive_selector;
pub use registry::{SelectorConfig, SelectorRegistry};
pub use remote::{RemoteSelectorSource, SelectorRow};
