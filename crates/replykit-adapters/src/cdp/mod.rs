//! Chrome DevTools Protocol transport.
//!
//! ReplyKit never launches a browser; it attaches to one the user already
//! runs with `--remote-debugging-port`. The client speaks the browser-level
//! WebSocket, hands out one [`PageSession`] per attached tab, and the
//! [`driver`](crate::driver) builds the `PageDriver` seam on top.

mod client;
mod protocol;
mod session;

pub use client::CdpClient;
pub use protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
pub use session::PageSession;
