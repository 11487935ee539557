//! Minimal Chrome DevTools Protocol driver.
//!
//! Just enough CDP to script an HTML-only login flow: launch a headless
//! Chrome, attach to its default page target over WebSocket, navigate,
//! evaluate JavaScript, answer JavaScript dialogs, and read the cookie
//! jar. Higher-level booking logic lives in `courtsnipe-core`.

pub mod browser;
pub mod connection;
pub mod error;
pub mod launcher;
pub mod page;
pub mod transport;

pub use browser::Browser;
pub use connection::{CdpConnection, CdpEvent};
pub use error::{CdpError, Result};
pub use page::{Cookie, Page};
