//! External services for Colloquy.
//!
//! `!api <service> <operation> k=v ...` messages are parsed by the
//! [`ServiceRouter`] and sent to the named [`ServiceClient`]. Built-in
//! clients: `dummy` (always, unless disabled) and `http` (when a base URL is
//! configured).
//!
//! [`ServiceClient`]: colloquy_core::ServiceClient

pub mod dummy;
pub mod http;
pub mod router;

pub use dummy::DummyClient;
pub use http::HttpClient;
pub use router::{ParsedCommand, ServiceRouter, USAGE, render};
