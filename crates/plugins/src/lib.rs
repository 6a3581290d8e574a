//! Plugin chain for Colloquy.
//!
//! Plugins see every message before intent resolution and may answer it
//! outright. They come from a compile-time [`PluginCatalog`]; the
//! `plugins.registry` list in the configuration picks which ones run and in
//! what order.

pub mod catalog;
pub mod dispatcher;
pub mod echo;

pub use catalog::{PluginCatalog, PluginFactory};
pub use dispatcher::PluginDispatcher;
pub use echo::EchoPlugin;
