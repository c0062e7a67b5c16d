//! Per-tool routing of chat requests across AI model providers.
//!
//! A [`Catalog`](catalog::Catalog) declares the models, providers and tools. The
//! [`Settings`](settings::Settings) facade keeps provider credentials and the
//! model each tool is bound to in a [`KeyValueStore`](store::KeyValueStore). The
//! [`Dispatcher`](dispatch::Dispatcher) turns a model (or tool) and a list of
//! messages into one provider request and returns the generated text.

pub mod bindings;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod providers;
pub mod settings;
pub mod store;

pub use catalog::{Catalog, CatalogLoadError, CatalogSource};
pub use chat::{Message, Role};
pub use dispatch::{DispatchError, Dispatcher};
pub use providers::CallOptions;
pub use settings::Settings;
