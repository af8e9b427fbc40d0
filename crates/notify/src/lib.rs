//! Birthday notification delivery.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - Log, Pushover, and Slack notifier implementations
//! - Minijinja template rendering for notification bodies
//! - `NotifierRegistry` mapping configured `type` strings to notifiers
//! - Bounded, fire-and-forget `Dispatcher`

pub mod dispatcher;
pub mod log;
pub mod pushover;
pub mod registry;
pub mod settings;
pub mod slack;
pub mod templating;
pub mod traits;

pub use dispatcher::{Delivery, Dispatcher};
pub use registry::{ConfiguredNotifier, NotifierRegistry};
pub use templating::{TemplateRenderer, DEFAULT_TEMPLATE};
pub use traits::{DispatchResult, Notifier, NotifyError};
