//! Notification delivery for grid alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - Webhook and log notifier implementations
//! - Subject/body formatting for anomaly, maintenance and manual alerts
//! - Dispatcher that fans a notification out to every configured channel

pub mod dispatcher;
pub mod log;
pub mod message;
pub mod traits;
pub mod webhook;

pub use dispatcher::Dispatcher;
pub use traits::{DispatchResult, Notification, Notifier, NotifyError};
