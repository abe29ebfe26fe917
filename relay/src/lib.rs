//! Hookmail - webhook-to-email relay.
//!
//! Any HTTP request sent to `/<percent-encoded-mailbox>` is captured, rendered
//! as an HTML report and emailed to that mailbox. The caller gets a plain-text
//! acknowledgement whether or not the email goes out.
//!
//! ## Pipeline
//!
//! ```text
//! Request → address::resolve → capture::capture → render::render → Dispatcher::deliver
//! ```
//!
//! Requests share no state; each one runs the pipeline on its own task.

pub mod address;
pub mod capture;
pub mod config;
pub mod dispatch;
pub mod mail;
pub mod render;
pub mod web;

// Re-export commonly used types
pub use address::{resolve, ResolveError, ResolvedAddress};
pub use capture::{capture, IncomingRequest, ParameterSets};
pub use config::Config;
pub use dispatch::{DeliveryOutcome, Dispatcher};
pub use mail::{MailError, Mailer, OutboundMessage};
pub use render::{render, Report};
pub use web::{router, AppState};
