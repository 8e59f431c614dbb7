//! Outbound notifications for the SIREN dispatch server.
//!
//! A dispatch alert goes to the assigned hospital the moment an ambulance is
//! reserved. Delivery is best-effort: the dispatch itself never rolls back
//! on a failed send, the caller only learns about it through a flag.

pub mod email;
pub mod error;
pub mod types;

pub use email::{AlertNotifier, NoopNotifier, SmtpConfig, SmtpNotifier};
pub use error::NotificationError;
pub use types::DispatchAlert;
