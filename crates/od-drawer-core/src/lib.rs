//! Verification and payment drawer: phone OTP, then a UPI QR for the cart.
//!
//! `machine` holds the synchronous state machine, `session` drives it
//! against the backend and the host timers. Everything the browser supplies
//! (transport, scheduler, clock, view) comes in through traits, so the
//! whole flow runs under `cargo test`.

pub mod cart;
pub mod client;
pub mod config;
pub mod country;
pub mod error;
pub mod machine;
pub mod otp;
pub mod session;
pub mod timer;

#[cfg(test)]
mod testing;

pub use cart::{Amount, Cart, CartSnapshot};
pub use client::{ApiClient, HttpReply, Sleeper, Transport, TransportError};
pub use config::{CatalogSource, DrawerConfig, RetryPolicy};
pub use error::{ApiError, FlowError};
pub use machine::{Completion, DrawerController, DrawerStep, Notice, NoticeKind, PaymentQr, QrImage};
pub use otp::{FocusTarget, OTP_LENGTH};
pub use session::{DrawerSession, DrawerView, Host};
pub use timer::{LocalTask, Scheduler};
