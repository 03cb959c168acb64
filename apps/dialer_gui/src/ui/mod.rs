//! UI layer for the dialer window: phone form, call status strip and status modal.

pub mod app;

pub use app::DialerApp;
