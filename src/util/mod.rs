//! Utility helpers shared across the auth flow and UI modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Utility modules isolate browser concerns (storage, navigation, clocks,
//! task spawning) behind small seams so the auth logic stays testable off
//! the browser.

pub mod auth;
pub mod bus;
pub mod clock;
pub mod navigate;
pub mod redirect;
pub mod spawn;
pub mod storage;
