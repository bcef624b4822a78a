//! Client-side auth state modules.
//!
//! DESIGN
//! ======
//! `events` is the lifecycle vocabulary, `auth` the session state machine
//! that reacts to it, and `callback` the one-shot flow that completes a
//! hosted sign-in and hands control back to the machine.

pub mod auth;
pub mod callback;
pub mod events;
