//! Networking modules for the identity provider and the vault API.
//!
//! SYSTEM CONTEXT
//! ==============
//! `gateway` defines the identity-provider seam, `hosted_ui` implements it
//! over the hosted OAuth endpoints, `claims` decodes identity tokens,
//! `cross_tab` relays other tabs' session changes, and `api` makes
//! bearer-authorized REST calls.

pub mod api;
pub mod claims;
pub mod cross_tab;
pub mod gateway;
pub mod hosted_ui;
