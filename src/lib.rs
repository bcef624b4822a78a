//! # vault-web
//!
//! Leptos + WASM front-end for the password vault. Access is gated behind
//! hosted OAuth sign-in and a required group; signed-in members call the
//! vault API with bearer tokens.
//!
//! This crate contains the auth session state machine and its event bus,
//! the hosted-UI identity gateway, the route guard and sign-in callback
//! flow, and the thin page and component layer on top of them.

pub mod app;
pub mod components;
pub mod config;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

#[cfg(test)]
mod testing;

/// Browser entry point: install logging and mount [`app::App`].
#[cfg(feature = "csr")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    leptos::mount::mount_to_body(app::App);
}
