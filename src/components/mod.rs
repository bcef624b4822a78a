//! Reusable UI component modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! Components read the shared [`crate::app::AuthContext`] from Leptos
//! context; `protected_route` applies the route guard and `header` shows the
//! signed-in user with a sign-out action.

pub mod header;
pub mod protected_route;
