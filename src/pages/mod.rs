//! Page modules for route-level screens.
//!
//! ARCHITECTURE
//! ============
//! Each page owns route-scoped orchestration and delegates auth decisions to
//! `state` and `util`.

pub mod access_denied;
pub mod callback;
pub mod home;
