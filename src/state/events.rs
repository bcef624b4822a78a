//! Auth lifecycle events carried on the process-wide auth bus.
//!
//! Fire-and-forget, delivered in publish order, never persisted.

use crate::util::bus::EventBus;

/// Named lifecycle event with an optional reason payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefresh,
    TokenRefreshFailure(String),
    SignInFailure(String),
}

impl AuthEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn => "signed-in",
            Self::SignedOut => "signed-out",
            Self::TokenRefresh => "token-refresh",
            Self::TokenRefreshFailure(_) => "token-refresh-failure",
            Self::SignInFailure(_) => "sign-in-failure",
        }
    }

    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::TokenRefreshFailure(reason) | Self::SignInFailure(reason) => Some(reason),
            Self::SignedIn | Self::SignedOut | Self::TokenRefresh => None,
        }
    }
}

/// The auth module's event channel.
pub type AuthBus = EventBus<AuthEvent>;
