//! Wall-clock seconds since the Unix epoch.
//!
//! `SystemTime` is unavailable on `wasm32-unknown-unknown`, so browser builds
//! read `Date.now()` instead.

/// Current time in whole seconds since the Unix epoch.
#[must_use]
pub fn now_epoch_secs() -> i64 {
    #[cfg(feature = "csr")]
    {
        #[allow(clippy::cast_possible_truncation)]
        let secs = (js_sys::Date::now() / 1000.0) as i64;
        secs
    }
    #[cfg(not(feature = "csr"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
    }
}
