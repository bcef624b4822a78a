//! Navigation seam between auth logic and the browser/router.

use leptos_router::NavigateOptions;

/// Where auth flows send the user.
pub trait Navigator {
    /// Client-side route change within the app (replaces history entry).
    fn navigate(&self, path: &str);
    /// Full-page navigation, typically to an identity-provider URL.
    fn redirect(&self, url: &str);
}

/// Navigator using `window.location` for both kinds of navigation.
///
/// Used where no router is in scope (the auth module itself).
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, path: &str) {
        self.redirect(path);
    }

    fn redirect(&self, url: &str) {
        #[cfg(feature = "csr")]
        {
            if let Some(window) = web_sys::window() {
                if window.location().set_href(url).is_err() {
                    log::error!("failed to navigate to {url}");
                }
            }
        }
        #[cfg(not(feature = "csr"))]
        {
            log::debug!("navigation to {url} skipped outside the browser");
        }
    }
}

/// Navigator backed by a `leptos_router` navigate function for in-app routes.
#[derive(Clone)]
pub struct RouterNavigator<F> {
    navigate: F,
}

impl<F> RouterNavigator<F>
where
    F: Fn(&str, NavigateOptions),
{
    pub fn new(navigate: F) -> Self {
        Self { navigate }
    }
}

impl<F> Navigator for RouterNavigator<F>
where
    F: Fn(&str, NavigateOptions),
{
    fn navigate(&self, path: &str) {
        (self.navigate)(path, NavigateOptions { replace: true, ..NavigateOptions::default() });
    }

    fn redirect(&self, url: &str) {
        BrowserNavigator.redirect(url);
    }
}
