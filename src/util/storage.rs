//! Key/value browser storage behind a small trait.
//!
//! SYSTEM CONTEXT
//! ==============
//! The pending-redirect path and the PKCE flow state live in
//! `sessionStorage`; the token set lives in `localStorage` so other tabs see
//! it. Non-browser builds and tests use [`MemoryStore`].
//!
//! TRADE-OFFS
//! ==========
//! Browser storage writes are best-effort: quota or privacy-mode failures are
//! logged and otherwise ignored, matching how the rest of the UI treats
//! storage.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Minimal string key/value store.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store used off-browser and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// Which browser storage area a [`BrowserStore`] wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageArea {
    Session,
    Local,
}

/// `window.sessionStorage` / `window.localStorage` wrapper.
#[derive(Clone, Copy, Debug)]
pub struct BrowserStore {
    area: StorageArea,
}

impl BrowserStore {
    #[must_use]
    pub fn new(area: StorageArea) -> Self {
        Self { area }
    }

    #[must_use]
    pub fn area(self) -> StorageArea {
        self.area
    }

    #[cfg(feature = "csr")]
    fn storage(self) -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        let storage = match self.area {
            StorageArea::Session => window.session_storage(),
            StorageArea::Local => window.local_storage(),
        };
        storage.ok().flatten()
    }
}

impl SessionStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        #[cfg(feature = "csr")]
        {
            self.storage()?.get_item(key).ok().flatten()
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = key;
            None
        }
    }

    fn set(&self, key: &str, value: &str) {
        #[cfg(feature = "csr")]
        {
            let Some(storage) = self.storage() else {
                log::warn!("{:?} storage unavailable; dropping write to {key}", self.area);
                return;
            };
            if storage.set_item(key, value).is_err() {
                log::warn!("{:?} storage rejected write to {key}", self.area);
            }
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = (key, value);
        }
    }

    fn remove(&self, key: &str) {
        #[cfg(feature = "csr")]
        {
            if let Some(storage) = self.storage() {
                let _ = storage.remove_item(key);
            }
        }
        #[cfg(not(feature = "csr"))]
        {
            let _ = key;
        }
    }
}

/// Store for the given browser area, or an in-memory stand-in off-browser.
#[must_use]
pub fn browser_store(area: StorageArea) -> Rc<dyn SessionStore> {
    #[cfg(feature = "csr")]
    {
        Rc::new(BrowserStore::new(area))
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = area;
        Rc::new(MemoryStore::new())
    }
}
