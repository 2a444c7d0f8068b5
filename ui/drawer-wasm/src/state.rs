//! Page-level state.
//!
//! Uses `RefCell`-wrapped `thread_local!` storage (WASM is single-threaded)
//! for the one drawer session per page, plus the localStorage-backed
//! `KeyValueStore` and the drawer configuration block.

use anyhow::{Result, anyhow};
use gloo_storage::{LocalStorage, Storage};
use od_drawer_core::{DrawerConfig, DrawerSession};
use od_storage::{KeyValueStore, SiteStorage};
use std::cell::RefCell;
use std::rc::Rc;

use crate::dom;
use crate::timers::GlooScheduler;

pub type Session = DrawerSession<GlooScheduler>;

// ── Thread-local singleton ──

thread_local! {
    static SESSION: RefCell<Option<Session>> = const { RefCell::new(None) };
}

pub fn set_session(session: Session) {
    SESSION.with(|s| *s.borrow_mut() = Some(session));
}

/// Clone of the page session, if `start` has run.
pub fn session() -> Option<Session> {
    SESSION.with(|s| s.borrow().clone())
}

// ── localStorage ──

/// `KeyValueStore` over `window.localStorage`.
pub struct LocalStore;

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        LocalStorage::raw()
            .get_item(key)
            .map_err(|e| anyhow!("localStorage get {key}: {e:?}"))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| anyhow!("localStorage set {key}: {e:?}"))
    }

    fn remove(&self, key: &str) -> Result<()> {
        LocalStorage::raw()
            .remove_item(key)
            .map_err(|e| anyhow!("localStorage remove {key}: {e:?}"))
    }
}

pub fn site_storage() -> SiteStorage {
    SiteStorage::new(Rc::new(LocalStore))
}

// ── Configuration ──

/// Reads `<script id="drawer-config" type="application/json">`. A missing
/// block means defaults; an empty API base URL means the page origin.
pub fn load_config() -> Result<DrawerConfig> {
    let raw = dom::by_id("drawer-config")
        .and_then(|el| el.text_content())
        .filter(|text| !text.trim().is_empty());
    let mut config = match raw {
        Some(text) => DrawerConfig::from_json(&text)?,
        None => DrawerConfig::default(),
    };
    if config.api_base_url.trim().is_empty() {
        config.api_base_url = gloo_utils::window()
            .location()
            .origin()
            .map_err(|e| anyhow!("location.origin: {e:?}"))?;
    }
    Ok(config)
}
