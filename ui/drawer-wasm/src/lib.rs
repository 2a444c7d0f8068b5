//! Offerdesk Drawer WASM Frontend
//!
//! Browser shell around `od-drawer-core`: binds the drawer markup, runs the
//! verification and payment session, and drives the cart widget and the
//! consent banner. Each concern lives in its own module.

pub mod api;
pub mod browser;
pub mod cart;
pub mod consent;
pub mod dom;
pub mod events;
pub mod state;
pub mod timers;
pub mod view;

use js_sys::{Object, Reflect};
use od_drawer_core::{ApiClient, DrawerSession};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_web::MakeWebConsoleWriter;
use wasm_bindgen::closure::WasmClosure;
use wasm_bindgen::prelude::*;

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    if let Err(e) = init_logging() {
        gloo_console::warn!(format!("tracing: {}", e));
    }

    init().await
}

/// Sends `tracing` events from the core crates to the browser console.
fn init_logging() -> Result<(), TryInitError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_writer(MakeWebConsoleWriter::new());
    tracing_subscriber::registry()
        .with(EnvFilter::new("info"))
        .with(fmt_layer)
        .try_init()
}

async fn init() -> Result<(), JsValue> {
    let config = Rc::new(
        state::load_config().map_err(|e| JsValue::from_str(&format!("{:#}", e)))?,
    );
    let els = dom::Elements::bind()?;

    let api = ApiClient::new(
        Rc::new(api::FetchTransport),
        Rc::new(api::GlooSleeper),
        config.clone(),
    );
    let view = view::DomView::new(els.clone(), config.qr_placeholder_url.clone());
    let session = DrawerSession::new(
        config.clone(),
        api,
        state::site_storage(),
        timers::GlooScheduler,
        Rc::new(browser::BrowserHost),
        Rc::new(view),
    );
    // Paint the closed state before any listener can fire.
    session.update(|_| ());
    state::set_session(session.clone());

    events::bind_events(&els, &session)?;
    consent::init()?;
    cart::init(&config.catalog).await?;
    expose_page_api()?;

    gloo_console::log!("Drawer initialized");
    Ok(())
}

// ── Page API ──

/// Methods on `window.drawer`.
const DRAWER_METHODS: [&str; 2] = ["open", "close"];
/// Methods on `window.cartWidget`.
const CART_METHODS: [&str; 3] = ["addItem", "removeItem", "clearCart"];

/// Publishes `window.drawer` and `window.cartWidget` for inline page scripts.
fn expose_page_api() -> Result<(), JsValue> {
    let [open, close] = DRAWER_METHODS;
    let drawer = Object::new();
    set_method(&drawer, open, Closure::wrap(Box::new(open_drawer) as Box<dyn FnMut()>))?;
    set_method(&drawer, close, Closure::wrap(Box::new(close_drawer) as Box<dyn FnMut()>))?;

    let [add, remove, clear] = CART_METHODS;
    let cart_widget = Object::new();
    set_method(
        &cart_widget,
        add,
        Closure::wrap(Box::new(|id: String| cart::add_item(&id)) as Box<dyn FnMut(String)>),
    )?;
    set_method(
        &cart_widget,
        remove,
        Closure::wrap(Box::new(|id: String| cart::remove_item(&id)) as Box<dyn FnMut(String)>),
    )?;
    set_method(&cart_widget, clear, Closure::wrap(Box::new(cart::clear) as Box<dyn FnMut()>))?;

    let window = gloo_utils::window();
    Reflect::set(&window, &JsValue::from_str("drawer"), &drawer)?;
    Reflect::set(&window, &JsValue::from_str("cartWidget"), &cart_widget)?;
    Ok(())
}

/// Attach `f` to `target` for the page lifetime.
fn set_method<F: ?Sized + WasmClosure>(
    target: &Object,
    name: &str,
    f: Closure<F>,
) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(name), f.as_ref())?;
    f.forget();
    Ok(())
}

#[wasm_bindgen(js_name = openDrawer)]
pub fn open_drawer() {
    if let Some(session) = state::session() {
        session.open();
    }
}

#[wasm_bindgen(js_name = closeDrawer)]
pub fn close_drawer() {
    if let Some(session) = state::session() {
        session.close();
    }
}

#[wasm_bindgen(js_name = cartAddItem)]
pub fn cart_add_item(product_id: &str) {
    cart::add_item(product_id);
}

#[wasm_bindgen(js_name = cartRemoveItem)]
pub fn cart_remove_item(product_id: &str) {
    cart::remove_item(product_id);
}

#[wasm_bindgen(js_name = cartClear)]
pub fn cart_clear() {
    cart::clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_events_reach_a_subscriber() {
        assert!(!tracing::enabled!(tracing::Level::WARN));

        init_logging().expect("first install succeeds");
        assert!(tracing::enabled!(tracing::Level::WARN));
        assert!(tracing::enabled!(tracing::Level::INFO));
        assert!(!tracing::enabled!(tracing::Level::DEBUG));

        assert!(init_logging().is_err());
    }

    #[test]
    fn page_api_keeps_the_inline_script_names() {
        assert_eq!(DRAWER_METHODS, ["open", "close"]);
        assert_eq!(CART_METHODS, ["addItem", "removeItem", "clearCart"]);
    }
}
