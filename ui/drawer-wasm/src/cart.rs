//! Cart widget.
//!
//! Owns the selected offerings for the page, persists them under `cartItems`
//! and caches the catalog under `offeringsData` so the drawer can price the
//! QR request. Extend by adding listeners in `init`.

use gloo_timers::callback::Timeout;
use od_api_types::Offering;
use od_drawer_core::{Amount, Cart, CatalogSource};
use serde::Deserialize;
use std::cell::RefCell;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, Element, Event};

use crate::api;
use crate::dom::{self, CartElements};
use crate::events::listen;
use crate::state;

const SELECTED_LABEL: &str = r#"<i class="ph ph-check"></i> Selected"#;
const ADD_LABEL: &str = r#"<i class="ph ph-shopping-cart-simple"></i> Add to Cart"#;

/// Matches the widget's CSS fade-out.
const HIDE_DELAY_MS: u32 = 300;

#[derive(Default)]
struct CartState {
    cart: Cart,
    catalog: Vec<Offering>,
}

thread_local! {
    static CART: RefCell<CartState> = RefCell::new(CartState::default());
}

#[derive(Deserialize)]
struct ProductDetail {
    #[serde(rename = "productId")]
    product_id: String,
}

/// Restore the cart, bind its listeners and load the catalog.
pub async fn init(source: &CatalogSource) -> Result<(), JsValue> {
    let storage = state::site_storage();
    let items = storage.load_cart_items().unwrap_or_else(|e| {
        gloo_console::warn!(format!("cart: {}", e));
        Vec::new()
    });
    let cached = storage.load_catalog().ok().flatten().unwrap_or_default();
    CART.with(|c| {
        let mut c = c.borrow_mut();
        c.cart = Cart::from_items(items);
        c.catalog = cached;
    });

    let els = CartElements::bind();
    if let Some(els) = &els {
        dom::remove_class(&els.details, "expanded");
        dom::set_display(&els.widget, "none");
        bind(els)?;
    }
    bind_page_events()?;

    match load_catalog(source).await {
        Ok(catalog) => {
            if let Err(e) = storage.save_catalog(&catalog) {
                gloo_console::warn!(format!("cart: caching catalog: {}", e));
            }
            CART.with(|c| c.borrow_mut().catalog = catalog);
        }
        Err(e) => gloo_console::error!(format!("Error loading offerings configuration: {}", e)),
    }
    render();
    Ok(())
}

async fn load_catalog(source: &CatalogSource) -> Result<Vec<Offering>, String> {
    let body = api::fetch_text(source.url()).await?;
    source.parse_catalog(&body).map_err(|e| format!("{:#}", e))
}

// ── Mutations ──

pub fn add_item(id: &str) {
    if CART.with(|c| c.borrow_mut().cart.add(id)) {
        persist();
    }
    render();
}

pub fn remove_item(id: &str) {
    if CART.with(|c| c.borrow_mut().cart.remove(id)) {
        persist();
    }
    render();
}

pub fn clear() {
    CART.with(|c| c.borrow_mut().cart.clear());
    if let Err(e) = state::site_storage().clear_cart_items() {
        gloo_console::error!(format!("cart: clearing items: {}", e));
    }
    render();
}

fn toggle_item(id: &str) {
    if CART.with(|c| c.borrow().cart.contains(id)) {
        remove_item(id);
    } else {
        add_item(id);
    }
}

fn persist() {
    let items = CART.with(|c| c.borrow().cart.items().to_vec());
    if let Err(e) = state::site_storage().save_cart_items(&items) {
        gloo_console::error!(format!("cart: saving items: {}", e));
    }
}

// ── Listeners ──

fn product_id(event: &Event) -> Option<String> {
    let detail = event.dyn_ref::<CustomEvent>()?.detail();
    serde_wasm_bindgen::from_value::<ProductDetail>(detail)
        .ok()
        .map(|d| d.product_id)
}

fn bind_page_events() -> Result<(), JsValue> {
    let document = dom::document();
    listen(&document, "product:added", |e: Event| {
        if let Some(id) = product_id(&e) {
            add_item(&id);
        }
    })?;
    listen(&document, "product:removed", |e: Event| {
        if let Some(id) = product_id(&e) {
            remove_item(&id);
        }
    })?;
    for card in dom::query_all(".offering-card") {
        let (Some(id), Some(cta)) = (
            card.get_attribute("data-id"),
            dom::query_within(&card, ".offering-cta"),
        ) else {
            continue;
        };
        listen(&cta, "click", move |e: Event| {
            e.prevent_default();
            toggle_item(&id);
        })?;
    }
    Ok(())
}

fn bind(els: &CartElements) -> Result<(), JsValue> {
    if let Some(expand) = &els.expand {
        let (expand2, details) = (expand.clone(), els.details.clone());
        listen(expand, "click", move |_: Event| {
            let expanded = !dom::has_class(&details, "expanded");
            dom::toggle_class(&details, "expanded", expanded);
            dom::toggle_class(&expand2, "expanded", expanded);
            if let Some(icon) = dom::query_within(&expand2, "i") {
                icon.set_class_name(if expanded { "ph ph-caret-up" } else { "ph ph-caret-down" });
            }
        })?;
    }
    if let Some(pay) = &els.pay_button {
        listen(pay, "click", |_: Event| {
            gloo_console::log!("Pay button clicked");
            if let Some(session) = state::session() {
                session.open();
            }
        })?;
    }
    Ok(())
}

// ── Rendering ──

fn render() {
    let (lines, count, total) = CART.with(|c| {
        let c = c.borrow();
        let lines: Vec<(String, Amount)> = c
            .cart
            .lines(&c.catalog)
            .into_iter()
            .map(|o| (o.title.clone(), Amount::from_rupees(o.price)))
            .collect();
        (lines, c.cart.len(), c.cart.total(&c.catalog))
    });

    render_badges(count);
    render_ctas();

    let Some(els) = CartElements::bind() else {
        return;
    };
    dom::set_text(&els.count, &count.to_string());
    if count > 0 {
        dom::set_display(&els.widget, "block");
        dom::add_class(&els.widget, "visible");
    } else {
        dom::remove_class(&els.widget, "visible");
        let widget = els.widget.clone();
        Timeout::new(HIDE_DELAY_MS, move || {
            if CART.with(|c| c.borrow().cart.is_empty()) {
                dom::set_display(&widget, "none");
            }
        })
        .forget();
    }

    els.items.set_inner_html("");
    for (title, price) in &lines {
        if let Err(e) = append_line(&els.items, title, *price) {
            gloo_console::error!(format!("cart: rendering line: {:?}", e));
        }
    }
    let total = total.display_whole();
    for el in [&els.total_price, &els.total_amount].into_iter().flatten() {
        dom::set_text(el, &total);
    }
}

fn append_line(list: &Element, title: &str, price: Amount) -> Result<(), JsValue> {
    let line = dom::create_element("div")?;
    line.set_class_name("cart-item");
    let price = price.display_whole();
    for (class, text) in [("item-name", title), ("item-price", price.as_str())] {
        let span = dom::create_element("span")?;
        span.set_class_name(class);
        span.set_text_content(Some(text));
        line.append_child(&span)?;
    }
    list.append_child(&line)?;
    Ok(())
}

fn render_badges(count: usize) {
    for badge in dom::query_all(".offerings-badge") {
        if count > 0 {
            dom::set_text(&badge, &count.to_string());
            dom::set_display(&badge, "flex");
        } else {
            dom::set_display(&badge, "none");
        }
    }
}

fn render_ctas() {
    for card in dom::query_all(".offering-card") {
        let selected = card
            .get_attribute("data-id")
            .is_some_and(|id| CART.with(|c| c.borrow().cart.contains(&id)));
        if let Some(cta) = dom::query_within(&card, ".offering-cta") {
            cta.set_inner_html(if selected { SELECTED_LABEL } else { ADD_LABEL });
        }
    }
}
