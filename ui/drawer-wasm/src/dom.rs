//! DOM element bindings.
//!
//! Drawer elements are resolved once at startup and are required; the cart
//! widget is optional because not every page carries it. To add new UI
//! elements, add a field here and bind it in the matching `bind()`.

use od_drawer_core::OTP_LENGTH;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, HtmlAnchorElement, HtmlButtonElement, HtmlElement, HtmlImageElement,
    HtmlInputElement,
};

// ── Helpers ──

pub fn document() -> Document {
    gloo_utils::document()
}

pub fn by_id(id: &str) -> Option<Element> {
    document().get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn query(selector: &str) -> Option<Element> {
    document().query_selector(selector).ok()?
}

pub fn query_typed<T: JsCast>(selector: &str) -> Option<T> {
    query(selector).and_then(|e| e.dyn_into::<T>().ok())
}

pub fn query_all(selector: &str) -> Vec<Element> {
    let Ok(nl) = document().query_selector_all(selector) else {
        return Vec::new();
    };
    (0..nl.length())
        .filter_map(|i| nl.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect()
}

pub fn query_within(parent: &Element, selector: &str) -> Option<Element> {
    parent.query_selector(selector).ok()?
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

pub fn remove_class(el: &Element, cls: &str) {
    let _ = el.class_list().remove_1(cls);
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

pub fn has_class(el: &Element, cls: &str) -> bool {
    el.class_list().contains(cls)
}

pub fn set_display(el: &Element, value: &str) {
    if let Some(html) = el.dyn_ref::<HtmlElement>() {
        let _ = html.style().set_property("display", value);
    }
}

pub fn create_element(tag: &str) -> Result<Element, JsValue> {
    document().create_element(tag)
}

/// Locks page scrolling while the drawer is open.
pub fn lock_body_scroll(lock: bool) {
    if let Some(body) = document().body() {
        let style = body.style();
        let _ = if lock {
            style.set_property("overflow", "hidden")
        } else {
            style.remove_property("overflow").map(drop)
        };
    }
}

pub fn focus(el: &HtmlElement) {
    let _ = el.focus();
}

pub fn blur_active() {
    if let Some(active) = document()
        .active_element()
        .and_then(|e| e.dyn_into::<HtmlElement>().ok())
    {
        let _ = active.blur();
    }
}

// ── Drawer elements ──

/// All DOM element references used by the drawer.
/// Clone-friendly (all inner types are reference-counted via JS GC).
#[derive(Clone)]
pub struct Elements {
    // Shell
    pub drawer: Element,
    pub overlay: Element,
    pub close_btn: HtmlElement,
    pub message: Element,

    // Steps
    pub phone_step: Element,
    pub otp_step: Element,
    pub success_step: Element,
    pub payment_step: Element,

    // Phone entry
    pub phone_input: HtmlInputElement,
    pub send_otp_btn: HtmlButtonElement,
    pub country_toggle: HtmlElement,
    pub country_toggle_flag: Element,
    pub country_toggle_code: Element,
    pub country_dropdown: Element,
    pub country_list: Element,
    pub country_search: HtmlInputElement,

    // OTP entry
    pub user_phone: Element,
    pub otp_inputs: Vec<HtmlInputElement>,
    pub verify_otp_btn: HtmlButtonElement,
    pub resend_otp_btn: HtmlButtonElement,
    pub resend_timer: Element,
    pub back_to_phone_btn: HtmlElement,

    // Success
    pub continue_btn: HtmlButtonElement,

    // Payment
    pub qr_image: HtmlImageElement,
    pub payment_amount: Element,
    pub upi_link: HtmlAnchorElement,
    pub merchant_name: Element,
    pub qr_refresh_timer: Element,
    pub change_number_btn: HtmlElement,
}

macro_rules! get_el {
    ($id:expr) => {
        by_id($id).ok_or_else(|| JsValue::from_str(&format!("missing element #{}", $id)))?
    };
}

macro_rules! get_typed {
    ($ty:ty, $id:expr) => {
        by_id_typed::<$ty>($id)
            .ok_or_else(|| JsValue::from_str(&format!("missing {} #{}", stringify!($ty), $id)))?
    };
}

macro_rules! get_query {
    ($ty:ty, $selector:expr) => {
        query_typed::<$ty>($selector)
            .ok_or_else(|| JsValue::from_str(&format!("missing {}", $selector)))?
    };
}

impl Elements {
    /// Resolve all drawer references. Call once after DOMContentLoaded.
    pub fn bind() -> Result<Elements, JsValue> {
        let country_toggle: HtmlElement = get_query!(HtmlElement, ".country-code-toggle");
        let country_toggle_flag = query_within(&country_toggle, ".country-flag")
            .ok_or_else(|| JsValue::from_str("missing .country-code-toggle .country-flag"))?;
        let country_toggle_code = query_within(&country_toggle, ".country-code")
            .ok_or_else(|| JsValue::from_str("missing .country-code-toggle .country-code"))?;

        let otp_inputs: Vec<HtmlInputElement> = query_all(".otp-input")
            .into_iter()
            .filter_map(|e| e.dyn_into::<HtmlInputElement>().ok())
            .collect();
        if otp_inputs.len() != OTP_LENGTH {
            return Err(JsValue::from_str(&format!(
                "expected {} .otp-input cells, found {}",
                OTP_LENGTH,
                otp_inputs.len()
            )));
        }

        Ok(Elements {
            drawer: get_query!(Element, ".drawer"),
            overlay: get_query!(Element, ".drawer-overlay"),
            close_btn: get_query!(HtmlElement, ".drawer-close"),
            message: get_el!("drawer-message"),

            phone_step: get_el!("phone-step"),
            otp_step: get_el!("otp-step"),
            success_step: get_el!("success-step"),
            payment_step: get_el!("payment-step"),

            phone_input: get_query!(HtmlInputElement, ".phone-input"),
            send_otp_btn: get_typed!(HtmlButtonElement, "send-otp-btn"),
            country_toggle,
            country_toggle_flag,
            country_toggle_code,
            country_dropdown: get_query!(Element, ".country-dropdown"),
            country_list: get_el!("country-list"),
            country_search: get_query!(HtmlInputElement, ".country-search-input"),

            user_phone: get_query!(Element, ".user-phone"),
            otp_inputs,
            verify_otp_btn: get_typed!(HtmlButtonElement, "verify-otp-btn"),
            resend_otp_btn: get_typed!(HtmlButtonElement, "resend-otp-btn"),
            resend_timer: get_query!(Element, ".resend-timer"),
            back_to_phone_btn: get_query!(HtmlElement, ".back-to-phone-btn"),

            continue_btn: get_typed!(HtmlButtonElement, "continue-btn"),

            qr_image: get_typed!(HtmlImageElement, "payment-qr-code"),
            payment_amount: get_el!("payment-amount"),
            upi_link: get_typed!(HtmlAnchorElement, "upi-pay-link"),
            merchant_name: get_el!("merchant-name"),
            qr_refresh_timer: get_el!("qr-refresh-timer"),
            change_number_btn: get_typed!(HtmlElement, "change-number-btn"),
        })
    }
}

// ── Cart widget elements ──

#[derive(Clone)]
pub struct CartElements {
    pub widget: Element,
    pub count: Element,
    pub items: Element,
    pub details: Element,
    pub expand: Option<Element>,
    pub pay_button: Option<HtmlElement>,
    pub total_price: Option<Element>,
    pub total_amount: Option<Element>,
}

impl CartElements {
    /// `None` when the page has no cart widget.
    pub fn bind() -> Option<CartElements> {
        Some(CartElements {
            widget: query(".cart-widget")?,
            count: query(".cart-count")?,
            items: query(".cart-items")?,
            details: query(".cart-details")?,
            expand: query(".expand-cart"),
            pay_button: query_typed::<HtmlElement>(".pay-button"),
            total_price: query(".total-price"),
            total_amount: query(".total-amount"),
        })
    }
}
