//! Cookie-consent banner.
//!
//! Shown while no unexpired decision is stored. Accept and reject both
//! persist the choice for 30 days and remove the banner.

use od_drawer_core::Host;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event};

use crate::browser::BrowserHost;
use crate::dom;
use crate::events::listen;
use crate::state;

const BANNER_ID: &str = "cookie-consent-banner";

const BANNER_HTML: &str = r#"
    <div>
      <p>
        We use cookies to improve your experience. By continuing to use this site, you agree to our
        <a href="/privacy">Privacy Policy</a>.
      </p>
    </div>
    <div class="cookie-consent-buttons">
      <button id="accept-cookies" class="cookie-accept-button">Accept</button>
      <button id="reject-cookies" class="cookie-reject-button">Reject</button>
    </div>
"#;

pub fn init() -> Result<(), JsValue> {
    let storage = state::site_storage();
    match storage.load_consent(BrowserHost.now_epoch_ms()) {
        Ok(Some(record)) => {
            gloo_console::debug!(format!("consent: granted={}", record.granted));
            Ok(())
        }
        Ok(None) => show_banner(),
        Err(e) => {
            gloo_console::warn!(format!("consent: {}", e));
            show_banner()
        }
    }
}

fn show_banner() -> Result<(), JsValue> {
    if dom::by_id(BANNER_ID).is_some() {
        return Ok(());
    }
    let Some(body) = dom::document().body() else {
        return Ok(());
    };
    let banner = dom::create_element("div")?;
    banner.set_id(BANNER_ID);
    banner.set_class_name("cookie-consent-banner");
    banner.set_inner_html(BANNER_HTML);
    body.append_child(&banner)?;

    for (selector, granted) in [("#accept-cookies", true), ("#reject-cookies", false)] {
        if let Some(button) = dom::query_within(&banner, selector) {
            let banner = banner.clone();
            listen(&button, "click", move |_: Event| decide(&banner, granted))?;
        }
    }
    Ok(())
}

fn decide(banner: &Element, granted: bool) {
    match state::site_storage().save_consent(granted, BrowserHost.now_epoch_ms()) {
        Ok(_) => gloo_console::log!(if granted { "Consent accepted" } else { "Consent rejected" }),
        Err(e) => gloo_console::error!(format!("consent: {}", e)),
    }
    banner.remove();
}
