//! Clock and device facts for the drawer session.

use js_sys::{Array, Date, Intl, Object, Reflect};
use od_api_types::BrowserData;
use od_drawer_core::Host;
use wasm_bindgen::JsValue;

pub struct BrowserHost;

impl Host for BrowserHost {
    fn now_epoch_ms(&self) -> u64 {
        Date::now() as u64
    }

    fn now_iso(&self) -> String {
        Date::new_0().to_iso_string().into()
    }

    fn browser_data(&self) -> BrowserData {
        let window = gloo_utils::window();
        let navigator = window.navigator();
        let mut data = BrowserData {
            user_agent: navigator.user_agent().unwrap_or_default(),
            language: navigator.language().unwrap_or_default(),
            platform: navigator.platform().unwrap_or_default(),
            pixel_ratio: window.device_pixel_ratio(),
            timezone: timezone().unwrap_or_default(),
            ..BrowserData::default()
        };
        if let Ok(screen) = window.screen() {
            data.screen_width = screen.width().unwrap_or_default().max(0) as u32;
            data.screen_height = screen.height().unwrap_or_default().max(0) as u32;
            data.color_depth = screen.color_depth().unwrap_or_default().max(0) as u32;
        }
        data
    }
}

/// IANA zone from `Intl.DateTimeFormat().resolvedOptions().timeZone`.
fn timezone() -> Option<String> {
    let options = Intl::DateTimeFormat::new(&Array::new(), &Object::new()).resolved_options();
    Reflect::get(&options, &JsValue::from_str("timeZone"))
        .ok()?
        .as_string()
}
