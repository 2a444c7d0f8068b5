//! Drawer rendering.
//!
//! Projects `DrawerController` onto the bound elements. Step sections are
//! switched with the `hidden` class and the shell with `open`, matching the
//! site stylesheet. The country list is rebuilt only when its filter changes.

use od_drawer_core::country::Country;
use od_drawer_core::timer::format_countdown;
use od_drawer_core::{DrawerController, DrawerStep, DrawerView, FocusTarget, NoticeKind, QrImage};
use std::cell::RefCell;
use wasm_bindgen::JsValue;

use crate::dom::{self, Elements};

pub struct DomView {
    els: Elements,
    placeholder: String,
    listed_query: RefCell<Option<String>>,
}

impl DomView {
    pub fn new(els: Elements, placeholder: String) -> Self {
        Self {
            els,
            placeholder,
            listed_query: RefCell::new(None),
        }
    }

    fn render_shell(&self, drawer: &DrawerController) {
        let open = drawer.is_open();
        dom::toggle_class(&self.els.drawer, "open", open);
        dom::toggle_class(&self.els.overlay, "open", open);
        dom::lock_body_scroll(open);

        let step = drawer.step();
        for (section, shown) in [
            (&self.els.phone_step, step == DrawerStep::PhoneEntry),
            (&self.els.otp_step, step == DrawerStep::OtpEntry),
            (&self.els.success_step, step == DrawerStep::Success),
            (&self.els.payment_step, step == DrawerStep::PaymentQr),
        ] {
            dom::toggle_class(section, "hidden", !shown);
        }

        match drawer.notice() {
            Some(notice) => {
                dom::set_text(&self.els.message, &notice.text);
                dom::toggle_class(&self.els.message, "error", notice.kind == NoticeKind::Error);
                dom::toggle_class(&self.els.message, "success", notice.kind == NoticeKind::Success);
                dom::remove_class(&self.els.message, "hidden");
            }
            None => {
                dom::set_text(&self.els.message, "");
                dom::add_class(&self.els.message, "hidden");
            }
        }
    }

    fn render_phone(&self, drawer: &DrawerController) {
        let busy = drawer.is_busy();
        self.els.send_otp_btn.set_disabled(busy);
        if drawer.step() == DrawerStep::Closed {
            self.els.phone_input.set_value("");
        }

        let picker = drawer.picker();
        let selected = picker.selected();
        dom::set_text(&self.els.country_toggle_flag, selected.flag);
        dom::set_text(&self.els.country_toggle_code, selected.code);
        dom::set_display(
            &self.els.country_dropdown,
            if picker.is_open() { "block" } else { "none" },
        );
        if !picker.is_open() && !self.els.country_search.value().is_empty() {
            self.els.country_search.set_value("");
        }

        let query = picker.query().to_owned();
        let stale = self.listed_query.borrow().as_deref() != Some(query.as_str());
        if stale {
            if let Err(e) = self.render_countries(&picker.visible(), selected) {
                gloo_console::error!(format!("country list: {:?}", e));
            }
            *self.listed_query.borrow_mut() = Some(query);
        } else {
            for option in dom::query_all("#country-list .country-option") {
                let name = option.get_attribute("data-country").unwrap_or_default();
                dom::toggle_class(&option, "selected", name == selected.name);
            }
        }
    }

    fn render_countries(&self, visible: &[&Country], selected: &Country) -> Result<(), JsValue> {
        let list = &self.els.country_list;
        list.set_inner_html("");
        for country in visible {
            let option = dom::create_element("div")?;
            option.set_class_name("country-option");
            option.set_attribute("data-code", country.code)?;
            option.set_attribute("data-country", country.name)?;
            dom::toggle_class(&option, "selected", country.name == selected.name);
            for (class, text) in [
                ("country-flag", country.flag),
                ("country-name", country.name),
                ("country-code", country.code),
            ] {
                let span = dom::create_element("span")?;
                span.set_class_name(class);
                span.set_text_content(Some(text));
                option.append_child(&span)?;
            }
            list.append_child(&option)?;
        }
        Ok(())
    }

    fn render_otp(&self, drawer: &DrawerController) {
        dom::set_text(
            &self.els.user_phone,
            &drawer.pending_display().unwrap_or_default(),
        );
        let otp = drawer.otp();
        for (index, input) in self.els.otp_inputs.iter().enumerate() {
            let value = otp.cell(index).map(String::from).unwrap_or_default();
            if input.value() != value {
                input.set_value(&value);
            }
        }
        self.els.verify_otp_btn.set_disabled(drawer.is_busy());
        self.els.resend_otp_btn.set_disabled(!drawer.can_resend());
        dom::set_text(
            &self.els.resend_timer,
            &format_countdown(drawer.resend_remaining()),
        );
    }

    fn render_payment(&self, drawer: &DrawerController) {
        let amount = drawer
            .amount()
            .unwrap_or_else(|| drawer.config().fallback_amount());
        dom::set_text(&self.els.payment_amount, &amount.display());

        let (src, pay_url, merchant) = match drawer.qr() {
            QrImage::Ready(qr) => (
                qr.image.as_str(),
                qr.pay_url.clone(),
                qr.merchant_name.clone(),
            ),
            QrImage::Idle | QrImage::Loading | QrImage::Placeholder => {
                (self.placeholder.as_str(), None, None)
            }
        };
        if self.els.qr_image.get_attribute("src").as_deref() != Some(src) {
            self.els.qr_image.set_src(src);
        }
        dom::toggle_class(
            &self.els.qr_image,
            "loading",
            matches!(drawer.qr(), QrImage::Loading),
        );

        match pay_url {
            Some(url) => {
                self.els.upi_link.set_href(&url);
                dom::remove_class(&self.els.upi_link, "hidden");
            }
            None => {
                let _ = self.els.upi_link.remove_attribute("href");
                dom::add_class(&self.els.upi_link, "hidden");
            }
        }
        dom::set_text(&self.els.merchant_name, &merchant.unwrap_or_default());
        dom::set_text(
            &self.els.qr_refresh_timer,
            &format_countdown(drawer.qr_remaining()),
        );
    }

    fn apply_focus(&self, focus: FocusTarget) {
        match focus {
            FocusTarget::PhoneInput => dom::focus(&self.els.phone_input),
            FocusTarget::OtpCell(index) => {
                if let Some(input) = self.els.otp_inputs.get(index) {
                    dom::focus(input);
                }
            }
            FocusTarget::ContinueButton => dom::focus(&self.els.continue_btn),
            FocusTarget::Blur => dom::blur_active(),
        }
    }
}

impl DrawerView for DomView {
    fn render(&self, drawer: &DrawerController, focus: Option<FocusTarget>) {
        self.render_shell(drawer);
        self.render_phone(drawer);
        self.render_otp(drawer);
        self.render_payment(drawer);
        if let Some(focus) = focus {
            self.apply_focus(focus);
        }
    }
}
