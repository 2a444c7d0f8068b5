//! Dialing-code table, the searchable picker over it, and phone helpers.

use crate::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub name: &'static str,
    pub code: &'static str,
    pub flag: &'static str,
}

pub static COUNTRIES: &[Country] = &[
    Country { name: "India", code: "+91", flag: "🇮🇳" },
    Country { name: "United States", code: "+1", flag: "🇺🇸" },
    Country { name: "United Kingdom", code: "+44", flag: "🇬🇧" },
    Country { name: "Afghanistan", code: "+93", flag: "🇦🇫" },
    Country { name: "Albania", code: "+355", flag: "🇦🇱" },
    Country { name: "Algeria", code: "+213", flag: "🇩🇿" },
    Country { name: "Andorra", code: "+376", flag: "🇦🇩" },
    Country { name: "Angola", code: "+244", flag: "🇦🇴" },
    Country { name: "Argentina", code: "+54", flag: "🇦🇷" },
    Country { name: "Armenia", code: "+374", flag: "🇦🇲" },
    Country { name: "Australia", code: "+61", flag: "🇦🇺" },
    Country { name: "Austria", code: "+43", flag: "🇦🇹" },
    Country { name: "Azerbaijan", code: "+994", flag: "🇦🇿" },
    Country { name: "Bahrain", code: "+973", flag: "🇧🇭" },
    Country { name: "Bangladesh", code: "+880", flag: "🇧🇩" },
    Country { name: "Belarus", code: "+375", flag: "🇧🇾" },
    Country { name: "Belgium", code: "+32", flag: "🇧🇪" },
    Country { name: "Bhutan", code: "+975", flag: "🇧🇹" },
    Country { name: "Brazil", code: "+55", flag: "🇧🇷" },
    Country { name: "Canada", code: "+1", flag: "🇨🇦" },
    Country { name: "China", code: "+86", flag: "🇨🇳" },
    Country { name: "Colombia", code: "+57", flag: "🇨🇴" },
    Country { name: "Croatia", code: "+385", flag: "🇭🇷" },
    Country { name: "Cuba", code: "+53", flag: "🇨🇺" },
    Country { name: "Czech Republic", code: "+420", flag: "🇨🇿" },
    Country { name: "Denmark", code: "+45", flag: "🇩🇰" },
    Country { name: "Egypt", code: "+20", flag: "🇪🇬" },
    Country { name: "Finland", code: "+358", flag: "🇫🇮" },
    Country { name: "France", code: "+33", flag: "🇫🇷" },
    Country { name: "Germany", code: "+49", flag: "🇩🇪" },
    Country { name: "Greece", code: "+30", flag: "🇬🇷" },
    Country { name: "Hong Kong", code: "+852", flag: "🇭🇰" },
    Country { name: "Hungary", code: "+36", flag: "🇭🇺" },
    Country { name: "Iceland", code: "+354", flag: "🇮🇸" },
    Country { name: "Indonesia", code: "+62", flag: "🇮🇩" },
    Country { name: "Iran", code: "+98", flag: "🇮🇷" },
    Country { name: "Iraq", code: "+964", flag: "🇮🇶" },
    Country { name: "Ireland", code: "+353", flag: "🇮🇪" },
    Country { name: "Israel", code: "+972", flag: "🇮🇱" },
    Country { name: "Italy", code: "+39", flag: "🇮🇹" },
    Country { name: "Japan", code: "+81", flag: "🇯🇵" },
    Country { name: "Jordan", code: "+962", flag: "🇯🇴" },
    Country { name: "Kenya", code: "+254", flag: "🇰🇪" },
    Country { name: "Kuwait", code: "+965", flag: "🇰🇼" },
    Country { name: "Malaysia", code: "+60", flag: "🇲🇾" },
    Country { name: "Maldives", code: "+960", flag: "🇲🇻" },
    Country { name: "Mexico", code: "+52", flag: "🇲🇽" },
    Country { name: "Mongolia", code: "+976", flag: "🇲🇳" },
    Country { name: "Morocco", code: "+212", flag: "🇲🇦" },
    Country { name: "Nepal", code: "+977", flag: "🇳🇵" },
    Country { name: "Netherlands", code: "+31", flag: "🇳🇱" },
    Country { name: "New Zealand", code: "+64", flag: "🇳🇿" },
    Country { name: "Nigeria", code: "+234", flag: "🇳🇬" },
    Country { name: "Norway", code: "+47", flag: "🇳🇴" },
    Country { name: "Oman", code: "+968", flag: "🇴🇲" },
    Country { name: "Pakistan", code: "+92", flag: "🇵🇰" },
    Country { name: "Philippines", code: "+63", flag: "🇵🇭" },
    Country { name: "Poland", code: "+48", flag: "🇵🇱" },
    Country { name: "Portugal", code: "+351", flag: "🇵🇹" },
    Country { name: "Qatar", code: "+974", flag: "🇶🇦" },
    Country { name: "Russia", code: "+7", flag: "🇷🇺" },
    Country { name: "Saudi Arabia", code: "+966", flag: "🇸🇦" },
    Country { name: "Singapore", code: "+65", flag: "🇸🇬" },
    Country { name: "South Africa", code: "+27", flag: "🇿🇦" },
    Country { name: "South Korea", code: "+82", flag: "🇰🇷" },
    Country { name: "Spain", code: "+34", flag: "🇪🇸" },
    Country { name: "Sri Lanka", code: "+94", flag: "🇱🇰" },
    Country { name: "Sweden", code: "+46", flag: "🇸🇪" },
    Country { name: "Switzerland", code: "+41", flag: "🇨🇭" },
    Country { name: "Syria", code: "+963", flag: "🇸🇾" },
    Country { name: "Taiwan", code: "+886", flag: "🇹🇼" },
    Country { name: "Thailand", code: "+66", flag: "🇹🇭" },
    Country { name: "Turkey", code: "+90", flag: "🇹🇷" },
    Country { name: "Ukraine", code: "+380", flag: "🇺🇦" },
    Country { name: "United Arab Emirates", code: "+971", flag: "🇦🇪" },
    Country { name: "Vietnam", code: "+84", flag: "🇻🇳" },
    Country { name: "Yemen", code: "+967", flag: "🇾🇪" },
    Country { name: "Zimbabwe", code: "+263", flag: "🇿🇼" },
];

/// First entry for a dialing code (`+1` resolves to the United States).
pub fn find_by_code(code: &str) -> Option<&'static Country> {
    COUNTRIES.iter().find(|c| c.code == code)
}

pub fn find_by_name(name: &str) -> Option<&'static Country> {
    COUNTRIES.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Case-insensitive substring match on the country name.
pub fn filter(query: &str) -> Vec<&'static Country> {
    let needle = query.trim().to_lowercase();
    COUNTRIES
        .iter()
        .filter(|c| needle.is_empty() || c.name.to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryPicker {
    open: bool,
    query: String,
    selected: &'static Country,
}

impl CountryPicker {
    pub fn new(default_code: &str) -> Self {
        Self {
            open: false,
            query: String::new(),
            selected: find_by_code(default_code).unwrap_or(&COUNTRIES[0]),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_owned();
    }

    pub fn visible(&self) -> Vec<&'static Country> {
        filter(&self.query)
    }

    /// Select by name (dialing codes are not unique) and close the list.
    pub fn select(&mut self, name: &str) -> Option<&'static Country> {
        let country = find_by_name(name)?;
        self.selected = country;
        self.close();
        Some(country)
    }

    pub fn selected(&self) -> &'static Country {
        self.selected
    }
}

/// Coarse length check; full E.164 validation is left to the backend.
pub fn validate_phone(raw: &str, min_length: usize) -> Result<String, FlowError> {
    let phone = raw.trim();
    if phone.is_empty() {
        return Err(FlowError::PhoneMissing);
    }
    if phone.chars().count() < min_length {
        return Err(FlowError::PhoneTooShort { min: min_length });
    }
    Ok(phone.to_owned())
}

/// `+91 9876543210`, as shown above the OTP cells.
pub fn display_phone(country_code: &str, phone: &str) -> String {
    format!("{country_code} {phone}")
}

/// `+919876543210`, with separators dropped.
pub fn international(country_code: &str, phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("{country_code}{digits}")
}
