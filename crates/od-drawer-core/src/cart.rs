use anyhow::Result;
use od_api_types::Offering;
use od_storage::SiteStorage;
use std::iter::Sum;
use std::ops::Add;

/// Money in paise. Converted to rupees only at the wire boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount {
    paise: u64,
}

impl Amount {
    pub const ZERO: Amount = Amount { paise: 0 };

    pub fn from_paise(paise: u64) -> Self {
        Self { paise }
    }

    /// Negative and non-finite prices count as zero.
    pub fn from_rupees(rupees: f64) -> Self {
        if !rupees.is_finite() || rupees <= 0.0 {
            return Self::ZERO;
        }
        Self {
            paise: (rupees * 100.0).round() as u64,
        }
    }

    pub fn paise(&self) -> u64 {
        self.paise
    }

    pub fn as_rupees(&self) -> f64 {
        self.paise as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.paise == 0
    }

    /// `₹1000.00`: two decimals, no digit grouping.
    pub fn display(&self) -> String {
        format!("₹{}.{:02}", self.paise / 100, self.paise % 100)
    }

    /// `₹1,00,000`: whole rupees with Indian digit grouping.
    pub fn display_whole(&self) -> String {
        let rupees = (self.paise + 50) / 100;
        format!("₹{}", group_indian(rupees))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount {
            paise: self.paise.saturating_add(rhs.paise),
        }
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (left, right) = rest.split_at(rest.len() - 2);
        groups.push(right);
        rest = left;
    }
    groups.push(rest);
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

fn price_of(catalog: &[Offering], id: &str) -> Option<Amount> {
    catalog
        .iter()
        .find(|o| o.id == id)
        .map(|o| Amount::from_rupees(o.price))
}

/// Read-only view of the cart as the drawer sees it through shared storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub item_ids: Vec<String>,
    pub catalog: Option<Vec<Offering>>,
}

impl CartSnapshot {
    pub fn load(storage: &SiteStorage) -> Result<Self> {
        Ok(Self {
            item_ids: storage.load_cart_items()?,
            catalog: storage.load_catalog()?,
        })
    }

    /// Sum of the selected ids found in the catalog; unknown ids are skipped.
    pub fn total(&self) -> Amount {
        let Some(catalog) = &self.catalog else {
            return Amount::ZERO;
        };
        self.item_ids
            .iter()
            .filter_map(|id| price_of(catalog, id))
            .sum()
    }

    /// Amount to request a QR for; an empty or unpriced cart pays the
    /// fallback.
    pub fn payable_amount(&self, fallback: Amount) -> Amount {
        let total = self.total();
        if total.is_zero() { fallback } else { total }
    }
}

/// The cart widget's own selection: ordered, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<String>,
}

impl Cart {
    pub fn from_items(items: Vec<String>) -> Self {
        let mut cart = Cart::default();
        for item in items {
            cart.add(&item);
        }
        cart
    }

    /// Returns `false` when the id was already selected.
    pub fn add(&mut self, id: &str) -> bool {
        if id.is_empty() || self.contains(id) {
            return false;
        }
        self.items.push(id.to_owned());
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item == id)
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Catalog entries for the selected ids, in selection order.
    pub fn lines<'a>(&self, catalog: &'a [Offering]) -> Vec<&'a Offering> {
        self.items
            .iter()
            .filter_map(|id| catalog.iter().find(|o| &o.id == id))
            .collect()
    }

    pub fn total(&self, catalog: &[Offering]) -> Amount {
        self.lines(catalog)
            .into_iter()
            .map(|o| Amount::from_rupees(o.price))
            .sum()
    }
}
