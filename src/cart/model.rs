use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of one cart row
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u32);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RowId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(RowId)
    }
}

/// One purchasable entry. The unit price is fixed at load time.
#[derive(Clone, Debug, PartialEq)]
pub struct LineItem {
    id: RowId,
    name: String,
    unit_price: f64,
    quantity: u32,
}

impl LineItem {
    pub fn new(id: RowId, name: impl Into<String>, unit_price: f64) -> Self {
        LineItem {
            id,
            name: name.into(),
            unit_price,
            quantity: 1,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price times quantity, never rounded
    pub fn amount(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// A quantity change requested by the dispatcher
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Increment(RowId),
    Decrement(RowId),
    Remove(RowId),
    SetQuantity(RowId, u32),
}

impl Mutation {
    pub fn row(&self) -> RowId {
        match *self {
            Mutation::Increment(row)
            | Mutation::Decrement(row)
            | Mutation::Remove(row)
            | Mutation::SetQuantity(row, _) => row,
        }
    }
}

/// Line items plus the active discount factor. Totals are always derived.
#[derive(Clone, Debug, PartialEq)]
pub struct CartState {
    items: Vec<LineItem>,
    discount_factor: f64,
}

impl CartState {
    pub fn new(items: Vec<LineItem>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id) {
                return Err(Error::DuplicateItem(item.id.0));
            }
        }
        Ok(CartState {
            items,
            discount_factor: 1.0,
        })
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, row: RowId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == row)
    }

    pub fn quantity(&self, row: RowId) -> Option<u32> {
        self.item(row).map(LineItem::quantity)
    }

    pub fn row_ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.items.iter().map(LineItem::id)
    }

    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    pub(crate) fn set_discount_factor(&mut self, factor: f64) {
        self.discount_factor = factor;
    }

    /// Apply a mutation. Returns false when nothing happened and no
    /// recompute is due: unknown row, or a decrement at zero.
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == mutation.row()) else {
            return false;
        };

        match mutation {
            Mutation::Increment(_) => {
                item.quantity = item.quantity.saturating_add(1);
                true
            }
            Mutation::Decrement(_) => {
                if item.quantity > 0 {
                    item.quantity -= 1;
                    true
                } else {
                    false
                }
            }
            Mutation::Remove(_) => {
                item.quantity = 0;
                true
            }
            Mutation::SetQuantity(_, quantity) => {
                item.quantity = quantity;
                true
            }
        }
    }
}

/// Result of reading a quantity field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedQuantity {
    pub value: u32,
    /// The field text was empty, negative or not a number and must be
    /// rewritten to "0"
    pub coerced: bool,
}

/// Parse the leading integer of a quantity field.
///
/// Surrounding whitespace and trailing characters are ignored (`"3abc"` is 3,
/// `"2.9"` is 2). Empty, negative and non-numeric text become 0 and are
/// flagged as coerced. Values past `u32::MAX` saturate.
pub fn parse_quantity(text: &str) -> ParsedQuantity {
    const ZERO: ParsedQuantity = ParsedQuantity {
        value: 0,
        coerced: true,
    };

    let text = text.trim();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];
    if digits.is_empty() {
        return ZERO;
    }

    if negative {
        // "-0" parses to zero, which is not below zero
        let is_zero = digits.bytes().all(|b| b == b'0');
        return ParsedQuantity {
            value: 0,
            coerced: !is_zero,
        };
    }

    let value = digits.parse::<u32>().unwrap_or(u32::MAX);
    ParsedQuantity {
        value,
        coerced: false,
    }
}
