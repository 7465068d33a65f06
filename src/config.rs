//! Catalog loading.
//!
//! The catalog is the initial data feed: row ids, names, unit prices and the
//! discount rule table. Prices are parsed once here and never again.

use crate::cart::discount::{DEFAULT_CODE, DEFAULT_FACTOR, normalize_code};
use crate::cart::{CartState, DiscountTable, LineItem, RowId};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<ItemEntry>,
    discounts: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemEntry {
    id: u32,
    name: Option<String>,
    price: PriceValue,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

/// Prices may be written as text ("10.00") or as a TOML number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Text(String),
    Number(f64),
}

fn default_quantity() -> u32 {
    1
}

/// Loaded catalog: the initial cart state plus discount rules
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    pub items: Vec<LineItem>,
    pub discounts: DiscountTable,
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            items: vec![
                LineItem::new(RowId(1), "Basic mattress", 10.00),
                LineItem::new(RowId(2), "Comfort mattress", 20.00),
                LineItem::new(RowId(3), "Premium mattress", 30.00),
            ],
            discounts: DiscountTable::default(),
        }
    }
}

impl Catalog {
    /// Load a catalog file, or the built-in catalog when `path` is None
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                let catalog = Catalog::from_toml(&content)?;
                tracing::debug!(
                    path = %path.display(),
                    items = catalog.items.len(),
                    codes = catalog.discounts.len(),
                    "catalog loaded"
                );
                Ok(catalog)
            }
            None => Ok(Catalog::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;

        if file.items.is_empty() {
            return Err(Error::Config("catalog has no items".to_string()));
        }

        let mut items = Vec::with_capacity(file.items.len());
        for entry in file.items {
            let price = match entry.price {
                PriceValue::Text(text) => {
                    parse_price(&text).ok_or(Error::InvalidPrice { id: entry.id, text })?
                }
                PriceValue::Number(n) if n.is_finite() && n >= 0.0 => n,
                PriceValue::Number(n) => {
                    return Err(Error::InvalidPrice {
                        id: entry.id,
                        text: n.to_string(),
                    });
                }
            };
            let name = entry.name.unwrap_or_else(|| format!("Item {}", entry.id));
            items.push(LineItem::new(RowId(entry.id), name, price).with_quantity(entry.quantity));
        }

        let discounts = match file.discounts {
            Some(rules) => {
                let mut table = DiscountTable::empty();
                for (code, factor) in rules {
                    if !(factor > 0.0 && factor <= 1.0) {
                        return Err(Error::InvalidDiscount { code, factor });
                    }
                    if code.trim().is_empty() {
                        tracing::warn!("ignoring empty discount code in catalog");
                        continue;
                    }
                    if table.lookup(&code).is_some() {
                        return Err(Error::Config(format!(
                            "discount code '{}' is listed more than once",
                            normalize_code(&code)
                        )));
                    }
                    table.insert(&code, factor);
                }
                table
            }
            None => {
                let mut table = DiscountTable::empty();
                table.insert(DEFAULT_CODE, DEFAULT_FACTOR);
                table
            }
        };

        let catalog = Catalog { items, discounts };
        // duplicate ids are reported here rather than when the cart starts
        catalog.to_state()?;
        Ok(catalog)
    }

    pub fn to_state(&self) -> Result<CartState> {
        CartState::new(self.items.clone())
    }

    pub fn row_ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.items.iter().map(LineItem::id)
    }
}

/// Parse the leading decimal number of a price text, e.g. "10.00",
/// " 7.5 EUR" or "3". Returns None for text without a leading number or with
/// a negative one.
pub fn parse_price(text: &str) -> Option<f64> {
    let text = text.trim();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+')) {
        end = 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }
    text[..end].parse::<f64>().ok().filter(|p| p.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("10.00"), Some(10.0));
        assert_eq!(parse_price(" 7.5 EUR"), Some(7.5));
        assert_eq!(parse_price("3"), Some(3.0));
        assert_eq!(parse_price(".5"), Some(0.5));
        assert_eq!(parse_price("4."), Some(4.0));
        assert_eq!(parse_price("+2.25"), Some(2.25));
        assert_eq!(parse_price("12.34.56"), Some(12.34));
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("EUR 5"), None);
        assert_eq!(parse_price("-3.00"), None);
        assert_eq!(parse_price("."), None);
    }

    #[test]
    fn test_default_catalog() {
        let catalog = Catalog::default();
        let state = catalog.to_state().unwrap();
        assert_eq!(state.items().len(), 3);
        assert!(state.items().iter().all(|i| i.quantity() == 1));
        assert_eq!(catalog.discounts.factor_for("DESCUENTO10"), 0.90);
    }

    #[test]
    fn test_from_toml() {
        let catalog = Catalog::from_toml(
            r#"
            [[items]]
            id = 7
            name = "Pillow"
            price = "4.50"
            quantity = 2

            [[items]]
            id = 8
            price = 12

            [discounts]
            half = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(catalog.items.len(), 2);
        assert_eq!(catalog.items[0].unit_price(), 4.5);
        assert_eq!(catalog.items[0].quantity(), 2);
        assert_eq!(catalog.items[1].name(), "Item 8");
        assert_eq!(catalog.items[1].quantity(), 1);
        assert_eq!(catalog.discounts.factor_for("HALF"), 0.5);
        assert_eq!(catalog.discounts.factor_for("DESCUENTO10"), 1.0);
    }

    #[test]
    fn test_full_price_rule_loads() {
        let catalog =
            Catalog::from_toml("[[items]]\nid = 1\nprice = 1\n[discounts]\nstaff = 1.0\n")
                .unwrap();
        assert_eq!(catalog.discounts.lookup("STAFF"), Some(1.0));
    }

    #[test]
    fn test_missing_discounts_uses_default_rule() {
        let catalog = Catalog::from_toml("[[items]]\nid = 1\nprice = \"1.00\"\n").unwrap();
        assert_eq!(catalog.discounts.factor_for("descuento10"), 0.90);
    }

    #[test]
    fn test_rejects_bad_catalogs() {
        assert!(matches!(
            Catalog::from_toml("items = []"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Catalog::from_toml("[[items]]\nid = 1\nprice = \"free\"\n"),
            Err(Error::InvalidPrice { id: 1, .. })
        ));
        assert!(matches!(
            Catalog::from_toml("[[items]]\nid = 1\nprice = -2.0\n"),
            Err(Error::InvalidPrice { id: 1, .. })
        ));
        assert!(matches!(
            Catalog::from_toml(
                "[[items]]\nid = 1\nprice = 1\n[[items]]\nid = 1\nprice = 2\n"
            ),
            Err(Error::DuplicateItem(1))
        ));
        assert!(matches!(
            Catalog::from_toml("[[items]]\nid = 1\nprice = 1\n[discounts]\nX = 1.5\n"),
            Err(Error::InvalidDiscount { .. })
        ));
        assert!(matches!(
            Catalog::from_toml(
                "[[items]]\nid = 1\nprice = 1\n[discounts]\nhalf = 0.5\n\" HALF\" = 0.4\n"
            ),
            Err(Error::Config(msg)) if msg.contains("HALF")
        ));
        assert!(matches!(
            Catalog::from_toml("[[items]]\nid = 1\nprice = 1\ncolour = \"red\"\n"),
            Err(Error::Toml(_))
        ));
    }
}
