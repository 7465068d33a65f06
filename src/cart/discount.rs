use std::collections::BTreeMap;

/// Factor used when no code matches
pub const NO_DISCOUNT: f64 = 1.0;

pub const DEFAULT_CODE: &str = "DESCUENTO10";
pub const DEFAULT_FACTOR: f64 = 0.90;

/// Discount codes and the factor each one applies to the total.
/// Codes are stored trimmed and uppercased.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscountTable {
    rules: BTreeMap<String, f64>,
}

impl Default for DiscountTable {
    fn default() -> Self {
        let mut table = DiscountTable::empty();
        table.insert(DEFAULT_CODE, DEFAULT_FACTOR);
        table
    }
}

impl DiscountTable {
    pub fn empty() -> Self {
        DiscountTable {
            rules: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, code: &str, factor: f64) {
        self.rules.insert(normalize_code(code), factor);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rules.iter().map(|(code, &factor)| (code.as_str(), factor))
    }

    /// Factor of a configured code, or None when the code has no rule
    pub fn lookup(&self, code: &str) -> Option<f64> {
        self.rules.get(&normalize_code(code)).copied()
    }

    /// Resolve a raw user-entered code. Unknown and empty codes give
    /// [`NO_DISCOUNT`]; this never fails.
    pub fn factor_for(&self, code: &str) -> f64 {
        self.lookup(code).unwrap_or(NO_DISCOUNT)
    }
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Look up a submitted code and log the outcome. Returns the matched
/// factor, or None when the code has no rule.
pub fn apply_discount_code(table: &DiscountTable, code: &str) -> Option<f64> {
    let matched = table.lookup(code);
    match matched {
        Some(factor) => tracing::info!(
            code = %normalize_code(code),
            percent = ((1.0 - factor) * 100.0).round(),
            "discount applied"
        ),
        None => tracing::info!(code = %code.trim(), "invalid discount code"),
    }
    matched
}
