use super::model::{CartState, RowId};
use serde::Serialize;

/// Fixed VAT rate applied to the subtotal
pub const TAX_RATE: f64 = 0.21;

/// Full-precision totals. Nothing here is rounded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Totals {
    pub lines: Vec<LineTotal>,
    pub subtotal: f64,
    pub tax: f64,
    pub total_before_discount: f64,
    pub discount_amount: f64,
    pub final_total: f64,
    pub discount_factor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineTotal {
    pub id: RowId,
    pub quantity: u32,
    pub amount: f64,
}

/// Display strings pushed to the render sink, two decimals each
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderedTotals {
    pub lines: Vec<RenderedLine>,
    pub subtotal: String,
    pub tax: String,
    pub discount: String,
    pub total: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedLine {
    pub id: RowId,
    pub quantity: String,
    pub amount: String,
}

impl RenderedTotals {
    pub fn line(&self, id: RowId) -> Option<&RenderedLine> {
        self.lines.iter().find(|l| l.id == id)
    }
}

/// Derive every amount from the line items and discount factor.
///
/// Line amounts are summed unrounded; rounding only happens in
/// [`Totals::render`]. The discount amount and the final total are both taken
/// from the pre-discount total rather than one from the other.
pub fn compute_totals(state: &CartState) -> Totals {
    let lines: Vec<LineTotal> = state
        .items()
        .iter()
        .map(|item| LineTotal {
            id: item.id(),
            quantity: item.quantity(),
            amount: item.amount(),
        })
        .collect();

    let factor = state.discount_factor();
    let subtotal: f64 = lines.iter().map(|l| l.amount).sum();
    let tax = subtotal * TAX_RATE;
    let total_before_discount = subtotal + tax;

    Totals {
        lines,
        subtotal,
        tax,
        total_before_discount,
        discount_amount: total_before_discount * (1.0 - factor),
        final_total: total_before_discount * factor,
        discount_factor: factor,
    }
}

/// Recompute and format in one step
pub fn recompute(state: &CartState) -> RenderedTotals {
    compute_totals(state).render()
}

impl Totals {
    pub fn render(&self) -> RenderedTotals {
        RenderedTotals {
            lines: self
                .lines
                .iter()
                .map(|l| RenderedLine {
                    id: l.id,
                    quantity: l.quantity.to_string(),
                    amount: format_money(l.amount),
                })
                .collect(),
            subtotal: format_money(self.subtotal),
            tax: format_money(self.tax),
            discount: format_money(self.discount_amount),
            total: format_money(self.final_total),
        }
    }
}

/// Fixed two-decimal display. Exact ties round up, as [`round2`] does.
pub fn format_money(value: f64) -> String {
    let s = format!("{:.2}", round2(value));
    // -0.00 shows up when a tiny negative rounds away
    if s.starts_with('-') && s[1..].bytes().all(|b| b == b'0' || b == b'.') {
        s[1..].to_string()
    } else {
        s
    }
}

/// Round to two decimals, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
