use crate::cart::{Cart, Control, Dispatcher, Markup, RenderedTotals, RowId};
use crate::cli::Action;
use crate::config::Catalog;
use crate::error::{Error, Result};
use comfy_table::{Cell, CellAlignment, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;

/// Cart after a headless replay
#[derive(Debug, Serialize)]
pub struct Receipt {
    pub lines: Vec<ReceiptLine>,
    pub subtotal: String,
    pub tax: String,
    pub discount: String,
    pub total: String,
    pub discount_factor: f64,
}

#[derive(Debug, Serialize)]
pub struct ReceiptLine {
    pub id: RowId,
    pub name: String,
    pub unit_price: String,
    pub quantity: String,
    pub amount: String,
}

pub fn run(
    catalog: &Catalog,
    actions: &[Action],
    code: Option<&str>,
    json: bool,
    csv: bool,
) -> Result<()> {
    let receipt = replay(catalog, actions, code)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
    } else if csv {
        print!("{}", format_csv(&receipt));
    } else {
        println!("{}", format_table(&receipt));
    }

    Ok(())
}

/// Build the cart from `catalog` and push every action through the
/// delegated dispatcher, then the startup code if any
pub fn replay(catalog: &Catalog, actions: &[Action], code: Option<&str>) -> Result<Receipt> {
    let markup = Markup::cart(catalog.row_ids());
    let dispatcher = Dispatcher::attach(&markup)
        .ok_or_else(|| Error::Config("cart layout has no row container".to_string()))?;

    let mut rendered = RenderedTotals::default();
    let mut cart = Cart::new(
        catalog.to_state()?,
        catalog.discounts.clone(),
        |totals: &RenderedTotals| rendered = totals.clone(),
    );
    cart.ready();

    for action in actions {
        match action {
            Action::Click(element) => {
                let target = markup
                    .find(element)
                    .ok_or_else(|| Error::InvalidAction(format!("click:{element}")))?;
                if !cart.click(&dispatcher, &markup, target) {
                    tracing::debug!(element = element.as_str(), "click had no effect");
                }
            }
            Action::Input { row, value } => {
                let field = Control::Quantity.element_id(*row);
                let target = markup
                    .find(&field)
                    .ok_or_else(|| Error::InvalidAction(format!("set:{row}={value}")))?;
                cart.input(&dispatcher, &markup, target, value);
            }
            Action::Code(code) => {
                cart.submit_discount(code);
            }
        }
    }
    if let Some(code) = code {
        cart.submit_discount(code);
    }

    let state = cart.state().clone();
    drop(cart);

    let lines = state
        .items()
        .iter()
        .map(|item| {
            let line = rendered.line(item.id());
            ReceiptLine {
                id: item.id(),
                name: item.name().to_string(),
                unit_price: crate::cart::totals::format_money(item.unit_price()),
                quantity: line.map(|l| l.quantity.clone()).unwrap_or_default(),
                amount: line.map(|l| l.amount.clone()).unwrap_or_default(),
            }
        })
        .collect();

    Ok(Receipt {
        lines,
        subtotal: rendered.subtotal,
        tax: rendered.tax,
        discount: rendered.discount,
        total: rendered.total,
        discount_factor: state.discount_factor(),
    })
}

pub fn format_table(receipt: &Receipt) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["ID", "ITEM", "PRICE", "QTY", "AMOUNT"]);

    for line in &receipt.lines {
        table.add_row(vec![
            Cell::new(line.id),
            Cell::new(&line.name),
            Cell::new(&line.unit_price).set_alignment(CellAlignment::Right),
            Cell::new(&line.quantity).set_alignment(CellAlignment::Right),
            Cell::new(&line.amount).set_alignment(CellAlignment::Right),
        ]);
    }

    let summary = [
        ("Subtotal", &receipt.subtotal),
        ("VAT 21%", &receipt.tax),
        ("Discount", &receipt.discount),
        ("Total", &receipt.total),
    ];
    for (label, value) in summary {
        table.add_row(vec![
            Cell::new(""),
            Cell::new(label),
            Cell::new(""),
            Cell::new(""),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }

    table.to_string()
}

pub fn format_csv(receipt: &Receipt) -> String {
    let mut out = String::from("id,name,unit_price,quantity,amount\n");
    for line in &receipt.lines {
        out.push_str(&format!(
            "{},\"{}\",{},{},{}\n",
            line.id,
            line.name.replace('"', "\"\""),
            line.unit_price,
            line.quantity,
            line.amount
        ));
    }
    out.push_str(&format!(",\"subtotal\",,,{}\n", receipt.subtotal));
    out.push_str(&format!(",\"tax\",,,{}\n", receipt.tax));
    out.push_str(&format!(",\"discount\",,,{}\n", receipt.discount));
    out.push_str(&format!(",\"total\",,,{}\n", receipt.total));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(list: &[&str]) -> Vec<Action> {
        list.iter().map(|a| a.parse().unwrap()).collect()
    }

    #[test]
    fn test_replay_defaults() {
        let receipt = replay(&Catalog::default(), &[], None).unwrap();
        assert_eq!(receipt.subtotal, "60.00");
        assert_eq!(receipt.tax, "12.60");
        assert_eq!(receipt.total, "72.60");
        assert_eq!(receipt.lines[0].unit_price, "10.00");
    }

    #[test]
    fn test_replay_actions_in_order() {
        let receipt = replay(
            &Catalog::default(),
            &actions(&["inc:1", "inc:1", "set:2=-5", "dec:3", "dec:3", "click:subtotal"]),
            Some("descuento10"),
        )
        .unwrap();
        assert_eq!(receipt.lines[0].quantity, "3");
        assert_eq!(receipt.lines[1].quantity, "0");
        assert_eq!(receipt.lines[2].quantity, "0");
        assert_eq!(receipt.subtotal, "30.00");
        assert_eq!(receipt.discount_factor, 0.90);
        assert_eq!(receipt.total, "32.67");
    }

    #[test]
    fn test_replay_unknown_element() {
        let err = replay(&Catalog::default(), &actions(&["inc:9"]), None).unwrap_err();
        assert!(matches!(err, Error::InvalidAction(_)));
        let err = replay(&Catalog::default(), &actions(&["set:9=1"]), None).unwrap_err();
        assert!(matches!(err, Error::InvalidAction(_)));
    }

    #[test]
    fn test_outputs() {
        let receipt = replay(&Catalog::default(), &actions(&["remove:2"]), None).unwrap();

        let csv = format_csv(&receipt);
        assert!(csv.starts_with("id,name,unit_price,quantity,amount\n"));
        assert!(csv.contains("2,\"Comfort mattress\",20.00,0,0.00\n"));
        assert!(csv.ends_with(",\"total\",,,48.40\n"));

        let table = format_table(&receipt);
        assert!(table.contains("Premium mattress"));
        assert!(table.contains("48.40"));

        let json: serde_json::Value = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["total"], "48.40");
        assert_eq!(json["lines"][1]["id"], 2);
    }
}
