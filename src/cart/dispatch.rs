//! Delegated event routing.
//!
//! One [`Dispatcher`] is attached to the row container. Every click and input
//! event raised anywhere below it is resolved to a row by walking up the
//! element tree, and to an action by matching the element identifier against
//! the row's control identifiers. The UI layer only has to expose its
//! elements through [`ElementTree`].

use super::model::{Mutation, ParsedQuantity, RowId, parse_quantity};

/// Index of an element in an [`ElementTree`]
pub type NodeId = usize;

/// Identifier of the element that holds all cart rows
pub const CONTAINER_ID: &str = "cart-body";

/// Read-only view of the UI's element hierarchy
pub trait ElementTree {
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn element_id(&self, node: NodeId) -> &str;

    /// Row data attribute. Only row elements carry one.
    fn row_id(&self, node: NodeId) -> Option<RowId>;
}

/// Per-row control roles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Decrement,
    Quantity,
    Increment,
    Remove,
}

impl Control {
    pub const ALL: [Control; 4] = [
        Control::Decrement,
        Control::Quantity,
        Control::Increment,
        Control::Remove,
    ];

    fn prefix(self) -> &'static str {
        match self {
            Control::Decrement => "dec-",
            Control::Quantity => "qty-",
            Control::Increment => "inc-",
            Control::Remove => "remove-",
        }
    }

    /// Element identifier of this control in `row`
    pub fn element_id(self, row: RowId) -> String {
        format!("{}{}", self.prefix(), row)
    }

    /// Split an element identifier into role and row, e.g. `qty-2`
    pub fn parse(element_id: &str) -> Option<(Control, RowId)> {
        Control::ALL.into_iter().find_map(|control| {
            let row = element_id.strip_prefix(control.prefix())?.parse().ok()?;
            Some((control, row))
        })
    }
}

/// Identifier of the row element for `row`
pub fn row_element_id(row: RowId) -> String {
    format!("row-{}", row)
}

/// A quantity field edit resolved to its row
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuantityInput {
    pub row: RowId,
    pub parsed: ParsedQuantity,
}

impl QuantityInput {
    pub fn mutation(&self) -> Mutation {
        Mutation::SetQuantity(self.row, self.parsed.value)
    }
}

/// The single delegated listener bound to the row container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dispatcher {
    container: NodeId,
}

impl Dispatcher {
    pub fn new(container: NodeId) -> Self {
        Dispatcher { container }
    }

    /// Attach to the element named [`CONTAINER_ID`]
    pub fn attach(markup: &Markup) -> Option<Self> {
        markup.find(CONTAINER_ID).map(Dispatcher::new)
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Whether an event raised on `target` reaches the container
    pub fn receives<T: ElementTree + ?Sized>(&self, tree: &T, target: NodeId) -> bool {
        ancestors(tree, target).any(|node| node == self.container)
    }

    /// Nearest row at or above `target`, below the container
    pub fn closest_row<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        target: NodeId,
    ) -> Option<RowId> {
        for node in ancestors(tree, target) {
            if node == self.container {
                return None;
            }
            if let Some(row) = tree.row_id(node) {
                return Some(row);
            }
        }
        None
    }

    /// Resolve a click to a quantity change, or None when it should be
    /// ignored
    pub fn route_click<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        target: NodeId,
    ) -> Option<Mutation> {
        if !self.receives(tree, target) {
            return None;
        }
        let Some(row) = self.closest_row(tree, target) else {
            tracing::debug!(
                element = tree.element_id(target),
                "click outside any row"
            );
            return None;
        };

        let element = tree.element_id(target);
        let mutation = if element == Control::Increment.element_id(row) {
            Mutation::Increment(row)
        } else if element == Control::Decrement.element_id(row) {
            Mutation::Decrement(row)
        } else if element == Control::Remove.element_id(row) {
            Mutation::Remove(row)
        } else {
            tracing::debug!(element, %row, "click on non-actionable element");
            return None;
        };

        tracing::debug!(?mutation, "click routed");
        Some(mutation)
    }

    /// Resolve an input event on a quantity field. Fields are recognized by
    /// their `qty-<id>` name alone.
    pub fn route_input<T: ElementTree + ?Sized>(
        &self,
        tree: &T,
        target: NodeId,
        value: &str,
    ) -> Option<QuantityInput> {
        if !self.receives(tree, target) {
            return None;
        }
        let element = tree.element_id(target);
        let Some((Control::Quantity, row)) = Control::parse(element) else {
            tracing::debug!(element, "input from a non-quantity field");
            return None;
        };

        let parsed = parse_quantity(value);
        if parsed.coerced {
            tracing::debug!(%row, value, "quantity coerced to 0");
        }
        Some(QuantityInput { row, parsed })
    }
}

fn ancestors<T: ElementTree + ?Sized>(
    tree: &T,
    start: NodeId,
) -> impl Iterator<Item = NodeId> + '_ {
    std::iter::successors(Some(start), move |&node| tree.parent(node))
}

#[derive(Clone, Debug)]
struct Element {
    id: String,
    parent: Option<NodeId>,
    row: Option<RowId>,
}

/// In-memory element tree for the cart layout
#[derive(Clone, Debug, Default)]
pub struct Markup {
    elements: Vec<Element>,
}

impl Markup {
    pub fn new() -> Self {
        Markup::default()
    }

    /// Build the standard cart layout: a root holding the row container,
    /// one row per id with its cells and controls, the totals block and the
    /// discount form.
    pub fn cart<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = RowId>,
    {
        let mut markup = Markup::new();
        let root = markup.push(None, "cart", None);
        let body = markup.push(Some(root), CONTAINER_ID, None);

        for row in rows {
            let row_node = markup.push(Some(body), row_element_id(row), Some(row));
            markup.push(Some(row_node), format!("name-{}", row), None);
            markup.push(Some(row_node), format!("price-{}", row), None);
            for control in Control::ALL {
                markup.push(Some(row_node), control.element_id(row), None);
            }
            markup.push(Some(row_node), format!("amount-{}", row), None);
        }

        let totals = markup.push(Some(root), "cart-totals", None);
        for id in ["subtotal", "tax", "discount", "total"] {
            markup.push(Some(totals), id, None);
        }
        let form = markup.push(Some(root), "discount-form", None);
        markup.push(Some(form), "discount-code", None);
        markup.push(Some(form), "discount-submit", None);

        markup
    }

    pub fn push(
        &mut self,
        parent: Option<NodeId>,
        id: impl Into<String>,
        row: Option<RowId>,
    ) -> NodeId {
        self.elements.push(Element {
            id: id.into(),
            parent,
            row,
        });
        self.elements.len() - 1
    }

    pub fn find(&self, element_id: &str) -> Option<NodeId> {
        self.elements.iter().position(|e| e.id == element_id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl ElementTree for Markup {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.elements.get(node).and_then(|e| e.parent)
    }

    fn element_id(&self, node: NodeId) -> &str {
        self.elements.get(node).map(|e| e.id.as_str()).unwrap_or("")
    }

    fn row_id(&self, node: NodeId) -> Option<RowId> {
        self.elements.get(node).and_then(|e| e.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Markup, Dispatcher) {
        let markup = Markup::cart([RowId(1), RowId(2), RowId(3)]);
        let dispatcher = Dispatcher::attach(&markup).unwrap();
        (markup, dispatcher)
    }

    fn node(markup: &Markup, id: &str) -> NodeId {
        markup.find(id).unwrap()
    }

    #[test]
    fn test_control_ids() {
        assert_eq!(Control::Increment.element_id(RowId(3)), "inc-3");
        assert_eq!(Control::parse("remove-12"), Some((Control::Remove, RowId(12))));
        assert_eq!(Control::parse("qty-2"), Some((Control::Quantity, RowId(2))));
        assert_eq!(Control::parse("qty-"), None);
        assert_eq!(Control::parse("amount-2"), None);
    }

    #[test]
    fn test_click_routes_controls() {
        let (markup, dispatcher) = setup();
        assert_eq!(
            dispatcher.route_click(&markup, node(&markup, "inc-2")),
            Some(Mutation::Increment(RowId(2)))
        );
        assert_eq!(
            dispatcher.route_click(&markup, node(&markup, "dec-1")),
            Some(Mutation::Decrement(RowId(1)))
        );
        assert_eq!(
            dispatcher.route_click(&markup, node(&markup, "remove-3")),
            Some(Mutation::Remove(RowId(3)))
        );
    }

    #[test]
    fn test_click_ignores_non_controls() {
        let (markup, dispatcher) = setup();
        for id in ["cart-body", "row-1", "price-1", "qty-1", "amount-2", "subtotal", "cart"] {
            assert_eq!(dispatcher.route_click(&markup, node(&markup, id)), None, "{id}");
        }
    }

    #[test]
    fn test_click_control_in_wrong_row_is_ignored() {
        let mut markup = Markup::cart([RowId(1), RowId(2)]);
        let row_two = node(&markup, "row-2");
        // a stray control whose id names row 1 but sits in row 2
        let stray = markup.push(Some(row_two), "inc-1", None);
        let dispatcher = Dispatcher::attach(&markup).unwrap();
        assert_eq!(dispatcher.route_click(&markup, stray), None);
    }

    #[test]
    fn test_row_lookup_stops_at_container() {
        let mut markup = Markup::new();
        let outer_row = markup.push(None, "row-9", Some(RowId(9)));
        let body = markup.push(Some(outer_row), CONTAINER_ID, None);
        let button = markup.push(Some(body), "inc-9", None);
        let dispatcher = Dispatcher::attach(&markup).unwrap();

        assert_eq!(dispatcher.closest_row(&markup, button), None);
        assert_eq!(dispatcher.route_click(&markup, button), None);
    }

    #[test]
    fn test_input_routing() {
        let (markup, dispatcher) = setup();
        let qty = node(&markup, "qty-2");

        let input = dispatcher.route_input(&markup, qty, "5").unwrap();
        assert_eq!(input.row, RowId(2));
        assert_eq!(input.mutation(), Mutation::SetQuantity(RowId(2), 5));

        let input = dispatcher.route_input(&markup, qty, "-5").unwrap();
        assert!(input.parsed.coerced);
        assert_eq!(input.mutation(), Mutation::SetQuantity(RowId(2), 0));

        assert_eq!(dispatcher.route_input(&markup, node(&markup, "inc-2"), "5"), None);
        assert_eq!(
            dispatcher.route_input(&markup, node(&markup, "discount-code"), "5"),
            None
        );
    }
}
