pub mod discount;
pub mod dispatch;
pub mod model;
pub mod totals;

pub use discount::{DiscountTable, NO_DISCOUNT, apply_discount_code};
pub use dispatch::{CONTAINER_ID, Control, Dispatcher, ElementTree, Markup, NodeId};
pub use model::{CartState, LineItem, Mutation, RowId, parse_quantity};
pub use totals::{RenderedLine, RenderedTotals, Totals, compute_totals, recompute};

/// Receives freshly recomputed totals after every handled event
pub trait RenderSink {
    fn render(&mut self, totals: &RenderedTotals);
}

impl<F> RenderSink for F
where
    F: FnMut(&RenderedTotals),
{
    fn render(&mut self, totals: &RenderedTotals) {
        self(totals)
    }
}

/// Outcome of an input event on a quantity field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputOutcome {
    pub row: RowId,
    pub quantity: u32,
    /// Replacement text for the field when the typed value was coerced
    pub replace_text: Option<String>,
}

/// Cart engine: owns the state, applies routed events and pushes the
/// recomputed totals to the sink.
pub struct Cart<S> {
    state: CartState,
    discounts: DiscountTable,
    sink: S,
}

impl<S: RenderSink> Cart<S> {
    pub fn new(state: CartState, discounts: DiscountTable, sink: S) -> Self {
        Cart {
            state,
            discounts,
            sink,
        }
    }

    pub fn state(&self) -> &CartState {
        &self.state
    }

    pub fn discounts(&self) -> &DiscountTable {
        &self.discounts
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Startup trigger: render the initial totals
    pub fn ready(&mut self) {
        self.render();
    }

    /// Apply a mutation and render if it did anything
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        let applied = self.state.apply(mutation);
        if applied {
            self.render();
        }
        applied
    }

    /// Delegated click handler. Returns true when the click changed the cart.
    pub fn click<T: ElementTree + ?Sized>(
        &mut self,
        dispatcher: &Dispatcher,
        tree: &T,
        target: NodeId,
    ) -> bool {
        match dispatcher.route_click(tree, target) {
            Some(mutation) => self.apply(mutation),
            None => false,
        }
    }

    /// Delegated input handler. Recognized quantity fields always trigger a
    /// render, even when the value did not change.
    pub fn input<T: ElementTree + ?Sized>(
        &mut self,
        dispatcher: &Dispatcher,
        tree: &T,
        target: NodeId,
        value: &str,
    ) -> Option<InputOutcome> {
        let input = dispatcher.route_input(tree, target, value)?;
        if !self.state.apply(input.mutation()) {
            tracing::debug!(row = %input.row, "quantity field for unknown row");
            return None;
        }
        self.render();

        Some(InputOutcome {
            row: input.row,
            quantity: input.parsed.value,
            replace_text: input.parsed.coerced.then(|| "0".to_string()),
        })
    }

    /// Discount form submission. Returns the factor now in effect.
    pub fn submit_discount(&mut self, code: &str) -> f64 {
        let factor = apply_discount_code(&self.discounts, code).unwrap_or(NO_DISCOUNT);
        self.state.set_discount_factor(factor);
        self.render();
        factor
    }

    pub fn totals(&self) -> Totals {
        compute_totals(&self.state)
    }

    fn render(&mut self) {
        let rendered = recompute(&self.state);
        self.sink.render(&rendered);
    }
}
