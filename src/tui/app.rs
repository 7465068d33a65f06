use crate::cart::discount::normalize_code;
use crate::cart::{
    Cart, CartState, Control, Dispatcher, ElementTree, Markup, NodeId, RenderSink, RenderedTotals,
    RowId,
};
use crate::config::Catalog;
use crate::error::{Error, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseButton, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, layout::Position, prelude::*};
use std::io::{self, stdout};
use std::time::Duration;

use super::ui;

/// Render sink for the terminal: keeps the latest totals for drawing
#[derive(Default)]
pub struct Display {
    totals: RenderedTotals,
    renders: u64,
}

impl RenderSink for Display {
    fn render(&mut self, totals: &RenderedTotals) {
        self.totals = totals.clone();
        self.renders += 1;
    }
}

impl Display {
    pub fn totals(&self) -> &RenderedTotals {
        &self.totals
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }
}

/// Which widget receives key presses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Table,
    Quantity(RowId),
    Discount,
}

/// Screen areas of rendered elements, filled in on every draw.
/// Children are registered after their parents, so the last hit is the
/// innermost element.
#[derive(Default)]
pub struct HitMap {
    regions: Vec<(NodeId, Rect)>,
}

impl HitMap {
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn register(&mut self, node: NodeId, area: Rect) {
        self.regions.push((node, area));
    }

    pub fn hit(&self, x: u16, y: u16) -> Option<NodeId> {
        let position = Position::new(x, y);
        self.regions
            .iter()
            .rev()
            .find(|(_, area)| area.contains(position))
            .map(|(node, _)| *node)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub ok: bool,
}

/// TUI application state
pub struct App {
    cart: Cart<Display>,
    markup: Markup,
    dispatcher: Dispatcher,
    hit_map: HitMap,
    rows: Vec<RowId>,
    running: bool,

    // Selection state
    selected_row: usize,
    scroll_offset: usize,
    visible_rows: usize,

    pub focus: Focus,
    quantity_text: String,
    discount_text: String,
    applied_code: Option<String>,
    notice: Option<Notice>,
}

impl App {
    pub fn new(catalog: &Catalog) -> Result<Self> {
        let state = catalog.to_state()?;
        let rows: Vec<RowId> = state.row_ids().collect();
        let markup = Markup::cart(rows.iter().copied());
        let dispatcher = Dispatcher::attach(&markup)
            .ok_or_else(|| Error::Config("cart layout has no row container".to_string()))?;

        Ok(App {
            cart: Cart::new(state, catalog.discounts.clone(), Display::default()),
            markup,
            dispatcher,
            hit_map: HitMap::default(),
            rows,
            running: true,
            selected_row: 0,
            scroll_offset: 0,
            visible_rows: 0,
            focus: Focus::Table,
            quantity_text: String::new(),
            discount_text: String::new(),
            applied_code: None,
            notice: None,
        })
    }

    /// Startup trigger: compute the first totals, then apply the startup
    /// code if one was given
    pub fn start(&mut self, code: Option<&str>) {
        self.cart.ready();
        if let Some(code) = code {
            self.discount_text = code.to_string();
            self.submit_discount();
        }
    }

    pub fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let mut needs_redraw = true;

        while self.running {
            if needs_redraw {
                terminal.draw(|frame| {
                    ui::render(frame, self);
                })?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(250))? {
                continue;
            }

            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                        needs_redraw = true;
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        self.handle_click(mouse.column, mouse.row);
                        needs_redraw = true;
                    }
                    MouseEventKind::ScrollUp => {
                        self.move_selection(-1);
                        needs_redraw = true;
                    }
                    MouseEventKind::ScrollDown => {
                        self.move_selection(1);
                        needs_redraw = true;
                    }
                    _ => {}
                },
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }

        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return;
        }

        match self.focus {
            Focus::Table => self.handle_table_key(key),
            Focus::Quantity(row) => self.handle_quantity_key(row, key),
            Focus::Discount => self.handle_discount_key(key),
        }
    }

    fn handle_table_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,

            // j/k or arrows - move selection
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('g') | KeyCode::Home => self.select(0),
            KeyCode::Char('G') | KeyCode::End => {
                self.select(self.rows.len().saturating_sub(1));
            }

            // Row controls, routed exactly like mouse clicks
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right => {
                self.press(Control::Increment);
            }
            KeyCode::Char('-') | KeyCode::Left => self.press(Control::Decrement),
            KeyCode::Char('x') | KeyCode::Delete => self.press(Control::Remove),

            // Quantity editing
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(row) = self.selected_row_id() {
                    self.begin_quantity_edit(row, None);
                }
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if let Some(row) = self.selected_row_id() {
                    self.begin_quantity_edit(row, Some(c));
                }
            }

            KeyCode::Char('d') | KeyCode::Char('/') | KeyCode::Tab => {
                self.focus = Focus::Discount;
            }
            _ => {}
        }
    }

    fn handle_quantity_key(&mut self, row: RowId, key: KeyCode) {
        match key {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Table,
            KeyCode::Up | KeyCode::Down => {
                self.focus = Focus::Table;
                self.move_selection(if key == KeyCode::Up { -1 } else { 1 });
            }
            KeyCode::Backspace => {
                self.quantity_text.pop();
                self.input_quantity(row);
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => {
                self.quantity_text.push(c);
                self.input_quantity(row);
            }
            _ => {}
        }
    }

    fn handle_discount_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Tab => self.focus = Focus::Table,
            // Submitting keeps the session; only the totals change
            KeyCode::Enter => self.submit_discount(),
            KeyCode::Backspace => {
                self.discount_text.pop();
            }
            KeyCode::Char(c) => self.discount_text.push(c),
            _ => {}
        }
    }

    /// Mouse click: select and focus by position, then hand the target to
    /// the delegated dispatcher
    pub fn handle_click(&mut self, x: u16, y: u16) {
        let Some(target) = self.hit_map.hit(x, y) else {
            self.focus = Focus::Table;
            return;
        };

        if let Some(row) = self.dispatcher.closest_row(&self.markup, target)
            && let Some(idx) = self.rows.iter().position(|r| *r == row)
        {
            self.selected_row = idx;
        }

        let element = self.markup.element_id(target).to_string();
        match (element.as_str(), Control::parse(&element)) {
            (_, Some((Control::Quantity, row))) => self.begin_quantity_edit(row, None),
            ("discount-code", _) => self.focus = Focus::Discount,
            ("discount-submit", _) => self.submit_discount(),
            _ => self.focus = Focus::Table,
        }

        self.cart.click(&self.dispatcher, &self.markup, target);
    }

    /// Synthesize a click on one of the selected row's controls
    fn press(&mut self, control: Control) {
        let Some(row) = self.selected_row_id() else {
            return;
        };
        if let Some(target) = self.markup.find(&control.element_id(row)) {
            self.cart.click(&self.dispatcher, &self.markup, target);
        }
    }

    fn begin_quantity_edit(&mut self, row: RowId, first: Option<char>) {
        self.focus = Focus::Quantity(row);
        match first {
            Some(c) => {
                self.quantity_text = c.to_string();
                self.input_quantity(row);
            }
            None => {
                self.quantity_text = self
                    .cart
                    .state()
                    .quantity(row)
                    .map(|q| q.to_string())
                    .unwrap_or_default();
            }
        }
    }

    fn input_quantity(&mut self, row: RowId) {
        let Some(target) = self.markup.find(&Control::Quantity.element_id(row)) else {
            return;
        };
        if let Some(outcome) =
            self.cart
                .input(&self.dispatcher, &self.markup, target, &self.quantity_text)
            && let Some(text) = outcome.replace_text
        {
            self.quantity_text = text;
        }
    }

    fn submit_discount(&mut self) {
        let code = normalize_code(&self.discount_text);
        let matched = self.cart.discounts().lookup(&code).is_some();
        let factor = self.cart.submit_discount(&code);
        if matched {
            let percent = ((1.0 - factor) * 100.0).round();
            self.notice = Some(Notice {
                text: format!("{} applied: {}% off", code, percent),
                ok: true,
            });
            self.applied_code = Some(code);
        } else {
            self.notice = Some(Notice {
                text: if code.is_empty() {
                    "Discount removed".to_string()
                } else {
                    format!("Invalid code: {}", code)
                },
                ok: false,
            });
            self.applied_code = None;
        }
    }

    /// Move table selection by delta rows (positive = down, negative = up)
    fn move_selection(&mut self, delta: i32) {
        let new_row = if delta >= 0 {
            self.selected_row.saturating_add(delta as usize)
        } else {
            self.selected_row.saturating_sub(delta.unsigned_abs() as usize)
        };
        self.select(new_row);
    }

    fn select(&mut self, row: usize) {
        self.selected_row = row.min(self.rows.len().saturating_sub(1));
        self.ensure_selection_visible();
    }

    /// Ensure the selected row is visible by adjusting scroll offset
    fn ensure_selection_visible(&mut self) {
        if self.visible_rows == 0 {
            return;
        }
        if self.selected_row < self.scroll_offset {
            self.scroll_offset = self.selected_row;
        } else if self.selected_row >= self.scroll_offset + self.visible_rows {
            self.scroll_offset = self.selected_row + 1 - self.visible_rows;
        }
    }

    fn selected_row_id(&self) -> Option<RowId> {
        self.rows.get(self.selected_row).copied()
    }

    pub fn state(&self) -> &CartState {
        self.cart.state()
    }

    pub fn totals(&self) -> &RenderedTotals {
        self.cart.sink().totals()
    }

    pub fn renders(&self) -> u64 {
        self.cart.sink().renders()
    }

    pub fn rows(&self) -> &[RowId] {
        &self.rows
    }

    pub fn markup(&self) -> &Markup {
        &self.markup
    }

    pub fn hit_map_mut(&mut self) -> &mut HitMap {
        &mut self.hit_map
    }

    pub fn selected_row(&self) -> usize {
        self.selected_row
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Called by the renderer with the number of rows that fit
    pub fn set_visible_rows(&mut self, rows: usize) {
        self.visible_rows = rows;
        let max_scroll = self.rows.len().saturating_sub(rows.max(1));
        self.scroll_offset = self.scroll_offset.min(max_scroll);
        self.ensure_selection_visible();
    }

    /// Text shown in a row's quantity field
    pub fn quantity_text(&self, row: RowId) -> String {
        if self.focus == Focus::Quantity(row) {
            return self.quantity_text.clone();
        }
        self.totals()
            .line(row)
            .map(|l| l.quantity.clone())
            .unwrap_or_default()
    }

    pub fn discount_text(&self) -> &str {
        &self.discount_text
    }

    pub fn applied_code(&self) -> Option<&str> {
        self.applied_code.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn app() -> App {
        let mut app = App::new(&Catalog::default()).unwrap();
        app.start(None);
        app
    }

    fn draw(app: &mut App) {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| ui::render(frame, app)).unwrap();
    }

    fn area_of(app: &App, element: &str) -> (u16, u16) {
        let node = app.markup.find(element).unwrap();
        let (_, area) = app
            .hit_map
            .regions
            .iter()
            .find(|(n, _)| *n == node)
            .copied()
            .unwrap();
        (area.x, area.y)
    }

    fn key(app: &mut App, code: KeyCode) {
        app.handle_key(code, KeyModifiers::NONE);
    }

    #[test]
    fn test_start_renders_totals() {
        let app = app();
        assert_eq!(app.renders(), 1);
        assert_eq!(app.totals().total, "72.60");
    }

    #[test]
    fn test_keys_route_through_dispatcher() {
        let mut app = app();
        key(&mut app, KeyCode::Char('+'));
        key(&mut app, KeyCode::Char('+'));
        assert_eq!(app.state().quantity(RowId(1)), Some(3));
        assert_eq!(app.totals().subtotal, "80.00");
        assert_eq!(app.totals().total, "96.80");

        key(&mut app, KeyCode::Down);
        key(&mut app, KeyCode::Char('x'));
        assert_eq!(app.state().quantity(RowId(2)), Some(0));
        let renders = app.renders();
        key(&mut app, KeyCode::Char('-'));
        assert_eq!(app.state().quantity(RowId(2)), Some(0));
        assert_eq!(app.renders(), renders);
    }

    #[test]
    fn test_quantity_editing() {
        let mut app = app();
        key(&mut app, KeyCode::Char('e'));
        assert_eq!(app.focus, Focus::Quantity(RowId(1)));
        key(&mut app, KeyCode::Backspace);
        // emptied field is forced back to 0
        assert_eq!(app.quantity_text(RowId(1)), "0");
        key(&mut app, KeyCode::Char('4'));
        assert_eq!(app.quantity_text(RowId(1)), "04");
        assert_eq!(app.state().quantity(RowId(1)), Some(4));
        key(&mut app, KeyCode::Enter);
        assert_eq!(app.focus, Focus::Table);
        assert_eq!(app.quantity_text(RowId(1)), "4");
        assert_eq!(app.totals().line(RowId(1)).unwrap().amount, "40.00");
    }

    #[test]
    fn test_negative_quantity_typed() {
        let mut app = app();
        app.focus = Focus::Quantity(RowId(1));
        app.quantity_text = "-".to_string();
        key(&mut app, KeyCode::Char('5'));
        assert_eq!(app.quantity_text(RowId(1)), "0");
        assert_eq!(app.state().quantity(RowId(1)), Some(0));
        assert_eq!(app.totals().line(RowId(1)).unwrap().amount, "0.00");
        assert_eq!(app.totals().subtotal, "50.00");
    }

    #[test]
    fn test_discount_form() {
        let mut app = app();
        key(&mut app, KeyCode::Char('d'));
        for c in "descuento10".chars() {
            key(&mut app, KeyCode::Char(c));
        }
        key(&mut app, KeyCode::Enter);
        assert!(app.is_running());
        assert_eq!(app.focus, Focus::Discount);
        assert_eq!(app.totals().total, "65.34");
        assert_eq!(app.applied_code(), Some("DESCUENTO10"));
        assert!(app.notice().unwrap().ok);

        for _ in 0.."descuento10".len() {
            key(&mut app, KeyCode::Backspace);
        }
        for c in "BOGUS".chars() {
            key(&mut app, KeyCode::Char(c));
        }
        key(&mut app, KeyCode::Enter);
        assert_eq!(app.totals().total, "72.60");
        assert_eq!(app.applied_code(), None);
        assert!(!app.notice().unwrap().ok);
    }

    #[test]
    fn test_full_price_code_is_accepted() {
        let mut catalog = Catalog::default();
        catalog.discounts.insert("STAFF", 1.0);
        let mut app = App::new(&catalog).unwrap();
        app.start(Some(" staff "));

        assert_eq!(app.totals().total, "72.60");
        assert_eq!(app.applied_code(), Some("STAFF"));
        let notice = app.notice().unwrap();
        assert!(notice.ok);
        assert_eq!(notice.text, "STAFF applied: 0% off");
    }

    #[test]
    fn test_startup_code() {
        let mut app = App::new(&Catalog::default()).unwrap();
        app.start(Some("descuento10"));
        assert_eq!(app.totals().total, "65.34");
        assert_eq!(app.renders(), 2);
    }

    #[test]
    fn test_mouse_clicks_on_controls() {
        let mut app = app();
        draw(&mut app);

        let (x, y) = area_of(&app, "inc-2");
        app.handle_click(x, y);
        assert_eq!(app.state().quantity(RowId(2)), Some(2));
        assert_eq!(app.selected_row(), 1);

        let (x, y) = area_of(&app, "remove-3");
        app.handle_click(x, y);
        assert_eq!(app.state().quantity(RowId(3)), Some(0));

        let (x, y) = area_of(&app, "qty-1");
        app.handle_click(x, y);
        assert_eq!(app.focus, Focus::Quantity(RowId(1)));
    }

    #[test]
    fn test_clicks_outside_rows_change_nothing() {
        let mut app = app();
        draw(&mut app);
        let renders = app.renders();
        let before = app.state().clone();

        for element in ["price-1", "amount-2", "name-3", "subtotal", "total"] {
            let (x, y) = area_of(&app, element);
            app.handle_click(x, y);
        }
        app.handle_click(0, 29);

        assert_eq!(app.state(), &before);
        assert_eq!(app.renders(), renders);
    }

    #[test]
    fn test_hit_map_prefers_innermost() {
        let mut map = HitMap::default();
        map.register(0, Rect::new(0, 0, 10, 10));
        map.register(1, Rect::new(2, 2, 3, 1));
        assert_eq!(map.hit(3, 2), Some(1));
        assert_eq!(map.hit(3, 5), Some(0));
        assert_eq!(map.hit(20, 20), None);
    }
}
