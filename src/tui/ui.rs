use super::app::{App, Focus};
use crate::cart::{Control, RowId};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

const COLUMN_WIDTHS: [Constraint; 7] = [
    Constraint::Fill(1),    // Name (expand)
    Constraint::Length(9),  // Price
    Constraint::Length(3),  // [-]
    Constraint::Length(5),  // Quantity field
    Constraint::Length(3),  // [+]
    Constraint::Length(10), // Amount
    Constraint::Length(3),  // [x]
];

pub fn render(frame: &mut Frame, app: &mut App) {
    app.hit_map_mut().clear();
    register(app, "cart", frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header (single line, no border)
            Constraint::Min(8),    // Main content
            Constraint::Length(1), // Footer (single line, no border)
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_main_content(frame, app, chunks[1]);
    render_footer(frame, app, chunks[2]);
}

fn register(app: &mut App, element: &str, area: Rect) {
    if let Some(node) = app.markup().find(element) {
        app.hit_map_mut().register(node, area);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let units: u64 = app
        .state()
        .items()
        .iter()
        .map(|i| u64::from(i.quantity()))
        .sum();

    let mut spans = vec![
        Span::styled(
            "rscart",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(" CART ", Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(format!(
            " {} items │ {} units",
            app.rows().len(),
            units
        )),
    ];
    if let Some(code) = app.applied_code() {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            format!(" {} ", code),
            Style::default().bg(Color::Green).fg(Color::Black),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_main_content(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::horizontal([Constraint::Fill(1), Constraint::Length(32)]).split(area);
    render_cart_table(frame, app, chunks[0]);

    let side = Layout::vertical([
        Constraint::Length(6), // Totals: border + 4 lines
        Constraint::Length(4), // Discount form: border + 2 lines
        Constraint::Min(0),
    ])
    .split(chunks[1]);
    render_totals(frame, app, side[0]);
    render_discount_form(frame, app, side[1]);
}

fn render_cart_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let border_color = if matches!(app.focus, Focus::Table | Focus::Quantity(_)) {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .title(" Cart ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 2 || inner.width < 20 {
        return;
    }

    // Header labels
    let header_area = Rect { height: 1, ..inner };
    let header_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let labels = ["Item", "Price", "", "Qty", "", "Amount", ""];
    let columns = split_columns(header_area);
    for (i, label) in labels.iter().enumerate() {
        let alignment = if i == 0 {
            Alignment::Left
        } else {
            Alignment::Right
        };
        frame.render_widget(
            Paragraph::new(*label)
                .style(header_style)
                .alignment(alignment),
            columns[i],
        );
    }

    // Row container
    let body = Rect {
        y: inner.y + 1,
        height: inner.height - 1,
        ..inner
    };
    register(app, crate::cart::CONTAINER_ID, body);

    let visible = body.height as usize;
    app.set_visible_rows(visible);
    let scroll_offset = app.scroll_offset();
    let selected = app.selected_row();
    let rows: Vec<RowId> = app.rows().to_vec();

    for (i, row) in rows
        .iter()
        .copied()
        .enumerate()
        .skip(scroll_offset)
        .take(visible)
    {
        let row_area = Rect {
            y: body.y + (i - scroll_offset) as u16,
            height: 1,
            ..body
        };
        render_row(frame, app, row, row_area, i == selected);
    }
}

fn split_columns(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::horizontal(COLUMN_WIDTHS).spacing(1).split(area)
}

fn render_row(frame: &mut Frame, app: &mut App, row: RowId, area: Rect, selected: bool) {
    register(app, &format!("row-{}", row), area);

    let row_style = if selected {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    };
    frame.render_widget(Paragraph::new("").style(row_style), area);

    let Some(item) = app.state().item(row).cloned() else {
        return;
    };
    let amount = app
        .totals()
        .line(row)
        .map(|l| l.amount.clone())
        .unwrap_or_default();
    let quantity = app.quantity_text(row);
    let editing = app.focus == Focus::Quantity(row);

    let columns = split_columns(area);
    let button = |label: &'static str, color: Color| {
        Paragraph::new(label).style(row_style.fg(color).add_modifier(Modifier::BOLD))
    };
    let field_style = if editing {
        Style::default()
            .bg(Color::Cyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        row_style.add_modifier(Modifier::UNDERLINED)
    };

    let cells = [
        (
            format!("name-{}", row),
            Paragraph::new(item.name().to_string()).style(row_style),
        ),
        (
            format!("price-{}", row),
            Paragraph::new(crate::cart::totals::format_money(item.unit_price()))
                .style(row_style)
                .alignment(Alignment::Right),
        ),
        (
            Control::Decrement.element_id(row),
            button("[-]", Color::Yellow),
        ),
        (
            Control::Quantity.element_id(row),
            Paragraph::new(quantity)
                .style(field_style)
                .alignment(Alignment::Right),
        ),
        (
            Control::Increment.element_id(row),
            button("[+]", Color::Green),
        ),
        (
            format!("amount-{}", row),
            Paragraph::new(amount)
                .style(row_style.fg(Color::White))
                .alignment(Alignment::Right),
        ),
        (Control::Remove.element_id(row), button("[x]", Color::Red)),
    ];

    for ((element, widget), cell_area) in cells.into_iter().zip(columns.iter().copied()) {
        register(app, &element, cell_area);
        frame.render_widget(widget, cell_area);
    }
}

fn render_totals(frame: &mut Frame, app: &mut App, area: Rect) {
    register(app, "cart-totals", area);
    let block = Block::default()
        .title(" Totals ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let totals = app.totals().clone();
    let lines = [
        ("subtotal", "Subtotal", totals.subtotal, Style::default()),
        ("tax", "VAT 21%", totals.tax, Style::default()),
        (
            "discount",
            "Discount",
            totals.discount,
            Style::default().fg(Color::Green),
        ),
        (
            "total",
            "Total",
            totals.total,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    for (i, (element, label, value, style)) in lines.into_iter().enumerate() {
        if i as u16 >= inner.height {
            break;
        }
        let line_area = Rect {
            y: inner.y + i as u16,
            height: 1,
            ..inner
        };
        register(app, element, line_area);
        let halves =
            Layout::horizontal([Constraint::Fill(1), Constraint::Length(12)]).split(line_area);
        frame.render_widget(Paragraph::new(label).style(style), halves[0]);
        frame.render_widget(
            Paragraph::new(value).style(style).alignment(Alignment::Right),
            halves[1],
        );
    }
}

fn render_discount_form(frame: &mut Frame, app: &mut App, area: Rect) {
    register(app, "discount-form", area);
    let focused = app.focus == Focus::Discount;
    let block = Block::default()
        .title(" Discount code ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused {
            Color::Cyan
        } else {
            Color::DarkGray
        }));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 {
        return;
    }

    let line_area = Rect { height: 1, ..inner };
    let parts = Layout::horizontal([Constraint::Fill(1), Constraint::Length(9)])
        .spacing(1)
        .split(line_area);

    let mut text = app.discount_text().to_string();
    if focused {
        text.push('▏');
    }
    let input_style = if focused {
        Style::default().fg(Color::White).add_modifier(Modifier::UNDERLINED)
    } else {
        Style::default().fg(Color::Gray).add_modifier(Modifier::UNDERLINED)
    };
    register(app, "discount-code", parts[0]);
    frame.render_widget(Paragraph::new(text).style(input_style), parts[0]);

    register(app, "discount-submit", parts[1]);
    frame.render_widget(
        Paragraph::new("[ Apply ]").style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        parts[1],
    );

    if inner.height > 1 {
        let status_area = Rect {
            y: inner.y + 1,
            height: 1,
            ..inner
        };
        let status = match app.notice() {
            Some(notice) => Span::styled(
                notice.text.clone(),
                Style::default().fg(if notice.ok { Color::Green } else { Color::Red }),
            ),
            None => Span::styled("Enter to apply", Style::default().fg(Color::DarkGray)),
        };
        frame.render_widget(Paragraph::new(Line::from(status)), status_area);
    }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let help = match app.focus {
        Focus::Table => " j/k:select  +/-:qty  x:remove  e/0-9:edit  d:discount  q:quit",
        Focus::Quantity(_) => " 0-9:type  Backspace:delete  Enter/Esc:done",
        Focus::Discount => " type code  Enter:apply  Esc:back",
    };
    let footer = Paragraph::new(Line::from(Span::styled(
        help,
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(footer, area);
}
