use std::io::Write;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{Clear, ClearType};
use nrs_core::app_state::{
    AppMode, RenderSnapshot, VisibleEntry, MIN_TERMINAL_HEIGHT, MIN_TERMINAL_WIDTH,
};
use nrs_core::error::Result;

use super::colors::Palette;
use super::types::{grid_rows, ViewportState, HEADER_ROWS};

const LEFT_PADDING: usize = 2;

/// Key bindings shown on the help screen.
pub const HELP_LINES: [(&str, &str); 18] = [
    ("enter", "Run the selected script"),
    ("1-9", "Run the script with that number"),
    ("arrows / hjkl", "Move the cursor"),
    ("g / G", "Jump to the first or last script"),
    ("/ or any letter", "Filter scripts"),
    ("esc", "Leave the filter or multi-select"),
    ("A", "Type arguments, then run the selected script"),
    ("m", "Multi-select scripts to run in order"),
    ("space", "Toggle a script in multi-select"),
    ("a", "Show lifecycle scripts (all, in multi-select)"),
    ("n", "Clear the multi-select"),
    ("s", "Cycle sort: recent, alpha, category"),
    ("r", "Rerun the last script"),
    ("R", "Reload package.json"),
    ("w", "Switch between monorepo packages"),
    ("?", "Show this help"),
    ("q", "Quit"),
    ("ctrl+c", "Quit from anywhere"),
];

/// Cuts `text` to at most `width` characters.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 1 {
        return text.chars().take(width).collect();
    }
    let mut cut: String = text.chars().take(width - 1).collect();
    cut.push('~');
    cut
}

/// Pads or cuts `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    format!("{:<width$}", truncate(text, width))
}

/// The text of one grid cell. Only the first nine get a number since only
/// they have a quick-select key.
pub fn cell_label(entry: &VisibleEntry, multi_select: bool) -> String {
    let number = if entry.position <= 9 {
        format!("[{}]", entry.position)
    } else {
        "   ".to_string()
    };
    if multi_select {
        let mark = if entry.marked { '*' } else { ' ' };
        format!("{mark}{number} {}", entry.name)
    } else {
        format!("{number} {}", entry.name)
    }
}

/// Footer text: the query while filtering, key hints otherwise.
pub fn footer_text(snapshot: &RenderSnapshot) -> String {
    match &snapshot.mode {
        AppMode::Filter { query } => format!("Filter: {query}"),
        AppMode::MultiSelect { .. } => format!(
            "space: toggle  a: all  n: none  enter: run  esc: back   |   {}",
            snapshot.status
        ),
        AppMode::Args { input, .. } => format!("Args: {input}"),
        AppMode::WorkspaceSelect { .. } => format!(
            "enter: open  1-9: pick  esc: back   |   {}",
            snapshot.status
        ),
        AppMode::Help | AppMode::Error { .. } => snapshot.status.clone(),
        AppMode::Normal => format!(
            "enter: run  /: filter  m: multi  s: sort  ?: help  q: quit   |   {}",
            snapshot.status
        ),
    }
}

fn set_colors(
    out: &mut impl Write,
    foreground: Option<Color>,
    background: Option<Color>,
) -> Result<()> {
    if let Some(color) = foreground {
        queue!(out, SetForegroundColor(color))?;
    }
    if let Some(color) = background {
        queue!(out, SetBackgroundColor(color))?;
    }
    Ok(())
}

fn reset_style(out: &mut impl Write) -> Result<()> {
    queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
    Ok(())
}

fn print_header(
    out: &mut impl Write,
    snapshot: &RenderSnapshot,
    palette: &Palette,
    width: usize,
) -> Result<()> {
    let text = format!("{}{}", " ".repeat(LEFT_PADDING), snapshot.header);

    queue!(out, MoveTo(0, 0))?;
    set_colors(out, palette.header_foreground, palette.header_background)?;
    queue!(out, SetAttribute(Attribute::Bold), Print(fit(&text, width)))?;
    reset_style(out)
}

fn print_cell(
    out: &mut impl Write,
    entry: &VisibleEntry,
    is_selected: bool,
    multi_select: bool,
    palette: &Palette,
    cell_width: usize,
) -> Result<()> {
    let marker = if palette.selection_marker {
        if is_selected {
            "> "
        } else {
            "  "
        }
    } else {
        ""
    };
    let label = format!("{marker}{}", cell_label(entry, multi_select));
    // One column of space between cells.
    let content = fit(&label, cell_width.saturating_sub(1));

    if is_selected {
        if palette.bold_selection {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        set_colors(out, palette.selected_foreground, palette.selected_background)?;
    } else if entry.marked {
        set_colors(out, palette.marked_foreground, None)?;
    } else if entry.is_lifecycle {
        set_colors(out, palette.lifecycle_foreground, None)?;
    }

    queue!(out, Print(content))?;
    reset_style(out)?;
    queue!(out, Print(" "))?;
    Ok(())
}

fn print_grid(
    out: &mut impl Write,
    snapshot: &RenderSnapshot,
    palette: &Palette,
    viewport: &mut ViewportState,
) -> Result<()> {
    let width = usize::from(viewport.width);
    if snapshot.entries.is_empty() {
        queue!(out, MoveTo(0, HEADER_ROWS))?;
        set_colors(out, palette.error_foreground, None)?;
        queue!(out, Print(fit("No matching scripts!", width)))?;
        return reset_style(out);
    }

    let columns = snapshot.column_count.max(1);
    let cell_width = (width / columns).max(1);
    let total_rows = grid_rows(snapshot.entries.len(), columns);
    let selected_row = snapshot.selected.unwrap_or(0) / columns;
    viewport.scroll_into_view(selected_row, total_rows);

    let multi_select = matches!(snapshot.mode, AppMode::MultiSelect { .. });
    let rows = snapshot
        .entries
        .chunks(columns)
        .enumerate()
        .skip(viewport.offset)
        .take(viewport.body_rows());

    for (screen_row, (grid_row, cells)) in rows.enumerate() {
        let y = HEADER_ROWS + u16::try_from(screen_row).unwrap_or(u16::MAX);
        queue!(out, MoveTo(0, y))?;
        for (column, entry) in cells.iter().enumerate() {
            let is_selected = snapshot.selected == Some(grid_row * columns + column);
            print_cell(out, entry, is_selected, multi_select, palette, cell_width)?;
        }
    }
    Ok(())
}

fn print_workspaces(
    out: &mut impl Write,
    snapshot: &RenderSnapshot,
    cursor: usize,
    palette: &Palette,
    viewport: &mut ViewportState,
) -> Result<()> {
    let width = usize::from(viewport.width);
    let choices = &snapshot.workspace_choices;
    viewport.scroll_into_view(cursor, choices.len());

    let rows = choices
        .iter()
        .enumerate()
        .skip(viewport.offset)
        .take(viewport.body_rows());
    for (screen_row, (i, label)) in rows.enumerate() {
        let y = HEADER_ROWS + u16::try_from(screen_row).unwrap_or(u16::MAX);
        let number = if i < 9 {
            format!("[{}]", i + 1)
        } else {
            "   ".to_string()
        };
        let line = format!("{}{number} {label}", " ".repeat(LEFT_PADDING));

        queue!(out, MoveTo(0, y))?;
        if i == cursor {
            if palette.bold_selection {
                queue!(out, SetAttribute(Attribute::Bold))?;
            }
            set_colors(out, palette.selected_foreground, palette.selected_background)?;
        }
        queue!(out, Print(fit(&line, width)))?;
        reset_style(out)?;
    }
    Ok(())
}

fn print_help(out: &mut impl Write, viewport: &ViewportState) -> Result<()> {
    let width = usize::from(viewport.width);
    let key_width = HELP_LINES.iter().map(|(k, _)| k.len()).max().unwrap_or(0);

    for (i, (key, text)) in HELP_LINES.iter().take(viewport.body_rows()).enumerate() {
        let y = HEADER_ROWS + u16::try_from(i).unwrap_or(u16::MAX);
        let line = format!("{}{key:>key_width$}  {text}", " ".repeat(LEFT_PADDING));
        queue!(out, MoveTo(0, y), Print(fit(&line, width)))?;
    }
    Ok(())
}

fn print_error(
    out: &mut impl Write,
    message: &str,
    palette: &Palette,
    viewport: &ViewportState,
) -> Result<()> {
    let width = usize::from(viewport.width);
    let inner = width.saturating_sub(2 * LEFT_PADDING + 2);
    let border = format!("{}+{}+", " ".repeat(LEFT_PADDING), "-".repeat(inner));

    let mut lines = vec![border.clone()];
    for text in message.lines().take(viewport.body_rows().saturating_sub(2)) {
        lines.push(format!("{}|{}|", " ".repeat(LEFT_PADDING), fit(text, inner)));
    }
    lines.push(border);

    set_colors(out, palette.error_foreground, None)?;
    for (i, line) in lines.iter().enumerate() {
        let y = HEADER_ROWS + u16::try_from(i).unwrap_or(u16::MAX);
        queue!(out, MoveTo(0, y), Print(fit(line, width)))?;
    }
    reset_style(out)
}

fn print_details(
    out: &mut impl Write,
    snapshot: &RenderSnapshot,
    viewport: &ViewportState,
) -> Result<()> {
    let width = usize::from(viewport.width);
    let Some(entry) = snapshot.selected_entry() else {
        return Ok(());
    };
    let row = viewport.height.saturating_sub(3);

    let command = format!("{}$ {}", " ".repeat(LEFT_PADDING), entry.command);
    queue!(out, MoveTo(0, row), Print(fit(&command, width)))?;

    if let Some(description) = &entry.description {
        let description = format!("{}{description}", " ".repeat(LEFT_PADDING));
        queue!(
            out,
            MoveTo(0, row + 1),
            SetAttribute(Attribute::Italic),
            Print(fit(&description, width))
        )?;
        reset_style(out)?;
    }
    Ok(())
}

fn print_footer(
    out: &mut impl Write,
    snapshot: &RenderSnapshot,
    viewport: &ViewportState,
) -> Result<()> {
    let width = usize::from(viewport.width);
    queue!(
        out,
        MoveTo(0, viewport.height.saturating_sub(1)),
        SetAttribute(Attribute::Bold),
        Print(truncate(&footer_text(snapshot), width))
    )?;
    reset_style(out)
}

fn print_too_small(out: &mut impl Write, viewport: &ViewportState) -> Result<()> {
    let width = usize::from(viewport.width);
    let message = format!(
        "Terminal too small ({}x{}), need {MIN_TERMINAL_WIDTH}x{MIN_TERMINAL_HEIGHT}. Press q to quit.",
        viewport.width, viewport.height
    );
    queue!(out, MoveTo(0, 0), Print(truncate(&message, width)))?;
    Ok(())
}

/// Draws a whole frame for `snapshot`. Nothing is flushed.
pub fn draw(
    out: &mut impl Write,
    snapshot: &RenderSnapshot,
    palette: &Palette,
    viewport: &mut ViewportState,
) -> Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    if snapshot.terminal_too_small {
        return print_too_small(out, viewport);
    }

    print_header(out, snapshot, palette, usize::from(viewport.width))?;
    match &snapshot.mode {
        AppMode::Help => print_help(out, viewport)?,
        AppMode::Error { message } => print_error(out, message, palette, viewport)?,
        AppMode::WorkspaceSelect { cursor } => {
            print_workspaces(out, snapshot, *cursor, palette, viewport)?;
        }
        _ => {
            print_grid(out, snapshot, palette, viewport)?;
            print_details(out, snapshot, viewport)?;
        }
    }
    print_footer(out, snapshot, viewport)
}
