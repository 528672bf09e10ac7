//! Terminal I/O layer: raw mode, grid text, status bar.

use crossterm::{
    ExecutableCommand, QueueableCommand, cursor,
    style::{self, Stylize},
    terminal,
};
use std::io::{self, Write, stdout};

use super::state::{BrowseState, Layout, fit, item_label, placement_for};
use crate::layout::GridGeometry;

// ---------------------------------------------------------------------------
// RawGuard: restores raw mode / alternate screen on Drop
// ---------------------------------------------------------------------------

pub(super) struct RawGuard {
    cleaned: bool,
}

impl RawGuard {
    pub(super) fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        stdout().execute(terminal::EnterAlternateScreen)?;
        stdout().execute(cursor::Hide)?;
        Ok(Self { cleaned: false })
    }

    pub(super) fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        let mut out = stdout();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Drop for RawGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Draw the visible grid rows.
///
/// Items present in the last rebuilt grid show their file name; items not
/// yet placed show a placeholder. The focused item is drawn reversed.
pub(super) fn draw_grid(
    layout: &Layout,
    state: &BrowseState,
    geometry: &GridGeometry,
    total: usize,
) -> io::Result<()> {
    let mut out = stdout();
    let columns = geometry.columns.max(1) as usize;
    let cell_w = (layout.cols as usize / columns).max(1);

    for line in 0..layout.grid_rows {
        out.queue(cursor::MoveTo(0, line))?;
        out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
        let row = state.top_row as usize + line as usize;
        for col in 0..columns {
            let idx = row * columns + col;
            if idx >= total {
                break;
            }
            let name = state
                .frame
                .as_ref()
                .and_then(|f| placement_for(f, idx))
                .map(|p| item_label(&p.href))
                .unwrap_or("·");
            let text = fit(&format!(" {name}"), cell_w);
            if state.focus == Some(idx) {
                write!(out, "{}", text.reverse())?;
            } else {
                write!(out, "{text}")?;
            }
        }
    }
    out.flush()
}

/// Draw the status bar on the last terminal line.
///
/// `acc_peek`: pending count prefix shown as `:12_`
/// `loaded`: filled item slots
pub(super) fn draw_status_bar(
    layout: &Layout,
    state: &BrowseState,
    geometry: &GridGeometry,
    total: usize,
    loaded: usize,
    acc_peek: Option<u32>,
) -> io::Result<()> {
    let mut out = stdout();
    out.queue(cursor::MoveTo(0, layout.status_row))?;

    let focus = match state.focus {
        Some(f) => format!("focus {}/{total}", f + 1),
        None => "no focus".to_string(),
    };
    let position = format!(
        "row {}/{}  loaded {loaded}/{total}",
        state.top_row + 1,
        geometry.total_rows.max(1)
    );

    let middle = if let Some(msg) = &state.flash {
        format!(" galleon | {focus} | {msg}")
    } else if let Some(n) = acc_peek {
        format!(" galleon | {focus} | :{n}_ | {position}")
    } else {
        format!(" galleon | {focus} | {position}  [j/k d/u g/G Enter n/p o q]")
    };

    let padded = fit(&middle, layout.cols as usize);
    write!(out, "{}", padded.on_dark_grey().white())?;
    out.queue(style::ResetColor)?;
    out.flush()
}

pub(super) fn check_tty() -> anyhow::Result<()> {
    use std::io::IsTerminal;
    // Only stdout matters: crossterm's `use-dev-tty` reads keys from /dev/tty.
    if !io::stdout().is_terminal() {
        anyhow::bail!(
            "galleon browse requires an interactive terminal.\n\
             \n\
             To print a grid without a terminal, use: galleon layout --width 1280"
        );
    }
    Ok(())
}
