//! Browse action handler: scrolling, jumping, focus and opening items.
//!
//! Pure: turns an [`Action`] into [`Effect`]s; the event loop applies them.

use log::debug;

use super::Effect;
use super::input::Action;
use super::state::{BrowseState, item_label};

pub(super) struct BrowseCtx<'a> {
    pub state: &'a BrowseState,
    pub max_top_row: u32,
    pub half_page: u32,
    pub columns: usize,
    pub total: usize,
    /// Full image link of the focused item, if it is loaded.
    pub focused_src: Option<&'a str>,
}

pub(super) fn handle(action: Action, ctx: &BrowseCtx) -> Vec<Effect> {
    let top = ctx.state.top_row;
    match action {
        Action::Quit => vec![Effect::Exit],

        Action::Digit => vec![Effect::RedrawStatusBar],

        Action::CancelInput => {
            if ctx.state.focus.is_some() {
                vec![Effect::ClearFocus]
            } else {
                vec![Effect::RedrawStatusBar]
            }
        }

        Action::ScrollDown(count) => {
            let row = top.saturating_add(count).min(ctx.max_top_row);
            debug!("scroll down: row {top} → {row} (count={count}, max={})", ctx.max_top_row);
            vec![Effect::ScrollTo(row)]
        }
        Action::ScrollUp(count) => {
            let row = top.saturating_sub(count);
            debug!("scroll up: row {top} → {row} (count={count})");
            vec![Effect::ScrollTo(row)]
        }
        Action::HalfPageDown(count) => {
            let row = top
                .saturating_add(count.saturating_mul(ctx.half_page))
                .min(ctx.max_top_row);
            debug!("scroll half-down: row {top} → {row} (count={count}, step={})", ctx.half_page);
            vec![Effect::ScrollTo(row)]
        }
        Action::HalfPageUp(count) => {
            let row = top.saturating_sub(count.saturating_mul(ctx.half_page));
            debug!("scroll half-up: row {top} → {row} (count={count}, step={})", ctx.half_page);
            vec![Effect::ScrollTo(row)]
        }
        Action::JumpToTop => vec![Effect::ScrollTo(0)],
        Action::JumpToBottom => vec![Effect::ScrollTo(ctx.max_top_row)],
        Action::JumpToRow(n) => {
            let row = n.saturating_sub(1).min(ctx.max_top_row);
            debug!("jump to row {n}: row {top} → {row}");
            vec![Effect::ScrollTo(row)]
        }

        Action::Focus => match first_visible(ctx) {
            Some(idx) => vec![Effect::FocusOn(idx)],
            None => vec![Effect::Flash("Collection is empty".into())],
        },
        Action::FocusNext(count) => match ctx.state.focus {
            None => handle(Action::Focus, ctx),
            Some(f) => {
                let last = ctx.total.saturating_sub(1);
                if f >= last {
                    vec![Effect::Flash("Last item".into())]
                } else {
                    vec![Effect::FocusOn(f.saturating_add(count as usize).min(last))]
                }
            }
        },
        Action::FocusPrev(count) => match ctx.state.focus {
            None => handle(Action::Focus, ctx),
            Some(0) => vec![Effect::Flash("First item".into())],
            Some(f) => vec![Effect::FocusOn(f.saturating_sub(count as usize))],
        },

        Action::Open => match (ctx.state.focus, ctx.focused_src) {
            (Some(_), Some(src)) => vec![
                Effect::OpenUrl(src.to_string()),
                Effect::Flash(format!("Opening {}", item_label(src))),
            ],
            (Some(f), None) => vec![Effect::Flash(format!("Item {} not loaded yet", f + 1))],
            (None, _) => vec![Effect::Flash("Press Enter to focus an item".into())],
        },
    }
}

/// First item of the top visible row.
fn first_visible(ctx: &BrowseCtx) -> Option<usize> {
    let last = ctx.total.checked_sub(1)?;
    Some((ctx.state.top_row as usize * ctx.columns).min(last))
}
