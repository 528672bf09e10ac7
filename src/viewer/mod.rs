//! Interactive terminal browser over a `GalleryEngine`.
//!
//! Layout:
//!   row 0..term_rows-1 : grid rows, one terminal line per grid row
//!   row term_rows-1    : status bar
//!
//! Scroll and resize events go through the debounced dispatcher. The loop
//! blocks in `event::poll` for at most the debounce time left, then lets the
//! dispatcher run the pending render and swaps in the rebuilt grid. Focus
//! moves are dispatched immediately and prefetch around the focused item.

mod browse;
mod input;
mod state;
mod terminal;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::{
    event::{self, Event as TermEvent},
    terminal as crossterm_terminal,
};
use log::{debug, info, warn};

use crate::config::Config;
use crate::dispatch::{Dispatcher, Event};
use crate::engine::{GalleryEngine, RenderOutcome};
use crate::fetch::HttpFetcher;
use crate::layout::GridParams;

use browse::BrowseCtx;
use input::{InputAccumulator, map_key_event};
use state::{BrowseState, Layout};

const IDLE_POLL: Duration = Duration::from_secs(86400);

/// Side effects requested by the action handler.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Effect {
    Exit,
    /// New top grid row.
    ScrollTo(u32),
    FocusOn(usize),
    ClearFocus,
    OpenUrl(String),
    Flash(String),
    RedrawStatusBar,
}

struct Browser {
    engine: GalleryEngine,
    dispatcher: Dispatcher,
    params: GridParams,
    layout: Layout,
    state: BrowseState,
    acc: InputAccumulator,
}

/// Run the terminal browser against the configured origin.
pub fn run(config: &Config) -> anyhow::Result<()> {
    terminal::check_tty()?;

    let fetcher = Arc::new(HttpFetcher::new(config.http_timeout));
    let mut engine = GalleryEngine::new(config.to_engine_config(), fetcher);
    let start = Instant::now();
    engine.init().context("failed to load segment directory")?;
    info!(
        "browse: directory ready ({} items) in {:.1}ms",
        engine.total(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    let (cols, rows) = crossterm_terminal::size().context("failed to get terminal size")?;
    let mut guard = terminal::RawGuard::enter()?;

    let mut browser = Browser {
        engine,
        dispatcher: Dispatcher::new(config.debounce),
        params: config.grid,
        layout: state::compute_layout(cols, rows),
        state: BrowseState::default(),
        acc: InputAccumulator::new(),
    };
    let result = browser.event_loop();

    guard.cleanup();
    result
}

impl Browser {
    fn event_loop(&mut self) -> anyhow::Result<()> {
        // First grid without waiting out the debounce window.
        let vp = self.state.viewport(&self.layout, &self.params);
        let first = self.dispatcher.flush(&mut self.engine, vp);
        self.take_outcome(first.map(Some));
        self.redraw()?;

        loop {
            let timeout = self
                .dispatcher
                .timeout(Instant::now())
                .unwrap_or(IDLE_POLL);

            if event::poll(timeout)? {
                let ev = event::read()?;
                debug!("event: {ev:?}");
                match ev {
                    TermEvent::Key(key) => {
                        let had_flash = self.state.flash.take().is_some();
                        let Some(action) = map_key_event(key, &mut self.acc) else {
                            if self.acc.is_active() || had_flash {
                                self.acc.reset();
                                self.draw_status()?;
                            }
                            continue;
                        };
                        let effects = browse::handle(action, &self.ctx());
                        if !self.apply(effects)? {
                            return Ok(());
                        }
                    }
                    TermEvent::Resize(cols, rows) => {
                        debug!("resize: {cols}x{rows}");
                        self.layout = state::compute_layout(cols, rows);
                        let geometry = self.geometry();
                        self.state.scroll_to(self.state.top_row, &geometry, &self.layout);
                        let vp = self.state.viewport(&self.layout, &self.params);
                        self.dispatch(Event::Resize(vp));
                        self.redraw()?;
                    }
                    _ => {}
                }
                continue;
            }

            // poll timeout → debounce window elapsed
            match self.dispatcher.poll(&mut self.engine, Instant::now()) {
                Ok(None) => {}
                outcome => {
                    self.take_outcome(outcome);
                    self.redraw()?;
                }
            }
        }
    }

    fn ctx(&self) -> BrowseCtx<'_> {
        let geometry = self.geometry();
        BrowseCtx {
            state: &self.state,
            max_top_row: state::max_top_row(&geometry, &self.layout),
            half_page: (self.layout.grid_rows as u32 / 2).max(1),
            columns: geometry.columns as usize,
            total: self.engine.total(),
            focused_src: self
                .state
                .focus
                .and_then(|f| self.engine.item(f))
                .map(|item| item.src.as_str()),
        }
    }

    fn geometry(&self) -> crate::layout::GridGeometry {
        self.state
            .geometry(&self.layout, &self.params, self.engine.total())
    }

    /// Apply effects; returns `false` when the browser should exit.
    fn apply(&mut self, effects: Vec<Effect>) -> anyhow::Result<bool> {
        let mut dirty = false;
        let mut status = false;
        for effect in effects {
            match effect {
                Effect::Exit => return Ok(false),
                Effect::ScrollTo(row) => {
                    let geometry = self.geometry();
                    if self.state.scroll_to(row, &geometry, &self.layout) {
                        self.dispatch_scroll();
                    }
                    dirty = true;
                }
                Effect::FocusOn(idx) => {
                    let geometry = self.geometry();
                    let total = self.engine.total();
                    if self.state.focus_on(idx, total, &geometry, &self.layout) {
                        self.dispatch_scroll();
                    }
                    if let Some(f) = self.state.focus {
                        self.dispatch(Event::ViewerFocusChanged(f));
                    }
                    dirty = true;
                }
                Effect::ClearFocus => {
                    self.state.focus = None;
                    dirty = true;
                }
                Effect::OpenUrl(url) => {
                    info!("open: {url}");
                    if let Err(e) = open::that(&url) {
                        warn!("open: {url} failed: {e}");
                        self.state.flash = Some(format!("Failed to open: {e}"));
                        status = true;
                    }
                }
                Effect::Flash(msg) => {
                    if self.state.flash.is_none() {
                        self.state.flash = Some(msg);
                    }
                    status = true;
                }
                Effect::RedrawStatusBar => status = true,
            }
        }
        if dirty {
            self.redraw()?;
        } else if status {
            self.draw_status()?;
        }
        Ok(true)
    }

    fn dispatch_scroll(&mut self) {
        let vp = self.state.viewport(&self.layout, &self.params);
        self.dispatch(Event::Scroll(vp));
    }

    /// Dispatch an event; load failures become a flash message.
    fn dispatch(&mut self, event: Event) {
        if let Err(e) = self.dispatcher.dispatch(&mut self.engine, event, Instant::now()) {
            warn!("browse: {event:?} failed: {e}");
            self.state.flash = Some(format!("Load failed: {e}"));
        }
    }

    fn take_outcome(&mut self, outcome: crate::error::Result<Option<RenderOutcome>>) {
        match outcome {
            Ok(Some(RenderOutcome::Rebuilt(frame))) => {
                debug!(
                    "browse: new grid ({} placements, container {}px)",
                    frame.placements.len(),
                    frame.geometry.container_height
                );
                self.state.frame = Some(frame);
            }
            Ok(Some(RenderOutcome::Skipped) | None) => {}
            Err(e) => {
                warn!("browse: render failed: {e}");
                self.state.flash = Some(format!("Load failed: {e}"));
            }
        }
    }

    fn redraw(&self) -> anyhow::Result<()> {
        let geometry = self.geometry();
        terminal::draw_grid(&self.layout, &self.state, &geometry, self.engine.total())?;
        self.draw_status()
    }

    fn draw_status(&self) -> anyhow::Result<()> {
        let geometry = self.geometry();
        terminal::draw_status_bar(
            &self.layout,
            &self.state,
            &geometry,
            self.engine.total(),
            self.engine.loaded_count(),
            self.acc.peek(),
        )?;
        Ok(())
    }
}
