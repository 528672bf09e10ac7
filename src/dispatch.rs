//! Event dispatcher: debounced viewport events, immediate viewer events.
//!
//! The dispatcher does not own a timer thread. The host event loop asks
//! [`Dispatcher::timeout`] how long it may block, and calls
//! [`Dispatcher::poll`] when it wakes up; a due render runs then. This keeps
//! every engine mutation on the loop's thread.

use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::engine::{GalleryEngine, RenderOutcome};
use crate::error::Result;
use crate::layout::Viewport;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Events reaching the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Scroll(Viewport),
    Resize(Viewport),
    /// The full-screen viewer moved to a new global index.
    ViewerFocusChanged(usize),
}

/// Single-slot trailing debounce. Scheduling replaces any pending deadline.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the pending task is due (zero if overdue).
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    /// Consume the pending task if it is due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if d <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Engine not initialized; event dropped.
    Dropped,
    /// Render (re)scheduled behind the debounce window.
    Deferred,
    /// Viewer prefetch ran; number of windows loaded.
    Prefetched(usize),
}

pub struct Dispatcher {
    debounce: Debouncer,
    latest: Option<Viewport>,
}

impl Dispatcher {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce: Debouncer::new(debounce),
            latest: None,
        }
    }

    pub fn dispatch(
        &mut self,
        engine: &mut GalleryEngine,
        event: Event,
        now: Instant,
    ) -> Result<Dispatched> {
        if !engine.is_ready() {
            debug!("dispatch: {event:?} dropped, directory not loaded");
            return Ok(Dispatched::Dropped);
        }
        match event {
            Event::Scroll(vp) | Event::Resize(vp) => {
                trace!("dispatch: {event:?}, render rescheduled");
                self.latest = Some(vp);
                self.debounce.schedule(now);
                Ok(Dispatched::Deferred)
            }
            Event::ViewerFocusChanged(idx) => {
                let loaded = engine.prefetch_around(idx)?;
                Ok(Dispatched::Prefetched(loaded))
            }
        }
    }

    /// How long the host loop may sleep before calling [`Self::poll`].
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        self.debounce.remaining(now)
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Run the debounced render if its quiet period has elapsed.
    pub fn poll(&mut self, engine: &mut GalleryEngine, now: Instant) -> Result<Option<RenderOutcome>> {
        if !self.debounce.take_due(now) {
            return Ok(None);
        }
        let Some(vp) = self.latest else {
            return Ok(None);
        };
        debug!("dispatch: quiet period over, rendering {vp:?}");
        engine.render(vp).map(Some)
    }

    /// Render immediately, dropping any pending debounced render.
    pub fn flush(&mut self, engine: &mut GalleryEngine, viewport: Viewport) -> Result<RenderOutcome> {
        self.debounce.cancel();
        self.latest = Some(viewport);
        engine.render(viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::fetch::MemoryFetcher;
    use std::sync::Arc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn ready_engine() -> (GalleryEngine, Arc<MemoryFetcher>) {
        let f = Arc::new(MemoryFetcher::new());
        f.insert("http://o/images/dir_index.json", r#"{"a": 2, "b": 2}"#);
        f.insert(
            "http://o/images/a/entry_index.json?cb=t",
            r#"[{"name":"1.jpg","w":1,"h":1,"x":0,"y":0},{"name":"2.jpg","w":1,"h":1,"x":152,"y":0}]"#,
        );
        f.insert(
            "http://o/images/b/entry_index.json?cb=t",
            r#"[{"name":"1.jpg","w":1,"h":1,"x":0,"y":0},{"name":"2.jpg","w":1,"h":1,"x":152,"y":0}]"#,
        );
        let config = EngineConfig {
            origin: "http://o".into(),
            cache_bust: Some("t".into()),
            ..EngineConfig::default()
        };
        let mut e = GalleryEngine::new(config, f.clone());
        e.init().unwrap();
        (e, f)
    }

    fn vp(width: u32) -> Viewport {
        Viewport {
            width,
            scroll_top: 0,
        }
    }

    #[test]
    fn debouncer_reschedule_replaces_deadline() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(ms(150));
        d.schedule(t0);
        d.schedule(t0 + ms(100));
        assert!(!d.take_due(t0 + ms(200)));
        assert_eq!(d.remaining(t0 + ms(200)), Some(ms(50)));
        assert!(d.take_due(t0 + ms(250)));
        assert!(!d.is_pending());
        assert!(!d.take_due(t0 + ms(400)));
    }

    #[test]
    fn debouncer_cancel() {
        let t0 = Instant::now();
        let mut d = Debouncer::new(ms(150));
        d.schedule(t0);
        d.cancel();
        assert_eq!(d.remaining(t0), None);
        assert!(!d.take_due(t0 + ms(1000)));
    }

    #[test]
    fn events_before_init_are_dropped() {
        let f = Arc::new(MemoryFetcher::new());
        let mut e = GalleryEngine::new(EngineConfig::default(), f.clone());
        let mut d = Dispatcher::new(DEFAULT_DEBOUNCE);
        let t0 = Instant::now();
        assert_eq!(d.dispatch(&mut e, Event::Scroll(vp(642)), t0).unwrap(), Dispatched::Dropped);
        assert_eq!(
            d.dispatch(&mut e, Event::ViewerFocusChanged(3), t0).unwrap(),
            Dispatched::Dropped
        );
        assert!(!d.is_pending());
        assert!(d.poll(&mut e, t0 + ms(1000)).unwrap().is_none());
        assert_eq!(f.total_fetches(), 0);
    }

    #[test]
    fn burst_of_scrolls_renders_once_after_quiet_period() {
        let (mut e, _) = ready_engine();
        let mut d = Dispatcher::new(DEFAULT_DEBOUNCE);
        let t0 = Instant::now();
        for i in 0..5 {
            let r = d.dispatch(&mut e, Event::Scroll(vp(642)), t0 + ms(i * 50)).unwrap();
            assert_eq!(r, Dispatched::Deferred);
            assert!(d.poll(&mut e, t0 + ms(i * 50 + 10)).unwrap().is_none());
        }
        assert_eq!(e.rebuild_count(), 0);
        // last event at 200ms → due at 350ms
        assert!(d.poll(&mut e, t0 + ms(349)).unwrap().is_none());
        let out = d.poll(&mut e, t0 + ms(350)).unwrap();
        assert!(matches!(out, Some(RenderOutcome::Rebuilt(_))));
        assert_eq!(e.rebuild_count(), 1);
        assert!(d.poll(&mut e, t0 + ms(1000)).unwrap().is_none());
    }

    #[test]
    fn render_uses_latest_viewport() {
        let (mut e, _) = ready_engine();
        let mut d = Dispatcher::new(DEFAULT_DEBOUNCE);
        let t0 = Instant::now();
        d.dispatch(&mut e, Event::Scroll(vp(642)), t0).unwrap();
        d.dispatch(&mut e, Event::Resize(vp(1000)), t0 + ms(10)).unwrap();
        let Some(RenderOutcome::Rebuilt(frame)) = d.poll(&mut e, t0 + ms(200)).unwrap() else {
            panic!("expected rebuild");
        };
        assert_eq!(frame.geometry.columns, 6);
    }

    #[test]
    fn viewer_focus_is_immediate_and_skips_render() {
        let (mut e, f) = ready_engine();
        let mut d = Dispatcher::new(DEFAULT_DEBOUNCE);
        let t0 = Instant::now();
        let r = d.dispatch(&mut e, Event::ViewerFocusChanged(1), t0).unwrap();
        assert_eq!(r, Dispatched::Prefetched(1));
        assert_eq!(e.loaded_count(), 4);
        assert!(!d.is_pending());
        assert_eq!(e.rebuild_count(), 0);
        assert!(f.total_fetches() >= 3);
    }

    #[test]
    fn flush_renders_now() {
        let (mut e, _) = ready_engine();
        let mut d = Dispatcher::new(DEFAULT_DEBOUNCE);
        let t0 = Instant::now();
        d.dispatch(&mut e, Event::Scroll(vp(642)), t0).unwrap();
        assert!(matches!(d.flush(&mut e, vp(642)).unwrap(), RenderOutcome::Rebuilt(_)));
        assert!(!d.is_pending());
        assert!(d.poll(&mut e, t0 + ms(1000)).unwrap().is_none());
    }
}
