//! Scroll mode: Vim-style scrolling with a polled position indicator.
//!
//! A background poller (16 ms period) reads the cursor position and keeps the
//! overlay's scroll indicator in sync. Shutdown is a close-stop / wait-done
//! pair: the poller closes its done channel as its last act, and the caller
//! waits on it before tearing down resources, so no indicator draw can arrive
//! after cleanup.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::actions::{PendingAction, ScrollDirection};
use crate::error::ResultExt;
use crate::geometry::Rect;
use crate::keys::{Key, CTRL_D, CTRL_U};
use crate::ports::{AccessibilityPort, OverlayPort};

use super::{
    KeyOutcome, ModeContext, HIGHLIGHT_WIDTH, SCROLL_HIGHLIGHT_COLOR, SCROLL_INDICATOR_SIZE,
};

/// Indicator poll period.
const POLL_PERIOD: Duration = Duration::from_millis(16);
/// How long to wait for the poller's done acknowledgement.
const DONE_DEADLINE: Duration = Duration::from_secs(1);

pub struct ScrollMode {
    ctx: ModeContext,
    poller: Option<ScrollPoller>,
    /// Set after a lone `g`; a second consecutive `g` scrolls to the top.
    last_key_g: bool,
}

impl ScrollMode {
    pub fn new(ctx: ModeContext) -> Self {
        Self {
            ctx,
            poller: None,
            last_key_g: false,
        }
    }

    pub fn activate(&mut self) -> crate::error::Result<()> {
        self.last_key_g = false;
        // The scrollable area under the cursor, when one is found, becomes
        // the indicator; otherwise a small square follows the cursor.
        let area = self.scroll_area_under_cursor();
        self.poller = Some(ScrollPoller::spawn(
            self.ctx.accessibility.clone(),
            self.ctx.overlay.clone(),
            area,
        ));
        Ok(())
    }

    fn scroll_area_under_cursor(&self) -> Option<Rect> {
        let cursor = self.ctx.accessibility.cursor_position().log_err()?;
        let areas = self.ctx.accessibility.scrollable_elements().log_err()?;
        areas
            .into_iter()
            .map(|element| element.bounds)
            .filter(|bounds| bounds.contains_point(cursor))
            // Innermost area wins when scroll areas nest.
            .min_by_key(|bounds| bounds.width as i64 * bounds.height as i64)
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        let scroll = &self.ctx.config.scroll;
        let (direction, amount) = match key {
            Key::Char('j') => (ScrollDirection::Down, scroll.step),
            Key::Char('k') => (ScrollDirection::Up, scroll.step),
            Key::Char('h') => (ScrollDirection::Left, scroll.step),
            Key::Char('l') => (ScrollDirection::Right, scroll.step),
            Key::Control(CTRL_D) => (ScrollDirection::Down, scroll.half_page),
            Key::Control(CTRL_U) => (ScrollDirection::Up, scroll.half_page),
            Key::Char('G') => (ScrollDirection::Down, scroll.full_page),
            Key::Char('g') => {
                if self.last_key_g {
                    self.last_key_g = false;
                    (ScrollDirection::Up, scroll.full_page)
                } else {
                    self.last_key_g = true;
                    return KeyOutcome::Stay;
                }
            }
            _ => {
                self.last_key_g = false;
                debug!(%key, "scroll: unmapped key");
                return KeyOutcome::Stay;
            }
        };
        self.last_key_g = false;

        let at = self
            .ctx
            .accessibility
            .cursor_position()
            .unwrap_or_default();
        self.ctx
            .dispatcher
            .dispatch(&PendingAction::Scroll { direction, amount }, at)
            .log_err();
        KeyOutcome::Stay
    }

    pub fn partial_cleanup(&mut self) {
        self.stop_poller();
    }

    pub fn exit(&mut self) {
        self.stop_poller();
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
    }
}

/// Background indicator poller with ordered shutdown.
struct ScrollPoller {
    stop: Option<Sender<()>>,
    done: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl ScrollPoller {
    fn spawn(
        accessibility: Arc<dyn AccessibilityPort>,
        overlay: Arc<dyn OverlayPort>,
        area: Option<Rect>,
    ) -> Self {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let (done_tx, done_rx) = bounded::<()>(0);
        let thread = std::thread::Builder::new()
            .name("keywarp-scroll-poll".into())
            .spawn(move || {
                poll_loop(accessibility, overlay, area, stop_rx);
                // Closing the done channel is the last thing this thread
                // does; after the caller observes it, no draw is in flight.
                drop(done_tx);
            })
            .ok();
        Self {
            stop: Some(stop_tx),
            done: done_rx,
            thread,
        }
    }

    /// Close the stop channel, wait for the done acknowledgement, then join.
    fn stop(mut self) {
        self.stop.take();
        match self.done.recv_timeout(DONE_DEADLINE) {
            Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {}
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                warn!("scroll poller did not acknowledge stop in time");
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn poll_loop(
    accessibility: Arc<dyn AccessibilityPort>,
    overlay: Arc<dyn OverlayPort>,
    area: Option<Rect>,
    stop: Receiver<()>,
) {
    let ticker = crossbeam_channel::tick(POLL_PERIOD);
    let mut last_drawn: Option<Rect> = None;
    loop {
        crossbeam_channel::select! {
            recv(ticker) -> _ => {
                let Ok(pos) = accessibility.cursor_position() else {
                    continue;
                };
                let indicator = match area {
                    Some(area) if area.contains_point(pos) => area,
                    _ => Rect::centered_at(pos, SCROLL_INDICATOR_SIZE),
                };
                if last_drawn == Some(indicator) {
                    continue;
                }
                if overlay
                    .draw_scroll_highlight(indicator, SCROLL_HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH)
                    .is_ok()
                {
                    last_drawn = Some(indicator);
                }
            }
            recv(stop) -> _ => return,
        }
    }
}
