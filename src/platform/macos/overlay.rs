//! Overlay adapter: a borderless, click-through panel at screen-saver level
//! with CALayer-backed rendering.
//!
//! Port methods are called from the event-tap and control threads; each call
//! packages its draw data and queues it onto the main dispatch queue, where
//! the panel lives. The root layer is geometry-flipped so sublayer frames use
//! the same top-left coordinates as the rest of the daemon.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cocoa::base::{id, nil, NO, YES};
use cocoa::foundation::{NSPoint, NSRect, NSSize, NSString};
use core_graphics::display::CGDisplay;
use objc::{class, msg_send, sel, sel_impl};

use super::on_main;
use crate::error::Result;
use crate::geometry::Rect;
use crate::ports::{Color, GridDraw, HintDraw, OverlayPort};

/// NSScreenSaverWindowLevel.
const OVERLAY_WINDOW_LEVEL: i64 = 1000;
/// CanJoinAllSpaces | Stationary | FullScreenAuxiliary.
const COLLECTION_BEHAVIOR: u64 = (1 << 0) | (1 << 4) | (1 << 8);

const LABEL_FONT_SIZE: f64 = 11.0;
const HINT_LABEL_WIDTH: f64 = 26.0;
const HINT_LABEL_HEIGHT: f64 = 16.0;

/// The panel pointer, touched only from the main queue.
struct PanelPtr(Option<id>);
// SAFETY: every dereference happens inside an `on_main` block.
unsafe impl Send for PanelPtr {}
unsafe impl Sync for PanelPtr {}

struct Shared {
    panel: parking_lot::Mutex<PanelPtr>,
    visible: AtomicBool,
}

pub struct OverlayPanel {
    shared: Arc<Shared>,
}

impl OverlayPanel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                panel: parking_lot::Mutex::new(PanelPtr(None)),
                visible: AtomicBool::new(false),
            }),
        })
    }

    /// Queue main-thread work against the (lazily created) panel layer.
    fn with_layer(&self, work: impl FnOnce(id, id) + Send + 'static) {
        let shared = self.shared.clone();
        on_main(move || unsafe {
            let panel = ensure_panel(&shared);
            if panel == nil {
                return;
            }
            let view: id = msg_send![panel, contentView];
            let layer: id = msg_send![view, layer];
            work(panel, layer);
        });
    }
}

impl OverlayPort for OverlayPanel {
    fn set_bounds(&self, bounds: Rect) -> Result<()> {
        self.with_layer(move |panel, layer| unsafe {
            clear_sublayers(layer);
            let frame = to_cocoa_rect(bounds);
            let _: () = msg_send![panel, setFrame: frame display: YES];
        });
        Ok(())
    }

    fn show_hints(&self, hints: &[HintDraw]) -> Result<()> {
        let hints = hints.to_vec();
        self.shared.visible.store(true, Ordering::SeqCst);
        self.with_layer(move |panel, layer| unsafe {
            clear_sublayers(layer);
            let origin = panel_origin(panel);
            for hint in &hints {
                let frame = NSRect::new(
                    NSPoint::new(
                        hint.position.x as f64 - origin.x - HINT_LABEL_WIDTH / 2.0,
                        hint.position.y as f64 - origin.y - HINT_LABEL_HEIGHT / 2.0,
                    ),
                    NSSize::new(
                        HINT_LABEL_WIDTH.max(hint.label.len() as f64 * 9.0),
                        HINT_LABEL_HEIGHT,
                    ),
                );
                let background = if hint.matched > 0 {
                    color(0.98, 0.75, 0.18, 0.95)
                } else {
                    color(0.16, 0.16, 0.18, 0.92)
                };
                let text = if hint.matched > 0 {
                    color(0.05, 0.05, 0.05, 1.0)
                } else {
                    color(0.95, 0.95, 0.95, 1.0)
                };
                let label = text_layer(&hint.label, frame, background, text);
                let _: () = msg_send![layer, addSublayer: label];
            }
            order_front(panel);
        });
        Ok(())
    }

    fn show_grid(&self, grid: &GridDraw) -> Result<()> {
        let grid = grid.clone();
        self.shared.visible.store(true, Ordering::SeqCst);
        self.with_layer(move |panel, layer| unsafe {
            clear_sublayers(layer);
            let origin = panel_origin(panel);
            for cell in &grid.cells {
                if !cell.visible {
                    continue;
                }
                let frame = rect_in_panel(cell.bounds, origin);
                let border = bordered_layer(frame, color(1.0, 1.0, 1.0, 0.25), 0.5);
                let _: () = msg_send![layer, addSublayer: border];

                let label_frame = centered_label_frame(frame);
                let background = if cell.matched > 0 {
                    color(0.98, 0.75, 0.18, 0.9)
                } else {
                    color(0.0, 0.0, 0.0, 0.0)
                };
                let label = text_layer(
                    &cell.label,
                    label_frame,
                    background,
                    color(0.95, 0.95, 0.95, 0.9),
                );
                let _: () = msg_send![layer, addSublayer: label];
            }
            if let Some(subgrid) = &grid.subgrid {
                let frame = rect_in_panel(subgrid.bounds, origin);
                let border = bordered_layer(frame, color(0.98, 0.75, 0.18, 1.0), 2.0);
                let _: () = msg_send![layer, addSublayer: border];
                for (i, key) in subgrid.keys.iter().enumerate() {
                    let col = (i % 3) as f64;
                    let row = (i / 3) as f64;
                    let cell_w = frame.size.width / 3.0;
                    let cell_h = frame.size.height / 3.0;
                    let key_frame = NSRect::new(
                        NSPoint::new(
                            frame.origin.x + col * cell_w + cell_w / 2.0 - 7.0,
                            frame.origin.y + row * cell_h + cell_h / 2.0 - 8.0,
                        ),
                        NSSize::new(14.0, 16.0),
                    );
                    let label = text_layer(
                        &key.to_string(),
                        key_frame,
                        color(0.16, 0.16, 0.18, 0.9),
                        color(0.95, 0.95, 0.95, 1.0),
                    );
                    let _: () = msg_send![layer, addSublayer: label];
                }
            }
            order_front(panel);
        });
        Ok(())
    }

    fn draw_recursive_grid(
        &self,
        bounds: Rect,
        _depth: u32,
        keys: &str,
        cols: u32,
        rows: u32,
    ) -> Result<()> {
        let keys: Vec<char> = keys.chars().collect();
        self.shared.visible.store(true, Ordering::SeqCst);
        self.with_layer(move |panel, layer| unsafe {
            clear_sublayers(layer);
            let origin = panel_origin(panel);
            let frame = rect_in_panel(bounds, origin);
            let outer = bordered_layer(frame, color(0.35, 0.65, 0.98, 1.0), 2.0);
            let _: () = msg_send![layer, addSublayer: outer];

            let cell_w = frame.size.width / cols as f64;
            let cell_h = frame.size.height / rows as f64;
            for row in 0..rows {
                for col in 0..cols {
                    let index = (row * cols + col) as usize;
                    let cell_frame = NSRect::new(
                        NSPoint::new(
                            frame.origin.x + col as f64 * cell_w,
                            frame.origin.y + row as f64 * cell_h,
                        ),
                        NSSize::new(cell_w, cell_h),
                    );
                    let border = bordered_layer(cell_frame, color(0.35, 0.65, 0.98, 0.5), 1.0);
                    let _: () = msg_send![layer, addSublayer: border];
                    if let Some(key) = keys.get(index) {
                        let label_frame = centered_label_frame(cell_frame);
                        let label = text_layer(
                            &key.to_string(),
                            label_frame,
                            color(0.16, 0.16, 0.18, 0.85),
                            color(0.95, 0.95, 0.95, 1.0),
                        );
                        let _: () = msg_send![layer, addSublayer: label];
                    }
                }
            }
            order_front(panel);
        });
        Ok(())
    }

    fn draw_scroll_highlight(&self, rect: Rect, color_in: Color, width: i32) -> Result<()> {
        self.shared.visible.store(true, Ordering::SeqCst);
        self.with_layer(move |panel, layer| unsafe {
            clear_sublayers(layer);
            let origin = panel_origin(panel);
            let frame = rect_in_panel(rect, origin);
            let border = bordered_layer(frame, color_from(color_in), width as f64);
            let _: () = msg_send![border, setCornerRadius: 6.0f64];
            let _: () = msg_send![layer, addSublayer: border];
            order_front(panel);
        });
        Ok(())
    }

    fn draw_action_highlight(&self, rect: Rect, color_in: Color, width: i32) -> Result<()> {
        self.shared.visible.store(true, Ordering::SeqCst);
        self.with_layer(move |panel, layer| unsafe {
            clear_sublayers(layer);
            let origin = panel_origin(panel);
            let frame = rect_in_panel(rect, origin);
            let border = bordered_layer(frame, color_from(color_in), width as f64);
            let _: () = msg_send![layer, addSublayer: border];
            order_front(panel);
        });
        Ok(())
    }

    fn hide(&self) -> Result<()> {
        self.shared.visible.store(false, Ordering::SeqCst);
        let shared = self.shared.clone();
        on_main(move || unsafe {
            let guard = shared.panel.lock();
            if let Some(panel) = guard.0 {
                let view: id = msg_send![panel, contentView];
                let layer: id = msg_send![view, layer];
                clear_sublayers(layer);
                let _: () = msg_send![panel, orderOut: nil];
            }
        });
        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        self.with_layer(|_, layer| unsafe {
            let _: () = msg_send![layer, setNeedsDisplay];
        });
        Ok(())
    }

    fn is_visible(&self) -> bool {
        self.shared.visible.load(Ordering::SeqCst)
    }
}

/// Create the panel on first use. Main queue only.
unsafe fn ensure_panel(shared: &Shared) -> id {
    let mut guard = shared.panel.lock();
    if let Some(panel) = guard.0 {
        return panel;
    }

    let frame = NSRect::new(NSPoint::new(0.0, 0.0), NSSize::new(1.0, 1.0));
    let panel: id = msg_send![class!(NSPanel), alloc];
    // Borderless, buffered backing store.
    let panel: id = msg_send![panel, initWithContentRect: frame
                                               styleMask: 0u64
                                                 backing: 2u64
                                                   defer: NO];
    if panel == nil {
        return nil;
    }
    let clear: id = msg_send![class!(NSColor), clearColor];
    let _: () = msg_send![panel, setLevel: OVERLAY_WINDOW_LEVEL];
    let _: () = msg_send![panel, setOpaque: NO];
    let _: () = msg_send![panel, setBackgroundColor: clear];
    let _: () = msg_send![panel, setIgnoresMouseEvents: YES];
    let _: () = msg_send![panel, setHasShadow: NO];
    let _: () = msg_send![panel, setCollectionBehavior: COLLECTION_BEHAVIOR];
    let view: id = msg_send![panel, contentView];
    let _: () = msg_send![view, setWantsLayer: YES];
    let layer: id = msg_send![view, layer];
    // Flip so sublayer frames use top-left coordinates.
    let _: () = msg_send![layer, setGeometryFlipped: YES];

    guard.0 = Some(panel);
    panel
}

unsafe fn order_front(panel: id) {
    let _: () = msg_send![panel, orderFrontRegardless];
}

unsafe fn clear_sublayers(layer: id) {
    let _: () = msg_send![layer, setSublayers: nil];
}

/// Convert our top-left global rect into Cocoa's bottom-left window frame.
fn to_cocoa_rect(rect: Rect) -> NSRect {
    let primary_height = CGDisplay::main().bounds().size.height;
    NSRect::new(
        NSPoint::new(
            rect.x as f64,
            primary_height - (rect.y as f64 + rect.height as f64),
        ),
        NSSize::new(rect.width as f64, rect.height as f64),
    )
}

/// The panel's origin in our global top-left coordinates; sublayer frames
/// are relative to it.
unsafe fn panel_origin(panel: id) -> NSPoint {
    let frame: NSRect = msg_send![panel, frame];
    let primary_height = CGDisplay::main().bounds().size.height;
    NSPoint::new(
        frame.origin.x,
        primary_height - (frame.origin.y + frame.size.height),
    )
}

fn rect_in_panel(rect: Rect, origin: NSPoint) -> NSRect {
    NSRect::new(
        NSPoint::new(rect.x as f64 - origin.x, rect.y as f64 - origin.y),
        NSSize::new(rect.width as f64, rect.height as f64),
    )
}

fn centered_label_frame(frame: NSRect) -> NSRect {
    NSRect::new(
        NSPoint::new(
            frame.origin.x + frame.size.width / 2.0 - 13.0,
            frame.origin.y + frame.size.height / 2.0 - 8.0,
        ),
        NSSize::new(26.0, 16.0),
    )
}

/// CGColorRef from components.
unsafe fn color(r: f64, g: f64, b: f64, a: f64) -> id {
    let ns_color: id =
        msg_send![class!(NSColor), colorWithCalibratedRed: r green: g blue: b alpha: a];
    msg_send![ns_color, CGColor]
}

unsafe fn color_from(c: Color) -> id {
    color(
        c.r as f64 / 255.0,
        c.g as f64 / 255.0,
        c.b as f64 / 255.0,
        c.a as f64 / 255.0,
    )
}

unsafe fn bordered_layer(frame: NSRect, border_color: id, width: f64) -> id {
    let layer: id = msg_send![class!(CALayer), layer];
    let _: () = msg_send![layer, setFrame: frame];
    let _: () = msg_send![layer, setBorderColor: border_color];
    let _: () = msg_send![layer, setBorderWidth: width];
    layer
}

unsafe fn text_layer(text: &str, frame: NSRect, background: id, foreground: id) -> id {
    let layer: id = msg_send![class!(CATextLayer), layer];
    let string = NSString::alloc(nil).init_str(text);
    let _: () = msg_send![layer, setString: string];
    let _: () = msg_send![layer, setFontSize: LABEL_FONT_SIZE];
    let _: () = msg_send![layer, setForegroundColor: foreground];
    let _: () = msg_send![layer, setBackgroundColor: background];
    let _: () = msg_send![layer, setCornerRadius: 3.0f64];
    let mode = NSString::alloc(nil).init_str("center");
    let _: () = msg_send![layer, setAlignmentMode: mode];
    let _: () = msg_send![layer, setContentsScale: 2.0f64];
    let _: () = msg_send![layer, setFrame: frame];
    layer
}
