//! End-to-end scenarios: keystrokes travel through the fake event tap into
//! the controller exactly as the real tap delivers them.

use std::sync::Arc;

use super::Controller;
use crate::actions::PendingAction;
use crate::config::{Config, ConfigHandle};
use crate::geometry::{Point, Rect};
use crate::keys::{self, Key};
use crate::metrics::Metrics;
use crate::modes::Mode;
use crate::ports::fake::{FakeWorld, OverlayCall};
use crate::ports::{ClickKind, Element, EventTapPort};

const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);
const START: Point = Point::new(15, 25);

fn button(x: i32, y: i32) -> Element {
    Element {
        role: "AXButton".to_string(),
        title: None,
        bounds: Rect::new(x, y, 40, 20),
    }
}

fn setup_with(config: Config) -> (FakeWorld, Arc<Controller>) {
    let world = FakeWorld::new(SCREEN, START);
    let controller = Controller::new(
        world.ports(),
        ConfigHandle::new(config),
        Arc::new(Metrics::default()),
    );
    controller.install_key_handler();
    (world, controller)
}

fn press(world: &FakeWorld, key: Key) {
    world.event_tap.press(key);
}

/// Scenario 1: recursive 2x2 descent with backtrack and reset.
#[test]
fn recursive_descent_backtrack_reset() {
    let (world, controller) = setup_with(Config::default());
    controller.activate(Mode::RecursiveGrid, None).unwrap();

    press(&world, Key::Char('u'));
    assert_eq!(world.accessibility.last_move(), Some(Point::new(480, 270)));
    assert!(matches!(
        world.overlay.last_call(),
        Some(OverlayCall::DrawRecursiveGrid {
            bounds: Rect {
                x: 0,
                y: 0,
                width: 960,
                height: 540
            },
            depth: 1,
            ..
        })
    ));

    press(&world, Key::Char('k'));
    assert_eq!(world.accessibility.last_move(), Some(Point::new(720, 405)));

    press(&world, Key::Control(keys::BACKSPACE));
    assert_eq!(world.accessibility.last_move(), Some(Point::new(480, 270)));

    // Default reset key Ctrl+R.
    press(&world, Key::Control(0x12));
    assert_eq!(world.accessibility.last_move(), Some(Point::new(960, 540)));
    assert_eq!(controller.current_mode(), Mode::RecursiveGrid);
}

/// Scenario 2: an undividable cell commits and dispatches the pending click.
#[test]
fn recursive_commit_dispatches_pending_click() {
    let (world, controller) = setup_with(Config::default());
    *world.accessibility.screen.lock() = Rect::new(0, 0, 50, 50);
    controller
        .activate(Mode::RecursiveGrid, Some(PendingAction::LeftClick))
        .unwrap();

    press(&world, Key::Char('u'));
    assert_eq!(controller.current_mode(), Mode::Idle);
    assert_eq!(
        *world.accessibility.actions.lock(),
        vec![(ClickKind::Left, Point::new(12, 12))]
    );
    assert!(!world.event_tap.is_enabled());
}

/// Scenario 3: flat-grid full label opens a subgrid; a subgrid key commits.
#[test]
fn flat_grid_subgrid_commit() {
    let mut config = Config::default();
    config.grid.characters = "ABC".to_string();
    config.grid.sublayer_keys = "qweasdzxc".to_string();
    let (world, controller) = setup_with(config);
    *world.accessibility.screen.lock() = Rect::new(0, 0, 300, 300);

    controller
        .activate(Mode::Grid, Some(PendingAction::LeftClick))
        .unwrap();
    for c in ['a', 'a', 'a'] {
        press(&world, Key::Char(c));
    }
    match world.overlay.last_call() {
        Some(OverlayCall::ShowGrid(draw)) => {
            assert_eq!(draw.subgrid.unwrap().bounds, Rect::new(0, 0, 60, 60));
        }
        other => panic!("expected ShowGrid, got {other:?}"),
    }

    // The center subcell key commits and the pending action fires there.
    press(&world, Key::Char('s'));
    assert_eq!(controller.current_mode(), Mode::Idle);
    assert_eq!(
        *world.accessibility.actions.lock(),
        vec![(ClickKind::Left, Point::new(30, 30))]
    );
}

/// Scenario 4: hints with no pending action chain; escape restores the start.
#[test]
fn hints_chain_click_then_escape_restores() {
    let (world, controller) = setup_with(Config::default());
    world
        .accessibility
        .set_elements(vec![button(100, 100), button(600, 400)]);

    controller.activate(Mode::Hints, None).unwrap();
    // Labels over "ASDFGHJKL" for two hints: A and S.
    press(&world, Key::Char('s'));

    // Cursor moved to hint S and hints re-activated on the same screen.
    assert_eq!(controller.current_mode(), Mode::Hints);
    assert_eq!(
        world.accessibility.last_move(),
        Some(button(600, 400).center())
    );
    let hint_draws = world
        .overlay
        .calls_of(|c| matches!(c, OverlayCall::ShowHints(_)));
    assert!(hint_draws.len() >= 2, "hint set was regenerated");
    assert!(world.event_tap.is_enabled());

    press(&world, Key::Control(keys::ESCAPE));
    assert_eq!(controller.current_mode(), Mode::Idle);
    assert_eq!(world.accessibility.last_move(), Some(START));
    assert!(!world.event_tap.is_enabled());
}

/// Scenario 5: the active screen changes mid-recursive-grid; bounds remap
/// proportionally and progress survives.
#[test]
fn screen_change_during_recursive_grid() {
    let (world, controller) = setup_with(Config::default());
    controller.activate(Mode::RecursiveGrid, None).unwrap();

    press(&world, Key::Char('u'));
    press(&world, Key::Char('u'));

    let screen_b = Rect::new(1920, 0, 1920, 1080);
    *world.accessibility.screen.lock() = screen_b;

    press(&world, Key::Char('u'));
    let after_descent = world.accessibility.last_move().unwrap();
    assert!(screen_b.contains_point(after_descent));

    press(&world, Key::Control(keys::BACKSPACE));
    // Back to the remapped "before" bounds inside screen B.
    assert_eq!(
        world.accessibility.last_move(),
        Some(Rect::new(1920, 0, 480, 270).center())
    );
}

/// Scenario 6: with `mode_exit_keys = ["Ctrl+C"]`, a raw escape byte does not
/// exit but the produced Ctrl+C byte does.
#[test]
fn exit_key_override() {
    let mut config = Config::default();
    config.general.mode_exit_keys = vec!["Ctrl+C".to_string()];
    let (world, controller) = setup_with(config);
    world.accessibility.set_elements(vec![button(100, 100)]);

    controller.activate(Mode::Hints, None).unwrap();
    press(&world, Key::from_byte(0x1B));
    assert_eq!(controller.current_mode(), Mode::Hints);

    press(&world, Key::from_byte(0x03));
    assert_eq!(controller.current_mode(), Mode::Idle);
}
