//! Hint engine: collect elements, label them, filter by prefix, commit.
//!
//! Labels are uppercase, all the same length (`ceil(log_n(count))`), so no
//! label is a prefix of another and an exact match is unambiguous. Duplicate
//! element centers are dropped during collection: downstream rendering
//! assumes label-to-point uniqueness.

use std::collections::{HashMap, HashSet};

use crate::geometry::{Point, Rect};
use crate::ports::{Element, ElementFilter, HintDraw};

/// Roles considered clickable when collecting hint targets.
pub const CLICKABLE_ROLES: &[&str] = &[
    "AXButton",
    "AXLink",
    "AXMenuItem",
    "AXMenuBarItem",
    "AXMenuButton",
    "AXCheckBox",
    "AXRadioButton",
    "AXPopUpButton",
    "AXComboBox",
    "AXTextField",
    "AXTextArea",
    "AXDisclosureTriangle",
    "AXSlider",
    "AXTabButton",
    "AXCell",
];

/// The element filter used for hint collection.
pub fn hint_filter() -> ElementFilter {
    ElementFilter {
        roles: CLICKABLE_ROLES.iter().map(|r| r.to_string()).collect(),
        min_size: 4,
        include_offscreen: false,
    }
}

/// A labelled hint anchored to an accessibility element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub label: String,
    pub position: Point,
    pub bounds: Rect,
    pub element: Element,
}

/// Outcome of feeding one character to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintEvent {
    /// The prefix changed; redraw the surviving hints.
    Updated,
    /// An exact label match; move the cursor here.
    Committed { point: Point },
    /// The character extends no surviving label.
    Ignored,
}

/// Insertion-ordered hint set plus the in-flight prefix.
pub struct HintManager {
    hints: Vec<Hint>,
    by_label: HashMap<String, usize>,
    prefix: String,
}

impl HintManager {
    /// Label `elements` for `screen`. Elements whose center is off-screen and
    /// elements sharing a center with an earlier one are dropped.
    pub fn build(elements: Vec<Element>, alphabet: &str, screen: Rect) -> Self {
        let alphabet: Vec<char> = alphabet
            .to_ascii_uppercase()
            .chars()
            .collect();

        let mut seen_centers = HashSet::new();
        let targets: Vec<Element> = elements
            .into_iter()
            .filter(|e| screen.contains_point(e.center()))
            .filter(|e| seen_centers.insert(e.center()))
            .collect();

        let label_len = label_length(alphabet.len(), targets.len());
        let mut hints = Vec::with_capacity(targets.len());
        let mut by_label = HashMap::with_capacity(targets.len());
        for (i, element) in targets.into_iter().enumerate() {
            let label = encode(&alphabet, i, label_len);
            by_label.insert(label.clone(), i);
            hints.push(Hint {
                label,
                position: element.center(),
                bounds: element.bounds,
                element,
            });
        }

        Self {
            hints,
            by_label,
            prefix: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Feed a printable character. The exact-match commit happens on the
    /// keystroke completing a label.
    pub fn handle_char(&mut self, c: char) -> HintEvent {
        let mut candidate = self.prefix.clone();
        candidate.push(c.to_ascii_uppercase());

        if let Some(&index) = self.by_label.get(&candidate) {
            return HintEvent::Committed {
                point: self.hints[index].position,
            };
        }
        if self
            .hints
            .iter()
            .any(|h| h.label.starts_with(&candidate))
        {
            self.prefix = candidate;
            HintEvent::Updated
        } else {
            HintEvent::Ignored
        }
    }

    /// Backspace shortens the prefix by one character.
    pub fn backspace(&mut self) -> HintEvent {
        if self.prefix.pop().is_some() {
            HintEvent::Updated
        } else {
            HintEvent::Ignored
        }
    }

    /// Hints surviving the current prefix, ready for rendering.
    pub fn visible(&self) -> Vec<HintDraw> {
        self.hints
            .iter()
            .filter(|h| h.label.starts_with(&self.prefix))
            .map(|h| HintDraw {
                label: h.label.clone(),
                matched: self.prefix.len(),
                position: h.position,
                bounds: h.bounds,
            })
            .collect()
    }
}

/// Minimal uniform label length: `ceil(log_n(count))`, at least 1.
fn label_length(n: usize, count: usize) -> usize {
    let n = n.max(2);
    if count <= 1 {
        return 1;
    }
    let mut len = 1;
    let mut capacity = n;
    while capacity < count {
        capacity *= n;
        len += 1;
    }
    len
}

/// Fixed-length base-`n` encoding of `index`.
fn encode(alphabet: &[char], index: usize, len: usize) -> String {
    let n = alphabet.len();
    let mut digits = vec![0usize; len];
    let mut rest = index;
    for slot in digits.iter_mut().rev() {
        *slot = rest % n;
        rest /= n;
    }
    digits.iter().map(|&d| alphabet[d]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 1920, 1080);

    fn element(x: i32, y: i32) -> Element {
        Element {
            role: "AXButton".to_string(),
            title: None,
            bounds: Rect::new(x, y, 40, 20),
        }
    }

    #[test]
    fn labels_are_uniform_length_minimal() {
        let elements: Vec<Element> = (0..10).map(|i| element(i * 50, 100)).collect();
        let manager = HintManager::build(elements, "ABC", SCREEN);
        // 10 hints over a 3-letter alphabet need 3 characters (9 < 10 <= 27).
        assert_eq!(manager.len(), 10);
        assert!(manager
            .visible()
            .iter()
            .all(|h| h.label.len() == 3));
    }

    #[test]
    fn few_hints_get_single_letter_labels() {
        let elements: Vec<Element> = (0..3).map(|i| element(i * 50, 100)).collect();
        let manager = HintManager::build(elements, "ASDF", SCREEN);
        let labels: Vec<String> = manager.visible().iter().map(|h| h.label.clone()).collect();
        assert_eq!(labels, ["A", "S", "D"]);
    }

    #[test]
    fn off_screen_and_duplicate_centers_are_dropped() {
        let mut elements = vec![element(100, 100), element(100, 100)];
        elements.push(element(5000, 100));
        let manager = HintManager::build(elements, "AB", SCREEN);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn prefix_narrows_and_commit_fires_on_exact_match() {
        let elements: Vec<Element> = (0..4).map(|i| element(i * 50, 100)).collect();
        let mut manager = HintManager::build(elements, "AB", SCREEN);
        // Labels: AA AB BA BB.
        assert_eq!(manager.handle_char('b'), HintEvent::Updated);
        assert_eq!(manager.visible().len(), 2);
        assert!(manager.visible().iter().all(|h| h.matched == 1));
        assert_eq!(
            manager.handle_char('a'),
            HintEvent::Committed {
                point: element(100, 100).center(),
            }
        );
    }

    #[test]
    fn non_matching_character_is_ignored() {
        let elements: Vec<Element> = (0..4).map(|i| element(i * 50, 100)).collect();
        let mut manager = HintManager::build(elements, "AB", SCREEN);
        assert_eq!(manager.handle_char('z'), HintEvent::Ignored);
        assert_eq!(manager.prefix(), "");
    }

    #[test]
    fn backspace_shortens_the_prefix() {
        let elements: Vec<Element> = (0..4).map(|i| element(i * 50, 100)).collect();
        let mut manager = HintManager::build(elements, "AB", SCREEN);
        manager.handle_char('a');
        assert_eq!(manager.prefix(), "A");
        assert_eq!(manager.backspace(), HintEvent::Updated);
        assert_eq!(manager.prefix(), "");
        assert_eq!(manager.backspace(), HintEvent::Ignored);
        assert_eq!(manager.visible().len(), 4);
    }

    #[test]
    fn lowercase_input_matches_uppercase_labels() {
        let elements: Vec<Element> = (0..2).map(|i| element(i * 50, 100)).collect();
        let mut manager = HintManager::build(elements, "ab", SCREEN);
        assert_eq!(
            manager.handle_char('a'),
            HintEvent::Committed {
                point: element(0, 100).center(),
            }
        );
    }
}
