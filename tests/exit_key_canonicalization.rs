use keywarp::keys::{key_matches_any, parse_key, parse_key_list, Key};

#[test]
fn escape_byte_and_name_are_the_same_key() {
    let configured = parse_key_list(&["escape".to_string()]).unwrap();
    assert!(key_matches_any(Key::from_byte(0x1B), &configured));
    assert!(!key_matches_any(Key::from_byte(0x03), &configured));
}

#[test]
fn ctrl_c_matches_the_produced_byte_only() {
    let configured = parse_key_list(&["Ctrl+C".to_string()]).unwrap();
    assert!(key_matches_any(Key::from_byte(0x03), &configured));
    assert!(!key_matches_any(Key::from_byte(0x1B), &configured));
    assert!(!key_matches_any(Key::Char('c'), &configured));
}

#[test]
fn multiple_exit_keys_all_match() {
    let configured = parse_key_list(&[
        "escape".to_string(),
        "Ctrl+C".to_string(),
        "q".to_string(),
    ])
    .unwrap();
    assert!(key_matches_any(Key::Control(0x1B), &configured));
    assert!(key_matches_any(Key::Control(0x03), &configured));
    assert!(key_matches_any(Key::Char('Q'), &configured));
    assert!(!key_matches_any(Key::Char('x'), &configured));
}

#[test]
fn control_byte_names_canonicalize() {
    assert_eq!(parse_key("tab").unwrap(), Key::Control(0x09));
    assert_eq!(parse_key("ctrl+d").unwrap(), Key::Control(0x04));
    assert_eq!(parse_key("ctrl+u").unwrap(), Key::Control(0x15));
    assert_eq!(parse_key("backspace").unwrap(), Key::Control(0x7F));
}
