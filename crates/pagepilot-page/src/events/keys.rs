//! `key` / `code` / `keyCode` resolution for synthetic keyboard events.

/// Legacy key codes for named keys.
const NAMED_KEY_CODES: [(&str, u32); 13] = [
    ("ArrowUp", 38),
    ("ArrowDown", 40),
    ("ArrowLeft", 37),
    ("ArrowRight", 39),
    ("Enter", 13),
    ("Escape", 27),
    ("Tab", 9),
    ("Backspace", 8),
    ("Delete", 46),
    ("Home", 36),
    ("End", 35),
    ("PageUp", 33),
    ("PageDown", 34),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// The `key` property. Single characters are lowercased.
    pub key: String,
    pub code: String,
    pub key_code: u32,
}

/// Resolve the event fields for a key name or a single character.
pub fn describe_key(key: &str) -> KeyDescriptor {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let upper = c.to_uppercase().next().unwrap_or(c);
            let code = if c.is_ascii_alphabetic() {
                format!("Key{}", upper)
            } else if c.is_ascii_digit() {
                format!("Digit{}", c)
            } else if c == ' ' {
                "Space".to_string()
            } else {
                c.to_string()
            };
            KeyDescriptor {
                key: c.to_lowercase().collect(),
                code,
                key_code: upper as u32,
            }
        }
        (None, _) => KeyDescriptor {
            key: String::new(),
            code: String::new(),
            key_code: 0,
        },
        _ => {
            let key_code = NAMED_KEY_CODES
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, code)| *code)
                .unwrap_or_else(|| key.chars().next().map(|c| c as u32).unwrap_or(0));
            KeyDescriptor {
                key: key.to_string(),
                code: key.to_string(),
                key_code,
            }
        }
    }
}
