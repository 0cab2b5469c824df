//! Common test utilities

use serde_json::{json, Value};

/// English fixture dictionary
#[allow(dead_code)]
pub fn english() -> Value {
    json!({
        "greeting": "Hello {name}!",
        "items": "{count, plural, one {# item} other {# items}}",
        "nav": {
            "home": "Home",
            "about": "About"
        }
    })
}

/// Turkish fixture dictionary, missing `nav.about`
#[allow(dead_code)]
pub fn turkish() -> Value {
    json!({
        "greeting": "Merhaba {name}!",
        "items": "{count, plural, other {# öğe}}",
        "nav": {
            "home": "Ana sayfa"
        }
    })
}
