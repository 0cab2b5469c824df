//! Message formatting
//!
//! Two paths turn a resolved message into display text:
//!
//! - [`interpolate`] replaces bare `{name}` placeholders in plain messages.
//! - [`TemplateFormatter`] evaluates plural/select grammar. Only strings that
//!   [`is_template`] classifies as grammar-bearing are routed here.
//!
//! # Example
//!
//! ```
//! use tercume::format::{Params, TemplateFormatter};
//!
//! let formatter = TemplateFormatter::new(64);
//! let template = "{count, plural, one {# item} other {# items}}";
//!
//! let params = Params::new().with("count", 5);
//! assert_eq!(formatter.format(template, "en", &params), "5 items");
//! ```

pub mod cache;
pub mod parser;
pub mod plural;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::{Error, Result};
use cache::BoundedCache;
use parser::{Branch, Node, Selector};
use plural::{OrdinalRule, PluralRule};

/// Named values substituted into messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or overwrite a value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Raw value for `name`
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Check if no values are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Check if a message uses plural/select grammar
///
/// Matches `{name, plural,`, `{name, select,` and `{name, selectordinal,`.
/// Plain `{name}` placeholders never match.
pub fn is_template(message: &str) -> bool {
    static TEMPLATE_RE: OnceLock<Regex> = OnceLock::new();

    let re = TEMPLATE_RE.get_or_init(|| {
        Regex::new(r"\{\s*\w+\s*,\s*(?:plural|select|selectordinal)\s*,")
            .expect("Invalid regex pattern")
    });

    re.is_match(message)
}

/// Replace `{name}` placeholders with parameter values
///
/// A parameter set to `null` renders as an empty string; placeholders with
/// no matching parameter are left verbatim. Substituted values are not
/// expanded again.
pub fn interpolate(template: &str, params: &Params) -> String {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

    let re = PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("Invalid regex pattern"));

    re.replace_all(template, |caps: &regex::Captures<'_>| match params.get(&caps[1]) {
        Some(value) => display_value(value),
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// Render a parameter value as display text
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A parsed template bound to the plural rules of one locale
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
    cardinal: PluralRule,
    ordinal: OrdinalRule,
}

impl CompiledTemplate {
    /// Parse `template` for `locale`
    pub fn compile(template: &str, locale: &str) -> Result<Self> {
        let nodes = parser::parse(template).map_err(|reason| Error::template(template, reason))?;
        Ok(Self {
            nodes,
            cardinal: PluralRule::for_locale(locale),
            ordinal: OrdinalRule::for_locale(locale),
        })
    }

    /// Evaluate against `params`
    pub fn evaluate(&self, params: &Params) -> std::result::Result<String, String> {
        let mut out = String::new();
        self.write_nodes(&self.nodes, params, None, &mut out)?;
        Ok(out)
    }

    fn write_nodes(
        &self,
        nodes: &[Node],
        params: &Params,
        pound: Option<f64>,
        out: &mut String,
    ) -> std::result::Result<(), String> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Argument(name) => {
                    let value = params
                        .get(name)
                        .ok_or_else(|| format!("no value for argument '{name}'"))?;
                    out.push_str(&display_value(value));
                }
                Node::Number(name) => {
                    let value = params
                        .get(name)
                        .and_then(numeric_value)
                        .ok_or_else(|| format!("argument '{name}' is not a number"))?;
                    out.push_str(&format_number(value));
                }
                Node::Pound => {
                    if let Some(value) = pound {
                        out.push_str(&format_number(value));
                    }
                }
                Node::Plural {
                    arg,
                    ordinal,
                    offset,
                    options,
                } => {
                    let value = params
                        .get(arg)
                        .and_then(numeric_value)
                        .ok_or_else(|| format!("plural argument '{arg}' is not a number"))?;
                    let shifted = value - offset;
                    let category = if *ordinal {
                        self.ordinal.categorize(shifted)
                    } else {
                        self.cardinal.categorize(shifted)
                    };

                    let exact = options
                        .iter()
                        .find(|b| matches!(b.selector, Selector::Exact(n) if n == value));
                    let branch = exact
                        .or_else(|| find_keyword(options, category.as_str()))
                        .or_else(|| find_keyword(options, "other"))
                        .ok_or_else(|| format!("no option for '{arg}'"))?;

                    self.write_nodes(&branch.body, params, Some(shifted), out)?;
                }
                Node::Select { arg, options } => {
                    let key = params.get(arg).map(display_value).unwrap_or_default();
                    let branch = find_keyword(options, &key)
                        .or_else(|| find_keyword(options, "other"))
                        .ok_or_else(|| format!("no option for '{arg}'"))?;

                    self.write_nodes(&branch.body, params, pound, out)?;
                }
            }
        }
        Ok(())
    }
}

fn find_keyword<'a>(options: &'a [Branch], keyword: &str) -> Option<&'a Branch> {
    options
        .iter()
        .find(|b| matches!(&b.selector, Selector::Keyword(k) if k == keyword))
}

/// Cache key for a compiled template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub locale: String,
    pub template: String,
}

/// Grammar formatter owning a bounded cache of compiled templates
///
/// One formatter belongs to one runtime instance; nothing is shared across
/// instances.
#[derive(Debug)]
pub struct TemplateFormatter {
    cache: Mutex<BoundedCache<TemplateKey, CompiledTemplate>>,
}

impl Default for TemplateFormatter {
    fn default() -> Self {
        Self::new(cache::DEFAULT_CAPACITY)
    }
}

impl TemplateFormatter {
    /// Create a formatter caching up to `capacity` compiled templates
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(BoundedCache::new(capacity)),
        }
    }

    /// Format `template`, returning the error on malformed grammar or params
    pub fn try_format(&self, template: &str, locale: &str, params: &Params) -> Result<String> {
        let compiled = self.compiled(template, locale)?;
        compiled
            .evaluate(params)
            .map_err(|reason| Error::template(template, reason))
    }

    /// Format `template`, returning it unchanged on any error
    pub fn format(&self, template: &str, locale: &str, params: &Params) -> String {
        match self.try_format(template, locale, params) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(locale = %locale, error = %e, "Template formatting failed");
                template.to_string()
            }
        }
    }

    /// Number of cached compiled templates
    pub fn cached(&self) -> usize {
        self.lock().size()
    }

    /// Check if a compiled form is cached for `(locale, template)`
    pub fn is_cached(&self, template: &str, locale: &str) -> bool {
        self.lock().has(&TemplateKey {
            locale: locale.to_string(),
            template: template.to_string(),
        })
    }

    /// Drop every cached compiled template
    pub fn clear_cache(&self) {
        self.lock().clear();
    }

    fn compiled(&self, template: &str, locale: &str) -> Result<Arc<CompiledTemplate>> {
        let key = TemplateKey {
            locale: locale.to_string(),
            template: template.to_string(),
        };

        if let Some(hit) = self.lock().get(&key) {
            return Ok(hit);
        }

        tracing::debug!(locale = %locale, "Compiling template");
        let compiled = CompiledTemplate::compile(template, locale)?;
        Ok(self.lock().set(key, compiled))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BoundedCache<TemplateKey, CompiledTemplate>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ITEMS: &str = "{count, plural, one {# item} other {# items}}";

    #[test]
    fn test_is_template() {
        assert!(is_template(ITEMS));
        assert!(is_template("{ g , select , male {he} other {they}}"));
        assert!(is_template("You came {n, selectordinal, one {#st} other {#th}}"));
        assert!(!is_template("Hello {name}!"));
        assert!(!is_template("{count, number}"));
        assert!(!is_template("plural, select"));
    }

    #[test]
    fn test_interpolate() {
        let params = Params::new().with("name", "Ann");
        assert_eq!(interpolate("Hello {name}!", &params), "Hello Ann!");
    }

    #[test]
    fn test_interpolate_null_and_missing() {
        let params = Params::new().with("a", Value::Null).with("n", 3);
        assert_eq!(interpolate("[{a}] {b} {n}", &params), "[] {b} 3");
    }

    #[test]
    fn test_interpolate_not_recursive() {
        let params = Params::new().with("a", "{b}").with("b", "x");
        assert_eq!(interpolate("{a}", &params), "{b}");
    }

    #[test]
    fn test_interpolate_ignores_non_word_placeholders() {
        let params = Params::new().with("a b", "x");
        assert_eq!(interpolate("{a b} {}", &params), "{a b} {}");
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!(1.0)), "1");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!(null)), "");
        assert_eq!(display_value(&json!(-4)), "-4");
    }

    #[test]
    fn test_plural_english() {
        let f = TemplateFormatter::new(8);
        assert_eq!(f.format(ITEMS, "en", &Params::new().with("count", 1)), "1 item");
        assert_eq!(f.format(ITEMS, "en", &Params::new().with("count", 5)), "5 items");
        assert_eq!(f.format(ITEMS, "en", &Params::new().with("count", 0)), "0 items");
    }

    #[test]
    fn test_exact_match_wins() {
        let f = TemplateFormatter::new(8);
        let t = "{n, plural, =0 {no items} =1 {a single item} one {# item} other {# items}}";
        assert_eq!(f.format(t, "en", &Params::new().with("n", 0)), "no items");
        assert_eq!(f.format(t, "en", &Params::new().with("n", 1)), "a single item");
        assert_eq!(f.format(t, "en", &Params::new().with("n", 2)), "2 items");
    }

    #[test]
    fn test_plural_russian() {
        let f = TemplateFormatter::new(8);
        let t = "{n, plural, one {# файл} few {# файла} many {# файлов} other {# файла}}";
        assert_eq!(f.format(t, "ru", &Params::new().with("n", 1)), "1 файл");
        assert_eq!(f.format(t, "ru", &Params::new().with("n", 3)), "3 файла");
        assert_eq!(f.format(t, "ru", &Params::new().with("n", 11)), "11 файлов");
    }

    #[test]
    fn test_offset() {
        let f = TemplateFormatter::new(8);
        let t = "{n, plural, offset:1 =0 {nobody} =1 {{host}} one {{host} and # other} other {{host} and # others}}";
        let p = |n: i64| Params::new().with("n", n).with("host", "Ann");
        assert_eq!(f.format(t, "en", &p(0)), "nobody");
        assert_eq!(f.format(t, "en", &p(1)), "Ann");
        assert_eq!(f.format(t, "en", &p(2)), "Ann and 1 other");
        assert_eq!(f.format(t, "en", &p(4)), "Ann and 3 others");
    }

    #[test]
    fn test_select() {
        let f = TemplateFormatter::new(8);
        let t = "{gender, select, female {She} male {He} other {They}} replied";
        assert_eq!(
            f.format(t, "en", &Params::new().with("gender", "female")),
            "She replied"
        );
        assert_eq!(
            f.format(t, "en", &Params::new().with("gender", "robot")),
            "They replied"
        );
    }

    #[test]
    fn test_selectordinal() {
        let f = TemplateFormatter::new(8);
        let t = "{pos, selectordinal, one {#st} two {#nd} few {#rd} other {#th}}";
        let p = |n: i64| Params::new().with("pos", n);
        assert_eq!(f.format(t, "en", &p(1)), "1st");
        assert_eq!(f.format(t, "en", &p(22)), "22nd");
        assert_eq!(f.format(t, "en", &p(13)), "13th");
        assert_eq!(f.format(t, "en", &p(103)), "103rd");
    }

    #[test]
    fn test_nested_select_in_plural() {
        let f = TemplateFormatter::new(8);
        let t = "{count, plural, one {{gender, select, female {her item} other {their item}}} other {{gender, select, female {her # items} other {their # items}}}}";
        let p = Params::new().with("count", 3).with("gender", "female");
        // `#` is literal inside a select even when nested in a plural
        assert_eq!(f.format(t, "en", &p), "her # items");

        let p = Params::new().with("count", 1).with("gender", "x");
        assert_eq!(f.format(t, "en", &p), "their item");
    }

    #[test]
    fn test_nested_plural_in_select() {
        let f = TemplateFormatter::new(8);
        let t = "{g, select, female {{n, plural, one {She has # cat} other {She has # cats}}} other {{n, plural, one {They have # cat} other {They have # cats}}}}";
        let p = Params::new().with("g", "female").with("n", 2);
        assert_eq!(f.format(t, "en", &p), "She has 2 cats");
    }

    #[test]
    fn test_numeric_string_and_decimals() {
        let f = TemplateFormatter::new(8);
        assert_eq!(f.format(ITEMS, "en", &Params::new().with("count", "1")), "1 item");
        assert_eq!(f.format(ITEMS, "en", &Params::new().with("count", 1.5)), "1.5 items");
    }

    #[test]
    fn test_malformed_returns_template() {
        let f = TemplateFormatter::new(8);
        let broken = "{count, plural, one {# item}";
        assert_eq!(f.format(broken, "en", &Params::new().with("count", 1)), broken);
        assert!(matches!(
            f.try_format(broken, "en", &Params::new()),
            Err(Error::TemplateFormat { .. })
        ));
    }

    #[test]
    fn test_missing_plural_value_is_error() {
        let f = TemplateFormatter::new(8);
        assert!(f.try_format(ITEMS, "en", &Params::new()).is_err());
        assert_eq!(f.format(ITEMS, "en", &Params::new().with("count", "many")), ITEMS);
    }

    #[test]
    fn test_cache_is_keyed_by_locale() {
        let f = TemplateFormatter::new(8);
        let p = Params::new().with("count", 0);
        assert_eq!(f.format(ITEMS, "en", &p), "0 items");
        assert_eq!(f.format(ITEMS, "fr", &p), "0 item");

        assert!(f.is_cached(ITEMS, "en"));
        assert!(f.is_cached(ITEMS, "fr"));
        assert_eq!(f.cached(), 2);
    }

    #[test]
    fn test_cache_bounded() {
        let f = TemplateFormatter::new(2);
        let p = Params::new().with("n", 1);
        for i in 0..5 {
            let t = format!("{{n, plural, one {{v{i}}} other {{v{i}s}}}}");
            assert_eq!(f.format(&t, "en", &p), format!("v{i}"));
        }
        assert_eq!(f.cached(), 2);

        f.clear_cache();
        assert_eq!(f.cached(), 0);
        assert_eq!(f.format(ITEMS, "en", &Params::new().with("count", 1)), "1 item");
    }
}
