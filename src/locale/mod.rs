//! Locale codes and fallback-chain construction
//!
//! A locale code is an opaque token, conventionally `language` or
//! `language-REGION`. The only structure assumed is the split on the first
//! separator into a base language and an optional region.
//!
//! # Usage
//!
//! ```
//! use tercume::locale::fallback_chain;
//!
//! assert_eq!(fallback_chain("tr-TR", "en"), vec!["tr-TR", "tr", "en"]);
//! assert_eq!(fallback_chain("en-US", "en"), vec!["en-US", "en"]);
//! assert_eq!(fallback_chain("en", "en"), vec!["en"]);
//! ```

/// Separators accepted between language and region
const SEPARATORS: &[char] = &['-', '_'];

/// Split a locale code into `(base, region)` on the first separator
///
/// An empty region (`"tr-"`) is treated as absent.
pub fn split_locale(locale: &str) -> (&str, Option<&str>) {
    match locale.split_once(SEPARATORS) {
        Some((base, region)) if !region.is_empty() => (base, Some(region)),
        Some((base, _)) => (base, None),
        None => (locale, None),
    }
}

/// Build the ordered, deduplicated list of locales tried during lookup
///
/// Most specific first: the full locale (only when it carries a region),
/// then its base language, then `fallback` unless already present.
pub fn fallback_chain(locale: &str, fallback: &str) -> Vec<String> {
    let mut chain: Vec<String> = Vec::with_capacity(3);
    let (base, region) = split_locale(locale);

    if region.is_some() {
        chain.push(locale.to_string());
    }

    if !chain.iter().any(|c| c == base) {
        chain.push(base.to_string());
    }

    if !chain.iter().any(|c| c == fallback) {
        chain.push(fallback.to_string());
    }

    chain
}

/// Normalize a locale code to `language-REGION` form
///
/// - tr_tr, TR-tr -> tr-TR
/// - EN -> en
///
/// Script or variant subtags after the region are kept verbatim.
pub fn normalize_locale(locale: &str) -> String {
    let trimmed = locale.trim();
    let (base, region) = split_locale(trimmed);
    let base = base.to_lowercase();

    match region {
        Some(region) => {
            let mut parts = region.splitn(2, SEPARATORS);
            let first = parts.next().unwrap_or_default();
            let first = if first.len() == 2 {
                first.to_uppercase()
            } else {
                first.to_string()
            };
            match parts.next() {
                Some(rest) => format!("{base}-{first}-{rest}"),
                None => format!("{base}-{first}"),
            }
        }
        None => base,
    }
}

/// Base language of a locale code, lower-cased
pub fn base_language(locale: &str) -> String {
    split_locale(locale).0.to_lowercase()
}
