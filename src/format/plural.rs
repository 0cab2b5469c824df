//! CLDR plural category rules
//!
//! Cardinal rules drive `plural`, ordinal rules drive `selectordinal`.
//! Operands follow the CLDR names: `n` absolute value, `i` integer digits,
//! `v` count of visible fraction digits, `f` visible fraction digits.

use crate::locale::{base_language, normalize_locale};

/// CLDR plural category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    /// Keyword used in template branches
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zero => "zero",
            Self::One => "one",
            Self::Two => "two",
            Self::Few => "few",
            Self::Many => "many",
            Self::Other => "other",
        }
    }

    /// Parse a branch keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "zero" => Some(Self::Zero),
            "one" => Some(Self::One),
            "two" => Some(Self::Two),
            "few" => Some(Self::Few),
            "many" => Some(Self::Many),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Plural operands of a number
#[derive(Debug, Clone, Copy, PartialEq)]
struct Operands {
    n: f64,
    i: u64,
    v: usize,
    f: u64,
}

impl Operands {
    fn new(value: f64) -> Self {
        let n = value.abs();
        let text = format!("{n}");
        let (int_part, frac_part) = match text.split_once('.') {
            Some((i, f)) => (i, f),
            None => (text.as_str(), ""),
        };

        Self {
            n,
            i: int_part.parse().unwrap_or(u64::MAX),
            v: frac_part.len(),
            f: frac_part.parse().unwrap_or(0),
        }
    }

    fn is_int(&self) -> bool {
        self.v == 0
    }
}

/// Cardinal plural rule families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralRule {
    /// one: i = 1 and v = 0
    English,
    /// one: i = 0,1
    French,
    /// one / few / many by last digits (ru, uk, be)
    EastSlavic,
    Polish,
    /// one / few for 2..4 / many for decimals (cs, sk)
    Czech,
    Arabic,
    Hebrew,
    Romanian,
    Lithuanian,
    /// Only `other` (ja, zh, ko, ...)
    Invariant,
}

impl PluralRule {
    /// Select the rule for a locale code, English-like when unknown
    pub fn for_locale(locale: &str) -> Self {
        if normalize_locale(locale) == "pt-PT" {
            return Self::English;
        }

        match base_language(locale).as_str() {
            "fr" | "pt" | "hy" => Self::French,
            "ru" | "uk" | "be" => Self::EastSlavic,
            "pl" => Self::Polish,
            "cs" | "sk" => Self::Czech,
            "ar" => Self::Arabic,
            "he" | "iw" => Self::Hebrew,
            "ro" | "mo" => Self::Romanian,
            "lt" => Self::Lithuanian,
            "ja" | "zh" | "ko" | "th" | "vi" | "id" | "ms" | "lo" | "my" => Self::Invariant,
            _ => Self::English,
        }
    }

    /// Categorize a number
    pub fn categorize(&self, value: f64) -> PluralCategory {
        let op = Operands::new(value);
        let i10 = op.i % 10;
        let i100 = op.i % 100;

        match self {
            Self::English => {
                if op.i == 1 && op.is_int() {
                    PluralCategory::One
                } else {
                    PluralCategory::Other
                }
            }
            Self::French => {
                if op.i <= 1 {
                    PluralCategory::One
                } else {
                    PluralCategory::Other
                }
            }
            Self::EastSlavic => {
                if !op.is_int() {
                    PluralCategory::Other
                } else if i10 == 1 && i100 != 11 {
                    PluralCategory::One
                } else if (2..=4).contains(&i10) && !(12..=14).contains(&i100) {
                    PluralCategory::Few
                } else {
                    PluralCategory::Many
                }
            }
            Self::Polish => {
                if !op.is_int() {
                    PluralCategory::Other
                } else if op.i == 1 {
                    PluralCategory::One
                } else if (2..=4).contains(&i10) && !(12..=14).contains(&i100) {
                    PluralCategory::Few
                } else {
                    PluralCategory::Many
                }
            }
            Self::Czech => {
                if !op.is_int() {
                    PluralCategory::Many
                } else if op.i == 1 {
                    PluralCategory::One
                } else if (2..=4).contains(&op.i) {
                    PluralCategory::Few
                } else {
                    PluralCategory::Other
                }
            }
            Self::Arabic => {
                if !op.is_int() {
                    return PluralCategory::Other;
                }
                match op.i {
                    0 => PluralCategory::Zero,
                    1 => PluralCategory::One,
                    2 => PluralCategory::Two,
                    _ if (3..=10).contains(&i100) => PluralCategory::Few,
                    _ if (11..=99).contains(&i100) => PluralCategory::Many,
                    _ => PluralCategory::Other,
                }
            }
            Self::Hebrew => {
                if (op.i == 1 && op.is_int()) || (op.i == 0 && !op.is_int()) {
                    PluralCategory::One
                } else if op.i == 2 && op.is_int() {
                    PluralCategory::Two
                } else {
                    PluralCategory::Other
                }
            }
            Self::Romanian => {
                if op.i == 1 && op.is_int() {
                    PluralCategory::One
                } else if !op.is_int() || op.n == 0.0 || (1..=19).contains(&i100) {
                    PluralCategory::Few
                } else {
                    PluralCategory::Other
                }
            }
            Self::Lithuanian => {
                if op.f != 0 {
                    PluralCategory::Many
                } else if i10 == 1 && !(11..=19).contains(&i100) {
                    PluralCategory::One
                } else if (2..=9).contains(&i10) && !(11..=19).contains(&i100) {
                    PluralCategory::Few
                } else {
                    PluralCategory::Other
                }
            }
            Self::Invariant => PluralCategory::Other,
        }
    }
}

/// Ordinal plural rule families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrdinalRule {
    /// 1st, 2nd, 3rd, 4th
    English,
    /// one: n = 1
    French,
    /// many: n = 11,8,80,800
    Italian,
    /// one: n % 10 = 1,2 and n % 100 != 11,12
    Swedish,
    /// Only `other`
    Invariant,
}

impl OrdinalRule {
    /// Select the ordinal rule for a locale code
    pub fn for_locale(locale: &str) -> Self {
        match base_language(locale).as_str() {
            "en" => Self::English,
            "fr" | "ms" | "vi" | "hy" | "ro" => Self::French,
            "it" => Self::Italian,
            "sv" => Self::Swedish,
            _ => Self::Invariant,
        }
    }

    /// Categorize a number
    pub fn categorize(&self, value: f64) -> PluralCategory {
        let op = Operands::new(value);
        if !op.is_int() {
            return PluralCategory::Other;
        }
        let n10 = op.i % 10;
        let n100 = op.i % 100;

        match self {
            Self::English => match (n10, n100) {
                (1, n) if n != 11 => PluralCategory::One,
                (2, n) if n != 12 => PluralCategory::Two,
                (3, n) if n != 13 => PluralCategory::Few,
                _ => PluralCategory::Other,
            },
            Self::French => {
                if op.i == 1 {
                    PluralCategory::One
                } else {
                    PluralCategory::Other
                }
            }
            Self::Italian => match op.i {
                11 | 8 | 80 | 800 => PluralCategory::Many,
                _ => PluralCategory::Other,
            },
            Self::Swedish => {
                if (n10 == 1 || n10 == 2) && n100 != 11 && n100 != 12 {
                    PluralCategory::One
                } else {
                    PluralCategory::Other
                }
            }
            Self::Invariant => PluralCategory::Other,
        }
    }
}
