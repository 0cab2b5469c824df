//! Parser for the plural/select message grammar
//!
//! ```text
//! message  := (text | argument | '#')*
//! argument := '{' name '}'
//!           | '{' name ',' ('number' | 'date' | 'time') [',' style] '}'
//!           | '{' name ',' ('plural' | 'selectordinal') ',' ['offset:' n] option+ '}'
//!           | '{' name ',' 'select' ',' option+ '}'
//! option   := selector '{' message '}'
//! selector := '=' number | keyword
//! ```
//!
//! Apostrophes quote syntax characters: `''` is a literal apostrophe and
//! `'{...}'` is literal text. `#` is only special directly inside a
//! `plural`/`selectordinal` option.

use super::plural::PluralCategory;

/// Nesting limit for arguments inside options
const MAX_DEPTH: usize = 32;

/// Parsed message element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text
    Text(String),
    /// `{name}` and `{name, date}`-style references, stringified
    Argument(String),
    /// `{name, number}`
    Number(String),
    /// `#` inside a plural option
    Pound,
    /// `plural` or `selectordinal`
    Plural {
        arg: String,
        ordinal: bool,
        offset: f64,
        options: Vec<Branch>,
    },
    Select {
        arg: String,
        options: Vec<Branch>,
    },
}

/// Option key of a plural or select argument
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// `=N`
    Exact(f64),
    /// Category keyword or select value
    Keyword(String),
}

/// One option of a plural or select argument
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub selector: Selector,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Top,
    Plural,
    Other,
}

/// Parse a template into nodes, or describe why it is malformed
pub fn parse(template: &str) -> Result<Vec<Node>, String> {
    let mut parser = Parser {
        chars: template.chars().collect(),
        pos: 0,
    };
    let nodes = parser.message(0, Context::Top)?;
    if parser.pos < parser.chars.len() {
        return Err(format!("unexpected '}}' at offset {}", parser.pos));
    }
    Ok(nodes)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        match self.peek() {
            Some(found) if found == c => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(format!(
                "expected '{c}' at offset {}, found '{found}'",
                self.pos
            )),
            None => Err(format!("expected '{c}', found end of template")),
        }
    }

    /// Parse until end of input or an unconsumed closing brace
    fn message(&mut self, depth: usize, context: Context) -> Result<Vec<Node>, String> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        while let Some(c) = self.peek() {
            match c {
                '{' => {
                    flush(&mut text, &mut nodes);
                    nodes.push(self.argument(depth)?);
                }
                '}' => {
                    if depth == 0 {
                        return Err(format!("unmatched '}}' at offset {}", self.pos));
                    }
                    break;
                }
                '#' if context == Context::Plural => {
                    flush(&mut text, &mut nodes);
                    nodes.push(Node::Pound);
                    self.pos += 1;
                }
                '\'' => self.quoted(&mut text, context),
                _ => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }

        flush(&mut text, &mut nodes);
        Ok(nodes)
    }

    fn quoted(&mut self, text: &mut String, context: Context) {
        let next = self.peek_at(1);
        if next == Some('\'') {
            text.push('\'');
            self.pos += 2;
            return;
        }

        let starts_quote = matches!(next, Some('{') | Some('}'))
            || (next == Some('#') && context == Context::Plural);
        if !starts_quote {
            text.push('\'');
            self.pos += 1;
            return;
        }

        // Quoted literal runs to the next lone apostrophe or end of input.
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == '\'' {
                if self.peek_at(1) == Some('\'') {
                    text.push('\'');
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return;
            }
            text.push(c);
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_whitespace() && !matches!(c, '{' | '}' | ',' | '#' | '\''))
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn argument(&mut self, depth: usize) -> Result<Node, String> {
        if depth >= MAX_DEPTH {
            return Err("arguments nested too deeply".to_string());
        }

        self.expect('{')?;
        self.skip_whitespace();
        let name = self.identifier();
        if name.is_empty() {
            return Err(format!("empty argument name at offset {}", self.pos));
        }
        self.skip_whitespace();

        match self.peek() {
            Some('}') => {
                self.pos += 1;
                return Ok(Node::Argument(name));
            }
            Some(',') => self.pos += 1,
            _ => return Err(format!("malformed argument '{name}'")),
        }

        self.skip_whitespace();
        let kind = self.identifier();
        self.skip_whitespace();

        match kind.as_str() {
            "number" | "date" | "time" => {
                if self.peek() == Some(',') {
                    self.pos += 1;
                    self.skip_style()?;
                }
                self.skip_whitespace();
                self.expect('}')?;
                if kind == "number" {
                    Ok(Node::Number(name))
                } else {
                    Ok(Node::Argument(name))
                }
            }
            "plural" | "selectordinal" => {
                self.expect(',')?;
                let offset = self.offset()?;
                let options = self.options(depth, true)?;
                Ok(Node::Plural {
                    arg: name,
                    ordinal: kind == "selectordinal",
                    offset,
                    options,
                })
            }
            "select" => {
                self.expect(',')?;
                let options = self.options(depth, false)?;
                Ok(Node::Select { arg: name, options })
            }
            "" => Err(format!("missing argument type for '{name}'")),
            other => Err(format!("unknown argument type '{other}'")),
        }
    }

    /// Skip a format style up to (not including) the closing brace
    fn skip_style(&mut self) -> Result<(), String> {
        let mut nested = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '{' => nested += 1,
                '}' if nested == 0 => return Ok(()),
                '}' => nested -= 1,
                _ => {}
            }
            self.pos += 1;
        }
        Err("unterminated argument style".to_string())
    }

    fn offset(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        let rest: String = self.chars[self.pos..].iter().take(7).collect();
        if rest != "offset:" {
            return Ok(0.0);
        }
        self.pos += 7;
        self.skip_whitespace();
        let token = self.identifier();
        token
            .parse::<f64>()
            .map_err(|_| format!("invalid plural offset '{token}'"))
    }

    fn options(&mut self, depth: usize, plural: bool) -> Result<Vec<Branch>, String> {
        let mut options: Vec<Branch> = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err("unterminated options".to_string()),
                _ => {}
            }

            let token = self.identifier();
            let selector = selector(&token, plural)?;
            if options.iter().any(|b| b.selector == selector) {
                return Err(format!("duplicate option '{token}'"));
            }

            self.skip_whitespace();
            self.expect('{')?;
            let context = if plural { Context::Plural } else { Context::Other };
            let body = self.message(depth + 1, context)?;
            self.expect('}')?;

            options.push(Branch { selector, body });
        }

        let has_other = options
            .iter()
            .any(|b| b.selector == Selector::Keyword("other".to_string()));
        if !has_other {
            return Err("missing 'other' option".to_string());
        }

        Ok(options)
    }
}

fn selector(token: &str, plural: bool) -> Result<Selector, String> {
    if token.is_empty() {
        return Err("missing option selector".to_string());
    }

    if let Some(number) = token.strip_prefix('=') {
        if !plural {
            return Err(format!("explicit match '{token}' in select"));
        }
        return number
            .parse::<f64>()
            .map(Selector::Exact)
            .map_err(|_| format!("invalid explicit match '{token}'"));
    }

    if plural && PluralCategory::from_keyword(token).is_none() {
        return Err(format!("unknown plural category '{token}'"));
    }

    Ok(Selector::Keyword(token.to_string()))
}

fn flush(text: &mut String, nodes: &mut Vec<Node>) {
    if !text.is_empty() {
        nodes.push(Node::Text(std::mem::take(text)));
    }
}
