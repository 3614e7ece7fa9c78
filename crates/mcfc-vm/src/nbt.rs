//! NBT values and their SNBT text form.

use crate::error::{VmError, VmResult};
use indexmap::IndexMap;
use std::fmt;

/// A structured-store value.
#[derive(Debug, Clone, PartialEq)]
pub enum Nbt {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<Nbt>),
    Compound(IndexMap<String, Nbt>),
}

impl Nbt {
    /// An empty compound.
    pub fn compound() -> Self {
        Nbt::Compound(IndexMap::new())
    }

    /// Parse SNBT text (`{a:1b,b:[1,2],c:"x"}`).
    pub fn parse(text: &str) -> VmResult<Nbt> {
        let mut parser = Parser {
            chars: text.chars().collect(),
            pos: 0,
        };
        let value = parser.value()?;
        parser.skip_ws();
        if parser.pos != parser.chars.len() {
            return Err(VmError::Snbt(format!("trailing input in '{text}'")));
        }
        Ok(value)
    }

    /// Numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Nbt::Byte(v) => Some(v as f64),
            Nbt::Short(v) => Some(v as f64),
            Nbt::Int(v) => Some(v as f64),
            Nbt::Long(v) => Some(v as f64),
            Nbt::Float(v) => Some(v as f64),
            Nbt::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Nbt::String(s) => Some(s),
            _ => None,
        }
    }

    /// What `data get` reports: numbers as-is, the length of strings,
    /// lists and compounds.
    pub fn magnitude(&self) -> f64 {
        match self {
            Nbt::String(s) => s.chars().count() as f64,
            Nbt::List(items) => items.len() as f64,
            Nbt::Compound(map) => map.len() as f64,
            other => other.as_f64().unwrap_or_default(),
        }
    }

    /// Text substituted for `$(key)` in macro lines.
    pub fn macro_text(&self) -> String {
        match self {
            Nbt::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Text shown by `tellraw` NBT components.
    pub fn display_text(&self) -> String {
        self.macro_text()
    }
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+')
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in s.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            other => write!(f, "{other}")?,
        }
    }
    write!(f, "\"")
}

impl fmt::Display for Nbt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nbt::Byte(v) => write!(f, "{v}b"),
            Nbt::Short(v) => write!(f, "{v}s"),
            Nbt::Int(v) => write!(f, "{v}"),
            Nbt::Long(v) => write!(f, "{v}L"),
            Nbt::Float(v) => write!(f, "{v:?}f"),
            Nbt::Double(v) => write!(f, "{v:?}d"),
            Nbt::String(s) => write_quoted(f, s),
            Nbt::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Nbt::Compound(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !key.is_empty() && key.chars().all(is_bare_char) {
                        write!(f, "{key}")?;
                    } else {
                        write_quoted(f, key)?;
                    }
                    write!(f, ":{value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ── SNBT parser ──────────────────────────────────────────────────────────────

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, msg: &str) -> VmError {
        VmError::Snbt(format!("{msg} at offset {}", self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> VmResult<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn value(&mut self) -> VmResult<Nbt> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.compound(),
            Some('[') => self.list(),
            Some('"') | Some('\'') => Ok(Nbt::String(self.quoted()?)),
            Some(_) => {
                let word = self.bare()?;
                Ok(classify(&word))
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn compound(&mut self) -> VmResult<Nbt> {
        self.expect('{')?;
        let mut map = IndexMap::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Nbt::Compound(map));
        }
        loop {
            self.skip_ws();
            let key = match self.peek() {
                Some('"') | Some('\'') => self.quoted()?,
                _ => self.bare()?,
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    return Ok(Nbt::Compound(map));
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn list(&mut self) -> VmResult<Nbt> {
        self.expect('[')?;
        // Typed arrays: [B;1b,2b], [I;1,2], [L;1L].
        if let (Some(t), Some(';')) = (self.peek(), self.chars.get(self.pos + 1).copied()) {
            if matches!(t, 'B' | 'I' | 'L') {
                self.pos += 2;
            }
        }
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(Nbt::List(items));
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(Nbt::List(items));
                }
                _ => return Err(self.error("expected ',' or ']'")),
            }
        }
    }

    fn quoted(&mut self) -> VmResult<String> {
        let Some(quote) = self.peek() else {
            return Err(self.error("expected string"));
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => out.push(c),
                        None => return Err(self.error("unterminated escape")),
                    }
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn bare(&mut self) -> VmResult<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_bare_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a value"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}

/// Type an unquoted SNBT token.
fn classify(word: &str) -> Nbt {
    match word {
        "true" => return Nbt::Byte(1),
        "false" => return Nbt::Byte(0),
        _ => {}
    }
    let (body, suffix) = match word.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() && i > 0 => (&word[..i], Some(c.to_ascii_lowercase())),
        _ => (word, None),
    };
    let typed = match suffix {
        Some('b') => body.parse().ok().map(Nbt::Byte),
        Some('s') => body.parse().ok().map(Nbt::Short),
        Some('l') => body.parse().ok().map(Nbt::Long),
        Some('f') => body.parse().ok().map(Nbt::Float),
        Some('d') => body.parse().ok().map(Nbt::Double),
        Some(_) => None,
        None => body.parse().ok().map(Nbt::Int).or_else(|| {
            let looks_decimal = body.contains(&['.', 'e', 'E'][..])
                && body.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
            if looks_decimal {
                body.parse().ok().map(Nbt::Double)
            } else {
                None
            }
        }),
    };
    typed.unwrap_or_else(|| Nbt::String(word.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(Nbt::parse("1b").unwrap(), Nbt::Byte(1));
        assert_eq!(Nbt::parse("-5").unwrap(), Nbt::Int(-5));
        assert_eq!(Nbt::parse("3L").unwrap(), Nbt::Long(3));
        assert_eq!(Nbt::parse("2.5d").unwrap(), Nbt::Double(2.5));
        assert_eq!(Nbt::parse("2.5").unwrap(), Nbt::Double(2.5));
        assert_eq!(Nbt::parse("true").unwrap(), Nbt::Byte(1));
        assert_eq!(Nbt::parse("v1a").unwrap(), Nbt::String("v1a".into()));
        assert_eq!(Nbt::parse(r#""a \"q\"""#).unwrap(), Nbt::String("a \"q\"".into()));
    }

    #[test]
    fn test_parse_nested() {
        let value = Nbt::parse(r#"{m:32500000,e:0,s:0b,tags:["x",'y'],"odd key":{}}"#).unwrap();
        let Nbt::Compound(map) = &value else {
            panic!("expected compound");
        };
        assert_eq!(map["m"], Nbt::Int(32500000));
        assert_eq!(map["s"], Nbt::Byte(0));
        assert_eq!(
            map["tags"],
            Nbt::List(vec![Nbt::String("x".into()), Nbt::String("y".into())])
        );
        assert_eq!(map["odd key"], Nbt::compound());
    }

    #[test]
    fn test_display_reparses() {
        let text = r#"{a:1b,b:[1,2],c:"hi","d e":2.5d}"#;
        let value = Nbt::parse(text).unwrap();
        assert_eq!(value.to_string(), text);
        assert_eq!(Nbt::parse(&value.to_string()).unwrap(), value);
    }

    #[test]
    fn test_typed_array() {
        assert_eq!(
            Nbt::parse("[I;1,2]").unwrap(),
            Nbt::List(vec![Nbt::Int(1), Nbt::Int(2)])
        );
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(Nbt::String("abc".into()).magnitude(), 3.0);
        assert_eq!(Nbt::List(vec![Nbt::Int(1)]).magnitude(), 1.0);
        assert_eq!(Nbt::Double(-2.5).magnitude(), -2.5);
    }

    #[test]
    fn test_malformed() {
        assert!(Nbt::parse("{a:1").is_err());
        assert!(Nbt::parse("[1,").is_err());
        assert!(Nbt::parse("{a:1} x").is_err());
    }
}
