//! Text generator fields: random strings over a character set, and the
//! quoting wrapper.

use crate::field::num::{Band, Odds};
use crate::field::{concat_fields, BuildResult, Field, Signal};
use crate::rand::Rand;
use crate::state::BuildState;

/// Common character sets for [`Str`] fields.
pub mod charset {
    pub const ALPHA_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
    pub const ALPHA_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    pub const SPACES: &str = "\n\r\t ";
    pub const NUM: &str = "1234567890";

    /// Upper- and lower-case alphabet.
    pub fn alpha() -> String {
        format!("{ALPHA_LOWER}{ALPHA_UPPER}")
    }

    /// Alphabet plus digits.
    pub fn alphanum() -> String {
        format!("{}{}", alpha(), NUM)
    }

    /// Every character in `0x00..0x100`.
    pub fn all() -> String {
        (0u32..0x100)
            .map(|c| char::from_u32(c).expect("latin-1 range"))
            .collect()
    }
}

/// Random string field.
///
/// Unlike the numeric fields, the odds distribution here picks a
/// *length*; that many characters are then drawn uniformly from the
/// charset. A hard-coded value, when set, is emitted instead half of
/// the time.
#[derive(Debug, Clone)]
pub struct Str {
    pub(crate) value: Option<String>,
    pub(crate) min: i64,
    pub(crate) max: i64,
    pub(crate) odds: Odds<i64>,
    pub(crate) charset: Vec<char>,
}

impl Str {
    /// Default length odds: mostly short strings, occasionally empty or
    /// up to a hundred characters, over the alphabetic charset.
    pub fn new() -> Self {
        Str {
            value: None,
            min: 0,
            max: 0x100,
            odds: Odds::new(vec![
                (0.85, Band::Span(0, 20)),
                (0.10, Band::At(1)),
                (0.025, Band::At(0)),
                (0.025, Band::Span(20, 100)),
            ]),
            charset: charset::alpha().chars().collect(),
        }
    }

    /// Uniform length in `[min, max)`.
    pub fn ranged(min: i64, max: i64) -> Self {
        Str {
            odds: Odds::uniform(min, max),
            min,
            max,
            ..Str::new()
        }
    }

    /// Hard-coded value, emitted instead of a random one half of the time.
    pub fn literal(value: impl Into<String>) -> Self {
        Str {
            value: Some(value.into()),
            ..Str::new()
        }
    }

    pub fn charset(mut self, charset: &str) -> Self {
        self.charset = charset.chars().collect();
        self
    }

    pub fn odds(mut self, odds: Odds<i64>) -> Self {
        self.odds = odds;
        self
    }

    pub(crate) fn build(&self, rand: &mut Rand) -> String {
        if let Some(v) = &self.value {
            if rand.coin() {
                return v.clone();
            }
        }
        let len = if self.min == self.max {
            self.min
        } else {
            self.odds.pick(rand)
        };
        rand.data(len.max(0) as usize, &self.charset)
    }
}

impl Default for Str {
    fn default() -> Self {
        Str::new()
    }
}

/// How [`Quote`] wraps its built children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    /// Wrap in the quote character verbatim.
    Raw(char),
    /// Emit as a source-code string literal, escaping embedded quotes
    /// and non-printable characters.
    Code,
    /// Single-quote wrap with `\xNN` escapes for anything outside the
    /// printable ASCII set; `<` and `>` are always escaped.
    HtmlJs,
}

/// Concatenates its children like `And`, then quotes the result.
#[derive(Debug)]
pub struct Quote {
    pub(crate) values: Vec<Field>,
    pub(crate) sep: String,
    pub(crate) style: QuoteStyle,
}

impl Quote {
    pub fn new(values: Vec<Field>) -> Self {
        Quote {
            values,
            sep: String::new(),
            style: QuoteStyle::Raw('"'),
        }
    }

    pub fn quote(mut self, quote: char) -> Self {
        self.style = QuoteStyle::Raw(quote);
        self
    }

    pub fn style(mut self, style: QuoteStyle) -> Self {
        self.style = style;
        self
    }

    pub fn sep(mut self, sep: impl Into<String>) -> Self {
        self.sep = sep.into();
        self
    }

    pub(crate) fn build(
        &self,
        st: &mut BuildState<'_>,
        pre: &mut Vec<String>,
        shortest: bool,
    ) -> BuildResult {
        let inner = concat_fields(&self.values, &self.sep, st, pre, shortest).map_err(Signal::Fail)?;
        Ok(match self.style {
            QuoteStyle::Raw(q) => format!("{q}{inner}{q}"),
            QuoteStyle::Code => code_escape(&inner),
            QuoteStyle::HtmlJs => html_js_escape(&inner),
        })
    }
}

/// Source-literal form of `s`: double-quoted with embedded quotes and
/// non-printables escaped.
pub fn code_escape(s: &str) -> String {
    format!("{s:?}")
}

/// Single-quoted form of `s` with every character outside the printable
/// ASCII set hex-escaped; `<` and `>` are escaped unconditionally.
pub fn html_js_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '<' => out.push_str("\\x3c"),
            '>' => out.push_str("\\x3e"),
            c if (' '..='~').contains(&c) && c != '\\' && c != '\'' => out.push(c),
            c if (c as u32) < 0x100 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
        }
    }
    out.push('\'');
    out
}
