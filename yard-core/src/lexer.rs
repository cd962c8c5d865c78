//! Character-class tokenizer.
//!
//! A [`Tokenizer`] is an ordered list of rules, each pairing a token kind with
//! a [`Pattern`]. At every offset the first rule whose pattern matches a
//! non-empty prefix wins; rules marked as skipped (whitespace, comments)
//! consume input without producing a token.

use log::trace;

use crate::error::CoreError;
use crate::registry::{Kind, Registry};

/// A single token with its kind, text and byte offset into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: Kind,
    pub text: String,
    pub start: usize,
}

/// Character-class matcher.
///
/// Matching never consumes partially: [`Pattern::matches`] either returns the
/// end offset of the match or `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Any character in `lo..=hi`.
    Range(char, char),
    Char(char),
    Literal(String),
    /// First alternative that matches.
    Any(Vec<Pattern>),
    /// All patterns, one after the other.
    Seq(Vec<Pattern>),
    /// Greedy repetition with a minimum count.
    Repeat(Box<Pattern>, usize),
    /// Everything up to (not including) the next newline.
    RestOfLine,
}

impl Pattern {
    pub fn literal(text: &str) -> Self {
        Pattern::Literal(text.to_string())
    }

    pub fn repeat(pattern: Pattern, min: usize) -> Self {
        Pattern::Repeat(Box::new(pattern), min)
    }

    pub fn optional(pattern: Pattern) -> Self {
        Pattern::Any(vec![pattern, Pattern::Seq(Vec::new())])
    }

    /// Returns the end offset of a match starting at `at`, if any.
    pub fn matches(&self, source: &str, at: usize) -> Option<usize> {
        match self {
            Pattern::Range(lo, hi) => {
                let ch = source.get(at..)?.chars().next()?;
                (*lo <= ch && ch <= *hi).then(|| at + ch.len_utf8())
            }
            Pattern::Char(expected) => {
                let ch = source.get(at..)?.chars().next()?;
                (ch == *expected).then(|| at + ch.len_utf8())
            }
            Pattern::Literal(text) => source
                .get(at..)?
                .starts_with(text.as_str())
                .then(|| at + text.len()),
            Pattern::Any(branches) => branches.iter().find_map(|b| b.matches(source, at)),
            Pattern::Seq(parts) => parts
                .iter()
                .try_fold(at, |position, part| part.matches(source, position)),
            Pattern::Repeat(element, min) => {
                let mut position = at;
                let mut count = 0;
                while let Some(next) = element.matches(source, position) {
                    if next == position {
                        break;
                    }
                    position = next;
                    count += 1;
                }
                (count >= *min).then_some(position)
            }
            Pattern::RestOfLine => {
                let rest = source.get(at..)?;
                Some(at + rest.find('\n').unwrap_or(rest.len()))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct TokenRule {
    kind: Kind,
    pattern: Pattern,
    keep: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    rules: Vec<TokenRule>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule producing tokens of kind `name`.
    pub fn rule(&mut self, registry: &mut Registry, name: &str, pattern: Pattern) -> Kind {
        let kind = registry.intern(name);
        self.rules.push(TokenRule {
            kind,
            pattern,
            keep: true,
        });
        kind
    }

    /// Adds one literal rule per punctuation string; each kind is named by
    /// its own text.
    pub fn punctuation(&mut self, registry: &mut Registry, symbols: &[&str]) {
        for symbol in symbols {
            self.rule(registry, symbol, Pattern::literal(symbol));
        }
    }

    /// Adds a rule whose matches are consumed but not emitted.
    pub fn skip(&mut self, registry: &mut Registry, name: &str, pattern: Pattern) {
        let kind = registry.intern(name);
        self.rules.push(TokenRule {
            kind,
            pattern,
            keep: false,
        });
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, CoreError> {
        let mut tokens = Vec::new();
        let mut index = 0;

        while index < source.len() {
            let matched = self.rules.iter().find_map(|rule| {
                rule.pattern
                    .matches(source, index)
                    .filter(|end| *end > index)
                    .map(|end| (rule, end))
            });

            let Some((rule, end)) = matched else {
                let found = source[index..].chars().next().unwrap_or('\0');
                return Err(CoreError::Lex {
                    offset: index,
                    found,
                });
            };

            if rule.keep {
                tokens.push(Token {
                    kind: rule.kind,
                    text: source[index..end].to_string(),
                    start: index,
                });
            }
            index = end;
        }

        trace!("tokenized {} bytes into {} tokens", source.len(), tokens.len());
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digit() -> Pattern {
        Pattern::Range('0', '9')
    }

    fn arithmetic(registry: &mut Registry) -> Tokenizer {
        let mut tokenizer = Tokenizer::new();
        tokenizer.rule(registry, "number", Pattern::repeat(digit(), 1));
        tokenizer.rule(
            registry,
            "identifier",
            Pattern::Seq(vec![
                Pattern::Range('a', 'z'),
                Pattern::repeat(Pattern::Range('a', 'z'), 0),
            ]),
        );
        tokenizer.punctuation(registry, &["+", "*", "(", ")"]);
        tokenizer.skip(registry, "ws", Pattern::Char(' '));
        tokenizer
    }

    #[test]
    fn produces_kinds_text_and_offsets() {
        let mut registry = Registry::new();
        let tokenizer = arithmetic(&mut registry);
        let tokens = tokenizer.tokenize("12 + ab*(3)").expect("tokenize");

        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["12", "+", "ab", "*", "(", "3", ")"]);
        let starts: Vec<_> = tokens.iter().map(|t| t.start).collect();
        assert_eq!(starts, [0, 3, 5, 7, 8, 9, 10]);
        assert_eq!(registry.name(tokens[2].kind), "identifier");
        assert_eq!(registry.name(tokens[1].kind), "+");
    }

    #[test]
    fn rejects_unmatched_character() {
        let mut registry = Registry::new();
        let tokenizer = arithmetic(&mut registry);
        let err = tokenizer.tokenize("1 + $").unwrap_err();
        assert!(matches!(err, CoreError::Lex { offset: 4, found: '$' }));
    }

    #[test]
    fn optional_fraction_does_not_consume_a_lone_dot() {
        let number = Pattern::Seq(vec![
            Pattern::repeat(digit(), 1),
            Pattern::optional(Pattern::Seq(vec![
                Pattern::Char('.'),
                Pattern::repeat(digit(), 1),
            ])),
        ]);
        assert_eq!(number.matches("2.5;", 0), Some(3));
        assert_eq!(number.matches("2.;", 0), Some(1));
        assert_eq!(number.matches("x", 0), None);
    }

    #[test]
    fn rest_of_line_stops_before_newline() {
        let comment = Pattern::Seq(vec![Pattern::literal("//"), Pattern::RestOfLine]);
        assert_eq!(comment.matches("// hi\nx", 0), Some(5));
        assert_eq!(comment.matches("// end", 0), Some(6));
    }

    #[test]
    fn first_rule_wins() {
        let mut registry = Registry::new();
        let mut tokenizer = Tokenizer::new();
        let keyword = tokenizer.rule(&mut registry, "void", Pattern::literal("void"));
        let ident = tokenizer.rule(
            &mut registry,
            "identifier",
            Pattern::repeat(Pattern::Range('a', 'z'), 1),
        );
        let tokens = tokenizer.tokenize("void").expect("tokenize");
        assert_eq!(tokens[0].kind, keyword);
        assert_ne!(keyword, ident);
    }
}
