//! Grammar-driven tokenizer
//!
//! Categories are chosen by trying an ordered list of candidate patterns at
//! the current position and taking the first that matches. Which list is used
//! depends on whether the previous token may be followed by an infix or
//! postfix operator.

use log::trace;
use winnow::ascii::{digit0, digit1};
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::grammar::Grammar;
use crate::parse::ParseError;

type PResult<T> = winnow::ModalResult<T>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    Number,
    Identifier,
    Function,
    ParenOpen,
    ParenClose,
    PreUnaryOp,
    PostUnaryOp,
    BinaryOp,
    MultaryOp,
}

impl TokenCategory {
    /// Whether a binary, multary or postfix operator may follow this category
    pub fn allows_continuation(self) -> bool {
        matches!(
            self,
            TokenCategory::Number
                | TokenCategory::Identifier
                | TokenCategory::ParenClose
                | TokenCategory::PostUnaryOp
        )
    }

    /// Whether this category begins a new operand
    pub fn starts_operand(self) -> bool {
        matches!(
            self,
            TokenCategory::Number
                | TokenCategory::Identifier
                | TokenCategory::Function
                | TokenCategory::ParenOpen
                | TokenCategory::PreUnaryOp
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub category: TokenCategory,
    /// Byte offset of the token in the source expression
    pub offset: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, category: TokenCategory, offset: usize) -> Self {
        Self {
            text: text.into(),
            category,
            offset,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Candidate {
    Number,
    ParenOpen,
    ParenClose,
    PreUnary,
    Multary,
    Binary,
    PostUnary,
    Identifier,
}

const AFTER_OPERATOR: [Candidate; 5] = [
    Candidate::Number,
    Candidate::ParenOpen,
    Candidate::ParenClose,
    Candidate::PreUnary,
    Candidate::Identifier,
];

const AFTER_OPERAND: [Candidate; 7] = [
    Candidate::Number,
    Candidate::ParenOpen,
    Candidate::ParenClose,
    Candidate::Multary,
    Candidate::Binary,
    Candidate::PostUnary,
    Candidate::Identifier,
];

pub struct Tokenizer<'g> {
    grammar: &'g Grammar,
}

impl<'g> Tokenizer<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, ParseError> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut offset = 0;

        loop {
            let rest = &input[offset..];
            let trimmed = rest.trim_start();
            offset += rest.len() - trimmed.len();
            if trimmed.is_empty() {
                break;
            }

            let continuation = tokens
                .last()
                .is_some_and(|t| t.category.allows_continuation());
            let candidates: &[Candidate] = if continuation {
                &AFTER_OPERAND
            } else {
                &AFTER_OPERATOR
            };

            let matched = candidates
                .iter()
                .find_map(|candidate| self.match_candidate(*candidate, trimmed));
            let Some((len, text, category)) = matched else {
                return Err(ParseError::UnrecognizedSymbol {
                    offset,
                    remaining: trimmed.to_string(),
                });
            };

            trace!("token {:?} '{}' at {}", category, text, offset);
            tokens.push(Token::new(text, category, offset));
            offset += len;
        }

        for token in &mut tokens {
            if token.category == TokenCategory::Identifier
                && let Some(name) = self.grammar.function_name(&token.text)
            {
                token.text = name.to_string();
                token.category = TokenCategory::Function;
            }
        }

        Ok(tokens)
    }

    /// Returns (consumed length, token text, category)
    fn match_candidate(
        &self,
        candidate: Candidate,
        input: &str,
    ) -> Option<(usize, String, TokenCategory)> {
        let g = self.grammar;
        match candidate {
            Candidate::Number => {
                let len = pattern_len(number, input)?;
                Some((len, input[..len].to_string(), TokenCategory::Number))
            }
            Candidate::Identifier => {
                let len = pattern_len(identifier, input)?;
                Some((len, input[..len].to_string(), TokenCategory::Identifier))
            }
            Candidate::ParenOpen => self.literal(g.open_tokens(), input, TokenCategory::ParenOpen),
            Candidate::ParenClose => {
                self.literal(g.close_tokens(), input, TokenCategory::ParenClose)
            }
            Candidate::PreUnary => {
                self.literal(g.pre_unary_ops(), input, TokenCategory::PreUnaryOp)
            }
            Candidate::PostUnary => {
                self.literal(g.post_unary_ops(), input, TokenCategory::PostUnaryOp)
            }
            Candidate::Binary => self.literal(g.binary_ops(), input, TokenCategory::BinaryOp),
            Candidate::Multary => self.literal(g.multary_ops(), input, TokenCategory::MultaryOp),
        }
    }

    /// First grammar literal found at the start of `input`, in canonical spelling
    fn literal(
        &self,
        literals: &[String],
        input: &str,
        category: TokenCategory,
    ) -> Option<(usize, String, TokenCategory)> {
        literals
            .iter()
            .find(|lit| self.literal_at(lit, input))
            .map(|lit| (lit.len(), lit.clone(), category))
    }

    fn literal_at(&self, literal: &str, input: &str) -> bool {
        let Some(head) = input.get(..literal.len()) else {
            return false;
        };
        let same = if self.grammar.case_sensitive() {
            head == literal
        } else {
            head.eq_ignore_ascii_case(literal)
        };
        if !same {
            return false;
        }
        // Word-like operators (`mod`) must not split an identifier (`model`)
        let ends_in_word = literal.chars().last().is_some_and(is_ident_char);
        let word_continues = input[literal.len()..]
            .chars()
            .next()
            .is_some_and(is_ident_char);
        !(ends_in_word && word_continues)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn pattern_len(mut parser: impl FnMut(&mut &str) -> PResult<()>, input: &str) -> Option<usize> {
    let mut stream = input;
    parser(&mut stream).ok()?;
    Some(input.len() - stream.len())
}

// ============ Patterns ============

/// `12`, `12.5`, `12.`, `.5`, each optionally followed by `e-3`
fn number(input: &mut &str) -> PResult<()> {
    (
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .void()
        .parse_next(input)
}

fn identifier(input: &mut &str) -> PResult<()> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .void()
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarConfig;

    fn tokenize(input: &str) -> Vec<(String, TokenCategory)> {
        let grammar = Grammar::standard();
        Tokenizer::new(&grammar)
            .tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| (t.text, t.category))
            .collect()
    }

    fn categories(input: &str) -> Vec<TokenCategory> {
        tokenize(input).into_iter().map(|(_, c)| c).collect()
    }

    #[test]
    fn number_forms() {
        for text in ["12", "12.5", "12.", ".5", "1e10", "2.5E-3", ".5e+2"] {
            assert_eq!(
                tokenize(text),
                vec![(text.to_string(), TokenCategory::Number)],
                "{text}"
            );
        }
    }

    #[test]
    fn dangling_exponent_is_not_part_of_number() {
        use TokenCategory::*;
        assert_eq!(
            tokenize("2e"),
            vec![("2".to_string(), Number), ("e".to_string(), Identifier)]
        );
    }

    #[test]
    fn minus_depends_on_previous_token() {
        use TokenCategory::*;
        assert_eq!(categories("-2"), vec![PreUnaryOp, Number]);
        assert_eq!(categories("3-2"), vec![Number, BinaryOp, Number]);
        assert_eq!(categories("3*-2"), vec![Number, MultaryOp, PreUnaryOp, Number]);
        assert_eq!(categories("(-2)"), vec![ParenOpen, PreUnaryOp, Number, ParenClose]);
        assert_eq!(categories("x!-1"), vec![Identifier, PostUnaryOp, BinaryOp, Number]);
    }

    #[test]
    fn function_names_are_reclassified() {
        use TokenCategory::*;
        assert_eq!(
            tokenize("SIN(x)"),
            vec![
                ("sin".to_string(), Function),
                ("(".to_string(), ParenOpen),
                ("x".to_string(), Identifier),
                (")".to_string(), ParenClose),
            ]
        );
        // Prefix of a function name stays an identifier
        assert_eq!(categories("sinx"), vec![Identifier]);
    }

    #[test]
    fn whitespace_is_skipped_and_offsets_recorded() {
        let grammar = Grammar::standard();
        let tokens = Tokenizer::new(&grammar).tokenize("  2 +\tx ").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![2, 4, 6]);
    }

    #[test]
    fn empty_input_has_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn unrecognized_symbol_carries_remaining_input() {
        let grammar = Grammar::standard();
        let err = Tokenizer::new(&grammar).tokenize("2 + $x").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnrecognizedSymbol {
                offset: 4,
                remaining: "$x".to_string()
            }
        );
    }

    #[test]
    fn binary_operator_not_allowed_at_start() {
        let grammar = Grammar::standard();
        let err = Tokenizer::new(&grammar).tokenize("*2").unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedSymbol { offset: 0, .. }));
    }

    #[test]
    fn word_operators_respect_identifier_boundaries() {
        use TokenCategory::*;
        let config = GrammarConfig {
            binary: vec!["mod".to_string()],
            precedence: vec![vec!["mod".to_string()]],
            case_sensitive: false,
            ..GrammarConfig::default()
        };
        let grammar = Grammar::from_config(config).unwrap();
        let tokens: Vec<_> = Tokenizer::new(&grammar)
            .tokenize("a MOD model")
            .unwrap()
            .into_iter()
            .map(|t| (t.text, t.category))
            .collect();
        assert_eq!(
            tokens,
            vec![
                ("a".to_string(), Identifier),
                ("mod".to_string(), BinaryOp),
                ("model".to_string(), Identifier),
            ]
        );
    }

    #[test]
    fn first_match_not_longest_match() {
        use TokenCategory::*;
        // `+` is tried as multary before binary even if both are registered
        let config = GrammarConfig {
            binary: vec!["+".to_string()],
            multary: vec!["+".to_string()],
            precedence: vec![vec!["+".to_string()]],
            ..GrammarConfig::default()
        };
        let grammar = Grammar::from_config(config).unwrap();
        let tokens = Tokenizer::new(&grammar).tokenize("1+2").unwrap();
        assert_eq!(tokens[1].category, MultaryOp);
    }
}
