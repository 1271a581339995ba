use crate::diagnostic::{Diagnostic, Label, Span};
use chumsky::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Defun,
    Lambd,

    Ident(String),
    Int(i64),
    Str(String),
    True,
    False,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    And,
    Or,
    Bang,
    Assign,

    Comma,
    Colon,
    Dot,
    Question,
    LParen,
    RParen,
    LBrace,
    RBrace,

    Eof,
}

/// Lex failure: a character the grammar does not cover, or input that ends
/// inside a token (an unterminated string literal).
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub position: usize,
    pub found: Option<char>,
}

impl LexError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let end = self.position + self.found.map_or(0, char::len_utf8);
        Diagnostic::error(self.to_string())
            .with_code("E0001")
            .with_label(Label::primary(Span::new(self.position, end), ""))
    }
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.found {
            Some(ch) => write!(f, "unexpected character '{}'", ch),
            None => write!(f, "unexpected end of input"),
        }
    }
}

impl std::error::Error for LexError {}

pub fn lexer<'a>()
-> impl Parser<'a, &'a str, Vec<(Token, SimpleSpan)>, extra::Err<Simple<'a, char>>> {
    let number = text::digits(10)
        .to_slice()
        .map(|s: &str| Token::Int(s.parse().unwrap()));

    // Single-quoted per the original grammar; double-quoted accepted as an
    // equivalent spelling. No escape processing in either form.
    let string = just('\'')
        .ignore_then(none_of("'").repeated().collect::<String>())
        .then_ignore(just('\''))
        .or(just('"')
            .ignore_then(none_of("\"").repeated().collect::<String>())
            .then_ignore(just('"')))
        .map(Token::Str);

    let ident = any()
        .filter(|c: &char| c.is_ascii_alphabetic())
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated(),
        )
        .to_slice()
        .map(|s: &str| match s {
            "Defun" => Token::Defun,
            "Lambd" => Token::Lambd,
            "True" => Token::True,
            "False" => Token::False,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Bang,
            _ => Token::Ident(s.to_string()),
        });

    let op_double = choice((
        just("==").to(Token::Eq),
        just("!=").to(Token::NotEq),
        just(">=").to(Token::GreaterEq),
        just("<=").to(Token::LessEq),
        just("&&").to(Token::And),
        just("||").to(Token::Or),
    ));

    let op_single = choice((
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('%').to(Token::Percent),
        just('>').to(Token::Greater),
        just('<').to(Token::Less),
        just('!').to(Token::Bang),
        just('=').to(Token::Assign),
        just(',').to(Token::Comma),
        just(':').to(Token::Colon),
        just('.').to(Token::Dot),
        just('?').to(Token::Question),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('{').to(Token::LBrace),
        just('}').to(Token::RBrace),
    ));

    let op = op_double.or(op_single);

    let comment = just('#').then(none_of("\n").repeated()).padded();

    let token = number
        .or(string)
        .or(ident)
        .or(op)
        .map_with(|tok, e| (tok, e.span()))
        .padded_by(comment.clone().repeated())
        .padded();

    token
        .repeated()
        .collect()
        .padded_by(comment.repeated())
        .padded()
        .then_ignore(end())
}

/// Tokens that can end an operand. A `-` after one of these is a binary
/// minus; anywhere else it belongs to a following integer literal.
fn ends_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Int(_)
            | Token::Str(_)
            | Token::True
            | Token::False
            | Token::Ident(_)
            | Token::RParen
    )
}

fn fold_negative_literals(tokens: Vec<(Token, SimpleSpan)>) -> Vec<(Token, SimpleSpan)> {
    let mut out: Vec<(Token, SimpleSpan)> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();
    while let Some((token, span)) = iter.next() {
        let at_operand_start = !out.last().is_some_and(|(prev, _)| ends_operand(prev));
        if matches!(token, Token::Minus) && at_operand_start {
            if let Some(&(Token::Int(_), _)) = iter.peek() {
                if let Some((Token::Int(n), int_span)) = iter.next() {
                    out.push((Token::Int(-n), (span.start..int_span.end).into()));
                    continue;
                }
            }
        }
        out.push((token, span));
    }
    out
}

/// Tokenizes a full source text, ending with an `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<(Token, SimpleSpan)>, LexError> {
    let tokens = match lexer().parse(source).into_result() {
        Ok(tokens) => tokens,
        Err(errors) => {
            let position = errors
                .first()
                .map(|e| e.span().start)
                .unwrap_or(source.len());
            return Err(LexError {
                position,
                found: source.get(position..).and_then(|rest| rest.chars().next()),
            });
        }
    };

    let mut tokens = fold_negative_literals(tokens);
    tokens.push((Token::Eof, (source.len()..source.len()).into()));
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("Lexer failed")
            .into_iter()
            .map(|(tok, _)| tok)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(lex("Defun"), vec![Token::Defun, Token::Eof]);
        assert_eq!(lex("Lambd"), vec![Token::Lambd, Token::Eof]);
        assert_eq!(lex("True"), vec![Token::True, Token::Eof]);
        assert_eq!(lex("False"), vec![Token::False, Token::Eof]);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            lex("foo bar"),
            vec![
                Token::Ident("foo".to_string()),
                Token::Ident("bar".to_string()),
                Token::Eof
            ]
        );
        assert_eq!(lex("x2"), vec![Token::Ident("x2".to_string()), Token::Eof]);
        assert_eq!(
            lex("snake_case"),
            vec![Token::Ident("snake_case".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(
            lex("defun true"),
            vec![
                Token::Ident("defun".to_string()),
                Token::Ident("true".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_integers() {
        assert_eq!(
            lex("123 456"),
            vec![Token::Int(123), Token::Int(456), Token::Eof]
        );
        assert_eq!(lex("0"), vec![Token::Int(0), Token::Eof]);
        assert_eq!(lex("007"), vec![Token::Int(7), Token::Eof]);
    }

    #[test]
    fn test_negative_literal_at_operand_start() {
        assert_eq!(lex("-5"), vec![Token::Int(-5), Token::Eof]);
        assert_eq!(
            lex("(-5)"),
            vec![Token::LParen, Token::Int(-5), Token::RParen, Token::Eof]
        );
        assert_eq!(
            lex("3 * -2"),
            vec![Token::Int(3), Token::Star, Token::Int(-2), Token::Eof]
        );
    }

    #[test]
    fn test_minus_after_operand_is_binary() {
        assert_eq!(
            lex("3 - 5"),
            vec![Token::Int(3), Token::Minus, Token::Int(5), Token::Eof]
        );
        assert_eq!(
            lex("n - 1"),
            vec![
                Token::Ident("n".to_string()),
                Token::Minus,
                Token::Int(1),
                Token::Eof
            ]
        );
        assert_eq!(
            lex("(2) - 1"),
            vec![
                Token::LParen,
                Token::Int(2),
                Token::RParen,
                Token::Minus,
                Token::Int(1),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            lex("'hello'"),
            vec![Token::Str("hello".to_string()), Token::Eof]
        );
        assert_eq!(lex("''"), vec![Token::Str(String::new()), Token::Eof]);
        assert_eq!(
            lex("\"world\""),
            vec![Token::Str("world".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_unterminated_string_fails() {
        let err = tokenize("'oops").unwrap_err();
        assert_eq!(err.found, None);
    }

    #[test]
    fn test_arithmetic_operators() {
        assert_eq!(
            lex("+ - * / %"),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_comparison_operators_longest_match() {
        assert_eq!(
            lex("== != > >= < <="),
            vec![
                Token::Eq,
                Token::NotEq,
                Token::Greater,
                Token::GreaterEq,
                Token::Less,
                Token::LessEq,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_assignment_vs_equality() {
        assert_eq!(
            lex("x = 10"),
            vec![
                Token::Ident("x".to_string()),
                Token::Assign,
                Token::Int(10),
                Token::Eof
            ]
        );
        assert_eq!(
            lex("x == 10"),
            vec![
                Token::Ident("x".to_string()),
                Token::Eq,
                Token::Int(10),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            lex("&& || !"),
            vec![Token::And, Token::Or, Token::Bang, Token::Eof]
        );
    }

    #[test]
    fn test_word_operators() {
        assert_eq!(
            lex("and or not"),
            vec![Token::And, Token::Or, Token::Bang, Token::Eof]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            lex("( ) , . { } ? :"),
            vec![
                Token::LParen,
                Token::RParen,
                Token::Comma,
                Token::Dot,
                Token::LBrace,
                Token::RBrace,
                Token::Question,
                Token::Colon,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            lex("# this is a comment\n123 # another comment\n456"),
            vec![Token::Int(123), Token::Int(456), Token::Eof]
        );
        assert_eq!(lex("# only a comment"), vec![Token::Eof]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(lex(""), vec![Token::Eof]);
        assert_eq!(lex("   \n\t "), vec![Token::Eof]);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("~").unwrap_err();
        assert_eq!(err.position, 0);
        assert_eq!(err.found, Some('~'));
    }

    #[test]
    fn test_lone_ampersand_and_pipe_fail() {
        assert!(tokenize("1 & 2").is_err());
        assert!(tokenize("1 | 2").is_err());
    }

    #[test]
    fn test_spans_cover_source_offsets() {
        let tokens = tokenize("x = 10").unwrap();
        let spans: Vec<(usize, usize)> =
            tokens.iter().map(|(_, s)| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(0, 1), (2, 3), (4, 6), (6, 6)]);
    }

    #[test]
    fn test_defun_header_sequence() {
        assert_eq!(
            lex("Defun {'name': 'double', 'arguments': (x,)}"),
            vec![
                Token::Defun,
                Token::LBrace,
                Token::Str("name".to_string()),
                Token::Colon,
                Token::Str("double".to_string()),
                Token::Comma,
                Token::Str("arguments".to_string()),
                Token::Colon,
                Token::LParen,
                Token::Ident("x".to_string()),
                Token::Comma,
                Token::RParen,
                Token::RBrace,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_lambda_sequence() {
        assert_eq!(
            lex("Lambd x, y. x + y"),
            vec![
                Token::Lambd,
                Token::Ident("x".to_string()),
                Token::Comma,
                Token::Ident("y".to_string()),
                Token::Dot,
                Token::Ident("x".to_string()),
                Token::Plus,
                Token::Ident("y".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_end_to_end_token_sequence() {
        assert_eq!(
            lex("3 * (2 + 4)"),
            vec![
                Token::Int(3),
                Token::Star,
                Token::LParen,
                Token::Int(2),
                Token::Plus,
                Token::Int(4),
                Token::RParen,
                Token::Eof
            ]
        );
    }
}
