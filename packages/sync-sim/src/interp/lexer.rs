//! Tokenizer for single script rows.
//!
//! Rows are lexed one at a time; leading indentation has already been
//! accounted for by the script loader, so whitespace is insignificant here.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    LParen,
    RParen,
    Comma,
    Dot,
    Colon,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Zero-based character offset in the row.
    pub column: usize,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Name(n) => format!("`{}`", n),
            TokenKind::Int(i) => format!("`{}`", i),
            TokenKind::Float(f) => format!("`{}`", f),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Eof => "end of line".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            _ => "?",
        }
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let start = pos;

        if c.is_whitespace() {
            pos += 1;
            continue;
        }
        if c == '#' {
            break;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(|d| d.is_ascii_digit())) {
            let (kind, next) = lex_number(&chars, pos)?;
            tokens.push(Token { kind, column: start });
            pos = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let name: String = chars[start..pos].iter().collect();
            tokens.push(Token {
                kind: TokenKind::Name(name),
                column: start,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let (text, next) = lex_string(&chars, pos)?;
            tokens.push(Token {
                kind: TokenKind::Str(text),
                column: start,
            });
            pos = next;
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (kind, width) = match (c, next) {
            ('/', Some('/')) => (TokenKind::DoubleSlash, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('+', Some('=')) => (TokenKind::PlusAssign, 2),
            ('-', Some('=')) => (TokenKind::MinusAssign, 2),
            ('*', Some('=')) => (TokenKind::StarAssign, 2),
            ('/', Some('=')) => (TokenKind::SlashAssign, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('=', _) => (TokenKind::Assign, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (':', _) => (TokenKind::Colon, 1),
            _ => {
                return Err(ParseError::new(
                    format!("unexpected character `{}`", c),
                    start,
                ))
            }
        };
        tokens.push(Token { kind, column: start });
        pos += width;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        column: chars.len(),
    });
    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(TokenKind, usize), ParseError> {
    let mut pos = start;
    let mut is_float = false;
    while pos < chars.len() {
        let c = chars[pos];
        if c.is_ascii_digit() {
            pos += 1;
        } else if c == '.' && !is_float {
            is_float = true;
            pos += 1;
        } else {
            break;
        }
    }
    let text: String = chars[start..pos].iter().collect();
    let kind = if is_float {
        text.parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|_| ParseError::new(format!("invalid number `{}`", text), start))?
    } else {
        text.parse::<i64>()
            .map(TokenKind::Int)
            .map_err(|_| ParseError::new(format!("integer literal `{}` out of range", text), start))?
    };
    Ok((kind, pos))
}

fn lex_string(chars: &[char], start: usize) -> Result<(String, usize), ParseError> {
    let quote = chars[start];
    let mut pos = start + 1;
    let mut text = String::new();
    while pos < chars.len() {
        let c = chars[pos];
        if c == quote {
            return Ok((text, pos + 1));
        }
        if c == '\\' {
            let escaped = chars
                .get(pos + 1)
                .ok_or_else(|| ParseError::new("unterminated string literal", start))?;
            text.push(match escaped {
                'n' => '\n',
                't' => '\t',
                other => *other,
            });
            pos += 2;
            continue;
        }
        text.push(c);
        pos += 1;
    }
    Err(ParseError::new("unterminated string literal", start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenizes_method_call() {
        assert_eq!(
            kinds("mutex.wait()"),
            vec![
                TokenKind::Name("mutex".into()),
                TokenKind::Dot,
                TokenKind::Name("wait".into()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_two_char_operators_and_comments() {
        assert_eq!(
            kinds("count += 1 // 2 # trailing"),
            vec![
                TokenKind::Name("count".into()),
                TokenKind::PlusAssign,
                TokenKind::Int(1),
                TokenKind::DoubleSlash,
                TokenKind::Int(2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_and_floats() {
        assert_eq!(
            kinds(r#"x = 'a\'b' + "c" * 2.5"#),
            vec![
                TokenKind::Name("x".into()),
                TokenKind::Assign,
                TokenKind::Str("a'b".into()),
                TokenKind::Plus,
                TokenKind::Str("c".into()),
                TokenKind::Star,
                TokenKind::Float(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_character() {
        let err = tokenize("x = $").expect_err("should fail");
        assert_eq!(err.column, 4);
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("print 'oops").is_err());
    }
}
