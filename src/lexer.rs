use crate::ast::Position;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenType {
    Keyword,
    Ident,
    Number,
    String,
    Op,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub typ: TokenType,
    pub value: String,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    pub pos: Position,
}

impl Display for LexerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (line {}, column {})",
            self.message, self.pos.line, self.pos.column
        )
    }
}

impl Error for LexerError {}

pub struct Lexer<'a> {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    keywords: HashSet<&'static str>,
    _source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            keywords: keyword_set(),
            _source: source,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        while !self.at_end() {
            let ch = self.peek();
            if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
                self.advance();
                continue;
            }
            if ch == '/' && self.peek_next() == '/' {
                self.skip_comment();
                continue;
            }
            if ch == '"' || ch == '\'' {
                tokens.push(self.read_string()?);
                continue;
            }
            if ch.is_ascii_digit() {
                tokens.push(self.read_number());
                continue;
            }
            if ch.is_ascii_alphabetic() || ch == '_' || ch == '$' {
                tokens.push(self.read_identifier());
                continue;
            }
            let pos = self.pos();
            match ch {
                '(' => tokens.push(self.single(TokenType::LParen)),
                ')' => tokens.push(self.single(TokenType::RParen)),
                '{' => tokens.push(self.single(TokenType::LBrace)),
                '}' => tokens.push(self.single(TokenType::RBrace)),
                '[' => tokens.push(self.single(TokenType::LBracket)),
                ']' => tokens.push(self.single(TokenType::RBracket)),
                ',' => tokens.push(self.single(TokenType::Comma)),
                ';' => tokens.push(self.single(TokenType::Semicolon)),
                ':' => tokens.push(self.single(TokenType::Colon)),
                '.' => tokens.push(self.single(TokenType::Dot)),
                '+' | '-' | '*' | '/' | '%' | '=' | '!' | '<' | '>' | '&' | '|' => {
                    tokens.push(self.read_operator()?);
                }
                _ => {
                    return Err(LexerError {
                        message: format!("Unexpected character {:?}", ch),
                        pos,
                    });
                }
            }
        }
        tokens.push(Token {
            typ: TokenType::Eof,
            value: String::new(),
            pos: self.pos(),
        });
        Ok(tokens)
    }

    fn single(&mut self, typ: TokenType) -> Token {
        let pos = self.pos();
        let ch = self.advance();
        Token {
            typ,
            value: ch.to_string(),
            pos,
        }
    }

    fn read_operator(&mut self) -> Result<Token, LexerError> {
        let pos = self.pos();
        let ch = self.advance();
        let mut value = ch.to_string();
        match ch {
            '+' => {
                if self.peek() == '+' {
                    value.push(self.advance());
                }
            }
            '-' => {
                if self.peek() == '-' {
                    value.push(self.advance());
                }
            }
            '=' => {
                if self.peek() == '>' {
                    value.push(self.advance());
                } else {
                    while self.peek() == '=' && value.len() < 3 {
                        value.push(self.advance());
                    }
                }
            }
            '!' => {
                while self.peek() == '=' && value.len() < 3 {
                    value.push(self.advance());
                }
            }
            '<' | '>' => {
                if self.peek() == '=' {
                    value.push(self.advance());
                }
            }
            '&' => {
                if self.peek() == '&' {
                    value.push(self.advance());
                } else {
                    return Err(LexerError {
                        message: "Unexpected character '&'".to_string(),
                        pos,
                    });
                }
            }
            '|' => {
                if self.peek() == '|' {
                    value.push(self.advance());
                } else {
                    return Err(LexerError {
                        message: "Unexpected character '|'".to_string(),
                        pos,
                    });
                }
            }
            _ => {}
        }
        Ok(Token {
            typ: TokenType::Op,
            value,
            pos,
        })
    }

    fn read_identifier(&mut self) -> Token {
        let pos = self.pos();
        let mut text = String::new();
        text.push(self.advance());
        while !self.at_end() {
            let ch = self.peek();
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                text.push(self.advance());
            } else {
                break;
            }
        }
        if self.keywords.contains(text.as_str()) {
            Token {
                typ: TokenType::Keyword,
                value: text,
                pos,
            }
        } else {
            Token {
                typ: TokenType::Ident,
                value: text,
                pos,
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let pos = self.pos();
        let mut text = String::new();
        text.push(self.advance());
        let mut seen_dot = false;
        while !self.at_end() {
            let ch = self.peek();
            if ch.is_ascii_digit() {
                text.push(self.advance());
                continue;
            }
            if ch == '.' && !seen_dot && self.peek_next().is_ascii_digit() {
                seen_dot = true;
                text.push(self.advance());
                continue;
            }
            break;
        }
        Token {
            typ: TokenType::Number,
            value: text,
            pos,
        }
    }

    fn read_string(&mut self) -> Result<Token, LexerError> {
        let pos = self.pos();
        let quote = self.advance();
        let mut out = String::new();
        while !self.at_end() {
            let ch = self.advance();
            if ch == quote {
                return Ok(Token {
                    typ: TokenType::String,
                    value: out,
                    pos,
                });
            }
            if ch == '\\' {
                if self.at_end() {
                    break;
                }
                let esc = self.advance();
                match esc {
                    '"' => out.push('"'),
                    '\'' => out.push('\''),
                    '\\' => out.push('\\'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'b' => out.push('\u{0008}'),
                    'f' => out.push('\u{000c}'),
                    'u' => {
                        let mut digits = String::new();
                        for _ in 0..4 {
                            if self.at_end() {
                                break;
                            }
                            digits.push(self.advance());
                        }
                        let decoded = u32::from_str_radix(&digits, 16)
                            .ok()
                            .and_then(char::from_u32);
                        match decoded {
                            Some(ch) => out.push(ch),
                            None => {
                                return Err(LexerError {
                                    message: format!("Invalid unicode escape '\\u{}'", digits),
                                    pos,
                                });
                            }
                        }
                    }
                    other => out.push(other),
                }
                continue;
            }
            if ch == '\n' {
                return Err(LexerError {
                    message: "Unterminated string literal".to_string(),
                    pos,
                });
            }
            out.push(ch);
        }
        Err(LexerError {
            message: "Unterminated string literal".to_string(),
            pos,
        })
    }

    fn skip_comment(&mut self) {
        while !self.at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn peek(&self) -> char {
        if self.at_end() {
            '\0'
        } else {
            self.chars[self.index]
        }
    }

    fn peek_next(&self) -> char {
        if self.index + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.index + 1]
        }
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.index];
        self.index += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

fn keyword_set() -> HashSet<&'static str> {
    // "of" stays an identifier; the parser treats it contextually inside
    // for-headers so generated code may still call a function named "of".
    [
        "break", "continue", "do", "else", "false", "for", "function", "if", "in", "null",
        "return", "true", "var", "while",
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize().expect("tokenize")
    }

    #[test]
    fn lexes_for_header_operators() {
        let tokens = lex("for (var i0 = 0; i0 < 3; i0++) {}");
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.typ == TokenType::Op)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(ops, vec!["=", "<", "++"]);
    }

    #[test]
    fn lexes_arrow_and_strict_equality() {
        let tokens = lex("(x) => x === 1 !== 2");
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.typ == TokenType::Op)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(ops, vec!["=>", "===", "!=="]);
    }

    #[test]
    fn lexes_both_quote_styles_with_escapes() {
        let tokens = lex(r#""a\"b" 'c\'d'"#);
        assert_eq!(tokens[0].value, "a\"b");
        assert_eq!(tokens[1].value, "c'd");
    }

    #[test]
    fn skips_line_comments() {
        let tokens = lex("// nothing here\nx;");
        assert_eq!(tokens[0].typ, TokenType::Ident);
        assert_eq!(tokens[0].pos.line, 2);
    }

    #[test]
    fn decodes_backspace_and_formfeed_escapes() {
        let tokens = lex(r#""a\bc\fd""#);
        assert_eq!(tokens[0].value, "a\u{0008}c\u{000c}d");
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(Lexer::new("\"abc").tokenize().is_err());
    }
}
