// Predicate lexer - tokenizes predicate strings

use super::error::{ParseError, ParseResult};
use super::token::Token;

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let input: Vec<char> = input.chars().collect();
        let current_char = input.first().copied();
        Lexer {
            input,
            position: 0,
            current_char,
        }
    }

    /// Character offset of the next unread character
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> ParseResult<Token> {
        self.skip_whitespace();

        let Some(ch) = self.current_char else {
            return Ok(Token::Eof);
        };

        let token = match ch {
            '+' => {
                self.advance();
                Token::Plus
            }
            '-' => {
                self.advance();
                if self.current_char == Some('-') {
                    self.skip_comment();
                    return self.next_token();
                }
                Token::Minus
            }
            '*' => {
                self.advance();
                Token::Star
            }
            '/' => {
                self.advance();
                Token::Slash
            }
            '%' => {
                self.advance();
                Token::Percent
            }
            '=' => {
                self.advance();
                Token::Equal
            }
            '<' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::LessEqual
                } else if self.current_char == Some('>') {
                    self.advance();
                    Token::NotEqual
                } else {
                    Token::Less
                }
            }
            '>' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::GreaterEqual
                } else {
                    Token::Greater
                }
            }
            '!' if self.peek() == Some('=') => {
                self.advance();
                self.advance();
                Token::NotEqual
            }
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            '\'' => self.read_string()?,
            '"' => self.read_quoted_identifier()?,
            c if c.is_alphabetic() || c == '_' || c == '$' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number(),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            c => {
                return Err(ParseError::IllegalCharacter {
                    character: c,
                    offset: self.position,
                })
            }
        };

        Ok(token)
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip single-line comments starting with --
    fn skip_comment(&mut self) {
        while let Some(ch) = self.current_char {
            self.advance();
            if ch == '\n' {
                break;
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::keyword_from_str(&identifier).unwrap_or(Token::Identifier(identifier))
    }

    /// Read a quoted identifier; `""` inside stands for one quote
    fn read_quoted_identifier(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch == '"' {
                if self.peek() == Some('"') {
                    identifier.push('"');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // Skip closing quote
                    return Ok(Token::Identifier(identifier));
                }
            } else {
                identifier.push(ch);
                self.advance();
            }
        }

        Err(ParseError::Unterminated {
            what: "quoted identifier",
            offset: start,
        })
    }

    /// Read a string literal; `''` inside stands for one quote
    fn read_string(&mut self) -> ParseResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut string = String::new();

        while let Some(ch) = self.current_char {
            if ch == '\'' {
                if self.peek() == Some('\'') {
                    string.push('\'');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // Skip closing quote
                    return Ok(Token::String(string));
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(ParseError::Unterminated {
            what: "string literal",
            offset: start,
        })
    }

    /// Read a number (integer or float, with optional exponent)
    fn read_number(&mut self) -> Token {
        let mut number = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && self.exponent_follows() {
                number.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current_char {
                    number.push(sign);
                    self.advance();
                }
                while let Some(digit) = self.current_char.filter(char::is_ascii_digit) {
                    number.push(digit);
                    self.advance();
                }
                break;
            } else {
                break;
            }
        }

        Token::Number(number)
    }

    fn exponent_follows(&self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('+' | '-') => self
                .input
                .get(self.position + 2)
                .is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            if token == Token::Eof {
                tokens.push(token);
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokens() {
        let mut lexer = Lexer::new("age >= 50 AND name LIKE '_ob'");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Identifier("age".to_string())
        );
        assert_eq!(lexer.next_token().unwrap(), Token::GreaterEqual);
        assert_eq!(lexer.next_token().unwrap(), Token::Number("50".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::And);
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Identifier("name".to_string())
        );
        assert_eq!(lexer.next_token().unwrap(), Token::Like);
        assert_eq!(lexer.next_token().unwrap(), Token::String("_ob".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }

    #[test]
    fn test_operators() {
        let mut lexer = Lexer::new("+ - * / % = < > <= >= <> !=");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::Equal,
                Token::Less,
                Token::Greater,
                Token::LessEqual,
                Token::GreaterEqual,
                Token::NotEqual,
                Token::NotEqual,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        let mut lexer = Lexer::new("'hello world' 'it''s fine'");
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::String("hello world".to_string())
        );
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::String("it's fine".to_string())
        );
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("name = 'bob");
        assert_eq!(
            lexer.tokenize(),
            Err(ParseError::Unterminated {
                what: "string literal",
                offset: 7,
            })
        );
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("123 456.789 .5 1e3 2.5E-2");
        assert_eq!(lexer.next_token().unwrap(), Token::Number("123".to_string()));
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Number("456.789".to_string())
        );
        assert_eq!(lexer.next_token().unwrap(), Token::Number(".5".to_string()));
        assert_eq!(lexer.next_token().unwrap(), Token::Number("1e3".to_string()));
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Number("2.5E-2".to_string())
        );
    }

    #[test]
    fn test_quoted_identifiers() {
        let mut lexer = Lexer::new(r#""order" "say ""hi""""#);
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Identifier("order".to_string())
        );
        assert_eq!(
            lexer.next_token().unwrap(),
            Token::Identifier("say \"hi\"".to_string())
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let mut lexer = Lexer::new("age not Between 1 and 2");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[1], Token::Not);
        assert_eq!(tokens[2], Token::Between);
        assert_eq!(tokens[4], Token::And);
    }

    #[test]
    fn test_comments() {
        let mut lexer = Lexer::new("age -- the age\n> 3");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("age".to_string()),
                Token::Greater,
                Token::Number("3".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_illegal_character() {
        let mut lexer = Lexer::new("age # 3");
        assert_eq!(
            lexer.tokenize(),
            Err(ParseError::IllegalCharacter {
                character: '#',
                offset: 4,
            })
        );
    }
}
