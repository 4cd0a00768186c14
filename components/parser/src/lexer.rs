//! Probe language lexer - tokenizes profiling script source

use crate::error::{syntax_error, ParseResult};

/// Reserved words of the probe language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// let keyword
    Let,
    /// const keyword
    Const,
    /// var keyword
    Var,
    /// function keyword
    Function,
    /// return keyword
    Return,
    /// if keyword
    If,
    /// else keyword
    Else,
    /// while keyword
    While,
    /// for keyword
    For,
    /// in keyword
    In,
    /// break keyword
    Break,
    /// continue keyword
    Continue,
    /// throw keyword
    Throw,
    /// try keyword
    Try,
    /// catch keyword
    Catch,
    /// finally keyword
    Finally,
    /// typeof keyword
    Typeof,
    /// true keyword
    True,
    /// false keyword
    False,
    /// null keyword
    Null,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "let" => Keyword::Let,
            "const" => Keyword::Const,
            "var" => Keyword::Var,
            "function" => Keyword::Function,
            "return" => Keyword::Return,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "for" => Keyword::For,
            "in" => Keyword::In,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "throw" => Keyword::Throw,
            "try" => Keyword::Try,
            "catch" => Keyword::Catch,
            "finally" => Keyword::Finally,
            "typeof" => Keyword::Typeof,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            _ => return None,
        })
    }

    /// Source spelling; keywords are valid property names after `.`
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Let => "let",
            Keyword::Const => "const",
            Keyword::Var => "var",
            Keyword::Function => "function",
            Keyword::Return => "return",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::In => "in",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Throw => "throw",
            Keyword::Try => "try",
            Keyword::Catch => "catch",
            Keyword::Finally => "finally",
            Keyword::Typeof => "typeof",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
        }
    }
}

/// Operators and delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// Opening parenthesis
    LParen,
    /// Closing parenthesis
    RParen,
    /// Opening brace
    LBrace,
    /// Closing brace
    RBrace,
    /// Opening bracket
    LBracket,
    /// Closing bracket
    RBracket,
    /// Semicolon
    Semicolon,
    /// Comma
    Comma,
    /// Dot
    Dot,
    /// Colon
    Colon,
    /// Question mark
    Question,
    /// Assignment
    Assign,
    /// Arrow function
    Arrow,
    /// Plus
    Plus,
    /// Minus
    Minus,
    /// Multiply
    Star,
    /// Divide
    Slash,
    /// Modulo
    Percent,
    /// Equality
    EqEq,
    /// Strict equality
    EqEqEq,
    /// Inequality
    NotEq,
    /// Strict inequality
    NotEqEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
    /// Logical AND
    AndAnd,
    /// Logical OR
    OrOr,
    /// Nullish coalescing
    NullishCoalesce,
    /// Logical NOT
    Not,
    /// Plus equals
    PlusEq,
    /// Minus equals
    MinusEq,
    /// Multiply equals
    StarEq,
    /// Divide equals
    SlashEq,
    /// Modulo equals
    PercentEq,
    /// Increment
    PlusPlus,
    /// Decrement
    MinusMinus,
}

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier
    Identifier(String),
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
    /// Keyword
    Keyword(Keyword),
    /// Punctuator/operator
    Punctuator(Punctuator),
    /// End of file
    EOF,
}

impl Token {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier '{name}'"),
            Token::Number(n) => format!("number {n}"),
            Token::String(_) => "string".to_string(),
            Token::Keyword(k) => format!("'{}'", k.as_str()),
            Token::Punctuator(p) => format!("{p:?}"),
            Token::EOF => "end of input".to_string(),
        }
    }
}

/// Saved lexer position for speculative scanning.
#[derive(Debug, Clone, Copy)]
pub struct LexerState {
    position: usize,
    line: u32,
}

/// Lexer for probe language source
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    /// Current line (1-based)
    pub line: u32,
    /// Line on which the most recently scanned token starts
    pub token_line: u32,
    current_token: Option<Token>,
    scan_start: LexerState,
    /// Tracks if a line terminator preceded the most recently scanned token
    pub line_terminator_before_token: bool,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            token_line: 1,
            current_token: None,
            scan_start: LexerState { position: 0, line: 1 },
            line_terminator_before_token: false,
        }
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> ParseResult<Token> {
        if let Some(token) = self.current_token.take() {
            return Ok(token);
        }
        self.scan_token()
    }

    /// Peek at the next token without consuming it
    pub fn peek_token(&mut self) -> ParseResult<&Token> {
        let token = match self.current_token.take() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        Ok(self.current_token.insert(token))
    }

    /// Position of the next unconsumed token, for [`restore`](Self::restore).
    pub fn save(&self) -> LexerState {
        if self.current_token.is_some() {
            self.scan_start
        } else {
            LexerState {
                position: self.position,
                line: self.line,
            }
        }
    }

    /// Rewinds to a saved position.
    pub fn restore(&mut self, state: LexerState) {
        self.position = state.position;
        self.line = state.line;
        self.current_token = None;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars.get(self.position).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.peek();
        self.position += 1;
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn scan_token(&mut self) -> ParseResult<Token> {
        self.scan_start = LexerState {
            position: self.position,
            line: self.line,
        };
        let line_before = self.line;
        self.skip_whitespace_and_comments()?;
        self.line_terminator_before_token = self.line > line_before;
        self.token_line = self.line;

        if self.is_at_end() {
            return Ok(Token::EOF);
        }

        let ch = self.advance();
        let punct = |p: Punctuator| -> ParseResult<Token> { Ok(Token::Punctuator(p)) };
        match ch {
            '(' => punct(Punctuator::LParen),
            ')' => punct(Punctuator::RParen),
            '{' => punct(Punctuator::LBrace),
            '}' => punct(Punctuator::RBrace),
            '[' => punct(Punctuator::LBracket),
            ']' => punct(Punctuator::RBracket),
            ';' => punct(Punctuator::Semicolon),
            ',' => punct(Punctuator::Comma),
            ':' => punct(Punctuator::Colon),
            '.' if self.peek().is_ascii_digit() => self.scan_number(ch),
            '.' => punct(Punctuator::Dot),
            '?' => {
                if self.match_char('?') {
                    punct(Punctuator::NullishCoalesce)
                } else {
                    punct(Punctuator::Question)
                }
            }
            '=' => {
                if self.match_char('>') {
                    punct(Punctuator::Arrow)
                } else if self.match_char('=') {
                    if self.match_char('=') {
                        punct(Punctuator::EqEqEq)
                    } else {
                        punct(Punctuator::EqEq)
                    }
                } else {
                    punct(Punctuator::Assign)
                }
            }
            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        punct(Punctuator::NotEqEq)
                    } else {
                        punct(Punctuator::NotEq)
                    }
                } else {
                    punct(Punctuator::Not)
                }
            }
            '+' => {
                if self.match_char('+') {
                    punct(Punctuator::PlusPlus)
                } else if self.match_char('=') {
                    punct(Punctuator::PlusEq)
                } else {
                    punct(Punctuator::Plus)
                }
            }
            '-' => {
                if self.match_char('-') {
                    punct(Punctuator::MinusMinus)
                } else if self.match_char('=') {
                    punct(Punctuator::MinusEq)
                } else {
                    punct(Punctuator::Minus)
                }
            }
            '*' => {
                if self.match_char('=') {
                    punct(Punctuator::StarEq)
                } else {
                    punct(Punctuator::Star)
                }
            }
            '/' => {
                if self.match_char('=') {
                    punct(Punctuator::SlashEq)
                } else {
                    punct(Punctuator::Slash)
                }
            }
            '%' => {
                if self.match_char('=') {
                    punct(Punctuator::PercentEq)
                } else {
                    punct(Punctuator::Percent)
                }
            }
            '<' => {
                if self.match_char('=') {
                    punct(Punctuator::LtEq)
                } else {
                    punct(Punctuator::Lt)
                }
            }
            '>' => {
                if self.match_char('=') {
                    punct(Punctuator::GtEq)
                } else {
                    punct(Punctuator::Gt)
                }
            }
            '&' if self.match_char('&') => punct(Punctuator::AndAnd),
            '|' if self.match_char('|') => punct(Punctuator::OrOr),
            '"' | '\'' => self.scan_string(ch),
            _ if ch.is_ascii_digit() => self.scan_number(ch),
            _ if is_id_start(ch) => Ok(self.scan_identifier(ch)),
            _ => Err(syntax_error(format!("Unexpected character: '{ch}'"), self.line)),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> ParseResult<()> {
        while !self.is_at_end() {
            match self.peek() {
                '\n' => {
                    self.advance();
                    self.line += 1;
                }
                '\r' => {
                    self.advance();
                    self.match_char('\n');
                    self.line += 1;
                }
                c if c.is_whitespace() => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while !self.is_at_end() && !matches!(self.peek(), '\n' | '\r') {
                        self.advance();
                    }
                }
                '/' if self.peek_next() == Some('*') => {
                    let start_line = self.line;
                    self.position += 2;
                    loop {
                        if self.is_at_end() {
                            return Err(syntax_error("Unterminated comment", start_line));
                        }
                        if self.peek() == '*' && self.peek_next() == Some('/') {
                            self.position += 2;
                            break;
                        }
                        if self.advance() == '\n' {
                            self.line += 1;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn scan_string(&mut self, quote: char) -> ParseResult<Token> {
        let start_line = self.line;
        let mut value = String::new();

        loop {
            if self.is_at_end() || self.peek() == '\n' {
                return Err(syntax_error("Unterminated string literal", start_line));
            }
            let ch = self.advance();
            if ch == quote {
                break;
            }
            if ch != '\\' {
                value.push(ch);
                continue;
            }
            if self.is_at_end() {
                return Err(syntax_error("Unterminated string literal", start_line));
            }
            match self.advance() {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '0' => value.push('\0'),
                'x' => value.push(self.scan_hex_escape(2)?),
                'u' => value.push(self.scan_hex_escape(4)?),
                '\n' => self.line += 1,
                other => value.push(other),
            }
        }

        Ok(Token::String(value))
    }

    fn scan_hex_escape(&mut self, digits: usize) -> ParseResult<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .peek()
                .to_digit(16)
                .ok_or_else(|| syntax_error("Invalid escape sequence", self.line))?;
            self.advance();
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| syntax_error("Invalid escape sequence", self.line))
    }

    fn scan_number(&mut self, first: char) -> ParseResult<Token> {
        if first == '0' && matches!(self.peek(), 'x' | 'X') {
            self.advance();
            let start = self.position;
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            let digits: String = self.chars[start..self.position].iter().collect();
            return u64::from_str_radix(&digits, 16)
                .map(|n| Token::Number(n as f64))
                .map_err(|_| syntax_error("Invalid hexadecimal literal", self.line));
        }

        let mut text = String::from(first);
        let mut seen_dot = first == '.';
        loop {
            let c = self.peek();
            if c.is_ascii_digit() {
                text.push(self.advance());
            } else if c == '.' && !seen_dot && self.peek_next().is_some_and(|n| n.is_ascii_digit()) {
                seen_dot = true;
                text.push(self.advance());
            } else {
                break;
            }
        }
        if matches!(self.peek(), 'e' | 'E') {
            let signed = matches!(self.peek_next(), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self
                .chars
                .get(self.position + digit_at)
                .is_some_and(|c| c.is_ascii_digit())
            {
                text.push(self.advance());
                if signed {
                    text.push(self.advance());
                }
                while self.peek().is_ascii_digit() {
                    text.push(self.advance());
                }
            }
        }
        if is_id_start(self.peek()) {
            return Err(syntax_error("Identifier directly after number", self.line));
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| syntax_error(format!("Invalid number literal: {text}"), self.line))
    }

    fn scan_identifier(&mut self, first: char) -> Token {
        let mut name = String::from(first);
        while is_id_part(self.peek()) {
            name.push(self.advance());
        }
        match Keyword::from_word(&name) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(name),
        }
    }
}

fn is_id_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_id_part(c: char) -> bool {
    is_id_start(c) || c.is_ascii_digit()
}
