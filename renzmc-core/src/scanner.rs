use phf::{phf_map, Map};

use crate::error::Diagnostic;
use crate::token::{Literal, Token, Type};

pub struct Lexer {
    chars: Vec<char>,

    // `start` and `current` point to the start and end of the token being scanned
    start: usize,
    current: usize,

    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,

    peeked: Option<Token>,

    // Set once the eof token has been handed out by the iterator.
    eof: bool,
    error: Option<Diagnostic>,
}

impl Lexer {
    const KEYWORDS: Map<&'static str, Type> = phf_map! {
        "itu" => Type::Is,
        "tampilkan" => Type::Print,
        "cetak" => Type::Print,
        "jika" => Type::If,
        "maka" => Type::Then,
        "lainnya" => Type::Else,
        "kalau" => Type::When,
        "selesai" => Type::End,
        "akhir" => Type::End,
        "selama" => Type::While,
        "untuk" => Type::For,
        "setiap" => Type::Each,
        "dari" => Type::From,
        "sampai" => Type::To,
        "dalam" => Type::In,
        "fungsi" => Type::Function,
        "buat" => Type::Make,
        "kelas" => Type::Class,
        "warisi" => Type::Extends,
        "konstruktor" => Type::Constructor,
        "metode" => Type::Method,
        "diri" => Type::SelfKw,
        "asinkron" => Type::Async,
        "tunggu" => Type::Await,
        "hasil" => Type::Return,
        "kembalikan" => Type::Return,
        "hasil_bertahap" => Type::Yield,
        "berhenti" => Type::Break,
        "lanjut" => Type::Continue,
        "simpan" => Type::Store,
        "ke" => Type::Into,
        "impor" => Type::Import,
        "impor_python" => Type::ImportPython,
        "panggil_python" => Type::CallPython,
        "panggil" => Type::Call,
        "sebagai" => Type::As,
        "coba" => Type::Try,
        "tangkap" => Type::Catch,
        "akhirnya" => Type::Finally,
        "cocok" => Type::Match,
        "kasus" => Type::Case,
        "bawaan" => Type::Default,
        "dengan" => Type::With,
        "tipe" => Type::TypeKw,
        "benar" => Type::True,
        "salah" => Type::False,
        "kosong" => Type::Nil,
        "dan" => Type::And,
        "atau" => Type::Or,
        "tidak" => Type::Not,
        "lambda" => Type::Lambda,
    };

    pub fn new(src: &str) -> Self {
        Lexer::with_position(src, 1, 1)
    }

    /// A lexer whose first character sits at `line`/`column` of some enclosing
    /// source. Used for the expressions embedded in f-strings.
    pub fn with_position(src: &str, line: usize, column: usize) -> Self {
        Lexer {
            chars: src.chars().collect(),
            start: 0,
            current: 0,
            line,
            column,
            start_line: line,
            start_column: column,
            peeked: None,
            eof: false,
            error: None,
        }
    }

    pub fn keyword(text: &str) -> Option<Type> {
        Lexer::KEYWORDS.get(text).copied()
    }

    pub fn error(&self) -> Option<&Diagnostic> {
        self.error.as_ref()
    }

    pub fn next_token(&mut self) -> Result<Token, Diagnostic> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scan_token(),
        }
    }

    /// One-token lookahead. The token stays cached until `next_token` hands it out.
    pub fn peek_token(&mut self) -> Result<&Token, Diagnostic> {
        if self.peeked.is_none() {
            let token = self.scan_token()?;
            self.peeked = Some(token);
        }

        match self.peeked.as_ref() {
            Some(token) => Ok(token),
            None => unreachable!("peeked token was just filled"),
        }
    }

    fn scan_token(&mut self) -> Result<Token, Diagnostic> {
        loop {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;

            if self.is_at_end() {
                return Ok(self.make_token(Type::Eof));
            }

            let c = self.advance();
            let ty = match c {
                ' ' | '\t' | '\r' => continue,
                '\n' => Type::Newline,
                '#' => {
                    self.skip_line();
                    continue;
                }

                '(' => Type::LeftParen,
                ')' => Type::RightParen,
                '[' => Type::LeftBracket,
                ']' => Type::RightBracket,
                '{' => Type::LeftBrace,
                '}' => Type::RightBrace,
                ',' => Type::Comma,
                '.' => Type::Dot,
                ':' => Type::Colon,
                '?' => Type::Question,
                '@' => Type::At,
                '~' => Type::Tilde,

                '+' => self.either('=', Type::PlusEqual, Type::Plus),
                '%' => self.either('=', Type::PercentEqual, Type::Percent),
                '=' => self.either('=', Type::EqualEqual, Type::Equal),
                '&' => self.either('=', Type::AmpEqual, Type::Amp),
                '|' => self.either('=', Type::PipeEqual, Type::Pipe),
                '^' => self.either('=', Type::CaretEqual, Type::Caret),

                '-' => {
                    if self.match_char('-') {
                        self.skip_line();
                        continue;
                    } else if self.match_char('>') {
                        Type::Arrow
                    } else {
                        self.either('=', Type::MinusEqual, Type::Minus)
                    }
                }

                '*' => {
                    if self.match_char('*') {
                        self.either('=', Type::StarStarEqual, Type::StarStar)
                    } else {
                        self.either('=', Type::StarEqual, Type::Star)
                    }
                }

                '/' => {
                    if self.peek() == '/' && self.peek_next() == '=' {
                        self.advance();
                        self.advance();
                        Type::SlashSlashEqual
                    } else if self.match_char('/') {
                        self.skip_line();
                        continue;
                    } else if self.match_char('*') {
                        self.block_comment()?;
                        continue;
                    } else {
                        self.either('=', Type::SlashEqual, Type::Slash)
                    }
                }

                '!' => {
                    if self.match_char('=') {
                        Type::BangEqual
                    } else {
                        return Err(self.unexpected(c));
                    }
                }

                '>' => {
                    if self.match_char('>') {
                        self.either('=', Type::GreaterGreaterEqual, Type::GreaterGreater)
                    } else {
                        self.either('=', Type::GreaterEqual, Type::Greater)
                    }
                }

                '<' => {
                    if self.match_char('<') {
                        self.either('=', Type::LessLessEqual, Type::LessLess)
                    } else {
                        self.either('=', Type::LessEqual, Type::Less)
                    }
                }

                '"' | '\'' => return self.string(c, Type::String),

                'f' if self.peek() == '"' || self.peek() == '\'' => {
                    let quote = self.advance();
                    return self.string(quote, Type::FString);
                }

                _ => {
                    if c.is_ascii_digit() {
                        return self.number();
                    } else if c.is_alphabetic() || c == '_' {
                        return Ok(self.identifier());
                    } else {
                        return Err(self.unexpected(c));
                    }
                }
            };

            return Ok(self.make_token(ty));
        }
    }

    fn string(&mut self, quote: char, ty: Type) -> Result<Token, Diagnostic> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != quote {
            let c = self.advance();
            if c != '\\' {
                value.push(c);
                continue;
            }

            if self.is_at_end() {
                break;
            }

            match self.advance() {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '0' => value.push('\0'),
                '\\' => value.push('\\'),
                '\'' => value.push('\''),
                '"' => value.push('"'),
                other => {
                    value.push('\\');
                    value.push(other);
                }
            }
        }

        if self.is_at_end() {
            return Err(Diagnostic::lexer(
                "String tidak ditutup: tanda kutip pembuka tidak memiliki pasangan",
                self.start_line,
                self.start_column,
            ));
        }

        // closing quote
        self.advance();
        Ok(self.make_token_with_val(ty, Literal::Str(value)))
    }

    fn number(&mut self) -> Result<Token, Diagnostic> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let is_float = self.peek() == '.' && self.peek_next().is_ascii_digit();
        if is_float {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.lexeme();
        let value = if is_float {
            text.parse::<f64>().map(Literal::Float).ok()
        } else {
            text.parse::<i64>().map(Literal::Int).ok()
        };

        match value {
            Some(value) => {
                let ty = if is_float { Type::Float } else { Type::Integer };
                Ok(self.make_token_with_val(ty, value))
            }
            None => Err(Diagnostic::lexer(
                format!("Angka '{}' tidak valid atau terlalu besar", text),
                self.start_line,
                self.start_column,
            )),
        }
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = self.lexeme();
        match Lexer::KEYWORDS.get(text.as_str()) {
            None => self.make_token(Type::Identifier),
            Some(Type::True) => self.make_token_with_val(Type::True, Literal::Bool(true)),
            Some(Type::False) => self.make_token_with_val(Type::False, Literal::Bool(false)),
            Some(keyword) => self.make_token(*keyword),
        }
    }

    fn block_comment(&mut self) -> Result<(), Diagnostic> {
        while !self.is_at_end() {
            if self.advance() == '*' && self.match_char('/') {
                return Ok(());
            }
        }

        Err(Diagnostic::lexer(
            "Komentar blok tidak ditutup: '/*' tanpa pasangan '*/'",
            self.start_line,
            self.start_column,
        ))
    }

    fn skip_line(&mut self) {
        while self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }
    }

    fn unexpected(&self, c: char) -> Diagnostic {
        Diagnostic::lexer(
            format!("Karakter tidak dikenal '{}'", c),
            self.start_line,
            self.start_column,
        )
    }

    fn either(&mut self, next: char, matched: Type, otherwise: Type) -> Type {
        if self.match_char(next) {
            matched
        } else {
            otherwise
        }
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn match_char(&mut self, c: char) -> bool {
        if self.is_at_end() || self.peek() != c {
            false
        } else {
            self.advance();
            true
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    fn make_token(&mut self, ty: Type) -> Token {
        self.make_token_with_val(ty, Literal::Nil)
    }

    fn make_token_with_val(&mut self, ty: Type, val: Literal) -> Token {
        let lexeme = match ty {
            Type::Eof => String::new(),
            _ => self.lexeme(),
        };

        Token::new(ty, lexeme, self.start_line, self.start_column, val)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof || self.error.is_some() {
            return None;
        }

        match self.next_token() {
            Ok(token) => {
                self.eof = token.ty == Type::Eof;
                Some(token)
            }
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }
}

/// Scans a whole source text, eof token included.
pub fn tokenize(src: &str) -> Result<Vec<Token>, Diagnostic> {
    let mut lexer = Lexer::new(src);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    match lexer.error {
        Some(err) => Err(err),
        None => Ok(tokens),
    }
}
