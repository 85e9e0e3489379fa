use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::token::Token;

/// Every failure the language core can report. `Interrupted` is the
/// cancellation signal and is never caught by user code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Lexer,
    Parser,
    Name,
    Type,
    Value,
    Import,
    Attribute,
    Index,
    Key,
    DivisionByZero,
    File,
    PythonIntegration,
    Syntax,
    TypeHint,
    Async,
    Runtime,
    Interrupted,
}

impl ErrorKind {
    /// Short name used in the diagnostic banner.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Lexer => "Lexer",
            ErrorKind::Parser => "Parser",
            ErrorKind::Name => "Name",
            ErrorKind::Type => "Type",
            ErrorKind::Value => "Value",
            ErrorKind::Import => "Import",
            ErrorKind::Attribute => "Attribute",
            ErrorKind::Index => "Index",
            ErrorKind::Key => "Key",
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::File => "File",
            ErrorKind::PythonIntegration => "PythonIntegration",
            ErrorKind::Syntax => "Syntax",
            ErrorKind::TypeHint => "TypeHint",
            ErrorKind::Async => "Async",
            ErrorKind::Runtime => "Runtime",
            ErrorKind::Interrupted => "KeyboardInterrupt",
        }
    }

    /// Type names a `tangkap` clause may use to select this kind.
    pub fn catch_names(&self) -> &'static [&'static str] {
        match self {
            ErrorKind::Lexer => &["LexerError"],
            ErrorKind::Parser => &["ParserError"],
            ErrorKind::Name => &["NameError"],
            ErrorKind::Type => &["TypeError"],
            ErrorKind::Value => &["ValueError"],
            ErrorKind::Import => &["ImportError", "ModuleNotFoundError"],
            ErrorKind::Attribute => &["AttributeError"],
            ErrorKind::Index => &["IndexError"],
            ErrorKind::Key => &["KeyError"],
            ErrorKind::DivisionByZero => &["DivisionByZeroError", "ZeroDivisionError"],
            ErrorKind::File => &["FileError", "FileNotFoundError", "IOError"],
            ErrorKind::PythonIntegration => &["PythonIntegrationError"],
            ErrorKind::Syntax => &["SyntaxError"],
            ErrorKind::TypeHint => &["TypeHintError"],
            ErrorKind::Async => &["AsyncError"],
            ErrorKind::Runtime => &["RuntimeError", "RecursionError"],
            ErrorKind::Interrupted => &[],
        }
    }

    /// Whether a `tangkap` clause naming `type_name` handles this kind. Only the
    /// last segment of a dotted name is significant.
    pub fn caught_by(&self, type_name: &str) -> bool {
        if *self == ErrorKind::Interrupted {
            return false;
        }
        let name = type_name.rsplit('.').next().unwrap_or(type_name);
        matches!(name, "Exception" | "Error" | "RenzmcError") || self.catch_names().contains(&name)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A structured, optionally positioned error.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{}", describe(.message, .line, .column))]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub source_code: Option<String>,
}

fn describe(message: &str, line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!("{} (baris {}, kolom {})", message, line, column),
        _ => String::from(message),
    }
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            line: None,
            column: None,
            source_code: None,
        }
    }

    pub fn at(kind: ErrorKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Diagnostic::new(kind, message).with_position(line, column)
    }

    pub fn at_token(kind: ErrorKind, message: impl Into<String>, token: &Token) -> Self {
        Diagnostic::at(kind, message, token.line, token.column)
    }

    pub fn lexer(message: impl Into<String>, line: usize, column: usize) -> Self {
        Diagnostic::at(ErrorKind::Lexer, message, line, column)
    }

    pub fn parser(token: &Token, message: impl Into<String>) -> Self {
        Diagnostic::at_token(ErrorKind::Parser, message, token)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Diagnostic::new(ErrorKind::Runtime, message)
    }

    pub fn interrupted() -> Self {
        Diagnostic::new(ErrorKind::Interrupted, "Program dihentikan oleh pengguna")
    }

    pub fn with_position(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_code = Some(source.into());
        self
    }

    pub fn is_located(&self) -> bool {
        self.line.is_some() && self.column.is_some()
    }

    /// Attaches the anchor's position if the diagnostic has none yet. Located
    /// diagnostics pass through untouched.
    pub fn locate(self, anchor: &Token) -> Self {
        if self.is_located() {
            self
        } else {
            self.with_position(anchor.line, anchor.column)
        }
    }
}

pub type Result<T> = std::result::Result<T, Diagnostic>;

#[cfg(test)]
mod tests {
    use crate::error::{Diagnostic, ErrorKind};
    use crate::token::{Literal, Token, Type};

    #[test]
    fn test_display_includes_position_when_located() {
        let diag = Diagnostic::at(ErrorKind::Name, "Variabel 'x' tidak terdefinisi", 3, 7);
        assert_eq!(
            diag.to_string(),
            "Variabel 'x' tidak terdefinisi (baris 3, kolom 7)"
        );
        assert_eq!(
            Diagnostic::new(ErrorKind::Name, "hilang").to_string(),
            "hilang"
        );
    }

    #[test]
    fn test_locate_only_fills_missing_position() {
        let anchor = Token::new(Type::Identifier, String::from("x"), 4, 2, Literal::Nil);
        let promoted = Diagnostic::runtime("gagal").locate(&anchor);
        assert_eq!((promoted.line, promoted.column), (Some(4), Some(2)));

        let kept = Diagnostic::at(ErrorKind::Value, "gagal", 1, 1).locate(&anchor);
        assert_eq!((kept.line, kept.column), (Some(1), Some(1)));
    }

    #[test]
    fn test_catch_names() {
        assert!(ErrorKind::DivisionByZero.caught_by("ZeroDivisionError"));
        assert!(ErrorKind::DivisionByZero.caught_by("renzmc.DivisionByZeroError"));
        assert!(ErrorKind::Key.caught_by("Exception"));
        assert!(!ErrorKind::Key.caught_by("IndexError"));
        assert!(!ErrorKind::Interrupted.caught_by("Exception"));
    }

    #[test]
    fn test_attached_source_code_is_not_an_error_source() {
        let diag = Diagnostic::at(ErrorKind::Import, "gagal", 1, 1).with_source("impor a\n");
        assert_eq!(diag.source_code.as_deref(), Some("impor a\n"));
        assert!(std::error::Error::source(&diag).is_none());
    }
}
