use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Type {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Colon,
    Question,
    At,
    Arrow,
    Tilde,

    Plus,
    PlusEqual,
    Minus,
    MinusEqual,
    Star,
    StarEqual,
    StarStar,
    StarStarEqual,
    Slash,
    SlashEqual,
    SlashSlash,
    SlashSlashEqual,
    Percent,
    PercentEqual,
    Equal,
    EqualEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    GreaterGreater,
    GreaterGreaterEqual,
    Less,
    LessEqual,
    LessLess,
    LessLessEqual,
    Amp,
    AmpEqual,
    Pipe,
    PipeEqual,
    Caret,
    CaretEqual,

    Identifier,
    String,
    FString,
    Integer,
    Float,

    // keywords
    Is,
    Print,
    If,
    Then,
    Else,
    When,
    End,
    While,
    For,
    Each,
    From,
    To,
    In,
    Function,
    Make,
    Class,
    Extends,
    Constructor,
    Method,
    SelfKw,
    Async,
    Await,
    Return,
    Yield,
    Break,
    Continue,
    Store,
    Into,
    Import,
    ImportPython,
    CallPython,
    Call,
    As,
    Try,
    Catch,
    Finally,
    Match,
    Case,
    Default,
    With,
    TypeKw,
    True,
    False,
    Nil,
    And,
    Or,
    Not,
    Lambda,

    Newline,
    Eof,
}

impl Type {
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Type::Is
                | Type::Print
                | Type::If
                | Type::Then
                | Type::Else
                | Type::When
                | Type::End
                | Type::While
                | Type::For
                | Type::Each
                | Type::From
                | Type::To
                | Type::In
                | Type::Function
                | Type::Make
                | Type::Class
                | Type::Extends
                | Type::Constructor
                | Type::Method
                | Type::SelfKw
                | Type::Async
                | Type::Await
                | Type::Return
                | Type::Yield
                | Type::Break
                | Type::Continue
                | Type::Store
                | Type::Into
                | Type::Import
                | Type::ImportPython
                | Type::CallPython
                | Type::Call
                | Type::As
                | Type::Try
                | Type::Catch
                | Type::Finally
                | Type::Match
                | Type::Case
                | Type::Default
                | Type::With
                | Type::TypeKw
                | Type::True
                | Type::False
                | Type::Nil
                | Type::And
                | Type::Or
                | Type::Not
                | Type::Lambda
        )
    }

    /// Operators that combine an arithmetic or bitwise operation with assignment.
    pub fn is_compound_assign(&self) -> bool {
        matches!(
            self,
            Type::PlusEqual
                | Type::MinusEqual
                | Type::StarEqual
                | Type::SlashEqual
                | Type::PercentEqual
                | Type::StarStarEqual
                | Type::SlashSlashEqual
                | Type::AmpEqual
                | Type::PipeEqual
                | Type::CaretEqual
                | Type::LessLessEqual
                | Type::GreaterGreaterEqual
        )
    }

    /// The plain binary operator behind a compound assignment operator.
    pub fn binary_of_compound(&self) -> Option<Type> {
        let ty = match self {
            Type::PlusEqual => Type::Plus,
            Type::MinusEqual => Type::Minus,
            Type::StarEqual => Type::Star,
            Type::SlashEqual => Type::Slash,
            Type::PercentEqual => Type::Percent,
            Type::StarStarEqual => Type::StarStar,
            Type::SlashSlashEqual => Type::SlashSlash,
            Type::AmpEqual => Type::Amp,
            Type::PipeEqual => Type::Pipe,
            Type::CaretEqual => Type::Caret,
            Type::LessLessEqual => Type::LessLess,
            Type::GreaterGreaterEqual => Type::GreaterGreater,
            _ => return None,
        };
        Some(ty)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Type::LeftParen => "'('",
            Type::RightParen => "')'",
            Type::LeftBracket => "'['",
            Type::RightBracket => "']'",
            Type::LeftBrace => "'{'",
            Type::RightBrace => "'}'",
            Type::Comma => "','",
            Type::Dot => "'.'",
            Type::Colon => "':'",
            Type::Question => "'?'",
            Type::At => "'@'",
            Type::Arrow => "'->'",
            Type::Tilde => "'~'",
            Type::Plus => "'+'",
            Type::PlusEqual => "'+='",
            Type::Minus => "'-'",
            Type::MinusEqual => "'-='",
            Type::Star => "'*'",
            Type::StarEqual => "'*='",
            Type::StarStar => "'**'",
            Type::StarStarEqual => "'**='",
            Type::Slash => "'/'",
            Type::SlashEqual => "'/='",
            Type::SlashSlash => "'//'",
            Type::SlashSlashEqual => "'//='",
            Type::Percent => "'%'",
            Type::PercentEqual => "'%='",
            Type::Equal => "'='",
            Type::EqualEqual => "'=='",
            Type::BangEqual => "'!='",
            Type::Greater => "'>'",
            Type::GreaterEqual => "'>='",
            Type::GreaterGreater => "'>>'",
            Type::GreaterGreaterEqual => "'>>='",
            Type::Less => "'<'",
            Type::LessEqual => "'<='",
            Type::LessLess => "'<<'",
            Type::LessLessEqual => "'<<='",
            Type::Amp => "'&'",
            Type::AmpEqual => "'&='",
            Type::Pipe => "'|'",
            Type::PipeEqual => "'|='",
            Type::Caret => "'^'",
            Type::CaretEqual => "'^='",
            Type::Identifier => "nama (identifier)",
            Type::String => "teks",
            Type::FString => "teks f-string",
            Type::Integer => "bilangan bulat",
            Type::Float => "bilangan desimal",
            Type::Is => "'itu'",
            Type::Print => "'tampilkan'",
            Type::If => "'jika'",
            Type::Then => "'maka'",
            Type::Else => "'lainnya'",
            Type::When => "'kalau'",
            Type::End => "'selesai'",
            Type::While => "'selama'",
            Type::For => "'untuk'",
            Type::Each => "'setiap'",
            Type::From => "'dari'",
            Type::To => "'sampai'",
            Type::In => "'dalam'",
            Type::Function => "'fungsi'",
            Type::Make => "'buat'",
            Type::Class => "'kelas'",
            Type::Extends => "'warisi'",
            Type::Constructor => "'konstruktor'",
            Type::Method => "'metode'",
            Type::SelfKw => "'diri'",
            Type::Async => "'asinkron'",
            Type::Await => "'tunggu'",
            Type::Return => "'hasil'",
            Type::Yield => "'hasil_bertahap'",
            Type::Break => "'berhenti'",
            Type::Continue => "'lanjut'",
            Type::Store => "'simpan'",
            Type::Into => "'ke'",
            Type::Import => "'impor'",
            Type::ImportPython => "'impor_python'",
            Type::CallPython => "'panggil_python'",
            Type::Call => "'panggil'",
            Type::As => "'sebagai'",
            Type::Try => "'coba'",
            Type::Catch => "'tangkap'",
            Type::Finally => "'akhirnya'",
            Type::Match => "'cocok'",
            Type::Case => "'kasus'",
            Type::Default => "'bawaan'",
            Type::With => "'dengan'",
            Type::TypeKw => "'tipe'",
            Type::True => "'benar'",
            Type::False => "'salah'",
            Type::Nil => "'kosong'",
            Type::And => "'dan'",
            Type::Or => "'atau'",
            Type::Not => "'tidak'",
            Type::Lambda => "'lambda'",
            Type::Newline => "baris baru",
            Type::Eof => "akhir file",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Nil,
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(String::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

macro_rules! impl_from_int_for_literal {
    ( $( $t:ident )* ) => {
        $(
            impl From<$t> for Literal {
                fn from(n: $t) -> Literal {
                    Literal::Int(n as i64)
                }
            }
        )*
    }
}

impl_from_int_for_literal!(u8 i8 u16 i16 u32 i32 i64 usize isize);

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Str(val) => write!(f, "{}", val),
            Literal::Int(val) => write!(f, "{}", val),
            Literal::Float(val) => write!(f, "{}", val),
            Literal::Bool(true) => write!(f, "benar"),
            Literal::Bool(false) => write!(f, "salah"),
            Literal::Nil => write!(f, "kosong"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ty: Type,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
    pub value: Literal,
}

impl Token {
    pub fn new(ty: Type, lexeme: String, line: usize, column: usize, value: Literal) -> Self {
        Token {
            ty,
            lexeme,
            line,
            column,
            value,
        }
    }

    /// Builds a synthetic identifier anchored at another token's position.
    pub fn identifier_at(name: &str, anchor: &Token) -> Self {
        Token::new(
            Type::Identifier,
            String::from(name),
            anchor.line,
            anchor.column,
            Literal::Nil,
        )
    }
}

/// Renders a token stream back into source text. Lexing the result again yields
/// the same token kinds and values.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut line_start = true;
    for token in tokens {
        match token.ty {
            Type::Eof => break,
            Type::Newline => {
                out.push('\n');
                line_start = true;
            }
            _ => {
                if !line_start {
                    out.push(' ');
                }
                out.push_str(&token.lexeme);
                line_start = false;
            }
        }
    }
    out
}
