/// A token that represents a single unit of source code.
#[derive(Clone)]
pub struct Token {
    /// The token's line number
    pub line_num: usize,
    /// The token's column start
    pub column_start: usize,
    /// The token's type
    pub kind: TokenKind,
    /// The token's lexeme
    pub lexeme: String,
}

/// The types of tokens in a program.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenKind {
    ALLOC_KW,
    CLASS_KW,
    COMMA,
    DOT,
    ELSE_KW,
    EOF,
    EQUALS,
    ERROR,
    FALSE,
    FOR_KW,
    FUNC_KW,
    GREATER_THAN,
    GREATER_THAN_EQ,
    IDENTIFIER,
    IF_KW,
    LESS_THAN,
    LESS_THAN_EQ,
    LOGIC_AND,
    LOGIC_EQ,
    LOGIC_NOT,
    LOGIC_NOT_EQ,
    LOGIC_OR,
    L_CURLY,
    L_PAREN,
    MINUS,
    NIL,
    NUMBER,
    PLUS,
    PRINT_KW,
    RETURN_KW,
    R_CURLY,
    R_PAREN,
    SEMICOLON,
    SLASH,
    STAR,
    STRING,
    SUPER_KW,
    THIS_KW,
    TRUE,
    VAR_KW,
    WHILE_KW,
}

/// Maps an identifier lexeme to either a keyword kind, or the
/// generic `IDENTIFIER` kind if the lexeme is not a keyword.
///
/// ## Arguments
/// * `id` – The identifier's lexeme.
///
/// ## Returns
/// `TokenKind` – The token kind associated with the identifier.
pub fn make_identifier_kind(id: &str) -> TokenKind {
    match id {
        "alloc" => TokenKind::ALLOC_KW,
        "and" => TokenKind::LOGIC_AND,
        "class" => TokenKind::CLASS_KW,
        "else" => TokenKind::ELSE_KW,
        "false" => TokenKind::FALSE,
        "for" => TokenKind::FOR_KW,
        "fun" => TokenKind::FUNC_KW,
        "if" => TokenKind::IF_KW,
        "nil" => TokenKind::NIL,
        "or" => TokenKind::LOGIC_OR,
        "print" => TokenKind::PRINT_KW,
        "return" => TokenKind::RETURN_KW,
        "super" => TokenKind::SUPER_KW,
        "this" => TokenKind::THIS_KW,
        "true" => TokenKind::TRUE,
        "var" => TokenKind::VAR_KW,
        "while" => TokenKind::WHILE_KW,
        _ => TokenKind::IDENTIFIER,
    }
}
