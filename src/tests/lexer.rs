use crate::lexer::tokens::TokenKind;
use crate::lexer::Lexer;

#[test]
fn lexes_arithmetic_statement() {
    let tokens = Lexer::lex("print 1 + 2 * 3;");

    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::PRINT_KW,
            TokenKind::NUMBER,
            TokenKind::PLUS,
            TokenKind::NUMBER,
            TokenKind::STAR,
            TokenKind::NUMBER,
            TokenKind::SEMICOLON,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn classifies_keywords() {
    let tokens = Lexer::lex("var class while for if else fun alloc nil and or");

    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::VAR_KW,
            TokenKind::CLASS_KW,
            TokenKind::WHILE_KW,
            TokenKind::FOR_KW,
            TokenKind::IF_KW,
            TokenKind::ELSE_KW,
            TokenKind::FUNC_KW,
            TokenKind::ALLOC_KW,
            TokenKind::NIL,
            TokenKind::LOGIC_AND,
            TokenKind::LOGIC_OR,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn lexes_two_character_operators() {
    let tokens = Lexer::lex("== != <= >= < > = !");

    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::LOGIC_EQ,
            TokenKind::LOGIC_NOT_EQ,
            TokenKind::LESS_THAN_EQ,
            TokenKind::GREATER_THAN_EQ,
            TokenKind::LESS_THAN,
            TokenKind::GREATER_THAN,
            TokenKind::EQUALS,
            TokenKind::LOGIC_NOT,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn string_lexeme_excludes_quotes_and_keeps_escapes_raw() {
    let tokens = Lexer::lex("\"a\\nb\"");

    assert_eq!(tokens[0].kind, TokenKind::STRING);
    // The scanner stores the raw contents; the `\n` stays two characters
    // until print time.
    assert_eq!(tokens[0].lexeme, "a\\nb");
}

#[test]
fn unterminated_string_becomes_error_token() {
    let tokens = Lexer::lex("\"oops");

    assert_eq!(tokens[0].kind, TokenKind::ERROR);
    assert_eq!(tokens[0].lexeme, "Unterminated string.");
}

#[test]
fn tracks_line_numbers_across_newlines_and_comments() {
    let tokens = Lexer::lex("var a;\n// a comment\nvar b;");

    assert_eq!(tokens[0].line_num, 1); // var
    assert_eq!(tokens[2].line_num, 1); // ;
    assert_eq!(tokens[3].line_num, 3); // var
    assert_eq!(tokens[4].line_num, 3); // b
}

#[test]
fn lexes_fractional_numbers() {
    let tokens = Lexer::lex("12.5 7");

    assert_eq!(tokens[0].kind, TokenKind::NUMBER);
    assert_eq!(tokens[0].lexeme, "12.5");
    assert_eq!(tokens[1].lexeme, "7");
}

#[test]
fn empty_source_yields_only_eof() {
    let tokens = Lexer::lex("");

    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::EOF);
}
