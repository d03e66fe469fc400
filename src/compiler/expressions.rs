use crate::chunk::op_codes::OpCode;
use crate::compiler::rules::{get_rule, ParseFn, Precedence};
use crate::compiler::{CompileResult, Compiler};
use crate::lexer::tokens::{Token, TokenKind};
use crate::objects::Value;

impl<'a> Compiler<'a> {
    /// Compiles a full expression.
    pub(super) fn expression(&mut self) -> CompileResult {
        self.parse_precedence(Precedence::PREC_ASSIGNMENT)
    }

    /// Parses all tokens that have a precedence greater than or equal
    /// to the precedence passed.
    ///
    /// Every expression by definition must start with a prefix token.
    /// After the prefix handler runs, infix handlers keep taking over
    /// while the upcoming token binds at least as tightly as `precedence`.
    pub(super) fn parse_precedence(&mut self, precedence: Precedence) -> CompileResult {
        self.advance();

        let prefix = get_rule(self.previous().kind).prefix;

        if let ParseFn::NONE = prefix {
            return Err(self.error_at_previous("Expected an expression."));
        }

        // Assignments only bind at the lowest precedence level, so that
        // `a + b = c` is rejected instead of assigning into `a + b`.
        let can_assign = precedence <= Precedence::PREC_ASSIGNMENT;
        self.run_parse_fn(prefix, can_assign)?;

        while precedence <= get_rule(self.peek().kind).precedence {
            self.advance();
            let infix = get_rule(self.previous().kind).infix;
            self.run_parse_fn(infix, can_assign)?;
        }

        if can_assign && self.matches(TokenKind::EQUALS) {
            return Err(self.error_at_previous("Invalid assignment target."));
        }

        Ok(())
    }

    /// Dispatches a parse function by name. This is the static-table
    /// equivalent of registering function pointers per token kind.
    fn run_parse_fn(&mut self, func: ParseFn, can_assign: bool) -> CompileResult {
        match func {
            ParseFn::CompileAlloc => self.compile_alloc(),
            ParseFn::CompileBinaryExpr => self.compile_binary_expr(),
            ParseFn::CompileCall => self.compile_call(),
            ParseFn::CompileDot => self.compile_dot(can_assign),
            ParseFn::CompileGrouping => self.compile_grouping(),
            ParseFn::CompileLiteral => self.compile_literal(),
            ParseFn::CompileLogicAnd => self.compile_logic_and(),
            ParseFn::CompileLogicOr => self.compile_logic_or(),
            ParseFn::CompileNumeric => self.compile_numeric(),
            ParseFn::CompileString => self.compile_string(),
            ParseFn::CompileUnary => self.compile_unary(),
            ParseFn::CompileVariable => self.compile_variable(can_assign),
            ParseFn::NONE => unreachable!("Tokens without a parse rule never reach the dispatcher."),
        }
    }

    /// Compiles a number literal.
    fn compile_numeric(&mut self) -> CompileResult {
        let value: f64 = match self.previous().lexeme.parse() {
            Ok(x) => x,
            Err(_) => return Err(self.error_at_previous("Invalid numeric literal.")),
        };

        self.emit_constant(Value::Number(value))?;
        Ok(())
    }

    /// Compiles a string literal. The raw contents get allocated on the
    /// heap and loaded through the constant pool.
    fn compile_string(&mut self) -> CompileResult {
        let text = self.previous().lexeme.clone();
        let idx = self.make_string_constant(&text)?;
        self.emit_op_code_with_byte(OpCode::OP_CONSTANT, idx);
        Ok(())
    }

    /// Compiles a `true`, `false`, or `nil` literal.
    fn compile_literal(&mut self) -> CompileResult {
        match self.previous().kind {
            TokenKind::TRUE => self.emit_op_code(OpCode::OP_TRUE),
            TokenKind::FALSE => self.emit_op_code(OpCode::OP_FALSE),
            TokenKind::NIL => self.emit_op_code(OpCode::OP_NIL),
            _ => unreachable!("Only literal tokens are dispatched here."),
        }

        Ok(())
    }

    /// Compiles a parenthesized expression.
    fn compile_grouping(&mut self) -> CompileResult {
        self.expression()?;
        self.consume(TokenKind::R_PAREN, "Expected ')' after the expression.")
    }

    /// Compiles a unary expression. The operand only spans tokens with
    /// unary precedence or higher.
    fn compile_unary(&mut self) -> CompileResult {
        let operator = self.previous().kind;

        self.parse_precedence(Precedence::PREC_UNARY)?;

        match operator {
            TokenKind::MINUS => self.emit_op_code(OpCode::OP_NEGATE),
            TokenKind::LOGIC_NOT => self.emit_op_code(OpCode::OP_NOT),
            _ => unreachable!("Only unary operator tokens are dispatched here."),
        }

        Ok(())
    }

    /// Compiles the right-hand side of a binary expression and emits
    /// the operator's instruction(s). Parsing the operand one precedence
    /// level up makes the operators left-associative.
    fn compile_binary_expr(&mut self) -> CompileResult {
        let operator = self.previous().kind;
        let rule = get_rule(operator);

        self.parse_precedence(rule.precedence.one_higher())?;

        match operator {
            TokenKind::PLUS => self.emit_op_code(OpCode::OP_ADD),
            TokenKind::MINUS => self.emit_op_code(OpCode::OP_SUBTRACT),
            TokenKind::STAR => self.emit_op_code(OpCode::OP_MULTIPLY),
            TokenKind::SLASH => self.emit_op_code(OpCode::OP_DIVIDE),
            TokenKind::LOGIC_EQ => self.emit_op_code(OpCode::OP_EQUAL),
            TokenKind::GREATER_THAN => self.emit_op_code(OpCode::OP_GREATER),
            TokenKind::LESS_THAN => self.emit_op_code(OpCode::OP_LESS),

            // The compound comparisons are emitted as the negation of
            // their complement.
            TokenKind::LOGIC_NOT_EQ => {
                self.emit_op_code(OpCode::OP_EQUAL);
                self.emit_op_code(OpCode::OP_NOT);
            }
            TokenKind::GREATER_THAN_EQ => {
                self.emit_op_code(OpCode::OP_LESS);
                self.emit_op_code(OpCode::OP_NOT);
            }
            TokenKind::LESS_THAN_EQ => {
                self.emit_op_code(OpCode::OP_GREATER);
                self.emit_op_code(OpCode::OP_NOT);
            }

            _ => unreachable!("Only binary operator tokens are dispatched here."),
        }

        Ok(())
    }

    /// Compiles a logical 'AND' expression. If the left-hand side is
    /// falsey the right-hand side is jumped over, leaving the left-hand
    /// value as the result.
    fn compile_logic_and(&mut self) -> CompileResult {
        let end_jump = self.emit_jump(OpCode::OP_JUMP_IF_FALSE);
        self.emit_op_code(OpCode::OP_POP);
        self.parse_precedence(Precedence::PREC_AND)?;
        self.patch_jump(end_jump)
    }

    /// Compiles a logical 'OR' expression. If the left-hand side is
    /// truthy the right-hand side is jumped over.
    fn compile_logic_or(&mut self) -> CompileResult {
        let else_jump = self.emit_jump(OpCode::OP_JUMP_IF_FALSE);
        let end_jump = self.emit_jump(OpCode::OP_JUMP);

        self.patch_jump(else_jump)?;
        self.emit_op_code(OpCode::OP_POP);

        self.parse_precedence(Precedence::PREC_OR)?;
        self.patch_jump(end_jump)
    }

    /// Compiles a call expression. Classes are the only callable values
    /// and take no arguments, so the argument list must be empty.
    fn compile_call(&mut self) -> CompileResult {
        self.consume(TokenKind::R_PAREN, "Expected ')' after the argument list.")?;
        self.emit_op_code_with_byte(OpCode::OP_CALL, 0);
        Ok(())
    }

    /// Compiles a property access or property assignment expression.
    fn compile_dot(&mut self, can_assign: bool) -> CompileResult {
        self.consume(TokenKind::IDENTIFIER, "Expected a property name after '.'.")?;

        let name = self.previous().lexeme.clone();
        let idx = self.make_string_constant(&name)?;

        if can_assign && self.matches(TokenKind::EQUALS) {
            self.expression()?;
            self.emit_op_code_with_byte(OpCode::OP_SET_PROPERTY, idx);
        } else {
            self.emit_op_code_with_byte(OpCode::OP_GET_PROPERTY, idx);
        }

        Ok(())
    }

    /// Compiles an `alloc` expression, which allocates a raw block of
    /// the given number of kilobytes at runtime.
    fn compile_alloc(&mut self) -> CompileResult {
        self.parse_precedence(Precedence::PREC_UNARY)?;
        self.emit_op_code(OpCode::OP_ALLOCATE);
        Ok(())
    }

    /// Compiles an identifier expression.
    fn compile_variable(&mut self, can_assign: bool) -> CompileResult {
        let name = self.previous().clone();
        self.named_variable(&name, can_assign)
    }

    /// Emits the instructions to either get or set a named variable,
    /// resolving it to a local slot first and falling back to a global.
    ///
    /// Global operations also load the name constant onto the stack
    /// beforehand, so the name string stays rooted while the operation
    /// runs.
    fn named_variable(&mut self, name: &Token, can_assign: bool) -> CompileResult {
        let (get_op, set_op, idx) = match self.resolve_local(name)? {
            Some(slot) => (OpCode::OP_GET_LOCAL, OpCode::OP_SET_LOCAL, slot),
            None => {
                let idx = self.make_string_constant(&name.lexeme)?;
                self.emit_op_code_with_byte(OpCode::OP_CONSTANT, idx);
                (OpCode::OP_GET_GLOBAL, OpCode::OP_SET_GLOBAL, idx)
            }
        };

        if can_assign && self.matches(TokenKind::EQUALS) {
            self.expression()?;
            self.emit_op_code_with_byte(set_op, idx);
        } else {
            self.emit_op_code_with_byte(get_op, idx);
        }

        Ok(())
    }
}
