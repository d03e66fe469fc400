use crate::chunk::op_codes::OpCode;
use crate::compiler::{CompileResult, Compiler, Local};
use crate::errors::CompileError;
use crate::lexer::tokens::TokenKind;

impl<'a> Compiler<'a> {
    /// Compiles a single declaration. This is the compiler's error
    /// boundary: a compile error raised anywhere inside the declaration
    /// is reported here, and the compiler synchronizes to the next
    /// statement so it can keep looking for further errors.
    pub(super) fn declaration(&mut self) {
        let result = if self.matches(TokenKind::VAR_KW) {
            self.var_declaration()
        } else {
            self.statement()
        };

        if let Err(error) = result {
            self.report_error(&error);
            self.synchronize();
        }
    }

    /// Compiles a single statement.
    fn statement(&mut self) -> CompileResult {
        if self.matches(TokenKind::PRINT_KW) {
            self.print_statement()
        } else if self.matches(TokenKind::L_CURLY) {
            self.begin_scope();
            let body = self.block();
            self.end_scope();
            body
        } else if self.matches(TokenKind::IF_KW) {
            self.if_statement()
        } else if self.matches(TokenKind::WHILE_KW) {
            self.while_statement()
        } else if self.matches(TokenKind::FOR_KW) {
            self.for_statement()
        } else if self.matches(TokenKind::RETURN_KW) {
            self.return_statement()
        } else if self.matches(TokenKind::CLASS_KW) {
            self.class_declaration()
        } else if self.matches(TokenKind::FUNC_KW) {
            Err(self.error_at_previous("Function declarations are not supported."))
        } else {
            self.expression_statement()
        }
    }

    /// Compiles a variable declaration. The initializer (or an implicit
    /// `nil`) is left on the stack, where `DEFINE_GLOBAL` consumes it or
    /// where it becomes the local's slot.
    fn var_declaration(&mut self) -> CompileResult {
        let global_idx = self.parse_variable_name("Expected a variable name after 'var'.")?;

        if self.matches(TokenKind::EQUALS) {
            self.expression()?;
        } else {
            self.emit_op_code(OpCode::OP_NIL);
        }

        self.consume(
            TokenKind::SEMICOLON,
            "Expected ';' after the variable declaration.",
        )?;

        self.define_variable(global_idx);
        Ok(())
    }

    /// Parses the name of a variable declaration. At local scope the
    /// name only becomes a compile-time slot; at global scope the name
    /// is interned and loaded onto the stack so it stays rooted until
    /// the matching `DEFINE_GLOBAL` runs.
    ///
    /// ## Returns
    /// `Result<u8, CompileError>` – The pool index of the name at global
    /// scope; zero for locals.
    fn parse_variable_name(&mut self, message: &str) -> Result<u8, CompileError> {
        self.consume(TokenKind::IDENTIFIER, message)?;
        self.declare_variable()?;

        if self.scope_depth > 0 {
            return Ok(0);
        }

        let name = self.previous().lexeme.clone();
        let idx = self.make_string_constant(&name)?;
        self.emit_op_code_with_byte(OpCode::OP_CONSTANT, idx);

        Ok(idx)
    }

    /// Records the previous token as a local variable of the current
    /// scope. Global-scope declarations are not recorded; they resolve
    /// through the globals mapping at runtime.
    fn declare_variable(&mut self) -> CompileResult {
        if self.scope_depth == 0 {
            return Ok(());
        }

        let name = self.previous().lexeme.clone();

        for local in self.locals.iter().rev() {
            if local.depth != -1 && local.depth < self.scope_depth {
                break;
            }

            if local.name == name {
                return Err(
                    self.error_at_previous(&format!("Cannot redefine variable '{}'.", name))
                );
            }
        }

        self.add_local(name)
    }

    /// Appends a new, uninitialized local variable slot.
    fn add_local(&mut self, name: String) -> CompileResult {
        if self.locals.len() == 256 {
            return Err(self.error_at_previous("Too many local variables in scope."));
        }

        // The -1 sentinel is cleared once the initializer has compiled,
        // which is what rejects `var x = x;`.
        self.locals.push(Local { name, depth: -1 });
        Ok(())
    }

    /// Finishes a variable declaration: globals get their
    /// `DEFINE_GLOBAL` instruction, locals simply become initialized.
    fn define_variable(&mut self, global_idx: u8) {
        if self.scope_depth > 0 {
            self.mark_initialized();
            return;
        }

        self.emit_op_code_with_byte(OpCode::OP_DEFINE_GLOBAL, global_idx);
    }

    /// Clears the uninitialized sentinel of the innermost local.
    fn mark_initialized(&mut self) {
        if self.scope_depth == 0 {
            return;
        }

        let depth = self.scope_depth;
        if let Some(local) = self.locals.last_mut() {
            local.depth = depth;
        }
    }

    /// Compiles a print statement.
    fn print_statement(&mut self) -> CompileResult {
        self.expression()?;
        self.consume(TokenKind::SEMICOLON, "Expected ';' after the print statement.")?;
        self.emit_op_code(OpCode::OP_PRINT);
        Ok(())
    }

    /// Compiles an expression statement, discarding the value the
    /// expression leaves on the stack.
    fn expression_statement(&mut self) -> CompileResult {
        self.expression()?;
        self.consume(TokenKind::SEMICOLON, "Expected ';' after the expression.")?;
        self.emit_op_code(OpCode::OP_POP);
        Ok(())
    }

    /// Compiles a return statement. There are no function bodies to
    /// return from, so the instruction simply terminates the program.
    fn return_statement(&mut self) -> CompileResult {
        self.emit_op_code(OpCode::OP_RETURN);
        self.consume(TokenKind::SEMICOLON, "Expected ';' after 'return'.")
    }

    /// Opens a new block scope.
    fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Closes the current block scope, popping every local that
    /// belonged to it off the compile-time list and off the runtime
    /// stack.
    fn end_scope(&mut self) {
        self.scope_depth -= 1;

        while let Some(local) = self.locals.last() {
            if local.depth <= self.scope_depth {
                break;
            }

            self.locals.pop();
            self.emit_op_code(OpCode::OP_POP);
        }
    }

    /// Compiles the declarations inside a block.
    fn block(&mut self) -> CompileResult {
        while !self.check(TokenKind::R_CURLY) && !self.check(TokenKind::EOF) {
            self.declaration();
        }

        self.consume(TokenKind::R_CURLY, "Expected '}' after the block.")
    }

    /// Compiles an if statement, with an optional else branch.
    ///
    /// `JUMP_IF_FALSE` leaves the condition on the stack, so each branch
    /// starts by popping it.
    fn if_statement(&mut self) -> CompileResult {
        self.consume(TokenKind::L_PAREN, "Expected '(' after 'if'.")?;
        self.expression()?;
        self.consume(TokenKind::R_PAREN, "Expected ')' after the condition.")?;

        let then_jump = self.emit_jump(OpCode::OP_JUMP_IF_FALSE);
        self.emit_op_code(OpCode::OP_POP);
        self.statement()?;

        let else_jump = self.emit_jump(OpCode::OP_JUMP);

        self.patch_jump(then_jump)?;
        self.emit_op_code(OpCode::OP_POP);

        if self.matches(TokenKind::ELSE_KW) {
            self.statement()?;
        }

        self.patch_jump(else_jump)
    }

    /// Compiles a while statement.
    fn while_statement(&mut self) -> CompileResult {
        let loop_start = self.chunk.len();

        self.consume(TokenKind::L_PAREN, "Expected '(' after 'while'.")?;
        self.expression()?;
        self.consume(TokenKind::R_PAREN, "Expected ')' after the condition.")?;

        let exit_jump = self.emit_jump(OpCode::OP_JUMP_IF_FALSE);
        self.emit_op_code(OpCode::OP_POP);
        self.statement()?;

        self.emit_loop(loop_start)?;

        self.patch_jump(exit_jump)?;
        self.emit_op_code(OpCode::OP_POP);
        Ok(())
    }

    /// Compiles a for statement by desugaring it into its initializer,
    /// condition, increment, and body parts. The increment clause, when
    /// present, compiles *before* the body in the instruction stream, so
    /// the body first jumps over it and then loops back into it.
    fn for_statement(&mut self) -> CompileResult {
        self.begin_scope();

        self.consume(TokenKind::L_PAREN, "Expected '(' after 'for'.")?;

        if self.matches(TokenKind::SEMICOLON) {
            // No initializer clause.
        } else if self.matches(TokenKind::VAR_KW) {
            self.var_declaration()?;
        } else {
            self.expression_statement()?;
        }

        let mut loop_start = self.chunk.len();

        let mut exit_jump = None;
        if !self.matches(TokenKind::SEMICOLON) {
            self.expression()?;
            self.consume(TokenKind::SEMICOLON, "Expected ';' after the loop condition.")?;

            exit_jump = Some(self.emit_jump(OpCode::OP_JUMP_IF_FALSE));
            self.emit_op_code(OpCode::OP_POP);
        }

        if !self.matches(TokenKind::R_PAREN) {
            let body_jump = self.emit_jump(OpCode::OP_JUMP);
            let increment_start = self.chunk.len();

            self.expression()?;
            self.emit_op_code(OpCode::OP_POP);
            self.consume(TokenKind::R_PAREN, "Expected ')' after the 'for' clauses.")?;

            self.emit_loop(loop_start)?;
            loop_start = increment_start;
            self.patch_jump(body_jump)?;
        }

        self.statement()?;
        self.emit_loop(loop_start)?;

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump)?;
            self.emit_op_code(OpCode::OP_POP);
        }

        self.end_scope();
        Ok(())
    }

    /// Compiles a class declaration. The body must be empty; classes
    /// only carry a name, and fields appear on instances at runtime.
    fn class_declaration(&mut self) -> CompileResult {
        self.consume(TokenKind::IDENTIFIER, "Expected a class name after 'class'.")?;

        let name = self.previous().lexeme.clone();
        let idx = self.make_string_constant(&name)?;
        self.declare_variable()?;

        if self.scope_depth == 0 {
            // Root the class name for the upcoming DEFINE_GLOBAL.
            self.emit_op_code_with_byte(OpCode::OP_CONSTANT, idx);
        }

        self.emit_op_code_with_byte(OpCode::OP_CLASS, idx);
        self.define_variable(idx);

        self.consume(TokenKind::L_CURLY, "Expected '{' before the class body.")?;
        self.consume(TokenKind::R_CURLY, "Expected '}' after the class body.")
    }
}
