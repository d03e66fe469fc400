use crate::chunk::op_codes::OpCode;
use crate::chunk::{Chunk, ConstantPos};
use crate::errors::{report_compile_error, CompileError};
use crate::lexer::tokens::{Token, TokenKind};
use crate::memory::GarbageCollector;
use crate::objects::{GcId, Value};

// Submodules
mod expressions;
mod rules;
mod statements;

/// The result type threaded through the compiler's parse functions.
/// An error unwinds to the nearest statement boundary, where it gets
/// reported and the compiler synchronizes.
type CompileResult = Result<(), CompileError>;

/// A local variable known at compile time. A depth of `-1` marks a
/// declared-but-uninitialized slot, which is how reading a local inside
/// its own initializer gets rejected.
struct Local {
    name: String,
    depth: i32,
}

/// The product of a compilation: the script function whose chunk holds
/// the whole program, plus a flag recording whether any errors were
/// reported. The function is returned even on error so the bytecode can
/// still be inspected for debugging.
pub struct CompiledScript {
    pub function: GcId,
    pub had_error: bool,
}

/// Represents a compiler and its internal state.
pub struct Compiler<'a> {
    /// The token sequence being compiled.
    tokens: &'a [Token],
    /// The index of the current token.
    current: usize,
    /// The chunk being emitted into.
    chunk: Chunk,
    /// The local variables currently in scope, innermost last.
    locals: Vec<Local>,
    /// The current scope depth. Zero is the global scope.
    scope_depth: i32,
    /// The collector that owns the literals this compiler allocates.
    gc: &'a mut GarbageCollector,
    had_error: bool,
}

impl<'a> Compiler<'a> {
    /// Compiles a token sequence into a script function whose chunk
    /// contains the bytecode for the full program.
    ///
    /// ## Arguments
    /// * `tokens` – The token sequence to be compiled. Must end with
    /// an `EOF` token.
    /// * `gc` – The collector that will own the compiled function and
    /// the literals found in the program.
    ///
    /// ## Returns
    /// `CompiledScript` – The script function and the error flag.
    pub fn compile(tokens: &'a [Token], gc: &'a mut GarbageCollector) -> CompiledScript {
        let mut s = Self {
            tokens,
            current: 0,
            chunk: Chunk::new(),
            // Slot zero belongs to the script function itself, so local
            // slots line up with the runtime stack.
            locals: vec![Local {
                name: String::new(),
                depth: 0,
            }],
            scope_depth: 0,
            gc,
            had_error: false,
        };

        while !s.check(TokenKind::EOF) {
            s.declaration();
        }

        s.emit_op_code(OpCode::OP_RETURN);

        let name = s.gc.alloc_string(String::from("script"), None);
        let function = s.gc.alloc_function(name, std::mem::take(&mut s.chunk), 0, None);

        CompiledScript {
            function,
            had_error: s.had_error,
        }
    }

    /// Gets a reference to the current token.
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// Gets a reference to the previously consumed token.
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Checks that the current token matches the token kind provided.
    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Checks that the current token matches the token kind provided.
    /// If the tokens match, the current token gets consumed and the
    /// function returns true. Otherwise the token is not consumed, and
    /// the function returns false.
    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances the compiler to the next token. Scan failures arrive as
    /// `ERROR` tokens; each one is reported here and skipped so parsing
    /// resumes at the next healthy token.
    fn advance(&mut self) {
        if !self.check(TokenKind::EOF) {
            self.current += 1;
        }

        while matches!(self.previous().kind, TokenKind::ERROR) {
            let error = CompileError {
                message: self.previous().lexeme.clone(),
                line: self.previous().line_num,
            };
            self.report_error(&error);

            if self.check(TokenKind::EOF) {
                break;
            }

            self.current += 1;
        }
    }

    /// Consumes the current token only if it is of a given kind.
    /// If the token does not match the kind, returns a compile error.
    ///
    /// ## Arguments
    /// * `kind` – the expected kind of the token to consume.
    /// * `message` – the error message if the current token does not
    /// match the provided kind.
    fn consume(&mut self, kind: TokenKind, message: &str) -> CompileResult {
        if self.check(kind) {
            self.advance();
            return Ok(());
        }

        Err(self.error_at_current(message))
    }

    /// Creates a compile error pointing at the current token.
    fn error_at_current(&self, message: &str) -> CompileError {
        CompileError {
            message: String::from(message),
            line: self.peek().line_num,
        }
    }

    /// Creates a compile error pointing at the previous token.
    fn error_at_previous(&self, message: &str) -> CompileError {
        CompileError {
            message: String::from(message),
            line: self.current_line(),
        }
    }

    /// Reports a compile error and records that compilation failed.
    fn report_error(&mut self, error: &CompileError) {
        report_compile_error(error);
        self.had_error = true;
    }

    /// The line of the previously consumed token, which is the line
    /// emitted bytes get attributed to.
    fn current_line(&self) -> usize {
        if self.current == 0 {
            self.peek().line_num
        } else {
            self.previous().line_num
        }
    }

    /// Emits an instruction into the chunk.
    fn emit_op_code(&mut self, instr: OpCode) {
        let line = self.current_line();
        self.chunk.write_op_code(instr, line);
    }

    /// Emits a raw operand byte into the chunk.
    fn emit_byte(&mut self, byte: u8) {
        let line = self.current_line();
        self.chunk.write_byte(byte, line);
    }

    /// Emits an instruction followed by its single operand byte.
    fn emit_op_code_with_byte(&mut self, instr: OpCode, byte: u8) {
        self.emit_op_code(instr);
        self.emit_byte(byte);
    }

    /// Emits a jump instruction with a dummy offset, to be replaced by
    /// a later call to `patch_jump(...)`.
    ///
    /// ## Returns
    /// `usize` – The offset of the two placeholder bytes in the chunk.
    fn emit_jump(&mut self, instr: OpCode) -> usize {
        self.emit_op_code(instr);
        self.emit_byte(0xff);
        self.emit_byte(0xff);

        self.chunk.len() - 2
    }

    /// Patches the offset of a jump instruction so it lands on the next
    /// byte to be emitted.
    ///
    /// ## Arguments
    /// * `offset` – The position of the jump's placeholder bytes, as
    /// returned by `emit_jump(...)`.
    fn patch_jump(&mut self, offset: usize) -> CompileResult {
        // -2 to adjust for the two bytes of the jump offset itself.
        let jump = match u16::try_from(self.chunk.len() - offset - 2) {
            Ok(x) => x,
            Err(_) => return Err(self.error_at_previous("Too much code to jump over.")),
        };

        let bytes = jump.to_be_bytes();
        self.chunk.modify_byte(offset, bytes[0]);
        self.chunk.modify_byte(offset + 1, bytes[1]);

        Ok(())
    }

    /// Emits a `LOOP` instruction jumping backwards to `loop_start`.
    fn emit_loop(&mut self, loop_start: usize) -> CompileResult {
        // +2 so the distance covers the loop operand bytes themselves.
        let offset = match u16::try_from(self.chunk.len() - loop_start + 2) {
            Ok(x) => x,
            Err(_) => return Err(self.error_at_previous("The loop body is too large.")),
        };

        let bytes = offset.to_be_bytes();
        self.emit_op_code(OpCode::OP_LOOP);
        self.emit_byte(bytes[0]);
        self.emit_byte(bytes[1]);

        Ok(())
    }

    /// Adds a value to the chunk's constant pool.
    ///
    /// ## Returns
    /// `Result<u8, CompileError>` – The pool index of the value, or an
    /// error when the pool is already full.
    fn add_constant(&mut self, value: Value) -> Result<u8, CompileError> {
        match self.chunk.add_constant(value, self.gc) {
            ConstantPos::Pos(idx) => Ok(idx),
            ConstantPos::Error => {
                Err(self.error_at_previous("Cannot have more than 256 constants in one chunk."))
            }
        }
    }

    /// Interns a string into the constant pool, reusing the existing
    /// entry when the same contents were already added.
    fn make_string_constant(&mut self, text: &str) -> Result<u8, CompileError> {
        if let Some(idx) = self.chunk.find_string_constant(text, self.gc) {
            return Ok(idx);
        }

        let id = self.gc.alloc_string(String::from(text), None);
        self.add_constant(Value::Obj(id))
    }

    /// Adds a value to the constant pool and emits the `CONSTANT`
    /// instruction that loads it.
    fn emit_constant(&mut self, value: Value) -> Result<u8, CompileError> {
        let idx = self.add_constant(value)?;
        self.emit_op_code_with_byte(OpCode::OP_CONSTANT, idx);
        Ok(idx)
    }

    /// Scans the locals innermost-out for the given name.
    ///
    /// ## Returns
    /// `Result<Option<u8>, CompileError>` – The local's stack slot on a
    /// match, `None` when the name must be a global, or an error when
    /// the local is read inside its own initializer.
    fn resolve_local(&self, name: &Token) -> Result<Option<u8>, CompileError> {
        for (idx, local) in self.locals.iter().enumerate().rev() {
            if local.name == name.lexeme {
                if local.depth == -1 {
                    return Err(self
                        .error_at_previous("Can't read local variable in its own initializer."));
                }

                return Ok(Some(idx as u8));
            }
        }

        Ok(None)
    }

    /// Synchronizes the compiler after an error was reported. This
    /// method helps minimize the number of cascading errors the
    /// compiler emits when it finds a parsing error: tokens are skipped
    /// until a statement boundary is reached.
    fn synchronize(&mut self) {
        while !self.check(TokenKind::EOF) {
            if self.current > 0 && self.previous().kind == TokenKind::SEMICOLON {
                return;
            }

            match self.peek().kind {
                TokenKind::CLASS_KW
                | TokenKind::FUNC_KW
                | TokenKind::VAR_KW
                | TokenKind::FOR_KW
                | TokenKind::IF_KW
                | TokenKind::WHILE_KW
                | TokenKind::PRINT_KW
                | TokenKind::RETURN_KW => {
                    return;
                }

                _ => {}
            }

            self.advance();
        }
    }
}
