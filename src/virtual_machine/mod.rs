use hashbrown::HashMap;

use crate::chunk::op_codes::OpCode;
use crate::chunk::Chunk;
use crate::compiler::Compiler;
use crate::errors::{report_runtime_error, RuntimeErrorType};
use crate::lexer::Lexer;
use crate::memory::GarbageCollector;
use crate::objects::{GcId, HeapObject, Value};

// Submodules
pub mod call_frame;
mod run;

use call_frame::CallFrame;

/// The types of results the interpreter can return.
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

/// The result of executing a single instruction: keep going, terminate
/// cleanly, or abort with a runtime error.
pub enum RuntimeResult {
    Continue,
    EndOk,
    Error {
        error: RuntimeErrorType,
        message: String,
    },
}

/// Represents a virtual machine and its runtime state.
pub struct VM {
    /// The collector that owns every heap object this machine touches.
    pub(crate) gc: GarbageCollector,
    /// The value stack.
    pub(crate) stack: Vec<Value>,
    /// The call-frame stack. The currently executing frame is the top.
    pub(crate) frames: Vec<CallFrame>,
    /// The global variable bindings.
    pub(crate) globals: HashMap<String, Value>,
}

impl VM {
    /// Compiles and executes a source string from scratch: lexing,
    /// compiling, and running it on a fresh machine.
    ///
    /// ## Arguments
    /// * `source` – The source text to interpret.
    ///
    /// ## Returns
    /// `InterpretResult` – The result of the source interpretation.
    pub fn interpret(source: &str) -> InterpretResult {
        let tokens = Lexer::lex(source);

        let mut gc = GarbageCollector::new();
        let script = Compiler::compile(&tokens, &mut gc);

        if script.had_error {
            return InterpretResult::CompileError;
        }

        #[cfg(feature = "debug-bytecode")]
        {
            let function = gc.get(&script.function).obj.as_func_obj().unwrap();
            print!("{}", function.chunk.disassemble("script", &gc));
        }

        let mut vm = VM::new(gc);
        vm.execute(script.function)
    }

    /// Creates a machine around a collector that already holds the
    /// compiled program.
    pub fn new(gc: GarbageCollector) -> Self {
        Self {
            gc,
            stack: Vec::with_capacity(256),
            frames: Vec::new(),
            globals: HashMap::new(),
        }
    }

    /// Executes a compiled script function to completion.
    pub fn execute(&mut self, function: GcId) -> InterpretResult {
        // The script function sits in stack slot zero. Besides lining up
        // the local slots, this is the root that keeps the chunk's
        // constants alive across collections.
        self.stack.push(Value::Obj(function));
        self.frames.push(CallFrame {
            function,
            ip: 0,
            base: 0,
        });

        match self.run() {
            RuntimeResult::EndOk => {
                self.frames.pop();
                self.stack.pop();
                InterpretResult::Ok
            }
            RuntimeResult::Error { error, message } => {
                let line = self.current_line();
                report_runtime_error(&error, &message, line);

                // Unwind. The collector releases the heap when the
                // machine itself goes away.
                self.stack.clear();
                self.frames.clear();
                InterpretResult::RuntimeError
            }
            RuntimeResult::Continue => {
                unreachable!("The dispatch loop only exits on a terminal result.")
            }
        }
    }

    /// The chunk of the currently executing frame.
    fn current_chunk(&self) -> &Chunk {
        let frame = self.frames.last().unwrap();

        match &self.gc.get(&frame.function).obj {
            HeapObject::Function(f) => &f.chunk,
            _ => unreachable!("Call frames always reference function objects."),
        }
    }

    /// The source line of the instruction being executed, recovered
    /// from the chunk's run-length encoded line table.
    fn current_line(&self) -> usize {
        let ip = self.frames.last().unwrap().ip;
        self.current_chunk().get_line(ip.saturating_sub(1))
    }

    /// Reads the instruction at the program counter and advances it.
    fn next_op_code(&mut self) -> OpCode {
        let frame = self.frames.last_mut().unwrap();

        let code = match &self.gc.get(&frame.function).obj {
            HeapObject::Function(f) => f.chunk.get_op_code(frame.ip),
            _ => unreachable!("Call frames always reference function objects."),
        };

        frame.ip += 1;
        code
    }

    /// Reads the operand byte at the program counter and advances it.
    fn next_byte(&mut self) -> u8 {
        let frame = self.frames.last_mut().unwrap();

        let byte = match &self.gc.get(&frame.function).obj {
            HeapObject::Function(f) => f.chunk.get_byte(frame.ip),
            _ => unreachable!("Call frames always reference function objects."),
        };

        frame.ip += 1;
        byte
    }

    /// Reads the two operand bytes at the program counter as a
    /// big-endian short and advances past them.
    fn next_short(&mut self) -> u16 {
        let frame = self.frames.last_mut().unwrap();

        let short = match &self.gc.get(&frame.function).obj {
            HeapObject::Function(f) => f.chunk.get_short(frame.ip),
            _ => unreachable!("Call frames always reference function objects."),
        };

        frame.ip += 2;
        short
    }

    /// Reads a constant from the current chunk's pool.
    fn read_constant(&self, idx: usize) -> Value {
        *self.current_chunk().get_constant(idx)
    }

    /// Reads a constant that the compiler guarantees to be a string,
    /// yielding its contents.
    fn read_constant_as_string(&self, idx: usize) -> String {
        match self.read_constant(idx) {
            Value::Obj(id) => match self.gc.get(&id).obj.as_str_obj() {
                Some(s) => s.text.clone(),
                None => unreachable!("Name constants are always strings."),
            },
            _ => unreachable!("Name constants are always strings."),
        }
    }

    /// Pushes a value onto the value stack.
    fn push_stack(&mut self, new_val: Value) {
        self.stack.push(new_val)
    }

    /// Pops the top of the value stack.
    fn pop_stack(&mut self) -> Value {
        match self.stack.pop() {
            Some(val) => val,
            None => panic!("Stack is empty!"),
        }
    }

    /// Peeks the top of the value stack without popping it.
    fn stack_top(&self) -> &Value {
        match self.stack.last() {
            Some(val) => val,
            None => panic!("Stack is empty!"),
        }
    }

    /// Prints the execution trace for the program. Useful for debugging
    /// the dispatch loop.
    #[cfg(feature = "debug-execution")]
    fn print_execution(&self, instr: &OpCode) {
        println!("\n==========================");
        println!("OpCode:\t\x1b[36m{:?}\x1b[0m", instr);
        println!("IP:\t{:>04}", self.frames.last().unwrap().ip);

        print!("stack\t[");
        for val in self.stack.iter() {
            print!("{}; ", val.display_plain(&self.gc));
        }
        println!("]");
    }
}
