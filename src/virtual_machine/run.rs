use crate::chunk::op_codes::OpCode;
use crate::errors::RuntimeErrorType;
use crate::memory::Roots;
use crate::objects::Value;
use crate::virtual_machine::{RuntimeResult, VM};

impl VM {
    /// Executes the instructions in the current frame's chunk.
    pub(crate) fn run(&mut self) -> RuntimeResult {
        loop {
            let instruction = self.next_op_code();

            #[cfg(feature = "debug-execution")]
            self.print_execution(&instruction);

            let exec = match instruction {
                // Stack loaders
                OpCode::OP_CONSTANT => {
                    let idx = self.next_byte() as usize;
                    let constant = self.read_constant(idx);
                    self.push_stack(constant);
                    RuntimeResult::Continue
                }
                OpCode::OP_NIL => {
                    self.push_stack(Value::Nil);
                    RuntimeResult::Continue
                }
                OpCode::OP_TRUE => {
                    self.push_stack(Value::Bool(true));
                    RuntimeResult::Continue
                }
                OpCode::OP_FALSE => {
                    self.push_stack(Value::Bool(false));
                    RuntimeResult::Continue
                }
                OpCode::OP_POP => {
                    self.pop_stack();
                    RuntimeResult::Continue
                }

                // Operators
                OpCode::OP_NEGATE => self.op_negate(),
                OpCode::OP_NOT => {
                    let value = self.pop_stack();
                    self.push_stack(Value::Bool(value.is_falsey()));
                    RuntimeResult::Continue
                }
                OpCode::OP_ADD => self.op_add(),
                OpCode::OP_SUBTRACT => self.op_subtract(),
                OpCode::OP_MULTIPLY => self.op_multiply(),
                OpCode::OP_DIVIDE => self.op_divide(),
                OpCode::OP_EQUAL => {
                    let b = self.pop_stack();
                    let a = self.pop_stack();
                    let result = a.equals(&b, &self.gc);
                    self.push_stack(Value::Bool(result));
                    RuntimeResult::Continue
                }
                OpCode::OP_GREATER => self.op_greater(),
                OpCode::OP_LESS => self.op_less(),

                OpCode::OP_PRINT => {
                    let value = self.pop_stack();
                    println!("{}", value.display_plain(&self.gc));
                    RuntimeResult::Continue
                }

                // Global declarations
                OpCode::OP_DEFINE_GLOBAL => self.op_define_global(),
                OpCode::OP_GET_GLOBAL => self.op_get_global(),
                OpCode::OP_SET_GLOBAL => self.op_set_global(),

                // Local declarations
                OpCode::OP_GET_LOCAL => self.op_get_local(),
                OpCode::OP_SET_LOCAL => self.op_set_local(),

                // Jumps
                OpCode::OP_JUMP => self.op_jump(),
                OpCode::OP_JUMP_IF_FALSE => self.op_jump_if_false(),
                OpCode::OP_LOOP => self.op_loop(),

                // Classes & Instances
                OpCode::OP_CLASS => self.op_class(),
                OpCode::OP_CALL => self.op_call(),
                OpCode::OP_GET_PROPERTY => self.op_get_property(),
                OpCode::OP_SET_PROPERTY => self.op_set_property(),

                OpCode::OP_ALLOCATE => self.op_allocate(),

                OpCode::OP_RETURN => RuntimeResult::EndOk,
            };

            match exec {
                RuntimeResult::Continue => continue,
                _ => return exec,
            }
        }
    }

    /// Executes the instruction to arithmetically negate the top of the stack.
    fn op_negate(&mut self) -> RuntimeResult {
        let value = self.pop_stack();

        match value {
            Value::Number(n) => {
                self.push_stack(Value::Number(-n));
                RuntimeResult::Continue
            }
            _ => RuntimeResult::Error {
                error: RuntimeErrorType::TypeError,
                message: format!(
                    "Cannot apply unary operator '-' to an operand of type '{}'.",
                    value.type_name(&self.gc)
                ),
            },
        }
    }

    /// Executes the instruction to add the two top-most values. Numbers
    /// add arithmetically; strings concatenate into a newly allocated
    /// string object.
    fn op_add(&mut self) -> RuntimeResult {
        let b = self.pop_stack();
        let a = self.pop_stack();

        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.push_stack(Value::Number(x + y));
                RuntimeResult::Continue
            }
            (Value::Obj(x), Value::Obj(y)) => {
                // Build the concatenation up front; the operand objects
                // only need to survive this read, not the allocation.
                let concat = match (
                    self.gc.get(&x).obj.as_str_obj(),
                    self.gc.get(&y).obj.as_str_obj(),
                ) {
                    (Some(x_str), Some(y_str)) => format!("{}{}", x_str.text, y_str.text),
                    _ => return self.binary_type_error("+", &a, &b),
                };

                let id = self.gc.alloc_string(
                    concat,
                    Some(Roots {
                        stack: &self.stack,
                        globals: &self.globals,
                    }),
                );

                self.push_stack(Value::Obj(id));
                RuntimeResult::Continue
            }
            _ => self.binary_type_error("+", &a, &b),
        }
    }

    /// Executes the instruction to subtract the two top-most values.
    fn op_subtract(&mut self) -> RuntimeResult {
        let b = self.pop_stack();
        let a = self.pop_stack();

        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.push_stack(Value::Number(x - y));
                RuntimeResult::Continue
            }
            _ => self.binary_type_error("-", &a, &b),
        }
    }

    /// Executes the instruction to multiply the two top-most values.
    fn op_multiply(&mut self) -> RuntimeResult {
        let b = self.pop_stack();
        let a = self.pop_stack();

        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.push_stack(Value::Number(x * y));
                RuntimeResult::Continue
            }
            _ => self.binary_type_error("*", &a, &b),
        }
    }

    /// Executes the instruction to divide the two top-most values.
    fn op_divide(&mut self) -> RuntimeResult {
        let b = self.pop_stack();
        let a = self.pop_stack();

        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                if y == 0.0 {
                    return RuntimeResult::Error {
                        error: RuntimeErrorType::ZeroDivision,
                        message: String::from("Cannot divide by 0."),
                    };
                }

                self.push_stack(Value::Number(x / y));
                RuntimeResult::Continue
            }
            _ => self.binary_type_error("/", &a, &b),
        }
    }

    /// Executes the instruction to compare the two top-most values with
    /// the `>` ordering. Numbers order numerically and strings
    /// lexicographically.
    fn op_greater(&mut self) -> RuntimeResult {
        let b = self.pop_stack();
        let a = self.pop_stack();

        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.push_stack(Value::Bool(x > y));
                RuntimeResult::Continue
            }
            (Value::Obj(x), Value::Obj(y)) => {
                let result = match (
                    self.gc.get(&x).obj.as_str_obj(),
                    self.gc.get(&y).obj.as_str_obj(),
                ) {
                    (Some(x_str), Some(y_str)) => x_str.text > y_str.text,
                    _ => return self.binary_type_error(">", &a, &b),
                };

                self.push_stack(Value::Bool(result));
                RuntimeResult::Continue
            }
            _ => self.binary_type_error(">", &a, &b),
        }
    }

    /// Executes the instruction to compare the two top-most values with
    /// the `<` ordering.
    fn op_less(&mut self) -> RuntimeResult {
        let b = self.pop_stack();
        let a = self.pop_stack();

        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.push_stack(Value::Bool(x < y));
                RuntimeResult::Continue
            }
            (Value::Obj(x), Value::Obj(y)) => {
                let result = match (
                    self.gc.get(&x).obj.as_str_obj(),
                    self.gc.get(&y).obj.as_str_obj(),
                ) {
                    (Some(x_str), Some(y_str)) => x_str.text < y_str.text,
                    _ => return self.binary_type_error("<", &a, &b),
                };

                self.push_stack(Value::Bool(result));
                RuntimeResult::Continue
            }
            _ => self.binary_type_error("<", &a, &b),
        }
    }

    /// Builds the type error for a binary operator applied to operands
    /// it does not support.
    fn binary_type_error(&self, operator: &str, a: &Value, b: &Value) -> RuntimeResult {
        RuntimeResult::Error {
            error: RuntimeErrorType::TypeError,
            message: format!(
                "Cannot apply operator '{}' to operands of type '{}' and '{}'.",
                operator,
                a.type_name(&self.gc),
                b.type_name(&self.gc)
            ),
        }
    }

    /// Executes the instruction to define a new global binding. The
    /// stack holds the rooted name beneath the initializer value; both
    /// are consumed.
    fn op_define_global(&mut self) -> RuntimeResult {
        let idx = self.next_byte() as usize;
        let name = self.read_constant_as_string(idx);

        if self.globals.contains_key(&name) {
            return RuntimeResult::Error {
                error: RuntimeErrorType::ReferenceError,
                message: format!("Cannot redefine global variable '{}'.", name),
            };
        }

        let value = self.pop_stack();
        self.globals.insert(name, value);
        self.pop_stack(); // the rooted identifier

        RuntimeResult::Continue
    }

    /// Executes the instruction to read a global binding, replacing the
    /// rooted name on the stack with the bound value.
    fn op_get_global(&mut self) -> RuntimeResult {
        let idx = self.next_byte() as usize;
        let name = self.read_constant_as_string(idx);

        match self.globals.get(&name) {
            Some(value) => {
                let value = *value;
                self.pop_stack(); // the rooted identifier
                self.push_stack(value);
                RuntimeResult::Continue
            }
            None => RuntimeResult::Error {
                error: RuntimeErrorType::ReferenceError,
                message: format!("Undefined variable '{}'.", name),
            },
        }
    }

    /// Executes the instruction to assign to an existing global binding.
    /// The assigned value is pushed back as the expression's result.
    fn op_set_global(&mut self) -> RuntimeResult {
        let idx = self.next_byte() as usize;
        let name = self.read_constant_as_string(idx);

        if !self.globals.contains_key(&name) {
            return RuntimeResult::Error {
                error: RuntimeErrorType::ReferenceError,
                message: format!("Undefined variable '{}'.", name),
            };
        }

        let value = self.pop_stack();
        self.pop_stack(); // the rooted identifier beneath the value
        self.globals.insert(name, value);
        self.push_stack(value);

        RuntimeResult::Continue
    }

    /// Executes the instruction to read a local slot.
    fn op_get_local(&mut self) -> RuntimeResult {
        let slot = self.next_byte() as usize;
        let base = self.frames.last().unwrap().base;

        let value = self.stack[base + slot];
        self.push_stack(value);

        RuntimeResult::Continue
    }

    /// Executes the instruction to write the top of the stack into a
    /// local slot, without popping it.
    fn op_set_local(&mut self) -> RuntimeResult {
        let slot = self.next_byte() as usize;
        let base = self.frames.last().unwrap().base;

        self.stack[base + slot] = *self.stack_top();

        RuntimeResult::Continue
    }

    /// Executes the instruction to jump forward by the given offset.
    fn op_jump(&mut self) -> RuntimeResult {
        let offset = self.next_short() as usize;
        self.frames.last_mut().unwrap().ip += offset;
        RuntimeResult::Continue
    }

    /// Executes the instruction to jump forward by the given offset if
    /// the top of the stack is falsey. The condition is left on the
    /// stack; the compiler emits a matching `POP` on each branch.
    fn op_jump_if_false(&mut self) -> RuntimeResult {
        let offset = self.next_short() as usize;

        if self.stack_top().is_falsey() {
            self.frames.last_mut().unwrap().ip += offset;
        }

        RuntimeResult::Continue
    }

    /// Executes the instruction to jump (loop) back by the given offset.
    fn op_loop(&mut self) -> RuntimeResult {
        let offset = self.next_short() as usize;

        // +1 accounts for the program counter already sitting past the
        // operand bytes; the distance was measured from the instruction.
        self.frames.last_mut().unwrap().ip -= offset + 1;

        RuntimeResult::Continue
    }

    /// Executes the instruction to create a class object and push it.
    fn op_class(&mut self) -> RuntimeResult {
        let idx = self.next_byte() as usize;

        let name = match self.read_constant(idx) {
            Value::Obj(id) => id,
            _ => unreachable!("Name constants are always strings."),
        };

        let class = self.gc.alloc_class(
            name,
            Some(Roots {
                stack: &self.stack,
                globals: &self.globals,
            }),
        );

        self.push_stack(Value::Obj(class));
        RuntimeResult::Continue
    }

    /// Executes the instruction to call the value on top of the stack.
    /// Classes are the only callables: calling one replaces it with a
    /// fresh instance. The class is peeked, not popped, so it stays
    /// rooted while the instance is allocated.
    fn op_call(&mut self) -> RuntimeResult {
        let arg_count = self.next_byte();
        let callee = *self.stack_top();

        match callee {
            Value::Obj(id) if self.gc.get(&id).obj.as_class_obj().is_some() => {
                if arg_count != 0 {
                    return RuntimeResult::Error {
                        error: RuntimeErrorType::ArgumentError,
                        message: format!("Expected 0 arguments but got {} instead.", arg_count),
                    };
                }

                let instance = self.gc.alloc_instance(
                    id,
                    Some(Roots {
                        stack: &self.stack,
                        globals: &self.globals,
                    }),
                );

                let top = self.stack.len() - 1;
                self.stack[top] = Value::Obj(instance);

                RuntimeResult::Continue
            }
            _ => RuntimeResult::Error {
                error: RuntimeErrorType::TypeError,
                message: format!(
                    "Cannot call object of type '{}'.",
                    callee.type_name(&self.gc)
                ),
            },
        }
    }

    /// Executes the instruction to read a field off the instance on top
    /// of the stack.
    fn op_get_property(&mut self) -> RuntimeResult {
        let idx = self.next_byte() as usize;
        let name = self.read_constant_as_string(idx);
        let target = self.pop_stack();

        let field = match target {
            Value::Obj(id) => match self.gc.get(&id).obj.as_instance_obj() {
                Some(instance) => match instance.fields.get(&name) {
                    Some(field) => *field,
                    None => {
                        return RuntimeResult::Error {
                            error: RuntimeErrorType::ReferenceError,
                            message: format!("Undefined property '{}'.", name),
                        }
                    }
                },
                None => return self.property_type_error(&target),
            },
            _ => return self.property_type_error(&target),
        };

        self.push_stack(field);
        RuntimeResult::Continue
    }

    /// Executes the instruction to write a field on an instance. The
    /// stack holds `(instance, value)`; the value is pushed back as the
    /// assignment's result.
    fn op_set_property(&mut self) -> RuntimeResult {
        let idx = self.next_byte() as usize;
        let name = self.read_constant_as_string(idx);

        let value = self.pop_stack();
        let target = self.pop_stack();

        match target {
            Value::Obj(id) => match self.gc.get_mut(&id).obj.as_instance_obj_mut() {
                Some(instance) => {
                    instance.fields.insert(name, value);
                }
                None => return self.property_type_error(&target),
            },
            _ => return self.property_type_error(&target),
        }

        self.push_stack(value);
        RuntimeResult::Continue
    }

    /// Builds the type error for property access on a non-instance.
    fn property_type_error(&self, value: &Value) -> RuntimeResult {
        RuntimeResult::Error {
            error: RuntimeErrorType::TypeError,
            message: format!(
                "Cannot access properties on a value of type '{}'. Only instances have fields.",
                value.type_name(&self.gc)
            ),
        }
    }

    /// Executes the instruction to allocate a raw block. The top of the
    /// stack holds the block size in kilobytes.
    fn op_allocate(&mut self) -> RuntimeResult {
        let value = self.pop_stack();

        match value {
            Value::Number(n) => {
                let id = self.gc.alloc_allocation(
                    n as usize,
                    Some(Roots {
                        stack: &self.stack,
                        globals: &self.globals,
                    }),
                );

                self.push_stack(Value::Obj(id));
                RuntimeResult::Continue
            }
            _ => RuntimeResult::Error {
                error: RuntimeErrorType::TypeError,
                message: format!(
                    "Cannot apply 'alloc' to an operand of type '{}'.",
                    value.type_name(&self.gc)
                ),
            },
        }
    }
}
