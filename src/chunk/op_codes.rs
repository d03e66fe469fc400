use num_derive::FromPrimitive;

/// The set of instructions supported by the virtual machine.
///
/// **NOTE:** Changing the order in which members are declared creates
/// incompatibilities between different versions of the interpreter.
#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // Instructions with zero chunk operands.
    OP_ADD,
    OP_ALLOCATE,
    OP_DIVIDE,
    OP_EQUAL,
    OP_FALSE,
    OP_GREATER,
    OP_LESS,
    OP_MULTIPLY,
    OP_NEGATE,
    OP_NIL,
    OP_NOT,
    OP_POP,
    OP_PRINT,
    OP_RETURN,
    OP_SUBTRACT,
    OP_TRUE,

    // Instructions with one chunk operand. These instructions use
    // the next byte from the chunk as their operand.
    OP_CALL,
    OP_CLASS,
    OP_CONSTANT,
    OP_DEFINE_GLOBAL,
    OP_GET_GLOBAL,
    OP_GET_LOCAL,
    OP_GET_PROPERTY,
    OP_SET_GLOBAL,
    OP_SET_LOCAL,
    OP_SET_PROPERTY,

    // Instructions with two chunk operands. These instructions use
    // the next two bytes (a big-endian short) as their operand.
    OP_JUMP,
    OP_JUMP_IF_FALSE,
    OP_LOOP,
}

impl OpCode {
    /// The number of operand bytes that follow this instruction
    /// in a chunk.
    pub fn operand_width(&self) -> usize {
        match self {
            OpCode::OP_CALL
            | OpCode::OP_CLASS
            | OpCode::OP_CONSTANT
            | OpCode::OP_DEFINE_GLOBAL
            | OpCode::OP_GET_GLOBAL
            | OpCode::OP_GET_LOCAL
            | OpCode::OP_GET_PROPERTY
            | OpCode::OP_SET_GLOBAL
            | OpCode::OP_SET_LOCAL
            | OpCode::OP_SET_PROPERTY => 1,

            OpCode::OP_JUMP | OpCode::OP_JUMP_IF_FALSE | OpCode::OP_LOOP => 2,

            _ => 0,
        }
    }
}
