use num_traits::FromPrimitive;

use crate::memory::GarbageCollector;
use crate::objects::Value;

// Submodules
pub mod op_codes;

use op_codes::OpCode;

/// The result of storing a constant value into the constant pool.
pub enum ConstantPos {
    Pos(u8),
    Error,
}

/// Contains all the necessary information about the instructions
/// to be executed: the bytecode itself, the literal constants found
/// in the compiled program, and the line each byte originated from.
#[derive(Default)]
pub struct Chunk {
    /// The raw bytecode instruction stream.
    codes: Vec<u8>,
    /// The literal constant values found in this chunk of code.
    constants: Vec<Value>,
    /// Run-length encoded line information: `(line, run_length)`
    /// pairs, one run per group of consecutive bytes that share a
    /// source line. Only decoded when reporting runtime errors.
    lines: Vec<(usize, usize)>,
}

impl Chunk {
    /// Creates a new chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw byte to the chunk's instruction stream.
    ///
    /// ## Arguments
    /// * `byte` – The byte to be appended.
    /// * `line` – The source line the byte originated from. Lines are
    /// assumed to be non-decreasing across appends.
    pub fn write_byte(&mut self, byte: u8, line: usize) {
        self.codes.push(byte);
        self.write_line(line);
    }

    /// Appends an instruction to the chunk's instruction stream.
    pub fn write_op_code(&mut self, code: OpCode, line: usize) {
        self.write_byte(code as u8, line);
    }

    /// Overwrites a previously written byte. Used when back-patching
    /// jump offsets.
    pub fn modify_byte(&mut self, offset: usize, byte: u8) {
        self.codes[offset] = byte;
    }

    /// Gets the raw byte at the given offset.
    pub fn get_byte(&self, offset: usize) -> u8 {
        self.codes[offset]
    }

    /// Decodes the byte at the given offset as an instruction.
    pub fn get_op_code(&self, offset: usize) -> OpCode {
        match OpCode::from_u8(self.codes[offset]) {
            Some(code) => code,
            None => unreachable!("Invalid instruction byte '{}'.", self.codes[offset]),
        }
    }

    /// Decodes the two bytes starting at the given offset as a
    /// big-endian unsigned short.
    pub fn get_short(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.codes[offset], self.codes[offset + 1]])
    }

    /// Gets the number of bytes in the chunk's instruction stream.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Checks whether the chunk holds any instructions at all.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Adds a constant to this chunk's constants pool.
    ///
    /// Equal values are stored only once; adding a value that is already
    /// present yields the position of the existing entry. Because constant
    /// indices are encoded in a single operand byte, the pool can hold at
    /// most 256 entries.
    ///
    /// ## Arguments
    /// * `value` – The value to be added to the pool.
    /// * `gc` – The collector that owns any heap objects referenced by
    /// the pool, needed to compare object contents.
    ///
    /// ## Returns
    /// * `ConstantPos` – The position of the value in the pool, or
    /// `ConstantPos::Error` if the pool is full.
    pub fn add_constant(&mut self, value: Value, gc: &GarbageCollector) -> ConstantPos {
        if let Some(idx) = self.constants.iter().position(|c| c.equals(&value, gc)) {
            return ConstantPos::Pos(idx as u8);
        }

        if self.constants.len() < 256 {
            self.constants.push(value);
            ConstantPos::Pos((self.constants.len() - 1) as u8)
        } else {
            ConstantPos::Error
        }
    }

    /// Looks for a string constant with the given contents in the pool.
    ///
    /// ## Returns
    /// `Option<u8>` – The position of the matching entry, if any.
    pub fn find_string_constant(&self, text: &str, gc: &GarbageCollector) -> Option<u8> {
        self.constants
            .iter()
            .position(|c| match c {
                Value::Obj(id) => match gc.get(id).obj.as_str_obj() {
                    Some(s) => s.text == text,
                    None => false,
                },
                _ => false,
            })
            .map(|idx| idx as u8)
    }

    /// Retrieves a constant from this chunk's constants pool.
    pub fn get_constant(&self, idx: usize) -> &Value {
        &self.constants[idx]
    }

    /// Gets the size of the constant pool for this chunk.
    pub fn get_pool_size(&self) -> usize {
        self.constants.len()
    }

    /// The constants stored in this chunk's pool. The collector traces
    /// these when marking a function object.
    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Records the source line for the byte that was just appended.
    /// A new `(line, run)` pair is started whenever the line changes;
    /// otherwise the current run length is incremented.
    fn write_line(&mut self, line: usize) {
        match self.lines.last_mut() {
            Some(run) if run.0 == line => run.1 += 1,
            _ => self.lines.push((line, 1)),
        }
    }

    /// Finds the source line for the byte at the given offset by
    /// walking the run-length encoded line table. Linear time, which is
    /// fine because it only runs when an error is being reported.
    pub fn get_line(&self, offset: usize) -> usize {
        let mut covered = 0usize;

        for (line, run) in self.lines.iter() {
            covered += run;

            if offset < covered {
                return *line;
            }
        }

        // Offsets past the end belong to the last recorded line.
        self.lines.last().map(|run| run.0).unwrap_or(0)
    }

    /// Disassembles the chunk into a human-readable instruction listing.
    ///
    /// ## Arguments
    /// * `name` – the name to print for the current chunk
    /// * `gc` – the collector that owns the pool's heap objects
    pub fn disassemble(&self, name: &str, gc: &GarbageCollector) -> String {
        let mut out = format!("==== {} ====\n", name);
        let mut offset = 0;
        let mut current_line = 0;

        while offset < self.codes.len() {
            let instr = self.get_op_code(offset);
            let line = self.get_line(offset);

            out.push_str(&format!("{:>04} ", offset));

            // Prints a line number, or a vertical bar indicating that the
            // current instruction is in the same line as the previous one.
            if line > current_line {
                out.push_str(&format!("{:>03} ", line));
                current_line = line;
            } else {
                out.push_str(" |  ");
            }

            out.push_str(&format!("{:?}", instr));

            match instr.operand_width() {
                1 => {
                    let operand = self.get_byte(offset + 1);

                    if let OpCode::OP_CALL | OpCode::OP_GET_LOCAL | OpCode::OP_SET_LOCAL = instr {
                        out.push_str(&format!("\t{}", operand));
                    } else {
                        let constant = self.get_constant(operand as usize);
                        out.push_str(&format!("\t{} ({})", operand, constant.display_plain(gc)));
                    }
                }
                2 => {
                    let jump = self.get_short(offset + 1) as usize;

                    let target = if let OpCode::OP_LOOP = instr {
                        offset + 3 - jump - 1
                    } else {
                        offset + 3 + jump
                    };

                    out.push_str(&format!("\t---> {:>04}", target));
                }
                _ => {}
            }

            out.push('\n');
            offset += 1 + instr.operand_width();
        }

        out
    }
}
