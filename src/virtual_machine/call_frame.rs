use crate::objects::GcId;

/// Represents a single ongoing function invocation.
pub struct CallFrame {
    /// Handle to the function object being executed.
    pub function: GcId,
    /// The offset of the next instruction byte in the function's chunk.
    pub ip: usize,
    /// The value-stack index where this frame's locals begin. Local
    /// instructions index the stack relative to this base.
    pub base: usize,
}
