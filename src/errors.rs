/// A compile-time error, carrying the message to display and the source
/// line it was raised on. Compile errors unwind to the nearest statement
/// boundary, where the compiler reports them and synchronizes.
pub struct CompileError {
    pub message: String,
    pub line: usize,
}

/// The types of errors the interpreter can raise while running a chunk.
pub enum RuntimeErrorType {
    ArgumentError,
    ReferenceError,
    TypeError,
    ZeroDivision,
}

impl RuntimeErrorType {
    /// The user-facing name of this error type.
    pub fn error_name(&self) -> &'static str {
        match self {
            RuntimeErrorType::ArgumentError => "ArgumentError",
            RuntimeErrorType::ReferenceError => "ReferenceError",
            RuntimeErrorType::TypeError => "TypeError",
            RuntimeErrorType::ZeroDivision => "ZeroDivisionError",
        }
    }
}

/// Reports a compile error to the console.
pub fn report_compile_error(error: &CompileError) {
    eprintln!(
        "\x1b[31;1mSyntaxError\x1b[0m [Line {}] – {}",
        error.line, error.message
    );
}

/// Reports a runtime error to the console.
///
/// ## Arguments
/// * `error` – The type of the generated error.
/// * `message` – The error message to be displayed.
/// * `line` – The source line of the failing instruction, recovered
/// from the chunk's line table.
pub fn report_runtime_error(error: &RuntimeErrorType, message: &str, line: usize) {
    eprintln!(
        "\x1b[31;1m{}:\x1b[0m\x1b[1m {}\x1b[0m [Line {}]",
        error.error_name(),
        message,
        line
    );
}
