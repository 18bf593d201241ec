use core::fmt::Display;

/// Holds the context for the current operation. Used for prefixing logs.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    /// The operation being run.
    pub operation: &'static str,
    /// The current step of the operation.
    pub current_context: &'static str,
}

impl Context {
    /// Context for a new operation, before its first step.
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            current_context: "Start",
        }
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}] [{}] ", self.operation, self.current_context)
    }
}
