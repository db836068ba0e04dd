// Well-known names and keys shared by the error type and its consumers

/// Name given to an enriched error when no variant name is supplied.
pub const DEFAULT_ERROR_NAME: &str = "EnrichedError";

/// Marker that opens the stack id suffix of a displayed message.
pub const STACK_ID_MARKER: &str = " (stackId:";

/// Detail keys that take part in identity and stack propagation.
pub mod keys {
    pub const STACK_ID: &str = "stackId";
    pub const STACK: &str = "stack";
}
