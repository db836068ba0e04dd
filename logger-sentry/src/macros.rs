// Logging macros

/// Logs an enriched error at error level with the fields that carry its
/// identity (`stack_id`, `name`, `stack`), plus any extra `tracing` fields.
///
/// ```rust,ignore
/// log_enriched!(error, tags.tenant = "acme", attempt = 3);
/// ```
#[macro_export]
macro_rules! log_enriched {
    ($error:expr $(, $($field:tt)+)?) => {{
        let error: &$crate::EnrichedError = &$error;
        $crate::tracing::error!(
            stack_id = %error.stack_id(),
            name = %error.name(),
            stack = %error.stack(),
            $($($field)+ ,)?
            "{}",
            error
        )
    }};
}
