//! ---
//! mth_section: "03-reporting-logging"
//! mth_subsection: "module"
//! mth_type: "source"
//! mth_scope: "code"
//! mth_description: "Structured logging adapters for scenario lifecycle events."
//! mth_version: "v0.1.0"
//! mth_owner: "tbd"
//! ---

/// Shared expansion for the level-specific macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! __mth_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            $level,
            module = ctx.module.unwrap_or(""),
            scenario = ctx.scenario.unwrap_or(""),
            stage = ctx.stage.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with harness context.
#[macro_export]
macro_rules! mth_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__mth_event!(tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__mth_event!(tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with harness context.
#[macro_export]
macro_rules! mth_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__mth_event!(tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__mth_event!(tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning log enriched with harness context.
#[macro_export]
macro_rules! mth_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__mth_event!(tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__mth_event!(tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with harness context.
#[macro_export]
macro_rules! mth_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__mth_event!(tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__mth_event!(tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
