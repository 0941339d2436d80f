//! Operation lifecycle macros
//!
//! Every operation logs a start event, then exactly one end or end-error
//! event carrying `duration_ms`. Callers must depend on
//! `snapwatch-core-types`, whose schema constants the expansions name.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $op:expr, $event:ident $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = snapwatch_core_types::schema::$event,
            $($($field)*)?
        );
    };
}

/// Start of an operation
///
/// ```
/// # use snapwatch_core::log_op_start;
/// log_op_start!("claim_captures");
/// log_op_start!("claim_captures", capture_id = 42);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(info, $op, EVENT_START $(, $($field)*)?)
    };
}

/// Successful end of an operation; `duration_ms` comes first
///
/// ```
/// # use snapwatch_core::log_op_end;
/// log_op_end!("fan_out", duration_ms = 3, comparators = 2);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info,
            $op,
            EVENT_END,
            duration_ms = $duration,
            $($($field)*)?
        )
    };
}

/// Failed end of an operation
///
/// `$err` is converted into `ExError`, so the stable code and kind are
/// always present on the event.
///
/// ```
/// # use snapwatch_core::log_op_error;
/// # use snapwatch_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::NotFound);
/// log_op_error!("claim_captures", err, duration_ms = 10, capture_id = 99);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error,
            $op,
            EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            err.message = ex_err.message(),
            $($($field)*)?
        )
    }};
}
