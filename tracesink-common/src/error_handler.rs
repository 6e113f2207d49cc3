// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process-wide error hook for failures that have no caller to bubble up to.
//!
//! Background flush paths run detached from the code that configured the
//! exporter, so their errors are handed to a single global handler instead of
//! being swallowed. The default handler logs the error; embedders can install
//! their own with [`set_error_handler`].

use std::error::Error;
use std::sync::{OnceLock, RwLock};
use tracing::error;

type ErrorHandler = Box<dyn Fn(&(dyn Error + 'static)) + Send + Sync>;

fn handler_slot() -> &'static RwLock<Option<ErrorHandler>> {
    static HANDLER: OnceLock<RwLock<Option<ErrorHandler>>> = OnceLock::new();
    HANDLER.get_or_init(|| RwLock::new(None))
}

/// Install the global error handler, replacing any previous one.
pub fn set_error_handler<F>(handler: F)
where
    F: Fn(&(dyn Error + 'static)) + Send + Sync + 'static,
{
    let mut slot = match handler_slot().write() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    };
    *slot = Some(Box::new(handler));
}

/// Forward an error to the global handler.
///
/// Falls back to logging through `tracing` when no handler is installed.
pub fn handle_error(err: &(dyn Error + 'static)) {
    let slot = match handler_slot().read() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    };
    match slot.as_ref() {
        Some(handler) => handler(err),
        None => error!(error = %err, "Unhandled exporter error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError;

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test error")
        }
    }

    impl Error for TestError {}

    #[test]
    fn test_installed_handler_receives_errors() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        set_error_handler(move |err| {
            assert_eq!(err.to_string(), "test error");
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        handle_error(&TestError);
        handle_error(&TestError);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
