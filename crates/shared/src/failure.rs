use core::fmt::Display;

use tracing::{error, warn};

fn log_and_panic<Err: Display>(error: Err, message: &str) -> ! {
    error!("{message}: {error}");

    panic!("{message}: {error}");
}

/// Extension trait for results.
pub trait Failure<T> {
    /// Log an error and panic.
    fn or_log_and_panic(self, message: &str) -> T;

    /// Log the error as a warning and carry on without the value.
    ///
    /// For steps whose failure must be visible but must not stop the caller.
    fn or_warn(self, message: &str) -> Option<T>;
}

impl<T, E: Display> Failure<T> for Result<T, E> {
    fn or_log_and_panic(self, message: &str) -> T {
        match self {
            Ok(value) => value,
            Err(error) => log_and_panic(error, message),
        }
    }

    fn or_warn(self, message: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                warn!("{message}: {error}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::Failure;
    use crate::test::init_test_logger;

    #[test]
    fn or_warn_discards_error() {
        init_test_logger();

        let result: Result<u8, io::Error> = Err(io::Error::other("service unavailable"));
        assert_eq!(result.or_warn("Could not stop poller"), None);
    }
}
