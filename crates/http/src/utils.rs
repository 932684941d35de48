//! Internal helper macros shared by the parsers and producers.

/// Returns early with `Err($error)` when `$predicate` does not hold.
///
/// Works like `assert!` but for validation paths that must report a typed
/// error instead of panicking.
///
/// ```ignore
/// ensure!(self.headers.len() < self.max_headers, ParseError::too_many_headers(self.max_headers));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
