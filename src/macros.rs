///
/// Aborts the simulation on a violated invariant.
///
/// The diagnostic is emitted through the `log` facade first, so that
/// installed loggers record it, and then raised as a panic with
/// the same message.
///
macro_rules! fatal {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
        panic!($($arg)*)
    }};
}
