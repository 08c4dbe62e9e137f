// Build an std::io::Error from an ErrorKind shorthand plus an optional
// format string, e.g. ioerr!(InvalidData, "{}: bad version {}", name, v).
#[doc(hidden)]
#[macro_export]
macro_rules! ioerr {
    (@E $kind:expr, $arg:expr) => {
        ::std::io::Error::new($kind, $arg)
    };

    (NotFound $($tt:tt)*) => ( ioerr!(::std::io::ErrorKind::NotFound $($tt)*) );
    (PermissionDenied $($tt:tt)*) => ( ioerr!(::std::io::ErrorKind::PermissionDenied $($tt)*) );
    (InvalidInput $($tt:tt)*) => ( ioerr!(::std::io::ErrorKind::InvalidInput $($tt)*) );
    (InvalidData $($tt:tt)*) => ( ioerr!(::std::io::ErrorKind::InvalidData $($tt)*) );
    (Other $($tt:tt)*) => ( ioerr!(::std::io::ErrorKind::Other $($tt)*) );
    (UnexpectedEof $($tt:tt)*) => ( ioerr!(::std::io::ErrorKind::UnexpectedEof $($tt)*) );

    ($kind:expr, $fmt:expr, $($tt:tt)+) => (
        ioerr!(@E $kind, format!($fmt, $($tt)+))
    );
    ($kind:expr, $arg:expr) => (
        ioerr!(@E $kind, $arg)
    );
    ($kind:expr) => (
        ::std::io::Error::from($kind)
    );
}
