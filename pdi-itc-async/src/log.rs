//! Forwards to `defmt` or `log`, depending on which feature is enabled. With neither enabled the
//! macros compile to nothing.

macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);

        #[cfg(feature = "log")]
        ::log::debug!($($arg)*);
    };
}

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::trace!($($arg)*);

        #[cfg(feature = "log")]
        ::log::trace!($($arg)*);
    };
}

macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);

        #[cfg(feature = "log")]
        ::log::warn!($($arg)*);
    };
}

macro_rules! debug_assert_eq {
    ($left:expr, $right:expr, $message:literal) => {
        #[cfg(feature = "defmt")]
        defmt::debug_assert_eq!($left, $right, $message);

        #[cfg(not(feature = "defmt"))]
        core::debug_assert_eq!($left, $right, $message);
    };
}

pub(crate) use {debug, debug_assert_eq, trace, warn_log};
