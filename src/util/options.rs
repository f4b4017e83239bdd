//! Runtime options.
//!
//! Each option has a type, a validator and a default.  Options can be set by name with
//! [`Options::set_from_str`], or through environment variables: `GCSTATE_<NAME>` (for example
//! `GCSTATE_CONCURRENT_ROOT_SCANNING=false`) is applied by [`Options::default`].

use std::default::Default;

/// The prefix of environment variables that set options.
pub const ENV_PREFIX: &str = "GCSTATE_";

fn always_valid<T>(_: &T) -> bool {
    true
}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Options that change how roots are visited.  See the module documentation.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }
        impl Options {
            /// Set an option by its snake_case name.  Returns false (and keeps the old value) if
            /// the name is unknown, the value cannot be parsed, or the validator rejects it.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by calling process()) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => {
                        warn!("Unknown option {}={:?}", s, val);
                        false
                    }
                }
            }

            /// Options with their default values, ignoring environment variables.
            pub fn without_env() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::without_env();

                // If we have env vars that start with GCSTATE_ and match any option (such as GCSTATE_CHECK_ROOT_ALIGNMENT),
                // we set the option to its value (if it is a valid value). Otherwise, use the default value.
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(ENV_PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    /// Scan concurrent roots in a separate pass that may run alongside mutators.  When false,
    /// concurrent roots are scanned in the stop-the-world pass instead.
    concurrent_root_scanning: bool [always_valid] = true,
    /// Assert that the referent of every visited strong root is aligned like an object reference.
    check_root_alignment:     bool [always_valid] = cfg!(debug_assertions),
    /// Log every visited root at trace level.
    verbose_root_logging:     bool [always_valid] = false,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_util::{serial_test, with_cleanup};

    #[test]
    fn no_env_var() {
        serial_test(|| {
            let options = Options::default();
            assert!(options.concurrent_root_scanning);
            assert!(!options.verbose_root_logging);
        })
    }

    #[test]
    fn with_valid_env_var() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("GCSTATE_CONCURRENT_ROOT_SCANNING", "false");
                    let options = Options::default();
                    assert!(!options.concurrent_root_scanning);
                },
                || std::env::remove_var("GCSTATE_CONCURRENT_ROOT_SCANNING"),
            )
        })
    }

    #[test]
    fn with_invalid_env_var_value() {
        serial_test(|| {
            with_cleanup(
                || {
                    std::env::set_var("GCSTATE_VERBOSE_ROOT_LOGGING", "maybe");
                    let options = Options::default();
                    // invalid value from env var, use default.
                    assert!(!options.verbose_root_logging);
                },
                || std::env::remove_var("GCSTATE_VERBOSE_ROOT_LOGGING"),
            )
        })
    }

    #[test]
    fn set_from_str() {
        let mut options = Options::without_env();
        assert!(options.set_from_str("check_root_alignment", "true"));
        assert!(options.check_root_alignment);
        assert!(!options.set_from_str("check_root_alignment", "1"));
        assert!(options.check_root_alignment);
        assert!(!options.set_from_str("no_such_option", "true"));
    }
}
