//! Macro for implementing Display and FromStr for fieldless enums
//!
//! Used for HTTP methods and error kinds, which are both rendered as fixed
//! tokens and parsed back case-insensitively (from env vars, config files or
//! log filters).
//!
//! # Example
//!
//! ```rust
//! use tollgate_domain::impl_enum_str_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Scheme {
//!     Http,
//!     Https,
//! }
//!
//! impl_enum_str_conversions!(Scheme {
//!     Http => "http",
//!     Https => "https",
//! });
//!
//! assert_eq!(Scheme::Https.to_string(), "https");
//! assert_eq!("HTTP".parse::<Scheme>(), Ok(Scheme::Http));
//! ```

/// Implements Display and FromStr for a fieldless enum
///
/// - Display writes the token exactly as given
/// - FromStr matches tokens ASCII case-insensitively
#[macro_export]
macro_rules! impl_enum_str_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// The canonical token for this variant
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                $(if s.eq_ignore_ascii_case($str) {
                    return Ok(Self::$variant);
                })+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Verb {
        Fetch,
        Store,
    }

    impl_enum_str_conversions!(Verb {
        Fetch => "FETCH",
        Store => "STORE",
    });

    #[test]
    fn test_display_uses_token_verbatim() {
        assert_eq!(Verb::Fetch.to_string(), "FETCH");
        assert_eq!(Verb::Store.as_str(), "STORE");
    }

    #[test]
    fn test_fromstr_is_case_insensitive() {
        assert_eq!(Verb::from_str("fetch").unwrap(), Verb::Fetch);
        assert_eq!(Verb::from_str("StOrE").unwrap(), Verb::Store);
    }

    mod with_result_alias {
        use std::str::FromStr;

        // A single-parameter alias in scope must not leak into the expansion.
        #[allow(dead_code)]
        type Result<T> = std::result::Result<T, String>;

        #[derive(Debug, PartialEq, Eq)]
        enum Scheme {
            Http,
        }

        impl_enum_str_conversions!(Scheme {
            Http => "http",
        });

        #[test]
        fn test_fromstr_ignores_local_result_alias() {
            assert_eq!(Scheme::from_str("HTTP"), Ok(Scheme::Http));
        }
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = Verb::from_str("delete");
        assert!(result.unwrap_err().contains("Invalid Verb: delete"));
        assert!(Verb::from_str("").is_err());
    }
}
