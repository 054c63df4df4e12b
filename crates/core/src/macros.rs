// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared by the boardlab crates.
//!
//! - [`simple_display!`] - `Display` impl mapping enum variants to wire strings
//! - [`setters!`] - chained setter methods for option/config structs

/// Generate a `Display` impl that maps enum variants to string literals.
///
/// The literals are the same strings the enum serializes to, so log lines and
/// notifications agree with each other.
///
/// ```ignore
/// boardlab_core::simple_display! {
///     SessionStatus {
///         Idle => "idle",
///         Paused(..) => "paused",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident $(( $($ignore:tt)* ))? => $str:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    $( Self::$variant $(( $($ignore)* ))? => $str, )+
                })
            }
        }
    };
}

/// Generate chained setter methods inside an existing `impl` block.
///
/// - `into { field: Type }` - setter takes `impl Into<Type>`
/// - `set { field: Type }` - setter takes `Type` directly
/// - `option { field: Type }` - field is `Option<Type>`, setter wraps in `Some`
///
/// ```ignore
/// impl ExternalClientOptions {
///     boardlab_core::setters! {
///         set { auto_start: bool }
///         option { baudrate: String }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(into {
            $( $into_field:ident : $into_ty:ty ),* $(,)?
        })?
        $(set {
            $( $set_field:ident : $set_ty:ty ),* $(,)?
        })?
        $(option {
            $( $opt_field:ident : $opt_ty:ty ),* $(,)?
        })?
    ) => {
        $($(
            pub fn $into_field(mut self, v: impl Into<$into_ty>) -> Self {
                self.$into_field = v.into();
                self
            }
        )*)?

        $($(
            pub fn $set_field(mut self, v: $set_ty) -> Self {
                self.$set_field = v;
                self
            }
        )*)?

        $($(
            pub fn $opt_field(mut self, v: impl Into<$opt_ty>) -> Self {
                self.$opt_field = Some(v.into());
                self
            }
        )*)?
    };
}
