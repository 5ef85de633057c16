//! Typed row ids.
//!
//! Every table keys on a Postgres `SERIAL`, so each id wraps an `i32`. Separate
//! types keep a `CartItemId` from being passed where a `ProductId` is expected,
//! which matters for routes like `/api/carts/{cid}/products/{pid}`.

/// Define an `i32`-backed id type.
///
/// The generated type serializes as a bare number, displays as one, and maps
/// to `INTEGER` when the `postgres` feature is enabled.
///
/// ```rust
/// # use riffhouse_core::define_id;
/// define_id!(PickId);
/// define_id!(StringSetId);
///
/// let pick = PickId::new(3);
/// assert_eq!(pick.as_i32(), 3);
/// // let _: StringSetId = pick; // does not compile
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(ReceiptId);
