//! Human-facing purchase receipt codes.

use core::fmt;

use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};

/// Unique code printed on a purchase receipt, e.g. `RH-MB3K9Z1Q-7GQ2XK4LPA`.
///
/// Format: `RH-` + issue time in base-36 milliseconds + `-` + ten random
/// uppercase alphanumerics. The timestamp keeps codes roughly sortable; the
/// random suffix keeps codes issued in the same millisecond apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptCode(String);

impl ReceiptCode {
    /// Prefix shared by every code.
    pub const PREFIX: &'static str = "RH-";

    const RANDOM_LEN: usize = 10;

    /// Generate a fresh code for a receipt issued at `issued_at`.
    #[must_use]
    pub fn generate<R: Rng>(issued_at: DateTime<Utc>, rng: &mut R) -> Self {
        let millis = u64::try_from(issued_at.timestamp_millis()).unwrap_or_default();
        let suffix: String = (0..Self::RANDOM_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_uppercase())
            .collect();
        Self(format!("{}{}-{suffix}", Self::PREFIX, to_base36(millis)))
    }

    /// Wrap a code read back from storage or a URL.
    ///
    /// Returns `None` when the input does not look like a receipt code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix(Self::PREFIX)?;
        let (stamp, suffix) = rest.split_once('-')?;
        let valid = !stamp.is_empty()
            && suffix.len() == Self::RANDOM_LEN
            && stamp
                .chars()
                .chain(suffix.chars())
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase());
        valid.then(|| Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn to_base36(mut n: u64) -> String {
    let mut digits = Vec::new();
    loop {
        let digit = u32::try_from(n % 36)
            .ok()
            .and_then(|d| char::from_digit(d, 36))
            .unwrap_or('0');
        digits.push(digit.to_ascii_uppercase());
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

impl fmt::Display for ReceiptCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReceiptCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ReceiptCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ReceiptCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ReceiptCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_generated_code_parses() {
        let code = ReceiptCode::generate(Utc::now(), &mut rand::rng());
        assert!(code.as_str().starts_with(ReceiptCode::PREFIX));
        assert_eq!(ReceiptCode::parse(code.as_str()), Some(code));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(ReceiptCode::parse("not-a-code"), None);
        assert_eq!(ReceiptCode::parse("RH-ABC-short"), None);
        assert_eq!(ReceiptCode::parse("RH--ABCDEFGHIJ"), None);
    }

    #[test]
    fn test_ten_thousand_codes_are_unique() {
        let now = Utc::now();
        let mut rng = rand::rng();
        let codes: HashSet<ReceiptCode> = (0..10_000)
            .map(|_| ReceiptCode::generate(now, &mut rng))
            .collect();
        assert_eq!(codes.len(), 10_000);
    }
}
