//! Sequential, human-readable invoice numbers.
//!
//! Format: `INV-<year>-<zero-padded 2-digit month>-<zero-padded 4-digit
//! sequence>`. Sequences are scoped to a year+month bucket and allocated by
//! the billing core through a serialized allocator; this module only owns the
//! value representation.

use core::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use hostcrm_core::DomainError;

/// Year+month bucket an invoice number sequence is scoped to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NumberBucket {
    pub year: i32,
    pub month: u32,
}

impl NumberBucket {
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!(
                "invoice number month out of range: {month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Bucket for the issue timestamp of an invoice.
    pub fn for_timestamp(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    /// Number prefix shared by every invoice in this bucket, trailing dash
    /// included (e.g. `INV-2026-08-`).
    pub fn prefix(&self) -> String {
        format!("INV-{:04}-{:02}-", self.year, self.month)
    }
}

/// A parsed invoice number.
///
/// Ordering follows (year, month, sequence), so `max` over a bucket's numbers
/// yields the latest allocation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct InvoiceNumber {
    bucket: NumberBucket,
    sequence: u32,
}

impl InvoiceNumber {
    pub fn new(bucket: NumberBucket, sequence: u32) -> Result<Self, DomainError> {
        if sequence == 0 {
            return Err(DomainError::validation(
                "invoice number sequence starts at 1",
            ));
        }
        Ok(Self { bucket, sequence })
    }

    pub fn bucket(&self) -> NumberBucket {
        self.bucket
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The next number in the same bucket.
    pub fn successor(&self) -> Self {
        Self {
            bucket: self.bucket,
            sequence: self.sequence + 1,
        }
    }
}

impl core::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Sequence pads to 4 digits and simply widens past 9999.
        write!(f, "{}{:04}", self.bucket.prefix(), self.sequence)
    }
}

impl From<InvoiceNumber> for String {
    fn from(value: InvoiceNumber) -> Self {
        value.to_string()
    }
}

impl FromStr for InvoiceNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("INV-")
            .ok_or_else(|| DomainError::invalid_id(format!("invoice number: {s}")))?;

        let mut parts = rest.splitn(3, '-');
        let (year, month, seq) = match (parts.next(), parts.next(), parts.next()) {
            (Some(y), Some(m), Some(q)) => (y, m, q),
            _ => return Err(DomainError::invalid_id(format!("invoice number: {s}"))),
        };

        let year: i32 = year
            .parse()
            .map_err(|_| DomainError::invalid_id(format!("invoice number year: {s}")))?;
        let month: u32 = month
            .parse()
            .map_err(|_| DomainError::invalid_id(format!("invoice number month: {s}")))?;
        let sequence: u32 = seq
            .parse()
            .map_err(|_| DomainError::invalid_id(format!("invoice number sequence: {s}")))?;

        Self::new(NumberBucket::new(year, month)?, sequence)
    }
}

impl TryFrom<String> for InvoiceNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
