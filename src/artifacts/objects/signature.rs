//! Author and committer identity records
//!
//! A signature is kept as the raw bytes found after `author ` / `committer `
//! so that re-encoding a commit reproduces it exactly. Fields are extracted on
//! demand from the grammar:
//!
//! ```text
//! <name> <<email>> <timestamp>[ <+hhmm|-hhmm>]
//! ```
//!
//! A record that does not match is corrupt data, reported as
//! [`RewriteError::MalformedRecord`].

use crate::error::RewriteError;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use regex::bytes::{Captures, Regex};
use std::sync::LazyLock;

// Verbose mode drops whitespace even inside classes, so spaces are `\x20`
const SIGNATURE_PATTERN: &str = r"(?x-u)
    ^(?P<name>[^<>]+)<(?P<email>[^<>]+)>\x20
    (?P<timestamp>[0-9]+)
    (?:\x20(?P<offset>[+\-][0-9]+))?$";

static SIGNATURE_REGEX: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(SIGNATURE_PATTERN));

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(Bytes);

impl Signature {
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Signature(raw.into())
    }

    /// Build a record for `name <email>` stamped with the current local time
    pub fn now(name: &str, email: &str) -> Self {
        let now = chrono::Local::now().fixed_offset();
        Signature::new(format!(
            "{} <{}> {} {}",
            name,
            email,
            now.timestamp(),
            now.format("%z")
        ))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn name(&self) -> anyhow::Result<&[u8]> {
        let captures = self.captures()?;
        Ok(self.group(&captures, "name").trim_ascii())
    }

    pub fn email(&self) -> anyhow::Result<&[u8]> {
        let captures = self.captures()?;
        Ok(self.group(&captures, "email").trim_ascii())
    }

    /// Seconds since the unix epoch
    pub fn timestamp(&self) -> anyhow::Result<i64> {
        let captures = self.captures()?;
        let digits = std::str::from_utf8(self.group(&captures, "timestamp"))?;

        digits
            .parse::<i64>()
            .map_err(|e| RewriteError::malformed("signature", format!("timestamp: {e}")).into())
    }

    /// UTC offset as written (`+0200`), absent when the record omits it
    pub fn offset(&self) -> anyhow::Result<Option<&[u8]>> {
        let captures = self.captures()?;
        Ok(captures
            .name("offset")
            .map(|offset| &self.0[offset.start()..offset.end()]))
    }

    /// Timestamp and offset combined; a missing offset is taken as UTC
    pub fn when(&self) -> anyhow::Result<DateTime<FixedOffset>> {
        let offset = match self.offset()? {
            Some(raw) => parse_offset(raw)?,
            None => Utc.fix(),
        };
        let utc = DateTime::from_timestamp(self.timestamp()?, 0)
            .ok_or_else(|| RewriteError::malformed("signature", "timestamp out of range"))?;

        Ok(utc.with_timezone(&offset))
    }

    fn captures(&self) -> anyhow::Result<Captures<'_>> {
        let regex = SIGNATURE_REGEX
            .as_ref()
            .map_err(|e| anyhow::anyhow!("invalid signature regex: {e}"))?;

        regex.captures(&self.0).ok_or_else(|| {
            RewriteError::malformed("signature", String::from_utf8_lossy(&self.0)).into()
        })
    }

    fn group<'s>(&'s self, captures: &Captures<'s>, name: &str) -> &'s [u8] {
        captures
            .name(name)
            .map(|group| group.as_bytes())
            .unwrap_or_default()
    }
}

fn parse_offset(raw: &[u8]) -> anyhow::Result<FixedOffset> {
    let text = std::str::from_utf8(raw)?;
    let (sign, digits) = text.split_at(1);
    if digits.len() != 4 {
        return Err(RewriteError::malformed("signature", format!("offset {text}")).into());
    }

    let hours: i32 = digits[..2].parse()?;
    let minutes: i32 = digits[2..].parse()?;
    let seconds = (hours * 3600 + minutes * 60) * if sign == "-" { -1 } else { 1 };

    FixedOffset::east_opt(seconds)
        .ok_or_else(|| RewriteError::malformed("signature", format!("offset {text}")).into())
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", String::from_utf8_lossy(&self.0))
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn pattern_compiles() {
        assert!(SIGNATURE_REGEX.is_ok());
    }

    #[test]
    fn fields_are_extracted_from_a_full_record() {
        let signature = Signature::new("Jane Doe <jane@example.com> 1700000000 +0130");

        assert_eq!(signature.name().unwrap(), b"Jane Doe");
        assert_eq!(signature.email().unwrap(), b"jane@example.com");
        assert_eq!(signature.timestamp().unwrap(), 1_700_000_000);
        assert_eq!(signature.offset().unwrap(), Some(&b"+0130"[..]));
        assert_eq!(
            signature.when().unwrap().offset().local_minus_utc(),
            90 * 60
        );
    }

    #[test]
    fn offset_is_optional() {
        let signature = Signature::new("Jane <jane@example.com> 42");

        assert_eq!(signature.offset().unwrap(), None);
        assert_eq!(signature.when().unwrap().timestamp(), 42);
    }

    #[rstest]
    #[case("Jane jane@example.com 42")]
    #[case("<jane@example.com> 42")]
    #[case("Jane <jane@example.com>")]
    #[case("Jane <jane@example.com> soon")]
    #[case("Jane <jane@example.com> 42 0100")]
    fn malformed_records_fail_on_access(#[case] raw: &str) {
        let signature = Signature::new(raw.to_string());
        let error = signature.name().unwrap_err();

        assert!(matches!(
            error.downcast_ref::<RewriteError>(),
            Some(RewriteError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn generated_record_matches_the_grammar() {
        let signature = Signature::now("Revise Bot", "bot@example.com");

        assert_eq!(signature.name().unwrap(), b"Revise Bot");
        assert!(signature.offset().unwrap().is_some());
    }
}
