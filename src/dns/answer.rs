//! Parsing of HTTP DNS answer bodies.
//!
//! The service replies with a bare dotted-decimal IPv4 address. The shape
//! check is intentionally loose: four groups of one to three ASCII digits.
//! Octets above 255 pass the shape check and are then rejected when the
//! address is parsed.

use std::net::{IpAddr, Ipv4Addr};

/// Why an answer body was not usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
    /// Body is not four dot-separated groups of 1-3 digits.
    Shape,
    /// Shape is right but the value is not an IPv4 address (octet > 255).
    Address,
}

/// True if `body` is exactly `d{1,3}.d{1,3}.d{1,3}.d{1,3}`.
///
/// No trimming is done; surrounding whitespace fails the check.
pub fn is_dotted_decimal(body: &[u8]) -> bool {
    let mut groups = 0usize;
    let mut digits = 0usize;

    for &b in body {
        match b {
            b'0'..=b'9' => {
                digits += 1;
                if digits > 3 {
                    return false;
                }
            }
            b'.' => {
                if digits == 0 {
                    return false;
                }
                groups += 1;
                if groups > 3 {
                    return false;
                }
                digits = 0;
            }
            _ => return false,
        }
    }

    groups == 3 && digits > 0
}

/// Parses an answer body into resolved addresses.
pub fn parse_answer(body: &[u8]) -> Result<Vec<IpAddr>, AnswerError> {
    if !is_dotted_decimal(body) {
        return Err(AnswerError::Shape);
    }

    let mut octets = [0u8; 4];
    for (slot, group) in octets.iter_mut().zip(body.split(|&b| b == b'.')) {
        let value = group
            .iter()
            .fold(0u16, |acc, &d| acc * 10 + u16::from(d - b'0'));
        *slot = u8::try_from(value).map_err(|_| AnswerError::Address)?;
    }

    Ok(vec![IpAddr::V4(Ipv4Addr::from(octets))])
}
