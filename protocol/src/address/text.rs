//! Bech32 text form shared by addresses and key material.
//!
//! The `bech32` crate owns the charset, HRP validation and checksum. The
//! 5-bit to 8-bit regrouping on decode is done here by [`convert_bits`]
//! because the padding rule must be strict: trailing bits that do not form
//! a whole byte have to be zero, and a whole leftover group is an error.

use bech32::primitives::decode::{CheckedHrpstring, CheckedHrpstringError};
use bech32::{Bech32, Fe32, Hrp};

use super::AddressError;

/// Regroup `data` from `from`-bit groups into `to`-bit groups.
///
/// With `pad = true` a final partial group is zero-filled on the right.
/// With `pad = false` the leftover must be shorter than `from` bits and all
/// zero, otherwise the input was not produced by a padded encoder.
pub fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>, AddressError> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_value: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &value in data {
        let value = u32::from(value);
        if value >> from != 0 {
            return Err(AddressError::InvalidEncoding(format!(
                "group value {value} does not fit in {from} bits"
            )));
        }
        acc = (acc << from) | value;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max_value) as u8);
        }
        acc &= (1 << bits) - 1;
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || acc != 0 {
        return Err(AddressError::InvalidPadding);
    }

    Ok(out)
}

/// Encode `data` under `hrp` with a Bech32 checksum.
pub fn encode_text(hrp: &str, data: &[u8]) -> Result<String, AddressError> {
    let hrp = Hrp::parse(hrp).map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, data).map_err(|e| AddressError::InvalidEncoding(e.to_string()))
}

/// Decode a Bech32 string, returning its HRP (lowercase) and payload.
pub fn decode_any(text: &str) -> Result<(String, Vec<u8>), AddressError> {
    let checked = CheckedHrpstring::new::<Bech32>(text).map_err(|e| match e {
        CheckedHrpstringError::Checksum(c) => AddressError::InvalidChecksum(c.to_string()),
        other => AddressError::InvalidEncoding(other.to_string()),
    })?;

    let groups = checked
        .data_part_ascii_no_checksum()
        .iter()
        .map(|&c| {
            Fe32::from_char(char::from(c))
                .map(Fe32::to_u8)
                .map_err(|e| AddressError::InvalidEncoding(e.to_string()))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    let payload = convert_bits(&groups, 5, 8, false)?;
    Ok((checked.hrp().to_lowercase(), payload))
}

/// Decode a Bech32 string whose HRP must equal `expected_hrp`.
pub fn decode_text(text: &str, expected_hrp: &str) -> Result<Vec<u8>, AddressError> {
    let (hrp, payload) = decode_any(text)?;
    if hrp != expected_hrp {
        return Err(AddressError::InvalidPrefix {
            expected: expected_hrp.to_string(),
            got: hrp,
        });
    }
    Ok(payload)
}
