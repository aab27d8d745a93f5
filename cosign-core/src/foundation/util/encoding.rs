use crate::foundation::CosignError;

pub fn strip_hex_prefix(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed)
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>, CosignError> {
    hex::decode(strip_hex_prefix(s)).map_err(|e| e.into())
}

/// Decode a hex string that must be exactly `N` bytes.
pub fn parse_hex_fixed<const N: usize>(s: &str) -> Result<[u8; N], CosignError> {
    let bytes = decode_hex(s)?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| CosignError::EncodingError(format!("expected {N} bytes, got {len}")))
}

pub fn parse_hex_32bytes(s: &str) -> Result<[u8; 32], CosignError> {
    parse_hex_fixed::<32>(s)
}
