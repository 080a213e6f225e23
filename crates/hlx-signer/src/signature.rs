//! Split form of a recoverable ECDSA signature.

use alloy::primitives::{PrimitiveSignature, U256};
use serde::{Deserialize, Serialize};

use crate::error::{SignerError, SignerResult};

/// `{r, s, v}` as posted to the exchange.
///
/// `r` and `s` are `0x`-prefixed 32-byte hex; `v` is 27 or 28.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSignature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

impl ActionSignature {
    pub fn from_signature(signature: &PrimitiveSignature) -> Self {
        Self::from_bytes(&signature.as_bytes())
    }

    /// Split a 65-byte `r || s || v` signature.
    ///
    /// A raw recovery id (0/1) is normalized to 27/28.
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let v_raw = bytes[64];
        let v = if v_raw < 27 { v_raw + 27 } else { v_raw };
        Self {
            r: format!("0x{}", hex::encode(&bytes[0..32])),
            s: format!("0x{}", hex::encode(&bytes[32..64])),
            v,
        }
    }

    /// Join back into 65 bytes.
    pub fn to_bytes(&self) -> SignerResult<[u8; 65]> {
        let mut out = [0u8; 65];
        out[0..32].copy_from_slice(&decode_word("r", &self.r)?);
        out[32..64].copy_from_slice(&decode_word("s", &self.s)?);
        out[64] = self.v;
        Ok(out)
    }

    pub fn to_primitive(&self) -> SignerResult<PrimitiveSignature> {
        let y_parity = match self.v {
            27 | 0 => false,
            28 | 1 => true,
            other => {
                return Err(SignerError::InvalidSignature(format!("v out of range: {other}")));
            }
        };
        let r = U256::from_be_bytes(decode_word("r", &self.r)?);
        let s = U256::from_be_bytes(decode_word("s", &self.s)?);
        Ok(PrimitiveSignature::new(r, s, y_parity))
    }
}

impl From<PrimitiveSignature> for ActionSignature {
    fn from(signature: PrimitiveSignature) -> Self {
        Self::from_signature(&signature)
    }
}

fn decode_word(name: &str, value: &str) -> SignerResult<[u8; 32]> {
    let raw = hex::decode(value.trim_start_matches("0x"))
        .map_err(|e| SignerError::InvalidSignature(format!("{name}: {e}")))?;
    raw.try_into()
        .map_err(|_| SignerError::InvalidSignature(format!("{name}: expected 32 bytes")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes(v: u8) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&[0x11; 32]);
        bytes[32..64].copy_from_slice(&[0x22; 32]);
        bytes[64] = v;
        bytes
    }

    #[test]
    fn test_split_join_round_trip() {
        let bytes = sample_bytes(28);
        let sig = ActionSignature::from_bytes(&bytes);
        assert_eq!(sig.r, format!("0x{}", "11".repeat(32)));
        assert_eq!(sig.s, format!("0x{}", "22".repeat(32)));
        assert_eq!(sig.v, 28);
        assert_eq!(sig.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_raw_recovery_id_is_normalized() {
        assert_eq!(ActionSignature::from_bytes(&sample_bytes(0)).v, 27);
        assert_eq!(ActionSignature::from_bytes(&sample_bytes(1)).v, 28);
    }

    #[test]
    fn test_primitive_round_trip() {
        let sig = ActionSignature::from_bytes(&sample_bytes(28));
        let primitive = sig.to_primitive().unwrap();
        assert!(primitive.v());
        assert_eq!(ActionSignature::from(primitive), sig);
    }

    #[test]
    fn test_bad_components_rejected() {
        let mut sig = ActionSignature::from_bytes(&sample_bytes(27));
        sig.v = 30;
        assert!(sig.to_primitive().is_err());

        sig.v = 27;
        sig.r = "0x1234".to_string();
        assert!(sig.to_bytes().is_err());
    }

    #[test]
    fn test_json_shape() {
        let sig = ActionSignature::from_bytes(&sample_bytes(27));
        let json = serde_json::to_value(&sig).unwrap();
        assert_eq!(json["v"], 27);
        assert!(json["r"].as_str().unwrap().starts_with("0x"));
    }
}
