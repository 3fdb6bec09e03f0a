//! Item codec (component C2, spec §4.2): encodes/decodes the cache-entry
//! payload between the property-list form and bytes.

use crate::entity::PropertyList;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unsupported codec version byte {0}")]
    UnsupportedVersion(u8),
    #[error("payload too short to contain a version byte")]
    Truncated,
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Current codec version byte. Byte form need not be canonical across
/// versions, but an old or foreign version byte must be rejected so a
/// decode failure degrades to a cache miss rather than misinterpreting
/// bytes (spec §4.2).
pub const CODEC_VERSION: u8 = 1;

/// Pluggable via [`crate::client::ClientBuilder::codec`] so tests can
/// inject forced-fail encoders (spec §4.2, §9).
pub trait Codec: Send + Sync {
    fn encode(&self, props: &PropertyList) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<PropertyList, CodecError>;
}

/// Default codec: a version byte followed by a `bincode` encoding of the
/// property list.
#[derive(Debug, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn encode(&self, props: &PropertyList) -> Result<Vec<u8>, CodecError> {
        let mut buf = vec![CODEC_VERSION];
        bincode::serialize_into(&mut buf, props).map_err(|e| CodecError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<PropertyList, CodecError> {
        let (version, rest) = bytes.split_first().ok_or(CodecError::Truncated)?;
        if *version != CODEC_VERSION {
            return Err(CodecError::UnsupportedVersion(*version));
        }
        bincode::deserialize(rest).map_err(|e| CodecError::Encoding(e.to_string()))
    }
}

/// Test double: forces encode and/or decode failures, used to exercise
/// invariant 5 (codec corruption safety) and the R4 writeback swallow path.
#[derive(Debug, Default)]
pub struct ForcedFailCodec {
    pub fail_encode: bool,
    pub fail_decode: bool,
}

impl Codec for ForcedFailCodec {
    fn encode(&self, props: &PropertyList) -> Result<Vec<u8>, CodecError> {
        if self.fail_encode {
            return Err(CodecError::Encoding("forced encode failure".into()));
        }
        BincodeCodec.encode(props)
    }

    fn decode(&self, bytes: &[u8]) -> Result<PropertyList, CodecError> {
        if self.fail_decode {
            return Err(CodecError::Encoding("forced decode failure".into()));
        }
        BincodeCodec.decode(bytes)
    }
}
