use crate::feature::Feature;
use crate::store::{StoreError, record_config};
use bincode::{Decode, Encode};

/// Feature-stream record tying a retained input to its feature vector.
///
/// The hash lets a consumer re-associate a feature record with its input
/// across the two parallel streams without relying on record positions.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct FeatureRecord {
    /// MD5 digest of the raw input bytes this record belongs to.
    pub input_hash: [u8; 16],
    pub features: Vec<Feature>,
}

/// MD5 digest of raw input bytes, as stored in `FeatureRecord::input_hash`.
pub fn input_hash(input: &[u8]) -> [u8; 16] {
    md5::compute(input).0
}

/// Packs an input's feature vector together with the input's integrity
/// hash into one feature-stream record.
pub fn pack_features(input: &[u8], features: &[Feature]) -> Result<Vec<u8>, StoreError> {
    let record = FeatureRecord {
        input_hash: input_hash(input),
        features: features.to_vec(),
    };
    Ok(bincode::encode_to_vec(&record, record_config())?)
}

/// Decodes one feature-stream record produced by [`pack_features`].
pub fn unpack_features(record: &[u8]) -> Result<FeatureRecord, StoreError> {
    let (decoded, _length): (FeatureRecord, usize) =
        bincode::decode_from_slice(record, record_config())?;
    Ok(decoded)
}
