use crate::feature::Feature;

/// One stored test case paired with the coverage features its execution
/// produced upstream. This is the unit moved through the reading,
/// filtering, and writing stages; the input bytes are never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusElement {
    pub input: Vec<u8>,
    pub features: Vec<Feature>,
}

impl CorpusElement {
    pub fn new(input: Vec<u8>, features: Vec<Feature>) -> Self {
        Self { input, features }
    }
}
