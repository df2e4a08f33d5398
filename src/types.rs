/// Integer key addressing one record in a record store.
/// Example: `0` for the leading range header, `1..N` for samples.
pub type RecordKey = u64;
/// Byte offset of a record frame inside a `.rec` file.
/// Example: `0`, `4096`
pub type RecordOffset = u64;
/// Raw bytes of one reassembled record (header + payload).
pub type RecordBytes = Vec<u8>;
/// Raw encoded image bytes (PNG/JPEG stream).
pub type EncodedImage = Vec<u8>;
/// Dataset name used to locate a verification `.bin` file.
/// Examples: `lfw`, `cfp_fp`, `agedb_30`
pub type VerificationName = String;
