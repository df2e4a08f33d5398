/// Constants describing the indexed RecordIO wire format.
pub mod record {
    /// Magic word that opens every record frame.
    pub const RECORD_MAGIC: u32 = 0xced7_230a;
    /// Bit position of the continuation flag inside the length word.
    pub const CFLAG_SHIFT: u32 = 29;
    /// Mask selecting the payload length from the length word.
    pub const LENGTH_MASK: u32 = (1 << CFLAG_SHIFT) - 1;
    /// Continuation flag for a record stored in a single frame.
    pub const CFLAG_WHOLE: u32 = 0;
    /// Continuation flag for the first part of a split record.
    pub const CFLAG_START: u32 = 1;
    /// Continuation flag for a middle part of a split record.
    pub const CFLAG_MIDDLE: u32 = 2;
    /// Continuation flag for the last part of a split record.
    pub const CFLAG_END: u32 = 3;
    /// Frames are padded to this alignment.
    pub const FRAME_ALIGN: usize = 4;
    /// Size of the magic + length prefix of a frame.
    pub const FRAME_HEADER_LEN: usize = 8;
    /// Packed size of the fixed sample header (`u32 flag, f32 label, u64 id, u64 id2`).
    pub const SAMPLE_HEADER_LEN: usize = 24;
}

/// Constants used by identity catalog construction.
pub mod catalog {
    /// Leading header flag: key 0 itself stores a sample.
    pub const FLAG_SAMPLE_STORING: u32 = 0;
    /// Leading header flag: key 0 declares the sample key range `[1, N)`.
    pub const FLAG_RANGE_LENGTH: u32 = 2;
    /// Key holding the leading header.
    pub const LEADING_KEY: u64 = 0;
    /// First sample key in range-length layouts.
    pub const FIRST_RANGE_KEY: u64 = 1;
}

/// Constants used by sample providers.
pub mod provider {
    /// Synthetic epoch length reported by the pair providers (sampled with replacement).
    pub const EPOCH_LENGTH: usize = 1_000_000;
    /// A fetch draws from the same identity when a uniform draw exceeds this value.
    pub const SAME_IDENTITY_THRESHOLD: f64 = 0.5;
    /// Default horizontal flip probability for catalog-backed samples.
    pub const DEFAULT_FLIP_PROBABILITY: f32 = 0.3;
    /// Default per-channel normalization mean.
    pub const DEFAULT_NORMALIZE_MEAN: f32 = 0.5;
    /// Default per-channel normalization standard deviation.
    pub const DEFAULT_NORMALIZE_STD: f32 = 0.5;
    /// Default RNG seed for providers built from a config alone.
    pub const DEFAULT_SEED: u64 = 42;
}

/// Constants describing the on-disk dataset layout.
pub mod layout {
    /// Index file holding `key\toffset` lines.
    pub const TRAIN_INDEX_FILE: &str = "train.idx";
    /// Record file holding framed records.
    pub const TRAIN_RECORD_FILE: &str = "train.rec";
    /// Extension of pickled verification sets.
    pub const VERIFICATION_EXTENSION: &str = "bin";
}

/// Constants used by image decoding.
pub mod image {
    /// PNG stream signature prefix used to split concatenated PNG payloads.
    pub const PNG_SIGNATURE: &[u8] = b"\x89PNG";
    /// Channel count of an RGB image.
    pub const RGB_CHANNELS: usize = 3;
    /// Channel count of an RGB + depth image.
    pub const RGBD_CHANNELS: usize = 4;
}
