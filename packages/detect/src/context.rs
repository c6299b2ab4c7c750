//! Three-phase SHA-1 collision-detection state machine
//!
//! `Uninitialized -> Initialized -> Finalized`. Every transition consumes the
//! context, so updating after finalization or initializing twice does not
//! type-check. A context lives for exactly one record's byte stream.

use sha1collisiondetection::{Output, Sha1CD};

/// SHA-1 digest length in bytes
pub const DIGEST_LEN: usize = 20;

/// Type-state marker: configured, not yet accepting input
pub struct Uninitialized {
    safe_hash: bool,
}

/// Type-state marker: accepting input
pub struct Initialized {
    hasher: Sha1CD,
    bytes: u64,
}

/// Collision-detecting SHA-1 context
pub struct Sha1DcContext<S> {
    state: S,
}

/// Outcome of finalizing a context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Finalized {
    digest: [u8; DIGEST_LEN],
    collision: bool,
    bytes: u64,
}

impl Default for Sha1DcContext<Uninitialized> {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha1DcContext<Uninitialized> {
    /// New context with the safe-hash countermeasure disabled
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Uninitialized { safe_hash: false },
        }
    }

    /// Toggle the safe-hash countermeasure.
    ///
    /// With safe-hash enabled a detected collision alters the digest. Detection
    /// needs the uncorrected internal state, so analyzers leave it off.
    #[must_use]
    pub fn with_safe_hash(self, safe_hash: bool) -> Self {
        Self {
            state: Uninitialized { safe_hash },
        }
    }

    /// Initialize the hashing state
    #[must_use]
    pub fn init(self) -> Sha1DcContext<Initialized> {
        let hasher = Sha1CD::configure()
            .detect_collisions(true)
            .safe_hash(self.state.safe_hash)
            .build();

        Sha1DcContext {
            state: Initialized { hasher, bytes: 0 },
        }
    }
}

impl Sha1DcContext<Initialized> {
    /// Feed the next chunk of input
    pub fn update(&mut self, chunk: &[u8]) {
        self.state.hasher.update(chunk);
        self.state.bytes += chunk.len() as u64;
    }

    /// Bytes fed so far
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.state.bytes
    }

    /// Produce the digest and the collision flag, ending the context
    #[must_use]
    pub fn finalize(self) -> Finalized {
        let Initialized { mut hasher, bytes } = self.state;
        let mut output = Output::default();
        let collision = hasher.finalize_into_dirty_cd(&mut output).is_err();

        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&output);

        Finalized {
            digest,
            collision,
            bytes,
        }
    }
}

impl Finalized {
    /// SHA-1 digest of the input
    #[must_use]
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }

    /// Whether a collision-attack signature was detected
    #[must_use]
    pub fn is_collision(&self) -> bool {
        self.collision
    }

    /// Total bytes hashed
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha1_hex(finalized: &Finalized) -> String {
        finalized.digest().iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn digest_matches_reference_sha1() {
        let mut ctx = Sha1DcContext::new().init();
        ctx.update(b"abc");
        let finalized = ctx.finalize();

        assert_eq!(sha1_hex(&finalized), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert!(!finalized.is_collision());
        assert_eq!(finalized.bytes(), 3);
    }

    #[test]
    fn chunked_updates_match_single_update() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let mut whole = Sha1DcContext::new().init();
        whole.update(&data);

        let mut chunked = Sha1DcContext::new().init();
        for chunk in data.chunks(65536) {
            chunked.update(chunk);
        }

        assert_eq!(whole.finalize(), chunked.finalize());
    }

    #[test]
    fn empty_input_is_not_a_collision() {
        let finalized = Sha1DcContext::new().init().finalize();

        assert_eq!(sha1_hex(&finalized), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert!(!finalized.is_collision());
    }

    #[test]
    fn safe_hash_does_not_change_clean_digests() {
        let mut plain = Sha1DcContext::new().init();
        let mut safe = Sha1DcContext::new().with_safe_hash(true).init();
        plain.update(b"certificate bytes");
        safe.update(b"certificate bytes");

        assert_eq!(plain.finalize().digest(), safe.finalize().digest());
    }
}
