use rand::RngExt;

use crate::domain::types::DEFAULT_CODE_BYTES;

/// Produces a new opaque code string for every call.
///
/// Implementations must be unpredictable and return a fixed-length string.
/// They are invoked concurrently, so they must not rely on unsynchronized state.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<F> CodeGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Draws `bytes` random bytes from the thread-local CSPRNG and hex-encodes them
/// as lowercase characters.
#[derive(Debug, Clone, Copy)]
pub struct SecureHexGenerator {
    bytes: usize,
}

impl SecureHexGenerator {
    pub fn new(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Length of every generated code in characters.
    pub fn code_len(&self) -> usize {
        self.bytes * 2
    }
}

impl Default for SecureHexGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_BYTES)
    }
}

impl CodeGenerator for SecureHexGenerator {
    fn generate(&self) -> String {
        let mut buf = vec![0u8; self.bytes];
        rand::rng().fill(buf.as_mut_slice());
        hex::encode(buf)
    }
}
