//! Rotating credential pool for quota-gated providers.

use parking_lot::Mutex;

/// An ordered set of interchangeable provider credentials with a wrapping
/// rotation cursor.
///
/// The cursor advances on every [`next_key`](Self::next_key) call and is
/// never reset between requests, so rotation fairness is global across the
/// process rather than per-request.
#[derive(Debug)]
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: Mutex<usize>,
}

impl CredentialPool {
    /// Create a pool over the given keys, cursor at the first entry.
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            cursor: Mutex::new(0),
        }
    }

    /// Number of credentials in the pool.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` when no credentials are configured.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Current cursor position: the index of the next key to hand out.
    pub fn cursor(&self) -> usize {
        *self.cursor.lock()
    }

    /// Take the next credential, advancing the cursor modulo pool size.
    ///
    /// Returns `None` for an empty pool.
    pub fn next_key(&self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.lock();
        let key = self.keys[*cursor].clone();
        *cursor = (*cursor + 1) % self.keys.len();
        Some(key)
    }
}
