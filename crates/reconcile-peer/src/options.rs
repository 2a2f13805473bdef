//! Builder-style construction for an IBLT peer (§4.10).
//!
//! The original exposes a functional-options list (`WithHashSync`,
//! `WithDataLen`, ...) applied over a zero-valued struct and finished with
//! a `complete()` that fills in defaults. Rust doesn't have first-class
//! functional options, so this is a builder instead: each `with_*` call
//! returns `Self`, and `build()` is the `complete()` step.

use reconcile_core::error::{ReconcileError, Result};
use reconcile_core::hash::DigestKind;

/// The option descriptor exchanged on the wire during parameter exchange
/// (§4.9 step 2, §6 "Option descriptor"). Equality is structural — the
/// server compares a deserialized copy against its own options byte for
/// byte via `PartialEq`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    pub hash_sync: bool,
    pub hash_func: DigestKind,
    pub symmetric_diff: usize,
    pub data_len: usize,
    pub max_sync_retry: u32,
    pub table_size_constant: f64,
    /// RCDS chunker knobs (§4.5); unused by FULL/IBLT but carried on the
    /// same descriptor so a single parameter-exchange frame covers every
    /// algorithm (§6).
    pub chunk_h: usize,
    pub chunk_r: usize,
    pub chunk_hash_space: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptionsBuilder {
    hash_sync: bool,
    hash_func: Option<DigestKind>,
    symmetric_diff: usize,
    data_len: usize,
    max_sync_retry: u32,
    table_size_constant: f64,
    chunk_h: usize,
    chunk_r: usize,
    chunk_hash_space: u64,
}

impl ReconcileOptions {
    pub fn builder() -> ReconcileOptionsBuilder {
        ReconcileOptionsBuilder::default()
    }
}

impl ReconcileOptionsBuilder {
    pub fn symmetric_set_diff(mut self, diff_num: usize) -> Self {
        self.symmetric_diff = diff_num;
        self
    }

    pub fn hash_sync(mut self) -> Self {
        self.hash_sync = true;
        self.hash_func = Some(DigestKind::Sha256);
        self.data_len = DigestKind::Sha256.size();
        self
    }

    pub fn hash_func(mut self, hash_func: DigestKind) -> Self {
        self.hash_func = Some(hash_func);
        self.hash_sync = true;
        self.data_len = hash_func.size();
        self
    }

    pub fn data_len(mut self, length: usize) -> Self {
        self.data_len = length;
        self.hash_sync = false;
        self
    }

    pub fn max_sync_retries(mut self, retries: u32) -> Self {
        self.max_sync_retry = retries;
        self
    }

    /// Default constant is 2.5 per the original's own comment ("Default
    /// constant should be 1.5 according to the IBLT paper", overridden in
    /// practice by the code path this mirrors).
    pub fn table_size_constant(mut self, constant: f64) -> Self {
        self.table_size_constant = constant;
        self
    }

    /// RCDS-only: the rolling-chunker's `(h, r, hash_space)` triple (§4.5).
    pub fn chunk_params(mut self, h: usize, r: usize, hash_space: u64) -> Self {
        self.chunk_h = h;
        self.chunk_r = r;
        self.chunk_hash_space = hash_space;
        self
    }

    /// Finish the builder, applying the same defaults as the Go
    /// `ibltOptions.complete()`: `DataLen == 0` implies hash-sync with
    /// SHA-256, and an unset table size constant defaults to 2.5.
    pub fn build(mut self) -> Result<ReconcileOptions> {
        if self.symmetric_diff == 0 {
            return Err(ReconcileError::InvalidArgument(
                "symmetric set difference must be positive".to_string(),
            ));
        }
        if self.data_len == 0 {
            self.hash_sync = true;
            self.hash_func = Some(DigestKind::Sha256);
            self.data_len = DigestKind::Sha256.size();
        }
        if self.table_size_constant == 0.0 {
            self.table_size_constant = 2.5;
        }
        if self.chunk_hash_space == 0 {
            self.chunk_hash_space = 1024;
        }
        if self.chunk_r == 0 {
            self.chunk_r = 4;
        }
        Ok(ReconcileOptions {
            hash_sync: self.hash_sync,
            hash_func: self.hash_func.unwrap_or(DigestKind::Sha256),
            symmetric_diff: self.symmetric_diff,
            data_len: self.data_len,
            max_sync_retry: self.max_sync_retry,
            table_size_constant: self.table_size_constant,
            chunk_h: self.chunk_h,
            chunk_r: self.chunk_r,
            chunk_hash_space: self.chunk_hash_space,
        })
    }
}

impl ReconcileOptions {
    fn hash_func_byte(&self) -> u8 {
        match self.hash_func {
            DigestKind::Sha1 => 0,
            DigestKind::Sha256 => 1,
            DigestKind::Sha512 => 2,
        }
    }

    fn hash_func_from_byte(b: u8) -> Result<DigestKind> {
        match b {
            0 => Ok(DigestKind::Sha1),
            1 => Ok(DigestKind::Sha256),
            2 => Ok(DigestKind::Sha512),
            other => Err(ReconcileError::Serialization(format!(
                "unknown hash_func byte {other}"
            ))),
        }
    }

    /// Fixed little-endian layout for the wire option descriptor (§6):
    /// `hash_sync:u8, hash_func:u8, symmetric_diff:u32, data_len:u32,
    /// max_sync_retry:u32, table_size_constant:f64 (bits), chunk_h:u32,
    /// chunk_r:u32, chunk_hash_space:u64`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(38);
        out.push(self.hash_sync as u8);
        out.push(self.hash_func_byte());
        out.extend_from_slice(&(self.symmetric_diff as u32).to_le_bytes());
        out.extend_from_slice(&(self.data_len as u32).to_le_bytes());
        out.extend_from_slice(&self.max_sync_retry.to_le_bytes());
        out.extend_from_slice(&self.table_size_constant.to_bits().to_le_bytes());
        out.extend_from_slice(&(self.chunk_h as u32).to_le_bytes());
        out.extend_from_slice(&(self.chunk_r as u32).to_le_bytes());
        out.extend_from_slice(&self.chunk_hash_space.to_le_bytes());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 38 {
            return Err(ReconcileError::Serialization(format!(
                "expected a 38-byte option descriptor, found {}",
                bytes.len()
            )));
        }
        let hash_sync = bytes[0] != 0;
        let hash_func = Self::hash_func_from_byte(bytes[1])?;
        let symmetric_diff = u32::from_le_bytes(bytes[2..6].try_into().unwrap()) as usize;
        let data_len = u32::from_le_bytes(bytes[6..10].try_into().unwrap()) as usize;
        let max_sync_retry = u32::from_le_bytes(bytes[10..14].try_into().unwrap());
        let table_size_constant =
            f64::from_bits(u64::from_le_bytes(bytes[14..22].try_into().unwrap()));
        let chunk_h = u32::from_le_bytes(bytes[22..26].try_into().unwrap()) as usize;
        let chunk_r = u32::from_le_bytes(bytes[26..30].try_into().unwrap()) as usize;
        let chunk_hash_space = u64::from_le_bytes(bytes[30..38].try_into().unwrap());
        Ok(Self {
            hash_sync,
            hash_func,
            symmetric_diff,
            data_len,
            max_sync_retry,
            table_size_constant,
            chunk_h,
            chunk_r,
            chunk_hash_space,
        })
    }
}
