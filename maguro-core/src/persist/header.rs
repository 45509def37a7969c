//! On-disk metadata record accompanying a persisted table.
//!
//! The record is a fixed little-endian layout written verbatim to the
//! `<table>.info` sidecar, identifiable by its magic value and
//! self-describing via `size_of_struct`:
//!
//! ```text
//!   0  u64 magic
//!   8  u32 size_of_struct
//!  12  u32 flags (reserved, zero)
//!  16  u32 algorithm_id
//!  20  u32 hash_function_id
//!  24  u32 mask_function_id
//!  28  u32 key_size_in_bytes
//!  32  u64 number_of_keys
//!  40  u64 number_of_table_elements
//!  48  u32 hash_size
//!  52  u32 index_size
//!  56  u32 hash_shift,  60 index_shift
//!  64  u32 hash_mask,   68 index_mask
//!  72  u32 hash_fold,   76 index_fold
//!  80  u32 hash_modulus, 84 index_modulus
//!  88  u32 seed1..seed4
//! 104  u32 number_of_seeds
//! 108  u32 number_of_table_resize_events
//! 112  u64 total_attempts
//! 120  u64 failed_attempts
//! 128  u64 solutions_found
//! 136  u64 attempts_under_smaller_sizes
//! 144  u64 closest_approach_under_smaller_sizes
//! 152  u64 initial_table_size
//! 160  4 × (u64 cycles, u64 micros) timers: solve, verify, prepare, save
//! 224  end
//! ```

use std::io::{self, Read, Write};

use thiserror::Error;

use crate::timers::TimerSnapshot;

/// Record magic, `b"MAGURO01"` in little-endian byte order.
pub const TABLE_INFO_MAGIC: u64 = u64::from_le_bytes(*b"MAGURO01");

/// Byte length of the record.
pub const TABLE_INFO_SIZE: u32 = 224;

/// Identifier of the CHM 2-uniform hypergraph algorithm.
pub const ALGORITHM_CHM: u32 = 1;

/// Key width persisted in the record; keys are always 32-bit here.
pub const KEY_SIZE_IN_BYTES: u32 = 4;

/// Errors raised while decoding a metadata record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HeaderError {
    /// The underlying read failed.
    #[error("failed to read table metadata: {source}")]
    Io {
        /// Underlying operating system error.
        #[from]
        source: io::Error,
    },
    /// The record does not begin with the expected magic value.
    #[error("unrecognised table metadata magic {found:#018x}")]
    InvalidMagic {
        /// Value found in the magic field.
        found: u64,
    },
    /// The self-described record size is not one this build understands.
    #[error("unsupported table metadata size {found} (expected {TABLE_INFO_SIZE})")]
    UnsupportedStructSize {
        /// Value found in the size field.
        found: u32,
    },
}

/// The metadata record, field for field.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TableInfoHeader {
    /// Reserved flag bits; always zero today.
    pub flags: u32,
    /// Algorithm identifier ([`ALGORITHM_CHM`]).
    pub algorithm_id: u32,
    /// Seeded hash function identifier.
    pub hash_function_id: u32,
    /// Masking function identifier.
    pub mask_function_id: u32,
    /// Bytes per key ([`KEY_SIZE_IN_BYTES`]).
    pub key_size_in_bytes: u32,
    /// Keys in the input set.
    pub number_of_keys: u64,
    /// Final vertex count `V`; the table file holds this many values.
    pub number_of_table_elements: u64,
    /// Vertex space size.
    pub hash_size: u32,
    /// Index space size.
    pub index_size: u32,
    /// Trailing zeros of `hash_size`.
    pub hash_shift: u32,
    /// Trailing zeros of `index_size`.
    pub index_shift: u32,
    /// `hash_size - 1`.
    pub hash_mask: u32,
    /// `index_size - 1`.
    pub index_mask: u32,
    /// `hash_shift / 8`.
    pub hash_fold: u32,
    /// `index_shift / 8`.
    pub index_fold: u32,
    /// Modulus for vertex reduction.
    pub hash_modulus: u32,
    /// Modulus for index reduction.
    pub index_modulus: u32,
    /// Winning seed quartet.
    pub seed1: u32,
    /// Second seed.
    pub seed2: u32,
    /// Third seed.
    pub seed3: u32,
    /// Fourth seed.
    pub seed4: u32,
    /// Seeds per attempt (always four).
    pub number_of_seeds: u32,
    /// Resize events consumed by the build.
    pub number_of_table_resize_events: u32,
    /// Attempts at the final table size.
    pub total_attempts: u64,
    /// Failed attempts at the final table size.
    pub failed_attempts: u64,
    /// Solutions found (one for a successful build).
    pub solutions_found: u64,
    /// Attempts accumulated under smaller table sizes.
    pub attempts_under_smaller_sizes: u64,
    /// Fewest edges any smaller-size attempt left unpeeled.
    pub closest_approach_under_smaller_sizes: u64,
    /// Vertex count of the first size tried, once a resize happened.
    pub initial_table_size: u64,
    /// Solve phase timing.
    pub solve_timer: TimerSnapshot,
    /// Verify phase timing.
    pub verify_timer: TimerSnapshot,
    /// File-preparation timing.
    pub prepare_timer: TimerSnapshot,
    /// Save timing.
    pub save_timer: TimerSnapshot,
}

impl TableInfoHeader {
    /// Serializes the record in its fixed little-endian layout.
    ///
    /// # Errors
    /// Propagates any error from `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buffer = [0_u8; TABLE_INFO_SIZE as usize];
        let mut cursor = FieldWriter::new(&mut buffer);

        cursor.put_u64(TABLE_INFO_MAGIC);
        cursor.put_u32(TABLE_INFO_SIZE);
        cursor.put_u32(self.flags);
        cursor.put_u32(self.algorithm_id);
        cursor.put_u32(self.hash_function_id);
        cursor.put_u32(self.mask_function_id);
        cursor.put_u32(self.key_size_in_bytes);
        cursor.put_u64(self.number_of_keys);
        cursor.put_u64(self.number_of_table_elements);
        cursor.put_u32(self.hash_size);
        cursor.put_u32(self.index_size);
        cursor.put_u32(self.hash_shift);
        cursor.put_u32(self.index_shift);
        cursor.put_u32(self.hash_mask);
        cursor.put_u32(self.index_mask);
        cursor.put_u32(self.hash_fold);
        cursor.put_u32(self.index_fold);
        cursor.put_u32(self.hash_modulus);
        cursor.put_u32(self.index_modulus);
        cursor.put_u32(self.seed1);
        cursor.put_u32(self.seed2);
        cursor.put_u32(self.seed3);
        cursor.put_u32(self.seed4);
        cursor.put_u32(self.number_of_seeds);
        cursor.put_u32(self.number_of_table_resize_events);
        cursor.put_u64(self.total_attempts);
        cursor.put_u64(self.failed_attempts);
        cursor.put_u64(self.solutions_found);
        cursor.put_u64(self.attempts_under_smaller_sizes);
        cursor.put_u64(self.closest_approach_under_smaller_sizes);
        cursor.put_u64(self.initial_table_size);
        for timer in [
            self.solve_timer,
            self.verify_timer,
            self.prepare_timer,
            self.save_timer,
        ] {
            cursor.put_u64(timer.cycles);
            cursor.put_u64(timer.micros);
        }
        debug_assert_eq!(cursor.offset, buffer.len());

        writer.write_all(&buffer)
    }

    /// Decodes a record, validating the magic value and record size.
    ///
    /// # Errors
    /// Returns [`HeaderError::InvalidMagic`] or
    /// [`HeaderError::UnsupportedStructSize`] for unrecognised records and
    /// [`HeaderError::Io`] for short or failing reads.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, HeaderError> {
        let mut buffer = [0_u8; TABLE_INFO_SIZE as usize];
        reader.read_exact(&mut buffer)?;
        let mut cursor = FieldReader::new(&buffer);

        let magic = cursor.take_u64();
        if magic != TABLE_INFO_MAGIC {
            return Err(HeaderError::InvalidMagic { found: magic });
        }
        let size_of_struct = cursor.take_u32();
        if size_of_struct != TABLE_INFO_SIZE {
            return Err(HeaderError::UnsupportedStructSize {
                found: size_of_struct,
            });
        }

        let mut header = Self {
            flags: cursor.take_u32(),
            algorithm_id: cursor.take_u32(),
            hash_function_id: cursor.take_u32(),
            mask_function_id: cursor.take_u32(),
            key_size_in_bytes: cursor.take_u32(),
            number_of_keys: cursor.take_u64(),
            number_of_table_elements: cursor.take_u64(),
            hash_size: cursor.take_u32(),
            index_size: cursor.take_u32(),
            hash_shift: cursor.take_u32(),
            index_shift: cursor.take_u32(),
            hash_mask: cursor.take_u32(),
            index_mask: cursor.take_u32(),
            hash_fold: cursor.take_u32(),
            index_fold: cursor.take_u32(),
            hash_modulus: cursor.take_u32(),
            index_modulus: cursor.take_u32(),
            seed1: cursor.take_u32(),
            seed2: cursor.take_u32(),
            seed3: cursor.take_u32(),
            seed4: cursor.take_u32(),
            number_of_seeds: cursor.take_u32(),
            number_of_table_resize_events: cursor.take_u32(),
            total_attempts: cursor.take_u64(),
            failed_attempts: cursor.take_u64(),
            solutions_found: cursor.take_u64(),
            attempts_under_smaller_sizes: cursor.take_u64(),
            closest_approach_under_smaller_sizes: cursor.take_u64(),
            initial_table_size: cursor.take_u64(),
            ..Self::default()
        };
        for timer in [
            &mut header.solve_timer,
            &mut header.verify_timer,
            &mut header.prepare_timer,
            &mut header.save_timer,
        ] {
            timer.cycles = cursor.take_u64();
            timer.micros = cursor.take_u64();
        }
        debug_assert_eq!(cursor.offset, buffer.len());

        Ok(header)
    }
}

struct FieldWriter<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> FieldWriter<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    fn put_u32(&mut self, value: u32) {
        self.buffer[self.offset..self.offset + 4].copy_from_slice(&value.to_le_bytes());
        self.offset += 4;
    }

    fn put_u64(&mut self, value: u64) {
        self.buffer[self.offset..self.offset + 8].copy_from_slice(&value.to_le_bytes());
        self.offset += 8;
    }
}

struct FieldReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    fn take_u32(&mut self) -> u32 {
        let mut bytes = [0_u8; 4];
        bytes.copy_from_slice(&self.buffer[self.offset..self.offset + 4]);
        self.offset += 4;
        u32::from_le_bytes(bytes)
    }

    fn take_u64(&mut self) -> u64 {
        let mut bytes = [0_u8; 8];
        bytes.copy_from_slice(&self.buffer[self.offset..self.offset + 8]);
        self.offset += 8;
        u64::from_le_bytes(bytes)
    }
}
