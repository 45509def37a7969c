use std::fs;
use std::io::Cursor;

use tempfile::TempDir;

use super::header::{
    ALGORITHM_CHM, HeaderError, KEY_SIZE_IN_BYTES, TABLE_INFO_MAGIC, TABLE_INFO_SIZE,
    TableInfoHeader,
};
use super::{FileWorker, info_sidecar_path};
use crate::timers::TimerSnapshot;

fn sample_header() -> TableInfoHeader {
    TableInfoHeader {
        flags: 0,
        algorithm_id: ALGORITHM_CHM,
        hash_function_id: 1,
        mask_function_id: 2,
        key_size_in_bytes: KEY_SIZE_IN_BYTES,
        number_of_keys: 8,
        number_of_table_elements: 16,
        hash_size: 16,
        index_size: 8,
        hash_shift: 4,
        index_shift: 3,
        hash_mask: 15,
        index_mask: 7,
        hash_fold: 0,
        index_fold: 0,
        hash_modulus: 16,
        index_modulus: 8,
        seed1: 0x1111_1111,
        seed2: 0x2222_2222,
        seed3: 0x3333_3333,
        seed4: 0x4444_4444,
        number_of_seeds: 4,
        number_of_table_resize_events: 1,
        total_attempts: 42,
        failed_attempts: 41,
        solutions_found: 1,
        attempts_under_smaller_sizes: 24,
        closest_approach_under_smaller_sizes: 2,
        initial_table_size: 8,
        solve_timer: TimerSnapshot {
            cycles: 100,
            micros: 10,
        },
        verify_timer: TimerSnapshot {
            cycles: 200,
            micros: 20,
        },
        prepare_timer: TimerSnapshot {
            cycles: 300,
            micros: 30,
        },
        save_timer: TimerSnapshot {
            cycles: 400,
            micros: 40,
        },
    }
}

#[test]
fn header_round_trips_bit_for_bit() {
    let header = sample_header();
    let mut first = Vec::new();
    header.write_to(&mut first).expect("header must encode");
    assert_eq!(first.len(), TABLE_INFO_SIZE as usize);

    let decoded =
        TableInfoHeader::read_from(&mut Cursor::new(&first)).expect("header must decode");
    assert_eq!(decoded, header);

    let mut second = Vec::new();
    decoded.write_to(&mut second).expect("header must re-encode");
    assert_eq!(first, second);
}

#[test]
fn header_layout_offsets_are_pinned() {
    let header = sample_header();
    let mut bytes = Vec::new();
    header.write_to(&mut bytes).expect("header must encode");

    let u32_at = |offset: usize| {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    };
    let u64_at = |offset: usize| {
        let mut raw = [0_u8; 8];
        raw.copy_from_slice(&bytes[offset..offset + 8]);
        u64::from_le_bytes(raw)
    };

    assert_eq!(u64_at(0), TABLE_INFO_MAGIC);
    assert_eq!(u32_at(8), TABLE_INFO_SIZE);
    assert_eq!(u32_at(16), ALGORITHM_CHM);
    assert_eq!(u32_at(28), KEY_SIZE_IN_BYTES);
    assert_eq!(u64_at(32), 8); // number_of_keys
    assert_eq!(u64_at(40), 16); // number_of_table_elements
    assert_eq!(u32_at(88), 0x1111_1111); // seed1
    assert_eq!(u32_at(100), 0x4444_4444); // seed4
    assert_eq!(u32_at(104), 4); // number_of_seeds
    assert_eq!(u32_at(108), 1); // resize events
    assert_eq!(u64_at(112), 42); // total_attempts
    assert_eq!(u64_at(160), 100); // solve cycles
    assert_eq!(u64_at(168), 10); // solve micros
    assert_eq!(u64_at(216), 40); // save micros
}

#[test]
fn bad_magic_and_size_are_rejected() {
    let header = sample_header();
    let mut bytes = Vec::new();
    header.write_to(&mut bytes).expect("header must encode");

    let mut corrupted = bytes.clone();
    corrupted[0] ^= 0xFF;
    let err = TableInfoHeader::read_from(&mut Cursor::new(&corrupted))
        .expect_err("corrupted magic must fail");
    assert!(matches!(err, HeaderError::InvalidMagic { .. }));

    let mut wrong_size = bytes.clone();
    wrong_size[8..12].copy_from_slice(&123_u32.to_le_bytes());
    let err = TableInfoHeader::read_from(&mut Cursor::new(&wrong_size))
        .expect_err("unexpected record size must fail");
    assert!(matches!(err, HeaderError::UnsupportedStructSize { found: 123 }));

    let err = TableInfoHeader::read_from(&mut Cursor::new(&bytes[..64]))
        .expect_err("short reads must fail");
    assert!(matches!(err, HeaderError::Io { .. }));
}

#[test]
fn sidecar_path_appends_info_to_the_file_name() {
    let info = info_sidecar_path("dir/keys.pht".as_ref());
    assert_eq!(info.to_str(), Some("dir/keys.pht.info"));
}

#[test]
fn prepare_then_save_produces_exact_artefacts() {
    let dir = TempDir::new().expect("temp dir");
    let table_path = dir.path().join("keys.pht");
    let worker = FileWorker::spawn(&table_path).expect("file worker must spawn");

    let mut header = sample_header();
    header.number_of_table_elements = 4;
    worker
        .submit_prepare(65536, header)
        .expect("prepare must queue");
    worker.wait_prepared().expect("prepare must succeed");
    assert_eq!(
        fs::metadata(&table_path).expect("table must exist").len(),
        65536
    );

    let assigned = vec![0xAABB_CCDD_u32, 0, 1, 0x0102_0304];
    worker
        .submit_save(assigned.clone(), header)
        .expect("save must queue");
    worker.complete_verification(TimerSnapshot::default(), true);
    worker.wait_saved().expect("save must succeed");

    let bytes = fs::read(&table_path).expect("table must be readable");
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[..4], &0xAABB_CCDD_u32.to_le_bytes());
    assert_eq!(&bytes[12..], &0x0102_0304_u32.to_le_bytes());

    let info = fs::File::open(worker.info_path()).expect("sidecar must exist");
    let decoded = TableInfoHeader::read_from(&mut std::io::BufReader::new(info))
        .expect("sidecar must decode");
    assert_eq!(decoded.number_of_table_elements, 4);
}

#[test]
fn failed_verification_removes_both_artefacts() {
    let dir = TempDir::new().expect("temp dir");
    let table_path = dir.path().join("keys.pht");
    let worker = FileWorker::spawn(&table_path).expect("file worker must spawn");

    worker
        .submit_prepare(65536, sample_header())
        .expect("prepare must queue");
    worker.wait_prepared().expect("prepare must succeed");

    worker
        .submit_save(vec![1, 2, 3, 4], sample_header())
        .expect("save must queue");
    worker.complete_verification(TimerSnapshot::default(), false);
    worker.wait_saved().expect("save reports no file error");

    assert!(!table_path.exists());
    assert!(!worker.info_path().exists());
}

#[test]
fn save_without_prepare_is_a_file_error() {
    let dir = TempDir::new().expect("temp dir");
    let table_path = dir.path().join("keys.pht");
    let worker = FileWorker::spawn(&table_path).expect("file worker must spawn");

    worker
        .submit_save(vec![1], sample_header())
        .expect("save must queue");
    let err = worker.wait_saved().expect_err("save must fail");
    assert_eq!(
        err.code(),
        crate::error::MaguroErrorCode::FileWork,
        "unexpected error: {err}"
    );
}
