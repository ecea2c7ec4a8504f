//! File system invariant tests
//!
//! - Reads return exactly what was written and appended
//! - Chains are sized by the write rule and reused by appends
//! - Running out of space fails explicitly and is remembered
//! - Live records never overlap and never cross the disk end
//! - Rewrites release the chain they replace

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ramvfs::vfs::allocator::records;
use ramvfs::vfs::{
    BlockTag, FileHandle, Vfs, VfsErrorCode, BLOCK_SIZE, DATA_BLOCK_LEN, HEADER_LEN,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| b'!' + ((i as u8).wrapping_add(seed) % 90)).collect()
}

fn fresh_file(vfs: &mut Vfs, name: &str) -> FileHandle {
    vfs.create_file(name).expect("create should succeed on a fresh disk")
}

// =============================================================================
// Contents
// =============================================================================

#[test]
fn test_write_then_read_roundtrip() {
    let mut vfs = Vfs::new(4096).unwrap();
    let file = fresh_file(&mut vfs, "roundtrip.bin");

    for len in [1, 31, 32, 33, 100] {
        let data = pattern(len, len as u8);
        vfs.write(file, &data).unwrap();
        assert_eq!(vfs.read(file).unwrap(), data, "len {}", len);
        assert_eq!(vfs.header(file).unwrap().size as usize, len);
    }
}

#[test]
fn test_appends_concatenate() {
    let mut vfs = Vfs::new(4096).unwrap();
    let file = fresh_file(&mut vfs, "log.txt");

    let base = pattern(45, 1);
    let a = pattern(19, 2);
    let b = pattern(70, 3);

    vfs.write(file, &base).unwrap();
    vfs.append(file, &a).unwrap();
    vfs.append(file, &b).unwrap();

    let expected: Vec<u8> = [base, a, b].concat();
    assert_eq!(vfs.read(file).unwrap(), expected);
    assert_eq!(vfs.header(file).unwrap().size as usize, expected.len());
}

#[test]
fn test_write_append_on_default_disk() {
    let first = "QWERTYUIOPASDFGHJKLZXCVBNM,.qwertyuiopasdfghjklzxcvbnm,.1234567890-!#€%&/()=?";
    let second = "0987654321.0987654321..0987654321...0987654321....0987654321.....";

    let mut vfs = Vfs::new(4096).unwrap();
    let file = fresh_file(&mut vfs, "test.txt");
    vfs.write(file, first.as_bytes()).unwrap();
    vfs.append(file, second.as_bytes()).unwrap();

    let contents = vfs.read(file).unwrap();
    assert_eq!(contents, format!("{}{}", first, second).into_bytes());

    let info = vfs.file_info(file).unwrap();
    assert_eq!(info.name, "test.txt");
    assert_eq!(info.size, 144);
    assert_eq!(info.blocks, (first.len() + second.len() + BLOCK_SIZE - 1) / BLOCK_SIZE);
    assert_eq!(vfs.last_error(), None);
}

#[test]
fn test_long_name_is_truncated() {
    let mut vfs = Vfs::new(512).unwrap();
    let file = fresh_file(&mut vfs, "a-name-that-is-well-over-twenty-four-bytes");
    assert_eq!(
        vfs.file_info(file).unwrap().name,
        "a-name-that-is-well-over"
    );
}

// =============================================================================
// Chain Shape
// =============================================================================

#[test]
fn test_exact_block_write_allocates_trailing_block() {
    let mut vfs = Vfs::new(1024).unwrap();
    let file = fresh_file(&mut vfs, "exact");

    vfs.write(file, &pattern(BLOCK_SIZE, 0)).unwrap();
    let chain = vfs.chain(file).unwrap();
    assert_eq!(chain.len(), 2);

    vfs.append(file, b"tail").unwrap();
    assert_eq!(vfs.chain(file).unwrap(), chain, "append must reuse the trailing block");

    let mut expected = pattern(BLOCK_SIZE, 0);
    expected.extend_from_slice(b"tail");
    assert_eq!(vfs.read(file).unwrap(), expected);
}

#[test]
fn test_empty_write_then_read_and_append() {
    let mut vfs = Vfs::new(512).unwrap();
    let file = fresh_file(&mut vfs, "empty");

    vfs.write(file, b"").unwrap();
    assert_eq!(vfs.chain(file).unwrap().len(), 1);

    let err = vfs.read(file).unwrap_err();
    assert_eq!(err.code(), VfsErrorCode::EmptyFile);

    vfs.append(file, b"now").unwrap();
    assert_eq!(vfs.read(file).unwrap(), b"now");
}

#[test]
fn test_append_to_unwritten_file_fails() {
    let mut vfs = Vfs::new(512).unwrap();
    let file = fresh_file(&mut vfs, "never");

    let err = vfs.append(file, b"x").unwrap_err();
    assert_eq!(err.code(), VfsErrorCode::EmptyTarget);
    assert_eq!(vfs.last_error(), Some(VfsErrorCode::EmptyTarget));
    assert_eq!(vfs.header(file).unwrap().size, 0);
}

// =============================================================================
// Out of Space
// =============================================================================

#[test]
fn test_small_disk_runs_out_of_space() {
    let mut vfs = Vfs::new(64).unwrap();
    let file = fresh_file(&mut vfs, "big");

    let err = vfs.write(file, &pattern(70, 0)).unwrap_err();
    assert_eq!(err.code(), VfsErrorCode::OutOfSpace);
    assert!(!err.is_fatal());
    assert_eq!(vfs.last_error(), Some(VfsErrorCode::OutOfSpace));

    let header = vfs.header(file).unwrap();
    assert_eq!(header.size, 0);
    assert_eq!(header.data_addr, 0);
}

#[test]
fn test_header_does_not_fit() {
    let mut vfs = Vfs::new(HEADER_LEN).unwrap();
    let err = vfs.create_file("x").unwrap_err();
    assert_eq!(err.code(), VfsErrorCode::OutOfSpace);
    assert!(vfs.entries().is_empty());
}

#[test]
fn test_failed_append_keeps_stored_prefix() {
    // header + two blocks, with 10 spare bytes
    let mut vfs = Vfs::new(1 + HEADER_LEN + 2 * DATA_BLOCK_LEN + 10).unwrap();
    let file = fresh_file(&mut vfs, "partial");

    vfs.write(file, &pattern(40, 0)).unwrap();
    let err = vfs.append(file, &pattern(60, 9)).unwrap_err();
    assert_eq!(err.code(), VfsErrorCode::OutOfSpace);

    // the second block had 24 spare bytes
    let mut expected = pattern(40, 0);
    expected.extend_from_slice(&pattern(60, 9)[..24]);
    assert_eq!(vfs.read(file).unwrap(), expected);
}

// =============================================================================
// Record Placement
// =============================================================================

fn live_ranges(vfs: &Vfs, handles: &[FileHandle]) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    for handle in handles {
        let start = handle.addr() as usize;
        ranges.push((start, start + HEADER_LEN));
        for block in vfs.chain(*handle).unwrap() {
            ranges.push((block as usize, block as usize + DATA_BLOCK_LEN));
        }
    }
    ranges.sort_unstable();
    ranges
}

#[test]
fn test_random_workload_keeps_records_disjoint() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut vfs = Vfs::new(4096).unwrap();

    // None: never written
    let mut model: BTreeMap<u32, Option<Vec<u8>>> = BTreeMap::new();

    for step in 0..600 {
        let keys: Vec<u32> = model.keys().copied().collect();
        let op = if keys.is_empty() { 0 } else { rng.gen_range(0..4) };

        match op {
            0 => match vfs.create_file(&format!("f{}", step)) {
                Ok(handle) => {
                    model.insert(handle.addr(), None);
                }
                Err(e) => assert_eq!(e.code(), VfsErrorCode::OutOfSpace),
            },
            1 => {
                let addr = keys[rng.gen_range(0..keys.len())];
                let handle = FileHandle::new(addr);
                let data = pattern(rng.gen_range(0..100), step as u8);
                let before = vfs.header(handle).unwrap().data_addr;

                match vfs.write(handle, &data) {
                    Ok(()) => {
                        model.insert(addr, Some(data));
                    }
                    Err(e) => {
                        assert_eq!(e.code(), VfsErrorCode::OutOfSpace);
                        let header = vfs.header(handle).unwrap();
                        if header.data_addr != before {
                            let linked = header.size as usize;
                            model.insert(addr, Some(data[..linked].to_vec()));
                        }
                    }
                }
            }
            2 => {
                let addr = keys[rng.gen_range(0..keys.len())];
                let handle = FileHandle::new(addr);
                let data = pattern(rng.gen_range(1..60), step as u8);
                let before = vfs.header(handle).unwrap().size as usize;

                match (vfs.append(handle, &data), model.get_mut(&addr)) {
                    (Ok(()), Some(Some(contents))) => contents.extend_from_slice(&data),
                    (Err(e), Some(None)) => assert_eq!(e.code(), VfsErrorCode::EmptyTarget),
                    (Err(e), Some(Some(contents))) => {
                        assert_eq!(e.code(), VfsErrorCode::OutOfSpace);
                        let after = vfs.header(handle).unwrap().size as usize;
                        contents.extend_from_slice(&data[..after - before]);
                    }
                    (result, state) => panic!("append {:?} on {:?}", result, state),
                }
            }
            _ => {
                let addr = keys[rng.gen_range(0..keys.len())];
                vfs.remove(FileHandle::new(addr)).unwrap();
                model.remove(&addr);
            }
        }

        for (addr, contents) in &model {
            let handle = FileHandle::new(*addr);
            match contents {
                Some(data) if !data.is_empty() => {
                    assert_eq!(&vfs.read(handle).unwrap(), data, "step {}", step)
                }
                _ => assert_eq!(
                    vfs.read(handle).unwrap_err().code(),
                    VfsErrorCode::EmptyFile
                ),
            }
        }
    }

    let handles: Vec<FileHandle> = model.keys().map(|a| FileHandle::new(*a)).collect();
    let ranges = live_ranges(&vfs, &handles);
    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "records overlap: {:?}", pair);
    }
    for (start, end) in &ranges {
        assert!(*start >= 1 && *end <= vfs.arena().len());
    }

    // every used record belongs to a live entry
    let mut used: Vec<usize> = records(vfs.arena())
        .filter(|(_, tag)| matches!(tag, BlockTag::Used | BlockTag::HeaderUsed))
        .map(|(addr, _)| addr as usize)
        .collect();
    used.sort_unstable();
    let live: Vec<usize> = ranges.iter().map(|(start, _)| *start).collect();
    assert_eq!(used, live, "records leaked");
}

#[test]
fn test_rewrites_do_not_exhaust_disk() {
    let mut vfs = Vfs::new(4096).unwrap();
    let file = fresh_file(&mut vfs, "small");

    for round in 0..1000 {
        let data = pattern(2 + round % 70, round as u8);
        vfs.write(file, &data).unwrap();
        assert_eq!(vfs.read(file).unwrap(), data);
    }

    vfs.remove(file).unwrap();
    let other = fresh_file(&mut vfs, "other");
    vfs.write(other, &pattern(200, 0)).unwrap();
    assert_eq!(vfs.read(other).unwrap(), pattern(200, 0));
}

#[test]
fn test_failed_rewrite_keeps_readable_prefix() {
    // one header and three blocks
    let mut vfs = Vfs::new(1 + HEADER_LEN + 3 * DATA_BLOCK_LEN).unwrap();
    let file = fresh_file(&mut vfs, "f");
    vfs.write(file, &[b'a'; 40]).unwrap();

    // four blocks needed; the two released ones hold blocks two and three
    let err = vfs.write(file, &[b'b'; 100]).unwrap_err();
    assert_eq!(err.code(), VfsErrorCode::OutOfSpace);
    assert!(!err.is_fatal());
    assert_eq!(vfs.last_error(), Some(VfsErrorCode::OutOfSpace));

    let header = vfs.header(file).unwrap();
    assert_eq!(header.size as usize, 3 * BLOCK_SIZE);
    assert_eq!(vfs.read(file).unwrap(), vec![b'b'; 3 * BLOCK_SIZE]);
    assert_eq!(vfs.chain(file).unwrap().len(), 3);
}
