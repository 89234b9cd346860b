//! Behavioural tests for the search index through its public API

use sift_core::{Codec, SearchIndex, SiftError, SyncWrite};
use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

fn populated() -> SearchIndex {
    let index = SearchIndex::new();
    index.set("users", "1", "Alice Smith");
    index.set("users", "2", "bob jones");
    index.set("users", "3", "Carol SMITHERS");
    index.set("orders", "100", "Pending shipment");
    index
}

#[test]
fn test_every_match_contains_query() {
    let index = populated();
    let result = index.search("users", "SMITH", 0, 0);

    let view = index.read();
    for id in &result.found {
        let value = view.get("users", id).unwrap();
        assert!(value.contains("smith"), "{} -> {}", id, value);
    }
    assert_eq!(result.found, vec!["1", "3"]);
    assert_eq!(result.count, 2);
}

#[test]
fn test_count_includes_rows_cut_by_pagination() {
    let index = populated();
    let result = index.search("users", "s", 1, 2);
    // "alice smith", "bob jones", "carol smithers" all contain "s"
    assert_eq!(result.count, 3);
    assert_eq!(result.found, vec!["2"]);
    assert_eq!((result.start, result.stop), (1, 2));
}

#[test]
fn test_inverted_bounds_return_no_rows() {
    let index = populated();
    let result = index.search("users", "", 5, 2);
    assert!(result.found.is_empty());
    assert_eq!((result.start, result.stop), (2, 2));
    assert_eq!(result.count, 3);
}

#[test]
fn test_snapshot_round_trip() {
    for codec in [Codec::MessagePack, Codec::Zstd] {
        let index = populated().with_codec(codec);
        let mut buf = Vec::new();
        index.snapshot(&mut buf).unwrap();

        let restored = SearchIndex::restore(buf.as_slice()).unwrap();
        assert_eq!(restored.stats(), index.stats());

        for (key, query) in [("users", "smith"), ("users", "o"), ("orders", "PEND"), ("none", "x")] {
            let before = index.search(key, query, 0, 0);
            let after = restored.search(key, query, 0, 0);
            assert_eq!(before.found, after.found, "{}/{} with {:?}", key, query, codec);
            assert_eq!(before.count, after.count);
        }
    }
}

#[test]
fn test_snapshot_of_empty_index() {
    let index = SearchIndex::new();
    let mut buf = Vec::new();
    index.snapshot(&mut buf).unwrap();

    let restored = SearchIndex::restore(buf.as_slice()).unwrap();
    assert!(restored.read().is_empty());
}

struct BrokenDisk {
    fail_on_sync: bool,
    written: Vec<u8>,
}

impl Write for BrokenDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_on_sync {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        } else {
            Err(io::Error::other("disk full"))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SyncWrite for BrokenDisk {
    fn sync_to_disk(&mut self) -> io::Result<()> {
        Err(io::Error::other("fsync failed"))
    }
}

#[test]
fn test_write_failure_is_propagated() {
    let index = populated();
    let mut dest = BrokenDisk {
        fail_on_sync: false,
        written: Vec::new(),
    };

    let err = index.snapshot(&mut dest).unwrap_err();
    assert!(err.is_io());
    assert!(err.to_string().contains("disk full"));

    // In-memory state untouched
    assert_eq!(index.search("users", "smith", 0, 0).count, 2);
}

#[test]
fn test_sync_failure_is_propagated() {
    let index = populated();
    let mut dest = BrokenDisk {
        fail_on_sync: true,
        written: Vec::new(),
    };

    match index.snapshot(&mut dest) {
        Err(SiftError::Io(e)) => assert_eq!(e.to_string(), "fsync failed"),
        other => panic!("expected I/O error, got {:?}", other),
    }
    assert!(!dest.written.is_empty());
}

#[test]
fn test_restore_rejects_garbage() {
    let result = SearchIndex::restore(&b"definitely not msgpack"[..]);
    assert!(result.is_err());
}

#[test]
fn test_concurrent_writers_and_readers() {
    let index = Arc::new(SearchIndex::new());
    let mut handles = Vec::new();

    for writer in 0..4 {
        let index = index.clone();
        handles.push(thread::spawn(move || {
            for i in 0..250 {
                index.set("bulk", &format!("{}-{:03}", writer, i), &format!("Item {}", i));
            }
        }));
    }

    for _ in 0..4 {
        let index = index.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let result = index.search("bulk", "item", 0, 10);
                assert!(result.found.len() <= 10);
                assert!(result.found.windows(2).all(|w| w[0] < w[1]));
                let mut buf = Vec::new();
                index.snapshot(&mut buf).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let result = index.search("bulk", "item", 0, 0);
    assert_eq!(result.count, 1000);
    assert_eq!(result.found.len(), 1000);
}

#[test]
fn test_concurrent_deletes_leave_no_empty_keys() {
    let index = Arc::new(SearchIndex::new());
    for key in 0..8 {
        for id in 0..20 {
            index.set(&format!("k{}", key), &id.to_string(), "v");
        }
    }

    let handles: Vec<_> = (0..8)
        .map(|key| {
            let index = index.clone();
            thread::spawn(move || {
                for id in 0..20 {
                    index.delete(&format!("k{}", key), &id.to_string());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(index.read().keys().is_empty());
    assert_eq!(index.stats().entries, 0);
}
