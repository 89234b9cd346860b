//! Snapshot codec
//!
//! A snapshot is a MessagePack document with named fields, so the layout is
//! self-describing: `{ "version": u32, "entries": { key: { id: value } } }`.
//! With [`Codec::Zstd`] the same bytes are wrapped in a zstd frame. Decoding
//! sniffs the zstd magic number, so either form can be restored without
//! knowing how it was written.

use crate::error::{Result, SiftError};
use crate::index::Entries;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

pub const SNAPSHOT_VERSION: u32 = 1;

pub(crate) const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// On-disk encoding used when writing snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Codec {
    #[default]
    MessagePack,
    Zstd,
}

/// A destination that can be forced to durable storage once written.
pub trait SyncWrite: Write {
    fn sync_to_disk(&mut self) -> io::Result<()>;
}

impl SyncWrite for File {
    fn sync_to_disk(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl SyncWrite for Vec<u8> {
    fn sync_to_disk(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: SyncWrite> SyncWrite for BufWriter<W> {
    fn sync_to_disk(&mut self) -> io::Result<()> {
        self.flush()?;
        self.get_mut().sync_to_disk()
    }
}

impl<W: SyncWrite + ?Sized> SyncWrite for &mut W {
    fn sync_to_disk(&mut self) -> io::Result<()> {
        (**self).sync_to_disk()
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    entries: &'a Entries,
}

#[derive(Deserialize)]
struct SnapshotFile {
    version: u32,
    entries: Entries,
}

/// Encodes the full mapping into snapshot bytes.
pub(crate) fn encode(entries: &Entries, codec: Codec) -> Result<Vec<u8>> {
    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        entries,
    };
    let bytes = rmp_serde::to_vec_named(&snapshot)?;

    match codec {
        Codec::MessagePack => Ok(bytes),
        Codec::Zstd => Ok(zstd::encode_all(&bytes[..], 0)?),
    }
}

/// The codec a snapshot was written with.
pub(crate) fn detect(bytes: &[u8]) -> Codec {
    if bytes.starts_with(&ZSTD_MAGIC) {
        Codec::Zstd
    } else {
        Codec::MessagePack
    }
}

/// Decodes snapshot bytes, compressed or not.
pub(crate) fn decode(bytes: &[u8]) -> Result<Entries> {
    let file: SnapshotFile = if detect(bytes) == Codec::Zstd {
        let raw = zstd::decode_all(bytes)?;
        rmp_serde::from_slice(&raw)?
    } else {
        rmp_serde::from_slice(bytes)?
    };

    if file.version != SNAPSHOT_VERSION {
        return Err(SiftError::UnsupportedVersion {
            found: file.version,
            expected: SNAPSHOT_VERSION,
        });
    }

    Ok(file.entries)
}

/// Reads a whole snapshot, returning its entries and the codec it used.
pub(crate) fn read_all<R: Read>(mut src: R) -> Result<(Entries, Codec)> {
    let mut bytes = Vec::new();
    src.read_to_end(&mut bytes)?;
    let entries = decode(&bytes)?;
    Ok((entries, detect(&bytes)))
}
