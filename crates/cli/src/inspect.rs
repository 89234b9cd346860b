use crate::SnapshotFile;
use sift_core::storage;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

pub fn stats(file: &SnapshotFile) -> Result<(), Box<dyn std::error::Error>> {
    let index = file.open()?;
    let stats = index.stats();

    println!("Snapshot: {}", file.path.display());
    println!("Keys:     {}", stats.keys);
    println!("Entries:  {}", stats.entries);
    println!("Bytes:    {}", stats.bytes);
    Ok(())
}

pub fn keys(file: &SnapshotFile, key: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let index = file.open()?;
    let view = index.read();

    let names = match key {
        Some(key) => view.ids(key),
        None => view.keys(),
    };
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub fn export(file: &SnapshotFile, out: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let index = file.open()?;
    let view = index.read();

    match out {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(&path)?);
            storage::export_json(&view, &mut writer)?;
            writer.flush()?;
            tracing::info!("Exported {} keys to {}", view.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            storage::export_json(&view, &mut lock)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}
