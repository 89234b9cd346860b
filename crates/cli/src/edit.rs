use crate::SnapshotFile;
use tracing::info;

pub fn set(
    file: &SnapshotFile,
    key: &str,
    id: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = file.open()?;
    index.set(key, id, value);
    file.save(&index)?;
    info!("Stored {}/{}", key, id);
    Ok(())
}

pub fn delete(file: &SnapshotFile, key: &str, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let index = file.open()?;
    index.delete(key, id);
    file.save(&index)?;
    info!("Deleted {}/{}", key, id);
    Ok(())
}

pub fn flush(file: &SnapshotFile) -> Result<(), Box<dyn std::error::Error>> {
    let index = file.open()?;
    let stats = index.stats();
    index.flush();
    file.save(&index)?;
    info!("Flushed {} keys ({} entries)", stats.keys, stats.entries);
    Ok(())
}
