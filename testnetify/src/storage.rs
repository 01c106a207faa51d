use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde_json::Value;
use tracing::info;

use crate::error::Result;

/// Load a full genesis export into memory, keeping key order and the exact
/// text of every number.
pub fn read_genesis(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    info!("Opening {}... (it may take a while)", path.display());
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let genesis = serde_json::from_reader(BufReader::new(file))?;
    info!("Genesis size: {} bytes", size);
    Ok(genesis)
}

/// Write `genesis` to `path`, creating the parent directory first.
///
/// `pretty` selects 2-space indentation over the compact encoding.
pub fn write_genesis(path: impl AsRef<Path>, genesis: &Value, pretty: bool) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    info!("Writing {}... (it may take a while)", path.display());
    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, genesis)?;
    } else {
        serde_json::to_writer(&mut writer, genesis)?;
    }
    writer.flush()?;
    Ok(())
}
