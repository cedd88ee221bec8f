//! `OPTIONS-n` files: a JSON snapshot of the options a read-write `DB` was
//! opened with, one entry per column family. The highest numbered file is
//! the current one; older ones are removed once a new one is written.

use std::{fs, io::Write, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    column_family::ColumnFamilyDescriptor,
    db::DBOptions,
    filename::{self, FileType},
    util::{Result, Status},
};

#[derive(Debug, Serialize, Deserialize)]
struct OptionsFile {
    db_options: DBOptions,
    column_families: Vec<ColumnFamilyDescriptor>,
}

/// Write `OPTIONS-<number>` and remove every older options file.
pub fn write_options_file(
    db_path: &Path,
    number: u64,
    db_options: &DBOptions,
    column_families: &[ColumnFamilyDescriptor],
) -> Result<()> {
    let contents = OptionsFile {
        db_options: db_options.clone(),
        column_families: column_families.to_vec(),
    };
    let json = serde_json::to_vec_pretty(&contents)?;

    let path = filename::options_file_name(db_path, number);
    let tmp = path.with_extension("dbtmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, &path)?;

    for old in options_file_numbers(db_path)? {
        if old < number
            && let Err(e) = fs::remove_file(filename::options_file_name(db_path, old))
        {
            log::warn!("failed to remove OPTIONS-{old:06}: {e}");
        }
    }
    Ok(())
}

/// Load the newest options file of a database without opening it.
///
/// Returns the DB options and one descriptor per column family, in the
/// order the families were recorded.
pub fn load_latest_options<P: AsRef<Path>>(
    db_path: P,
) -> Result<(DBOptions, Vec<ColumnFamilyDescriptor>)> {
    let db_path = db_path.as_ref();
    let latest = options_file_numbers(db_path)?
        .into_iter()
        .max()
        .ok_or_else(|| {
            Status::not_found(format!("{}: no OPTIONS file", db_path.display()))
        })?;

    let data = fs::read(filename::options_file_name(db_path, latest))?;
    let file: OptionsFile = serde_json::from_slice(&data)?;
    Ok((file.db_options, file.column_families))
}

fn options_file_numbers(db_path: &Path) -> Result<Vec<u64>> {
    let mut numbers = Vec::new();
    for entry in fs::read_dir(db_path)? {
        let entry = entry?;
        if let Some(FileType::Options(n)) = entry
            .file_name()
            .to_str()
            .and_then(filename::parse_file_name)
        {
            numbers.push(n);
        }
    }
    Ok(numbers)
}
