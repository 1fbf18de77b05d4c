//! Bundle extraction.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use super::materialize::MaterializeError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Unpack a gzip-compressed tar archive into `dest`.
///
/// Entries whose paths would land outside `dest` are skipped.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), MaterializeError> {
    let mut file = File::open(archive).map_err(|e| MaterializeError::io(archive, e))?;

    let mut magic = [0u8; 2];
    let is_gzip = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(MaterializeError::io(archive, e)),
    };
    if !is_gzip {
        return Err(MaterializeError::InvalidArchive {
            path: archive.to_path_buf(),
            reason: "not gzip-compressed".into(),
        });
    }

    // Reopen rather than seek so the decoder sees the header.
    let file = File::open(archive).map_err(|e| MaterializeError::io(archive, e))?;
    fs::create_dir_all(dest).map_err(|e| MaterializeError::io(dest, e))?;

    let invalid = |e: std::io::Error| MaterializeError::InvalidArchive {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    };

    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut unpacked = 0usize;
    for entry in tar.entries().map_err(invalid)? {
        let mut entry = entry.map_err(invalid)?;
        let name = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
        if entry.unpack_in(dest).map_err(invalid)? {
            unpacked += 1;
        } else {
            tracing::warn!(entry = %name, "skipped archive entry outside the extraction directory");
        }
    }

    tracing::info!(archive = %archive.display(), dest = %dest.display(), entries = unpacked, "extracted model bundle");
    Ok(())
}

/// Find the model file called `name` under `dir`.
///
/// `dir/name` wins; otherwise the tree is searched depth-first in file-name
/// order and the first match is returned.
pub fn locate_model_file(dir: &Path, name: &str) -> Result<PathBuf, MaterializeError> {
    let direct = dir.join(name);
    if direct.is_file() {
        return Ok(direct);
    }

    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries: Vec<PathBuf> = fs::read_dir(&current)
            .map_err(|e| MaterializeError::io(&current, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        entries.sort();

        let mut subdirs = Vec::new();
        for path in entries {
            if path.is_dir() {
                subdirs.push(path);
            } else if path.file_name().is_some_and(|n| n == name) {
                return Ok(path);
            }
        }
        // Reverse so the stack pops subdirectories in sorted order.
        pending.extend(subdirs.into_iter().rev());
    }

    Err(MaterializeError::ModelFileMissing {
        name: name.to_owned(),
        dir: dir.to_path_buf(),
    })
}
