use crate::error::BuildError;
use cfgblob_codegen::record::GeneratedRecord;
use std::{fs, io, path::Path};

/// First line of every emitted file.
pub const GENERATED_HEADER: &str = "// @generated by cfgblob-build. Do not edit.";

/// Full file text for one record.
#[must_use]
pub fn render_file(generated: &GeneratedRecord) -> String {
    format!(
        "{GENERATED_HEADER}\n// record: {}\n\n{}\n",
        generated.record, generated.tokens
    )
}

///
/// WriteStatus
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteStatus {
    Written,
    Unchanged,
}

/// Write `contents` unless the file already holds exactly those bytes.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<WriteStatus, BuildError> {
    let wrap = |source: io::Error| BuildError::Write {
        path: path.to_path_buf(),
        source,
    };

    match fs::read(path) {
        Ok(existing) if existing == contents.as_bytes() => return Ok(WriteStatus::Unchanged),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(wrap(err)),
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(wrap)?;
    }
    fs::write(path, contents).map_err(wrap)?;

    Ok(WriteStatus::Written)
}
