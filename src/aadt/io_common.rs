use crate::aadt::*;

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The label under which a valid dataset is offered for selection.
pub fn table_label(present_year: i32) -> String {
    format!("AADT {} Table", present_year)
}

pub fn table_file_name(present_year: i32) -> String {
    format!("{}.csv", table_label(present_year))
}

pub fn issue_file_name(present_year: i32) -> String {
    format!("AADT {} issues.csv", present_year)
}

pub fn write_file(path: &Path, contents: &[u8]) -> AadtResult<()> {
    fs::write(path, contents).context(WritingFileSnafu {
        path: path.display().to_string(),
    })
}

/// Writes the file unless it already holds exactly this content.
///
/// Returns true if the file was written.
pub fn write_if_changed(path: &Path, contents: &[u8]) -> AadtResult<bool> {
    if path.is_file() {
        let existing = fs::read(path).context(ReadingFileSnafu {
            path: path.display().to_string(),
        })?;
        if existing == contents {
            debug!("write_if_changed: {} unchanged", path.display());
            return Ok(false);
        }
    }
    write_file(path, contents)?;
    Ok(true)
}

/// Returns true if a file was removed.
pub fn remove_if_exists(path: &Path) -> AadtResult<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).context(RemovingFileSnafu {
        path: path.display().to_string(),
    })?;
    Ok(true)
}

pub fn ensure_dir(path: &Path) -> AadtResult<()> {
    fs::create_dir_all(path).context(WritingFileSnafu {
        path: path.display().to_string(),
    })
}

/// The regular files of a directory, sorted by name.
pub fn list_files(dir: &Path) -> AadtResult<Vec<PathBuf>> {
    let ctx = || ListingDirectorySnafu {
        path: dir.display().to_string(),
    };
    let mut res: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).context(ctx())? {
        let p = entry.context(ctx())?.path();
        if p.is_file() {
            res.push(p);
        }
    }
    res.sort();
    Ok(res)
}

/// Segment bounds as typed by a person: 0 rather than 0.0.
pub fn format_bound(x: f64) -> String {
    format_plain_number(x)
}
