use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads a corpus file and returns one trimmed name per non-empty line.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
pub(crate) fn read_names<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let contents = fs::read_to_string(filename)?;
	Ok(contents
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(str::to_owned)
		.collect())
}

/// Builds a sibling path with another extension.
///
/// Example:
/// `data/norse.dat` + `"bin"` → `data/norse.bin`
pub(crate) fn sibling_with_extension<P: AsRef<Path>>(input_path: P, extension: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();
	if input_path.file_stem().is_none() {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"));
	}
	Ok(input_path.with_extension(extension))
}

/// True when `derived` exists and is at least as recent as `source`.
pub(crate) fn is_fresh<P: AsRef<Path>, Q: AsRef<Path>>(derived: P, source: Q) -> bool {
	let modified = |path: &Path| fs::metadata(path).and_then(|meta| meta.modified()).ok();
	match (modified(derived.as_ref()), modified(source.as_ref())) {
		(Some(derived), Some(source)) => derived >= source,
		(Some(_), None) => true,
		_ => false,
	}
}

/// Lists the stems of all files with a given extension, sorted.
///
/// Only files directly inside `dir` are considered.
pub(crate) fn list_stems<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut stems = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(stem) = path.file_stem() {
				stems.push(stem.to_string_lossy().to_string());
			}
		}
	}

	stems.sort();
	Ok(stems)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_skip_blank_lines() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join("norse.dat");
		fs::write(&path, "Astrid\r\n\n  Bjorn  \nEir\n").expect("write");
		assert_eq!(read_names(&path).expect("read"), vec!["Astrid", "Bjorn", "Eir"]);
	}

	#[test]
	fn stems_are_filtered_and_sorted() {
		let dir = tempfile::tempdir().expect("tempdir");
		for file in ["welsh.dat", "norse.dat", "norse.bin", "notes.txt"] {
			fs::write(dir.path().join(file), "").expect("write");
		}
		assert_eq!(list_stems(dir.path(), "dat").expect("list"), vec!["norse", "welsh"]);
	}

	#[test]
	fn sibling_paths_swap_extension() {
		assert_eq!(
			sibling_with_extension("data/norse.dat", "bin").expect("path"),
			PathBuf::from("data/norse.bin")
		);
	}
}
