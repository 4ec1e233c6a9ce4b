//! Test-source helpers: marker line lookup and test-id normalization.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::LookupError;

/// Comment prefix that tags the line a test is defined on.
pub const TEST_MARKER_PREFIX: &str = "test_marker--";

/// Find the 1-based line carrying `test_marker--<name>` in `test_file`.
///
/// Parametrization (`test_x[1-2]`) is stripped from the name first, so all
/// parametrized cases resolve to the same line.
pub fn find_test_line_number(
    test_name: &str,
    test_file: impl AsRef<Path>,
) -> Result<usize, LookupError> {
    let path = test_file.as_ref();
    let base_name = test_name
        .split_once('[')
        .map_or(test_name, |(base, _)| base);
    let marker = format!("{TEST_MARKER_PREFIX}{base_name}");

    let io_err = |source| LookupError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    for (index, line) in reader.lines().enumerate() {
        if line.map_err(io_err)?.contains(&marker) {
            return Ok(index + 1);
        }
    }

    Err(LookupError::NotFound {
        test: test_name.to_string(),
        path: path.to_path_buf(),
    })
}

/// Replace the file part of a `file::Class::test` id with `test_path`.
pub fn absolute_test_id(test_id: &str, test_path: &Path) -> String {
    let mut parts = vec![test_path.display().to_string()];
    parts.extend(test_id.split("::").skip(1).map(str::to_string));
    parts.join("::")
}
