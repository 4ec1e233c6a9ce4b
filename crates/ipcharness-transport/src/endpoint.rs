//! Endpoint naming for concurrent sessions.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::uds::MAX_PATH_LEN;

const MAX_PREFIX_LEN: usize = 32;

static NEXT_ENDPOINT: AtomicU64 = AtomicU64::new(0);

/// Generate a socket path that no other session in this or any concurrent
/// process will pick.
///
/// The name combines the sanitized `prefix`, the process id, a timestamp and a
/// process-wide sequence number. The temp directory is used unless the
/// resulting path would exceed the platform `sun_path` limit, in which case
/// `/tmp` is used.
pub fn unique_socket_path(prefix: &str) -> PathBuf {
    let prefix: String = prefix
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_PREFIX_LEN)
        .collect();
    let prefix = if prefix.is_empty() { "ipcharness" } else { &prefix };

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = NEXT_ENDPOINT.fetch_add(1, Ordering::Relaxed);
    let name = format!("{prefix}-{}-{nanos:x}-{seq}.sock", std::process::id());

    let preferred = std::env::temp_dir().join(&name);
    if preferred.as_os_str().len() < MAX_PATH_LEN {
        preferred
    } else {
        PathBuf::from("/tmp").join(name)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn paths_are_unique_within_process() {
        let paths: HashSet<PathBuf> = (0..256)
            .map(|_| unique_socket_path("discovery"))
            .collect();
        assert_eq!(paths.len(), 256);
    }

    #[test]
    fn prefix_is_sanitized_and_bounded() {
        let path = unique_socket_path(&format!("../evil/{}", "x".repeat(100)));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("evilxxxx"));
        assert!(!name.contains('/'));
        assert!(path.as_os_str().len() < MAX_PATH_LEN);
    }

    #[test]
    fn empty_prefix_falls_back_to_default() {
        let path = unique_socket_path("");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("ipcharness-"));
        assert!(name.ends_with(".sock"));
    }
}
