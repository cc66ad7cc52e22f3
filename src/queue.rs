use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::errors::{AppError, AppResult};

/// Two-stage URL queue over a pair of line-delimited text files.
///
/// A URL lives in exactly one of the two files: `pending` (collected but
/// unprocessed) or `finished` (processed, success or already-known). The
/// queue is single-writer; concurrent instances over the same files lose
/// updates on the pending rewrite.
pub struct UrlQueue {
    pending_path: PathBuf,
    finished_path: PathBuf,
}

impl UrlQueue {
    pub fn new<P: AsRef<Path>, F: AsRef<Path>>(pending: P, finished: F) -> Self {
        Self {
            pending_path: pending.as_ref().to_path_buf(),
            finished_path: finished.as_ref().to_path_buf(),
        }
    }

    pub fn pending_path(&self) -> &Path {
        &self.pending_path
    }

    pub fn finished_path(&self) -> &Path {
        &self.finished_path
    }

    /// Ordered view of the pending URLs. Blank lines are ignored,
    /// surrounding whitespace is trimmed. Missing file reads as empty.
    pub fn snapshot(&self) -> AppResult<Vec<String>> {
        read_url_lines(&self.pending_path)
    }

    /// Ordered view of the finished log. Missing file reads as empty.
    pub fn finished(&self) -> AppResult<Vec<String>> {
        read_url_lines(&self.finished_path)
    }

    /// Truncates the pending file, discarding any uncommitted URLs from a
    /// previous collection run. The finished log is left alone.
    pub fn reset_pending(&self) -> AppResult<()> {
        if let Some(parent) = self.pending_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.pending_path, "")?;
        debug!(path = %self.pending_path.display(), "pending queue reset");
        Ok(())
    }

    /// Appends one URL to the pending file, creating it if absent. The
    /// caller is responsible for per-run dedup; the queue does not inspect
    /// existing content.
    pub fn enqueue(&self, url: &str) -> AppResult<()> {
        if let Some(parent) = self.pending_path.parent() {
            fs::create_dir_all(parent)?;
        }
        append_line(&self.pending_path, url)?;
        trace!(url, "url enqueued");
        Ok(())
    }

    /// Moves `url` from pending to finished: removes the first exact match
    /// from the pending file, rewrites the remainder in original order,
    /// then appends the URL to the finished log.
    ///
    /// Fails with [`AppError::QueueInconsistency`] before touching either
    /// file when the URL is not present in pending — that means the
    /// caller's in-memory view diverged from disk.
    pub fn migrate(&self, url: &str) -> AppResult<()> {
        let mut pending = self.snapshot()?;
        let position = pending
            .iter()
            .position(|line| line == url)
            .ok_or_else(|| AppError::QueueInconsistency(url.to_string()))?;
        pending.remove(position);

        let mut contents = pending.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(&self.pending_path, contents)?;
        append_line(&self.finished_path, url)?;

        debug!(url, "url migrated to finished");
        Ok(())
    }
}

fn read_url_lines(path: &Path) -> AppResult<Vec<String>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(AppError::Io(err)),
    };
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn append_line(path: &Path, line: &str) -> AppResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn queue_in(dir: &Path) -> UrlQueue {
        UrlQueue::new(dir.join("target_urls.txt"), dir.join("finished_urls.txt"))
    }

    #[test]
    fn snapshot_ignores_blank_lines_and_missing_file() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        assert!(queue.snapshot().unwrap().is_empty());

        fs::write(
            queue.pending_path(),
            "https://naver.me/a\n\n  https://naver.me/b  \n\n",
        )
        .unwrap();
        assert_eq!(
            queue.snapshot().unwrap(),
            vec!["https://naver.me/a", "https://naver.me/b"]
        );
    }

    #[test]
    fn migrate_moves_first_match_and_preserves_order() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        for url in ["https://a", "https://b", "https://c"] {
            queue.enqueue(url).unwrap();
        }

        queue.migrate("https://b").unwrap();

        assert_eq!(queue.snapshot().unwrap(), vec!["https://a", "https://c"]);
        assert_eq!(queue.finished().unwrap(), vec!["https://b"]);
    }

    #[test]
    fn migrate_conserves_queue_union() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue("https://a").unwrap();
        queue.enqueue("https://b").unwrap();

        queue.migrate("https://a").unwrap();
        queue.migrate("https://b").unwrap();

        assert!(queue.snapshot().unwrap().is_empty());
        assert_eq!(queue.finished().unwrap(), vec!["https://a", "https://b"]);
    }

    #[test]
    fn migrate_of_absent_url_leaves_files_untouched() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue("https://a").unwrap();
        queue.migrate("https://a").unwrap();

        let pending_before = fs::read(queue.pending_path()).unwrap();
        let finished_before = fs::read(queue.finished_path()).unwrap();

        let err = queue.migrate("https://missing").unwrap_err();
        assert!(matches!(err, AppError::QueueInconsistency(url) if url == "https://missing"));

        assert_eq!(fs::read(queue.pending_path()).unwrap(), pending_before);
        assert_eq!(fs::read(queue.finished_path()).unwrap(), finished_before);
    }

    #[test]
    fn reset_pending_truncates_only_pending() {
        let dir = tempdir().unwrap();
        let queue = queue_in(dir.path());
        queue.enqueue("https://a").unwrap();
        queue.migrate("https://a").unwrap();
        queue.enqueue("https://leftover").unwrap();

        queue.reset_pending().unwrap();

        assert!(queue.snapshot().unwrap().is_empty());
        assert_eq!(queue.finished().unwrap(), vec!["https://a"]);
    }
}
