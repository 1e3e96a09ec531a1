use frame_delta_common::frame::{Frame, FrameKind, FrameSequence};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Scan `root` into an ordered [`FrameSequence`].
///
/// Entries whose name starts with `.` are skipped (which covers `.` and `..`).
/// Regular files are collected; directories are descended into only when
/// `recursive` is set; every other kind is ignored. Entries of one directory
/// come out in [`name_order`], and sub-directories are visited after the files
/// of their parent using an explicit work-list rather than recursion.
///
/// `max_entries_per_dir` bounds the visible entries of each directory level;
/// `None` disables the check.
pub fn scan(
    root: &Path,
    recursive: bool,
    max_entries_per_dir: Option<usize>,
) -> Result<FrameSequence, ScanError> {
    Walk {
        recursive,
        max_entries_per_dir,
        skip_hidden: true,
    }
    .run(root)
}

/// Collect every artifact below the cache root.
///
/// The cache mirrors absolute source paths, so hidden directories such as
/// `~/.local` legitimately appear inside it and are walked like any other.
/// The tree is always walked in full and no per-directory limit applies:
/// one inception directory holds every diff of its group.
pub fn scan_artifacts(cache_root: &Path) -> Result<FrameSequence, ScanError> {
    Walk {
        recursive: true,
        max_entries_per_dir: None,
        skip_hidden: false,
    }
    .run(cache_root)
}

struct Walk {
    recursive: bool,
    max_entries_per_dir: Option<usize>,
    skip_hidden: bool,
}

impl Walk {
    fn run(&self, root: &Path) -> Result<FrameSequence, ScanError> {
        let resolved = root
            .canonicalize()
            .map_err(|source| ScanError::DirectoryUnopenable {
                path: root.to_path_buf(),
                source,
            })?;

        let mut sequence = FrameSequence::new(resolved);
        let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = self.read_entries(&dir)?;

            if let Some(limit) = self.max_entries_per_dir {
                if entries.len() > limit {
                    return Err(ScanError::CapacityExceeded {
                        path: dir,
                        limit,
                        found: entries.len(),
                    });
                }
            }

            entries.sort_by(|a, b| name_order(&a.name, &b.name));

            let mut subdirs = Vec::new();
            for entry in entries {
                match entry.kind {
                    FrameKind::Directory if self.recursive => subdirs.push(entry.path),
                    FrameKind::Regular => sequence.push(entry),
                    kind => debug!(path = %entry.path.display(), %kind, "skipping entry"),
                }
            }

            // Reversed so the work-list pops sub-directories in name order.
            pending.extend(subdirs.into_iter().rev());
        }

        debug!(
            root = %sequence.root().display(),
            frames = sequence.len(),
            recursive = self.recursive,
            "directory scanned"
        );
        Ok(sequence)
    }

    fn read_entries(&self, dir: &Path) -> Result<Vec<Frame>, ScanError> {
        let read_dir = std::fs::read_dir(dir).map_err(|source| ScanError::DirectoryUnopenable {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| ScanError::ReadEntry {
                path: dir.to_path_buf(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.skip_hidden && name.starts_with('.') {
                continue;
            }
            let kind = entry
                .file_type()
                .map(|t| FrameKind::from_file_type(&t))
                .unwrap_or(FrameKind::Unknown);
            entries.push(Frame::new(name, entry.path(), kind));
        }
        Ok(entries)
    }
}

/// Order names with runs of digits compared by value, so `diff_2.dat` sorts
/// before `diff_10.dat`. Equal values with different zero padding fall back
/// to the shorter run first, keeping the order total.
pub fn name_order(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (a.as_bytes(), b.as_bytes());
    loop {
        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let (digits_a, rest_a) = split_digits(a);
                let (digits_b, rest_b) = split_digits(b);
                let (value_a, value_b) = (strip_zeros(digits_a), strip_zeros(digits_b));
                let ord = value_a
                    .len()
                    .cmp(&value_b.len())
                    .then_with(|| value_a.cmp(value_b))
                    .then_with(|| digits_a.len().cmp(&digits_b.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
                a = rest_a;
                b = rest_b;
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(y);
                }
                a = &a[1..];
                b = &b[1..];
            }
        }
    }
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let n = s.iter().take_while(|c| c.is_ascii_digit()).count();
    s.split_at(n)
}

fn strip_zeros(digits: &[u8]) -> &[u8] {
    let start = digits.iter().position(|&c| c != b'0').unwrap_or(digits.len());
    &digits[start..]
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("could not open directory {}: {source}", .path.display())]
    DirectoryUnopenable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read an entry of {}: {source}", .path.display())]
    ReadEntry {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("directory {} has {found} entries, exceeding the limit of {limit}", .path.display())]
    CapacityExceeded {
        path: PathBuf,
        limit: usize,
        found: usize,
    },
}
