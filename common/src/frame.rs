use std::fmt;
use std::path::{Path, PathBuf};

/// The file-type tag of a scanned directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Regular,
    Directory,
    Symlink,
    Fifo,
    Socket,
    BlockDevice,
    CharDevice,
    Unknown,
}

impl FrameKind {
    /// Classify a file type without following symlinks.
    pub fn from_file_type(file_type: &std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            return Self::Symlink;
        }
        if file_type.is_dir() {
            return Self::Directory;
        }
        if file_type.is_file() {
            return Self::Regular;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_fifo() {
                return Self::Fifo;
            }
            if file_type.is_socket() {
                return Self::Socket;
            }
            if file_type.is_block_device() {
                return Self::BlockDevice;
            }
            if file_type.is_char_device() {
                return Self::CharDevice;
            }
        }

        Self::Unknown
    }

    /// Human-readable label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Regular => "Regular file",
            Self::Directory => "Directory",
            Self::Symlink => "Symbolic link",
            Self::Fifo => "FIFO",
            Self::Socket => "Socket",
            Self::BlockDevice => "Block device",
            Self::CharDevice => "Character device",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One scanned directory entry. Immutable once produced by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub path: PathBuf,
    pub kind: FrameKind,
}

impl Frame {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, kind: FrameKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
        }
    }
}

/// Ordered frames read from one directory scan, plus the resolved directory.
#[derive(Debug, Clone, Default)]
pub struct FrameSequence {
    root: PathBuf,
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            frames: Vec::new(),
        }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Absolute path of the scanned directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

impl FromIterator<Frame> for FrameSequence {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            root: PathBuf::new(),
            frames: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels() {
        assert_eq!(FrameKind::Directory.to_string(), "Directory");
        assert_eq!(FrameKind::Regular.to_string(), "Regular file");
        assert_eq!(FrameKind::CharDevice.label(), "Character device");
    }

    #[test]
    fn sequence_keeps_insertion_order() {
        let mut seq = FrameSequence::new("/frames");
        seq.push(Frame::new("b.ppm", "/frames/b.ppm", FrameKind::Regular));
        seq.push(Frame::new("a.ppm", "/frames/a.ppm", FrameKind::Regular));

        let names: Vec<&str> = seq.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["b.ppm", "a.ppm"]);
        assert_eq!(seq.root(), Path::new("/frames"));
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn classify_real_entries() {
        let dir = std::env::temp_dir();
        let meta = std::fs::symlink_metadata(&dir).unwrap();
        assert_eq!(FrameKind::from_file_type(&meta.file_type()), FrameKind::Directory);
    }
}
