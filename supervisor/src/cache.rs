use frame_delta_common::config::CacheConfig;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Maps a source frame path to its difference artifact under the cache root:
/// `<root>/<source path>/<file_name>.<extension>`.
///
/// Absolute sources are mirrored without their leading separator, so
/// `/data/frames/a.ppm` lands in `<root>/data/frames/a.ppm/diff.dat`.
#[derive(Debug, Clone)]
pub struct CachePathResolver {
    config: CacheConfig,
}

impl CachePathResolver {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Artifact path for `source`. With `create`, every directory up to the
    /// artifact is created first; existing directories are fine.
    pub fn resolve(&self, source: &Path, create: bool) -> Result<PathBuf, CacheError> {
        self.resolve_named(source, self.artifact_file_name(None), create)
    }

    /// Like [`resolve`](Self::resolve), but when per-frame artifacts are
    /// enabled the file name carries `index` so diffs sharing one inception
    /// do not overwrite each other.
    pub fn resolve_indexed(
        &self,
        source: &Path,
        index: usize,
        create: bool,
    ) -> Result<PathBuf, CacheError> {
        if !self.config.per_frame_artifacts {
            return self.resolve(source, create);
        }
        self.resolve_named(source, self.artifact_file_name(Some(index)), create)
    }

    fn resolve_named(
        &self,
        source: &Path,
        file_name: String,
        create: bool,
    ) -> Result<PathBuf, CacheError> {
        let directory = self.config.root.join(mirror(source)?);

        if create {
            std::fs::create_dir_all(&directory).map_err(|source| CacheError::CreateDirectory {
                path: directory.clone(),
                source,
            })?;
            debug!(path = %directory.display(), "cache directory ready");
        }

        Ok(directory.join(file_name))
    }

    fn artifact_file_name(&self, index: Option<usize>) -> String {
        match index {
            Some(i) => format!("{}_{i}.{}", self.config.file_name, self.config.extension),
            None => format!("{}.{}", self.config.file_name, self.config.extension),
        }
    }

    /// Recover the source frame path an artifact was written for.
    ///
    /// Artifacts under the cache root map back exactly: the root prefix and
    /// the artifact file name are dropped and the remainder is re-anchored at
    /// the filesystem root, since the engine only ever records absolute
    /// sources. Anything else falls back to [`extract_path_components`].
    pub fn source_path_of(&self, artifact: &Path) -> Result<PathBuf, CacheError> {
        let Ok(relative) = artifact.strip_prefix(&self.config.root) else {
            return extract_path_components(&artifact.to_string_lossy()).map(PathBuf::from);
        };
        let source = relative
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| CacheError::InvalidCachePath(artifact.display().to_string()))?;
        Ok(Path::new(std::path::MAIN_SEPARATOR_STR).join(source))
    }
}

/// Strip root and `.` components so the source can be joined under the cache
/// root. `..` would climb out of the cache and is refused.
fn mirror(source: &Path) -> Result<PathBuf, CacheError> {
    let mut mirrored = PathBuf::new();
    for component in source.components() {
        match component {
            Component::Normal(part) => mirrored.push(part),
            Component::Prefix(prefix) => {
                mirrored.push(prefix.as_os_str().to_string_lossy().replace(':', ""))
            }
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir => return Err(CacheError::EscapesRoot(source.to_path_buf())),
        }
    }
    if mirrored.as_os_str().is_empty() {
        return Err(CacheError::InvalidCachePath(source.display().to_string()));
    }
    Ok(mirrored)
}

/// The text strictly between the first and the last `/` of `path`.
///
/// `"/a/b/c"` yields `"b"`; `".inference/frames/a.ppm/diff.dat"` yields
/// `"frames/a.ppm"`. Fewer than two separators, or nothing between them, is
/// an [`CacheError::InvalidCachePath`].
pub fn extract_path_components(path: &str) -> Result<String, CacheError> {
    let invalid = || CacheError::InvalidCachePath(path.to_string());
    let first = path.find('/').ok_or_else(invalid)?;
    let last = path.rfind('/').ok_or_else(invalid)?;
    if first == last || last - first < 2 {
        return Err(invalid());
    }
    Ok(path[first + 1..last].to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to create cache directory {}: {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid cache path: {0}")]
    InvalidCachePath(String),
    #[error("source path {} escapes the cache root", .0.display())]
    EscapesRoot(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(root: &Path, per_frame: bool) -> CachePathResolver {
        CachePathResolver::new(CacheConfig {
            root: root.to_path_buf(),
            per_frame_artifacts: per_frame,
            ..CacheConfig::default()
        })
    }

    #[test]
    fn default_layout() {
        let r = CachePathResolver::new(CacheConfig::default());
        let path = r.resolve(Path::new("frames/inception.ppm"), false).unwrap();
        assert_eq!(path, PathBuf::from(".inference/frames/inception.ppm/diff.dat"));
    }

    #[test]
    fn absolute_sources_are_mirrored_under_root() {
        let r = resolver(Path::new("/cache"), false);
        let path = r.resolve(Path::new("/data/./frames/a.ppm"), false).unwrap();
        assert_eq!(path, PathBuf::from("/cache/data/frames/a.ppm/diff.dat"));
    }

    #[test]
    fn resolve_with_create_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let r = resolver(&tmp.path().join(".inference"), false);
        let source = Path::new("/frames/inception.ppm");

        let first = r.resolve(source, true).unwrap();
        let second = r.resolve(source, true).unwrap();
        assert_eq!(first, second);
        assert!(first.parent().unwrap().is_dir());
        assert!(!first.exists(), "resolver must not touch the artifact itself");
    }

    #[test]
    fn indexed_names_only_when_enabled() {
        let shared = resolver(Path::new("c"), false);
        let per_frame = resolver(Path::new("c"), true);
        let source = Path::new("f/a.ppm");
        assert_eq!(
            shared.resolve_indexed(source, 3, false).unwrap(),
            PathBuf::from("c/f/a.ppm/diff.dat")
        );
        assert_eq!(
            per_frame.resolve_indexed(source, 0, false).unwrap(),
            PathBuf::from("c/f/a.ppm/diff_0.dat")
        );
    }

    #[test]
    fn parent_components_are_refused() {
        let r = resolver(Path::new("c"), false);
        let err = r.resolve(Path::new("../secret.ppm"), false).unwrap_err();
        assert!(matches!(err, CacheError::EscapesRoot(_)));
        assert!(matches!(
            r.resolve(Path::new("/"), false).unwrap_err(),
            CacheError::InvalidCachePath(_)
        ));
    }

    #[test]
    fn source_path_round_trips() {
        let r = resolver(Path::new("/cache"), true);
        let source = Path::new("/data/frames/inception.ppm");
        let artifact = r.resolve_indexed(source, 2, false).unwrap();
        assert_eq!(r.source_path_of(&artifact).unwrap(), source);
    }

    #[test]
    fn source_path_outside_root_uses_legacy_rule() {
        let r = resolver(Path::new("/cache"), false);
        let source = r.source_path_of(Path::new("elsewhere/frames/a.ppm/diff.dat")).unwrap();
        assert_eq!(source, PathBuf::from("frames/a.ppm"));
        assert!(r.source_path_of(Path::new("/cache/diff.dat")).is_err());
    }

    #[test]
    fn extract_between_first_and_last_separator() {
        assert_eq!(extract_path_components("/a/b/c").unwrap(), "b");
        assert_eq!(
            extract_path_components(".inference/frames/inception.ppm/diff.dat").unwrap(),
            "frames/inception.ppm"
        );
    }

    #[test]
    fn extract_needs_two_separators() {
        for path in ["", "diff.dat", "/diff.dat", "a/diff.dat", "a//b"] {
            assert!(
                matches!(extract_path_components(path), Err(CacheError::InvalidCachePath(_))),
                "{path} should be rejected"
            );
        }
    }
}
