use frame_delta_common::frame::FrameSequence;
use frame_delta_common::image::Image;
use std::path::{Path, PathBuf};
use tracing::{info, trace};

use crate::cache::{CacheError, CachePathResolver};
use crate::codec::{self, CodecError, DifferenceImage};
use crate::decoder::{self, DecodeError};

/// One artifact read back together with the inception it was diffed against.
#[derive(Debug, Clone)]
pub struct RetrievedDifference {
    pub artifact_path: PathBuf,
    pub inception_path: PathBuf,
    pub inception: Image,
    pub difference: DifferenceImage,
}

/// Reads difference artifacts back from a scan of the cache root.
///
/// Artifacts carry no dimensions, so each one is interpreted using the
/// size of its inception frame, found from the artifact's own path. The
/// difference is only exposed, never recombined with the inception: without
/// the sign of each change the original frame is not recoverable.
pub struct RetrievalEngine {
    resolver: CachePathResolver,
    preview_dir: Option<PathBuf>,
}

impl RetrievalEngine {
    pub fn new(resolver: CachePathResolver) -> Self {
        Self {
            resolver,
            preview_dir: None,
        }
    }

    /// Also write every retrieved difference as a PNG into `dir`.
    pub fn with_preview_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.preview_dir = Some(dir.into());
        self
    }

    /// Retrieve every artifact in `artifacts`. The first failure aborts.
    pub fn run(&self, artifacts: &FrameSequence) -> Result<Vec<RetrievedDifference>, RetrievalError> {
        info!(artifacts = artifacts.len(), "retrieving differences");

        if let Some(dir) = &self.preview_dir {
            // A preview inside the cache would be picked up as an artifact next run.
            if dir.starts_with(self.resolver.root()) {
                return Err(RetrievalError::PreviewInsideCache(dir.clone()));
            }
            std::fs::create_dir_all(dir).map_err(|source| RetrievalError::Preview {
                path: dir.clone(),
                source: image::ImageError::IoError(source),
            })?;
        }

        let mut retrieved = Vec::with_capacity(artifacts.len());
        for (index, artifact) in artifacts.iter().enumerate() {
            let item = self.retrieve(&artifact.path)?;
            if let Some(dir) = &self.preview_dir {
                write_preview(&dir.join(format!("diff_{index:04}.png")), &item.difference)?;
            }
            retrieved.push(item);
        }

        info!(retrieved = retrieved.len(), "retrieval complete");
        Ok(retrieved)
    }

    /// Read back a single artifact.
    pub fn retrieve(&self, artifact: &Path) -> Result<RetrievedDifference, RetrievalError> {
        let inception_path = self.resolver.source_path_of(artifact)?;
        info!(
            inception = %inception_path.display(),
            artifact = %artifact.display(),
            "reading difference"
        );

        let inception = decoder::decode_file(&inception_path)?;
        let data = std::fs::read(artifact).map_err(|source| RetrievalError::ReadArtifact {
            path: artifact.to_path_buf(),
            source,
        })?;
        let difference = codec::decode(
            &data,
            inception.width(),
            inception.height(),
            inception.max_channel_value(),
        )?;

        for (y, row) in difference.rows().enumerate() {
            for (x, p) in row.iter().enumerate() {
                trace!(x, y, r = p.r, g = p.g, b = p.b, "difference pixel");
            }
        }
        info!(
            width = difference.width(),
            height = difference.height(),
            peak = difference.peak(),
            mean = format!("{:.3}", difference.mean()),
            "difference retrieved"
        );

        Ok(RetrievedDifference {
            artifact_path: artifact.to_path_buf(),
            inception_path,
            inception,
            difference,
        })
    }
}

fn write_preview(path: &Path, difference: &DifferenceImage) -> Result<(), RetrievalError> {
    difference
        .to_rgb_image()
        .save(path)
        .map_err(|source| RetrievalError::Preview {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to read difference artifact {}: {source}", .path.display())]
    ReadArtifact {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write preview {}: {source}", .path.display())]
    Preview {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("preview directory {} is inside the cache root", .0.display())]
    PreviewInsideCache(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DifferenceEngine;
    use crate::scan::{scan, scan_artifacts};
    use frame_delta_common::config::{CacheConfig, Config};
    use frame_delta_common::image::Pixel;
    use std::fs;

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: PathBuf,
        cache: CacheConfig,
    }

    fn fixture(per_frame: bool) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let frames = root.join("frames");
        fs::create_dir(&frames).unwrap();
        fs::write(
            frames.join("inception.ppm"),
            "2 2 255\n100 100 100 100 100 100 100 100 100 100 100 100",
        )
        .unwrap();
        fs::write(
            frames.join("frame_1.ppm"),
            "2 2 255\n150 80 100 150 80 100 150 80 100 150 80 100",
        )
        .unwrap();
        fs::write(
            frames.join("frame_0.ppm"),
            "2 2 255\n90 100 100 90 100 100 90 100 100 90 100 100",
        )
        .unwrap();

        let cache = CacheConfig {
            root: root.join(".inference"),
            per_frame_artifacts: per_frame,
            ..CacheConfig::default()
        };
        let config = Config {
            cache: cache.clone(),
            ..Config::default()
        };
        let seq = scan(&frames, false, None).unwrap();
        DifferenceEngine::from_config(&config).unwrap().run(&seq).unwrap();

        Fixture {
            _tmp: tmp,
            root,
            cache,
        }
    }

    #[test]
    fn reads_back_stored_difference() {
        let fx = fixture(false);
        let artifacts = scan_artifacts(&fx.cache.root).unwrap();
        assert_eq!(artifacts.len(), 1);

        let engine = RetrievalEngine::new(CachePathResolver::new(fx.cache.clone()));
        let retrieved = engine.run(&artifacts).unwrap();

        assert_eq!(retrieved.len(), 1);
        let item = &retrieved[0];
        assert_eq!(item.inception_path, fx.root.join("frames/inception.ppm"));
        assert_eq!(item.inception.dimensions(), (2, 2));
        // frame_0 is visited last, so its difference is the one left on disk.
        assert!(item
            .difference
            .pixels()
            .iter()
            .all(|p| *p == Pixel::new(10, 0, 0)));
    }

    #[test]
    fn reads_back_every_per_frame_difference() {
        let fx = fixture(true);
        let artifacts = scan_artifacts(&fx.cache.root).unwrap();
        let engine = RetrievalEngine::new(CachePathResolver::new(fx.cache.clone()));
        let retrieved = engine.run(&artifacts).unwrap();

        let peaks: Vec<u8> = retrieved.iter().map(|r| r.difference.peak()).collect();
        // diff_0 holds frame_1 (50, 20, 0), diff_1 holds frame_0 (10, 0, 0).
        assert_eq!(peaks, [50, 10]);
        assert!(retrieved[0]
            .difference
            .pixels()
            .iter()
            .all(|p| *p == Pixel::new(50, 20, 0)));
    }

    #[test]
    fn writes_previews_outside_cache() {
        let fx = fixture(true);
        let artifacts = scan_artifacts(&fx.cache.root).unwrap();
        let previews = fx.root.join("previews");
        let engine =
            RetrievalEngine::new(CachePathResolver::new(fx.cache.clone())).with_preview_dir(&previews);
        engine.run(&artifacts).unwrap();

        let png = image::open(previews.join("diff_0000.png")).unwrap().to_rgb8();
        assert_eq!(png.dimensions(), (2, 2));
        assert_eq!(png.get_pixel(0, 0).0, [50, 20, 0]);
        assert!(previews.join("diff_0001.png").is_file());
    }

    #[test]
    fn preview_inside_cache_is_refused() {
        let fx = fixture(false);
        let artifacts = scan_artifacts(&fx.cache.root).unwrap();
        let engine = RetrievalEngine::new(CachePathResolver::new(fx.cache.clone()))
            .with_preview_dir(fx.cache.root.join("previews"));
        assert!(matches!(
            engine.run(&artifacts),
            Err(RetrievalError::PreviewInsideCache(_))
        ));
    }

    #[test]
    fn truncated_artifact_is_an_error() {
        let fx = fixture(false);
        let artifact = scan_artifacts(&fx.cache.root).unwrap().frames()[0].path.clone();
        fs::write(&artifact, [1, 2, 3]).unwrap();

        let engine = RetrievalEngine::new(CachePathResolver::new(fx.cache.clone()));
        let err = engine.retrieve(&artifact).unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Codec(CodecError::TruncatedData { expected: 12, got: 3 })
        ));
    }

    #[test]
    fn missing_inception_is_an_error() {
        let fx = fixture(false);
        let artifact = scan_artifacts(&fx.cache.root).unwrap().frames()[0].path.clone();
        fs::remove_file(fx.root.join("frames/inception.ppm")).unwrap();

        let engine = RetrievalEngine::new(CachePathResolver::new(fx.cache.clone()));
        assert!(matches!(
            engine.retrieve(&artifact),
            Err(RetrievalError::Decode(DecodeError::FileUnopenable { .. }))
        ));
    }

    #[test]
    fn artifact_without_source_directory_is_invalid() {
        let fx = fixture(false);
        let stray = fx.cache.root.join("diff.dat");
        fs::write(&stray, [0; 12]).unwrap();

        let engine = RetrievalEngine::new(CachePathResolver::new(fx.cache.clone()));
        assert!(matches!(
            engine.retrieve(&stray),
            Err(RetrievalError::Cache(CacheError::InvalidCachePath(_)))
        ));
    }

    #[test]
    fn large_groups_exceeding_the_frame_limit_are_retrieved() {
        let tmp = tempfile::tempdir().unwrap();
        let frames = tmp.path().join("frames");
        for dir in ["a", "b"] {
            fs::create_dir_all(frames.join(dir)).unwrap();
            for i in 0..60 {
                fs::write(frames.join(dir).join(format!("f{i:03}.ppm")), "1 1 255\n7 7 7").unwrap();
            }
        }
        let cache = CacheConfig {
            root: tmp.path().join(".inference"),
            per_frame_artifacts: true,
            ..CacheConfig::default()
        };
        let config = Config {
            cache: cache.clone(),
            ..Config::default()
        };

        let seq = scan(&frames, true, Some(100)).unwrap();
        let report = DifferenceEngine::from_config(&config).unwrap().run(&seq).unwrap();
        assert_eq!(report.artifacts.len(), 119);

        let artifacts = scan_artifacts(&cache.root).unwrap();
        assert_eq!(artifacts.len(), 119);
        let retrieved = RetrievalEngine::new(CachePathResolver::new(cache))
            .run(&artifacts)
            .unwrap();
        assert_eq!(retrieved.len(), 119);
        assert!(retrieved.iter().all(|r| r.difference.is_zero()));
        // Read back in write order: diff_2 before diff_10.
        assert!(retrieved[2].artifact_path.ends_with("diff_2.dat"));
        assert!(retrieved[10].artifact_path.ends_with("diff_10.dat"));
    }
}
