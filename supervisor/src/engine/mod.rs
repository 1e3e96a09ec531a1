mod state;

use frame_delta_common::config::Config;
use frame_delta_common::frame::{Frame, FrameSequence};
use frame_delta_common::image::Image;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cache::{CacheError, CachePathResolver};
use crate::codec::{self, CodecError};
use crate::decoder::{self, DecodeError};
use crate::selection::{self, InceptionStrategy};

use state::{GroupState, Inception};

/// Summary of one engine run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EngineReport {
    pub frames_visited: usize,
    pub groups: usize,
    /// Artifact paths in the order they were written. The same path can
    /// appear more than once when per-frame artifacts are disabled.
    pub artifacts: Vec<PathBuf>,
}

/// Delta-encodes a frame sequence against per-group inception frames.
///
/// Frames are visited last-listed first. The first frame of a group becomes
/// its inception and is stored whole (it is simply left in place); every
/// later frame is diffed against it and the difference is written under the
/// cache root, keyed on the inception's path. The strategy decides when a
/// frame should start a new group instead. Any failure aborts the run.
pub struct DifferenceEngine {
    resolver: CachePathResolver,
    strategy: Box<dyn InceptionStrategy>,
}

impl DifferenceEngine {
    pub fn new(resolver: CachePathResolver, strategy: Box<dyn InceptionStrategy>) -> Self {
        Self { resolver, strategy }
    }

    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let strategy = selection::from_config(&config.engine)
            .ok_or_else(|| EngineError::UnknownStrategy(config.engine.inception.clone()))?;
        Ok(Self::new(CachePathResolver::new(config.cache.clone()), strategy))
    }

    pub fn run(&mut self, frames: &FrameSequence) -> Result<EngineReport, EngineError> {
        info!(
            frames = frames.len(),
            strategy = self.strategy.name(),
            cache_root = %self.resolver.root().display(),
            "computing differences"
        );

        let mut report = EngineReport::default();
        let mut state = GroupState::AwaitingInception;

        for frame in frames.iter().rev() {
            report.frames_visited += 1;
            let current = decoder::decode_file(&frame.path)?;

            state = match state {
                GroupState::AwaitingInception => self.begin_group(frame, current, &mut report)?,
                GroupState::HasInception(inception) => {
                    self.handle_frame(inception, frame, current, &mut report)?
                }
            };
        }

        info!(
            frames = report.frames_visited,
            groups = report.groups,
            artifacts = report.artifacts.len(),
            "differences stored"
        );
        Ok(report)
    }

    fn begin_group(
        &self,
        frame: &Frame,
        image: Image,
        report: &mut EngineReport,
    ) -> Result<GroupState, EngineError> {
        let source = std::path::absolute(&frame.path).map_err(|source| EngineError::ResolveSource {
            path: frame.path.clone(),
            source,
        })?;
        report.groups += 1;
        info!(
            name = frame.name,
            path = %frame.path.display(),
            width = image.width(),
            height = image.height(),
            group = report.groups,
            "inception frame"
        );
        Ok(GroupState::HasInception(Inception::new(image, frame.clone(), source)))
    }

    fn handle_frame(
        &mut self,
        mut inception: Inception,
        frame: &Frame,
        current: Image,
        report: &mut EngineReport,
    ) -> Result<GroupState, EngineError> {
        if self.strategy.should_reselect(&inception.image, &current) {
            info!(
                strategy = self.strategy.name(),
                previous = inception.frame.name,
                diffs = inception.diffs,
                "closing frame group"
            );
            return self.begin_group(frame, current, report);
        }

        let diff = codec::compute_difference(&inception.image, &current)?;
        let artifact = self
            .resolver
            .resolve_indexed(&inception.source, inception.diffs, true)?;
        write_artifact(&artifact, &codec::encode(&diff))?;

        info!(
            kind = %frame.kind,
            name = frame.name,
            path = %frame.path.display(),
            "frame differenced"
        );
        debug!(
            artifact = %artifact.display(),
            unchanged = diff.is_zero(),
            peak = diff.peak(),
            mean = format!("{:.3}", diff.mean()),
            "difference written"
        );

        inception.diffs += 1;
        report.artifacts.push(artifact);
        Ok(GroupState::HasInception(inception))
    }
}

/// Write (or overwrite) an artifact in full.
fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), EngineError> {
    let write = || -> std::io::Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        file.write_all(bytes)?;
        file.flush()
    };
    write().map_err(|source| EngineError::WriteArtifact {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to write difference artifact {}: {source}", .path.display())]
    WriteArtifact {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not resolve frame path {}: {source}", .path.display())]
    ResolveSource {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unknown inception strategy `{0}`")]
    UnknownStrategy(String),
}
