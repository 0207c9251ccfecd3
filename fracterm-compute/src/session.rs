//! One exploration session: configuration, command queue and last good frame.

use std::time::Instant;

use fracterm_core::{
    ColorBuffer, InvalidParameters, IterationBuffer, PrecisionManager, PrecisionTier, TierChange,
};
use thiserror::Error;

use crate::backend::{BackendError, BackendKind, ComputeBackend, FrameSnapshot};
use crate::cancellation::GenerationCounter;
use crate::colorizers::PaletteMapper;
use crate::commands::{Command, Effect};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::notice::Notice;
use crate::render_config::{EngineConfig, RenderConfig};
use crate::stats::FrameStats;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] InvalidParameters),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A completed, colored frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Counts produced frames, starting at 1.
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub colors: ColorBuffer,
    pub iterations: IterationBuffer,
    pub tier: PrecisionTier,
    pub backend: BackendKind,
}

/// Outcome of one render request.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Generation the frame's buffer was computed for. A recolored frame
    /// keeps the generation of its retained buffer.
    pub generation: u64,
    /// Version of the configuration the frame was rendered from.
    pub config_version: u64,
    /// `None` when no new frame was produced; the last good frame stays valid.
    pub frame: Option<Frame>,
    /// Present whenever `frame` is.
    pub stats: Option<FrameStats>,
    pub notices: Vec<Notice>,
}

struct Retained {
    generation: u64,
    buffer: IterationBuffer,
    tier: PrecisionTier,
    backend: BackendKind,
}

/// Owns the render configuration and turns queued commands into frames.
///
/// Commands are queued at any time and applied together at the start of the
/// next [`Session::render_frame`], so a frame never sees a half-applied batch.
pub struct Session {
    config: RenderConfig,
    precision: PrecisionManager,
    dispatcher: Dispatcher,
    mapper: PaletteMapper,
    generations: GenerationCounter,
    queue: Vec<Command>,
    retained: Option<Retained>,
    /// The retained buffer no longer matches the configuration.
    stale: bool,
    sequence: u64,
}

impl Session {
    pub fn new(engine: &EngineConfig, config: RenderConfig) -> Result<Self, SessionError> {
        engine.validate()?;
        config.validate()?;
        let precision = PrecisionManager::new(engine.precision.clone())?;
        let mut dispatcher = Dispatcher::new(engine)?;
        dispatcher.set_preferred(config.backend);

        // Start at the tier the initial view needs.
        let mut config = config;
        let tier = precision.select(config.viewport.tier(), &config.viewport);
        if tier != config.viewport.tier() {
            config.viewport = config
                .viewport
                .with_tier(tier)
                .map_err(InvalidParameters::from)?;
        }

        Ok(Self {
            mapper: PaletteMapper::new(config.palette.clone())?,
            config,
            precision,
            dispatcher,
            generations: GenerationCounter::new(),
            queue: Vec::new(),
            retained: None,
            stale: true,
            sequence: 0,
        })
    }

    /// Install a GPU backend; it is used whenever the configuration prefers it.
    pub fn with_gpu(mut self, gpu: Box<dyn ComputeBackend>) -> Self {
        self.dispatcher = self.dispatcher.with_gpu(gpu);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Shared counter; advancing it abandons the frame in progress.
    pub fn generations(&self) -> GenerationCounter {
        self.generations.clone()
    }

    pub fn queue(&mut self, command: Command) {
        self.queue.push(command);
    }

    /// Apply every queued command, then produce a frame.
    pub fn render_frame(&mut self) -> FrameReport {
        let started = Instant::now();
        let mut notices = self.apply_queued();

        let reusable = self
            .retained
            .as_ref()
            .filter(|_| !self.stale)
            .map(|retained| retained.generation);
        let (generation, frame) = match reusable {
            Some(generation) => (generation, self.recolor()),
            None => self.compute(&mut notices),
        };
        notices.extend(self.dispatcher.take_notices());

        let stats = frame
            .as_ref()
            .map(|frame| FrameStats::collect(&frame.iterations, started.elapsed()));
        FrameReport {
            generation,
            config_version: self.config.version,
            frame,
            stats,
            notices,
        }
    }

    fn apply_queued(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        for command in std::mem::take(&mut self.queue) {
            match command.apply(&self.config, &self.precision) {
                Ok(applied) => {
                    if let Some(change) = applied.tier_change {
                        notices.push(Notice::PrecisionChanged(change));
                    }
                    if applied.effect == Effect::Recompute {
                        self.stale = true;
                    }
                    if let Command::SetBackend { backend } = &command {
                        self.dispatcher.set_preferred(*backend);
                    }
                    self.config = applied.config;
                }
                Err(err) => {
                    log::warn!("rejected {command:?}: {err}");
                    notices.push(Notice::CommandRejected(err));
                }
            }
        }
        if self.mapper.palette() != &self.config.palette {
            match PaletteMapper::new(self.config.palette.clone()) {
                Ok(mapper) => self.mapper = mapper,
                Err(err) => notices.push(Notice::CommandRejected(err)),
            }
        }
        notices
    }

    /// Dispatch a fresh pass. Returns the generation it ran under.
    fn compute(&mut self, notices: &mut Vec<Notice>) -> (u64, Option<Frame>) {
        let token = self.generations.token();
        let snapshot = FrameSnapshot {
            generation: token.generation(),
            viewport: self.config.viewport.clone(),
            params: self.config.params,
        };

        let frame = match self.dispatcher.dispatch(&snapshot, &token) {
            Ok(outcome) => {
                self.retained = Some(Retained {
                    generation: snapshot.generation,
                    buffer: outcome.buffer,
                    tier: snapshot.tier(),
                    backend: outcome.backend,
                });
                self.stale = false;
                self.recolor()
            }
            Err(err) => {
                self.dispatch_failed(err, snapshot.tier(), notices);
                None
            }
        };
        (snapshot.generation, frame)
    }

    fn dispatch_failed(
        &mut self,
        err: DispatchError,
        tier: PrecisionTier,
        notices: &mut Vec<Notice>,
    ) {
        match err {
            DispatchError::Superseded { generation } => {
                log::debug!("frame for generation {generation} superseded");
                notices.push(Notice::Superseded { generation });
            }
            DispatchError::Numeric(err) => {
                log::warn!("numeric breakdown at {tier}: {err}");
                notices.push(Notice::NumericDegenerate(err));
                if let Some(change) = self.force_upgrade() {
                    notices.push(Notice::PrecisionChanged(change));
                }
            }
            DispatchError::Backend(err) => {
                log::error!("CPU backend failed: {err}");
                notices.push(Notice::BackendFailed(err));
            }
        }
    }

    /// Move the center one tier up so the next frame can be represented.
    fn force_upgrade(&mut self) -> Option<TierChange> {
        let from = self.config.viewport.tier();
        let to = self.precision.step_up(from)?;
        let viewport = self.config.viewport.with_tier(to).ok()?;
        self.config = RenderConfig {
            viewport,
            ..self.config.next()
        };
        Some(TierChange { from, to })
    }

    fn recolor(&mut self) -> Option<Frame> {
        let retained = self.retained.as_ref()?;
        self.sequence += 1;
        Some(Frame {
            sequence: self.sequence,
            width: retained.buffer.width(),
            height: retained.buffer.height(),
            colors: self.mapper.map(&retained.buffer, self.sequence),
            iterations: retained.buffer.clone(),
            tier: retained.tier,
            backend: retained.backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::GenerationToken;
    use crate::colorizers::Palette;

    fn session(width: u32, height: u32) -> Session {
        let engine = EngineConfig {
            cpu_threads: 2,
            ..Default::default()
        };
        Session::new(&engine, RenderConfig::mandelbrot(width, height).unwrap()).unwrap()
    }

    #[test]
    fn first_frame_is_computed() {
        let mut session = session(20, 10);
        let report = session.render_frame();
        let frame = report.frame.expect("frame");
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.colors.colors().len(), 200);
        assert_eq!(frame.backend, BackendKind::Cpu);
        assert!(report.notices.is_empty());
    }

    #[test]
    fn rejected_command_keeps_previous_config() {
        let mut session = session(20, 10);
        session.render_frame();
        let before = session.config().clone();

        session.queue(Command::SetIterationLimit { max_iterations: 0 });
        let report = session.render_frame();
        assert_eq!(session.config(), &before);
        assert_eq!(
            report.notices,
            vec![Notice::CommandRejected(InvalidParameters::ZeroIterationLimit)]
        );
        assert!(report.frame.is_some());
    }

    #[test]
    fn palette_change_recolors_without_recompute() {
        let mut session = session(16, 8);
        let first = session.render_frame().frame.unwrap();

        session.queue(Command::SetPalette {
            palette: Palette::fire(),
        });
        let second = session.render_frame().frame.unwrap();
        assert_eq!(second.iterations, first.iterations);
        assert_ne!(second.colors, first.colors);
    }

    #[test]
    fn advancing_before_render_does_not_cancel() {
        let mut session = session(16, 8);
        session.render_frame();
        session.queue(Command::Pan { dx: 1.0, dy: 0.0 });

        // The token is taken when the frame starts, so only a later advance cancels it.
        let counter = session.generations();
        let before = counter.current();
        counter.advance();
        let report = session.render_frame();
        assert_eq!(report.generation, before + 1);
        assert!(report.frame.is_some());
    }

    /// GPU stand-in that moves the shared counter on mid-frame but still
    /// finishes its pass.
    struct RacingGpu {
        counter: GenerationCounter,
    }

    impl ComputeBackend for RacingGpu {
        fn kind(&self) -> BackendKind {
            BackendKind::Gpu
        }

        fn check(&self, _snapshot: &FrameSnapshot) -> Result<(), BackendError> {
            Ok(())
        }

        fn compute(
            &self,
            snapshot: &FrameSnapshot,
            _token: &GenerationToken,
        ) -> Result<IterationBuffer, BackendError> {
            self.counter.advance();
            let (width, height) = (snapshot.viewport.width(), snapshot.viewport.height());
            Ok(IterationBuffer::new(
                width,
                height,
                snapshot.params.max_iterations,
            ))
        }
    }

    #[test]
    fn report_carries_the_generation_the_frame_was_computed_for() {
        let mut config = RenderConfig::mandelbrot(8, 4).unwrap();
        config.backend = BackendKind::Gpu;
        let engine = EngineConfig {
            cpu_threads: 2,
            ..Default::default()
        };
        let session = Session::new(&engine, config).unwrap();
        let counter = session.generations();
        let mut session = session.with_gpu(Box::new(RacingGpu {
            counter: counter.clone(),
        }));

        let computed_for = counter.current();
        let report = session.render_frame();
        assert_eq!(report.frame.unwrap().backend, BackendKind::Gpu);
        assert_eq!(counter.current(), computed_for + 1);
        assert_eq!(report.generation, computed_for);

        // A recolor reuses the buffer and keeps its generation.
        counter.advance();
        session.queue(Command::SetPalette {
            palette: Palette::fire(),
        });
        let recolored = session.render_frame();
        assert!(recolored.frame.is_some());
        assert_eq!(recolored.generation, computed_for);
    }

    #[test]
    fn cpu_backend_failure_is_reported() {
        let mut session = session(8, 4);
        let mut notices = Vec::new();
        let err = BackendError::Unavailable("thread pool gone".to_string());
        session.dispatch_failed(
            DispatchError::Backend(err.clone()),
            PrecisionTier::Native,
            &mut notices,
        );
        assert_eq!(notices, vec![Notice::BackendFailed(err)]);
        assert_eq!(
            notices[0].to_string(),
            "backend failed: backend unavailable: thread pool gone"
        );
    }

    #[test]
    fn frames_come_with_statistics() {
        let mut session = session(16, 8);
        let report = session.render_frame();
        let frame = report.frame.as_ref().unwrap();
        let stats = report.stats.expect("stats");
        let escaped = frame.iterations.cells().iter().filter(|c| !c.bounded).count();
        assert_eq!(stats.escaped_cells, escaped);
        assert!(stats.highest_iterations <= frame.iterations.max_iterations());
        assert!(stats.average_iterations <= stats.highest_iterations as f64);
    }

    #[test]
    fn commands_in_one_batch_apply_together() {
        let mut session = session(16, 8);
        session.queue(Command::Zoom {
            factor: 2.0,
            px: 8,
            py: 4,
        });
        session.queue(Command::SetIterationLimit { max_iterations: 64 });
        let report = session.render_frame();
        assert_eq!(report.config_version, 2);
        assert_eq!(report.frame.unwrap().iterations.max_iterations(), 64);
    }
}
