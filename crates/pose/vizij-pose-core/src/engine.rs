//! Engine: owns the scene and the live sessions, and exposes the handle-based API.
//!
//! Methods:
//! - start_slide / start_blend → SessionHandle (session applied once on start)
//! - feed_event, confirm, cancel, status_text for live sessions
//! - exec_slide, apply_pose, propagate for one-shot operations
//!
//! Handles are never reused. Using a handle that is unknown or already finished
//! is a caller bug and panics.

use hashbrown::HashMap;
use log::debug;

use crate::blend_session::{BlendSession, InMemoryLibrary, PoseLibrary, PoseSource};
use crate::config::{BlendOptions, Config, PropagateOptions, SlideMode, SlideOptions};
use crate::curve::Action;
use crate::error::PoseError;
use crate::event::{GestureContext, InputEvent, SessionOutcome, SessionStatus};
use crate::ids::{IdAllocator, SessionHandle};
use crate::keying::{ActionKeyframer, Keyframer};
use crate::lock::EvalLocks;
use crate::pose::Scene;
use crate::propagate::propagate;
use crate::slide::SlideSession;

#[derive(Debug)]
enum Session {
    Slide(SlideSession),
    Blend {
        session: BlendSession,
        /// Library asset leased for this session.
        asset: Option<String>,
    },
}

pub struct PoseEngine {
    scene: Scene,
    config: Config,
    ids: IdAllocator,
    locks: EvalLocks,
    sessions: HashMap<SessionHandle, Session>,
    keyframer: Box<dyn Keyframer>,
    library: Box<dyn PoseLibrary>,
}

impl PoseEngine {
    pub fn new(scene: Scene, config: Config) -> Self {
        let keyframer = ActionKeyframer::default().with_threshold(config.frame_threshold);
        Self {
            scene,
            config,
            ids: IdAllocator::new(),
            locks: EvalLocks::new(),
            sessions: HashMap::new(),
            keyframer: Box::new(keyframer),
            library: Box::new(InMemoryLibrary::new()),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Direct scene access, e.g. to move the playhead between operations.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_keyframer(&mut self, keyframer: Box<dyn Keyframer>) {
        self.keyframer = keyframer;
    }

    pub fn set_library(&mut self, library: Box<dyn PoseLibrary>) {
        self.library = library;
    }

    pub fn locks(&self) -> &EvalLocks {
        &self.locks
    }

    pub fn is_active(&self, handle: SessionHandle) -> bool {
        self.sessions.contains_key(&handle)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Start a modal slide and apply it once at the initial percentage.
    pub fn start_slide(
        &mut self,
        mode: SlideMode,
        options: &SlideOptions,
        gesture: &GestureContext,
    ) -> Result<SessionHandle, PoseError> {
        let session = SlideSession::init(&self.scene, mode, options, gesture, &self.locks, &self.config)?;
        session.apply(&mut self.scene);
        let handle = self.ids.alloc_session();
        debug!("slide session {:?} started", handle);
        self.sessions.insert(handle, Session::Slide(session));
        Ok(handle)
    }

    /// Start a modal pose blend and apply it once at the initial factor.
    pub fn start_blend(
        &mut self,
        source: PoseSource,
        options: &BlendOptions,
        gesture: &GestureContext,
    ) -> Result<SessionHandle, PoseError> {
        let (pose, asset) = self.resolve(source)?;
        let session = match BlendSession::init(&self.scene, pose, options, gesture, &self.locks) {
            Ok(s) => s,
            Err(err) => {
                self.release_asset(asset);
                return Err(err);
            }
        };
        session.apply(&mut self.scene);
        let handle = self.ids.alloc_session();
        debug!("blend session {:?} started", handle);
        self.sessions.insert(handle, Session::Blend { session, asset });
        Ok(handle)
    }

    /// Route one input event. A finished session is dropped from the engine.
    pub fn feed_event(&mut self, handle: SessionHandle, event: &InputEvent) -> SessionStatus {
        let status = match self.sessions.get_mut(&handle) {
            Some(Session::Slide(s)) => s.handle_event(&mut self.scene, self.keyframer.as_mut(), event),
            Some(Session::Blend { session, .. }) => {
                session.handle_event(&mut self.scene, self.keyframer.as_mut(), event)
            }
            None => panic!("feed_event: unknown or finished session {handle:?}"),
        };
        if let SessionStatus::Finished(outcome) = status {
            self.retire(handle, outcome);
        }
        status
    }

    pub fn confirm(&mut self, handle: SessionHandle) {
        match self.sessions.get_mut(&handle) {
            Some(Session::Slide(s)) => s.confirm(&mut self.scene, self.keyframer.as_mut()),
            Some(Session::Blend { session, .. }) => session.confirm(&mut self.scene, self.keyframer.as_mut()),
            None => panic!("confirm: unknown or finished session {handle:?}"),
        }
        self.retire(handle, SessionOutcome::Confirmed);
    }

    pub fn cancel(&mut self, handle: SessionHandle) {
        match self.sessions.get_mut(&handle) {
            Some(Session::Slide(s)) => s.cancel(&mut self.scene),
            Some(Session::Blend { session, .. }) => session.cancel(&mut self.scene),
            None => panic!("cancel: unknown or finished session {handle:?}"),
        }
        self.retire(handle, SessionOutcome::Cancelled);
    }

    pub fn status_text(&self, handle: SessionHandle) -> String {
        match self.sessions.get(&handle) {
            Some(Session::Slide(s)) => s.status_text(),
            Some(Session::Blend { session, .. }) => session.status_text(),
            None => panic!("status_text: unknown or finished session {handle:?}"),
        }
    }

    /// Live slide session behind `handle`, if it is one.
    pub fn slide_session(&self, handle: SessionHandle) -> Option<&SlideSession> {
        match self.sessions.get(&handle) {
            Some(Session::Slide(s)) => Some(s),
            _ => None,
        }
    }

    /// Live blend session behind `handle`, if it is one.
    pub fn blend_session(&self, handle: SessionHandle) -> Option<&BlendSession> {
        match self.sessions.get(&handle) {
            Some(Session::Blend { session, .. }) => Some(session),
            _ => None,
        }
    }

    /// Non-modal slide with the given options.
    pub fn exec_slide(&mut self, mode: SlideMode, options: &SlideOptions) -> Result<(), PoseError> {
        SlideSession::exec(
            &mut self.scene,
            mode,
            options,
            &self.locks,
            &self.config,
            self.keyframer.as_mut(),
        )
    }

    /// Non-modal blend at `options.blend_factor`.
    pub fn exec_blend(&mut self, source: PoseSource, options: &BlendOptions) -> Result<(), PoseError> {
        let (pose, asset) = self.resolve(source)?;
        let result = BlendSession::exec(&mut self.scene, pose, options, &self.locks, self.keyframer.as_mut());
        self.release_asset(asset);
        result
    }

    /// Apply a pose fully (factor 1) and key it.
    pub fn apply_pose(&mut self, source: PoseSource) -> Result<(), PoseError> {
        let options = BlendOptions {
            blend_factor: 1.0,
            ..BlendOptions::default()
        };
        self.exec_blend(source, &options)
    }

    /// Fails with [`PoseError::ObjectBusy`] while a live session holds one of the objects.
    pub fn propagate(&mut self, options: &PropagateOptions) -> Result<usize, PoseError> {
        propagate(&mut self.scene, options, &self.locks, &self.config)
    }

    fn resolve(&mut self, source: PoseSource) -> Result<(Action, Option<String>), PoseError> {
        match source {
            PoseSource::Action(action) => Ok((action, None)),
            PoseSource::Asset(name) => match self.library.acquire(&name) {
                Some(action) => Ok((action, Some(name))),
                None => Err(PoseError::AssetUnavailable { name }),
            },
        }
    }

    fn release_asset(&mut self, asset: Option<String>) {
        if let Some(name) = asset {
            self.library.release(&name);
        }
    }

    fn retire(&mut self, handle: SessionHandle, outcome: SessionOutcome) {
        if let Some(Session::Blend { asset, .. }) = self.sessions.remove(&handle) {
            self.release_asset(asset);
        }
        debug!("session {:?} finished: {:?}", handle, outcome);
    }
}
