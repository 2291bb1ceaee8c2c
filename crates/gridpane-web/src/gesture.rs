#![forbid(unsafe_code)]

//! Pointer-drag gestures on handles.
//!
//! [`DragGesture`] turns host pointer lifecycle signals into engine drags
//! while enforcing:
//! - one active pointer at a time,
//! - explicit capture acquire/release commands for the host, and
//! - overflow carry-over: motion clamped by a pane bound is remembered and
//!   added to the next pointer move, so the pane only leaves its bound once
//!   the pointer comes back past the point where it was clamped.
//!
//! The neighbor pair is resolved once at pointer-down. Each pointer move
//! recomputes the template exactly once inside a [`BatchScope`].

use gridpane_core::{PointerButton, PointerPosition};
use gridpane_layout::{DragOutcome, NodeId, TopologyDiagnostic};
use gridpane_runtime::BatchScope;
use tracing::{debug, trace, warn};

use crate::container::{ActivePair, Container};
use crate::pane::Handle;

/// Gesture configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragConfig {
    /// Button required to begin a drag.
    pub activation_button: PointerButton,
    /// Pointer-leave cancels the drag while capture was requested but not
    /// yet acknowledged by the host.
    pub cancel_on_leave_without_capture: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            activation_button: PointerButton::Primary,
            cancel_on_leave_without_capture: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Requested,
    Acquired,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveDrag {
    pointer_id: u32,
    pair: ActivePair,
    button: PointerButton,
    last_position: PointerPosition,
    capture: CaptureState,
    /// Motion clamped on the previous move, in pixels.
    carry: f64,
}

/// Host command for browser pointer-capture control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    Acquire { pointer_id: u32 },
    Release { pointer_id: u32 },
}

/// Lifecycle signal handled by one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
    PointerLeave,
    Blur,
    VisibilityHidden,
    LostPointerCapture,
    CaptureAcquired,
}

/// Why a lifecycle signal was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    InvalidPointerId,
    ButtonNotAllowed,
    ButtonMismatch,
    GestureInProgress,
    NoActiveGesture,
    PointerMismatch,
    LeaveWhileCaptured,
    /// The handle belongs to another container.
    ForeignHandle,
    /// The handle has no pane pair to resize.
    InertHandle(TopologyDiagnostic),
    /// The engine was borrowed; the motion is kept for the next move.
    ContainerBusy,
}

/// What one dispatch did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Started,
    Resized(DragOutcome),
    CaptureStateUpdated,
    Ended,
    Ignored(IgnoredReason),
}

/// Structured record of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureLogEntry {
    pub phase: GesturePhase,
    pub sequence: Option<u64>,
    pub pointer_id: Option<u32>,
    pub handle: Option<NodeId>,
    pub position: Option<PointerPosition>,
    pub capture_command: Option<CaptureCommand>,
    pub outcome: GestureOutcome,
}

/// Result of one pointer lifecycle dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureDispatch {
    pub capture_command: Option<CaptureCommand>,
    pub log: GestureLogEntry,
}

impl GestureDispatch {
    /// The engine outcome, when this dispatch moved a handle.
    #[must_use]
    pub fn drag(&self) -> Option<DragOutcome> {
        match self.log.outcome {
            GestureOutcome::Resized(outcome) => Some(outcome),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self.log.outcome, GestureOutcome::Ignored(_))
    }

    fn ignored(
        phase: GesturePhase,
        reason: IgnoredReason,
        pointer_id: Option<u32>,
        handle: Option<NodeId>,
        position: Option<PointerPosition>,
    ) -> Self {
        trace!(message = "gridpane.gesture.ignored", ?phase, ?reason);
        Self {
            capture_command: None,
            log: GestureLogEntry {
                phase,
                sequence: None,
                pointer_id,
                handle,
                position,
                capture_command: None,
                outcome: GestureOutcome::Ignored(reason),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DispatchContext {
    phase: GesturePhase,
    pointer_id: u32,
    handle: NodeId,
    position: Option<PointerPosition>,
}

/// Drag controller for the handles of one container.
#[derive(Debug)]
pub struct DragGesture {
    container: Container,
    config: DragConfig,
    active: Option<ActiveDrag>,
    next_sequence: u64,
}

impl DragGesture {
    #[must_use]
    pub fn new(container: &Container, config: DragConfig) -> Self {
        Self {
            container: container.clone(),
            config,
            active: None,
            next_sequence: 1,
        }
    }

    #[must_use]
    pub const fn config(&self) -> DragConfig {
        self.config
    }

    #[must_use]
    pub fn active_pointer_id(&self) -> Option<u32> {
        self.active.map(|active| active.pointer_id)
    }

    /// Handle and pane pair of the running gesture.
    #[must_use]
    pub fn active_pair(&self) -> Option<ActivePair> {
        self.active.map(|active| active.pair)
    }

    /// Motion carried into the next pointer move, in pixels.
    #[must_use]
    pub fn carry(&self) -> f64 {
        self.active.map_or(0.0, |active| active.carry)
    }

    /// Begin dragging `handle`.
    pub fn pointer_down(
        &mut self,
        handle: &Handle,
        pointer_id: u32,
        button: PointerButton,
        position: PointerPosition,
    ) -> GestureDispatch {
        let phase = GesturePhase::PointerDown;
        let ignored = |reason| {
            GestureDispatch::ignored(
                phase,
                reason,
                Some(pointer_id),
                Some(handle.id()),
                Some(position),
            )
        };
        if pointer_id == 0 {
            return ignored(IgnoredReason::InvalidPointerId);
        }
        if button != self.config.activation_button {
            return ignored(IgnoredReason::ButtonNotAllowed);
        }
        if self.active.is_some() {
            return ignored(IgnoredReason::GestureInProgress);
        }
        if !self.container.owns(handle.container()) {
            return ignored(IgnoredReason::ForeignHandle);
        }
        let neighbors = self
            .container
            .with_engine(|engine| engine.neighbors(handle.id()));
        let (left, right) = match neighbors {
            Ok(pair) => pair,
            Err(diagnostic) => {
                warn!(
                    message = diagnostic.code(),
                    handle = handle.id().get(),
                    detail = %diagnostic
                );
                return ignored(IgnoredReason::InertHandle(diagnostic));
            }
        };

        let pair = ActivePair {
            handle: handle.id(),
            left,
            right,
        };
        self.active = Some(ActiveDrag {
            pointer_id,
            pair,
            button,
            last_position: position,
            capture: CaptureState::Requested,
            carry: 0.0,
        });
        self.container.state.set_active(Some(pair));
        debug!(
            message = "gridpane.gesture.started",
            handle = pair.handle.get(),
            left = left.get(),
            right = right.get(),
            pointer_id
        );
        self.forwarded(
            DispatchContext {
                phase,
                pointer_id,
                handle: pair.handle,
                position: Some(position),
            },
            GestureOutcome::Started,
            Some(CaptureCommand::Acquire { pointer_id }),
        )
    }

    /// The host acknowledged pointer capture.
    pub fn capture_acquired(&mut self, pointer_id: u32) -> GestureDispatch {
        let phase = GesturePhase::CaptureAcquired;
        let mut active = match self.matching_active(phase, Some(pointer_id), None) {
            Ok(active) => active,
            Err(dispatch) => return dispatch,
        };
        active.capture = CaptureState::Acquired;
        self.active = Some(active);
        GestureDispatch {
            capture_command: None,
            log: GestureLogEntry {
                phase,
                sequence: None,
                pointer_id: Some(pointer_id),
                handle: Some(active.pair.handle),
                position: None,
                capture_command: None,
                outcome: GestureOutcome::CaptureStateUpdated,
            },
        }
    }

    /// Move the active handle to `position`.
    ///
    /// The requested delta is the axis motion since the last move plus the
    /// motion carried from the previous clamp; whatever the engine could not
    /// apply becomes the new carry.
    pub fn pointer_move(&mut self, pointer_id: u32, position: PointerPosition) -> GestureDispatch {
        let phase = GesturePhase::PointerMove;
        let mut active = match self.matching_active(phase, Some(pointer_id), Some(position)) {
            Ok(active) => active,
            Err(dispatch) => return dispatch,
        };
        let axis = self.container.axis();
        let motion = axis.delta(active.last_position, position);
        let requested = motion + active.carry;

        let outcome = {
            let _batch = BatchScope::new();
            let outcome = match self.container.state.engine_mut() {
                Ok(mut engine) => engine.drag_pair(active.pair.left, active.pair.right, requested),
                Err(_) => {
                    return GestureDispatch::ignored(
                        phase,
                        IgnoredReason::ContainerBusy,
                        Some(pointer_id),
                        Some(active.pair.handle),
                        Some(position),
                    );
                }
            };
            self.container.state.refresh();
            outcome
        };

        active.carry = outcome.overflow;
        active.last_position = position;
        self.active = Some(active);
        trace!(
            message = "gridpane.gesture.moved",
            motion,
            requested,
            applied = outcome.applied,
            carry = active.carry
        );
        self.forwarded(
            DispatchContext {
                phase,
                pointer_id,
                handle: active.pair.handle,
                position: Some(position),
            },
            GestureOutcome::Resized(outcome),
            None,
        )
    }

    /// Finish the gesture and release capture.
    pub fn pointer_up(
        &mut self,
        pointer_id: u32,
        button: PointerButton,
        position: PointerPosition,
    ) -> GestureDispatch {
        let phase = GesturePhase::PointerUp;
        let active = match self.matching_active(phase, Some(pointer_id), Some(position)) {
            Ok(active) => active,
            Err(dispatch) => return dispatch,
        };
        if active.button != button {
            return GestureDispatch::ignored(
                phase,
                IgnoredReason::ButtonMismatch,
                Some(pointer_id),
                Some(active.pair.handle),
                Some(position),
            );
        }
        self.finish(phase, active, Some(position), true)
    }

    pub fn pointer_cancel(&mut self, pointer_id: Option<u32>) -> GestureDispatch {
        self.cancel(GesturePhase::PointerCancel, pointer_id, true)
    }

    /// Pointer left the handle. Only ends the gesture when capture was never
    /// acknowledged and the configuration asks for it.
    pub fn pointer_leave(&mut self, pointer_id: u32) -> GestureDispatch {
        let phase = GesturePhase::PointerLeave;
        let active = match self.matching_active(phase, Some(pointer_id), None) {
            Ok(active) => active,
            Err(dispatch) => return dispatch,
        };
        if active.capture == CaptureState::Requested && self.config.cancel_on_leave_without_capture
        {
            self.finish(phase, active, None, true)
        } else {
            GestureDispatch::ignored(
                phase,
                IgnoredReason::LeaveWhileCaptured,
                Some(pointer_id),
                Some(active.pair.handle),
                None,
            )
        }
    }

    pub fn blur(&mut self) -> GestureDispatch {
        self.cancel(GesturePhase::Blur, None, true)
    }

    pub fn visibility_hidden(&mut self) -> GestureDispatch {
        self.cancel(GesturePhase::VisibilityHidden, None, true)
    }

    /// The host lost capture; nothing is left to release.
    pub fn lost_pointer_capture(&mut self, pointer_id: u32) -> GestureDispatch {
        self.cancel(GesturePhase::LostPointerCapture, Some(pointer_id), false)
    }

    fn cancel(
        &mut self,
        phase: GesturePhase,
        pointer_id: Option<u32>,
        release_capture: bool,
    ) -> GestureDispatch {
        match self.matching_active(phase, pointer_id, None) {
            Ok(active) => self.finish(phase, active, None, release_capture),
            Err(dispatch) => dispatch,
        }
    }

    /// The running gesture, if `pointer_id` (when given) matches it.
    fn matching_active(
        &self,
        phase: GesturePhase,
        pointer_id: Option<u32>,
        position: Option<PointerPosition>,
    ) -> Result<ActiveDrag, GestureDispatch> {
        let Some(active) = self.active else {
            return Err(GestureDispatch::ignored(
                phase,
                IgnoredReason::NoActiveGesture,
                pointer_id,
                None,
                position,
            ));
        };
        if let Some(id) = pointer_id
            && id != active.pointer_id
        {
            return Err(GestureDispatch::ignored(
                phase,
                IgnoredReason::PointerMismatch,
                Some(id),
                Some(active.pair.handle),
                position,
            ));
        }
        Ok(active)
    }

    /// End the gesture: clear highlighting and carry.
    fn finish(
        &mut self,
        phase: GesturePhase,
        active: ActiveDrag,
        position: Option<PointerPosition>,
        release_capture: bool,
    ) -> GestureDispatch {
        self.active = None;
        self.container.state.set_active(None);
        debug!(
            message = "gridpane.gesture.ended",
            ?phase,
            handle = active.pair.handle.get(),
            dropped_carry = active.carry
        );
        let command = (release_capture && active.capture == CaptureState::Acquired).then_some(
            CaptureCommand::Release {
                pointer_id: active.pointer_id,
            },
        );
        self.forwarded(
            DispatchContext {
                phase,
                pointer_id: active.pointer_id,
                handle: active.pair.handle,
                position,
            },
            GestureOutcome::Ended,
            command,
        )
    }

    fn forwarded(
        &mut self,
        context: DispatchContext,
        outcome: GestureOutcome,
        capture_command: Option<CaptureCommand>,
    ) -> GestureDispatch {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        GestureDispatch {
            capture_command,
            log: GestureLogEntry {
                phase: context.phase,
                sequence: Some(sequence),
                pointer_id: Some(context.pointer_id),
                handle: Some(context.handle),
                position: context.position,
                capture_command,
                outcome,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContainerProps, HandleProps, Pane, PaneProps};
    use gridpane_core::Axis;
    use gridpane_layout::Size;

    struct Rig {
        container: Container,
        left: Pane,
        handle: Handle,
        right: Pane,
    }

    fn rig() -> Rig {
        let container = Container::new(ContainerProps::new(Axis::Row));
        container.observe_size(400.0);
        let left = Pane::mount(&container, PaneProps::default()).expect("left");
        let handle = Handle::mount(&container, HandleProps { size: Size::Px(0.0) }).expect("h");
        let right = Pane::mount(&container, PaneProps::default()).expect("right");
        Rig {
            container,
            left,
            handle,
            right,
        }
    }

    fn at(x: f64) -> PointerPosition {
        PointerPosition::new(x, 0.0)
    }

    #[test]
    fn pointer_down_requests_capture_and_highlights_pair() {
        let rig = rig();
        let mut gesture = DragGesture::new(&rig.container, DragConfig::default());
        let dispatch = gesture.pointer_down(&rig.handle, 7, PointerButton::Primary, at(200.0));
        assert_eq!(dispatch.capture_command, Some(CaptureCommand::Acquire { pointer_id: 7 }));
        assert_eq!(dispatch.log.outcome, GestureOutcome::Started);
        assert_eq!(dispatch.log.sequence, Some(1));
        assert!(rig.left.is_active());
        assert!(rig.right.is_active());
        assert!(rig.handle.is_active());
        assert_eq!(gesture.active_pointer_id(), Some(7));
    }

    #[test]
    fn moves_drag_the_captured_pair() {
        let rig = rig();
        let mut gesture = DragGesture::new(&rig.container, DragConfig::default());
        gesture.pointer_down(&rig.handle, 1, PointerButton::Primary, at(200.0));
        let dispatch = gesture.pointer_move(1, at(250.0));
        let outcome = dispatch.drag().expect("resized");
        assert_eq!(outcome.applied, 50.0);
        assert_eq!(rig.left.size_px(), Some(250.0));
        assert_eq!(rig.right.size_px(), Some(150.0));
        assert_eq!(rig.container.template(), "1.25fr 0px 0.75fr");
    }

    #[test]
    fn second_pointer_and_wrong_button_are_ignored() {
        let rig = rig();
        let mut gesture = DragGesture::new(&rig.container, DragConfig::default());
        let dispatch = gesture.pointer_down(&rig.handle, 1, PointerButton::Secondary, at(0.0));
        assert_eq!(
            dispatch.log.outcome,
            GestureOutcome::Ignored(IgnoredReason::ButtonNotAllowed)
        );
        let dispatch = gesture.pointer_down(&rig.handle, 0, PointerButton::Primary, at(0.0));
        assert_eq!(
            dispatch.log.outcome,
            GestureOutcome::Ignored(IgnoredReason::InvalidPointerId)
        );

        gesture.pointer_down(&rig.handle, 1, PointerButton::Primary, at(0.0));
        let dispatch = gesture.pointer_down(&rig.handle, 2, PointerButton::Primary, at(0.0));
        assert_eq!(
            dispatch.log.outcome,
            GestureOutcome::Ignored(IgnoredReason::GestureInProgress)
        );
        let dispatch = gesture.pointer_move(2, at(10.0));
        assert_eq!(
            dispatch.log.outcome,
            GestureOutcome::Ignored(IgnoredReason::PointerMismatch)
        );
        let dispatch = gesture.pointer_up(1, PointerButton::Middle, at(10.0));
        assert_eq!(
            dispatch.log.outcome,
            GestureOutcome::Ignored(IgnoredReason::ButtonMismatch)
        );
        assert!(rig.container.with_engine(|engine| engine.offsets().is_pristine()));
    }

    #[test]
    fn release_only_after_acquired_capture() {
        let rig = rig();
        let mut gesture = DragGesture::new(&rig.container, DragConfig::default());
        gesture.pointer_down(&rig.handle, 3, PointerButton::Primary, at(0.0));
        let dispatch = gesture.pointer_up(3, PointerButton::Primary, at(0.0));
        assert_eq!(dispatch.capture_command, None);
        assert_eq!(dispatch.log.outcome, GestureOutcome::Ended);

        gesture.pointer_down(&rig.handle, 3, PointerButton::Primary, at(0.0));
        let dispatch = gesture.capture_acquired(3);
        assert_eq!(dispatch.log.outcome, GestureOutcome::CaptureStateUpdated);
        let dispatch = gesture.pointer_up(3, PointerButton::Primary, at(0.0));
        assert_eq!(dispatch.capture_command, Some(CaptureCommand::Release { pointer_id: 3 }));
        assert!(!rig.handle.is_active());
        assert_eq!(rig.container.active_pair(), None);
    }

    #[test]
    fn leave_cancels_only_before_capture() {
        let rig = rig();
        let mut gesture = DragGesture::new(&rig.container, DragConfig::default());
        gesture.pointer_down(&rig.handle, 4, PointerButton::Primary, at(0.0));
        gesture.capture_acquired(4);
        let dispatch = gesture.pointer_leave(4);
        assert_eq!(
            dispatch.log.outcome,
            GestureOutcome::Ignored(IgnoredReason::LeaveWhileCaptured)
        );
        assert!(gesture.active_pair().is_some());

        let dispatch = gesture.lost_pointer_capture(4);
        assert_eq!(dispatch.log.outcome, GestureOutcome::Ended);
        assert_eq!(dispatch.capture_command, None);

        gesture.pointer_down(&rig.handle, 5, PointerButton::Primary, at(0.0));
        let dispatch = gesture.pointer_leave(5);
        assert_eq!(dispatch.log.outcome, GestureOutcome::Ended);
    }

    #[test]
    fn interruptions_without_gesture_are_ignored() {
        let rig = rig();
        let mut gesture = DragGesture::new(&rig.container, DragConfig::default());
        for dispatch in [
            gesture.blur(),
            gesture.visibility_hidden(),
            gesture.pointer_cancel(None),
            gesture.lost_pointer_capture(9),
        ] {
            assert_eq!(
                dispatch.log.outcome,
                GestureOutcome::Ignored(IgnoredReason::NoActiveGesture)
            );
        }
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let rig = rig();
        let other = self::rig();
        let mut gesture = DragGesture::new(&rig.container, DragConfig::default());
        let dispatch = gesture.pointer_down(&other.handle, 1, PointerButton::Primary, at(0.0));
        assert_eq!(
            dispatch.log.outcome,
            GestureOutcome::Ignored(IgnoredReason::ForeignHandle)
        );
    }
}
