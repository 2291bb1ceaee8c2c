#![forbid(unsafe_code)]

//! Pane and handle guards.
//!
//! Both are mounted into an explicit [`Container`] and unmount themselves
//! when dropped, releasing their registry and offset entries.

use std::fmt;
use std::rc::Weak;

use gridpane_layout::config::DEFAULT_HANDLE_SIZE;
use gridpane_layout::{Length, LayoutError, NodeId, NodeRole, Size, SizeSpec};
use tracing::debug;

use crate::SurfaceError;
use crate::container::{Container, ContainerState, Deferred};

/// Pane configuration. Defaults to `1fr` without bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaneProps {
    pub size: Size,
    pub min: Option<Length>,
    pub max: Option<Length>,
}

impl PaneProps {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Parse size and bound tokens such as `"240px"`, `"30%"` or `"2fr"`.
    pub fn parse(size: &str, min: Option<&str>, max: Option<&str>) -> Result<Self, LayoutError> {
        let spec = SizeSpec::parse(size, min, max)?;
        Ok(Self {
            size: spec.size(),
            min: spec.min(),
            max: spec.max(),
        })
    }

    #[must_use]
    pub fn min(mut self, min: Length) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub fn max(mut self, max: Length) -> Self {
        self.max = Some(max);
        self
    }

    pub fn size_spec(&self) -> Result<SizeSpec, LayoutError> {
        SizeSpec::bounded(self.size, self.min, self.max)
    }
}

/// Handle configuration; the size only governs the handle's own track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleProps {
    pub size: Size,
}

impl Default for HandleProps {
    fn default() -> Self {
        Self {
            size: DEFAULT_HANDLE_SIZE,
        }
    }
}

/// A child declaration passed to [`Container::set_children`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChildNode {
    Pane(PaneProps),
    Handle(HandleProps),
}

impl ChildNode {
    #[must_use]
    pub fn role(&self) -> NodeRole {
        match self {
            Self::Pane(_) => NodeRole::Pane,
            Self::Handle(_) => NodeRole::Handle,
        }
    }

    pub fn size_spec(&self) -> Result<SizeSpec, LayoutError> {
        match self {
            Self::Pane(props) => props.size_spec(),
            Self::Handle(props) => Ok(SizeSpec::new(props.size)),
        }
    }
}

/// Shared guard body for panes and handles.
struct Mount {
    id: NodeId,
    container: Weak<ContainerState>,
}

impl Mount {
    fn insert(container: &Container, role: NodeRole, spec: SizeSpec) -> Result<Self, SurfaceError> {
        let id = {
            let mut engine = container.state.engine_mut()?;
            match role {
                NodeRole::Pane => engine.mount_pane(spec)?,
                NodeRole::Handle => engine.mount_handle(spec)?,
            }
        };
        container.state.refresh();
        Ok(Self::attached(container, id))
    }

    fn attached(container: &Container, id: NodeId) -> Self {
        Self {
            id,
            container: container.downgrade(),
        }
    }

    fn is_active(&self, matches: impl FnOnce(&crate::ActivePair) -> bool) -> bool {
        self.container
            .upgrade()
            .and_then(|state| state.active())
            .is_some_and(|pair| matches(&pair))
    }
}

impl Drop for Mount {
    fn drop(&mut self) {
        let Some(state) = self.container.upgrade() else {
            return;
        };
        let removed = match state.engine_mut() {
            Ok(mut engine) => engine.unmount(self.id),
            Err(_) => {
                state.defer(Deferred::Unmount(self.id));
                return;
            }
        };
        if removed {
            if state.active().is_some_and(|pair| pair.contains(self.id)) {
                state.set_active(None);
            }
            state.refresh();
        }
    }
}

impl fmt::Debug for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mount")
            .field("id", &self.id)
            .field("attached", &(self.container.strong_count() > 0))
            .finish()
    }
}

/// A mounted pane. Dropping it unmounts the pane.
#[derive(Debug)]
pub struct Pane {
    mount: Mount,
}

impl Pane {
    /// Mount a pane at the end of `container`'s children.
    pub fn mount(container: &Container, props: PaneProps) -> Result<Self, SurfaceError> {
        let mount = Mount::insert(container, NodeRole::Pane, props.size_spec()?)?;
        Ok(Self { mount })
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.mount.id
    }

    /// Swap the pane's declaration. A changed declaration discards the
    /// offset accumulated by drags. Returns whether it changed.
    pub fn set_size(&self, props: PaneProps) -> Result<bool, SurfaceError> {
        let spec = props.size_spec()?;
        let state = self
            .mount
            .container
            .upgrade()
            .ok_or(SurfaceError::ContainerDropped)?;
        let changed = state.engine_mut()?.set_spec(self.mount.id, spec)?;
        if changed {
            state.refresh();
        }
        Ok(changed)
    }

    /// Effective size in pixels, `None` once the container is gone.
    #[must_use]
    pub fn size_px(&self) -> Option<f64> {
        let state = self.mount.container.upgrade()?;
        state.engine.borrow().track_px(self.mount.id)
    }

    /// Whether the pane is one of the pair being dragged.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let id = self.mount.id;
        self.mount.is_active(|pair| pair.left == id || pair.right == id)
    }
}

/// A mounted handle. Dropping it unmounts the handle.
#[derive(Debug)]
pub struct Handle {
    mount: Mount,
}

impl Handle {
    /// Mount a handle at the end of `container`'s children.
    pub fn mount(container: &Container, props: HandleProps) -> Result<Self, SurfaceError> {
        let mount = Mount::insert(container, NodeRole::Handle, SizeSpec::new(props.size))?;
        Ok(Self { mount })
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.mount.id
    }

    /// Whether this handle is being dragged.
    #[must_use]
    pub fn is_active(&self) -> bool {
        let id = self.mount.id;
        self.mount.is_active(|pair| pair.handle == id)
    }

    pub(crate) fn container(&self) -> &Weak<ContainerState> {
        &self.mount.container
    }
}

/// A child mounted by [`Container::set_children`].
#[derive(Debug)]
pub enum MountedChild {
    Pane(Pane),
    Handle(Handle),
}

impl MountedChild {
    pub(crate) fn attach(container: &Container, role: NodeRole, id: NodeId) -> Self {
        let mount = Mount::attached(container, id);
        debug!(message = "gridpane.child.attached", node = id.get(), ?role);
        match role {
            NodeRole::Pane => Self::Pane(Pane { mount }),
            NodeRole::Handle => Self::Handle(Handle { mount }),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            Self::Pane(pane) => pane.id(),
            Self::Handle(handle) => handle.id(),
        }
    }

    #[must_use]
    pub fn as_pane(&self) -> Option<&Pane> {
        match self {
            Self::Pane(pane) => Some(pane),
            Self::Handle(_) => None,
        }
    }

    #[must_use]
    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Self::Handle(handle) => Some(handle),
            Self::Pane(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContainerProps;
    use gridpane_core::Axis;

    fn container(px: f64) -> Container {
        let container = Container::new(ContainerProps::new(Axis::Row));
        container.observe_size(px);
        container
    }

    #[test]
    fn mount_appends_in_order() {
        let container = container(500.0);
        let a = Pane::mount(&container, PaneProps::new(Size::Px(100.0))).expect("a");
        let h = Handle::mount(&container, HandleProps::default()).expect("h");
        let b = Pane::mount(&container, PaneProps::default()).expect("b");
        assert_eq!(container.template(), "100px 4px 1fr");
        assert_eq!(
            container.with_engine(|engine| engine.order().to_vec()),
            vec![a.id(), h.id(), b.id()]
        );
        assert_eq!(b.size_px(), Some(396.0));
    }

    #[test]
    fn drop_unmounts_and_updates_template() {
        let container = container(500.0);
        let _a = Pane::mount(&container, PaneProps::new(Size::Px(100.0))).expect("a");
        let h = Handle::mount(&container, HandleProps::default()).expect("h");
        let b = Pane::mount(&container, PaneProps::default()).expect("b");
        drop(h);
        assert_eq!(container.template(), "100px 1fr");
        let id = b.id();
        drop(b);
        assert!(!container.with_engine(|engine| engine.registry().contains(id)));
        assert_eq!(container.template(), "100px");
    }

    #[test]
    fn set_size_resets_offset() {
        let container = container(500.0);
        let a = Pane::mount(&container, PaneProps::new(Size::Px(100.0))).expect("a");
        let h = Handle::mount(&container, HandleProps::default()).expect("h");
        let _b = Pane::mount(&container, PaneProps::default()).expect("b");
        container.state.engine.borrow_mut().drag_handle(h.id(), 30.0);
        assert_eq!(a.size_px(), Some(130.0));

        assert!(!a.set_size(PaneProps::new(Size::Px(100.0))).expect("same size"));
        assert_eq!(a.size_px(), Some(130.0));

        assert!(a.set_size(PaneProps::new(Size::Percent(10.0))).expect("new size"));
        assert_eq!(a.size_px(), Some(50.0));
        assert_eq!(container.template(), "10% 4px 1fr");
    }

    #[test]
    fn bounded_fraction_fails_fast() {
        let container = container(500.0);
        let err = Pane::mount(
            &container,
            PaneProps::default().min(Length::Px(20.0)),
        )
        .expect_err("fraction with bound");
        assert!(matches!(err, SurfaceError::Layout(LayoutError::BoundedFraction { .. })));
    }

    #[test]
    fn outliving_the_container_is_reported() {
        let container = container(500.0);
        let pane = Pane::mount(&container, PaneProps::default()).expect("pane");
        drop(container);
        assert_eq!(
            pane.set_size(PaneProps::new(Size::Px(10.0))),
            Err(SurfaceError::ContainerDropped)
        );
        assert_eq!(pane.size_px(), None);
        assert!(!pane.is_active());
    }

    #[test]
    fn props_parse_tokens() {
        let props = PaneProps::parse("240px", Some("120px"), Some("40%")).expect("valid");
        assert_eq!(props.size, Size::Px(240.0));
        assert_eq!(props.min, Some(Length::Px(120.0)));
        assert_eq!(props.max, Some(Length::Percent(40.0)));
        assert!(PaneProps::parse("1fr", Some("1px"), None).is_err());
    }
}
