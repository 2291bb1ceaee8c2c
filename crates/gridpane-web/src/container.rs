#![forbid(unsafe_code)]

//! Split container: one engine, one published template.

use std::cell::{RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use gridpane_core::Axis;
use gridpane_layout::{ChildSpec, LayoutSpec, NodeId, NodeRole, ResizeEngine, grid_template_property};
use gridpane_runtime::{BatchScope, Lazy, Observable, Subscription, resolve_all};
use tracing::{debug, trace, warn};

use crate::SurfaceError;
use crate::pane::{ChildNode, HandleProps, MountedChild, PaneProps};

/// Callback receiving each new grid template.
pub type TemplateCallback = Box<dyn Fn(&str)>;
/// Callback receiving each new measured size, in pixels.
pub type SizeCallback = Box<dyn Fn(f64)>;

/// Container configuration.
#[derive(Default)]
pub struct ContainerProps {
    pub axis: Axis,
    /// Extra style declarations; they override the generated ones.
    pub style: BTreeMap<String, String>,
    pub on_template: Option<TemplateCallback>,
    pub on_size: Option<SizeCallback>,
}

impl ContainerProps {
    #[must_use]
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    #[must_use]
    pub fn on_template(mut self, callback: impl Fn(&str) + 'static) -> Self {
        self.on_template = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_size(mut self, callback: impl Fn(f64) + 'static) -> Self {
        self.on_size = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for ContainerProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerProps")
            .field("axis", &self.axis)
            .field("style", &self.style)
            .field("on_template", &self.on_template.is_some())
            .field("on_size", &self.on_size.is_some())
            .finish()
    }
}

/// The handle being dragged and the pane pair it resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePair {
    pub handle: NodeId,
    pub left: NodeId,
    pub right: NodeId,
}

impl ActivePair {
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.handle == id || self.left == id || self.right == id
    }
}

/// Engine mutation requested while the engine was borrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Deferred {
    Unmount(NodeId),
    Resize(f64),
    Reset,
}

pub(crate) struct ContainerState {
    pub(crate) engine: RefCell<ResizeEngine>,
    pending: RefCell<Vec<Deferred>>,
    template: Observable<String>,
    size: Observable<f64>,
    active: Observable<Option<ActivePair>>,
    overrides: BTreeMap<String, String>,
    _callbacks: Vec<Subscription>,
}

impl ContainerState {
    /// Exclusive engine access, after replaying deferred mutations.
    pub(crate) fn engine_mut(&self) -> Result<RefMut<'_, ResizeEngine>, SurfaceError> {
        self.settle();
        self.engine
            .try_borrow_mut()
            .map_err(|_| SurfaceError::EngineBusy)
    }

    pub(crate) fn defer(&self, op: Deferred) {
        debug!(message = "gridpane.container.deferred", ?op);
        self.pending.borrow_mut().push(op);
    }

    /// Apply mutations queued while the engine was borrowed. A no-op while
    /// the borrow is still held.
    pub(crate) fn settle(&self) {
        if self.pending.borrow().is_empty() {
            return;
        }
        let Ok(mut engine) = self.engine.try_borrow_mut() else {
            return;
        };
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let mut measured = None;
        let mut unmounted = Vec::new();
        for op in &pending {
            match *op {
                Deferred::Unmount(id) => {
                    if engine.unmount(id) {
                        unmounted.push(id);
                    }
                }
                Deferred::Resize(px) => {
                    if engine.set_container_size(px) {
                        measured = Some(engine.container_size());
                    }
                }
                Deferred::Reset => engine.reset_offsets(),
            }
        }
        drop(engine);
        debug!(
            message = "gridpane.container.settled",
            replayed = pending.len(),
            unmounted = unmounted.len()
        );

        let _batch = BatchScope::new();
        if let Some(px) = measured {
            self.size.set(px);
        }
        if self
            .active()
            .is_some_and(|pair| unmounted.iter().any(|id| pair.contains(*id)))
        {
            self.set_active(None);
        }
        self.refresh();
    }

    /// Recompute the template from the engine and publish it.
    pub(crate) fn refresh(&self) {
        let template = match self.engine.try_borrow() {
            Ok(engine) => engine.template(),
            Err(_) => {
                warn!(message = "gridpane.container.busy");
                return;
            }
        };
        if self.template.set(template) {
            trace!(message = "gridpane.template.updated", template = %self.template.get());
        }
    }

    pub(crate) fn set_active(&self, pair: Option<ActivePair>) {
        self.active.set(pair);
    }

    pub(crate) fn active(&self) -> Option<ActivePair> {
        self.active.get()
    }
}

/// A split container. Clones share the same state.
#[derive(Clone)]
pub struct Container {
    pub(crate) state: Rc<ContainerState>,
}

impl Container {
    /// Create an empty container of size zero.
    #[must_use]
    pub fn new(props: ContainerProps) -> Self {
        let template = Observable::new(String::new());
        let size = Observable::new(0.0_f64);
        let mut callbacks = Vec::new();
        if let Some(on_template) = props.on_template {
            callbacks.push(template.subscribe(move |value: &String| on_template(value.as_str())));
        }
        if let Some(on_size) = props.on_size {
            callbacks.push(size.subscribe(move |px: &f64| on_size(*px)));
        }
        Self {
            state: Rc::new(ContainerState {
                engine: RefCell::new(ResizeEngine::new(props.axis)),
                pending: RefCell::new(Vec::new()),
                template,
                size,
                active: Observable::new(None),
                overrides: props.style,
                _callbacks: callbacks,
            }),
        }
    }

    /// Build a container, its children and every nested container from a
    /// declarative layout.
    pub fn from_layout(spec: &LayoutSpec) -> Result<LayoutSurface, SurfaceError> {
        spec.validate()?;
        let container = Self::new(ContainerProps::new(spec.axis));
        let children = container.set_children(spec.children.iter().map(|child| {
            Lazy::Value(match child {
                ChildSpec::Pane { size, min, max, .. } => ChildNode::Pane(PaneProps {
                    size: *size,
                    min: *min,
                    max: *max,
                }),
                ChildSpec::Handle { size } => ChildNode::Handle(HandleProps { size: *size }),
            })
        }))?;
        let mut nested = Vec::new();
        for (child, mounted) in spec.children.iter().zip(&children) {
            if let ChildSpec::Pane {
                split: Some(inner), ..
            } = child
            {
                nested.push((mounted.id(), Self::from_layout(inner)?));
            }
        }
        Ok(LayoutSurface {
            container,
            children,
            nested,
        })
    }

    #[must_use]
    pub fn axis(&self) -> Axis {
        self.state.engine.borrow().axis()
    }

    /// Feed the container's measured size along its axis.
    ///
    /// While the engine is borrowed the size is queued and applied once the
    /// borrow ends.
    pub fn observe_size(&self, px: f64) {
        let measured = match self.state.engine_mut() {
            Ok(mut engine) => {
                if !engine.set_container_size(px) {
                    return;
                }
                engine.container_size()
            }
            Err(_) => {
                self.state.defer(Deferred::Resize(px));
                return;
            }
        };
        debug!(message = "gridpane.container.resized", px = measured);
        let _batch = BatchScope::new();
        self.state.size.set(measured);
        self.state.refresh();
    }

    #[must_use]
    pub fn measured_size(&self) -> f64 {
        self.state.size.get()
    }

    /// Current grid-template value.
    #[must_use]
    pub fn template(&self) -> String {
        self.state.template.get()
    }

    #[must_use]
    pub fn template_observable(&self) -> Observable<String> {
        self.state.template.clone()
    }

    #[must_use]
    pub fn size_observable(&self) -> Observable<f64> {
        self.state.size.clone()
    }

    /// CSS property the template belongs to.
    #[must_use]
    pub fn template_property(&self) -> &'static str {
        grid_template_property(self.axis())
    }

    /// Style declarations for the container element.
    #[must_use]
    pub fn style(&self) -> BTreeMap<String, String> {
        let mut style = BTreeMap::new();
        style.insert("display".to_owned(), "grid".to_owned());
        style.insert(self.template_property().to_owned(), self.template());
        style.extend(
            self.state
                .overrides
                .iter()
                .map(|(property, value)| (property.clone(), value.clone())),
        );
        style
    }

    /// Pair currently highlighted by a drag gesture.
    #[must_use]
    pub fn active_pair(&self) -> Option<ActivePair> {
        self.state.active()
    }

    /// Read-only access to the engine.
    ///
    /// Mutations requested from inside `f` (dropping a pane, a new measured
    /// size, a reset) are queued and applied when `f` returns.
    pub fn with_engine<R>(&self, f: impl FnOnce(&ResizeEngine) -> R) -> R {
        let result = f(&self.state.engine.borrow());
        self.state.settle();
        result
    }

    /// Discard every drag offset.
    pub fn reset(&self) {
        match self.state.engine_mut() {
            Ok(mut engine) => engine.reset_offsets(),
            Err(_) => {
                self.state.defer(Deferred::Reset);
                return;
            }
        }
        debug!(message = "gridpane.container.reset");
        self.state.refresh();
    }

    /// Resolve `children`, mount them and make them the container's child
    /// order.
    ///
    /// Nothing is mounted unless every child resolves and validates.
    /// Children mounted by earlier calls stay registered until their guards
    /// drop, but no longer take part in the layout.
    pub fn set_children(
        &self,
        children: impl IntoIterator<Item = Lazy<ChildNode>>,
    ) -> Result<Vec<MountedChild>, SurfaceError> {
        let nodes = resolve_all(children)?;
        let specs = nodes
            .iter()
            .map(|node| -> Result<_, SurfaceError> { Ok((node.role(), node.size_spec()?)) })
            .collect::<Result<Vec<_>, _>>()?;

        let _batch = BatchScope::new();
        // Declared before the borrow so a failed mount unmounts the earlier
        // children after the borrow is released.
        let mut mounted = Vec::with_capacity(specs.len());
        let mut engine = self.state.engine_mut()?;
        for (role, spec) in specs {
            let id = match role {
                NodeRole::Pane => engine.mount_pane(spec)?,
                NodeRole::Handle => engine.mount_handle(spec)?,
            };
            mounted.push(MountedChild::attach(self, role, id));
        }
        engine.set_order(mounted.iter().map(MountedChild::id));
        drop(engine);
        self.state.refresh();
        Ok(mounted)
    }

    pub(crate) fn downgrade(&self) -> Weak<ContainerState> {
        Rc::downgrade(&self.state)
    }

    pub(crate) fn owns(&self, state: &Weak<ContainerState>) -> bool {
        std::ptr::eq(state.as_ptr(), Rc::as_ptr(&self.state))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("axis", &self.axis())
            .field("measured_size", &self.measured_size())
            .field("template", &self.template())
            .finish()
    }
}

/// A container built from a [`LayoutSpec`], with its mounted children and
/// nested containers keyed by their host pane.
#[derive(Debug)]
pub struct LayoutSurface {
    pub container: Container,
    pub children: Vec<MountedChild>,
    pub nested: Vec<(NodeId, LayoutSurface)>,
}

impl LayoutSurface {
    /// Nested surface hosted by `pane`.
    #[must_use]
    pub fn nested(&self, pane: NodeId) -> Option<&LayoutSurface> {
        self.nested
            .iter()
            .find_map(|(host, surface)| (*host == pane).then_some(surface))
    }
}
