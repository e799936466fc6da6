//! Component instances
//!
//! An instance pairs a component function with its hook storage. Rendering
//! makes it the current instance for the hook primitives; an accepted state
//! change runs the update path, which always re-renders the whole component.

use serde_json::{Map, Value as JsonValue};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{Error, Result};
use crate::hooks::{FrameGuard, HookSlot, PendingEffect};
use crate::options::MountOptions;
use crate::vnode::Rendered;

/// Component props. Mounted roots start with an empty object.
pub type Props = JsonValue;

pub type InstanceId = u64;

static INSTANCE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_instance_id() -> InstanceId {
    INSTANCE_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

pub fn empty_props() -> Props {
    JsonValue::Object(Map::new())
}

type ComponentFn = Box<dyn Fn(&Props) -> Result<Rendered>>;

/// Re-renders a top-level instance into its container.
pub(crate) trait RootRender {
    fn render(&self, instance: &Rc<InstanceInner>) -> Result<()>;
    fn clear(&self);
}

pub(crate) struct InstanceInner {
    pub(crate) id: InstanceId,
    component: ComponentFn,
    props: RefCell<Props>,
    pub(crate) hooks: RefCell<Vec<HookSlot>>,
    /// Effects found due by the render in progress, keyed by slot index.
    pending_effects: RefCell<Vec<PendingEffect>>,
    vnode: RefCell<Rendered>,
    pub(crate) options: MountOptions,
    pub(crate) mounted: Cell<bool>,
    pub(crate) rendering: Cell<bool>,
    /// State was set while rendering; the current render must run again.
    dirty: Cell<bool>,
    pub(crate) disposed: Cell<bool>,
    pub(crate) root: RefCell<Option<Rc<dyn RootRender>>>,
}

impl InstanceInner {
    /// Run the component until it renders without setting its own state.
    ///
    /// Due effects stay pending on the instance; the caller commits them once
    /// the output has been used, or discards them. On error they are discarded
    /// here.
    pub(crate) fn render_tree(self: &Rc<Self>) -> Result<Rendered> {
        let result = self.render_passes();
        if result.is_err() {
            self.discard_effects();
        }
        result
    }

    fn render_passes(self: &Rc<Self>) -> Result<Rendered> {
        let limit = self.options.max_render_passes;
        for pass in 1..=limit {
            self.dirty.set(false);
            let output = {
                let _frame = FrameGuard::enter(self.clone());
                let props = self.props.borrow().clone();
                (self.component)(&props)?
            };
            if !self.dirty.get() {
                debug!(instance = self.id, pass, "rendered component");
                *self.vnode.borrow_mut() = output.clone();
                return Ok(output);
            }
        }
        Err(Error::RenderLoop { limit })
    }

    /// Render and hand the due effects to the scheduler.
    pub(crate) fn render(self: &Rc<Self>) -> Result<Rendered> {
        let output = self.render_tree()?;
        self.commit_effects();
        Ok(output)
    }

    pub(crate) fn queue_effect(&self, effect: PendingEffect) {
        let mut pending = self.pending_effects.borrow_mut();
        pending.retain(|queued| queued.index != effect.index);
        pending.push(effect);
    }

    pub(crate) fn drop_pending_effect(&self, index: usize) {
        self.pending_effects
            .borrow_mut()
            .retain(|queued| queued.index != index);
    }

    /// Queue the pending effects in slot order.
    pub(crate) fn commit_effects(&self) {
        let mut pending = self.pending_effects.take();
        pending.sort_by_key(|effect| effect.index);
        for effect in pending {
            effect.commit();
        }
    }

    pub(crate) fn discard_effects(&self) {
        let dropped = self.pending_effects.take().len();
        if dropped > 0 {
            debug!(instance = self.id, dropped, "discarded effects of failed render");
        }
    }

    /// Update path run by state setters.
    pub(crate) fn update(self: &Rc<Self>) -> Result<()> {
        if self.disposed.get() {
            return Ok(());
        }
        if self.rendering.get() {
            self.dirty.set(true);
            return Ok(());
        }

        let root = self.root.borrow().clone();
        match root {
            Some(root) => {
                debug!(instance = self.id, "re-rendering root");
                root.render(self)
            }
            // No patching path for nested instances: the new tree is only stored.
            None => self.render().map(|_| ()),
        }
    }
}

/// Handle to a component instance. Clones share the same instance.
#[derive(Clone)]
pub struct ComponentInstance {
    pub(crate) inner: Rc<InstanceInner>,
}

impl ComponentInstance {
    pub fn new<F>(component: F, props: Props) -> Self
    where
        F: Fn(&Props) -> Result<Rendered> + 'static,
    {
        Self::with_options(component, props, MountOptions::default())
    }

    pub fn with_options<F>(component: F, props: Props, options: MountOptions) -> Self
    where
        F: Fn(&Props) -> Result<Rendered> + 'static,
    {
        ComponentInstance {
            inner: Rc::new(InstanceInner {
                id: generate_instance_id(),
                component: Box::new(component),
                props: RefCell::new(props),
                hooks: RefCell::new(Vec::new()),
                pending_effects: RefCell::new(Vec::new()),
                vnode: RefCell::new(Rendered::Empty),
                options,
                mounted: Cell::new(false),
                rendering: Cell::new(false),
                dirty: Cell::new(false),
                disposed: Cell::new(false),
                root: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Render the component now and keep the result as its current tree.
    pub fn render(&self) -> Result<Rendered> {
        self.inner.render()
    }

    /// Run the update path as if state had changed.
    pub fn update(&self) -> Result<()> {
        InstanceInner::update(&self.inner)
    }

    /// The tree produced by the last render.
    pub fn vnode(&self) -> Rendered {
        self.inner.vnode.borrow().clone()
    }

    pub fn props(&self) -> Props {
        self.inner.props.borrow().clone()
    }

    /// Replace the props and run the update path.
    pub fn set_props(&self, props: Props) -> Result<()> {
        *self.inner.props.borrow_mut() = props;
        self.update()
    }

    pub fn hook_count(&self) -> usize {
        self.inner.hooks.borrow().len()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    pub fn is_root(&self) -> bool {
        self.inner.root.borrow().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Tear the instance down: run every stored effect cleanup in slot order,
    /// skip its queued effects and turn its setters into no-ops.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.mounted.set(false);
        self.inner.root.borrow_mut().take();

        let cleanups: Vec<_> = self
            .inner
            .hooks
            .borrow()
            .iter()
            .filter_map(|slot| match slot {
                HookSlot::Effect(cell) => cell.take_cleanup(),
                HookSlot::State(_) => None,
            })
            .collect();
        debug!(
            instance = self.inner.id,
            cleanups = cleanups.len(),
            "disposing instance"
        );
        for cleanup in cleanups {
            cleanup.run();
        }
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.inner.id)
            .field("hooks", &*self.inner.hooks.borrow())
            .field("mounted", &self.inner.mounted.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}
