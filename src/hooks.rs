//! Hook primitives
//!
//! Hooks are identified by call position: the Nth hook call in one render is
//! the same logical hook as the Nth call in the next. Components must call
//! hooks unconditionally and in the same order on every render. The runtime
//! checks that the slot kind (and the state type) at each position still
//! matches and reports [`Error::HookOrderMismatch`] otherwise.
//!
//! ```ignore
//! fn counter(_: &Props) -> Result<Rendered> {
//!     let (count, set_count) = state(0)?;
//!     effect(move || { log(count); None }, deps![count])?;
//!     let inc = Callback::new(move |_| set_count.update(|n| n + 1));
//!     html!("<button onclick={}>{}</button>", inc, count)
//! }
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use tracing::trace;

use crate::error::{Error, Result};
use crate::instance::InstanceInner;
use crate::options::TemplateOptions;
use crate::scheduler;

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

struct RenderFrame {
    instance: Rc<InstanceInner>,
    cursor: usize,
}

thread_local! {
    // A stack so that rendering a nested instance inside a component body
    // hands the outer frame back afterwards.
    static FRAMES: RefCell<Vec<RenderFrame>> = const { RefCell::new(Vec::new()) };
}

/// Marks `instance` as current until dropped.
pub(crate) struct FrameGuard {
    instance: Rc<InstanceInner>,
}

impl FrameGuard {
    pub(crate) fn enter(instance: Rc<InstanceInner>) -> Self {
        instance.rendering.set(true);
        FRAMES.with(|frames| {
            frames.borrow_mut().push(RenderFrame {
                instance: instance.clone(),
                cursor: 0,
            })
        });
        FrameGuard { instance }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| frames.borrow_mut().pop());
        self.instance.rendering.set(false);
    }
}

/// Whether a component render is in progress on this thread.
pub fn is_rendering() -> bool {
    FRAMES.with(|frames| !frames.borrow().is_empty())
}

/// Template options of the instance being rendered, or the defaults outside a render.
pub fn template_options() -> TemplateOptions {
    FRAMES.with(|frames| {
        frames
            .borrow()
            .last()
            .map(|frame| frame.instance.options.template.clone())
            .unwrap_or_default()
    })
}

fn next_slot(hook: &'static str) -> Result<(Rc<InstanceInner>, usize)> {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        let frame = frames
            .last_mut()
            .ok_or(Error::InvalidHookContext { hook })?;
        let index = frame.cursor;
        frame.cursor += 1;
        Ok((frame.instance.clone(), index))
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// HOOK SLOTS
// ═══════════════════════════════════════════════════════════════════════════════

type StateCell = Rc<RefCell<Box<dyn Any>>>;

pub(crate) enum HookSlot {
    State(StateCell),
    Effect(Rc<EffectCell>),
}

impl HookSlot {
    fn kind(&self) -> &'static str {
        match self {
            HookSlot::State(_) => "state",
            HookSlot::Effect(_) => "effect",
        }
    }
}

impl fmt::Debug for HookSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[derive(Default)]
pub(crate) struct EffectCell {
    deps: RefCell<Option<Deps>>,
    cleanup: RefCell<Option<Cleanup>>,
}

impl EffectCell {
    pub(crate) fn take_cleanup(&self) -> Option<Cleanup> {
        self.cleanup.borrow_mut().take()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Declare a piece of state initialised with `initial` on the first render.
pub fn state<T>(initial: T) -> Result<(T, Setter<T>)>
where
    T: Clone + PartialEq + 'static,
{
    state_with(move || initial)
}

/// Like [`state`], but the initial value is only computed on the first render.
pub fn state_with<T, F>(init: F) -> Result<(T, Setter<T>)>
where
    T: Clone + PartialEq + 'static,
    F: FnOnce() -> T,
{
    let (instance, index) = next_slot("state")?;

    let needs_slot = index >= instance.hooks.borrow().len();
    if needs_slot {
        // Computed outside the borrow; the producer is user code.
        let value: Box<dyn Any> = Box::new(init());
        instance
            .hooks
            .borrow_mut()
            .push(HookSlot::State(Rc::new(RefCell::new(value))));
        trace!(instance = instance.id, index, "created state slot");
    }

    let cell = match &instance.hooks.borrow()[index] {
        HookSlot::State(cell) => cell.clone(),
        HookSlot::Effect(_) => {
            return Err(Error::HookOrderMismatch {
                index,
                expected: "state",
            })
        }
    };

    let value = cell
        .borrow()
        .downcast_ref::<T>()
        .cloned()
        .ok_or(Error::HookOrderMismatch {
            index,
            expected: "state",
        })?;

    Ok((
        value,
        Setter {
            cell,
            instance: Rc::downgrade(&instance),
            _marker: PhantomData,
        },
    ))
}

/// Writes one state slot and re-renders its component when the value changes.
pub struct Setter<T> {
    cell: StateCell,
    instance: Weak<InstanceInner>,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Setter {
            cell: self.cell.clone(),
            instance: self.instance.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("alive", &(self.instance.strong_count() > 0))
            .finish()
    }
}

impl<T> Setter<T>
where
    T: Clone + PartialEq + 'static,
{
    pub fn set(&self, next: T) -> Result<()> {
        self.update(move |_| next)
    }

    /// Compute the next value from the current one.
    ///
    /// Equal values are dropped without re-rendering, so calling a setter on
    /// every event is cheap.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let instance = self.instance.upgrade();
        if instance.as_ref().is_some_and(|i| i.disposed.get()) {
            return Ok(());
        }

        // The slot is not borrowed while `f` runs; it may write the same slot.
        let Some(current) = self.current() else {
            return Ok(());
        };
        let next = f(&current);
        if self.current().as_ref() == Some(&next) {
            return Ok(());
        }
        *self.cell.borrow_mut() = Box::new(next);

        match instance {
            Some(instance) => InstanceInner::update(&instance),
            None => Ok(()),
        }
    }

    /// The value currently stored in the slot.
    pub fn current(&self) -> Option<T> {
        self.cell.borrow().downcast_ref::<T>().cloned()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EFFECT
// ═══════════════════════════════════════════════════════════════════════════════

/// Teardown returned by an effect, run before the effect's next run or on dispose.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Cleanup(Box::new(f))
    }

    pub fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

/// One entry of a dependency list, compared with `PartialEq` against the
/// entry at the same position in the previous render.
pub trait Dependency: Any {
    fn same(&self, other: &dyn Dependency) -> bool;
    fn as_any(&self) -> &dyn Any;
}

impl<T: PartialEq + 'static> Dependency for T {
    fn same(&self, other: &dyn Dependency) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
pub struct Deps(Vec<Box<dyn Dependency>>);

impl Deps {
    pub fn new() -> Self {
        Deps(Vec::new())
    }

    pub fn with<T: PartialEq + 'static>(mut self, value: T) -> Self {
        self.0.push(Box::new(value));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same length and every position equal. A type change at a position
    /// counts as a difference.
    pub fn same_as(&self, other: &Deps) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(other.0.iter()).all(|(a, b)| a.same(&**b))
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deps(len = {})", self.0.len())
    }
}

/// Build the dependency list argument of [`effect`]: `deps![]` runs once,
/// `deps![a, b]` reruns when `a` or `b` changes.
#[macro_export]
macro_rules! deps {
    () => {
        ::std::option::Option::Some($crate::hooks::Deps::new())
    };
    ($($value:expr),+ $(,)?) => {
        ::std::option::Option::Some($crate::hooks::Deps::new()$(.with($value))+)
    };
}

/// Schedule `callback` to run after the render if `deps` changed.
///
/// `None` deps means "after every render". The run is queued only once the
/// render has committed; a failed render queues nothing and leaves the stored
/// dependencies untouched. The previous cleanup, if any, runs right before the
/// callback.
pub fn effect<F>(callback: F, deps: Option<Deps>) -> Result<()>
where
    F: FnOnce() -> Option<Cleanup> + 'static,
{
    let (instance, index) = next_slot("effect")?;

    let cell = {
        let mut hooks = instance.hooks.borrow_mut();
        if index >= hooks.len() {
            hooks.push(HookSlot::Effect(Rc::new(EffectCell::default())));
            trace!(instance = instance.id, index, "created effect slot");
        }
        match &hooks[index] {
            HookSlot::Effect(cell) => cell.clone(),
            HookSlot::State(_) => {
                return Err(Error::HookOrderMismatch {
                    index,
                    expected: "effect",
                })
            }
        }
    };

    let due = match (cell.deps.borrow().as_ref(), deps.as_ref()) {
        (Some(old), Some(new)) => !new.same_as(old),
        _ => true,
    };

    if due {
        trace!(instance = instance.id, index, "effect due");
        let owner = Rc::downgrade(&instance);
        let run_cell = cell.clone();
        instance.queue_effect(PendingEffect {
            index,
            cell,
            deps,
            task: Box::new(move || run_effect(owner, run_cell, callback)),
        });
    } else {
        // An earlier pass of the same render may have found it due.
        instance.drop_pending_effect(index);
    }
    Ok(())
}

/// A due effect held by its instance until the render commits.
pub(crate) struct PendingEffect {
    pub(crate) index: usize,
    cell: Rc<EffectCell>,
    deps: Option<Deps>,
    task: Box<dyn FnOnce()>,
}

impl PendingEffect {
    /// Record the dependencies this run was due for and queue the run.
    pub(crate) fn commit(self) {
        *self.cell.deps.borrow_mut() = self.deps;
        scheduler::schedule(self.task);
    }
}

fn run_effect<F>(owner: Weak<InstanceInner>, cell: Rc<EffectCell>, callback: F)
where
    F: FnOnce() -> Option<Cleanup>,
{
    match owner.upgrade() {
        Some(owner) if !owner.disposed.get() => {}
        Some(owner) => {
            trace!(instance = owner.id, "skipping effect of disposed instance");
            return;
        }
        None => {
            trace!("skipping effect of dropped instance");
            return;
        }
    }

    if let Some(cleanup) = cell.take_cleanup() {
        cleanup.run();
    }
    let cleanup = callback();
    *cell.cleanup.borrow_mut() = cleanup;
}
