//! Mount/render driver
//!
//! `mount` turns a component into a root instance bound to a container. The
//! root render always rebuilds the container's content from scratch; there is
//! no patching of a previous tree.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use crate::error::Result;
use crate::instance::{empty_props, ComponentInstance, InstanceId, InstanceInner, Props, RootRender};
use crate::options::MountOptions;
use crate::vnode::{Child, Rendered};

// ═══════════════════════════════════════════════════════════════════════════════
// PLATFORM CONTRACTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Passed to the materializer with every node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeContext {
    pub instance: InstanceId,
    pub library_tag: String,
}

/// Turns a virtual node into a platform element.
pub trait Materializer {
    type Element;

    fn materialize(&self, node: &Child, ctx: &MaterializeContext) -> Result<Self::Element>;
}

/// A platform element handle that mounted content is attached to.
pub trait Container {
    type Element;

    fn clear(&self);
    fn append(&self, element: Self::Element);
}

struct RootBinding<C, M> {
    container: C,
    materializer: M,
}

impl<C, M> RootRender for RootBinding<C, M>
where
    M: Materializer,
    C: Container<Element = M::Element>,
{
    fn render(&self, instance: &Rc<InstanceInner>) -> Result<()> {
        let rendered = instance.render_tree()?;
        let ctx = MaterializeContext {
            instance: instance.id,
            library_tag: instance.options.template.library_tag.clone(),
        };

        // Materialize everything first so a failure leaves the old content in place.
        let elements = rendered
            .children()
            .iter()
            .map(|child| self.materializer.materialize(child, &ctx))
            .collect::<Result<Vec<_>>>();
        let elements = match elements {
            Ok(elements) => elements,
            Err(err) => {
                instance.discard_effects();
                return Err(err);
            }
        };

        self.container.clear();
        for element in elements {
            self.container.append(element);
        }
        instance.commit_effects();
        Ok(())
    }

    fn clear(&self) {
        self.container.clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ROOT REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

thread_local! {
    // Mounted roots stay alive here until unmounted, whether or not the
    // caller keeps the returned handle.
    static ROOTS: RefCell<HashMap<InstanceId, ComponentInstance>> = RefCell::new(HashMap::new());
}

/// Number of roots currently mounted on this thread.
pub fn mounted_roots() -> usize {
    ROOTS.with(|roots| roots.borrow().len())
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Mount `component` into `container` with empty props and default options.
///
/// Renders once before returning. Effects from that render are queued, not run.
pub fn mount<F, C, M>(component: F, container: C, materializer: M) -> Result<ComponentInstance>
where
    F: Fn(&Props) -> Result<Rendered> + 'static,
    M: Materializer + 'static,
    C: Container<Element = M::Element> + 'static,
{
    mount_with(
        MountOptions::default(),
        empty_props(),
        component,
        container,
        materializer,
    )
}

pub fn mount_with<F, C, M>(
    options: MountOptions,
    props: Props,
    component: F,
    container: C,
    materializer: M,
) -> Result<ComponentInstance>
where
    F: Fn(&Props) -> Result<Rendered> + 'static,
    M: Materializer + 'static,
    C: Container<Element = M::Element> + 'static,
{
    let instance = ComponentInstance::with_options(component, props, options);
    let binding: Rc<dyn RootRender> = Rc::new(RootBinding {
        container,
        materializer,
    });
    *instance.inner.root.borrow_mut() = Some(binding.clone());

    debug!(instance = instance.id(), "mounting root");
    binding.render(&instance.inner)?;
    instance.inner.mounted.set(true);

    ROOTS.with(|roots| {
        roots
            .borrow_mut()
            .insert(instance.id(), instance.clone())
    });
    Ok(instance)
}

impl ComponentInstance {
    /// Dispose a mounted root, clear its container and release it.
    pub fn unmount(&self) {
        let root = self.inner.root.borrow().clone();
        self.dispose();
        if let Some(root) = root {
            root.clear();
        }
        ROOTS.with(|roots| roots.borrow_mut().remove(&self.id()));
        debug!(instance = self.id(), "unmounted root");
    }
}
