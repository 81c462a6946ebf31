//! Components
//!
//! A component is a named render function, optionally with setup state.
//! Each mounted component node owns a [`ComponentInstance`] whose render
//! effect re-runs the render function whenever the reactive state it read
//! changes, and patches the previous subtree into the new one.
//!
//! Render effects are scheduled, not run inline: a state change queues the
//! effect's job and the update happens on the next flush, once per flush no
//! matter how many writes happened before it.
//!
//! Setup and data constructors run untracked, so state a child creates (or
//! reads) while it is being mounted never becomes a dependency of the parent
//! that is rendering it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::host::{HostAdapter, HostId};
use super::keyed::validate_keys;
use super::renderer::RendererInner;
use super::vnode::{NodeType, VNode};
use crate::error::{Result, SprigError};
use crate::reactive::{reactive, untracked, EffectKind, Object, Reactive, ReactiveEffect};
use crate::scheduler::{queue_job, Job};

/// A render function bound to one instance.
pub type RenderFn = Rc<dyn Fn() -> Result<VNode>>;

type SetupFn = Rc<dyn Fn() -> RenderFn>;
type DataFn = Rc<dyn Fn() -> Rc<Object>>;
type DataRenderFn = Rc<dyn Fn(&Reactive) -> Result<VNode>>;

enum Setup {
    Render(RenderFn),
    Setup(SetupFn),
    Data { data: DataFn, render: DataRenderFn },
}

struct DefInner {
    name: Rc<str>,
    setup: Setup,
}

/// A component definition. Cheap to clone; clones are the same component.
#[derive(Clone)]
pub struct ComponentDef {
    inner: Rc<DefInner>,
}

impl ComponentDef {
    /// A stateless component.
    pub fn new(name: &str, render: impl Fn() -> Result<VNode> + 'static) -> Self {
        Self::from_setup(name, Setup::Render(Rc::new(render)))
    }

    /// A component whose `setup` runs once per instance and returns the
    /// instance's render function. State created in `setup` lives as long
    /// as the instance.
    ///
    /// ```rust,ignore
    /// let counter = ComponentDef::with_setup("Counter", || {
    ///     let count = ref_value(0);
    ///     move || Ok(h("button").on("click", { let c = count.clone(); move || c.update(|n| *n += 1) })
    ///         .text(count.get().to_string()))
    /// });
    /// ```
    pub fn with_setup<S, R>(name: &str, setup: S) -> Self
    where
        S: Fn() -> R + 'static,
        R: Fn() -> Result<VNode> + 'static,
    {
        let setup: SetupFn = Rc::new(move || Rc::new(setup()) as RenderFn);
        Self::from_setup(name, Setup::Setup(setup))
    }

    /// A component with a reactive data object. `data` builds a fresh object
    /// per instance; `render` receives its reactive view.
    pub fn with_data<D, R>(name: &str, data: D, render: R) -> Self
    where
        D: Fn() -> Rc<Object> + 'static,
        R: Fn(&Reactive) -> Result<VNode> + 'static,
    {
        Self::from_setup(
            name,
            Setup::Data {
                data: Rc::new(data),
                render: Rc::new(render),
            },
        )
    }

    fn from_setup(name: &str, setup: Setup) -> Self {
        Self {
            inner: Rc::new(DefInner {
                name: name.into(),
                setup,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether `self` and `other` are the same component.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn instantiate(&self) -> (RenderFn, Option<Reactive>) {
        match &self.inner.setup {
            Setup::Render(render) => (render.clone(), None),
            Setup::Setup(setup) => (setup(), None),
            Setup::Data { data, render } => {
                let state = reactive(&data());
                let render = render.clone();
                let bound = state.clone();
                (Rc::new(move || render(&bound)), Some(state))
            }
        }
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentDef").field(&self.name()).finish()
    }
}

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// One mounted occurrence of a component.
pub struct ComponentInstance {
    uid: u64,
    def: ComponentDef,
    render: RenderFn,
    data: Option<Reactive>,
    sub_tree: RefCell<Option<Rc<VNode>>>,
    is_mounted: Cell<bool>,
    effect: RefCell<Option<ReactiveEffect>>,
}

impl ComponentInstance {
    fn new(def: &ComponentDef) -> Self {
        let (render, data) = def.instantiate();
        Self {
            uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
            def: def.clone(),
            render,
            data,
            sub_tree: RefCell::new(None),
            is_mounted: Cell::new(false),
            effect: RefCell::new(None),
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn def(&self) -> &ComponentDef {
        &self.def
    }

    /// Reactive data of a [`ComponentDef::with_data`] component.
    pub fn data(&self) -> Option<&Reactive> {
        self.data.as_ref()
    }

    /// The tree produced by the last successful render.
    pub fn sub_tree(&self) -> Option<Rc<VNode>> {
        self.sub_tree.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    /// How many times the render effect has run.
    pub fn render_count(&self) -> usize {
        self.effect
            .borrow()
            .as_ref()
            .map_or(0, ReactiveEffect::run_count)
    }

    /// The render effect, while the instance is mounted.
    pub fn update_effect(&self) -> Option<ReactiveEffect> {
        self.effect.borrow().clone()
    }

    pub(crate) fn stop(&self) {
        let effect = self.effect.borrow_mut().take();
        if let Some(effect) = effect {
            effect.stop();
        }
        self.is_mounted.set(false);
    }

    fn render_root(&self) -> Result<VNode> {
        (self.render)().map_err(|err| match err {
            SprigError::Render { .. } => err,
            other => SprigError::render(self.name(), other.to_string()),
        })
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.uid)
            .field("name", &self.name())
            .field("is_mounted", &self.is_mounted.get())
            .finish()
    }
}

impl<H: HostAdapter + 'static> RendererInner<H> {
    /// Create the instance for `vnode`, wire its render effect and run the
    /// first render. A failing render is reported and leaves nothing in the
    /// host; structural errors propagate.
    pub(crate) fn mount_component(
        self: &Rc<Self>,
        vnode: &VNode,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        let NodeType::Component(def) = &vnode.node_type else {
            return Ok(());
        };

        let instance = Rc::new(untracked(|| ComponentInstance::new(def)));
        *vnode.component.borrow_mut() = Some(instance.clone());

        let renderer = Rc::downgrade(self);
        let weak_instance = Rc::downgrade(&instance);
        let effect = ReactiveEffect::new_cyclic(EffectKind::Effect, |weak_effect| {
            let body: Box<dyn Fn()> = Box::new(move || {
                let (Some(renderer), Some(instance)) = (renderer.upgrade(), weak_instance.upgrade())
                else {
                    return;
                };
                if let Err(err) = renderer.update_component(&instance, container, anchor) {
                    renderer.report(&err);
                }
            });

            let weak_effect = weak_effect.clone();
            let job: Job = Rc::new(move || {
                if let Some(effect) = weak_effect.upgrade() {
                    if effect.is_active() {
                        effect.run();
                    }
                }
            });
            let scheduler: Rc<dyn Fn()> = Rc::new(move || queue_job(job.clone()));
            (body, Some(scheduler))
        });
        *instance.effect.borrow_mut() = Some(effect.clone());

        match effect.run_with(|| self.update_component(&instance, container, anchor)) {
            Err(err @ SprigError::Render { .. }) => {
                self.report(&err);
                Ok(())
            }
            other => other,
        }
    }

    fn update_component(
        self: &Rc<Self>,
        instance: &ComponentInstance,
        container: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        let next = instance.render_root()?;
        validate_keys(&next)?;
        let next = Rc::new(next);
        let prev = instance.sub_tree();

        match prev {
            None => {
                self.patch(None, &next, container, anchor)?;
                instance.is_mounted.set(true);
                debug!(
                    target: "sprig::render",
                    component = instance.name(),
                    uid = instance.uid,
                    "component mounted"
                );
            }
            Some(prev) => {
                let parent = self
                    .host_el(&prev)
                    .and_then(|el| self.host.borrow().parent_node(el))
                    .unwrap_or(container);
                self.patch(Some(&prev), &next, parent, None)?;
                debug!(
                    target: "sprig::render",
                    component = instance.name(),
                    uid = instance.uid,
                    "component updated"
                );
            }
        }

        *instance.sub_tree.borrow_mut() = Some(next);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
