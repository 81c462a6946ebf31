//! Application root.

use std::cell::Cell;
use std::rc::Rc;

use tracing::info;

use super::component::{ComponentDef, ComponentInstance};
use super::host::{HostAdapter, HostId};
use super::renderer::Renderer;
use super::vnode::VNode;
use crate::error::Result;

/// A root component bound to a renderer, mountable into one container.
pub struct App<H: HostAdapter + 'static> {
    renderer: Renderer<H>,
    root: ComponentDef,
    container: Cell<Option<HostId>>,
}

impl<H: HostAdapter + 'static> App<H> {
    pub(crate) fn new(renderer: Renderer<H>, root: ComponentDef) -> Self {
        Self {
            renderer,
            root,
            container: Cell::new(None),
        }
    }

    /// Render the root component into `container`. Mounting again moves the
    /// app: the previous container is cleared first.
    pub fn mount(&self, container: HostId) -> Result<()> {
        if let Some(previous) = self.container.take() {
            self.renderer.render(None, previous)?;
        }
        self.renderer
            .render(Some(VNode::component(&self.root)), container)?;
        self.container.set(Some(container));
        info!(target: "sprig::render", app = self.root.name(), %container, "app mounted");
        Ok(())
    }

    /// Tear the app down. A no-op when it is not mounted.
    pub fn unmount(&self) -> Result<()> {
        match self.container.take() {
            Some(container) => {
                self.renderer.render(None, container)?;
                info!(target: "sprig::render", app = self.root.name(), "app unmounted");
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.container.get().is_some()
    }

    /// The root component's instance while mounted.
    pub fn root_instance(&self) -> Option<Rc<ComponentInstance>> {
        let container = self.container.get()?;
        self.renderer.root(container)?.component_instance()
    }

    pub fn renderer(&self) -> &Renderer<H> {
        &self.renderer
    }
}

/// Create a renderer over `host` and an app rendering `root` through it.
///
/// ```rust,ignore
/// let mut host = MemoryHost::new();
/// let container = host.create_root();
/// let app = create_app(host, &ComponentDef::new("App", || Ok(h("main").text("hi"))));
/// app.mount(container)?;
/// ```
pub fn create_app<H: HostAdapter + 'static>(host: H, root: &ComponentDef) -> App<H> {
    Renderer::new(host).create_app(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{h, MemoryHost};

    #[test]
    fn mount_and_unmount() {
        let mut host = MemoryHost::new();
        let container = host.create_root();
        let app = create_app(host, &ComponentDef::new("App", || Ok(h("main").text("hi"))));

        app.mount(container).unwrap();
        assert!(app.is_mounted());
        assert_eq!(app.root_instance().unwrap().name(), "App");
        assert_eq!(app.renderer().with_host(|h| h.serialize(container)), "<main>hi</main>");

        app.unmount().unwrap();
        assert!(!app.is_mounted());
        assert_eq!(app.renderer().with_host(|h| h.serialize(container)), "");
        app.unmount().unwrap();
    }

    #[test]
    fn remount_moves_to_the_new_container() {
        let mut host = MemoryHost::new();
        let first = host.create_root();
        let second = host.create_root();
        let app = create_app(host, &ComponentDef::new("App", || Ok(h("p"))));

        app.mount(first).unwrap();
        app.mount(second).unwrap();
        app.renderer().with_host(|h| {
            assert_eq!(h.serialize(first), "");
            assert_eq!(h.serialize(second), "<p></p>");
        });
    }
}
