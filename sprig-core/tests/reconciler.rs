//! Integration Tests for the Reconciler
//!
//! These tests drive the renderer through the in-memory host and check both
//! the resulting tree and the operations it took to get there.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;

use sprig_core::reactive::{ref_value, Ref};
use sprig_core::render::{
    component, create_app, fragment, h, ComponentDef, HostId, HostOp, MemoryHost, Renderer, VNode,
};
use sprig_core::scheduler::flush_jobs;
use sprig_core::SprigError;

fn keyed_list(keys: &[u32]) -> VNode {
    h("ul").children(keys.iter().map(|k| h("li").key(*k).text(k.to_string())))
}

fn setup() -> (Renderer<MemoryHost>, HostId) {
    let mut host = MemoryHost::new();
    let root = host.create_root();
    (Renderer::new(host), root)
}

fn handles_by_key(renderer: &Renderer<MemoryHost>, root: HostId) -> HashMap<String, HostId> {
    let tree = renderer.root(root).expect("mounted");
    tree.child_nodes()
        .iter()
        .filter_map(|node| Some((node.key_ref()?.to_string(), node.el()?)))
        .collect()
}

/// Test the minimal-move property on a rotation.
#[test]
fn rotation_relocates_exactly_one_node() {
    let (renderer, root) = setup();
    renderer.render(Some(keyed_list(&[1, 2, 3])), root).unwrap();
    renderer.with_host_mut(MemoryHost::clear_ops);

    renderer.render(Some(keyed_list(&[3, 1, 2])), root).unwrap();

    let moves: Vec<HostOp> = renderer.with_host(|host| {
        host.ops()
            .iter()
            .filter(|op| matches!(op, HostOp::Move { .. }))
            .cloned()
            .collect()
    });
    assert_eq!(moves.len(), 1);
}

/// Test that a middle insertion leaves its siblings alone.
#[test]
fn insertion_moves_nothing() {
    let (renderer, root) = setup();
    renderer.render(Some(keyed_list(&[1, 2, 3])), root).unwrap();
    let before = handles_by_key(&renderer, root);
    renderer.with_host_mut(MemoryHost::clear_ops);

    renderer.render(Some(keyed_list(&[1, 9, 2, 3])), root).unwrap();
    let after = handles_by_key(&renderer, root);

    renderer.with_host(|host| {
        assert_eq!(host.moves(), 0);
        let ul = renderer.root(root).unwrap().el().unwrap();
        assert_eq!(host.children(ul)[1], after["9"]);
    });
    for key in ["1", "2", "3"] {
        assert_eq!(before[key], after[key]);
    }
}

/// Test that a middle removal unmounts only that node.
#[test]
fn removal_moves_nothing() {
    let (renderer, root) = setup();
    renderer.render(Some(keyed_list(&[1, 2, 3])), root).unwrap();
    let removed = handles_by_key(&renderer, root)["2"];
    renderer.with_host_mut(MemoryHost::clear_ops);

    renderer.render(Some(keyed_list(&[1, 3])), root).unwrap();

    let ops = renderer.with_host(|host| host.ops().to_vec());
    assert_eq!(ops, vec![HostOp::Remove { child: removed }]);
}

/// Test that replacing a node by one of another type unmounts the old host
/// node before the new one exists, and carries no props over.
#[test]
fn type_change_is_a_full_replacement() {
    let (renderer, root) = setup();
    renderer
        .render(Some(h("section").children([h("div").key("x").prop("title", "t")])), root)
        .unwrap();
    let old = handles_by_key(&renderer, root)["x"];
    renderer.with_host_mut(MemoryHost::clear_ops);

    renderer
        .render(Some(h("section").children([h("p").key("x")])), root)
        .unwrap();
    let new = handles_by_key(&renderer, root)["x"];

    let ops = renderer.with_host(|host| host.ops().to_vec());
    assert_eq!(ops[0], HostOp::Remove { child: old });
    assert!(matches!(&ops[1], HostOp::Create { id, kind } if *id == new && kind == "p"));
    renderer.with_host(|host| assert_eq!(host.attribute(new, "title"), None));
}

/// Test that a duplicate key fails the render instead of misplacing nodes.
#[test]
fn duplicate_keys_are_rejected() {
    let (renderer, root) = setup();
    let err = renderer.render(Some(keyed_list(&[4, 4])), root).unwrap_err();
    assert!(matches!(err, SprigError::DuplicateKey { ref key } if key == "4"));
}

/// Test that a rejected render leaves the host untouched and the container
/// usable for the next render.
#[test]
fn container_recovers_after_duplicate_keys() {
    let (renderer, root) = setup();
    renderer.render(Some(keyed_list(&[1, 2])), root).unwrap();
    renderer.with_host_mut(MemoryHost::clear_ops);

    let err = renderer.render(Some(keyed_list(&[1, 1])), root).unwrap_err();
    assert!(matches!(err, SprigError::DuplicateKey { .. }));
    renderer.with_host(|host| {
        assert!(host.ops().is_empty());
        assert_eq!(host.serialize(root), "<ul><li>1</li><li>2</li></ul>");
    });

    renderer.render(Some(keyed_list(&[1, 2, 3])), root).unwrap();
    renderer.with_host(|host| {
        assert_eq!(host.serialize(root), "<ul><li>1</li><li>2</li><li>3</li></ul>");
        assert_eq!(host.creates(), 1);
    });
}

/// Test that duplicates deep inside an unchanged parent are caught too.
#[test]
fn nested_duplicate_keys_are_rejected_up_front() {
    let (renderer, root) = setup();
    let page = |keys: &[u32]| h("main").children([h("h1").text("t"), keyed_list(keys)]);
    renderer.render(Some(page(&[1, 2])), root).unwrap();
    renderer.with_host_mut(MemoryHost::clear_ops);

    assert!(renderer.render(Some(page(&[2, 2])), root).is_err());
    renderer.with_host(|host| assert!(host.ops().is_empty()));

    renderer.render(Some(page(&[2, 1])), root).unwrap();
    assert_eq!(
        renderer.with_host(|host| host.serialize(root)),
        "<main><h1>t</h1><ul><li>2</li><li>1</li></ul></main>"
    );
}

/// Test that integer and string keys with the same text are different keys.
#[test]
fn integer_and_string_keys_do_not_collide() {
    let (renderer, root) = setup();
    let list = h("ul").children([h("li").key(1).text("int"), h("li").key("1").text("str")]);
    renderer.render(Some(list), root).unwrap();
    assert_eq!(
        renderer.with_host(|host| host.serialize(root)),
        "<ul><li>int</li><li>str</li></ul>"
    );
}

/// Test keyed reordering of fragments and components.
#[test]
fn fragments_and_components_move_as_units() {
    let (renderer, root) = setup();
    let card = ComponentDef::new("Card", || Ok(h("article").text("card")));
    let build = |card_first: bool| {
        let pair = fragment([h("dt").text("k"), h("dd").text("v")]).key("pair");
        let card = component(&card).key("card");
        if card_first {
            h("dl").children([card, pair])
        } else {
            h("dl").children([pair, card])
        }
    };

    renderer.render(Some(build(false)), root).unwrap();
    let instance = renderer.root(root).unwrap().child_nodes()[1]
        .component_instance()
        .unwrap();
    renderer.render(Some(build(true)), root).unwrap();

    let html = renderer.with_host(|host| host.serialize(root));
    assert_eq!(html, "<dl><article>card</article><dt>k</dt><dd>v</dd></dl>");
    let carried = renderer.root(root).unwrap().child_nodes()[0]
        .component_instance()
        .unwrap();
    assert!(Rc::ptr_eq(&instance, &carried));
    assert_eq!(carried.render_count(), 1);
}

/// Test a small app: state changes re-render through the scheduler and
/// event handlers are swapped without re-binding.
#[test]
fn todo_app_round_trip() {
    let items: Ref<Vec<String>> = ref_value(vec!["milk".to_string()]);
    let list = items.clone();
    let adder = items.clone();
    let root_def = ComponentDef::new("Todos", move || {
        let add = adder.clone();
        Ok(h("div").children([
            h("button")
                .on("click", move || add.update(|v| v.insert(0, format!("item{}", v.len()))))
                .text("add"),
            h("ul").children(list.get().into_iter().map(|item| h("li").key(item.as_str()).text(item))),
        ]))
    });

    let mut host = MemoryHost::new();
    let container = host.create_root();
    let app = create_app(host, &root_def);
    app.mount(container).unwrap();

    let button = {
        let tree = app.root_instance().unwrap().sub_tree().unwrap();
        tree.child_nodes()[0].el().unwrap()
    };
    app.renderer().with_host_mut(MemoryHost::clear_ops);

    assert!(app.renderer().dispatch(button, "click"));
    assert!(app.renderer().dispatch(button, "click"));
    flush_jobs();

    let renderer = app.renderer();
    assert_eq!(
        renderer.with_host(|host| host.serialize(container)),
        "<div><button>add</button><ul><li>item2</li><li>item1</li><li>milk</li></ul></div>"
    );
    renderer.with_host(|host| {
        assert_eq!(host.moves(), 0);
        assert!(!host
            .ops()
            .iter()
            .any(|op| matches!(op, HostOp::AddListener { .. } | HostOp::RemoveListener { .. })));
    });
    assert_eq!(app.root_instance().unwrap().render_count(), 2);
}

/// Test that render failures go to the hook, not to the caller of mount.
#[test]
fn render_failure_reaches_the_hook() {
    let mut host = MemoryHost::new();
    let container = host.create_root();
    let failing = ComponentDef::new("Failing", || Err(SprigError::render("Failing", "bad state")));
    let app = create_app(host, &failing);

    let reports = Rc::new(RefCell::new(Vec::new()));
    let sink = reports.clone();
    app.renderer().on_error(move |err| sink.borrow_mut().push(err.to_string()));

    app.mount(container).unwrap();
    assert_eq!(reports.borrow().len(), 1);
    assert!(reports.borrow()[0].contains("Failing"));
}

/// Test that a child re-render lands in the right place among siblings.
#[test]
fn child_update_stays_in_position() {
    let (renderer, root) = setup();
    let label = ref_value("a".to_string());
    let l = label.clone();
    let child = ComponentDef::new("Label", move || Ok(h("em").text(l.get())));
    let renders = Rc::new(Cell::new(0));
    let r = renders.clone();
    let child_def = child.clone();
    let parent = ComponentDef::new("Row", move || {
        r.set(r.get() + 1);
        Ok(h("p").children([h("b"), component(&child_def), h("i")]))
    });

    renderer.render(Some(component(&parent)), root).unwrap();
    label.set("z".to_string());
    flush_jobs();

    assert_eq!(
        renderer.with_host(|host| host.serialize(root)),
        "<p><b></b><em>z</em><i></i></p>"
    );
    assert_eq!(renders.get(), 1);
}

fn key_lists() -> impl Strategy<Value = (Vec<u32>, Vec<u32>)> {
    let pool: Vec<u32> = (0..24).collect();
    let list = proptest::sample::subsequence(pool, 0..24).prop_shuffle();
    (list.clone(), list)
}

proptest! {
    #[test]
    fn keyed_diff_matches_a_fresh_mount((old, new) in key_lists()) {
        let (renderer, root) = setup();
        renderer.render(Some(keyed_list(&old)), root).unwrap();
        let before = handles_by_key(&renderer, root);

        renderer.render(Some(keyed_list(&new)), root).unwrap();
        let after = handles_by_key(&renderer, root);

        let (fresh, fresh_root) = setup();
        fresh.render(Some(keyed_list(&new)), fresh_root).unwrap();

        prop_assert_eq!(
            renderer.with_host(|host| host.serialize(root)),
            fresh.with_host(|host| host.serialize(fresh_root))
        );

        // Surviving keys keep their host node.
        for (key, el) in &after {
            if let Some(previous) = before.get(key) {
                prop_assert_eq!(previous, el);
            }
        }

        // No more moves than nodes that survived.
        let survivors = after.keys().filter(|k| before.contains_key(*k)).count();
        prop_assert!(renderer.with_host(MemoryHost::moves) <= survivors);
    }
}
