//! Tray resource tree tests
//!
//! End-to-end behavior of trays, menus and entries against the headless
//! backend: building, clicking, removing and tearing down.

mod common;

use bindery_runtime::{EntryFlags, EntryOptions, Tray, TrayEntry, TrayOptions};
use common::*;
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ===== Building =====

#[test]
fn test_button_click_reaches_action_once() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, Some("Demo")).unwrap();
    let menu = tray.create_menu().unwrap();

    let seen: Rc<RefCell<Vec<TrayEntry>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let open = menu
        .build(EntryOptions::button("Open").with_action(move |entry| sink.borrow_mut().push(entry.clone())))
        .unwrap();

    open.click();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], open);
    assert_eq!(open.flags(), EntryFlags::BUTTON);
}

#[test]
fn test_submenu_child_removal_leaves_sibling() {
    let (api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let menu = tray.create_menu().unwrap();

    let more = menu
        .build(EntryOptions::submenu(
            "More",
            vec![EntryOptions::button("First"), EntryOptions::button("Second")],
        ))
        .unwrap();
    assert!(more.flags().contains(EntryFlags::SUBMENU));

    let submenu = more.submenu().unwrap();
    let children = submenu.entries();
    assert_eq!(children.len(), 2);

    children[0].remove();

    let left = submenu.entries();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].label().as_deref(), Some("Second"));
    assert!(!children[0].is_live());
    assert_eq!(api.live_objects().entries, 2);
}

#[test]
fn test_checked_option_infers_checkbox() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let menu = tray.create_menu().unwrap();

    let entry = menu
        .build(EntryOptions {
            label: Some("Mute".into()),
            checked: Some(true),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(entry.flags(), EntryFlags::CHECKBOX | EntryFlags::CHECKED);
    assert!(entry.checked());
}

#[test]
fn test_positions_out_of_range_fail() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let menu = tray.create_menu().unwrap();
    menu.append_entry(Some("a"), EntryFlags::BUTTON).unwrap();

    for position in [-2, 2] {
        let err = menu.insert_entry(position, Some("x"), EntryFlags::BUTTON).unwrap_err();
        assert_eq!(err.operation(), Some("SDL_InsertTrayEntryAt"));
        assert!(err.to_string().contains("Invalid entry position"), "{}", err);
    }
    assert_eq!(menu.len(), 1);
}

#[test]
fn test_create_builds_icon_tooltip_and_tree() {
    let dir = tempfile::TempDir::new().unwrap();
    let icon = bmp_file(&dir, "icon.bmp");
    let (api, ctx) = headless();

    let tray = Tray::create(
        &ctx,
        TrayOptions {
            icon: Some(icon),
            tooltip: Some("Demo".into()),
            entries: vec![
                EntryOptions::button("Open"),
                EntryOptions::separator(),
                EntryOptions::button("Quit"),
            ],
        },
    )
    .unwrap();

    let raw = tray.handle().unwrap().raw();
    assert!(!api.tray_icon(raw).is_null());
    assert_eq!(api.tray_tooltip(raw).as_deref(), Some("Demo"));
    assert_eq!(tray.menu().unwrap().len(), 3);
    // The icon surface is only needed while the tray is created
    assert_eq!(api.live_objects().surfaces, 0);
}

// ===== Callback lifetimes =====

#[test]
fn test_repeated_set_action_keeps_one_registration() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let entry = tray
        .create_menu()
        .unwrap()
        .append_entry(Some("Go"), EntryFlags::BUTTON)
        .unwrap();

    let last = Rc::new(Cell::new(0));
    for n in 1..=5 {
        let sink = last.clone();
        entry.set_action(move |_| sink.set(n)).unwrap();
        assert_eq!(tray.registrations(), 1);
    }

    entry.click();
    assert_eq!(last.get(), 5);
}

#[test]
fn test_clear_action_silences_entry() {
    let (api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let entry = tray
        .create_menu()
        .unwrap()
        .append_entry(Some("Go"), EntryFlags::BUTTON)
        .unwrap();

    let calls = Rc::new(Cell::new(0));
    let sink = calls.clone();
    entry.set_action(move |_| sink.set(sink.get() + 1)).unwrap();
    assert_eq!(api.live_objects().entry_callbacks, 1);

    assert!(entry.clear_action());
    assert!(!entry.clear_action());
    entry.click();

    assert_eq!(calls.get(), 0);
    assert!(!entry.has_action());
    assert_eq!(api.live_objects().entry_callbacks, 0);
}

#[test]
fn test_action_may_remove_its_own_entry() {
    let (api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let menu = tray.create_menu().unwrap();

    let calls = Rc::new(Cell::new(0));
    let sink = calls.clone();
    let entry = menu
        .build(EntryOptions::button("Once").with_action(move |entry| {
            sink.set(sink.get() + 1);
            entry.remove();
        }))
        .unwrap();

    entry.click();

    assert_eq!(calls.get(), 1);
    assert!(!entry.is_live());
    assert!(menu.is_empty());
    assert_eq!(tray.registrations(), 0);
    assert_eq!(api.live_objects().entries, 0);
}

#[test]
fn test_checkbox_toggles_before_action_runs() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let menu = tray.create_menu().unwrap();

    let observed = Rc::new(Cell::new(None));
    let sink = observed.clone();
    let entry = menu
        .build(EntryOptions::checkbox("Mute", false).with_action(move |entry| sink.set(Some(entry.checked()))))
        .unwrap();

    entry.click();
    assert_eq!(observed.get(), Some(true));
    entry.click();
    assert_eq!(observed.get(), Some(false));
}

#[test]
fn test_panicking_action_is_contained() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let entry = tray
        .create_menu()
        .unwrap()
        .build(EntryOptions::button("Boom").with_action(|_| panic!("action failed")))
        .unwrap();

    entry.click();
    assert!(entry.is_live());
    assert!(entry.has_action());
}

// ===== Tear-down =====

#[test]
fn test_destroy_cascades_through_tree() {
    let (api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let menu = tray.create_menu().unwrap();

    let top = menu.build(EntryOptions::button("Top").with_action(|_| {})).unwrap();
    let holder = menu
        .build(EntryOptions::submenu(
            "More",
            vec![
                EntryOptions::button("Leaf").with_action(|_| {}),
                EntryOptions::submenu("Deeper", vec![EntryOptions::checkbox("Deep", true).with_action(|_| {})]),
            ],
        ))
        .unwrap();
    let submenu = holder.submenu().unwrap();
    let deep_menu = submenu.entries()[1].submenu().unwrap();
    let deep = deep_menu.entries()[0].clone();
    assert_eq!(tray.registrations(), 3);

    assert!(tray.destroy());

    assert_eq!(api.live_objects().entry_callbacks, 0);
    assert!(!tray.is_live());
    assert!(!menu.is_live());
    assert!(!top.is_live());
    assert!(!holder.is_live());
    assert!(!submenu.is_live());
    assert!(!deep_menu.is_live());
    assert!(!deep.is_live());
    assert_eq!(api.live_objects().total(), 0);
}

#[test]
fn test_remove_cascades_through_submenu() {
    let (api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let menu = tray.create_menu().unwrap();
    menu.build(EntryOptions::button("Keep").with_action(|_| {})).unwrap();
    let holder = menu
        .build(EntryOptions::submenu(
            "More",
            vec![
                EntryOptions::button("a").with_action(|_| {}),
                EntryOptions::button("b").with_action(|_| {}),
            ],
        ))
        .unwrap();
    let children = holder.submenu().unwrap().entries();
    assert_eq!(tray.registrations(), 3);

    holder.remove();

    assert_eq!(tray.registrations(), 1);
    assert!(children.iter().all(|child| !child.is_live()));
    assert_eq!(menu.len(), 1);
    let live = api.live_objects();
    assert_eq!((live.menus, live.entries), (1, 1));
}

#[test]
fn test_remove_and_destroy_are_idempotent() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let entry = tray
        .create_menu()
        .unwrap()
        .build(EntryOptions::button("x").with_action(|_| {}))
        .unwrap();

    entry.remove();
    entry.remove();
    assert_eq!(tray.registrations(), 0);

    assert!(tray.destroy());
    assert!(!tray.destroy());
}

#[test]
fn test_drop_destroys_tray() {
    let (api, ctx) = headless();
    let entry = {
        let tray = Tray::new(&ctx, None, None).unwrap();
        tray.create_menu()
            .unwrap()
            .build(EntryOptions::button("x").with_action(|_| {}))
            .unwrap()
    };
    assert!(!entry.is_live());
    assert_eq!(api.live_objects().total(), 0);
}

#[test]
#[should_panic(expected = "SDL_TrayMenu used after destroy in `insert_entry`")]
fn test_menu_alias_panics_after_destroy() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    let menu = tray.create_menu().unwrap();
    tray.destroy();
    let _ = menu.append_entry(Some("late"), EntryFlags::BUTTON);
}

#[test]
#[should_panic(expected = "SDL_Tray used after destroy in `create_menu`")]
fn test_tray_panics_after_destroy() {
    let (_api, ctx) = headless();
    let tray = Tray::new(&ctx, None, None).unwrap();
    tray.destroy();
    let _ = tray.create_menu();
}

// ===== Rendering =====

#[test]
fn test_dump_renders_tree() {
    let (_api, ctx) = headless();
    let tray = Tray::create(
        &ctx,
        TrayOptions {
            tooltip: Some("Demo".into()),
            entries: vec![
                EntryOptions::button("Open").with_action(|_| {}),
                EntryOptions::separator(),
                EntryOptions::checkbox("Mute", true),
                EntryOptions::submenu("More", vec![EntryOptions::button("A").disabled(), EntryOptions::button("B")]),
            ],
            ..Default::default()
        },
    )
    .unwrap();

    insta::assert_snapshot!(tray.dump(), @r###"
    tray "Demo"
      Open *
      ---
      [x] Mute
      More >
        A (disabled)
        B
    "###);

    tray.destroy();
    assert_eq!(tray.dump(), "tray (destroyed)\n");
}
