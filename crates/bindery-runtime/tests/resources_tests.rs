//! Properties, events and text tests
//!
//! The thinner wrappers, exercised through a context the way an application
//! would drive them.

mod common;

use bindery_runtime::{Color, Context, Event, EventType, Font, Properties, PropertyType, Text, TextEngine};
use common::*;
use pretty_assertions::assert_eq;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct Counted(Rc<Cell<usize>>);

impl Drop for Counted {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

// ===== Properties =====

#[test]
fn test_properties_enumerate_in_name_order() {
    let (_api, ctx) = headless();
    let props = Properties::create(&ctx).unwrap();
    props.set_boolean("visible", true).unwrap();
    props.set_string("title", "Demo").unwrap();
    props.set_pointer_with_cleanup("state", Box::new(7u32)).unwrap();

    let mut seen = Vec::new();
    props.enumerate(|name| seen.push(name.to_string())).unwrap();
    assert_eq!(seen, vec!["state", "title", "visible"]);
    assert_eq!(props.property_type("state"), PropertyType::Pointer);
    assert_eq!(props.property_type("title"), PropertyType::String);
}

#[test]
fn test_properties_outlive_context() {
    let (api, ctx) = headless();
    let drops = Rc::new(Cell::new(0));
    let props = Properties::create(&ctx).unwrap();
    props.set_pointer_with_cleanup("owned", Box::new(Counted(drops.clone()))).unwrap();
    drop(ctx);

    assert!(props.has("owned"));
    drop(props);
    assert_eq!(drops.get(), 1);
    assert_eq!(api.live_objects().properties, 0);
}

#[test]
fn test_failed_properties_create() {
    let (api, ctx) = headless();
    api.fail_next("SDL_CreateProperties");
    let err = Properties::create(&ctx).unwrap_err();
    assert_eq!(err.operation(), Some("SDL_CreateProperties"));
    assert!(err.to_string().starts_with("SDL_CreateProperties failed:"), "{}", err);
}

// ===== Events =====

#[test]
fn test_pushed_events_poll_in_order() {
    let (api, ctx) = headless();
    let events = ctx.events();
    assert!(!events.has_pending());

    events.push_user_event(1).unwrap();
    events.push(&Event::user(u32::from(EventType::Quit), 0)).unwrap();
    events.push_user_event(2).unwrap();
    assert_eq!(api.pending_events(), 3);
    assert!(events.has_pending());

    let kinds: Vec<EventType> = events.poll_iter().map(|event| event.kind).collect();
    assert_eq!(kinds, vec![EventType::User(0x8000), EventType::Quit, EventType::User(0x8000)]);
    assert!(events.poll().is_none());
}

#[test]
fn test_registered_event_types_are_consecutive() {
    let (_api, ctx) = headless();
    let events = ctx.events();
    let first = events.register_user_events(4).unwrap();
    let second = events.register_user_events(1).unwrap();
    assert_eq!(second, first + 4);
}

#[test]
fn test_watch_may_remove_sibling_watches() {
    let (api, ctx) = headless();
    let ctx = Rc::new(ctx);
    let log = Rc::new(RefCell::new(Vec::new()));

    let sink = log.clone();
    let second = ctx
        .add_event_watch(move |event| {
            sink.borrow_mut().push(("second", event.user_code()));
            true
        })
        .unwrap();

    let sink = log.clone();
    let weak = Rc::downgrade(&ctx);
    ctx.add_event_watch(move |event| {
        sink.borrow_mut().push(("remover", event.user_code()));
        if let Some(ctx) = weak.upgrade() {
            ctx.remove_event_watch(second);
        }
        true
    })
    .unwrap();

    ctx.events().push_user_event(1).unwrap();
    ctx.events().push_user_event(2).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![("second", Some(1)), ("remover", Some(1)), ("remover", Some(2))]
    );
    assert_eq!(ctx.event_watch_count(), 1);
    assert_eq!(api.live_objects().event_watches, 1);
}

// ===== Fonts and text =====

#[test]
fn test_text_layout_through_context() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = font_file(&dir, "Mono.ttf");
    let (api, ctx) = headless();

    let engine = TextEngine::create_surface(&ctx).unwrap();
    let font = Font::open(&ctx, &path, 12.0).unwrap();
    let text = Text::create(&engine, &font, "ab\ncd").unwrap();
    text.set_color(Color::rgba(10, 20, 30, 255)).unwrap();

    let lines: Vec<i32> = text.substrings_for_range(0, -1).unwrap().map(|s| s.line_index).collect();
    assert_eq!(lines, vec![0, 0, 0, 1, 1]);
    assert_eq!(text.gpu_draw_data().len(), 2);
    assert_eq!(api.live_objects().allocations, 0);

    drop(text);
    drop(font);
    drop(engine);
    drop(ctx);
    assert_eq!(api.live_objects().total(), 0);
}

#[test]
fn test_font_outlives_context() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = font_file(&dir, "Sans.ttf");
    let (api, ctx) = headless();

    let font = Font::open(&ctx, &path, 16.0).unwrap();
    let engine = TextEngine::create_surface(&ctx).unwrap();
    drop(ctx);

    assert_eq!(font.height(), 20);
    assert_eq!(api.live_objects().fonts, 1);
    assert_eq!(api.ttf_init_count(), 1);

    drop(engine);
    drop(font);
    assert_eq!(api.ttf_init_count(), 0);
    assert_eq!(api.live_objects().total(), 0);
}

#[test]
fn test_font_requires_existing_file() {
    let (_api, ctx) = headless();
    let err = Font::open(&ctx, "/nonexistent/font.ttf", 12.0).unwrap_err();
    assert_eq!(err.operation(), Some("TTF_OpenFont"));
}

#[test]
fn test_context_debug_names_backend() {
    let ctx = Context::new(Rc::new(bindery_runtime::HeadlessApi::new()));
    assert_eq!(format!("{:?}", ctx), "Context { backend: \"headless\", event_watches: 0 }");
}
