use super::*;
use crate::dom::{ElementSpec, MemoryDocument, MemoryNode, Viewport};
use crate::indicators::{CLICK_INDICATOR_ID, KEY_INDICATOR_ID};
use tokio::time::{Duration, Instant};

fn actions(doc: &Arc<MemoryDocument>) -> PageActions<MemoryDocument> {
    PageActions::new(doc.clone(), Timings::immediate(), ScreenshotFormat::Png)
}

fn point(x: f64, y: f64) -> Coordinate {
    Coordinate::new(x, y).unwrap()
}

fn mods(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Three laid-out inputs A, B, C in a row.
fn three_inputs(doc: &MemoryDocument) -> [MemoryNode; 3] {
    let body = doc.body_node();
    [
        doc.append(body, ElementSpec::new("input").id("a").rect(0.0, 0.0, 50.0, 20.0)),
        doc.append(body, ElementSpec::new("input").id("b").rect(60.0, 0.0, 50.0, 20.0)),
        doc.append(body, ElementSpec::new("input").id("c").rect(120.0, 0.0, 50.0, 20.0)),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_click_at_waits_settle_delay_and_reports_target() {
    let doc = Arc::new(MemoryDocument::new());
    let button = doc.append(
        doc.body_node(),
        ElementSpec::new("button").id("submit").rect(10.0, 10.0, 100.0, 30.0),
    );
    let actions = PageActions::new(doc.clone(), Timings::default(), ScreenshotFormat::Webp);

    let start = Instant::now();
    let message = actions
        .click_at(point(20.0, 25.0), ClickType::Single)
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(400));
    assert_eq!(message, "Clicked button#submit at (20, 25)");

    assert_eq!(
        doc.event_types(),
        [
            "pointerover",
            "pointerenter",
            "pointermove",
            "pointerdown",
            "pointerup",
            "mousedown",
            "focus",
            "mouseup",
            "click",
            "focus",
        ]
    );
    for recorded in doc.events() {
        let mouse = recorded.event.mouse().unwrap();
        assert_eq!((mouse.client_x, mouse.client_y), (20.0, 25.0));
    }
    assert_eq!(doc.active(), Some(button));

    let ring = doc.find_by_id(CLICK_INDICATOR_ID).unwrap();
    assert_eq!(doc.style(ring, "opacity").as_deref(), Some("0"));
}

#[tokio::test]
async fn test_click_at_nothing_hides_indicator() {
    let doc = Arc::new(MemoryDocument::new());
    let err = actions(&doc)
        .click_at(point(5000.0, 5000.0), ClickType::Single)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No clickable element found at (5000, 5000)");
    let ring = doc.find_by_id(CLICK_INDICATOR_ID).unwrap();
    assert_eq!(doc.style(ring, "opacity").as_deref(), Some("0"));
}

#[tokio::test]
async fn test_click_at_cancelled_event() {
    let doc = Arc::new(MemoryDocument::new());
    let link = doc.append(doc.body_node(), ElementSpec::new("a").rect(0.0, 0.0, 40.0, 40.0));
    doc.cancel_event(EventTarget::Element(link), "click");
    let err = actions(&doc)
        .click_at(point(1.0, 1.0), ClickType::Single)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "click event was cancelled");
}

#[tokio::test]
async fn test_click_types_in_message() {
    let doc = Arc::new(MemoryDocument::new());
    let div = doc.append(doc.body_node(), ElementSpec::new("div").rect(0.0, 0.0, 40.0, 40.0));
    let actions = actions(&doc);

    let message = actions.click_at(point(1.5, 2.0), ClickType::Double).await.unwrap();
    assert_eq!(message, "Clicked div at (1.5, 2) (double click)");
    let message = actions.click_at(point(1.0, 2.0), ClickType::Triple).await.unwrap();
    assert_eq!(message, "Clicked div at (1, 2) (triple click)");
    // Not focusable, so focus stays on the body.
    assert_eq!(doc.active(), None);
    assert_eq!(doc.events_of("dblclick").len(), 1);
    assert!(doc.events_of("dblclick")[0].target == EventTarget::Element(div));
}

#[tokio::test]
async fn test_click_then_type_into_input() {
    let doc = Arc::new(MemoryDocument::new());
    let input = doc.append(doc.body_node(), ElementSpec::new("input").rect(0.0, 0.0, 200.0, 20.0));
    let actions = actions(&doc);

    actions.click_at(point(5.0, 5.0), ClickType::Single).await.unwrap();
    assert_eq!(doc.active(), Some(input));
    doc.clear_events();

    let message = actions.type_text("abc").await.unwrap();
    assert_eq!(message, "Typed text: \"abc\"");
    assert_eq!(doc.value(input), "abc");
    assert_eq!(doc.selection(input), (3, 3));
    assert_eq!(doc.event_types(), ["input", "change"]);
    assert!(doc.events().iter().all(|e| e.event.bubbles));
}

#[tokio::test]
async fn test_type_text_replaces_selection() {
    let doc = Arc::new(MemoryDocument::new());
    let area = doc.append(doc.body_node(), ElementSpec::new("textarea").value("hello world"));
    doc.focus(&area).await.unwrap();
    doc.set_selection_range(&area, 6, 11).await.unwrap();

    actions(&doc).type_text("thére").await.unwrap();
    assert_eq!(doc.value(area), "hello thére");
    assert_eq!(doc.selection(area), (11, 11));
}

#[tokio::test]
async fn test_type_text_into_contenteditable() {
    let doc = Arc::new(MemoryDocument::new());
    let editor = doc.append(
        doc.body_node(),
        ElementSpec::new("div").contenteditable().text("Hi!").rect(0.0, 0.0, 100.0, 100.0),
    );
    doc.focus(&editor).await.unwrap();
    doc.set_selection_range(&editor, 2, 2).await.unwrap();

    actions(&doc).type_text(" there").await.unwrap();
    assert_eq!(doc.value(editor), "Hi there!");

    let inputs = doc.events_of("input");
    assert_eq!(inputs.len(), 1);
    let init = inputs[0].event.input().unwrap();
    assert_eq!(init.input_type, "insertText");
    assert_eq!(init.data.as_deref(), Some(" there"));
    assert!(inputs[0].event.cancelable);
}

#[tokio::test]
async fn test_type_text_without_editable_focus() {
    let doc = Arc::new(MemoryDocument::new());
    let message = actions(&doc).type_text("abc").await.unwrap();
    assert_eq!(message, NO_INPUT_ELEMENT);
    assert!(doc.events().is_empty());
}

#[tokio::test]
async fn test_tab_traversal_wraps() {
    let doc = Arc::new(MemoryDocument::new());
    let [a, b, c] = three_inputs(&doc);
    let actions = actions(&doc);

    doc.focus(&b).await.unwrap();
    actions.handle_key_press("Tab", &[]).await.unwrap();
    assert_eq!(doc.active(), Some(c));

    doc.focus(&b).await.unwrap();
    let message = actions.handle_key_press("Tab", &mods(&["shift"])).await.unwrap();
    assert_eq!(message, "Pressed key: Tab with modifiers: shift");
    assert_eq!(doc.active(), Some(a));

    doc.focus(&c).await.unwrap();
    actions.handle_key_press("Tab", &[]).await.unwrap();
    assert_eq!(doc.active(), Some(a));

    actions.handle_key_press("Tab", &mods(&["shift"])).await.unwrap();
    assert_eq!(doc.active(), Some(c));

    // Tab moves focus without synthesizing key events.
    assert!(doc.events_of("keydown").is_empty());
    let focus = doc.events_of("focus");
    assert_eq!(focus.len(), 4);
    assert!(focus.iter().all(|e| e.event.bubbles));
}

#[tokio::test]
async fn test_tab_from_body_and_skips_hidden() {
    let doc = Arc::new(MemoryDocument::new());
    let body = doc.body_node();
    doc.append(body, ElementSpec::new("button").hidden());
    let link = doc.append(body, ElementSpec::new("a").attr("href", "#").rect(0.0, 0.0, 10.0, 10.0));
    let input = doc.append(body, ElementSpec::new("input").rect(0.0, 20.0, 10.0, 10.0));
    let actions = actions(&doc);

    actions.handle_key_press("Tab", &[]).await.unwrap();
    assert_eq!(doc.active(), Some(link));
    actions.handle_key_press("Tab", &[]).await.unwrap();
    assert_eq!(doc.active(), Some(input));
}

#[tokio::test]
async fn test_key_press_dispatches_sequence() {
    let doc = Arc::new(MemoryDocument::new());
    let message = actions(&doc)
        .handle_key_press("a", &mods(&["control", "alt"]))
        .await
        .unwrap();
    assert_eq!(message, "Pressed key: a with modifiers: control+alt");
    assert_eq!(doc.event_types(), ["keydown", "keypress", "keyup"]);
    let key = doc.events()[0].event.key().cloned().unwrap();
    assert!(key.ctrl_key && key.alt_key);

    let toast = doc.find_by_id(KEY_INDICATOR_ID).unwrap();
    assert_eq!(doc.value(toast), "⌃⌥+A");
}

#[tokio::test]
async fn test_key_press_rejects_unknown_modifier() {
    let doc = Arc::new(MemoryDocument::new());
    let err = actions(&doc)
        .handle_key_press("a", &mods(&["hyper"]))
        .await
        .unwrap_err();
    assert!(matches!(err, PageError::Wire(_)));
    assert!(doc.events().is_empty());
}

#[tokio::test]
async fn test_enter_clicks_submit_control() {
    let doc = Arc::new(MemoryDocument::new());
    let form = doc.append(doc.body_node(), ElementSpec::new("form"));
    let input = doc.append(form, ElementSpec::new("input").rect(0.0, 0.0, 10.0, 10.0));
    let button = doc.append(form, ElementSpec::new("button").rect(0.0, 20.0, 10.0, 10.0));
    doc.focus(&input).await.unwrap();

    actions(&doc).handle_key_press("Enter", &[]).await.unwrap();
    assert_eq!(doc.native_clicks(), vec![button]);
    assert_eq!(doc.submitted_forms(), vec![form]);
}

#[tokio::test]
async fn test_enter_submits_form_without_control() {
    let doc = Arc::new(MemoryDocument::new());
    let form = doc.append(doc.body_node(), ElementSpec::new("form"));
    let input = doc.append(form, ElementSpec::new("input").rect(0.0, 0.0, 10.0, 10.0));
    doc.focus(&input).await.unwrap();

    actions(&doc).handle_key_press("Enter", &[]).await.unwrap();
    let submits = doc.events_of("submit");
    assert_eq!(submits.len(), 1);
    assert_eq!(submits[0].target, EventTarget::Element(form));
    assert!(submits[0].event.cancelable);
    assert_eq!(doc.submitted_forms(), vec![form]);
}

#[tokio::test]
async fn test_enter_respects_prevented_submit() {
    let doc = Arc::new(MemoryDocument::new());
    let form = doc.append(doc.body_node(), ElementSpec::new("form"));
    let input = doc.append(form, ElementSpec::new("input").rect(0.0, 0.0, 10.0, 10.0));
    doc.focus(&input).await.unwrap();
    doc.cancel_event(EventTarget::Element(form), "submit");

    actions(&doc).handle_key_press("Enter", &[]).await.unwrap();
    assert!(doc.submitted_forms().is_empty());
}

#[tokio::test]
async fn test_enter_skipped_when_keydown_cancelled() {
    let doc = Arc::new(MemoryDocument::new());
    let form = doc.append(doc.body_node(), ElementSpec::new("form"));
    let input = doc.append(form, ElementSpec::new("input").rect(0.0, 0.0, 10.0, 10.0));
    doc.append(form, ElementSpec::new("button"));
    doc.focus(&input).await.unwrap();
    doc.cancel_event(EventTarget::Document, "keydown");

    actions(&doc).handle_key_press("Enter", &[]).await.unwrap();
    assert!(doc.native_clicks().is_empty());
    assert!(doc.submitted_forms().is_empty());
}

#[tokio::test]
async fn test_enter_in_textarea_does_not_submit() {
    let doc = Arc::new(MemoryDocument::new());
    let form = doc.append(doc.body_node(), ElementSpec::new("form"));
    let area = doc.append(form, ElementSpec::new("textarea").rect(0.0, 0.0, 10.0, 10.0));
    doc.focus(&area).await.unwrap();

    actions(&doc).handle_key_press("Enter", &[]).await.unwrap();
    assert!(doc.events_of("submit").is_empty());
    assert!(doc.submitted_forms().is_empty());
}

#[tokio::test]
async fn test_enter_on_search_box_outside_form() {
    let doc = Arc::new(MemoryDocument::new());
    let search = doc.append(
        doc.body_node(),
        ElementSpec::new("input").name("q").rect(0.0, 0.0, 10.0, 10.0),
    );
    doc.focus(&search).await.unwrap();

    actions(&doc).handle_key_press("Enter", &[]).await.unwrap();
    let types = doc.event_types();
    assert_eq!(types[3..], ["input", "change", "search"]);
    assert!(doc.events()[3..]
        .iter()
        .all(|e| e.target == EventTarget::Element(search)));
}

#[tokio::test]
async fn test_enter_on_plain_input_outside_form() {
    let doc = Arc::new(MemoryDocument::new());
    let input = doc.append(
        doc.body_node(),
        ElementSpec::new("input").name("email").rect(0.0, 0.0, 10.0, 10.0),
    );
    doc.focus(&input).await.unwrap();
    actions(&doc).handle_key_press("Enter", &[]).await.unwrap();
    assert_eq!(doc.events().len(), 3);
}

#[tokio::test]
async fn test_scroll_page() {
    let doc = Arc::new(MemoryDocument::new());
    let actions = actions(&doc);

    let message = actions.scroll_page(ScrollDirection::Down).await.unwrap();
    assert_eq!(message, "Scrolled down one page");
    assert_eq!(doc.window_scroll_y(), 800.0);
    let toast = doc.find_by_id(KEY_INDICATOR_ID).unwrap();
    assert_eq!(doc.value(toast), "PageDown");

    let message = actions.scroll_page(ScrollDirection::Up).await.unwrap();
    assert_eq!(message, "Scrolled up one page");
    assert_eq!(doc.window_scroll_y(), 0.0);
    assert_eq!(doc.value(toast), "PageUp");
}

#[tokio::test]
async fn test_scroll_at_position() {
    let doc = Arc::new(MemoryDocument::new());
    let list = doc.append(
        doc.body_node(),
        ElementSpec::new("ul").rect(0.0, 0.0, 300.0, 300.0).scrollable(2000.0, 300.0),
    );
    let message = actions(&doc).scroll_at_position(10.0, 10.0, 100.0).await.unwrap();
    assert_eq!(message, "Scrolled at position (10, 10) with delta 100");
    assert_eq!(doc.scroll_top(list), 100.0);
    assert_eq!(doc.events_of("wheel").len(), 1);
}

#[tokio::test]
async fn test_device_pixel_ratio() {
    let doc = Arc::new(MemoryDocument::with_viewport(Viewport {
        device_pixel_ratio: 2.5,
        ..Viewport::default()
    }));
    assert_eq!(actions(&doc).device_pixel_ratio().await.unwrap(), 2.5);
}

#[tokio::test]
async fn test_cleanup_indicators() {
    let doc = Arc::new(MemoryDocument::new());
    let actions = actions(&doc);
    actions.click_at(point(1.0, 1.0), ClickType::Single).await.unwrap();
    actions.handle_key_press("Escape", &[]).await.unwrap();
    assert!(doc.find_by_id(CLICK_INDICATOR_ID).is_some());
    assert!(doc.find_by_id(KEY_INDICATOR_ID).is_some());

    actions.cleanup_indicators().await;
    assert!(doc.find_by_id(CLICK_INDICATOR_ID).is_none());
    assert!(doc.find_by_id(KEY_INDICATOR_ID).is_none());
    assert!(!actions.click_indicator().is_mounted().await);
}
