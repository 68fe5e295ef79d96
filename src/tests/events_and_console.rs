use std::cell::RefCell;
use std::rc::Rc;

use crate::console::LogLevel;
use crate::document::{Document, Element};
use crate::events::{Event, EventCallback};
use crate::{Error, Result};

fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> EventCallback) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let make = {
        let seen = Rc::clone(&seen);
        move |label: &str| -> EventCallback {
            let seen = Rc::clone(&seen);
            let label = label.to_string();
            Rc::new(move |_event: &mut Event| {
                seen.borrow_mut().push(label.clone());
            })
        }
    };
    (seen, make)
}

fn three_levels() -> Result<(Document, Element, Element, Element)> {
    let doc = Document::from_html(
        "<div id='outer'><div id='middle'><button id='inner'>go</button></div></div>",
    )?;
    let outer = doc.get_element_by_id("outer").ok_or_else(not_found)?;
    let middle = doc.get_element_by_id("middle").ok_or_else(not_found)?;
    let inner = doc.get_element_by_id("inner").ok_or_else(not_found)?;
    Ok((doc, outer, middle, inner))
}

#[test]
fn dispatch_runs_target_listeners_then_bubbles_to_ancestors() -> Result<()> {
    let (_doc, outer, middle, inner) = three_levels()?;
    let (seen, listener) = recorder();
    outer.add_event_listener("click", listener("outer"));
    middle.add_event_listener("click", listener("middle"));
    inner.add_event_listener("click", listener("inner"));

    let event = inner.click();
    assert_eq!(*seen.borrow(), vec!["inner", "middle", "outer"]);
    assert_eq!(event.target(), inner);
    assert_eq!(event.event_type(), "click");
    Ok(())
}

#[test]
fn current_target_tracks_the_bubbling_walk() -> Result<()> {
    let (_doc, outer, _middle, inner) = three_levels()?;
    let stops = Rc::new(RefCell::new(Vec::new()));
    for node in [&inner, &outer] {
        let stops = Rc::clone(&stops);
        node.add_event_listener(
            "click",
            Rc::new(move |event: &mut Event| {
                stops.borrow_mut().push(event.current_target().id());
            }),
        );
    }

    inner.click();
    assert_eq!(*stops.borrow(), vec!["inner", "outer"]);
    Ok(())
}

#[test]
fn stop_propagation_finishes_the_current_node_only() -> Result<()> {
    let (_doc, outer, _middle, inner) = three_levels()?;
    let (seen, listener) = recorder();
    inner.add_event_listener(
        "click",
        Rc::new(|event: &mut Event| event.stop_propagation()),
    );
    inner.add_event_listener("click", listener("inner-second"));
    outer.add_event_listener("click", listener("outer"));

    inner.click();
    assert_eq!(*seen.borrow(), vec!["inner-second"]);
    Ok(())
}

#[test]
fn stop_immediate_propagation_skips_everything_remaining() -> Result<()> {
    let (_doc, outer, _middle, inner) = three_levels()?;
    let (seen, listener) = recorder();
    inner.add_event_listener(
        "click",
        Rc::new(|event: &mut Event| event.stop_immediate_propagation()),
    );
    inner.add_event_listener("click", listener("inner-second"));
    outer.add_event_listener("click", listener("outer"));

    inner.click();
    assert!(seen.borrow().is_empty());
    Ok(())
}

#[test]
fn prevent_default_is_readable_after_dispatch() -> Result<()> {
    let (_doc, _outer, _middle, inner) = three_levels()?;
    inner.add_event_listener(
        "submit",
        Rc::new(|event: &mut Event| event.prevent_default()),
    );

    let event = inner.dispatch("submit");
    assert!(event.default_prevented());
    assert!(!inner.click().default_prevented());
    Ok(())
}

#[test]
fn registering_the_same_callback_handle_twice_fires_once() -> Result<()> {
    let (_doc, _outer, _middle, inner) = three_levels()?;
    let (seen, listener) = recorder();
    let shared = listener("shared");
    inner.add_event_listener("click", Rc::clone(&shared));
    inner.add_event_listener("click", Rc::clone(&shared));
    // Distinct closures with the same body are distinct listeners.
    inner.add_event_listener("click", listener("other"));

    inner.click();
    assert_eq!(*seen.borrow(), vec!["shared", "other"]);
    Ok(())
}

#[test]
fn removed_listeners_no_longer_fire() -> Result<()> {
    let (_doc, _outer, _middle, inner) = three_levels()?;
    let (seen, listener) = recorder();
    let callback = listener("gone");
    inner.add_event_listener("click", Rc::clone(&callback));

    assert!(inner.remove_event_listener("click", &callback));
    assert!(!inner.remove_event_listener("click", &callback));
    inner.click();
    assert!(seen.borrow().is_empty());
    Ok(())
}

#[test]
fn listeners_only_fire_for_their_event_type() -> Result<()> {
    let (_doc, _outer, _middle, inner) = three_levels()?;
    let (seen, listener) = recorder();
    inner.add_event_listener("change", listener("change"));

    inner.click();
    assert!(seen.borrow().is_empty());
    inner.dispatch("change");
    assert_eq!(*seen.borrow(), vec!["change"]);
    Ok(())
}

#[test]
fn callbacks_may_mutate_the_tree_and_log_during_dispatch() -> Result<()> {
    let (doc, _outer, middle, inner) = three_levels()?;
    {
        let doc = doc.clone();
        let middle = middle.clone();
        inner.add_event_listener(
            "click",
            Rc::new(move |event: &mut Event| {
                event.current_target().add_class("clicked");
                middle.set_attribute("data-count", "1");
                doc.log_info("clicked");
            }),
        );
    }

    inner.click();
    assert!(inner.has_class("clicked"));
    assert_eq!(middle.attribute("data-count").as_deref(), Some("1"));
    let logs = doc.take_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].level, LogLevel::Info);
    Ok(())
}

#[test]
fn listener_added_to_an_ancestor_mid_dispatch_still_fires() -> Result<()> {
    let (_doc, outer, _middle, inner) = three_levels()?;
    let (seen, listener) = recorder();
    {
        let outer = outer.clone();
        let late = listener("late-outer");
        inner.add_event_listener(
            "click",
            Rc::new(move |_event: &mut Event| {
                outer.add_event_listener("click", Rc::clone(&late));
            }),
        );
    }

    // The ancestor's list is fetched when the walk reaches it, so the
    // listener attached by the target's callback participates.
    inner.click();
    assert_eq!(*seen.borrow(), vec!["late-outer"]);
    Ok(())
}

#[test]
fn take_logs_drains_in_order_with_levels() {
    let doc = Document::new();
    doc.log_info("first");
    doc.log_warn("second");

    let logs = doc.take_logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].level, LogLevel::Info);
    assert_eq!(logs[0].message, "first");
    assert_eq!(logs[1].level, LogLevel::Warn);
    assert_eq!(logs[1].message, "second");
    assert!(doc.take_logs().is_empty());
}

#[test]
fn log_limit_evicts_oldest_entries() -> Result<()> {
    let doc = Document::new();
    doc.set_log_limit(3)?;
    for i in 0..5 {
        doc.log_info(&format!("entry {i}"));
    }

    let messages = doc
        .take_logs()
        .into_iter()
        .map(|entry| entry.message)
        .collect::<Vec<_>>();
    assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
    Ok(())
}

#[test]
fn shrinking_the_log_limit_trims_existing_entries() -> Result<()> {
    let doc = Document::new();
    for i in 0..4 {
        doc.log_warn(&format!("w{i}"));
    }
    doc.set_log_limit(2)?;

    let messages = doc
        .take_logs()
        .into_iter()
        .map(|entry| entry.message)
        .collect::<Vec<_>>();
    assert_eq!(messages, vec!["w2", "w3"]);
    Ok(())
}

#[test]
fn zero_log_limit_is_rejected() {
    let doc = Document::new();
    let err = doc.set_log_limit(0).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

fn not_found() -> Error {
    Error::SelectorNotFound("expected element".into())
}
