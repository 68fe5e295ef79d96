use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::console::{Console, LogEntry};
use crate::dom::{Dom, NodeId};
use crate::events::{Event, EventCallback, ListenerStore};
use crate::html::{is_tag_char, parse_html};
use crate::{Error, Result};

// Serialization, fragment cloning, and dispatch recurse over caller-shaped
// trees; grow the stack at those entry points.
const GUARD_STACK_BYTES: usize = 32 * 1024 * 1024;

pub(crate) struct DocumentInner {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) console: Console,
}

/// Shared handle over one element tree plus its listener table and console.
/// Cloning the handle clones the reference, not the tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl Document {
    /// An empty document with an html/body skeleton.
    pub fn new() -> Self {
        let mut dom = Dom::new();
        dom.ensure_body();
        Self::from_dom(dom)
    }

    fn from_dom(dom: Dom) -> Self {
        Self {
            inner: Rc::new(RefCell::new(DocumentInner {
                dom,
                listeners: ListenerStore::default(),
                console: Console::default(),
            })),
        }
    }

    /// Parses the given markup and normalizes the tree so a body always
    /// exists.
    pub fn from_html(html: &str) -> Result<Self> {
        let mut dom = parse_html(html)?;
        dom.ensure_body();
        Ok(Self::from_dom(dom))
    }

    /// Creates a detached element. The tag name is validated; creation has
    /// no attachment side effect.
    pub fn create_element(&self, tag: &str) -> Result<Element> {
        let tag = tag.trim().to_ascii_lowercase();
        let valid = !tag.is_empty()
            && tag.as_bytes().first().is_some_and(u8::is_ascii_alphabetic)
            && tag.bytes().all(is_tag_char);
        if !valid {
            return Err(Error::InvalidArgument(format!("invalid tag name: {tag:?}")));
        }
        Ok(self.create_element_raw(&tag))
    }

    // Skips validation; for fixed literal tags used internally.
    pub(crate) fn create_element_raw(&self, tag: &str) -> Element {
        let node = self
            .inner
            .borrow_mut()
            .dom
            .create_detached_element(tag.to_string());
        Element::new(self.clone(), node)
    }

    pub fn body(&self) -> Element {
        let node = self.inner.borrow_mut().dom.ensure_body();
        Element::new(self.clone(), node)
    }

    pub fn document_element(&self) -> Element {
        let node = {
            let mut inner = self.inner.borrow_mut();
            inner.dom.ensure_body();
            inner.dom.document_element()
        };
        match node {
            Some(node) => Element::new(self.clone(), node),
            // ensure_body always leaves an html root behind.
            None => self.body(),
        }
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        let node = self.inner.borrow().dom.by_id(id)?;
        Some(Element::new(self.clone(), node))
    }

    pub fn query_first(&self, selector: &str) -> Result<Option<Element>> {
        let node = self.inner.borrow().dom.query_selector(selector)?;
        Ok(node.map(|node| Element::new(self.clone(), node)))
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        let nodes = self.inner.borrow().dom.query_selector_all(selector)?;
        Ok(nodes
            .into_iter()
            .map(|node| Element::new(self.clone(), node))
            .collect())
    }

    pub fn to_html(&self) -> String {
        stacker::grow(GUARD_STACK_BYTES, || {
            let inner = self.inner.borrow();
            inner.dom.serialize_node(inner.dom.root)
        })
    }

    pub fn log_info(&self, message: &str) {
        self.inner.borrow_mut().console.info(message.to_string());
    }

    pub fn log_warn(&self, message: &str) {
        self.inner.borrow_mut().console.warn(message.to_string());
    }

    pub fn take_logs(&self) -> Vec<LogEntry> {
        self.inner.borrow_mut().console.take_logs()
    }

    pub fn set_log_limit(&self, limit: usize) -> Result<()> {
        self.inner.borrow_mut().console.set_limit(limit)
    }

    pub fn set_log_to_stderr(&self, enabled: bool) {
        self.inner.borrow_mut().console.set_to_stderr(enabled);
    }

    pub(crate) fn same_document(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Document")
            .field("nodes", &inner.dom.nodes.len())
            .field("listeners", &inner.listeners)
            .finish()
    }
}

/// Copyable handle to one element node of one document. Equality is node
/// identity within the same document.
#[derive(Clone)]
pub struct Element {
    doc: Document,
    node: NodeId,
}

impl Element {
    pub(crate) fn new(doc: Document, node: NodeId) -> Self {
        Self { doc, node }
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn document(&self) -> Document {
        self.doc.clone()
    }

    pub fn tag_name(&self) -> String {
        self.doc
            .inner
            .borrow()
            .dom
            .tag_name(self.node)
            .unwrap_or_default()
            .to_string()
    }

    pub fn id(&self) -> String {
        self.attribute("id").unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.doc.inner.borrow().dom.attr(self.node, name)
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.doc
            .inner
            .borrow_mut()
            .dom
            .set_attr(self.node, name, value);
    }

    pub fn remove_attribute(&self, name: &str) {
        self.doc.inner.borrow_mut().dom.remove_attr(self.node, name);
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.doc.inner.borrow().dom.has_attr(self.node, name)
    }

    pub fn class_names(&self) -> Vec<String> {
        crate::util::class_tokens(self.attribute("class").as_deref())
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.doc
            .inner
            .borrow()
            .dom
            .class_contains(self.node, class_name)
    }

    pub fn add_class(&self, class_name: &str) {
        self.doc
            .inner
            .borrow_mut()
            .dom
            .class_add(self.node, class_name);
    }

    pub fn remove_class(&self, class_name: &str) {
        self.doc
            .inner
            .borrow_mut()
            .dom
            .class_remove(self.node, class_name);
    }

    pub fn toggle_class(&self, class_name: &str) -> bool {
        self.doc
            .inner
            .borrow_mut()
            .dom
            .class_toggle(self.node, class_name)
    }

    pub fn text(&self) -> String {
        stacker::grow(GUARD_STACK_BYTES, || {
            self.doc.inner.borrow().dom.text_content(self.node)
        })
    }

    pub fn set_text(&self, value: &str) {
        self.doc
            .inner
            .borrow_mut()
            .dom
            .set_text_content(self.node, value);
    }

    pub fn inner_html(&self) -> String {
        stacker::grow(GUARD_STACK_BYTES, || {
            self.doc.inner.borrow().dom.inner_html(self.node)
        })
    }

    pub fn set_inner_html(&self, html: &str) -> Result<()> {
        stacker::grow(GUARD_STACK_BYTES, || {
            self.doc
                .inner
                .borrow_mut()
                .dom
                .set_inner_html(self.node, html)
        })
    }

    pub fn outer_html(&self) -> String {
        stacker::grow(GUARD_STACK_BYTES, || {
            self.doc.inner.borrow().dom.outer_html(self.node)
        })
    }

    pub fn parent(&self) -> Option<Element> {
        let inner = self.doc.inner.borrow();
        let parent = inner.dom.parent(self.node)?;
        if inner.dom.element(parent).is_none() {
            return None;
        }
        drop(inner);
        Some(Element::new(self.doc.clone(), parent))
    }

    pub fn children(&self) -> Vec<Element> {
        self.doc
            .inner
            .borrow()
            .dom
            .child_elements(self.node)
            .into_iter()
            .map(|node| Element::new(self.doc.clone(), node))
            .collect()
    }

    pub fn last_child(&self) -> Option<Element> {
        let node = self.doc.inner.borrow().dom.last_child(self.node)?;
        Some(Element::new(self.doc.clone(), node))
    }

    pub fn append_child(&self, child: &Element) -> Result<()> {
        if !self.doc.same_document(&child.doc) {
            return Err(Error::InvalidArgument(
                "node belongs to a different document".into(),
            ));
        }
        self.doc
            .inner
            .borrow_mut()
            .dom
            .append_child(self.node, child.node)
    }

    pub fn remove_child(&self, child: &Element) -> Result<()> {
        if !self.doc.same_document(&child.doc) {
            return Err(Error::InvalidArgument(
                "node belongs to a different document".into(),
            ));
        }
        self.doc
            .inner
            .borrow_mut()
            .dom
            .remove_child(self.node, child.node)
    }

    pub fn detach(&self) {
        self.doc.inner.borrow_mut().dom.detach_node(self.node);
    }

    pub fn is_connected(&self) -> bool {
        self.doc.inner.borrow().dom.is_connected(self.node)
    }

    pub fn query_first(&self, selector: &str) -> Result<Option<Element>> {
        let node = self
            .doc
            .inner
            .borrow()
            .dom
            .query_selector_from(self.node, selector)?;
        Ok(node.map(|node| Element::new(self.doc.clone(), node)))
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        let nodes = self
            .doc
            .inner
            .borrow()
            .dom
            .query_selector_all_from(self.node, selector)?;
        Ok(nodes
            .into_iter()
            .map(|node| Element::new(self.doc.clone(), node))
            .collect())
    }

    pub fn matches(&self, selector: &str) -> Result<bool> {
        self.doc
            .inner
            .borrow()
            .dom
            .matches_selector(self.node, selector)
    }

    pub fn closest(&self, selector: &str) -> Result<Option<Element>> {
        let node = self.doc.inner.borrow().dom.closest(self.node, selector)?;
        Ok(node.map(|node| Element::new(self.doc.clone(), node)))
    }

    pub fn add_event_listener(&self, event: &str, callback: EventCallback) {
        self.doc
            .inner
            .borrow_mut()
            .listeners
            .add(self.node, event, callback);
    }

    pub fn remove_event_listener(&self, event: &str, callback: &EventCallback) -> bool {
        self.doc
            .inner
            .borrow_mut()
            .listeners
            .remove(self.node, event, callback)
    }

    /// Synchronous bubbling dispatch: the target's listeners run first, then
    /// each ancestor's, until the root is passed or propagation stops. Each
    /// node's listener list is fetched under a short borrow and no document
    /// borrow is held while a callback runs, so callbacks may freely mutate
    /// the tree, the listener table, and the console, and may dispatch
    /// further events.
    pub fn dispatch(&self, event_type: &str) -> Event {
        stacker::grow(GUARD_STACK_BYTES, || {
            let mut event = Event::new(event_type, self.clone());
            let mut cursor = Some(self.clone());

            'walk: while let Some(current) = cursor {
                event.set_current_target(current.clone());
                let callbacks = {
                    let inner = current.doc.inner.borrow();
                    inner.listeners.get(current.node, event_type)
                };
                for callback in callbacks {
                    callback(&mut event);
                    if event.immediate_propagation_stopped() {
                        break 'walk;
                    }
                }
                if !event.bubbles() || event.propagation_stopped() {
                    break;
                }
                cursor = current.parent();
            }

            event
        })
    }

    pub fn click(&self) -> Event {
        self.dispatch("click")
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.doc.same_document(&other.doc) && self.node == other.node
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element(<{}> node {})", self.tag_name(), self.node.0)
    }
}
