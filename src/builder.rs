use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::document::{Document, Element};
use crate::events::EventCallback;
use crate::util::truncate_chars;
use crate::{Error, Result};

fn is_media_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("audio") || tag.eq_ignore_ascii_case("video")
}

/// Fluent builder over exactly one element. Every mutator is a thin
/// pass-through to one host call and returns the same builder, so long
/// chains read top to bottom.
///
/// Failures come in two tiers. Construction, the must-exist factory, and
/// attach-by-selector fail hard with an error. Everything shape-dependent
/// (kind-specific setters on the wrong element, a missing child selector, a
/// missing listener id) warns on the document console and leaves the tree
/// untouched, so one inapplicable call never aborts a chain.
pub struct ElementBuilder {
    element: Element,
    listeners: HashMap<String, HashMap<String, EventCallback>>,
}

impl std::fmt::Debug for ElementBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementBuilder")
            .field("element", &self.describe())
            .finish_non_exhaustive()
    }
}

impl ElementBuilder {
    /// Wraps a pre-existing element. No creation side effect.
    pub fn adopt(element: Element) -> Self {
        Self {
            element,
            listeners: HashMap::new(),
        }
    }

    /// Creates a new detached element of the given tag and wraps it.
    pub fn create(doc: &Document, tag: &str) -> Result<Self> {
        Ok(Self::adopt(doc.create_element(tag)?))
    }

    /// Locates a descendant of `parent` by selector and wraps it. Unlike the
    /// query helpers this lookup must succeed.
    pub fn from_descendant(parent: &Element, selector: &str) -> Result<Self> {
        match parent.query_first(selector)? {
            Some(element) => Ok(Self::adopt(element)),
            None => Err(Error::SelectorNotFound(selector.to_string())),
        }
    }

    fn doc(&self) -> Document {
        self.element.document()
    }

    fn describe(&self) -> String {
        truncate_chars(&self.element.outer_html(), 80)
    }

    fn warn(&self, message: String) {
        self.doc().log_warn(&message);
    }

    /// Replaces the element's identifier.
    pub fn id(&mut self, id: &str) -> &mut Self {
        self.element.set_attribute("id", id);
        self
    }

    /// Replaces the full class list with the given set, space-joined.
    pub fn classes(&mut self, classes: &[&str]) -> &mut Self {
        self.element.set_attribute("class", &classes.join(" "));
        self
    }

    /// Flips membership for each given class name independently.
    pub fn toggle_classes(&mut self, classes: &[&str]) -> &mut Self {
        for class_name in classes {
            self.element.toggle_class(class_name);
        }
        self
    }

    /// Removes each given class name if present; absent names are a no-op.
    pub fn remove_classes(&mut self, classes: &[&str]) -> &mut Self {
        for class_name in classes {
            self.element.remove_class(class_name);
        }
        self
    }

    /// Textual append: serializes the current content, concatenates the new
    /// markup, and re-parses the whole string.
    ///
    /// Known footgun, kept for compatibility: this is O(content) per call
    /// and replaces every existing child node, so listeners attached to
    /// nodes inside the old content stop firing. Use `append` with element
    /// handles when listeners must survive.
    pub fn push_html(&mut self, markup: &str) -> &mut Self {
        let combined = format!("{}{}", self.element.inner_html(), markup);
        if let Err(err) = self.element.set_inner_html(&combined) {
            self.warn(format!(
                "element {}: could not parse appended markup ({err}), ignoring",
                self.describe()
            ));
        }
        self
    }

    /// Replaces all content with the given markup.
    pub fn set_html(&mut self, markup: &str) -> &mut Self {
        if let Err(err) = self.element.set_inner_html(markup) {
            self.warn(format!(
                "element {}: could not parse markup ({err}), ignoring",
                self.describe()
            ));
        }
        self
    }

    /// Replaces content with one text node; markup in the string is escaped
    /// on serialization.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.element.set_text(text);
        self
    }

    /// Audio/video only: appends a `<source src=...>` child. On any other
    /// element kind this warns and leaves the tree untouched.
    pub fn media_source(&mut self, url: &str) -> &mut Self {
        if !is_media_tag(&self.element.tag_name()) {
            self.warn(format!(
                "element {}: not an audio or video element, ignoring source {url:?}",
                self.describe()
            ));
            return self;
        }
        self.append_media_source(url);
        self
    }

    pub(crate) fn append_media_source(&mut self, url: &str) {
        let source = self.doc().create_element_raw("source");
        source.set_attribute("src", url);
        if let Err(err) = self.element.append_child(&source) {
            self.warn(format!(
                "element {}: could not append source ({err}), ignoring",
                self.describe()
            ));
        }
    }

    /// Audio/video only: removes the first descendant `<source>` whose src
    /// equals the given URL. A missing URL or wrong element kind warns.
    pub fn remove_media_source(&mut self, url: &str) -> &mut Self {
        if !is_media_tag(&self.element.tag_name()) {
            self.warn(format!(
                "element {}: not an audio or video element, ignoring source removal",
                self.describe()
            ));
            return self;
        }
        self.remove_media_source_by_url(url);
        self
    }

    // Subtree scan comparing the src attribute for string equality. A
    // selector built from the raw URL would break on URLs containing quotes.
    pub(crate) fn remove_media_source_by_url(&mut self, url: &str) {
        let sources = self.element.query_all("source").unwrap_or_default();
        let matched = sources
            .into_iter()
            .find(|source| source.attribute("src").as_deref() == Some(url));
        match matched {
            Some(source) => source.detach(),
            None => self.warn(format!(
                "element {}: has no source {url:?}, ignoring",
                self.describe()
            )),
        }
    }

    /// Image only: sets the src attribute. Otherwise warns, no mutation.
    pub fn image_source(&mut self, url: &str) -> &mut Self {
        if !self.element.tag_name().eq_ignore_ascii_case("img") {
            self.warn(format!(
                "element {}: not an image element, ignoring src {url:?}",
                self.describe()
            ));
            return self;
        }
        self.element.set_attribute("src", url);
        self
    }

    /// Anchor only: sets the href attribute. Otherwise warns, no mutation.
    pub fn link_href(&mut self, href: &str) -> &mut Self {
        if !self.element.tag_name().eq_ignore_ascii_case("a") {
            self.warn(format!(
                "element {}: not an anchor element, ignoring href {href:?}",
                self.describe()
            ));
            return self;
        }
        self.element.set_attribute("href", href);
        self
    }

    /// Sets a named attribute unconditionally.
    pub fn attr(&mut self, name: &str, value: &str) -> &mut Self {
        self.element.set_attribute(name, value);
        self
    }

    /// Removes a named attribute if present.
    pub fn remove_attr(&mut self, name: &str) -> &mut Self {
        self.element.remove_attribute(name);
        self
    }

    /// Applies each (property, value) pair onto the element's style, one
    /// assignment per pair, in the given order. Later pairs win.
    pub fn styles(&mut self, styles: &[(&str, &str)]) -> &mut Self {
        let mut decls =
            crate::util::style_declarations(self.element.attribute("style").as_deref());
        for (name, value) in styles {
            crate::util::upsert_style_declaration(&mut decls, name, value);
        }
        self.element
            .set_attribute("style", &crate::util::serialize_style_declarations(&decls));
        self
    }

    /// Appends the given element as the last child of the wrapped element.
    pub fn append(&mut self, child: &Element) -> &mut Self {
        if let Err(err) = self.element.append_child(child) {
            self.warn(format!(
                "element {}: could not append child ({err}), ignoring",
                self.describe()
            ));
        }
        self
    }

    /// Appends each given element in argument order.
    pub fn append_each(&mut self, children: &[Element]) -> &mut Self {
        for child in children {
            self.append(child);
        }
        self
    }

    /// Resolves the selector inside the wrapped element's subtree and
    /// appends each given element into the match. A missing or unsupported
    /// selector warns and leaves the tree untouched.
    pub fn append_into(&mut self, selector: &str, children: &[Element]) -> &mut Self {
        let target = match self.element.query_first(selector) {
            Ok(Some(target)) => target,
            Ok(None) => {
                self.warn(format!(
                    "element {}: has no descendant matching {selector:?}, ignoring",
                    self.describe()
                ));
                return self;
            }
            Err(err) => {
                self.warn(format!(
                    "element {}: bad selector {selector:?} ({err}), ignoring",
                    self.describe()
                ));
                return self;
            }
        };
        for child in children {
            if let Err(err) = target.append_child(child) {
                self.warn(format!(
                    "element {}: could not append child into {selector:?} ({err}), ignoring",
                    self.describe()
                ));
            }
        }
        self
    }

    /// Registers the callback for each given event name. Anonymous
    /// registrations never enter the keyed registry and cannot be removed
    /// through `off`.
    pub fn on(&mut self, events: &[&str], callback: EventCallback) -> &mut Self {
        for event in events {
            self.element.add_event_listener(event, Rc::clone(&callback));
        }
        self
    }

    /// Registers the callback for each given event name and records it
    /// under (id, event) for later removal. Re-registering an (id, event)
    /// pair overwrites the stored reference but does not detach the
    /// previously attached callback.
    pub fn on_keyed(&mut self, events: &[&str], callback: EventCallback, id: &str) -> &mut Self {
        for event in events {
            self.element.add_event_listener(event, Rc::clone(&callback));
            self.listeners
                .entry(id.to_string())
                .or_default()
                .insert(event.to_string(), Rc::clone(&callback));
        }
        self
    }

    /// Detaches the recorded callback for each given event name under the
    /// id and drops the (id, event) registry pair. A missing id or a
    /// missing event under the id warns and skips that event only.
    pub fn off(&mut self, id: &str, events: &[&str]) -> &mut Self {
        for event in events {
            let recorded = self
                .listeners
                .get_mut(id)
                .and_then(|by_event| by_event.remove(*event));
            match recorded {
                Some(callback) => {
                    self.element.remove_event_listener(event, &callback);
                }
                None => {
                    self.warn(format!(
                        "element {}: no listener recorded for id {id:?} event {event:?}, ignoring",
                        self.describe()
                    ));
                }
            }
        }
        self
    }

    /// Appends the wrapped element as the last child of the given parent.
    /// Never raises; a host rejection warns.
    pub fn attach_to(&mut self, parent: &Element) -> &mut Self {
        if let Err(err) = parent.append_child(&self.element) {
            self.warn(format!(
                "element {}: could not attach ({err}), ignoring",
                self.describe()
            ));
        }
        self
    }

    /// Resolves the selector against the whole document and appends the
    /// wrapped element to the first match. The one chain operation with no
    /// soft-failure guard: no match is a hard error.
    pub fn attach_to_first(&mut self, selector: &str) -> Result<&mut Self> {
        let parent = self
            .doc()
            .query_first(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))?;
        parent.append_child(&self.element)?;
        Ok(self)
    }

    /// Returns the wrapped element handle, logging it at info level.
    pub fn element(&self) -> Element {
        self.doc().log_info(&format!(
            "element id {:?}: {}",
            self.element.id(),
            self.describe()
        ));
        self.element.clone()
    }
}

impl Document {
    /// Create-by-tag convenience; same contract as `ElementBuilder::create`.
    pub fn build(&self, tag: &str) -> Result<ElementBuilder> {
        ElementBuilder::create(self, tag)
    }
}

/// Builder over an audio or video element. The media setters need no
/// runtime kind check here; state mismatches such as removing an absent
/// source URL still warn.
pub struct MediaBuilder {
    inner: ElementBuilder,
}

impl MediaBuilder {
    pub fn adopt(element: Element) -> Result<Self> {
        if !is_media_tag(&element.tag_name()) {
            return Err(Error::InvalidArgument(format!(
                "expected an audio or video element, got <{}>",
                element.tag_name()
            )));
        }
        Ok(Self {
            inner: ElementBuilder::adopt(element),
        })
    }

    pub fn audio(doc: &Document) -> Self {
        Self {
            inner: ElementBuilder::adopt(doc.create_element_raw("audio")),
        }
    }

    pub fn video(doc: &Document) -> Self {
        Self {
            inner: ElementBuilder::adopt(doc.create_element_raw("video")),
        }
    }

    pub fn source(&mut self, url: &str) -> &mut Self {
        self.inner.append_media_source(url);
        self
    }

    pub fn remove_source(&mut self, url: &str) -> &mut Self {
        self.inner.remove_media_source_by_url(url);
        self
    }
}

impl Deref for MediaBuilder {
    type Target = ElementBuilder;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for MediaBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Builder over an img element.
pub struct ImageBuilder {
    inner: ElementBuilder,
}

impl ImageBuilder {
    pub fn adopt(element: Element) -> Result<Self> {
        if !element.tag_name().eq_ignore_ascii_case("img") {
            return Err(Error::InvalidArgument(format!(
                "expected an image element, got <{}>",
                element.tag_name()
            )));
        }
        Ok(Self {
            inner: ElementBuilder::adopt(element),
        })
    }

    pub fn create(doc: &Document) -> Self {
        Self {
            inner: ElementBuilder::adopt(doc.create_element_raw("img")),
        }
    }

    pub fn source(&mut self, url: &str) -> &mut Self {
        self.inner.element.set_attribute("src", url);
        self
    }
}

impl Deref for ImageBuilder {
    type Target = ElementBuilder;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ImageBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// Builder over an anchor element.
pub struct AnchorBuilder {
    inner: ElementBuilder,
}

impl AnchorBuilder {
    pub fn adopt(element: Element) -> Result<Self> {
        if !element.tag_name().eq_ignore_ascii_case("a") {
            return Err(Error::InvalidArgument(format!(
                "expected an anchor element, got <{}>",
                element.tag_name()
            )));
        }
        Ok(Self {
            inner: ElementBuilder::adopt(element),
        })
    }

    pub fn create(doc: &Document) -> Self {
        Self {
            inner: ElementBuilder::adopt(doc.create_element_raw("a")),
        }
    }

    pub fn href(&mut self, href: &str) -> &mut Self {
        self.inner.element.set_attribute("href", href);
        self
    }
}

impl Deref for AnchorBuilder {
    type Target = ElementBuilder;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for AnchorBuilder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
