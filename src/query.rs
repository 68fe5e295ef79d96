use crate::Result;
use crate::document::{Document, Element};

/// Anything a selector can be resolved against: a whole document or one
/// element's subtree.
pub trait Queryable {
    fn query_first(&self, selector: &str) -> Result<Option<Element>>;
    fn query_all(&self, selector: &str) -> Result<Vec<Element>>;
}

impl Queryable for Document {
    fn query_first(&self, selector: &str) -> Result<Option<Element>> {
        Document::query_first(self, selector)
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        Document::query_all(self, selector)
    }
}

impl Queryable for Element {
    fn query_first(&self, selector: &str) -> Result<Option<Element>> {
        Element::query_first(self, selector)
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        Element::query_all(self, selector)
    }
}

/// One result slot per selector, in argument order: the first match for each
/// selector, or `None`. Zero matches is a valid result, never an error.
pub fn select_each<Q: Queryable>(scope: &Q, selectors: &[&str]) -> Result<Vec<Option<Element>>> {
    let mut out = Vec::with_capacity(selectors.len());
    for selector in selectors {
        out.push(scope.query_first(selector)?);
    }
    Ok(out)
}

/// One result slot per selector, in argument order: all matches for each
/// selector in document order.
pub fn select_all_each<Q: Queryable>(scope: &Q, selectors: &[&str]) -> Result<Vec<Vec<Element>>> {
    let mut out = Vec::with_capacity(selectors.len());
    for selector in selectors {
        out.push(scope.query_all(selector)?);
    }
    Ok(out)
}
