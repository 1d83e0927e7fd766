//! Fragment parser
//!
//! Uses html5ever's RcDom and flattens it into element snapshots.

use crate::{ElementInfo, ElementKey};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Tags html5ever synthesizes around a fragment
const IMPLIED_TAGS: [&str; 3] = ["html", "head", "body"];

/// HTML fragment parser minting element keys
#[derive(Debug, Default)]
pub struct FragmentParser {
    next_key: u32,
}

impl FragmentParser {
    /// Create a parser whose first key is 1
    pub fn new() -> Self {
        Self { next_key: 1 }
    }

    /// Parse markup into elements in document order
    pub fn parse(&mut self, html: &str) -> Vec<ElementInfo> {
        let dom = match parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
        {
            Ok(dom) => dom,
            Err(err) => {
                tracing::warn!("Failed to read HTML fragment: {}", err);
                return Vec::new();
            }
        };

        let mut elements = Vec::new();
        self.collect(&dom.document, &mut elements);
        tracing::trace!("Parsed {} elements", elements.len());
        elements
    }

    fn mint(&mut self) -> ElementKey {
        let key = ElementKey(self.next_key.max(1));
        self.next_key = key.0 + 1;
        key
    }

    fn collect(&mut self, handle: &Handle, out: &mut Vec<ElementInfo>) {
        if let NodeData::Element { name, attrs, .. } = &handle.data {
            let tag = name.local.to_string();
            if !IMPLIED_TAGS.contains(&tag.as_str()) {
                let mut element = ElementInfo::new(self.mint(), &tag);
                for attr in attrs.borrow().iter() {
                    element.set_attr(&attr.name.local, &attr.value);
                }
                element.text = text_content(handle);
                out.push(element);
            }
        }

        for child in handle.children.borrow().iter() {
            self.collect(child, out);
        }
    }
}

/// Descendant text with whitespace collapsed
fn text_content(handle: &Handle) -> String {
    let mut raw = String::new();
    gather_text(handle, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn gather_text(handle: &Handle, out: &mut String) {
    for child in handle.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => {
                out.push_str(&contents.borrow());
                out.push(' ');
            }
            NodeData::Element { .. } => gather_text(child, out),
            _ => {}
        }
    }
}
