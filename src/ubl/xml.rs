//! Tolerant XML-to-tree mapping.
//!
//! Elements keep their local name, resolved namespace, attributes and text
//! separately, so `<cbc:PayableAmount currencyID="USD">500</cbc:PayableAmount>`
//! yields text `500` and attribute `currencyID = USD`.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("element <{0}> is not closed")]
    Unclosed(String),

    #[error("namespace prefix '{0}' is not declared")]
    UnboundPrefix(String),

    #[error("text content outside the root element")]
    StrayText,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Local name, prefix stripped
    pub name: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Name as written in the document, e.g. `cbc:ID`
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follows local names from this node, taking the first match at each step.
    pub fn path(&self, steps: &[&str]) -> Option<&XmlNode> {
        steps.iter().try_fold(self, |node, step| node.child(step))
    }

    /// Trimmed text of the node at `steps`, if present and non-empty.
    pub fn text_at(&self, steps: &[&str]) -> Option<&str> {
        self.path(steps)
            .map(XmlNode::trimmed_text)
            .filter(|t| !t.is_empty())
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Depth-first walk over this node and every descendant.
    pub fn descendants(&self) -> Vec<&XmlNode> {
        let mut out = vec![self];
        let mut idx = 0;
        while idx < out.len() {
            let node = out[idx];
            out.extend(node.children.iter());
            idx += 1;
        }
        out
    }
}

/// Parses a complete document into its root element.
pub fn parse_document(xml: &str) -> Result<XmlNode, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut scopes: Vec<BTreeMap<String, String>> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader.read_event().map_err(|e| XmlError::Syntax {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                let (node, scope) = open_element(&start, &scopes)?;
                scopes.push(scope);
                stack.push(node);
            }
            Event::Empty(start) => {
                let (node, _) = open_element(&start, &scopes)?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                scopes.pop();
                let node = stack.pop().ok_or_else(|| XmlError::Syntax {
                    position: reader.buffer_position(),
                    message: "unexpected closing tag".to_string(),
                })?;
                attach(node, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(|e| XmlError::Syntax {
                    position: reader.buffer_position(),
                    message: e.to_string(),
                })?;
                push_text(&value, &mut stack)?;
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                let value = String::from_utf8_lossy(&raw);
                push_text(&value, &mut stack)?;
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Unclosed(open.qualified_name()));
    }
    root.ok_or(XmlError::NoRoot)
}

fn open_element(
    start: &BytesStart<'_>,
    scopes: &[BTreeMap<String, String>],
) -> Result<(XmlNode, BTreeMap<String, String>), XmlError> {
    let syntax = |message: String| XmlError::Syntax {
        position: 0,
        message,
    };

    let raw_name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| syntax(e.to_string()))?
        .to_string();
    let (prefix, name) = match raw_name.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, raw_name),
    };

    let mut attributes = BTreeMap::new();
    let mut scope = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| syntax(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| syntax(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| syntax(e.to_string()))?
            .into_owned();

        if key == "xmlns" {
            scope.insert(String::new(), value.clone());
        } else if let Some(bound) = key.strip_prefix("xmlns:") {
            scope.insert(bound.to_string(), value.clone());
        }
        attributes.insert(key, value);
    }

    let lookup = prefix.clone().unwrap_or_default();
    let namespace = scope
        .get(&lookup)
        .or_else(|| scopes.iter().rev().find_map(|s| s.get(&lookup)))
        .cloned();
    if namespace.is_none() {
        if let Some(p) = &prefix {
            if p != "xml" {
                return Err(XmlError::UnboundPrefix(p.clone()));
            }
        }
    }

    Ok((
        XmlNode {
            name,
            prefix,
            namespace,
            attributes,
            text: String::new(),
            children: Vec::new(),
        },
        scope,
    ))
}

fn attach(
    node: XmlNode,
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        Ok(())
    } else if root.is_some() {
        Err(XmlError::MultipleRoots)
    } else {
        *root = Some(node);
        Ok(())
    }
}

fn push_text(value: &str, stack: &mut [XmlNode]) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(node) => {
            node.text.push_str(value);
            Ok(())
        }
        None if value.trim().is_empty() => Ok(()),
        None => Err(XmlError::StrayText),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Invoice xmlns="urn:oasis:names:specification:ubl:schema:xsd:Invoice-2"
         xmlns:cbc="urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2">
  <!-- header -->
  <cbc:ID>INV-1</cbc:ID>
  <cbc:Note><![CDATA[Fish & chips]]></cbc:Note>
  <cbc:PayableAmount currencyID="USD">500.00</cbc:PayableAmount>
  <Empty/>
</Invoice>"#;

    #[test]
    fn keeps_attributes_apart_from_text() {
        let root = parse_document(SAMPLE).unwrap();
        assert_eq!(root.name, "Invoice");
        assert_eq!(
            root.namespace.as_deref(),
            Some("urn:oasis:names:specification:ubl:schema:xsd:Invoice-2")
        );

        let amount = root.child("PayableAmount").unwrap();
        assert_eq!(amount.trimmed_text(), "500.00");
        assert_eq!(amount.attribute("currencyID"), Some("USD"));
        assert_eq!(amount.qualified_name(), "cbc:PayableAmount");
        assert_eq!(
            amount.namespace.as_deref(),
            Some("urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2")
        );
    }

    #[test]
    fn reads_cdata_and_empty_elements() {
        let root = parse_document(SAMPLE).unwrap();
        assert_eq!(root.text_at(&["Note"]), Some("Fish & chips"));
        assert!(root.child("Empty").is_some());
        assert_eq!(root.text_at(&["Empty"]), None);
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert_matches!(
            parse_document("<Order><ID>1</Order>"),
            Err(XmlError::Syntax { .. })
        );
    }

    #[test]
    fn rejects_unclosed_documents() {
        assert!(parse_document("<Order><ID>1</ID>").is_err());
    }

    #[test]
    fn rejects_unbound_prefix_and_empty_input() {
        assert_matches!(
            parse_document("<cbc:ID>1</cbc:ID>"),
            Err(XmlError::UnboundPrefix(p)) if p == "cbc"
        );
        assert_matches!(parse_document(""), Err(XmlError::NoRoot));
        assert_matches!(
            parse_document("<a/><b/>"),
            Err(XmlError::MultipleRoots)
        );
    }

    #[test]
    fn path_lookup_and_descendants() {
        let root = parse_document(
            "<Order><Party><PartyName><Name>ABC Corp</Name></PartyName></Party></Order>",
        )
        .unwrap();
        assert_eq!(root.text_at(&["Party", "PartyName", "Name"]), Some("ABC Corp"));
        assert!(root.path(&["Party", "Missing"]).is_none());
        assert_eq!(root.descendants().len(), 4);
    }
}
