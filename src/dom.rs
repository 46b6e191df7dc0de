use std::collections::{HashMap, HashSet};

use crate::core_dom_utils::{
    class_tokens, escape_html_attr, escape_html_text, has_class, js_prop_to_css_name,
    parse_style_declarations, serialize_style_declarations,
};
use crate::html::is_void_tag;
use crate::selector::{
    SelectorCombinator, SelectorPart, SelectorPseudoClass, SelectorStep, parse_selector_groups,
};
use crate::{Error, Result};

/// Handle of a node inside one [`crate::Page`]. Handles are never reused, and
/// a handle from one page is meaningless in another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let id_attr = attrs.get("id").filter(|id| !id.is_empty()).cloned();
        let element = Element { tag_name, attrs };
        let id = self.create_node(Some(parent), NodeType::Element(element));
        if let Some(id_attr) = id_attr {
            // First element with a given id wins, as getElementById does.
            self.id_index.entry(id_attr).or_insert(id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn require_element(&self, node_id: NodeId, what: &str) -> Result<&Element> {
        self.element(node_id)
            .ok_or_else(|| Error::Runtime(format!("{what} target is not an element")))
    }

    fn require_element_mut(&mut self, node_id: NodeId, what: &str) -> Result<&mut Element> {
        self.element_mut(node_id)
            .ok_or_else(|| Error::Runtime(format!("{what} target is not an element")))
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.nodes
            .get(node_id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn text(&self, node_id: NodeId) -> Option<&str> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node_id];
        while let Some(node) = stack.pop() {
            match self.nodes.get(node.0).map(|n| &n.node_type) {
                Some(NodeType::Text(text)) => out.push_str(text),
                Some(NodeType::Document | NodeType::Element(_)) => {
                    stack.extend(self.children(node).iter().rev().copied());
                }
                None => {}
            }
        }
        out
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|e| e.attrs.get(&name.to_ascii_lowercase()).cloned())
    }

    pub(crate) fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|e| e.attrs.contains_key(&name.to_ascii_lowercase()))
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let element = self.require_element_mut(node_id, "setAttribute")?;
        element.attrs.insert(lowered.clone(), value.to_string());
        if lowered == "id" {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) -> Result<()> {
        let lowered = name.to_ascii_lowercase();
        let element = self.require_element_mut(node_id, "removeAttribute")?;
        let removed = element.attrs.remove(&lowered).is_some();
        if removed && lowered == "id" {
            self.rebuild_id_index();
        }
        Ok(())
    }

    pub(crate) fn class_contains(&self, node_id: NodeId, class_name: &str) -> Result<bool> {
        let element = self.require_element(node_id, "classList")?;
        Ok(has_class(&element.attrs, class_name))
    }

    pub(crate) fn class_list(&self, node_id: NodeId) -> Result<Vec<String>> {
        let element = self.require_element(node_id, "classList")?;
        Ok(class_tokens(element.attrs.get("class").map(String::as_str)))
    }

    pub(crate) fn style_get(&self, node_id: NodeId, key: &str) -> Result<String> {
        let element = self.require_element(node_id, "style")?;
        let name = js_prop_to_css_name(key);
        let decls = parse_style_declarations(element.attrs.get("style").map(String::as_str));
        Ok(decls
            .iter()
            .find(|(prop, _)| prop == &name)
            .map(|(_, value)| value.clone())
            .unwrap_or_default())
    }

    pub(crate) fn style_set(&mut self, node_id: NodeId, key: &str, value: &str) -> Result<()> {
        let name = js_prop_to_css_name(key);
        if name.is_empty() {
            return Err(Error::Runtime("style property name is empty".into()));
        }
        let value = value.trim();
        let element = self.require_element_mut(node_id, "style")?;

        let mut decls = parse_style_declarations(element.attrs.get("style").map(String::as_str));
        if let Some(pos) = decls.iter().position(|(prop, _)| prop == &name) {
            if value.is_empty() {
                decls.remove(pos);
            } else {
                decls[pos].1 = value.to_string();
            }
        } else if !value.is_empty() {
            decls.push((name, value.to_string()));
        }

        if decls.is_empty() {
            element.attrs.remove("style");
        } else {
            element
                .attrs
                .insert("style".to_string(), serialize_style_declarations(&decls));
        }

        Ok(())
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let all = self.query_selector_all(selector)?;
        Ok(all.into_iter().next())
    }

    pub(crate) fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let groups = parse_selector_groups(selector)?;

        if groups.len() == 1 && groups[0].len() == 1 {
            if let Some(id) = groups[0][0].step.id_only() {
                return Ok(self.by_id(id).into_iter().collect());
            }
        }

        let mut seen = HashSet::new();
        let mut matched = Vec::new();
        for candidate in self.all_element_nodes() {
            if groups
                .iter()
                .any(|steps| self.matches_selector_chain(candidate, steps))
                && seen.insert(candidate)
            {
                matched.push(candidate);
            }
        }
        Ok(matched)
    }

    pub(crate) fn matches_selector(&self, node_id: NodeId, selector: &str) -> Result<bool> {
        let groups = parse_selector_groups(selector)?;
        if self.element(node_id).is_none() {
            return Ok(false);
        }
        Ok(groups
            .iter()
            .any(|steps| self.matches_selector_chain(node_id, steps)))
    }

    pub(crate) fn closest(&self, node_id: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let groups = parse_selector_groups(selector)?;
        let mut cursor = Some(node_id).filter(|node| self.element(*node).is_some());
        while let Some(current) = cursor {
            if groups
                .iter()
                .any(|steps| self.matches_selector_chain(current, steps))
            {
                return Ok(Some(current));
            }
            cursor = self.parent(current);
        }
        Ok(None)
    }

    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        let mut cursor = Some(node_id);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.parent(node);
        }
        false
    }

    fn rebuild_id_index(&mut self) {
        let mut next = HashMap::new();
        for node in self.all_element_nodes() {
            if let Some(id) = self.element(node).and_then(|e| e.attrs.get("id")) {
                if !id.is_empty() {
                    next.entry(id.clone()).or_insert(node);
                }
            }
        }
        self.id_index = next;
    }

    /// Elements in document (pre-)order.
    pub(crate) fn all_element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if self.element(node).is_some() {
                out.push(node);
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Matches right to left. Descendant and general-sibling steps try every
    /// candidate, so a later failure falls back to the next one.
    fn matches_selector_chain(&self, node_id: NodeId, steps: &[SelectorPart]) -> bool {
        let Some((last, rest)) = steps.split_last() else {
            return false;
        };
        if !self.matches_step(node_id, &last.step) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }

        match last.combinator.unwrap_or(SelectorCombinator::Descendant) {
            SelectorCombinator::Child => self
                .parent(node_id)
                .is_some_and(|parent| self.matches_selector_chain(parent, rest)),
            SelectorCombinator::AdjacentSibling => self
                .previous_element_sibling(node_id)
                .is_some_and(|sibling| self.matches_selector_chain(sibling, rest)),
            SelectorCombinator::Descendant => {
                let mut cursor = self.parent(node_id);
                while let Some(ancestor) = cursor {
                    if self.matches_selector_chain(ancestor, rest) {
                        return true;
                    }
                    cursor = self.parent(ancestor);
                }
                false
            }
            SelectorCombinator::GeneralSibling => {
                let mut cursor = self.previous_element_sibling(node_id);
                while let Some(sibling) = cursor {
                    if self.matches_selector_chain(sibling, rest) {
                        return true;
                    }
                    cursor = self.previous_element_sibling(sibling);
                }
                false
            }
        }
    }

    fn matches_step(&self, node_id: NodeId, step: &SelectorStep) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };

        if let Some(tag) = &step.tag {
            if !element.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }

        if let Some(id) = &step.id {
            if element.attrs.get("id") != Some(id) {
                return false;
            }
        }

        if step
            .classes
            .iter()
            .any(|class_name| !has_class(&element.attrs, class_name))
        {
            return false;
        }

        if !step
            .attrs
            .iter()
            .all(|cond| cond.matches(element.attrs.get(cond.key())))
        {
            return false;
        }

        step.pseudo_classes.iter().all(|pseudo| match pseudo {
            SelectorPseudoClass::FirstChild => self.previous_element_sibling(node_id).is_none(),
            SelectorPseudoClass::LastChild => self.next_element_sibling(node_id).is_none(),
            SelectorPseudoClass::OnlyChild => {
                self.previous_element_sibling(node_id).is_none()
                    && self.next_element_sibling(node_id).is_none()
            }
            SelectorPseudoClass::Empty => self.children(node_id).iter().all(|child| {
                self.text(*child).is_some_and(str::is_empty)
            }),
            SelectorPseudoClass::Not(inners) => !inners
                .iter()
                .any(|inner| self.matches_selector_chain(node_id, inner)),
        })
    }

    fn element_siblings(&self, node_id: NodeId) -> Option<(Vec<NodeId>, usize)> {
        let parent = self.parent(node_id)?;
        let siblings = self
            .children(parent)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect::<Vec<_>>();
        let pos = siblings.iter().position(|sibling| *sibling == node_id)?;
        Some((siblings, pos))
    }

    fn previous_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let (siblings, pos) = self.element_siblings(node_id)?;
        pos.checked_sub(1).map(|prev| siblings[prev])
    }

    fn next_element_sibling(&self, node_id: NodeId) -> Option<NodeId> {
        let (siblings, pos) = self.element_siblings(node_id)?;
        siblings.get(pos + 1).copied()
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        let Some(node) = self.nodes.get(node_id.0) else {
            return String::new();
        };
        match &node.node_type {
            NodeType::Document => node
                .children
                .iter()
                .map(|child| self.dump_node(*child))
                .collect(),
            NodeType::Text(text) => {
                let raw_text_parent = self
                    .parent(node_id)
                    .and_then(|parent| self.tag_name(parent))
                    .is_some_and(|tag| tag == "script" || tag == "style");
                if raw_text_parent {
                    text.clone()
                } else {
                    escape_html_text(text)
                }
            }
            NodeType::Element(element) => {
                let mut out = String::new();
                out.push('<');
                out.push_str(&element.tag_name);
                let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                attrs.sort();
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(&escape_html_attr(v));
                    out.push('"');
                }
                out.push('>');
                if is_void_tag(&element.tag_name) {
                    return out;
                }
                for child in &node.children {
                    out.push_str(&self.dump_node(*child));
                }
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    fn first(dom: &Dom, selector: &str) -> Result<NodeId> {
        dom.query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.into()))
    }

    #[test]
    fn query_selector_returns_first_match_in_document_order() -> Result<()> {
        let dom = parse_html(
            r#"
            <div id="outer" class="has-error"><span class="has-error" id="inner"></span></div>
            <p class="has-error" id="later"></p>
            "#,
        )?;
        let all = dom.query_selector_all(".has-error")?;
        let ids = all
            .iter()
            .map(|node| dom.attr(*node, "id").unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["outer", "inner", "later"]);
        assert_eq!(dom.query_selector(".has-error")?, all.first().copied());
        Ok(())
    }

    #[test]
    fn selector_groups_do_not_duplicate_matches() -> Result<()> {
        let dom = parse_html("<input name='text' class='x'><input name='other'>")?;
        let all = dom.query_selector_all("input[name=text], .x, input")?;
        assert_eq!(all.len(), 2);
        Ok(())
    }

    #[test]
    fn combinators_and_pseudo_classes_match() -> Result<()> {
        let dom = parse_html(
            r#"
            <form id="f">
              <input name="text" id="a">
              <div class="form-group has-error"><span class="help-block" id="msg">bad</span></div>
              <p id="p1"></p>
            </form>
            "#,
        )?;
        assert_eq!(first(&dom, "form > .has-error .help-block")?, first(&dom, "#msg")?);
        assert_eq!(first(&dom, "input + div")?, first(&dom, ".form-group")?);
        assert_eq!(first(&dom, "input ~ p")?, first(&dom, "#p1")?);
        assert_eq!(first(&dom, "form :first-child")?, first(&dom, "#a")?);
        assert_eq!(first(&dom, "form > :last-child")?, first(&dom, "#p1")?);
        assert_eq!(first(&dom, "p:empty")?, first(&dom, "#p1")?);
        assert_eq!(first(&dom, ".help-block:only-child")?, first(&dom, "#msg")?);
        assert_eq!(first(&dom, "form > :not(input, div)")?, first(&dom, "#p1")?);
        assert!(dom.query_selector("form > span")?.is_none());
        Ok(())
    }

    #[test]
    fn descendant_steps_retry_higher_ancestors() -> Result<()> {
        let dom = parse_html(
            r#"<div class="a"><div class="b"><div class="b"><span class="has-error" id="t"></span></div></div></div>"#,
        )?;
        let target = first(&dom, "#t")?;
        assert_eq!(dom.query_selector(".a > .b .has-error")?, Some(target));
        assert!(dom.matches_selector(target, ".a > .b > .b > span")?);
        assert!(dom.query_selector(".a > .has-error")?.is_none());
        Ok(())
    }

    #[test]
    fn general_sibling_steps_retry_earlier_siblings() -> Result<()> {
        let dom = parse_html(
            r#"<form><p class="x"></p><input name="text"><p class="y"></p><input name="other"><span id="t"></span></form>"#,
        )?;
        let target = first(&dom, "#t")?;
        assert_eq!(dom.query_selector(".x + input ~ span")?, Some(target));
        assert_eq!(dom.query_selector(".y + input ~ span")?, Some(target));
        assert!(dom.query_selector(".x + p ~ span")?.is_none());
        Ok(())
    }

    #[test]
    fn matches_and_closest() -> Result<()> {
        let dom = parse_html(r#"<div class="has-error"><span id="msg">x</span></div>"#)?;
        let msg = first(&dom, "#msg")?;
        assert!(dom.matches_selector(msg, "div > span")?);
        assert!(!dom.matches_selector(msg, "div")?);
        assert_eq!(dom.closest(msg, ".has-error")?, dom.query_selector("div")?);
        assert!(dom.closest(msg, "form")?.is_none());
        assert!(dom.matches_selector(msg, "span[").is_err());
        Ok(())
    }

    #[test]
    fn style_overwrite_keeps_position_and_empty_value_removes() -> Result<()> {
        let mut dom = parse_html(r#"<div id="box" style="display: block; color: blue;"></div>"#)?;
        let node = first(&dom, "#box")?;
        dom.style_set(node, "display", "none")?;
        assert_eq!(
            dom.attr(node, "style").as_deref(),
            Some("display: none; color: blue;")
        );
        dom.style_set(node, "backgroundColor", "red")?;
        assert_eq!(dom.style_get(node, "background-color")?, "red");
        dom.style_set(node, "color", "")?;
        dom.style_set(node, "display", "")?;
        dom.style_set(node, "background-color", "")?;
        assert_eq!(dom.attr(node, "style"), None);
        assert_eq!(dom.style_get(node, "display")?, "");
        Ok(())
    }

    #[test]
    fn style_on_text_node_is_an_error() -> Result<()> {
        let mut dom = parse_html("<p>hello</p>")?;
        let p = first(&dom, "p")?;
        let text = dom.children(p)[0];
        assert!(matches!(dom.style_get(text, "display"), Err(Error::Runtime(_))));
        assert!(matches!(
            dom.style_set(text, "display", "none"),
            Err(Error::Runtime(_))
        ));
        Ok(())
    }

    #[test]
    fn id_index_follows_attribute_changes() -> Result<()> {
        let mut dom = parse_html(r#"<div id="a"></div><div id="b"></div>"#)?;
        let a = first(&dom, "#a")?;
        dom.set_attr(a, "id", "c")?;
        assert_eq!(dom.query_selector("#c")?, Some(a));
        assert!(dom.query_selector("#a")?.is_none());
        dom.remove_attr(a, "ID")?;
        assert!(dom.query_selector("#c")?.is_none());
        assert!(!dom.has_attr(a, "id"));
        Ok(())
    }

    #[test]
    fn class_list_reads_tokens() -> Result<()> {
        let dom = parse_html(r#"<div class=" form-group   has-error "></div>"#)?;
        let div = first(&dom, "div")?;
        assert_eq!(dom.class_list(div)?, vec!["form-group", "has-error"]);
        assert!(dom.class_contains(div, "has-error")?);
        assert!(!dom.class_contains(div, "has")?);
        Ok(())
    }

    #[test]
    fn dump_node_is_deterministic_and_escaped() -> Result<()> {
        let dom = parse_html(r#"<div title="a&quot;b" class="x"><input name="text">1 &lt; 2</div>"#)?;
        let div = first(&dom, "div")?;
        assert_eq!(
            dom.dump_node(div),
            r#"<div class="x" title="a&quot;b"><input name="text">1 &lt; 2</div>"#
        );
        assert_eq!(dom.text_content(div), "1 < 2");
        Ok(())
    }
}
