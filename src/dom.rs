use std::collections::HashMap;

use crate::selector::{
    SelectorAttrCondition, SelectorCombinator, SelectorPart, parse_selector_groups,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

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
    pub(crate) value: String,
    pub(crate) checked: bool,
    pub(crate) disabled: bool,
}

#[derive(Debug)]
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

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let checked = attrs.contains_key("checked");
        let disabled = attrs.contains_key("disabled");
        let element = Element {
            tag_name,
            attrs,
            value: String::new(),
            checked,
            disabled,
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            node_type: NodeType::Element(element),
        });
        self.nodes[parent.0].children.push(id);
        if let Some(dom_id) = self.attr(id, "id") {
            self.id_index.entry(dom_id).or_insert(id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            node_type: NodeType::Text(text),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|element| element.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)?
            .attrs
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn value(&self, node_id: NodeId) -> Result<String> {
        self.element(node_id)
            .map(|element| element.value.clone())
            .ok_or_else(|| Error::Runtime("value target is not an element".into()))
    }

    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Runtime("value target is not an element".into()))?;
        element.value = value.to_string();
        Ok(())
    }

    pub(crate) fn disabled(&self, node_id: NodeId) -> bool {
        self.element(node_id).is_some_and(|element| element.disabled)
    }

    pub(crate) fn set_disabled(&mut self, node_id: NodeId, disabled: bool) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Runtime("disabled target is not an element".into()))?;
        element.disabled = disabled;
        Ok(())
    }

    pub(crate) fn set_checked(&mut self, node_id: NodeId, checked: bool) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Runtime("checked target is not an element".into()))?;
        element.checked = checked;
        Ok(())
    }

    pub(crate) fn class_contains(&self, node_id: NodeId, class_name: &str) -> Result<bool> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::Runtime("class target is not an element".into()))?;
        Ok(has_class(element, class_name))
    }

    pub(crate) fn class_add(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Runtime("class target is not an element".into()))?;
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        if !classes.iter().any(|name| name == class_name) {
            classes.push(class_name.to_string());
        }
        set_class_attr(element, &classes);
        Ok(())
    }

    pub(crate) fn class_remove(&mut self, node_id: NodeId, class_name: &str) -> Result<()> {
        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::Runtime("class target is not an element".into()))?;
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        classes.retain(|name| name != class_name);
        set_class_attr(element, &classes);
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

        let mut ids = Vec::new();
        self.collect_elements_dfs(self.root, &mut ids);

        let mut matched = Vec::new();
        for candidate in ids {
            if groups
                .iter()
                .any(|parts| self.matches_selector_chain(candidate, parts))
            {
                matched.push(candidate);
            }
        }
        Ok(matched)
    }

    pub(crate) fn collect_elements_dfs(&self, node_id: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node_id.0].children {
            if self.element(*child).is_some() {
                out.push(*child);
            }
            self.collect_elements_dfs(*child, out);
        }
    }

    fn matches_selector_chain(&self, node_id: NodeId, parts: &[SelectorPart]) -> bool {
        let Some((last, rest)) = parts.split_last() else {
            return true;
        };
        if !self.matches_selector_step(node_id, last) {
            return false;
        }
        if rest.is_empty() {
            return true;
        }
        match last.combinator {
            Some(SelectorCombinator::Child) => match self.parent(node_id) {
                Some(parent) => self.matches_selector_chain(parent, rest),
                None => false,
            },
            _ => {
                let mut cursor = self.parent(node_id);
                while let Some(ancestor) = cursor {
                    if self.matches_selector_chain(ancestor, rest) {
                        return true;
                    }
                    cursor = self.parent(ancestor);
                }
                false
            }
        }
    }

    fn matches_selector_step(&self, node_id: NodeId, part: &SelectorPart) -> bool {
        let Some(element) = self.element(node_id) else {
            return false;
        };
        let step = &part.step;

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

        for class_name in &step.classes {
            if !has_class(element, class_name) {
                return false;
            }
        }

        for condition in &step.attrs {
            match condition {
                SelectorAttrCondition::Exists { key } => {
                    if !element.attrs.contains_key(key) {
                        return false;
                    }
                }
                SelectorAttrCondition::Eq { key, value } => {
                    if element.attrs.get(key) != Some(value) {
                        return false;
                    }
                }
            }
        }

        true
    }

    pub(crate) fn inner_text(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node_id, &mut out);
        out
    }

    fn collect_text(&self, node_id: NodeId, out: &mut String) {
        for child in &self.nodes[node_id.0].children {
            match &self.nodes[child.0].node_type {
                NodeType::Text(text) => out.push_str(text),
                NodeType::Element(_) => self.collect_text(*child, out),
                NodeType::Document => {}
            }
        }
    }

    // Orphaned nodes stay in the arena; only the tree link is severed.
    pub(crate) fn detach_children(&mut self, node_id: NodeId) {
        let mut detached = Vec::new();
        self.collect_elements_dfs(node_id, &mut detached);
        let children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        for element_id in detached {
            if let Some(id) = self.attr(element_id, "id") {
                if self.id_index.get(&id) == Some(&element_id) {
                    self.id_index.remove(&id);
                }
            }
        }
    }

    pub(crate) fn reindex_subtree_ids(&mut self, node_id: NodeId) {
        let mut ids = Vec::new();
        self.collect_elements_dfs(node_id, &mut ids);
        for element_id in ids {
            if let Some(dom_id) = self.attr(element_id, "id") {
                self.id_index.entry(dom_id).or_insert(element_id);
            }
        }
    }

    pub(crate) fn init_form_control_values(&mut self, node_id: NodeId) {
        let mut ids = Vec::new();
        self.collect_elements_dfs(node_id, &mut ids);
        for element_id in ids {
            let Some(tag) = self.tag_name(element_id).map(str::to_string) else {
                continue;
            };
            if tag.eq_ignore_ascii_case("input") {
                let initial = self.attr(element_id, "value").unwrap_or_default();
                if let Some(element) = self.element_mut(element_id) {
                    element.value = initial;
                }
            } else if tag.eq_ignore_ascii_case("textarea") {
                let initial = self.inner_text(element_id);
                if let Some(element) = self.element_mut(element_id) {
                    element.value = initial;
                }
            } else if tag.eq_ignore_ascii_case("select") {
                let initial = self.select_initial_value(element_id);
                if let Some(element) = self.element_mut(element_id) {
                    element.value = initial;
                }
            }
        }
    }

    fn select_initial_value(&self, select_id: NodeId) -> String {
        let mut options = Vec::new();
        self.collect_elements_dfs(select_id, &mut options);
        options.retain(|id| {
            self.tag_name(*id)
                .is_some_and(|tag| tag.eq_ignore_ascii_case("option"))
        });

        let chosen = options
            .iter()
            .find(|id| self.element(**id).is_some_and(|e| e.attrs.contains_key("selected")))
            .or_else(|| options.first());

        match chosen {
            Some(option) => self
                .attr(*option, "value")
                .unwrap_or_else(|| self.inner_text(*option).trim().to_string()),
            None => String::new(),
        }
    }

    pub(crate) fn dump_element(&self, node_id: NodeId) -> String {
        let Some(element) = self.element(node_id) else {
            return "<non-element>".to_string();
        };
        let mut attrs = element
            .attrs
            .iter()
            .map(|(name, value)| format!(" {name}=\"{value}\""))
            .collect::<Vec<_>>();
        attrs.sort();
        format!("<{}{}>", element.tag_name, attrs.concat())
    }
}

pub(crate) fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .unwrap_or_default()
        .split_ascii_whitespace()
        .map(str::to_string)
        .collect()
}

pub(crate) fn has_class(element: &Element, class_name: &str) -> bool {
    class_tokens(element.attrs.get("class").map(String::as_str))
        .iter()
        .any(|name| name == class_name)
}

pub(crate) fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.attrs.remove("class");
    } else {
        element.attrs.insert("class".into(), classes.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dom() -> Dom {
        let mut dom = Dom::new();
        let root = dom.root;
        let div = dom.create_element(
            root,
            "div".into(),
            HashMap::from([("id".into(), "panel".into())]),
        );
        dom.create_element(
            div,
            "span".into(),
            HashMap::from([
                ("cookiename".into(), "Scale".into()),
                ("cookievalue".into(), "2".into()),
                ("class".into(), "option".into()),
            ]),
        );
        dom.create_element(
            div,
            "span".into(),
            HashMap::from([
                ("cookiename".into(), "Scale".into()),
                ("cookievalue".into(), "10".into()),
            ]),
        );
        dom
    }

    #[test]
    fn by_id_lookup_and_id_only_fast_path_agree() -> Result<()> {
        let dom = sample_dom();
        let by_index = dom.by_id("panel").expect("panel exists");
        let by_query = dom.query_selector("#panel")?.expect("panel matches");
        assert_eq!(by_index, by_query);
        Ok(())
    }

    #[test]
    fn attribute_selectors_match_value_pairs() -> Result<()> {
        let dom = sample_dom();
        assert_eq!(dom.query_selector_all("[cookiename='Scale']")?.len(), 2);
        assert_eq!(
            dom.query_selector_all("[cookiename='Scale'][cookievalue='10']")?
                .len(),
            1
        );
        assert_eq!(dom.query_selector_all("[cookievalue='3']")?.len(), 0);
        Ok(())
    }

    #[test]
    fn attribute_names_are_case_insensitive_in_queries() -> Result<()> {
        let dom = sample_dom();
        assert_eq!(dom.query_selector_all("[cookieName='Scale']")?.len(), 2);
        Ok(())
    }

    #[test]
    fn descendant_and_child_combinators_walk_ancestors() -> Result<()> {
        let dom = sample_dom();
        assert_eq!(dom.query_selector_all("div span")?.len(), 2);
        assert_eq!(dom.query_selector_all("#panel > span.option")?.len(), 1);
        assert_eq!(dom.query_selector_all("span div")?.len(), 0);
        Ok(())
    }

    #[test]
    fn class_add_is_idempotent_and_remove_clears_attr() -> Result<()> {
        let mut dom = sample_dom();
        let target = dom.query_selector("span.option")?.expect("option exists");
        dom.class_add(target, "select")?;
        dom.class_add(target, "select")?;
        assert_eq!(
            dom.attr(target, "class").as_deref(),
            Some("option select")
        );
        dom.class_remove(target, "select")?;
        dom.class_remove(target, "option")?;
        assert_eq!(dom.attr(target, "class"), None);
        Ok(())
    }
}
