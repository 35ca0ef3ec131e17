use serde_json::Value;

use crate::dom::{Dom, NodeId};
use crate::harness::{Harness, PendingAction};
use crate::scheduler::TaskKind;
use crate::transport::Completion;
use crate::urlenc::serialize_form_pairs;
use crate::{Error, Result};

pub(crate) fn is_submit_control(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    if element.tag_name.eq_ignore_ascii_case("button") {
        return element
            .attrs
            .get("type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(true);
    }

    if element.tag_name.eq_ignore_ascii_case("input") {
        return element
            .attrs
            .get("type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(false);
    }

    false
}

fn is_form_control(dom: &Dom, node_id: NodeId) -> bool {
    let Some(element) = dom.element(node_id) else {
        return false;
    };

    element.tag_name.eq_ignore_ascii_case("input")
        || element.tag_name.eq_ignore_ascii_case("select")
        || element.tag_name.eq_ignore_ascii_case("textarea")
        || element.tag_name.eq_ignore_ascii_case("button")
}

fn collect_form_controls(dom: &Dom, node_id: NodeId, out: &mut Vec<NodeId>) {
    for child in &dom.nodes[node_id.0].children {
        if is_form_control(dom, *child) {
            out.push(*child);
        }
        collect_form_controls(dom, *child, out);
    }
}

fn is_successful_control(dom: &Dom, control: NodeId) -> bool {
    if dom.disabled(control) {
        return false;
    }
    let name = dom.attr(control, "name").unwrap_or_default();
    if name.is_empty() {
        return false;
    }

    let Some(element) = dom.element(control) else {
        return false;
    };

    if element.tag_name.eq_ignore_ascii_case("button") {
        return false;
    }

    if element.tag_name.eq_ignore_ascii_case("input") {
        let kind = element
            .attrs
            .get("type")
            .cloned()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if matches!(kind.as_str(), "button" | "submit" | "reset" | "file" | "image") {
            return false;
        }
        if kind == "checkbox" || kind == "radio" {
            return element.checked;
        }
    }

    true
}

pub(crate) fn form_data_entries(dom: &Dom, form: NodeId) -> Vec<(String, String)> {
    let mut controls = Vec::new();
    collect_form_controls(dom, form, &mut controls);

    let mut out = Vec::new();
    for control in controls {
        if !is_successful_control(dom, control) {
            continue;
        }
        let name = dom.attr(control, "name").unwrap_or_default();
        let value = dom
            .element(control)
            .map(|element| element.value.clone())
            .unwrap_or_default();
        out.push((name, value));
    }
    out
}

// Exact contract: key, newline, stringified value, newline, newline,
// in mapping order. No trailing-separator trimming, no escaping.
pub(crate) fn render_result_lines(result: &serde_json::Map<String, Value>) -> String {
    let mut out = String::new();
    for (key, value) in result {
        out.push_str(key);
        out.push('\n');
        match value {
            Value::String(text) => out.push_str(text),
            other => out.push_str(&other.to_string()),
        }
        out.push('\n');
        out.push('\n');
    }
    out
}

impl Harness {
    pub fn submit_form(&mut self, form_selector: &str, target_selector: &str) -> Result<()> {
        let form = self.resolve_one(form_selector)?;
        let target = self.resolve_one(target_selector)?;
        self.submit_form_node(form, target, None)
    }

    pub(crate) fn submit_form_node(
        &mut self,
        form: NodeId,
        target: NodeId,
        control: Option<NodeId>,
    ) -> Result<()> {
        let form_tag = self
            .dom
            .tag_name(form)
            .ok_or_else(|| Error::Runtime("submit target is not an element".into()))?;
        if !form_tag.eq_ignore_ascii_case("form") {
            return Err(Error::Runtime(format!(
                "submit target must be a form, found <{form_tag}>"
            )));
        }
        if self.dom.element(target).is_none() {
            return Err(Error::Runtime("result target is not an element".into()));
        }

        let method = self
            .dom
            .attr(form, "method")
            .unwrap_or_else(|| "GET".into())
            .to_ascii_uppercase();
        let url = self
            .dom
            .attr(form, "action")
            .unwrap_or_else(|| self.document_url.clone());
        let body = serialize_form_pairs(&form_data_entries(&self.dom, form));

        if self.config.lock_control_during_submit {
            if let Some(control) = control {
                let idle = self.config.idle_control_class.clone();
                let busy = self.config.busy_control_class.clone();
                self.dom.set_disabled(control, true)?;
                self.dom.class_remove(control, &idle)?;
                self.dom.class_add(control, &busy)?;
            }
        }

        match self.transport.issue(&method, &url, &body) {
            Some(completion) => {
                let request_id = self.scheduler.allocate_request_id();
                let due = self.scheduler.now_ms + self.transport.latency_ms;
                self.pending.insert(
                    request_id,
                    PendingAction::Submission {
                        method: method.clone(),
                        url: url.clone(),
                        control,
                        target,
                        completion,
                    },
                );
                self.scheduler
                    .schedule_at(due, TaskKind::RequestCompletion(request_id));
                self.trace_request(&format!("request {method} {url} scheduled"));
            }
            None => {
                self.trace_request(&format!("request {method} {url} has no route; left pending"));
            }
        }
        Ok(())
    }

    pub(crate) fn finish_submission(
        &mut self,
        control: Option<NodeId>,
        target: NodeId,
        completion: Completion,
    ) -> Result<()> {
        match completion {
            Completion::Response { status, body } if (200..300).contains(&status) => {
                match serde_json::from_str::<Value>(&body) {
                    Ok(Value::Object(result)) => {
                        let text = render_result_lines(&result);
                        if self.config.show_alert_on_success {
                            self.alert_messages.push(text.clone());
                        }
                        self.dom.set_value(target, &text)?;
                    }
                    Ok(_) => {
                        self.trace_error("submit result is not a JSON object");
                    }
                    Err(error) => {
                        self.trace_error(&format!("submit result decode failed: {error}"));
                    }
                }
            }
            Completion::Response { status, body } => {
                self.trace_error(&format!("submit failed: status={status} body={body}"));
            }
            Completion::TransportError { message } => {
                self.trace_error(&format!("submit failed: {message}"));
            }
        }
        self.restore_submit_control(control)
    }

    fn restore_submit_control(&mut self, control: Option<NodeId>) -> Result<()> {
        if !self.config.lock_control_during_submit {
            return Ok(());
        }
        let Some(control) = control else {
            return Ok(());
        };
        let idle = self.config.idle_control_class.clone();
        let busy = self.config.busy_control_class.clone();
        self.dom.set_disabled(control, false)?;
        self.dom.class_remove(control, &busy)?;
        self.dom.class_add(control, &idle)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    #[test]
    fn rendered_lines_follow_the_mapping_order() {
        let result = serde_json::from_str::<Value>(r#"{"a": "1/2", "b": "3"}"#)
            .expect("valid json");
        let Value::Object(map) = result else {
            panic!("expected object");
        };
        assert_eq!(render_result_lines(&map), "a\n1/2\n\nb\n3\n\n");
    }

    #[test]
    fn non_string_values_render_their_json_text() {
        let result = serde_json::from_str::<Value>(r#"{"scale": 10, "exact": true}"#)
            .expect("valid json");
        let Value::Object(map) = result else {
            panic!("expected object");
        };
        assert_eq!(render_result_lines(&map), "scale\n10\n\nexact\ntrue\n\n");
    }

    #[test]
    fn insertion_order_is_preserved_even_when_unsorted() {
        let result = serde_json::from_str::<Value>(r#"{"z": "1", "a": "2", "m": "3"}"#)
            .expect("valid json");
        let Value::Object(map) = result else {
            panic!("expected object");
        };
        assert_eq!(render_result_lines(&map), "z\n1\n\na\n2\n\nm\n3\n\n");
    }

    #[test]
    fn empty_result_renders_an_empty_accumulator() {
        let map = serde_json::Map::new();
        assert_eq!(render_result_lines(&map), "");
    }

    #[test]
    fn serialization_takes_named_enabled_controls_in_document_order() -> crate::Result<()> {
        let dom = parse_html(
            "<form id='f'>\
               <input name='rationalNumber' value='1/3'>\
               <input name='ignored' value='x' disabled>\
               <input value='no-name'>\
               <select name='outputType'>\
                 <option value='EXACT' selected>exact</option>\
               </select>\
               <textarea name='note'>hi</textarea>\
               <button name='go' value='1'>go</button>\
             </form>",
        )?;
        let form = dom.by_id("f").expect("form exists");
        assert_eq!(
            form_data_entries(&dom, form),
            vec![
                ("rationalNumber".to_string(), "1/3".to_string()),
                ("outputType".to_string(), "EXACT".to_string()),
                ("note".to_string(), "hi".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn checkboxes_and_radios_serialize_only_when_checked() -> crate::Result<()> {
        let dom = parse_html(
            "<form id='f'>\
               <input type='checkbox' name='flag' value='on' checked>\
               <input type='checkbox' name='off' value='on'>\
               <input type='radio' name='pick' value='a'>\
               <input type='radio' name='pick' value='b' checked>\
             </form>",
        )?;
        let form = dom.by_id("f").expect("form exists");
        assert_eq!(
            form_data_entries(&dom, form),
            vec![
                ("flag".to_string(), "on".to_string()),
                ("pick".to_string(), "b".to_string()),
            ]
        );
        Ok(())
    }
}
