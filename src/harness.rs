use std::collections::{HashMap, VecDeque};

use crate::cookies::{CookieJar, CookieStore};
use crate::dom::{Dom, NodeId};
use crate::html;
use crate::scheduler::{RequestId, ScheduledTask, Scheduler, TaskKind};
use crate::submit::is_submit_control;
use crate::transport::{Completion, MockTransport, RecordedRequest};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct BehaviorConfig {
    pub marker_class: String,
    pub lock_control_during_submit: bool,
    pub show_alert_on_success: bool,
    pub idle_control_class: String,
    pub busy_control_class: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            marker_class: "select".into(),
            lock_control_during_submit: true,
            show_alert_on_success: false,
            idle_control_class: "btn-primary".into(),
            busy_control_class: "btn-secondary".into(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TraceState {
    enabled: bool,
    requests: bool,
    logs: VecDeque<String>,
    log_limit: usize,
    to_stderr: bool,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            requests: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
            to_stderr: true,
        }
    }
}

#[derive(Debug)]
pub(crate) enum PendingAction {
    Submission {
        method: String,
        url: String,
        control: Option<NodeId>,
        target: NodeId,
        completion: Completion,
    },
    FragmentLoad {
        url: String,
        element: NodeId,
        completion: Completion,
    },
}

#[derive(Debug)]
pub struct Harness {
    pub(crate) dom: Dom,
    pub(crate) cookies: CookieJar,
    pub(crate) scheduler: Scheduler,
    pub(crate) transport: MockTransport,
    pub(crate) config: BehaviorConfig,
    pub(crate) trace_state: TraceState,
    pub(crate) pending: HashMap<RequestId, PendingAction>,
    pub(crate) alert_messages: Vec<String>,
    pub(crate) document_url: String,
}

impl Harness {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, BehaviorConfig::default())
    }

    pub fn from_html_with_url(url: &str, html: &str) -> Result<Self> {
        let mut harness = Self::from_html(html)?;
        harness.document_url = url.to_string();
        Ok(harness)
    }

    pub fn from_html_with_config(markup: &str, config: BehaviorConfig) -> Result<Self> {
        let dom = stacker::grow(32 * 1024 * 1024, || html::parse_html(markup))?;
        Ok(Self {
            dom,
            cookies: CookieJar::new(),
            scheduler: Scheduler::default(),
            transport: MockTransport::default(),
            config,
            trace_state: TraceState::default(),
            pending: HashMap::new(),
            alert_messages: Vec::new(),
            document_url: "http://localhost/".into(),
        })
    }

    pub(crate) fn resolve_one(&self, selector: &str) -> Result<NodeId> {
        stacker::grow(32 * 1024 * 1024, || {
            self.dom
                .query_selector(selector)?
                .ok_or_else(|| Error::SelectorNotFound(selector.into()))
        })
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.resolve_one(selector)?;
        stacker::grow(32 * 1024 * 1024, || self.click_node(target))
    }

    fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.disabled(target) {
            return Ok(());
        }

        let cookie_name = self.dom.attr(target, "cookiename");
        let cookie_value = self.dom.attr(target, "cookievalue");
        if let (Some(name), Some(value)) = (cookie_name, cookie_value) {
            return self.select_option(&name, &value);
        }

        if is_submit_control(&self.dom, target) {
            let mut cursor = self.dom.parent(target);
            while let Some(node) = cursor {
                if self
                    .dom
                    .tag_name(node)
                    .is_some_and(|tag| tag.eq_ignore_ascii_case("form"))
                {
                    // A submit control outside a data-target form is
                    // simply unwired, like a page without the handler.
                    let Some(target_id) = self.dom.attr(node, "data-target") else {
                        return Ok(());
                    };
                    let result_field = self.dom.by_id(&target_id).ok_or_else(|| {
                        Error::Runtime(format!("data-target element not found: {target_id}"))
                    })?;
                    return self.submit_form_node(node, result_field, Some(target));
                }
                cursor = self.dom.parent(node);
            }
        }

        Ok(())
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.resolve_one(selector)?;
        let tag = self
            .dom
            .tag_name(target)
            .ok_or_else(|| Error::Runtime("type_text target is not an element".into()))?;
        if !(tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea")) {
            return Err(Error::Runtime(format!(
                "type_text target must be an input or textarea, found <{tag}>"
            )));
        }
        self.dom.set_value(target, text)
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.resolve_one(selector)?;
        let kind = self
            .dom
            .attr(target, "type")
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !(kind == "checkbox" || kind == "radio") {
            return Err(Error::Runtime(
                "set_checked target must be a checkbox or radio input".into(),
            ));
        }
        self.dom.set_checked(target, checked)
    }

    pub fn cookie(&self, name: &str) -> String {
        self.cookies.get(name)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.set(name, value);
    }

    pub fn document_cookie(&self) -> String {
        self.cookies.header()
    }

    pub fn take_cookie_writes(&mut self) -> Vec<String> {
        self.cookies.take_writes()
    }

    pub fn set_response(&mut self, method: &str, url: &str, body: &str) {
        self.transport.set_response(method, url, 200, body);
    }

    pub fn set_response_with_status(&mut self, method: &str, url: &str, status: u16, body: &str) {
        self.transport.set_response(method, url, status, body);
    }

    pub fn set_transport_failure(&mut self, method: &str, url: &str, message: &str) {
        self.transport.set_failure(method, url, message);
    }

    pub fn set_network_latency(&mut self, latency_ms: i64) {
        self.transport.latency_ms = latency_ms.max(0);
    }

    pub fn take_requests(&mut self) -> Vec<RecordedRequest> {
        self.transport.take_calls()
    }

    pub fn take_alert_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alert_messages)
    }

    pub fn load_url_in_element(&mut self, url: &str, id: &str) -> Result<()> {
        let element = self
            .dom
            .by_id(id)
            .ok_or_else(|| Error::SelectorNotFound(format!("#{id}")))?;
        match self.transport.issue("GET", url, "") {
            Some(completion) => {
                let request_id = self.scheduler.allocate_request_id();
                let due = self.scheduler.now_ms + self.transport.latency_ms;
                self.pending.insert(
                    request_id,
                    PendingAction::FragmentLoad {
                        url: url.to_string(),
                        element,
                        completion,
                    },
                );
                self.scheduler
                    .schedule_at(due, TaskKind::RequestCompletion(request_id));
                self.trace_request(&format!("request GET {url} scheduled"));
            }
            None => self.trace_request(&format!("request GET {url} has no route; left pending")),
        }
        Ok(())
    }

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    pub fn pending_requests(&self) -> usize {
        self.scheduler.pending_len()
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Runtime("advance_time requires a non-negative delta".into()));
        }
        let target_ms = self.scheduler.now_ms.saturating_add(delta_ms);
        while let Some(task) = self.scheduler.take_next_due(target_ms) {
            self.scheduler.now_ms = self.scheduler.now_ms.max(task.due_ms);
            self.cookies.set_now(self.scheduler.now_ms);
            self.run_task(task)?;
        }
        self.scheduler.now_ms = target_ms;
        self.cookies.set_now(target_ms);
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        while let Some(task) = self.scheduler.take_next() {
            self.scheduler.now_ms = self.scheduler.now_ms.max(task.due_ms);
            self.cookies.set_now(self.scheduler.now_ms);
            self.run_task(task)?;
        }
        Ok(())
    }

    fn run_task(&mut self, task: ScheduledTask) -> Result<()> {
        match task.kind {
            TaskKind::RequestCompletion(request_id) => {
                let Some(action) = self.pending.remove(&request_id) else {
                    return Ok(());
                };
                match action {
                    PendingAction::Submission {
                        method,
                        url,
                        control,
                        target,
                        completion,
                    } => {
                        self.trace_request(&format!("request {method} {url} completed"));
                        self.finish_submission(control, target, completion)
                    }
                    PendingAction::FragmentLoad {
                        url,
                        element,
                        completion,
                    } => {
                        self.trace_request(&format!("request GET {url} completed"));
                        self.finish_fragment_load(&url, element, completion)
                    }
                }
            }
        }
    }

    fn finish_fragment_load(
        &mut self,
        url: &str,
        element: NodeId,
        completion: Completion,
    ) -> Result<()> {
        match completion {
            Completion::Response { status, body } if (200..300).contains(&status) => {
                self.dom.detach_children(element);
                stacker::grow(32 * 1024 * 1024, || {
                    html::parse_fragment_into(&mut self.dom, element, &body)
                })
            }
            Completion::Response { status, body } => {
                self.trace_error(&format!("load {url} failed: status={status} body={body}"));
                Ok(())
            }
            Completion::TransportError { message } => {
                self.trace_error(&format!("load {url} failed: {message}"));
                Ok(())
            }
        }
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_state.to_stderr = enabled;
    }

    pub fn set_trace_requests(&mut self, enabled: bool) {
        self.trace_state.requests = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Runtime("set_trace_log_limit requires at least 1 entry".into()));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }

    pub(crate) fn trace_request(&mut self, message: &str) {
        if self.trace_state.requests {
            self.trace_line(message);
        }
    }

    pub(crate) fn trace_error(&mut self, message: &str) {
        self.trace_line(message);
    }

    fn trace_line(&mut self, message: &str) {
        if !self.trace_state.enabled {
            return;
        }
        if self.trace_state.to_stderr {
            eprintln!("[panelwire] {message}");
        }
        self.trace_state.logs.push_back(message.to_string());
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        self.resolve_one(selector).map(|_| ())
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.resolve_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.into(),
                expected: expected.into(),
                actual,
                dom_snippet: self.dom.dump_element(target),
            });
        }
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.resolve_one(selector)?;
        let actual = self.dom.inner_text(target).trim().to_string();
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.into(),
                expected: expected.into(),
                actual,
                dom_snippet: self.dom.dump_element(target),
            });
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.resolve_one(selector)?;
        let actual = self.dom.class_contains(target, class_name)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.into(),
                expected: format!("class '{class_name}' present: {expected}"),
                actual: format!("class '{class_name}' present: {actual}"),
                dom_snippet: self.dom.dump_element(target),
            });
        }
        Ok(())
    }

    pub fn assert_disabled(&self, selector: &str, expected: bool) -> Result<()> {
        let target = self.resolve_one(selector)?;
        let actual = self.dom.disabled(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.into(),
                expected: format!("disabled: {expected}"),
                actual: format!("disabled: {actual}"),
                dom_snippet: self.dom.dump_element(target),
            });
        }
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.resolve_one(selector)?;
        Ok(self.dom.dump_element(target))
    }
}
