use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
}

#[derive(Debug, Clone)]
enum Route {
    Respond { status: u16, body: String },
    Fail { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Completion {
    Response { status: u16, body: String },
    TransportError { message: String },
}

#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    routes: HashMap<(String, String), Route>,
    pub(crate) calls: Vec<RecordedRequest>,
    pub(crate) latency_ms: i64,
}

impl MockTransport {
    pub(crate) fn set_response(&mut self, method: &str, url: &str, status: u16, body: &str) {
        self.routes.insert(
            route_key(method, url),
            Route::Respond {
                status,
                body: body.to_string(),
            },
        );
    }

    pub(crate) fn set_failure(&mut self, method: &str, url: &str, message: &str) {
        self.routes.insert(
            route_key(method, url),
            Route::Fail {
                message: message.to_string(),
            },
        );
    }

    // Records the request and resolves its outcome from the route
    // table. None means no route is registered: there is no timeout,
    // so the request stays in flight forever.
    pub(crate) fn issue(&mut self, method: &str, url: &str, body: &str) -> Option<Completion> {
        self.calls.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            body: body.to_string(),
        });
        match self.routes.get(&route_key(method, url))? {
            Route::Respond { status, body } => Some(Completion::Response {
                status: *status,
                body: body.clone(),
            }),
            Route::Fail { message } => Some(Completion::TransportError {
                message: message.clone(),
            }),
        }
    }

    pub(crate) fn take_calls(&mut self) -> Vec<RecordedRequest> {
        std::mem::take(&mut self.calls)
    }
}

fn route_key(method: &str, url: &str) -> (String, String) {
    (method.to_ascii_uppercase(), url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_match_method_case_insensitively() {
        let mut transport = MockTransport::default();
        transport.set_response("post", "/function/MyTestMapping", 200, "{}");
        let completion = transport.issue("POST", "/function/MyTestMapping", "a=1");
        assert_eq!(
            completion,
            Some(Completion::Response {
                status: 200,
                body: "{}".to_string()
            })
        );
    }

    #[test]
    fn unrouted_requests_hang_but_are_still_recorded() {
        let mut transport = MockTransport::default();
        assert_eq!(transport.issue("GET", "/sin", ""), None);
        let calls = transport.take_calls();
        assert_eq!(
            calls,
            vec![RecordedRequest {
                method: "GET".to_string(),
                url: "/sin".to_string(),
                body: String::new(),
            }]
        );
    }

    #[test]
    fn failure_routes_resolve_to_transport_errors() {
        let mut transport = MockTransport::default();
        transport.set_failure("GET", "/sin", "connection reset");
        assert_eq!(
            transport.issue("GET", "/sin", ""),
            Some(Completion::TransportError {
                message: "connection reset".to_string()
            })
        );
    }
}
