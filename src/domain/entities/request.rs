use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::application::messaging::FallbackPolicy;
use crate::domain::traits::Driver;

/// Opaque data a driver attaches to a request, passed through untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestExtra {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl RequestExtra {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

/// One inbound message and everything the dispatcher learned about it.
///
/// Requests are only built by [`crate::application::messaging::Dispatcher`],
/// which resolves and finalizes them before handing them back.
pub struct Request<'a> {
    id: Uuid,
    received_at: DateTime<Utc>,
    content: String,
    driver: Option<&'a dyn Driver>,
    accepted: bool,
    response: Option<String>,
    rendered: OnceCell<String>,
    fallback: &'a FallbackPolicy,
    extra: RequestExtra,
}

impl<'a> Request<'a> {
    pub(crate) fn new(
        content: impl Into<String>,
        driver: Option<&'a dyn Driver>,
        fallback: &'a FallbackPolicy,
        extra: RequestExtra,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            content: content.into(),
            driver,
            accepted: false,
            response: None,
            rendered: OnceCell::new(),
            fallback,
            extra,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn driver(&self) -> Option<&'a dyn Driver> {
        self.driver
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub fn extra(&self) -> &RequestExtra {
        &self.extra
    }

    pub fn args(&self) -> &[Value] {
        &self.extra.args
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.extra.kwargs.get(key)
    }

    /// The response as it stands: the cached final text once rendered,
    /// otherwise whatever a plugin produced
    pub fn response(&self) -> Option<&str> {
        self.rendered
            .get()
            .map(String::as_str)
            .or(self.response.as_deref())
    }

    /// Final response text. The plugin output if non-empty, otherwise a
    /// fallback phrase; computed once and cached.
    pub fn text(&self) -> &str {
        self.rendered.get_or_init(|| match &self.response {
            Some(response) if !response.is_empty() => response.clone(),
            _ => self.fallback.choose(),
        })
    }

    /// Marks the request accepted. Returns true only on the first call.
    pub(crate) fn accept(&mut self) -> bool {
        !std::mem::replace(&mut self.accepted, true)
    }

    pub(crate) fn set_response(&mut self, response: String) {
        self.response = Some(response);
        self.rendered = OnceCell::new();
    }
}

impl fmt::Display for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("received_at", &self.received_at)
            .field("content", &self.content)
            .field("driver", &self.driver.map(|d| d.name()))
            .field("accepted", &self.accepted)
            .field("response", &self.response())
            .field("extra", &self.extra)
            .finish()
    }
}
