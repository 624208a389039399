//! Hooks invoked around the transport call.

use std::fmt;

use crate::error::HttpError;
use crate::http::{HttpRequest, ResponseHead};

type BeforeSend<'a> = dyn Fn(&mut HttpRequest) -> Result<(), HttpError> + Send + Sync + 'a;
type AfterReceive<'a> = dyn Fn(&ResponseHead) + Send + Sync + 'a;

/// Optional pre-send mutator and post-receive inspector.
///
/// `before_send` runs after the request is fully built and may change its
/// method, headers or body; an error aborts the send. `after_receive` sees the
/// status and headers before the success check and its result is ignored.
#[derive(Default, Clone, Copy)]
pub struct Filters<'a> {
    before_send: Option<&'a BeforeSend<'a>>,
    after_receive: Option<&'a AfterReceive<'a>>,
}

impl<'a> Filters<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn before_send<F>(mut self, filter: &'a F) -> Self
    where
        F: Fn(&mut HttpRequest) -> Result<(), HttpError> + Send + Sync + 'a,
    {
        self.before_send = Some(filter);
        self
    }

    pub fn after_receive<F>(mut self, filter: &'a F) -> Self
    where
        F: Fn(&ResponseHead) + Send + Sync + 'a,
    {
        self.after_receive = Some(filter);
        self
    }

    pub(crate) fn apply_before_send(&self, request: &mut HttpRequest) -> Result<(), HttpError> {
        match self.before_send {
            Some(filter) => filter(request),
            None => Ok(()),
        }
    }

    pub(crate) fn apply_after_receive(&self, head: &ResponseHead) {
        if let Some(filter) = self.after_receive {
            filter(head);
        }
    }
}

impl fmt::Debug for Filters<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filters")
            .field("before_send", &self.before_send.is_some())
            .field("after_receive", &self.after_receive.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    #[test]
    fn before_send_can_rewrite_method_and_headers() {
        let filter = |req: &mut HttpRequest| -> Result<(), HttpError> {
            req.method = HttpMethod::Put;
            req.set_header("X-Filtered", "1")?;
            Ok(())
        };
        let filters = Filters::none().before_send(&filter);

        let mut req = HttpRequest::get("http://localhost/").unwrap();
        filters.apply_before_send(&mut req).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.header("x-filtered"), Some("1"));
    }

    #[test]
    fn before_send_error_propagates() {
        let filter = |req: &mut HttpRequest| -> Result<(), HttpError> {
            req.set_header("Content-Type", "text/csv")?;
            Ok(())
        };
        let filters = Filters::none().before_send(&filter);
        let mut req = HttpRequest::get("http://localhost/").unwrap();
        assert!(matches!(
            filters.apply_before_send(&mut req),
            Err(HttpError::Unsupported(_))
        ));
    }

    #[test]
    fn empty_filters_are_noops() {
        let mut req = HttpRequest::get("http://localhost/").unwrap();
        Filters::none().apply_before_send(&mut req).unwrap();
        assert_eq!(format!("{:?}", Filters::none()), "Filters { before_send: false, after_receive: false }");
    }
}
