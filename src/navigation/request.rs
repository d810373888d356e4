//! Navigation requests as reported by the renderer.

use peb_scripting::{FrameRef, RequestMethod};
use url::Url;

/// What caused a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationTrigger {
    LinkClick,
    FormSubmit,
    Other,
}

/// One navigation attempt. Created per attempt and discarded after
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationRequest {
    pub url: Url,
    pub trigger: NavigationTrigger,
    pub origin: FrameRef,
    pub is_child_frame: bool,
    /// Form method; `Get` for everything but POST form submissions.
    pub method: RequestMethod,
    /// Body of a POST form submission.
    pub body: Option<String>,
}

impl NavigationRequest {
    pub fn new(url: Url, trigger: NavigationTrigger, origin: FrameRef) -> Self {
        Self {
            url,
            trigger,
            is_child_frame: !origin.is_top(),
            origin,
            method: RequestMethod::Get,
            body: None,
        }
    }

    /// A link clicked in `origin`.
    pub fn link(url: &str, origin: FrameRef) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?, NavigationTrigger::LinkClick, origin))
    }

    /// A GET form submitted from `origin`; the fields are in the URL's query.
    pub fn form_get(url: &str, origin: FrameRef) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(url)?, NavigationTrigger::FormSubmit, origin))
    }

    /// A POST form submitted from `origin` with an url-encoded body.
    pub fn form_post(
        url: &str,
        body: impl Into<String>,
        origin: FrameRef,
    ) -> Result<Self, url::ParseError> {
        let mut request = Self::new(Url::parse(url)?, NavigationTrigger::FormSubmit, origin);
        request.method = RequestMethod::Post;
        request.body = Some(body.into());
        Ok(request)
    }

    /// Query string without the leading `?`, empty when absent.
    pub fn query(&self) -> &str {
        self.url.query().unwrap_or("")
    }

    /// Form data checked for emptiness: the query for GET, the body for POST.
    pub fn form_content(&self) -> &str {
        match self.method {
            RequestMethod::Get => self.query(),
            RequestMethod::Post => self.body.as_deref().unwrap_or(""),
        }
    }
}
