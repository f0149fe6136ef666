//! HTTP adapter.
//!
//! The host forwards plugin HTTP requests over the bridge. Each one becomes
//! an [`HttpAction`] whose response is buffered and handed back as an
//! [`http::Response`] once the router has finished.

use std::collections::HashMap;
use std::sync::Arc;

use http::header::{CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};
use serde_json::Value;
use tracing::{debug, info};
use url::form_urlencoded;

use crate::dispatch::{
    Action, ActionError, BasicAction, RequestContext, Responder, Router, Surface, encode_json,
    render_template,
};
use crate::services::{ServiceContext, SharedServiceContext};

const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

/// Header the host uses to report the authenticated platform user.
pub const CALLER_ID_HEADER: &str = "mattermost-user-id";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Buffered response being assembled by the responder.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    fn new(status: StatusCode, content_type: &str, body: Vec<u8>) -> Result<Self, ActionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, header_value(content_type)?);
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl Default for BufferedResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ActionError> {
    HeaderValue::from_str(value).map_err(|error| {
        ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, error)
            .context("failed to write response")
    })
}

/// An inbound request together with its parsed inputs and pending response.
#[derive(Debug)]
pub struct HttpExchange {
    request: Request<Vec<u8>>,
    form: HashMap<String, String>,
    response: BufferedResponse,
}

impl HttpExchange {
    /// Parses query and urlencoded body values.
    ///
    /// Body values shadow query values of the same name; within each source
    /// the first occurrence wins.
    #[must_use]
    pub fn new(request: Request<Vec<u8>>) -> Self {
        let mut form = HashMap::new();
        if is_form_body(&request) {
            for (name, value) in form_urlencoded::parse(request.body()) {
                form.entry(name.into_owned()).or_insert_with(|| value.into_owned());
            }
        }
        if let Some(query) = request.uri().query() {
            for (name, value) in form_urlencoded::parse(query.as_bytes()) {
                form.entry(name.into_owned()).or_insert_with(|| value.into_owned());
            }
        }
        Self {
            request,
            form,
            response: BufferedResponse::default(),
        }
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// The full request.
    #[must_use]
    pub fn request(&self) -> &Request<Vec<u8>> {
        &self.request
    }

    /// Form or query value.
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    /// Response assembled so far.
    #[must_use]
    pub fn response(&self) -> &BufferedResponse {
        &self.response
    }
}

fn is_form_body(request: &Request<Vec<u8>>) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
}

/// Action for one HTTP request.
pub struct HttpAction {
    inner: BasicAction,
    exchange: HttpExchange,
}

impl HttpAction {
    /// Wraps `request`, taking the caller from [`CALLER_ID_HEADER`].
    pub fn new(config: Arc<ServiceContext>, request: Request<Vec<u8>>) -> Self {
        let mut context = RequestContext::new(config);
        if let Some(caller_id) = request
            .headers()
            .get(CALLER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            context.set_caller_id(caller_id);
        }
        Self {
            inner: BasicAction::new(context),
            exchange: HttpExchange::new(request),
        }
    }

    /// Request and pending response.
    #[must_use]
    pub fn exchange(&self) -> &HttpExchange {
        &self.exchange
    }

    /// Converts the buffered response.
    #[must_use]
    pub fn into_response(self) -> Response<Vec<u8>> {
        let BufferedResponse {
            status,
            headers,
            body,
        } = self.exchange.response;
        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    fn write(
        &mut self,
        status: StatusCode,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), ActionError> {
        let response = BufferedResponse::new(status, content_type, body)
            .map_err(|error| self.respond_error(error))?;
        self.exchange.response = response;
        Ok(())
    }
}

impl Responder for HttpAction {
    fn respond_json(&mut self, value: &Value) -> Result<(), ActionError> {
        let mut body = encode_json(value).map_err(|error| self.respond_error(error))?;
        body.push(b'\n');
        self.write(StatusCode::OK, APPLICATION_JSON, body)
    }

    fn respond_template(
        &mut self,
        key: &str,
        content_type: &str,
        values: &Value,
    ) -> Result<(), ActionError> {
        let body = render_template(self.inner.context().config().templates(), key, values)
            .map_err(|error| self.respond_error(error))?;
        self.write(StatusCode::OK, content_type, body.into_bytes())
    }

    fn respond_redirect(&mut self, url: &str) -> Result<(), ActionError> {
        let status = if self.exchange.method() == Method::GET {
            StatusCode::FOUND
        } else {
            StatusCode::TEMPORARY_REDIRECT
        };
        let location = header_value(url).map_err(|error| self.respond_error(error))?;
        let mut response = BufferedResponse::default();
        response.status = status;
        response.headers.insert(LOCATION, location);
        self.exchange.response = response;
        Ok(())
    }

    fn respond_error(&mut self, error: ActionError) -> ActionError {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        self.exchange.response = BufferedResponse {
            status: error.status(),
            headers,
            body: format!("{error}\n").into_bytes(),
        };
        error
    }

    fn respond_text(&mut self, text: &str) -> Result<(), ActionError> {
        self.write(StatusCode::OK, TEXT_PLAIN, text.as_bytes().to_vec())
    }
}

impl Action for HttpAction {
    fn context(&self) -> &RequestContext {
        self.inner.context()
    }

    fn context_mut(&mut self) -> &mut RequestContext {
        self.inner.context_mut()
    }

    fn form_value(&self, name: &str) -> Option<&str> {
        self.exchange.form_value(name)
    }

    fn surface(&self) -> Surface<'_> {
        Surface::Http(&self.exchange)
    }
}

/// After step logging one line per HTTP request.
pub fn log_http_action(action: &mut dyn Action) -> Result<(), ActionError> {
    let Surface::Http(exchange) = action.surface() else {
        return Err(ActionError::misconfiguration("an HTTP action is required"));
    };
    let status = exchange.response().status().as_u16();
    let uri = exchange.uri();
    match action.context().last_error() {
        Some(error) => info!(target: HTTP_TARGET, status, %uri, %error, "http request failed"),
        None => debug!(target: HTTP_TARGET, status, %uri, "http request served"),
    }
    Ok(())
}

/// Serves HTTP requests through a router.
#[derive(Clone)]
pub struct HttpSurface {
    router: Arc<Router>,
    services: Arc<SharedServiceContext>,
}

impl HttpSurface {
    /// Pairs a router with the process configuration.
    pub fn new(router: Arc<Router>, services: Arc<SharedServiceContext>) -> Self {
        Self { router, services }
    }

    /// Dispatches `request` and returns the buffered response.
    ///
    /// The route key is the request path with the plugin's public prefix
    /// (`/plugins/<id>`) removed when present.
    pub fn handle(&self, request: Request<Vec<u8>>) -> Response<Vec<u8>> {
        let config = self.services.snapshot();
        let key = route_key(&config, request.uri());
        let mut action = HttpAction::new(config, request);
        self.router.dispatch(&key, &mut action);
        action.into_response()
    }
}

fn route_key(config: &ServiceContext, uri: &Uri) -> String {
    let prefix = config.settings().plugin_url_path();
    let path = uri.path();
    match path.strip_prefix(prefix.as_str()) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.to_owned(),
        _ => path.to_owned(),
    }
}
