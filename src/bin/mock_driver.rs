//! Mock WebDriver binary for integration testing
//!
//! This binary implements a minimal W3C WebDriver REST subset over a
//! plain HTTP/1.1 loop (one request per connection), backed by an
//! in-memory simulation of a small web portal: a login page with two
//! shadow-hosted inputs, a dashboard with a work-order dialog whose
//! fields attach a moment after the dialog opens, and a legacy greeting
//! page. It lets the runner be exercised without a real browser.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Instant;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const ENTER_KEY: char = '\u{e007}';

/// How long after opening the work-order dialog its fields take to
/// attach, imitating the render lag of the app this stands in for
const DIALOG_ATTACH_MS: u128 = 250;

const WO_FIELDS: [&str; 6] = [
    "wo-title",
    "wo-requested-by",
    "wo-contact",
    "wo-location",
    "wo-phone",
    "wo-description",
];

fn main() {
    let port: u16 = std::env::args()
        .find_map(|arg| arg.strip_prefix("--port=").map(str::to_string))
        .and_then(|port| port.parse().ok())
        .unwrap_or(0);

    let listener = match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("mock driver: failed to bind 127.0.0.1:{port}: {e}");
            std::process::exit(1);
        }
    };

    match listener.local_addr() {
        Ok(addr) => println!("listening at: {addr}"),
        Err(e) => {
            eprintln!("mock driver: no local address: {e}");
            std::process::exit(1);
        }
    }

    let mut state = MockState::default();

    for stream in listener.incoming() {
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(_) => continue,
        };

        if let Some(request) = read_request(&mut stream) {
            let (status, body) = state.handle(&request.method, &request.path, &request.body);
            respond(&mut stream, status, &body);
        }
    }
}

struct Request {
    method: String,
    path: String,
    body: Value,
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let body = if content_length > 0 {
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).ok()?;
        serde_json::from_slice(&buf).unwrap_or(Value::Null)
    } else {
        Value::Null
    };

    Some(Request { method, path, body })
}

fn respond(stream: &mut TcpStream, status: u16, body: &Value) {
    let payload = body.to_string();
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "OK",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(response.as_bytes()).ok();
    stream.flush().ok();
}

fn ok(value: Value) -> (u16, Value) {
    (200, json!({ "value": value }))
}

fn wire_error(status: u16, error: &str, message: String) -> (u16, Value) {
    (
        status,
        json!({ "value": { "error": error, "message": message, "stacktrace": "" } }),
    )
}

fn invalid_session(session_id: &str) -> (u16, Value) {
    wire_error(
        404,
        "invalid session id",
        format!("session '{session_id}' is not active"),
    )
}

fn stale(element_id: &str) -> (u16, Value) {
    wire_error(
        404,
        "stale element reference",
        format!("element '{element_id}' is not attached to the page"),
    )
}

#[derive(Default)]
struct MockState {
    sessions: HashMap<String, SessionState>,
    next_session: u64,
}

impl MockState {
    fn handle(&mut self, method: &str, path: &str, body: &Value) -> (u16, Value) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match (method, segments.as_slice()) {
            ("GET", ["status"]) => ok(json!({ "ready": true, "message": "mock webdriver ready" })),

            ("POST", ["session"]) => {
                self.next_session += 1;
                let id = format!("mock-session-{}", self.next_session);
                self.sessions.insert(id.clone(), SessionState::new());
                ok(json!({ "sessionId": id, "capabilities": {} }))
            }

            ("DELETE", ["session", session_id]) => {
                if self.sessions.remove(*session_id).is_some() {
                    ok(Value::Null)
                } else {
                    invalid_session(session_id)
                }
            }

            (_, ["session", session_id, rest @ ..]) => match self.sessions.get_mut(*session_id) {
                Some(session) => session.handle(method, rest, body),
                None => invalid_session(session_id),
            },

            _ => wire_error(
                404,
                "unknown command",
                format!("{method} {path} is not part of the mock"),
            ),
        }
    }
}

// === Page model ===

/// What an element id handed to the client refers to
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Target {
    Body,
    LoginForm,
    UsernameInput,
    PasswordInput,
    NewWorkOrder,
    DialogField(&'static str),
    DialogSave,
    Notification,
    NotificationDismiss,
    NameInputWrapper,
    GreetInput,
    GreetButton,
}

struct MockElement {
    target: Target,
    tag: &'static str,
    id: Option<&'static str>,
    slot: Option<&'static str>,
    parent_id: Option<&'static str>,
    shadow: bool,
}

fn light(target: Target, tag: &'static str, id: Option<&'static str>) -> MockElement {
    MockElement {
        target,
        tag,
        id,
        slot: None,
        parent_id: None,
        shadow: false,
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Route {
    Blank,
    Login,
    Dashboard,
    Greeting,
    NotFound,
}

/// CSS subset the simulated pages need: `#id`, `tag`,
/// `tag[attr="value"]`, and one `#id descendant` level
struct Selector {
    ancestor_id: Option<String>,
    id: Option<String>,
    tag: Option<String>,
    attr: Option<(String, String)>,
}

impl Selector {
    fn parse(selector: &str) -> Option<Self> {
        let mut parts = selector.split_whitespace();
        let first = parts.next()?;
        let second = parts.next();
        if parts.next().is_some() {
            return None;
        }

        match second {
            Some(simple) => {
                let ancestor = first.strip_prefix('#')?;
                let mut parsed = Self::parse_simple(simple)?;
                parsed.ancestor_id = Some(ancestor.to_string());
                Some(parsed)
            }
            None => Self::parse_simple(first),
        }
    }

    fn parse_simple(simple: &str) -> Option<Self> {
        if let Some(id) = simple.strip_prefix('#') {
            return Some(Self {
                ancestor_id: None,
                id: Some(id.to_string()),
                tag: None,
                attr: None,
            });
        }

        if let Some(open) = simple.find('[') {
            if !simple.ends_with(']') {
                return None;
            }
            let tag = &simple[..open];
            let inner = &simple[open + 1..simple.len() - 1];
            let (name, value) = inner.split_once('=')?;
            let value = value.trim_matches(|c| c == '"' || c == '\'');
            return Some(Self {
                ancestor_id: None,
                id: None,
                tag: (!tag.is_empty()).then(|| tag.to_string()),
                attr: Some((name.to_string(), value.to_string())),
            });
        }

        Some(Self {
            ancestor_id: None,
            id: None,
            tag: Some(simple.to_string()),
            attr: None,
        })
    }

    fn matches(&self, el: &MockElement) -> bool {
        if let Some(id) = &self.id {
            if el.id != Some(id.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if el.tag != tag.as_str() {
                return false;
            }
        }
        if let Some((name, value)) = &self.attr {
            if name != "slot" || el.slot != Some(value.as_str()) {
                return false;
            }
        }
        if let Some(ancestor) = &self.ancestor_id {
            if el.parent_id != Some(ancestor.as_str()) {
                return false;
            }
        }
        true
    }
}

// === Session simulation ===

struct SessionState {
    url: String,
    logged_in: bool,
    login_error: bool,
    username: String,
    password: String,
    dialog_opened: Option<Instant>,
    work_order: HashMap<String, String>,
    notification: bool,
    greet_input: String,
    greetings: Vec<String>,
    elements: HashMap<u64, Target>,
    next_element: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            url: "about:blank".to_string(),
            logged_in: false,
            login_error: false,
            username: String::new(),
            password: String::new(),
            dialog_opened: None,
            work_order: HashMap::new(),
            notification: false,
            greet_input: String::new(),
            greetings: Vec::new(),
            elements: HashMap::new(),
            next_element: 0,
        }
    }

    fn handle(&mut self, method: &str, rest: &[&str], body: &Value) -> (u16, Value) {
        match (method, rest) {
            ("POST", ["url"]) => self.navigate(body),
            ("GET", ["url"]) => ok(json!(self.url.clone())),
            ("POST", ["elements"]) => self.find_elements(body),
            ("POST", ["element", element_id, "click"]) => self.click(element_id, false),
            ("POST", ["element", element_id, "value"]) => self.send_keys(element_id, body),
            ("GET", ["element", element_id, "text"]) => self.element_text(element_id),
            ("GET", ["element", element_id, "displayed"]) => self.element_displayed(element_id),
            ("POST", ["execute", "sync"]) => self.execute(body),
            _ => wire_error(
                404,
                "unknown command",
                format!("{method} /{} is not part of the mock", rest.join("/")),
            ),
        }
    }

    fn route(&self) -> Route {
        if self.url == "about:blank" {
            return Route::Blank;
        }
        let path = match url::Url::parse(&self.url) {
            Ok(url) => url.path().to_string(),
            Err(_) => return Route::Blank,
        };
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path.as_str()
        };
        match path {
            "" | "/" => Route::Login,
            "/app" => {
                if self.logged_in {
                    Route::Dashboard
                } else {
                    // route guard bounces anonymous visitors to the login view
                    Route::Login
                }
            }
            "/app.deprecated.demo" => Route::Greeting,
            _ => Route::NotFound,
        }
    }

    fn dialog_ready(&self) -> bool {
        self.dialog_opened
            .map(|opened| opened.elapsed().as_millis() >= DIALOG_ATTACH_MS)
            .unwrap_or(false)
    }

    fn page_elements(&self) -> Vec<MockElement> {
        let mut elements = vec![light(Target::Body, "body", None)];

        match self.route() {
            Route::Login => {
                elements.push(light(Target::LoginForm, "div", Some("login-form")));
                elements.push(MockElement {
                    target: Target::UsernameInput,
                    tag: "input",
                    id: None,
                    slot: Some("input"),
                    parent_id: Some("login-form"),
                    shadow: true,
                });
                elements.push(MockElement {
                    target: Target::PasswordInput,
                    tag: "input",
                    id: None,
                    slot: Some("input"),
                    parent_id: Some("login-form"),
                    shadow: true,
                });
            }
            Route::Dashboard => {
                elements.push(light(Target::NewWorkOrder, "button", Some("new-work-order")));
                if self.dialog_ready() {
                    for field in WO_FIELDS {
                        elements.push(light(Target::DialogField(field), "input", Some(field)));
                    }
                    elements.push(light(Target::DialogSave, "button", Some("wo-save")));
                }
                if self.notification {
                    elements.push(light(Target::Notification, "div", Some("notification")));
                    elements.push(MockElement {
                        target: Target::NotificationDismiss,
                        tag: "button",
                        id: Some("notification-dismiss"),
                        slot: None,
                        parent_id: Some("notification"),
                        shadow: false,
                    });
                }
            }
            Route::Greeting => {
                elements.push(light(Target::NameInputWrapper, "div", Some("name-input")));
                elements.push(MockElement {
                    target: Target::GreetInput,
                    tag: "input",
                    id: None,
                    slot: None,
                    parent_id: Some("name-input"),
                    shadow: false,
                });
                elements.push(light(Target::GreetButton, "button", Some("greet-button")));
            }
            Route::Blank | Route::NotFound => {}
        }

        elements
    }

    fn page_text(&self) -> String {
        match self.route() {
            Route::Blank => String::new(),
            Route::Login => {
                let mut text = String::from(
                    "Public Works Portal\nPlease log in to continue.\nUsername\nPassword\nLog in",
                );
                if self.login_error {
                    text.push_str("\nIncorrect username or password");
                }
                text
            }
            Route::Dashboard => {
                let mut text = String::from(
                    "Public Works\ntest (USER)\nLogout\nNavigation\nDashboard\nWork Orders\nAssets\n\
                     Welcome, test\nOpen Work Orders\nTrack and assign field work for today.\n\
                     Assets\nView critical infrastructure: mains, valves, hydrants.\n\
                     Reports\nExport activity and compliance reports.\nNew Work Order",
                );
                if self.dialog_ready() {
                    text.push_str(
                        "\nTitle\nRequested by\nContact\nLocation\nPhone\nDescription\nSave",
                    );
                }
                if self.notification {
                    text.push_str("\nWork order created\nDismiss");
                }
                text
            }
            Route::Greeting => {
                let mut text = String::from(
                    "Public Works\nGreeting Service\nPlease enter a name to greet\nGreet!",
                );
                for greeting in &self.greetings {
                    text.push('\n');
                    text.push_str(greeting);
                }
                text
            }
            Route::NotFound => format!("Could not navigate to '{}'", self.url),
        }
    }

    fn navigate(&mut self, body: &Value) -> (u16, Value) {
        let target = match body.get("url").and_then(Value::as_str) {
            Some(url) => url,
            None => return wire_error(400, "invalid argument", "missing 'url'".to_string()),
        };

        let parsed = match url::Url::parse(target) {
            Ok(url) => url,
            Err(e) => {
                return wire_error(
                    400,
                    "invalid argument",
                    format!("cannot parse '{target}': {e}"),
                )
            }
        };

        // .invalid hosts simulate an unreachable site
        if parsed
            .host_str()
            .map(|host| host.ends_with(".invalid"))
            .unwrap_or(false)
        {
            return wire_error(
                500,
                "unknown error",
                format!("net::ERR_NAME_NOT_RESOLVED ({target})"),
            );
        }

        self.url = parsed.to_string();
        self.leave_page();
        ok(Value::Null)
    }

    /// Per-view state does not survive navigation; the login flag does,
    /// like a session cookie would
    fn leave_page(&mut self) {
        self.elements.clear();
        self.login_error = false;
        self.username.clear();
        self.password.clear();
        self.dialog_opened = None;
        self.work_order.clear();
        self.notification = false;
        self.greet_input.clear();
        self.greetings.clear();
    }

    fn find_elements(&mut self, body: &Value) -> (u16, Value) {
        let selector = match body.get("value").and_then(Value::as_str) {
            Some(selector) => selector,
            None => return wire_error(400, "invalid argument", "missing 'value'".to_string()),
        };
        let refs = self.find(selector, false);
        ok(Value::Array(refs))
    }

    /// Match a selector against the current page, register fresh element
    /// ids for the hits, and return their wire handles in page order
    fn find(&mut self, selector: &str, pierce: bool) -> Vec<Value> {
        let parsed = match Selector::parse(selector) {
            Some(parsed) => parsed,
            None => return Vec::new(),
        };

        let hits: Vec<Target> = self
            .page_elements()
            .iter()
            .filter(|el| (pierce || !el.shadow) && parsed.matches(el))
            .map(|el| el.target)
            .collect();

        hits.into_iter()
            .map(|target| {
                self.next_element += 1;
                let id = self.next_element;
                self.elements.insert(id, target);
                json!({ ELEMENT_KEY: format!("e{id}") })
            })
            .collect()
    }

    /// An element id resolves only while its target is still on the page
    fn resolve(&self, element_id: &str) -> Option<Target> {
        let id: u64 = element_id.strip_prefix('e')?.parse().ok()?;
        let target = *self.elements.get(&id)?;
        if self.page_elements().iter().any(|el| el.target == target) {
            Some(target)
        } else {
            None
        }
    }

    fn click(&mut self, element_id: &str, forced: bool) -> (u16, Value) {
        let target = match self.resolve(element_id) {
            Some(target) => target,
            None => return stale(element_id),
        };

        // The modal work-order dialog swallows pointer events aimed
        // behind it; a forced click is dispatched on the node directly
        let in_dialog = matches!(target, Target::DialogField(_) | Target::DialogSave);
        if !forced && self.dialog_opened.is_some() && !in_dialog {
            return wire_error(
                400,
                "element click intercepted",
                format!("element '{element_id}' is behind the work-order dialog overlay"),
            );
        }

        match target {
            Target::NewWorkOrder => {
                self.dialog_opened = Some(Instant::now());
                self.work_order.clear();
            }
            Target::DialogSave => {
                // The form refuses to save without a title
                let has_title = self
                    .work_order
                    .get("wo-title")
                    .map(|title| !title.is_empty())
                    .unwrap_or(false);
                if has_title {
                    self.dialog_opened = None;
                    self.notification = true;
                }
            }
            Target::NotificationDismiss => self.notification = false,
            Target::GreetButton => self.greet(),
            _ => {}
        }

        ok(Value::Null)
    }

    fn greet(&mut self) {
        let name = if self.greet_input.is_empty() {
            "World"
        } else {
            self.greet_input.as_str()
        };
        self.greetings.push(format!("Hello, {name}"));
        self.greet_input.clear();
    }

    fn send_keys(&mut self, element_id: &str, body: &Value) -> (u16, Value) {
        let target = match self.resolve(element_id) {
            Some(target) => target,
            None => return stale(element_id),
        };
        let text = match body.get("text").and_then(Value::as_str) {
            Some(text) => text,
            None => return wire_error(400, "invalid argument", "missing 'text'".to_string()),
        };

        let submit = text.contains(ENTER_KEY);
        let text: String = text.chars().filter(|c| *c != ENTER_KEY).collect();

        match target {
            Target::UsernameInput => self.username.push_str(&text),
            Target::PasswordInput => self.password.push_str(&text),
            Target::GreetInput => self.greet_input.push_str(&text),
            Target::DialogField(field) => {
                self.work_order
                    .entry(field.to_string())
                    .or_default()
                    .push_str(&text);
            }
            _ => {
                return wire_error(
                    400,
                    "element not interactable",
                    format!("element '{element_id}' cannot receive keys"),
                );
            }
        }

        if submit {
            match target {
                Target::UsernameInput | Target::PasswordInput => self.submit_login(),
                Target::GreetInput => self.greet(),
                _ => {}
            }
        }

        ok(Value::Null)
    }

    fn submit_login(&mut self) {
        if self.username == "test" && self.password == "test" {
            let app_url = url::Url::parse(&self.url)
                .ok()
                .and_then(|url| url.join("/app").ok())
                .map(|url| url.to_string())
                .unwrap_or_else(|| "/app".to_string());
            self.logged_in = true;
            self.url = app_url;
            self.leave_page();
        } else {
            self.login_error = true;
        }
    }

    fn element_text(&self, element_id: &str) -> (u16, Value) {
        let target = match self.resolve(element_id) {
            Some(target) => target,
            None => return stale(element_id),
        };

        let text = match target {
            Target::Body => self.page_text(),
            Target::LoginForm => "Username\nPassword\nLog in".to_string(),
            Target::NewWorkOrder => "New Work Order".to_string(),
            Target::DialogSave => "Save".to_string(),
            Target::Notification => "Work order created".to_string(),
            Target::NotificationDismiss => "Dismiss".to_string(),
            Target::NameInputWrapper => "Please enter a name to greet".to_string(),
            Target::GreetButton => "Greet!".to_string(),
            Target::UsernameInput
            | Target::PasswordInput
            | Target::GreetInput
            | Target::DialogField(_) => String::new(),
        };

        ok(json!(text))
    }

    fn element_displayed(&self, element_id: &str) -> (u16, Value) {
        match self.resolve(element_id) {
            Some(_) => ok(json!(true)),
            None => stale(element_id),
        }
    }

    fn execute(&mut self, body: &Value) -> (u16, Value) {
        let script = body.get("script").and_then(Value::as_str).unwrap_or("");
        let args = body
            .get("args")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // The runner sends exactly two scripts: the shadow-piercing
        // deep query and the forced click
        if script.contains("shadowRoot") {
            let selector = args.first().and_then(Value::as_str).unwrap_or("");
            let refs = self.find(selector, true);
            return ok(Value::Array(refs));
        }

        if script.contains("arguments[0].click()") {
            let element_id = args
                .first()
                .and_then(|arg| arg.get(ELEMENT_KEY))
                .and_then(Value::as_str)
                .unwrap_or("");
            return self.click(element_id, true);
        }

        wire_error(
            500,
            "javascript error",
            "the mock evaluates only the runner's own scripts".to_string(),
        )
    }
}
