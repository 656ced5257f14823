//! Dispatch lifecycle integration tests
//! Run with: cargo test --test dispatch_test

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use amanda_bot::application::messaging::DEFAULT_FALLBACK;
use amanda_bot::infrastructure::config::{DispatchConfig, PatternConfig};
use amanda_bot::plugins::builtin::PatternPlugin;
use amanda_bot::{
    Argument, BotError, Dispatcher, Driver, DriverCapabilities, MatchResult, Plugin, PluginError,
    PluginManager, Request, RequestExtra,
};

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Working(bool),
    Say(String),
}

/// Driver that records every call made to it
struct RecordingDriver {
    capabilities: DriverCapabilities,
    events: RefCell<Vec<Event>>,
    seen_kwargs: RefCell<Vec<Option<serde_json::Value>>>,
    fail_say: bool,
}

impl RecordingDriver {
    fn new() -> Self {
        Self::with_capabilities(DriverCapabilities::ALL)
    }

    fn with_capabilities(capabilities: DriverCapabilities) -> Self {
        Self {
            capabilities,
            events: RefCell::new(Vec::new()),
            seen_kwargs: RefCell::new(Vec::new()),
            fail_say: false,
        }
    }

    fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }
}

impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn capabilities(&self) -> DriverCapabilities {
        self.capabilities
    }

    fn working(&self, active: bool, request: &Request<'_>) -> Result<(), BotError> {
        self.events.borrow_mut().push(Event::Working(active));
        self.seen_kwargs.borrow_mut().push(request.kwarg("chat").cloned());
        Ok(())
    }

    fn say(&self, text: &str, _request: &Request<'_>) -> Result<(), BotError> {
        self.events.borrow_mut().push(Event::Say(text.to_string()));
        if self.fail_say {
            return Err(BotError::Delivery("socket closed".to_string()));
        }
        Ok(())
    }
}

/// Explicit plugin that records the arguments it was run with
struct Command {
    name: &'static str,
    reply: &'static str,
    calls: Mutex<Vec<Argument>>,
}

impl Command {
    fn new(name: &'static str, reply: &'static str) -> Self {
        Self {
            name,
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl Plugin for Command {
    fn name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn run(&self, argument: Argument) -> Result<String, PluginError> {
        self.calls.lock().unwrap().push(argument);
        Ok(self.reply.to_string())
    }
}

/// Implicit plugin matching a substring
struct Keyword {
    keyword: &'static str,
    reply: &'static str,
    runs: Mutex<usize>,
}

impl Keyword {
    fn new(keyword: &'static str, reply: &'static str) -> Self {
        Self {
            keyword,
            reply,
            runs: Mutex::new(0),
        }
    }
}

impl Plugin for Keyword {
    fn supports_implicit(&self) -> bool {
        true
    }

    fn matches(&self, content: &str) -> Result<Option<MatchResult>, PluginError> {
        Ok(content
            .contains(self.keyword)
            .then(|| MatchResult::new(content, self.keyword)))
    }

    fn run(&self, argument: Argument) -> Result<String, PluginError> {
        assert!(!argument.is_explicit());
        *self.runs.lock().unwrap() += 1;
        Ok(self.reply.to_string())
    }
}

/// Explicit plugin reachable through one alias
struct Aliased {
    name: &'static str,
    aliases: Vec<String>,
    reply: &'static str,
}

impl Aliased {
    fn new(name: &'static str, alias: &str, reply: &'static str) -> Self {
        Self {
            name,
            aliases: vec![alias.to_string()],
            reply,
        }
    }
}

impl Plugin for Aliased {
    fn name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn run(&self, _argument: Argument) -> Result<String, PluginError> {
        Ok(self.reply.to_string())
    }
}

/// Implicit plugin that keeps the match result it was run with
struct Capture {
    pattern: regex_lite::Regex,
    seen: Mutex<Vec<MatchResult>>,
}

impl Capture {
    fn new(pattern: &str) -> Self {
        Self {
            pattern: regex_lite::Regex::new(pattern).unwrap(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl Plugin for Capture {
    fn supports_implicit(&self) -> bool {
        true
    }

    fn matches(&self, content: &str) -> Result<Option<MatchResult>, PluginError> {
        Ok(self
            .pattern
            .captures(content)
            .map(|caps| MatchResult::from_captures(content, &self.pattern, &caps)))
    }

    fn run(&self, argument: Argument) -> Result<String, PluginError> {
        let Argument::Implicit(matched) = argument else {
            panic!("implicit run received an explicit argument");
        };
        let reply = format!("saw {}", matched.matched());
        self.seen.lock().unwrap().push(matched);
        Ok(reply)
    }
}

/// Plugin whose name getter panics once armed
struct BadGetters {
    armed: AtomicBool,
}

impl Plugin for BadGetters {
    fn name(&self) -> Option<&str> {
        if self.armed.load(Ordering::SeqCst) {
            panic!("name getter blew up");
        }
        Some("bad")
    }

    fn supports_implicit(&self) -> bool {
        true
    }

    fn run(&self, _argument: Argument) -> Result<String, PluginError> {
        unreachable!()
    }
}

struct Broken;

impl Plugin for Broken {
    fn name(&self) -> Option<&str> {
        Some("broken")
    }

    fn run(&self, _argument: Argument) -> Result<String, PluginError> {
        Err(PluginError::ExecutionFailed("database unreachable".to_string()))
    }
}

struct Panicky;

impl Plugin for Panicky {
    fn supports_implicit(&self) -> bool {
        true
    }

    fn matches(&self, content: &str) -> Result<Option<MatchResult>, PluginError> {
        if content.contains("explode") {
            panic!("predicate blew up");
        }
        Ok(None)
    }

    fn run(&self, _argument: Argument) -> Result<String, PluginError> {
        unreachable!()
    }
}

fn config(allow_explicit: bool, allow_implicit: bool) -> DispatchConfig {
    DispatchConfig {
        allow_explicit,
        allow_implicit,
        huh_messages: None,
    }
}

fn manager_of(plugins: Vec<Arc<dyn Plugin>>) -> PluginManager {
    let mut manager = PluginManager::new();
    for plugin in plugins {
        manager.register_arc(plugin).unwrap();
    }
    manager
}

#[test]
fn test_plain_text_not_accepted_without_implicit() {
    ensure_init();
    let dispatcher = Dispatcher::new(
        &config(true, false),
        manager_of(vec![Arc::new(Command::new("geo", "somewhere"))]),
    );
    let driver = RecordingDriver::new();

    for content in ["hello", "geo 1.2.3.4", " !geo 1.2.3.4", ""] {
        let request = dispatcher.dispatch(content, Some(&driver as &dyn Driver), RequestExtra::new());
        assert!(!request.is_accepted(), "{content:?} should not be accepted");
    }
    assert!(driver.events().is_empty());
}

#[test]
fn test_explicit_invocation_passes_argument() {
    ensure_init();
    let geo = Arc::new(Command::new("geo", "Mountain View (1.2.3.4)"));
    let dispatcher = Dispatcher::new(&config(true, true), manager_of(vec![geo.clone()]));
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("!geo 1.2.3.4", Some(&driver as &dyn Driver), RequestExtra::new());

    assert!(request.is_accepted());
    let calls = geo.calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[Argument::Explicit("1.2.3.4".to_string())]);
    assert!(calls[0].is_explicit());
    assert_eq!(
        driver.events(),
        vec![
            Event::Working(true),
            Event::Say("Mountain View (1.2.3.4)".to_string()),
            Event::Working(false),
        ]
    );
}

#[test]
fn test_explicit_lookup_ignores_case() {
    ensure_init();
    let geo = Arc::new(Command::new("geo", "found"));
    let dispatcher = Dispatcher::new(&config(true, false), manager_of(vec![geo.clone()]));

    let request = dispatcher.dispatch("!GeO example.com", None, RequestExtra::new());
    assert_eq!(request.to_string(), "found");
    assert_eq!(geo.calls.lock().unwrap().len(), 1);
}

#[test]
fn test_alias_routes_to_plugin() {
    ensure_init();
    let echo = Arc::new(Command::new("echo", "first"));
    let dispatcher = Dispatcher::new(
        &config(true, false),
        manager_of(vec![echo.clone(), Arc::new(Aliased::new("repeat", "where", "second"))]),
    );

    assert_eq!(dispatcher.dispatch("!echo hi", None, RequestExtra::new()).to_string(), "first");
    assert_eq!(dispatcher.dispatch("!WHERE x", None, RequestExtra::new()).to_string(), "second");
    assert_eq!(dispatcher.dispatch("!repeat", None, RequestExtra::new()).to_string(), "second");
    assert_eq!(echo.calls.lock().unwrap().len(), 1);
}

#[test]
fn test_implicit_overwrites_explicit() {
    ensure_init();
    let geo = Arc::new(Command::new("geo", "explicit answer"));
    let keyword = Arc::new(Keyword::new("geo", "implicit answer"));
    let dispatcher = Dispatcher::new(&config(true, true), manager_of(vec![geo.clone(), keyword.clone()]));
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("!geo 1.2.3.4", Some(&driver as &dyn Driver), RequestExtra::new());

    assert_eq!(geo.calls.lock().unwrap().len(), 1);
    assert_eq!(*keyword.runs.lock().unwrap(), 1);
    assert_eq!(request.to_string(), "implicit answer");
    // Working is toggled once even though two plugins ran
    assert_eq!(
        driver.events(),
        vec![
            Event::Working(true),
            Event::Say("implicit answer".to_string()),
            Event::Working(false),
        ]
    );
}

#[test]
fn test_implicit_first_match_wins() {
    ensure_init();
    let a = Arc::new(Keyword::new("weather", "from a"));
    let b = Arc::new(Keyword::new("weather", "from b"));
    let dispatcher = Dispatcher::new(&config(true, true), manager_of(vec![a.clone(), b.clone()]));

    let request = dispatcher.dispatch("what's the weather", None, RequestExtra::new());

    assert!(request.is_accepted());
    assert_eq!(request.to_string(), "from a");
    assert_eq!(*a.runs.lock().unwrap(), 1);
    assert_eq!(*b.runs.lock().unwrap(), 0);
}

#[test]
fn test_implicit_disabled_skips_predicates() {
    ensure_init();
    let keyword = Arc::new(Keyword::new("hello", "hi"));
    let dispatcher = Dispatcher::new(&config(false, false), manager_of(vec![keyword.clone()]));
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("hello", Some(&driver as &dyn Driver), RequestExtra::new());
    assert!(!request.is_accepted());
    assert_eq!(*keyword.runs.lock().unwrap(), 0);
    assert!(driver.events().is_empty());
}

#[test]
fn test_explicit_disabled_treats_prefix_as_text() {
    ensure_init();
    let geo = Arc::new(Command::new("geo", "explicit"));
    let dispatcher = Dispatcher::new(&config(false, true), manager_of(vec![geo.clone()]));

    let request = dispatcher.dispatch("!geo 1.2.3.4", None, RequestExtra::new());
    assert!(!request.is_accepted());
    assert!(geo.calls.lock().unwrap().is_empty());
}

#[test]
fn test_no_match_means_no_driver_interaction() {
    ensure_init();
    let dispatcher = Dispatcher::new(
        &config(true, true),
        manager_of(vec![
            Arc::new(Command::new("geo", "x")),
            Arc::new(Keyword::new("weather", "y")),
        ]),
    );
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("just chatting", Some(&driver as &dyn Driver), RequestExtra::new());

    assert!(!request.is_accepted());
    assert_eq!(request.response(), None);
    assert!(driver.events().is_empty());
}

#[test]
fn test_unknown_command_still_accepted_and_falls_back() {
    ensure_init();
    let dispatcher = Dispatcher::new(&config(true, true), PluginManager::new());
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("!nosuch thing", Some(&driver as &dyn Driver), RequestExtra::new());

    assert!(request.is_accepted());
    assert_eq!(
        driver.events(),
        vec![
            Event::Working(true),
            Event::Say(DEFAULT_FALLBACK.to_string()),
            Event::Working(false),
        ]
    );
}

#[test]
fn test_fallback_is_stable_across_coercions() {
    ensure_init();
    let huh: Vec<String> = (0..20).map(|i| format!("huh #{i}")).collect();
    let dispatcher = Dispatcher::new(
        &DispatchConfig {
            allow_explicit: true,
            allow_implicit: true,
            huh_messages: Some(huh),
        },
        PluginManager::new(),
    );
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("!nothing", Some(&driver as &dyn Driver), RequestExtra::new());

    let first = request.to_string();
    let second = request.to_string();
    assert_eq!(first, second);
    // The text delivered to the driver is the same cached choice
    assert!(driver.events().contains(&Event::Say(first)));
}

#[test]
fn test_fallback_drawn_from_huh_messages() {
    ensure_init();
    let dispatcher = Dispatcher::new(
        &DispatchConfig {
            allow_explicit: true,
            allow_implicit: false,
            huh_messages: Some(vec!["a".to_string(), "b".to_string()]),
        },
        PluginManager::new(),
    );

    for _ in 0..50 {
        let request = dispatcher.dispatch("!unknown", None, RequestExtra::new());
        let text = request.to_string();
        assert!(text == "a" || text == "b", "unexpected fallback {text:?}");
    }
}

#[test]
fn test_plugin_error_becomes_response() {
    ensure_init();
    let dispatcher = Dispatcher::new(&config(true, true), manager_of(vec![Arc::new(Broken)]));
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("!broken now", Some(&driver as &dyn Driver), RequestExtra::new());

    let text = request.to_string();
    assert!(!text.is_empty());
    assert!(text.contains("Plugin 'broken' failed while running"));
    assert!(text.contains("database unreachable"));
    assert_eq!(
        driver.events(),
        vec![Event::Working(true), Event::Say(text), Event::Working(false)]
    );
}

#[test]
fn test_failure_stops_resolution() {
    ensure_init();
    let keyword = Arc::new(Keyword::new("broken", "implicit"));
    let dispatcher = Dispatcher::new(
        &config(true, true),
        manager_of(vec![Arc::new(Broken), keyword.clone()]),
    );

    let request = dispatcher.dispatch("!broken", None, RequestExtra::new());

    assert!(request.to_string().contains("database unreachable"));
    assert_eq!(*keyword.runs.lock().unwrap(), 0);
}

#[test]
fn test_panicking_predicate_is_contained() {
    ensure_init();
    let dispatcher = Dispatcher::new(&config(true, true), manager_of(vec![Arc::new(Panicky)]));
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("please explode", Some(&driver as &dyn Driver), RequestExtra::new());

    // The predicate never matched, so nobody accepted the request
    assert!(!request.is_accepted());
    assert!(request
        .response()
        .is_some_and(|r| r.contains("panicked while matching") && r.contains("predicate blew up")));
    assert!(driver.events().is_empty());
}

#[test]
fn test_panicking_getter_is_contained() {
    ensure_init();
    let bad = Arc::new(BadGetters {
        armed: AtomicBool::new(false),
    });
    let dispatcher = Dispatcher::new(
        &config(true, true),
        manager_of(vec![Arc::new(Command::new("geo", "here")), bad.clone()]),
    );
    bad.armed.store(true, Ordering::SeqCst);
    let driver = RecordingDriver::new();

    // geo answers first, then the implicit phase asks plugin #2 for its label
    let request = dispatcher.dispatch("!geo x", Some(&driver as &dyn Driver), RequestExtra::new());
    let text = request.to_string();
    assert!(text.contains("Plugin 'plugin #2' panicked while matching"), "{text}");
    assert!(text.contains("name getter blew up"));
    assert_eq!(
        driver.events(),
        vec![Event::Working(true), Event::Say(text), Event::Working(false)]
    );

    // No earlier plugin answers, so the explicit lookup reaches the bad getter
    let request = dispatcher.dispatch("!other", None, RequestExtra::new());
    assert!(request.is_accepted());
    assert!(request.to_string().contains("Plugin 'other' panicked while looking up"));

    let request = dispatcher.dispatch("just chatting", None, RequestExtra::new());
    assert!(!request.is_accepted());
}

#[test]
fn test_implicit_run_receives_its_own_match() {
    ensure_init();
    let capture = Arc::new(Capture::new(r"name is (\w+)"));
    let dispatcher = Dispatcher::new(&config(true, true), manager_of(vec![capture.clone()]));

    let request = dispatcher.dispatch("hi, my name is Ada!", None, RequestExtra::new());

    assert_eq!(request.to_string(), "saw name is Ada");
    let seen = capture.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].input(), "hi, my name is Ada!");
    assert_eq!(seen[0].matched(), "name is Ada");
    assert_eq!(seen[0].group(1), Some("Ada"));
}

#[test]
fn test_pattern_plugin_greets_by_name() {
    ensure_init();
    let greeter = PatternPlugin::new(&PatternConfig {
        name: None,
        pattern: r"(?i)my name is (?P<who>\w+)".to_string(),
        reply: "Nice to meet you, ${who}!".to_string(),
        description: None,
    })
    .unwrap();
    let mut manager = PluginManager::new();
    manager.register(greeter).unwrap();
    let dispatcher = Dispatcher::new(&config(true, true), manager);
    let driver = RecordingDriver::new();

    let request = dispatcher.dispatch("my name is Ada", Some(&driver as &dyn Driver), RequestExtra::new());

    assert!(request.is_accepted());
    assert_eq!(request.response(), Some("Nice to meet you, Ada!"));
    assert_eq!(
        driver.events(),
        vec![
            Event::Working(true),
            Event::Say("Nice to meet you, Ada!".to_string()),
            Event::Working(false),
        ]
    );
}

#[test]
fn test_missing_driver_is_fine() {
    ensure_init();
    let dispatcher = Dispatcher::new(
        &config(true, true),
        manager_of(vec![Arc::new(Command::new("geo", "here"))]),
    );

    let request = dispatcher.dispatch("!geo 1.2.3.4", None, RequestExtra::new());
    assert!(request.is_accepted());
    assert!(request.driver().is_none());
    assert_eq!(request.to_string(), "here");
}

#[test]
fn test_absent_capabilities_are_skipped() {
    ensure_init();
    let dispatcher = Dispatcher::new(
        &config(true, true),
        manager_of(vec![Arc::new(Command::new("geo", "here"))]),
    );

    let silent = RecordingDriver::with_capabilities(DriverCapabilities::NONE);
    dispatcher.dispatch("!geo 1.2.3.4", Some(&silent as &dyn Driver), RequestExtra::new());
    assert!(silent.events().is_empty());

    let say_only = RecordingDriver::with_capabilities(DriverCapabilities {
        working: false,
        say: true,
    });
    dispatcher.dispatch("!geo 1.2.3.4", Some(&say_only as &dyn Driver), RequestExtra::new());
    assert_eq!(say_only.events(), vec![Event::Say("here".to_string())]);
}

#[test]
fn test_delivery_error_does_not_escape() {
    ensure_init();
    let dispatcher = Dispatcher::new(
        &config(true, true),
        manager_of(vec![Arc::new(Command::new("geo", "here"))]),
    );
    let mut driver = RecordingDriver::new();
    driver.fail_say = true;

    let request = dispatcher.dispatch("!geo x", Some(&driver as &dyn Driver), RequestExtra::new());

    assert_eq!(request.to_string(), "here");
    // working(false) still follows the failed delivery
    assert_eq!(driver.events().last(), Some(&Event::Working(false)));
}

#[test]
fn test_extra_reaches_driver() {
    ensure_init();
    let dispatcher = Dispatcher::new(
        &config(true, true),
        manager_of(vec![Arc::new(Command::new("geo", "here"))]),
    );
    let driver = RecordingDriver::new();
    let extra = RequestExtra::new().with_kwarg("chat", "19:abc@thread.skype");

    let request = dispatcher.dispatch("!geo x", Some(&driver as &dyn Driver), extra);

    assert_eq!(request.kwarg("chat"), Some(&serde_json::Value::from("19:abc@thread.skype")));
    assert_eq!(
        driver.seen_kwargs.borrow().as_slice(),
        &[
            Some(serde_json::Value::from("19:abc@thread.skype")),
            Some(serde_json::Value::from("19:abc@thread.skype")),
        ]
    );
}
