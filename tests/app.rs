use ligature::{
	combine, error::ComponentResolutionError, props, template, App, Callback, Command, Component, ComponentClass, Config, Context, Error, Event, MemoryDocument, Reducer, Resolver,
	StaticLoader, Store, Value,
};

fn init_logging() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
}

fn count(state: &Value) -> f64 {
	state.as_object().and_then(|state| state.get("count")).and_then(Value::as_f64).unwrap_or_default()
}

fn counter_store() -> Store {
	let reducer = Reducer::new("counter")
		.on("increment", |state, _| props! { "count" => count(state) + 1.0 })
		.on("set", |_, args| props! { "count" => args.clone() });
	Store::new(combine(vec![reducer]).unwrap(), props! { "count" => 0 })
}

struct Counter;
impl Component for Counter {
	fn render(&self, context: &Context<'_>) -> Value {
		let sink = context.sink().clone();
		template![
			"button",
			props! { "id" => "counter", "onClick" => Callback::new("increment", move |_| sink.dispatch(Command::new("increment"))) },
			context.prop("count").map(Value::stringify).unwrap_or_default(),
		]
	}
}

fn counter_app() -> App<MemoryDocument> {
	init_logging();
	let document = MemoryDocument::new();
	let body = document.body();
	App::new(document, body, ComponentClass::new("Counter", || Counter).into_ref(), counter_store(), Resolver::empty(), Config::default())
}

#[test]
fn clicks_dispatch_commands_that_re_render() {
	let mut app = counter_app();
	pollster::block_on(app.mount()).unwrap();
	let body = app.document().body();
	assert_eq!(app.document().to_html(body), r#"<body><button id="counter">0</button></body>"#);

	let button = app.document().children(body)[0];
	assert_eq!(app.document().dispatch_event(button, &Event::new("click")), 1);
	assert_eq!(app.document().dispatch_event(button, &Event::new("click")), 1);
	assert_eq!(app.sink().len(), 2);

	assert_eq!(pollster::block_on(app.process_pending()).unwrap(), 2);
	assert_eq!(count(app.state()), 2.0);
	assert_eq!(app.document().to_html(body), r#"<body><button id="counter">2</button></body>"#);
	assert_eq!(app.document().children(body), [button], "The button is updated in place.");
	assert_eq!(app.document().registered_listener_count(), 1, "Each re-render swaps the bound handler instead of adding one.");
}

#[test]
fn unknown_and_no_op_commands_do_not_re_render() {
	let mut app = counter_app();
	pollster::block_on(app.mount()).unwrap();
	let root = app.tree().root();

	pollster::block_on(app.dispatch(Command::new("nonexistent"))).unwrap();
	pollster::block_on(app.dispatch(Command::new("set").with_args(0))).unwrap();
	assert_eq!(count(app.state()), 0.0);
	assert_eq!(app.tree().root(), root);

	pollster::block_on(app.dispatch(Command::new("set").with_args(5))).unwrap();
	let body = app.document().body();
	assert_eq!(app.document().to_html(body), r#"<body><button id="counter">5</button></body>"#);
}

#[test]
fn conflicting_reducers_are_rejected() {
	let a = Reducer::new("a").on("reset", |_, _| Value::Null);
	let b = Reducer::new("b").on("reset", |_, _| Value::Null);
	assert_eq!(combine(vec![a, b]).unwrap_err().command, "reset");
}

struct Shell;
impl Component for Shell {
	fn render(&self, context: &Context<'_>) -> Value {
		template![
			"main",
			template![Value::symbol("item"), props! { "label" => context.prop("state").cloned().unwrap_or(Value::Null) }],
		]
	}
}

struct Item;
impl Component for Item {
	fn render(&self, context: &Context<'_>) -> Value {
		template!["span", context.prop("label").map(Value::stringify).unwrap_or_default()]
	}
}

fn shell_app(loader: StaticLoader, preload: bool, shell: ComponentClass) -> App<MemoryDocument> {
	init_logging();
	let document = MemoryDocument::new();
	let body = document.body();
	let store = Store::new(combine(Vec::new()).unwrap(), Value::from("hello"));
	App::new(document, body, shell.into_ref(), store, Resolver::new(loader), Config { preload, ..Config::default() })
}

#[test]
fn components_are_resolved_on_demand() {
	let loader = StaticLoader::new().with("item", ComponentClass::new("Item", || Item).into_ref());
	let mut app = shell_app(loader, false, ComponentClass::new("Shell", || Shell));
	assert!(!app.resolver().is_resolved("item"));

	pollster::block_on(app.mount()).unwrap();
	assert!(app.resolver().is_resolved("item"));
	let body = app.document().body();
	assert_eq!(app.document().to_html(body), "<body><main><span>hello</span></main></body>");
}

#[test]
fn declared_dependencies_are_preloaded() {
	let loader = StaticLoader::new().with("item", ComponentClass::new("Item", || Item).with_init(|| async { Ok(()) }).into_ref());
	let mut app = shell_app(loader, true, ComponentClass::new("Shell", || Shell).depends_on("item"));

	pollster::block_on(app.mount()).unwrap();
	assert!(app.resolver().get("item").unwrap().is_initialized());
	assert!(app.is_mounted());
}

#[test]
fn missing_components_fail_the_render() {
	let mut app = shell_app(StaticLoader::new(), false, ComponentClass::new("Shell", || Shell));
	let error = pollster::block_on(app.mount()).unwrap_err();
	assert!(matches!(error, Error::ComponentResolution(ComponentResolutionError::NotFound(id)) if id == "item"));
	assert!(!app.is_mounted());
	assert!(app.tree().is_empty());
}

struct Announcer;
impl Component for Announcer {
	fn render(&self, _: &Context<'_>) -> Value {
		Value::Null
	}

	fn on_attached(&mut self, context: &Context<'_>) {
		context.dispatch(Command::new("set").with_args(1));
	}
}

#[test]
fn commands_from_lifecycle_hooks_are_processed_after_the_pass() {
	init_logging();
	let document = MemoryDocument::new();
	let body = document.body();
	let mut app = App::new(document, body, ComponentClass::new("Announcer", || Announcer).into_ref(), counter_store(), Resolver::empty(), Config::default());

	pollster::block_on(app.mount()).unwrap();
	assert_eq!(count(app.state()), 1.0);
	assert!(app.sink().is_empty());
	assert_eq!(app.document().to_html(body), "<body><!--Announcer--></body>");
}
