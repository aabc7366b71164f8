#![cfg(target_arch = "wasm32")]

use ligature::{combine, props, template, App, Callback, Command, Component, ComponentClass, Config, Context, Reducer, Resolver, Store, Value, WebDocument};
use std::sync::Once;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

static LOG: Once = Once::new();

struct Toggle;
impl Component for Toggle {
	fn render(&self, context: &Context<'_>) -> Value {
		let on = context.prop("on").map_or(false, Value::is_truthy);
		let sink = context.sink().clone();
		template![
			"button",
			props! {
				"id" => "toggle",
				"class" => if on { "toggle on" } else { "toggle" },
				"dataset" => props! { "clickCount" => if on { 1 } else { 0 } },
				"style" => props! { "color" => if on { "red" } else { "black" } },
				"onClick" => Callback::new("toggle", move |_| sink.dispatch(Command::new("toggle"))),
			},
			if on { "On" } else { "Off" },
		]
	}
}

#[wasm_bindgen_test]
fn click_toggles() {
	LOG.call_once(tracing_wasm::set_as_global_default);

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap();
	let reducer = Reducer::new("toggle").on("toggle", |state, _| props! { "on" => !state.as_object().and_then(|state| state.get("on")).map_or(false, Value::is_truthy) });
	let store = Store::new(combine(vec![reducer]).unwrap(), props! { "on" => false });
	let mut app = App::new(
		WebDocument::new(document.clone()),
		body.into(),
		ComponentClass::new("Toggle", || Toggle).into_ref(),
		store,
		Resolver::empty(),
		Config::default(),
	);
	pollster::block_on(app.mount()).unwrap();

	let button: HtmlElement = document.get_element_by_id("toggle").unwrap().dyn_into().unwrap();
	assert_eq!(button.text_content().as_deref(), Some("Off"));
	assert_eq!(button.class_name(), "toggle");
	assert_eq!(button.get_attribute("data-click-count").as_deref(), Some("0"));
	assert_eq!(app.document().closure_count(), 1);

	button.click();
	assert_eq!(app.sink().len(), 1);
	pollster::block_on(app.process_pending()).unwrap();

	assert_eq!(button.text_content().as_deref(), Some("On"));
	assert_eq!(button.class_name(), "toggle on");
	assert_eq!(button.get_attribute("data-click-count").as_deref(), Some("1"));
	assert_eq!(button.style().get_property_value("color").unwrap(), "red");
	assert_eq!(app.document().closure_count(), 1);

	app.unmount().unwrap();
	assert!(document.get_element_by_id("toggle").is_none());
	assert_eq!(app.document().closure_count(), 0);
}
