use ligature::{
	calculate, describe, lifecycle, node::ParentElement, props, template, Callback, Command, CommandSink, Component, ComponentClass, ComponentRef, Context, Description,
	Error, Event, Key, MemoryDocument, MemoryHandle, NodeId, Patch, RootContext, Tree, Value,
};
use std::{cell::RefCell, rc::Rc};

/// Renders its `template` prop.
struct Echo;
impl Component for Echo {
	fn render(&self, context: &Context<'_>) -> Value {
		context.prop("template").cloned().unwrap_or(Value::Null)
	}
}

struct Harness {
	tree: Tree<MemoryDocument>,
	echo: ComponentRef,
	body: MemoryHandle,
	sink: CommandSink,
}
impl Harness {
	fn new() -> Self {
		let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
		let document = MemoryDocument::new();
		let body = document.body();
		Self {
			tree: Tree::new(document),
			echo: ComponentClass::new("Echo", || Echo).into_ref(),
			body,
			sink: CommandSink::new(),
		}
	}

	fn description(&self, template: Value) -> Description {
		describe(&template![self.echo.clone(), props! { "template" => template }]).unwrap().unwrap()
	}

	fn diff(&mut self, template: Value) -> Result<Vec<Patch>, Error> {
		let description = self.description(template);
		let context = RootContext {
			container: self.body,
			sink: self.sink.clone(),
			resolver: None,
			depth_limit: 32,
		};
		let root = self.tree.root();
		calculate(&mut self.tree, root, Some(&description), &context)
	}

	fn apply(&mut self, patches: &[Patch]) {
		lifecycle::before_update(&mut self.tree, patches).unwrap();
		for patch in patches {
			patch.apply(&mut self.tree).unwrap();
		}
		lifecycle::after_update(&mut self.tree, patches).unwrap();
	}

	/// Diffs and applies, returning the patch names.
	fn render(&mut self, template: Value) -> Vec<&'static str> {
		let patches = self.diff(template).unwrap();
		self.apply(&patches);
		patches.iter().map(Patch::name).collect()
	}

	fn root(&self) -> NodeId {
		self.tree.root().unwrap()
	}

	fn element(&self) -> NodeId {
		self.tree.child_element(self.root()).unwrap()
	}

	fn handle(&self, element: NodeId) -> MemoryHandle {
		self.tree.element(element).unwrap().handle.unwrap()
	}

	fn html(&self) -> String {
		self.tree.document().to_html(self.body)
	}
}

#[test]
fn first_render_creates_the_root() {
	let mut harness = Harness::new();
	assert_eq!(harness.render(template!["div", props! { "id" => "main", "class" => "a b" }, "Hello"]), ["CREATE_ROOT_COMPONENT"]);
	assert_eq!(harness.html(), r#"<body><div id="main" class="a b">Hello</div></body>"#);
}

#[test]
fn identical_render_only_re_renders() {
	let mut harness = Harness::new();
	let template = template!["div", props! { "id" => "main" }, template!["span", "a"]];
	harness.render(template.clone());
	assert!(harness.render(template).is_empty());
}

#[test]
fn attribute_maps_are_diffed_per_key() {
	let mut harness = Harness::new();
	harness.render(template!["input", props! { "id" => "a", "title" => "t", "class" => "x y", "style" => props! { "width" => "1px" } }]);
	let names = harness.render(template!["input", props! { "id" => "b", "value" => "", "class" => "y z", "style" => props! { "color" => "red" } }]);

	assert!(names.contains(&"UPDATE_COMPONENT"));
	for expected in ["REPLACE_ATTRIBUTE", "ADD_ATTRIBUTE", "REMOVE_ATTRIBUTE", "ADD_CLASS_NAME", "REMOVE_CLASS_NAME", "ADD_STYLE_PROPERTY", "REMOVE_STYLE_PROPERTY"] {
		assert!(names.contains(&expected), "{} missing from {:?}", expected, names);
	}

	let element = harness.element();
	let handle = harness.handle(element);
	let document = harness.tree.document();
	assert_eq!(document.attribute(handle, "id"), Some("b"));
	assert_eq!(document.attribute(handle, "value"), Some(""));
	assert_eq!(document.attribute(handle, "title"), None);
	assert_eq!(document.class_names(handle), ["y", "z"]);
	assert_eq!(document.style_property(handle, "color"), Some("red"));
	assert_eq!(document.style_property(handle, "width"), None);
	assert_eq!(harness.tree.element(element).unwrap().class_names, ["y", "z"]);
}

#[test]
fn add_then_replace_attribute_leaves_only_the_latest_value() {
	let mut harness = Harness::new();
	harness.render(template!["div"]);
	let element = harness.element();

	Patch::AddAttribute { element, name: "name".to_string(), value: "value".to_string() }.apply(&mut harness.tree).unwrap();
	Patch::ReplaceAttribute { element, name: "name".to_string(), value: "value2".to_string() }.apply(&mut harness.tree).unwrap();

	assert_eq!(harness.tree.element(element).unwrap().attrs["name"], "value2");
	let handle = harness.handle(element);
	assert_eq!(harness.tree.document().attribute(handle, "name"), Some("value2"));
	assert_eq!(harness.tree.document().attribute_count(handle), 1);
}

#[test]
fn placeholder_stands_in_for_missing_children() {
	let mut harness = Harness::new();
	harness.render(Value::Null);
	let root = harness.root();
	let component = harness.tree.component(root).unwrap();
	assert!(component.child.is_none());
	let comment = component.comment.unwrap();
	assert!(harness.tree.node(comment).unwrap().as_comment().unwrap().text.contains("Echo"));
	assert_eq!(harness.html(), "<body><!--Echo--></body>");

	assert_eq!(harness.render(template!["p"]), ["UPDATE_COMPONENT", "ADD_ELEMENT"]);
	let component = harness.tree.component(root).unwrap();
	assert!(component.child.is_some() && component.comment.is_none());
	assert!(!harness.tree.is_alive(comment));
	assert_eq!(harness.html(), "<body><p></p></body>");

	assert_eq!(harness.render(Value::Null), ["UPDATE_COMPONENT", "REMOVE_ELEMENT"]);
	let component = harness.tree.component(root).unwrap();
	assert!(component.child.is_none());
	let comment = component.comment.unwrap();
	assert!(harness.tree.node(comment).unwrap().as_comment().unwrap().text.contains("Echo"));
	assert_eq!(harness.html(), "<body><!--Echo--></body>");
	assert_eq!(harness.tree.len(), 2, "The removed element is released.");
}

#[test]
fn incompatible_children_are_replaced() {
	let mut harness = Harness::new();
	harness.render(template!["div", template!["span"], template!["b"]]);
	let names = harness.render(template!["div", template!["span"], template!["i"]]);
	assert_eq!(names, ["UPDATE_COMPONENT", "REMOVE_CHILD_NODE", "INSERT_CHILD_NODE"]);
	assert_eq!(harness.html(), "<body><div><span></span><i></i></div></body>");

	let names = harness.render(template!["section"]);
	assert_eq!(names, ["UPDATE_COMPONENT", "REMOVE_ELEMENT", "ADD_ELEMENT"]);
	assert_eq!(harness.html(), "<body><section></section></body>");
}

#[test]
fn element_lookups_skip_components() {
	let mut harness = Harness::new();
	let echo = harness.echo.clone();
	harness.render(template!["div", template![echo, props! { "template" => template!["span"] }]]);

	let div = harness.element();
	let inner = harness.tree.element(div).unwrap().children[0];
	assert!(harness.tree.node(inner).unwrap().is_component());

	let span = harness.tree.child_element(inner).unwrap();
	assert_eq!(harness.tree.element(span).unwrap().name, "span");
	assert_eq!(harness.tree.parent_element(span), Some(ParentElement::Element(div)));
	assert_eq!(harness.tree.parent_element(div), Some(ParentElement::Container(harness.root())));
	assert_eq!(harness.html(), "<body><div><span></span></div></body>");
}

#[test]
fn positional_children_grow_and_shrink() {
	let mut harness = Harness::new();
	harness.render(template!["ul", template!["li", "1"]]);
	harness.render(template!["ul", template!["li", "1"], template!["li", "2"], template!["li", "3"]]);
	assert_eq!(harness.html(), "<body><ul><li>1</li><li>2</li><li>3</li></ul></body>");

	let names = harness.render(template!["ul", template!["li", "one"]]);
	assert_eq!(names, ["UPDATE_COMPONENT", "SET_TEXT_CONTENT", "REMOVE_CHILD_NODE", "REMOVE_CHILD_NODE"]);
	assert_eq!(harness.html(), "<body><ul><li>one</li></ul></body>");
}

fn list(keys: &[&str]) -> Value {
	let mut template = vec![Value::from("ul")];
	template.extend(keys.iter().map(|key| template!["li", props! { "key" => *key }, *key]));
	Value::Array(template)
}

#[test]
fn keyed_reordering_moves_existing_nodes() {
	let mut harness = Harness::new();
	harness.render(list(&["A", "B", "C", "D"]));
	let ul = harness.element();
	let before = harness.tree.element(ul).unwrap().children.clone();

	let names = harness.render(list(&["B", "C", "D", "A"]));
	assert_eq!(names, ["UPDATE_COMPONENT", "MOVE_CHILD_NODE"]);
	assert_eq!(harness.html(), "<body><ul><li>B</li><li>C</li><li>D</li><li>A</li></ul></body>");

	let after = harness.tree.element(ul).unwrap().children.clone();
	assert_eq!(after, [before[1], before[2], before[3], before[0]]);
}

#[test]
fn keyed_children_insert_and_remove() {
	let mut harness = Harness::new();
	harness.render(list(&["A", "B", "C", "D"]));
	let ul = harness.element();
	let before = harness.tree.element(ul).unwrap().children.clone();

	assert_eq!(harness.render(list(&["0", "A", "B", "C", "D"])), ["UPDATE_COMPONENT", "INSERT_CHILD_NODE"]);
	assert_eq!(harness.tree.element(ul).unwrap().children[1..], before[..]);

	let names = harness.render(list(&["D", "X", "B"]));
	assert!(names.iter().all(|name| ["UPDATE_COMPONENT", "REMOVE_CHILD_NODE", "INSERT_CHILD_NODE", "MOVE_CHILD_NODE"].contains(name)));
	assert_eq!(harness.html(), "<body><ul><li>D</li><li>X</li><li>B</li></ul></body>");
	assert!(!harness.tree.is_alive(before[0]));
	assert!(harness.tree.is_alive(before[1]) && harness.tree.is_alive(before[3]));
}

#[test]
fn duplicate_keys_fall_back_to_positional_diffing() {
	let mut harness = Harness::new();
	harness.render(list(&["A", "B"]));
	let names = harness.render(list(&["A", "A", "B"]));
	assert_eq!(names, ["UPDATE_COMPONENT", "SET_KEY", "SET_TEXT_CONTENT", "INSERT_CHILD_NODE"]);
	assert_eq!(harness.html(), "<body><ul><li>A</li><li>A</li><li>B</li></ul></body>");
	assert_eq!(keys(&harness), [Some(Key::Text("A".to_string())), Some(Key::Text("A".to_string())), Some(Key::Text("B".to_string()))]);
}

fn keys(harness: &Harness) -> Vec<Option<Key>> {
	let ul = harness.element();
	harness.tree.element(ul).unwrap().children.iter().map(|id| harness.tree.node(*id).unwrap().key().cloned()).collect()
}

#[test]
fn positional_diffs_rekey_reused_children() {
	let mut harness = Harness::new();
	harness.render(list(&["A", "B"]));
	let ul = harness.element();
	let before = harness.tree.element(ul).unwrap().children.clone();

	let mut partially_keyed = list(&["B", "A"]);
	if let Value::Array(items) = &mut partially_keyed {
		items.push(template!["li", "unkeyed"]);
	}
	assert_eq!(harness.render(partially_keyed).iter().filter(|name| **name == "SET_KEY").count(), 2);
	assert_eq!(keys(&harness), [Some(Key::Text("B".to_string())), Some(Key::Text("A".to_string())), None]);

	harness.render(list(&["B", "A"]));
	assert_eq!(harness.render(list(&["A", "B"])), ["UPDATE_COMPONENT", "MOVE_CHILD_NODE"]);
	assert_eq!(harness.tree.element(ul).unwrap().children, [before[1], before[0]]);
	assert_eq!(harness.html(), "<body><ul><li>A</li><li>B</li></ul></body>");
}

#[test]
fn text_and_children_swap() {
	let mut harness = Harness::new();
	harness.render(template!["p", "text"]);
	assert_eq!(harness.render(template!["p", template!["b"]]), ["UPDATE_COMPONENT", "SET_TEXT_CONTENT", "INSERT_CHILD_NODE"]);
	assert_eq!(harness.html(), "<body><p><b></b></p></body>");

	assert_eq!(harness.render(template!["p", "again"]), ["UPDATE_COMPONENT", "REMOVE_CHILD_NODE", "SET_TEXT_CONTENT"]);
	assert_eq!(harness.html(), "<body><p>again</p></body>");
}

#[test]
fn listeners_and_metadata_reach_the_document() {
	let mut harness = Harness::new();
	let sink = harness.sink.clone();
	let click = Callback::new("click", move |_| sink.dispatch(Command::new("clicked")));
	harness.render(template!["video", props! { "onClick" => click, "metadata" => props! { "muted" => true } }]);

	let video = harness.element();
	let handle = harness.handle(video);
	assert_eq!(harness.tree.document().property(handle, "muted"), Some(&Value::Bool(true)));
	assert_eq!(harness.tree.document().dispatch_event(handle, &Event::new("click")), 1);
	assert_eq!(harness.sink.pop(), Some(Command::new("clicked")));

	let names = harness.render(template!["video"]);
	assert_eq!(names, ["UPDATE_COMPONENT", "REMOVE_LISTENER", "REMOVE_METADATA"]);
	assert_eq!(harness.tree.document().listener_count(handle, "click"), 0);
	assert_eq!(harness.tree.document().registered_listener_count(), 0);
	assert_eq!(harness.tree.document().property(handle, "muted"), None);
}

#[test]
fn rerendered_named_listeners_call_the_latest_handler() {
	let mut harness = Harness::new();
	let selected = Rc::new(RefCell::new(Vec::new()));
	let button = |i: i32| {
		let selected = Rc::clone(&selected);
		template!["button", props! { "onClick" => Callback::new("select", move |_| selected.borrow_mut().push(i)) }]
	};

	harness.render(button(0));
	assert_eq!(harness.render(button(1)), ["REPLACE_LISTENER"]);
	assert_eq!(harness.render(button(2)), ["REPLACE_LISTENER"]);

	let handle = harness.handle(harness.element());
	let document = harness.tree.document();
	assert_eq!(document.dispatch_event(handle, &Event::new("click")), 1);
	assert_eq!(*selected.borrow(), [2]);
	assert_eq!(document.listener_count(handle, "click"), 1);
	assert_eq!(document.registered_listener_count(), 1);
}

#[test]
fn data_attributes_style_and_metadata_are_replaced_in_place() {
	let mut harness = Harness::new();
	harness.render(template!["div", props! { "dataset" => props! { "a" => "1", "b" => "2" }, "style" => props! { "color" => "red" }, "metadata" => props! { "volume" => 1 } }]);
	let names = harness.render(template!["div", props! { "dataset" => props! { "a" => "3", "c" => "4" }, "style" => props! { "color" => "blue" }, "metadata" => props! { "volume" => 2 } }]);
	assert_eq!(
		names,
		["UPDATE_COMPONENT", "REMOVE_DATA_ATTRIBUTE", "REPLACE_DATA_ATTRIBUTE", "ADD_DATA_ATTRIBUTE", "REPLACE_STYLE_PROPERTY", "REPLACE_METADATA"]
	);

	let handle = harness.handle(harness.element());
	let document = harness.tree.document();
	assert_eq!(document.data_attribute(handle, "a"), Some("3"));
	assert_eq!(document.data_attribute(handle, "b"), None);
	assert_eq!(document.data_attribute(handle, "c"), Some("4"));
	assert_eq!(document.style_property(handle, "color"), Some("blue"));
	assert_eq!(document.property(handle, "volume"), Some(&Value::from(2)));
	assert_eq!(harness.html(), r#"<body><div data-a="3" data-c="4" style="color: blue;"></div></body>"#);
}

#[test]
fn removing_a_subtree_unbinds_its_listeners() {
	let mut harness = Harness::new();
	harness.render(template!["div", template!["button", props! { "onClick" => Callback::anonymous(|_| ()) }]]);
	assert_eq!(harness.tree.document().registered_listener_count(), 1);

	harness.render(template!["div"]);
	assert_eq!(harness.tree.document().registered_listener_count(), 0);
	assert_eq!(harness.tree.len(), 2);
}

#[test]
fn element_roots_are_rejected() {
	let mut harness = Harness::new();
	let description = describe(&template!["div"]).unwrap().unwrap();
	let context = RootContext {
		container: harness.body,
		sink: CommandSink::new(),
		resolver: None,
		depth_limit: 8,
	};
	assert!(matches!(calculate(&mut harness.tree, None, Some(&description), &context), Err(Error::InvalidRoot)));
}

#[test]
fn invalid_templates_release_partial_trees() {
	let mut harness = Harness::new();
	let error = harness.diff(template!["div", template!["span"], 5]).unwrap_err();
	assert!(matches!(error, Error::InvalidTemplate(_)));
	assert!(harness.tree.is_empty());
	assert_eq!(harness.html(), "<body></body>");
}

struct Forever;
impl Component for Forever {
	fn render(&self, context: &Context<'_>) -> Value {
		match context.prop("this") {
			Some(Value::Component(this)) => template![this, props! { "this" => this }],
			_ => Value::Null,
		}
	}
}

#[test]
fn runaway_recursion_hits_the_depth_limit() {
	let mut harness = Harness::new();
	let forever = ComponentClass::new("Forever", || Forever).into_ref();
	let error = harness.diff(template![forever.clone(), props! { "this" => forever }]).unwrap_err();
	assert!(matches!(error, Error::DepthLimit(32)));
	assert!(harness.tree.is_empty());
}
