//! Fixed allow-lists used during prop normalization.
//!
//! Props that are not listed here are not forwarded to the document.

/// Listener prop names and the event names they bind to.
pub const LISTENERS: &[(&str, &str)] = &[
	("onAnimationEnd", "animationend"),
	("onAnimationStart", "animationstart"),
	("onBlur", "blur"),
	("onChange", "change"),
	("onClick", "click"),
	("onContextMenu", "contextmenu"),
	("onDoubleClick", "dblclick"),
	("onDrag", "drag"),
	("onDragEnd", "dragend"),
	("onDragEnter", "dragenter"),
	("onDragLeave", "dragleave"),
	("onDragOver", "dragover"),
	("onDragStart", "dragstart"),
	("onDrop", "drop"),
	("onFocus", "focus"),
	("onInput", "input"),
	("onKeyDown", "keydown"),
	("onKeyPress", "keypress"),
	("onKeyUp", "keyup"),
	("onLoad", "load"),
	("onMouseDown", "mousedown"),
	("onMouseEnter", "mouseenter"),
	("onMouseLeave", "mouseleave"),
	("onMouseMove", "mousemove"),
	("onMouseOut", "mouseout"),
	("onMouseOver", "mouseover"),
	("onMouseUp", "mouseup"),
	("onPointerDown", "pointerdown"),
	("onPointerUp", "pointerup"),
	("onScroll", "scroll"),
	("onSubmit", "submit"),
	("onTransitionEnd", "transitionend"),
	("onWheel", "wheel"),
];

pub const ATTRIBUTES: &[&str] = &[
	"accept",
	"accessKey",
	"action",
	"alt",
	"ariaDisabled",
	"ariaExpanded",
	"ariaHidden",
	"ariaLabel",
	"ariaSelected",
	"autocomplete",
	"autofocus",
	"checked",
	"cols",
	"contentEditable",
	"crossOrigin",
	"dir",
	"disabled",
	"download",
	"draggable",
	"for",
	"form",
	"height",
	"hidden",
	"href",
	"id",
	"lang",
	"list",
	"loop",
	"max",
	"maxLength",
	"method",
	"min",
	"minLength",
	"multiple",
	"name",
	"pattern",
	"placeholder",
	"readOnly",
	"rel",
	"required",
	"role",
	"rows",
	"selected",
	"size",
	"spellcheck",
	"src",
	"step",
	"tabIndex",
	"target",
	"title",
	"type",
	"value",
	"viewBox",
	"width",
];

/// Attributes that keep an empty string value instead of being omitted.
pub const EMPTY_ALLOWED_ATTRIBUTES: &[&str] = &["alt", "placeholder", "value"];

pub const STYLE_PROPERTIES: &[&str] = &[
	"alignItems",
	"animation",
	"background",
	"backgroundColor",
	"backgroundImage",
	"border",
	"borderRadius",
	"bottom",
	"boxShadow",
	"color",
	"cursor",
	"display",
	"filter",
	"flex",
	"flexDirection",
	"fontFamily",
	"fontSize",
	"fontWeight",
	"gap",
	"height",
	"justifyContent",
	"left",
	"lineHeight",
	"margin",
	"maxHeight",
	"maxWidth",
	"minHeight",
	"minWidth",
	"opacity",
	"overflow",
	"padding",
	"pointerEvents",
	"position",
	"right",
	"textAlign",
	"top",
	"transform",
	"transition",
	"visibility",
	"width",
	"zIndex",
];

pub const FILTER_FUNCTIONS: &[&str] = &[
	"blur",
	"brightness",
	"contrast",
	"dropShadow",
	"grayscale",
	"hueRotate",
	"invert",
	"opacity",
	"sepia",
	"saturate",
];

pub const TRANSFORM_FUNCTIONS: &[&str] = &[
	"matrix",
	"matrix3d",
	"perspective",
	"rotate",
	"rotate3d",
	"rotateX",
	"rotateY",
	"rotateZ",
	"scale",
	"scale3d",
	"scaleX",
	"scaleY",
	"scaleZ",
	"skew",
	"skewX",
	"skewY",
	"translate",
	"translate3d",
	"translateX",
	"translateY",
	"translateZ",
];

#[must_use]
pub fn listener_event(prop: &str) -> Option<&'static str> {
	LISTENERS.iter().find(|(name, _)| *name == prop).map(|(_, event)| *event)
}

#[must_use]
pub fn listener_prop(event: &str) -> Option<&'static str> {
	LISTENERS.iter().find(|(_, name)| *name == event).map(|(prop, _)| *prop)
}

#[must_use]
pub fn is_attribute(name: &str) -> bool {
	ATTRIBUTES.contains(&name)
}

#[must_use]
pub fn allows_empty_attribute(name: &str) -> bool {
	EMPTY_ALLOWED_ATTRIBUTES.contains(&name)
}

#[must_use]
pub fn is_style_property(name: &str) -> bool {
	STYLE_PROPERTIES.contains(&name)
}

/// `camelCase` to `dash-case`, as CSS and `data-*` attribute names are written.
#[must_use]
pub fn dash_case(name: &str) -> String {
	let mut dashed = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			dashed.push('-');
			dashed.push(c.to_ascii_lowercase());
		} else {
			dashed.push(c);
		}
	}
	dashed
}
