//! Widget catalog and the capability collections derived from it.
//!
//! A widget pairs a callable tool with a readable, renderable resource. The
//! catalog is built once at startup; the `by_id`/`by_uri` indices and the
//! tool/resource descriptor collections are derived from the widget list and
//! never mutated independently.

pub mod loader;

use crate::error::{Result, WidgetError, WidgetResult};
use crate::protocol::{Resource, ResourceTemplate, Tool, ToolAnnotations};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Media type marking widget markup resources.
pub const WIDGET_MIME_TYPE: &str = "text/html+skybridge";

/// The single argument every widget tool accepts.
pub const TOOL_ARGUMENT: &str = "pizzaTopping";

/// Declarative widget definition; `component` names the HTML asset.
#[derive(Debug, Clone, Copy)]
pub struct WidgetDef {
    pub id: &'static str,
    pub title: &'static str,
    pub template_uri: &'static str,
    pub invoking: &'static str,
    pub invoked: &'static str,
    pub component: &'static str,
    pub response_text: &'static str,
}

/// Built-in widget definitions.
pub const BUILTIN_WIDGETS: &[WidgetDef] = &[WidgetDef {
    id: "pizza-list",
    title: "Show Pizza List",
    template_uri: "ui://widget/pizza-list.html",
    invoking: "Hand-tossing a list",
    invoked: "Served a fresh list",
    component: "pizza-list",
    response_text: "Rendered a pizza list!",
}];

/// One invocable capability: a tool plus its renderable resource.
#[derive(Debug, Clone)]
pub struct Widget {
    pub id: String,
    pub title: String,
    pub template_uri: String,
    pub invoking: String,
    pub invoked: String,
    pub html: String,
    pub response_text: String,
}

/// Immutable widget catalog with one-to-one lookup indices.
pub struct WidgetCatalog {
    widgets: Vec<Arc<Widget>>,
    by_id: HashMap<String, Arc<Widget>>,
    by_uri: HashMap<String, Arc<Widget>>,
}

impl WidgetCatalog {
    /// Load the built-in catalog, resolving each widget's markup from the
    /// asset directory. Any missing asset aborts startup.
    pub fn load(assets_dir: &Path) -> Result<Self> {
        let mut widgets = Vec::with_capacity(BUILTIN_WIDGETS.len());

        for def in BUILTIN_WIDGETS {
            let html = loader::read_widget_html(assets_dir, def.component)?;
            widgets.push(Widget {
                id: def.id.into(),
                title: def.title.into(),
                template_uri: def.template_uri.into(),
                invoking: def.invoking.into(),
                invoked: def.invoked.into(),
                html,
                response_text: def.response_text.into(),
            });
        }

        Ok(Self::from_widgets(widgets)?)
    }

    /// Build a catalog from fully-resolved widgets, constructing both
    /// indices in one pass. Duplicate ids or template URIs are rejected.
    pub fn from_widgets(widgets: Vec<Widget>) -> WidgetResult<Self> {
        let widgets: Vec<Arc<Widget>> = widgets.into_iter().map(Arc::new).collect();
        let mut by_id = HashMap::with_capacity(widgets.len());
        let mut by_uri = HashMap::with_capacity(widgets.len());

        for widget in &widgets {
            if by_id
                .insert(widget.id.clone(), Arc::clone(widget))
                .is_some()
            {
                return Err(WidgetError::DuplicateId(widget.id.clone()));
            }
            if by_uri
                .insert(widget.template_uri.clone(), Arc::clone(widget))
                .is_some()
            {
                return Err(WidgetError::DuplicateUri(widget.template_uri.clone()));
            }
        }

        debug!("Widget catalog built with {} widgets", widgets.len());
        Ok(Self {
            widgets,
            by_id,
            by_uri,
        })
    }

    pub fn widgets(&self) -> &[Arc<Widget>] {
        &self.widgets
    }

    pub fn by_id(&self, id: &str) -> Option<&Arc<Widget>> {
        self.by_id.get(id)
    }

    pub fn by_uri(&self, uri: &str) -> Option<&Arc<Widget>> {
        self.by_uri.get(uri)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Tool descriptors, one per widget, in catalog order.
    pub fn tools(&self) -> Vec<Tool> {
        self.widgets
            .iter()
            .map(|widget| Tool {
                name: widget.id.clone(),
                description: Some(widget.title.clone()),
                input_schema: tool_input_schema(),
                title: Some(widget.title.clone()),
                meta: Some(widget_meta(widget)),
                // Hints that suppress client-side approval prompts.
                annotations: Some(ToolAnnotations {
                    destructive_hint: Some(false),
                    open_world_hint: Some(false),
                    read_only_hint: Some(true),
                }),
            })
            .collect()
    }

    /// Resource descriptors, one per widget, in catalog order.
    pub fn resources(&self) -> Vec<Resource> {
        self.widgets
            .iter()
            .map(|widget| Resource {
                uri: widget.template_uri.clone(),
                name: widget.title.clone(),
                description: Some(format!("{} widget markup", widget.title)),
                mime_type: Some(WIDGET_MIME_TYPE.into()),
                meta: Some(widget_meta(widget)),
            })
            .collect()
    }

    /// Resource template descriptors, structurally identical to the resource
    /// descriptors. The catalog offers no parametric templates, so the
    /// templates request kind serves an empty list; this collection exists
    /// so the derivation invariant stays checkable.
    pub fn resource_templates(&self) -> Vec<ResourceTemplate> {
        self.widgets
            .iter()
            .map(|widget| ResourceTemplate {
                uri_template: widget.template_uri.clone(),
                name: widget.title.clone(),
                description: Some(format!("{} widget markup", widget.title)),
                mime_type: Some(WIDGET_MIME_TYPE.into()),
                meta: Some(widget_meta(widget)),
            })
            .collect()
    }
}

/// Capability metadata attached to every tool/resource response so a caller
/// can render or narrate the widget.
pub fn widget_meta(widget: &Widget) -> Value {
    json!({
        "openai/outputTemplate": widget.template_uri,
        "openai/toolInvocation/invoking": widget.invoking,
        "openai/toolInvocation/invoked": widget.invoked,
        "openai/widgetAccessible": true,
        "openai/resultCanProduceWidget": true,
    })
}

/// Fixed input schema shared by every widget tool: exactly one required
/// string field, no additional fields.
pub fn tool_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "pizzaTopping": {
                "type": "string",
                "description": "Topping to mention when rendering the widget.",
            },
        },
        "required": ["pizzaTopping"],
        "additionalProperties": false,
    })
}

/// Validate tool-call arguments against the fixed schema, returning the
/// topping string. Runs before any widget logic.
pub fn parse_tool_arguments(arguments: &Value) -> WidgetResult<String> {
    let object = arguments
        .as_object()
        .ok_or_else(|| WidgetError::InvalidArguments("arguments must be an object".into()))?;

    for key in object.keys() {
        if key != TOOL_ARGUMENT {
            return Err(WidgetError::InvalidArguments(format!(
                "unexpected field \"{key}\""
            )));
        }
    }

    let topping = object
        .get(TOOL_ARGUMENT)
        .ok_or_else(|| {
            WidgetError::InvalidArguments(format!("missing required field \"{TOOL_ARGUMENT}\""))
        })?
        .as_str()
        .ok_or_else(|| {
            WidgetError::InvalidArguments(format!("\"{TOOL_ARGUMENT}\" must be a string"))
        })?;

    Ok(topping.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn test_widget(id: &str, uri: &str) -> Widget {
        Widget {
            id: id.into(),
            title: format!("Show {id}"),
            template_uri: uri.into(),
            invoking: "Hand-tossing a list".into(),
            invoked: "Served a fresh list".into(),
            html: "<div id=\"pizzaz-root\"></div>".into(),
            response_text: "Rendered a pizza list!".into(),
        }
    }

    #[test]
    fn test_index_consistency() {
        let catalog = WidgetCatalog::from_widgets(vec![
            test_widget("pizza-list", "ui://widget/pizza-list.html"),
            test_widget("pizza-map", "ui://widget/pizza-map.html"),
        ])
        .unwrap();

        // Both indices contain exactly the catalog's widgets.
        assert_eq!(catalog.len(), 2);
        for widget in catalog.widgets() {
            assert!(Arc::ptr_eq(catalog.by_id(&widget.id).unwrap(), widget));
            assert!(Arc::ptr_eq(
                catalog.by_uri(&widget.template_uri).unwrap(),
                widget
            ));
        }
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = WidgetCatalog::from_widgets(vec![
            test_widget("pizza-list", "ui://widget/a.html"),
            test_widget("pizza-list", "ui://widget/b.html"),
        ]);
        assert!(matches!(result, Err(WidgetError::DuplicateId(_))));

        let result = WidgetCatalog::from_widgets(vec![
            test_widget("a", "ui://widget/pizza-list.html"),
            test_widget("b", "ui://widget/pizza-list.html"),
        ]);
        assert!(matches!(result, Err(WidgetError::DuplicateUri(_))));
    }

    #[test]
    fn test_derived_collections_preserve_order() {
        let catalog = WidgetCatalog::from_widgets(vec![
            test_widget("pizza-list", "ui://widget/pizza-list.html"),
            test_widget("pizza-map", "ui://widget/pizza-map.html"),
        ])
        .unwrap();

        let tools = catalog.tools();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "pizza-list");
        assert_eq!(tools[1].name, "pizza-map");
        assert_eq!(tools[0].annotations.as_ref().unwrap().read_only_hint, Some(true));

        let resources = catalog.resources();
        assert_eq!(resources[0].uri, "ui://widget/pizza-list.html");
        assert_eq!(resources[0].mime_type.as_deref(), Some(WIDGET_MIME_TYPE));

        let templates = catalog.resource_templates();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[1].uri_template, "ui://widget/pizza-map.html");
    }

    #[test]
    fn test_widget_meta_references_own_widget() {
        let catalog = WidgetCatalog::from_widgets(vec![
            test_widget("pizza-list", "ui://widget/pizza-list.html"),
            test_widget("pizza-map", "ui://widget/pizza-map.html"),
        ])
        .unwrap();

        for widget in catalog.widgets() {
            let meta = widget_meta(widget);
            assert_eq!(meta["openai/outputTemplate"], widget.template_uri);
            assert_eq!(meta["openai/toolInvocation/invoking"], widget.invoking);
            assert_eq!(meta["openai/widgetAccessible"], true);
        }
    }

    #[test]
    fn test_parse_tool_arguments() {
        let topping = parse_tool_arguments(&json!({"pizzaTopping": "mushroom"})).unwrap();
        assert_eq!(topping, "mushroom");

        assert!(parse_tool_arguments(&json!({})).is_err());
        assert!(parse_tool_arguments(&json!("mushroom")).is_err());
        assert!(parse_tool_arguments(&json!({"pizzaTopping": 3})).is_err());
        assert!(
            parse_tool_arguments(&json!({"pizzaTopping": "mushroom", "extra": true})).is_err()
        );
    }

    #[test]
    fn test_load_from_assets_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pizza-list.html"), "<div>pizza</div>").unwrap();

        let catalog = WidgetCatalog::load(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.by_id("pizza-list").unwrap().html, "<div>pizza</div>");
    }

    #[test]
    fn test_load_fails_fast_on_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WidgetCatalog::load(dir.path()).is_err());
    }
}
