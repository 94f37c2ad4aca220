//! Variable scopes for expression evaluation
//!
//! An [`ExpressionContext`] is a set of local bindings with an optional parent.
//! Lookups walk the parent chain; children never write into their parents.
//! Bindings are stored behind an `Arc`, so cloning a context or deriving a
//! child is cheap and `set` copies the local map only when it is shared.

use crate::value::{Object, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Variable bindings with lexical fallback to a parent scope
#[derive(Debug, Clone, Default)]
pub struct ExpressionContext {
    values: Arc<Object>,
    parent: Option<Arc<ExpressionContext>>,
}

impl ExpressionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root context holding `values` as its local bindings
    pub fn from_object(values: Object) -> Self {
        ExpressionContext {
            values: Arc::new(values),
            parent: None,
        }
    }

    /// Insert or overwrite a local binding.
    ///
    /// Children created before this call keep seeing the previous version.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        Arc::make_mut(&mut self.values).insert(key.into(), value.into());
    }

    /// Local binding, else the nearest ancestor's binding
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        match self.values.get(key) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|p| p.lookup(key)),
        }
    }

    /// Like [`lookup`](Self::lookup) but yields `Undefined` for unknown keys
    pub fn get(&self, key: &str) -> Value {
        self.lookup(key).cloned().unwrap_or(Value::Undefined)
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Snapshot of the enclosing scope, if any
    pub fn parent(&self) -> Option<&ExpressionContext> {
        self.parent.as_deref()
    }

    /// Flatten the visible scope: ancestors first, then local bindings on top
    pub fn to_object(&self) -> Object {
        let mut flat = match &self.parent {
            Some(parent) => parent.to_object(),
            None => Object::new(),
        };
        for (key, value) in self.values.iter() {
            flat.insert(key.clone(), value.clone());
        }
        flat
    }

    /// Every visible name, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.to_object().into_keys().collect();
        keys.sort();
        keys
    }

    /// New context with `bindings` as locals and a snapshot of `self` as parent
    pub fn create_child<I, K, V>(&self, bindings: I) -> ExpressionContext
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        ExpressionContext {
            values: Arc::new(
                bindings
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Merge every entry of `data` into the local bindings
    pub fn extend<I, K, V>(&mut self, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let values = Arc::make_mut(&mut self.values);
        for (key, value) in data {
            values.insert(key.into(), value.into());
        }
    }
}

/// Authenticated identity exposed as the `user` namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Any other attributes of the identity, kept as is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl From<UserInfo> for Value {
    fn from(user: UserInfo) -> Self {
        let mut map = Object::new();
        let optional = [
            ("id", user.id),
            ("name", user.name),
            ("email", user.email),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                map.insert(key.to_string(), Value::String(v));
            }
        }
        map.insert(
            "roles".to_string(),
            Value::Array(user.roles.into_iter().map(Value::String).collect()),
        );
        let optional = [
            ("locale", user.locale),
            ("timezone", user.timezone),
            ("avatar", user.avatar),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                map.insert(key.to_string(), Value::String(v));
            }
        }
        for (key, value) in user.extra {
            map.entry(key).or_insert_with(|| Value::from(value));
        }
        Value::Object(map)
    }
}

/// Per-call-site inputs for [`build_standard_context`]
#[derive(Debug, Clone, Default)]
pub struct StandardContextOptions {
    /// Current record
    pub data: Option<Value>,
    /// Alias of `data`; used as `data` when no data is supplied
    pub record: Option<Value>,
    /// Form field values, defaults to `data`
    pub form: Option<Value>,
    pub user: Option<Value>,
    pub page: Option<Value>,
    pub params: Option<Value>,
    pub env: Option<Value>,
    /// Position in a repeating context
    pub index: Option<usize>,
    /// Enclosing record for nested contexts
    pub parent: Option<Value>,
    /// Custom top-level variables
    pub extra: Object,
}

impl StandardContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_record(mut self, record: impl Into<Value>) -> Self {
        self.record = Some(record.into());
        self
    }

    pub fn with_form(mut self, form: impl Into<Value>) -> Self {
        self.form = Some(form.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<Value>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_page(mut self, page: impl Into<Value>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn with_params(mut self, params: impl Into<Value>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn with_env(mut self, env: impl Into<Value>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<Value>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_nullish())
}

/// Build the canonical namespace layout.
///
/// `data`, `record`, `form`, `user`, `page`, `params` and `env` are always bound,
/// defaulting to empty objects. `index` and `parent` are bound only when supplied.
/// Extra variables are merged last and win on name collision.
pub fn build_standard_context(options: StandardContextOptions) -> ExpressionContext {
    let StandardContextOptions {
        data,
        record,
        form,
        user,
        page,
        params,
        env,
        index,
        parent,
        extra,
    } = options;

    let record = present(record);
    let data = present(data)
        .or_else(|| record.clone())
        .unwrap_or_else(Value::object);
    let record = data.clone();
    let form = present(form).unwrap_or_else(|| data.clone());

    let mut values = Object::new();
    values.insert("data".to_string(), data);
    values.insert("record".to_string(), record);
    values.insert("form".to_string(), form);
    values.insert(
        "user".to_string(),
        present(user).unwrap_or_else(Value::object),
    );
    values.insert(
        "page".to_string(),
        present(page).unwrap_or_else(Value::object),
    );
    values.insert(
        "params".to_string(),
        present(params).unwrap_or_else(Value::object),
    );
    values.insert("env".to_string(), present(env).unwrap_or_else(Value::object));
    if let Some(index) = index {
        values.insert("index".to_string(), Value::from(index));
    }
    if let Some(parent) = present(parent) {
        values.insert("parent".to_string(), parent);
    }
    for (key, value) in extra {
        values.insert(key, value);
    }

    ExpressionContext::from_object(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_child_sees_parent_and_shadows() {
        let mut root = ExpressionContext::new();
        root.set("x", 1);
        root.set("y", 2);

        let child = root.create_child([("x", 10)]);
        assert_eq!(child.get("x"), Value::from(10));
        assert_eq!(child.get("y"), Value::from(2));
        assert_eq!(root.get("x"), Value::from(1));
        assert!(root.parent().is_none());
        assert_eq!(child.parent().map(|p| p.get("y")), Some(Value::from(2)));
    }

    #[test]
    fn test_create_child_does_not_touch_parent() {
        let root = ExpressionContext::new();
        let child = root.create_child([("x", 5)]);
        assert_eq!(child.get("x"), Value::from(5));
        assert!(!root.has("x"));
        assert_eq!(root.get("x"), Value::Undefined);
    }

    #[test]
    fn test_parent_update_after_child_is_copy_on_write() {
        let mut root = ExpressionContext::new();
        root.set("x", 1);
        let child = root.create_child([("z", 0)]);
        root.set("x", 2);

        assert_eq!(root.get("x"), Value::from(2));
        assert_eq!(child.get("x"), Value::from(1));
    }

    #[test]
    fn test_to_object_local_wins() {
        let mut root = ExpressionContext::new();
        root.set("a", "root");
        root.set("b", "root");
        let child = root.create_child([("b", "child"), ("c", "child")]);

        let flat = child.to_object();
        assert_eq!(flat.get("a"), Some(&Value::from("root")));
        assert_eq!(flat.get("b"), Some(&Value::from("child")));
        assert_eq!(flat.get("c"), Some(&Value::from("child")));
        assert_eq!(child.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_standard_context_defaults() {
        let data = Value::from(json!({"amount": 1500}));
        let ctx = build_standard_context(StandardContextOptions::new().with_data(data.clone()));

        assert_eq!(ctx.get("data"), data);
        assert!(ctx.get("record").strict_equals(&ctx.get("data")));
        assert!(ctx.get("form").strict_equals(&ctx.get("data")));
        for ns in ["user", "page", "params", "env"] {
            assert_eq!(ctx.get(ns), Value::object(), "namespace {}", ns);
        }
        assert!(!ctx.has("index"));
        assert!(!ctx.has("parent"));
    }

    #[test]
    fn test_standard_context_record_only() {
        let record = Value::from(json!({"id": 7}));
        let ctx = build_standard_context(StandardContextOptions::new().with_record(record.clone()));
        assert_eq!(ctx.get("data"), record);
        assert_eq!(ctx.get("record"), record);
    }

    #[test]
    fn test_standard_context_record_follows_data() {
        let ctx = build_standard_context(
            StandardContextOptions::new()
                .with_data(json!({"a": 1}))
                .with_record(json!({"a": 2})),
        );
        assert_eq!(ctx.get("data"), Value::from(json!({"a": 1})));
        assert_eq!(ctx.get("record"), ctx.get("data"));
        assert_eq!(ctx.get("form"), ctx.get("data"));
    }

    #[test]
    fn test_standard_context_empty_and_extras() {
        let ctx = build_standard_context(
            StandardContextOptions::new()
                .with_index(3)
                .with_form(json!({"name": "draft"}))
                .with_variable("locale", "nb-NO"),
        );
        assert_eq!(ctx.get("data"), Value::object());
        assert_eq!(ctx.get("form").get_path("name"), Value::from("draft"));
        assert_eq!(ctx.get("index"), Value::from(3));
        assert_eq!(ctx.get("locale"), Value::from("nb-NO"));
    }

    #[test]
    fn test_user_info_conversion() {
        let user = UserInfo {
            id: Some("u1".to_string()),
            name: Some("Ada".to_string()),
            roles: vec!["admin".to_string()],
            ..Default::default()
        };
        let value = Value::from(user);
        assert_eq!(value.get_path("name"), Value::from("Ada"));
        assert_eq!(value.get_path("roles.0"), Value::from("admin"));
        assert_eq!(value.get_path("email"), Value::Undefined);
    }

    #[test]
    fn test_user_info_keeps_extra_attributes() {
        let user: UserInfo = serde_json::from_value(json!({
            "id": "u1",
            "roles": ["sales"],
            "department": "EMEA",
            "manager": {"id": "u0"}
        }))
        .unwrap();
        assert_eq!(user.id.as_deref(), Some("u1"));

        let value = Value::from(user);
        assert_eq!(value.get_path("department"), Value::from("EMEA"));
        assert_eq!(value.get_path("manager.id"), Value::from("u0"));
        assert_eq!(value.get_path("roles.0"), Value::from("sales"));
    }
}
