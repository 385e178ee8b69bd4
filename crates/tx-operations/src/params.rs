//! Parameter assembly: GET query, POST form, or POST `Parameters` resource,
//! lifted to one typed view with lenient value coercion (spec §4.G.1).

use serde_json::Value;

/// Raw parameters as they arrived, before any operation-specific typing.
#[derive(Debug, Clone)]
pub enum RawParams {
    /// GET query string or `application/x-www-form-urlencoded` body.
    Query(Vec<(String, String)>),
    /// POST body already known to be JSON: either a `Parameters` resource or
    /// a single bare resource.
    Body(Value),
}

impl RawParams {
    /// Normalises to a `Parameters` resource, wrapping a bare resource body
    /// under a `resource` entry the way the teacher's `OperationParams` does.
    pub fn to_parameters(&self) -> Value {
        match self {
            Self::Query(pairs) => {
                let parameter: Vec<Value> = pairs
                    .iter()
                    .map(|(name, value)| serde_json::json!({ "name": name, "valueString": value }))
                    .collect();
                serde_json::json!({ "resourceType": "Parameters", "parameter": parameter })
            }
            Self::Body(value) => {
                if value.get("resourceType").and_then(Value::as_str) == Some("Parameters") {
                    value.clone()
                } else {
                    serde_json::json!({
                        "resourceType": "Parameters",
                        "parameter": [{ "name": "resource", "resource": value }],
                    })
                }
            }
        }
    }

    /// The first value of `name`, tolerating any `value*` wire type or a
    /// `resource` entry (lenient typing: `valueString` where `valueUri` was
    /// expected is accepted).
    pub fn get(&self, name: &str) -> Option<Value> {
        let params = self.to_parameters();
        params
            .get("parameter")
            .and_then(Value::as_array)
            .and_then(|entries| entries.iter().find(|p| p.get("name").and_then(Value::as_str) == Some(name)))
            .and_then(value_field)
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(|v| v.as_str().map(str::to_string)).or_else(|| {
            self.get(name)
                .and_then(|v| v.as_bool().map(|b| b.to_string()))
        })
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_usize(&self, name: &str) -> Option<usize> {
        match self.get(name) {
            Some(Value::Number(n)) => n.as_u64().map(|v| v as usize),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn get_resource(&self, name: &str) -> Option<Value> {
        self.get(name).filter(Value::is_object)
    }

    /// Every value of `name`, for repeating parameters
    /// (`system-version`, `force-system-version`, `check-system-version`, `tx-resource`, `property`).
    pub fn get_all(&self, name: &str) -> Vec<Value> {
        let params = self.to_parameters();
        params
            .get("parameter")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|p| p.get("name").and_then(Value::as_str) == Some(name))
                    .filter_map(value_field)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_all_str(&self, name: &str) -> Vec<String> {
        self.get_all(name)
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// Parameter names present that aren't in `known` — surfaced by the
    /// worker as a warning, never a failure (spec §9 "Dynamic parameter bag").
    pub fn unknown_names(&self, known: &[&str]) -> Vec<String> {
        let params = self.to_parameters();
        params
            .get("parameter")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|p| p.get("name").and_then(Value::as_str))
                    .filter(|name| !known.contains(name))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn value_field(param: &Value) -> Option<Value> {
    param.as_object().and_then(|obj| {
        obj.iter()
            .find(|(k, _)| k.starts_with("value") || *k == "resource")
            .map(|(_, v)| v.clone())
    })
}
