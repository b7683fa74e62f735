//! The host runtime schema, as read from JSON.
//!
//! ```json
//! {
//!   "commands": [
//!     { "ns": "dom", "func_name": "set_attribute",
//!       "params": [{ "type": "handle", "name": "el", "handle_type": "DOMElement" },
//!                  { "type": "string", "name": "name" }],
//!       "return_type": "" }
//!   ],
//!   "events": [],
//!   "inheritance": [["HTMLCanvasElement", "DOMElement"]]
//! }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub events: Vec<Event>,
    /// `(child, parent)` handle pairs.
    #[serde(default)]
    pub inheritance: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub ns: String,
    pub func_name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub return_handle_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub handle_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub ns: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
}

impl Schema {
    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(source)
    }

    /// The parent of a handle type, if it inherits from one.
    pub fn parent_of(&self, handle: &str) -> Option<&str> {
        self.inheritance
            .iter()
            .find(|(child, _)| child == handle)
            .map(|(_, parent)| parent.as_str())
    }
}

impl Command {
    /// `ns::func_name`
    pub fn path(&self) -> String {
        format!("{}::{}", self.ns, self.func_name)
    }

    /// The receiver handle type when the first parameter is a handle.
    pub fn receiver(&self) -> Option<&str> {
        self.params
            .first()
            .filter(|p| p.is_handle())
            .map(|p| p.handle_type.as_str())
    }

    pub fn has_func_ptr(&self) -> bool {
        self.params.iter().any(|p| p.ty == "func_ptr")
    }
}

impl Param {
    pub fn is_handle(&self) -> bool {
        self.ty == "handle" && !self.handle_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_schema() {
        let schema = Schema::from_json(
            r#"{
                "commands": [
                    { "ns": "dom", "func_name": "get_body", "params": [],
                      "return_type": "handle", "return_handle_type": "DOMElement" },
                    { "ns": "dom", "func_name": "set_inner_text",
                      "params": [{ "type": "handle", "name": "el", "handle_type": "DOMElement" },
                                 { "type": "string", "name": "text" }],
                      "return_type": "" }
                ],
                "inheritance": [["HTMLCanvasElement", "DOMElement"]]
            }"#,
        )
        .unwrap();

        assert_eq!(schema.commands.len(), 2);
        assert!(schema.events.is_empty());
        assert_eq!(schema.commands[0].return_handle_type, "DOMElement");
        assert_eq!(schema.commands[0].receiver(), None);
        assert_eq!(schema.commands[1].receiver(), Some("DOMElement"));
        assert_eq!(schema.commands[1].params[1].ty, "string");
        assert_eq!(schema.commands[1].path(), "dom::set_inner_text");
        assert_eq!(schema.parent_of("HTMLCanvasElement"), Some("DOMElement"));
        assert_eq!(schema.parent_of("DOMElement"), None);
    }

    #[test]
    fn test_func_ptr_detection() {
        let cmd = Command {
            ns: "system".to_string(),
            func_name: "set_main_loop".to_string(),
            params: vec![Param {
                ty: "func_ptr".to_string(),
                name: "cb".to_string(),
                handle_type: String::new(),
            }],
            ..Command::default()
        };
        assert!(cmd.has_func_ptr());
    }

    #[test]
    fn test_malformed_schema_is_an_error() {
        assert!(Schema::from_json("{ \"commands\": 3 }").is_err());
    }
}
