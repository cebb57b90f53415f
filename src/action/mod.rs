//! The action-string protocol: parsing the planner's single output line and
//! executing the tool call it names.
//!
//! The wire format is bit-exact:
//!
//! ```text
//! FUNCTION_CALL: <tool_name>|<key1>=<value1>|<key2>=<value2>|...
//! FINAL_ANSWER: <payload>
//! ```
//!
//! Keys are dot-delimited paths expanded into nested mappings; values are
//! parsed by a restricted literal parser (numbers, booleans, strings, lists,
//! mappings) with a trimmed-string fallback. No code execution path exists.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use tracing::{debug, error};

use crate::error::AgentError;
use crate::tools::Tool;
use crate::types::{PlanAction, ToolCallResult};

const FUNCTION_CALL_PREFIX: &str = "FUNCTION_CALL:";
const FINAL_ANSWER_PREFIX: &str = "FINAL_ANSWER:";

/// Parse one planner line into a `PlanAction`. Pure and total: the same
/// input always yields the same action, and anything else fails with
/// `MalformedAction`.
pub fn parse_action(line: &str) -> Result<PlanAction, AgentError> {
    let line = line.trim();
    if let Some(payload) = line.strip_prefix(FINAL_ANSWER_PREFIX) {
        return Ok(PlanAction::FinalAnswer(payload.trim().to_string()));
    }
    if line.starts_with(FUNCTION_CALL_PREFIX) {
        let (name, arguments) = parse_function_call(line)?;
        return Ok(PlanAction::ToolCall { name, arguments });
    }
    Err(AgentError::MalformedAction(line.to_string()))
}

/// Parse a `FUNCTION_CALL` line into a tool name and a nested argument
/// mapping.
pub fn parse_function_call(response: &str) -> Result<(String, Map<String, Value>), AgentError> {
    let rest = response
        .trim()
        .strip_prefix(FUNCTION_CALL_PREFIX)
        .ok_or_else(|| AgentError::MalformedAction(response.to_string()))?;

    let mut parts = rest.split('|').map(str::trim);
    let name = parts.next().unwrap_or("").to_string();
    if name.is_empty() {
        return Err(AgentError::MalformedAction(response.to_string()));
    }

    let mut arguments = Map::new();
    for part in parts {
        let Some((key, value)) = part.split_once('=') else {
            error!("failed to parse FUNCTION_CALL: invalid param: {part}");
            return Err(AgentError::MalformedAction(format!("invalid param: {part}")));
        };
        let parsed =
            parse_literal(value).unwrap_or_else(|| Value::String(value.trim().to_string()));
        insert_nested(&mut arguments, key.trim(), parsed)?;
    }

    debug!("parsed: {name} -> {:?}", arguments);
    Ok((name, arguments))
}

/// Expand a dot-delimited key into nested mappings: `a.b=1` and `a.c=2`
/// combine into `{a: {b: 1, c: 2}}`. Later duplicate leaf keys overwrite
/// earlier ones; a path through a non-mapping value is malformed.
fn insert_nested(
    root: &mut Map<String, Value>,
    key: &str,
    value: Value,
) -> Result<(), AgentError> {
    let mut segments: Vec<&str> = key.split('.').collect();
    let leaf = segments.pop().unwrap_or(key);

    let mut current = root;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = slot.as_object_mut().ok_or_else(|| {
            AgentError::MalformedAction(format!("key '{key}' traverses a non-mapping value"))
        })?;
    }
    current.insert(leaf.to_string(), value);
    Ok(())
}

/// Execute one parsed `FUNCTION_CALL` against the tool catalog. Exactly one
/// invocation, no retries; failures propagate for the loop-level policy to
/// handle.
pub async fn execute_tool(
    tools: &HashMap<String, Box<dyn Tool>>,
    name: &str,
    arguments: Map<String, Value>,
) -> Result<ToolCallResult, AgentError> {
    let tool = tools
        .get(name)
        .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

    debug!("calling '{name}' with: {:?}", arguments);
    let raw_response = tool
        .execute(Value::Object(arguments.clone()))
        .await
        .map_err(|err| {
            error!("execution failed for '{name}': {err}");
            AgentError::ToolExecutionFailure {
                name: name.to_string(),
                message: err.to_string(),
            }
        })?;

    let result = raw_response.normalize();
    debug!("'{name}' result: {result}");

    Ok(ToolCallResult {
        tool_name: name.to_string(),
        arguments,
        result,
        raw_response,
    })
}

/// Parse a single literal: numbers, booleans, `None`/`null`, quoted strings,
/// lists, and mappings with string keys. Returns `None` on anything else so
/// the caller can fall back to a plain trimmed string. This is a restricted
/// recursive-descent parser, never an evaluator.
pub(crate) fn parse_literal(input: &str) -> Option<Value> {
    let chars: Vec<char> = input.trim().chars().collect();
    let mut parser = LiteralParser { chars, pos: 0 };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos == parser.chars.len() {
        Some(value)
    } else {
        None
    }
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
}

impl LiteralParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> Option<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '[' => self.list(),
            '{' => self.mapping(),
            '\'' | '"' => self.string(),
            c if c.is_ascii_alphabetic() => self.keyword(),
            _ => self.number(),
        }
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            "None" | "null" => Some(Value::Null),
            _ => None,
        }
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if text.is_empty() {
            return None;
        }
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::Number(Number::from(n)));
        }
        let f = text.parse::<f64>().ok()?;
        Number::from_f64(f).map(Value::Number)
    }

    fn string(&mut self) -> Option<Value> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    other => out.push(other),
                },
                c if c == quote => return Some(Value::String(out)),
                c => out.push(c),
            }
        }
    }

    fn list(&mut self) -> Option<Value> {
        self.eat('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Some(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek()? {
                ',' => {
                    self.pos += 1;
                }
                ']' => {
                    self.pos += 1;
                    return Some(Value::Array(items));
                }
                _ => return None,
            }
        }
    }

    fn mapping(&mut self) -> Option<Value> {
        self.eat('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Some(Value::Object(map));
            }
            let key = match self.string()? {
                Value::String(key) => key,
                _ => return None,
            };
            self.skip_ws();
            self.eat(':')?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek()? {
                ',' => {
                    self.pos += 1;
                }
                '}' => {
                    self.pos += 1;
                    return Some(Value::Object(map));
                }
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::EchoTool;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn args(line: &str) -> Map<String, Value> {
        match parse_action(line).unwrap() {
            PlanAction::ToolCall { arguments, .. } => arguments,
            other => panic!("expected a tool call, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_function_call() {
        let action = parse_action("FUNCTION_CALL: add|a=5|b=3").unwrap();
        assert_eq!(
            action,
            PlanAction::ToolCall {
                name: "add".to_string(),
                arguments: json!({"a": 5, "b": 3}).as_object().unwrap().clone(),
            }
        );
    }

    #[test]
    fn test_parse_nested_keys() {
        let arguments = args("FUNCTION_CALL: t|a=1|b.c=2");
        assert_eq!(Value::Object(arguments), json!({"a": 1, "b": {"c": 2}}));
    }

    #[test]
    fn test_parse_sibling_nested_keys_merge() {
        let arguments = args("FUNCTION_CALL: t|a.b=1|a.c=2");
        assert_eq!(Value::Object(arguments), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn test_later_duplicate_leaf_overwrites() {
        let arguments = args("FUNCTION_CALL: t|a=1|a=2");
        assert_eq!(Value::Object(arguments), json!({"a": 2}));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let line = "FUNCTION_CALL: t|a=1|b.c=[1, 2]|b.d='x'";
        assert_eq!(parse_action(line).unwrap(), parse_action(line).unwrap());
    }

    #[test]
    fn test_bare_words_fall_back_to_strings() {
        let arguments = args("FUNCTION_CALL: strings_to_chars_to_int|input.string=INDIA");
        assert_eq!(
            Value::Object(arguments),
            json!({"input": {"string": "INDIA"}})
        );
    }

    #[test]
    fn test_parse_literal_values() {
        let arguments = args(
            "FUNCTION_CALL: t|n=-7|f=2.5|yes=True|no=false|nothing=None|\
             list=[73, 78, 68]|map={'k': 'v', 'n': 1}|quoted=\"a b\"",
        );
        assert_eq!(
            Value::Object(arguments),
            json!({
                "n": -7,
                "f": 2.5,
                "yes": true,
                "no": false,
                "nothing": null,
                "list": [73, 78, 68],
                "map": {"k": "v", "n": 1},
                "quoted": "a b"
            })
        );
    }

    #[test]
    fn test_parse_final_answer_line() {
        let action = parse_action("FINAL_ANSWER: [42]").unwrap();
        assert_eq!(action, PlanAction::FinalAnswer("[42]".to_string()));
    }

    #[test]
    fn test_unrecognized_prefix_is_malformed() {
        for line in [
            "hello there",
            "function_call: t|a=1",
            "I think we should call FUNCTION_CALL: t|a=1",
            "",
        ] {
            assert!(matches!(
                parse_action(line),
                Err(AgentError::MalformedAction(_))
            ));
        }
    }

    #[test]
    fn test_param_without_equals_is_malformed() {
        assert!(matches!(
            parse_action("FUNCTION_CALL: t|a=1|oops"),
            Err(AgentError::MalformedAction(_))
        ));
    }

    #[test]
    fn test_missing_tool_name_is_malformed() {
        assert!(matches!(
            parse_action("FUNCTION_CALL: "),
            Err(AgentError::MalformedAction(_))
        ));
    }

    #[test]
    fn test_path_through_scalar_is_malformed() {
        assert!(matches!(
            parse_action("FUNCTION_CALL: t|a=1|a.b=2"),
            Err(AgentError::MalformedAction(_))
        ));
    }

    #[test]
    fn test_literal_parser_rejects_trailing_garbage() {
        assert_eq!(parse_literal("[1, 2] and more"), None);
        assert_eq!(parse_literal("12abc"), None);
    }

    #[test]
    fn test_literal_parser_nested_structures() {
        assert_eq!(
            parse_literal("[{'url': 'https://a'}, [1, 2.5], 'x']"),
            Some(json!([{"url": "https://a"}, [1, 2.5], "x"]))
        );
    }

    #[test]
    fn test_literal_parser_string_escapes() {
        assert_eq!(
            parse_literal(r"'it\'s a line\nbreak'"),
            Some(json!("it's a line\nbreak"))
        );
    }

    fn catalog() -> HashMap<String, Box<dyn Tool>> {
        let mut tools: HashMap<String, Box<dyn Tool>> = HashMap::new();
        tools.insert("echo".to_string(), Box::new(EchoTool::new()));
        tools
    }

    #[tokio::test]
    async fn test_execute_known_tool() {
        let tools = catalog();
        let (name, arguments) =
            parse_function_call("FUNCTION_CALL: echo|text='hi there'").unwrap();

        let call = execute_tool(&tools, &name, arguments).await.unwrap();
        assert_eq!(call.tool_name, "echo");
        assert_eq!(call.result, json!("hi there"));
        assert_eq!(
            call.raw_response,
            crate::tools::ToolOutput::Text("hi there".to_string())
        );
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let tools = catalog();
        let (name, arguments) = parse_function_call("FUNCTION_CALL: does_not_exist|x=1").unwrap();

        let err = execute_tool(&tools, &name, arguments).await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownTool(name) if name == "does_not_exist"));
    }

    #[tokio::test]
    async fn test_execute_tool_failure_is_classified() {
        let tools = catalog();
        // EchoTool raises when 'text' is missing.
        let (name, arguments) = parse_function_call("FUNCTION_CALL: echo|other=1").unwrap();

        let err = execute_tool(&tools, &name, arguments).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::ToolExecutionFailure { name, .. } if name == "echo"
        ));
    }
}
