//! Small calculator tools. Their arguments are nested under `input`, which
//! exercises the planner's dotted-key protocol (`input.string=INDIA`).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Tool, ToolOutput};

/// Return the ASCII values of the characters in a word.
#[derive(Debug, Clone)]
pub struct StringsToCharsToInt;

#[async_trait]
impl Tool for StringsToCharsToInt {
    fn name(&self) -> String {
        "strings_to_chars_to_int".to_string()
    }

    fn description(&self) -> Option<String> {
        Some("Return the ASCII values of the characters in a word".to_string())
    }

    fn args_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "object",
                    "properties": {
                        "string": {
                            "type": "string",
                            "description": "the word to convert"
                        }
                    },
                    "required": ["string"]
                }
            },
            "required": ["input"]
        }))
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let word = args
            .pointer("/input/string")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'input.string' argument"))?;

        let codes = word.chars().map(|c| Value::from(c as u32)).collect();
        Ok(ToolOutput::List(codes))
    }
}

/// Return the sum of exponentials of the numbers in a list.
#[derive(Debug, Clone)]
pub struct IntListToExponentialSum;

#[async_trait]
impl Tool for IntListToExponentialSum {
    fn name(&self) -> String {
        "int_list_to_exponential_sum".to_string()
    }

    fn description(&self) -> Option<String> {
        Some("Return sum of exponentials of numbers in a list".to_string())
    }

    fn args_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "object",
                    "properties": {
                        "numbers": {
                            "type": "array",
                            "items": {"type": "number"},
                            "description": "the numbers to exponentiate"
                        }
                    },
                    "required": ["numbers"]
                }
            },
            "required": ["input"]
        }))
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput> {
        let numbers = args
            .pointer("/input/numbers")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("Missing 'input.numbers' argument"))?;

        let mut sum = 0.0f64;
        for number in numbers {
            let x = number
                .as_f64()
                .ok_or_else(|| anyhow!("'input.numbers' must contain only numbers"))?;
            sum += x.exp();
        }

        Ok(ToolOutput::Text(sum.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_strings_to_chars_to_int() {
        let tool = StringsToCharsToInt;
        let out = tool
            .execute(json!({"input": {"string": "INDIA"}}))
            .await
            .unwrap();

        assert_eq!(
            out,
            ToolOutput::List(vec![
                json!(73),
                json!(78),
                json!(68),
                json!(73),
                json!(65)
            ])
        );
    }

    #[tokio::test]
    async fn test_strings_to_chars_to_int_missing_input() {
        let tool = StringsToCharsToInt;
        assert!(tool.execute(json!({"string": "INDIA"})).await.is_err());
    }

    #[tokio::test]
    async fn test_exponential_sum() {
        let tool = IntListToExponentialSum;
        let out = tool
            .execute(json!({"input": {"numbers": [0, 1]}}))
            .await
            .unwrap();

        let text = match out {
            ToolOutput::Text(text) => text,
            other => panic!("expected text, got {other:?}"),
        };
        let sum: f64 = text.parse().unwrap();
        assert!((sum - (1.0 + std::f64::consts::E)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_exponential_sum_rejects_non_numbers() {
        let tool = IntListToExponentialSum;
        let result = tool
            .execute(json!({"input": {"numbers": [1, "two"]}}))
            .await;
        assert!(result.is_err());
    }
}
