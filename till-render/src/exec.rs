//! Layout evaluator
//!
//! Walks the node tree against a bound record. Output is accumulated in a
//! private buffer and only returned when the whole walk succeeds.

use serde_json::Value;

use crate::error::{RenderError, RenderResult};
use crate::funcs::Functions;
use crate::parse::{Command, Node, Operand, Pipeline};
use crate::value::{is_truthy, kind, write_value};

pub(crate) fn execute(nodes: &[Node], root: &Value, functions: &Functions) -> RenderResult<String> {
    let mut state = State {
        root,
        functions,
        out: String::new(),
    };
    state.walk(root, nodes)?;
    Ok(state.out)
}

struct State<'a> {
    root: &'a Value,
    functions: &'a Functions,
    out: String,
}

impl State<'_> {
    fn walk(&mut self, dot: &Value, nodes: &[Node]) -> RenderResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Output(pipeline) => {
                    let value = self.pipeline(dot, pipeline)?;
                    write_value(&mut self.out, &value);
                }
                Node::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    let value = self.pipeline(dot, cond)?;
                    let branch = if is_truthy(&value) { then } else { otherwise };
                    self.walk(dot, branch)?;
                }
                Node::With {
                    value,
                    then,
                    otherwise,
                } => {
                    let value = self.pipeline(dot, value)?;
                    if is_truthy(&value) {
                        self.walk(&value, then)?;
                    } else {
                        self.walk(dot, otherwise)?;
                    }
                }
                Node::Range {
                    value,
                    body,
                    otherwise,
                } => {
                    let value = self.pipeline(dot, value)?;
                    self.range(dot, &value, body, otherwise)?;
                }
            }
        }
        Ok(())
    }

    fn range(
        &mut self,
        dot: &Value,
        value: &Value,
        body: &[Node],
        otherwise: &[Node],
    ) -> RenderResult<()> {
        match value {
            Value::Array(items) if !items.is_empty() => {
                for item in items {
                    self.walk(item, body)?;
                }
                Ok(())
            }
            Value::Object(map) if !map.is_empty() => {
                for item in map.values() {
                    self.walk(item, body)?;
                }
                Ok(())
            }
            Value::Array(_) | Value::Object(_) | Value::Null => self.walk(dot, otherwise),
            other => Err(RenderError::binding(format!(
                "range can't iterate over {}",
                kind(other)
            ))),
        }
    }

    fn pipeline(&self, dot: &Value, pipeline: &Pipeline) -> RenderResult<Value> {
        let mut carried = None;
        for command in &pipeline.commands {
            carried = Some(self.command(dot, command, carried.take())?);
        }
        Ok(carried.unwrap_or(Value::Null))
    }

    fn command(&self, dot: &Value, command: &Command, piped: Option<Value>) -> RenderResult<Value> {
        match command {
            Command::Operand(operand) => self.operand(dot, operand),
            Command::Call { name, args } => {
                let mut values = args
                    .iter()
                    .map(|arg| self.operand(dot, arg))
                    .collect::<RenderResult<Vec<_>>>()?;
                values.extend(piped);

                let f = self
                    .functions
                    .get(name)
                    .ok_or_else(|| RenderError::binding(format!("function \"{name}\" not defined")))?;
                f(&values).map_err(|message| RenderError::binding(format!("{name}: {message}")))
            }
        }
    }

    fn operand(&self, dot: &Value, operand: &Operand) -> RenderResult<Value> {
        match operand {
            Operand::Field(path) => lookup(dot, path).cloned(),
            Operand::Root(path) => lookup(self.root, path).cloned(),
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Nested(pipeline) => self.pipeline(dot, pipeline),
        }
    }
}

fn lookup<'v>(value: &'v Value, path: &[String]) -> RenderResult<&'v Value> {
    let mut current = value;
    for (depth, name) in path.iter().enumerate() {
        current = match current {
            Value::Object(map) => map.get(name).ok_or_else(|| {
                RenderError::binding(format!("field .{} not found", path[..=depth].join(".")))
            })?,
            other => {
                return Err(RenderError::binding(format!(
                    "can't evaluate field {name} in {}",
                    kind(other)
                )));
            }
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parse::parse;
    use serde_json::json;

    fn run(source: &str, data: Value) -> RenderResult<String> {
        let functions = Functions::builtin();
        let nodes = parse(lex(source)?, &functions)?;
        execute(&nodes, &data, &functions)
    }

    #[test]
    fn test_fields_and_root() {
        let data = json!({"Name": "Crab", "Inner": {"Value": 3}, "Items": [{"N": "a"}]});
        assert_eq!(run("{{.Name}} {{.Inner.Value}}", data.clone()).unwrap(), "Crab 3");
        assert_eq!(run("{{range .Items}}{{.N}}-{{$.Name}}{{end}}", data).unwrap(), "a-Crab");
    }

    #[test]
    fn test_if_else_with() {
        let data = json!({"Paid": false, "Note": "hot", "Empty": ""});
        assert_eq!(run("{{if .Paid}}P{{else}}U{{end}}", data.clone()).unwrap(), "U");
        assert_eq!(run("{{if .Paid}}P{{else if .Note}}N{{end}}", data.clone()).unwrap(), "N");
        assert_eq!(run("{{with .Note}}[{{.}}]{{end}}", data.clone()).unwrap(), "[hot]");
        assert_eq!(run("{{with .Empty}}x{{else}}none{{end}}", data).unwrap(), "none");
    }

    #[test]
    fn test_range_else_and_null() {
        let data = json!({"Items": [], "Missing": null});
        assert_eq!(run("{{range .Items}}x{{else}}empty{{end}}", data.clone()).unwrap(), "empty");
        assert_eq!(run("{{range .Missing}}x{{end}}", data).unwrap(), "");
    }

    #[test]
    fn test_range_over_scalar_is_binding_error() {
        let err = run("{{range .N}}x{{end}}", json!({"N": 3})).unwrap_err();
        assert!(matches!(err, RenderError::Binding(_)));
    }

    #[test]
    fn test_pipeline_passes_last_argument() {
        let data = json!({"Price": "2.5"});
        assert_eq!(run("{{2 | FormatDecimal .Price}}", data.clone()).unwrap(), "2.50");
        assert_eq!(run("{{FormatDecimal (.Price) 1}}", data).unwrap(), "2.5");
    }

    #[test]
    fn test_format_date_in_pipeline() {
        let data = json!({"Date": "2024-08-12T14:30:00"});
        assert_eq!(
            run(r#"{{"02/01/2006" | FormatDate .Date}}"#, data.clone()).unwrap(),
            "12/08/2024"
        );
        assert_eq!(
            run(r#"{{"15:04" | FormatDate $.Date}}"#, data).unwrap(),
            "14:30"
        );
    }

    #[test]
    fn test_pipeline_feeds_nested_call_result() {
        let data = json!({"Price": "2.345", "Prec": 2});
        assert_eq!(run("{{.Prec | FormatDecimal .Price}}", data.clone()).unwrap(), "2.35");
        assert_eq!(
            run("{{0 | FormatDecimal (FormatDecimal .Price 1)}}", data).unwrap(),
            "2"
        );
    }

    #[test]
    fn test_piped_value_in_precision_slot_is_binding_error() {
        let err = run("{{.Price | FormatDecimal 2}}", json!({"Price": "2.5"})).unwrap_err();
        assert!(matches!(err, RenderError::Binding(msg) if msg.contains("precision")));
    }

    #[test]
    fn test_missing_field() {
        let err = run("ok {{.Terminal}}", json!({"TicketNo": "1"})).unwrap_err();
        assert_eq!(err, RenderError::Binding("field .Terminal not found".to_string()));
    }

    #[test]
    fn test_field_on_scalar() {
        let err = run("{{.Name.First}}", json!({"Name": "x"})).unwrap_err();
        assert!(matches!(err, RenderError::Binding(_)));
    }

    #[test]
    fn test_function_error_is_binding_error() {
        let err = run("{{FormatDecimal .Name 2}}", json!({"Name": "Burger"})).unwrap_err();
        assert!(matches!(err, RenderError::Binding(msg) if msg.starts_with("FormatDecimal:")));
    }
}
