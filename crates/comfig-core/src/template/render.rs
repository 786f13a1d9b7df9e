//! Executes a parsed template against a data context

use crate::stores::StringMap;

use super::parser::{Command, Node, Operand, Pipeline};
use super::{TemplateData, TemplateError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Nil,
    Str(String),
    Int(i64),
    Bool(bool),
    Map(StringMap),
    List(Vec<String>),
    /// The root data context; only its accessors can be used
    Data,
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Str(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Bool(b) => *b,
            Value::Map(m) => !m.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Data => true,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Map(_) => "map",
            Value::List(_) => "array",
            Value::Data => "data context",
        }
    }
}

pub(crate) struct Renderer<'a> {
    name: &'a str,
    data: &'a dyn TemplateData,
    out: String,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(name: &'a str, data: &'a dyn TemplateData) -> Self {
        Self {
            name,
            data,
            out: String::new(),
        }
    }

    pub(crate) fn render(mut self, nodes: &[Node]) -> Result<String, TemplateError> {
        self.walk(nodes, &Value::Data)?;
        Ok(self.out)
    }

    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::render(self.name, line, message)
    }

    fn walk(&mut self, nodes: &[Node], dot: &Value) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Action { pipeline, line } => {
                    let value = self.eval_pipeline(pipeline, dot, *line)?;
                    let printed = self.print(&value, *line)?;
                    self.out.push_str(&printed);
                }
                Node::If { branches, otherwise, line } => {
                    let mut taken = false;
                    for (condition, body) in branches {
                        if self.eval_pipeline(condition, dot, *line)?.truthy() {
                            self.walk(body, dot)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken {
                        self.walk(otherwise, dot)?;
                    }
                }
                Node::Range { pipeline, body, otherwise, line } => {
                    let items = match self.eval_pipeline(pipeline, dot, *line)? {
                        Value::Nil => Vec::new(),
                        Value::List(list) => list,
                        // Maps iterate in key order, dot is the value
                        Value::Map(map) => map.into_values().collect(),
                        other => {
                            return Err(self.error(*line, format!("range can't iterate over {}", other.kind())))
                        }
                    };
                    if items.is_empty() {
                        self.walk(otherwise, dot)?;
                    }
                    for item in items {
                        self.walk(body, &Value::Str(item))?;
                    }
                }
                Node::With { pipeline, body, otherwise, line } => {
                    let value = self.eval_pipeline(pipeline, dot, *line)?;
                    if value.truthy() {
                        self.walk(body, &value)?;
                    } else {
                        self.walk(otherwise, dot)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval_pipeline(&self, pipeline: &Pipeline, dot: &Value, line: usize) -> Result<Value, TemplateError> {
        let mut piped = None;
        for command in &pipeline.commands {
            piped = Some(self.eval_command(command, dot, piped, line)?);
        }
        Ok(piped.unwrap_or(Value::Nil))
    }

    fn eval_command(
        &self,
        command: &Command,
        dot: &Value,
        piped: Option<Value>,
        line: usize,
    ) -> Result<Value, TemplateError> {
        let Some((first, rest)) = command.operands.split_first() else {
            return Err(self.error(line, "empty command"));
        };

        let collect_args = || -> Result<Vec<Value>, TemplateError> {
            let mut args = rest
                .iter()
                .map(|operand| self.eval_operand(operand, dot, line))
                .collect::<Result<Vec<_>, _>>()?;
            args.extend(piped.clone());
            Ok(args)
        };

        match first {
            Operand::Func(name) => {
                let args = collect_args()?;
                self.call_function(name, args, line)
            }
            Operand::Field(name) => {
                let args = collect_args()?;
                self.call_field(dot, name, args, line)
            }
            Operand::RootField(name) => {
                let args = collect_args()?;
                self.call_field(&Value::Data, name, args, line)
            }
            other => {
                if piped.is_some() {
                    return Err(self.error(line, "can't give argument to non-function"));
                }
                self.eval_operand(other, dot, line)
            }
        }
    }

    fn eval_operand(&self, operand: &Operand, dot: &Value, line: usize) -> Result<Value, TemplateError> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Root => Ok(Value::Data),
            Operand::Field(name) => self.call_field(dot, name, Vec::new(), line),
            Operand::RootField(name) => self.call_field(&Value::Data, name, Vec::new(), line),
            Operand::Str(s) => Ok(Value::Str(s.clone())),
            Operand::Int(i) => Ok(Value::Int(*i)),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Nil => Ok(Value::Nil),
            Operand::Sub(pipeline) => self.eval_pipeline(pipeline, dot, line),
            Operand::Func(name) => Err(self.error(line, format!("function {} needs to be called", name))),
        }
    }

    fn call_field(&self, receiver: &Value, name: &str, args: Vec<Value>, line: usize) -> Result<Value, TemplateError> {
        match receiver {
            Value::Data => {
                let key = match args.as_slice() {
                    [Value::Str(key)] => key.as_str(),
                    [other] => {
                        return Err(self.error(
                            line,
                            format!("wrong type for value; expected string; got {}", other.kind()),
                        ))
                    }
                    _ => {
                        return Err(self.error(
                            line,
                            format!("wrong number of args for {}: want 1 got {}", name, args.len()),
                        ))
                    }
                };
                match name {
                    "Get" => Ok(Value::Str(self.data.get(key))),
                    "GetMap" => Ok(Value::Map(self.data.get_map(key).unwrap_or_default())),
                    "GetArray" => Ok(Value::List(self.data.get_array(key).unwrap_or_default())),
                    _ => Err(self.error(line, format!("can't evaluate field {} on the data context", name))),
                }
            }
            Value::Map(map) => {
                if !args.is_empty() {
                    return Err(self.error(line, format!("{} is not a method but has arguments", name)));
                }
                Ok(Value::Str(map.get(name).cloned().unwrap_or_default()))
            }
            other => Err(self.error(line, format!("can't evaluate field {} in type {}", name, other.kind()))),
        }
    }

    fn call_function(&self, name: &str, args: Vec<Value>, line: usize) -> Result<Value, TemplateError> {
        let arity = |want: usize| -> Result<(), TemplateError> {
            if args.len() == want {
                Ok(())
            } else {
                Err(self.error(line, format!("wrong number of args for {}: want {} got {}", name, want, args.len())))
            }
        };

        match name {
            "index" => {
                let mut args = args.into_iter();
                let Some(mut current) = args.next() else {
                    return Err(self.error(line, "wrong number of args for index: want at least 1 got 0"));
                };
                for key in args {
                    current = match (current, key) {
                        (Value::Map(map), Value::Str(key)) => Value::Str(map.get(&key).cloned().unwrap_or_default()),
                        (Value::List(list), Value::Int(i)) => {
                            let item = usize::try_from(i).ok().and_then(|i| list.get(i).cloned());
                            match item {
                                Some(item) => Value::Str(item),
                                None => return Err(self.error(line, format!("index out of range: {}", i))),
                            }
                        }
                        (Value::Nil, _) => return Err(self.error(line, "index of untyped nil")),
                        (collection, key) => {
                            return Err(self.error(
                                line,
                                format!("can't index item of type {} with {}", collection.kind(), key.kind()),
                            ))
                        }
                    };
                }
                Ok(current)
            }
            "default" => {
                arity(2)?;
                let mut args = args.into_iter();
                let (fallback, value) = (args.next(), args.next());
                match (fallback, value) {
                    (Some(_), Some(value)) if value.truthy() => Ok(value),
                    (Some(fallback), _) => Ok(fallback),
                    _ => Ok(Value::Nil),
                }
            }
            "len" => {
                arity(1)?;
                match &args[0] {
                    Value::Str(s) => Ok(Value::Int(s.len() as i64)),
                    Value::Map(m) => Ok(Value::Int(m.len() as i64)),
                    Value::List(l) => Ok(Value::Int(l.len() as i64)),
                    other => Err(self.error(line, format!("len of type {}", other.kind()))),
                }
            }
            "quote" => {
                let quoted = args
                    .iter()
                    .map(|value| self.print(value, line).map(|s| format!("{:?}", s)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Str(quoted.join(" ")))
            }
            "join" => {
                arity(2)?;
                match (&args[0], &args[1]) {
                    (Value::Str(sep), Value::List(list)) => Ok(Value::Str(list.join(sep))),
                    (Value::Str(_), Value::Nil) => Ok(Value::Str(String::new())),
                    (sep, list) => Err(self.error(
                        line,
                        format!("join expects a string separator and an array, got {} and {}", sep.kind(), list.kind()),
                    )),
                }
            }
            "eq" | "ne" => {
                if args.len() < 2 {
                    return Err(self.error(line, format!("missing arguments for comparison in {}", name)));
                }
                let mut matched = false;
                for other in &args[1..] {
                    if std::mem::discriminant(&args[0]) != std::mem::discriminant(other) {
                        return Err(self.error(
                            line,
                            format!("incompatible types for comparison: {} and {}", args[0].kind(), other.kind()),
                        ));
                    }
                    matched |= &args[0] == other;
                }
                Ok(Value::Bool(if name == "eq" { matched } else { !matched }))
            }
            "not" => {
                arity(1)?;
                Ok(Value::Bool(!args[0].truthy()))
            }
            "and" | "or" => {
                let want_truthy = name == "or";
                let mut last = Value::Nil;
                for value in args {
                    if value.truthy() == want_truthy {
                        return Ok(value);
                    }
                    last = value;
                }
                Ok(last)
            }
            _ => Err(self.error(line, format!("function {:?} not defined", name))),
        }
    }

    fn print(&self, value: &Value, line: usize) -> Result<String, TemplateError> {
        match value {
            Value::Nil => Ok("<no value>".to_string()),
            Value::Str(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Map(map) => {
                let entries: Vec<String> = map.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
                Ok(format!("map[{}]", entries.join(" ")))
            }
            Value::List(list) => Ok(format!("[{}]", list.join(" "))),
            Value::Data => Err(self.error(
                line,
                "can't print the data context; call .Get, .GetMap or .GetArray",
            )),
        }
    }
}
