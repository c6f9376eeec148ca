//! Configuration compiler.
//!
//! Recursive descent over tagged JSON nodes (`{"type": "...", ...}`) into
//! [`Method`], [`Filter`], [`ExitRule`] and [`Strategy`] trees. Nested
//! sub-expressions compile first, then scalar parameters are validated, then
//! the node is built. Errors carry the JSONPath-like location of the failing
//! node, e.g. `$.entry.args[1].lhs`, and no partial tree is ever returned.

use serde_json::{Map, Value};

use crate::domain::error::{ConfigError, ConfigErrorReason, NodeKind, QuantscreenError};
use crate::domain::filter::{CompareOp, Filter};
use crate::domain::indicator::bollinger::{BollingerOutput, DEFAULT_MULTIPLIER};
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW, MacdOutput};
use crate::domain::indicator::stochastic::StochasticOutput;
use crate::domain::method::{Method, Scalar};
use crate::domain::provider::PriceField;
use crate::domain::strategy::{ExitRule, Strategy};

pub const DEFAULT_MAX_DEPTH: usize = 64;

const ROOT: &str = "$";
const FIELD_NAMES: &str = "open, high, low, close, volume";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compiler {
    max_depth: usize,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

/// An object node being compiled, with its location in the document.
struct Node<'v> {
    fields: &'v Map<String, Value>,
    path: String,
    depth: usize,
}

impl<'v> Node<'v> {
    fn error(&self, reason: ConfigErrorReason) -> ConfigError {
        ConfigError::new(self.path.clone(), reason)
    }

    fn invalid(&self, name: &str, expected: impl Into<String>) -> ConfigError {
        self.error(ConfigErrorReason::InvalidParam {
            name: name.to_string(),
            expected: expected.into(),
        })
    }

    fn child_path(&self, name: &str) -> String {
        format!("{}.{}", self.path, name)
    }

    fn tag(&self) -> Result<&'v str, ConfigError> {
        self.fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| self.error(ConfigErrorReason::MissingTag))
    }

    fn required(&self, name: &str) -> Result<&'v Value, ConfigError> {
        self.fields
            .get(name)
            .ok_or_else(|| self.error(ConfigErrorReason::MissingParam(name.to_string())))
    }

    fn number(&self, name: &str) -> Result<f64, ConfigError> {
        self.required(name)?
            .as_f64()
            .ok_or_else(|| self.invalid(name, "a number"))
    }

    fn optional_number(&self, name: &str) -> Result<Option<f64>, ConfigError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(v) => v.as_f64().map(Some).ok_or_else(|| self.invalid(name, "a number")),
        }
    }

    fn period(&self, name: &str) -> Result<usize, ConfigError> {
        let value = self.required(name)?;
        Self::as_period(value).ok_or_else(|| self.invalid(name, "an integer >= 1"))
    }

    fn optional_period(&self, name: &str, default: usize) -> Result<usize, ConfigError> {
        match self.fields.get(name) {
            None => Ok(default),
            Some(v) => Self::as_period(v).ok_or_else(|| self.invalid(name, "an integer >= 1")),
        }
    }

    fn as_period(value: &Value) -> Option<usize> {
        value
            .as_u64()
            .filter(|&p| p >= 1)
            .and_then(|p| usize::try_from(p).ok())
    }

    fn string(&self, name: &str) -> Result<&'v str, ConfigError> {
        self.required(name)?
            .as_str()
            .ok_or_else(|| self.invalid(name, "a string"))
    }

    fn optional_string(&self, name: &str) -> Result<Option<&'v str>, ConfigError> {
        match self.fields.get(name) {
            None => Ok(None),
            Some(v) => v.as_str().map(Some).ok_or_else(|| self.invalid(name, "a string")),
        }
    }

    /// Parse `name` with `parse`, reporting `choices` on failure.
    fn choice<T>(
        &self,
        name: &str,
        choices: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, ConfigError> {
        parse(self.string(name)?).ok_or_else(|| self.invalid(name, format!("one of {}", choices)))
    }

    fn unknown(&self, kind: NodeKind, tag: &str) -> ConfigError {
        self.error(ConfigErrorReason::UnknownTag {
            kind,
            tag: tag.to_string(),
        })
    }
}

impl Compiler {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn compile_method(&self, value: &Value) -> Result<Method, ConfigError> {
        self.method(value, ROOT.to_string(), 0)
    }

    pub fn compile_filter(&self, value: &Value) -> Result<Filter, ConfigError> {
        self.filter(value, ROOT.to_string(), 0)
    }

    pub fn compile_strategy(&self, value: &Value) -> Result<Strategy, ConfigError> {
        let root = self.enter(value, ROOT.to_string(), 0)?;

        let entry = self.filter(root.required("entry")?, root.child_path("entry"), 1)?;
        let price = match root.fields.get("price") {
            Some(v) => self.method(v, root.child_path("price"), 1)?,
            None => Method::Field(PriceField::Close),
        };

        let exits_value = root.required("exits")?;
        let items = exits_value
            .as_array()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| root.invalid("exits", "a non-empty array of exit rules"))?;
        let mut exits = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            exits.push(self.exit(item, format!("{}.exits[{}]", root.path, i), 1)?);
        }

        let name = root.string("name")?.to_string();
        let description = root.optional_string("description")?.unwrap_or_default().to_string();

        Ok(Strategy {
            name,
            description,
            entry,
            price,
            exits,
        })
    }

    /// Parse and compile a strategy document read from `file`.
    pub fn parse_strategy(&self, text: &str, file: &str) -> Result<Strategy, QuantscreenError> {
        let value = parse_document(text, file)?;
        Ok(self.compile_strategy(&value)?)
    }

    fn enter<'v>(&self, value: &'v Value, path: String, depth: usize) -> Result<Node<'v>, ConfigError> {
        if depth > self.max_depth {
            return Err(ConfigError::new(path, ConfigErrorReason::TooDeep(self.max_depth)));
        }
        match value.as_object() {
            Some(fields) => Ok(Node { fields, path, depth }),
            None => Err(ConfigError::new(path, ConfigErrorReason::NotAnObject)),
        }
    }

    fn method_param(&self, node: &Node<'_>, name: &str) -> Result<Method, ConfigError> {
        self.method(node.required(name)?, node.child_path(name), node.depth + 1)
    }

    fn filter_param(&self, node: &Node<'_>, name: &str) -> Result<Filter, ConfigError> {
        self.filter(node.required(name)?, node.child_path(name), node.depth + 1)
    }

    fn source_param(&self, node: &Node<'_>) -> Result<Method, ConfigError> {
        match node.fields.get("source") {
            Some(v) => self.method(v, node.child_path("source"), node.depth + 1),
            None => Ok(Method::Field(PriceField::Close)),
        }
    }

    fn method(&self, value: &Value, path: String, depth: usize) -> Result<Method, ConfigError> {
        let node = self.enter(value, path, depth)?;
        match node.tag()? {
            "value" => Ok(Method::value(node.number("value")?)),
            "field" => Ok(Method::Field(node.choice("field", FIELD_NAMES, PriceField::parse)?)),
            "abs_diff" => {
                let lhs = self.method_param(&node, "lhs")?;
                let rhs = self.method_param(&node, "rhs")?;
                Ok(Method::abs_diff(lhs, rhs))
            }
            "atr" => Ok(Method::Atr {
                period: node.period("period")?,
            }),
            "sma" => {
                let source = Box::new(self.source_param(&node)?);
                Ok(Method::Sma {
                    period: node.period("period")?,
                    source,
                })
            }
            "ema" => {
                let source = Box::new(self.source_param(&node)?);
                Ok(Method::Ema {
                    period: node.period("period")?,
                    source,
                })
            }
            "bollinger" => Ok(Method::Bollinger {
                period: node.period("period")?,
                multiplier: Scalar(node.optional_number("multiplier")?.unwrap_or(DEFAULT_MULTIPLIER)),
                output: node.choice("output", BollingerOutput::NAMES, BollingerOutput::parse)?,
            }),
            "macd" => {
                let fast = node.optional_period("fast", DEFAULT_FAST)?;
                let slow = node.optional_period("slow", DEFAULT_SLOW)?;
                let signal = node.optional_period("signal", DEFAULT_SIGNAL)?;
                if fast >= slow {
                    return Err(node.invalid("fast", "less than 'slow'"));
                }
                Ok(Method::Macd {
                    fast,
                    slow,
                    signal,
                    output: node.choice("output", MacdOutput::NAMES, MacdOutput::parse)?,
                })
            }
            "stochastic" => Ok(Method::Stochastic {
                k_period: node.period("k_period")?,
                d_period: node.period("d_period")?,
                output: node.choice("output", StochasticOutput::NAMES, StochasticOutput::parse)?,
            }),
            other => Err(node.unknown(NodeKind::Method, other)),
        }
    }

    fn filter(&self, value: &Value, path: String, depth: usize) -> Result<Filter, ConfigError> {
        let node = self.enter(value, path, depth)?;
        let tag = node.tag()?;

        if let Some(op) = CompareOp::from_tag(tag) {
            let lhs = self.method_param(&node, "lhs")?;
            let rhs = self.method_param(&node, "rhs")?;
            return Ok(Filter::compare(op, lhs, rhs));
        }

        match tag {
            "true" => Ok(Filter::Const(true)),
            "false" => Ok(Filter::Const(false)),
            "cross_above" | "cross_below" => {
                let lhs = self.method_param(&node, "lhs")?;
                let rhs = self.method_param(&node, "rhs")?;
                Ok(if tag == "cross_above" {
                    Filter::CrossAbove { lhs, rhs }
                } else {
                    Filter::CrossBelow { lhs, rhs }
                })
            }
            "between" => {
                let operand = self.method_param(&node, "operand")?;
                let lower = node.number("lower")?;
                let upper = node.number("upper")?;
                if lower > upper {
                    return Err(node.invalid("lower", "not greater than 'upper'"));
                }
                Ok(Filter::Between {
                    operand,
                    lower: Scalar(lower),
                    upper: Scalar(upper),
                })
            }
            "and" | "or" => {
                let items = node
                    .required("args")?
                    .as_array()
                    .filter(|items| !items.is_empty())
                    .ok_or_else(|| node.invalid("args", "a non-empty array of filters"))?;
                let mut args = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let path = format!("{}.args[{}]", node.path, i);
                    args.push(self.filter(item, path, node.depth + 1)?);
                }
                Ok(if tag == "and" {
                    Filter::And(args)
                } else {
                    Filter::Or(args)
                })
            }
            "not" => Ok(Filter::Not(Box::new(self.filter_param(&node, "arg")?))),
            other => Err(node.unknown(NodeKind::Filter, other)),
        }
    }

    fn exit(&self, value: &Value, path: String, depth: usize) -> Result<ExitRule, ConfigError> {
        let node = self.enter(value, path, depth)?;
        let tag = node.tag()?;
        match tag {
            "take_profit" | "stop_loss" => {
                let price = match node.fields.get("price") {
                    Some(v) => self.method(v, node.child_path("price"), node.depth + 1)?,
                    None => Method::Field(PriceField::Close),
                };
                let target = Scalar(node.number("target")?);
                Ok(if tag == "take_profit" {
                    ExitRule::TakeProfit { target, price }
                } else {
                    ExitRule::StopLoss { target, price }
                })
            }
            "signal" => Ok(ExitRule::Signal(self.filter_param(&node, "filter")?)),
            other => Err(node.unknown(NodeKind::Exit, other)),
        }
    }
}

/// Parse a JSON document, mapping syntax errors to [`QuantscreenError::StrategySyntax`].
pub fn parse_document(text: &str, file: &str) -> Result<Value, QuantscreenError> {
    serde_json::from_str(text).map_err(|e| QuantscreenError::StrategySyntax {
        file: file.to_string(),
        reason: e.to_string(),
    })
}

pub fn compile_method(value: &Value) -> Result<Method, ConfigError> {
    Compiler::default().compile_method(value)
}

pub fn compile_filter(value: &Value) -> Result<Filter, ConfigError> {
    Compiler::default().compile_filter(value)
}

pub fn compile_strategy(value: &Value) -> Result<Strategy, ConfigError> {
    Compiler::default().compile_strategy(value)
}
