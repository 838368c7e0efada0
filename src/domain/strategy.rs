//! Strategy document model, validation and normalization.
//!
//! A strategy is a JSON document:
//!
//! ```json
//! {
//!   "version": "0.1",
//!   "name": "EMA Cross + RSI Filter",
//!   "blocks": [
//!     {"id": "ema_fast", "type": "indicator", "indicator": "EMA", "params": {"length": 20}},
//!     {"id": "ema_slow", "type": "indicator", "indicator": "EMA", "params": {"length": 50}},
//!     {"id": "rsi", "type": "indicator", "indicator": "RSI", "params": {"length": 14}},
//!     {"id": "entry", "type": "entry", "logic": [
//!       {"op": "crosses_above", "a": "ema_fast", "b": "ema_slow"},
//!       {"op": "less_than", "a": "rsi", "b": 70}
//!     ]},
//!     {"id": "exit", "type": "exit", "logic": [{"op": "crosses_below", "a": "ema_fast", "b": "ema_slow"}]},
//!     {"id": "risk", "type": "risk", "params": {"stop_loss_pct": 0.02, "take_profit_pct": 0.04, "risk_per_trade_pct": 1.0}}
//!   ]
//! }
//! ```
//!
//! Blocks are decoded one at a time so a failure names the offending block.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::domain::error::{AlgoedgeError, ValidationError};
use crate::domain::indicator::IndicatorKind;
use crate::domain::series::{BASE_COLUMNS, PREV_SUFFIX};

pub const DEFAULT_VERSION: &str = "0.1";
pub const DEFAULT_NAME: &str = "Unnamed Strategy";
pub const DEFAULT_RISK_ID: &str = "risk_default";

/// Indicator-block id → parameter overrides.
pub type ParamCandidate = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyDocument {
    pub version: String,
    pub name: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Indicator {
        id: String,
        indicator: String,
        #[serde(default)]
        params: IndicatorParams,
    },
    Entry {
        #[serde(default = "default_entry_id")]
        id: String,
        #[serde(default)]
        logic: Vec<Condition>,
    },
    Exit {
        #[serde(default = "default_exit_id")]
        id: String,
        #[serde(default)]
        logic: Vec<Condition>,
    },
    Risk {
        #[serde(default = "default_risk_id")]
        id: String,
        #[serde(default)]
        params: RiskParams,
    },
}

fn default_entry_id() -> String {
    "entry".to_string()
}

fn default_exit_id() -> String {
    "exit".to_string()
}

fn default_risk_id() -> String {
    "risk".to_string()
}

impl Block {
    pub fn id(&self) -> &str {
        match self {
            Block::Indicator { id, .. }
            | Block::Entry { id, .. }
            | Block::Exit { id, .. }
            | Block::Risk { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub op: ConditionOp,
    pub a: Operand,
    pub b: Operand,
}

impl Condition {
    pub fn new(op: ConditionOp, a: impl Into<Operand>, b: impl Into<Operand>) -> Self {
        Self {
            op,
            a: a.into(),
            b: b.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    #[serde(alias = "gt")]
    GreaterThan,
    #[serde(alias = "lt")]
    LessThan,
    #[serde(alias = "cross_over")]
    CrossesAbove,
    #[serde(alias = "cross_under")]
    CrossesBelow,
}

impl ConditionOp {
    pub fn is_crossover(self) -> bool {
        matches!(self, ConditionOp::CrossesAbove | ConditionOp::CrossesBelow)
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionOp::GreaterThan => write!(f, "greater_than"),
            ConditionOp::LessThan => write!(f, "less_than"),
            ConditionOp::CrossesAbove => write!(f, "crosses_above"),
            ConditionOp::CrossesBelow => write!(f, "crosses_below"),
        }
    }
}

/// A literal number or a series name. Names that never resolve are kept as opaque text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Literal(f64),
    Name(String),
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Operand::Literal(value)
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Name(name.to_string())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Name(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: f64,
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: f64,
    #[serde(default = "default_risk_per_trade_pct")]
    pub risk_per_trade_pct: f64,
}

fn default_stop_loss_pct() -> f64 {
    0.02
}

fn default_take_profit_pct() -> f64 {
    0.04
}

fn default_risk_per_trade_pct() -> f64 {
    1.0
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            stop_loss_pct: default_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
            risk_per_trade_pct: default_risk_per_trade_pct(),
        }
    }
}

/// Free-form indicator parameters with typed, defaulting accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorParams(pub BTreeMap<String, Value>);

impl IndicatorParams {
    /// Integer parameter. Real values are rounded; negative or non-numeric values fall back.
    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        match self.0.get(key) {
            Some(v) => v
                .as_u64()
                .map(|n| n as usize)
                .or_else(|| {
                    v.as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f.round() as usize)
                })
                .unwrap_or(default),
            None => default,
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.0.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn merge(&mut self, overrides: &BTreeMap<String, Value>) {
        for (key, value) in overrides {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl<const N: usize> From<[(&str, Value); N]> for IndicatorParams {
    fn from(pairs: [(&str, Value); N]) -> Self {
        IndicatorParams(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

/// Borrowed view of one indicator block.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorBlock<'a> {
    pub id: &'a str,
    pub indicator: &'a str,
    pub params: &'a IndicatorParams,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    blocks: Vec<Value>,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

impl StrategyDocument {
    pub fn from_json(json: &str) -> Result<Self, AlgoedgeError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| AlgoedgeError::StrategyParse {
                reason: e.to_string(),
            })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, AlgoedgeError> {
        let raw: RawDocument =
            serde_json::from_value(value).map_err(|e| AlgoedgeError::StrategyParse {
                reason: e.to_string(),
            })?;

        let mut blocks = Vec::with_capacity(raw.blocks.len());
        for (index, value) in raw.blocks.into_iter().enumerate() {
            blocks.push(decode_block(index, value)?);
        }

        let doc = StrategyDocument {
            version: raw.version,
            name: raw.name,
            blocks,
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Structural checks that cannot be expressed in the serde schema.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let generated: HashSet<String> = self
            .indicators()
            .filter_map(|block| {
                IndicatorKind::parse(block.indicator).map(|kind| (block.id, kind))
            })
            .flat_map(|(id, kind)| {
                kind.output_suffixes()
                    .iter()
                    .map(move |suffix| format!("{id}_{suffix}"))
            })
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        for block in &self.blocks {
            match block {
                Block::Indicator { id, .. } => {
                    if id.trim().is_empty() {
                        return Err(ValidationError::new(id.as_str(), "indicator id is empty"));
                    }
                    if BASE_COLUMNS.contains(&id.as_str()) {
                        return Err(ValidationError::new(
                            id.as_str(),
                            "indicator id shadows a price column",
                        ));
                    }
                    if id.ends_with(PREV_SUFFIX) {
                        return Err(ValidationError::new(
                            id.as_str(),
                            format!("indicator id may not end in '{PREV_SUFFIX}'"),
                        ));
                    }
                    if generated.contains(id.as_str()) {
                        return Err(ValidationError::new(
                            id.as_str(),
                            "indicator id shadows another indicator's output",
                        ));
                    }
                    if !seen.insert(id.as_str()) {
                        return Err(ValidationError::new(id.as_str(), "duplicate indicator id"));
                    }
                }
                Block::Entry { id, logic } | Block::Exit { id, logic } => {
                    validate_logic(id, logic)?;
                }
                Block::Risk { .. } => {}
            }
        }
        Ok(())
    }

    pub fn indicators(&self) -> impl Iterator<Item = IndicatorBlock<'_>> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Indicator {
                id,
                indicator,
                params,
            } => Some(IndicatorBlock {
                id,
                indicator,
                params,
            }),
            _ => None,
        })
    }

    /// Logic of the first entry block.
    pub fn entry(&self) -> Option<&[Condition]> {
        self.blocks.iter().find_map(|block| match block {
            Block::Entry { logic, .. } => Some(logic.as_slice()),
            _ => None,
        })
    }

    /// Logic of the first exit block.
    pub fn exit(&self) -> Option<&[Condition]> {
        self.blocks.iter().find_map(|block| match block {
            Block::Exit { logic, .. } => Some(logic.as_slice()),
            _ => None,
        })
    }

    /// Params of the first risk block, or the defaults.
    pub fn risk(&self) -> RiskParams {
        self.blocks
            .iter()
            .find_map(|block| match block {
                Block::Risk { params, .. } => Some(*params),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Copy of the document with `candidate` merged into matching indicator params.
    pub fn with_overrides(&self, candidate: &ParamCandidate) -> StrategyDocument {
        let mut trial = self.clone();
        for block in &mut trial.blocks {
            if let Block::Indicator { id, params, .. } = block {
                if let Some(overrides) = candidate.get(id.as_str()) {
                    params.merge(overrides);
                }
            }
        }
        trial
    }
}

fn decode_block(index: usize, value: Value) -> Result<Block, ValidationError> {
    let label = value
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{index}"));
    serde_json::from_value(value).map_err(|e| ValidationError::new(label, e.to_string()))
}

fn validate_logic(block_id: &str, logic: &[Condition]) -> Result<(), ValidationError> {
    for (i, condition) in logic.iter().enumerate() {
        if !condition.op.is_crossover() {
            continue;
        }
        let literal = [&condition.a, &condition.b]
            .into_iter()
            .any(|operand| matches!(operand, Operand::Literal(_)));
        if literal {
            return Err(ValidationError::new(
                block_id,
                format!("clause {i}: {} needs series operands, not literals", condition.op),
            ));
        }
    }
    Ok(())
}

/// Fill in what a document may omit. Never fails.
///
/// - no risk block: append one with the default params;
/// - first entry block with empty logic: append `EMA(length=50) greater_than EMA(length=200)`.
///
/// The default clause names are not indicator ids, so they resolve as opaque text.
pub fn normalize(mut doc: StrategyDocument) -> StrategyDocument {
    if !doc.blocks.iter().any(|b| matches!(b, Block::Risk { .. })) {
        doc.blocks.push(Block::Risk {
            id: DEFAULT_RISK_ID.to_string(),
            params: RiskParams::default(),
        });
    }

    let entry = doc.blocks.iter_mut().find_map(|b| match b {
        Block::Entry { logic, .. } => Some(logic),
        _ => None,
    });
    if let Some(logic) = entry {
        if logic.is_empty() {
            logic.push(Condition::new(
                ConditionOp::GreaterThan,
                "EMA(length=50)",
                "EMA(length=200)",
            ));
        }
    }

    doc
}
