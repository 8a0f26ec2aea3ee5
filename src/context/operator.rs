//! Operator vocabulary of the rule language.
//!
//! These keys are the wire contract rule authors write against. Any other
//! key in an expression position addresses a property by name.

/// Built-in operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Context,
    Add,
    Subtract,
    Multiply,
    Divide,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Max,
    Min,
    Map,
    Contains,
    And,
    Or,
    Not,
    Get,
    Eval,
    DieRoll,
    SetTemp,
    /// Quantity of a resource pool on the owning character
    Quantity,
    /// Cached initiative of the owning character
    Initiative,
    /// In-play flag of the owning character
    IsInPlay,
}

impl Operator {
    pub const ALL: [Operator; 23] = [
        Operator::Context,
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
        Operator::Greater,
        Operator::Less,
        Operator::GreaterOrEqual,
        Operator::LessOrEqual,
        Operator::Max,
        Operator::Min,
        Operator::Map,
        Operator::Contains,
        Operator::And,
        Operator::Or,
        Operator::Not,
        Operator::Get,
        Operator::Eval,
        Operator::DieRoll,
        Operator::SetTemp,
        Operator::Quantity,
        Operator::Initiative,
        Operator::IsInPlay,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "context" => Some(Operator::Context),
            "add" => Some(Operator::Add),
            "subtract" => Some(Operator::Subtract),
            "multiply" => Some(Operator::Multiply),
            "divide" => Some(Operator::Divide),
            "greater" => Some(Operator::Greater),
            "less" => Some(Operator::Less),
            "greater-or-equal" => Some(Operator::GreaterOrEqual),
            "less-or-equal" => Some(Operator::LessOrEqual),
            "max" => Some(Operator::Max),
            "min" => Some(Operator::Min),
            "map" => Some(Operator::Map),
            "contains" => Some(Operator::Contains),
            "and" => Some(Operator::And),
            "or" => Some(Operator::Or),
            "not" => Some(Operator::Not),
            "get" => Some(Operator::Get),
            "eval" => Some(Operator::Eval),
            "die-roll" => Some(Operator::DieRoll),
            "set-temp" => Some(Operator::SetTemp),
            "quantity" => Some(Operator::Quantity),
            "initiative" => Some(Operator::Initiative),
            "is-in-play" => Some(Operator::IsInPlay),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Operator::Context => "context",
            Operator::Add => "add",
            Operator::Subtract => "subtract",
            Operator::Multiply => "multiply",
            Operator::Divide => "divide",
            Operator::Greater => "greater",
            Operator::Less => "less",
            Operator::GreaterOrEqual => "greater-or-equal",
            Operator::LessOrEqual => "less-or-equal",
            Operator::Max => "max",
            Operator::Min => "min",
            Operator::Map => "map",
            Operator::Contains => "contains",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Get => "get",
            Operator::Eval => "eval",
            Operator::DieRoll => "die-roll",
            Operator::SetTemp => "set-temp",
            Operator::Quantity => "quantity",
            Operator::Initiative => "initiative",
            Operator::IsInPlay => "is-in-play",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
