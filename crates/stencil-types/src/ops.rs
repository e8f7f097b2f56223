//! Operator enumerations shared by the expression tree builder and the
//! evaluator.

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperation {
    // Logical
    LogicalAnd,
    LogicalOr,
    // Comparison
    LogicalEq,
    LogicalNe,
    LogicalGt,
    LogicalLt,
    LogicalGe,
    LogicalLe,
    // Membership
    In,
    // Arithmetic
    Plus,
    Minus,
    Mul,
    Div,
    DivReminder,
    DivInteger,
    Pow,
    // Strings
    StringConcat,
}

impl BinaryOperation {
    /// Returns the operator symbol as written in templates.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogicalAnd => "and",
            Self::LogicalOr => "or",
            Self::LogicalEq => "==",
            Self::LogicalNe => "!=",
            Self::LogicalGt => ">",
            Self::LogicalLt => "<",
            Self::LogicalGe => ">=",
            Self::LogicalLe => "<=",
            Self::In => "in",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::DivReminder => "%",
            Self::DivInteger => "//",
            Self::Pow => "**",
            Self::StringConcat => "~",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperation {
    LogicalNot,
    UnaryMinus,
    UnaryPlus,
}

impl UnaryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LogicalNot => "not",
            Self::UnaryMinus => "-",
            Self::UnaryPlus => "+",
        }
    }
}
