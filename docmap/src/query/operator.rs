use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{ErrorKind, MapperError, MapperResult};

/// A query condition operator and its canonical symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Exists,
    Type,
    Not,
    Mod,
    Size,
    In,
    NotIn,
    All,
    ElementMatch,
    NotEqual,
    Where,
    Near,
    NearSphere,
    Within,
    WithinCircle,
    WithinCircleSphere,
    WithinBox,
}

pub const ALL_OPERATORS: [Operator; 22] = [
    Operator::Equal,
    Operator::GreaterThan,
    Operator::GreaterThanOrEqual,
    Operator::LessThan,
    Operator::LessThanOrEqual,
    Operator::Exists,
    Operator::Type,
    Operator::Not,
    Operator::Mod,
    Operator::Size,
    Operator::In,
    Operator::NotIn,
    Operator::All,
    Operator::ElementMatch,
    Operator::NotEqual,
    Operator::Where,
    Operator::Near,
    Operator::NearSphere,
    Operator::Within,
    Operator::WithinCircle,
    Operator::WithinCircleSphere,
    Operator::WithinBox,
];

impl Operator {
    /// The operator key the store recognizes.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "$eq",
            Operator::GreaterThan => "$gt",
            Operator::GreaterThanOrEqual => "$gte",
            Operator::LessThan => "$lt",
            Operator::LessThanOrEqual => "$lte",
            Operator::Exists => "$exists",
            Operator::Type => "$type",
            Operator::Not => "$not",
            Operator::Mod => "$mod",
            Operator::Size => "$size",
            Operator::In => "$in",
            Operator::NotIn => "$nin",
            Operator::All => "$all",
            Operator::ElementMatch => "$elemMatch",
            Operator::NotEqual => "$ne",
            Operator::Where => "$where",
            Operator::Near => "$near",
            Operator::NearSphere => "$nearSphere",
            Operator::Within => "$within",
            Operator::WithinCircle => "$center",
            Operator::WithinCircleSphere => "$centerSphere",
            Operator::WithinBox => "$box",
        }
    }

    /// Looks an operator up by its canonical symbol.
    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        ALL_OPERATORS.iter().copied().find(|op| op.symbol() == symbol)
    }

    /// Maps a condition token (`">="`, `"in"`, `"elem-match"`, ...) to an
    /// operator. Word tokens are case-insensitive.
    ///
    /// # Errors
    /// `UnknownOperator` for an unrecognized token.
    pub fn from_token(token: &str) -> MapperResult<Operator> {
        let token = token.trim();
        let operator = match token {
            "=" | "==" => Operator::Equal,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterThanOrEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessThanOrEqual,
            "!=" | "<>" => Operator::NotEqual,
            _ => match token.to_lowercase().as_str() {
                "in" => Operator::In,
                "nin" | "not-in" => Operator::NotIn,
                "all" => Operator::All,
                "exists" => Operator::Exists,
                "elem" | "elem-match" => Operator::ElementMatch,
                "size" => Operator::Size,
                "within" => Operator::Within,
                "near" => Operator::Near,
                _ => {
                    log::error!("Unknown operator '{}'", token);
                    return Err(MapperError::new(
                        &format!("Unknown operator '{}'", token),
                        ErrorKind::UnknownOperator,
                    ));
                }
            },
        };
        Ok(operator)
    }
}

impl FromStr for Operator {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::from_token(s)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
