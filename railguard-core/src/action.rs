//! On-fail actions.
//!
//! The corrective behavior applied when a directive fails. A closed enum,
//! matched exhaustively by the correction engine: adding an action without
//! handling it everywhere is a compile error.

use std::fmt;

use crate::errors::SchemaError;

/// What to do when a directive's check fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OnFailAction {
    /// Keep the invalid value and log the error.
    Noop,
    /// Drop the value from its container.
    Filter,
    /// Flag the field for regeneration with error feedback.
    Reask,
    /// Substitute the validator's proposed fix, if any; otherwise noop.
    Fix,
    /// Abort the whole pass with a fatal error.
    #[default]
    Exception,
}

impl OnFailAction {
    /// The attribute value naming this action in RAIL markup.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Filter => "filter",
            Self::Reask => "reask",
            Self::Fix => "fix",
            Self::Exception => "exception",
        }
    }

    /// Parse an action name from an `on-fail` attribute.
    pub fn parse(value: &str) -> Result<Self, SchemaError> {
        match value {
            "noop" => Ok(Self::Noop),
            "filter" => Ok(Self::Filter),
            "reask" => Ok(Self::Reask),
            "fix" => Ok(Self::Fix),
            "exception" => Ok(Self::Exception),
            other => Err(SchemaError::UnknownOnFail {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OnFailAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("noop", OnFailAction::Noop)]
    #[case("filter", OnFailAction::Filter)]
    #[case("reask", OnFailAction::Reask)]
    #[case("fix", OnFailAction::Fix)]
    #[case("exception", OnFailAction::Exception)]
    fn parse_round_trips(#[case] name: &str, #[case] action: OnFailAction) {
        assert_eq!(OnFailAction::parse(name).unwrap(), action);
        assert_eq!(action.as_str(), name);
    }

    #[test]
    fn unknown_action_is_a_schema_error() {
        let err = OnFailAction::parse("refrain").unwrap_err();
        assert!(err.to_string().contains("refrain"));
    }

    #[test]
    fn default_is_exception() {
        assert_eq!(OnFailAction::default(), OnFailAction::Exception);
    }
}
