use std::str::FromStr;

use anchor_types::WitnessRole;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("rule not supported: {0}")]
    RuleNotSupported(String),

    #[error("invalid witness role in rule [{0}]")]
    InvalidRole(String),

    #[error("count in rule [{0}] must be a non-negative integer")]
    InvalidCount(String),

    #[error("percent in rule [{0}] must be between 0 and 100")]
    InvalidPercent(String),
}

/// A role-scoped predicate of the policy DSL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Satisfied when at least `count` proofs for `role` are present.
    OutOf { count: u32, role: WitnessRole },
    /// Satisfied when the fraction of present proofs over solicited
    /// witnesses of `role` is at least `percent`/100.
    MinPercent { percent: u32, role: WitnessRole },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// A parsed witness policy: predicates joined left-associatively by
/// short-circuit connectives. The empty policy is valid and degenerates
/// to "every solicited witness has produced a proof".
#[derive(Clone, Debug, PartialEq, Default)]
pub struct WitnessPolicy {
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) connectives: Vec<Connective>,
}

impl WitnessPolicy {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl FromStr for WitnessPolicy {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut predicates = Vec::new();
        let mut connectives = Vec::new();

        let mut expect_predicate = true;
        for token in value.split_whitespace() {
            if expect_predicate {
                predicates.push(parse_predicate(token)?);
            } else {
                connectives.push(match token {
                    "AND" => Connective::And,
                    "OR" => Connective::Or,
                    other => return Err(PolicyError::RuleNotSupported(other.to_string())),
                });
            }
            expect_predicate = !expect_predicate;
        }

        // A trailing connective leaves the policy without its right-hand
        // predicate.
        if !predicates.is_empty() && predicates.len() != connectives.len() + 1 {
            return Err(PolicyError::RuleNotSupported(value.trim().to_string()));
        }

        Ok(Self {
            predicates,
            connectives,
        })
    }
}

fn parse_predicate(token: &str) -> Result<Predicate, PolicyError> {
    let inner = token
        .strip_suffix(')')
        .ok_or_else(|| PolicyError::RuleNotSupported(token.to_string()))?;

    let (name, args) = inner
        .split_once('(')
        .ok_or_else(|| PolicyError::RuleNotSupported(token.to_string()))?;

    // The rule name decides whether the token is supported at all; the
    // arguments are only validated for known rules.
    if !matches!(name, "OutOf" | "MinPercent") {
        return Err(PolicyError::RuleNotSupported(token.to_string()));
    }

    let args: Vec<&str> = args.split(',').map(str::trim).collect();
    if args.len() != 2 {
        return Err(PolicyError::RuleNotSupported(token.to_string()));
    }

    let role = WitnessRole::from_str(args[1])
        .map_err(|_| PolicyError::InvalidRole(token.to_string()))?;

    if name == "OutOf" {
        let count = args[0]
            .parse::<u32>()
            .map_err(|_| PolicyError::InvalidCount(token.to_string()))?;
        Ok(Predicate::OutOf { count, role })
    } else {
        let percent = args[0]
            .parse::<u32>()
            .map_err(|_| PolicyError::InvalidPercent(token.to_string()))?;
        if percent > 100 {
            return Err(PolicyError::InvalidPercent(token.to_string()));
        }
        Ok(Predicate::MinPercent { percent, role })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_single_predicate() {
        let policy: WitnessPolicy = "OutOf(2,system)".parse().unwrap();
        assert_eq!(
            policy.predicates,
            vec![Predicate::OutOf {
                count: 2,
                role: WitnessRole::System
            }]
        );
        assert!(policy.connectives.is_empty());
    }

    #[test]
    fn parses_connective_chain() {
        let policy: WitnessPolicy = "MinPercent(50,batch) AND OutOf(1,system) OR MinPercent(100,system)"
            .parse()
            .unwrap();
        assert_eq!(policy.predicates.len(), 3);
        assert_eq!(
            policy.connectives,
            vec![Connective::And, Connective::Or]
        );
    }

    #[test]
    fn empty_policy_is_valid() {
        let policy: WitnessPolicy = "".parse().unwrap();
        assert!(policy.is_empty());
    }

    #[test]
    fn unknown_rule_is_rejected_by_name() {
        // The second argument is not a role either; the rule name still
        // decides the error.
        let err = "Test(2,3)".parse::<WitnessPolicy>().unwrap_err();
        assert_matches!(err, PolicyError::RuleNotSupported(_));
        assert!(err.to_string().contains("rule not supported"));
    }

    #[test]
    fn unknown_connective_is_rejected() {
        assert_matches!(
            "OutOf(1,system) XOR OutOf(1,batch)".parse::<WitnessPolicy>(),
            Err(PolicyError::RuleNotSupported(_))
        );
    }

    #[test]
    fn trailing_connective_is_rejected() {
        assert_matches!(
            "OutOf(1,system) AND".parse::<WitnessPolicy>(),
            Err(PolicyError::RuleNotSupported(_))
        );
    }

    #[test]
    fn invalid_role_is_rejected() {
        assert_matches!(
            "OutOf(1,witness)".parse::<WitnessPolicy>(),
            Err(PolicyError::InvalidRole(_))
        );
    }

    #[test]
    fn negative_count_is_rejected() {
        assert_matches!(
            "OutOf(-1,system)".parse::<WitnessPolicy>(),
            Err(PolicyError::InvalidCount(_))
        );
    }

    #[test]
    fn percent_over_100_is_rejected() {
        assert_matches!(
            "MinPercent(101,batch)".parse::<WitnessPolicy>(),
            Err(PolicyError::InvalidPercent(_))
        );
    }
}
