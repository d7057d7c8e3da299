//! The deterministic fallback decision.

use async_trait::async_trait;
use vigil_core::{Decision, DecisionError, DecisionFn, DecisionInput};

/// Attack the first open target when the balance covers its cost,
/// otherwise wait. Never withdraws.
///
/// This is what every agent does when its configured decision function
/// is unavailable, slow, or answers with something unusable.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDecision;

impl HeuristicDecision {
    /// Pick the next action for `input`.
    pub fn choose(input: &DecisionInput) -> Decision {
        let Some(target) = input.open_targets.first() else {
            return Decision::wait("No alive targets on the battlefield, continuing observation.");
        };
        if input.balance < target.cost {
            return Decision::wait(format!(
                "Insufficient balance ({} coins), cannot attack {}.",
                input.balance, target.name
            ));
        }
        Decision::attack(
            target.id.clone(),
            format!("Detected alive target {}, launching regular attack.", target.name),
        )
    }
}

#[async_trait]
impl DecisionFn for HeuristicDecision {
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError> {
        Ok(Self::choose(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use vigil_core::{DecisionAction, Target};

    fn target(id: &str, cost: i64) -> Target {
        Target {
            id: id.into(),
            name: id.to_uppercase(),
            cost: Decimal::from(cost),
            reward: Decimal::ZERO,
            remaining: 100,
            max_remaining: Some(100),
        }
    }

    fn input(targets: Vec<Target>, balance: i64) -> DecisionInput {
        DecisionInput {
            open_targets: targets,
            balance: Decimal::from(balance),
        }
    }

    #[test]
    fn no_targets_waits() {
        let d = HeuristicDecision::choose(&input(vec![], 100));
        assert_eq!(d.action, DecisionAction::Wait);
    }

    #[test]
    fn attacks_first_target_when_affordable() {
        let d = HeuristicDecision::choose(&input(vec![target("0xa", 1), target("0xb", 2)], 1));
        assert_eq!(d.action, DecisionAction::Attack);
        assert_eq!(d.target_id.as_deref(), Some("0xa"));
    }

    #[test]
    fn waits_when_first_target_is_too_expensive() {
        let d = HeuristicDecision::choose(&input(vec![target("0xa", 2), target("0xb", 1)], 1));
        assert_eq!(d.action, DecisionAction::Wait);
        assert!(d.reason.contains("Insufficient balance"));
    }

    #[test]
    fn never_withdraws_even_with_large_balance() {
        let d = HeuristicDecision::choose(&input(vec![], 1_000_000));
        assert_ne!(d.action, DecisionAction::Withdraw);
    }
}
