use anchor_types::{WitnessProof, WitnessRole};

use crate::parser::{Connective, Predicate, WitnessPolicy};

#[derive(Clone, Copy, Debug, Default)]
struct RoleCount {
    collected: usize,
    total: usize,
}

impl WitnessPolicy {
    /// Evaluates the policy against a witness proof record.
    ///
    /// A role with zero solicited witnesses satisfies every predicate
    /// scoped to it, which keeps deployments without system witnesses
    /// live.
    pub fn evaluate(&self, proofs: &[WitnessProof]) -> bool {
        let batch = count_role(proofs, WitnessRole::Batch);
        let system = count_role(proofs, WitnessRole::System);

        if self.is_empty() {
            return batch.collected == batch.total && system.collected == system.total;
        }

        let mut result = eval_predicate(&self.predicates[0], batch, system);
        for (connective, predicate) in self.connectives.iter().zip(&self.predicates[1..]) {
            result = match connective {
                Connective::And => result && eval_predicate(predicate, batch, system),
                Connective::Or => result || eval_predicate(predicate, batch, system),
            };
        }
        result
    }
}

fn count_role(proofs: &[WitnessProof], role: WitnessRole) -> RoleCount {
    let mut count = RoleCount::default();
    for proof in proofs {
        if proof.witness.role == role {
            count.total += 1;
            if proof.proof.is_some() {
                count.collected += 1;
            }
        }
    }
    count
}

fn eval_predicate(predicate: &Predicate, batch: RoleCount, system: RoleCount) -> bool {
    let count_for = |role: WitnessRole| match role {
        WitnessRole::Batch => batch,
        WitnessRole::System => system,
    };

    match predicate {
        Predicate::OutOf { count, role } => {
            let counts = count_for(*role);
            counts.total == 0 || counts.collected >= *count as usize
        }
        Predicate::MinPercent { percent, role } => {
            let counts = count_for(*role);
            counts.total == 0 || counts.collected * 100 >= *percent as usize * counts.total
        }
    }
}
