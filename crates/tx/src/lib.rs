//! Transaction assembly: membership paths from the commitment tree go into
//! the proof inputs, an external prover turns them into an extended proof,
//! and the result is a `PendingTransaction` ready for aggregation.

use accum::{AuthenticationPath, CommitmentTree, TreeError};
use primitives::{Commitment, Digest, ExtendedProof, PendingTransaction, PublicInput};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TxError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("a transaction writes exactly one output note, got {0}")]
    OutputCount(usize),

    #[error("application name must not be empty")]
    MissingApplication,

    #[error("prover failed: {0}")]
    Prover(anyhow::Error),
}

/// A spent note: its commitment and its membership path under the anchor.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct SpendInput {
    pub commitment: Commitment,
    pub path: AuthenticationPath,
}

/// Everything the proving subsystem needs for one transaction.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct ProofInputs {
    /// Tree root the spend paths authenticate against.
    pub anchor: Digest,
    pub spends: Vec<SpendInput>,
    pub output: Commitment,
    pub fee: u64,
}

impl ProofInputs {
    /// Ordered public inputs: anchor, each spend path (siblings then index),
    /// output commitment, fee.
    pub fn public_inputs(&self) -> Vec<PublicInput> {
        let mut out = vec![PublicInput::from(self.anchor)];
        for spend in &self.spends {
            out.extend(spend.path.to_public_inputs());
        }
        out.push(PublicInput(self.output.0));
        out.push(PublicInput::from_u64(self.fee));
        out
    }
}

/// Proving subsystem boundary. Circuits and proof math live behind it.
pub trait Prover {
    fn prove(&self, inputs: &ProofInputs) -> anyhow::Result<ExtendedProof>;
}

/// Result of a successful build.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BuiltTransaction {
    pub pending: PendingTransaction,
    pub anchor: Digest,
    /// Leaf index assigned to the output note.
    pub output_index: u64,
}

#[derive(Clone, Debug, Default)]
pub struct TransactionBuilder {
    application_name: String,
    spends: Vec<u64>,
    outputs: Vec<Commitment>,
    fee: u64,
}

impl TransactionBuilder {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self { application_name: application_name.into(), ..Default::default() }
    }

    /// Spend the note stored at `leaf_index`.
    pub fn spend(mut self, leaf_index: u64) -> Self { self.spends.push(leaf_index); self }

    /// The transaction's output note. Exactly one is required, since each
    /// accepted transaction writes exactly one leaf.
    pub fn output(mut self, commitment: Commitment) -> Self { self.outputs.push(commitment); self }

    pub fn fee(mut self, fee: u64) -> Self { self.fee = fee; self }

    /// Collect the anchor and spend paths from the current tree state.
    pub fn proof_inputs(&self, tree: &CommitmentTree) -> Result<ProofInputs, TxError> {
        if self.application_name.is_empty() {
            return Err(TxError::MissingApplication);
        }
        let output = match self.outputs.as_slice() {
            [output] => *output,
            outputs => return Err(TxError::OutputCount(outputs.len())),
        };
        let mut spends = Vec::with_capacity(self.spends.len());
        for &index in &self.spends {
            let path = tree.path_for(index)?;
            let commitment = tree.leaf(index).ok_or(TreeError::IndexOutOfRange { index, filled: tree.len() })?;
            spends.push(SpendInput { commitment, path });
        }
        Ok(ProofInputs { anchor: tree.root(), spends, output, fee: self.fee })
    }

    /// Prove the transaction and append its output note to `tree`. The tree
    /// is left unchanged unless every step succeeds.
    pub fn build<P: Prover>(self, tree: &mut CommitmentTree, prover: &P) -> Result<BuiltTransaction, TxError> {
        let inputs = self.proof_inputs(tree)?;
        if tree.is_full() {
            return Err(TreeError::TreeFull { capacity: tree.capacity() }.into());
        }
        let extended_proof = prover.prove(&inputs).map_err(TxError::Prover)?;
        let output_index = tree.insert(inputs.output)?;
        debug!(
            application = %self.application_name,
            spends = self.spends.len(),
            output_index,
            anchor = %inputs.anchor,
            "built transaction"
        );
        Ok(BuiltTransaction {
            pending: PendingTransaction::new(self.application_name, extended_proof, self.fee),
            anchor: inputs.anchor,
            output_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns the public inputs with a fixed proof blob.
    struct EchoProver;

    impl Prover for EchoProver {
        fn prove(&self, inputs: &ProofInputs) -> anyhow::Result<ExtendedProof> {
            Ok(ExtendedProof { proof: vec![0xde, 0xad], public_inputs: inputs.public_inputs() })
        }
    }

    struct FailingProver;

    impl Prover for FailingProver {
        fn prove(&self, _inputs: &ProofInputs) -> anyhow::Result<ExtendedProof> {
            Err(anyhow::anyhow!("witness unsatisfied"))
        }
    }

    fn seeded_tree() -> CommitmentTree {
        CommitmentTree::from_commitments(4, (0..3u8).map(|i| Commitment([i; 32]))).unwrap()
    }

    #[test]
    fn embeds_verifiable_paths_and_appends_the_output() {
        let mut tree = seeded_tree();
        let anchor = tree.root();
        let built = TransactionBuilder::new("app-A")
            .spend(1)
            .output(Commitment([0x11; 32]))
            .fee(7)
            .build(&mut tree, &EchoProver)
            .unwrap();

        assert_eq!(built.anchor, anchor);
        assert_eq!(built.output_index, 3);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.leaf(3), Some(Commitment([0x11; 32])));

        let inputs = &built.pending.extended_proof.public_inputs;
        // anchor + (4 siblings + index) + output + fee
        assert_eq!(inputs.len(), 1 + 5 + 1 + 1);
        assert_eq!(inputs[6], PublicInput([0x11; 32]));
        assert_eq!(inputs[0], PublicInput::from(anchor));
        assert_eq!(inputs[5], PublicInput::from_u64(1));
        assert_eq!(*inputs.last().unwrap(), PublicInput::from_u64(7));
        assert_eq!(built.pending.fee, 7);
        assert_eq!(built.pending.application_name, "app-A");
    }

    #[test]
    fn spend_path_checks_against_anchor() {
        let tree = seeded_tree();
        let inputs =
            TransactionBuilder::new("app-A").spend(2).output(Commitment([5; 32])).proof_inputs(&tree).unwrap();
        let spend = &inputs.spends[0];
        assert!(spend.path.verify(&spend.commitment, &inputs.anchor));
    }

    #[test]
    fn unknown_spend_index_is_rejected() {
        let mut tree = seeded_tree();
        let err = TransactionBuilder::new("app-A")
            .spend(3)
            .output(Commitment([5; 32]))
            .build(&mut tree, &EchoProver)
            .unwrap_err();
        assert!(matches!(err, TxError::Tree(TreeError::IndexOutOfRange { index: 3, filled: 3 })));
    }

    #[test]
    fn prover_failure_leaves_tree_untouched() {
        let mut tree = seeded_tree();
        let root = tree.root();
        let err = TransactionBuilder::new("app-A")
            .output(Commitment([9; 32]))
            .build(&mut tree, &FailingProver)
            .unwrap_err();
        assert!(matches!(err, TxError::Prover(_)));
        assert_eq!(tree.root(), root);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn full_tree_is_rejected_before_proving() {
        let mut tree = CommitmentTree::from_commitments(1, [Commitment([1; 32]), Commitment([2; 32])]).unwrap();
        let err = TransactionBuilder::new("app-A")
            .output(Commitment([3; 32]))
            .build(&mut tree, &FailingProver)
            .unwrap_err();
        assert!(matches!(err, TxError::Tree(TreeError::TreeFull { capacity: 2 })));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn each_transaction_writes_exactly_one_leaf() {
        let mut tree = seeded_tree();
        let spend_only = TransactionBuilder::new("app-A").spend(0).build(&mut tree, &EchoProver).unwrap_err();
        assert!(matches!(spend_only, TxError::OutputCount(0)));

        let two_outputs = TransactionBuilder::new("app-A")
            .output(Commitment([0x21; 32]))
            .output(Commitment([0x22; 32]))
            .build(&mut tree, &EchoProver)
            .unwrap_err();
        assert!(matches!(two_outputs, TxError::OutputCount(2)));
        assert_eq!(tree.len(), 3);

        for i in 0..2u8 {
            let built = TransactionBuilder::new("app-A")
                .output(Commitment([0x30 + i; 32]))
                .build(&mut tree, &EchoProver)
                .unwrap();
            assert_eq!(built.output_index, 3 + i as u64);
        }
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn unnamed_transactions_are_rejected() {
        let tree = seeded_tree();
        let unnamed = TransactionBuilder::new("").spend(0).output(Commitment([5; 32])).proof_inputs(&tree);
        assert!(matches!(unnamed, Err(TxError::MissingApplication)));
    }
}
