//! Combining and validating federation signatures on payout transactions.

use twinpeg_crypto::verify_input_signature;
use twinpeg_types::{InputSignature, MultisigParams, Transaction};

/// Number of distinct federation members with a valid signature on input
/// `index`.
pub fn valid_signers(tx: &Transaction, index: usize, params: &MultisigParams) -> usize {
    let Some(input) = tx.inputs.get(index) else {
        return 0;
    };
    let mut signers: Vec<_> = input
        .signatures
        .iter()
        .filter(|sig| params.is_member(&sig.signer))
        .filter(|sig| verify_input_signature(tx, index, sig))
        .map(|sig| &sig.signer)
        .collect();
    signers.sort();
    signers.dedup();
    signers.len()
}

/// Whether every input carries a quorum of valid member signatures.
pub fn has_quorum(tx: &Transaction, params: &MultisigParams) -> bool {
    !tx.inputs.is_empty()
        && (0..tx.inputs.len()).all(|index| valid_signers(tx, index, params) >= params.quorum())
}

/// Merge signatures from `candidates` into `template`.
///
/// Candidates whose structure differs from `template` are ignored. Per
/// input, only valid signatures by federation members survive, at most one
/// per signer, ordered by the member list. The result therefore does not
/// depend on the order or multiplicity of the candidates.
pub fn merge_signatures(
    template: &Transaction,
    candidates: &[Transaction],
    params: &MultisigParams,
) -> Transaction {
    let mut merged = template.without_signatures();
    let sources: Vec<&Transaction> = std::iter::once(template)
        .chain(candidates.iter().filter(|c| template.same_structure(c)))
        .collect();

    for (index, input) in merged.inputs.iter_mut().enumerate() {
        let mut by_member: Vec<Option<InputSignature>> = vec![None; params.size()];
        for source in &sources {
            for sig in &source.inputs[index].signatures {
                let Some(position) = params.position(&sig.signer) else {
                    continue;
                };
                if by_member[position].is_none() && verify_input_signature(template, index, sig) {
                    by_member[position] = Some(sig.clone());
                }
            }
        }
        input.signatures = by_member.into_iter().flatten().collect();
    }
    merged
}
