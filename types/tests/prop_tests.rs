use proptest::prelude::*;

use twinpeg_types::{
    Amount, InputSignature, OutPoint, PublicKey, Script, Signature, Timestamp, Transaction,
    TxHash, TxIn, TxOut,
};

fn arb_outpoint() -> impl Strategy<Value = OutPoint> {
    (prop::array::uniform32(0u8..), 0u32..8).prop_map(|(b, vout)| OutPoint::new(TxHash::new(b), vout))
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        prop::collection::vec(arb_outpoint(), 1..5),
        prop::collection::vec((0u64..1_000_000, prop::collection::vec(0u8.., 1..30)), 1..4),
    )
        .prop_map(|(outpoints, outputs)| Transaction {
            inputs: outpoints.into_iter().map(TxIn::unsigned).collect(),
            outputs: outputs
                .into_iter()
                .map(|(value, script)| TxOut::new(Amount::new(value), Script::new(script)))
                .collect(),
        })
}

proptest! {
    /// Adding signatures never changes a transaction's id or structure.
    #[test]
    fn txid_stable_under_signatures(tx in arb_transaction(), signer in 0u8..255, input in 0usize..5) {
        let mut signed = tx.clone();
        let index = input % signed.inputs.len();
        signed.inputs[index].signatures.push(InputSignature {
            signer: PublicKey([signer; 32]),
            signature: Signature([signer; 64]),
        });
        prop_assert_eq!(tx.txid(), signed.txid());
        prop_assert!(tx.same_structure(&signed));
        prop_assert_eq!(signed.without_signatures(), tx);
    }

    /// The earliest input is never greater than any spent outpoint.
    #[test]
    fn earliest_input_is_minimum(tx in arb_transaction()) {
        let earliest = tx.earliest_input().unwrap();
        prop_assert!(tx.outpoints().all(|o| earliest <= *o));
    }

    /// A withdrawal tag always yields back the deposit id it was built from.
    #[test]
    fn withdrawal_tag_recovers_deposit(bytes in prop::array::uniform32(0u8..)) {
        let id = TxHash::new(bytes);
        prop_assert_eq!(Script::withdrawal_tag(&id).deposit_id_from_tag(), Some(id));
    }

    /// Hashes and transactions survive both the JSON and the bincode encoding.
    #[test]
    fn transaction_encodings_agree(tx in arb_transaction()) {
        let json = serde_json::to_string(&tx).unwrap();
        let from_json: Transaction = serde_json::from_str(&json).unwrap();
        let bin = bincode::serialize(&tx).unwrap();
        let from_bin: Transaction = bincode::deserialize(&bin).unwrap();
        prop_assert_eq!(&from_json, &tx);
        prop_assert_eq!(&from_bin, &tx);
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since_saturates(
        base in 1u64..1_000_000,
        deficit in 1u64..1_000_000,
    ) {
        let later = Timestamp::new(base + deficit);
        let earlier = Timestamp::new(base);
        prop_assert_eq!(later.elapsed_since(earlier), 0);
        prop_assert_eq!(earlier.elapsed_since(later), deficit);
    }

    /// Amount: checked_sub returns None when b > a.
    #[test]
    fn amount_checked_sub_underflow(a in 0u64..1_000_000, b in 0u64..1_000_000) {
        let result = Amount::new(a).checked_sub(Amount::new(b));
        if b > a {
            prop_assert!(result.is_none());
        } else {
            prop_assert_eq!(result, Some(Amount::new(a - b)));
        }
    }
}

#[test]
fn hashes_are_hex_in_json() {
    let id = TxHash::new([0xab; 32]);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
    let parsed: TxHash = json.trim_matches('"').parse().unwrap();
    assert_eq!(parsed, id);
}
