//! Property tests across crate boundaries.

use proptest::prelude::*;

use shua_core::address::Network;
use shua_core::script::Script;
use shua_social::{BSocial, PostContent, decode, sign, verify};
use shua_tests::helpers::*;
use shua_wallet::{TransactionBuilder, UnsignedTransaction, WalletError};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn signed_posts_verify_and_decode(
        texts in proptest::collection::vec("[a-zA-Z0-9 |#]{0,40}", 1..4),
        seed in 1u8..200,
    ) {
        let mut content = PostContent::new();
        for text in &texts {
            content.add_markdown(text.clone());
        }
        let ops = BSocial::new("shuallet").unwrap().post(content).unwrap();
        let key = keypair(seed);
        let signed = sign(&ops, Some(&key), Network::Mainnet);

        // Embedding must not disturb the tokens.
        let script: Script = signed.data_script();
        let tokens = script.data_pushes().unwrap();
        prop_assert_eq!(verify(&tokens).unwrap(), key.address(Network::Mainnet));

        let decoded = decode(&tokens).unwrap();
        let recovered: Vec<&str> = decoded.contents.iter().filter_map(|c| c.text()).collect();
        prop_assert_eq!(recovered, texts.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn data_transactions_conserve_value(
        values in proptest::collection::vec(1u64..5_000, 1..10),
        payload_len in 0usize..600,
    ) {
        let key = keypair(9);
        let owner = key.address(Network::Mainnet);
        let coins: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| coin(i as u8, 0, *v, &owner))
            .collect();

        let mut unsigned = UnsignedTransaction::new();
        unsigned.add_data(&[vec![0x42; payload_len]]);
        match TransactionBuilder::new().build_and_sign(unsigned, &coins, &owner, &key) {
            Ok(signed) => {
                let spent: u64 = signed.spent().iter().map(|u| u.satoshis).sum();
                let out = signed.transaction().total_output_value().unwrap();
                prop_assert_eq!(spent, out + signed.fee());
                prop_assert!(signed.fee() >= 1);
            }
            Err(WalletError::InsufficientFunds { have, need }) => prop_assert!(have < need || values.iter().all(|v| *v <= 1)),
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }
}
