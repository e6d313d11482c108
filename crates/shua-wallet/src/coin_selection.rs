//! First-fit coin selection.
//!
//! Two rules, applied over the coins in the order the indexer returned them:
//!
//! 1. The first single coin worth at least `target + SINGLE_COIN_MARGIN`
//!    wins outright, even if an accumulated prefix would have covered the
//!    target earlier in the list.
//! 2. Otherwise, non-dust coins are accumulated in order until their sum
//!    reaches the target.
//!
//! No sorting, no change minimisation. An empty selection means the coins
//! cannot cover the target.

use shua_core::constants::{DUST_LIMIT, SINGLE_COIN_MARGIN};
use shua_core::types::Utxo;

/// Result of coin selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoinSelection {
    /// Selected coins, in input order.
    pub selected: Vec<Utxo>,
    /// Total value of the selected coins.
    pub total: u64,
}

impl CoinSelection {
    fn from_coins(selected: Vec<Utxo>) -> Self {
        let total = selected.iter().map(|u| u.satoshis).sum();
        Self { selected, total }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Stateless first-fit selector.
pub struct CoinSelector;

impl CoinSelector {
    /// Select coins covering `target` satoshis.
    ///
    /// With no target, every non-dust coin is returned (used for balance
    /// sweeps).
    pub fn select(utxos: &[Utxo], target: Option<u64>) -> CoinSelection {
        let spendable = utxos.iter().filter(|u| u.satoshis > DUST_LIMIT);

        let Some(target) = target else {
            return CoinSelection::from_coins(spendable.cloned().collect());
        };

        let single_threshold = target.saturating_add(SINGLE_COIN_MARGIN);
        let mut prefix: Vec<Utxo> = Vec::new();
        let mut running: u64 = 0;
        let mut covered = false;

        for utxo in spendable {
            if utxo.satoshis >= single_threshold {
                tracing::trace!(outpoint = %utxo.outpoint(), "single coin covers target");
                return CoinSelection::from_coins(vec![utxo.clone()]);
            }
            if !covered {
                prefix.push(utxo.clone());
                running = running.saturating_add(utxo.satoshis);
                covered = running >= target;
            }
        }

        if covered {
            CoinSelection {
                selected: prefix,
                total: running,
            }
        } else {
            CoinSelection::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shua_core::script::Script;
    use shua_core::types::Txid;

    fn coin(n: u8, satoshis: u64) -> Utxo {
        Utxo {
            txid: Txid::from_bytes([n; 32]),
            vout: n as u32,
            satoshis,
            script: Script::p2pkh(&[0x11; 20]),
        }
    }

    fn values(sel: &CoinSelection) -> Vec<u64> {
        sel.selected.iter().map(|u| u.satoshis).collect()
    }

    #[test]
    fn single_coin_preferred_over_accumulation() {
        let coins = [coin(1, 1000), coin(2, 500), coin(3, 2000)];
        let sel = CoinSelector::select(&coins, Some(1200));
        assert_eq!(values(&sel), vec![2000]);
        assert_eq!(sel.total, 2000);
    }

    #[test]
    fn accumulates_in_order_when_no_single_coin() {
        let coins = [coin(1, 1000), coin(2, 500)];
        let sel = CoinSelector::select(&coins, Some(1200));
        assert_eq!(values(&sel), vec![1000, 500]);
        assert_eq!(sel.total, 1500);
    }

    #[test]
    fn single_coin_needs_margin() {
        // 1201 is below 1200 + 2, so it only counts toward accumulation.
        let coins = [coin(1, 1201), coin(2, 5)];
        let sel = CoinSelector::select(&coins, Some(1200));
        assert_eq!(values(&sel), vec![1201]);

        let coins = [coin(1, 1202)];
        let sel = CoinSelector::select(&coins, Some(1200));
        assert_eq!(values(&sel), vec![1202]);
    }

    #[test]
    fn first_qualifying_single_coin_wins() {
        let coins = [coin(1, 3000), coin(2, 1300)];
        assert_eq!(values(&CoinSelector::select(&coins, Some(1200))), vec![3000]);
    }

    #[test]
    fn dust_is_skipped() {
        let coins = [coin(1, 1), coin(2, 600), coin(3, 1), coin(4, 600)];
        let sel = CoinSelector::select(&coins, Some(1200));
        assert_eq!(values(&sel), vec![600, 600]);
    }

    #[test]
    fn insufficient_returns_empty() {
        let coins = [coin(1, 100), coin(2, 200)];
        let sel = CoinSelector::select(&coins, Some(1000));
        assert!(sel.is_empty());
        assert_eq!(sel.total, 0);
    }

    #[test]
    fn empty_input() {
        assert!(CoinSelector::select(&[], Some(1)).is_empty());
        assert!(CoinSelector::select(&[], None).is_empty());
    }

    #[test]
    fn no_target_returns_all_non_dust() {
        let coins = [coin(1, 1), coin(2, 2), coin(3, 700)];
        assert_eq!(values(&CoinSelector::select(&coins, None)), vec![2, 700]);
    }

    fn coins_strategy() -> impl Strategy<Value = Vec<Utxo>> {
        proptest::collection::vec(0u64..5_000, 0..20).prop_map(|vals| {
            vals.into_iter()
                .enumerate()
                .map(|(i, v)| coin(i as u8, v))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn selection_covers_target_or_is_empty(coins in coins_strategy(), target in 1u64..20_000) {
            let sel = CoinSelector::select(&coins, Some(target));
            if !sel.is_empty() {
                prop_assert!(sel.total >= target);
                prop_assert!(sel.selected.iter().all(|u| u.satoshis > DUST_LIMIT));
            } else {
                let spendable: u64 = coins.iter().filter(|u| u.satoshis > DUST_LIMIT).map(|u| u.satoshis).sum();
                prop_assert!(spendable < target);
            }
        }

        #[test]
        fn total_matches_selected(coins in coins_strategy(), target in proptest::option::of(1u64..20_000)) {
            let sel = CoinSelector::select(&coins, target);
            prop_assert_eq!(sel.total, sel.selected.iter().map(|u| u.satoshis).sum::<u64>());
        }
    }
}
