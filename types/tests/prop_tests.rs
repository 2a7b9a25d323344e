use proptest::prelude::*;

use curation_types::{Address, Amount, GovernanceParams, Timestamp};

proptest! {
    /// Parsing is case-insensitive and always yields the lowercase form.
    #[test]
    fn address_parse_normalizes(bytes in prop::array::uniform20(0u8..)) {
        let canonical = Address::from_bytes(bytes);
        let upper = format!("0x{}", hex_upper(&bytes));
        let parsed = Address::parse(&upper).unwrap();
        prop_assert_eq!(parsed.as_str(), canonical.as_str());
        prop_assert_eq!(parsed, canonical);
    }

    /// Anything that is not exactly 20 bytes of hex is rejected.
    #[test]
    fn address_wrong_length_rejected(bytes in prop::collection::vec(0u8.., 0..40)) {
        prop_assume!(bytes.len() != Address::BYTE_LEN);
        let raw = format!("0x{}", hex_upper(&bytes));
        prop_assert!(Address::parse(&raw).is_err());
    }

    /// Address bincode serialization roundtrip keeps the normalized form.
    #[test]
    fn address_bincode_roundtrip(bytes in prop::array::uniform20(0u8..)) {
        let addr = Address::from_bytes(bytes);
        let encoded = bincode::serialize(&addr).unwrap();
        let decoded: Address = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, addr);
    }

    /// mul_div matches plain arithmetic whenever the product fits.
    #[test]
    fn mul_div_matches_small_products(a in 0u64.., b in 0u64.., d in 1u64..) {
        let expected = (a as u128) * (b as u128) / (d as u128);
        let got = Amount::new(a as u128)
            .mul_div(Amount::new(b as u128), Amount::new(d as u128))
            .unwrap();
        prop_assert_eq!(got, Amount::new(expected));
    }

    /// A share of a pool never exceeds the pool: x * n / d <= x when n <= d.
    #[test]
    fn mul_div_share_bounded(x in any::<u128>(), n in any::<u128>(), d in 1u128..) {
        prop_assume!(n <= d);
        let share = Amount::new(x).mul_div(Amount::new(n), Amount::new(d)).unwrap();
        prop_assert!(share <= Amount::new(x));
    }

    /// Splitting a pool pro rata over two stakes never pays out more than the pool.
    #[test]
    fn pro_rata_split_conserves(pool in any::<u64>(), s1 in 1u64.., s2 in 1u64..) {
        let pool = Amount::new(pool as u128);
        let total = Amount::new(s1 as u128 + s2 as u128);
        let p1 = pool.mul_div(Amount::new(s1 as u128), total).unwrap();
        let p2 = pool.mul_div(Amount::new(s2 as u128), total).unwrap();
        let paid = p1 + p2;
        prop_assert!(paid <= pool);
        // Each share rounds down by less than one unit.
        prop_assert!(pool.raw() - paid.raw() < 2);
    }

    /// Amount ordering matches the raw value ordering.
    #[test]
    fn amount_ordering(a in any::<u128>(), b in any::<u128>()) {
        prop_assert_eq!(Amount::new(a) <= Amount::new(b), a <= b);
        prop_assert_eq!(Amount::new(a).checked_sub(Amount::new(b)).is_some(), a >= b);
    }

    /// Amounts survive both the binary and the human-readable encodings.
    #[test]
    fn amount_serde_roundtrip(raw in any::<u128>()) {
        let amount = Amount::new(raw);
        let decoded: Amount = bincode::deserialize(&bincode::serialize(&amount).unwrap()).unwrap();
        prop_assert_eq!(decoded, amount);

        let params = GovernanceParams { min_quorum: amount, ..GovernanceParams::default() };
        let text = toml::to_string(&params).unwrap();
        let parsed: GovernanceParams = toml::from_str(&text).unwrap();
        prop_assert_eq!(parsed.min_quorum, amount);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// has_expired agrees with elapsed_since.
    #[test]
    fn timestamp_expiry_consistent(start in 0u64..1_000_000, duration in 0u64..1_000_000, now in 0u64..3_000_000) {
        let start = Timestamp::new(start);
        let now = Timestamp::new(now);
        prop_assert_eq!(
            start.has_expired(duration, now),
            now >= start && start.elapsed_since(now) >= duration
        );
    }

    /// plus saturates instead of wrapping.
    #[test]
    fn timestamp_plus_saturates(base in any::<u64>(), secs in any::<u64>()) {
        let shifted = Timestamp::new(base).plus(secs);
        prop_assert!(shifted >= Timestamp::new(base));
        prop_assert_eq!(shifted.as_secs(), base.saturating_add(secs));
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
