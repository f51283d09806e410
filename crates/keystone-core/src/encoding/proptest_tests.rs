//! Property-based tests for order preservation.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use crate::encoding::keys::{decode_index_key, encode_index_key};
use crate::encoding::sortable::{decode_escaped, encode_escaped};
use crate::types::RowId;

/// Strategy for byte strings with a high share of zero bytes, which exercises
/// the escape path.
fn arb_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop_oneof![Just(0u8), Just(1u8), any::<u8>()], 0..16)
}

fn escaped(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_escaped(data, &mut buf);
    buf
}

proptest! {
    #[test]
    fn escaped_order_matches_raw_order(a in arb_bytes(), b in arb_bytes()) {
        prop_assert_eq!(a.cmp(&b), escaped(&a).cmp(&escaped(&b)));
    }

    #[test]
    fn escaped_decodes_to_input(data in arb_bytes()) {
        let encoded = escaped(&data);
        let (decoded, consumed) = decode_escaped(&encoded).expect("decode");
        prop_assert_eq!(decoded, data);
        prop_assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn index_key_order_is_value_then_row_id(
        a in arb_bytes(),
        b in arb_bytes(),
        id_a in any::<u64>(),
        id_b in any::<u64>(),
    ) {
        let key_a = encode_index_key(&a, RowId::new(id_a));
        let key_b = encode_index_key(&b, RowId::new(id_b));
        let expected = a.cmp(&b).then(id_a.cmp(&id_b));
        prop_assert_eq!(key_a.cmp(&key_b), expected);
    }

    #[test]
    fn index_key_decodes_to_parts(value in arb_bytes(), id in any::<u64>()) {
        let key = encode_index_key(&value, RowId::new(id));
        let (decoded_value, decoded_id) = decode_index_key(&key).expect("decode");
        prop_assert_eq!(decoded_value, value);
        prop_assert_eq!(decoded_id, RowId::new(id));
    }
}
