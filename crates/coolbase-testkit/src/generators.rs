//! Proptest generators for property-based testing.

use proptest::prelude::*;

use coolbase_codec::ConsistencyLevel;
use coolbase_core::{EntryKey, Hash256, Keypair, NodeAddress, Version};
use coolbase_wire::{
    Cheque, DataEntry, DataEntryBuilder, DataModificationRequest, EntryType, FieldValue,
};

/// Generate a keypair from an arbitrary seed.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_filter_map("seed outside the curve order", |seed| {
        Keypair::from_seed(&seed).ok()
    })
}

/// Generate a random entry key.
pub fn entry_key() -> impl Strategy<Value = EntryKey> {
    any::<[u8; 16]>().prop_map(EntryKey::from_bytes)
}

/// Generate a random 32-byte hash.
pub fn hash256() -> impl Strategy<Value = Hash256> {
    any::<[u8; 32]>().prop_map(Hash256::from_bytes)
}

/// Generate a random node address.
pub fn node_address() -> impl Strategy<Value = NodeAddress> {
    any::<[u8; 20]>().prop_map(NodeAddress::from_bytes)
}

/// Generate a version triple.
pub fn version() -> impl Strategy<Value = Version> {
    (any::<u16>(), any::<u16>(), any::<u16>())
        .prop_map(|(major, minor, maint)| Version::new(major, minor, maint))
}

/// Generate any valid consistency level.
pub fn consistency_level() -> impl Strategy<Value = ConsistencyLevel> {
    (-100i8..=100).prop_filter_map("in-range byte always decodes", |byte| {
        ConsistencyLevel::from_byte(byte).ok()
    })
}

/// Generate an entry type.
pub fn entry_type() -> impl Strategy<Value = EntryType> {
    prop_oneof![
        Just(EntryType::Insert),
        Just(EntryType::Update),
        Just(EntryType::Delete),
    ]
}

/// Generate a table or tablespace name.
pub fn table_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,31}".prop_map(String::from)
}

/// Generate a field with name, type code, and payload.
pub fn field() -> impl Strategy<Value = (String, FieldValue)> {
    (
        "[a-z][a-z0-9_]{0,15}",
        0u64..=16,
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(|(name, value_type, data)| (name, FieldValue::new(value_type, data)))
}

/// Generate a cheque for the given range start.
pub fn cheque(range: EntryKey) -> impl Strategy<Value = Cheque> {
    (
        0i64..=i64::MAX / 2,
        1u64..=1_000,
        1u64..=1_000,
        prop::collection::vec(node_address(), 1..4),
    )
        .prop_map(move |(timestamp, number, amount, receipt_nodes)| Cheque {
            timestamp,
            range,
            number,
            amount,
            receipt_nodes,
        })
}

/// Parameters for generating a signed modification request.
#[derive(Debug, Clone)]
pub struct RequestParams {
    pub writer_seed: [u8; 32],
    pub banker_seed: [u8; 32],
    pub tablespace: String,
    pub table: String,
    pub entry_version: u64,
    pub entry_type: EntryType,
    pub timestamp: i64,
    pub fields: Vec<(String, FieldValue)>,
    pub consistency: ConsistencyLevel,
}

impl Arbitrary for RequestParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(),
            any::<[u8; 32]>(),
            table_name(),
            table_name(),
            1u64..=1_000,
            entry_type(),
            0i64..=1_700_000_000_000i64,
            prop::collection::vec(field(), 0..6),
            consistency_level(),
        )
            .prop_map(
                |(
                    writer_seed,
                    banker_seed,
                    tablespace,
                    table,
                    entry_version,
                    entry_type,
                    timestamp,
                    fields,
                    consistency,
                )| RequestParams {
                    writer_seed,
                    banker_seed,
                    tablespace,
                    table,
                    entry_version,
                    entry_type,
                    timestamp,
                    fields,
                    consistency,
                },
            )
            .boxed()
    }
}

/// Build and sign a request from generated parameters.
///
/// Duplicate generated field names are dropped so the fields trie and the
/// carried field list agree.
pub fn request_from_params(params: &RequestParams) -> DataModificationRequest {
    let writer = keypair_from_seed(params.writer_seed);
    let banker = keypair_from_seed(params.banker_seed);

    let mut builder = DataEntryBuilder::new(&*params.tablespace, &*params.table)
        .entry_version(params.entry_version)
        .entry_type(params.entry_type)
        .timestamp(params.timestamp)
        .cheque(Cheque {
            timestamp: params.timestamp,
            range: EntryKey::ZERO,
            number: 1,
            amount: 1,
            receipt_nodes: vec![NodeAddress::from_bytes([0x01; 20])],
        });
    let mut seen = Vec::new();
    for (name, value) in &params.fields {
        if seen.contains(name) {
            continue;
        }
        seen.push(name.clone());
        builder = builder.field(name.clone(), value.clone());
    }
    let entry = builder
        .sign(&writer, &banker)
        .expect("generated entry signs");
    DataModificationRequest {
        consistency: params.consistency,
        entry,
    }
}

fn keypair_from_seed(mut seed: [u8; 32]) -> Keypair {
    loop {
        if let Ok(keypair) = Keypair::from_seed(&seed) {
            return keypair;
        }
        seed[0] = seed[0].wrapping_add(1);
    }
}

/// A signed entry generated straight from parameters.
pub fn data_entry() -> impl Strategy<Value = DataEntry> {
    any::<RequestParams>().prop_map(|params| request_from_params(&params).entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coolbase_codec::UnknownTagPolicy;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_generated_requests_roundtrip(params: RequestParams) {
            let request = request_from_params(&params);
            let bytes = request.to_writer().value_bytes().unwrap();
            let decoded =
                DataModificationRequest::decode(&bytes, UnknownTagPolicy::Reject).unwrap();
            prop_assert_eq!(decoded, request);
        }

        #[test]
        fn prop_generated_signatures_recover(params: RequestParams) {
            let request = request_from_params(&params);
            let writer = keypair_from_seed(params.writer_seed);
            prop_assert_eq!(request.entry.header_signer().unwrap(), writer.address());
        }
    }
}
