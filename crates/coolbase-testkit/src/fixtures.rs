//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: deterministic keypairs, a
//! matching schema and routing table, and signed request builders.

use coolbase_codec::{ConsistencyLevel, UnknownTagPolicy};
use coolbase_core::{BufferSink, BufferSource, EntryKey, Keypair, NodeAddress, SharedSource, Version};
use coolbase_verify::{EntryVerifier, StaticRouting, StaticSchema};
use coolbase_wire::{
    write_packet, Cheque, DataEntry, DataEntryBuilder, DataModificationRequest, EntryType,
    FieldValue, PacketContext, StandardProtocol, Protocol,
};

/// The protocol version fixtures speak.
pub const FIXTURE_VERSION: Version = Version::new(1, 0, 0);

const TABLESPACE: &str = "fixtures";
const TABLE: &str = "records";

/// A test fixture with deterministic writer and banker keypairs and a
/// schema/routing pair that accepts what the fixture signs.
pub struct TestFixture {
    pub writer: Keypair,
    pub banker: Keypair,
}

impl TestFixture {
    /// Create a fixture with the default seeds.
    pub fn new() -> Self {
        Self::with_seeds([0x41; 32], [0x42; 32])
    }

    /// Create a fixture with fresh random keys.
    pub fn random() -> Self {
        Self::with_seeds(rand::random(), rand::random())
    }

    /// Create a fixture with explicit keypair seeds.
    pub fn with_seeds(writer_seed: [u8; 32], banker_seed: [u8; 32]) -> Self {
        Self {
            writer: keypair_from_seed(writer_seed),
            banker: keypair_from_seed(banker_seed),
        }
    }

    /// The range start every fixture cheque names.
    pub fn range_start(&self) -> EntryKey {
        EntryKey::ZERO
    }

    /// A verifier whose schema and routing accept this fixture's entries,
    /// with `replicas` replicas configured.
    pub fn verifier(&self, replicas: usize) -> EntryVerifier<StaticSchema, StaticRouting> {
        let schema = StaticSchema::new().table(
            TABLESPACE,
            TABLE,
            vec![self.writer.address()],
            replicas,
        );
        let routing = StaticRouting::new().table(TABLESPACE, TABLE, [self.range_start()]);
        EntryVerifier::new(schema, routing)
    }

    /// A signed entry with the given fields.
    pub fn make_entry(&self, fields: &[(&str, u64, &[u8])]) -> DataEntry {
        let mut builder = DataEntryBuilder::new(TABLESPACE, TABLE)
            .entry_version(1)
            .entry_type(EntryType::Insert)
            .timestamp(1_000_000)
            .cheque(Cheque {
                timestamp: 1_000_000,
                range: self.range_start(),
                number: 1,
                amount: 1,
                receipt_nodes: vec![NodeAddress::from_bytes([0x77; 20])],
            });
        for (name, value_type, data) in fields {
            builder = builder.field(*name, FieldValue::new(*value_type, data.to_vec()));
        }
        builder
            .sign(&self.writer, &self.banker)
            .expect("fixture entry signs")
    }

    /// A signed modification request.
    pub fn make_request(&self, consistency: ConsistencyLevel) -> DataModificationRequest {
        DataModificationRequest {
            consistency,
            entry: self.make_entry(&[("name", 2, b"fixture"), ("count", 1, &[0x2A])]),
        }
    }

    /// Encode a request as one complete packet.
    pub fn encode_packet(&self, request: &DataModificationRequest) -> Vec<u8> {
        let mut sink = BufferSink::new();
        write_packet(&mut sink, FIXTURE_VERSION, &mut request.to_writer())
            .expect("fixture packet encodes");
        sink.into_bytes().to_vec()
    }

    /// Open a packet context over raw packet bytes.
    pub fn open_packet(&self, bytes: Vec<u8>) -> PacketContext {
        StandardProtocol::new(FIXTURE_VERSION)
            .with_policy(UnknownTagPolicy::Reject)
            .open(SharedSource::new(BufferSource::new(bytes)))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple fixtures with distinct keys for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut writer_seed = [0x41u8; 32];
            let mut banker_seed = [0x42u8; 32];
            writer_seed[31] = i as u8 + 1;
            banker_seed[31] = i as u8 + 1;
            TestFixture::with_seeds(writer_seed, banker_seed)
        })
        .collect()
}

fn keypair_from_seed(mut seed: [u8; 32]) -> Keypair {
    // Nudge past the rare seeds the curve rejects.
    loop {
        if let Ok(keypair) = Keypair::from_seed(&seed) {
            return keypair;
        }
        seed[0] = seed[0].wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coolbase_wire::MessageBody;

    #[test]
    fn test_fixture_request_verifies() {
        let fixture = TestFixture::new();
        let request = fixture.make_request(ConsistencyLevel::Quorum);
        let verified = fixture.verifier(3).verify(&request).unwrap();
        assert_eq!(verified.writer, fixture.writer.address());
        assert_eq!(verified.required_acks, 2);
    }

    #[test]
    fn test_fixture_packet_parses_back() {
        let fixture = TestFixture::new();
        let request = fixture.make_request(ConsistencyLevel::ONE);
        let mut packet = fixture.open_packet(fixture.encode_packet(&request));

        packet.header().unwrap();
        let message = packet.message().unwrap();
        message.header().unwrap();
        let MessageBody::Modification(entry_ctx) = message.body().unwrap() else {
            panic!("expected a modification body");
        };
        assert_eq!(entry_ctx.consistency().unwrap(), &ConsistencyLevel::ONE);
        assert_eq!(entry_ctx.entry().unwrap(), &request.entry);
    }

    #[test]
    fn test_multi_party_fixtures_have_distinct_keys() {
        let fixtures = multi_party_fixtures(3);
        assert_eq!(fixtures.len(), 3);
        assert_ne!(fixtures[0].writer.address(), fixtures[1].writer.address());
        assert_ne!(fixtures[1].writer.address(), fixtures[2].writer.address());
    }
}
