//! Full pipeline tests: build and sign entries, push them through the wire
//! codec, and verify them against a schema and routing table.

use bytes::Bytes;
use coolbase_codec::{ConsistencyLevel, UnknownTagPolicy};
use coolbase_core::{EntryKey, Keypair, NodeAddress};
use coolbase_verify::{EntryVerifier, StaticRouting, StaticSchema, VerifyError};
use coolbase_wire::{
    Cheque, DataEntryBuilder, DataEntryField, DataModificationRequest, EntryType, FieldValue,
};

fn writer() -> Keypair {
    Keypair::from_seed(&[0x61; 32]).unwrap()
}

fn banker() -> Keypair {
    Keypair::from_seed(&[0x62; 32]).unwrap()
}

fn intruder() -> Keypair {
    Keypair::from_seed(&[0x63; 32]).unwrap()
}

fn range_start() -> EntryKey {
    EntryKey::from_halves(0x4000_0000_0000_0000, 0)
}

fn verifier() -> EntryVerifier<StaticSchema, StaticRouting> {
    let schema = StaticSchema::new().table("shop", "orders", vec![writer().address()], 5);
    let routing = StaticRouting::new().table("shop", "orders", [EntryKey::ZERO, range_start()]);
    EntryVerifier::new(schema, routing)
}

fn request_with(consistency: ConsistencyLevel) -> DataModificationRequest {
    let entry = DataEntryBuilder::new("shop", "orders")
        .entry_version(1)
        .entry_type(EntryType::Insert)
        .timestamp(800_000_000)
        .field("item", FieldValue::new(2, b"widget".as_slice()))
        .field("qty", FieldValue::new(1, vec![0x07]))
        .cheque(Cheque {
            timestamp: 800_000_000,
            range: range_start(),
            number: 1,
            amount: 3,
            receipt_nodes: vec![NodeAddress::from_bytes([0x10; 20])],
        })
        .sign(&writer(), &banker())
        .unwrap();
    DataModificationRequest { consistency, entry }
}

#[test]
fn valid_entry_passes_and_resolves_consistency() {
    let verified = verifier()
        .verify(&request_with(ConsistencyLevel::Quorum))
        .unwrap();
    assert_eq!(verified.writer, writer().address());
    assert_eq!(verified.cheque_signer, banker().address());
    assert_eq!(verified.required_acks, 3); // quorum of 5

    assert_eq!(
        verifier()
            .verify(&request_with(ConsistencyLevel::ALL))
            .unwrap()
            .required_acks,
        5
    );
    assert_eq!(
        verifier()
            .verify(&request_with(ConsistencyLevel::ONE))
            .unwrap()
            .required_acks,
        1
    );
    assert_eq!(
        verifier()
            .verify(&request_with(ConsistencyLevel::Percent(40)))
            .unwrap()
            .required_acks,
        2
    );
}

#[test]
fn survives_the_wire() {
    let request = request_with(ConsistencyLevel::Quorum);
    let bytes = request.to_writer().value_bytes().unwrap();
    let decoded = DataModificationRequest::decode(&bytes, UnknownTagPolicy::Reject).unwrap();
    assert_eq!(verifier().verify(&decoded), verifier().verify(&request));
}

#[test]
fn unknown_table_is_refused() {
    let entry = DataEntryBuilder::new("shop", "refunds")
        .cheque(Cheque {
            timestamp: 0,
            range: range_start(),
            number: 1,
            amount: 1,
            receipt_nodes: vec![NodeAddress::from_bytes([0x10; 20])],
        })
        .sign(&writer(), &banker())
        .unwrap();
    let request = DataModificationRequest {
        consistency: ConsistencyLevel::Quorum,
        entry,
    };
    assert_eq!(
        verifier().verify(&request),
        Err(VerifyError::UnknownTable {
            tablespace: "shop".into(),
            table: "refunds".into(),
        })
    );
}

#[test]
fn tampered_field_value_is_refused() {
    let mut request = request_with(ConsistencyLevel::Quorum);
    request.entry.fields[0].value.data = Bytes::from_static(b"gadget");
    assert_eq!(
        verifier().verify(&request),
        Err(VerifyError::FieldHashMismatch("item".into()))
    );
}

#[test]
fn field_swapped_after_signing_is_refused() {
    // The forged field is internally consistent, but the signed fields hash
    // no longer covers the set.
    let mut request = request_with(ConsistencyLevel::Quorum);
    request.entry.fields[0] =
        DataEntryField::new("item", FieldValue::new(2, b"gadget".as_slice()));
    assert_eq!(
        verifier().verify(&request),
        Err(VerifyError::FieldsRootMismatch)
    );
}

#[test]
fn unauthorized_writer_is_refused() {
    let entry = DataEntryBuilder::new("shop", "orders")
        .field("item", FieldValue::new(2, b"widget".as_slice()))
        .cheque(Cheque {
            timestamp: 0,
            range: range_start(),
            number: 1,
            amount: 1,
            receipt_nodes: vec![NodeAddress::from_bytes([0x10; 20])],
        })
        .sign(&intruder(), &banker())
        .unwrap();
    let request = DataModificationRequest {
        consistency: ConsistencyLevel::Quorum,
        entry,
    };
    assert_eq!(
        verifier().verify(&request),
        Err(VerifyError::UnauthorizedWriter(intruder().address()))
    );
}

#[test]
fn resigned_header_still_fails_authorization() {
    // An intruder re-signing a tampered header produces a valid signature,
    // just not from an authorized writer.
    let mut request = request_with(ConsistencyLevel::Quorum);
    request.entry.header.entry_version = 99;
    request.entry.header_signature = intruder()
        .sign_hash(&request.entry.header.signing_hash().unwrap())
        .unwrap();
    assert_eq!(
        verifier().verify(&request),
        Err(VerifyError::UnauthorizedWriter(intruder().address()))
    );
}

#[test]
fn entry_without_cheques_is_refused() {
    let entry = DataEntryBuilder::new("shop", "orders")
        .field("item", FieldValue::new(2, b"widget".as_slice()))
        .sign(&writer(), &banker())
        .unwrap();
    let request = DataModificationRequest {
        consistency: ConsistencyLevel::Quorum,
        entry,
    };
    assert_eq!(verifier().verify(&request), Err(VerifyError::MissingCheques));
}

#[test]
fn unserved_cheque_range_is_refused() {
    let bogus = EntryKey::from_halves(0xDEAD, 0xBEEF);
    let entry = DataEntryBuilder::new("shop", "orders")
        .field("item", FieldValue::new(2, b"widget".as_slice()))
        .cheque(Cheque {
            timestamp: 0,
            range: bogus,
            number: 4,
            amount: 1,
            receipt_nodes: vec![NodeAddress::from_bytes([0x10; 20])],
        })
        .sign(&writer(), &banker())
        .unwrap();
    let request = DataModificationRequest {
        consistency: ConsistencyLevel::Quorum,
        entry,
    };
    assert_eq!(
        verifier().verify(&request),
        Err(VerifyError::ImplausibleChequeRange(bogus))
    );
}

#[test]
fn empty_receipt_list_is_refused() {
    let entry = DataEntryBuilder::new("shop", "orders")
        .field("item", FieldValue::new(2, b"widget".as_slice()))
        .cheque(Cheque {
            timestamp: 0,
            range: range_start(),
            number: 7,
            amount: 1,
            receipt_nodes: Vec::new(),
        })
        .sign(&writer(), &banker())
        .unwrap();
    let request = DataModificationRequest {
        consistency: ConsistencyLevel::Quorum,
        entry,
    };
    assert_eq!(
        verifier().verify(&request),
        Err(VerifyError::EmptyReceiptList(7))
    );
}
