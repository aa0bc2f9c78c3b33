//! The data-entry model: typed views over the element tree, signing hashes,
//! and the fields trie.
//!
//! A [`DataEntry`] carries two independently signed regions. The header
//! signature covers the encoded `EntryHeader` element, so it transitively
//! covers every field through the fields hash. The cheques signature covers
//! the concatenated encoded `Cheque` elements. Both hashes are Keccak-256
//! over the exact wire bytes; re-encoding must therefore be canonical.

use bytes::Bytes;
use coolbase_codec::{
    decode_date, decode_string, decode_unsigned, encode_date, encode_string, encode_unsigned,
    ConsistencyLevel, ElementReader, ElementWriter, UnknownTagPolicy,
};
use coolbase_core::digest::keccak256;
use coolbase_core::{
    Address, EntryKey, Hash256, Keypair, NodeAddress, RecoverableSignature, SIGNATURE_WIRE_LEN,
};
use coolbase_trie::BinaryTrie;

use crate::error::WireError;
use crate::tags;

/// Convert a leaf value into a fixed-size array, rejecting other lengths.
fn fixed<const N: usize>(value: &[u8]) -> Result<[u8; N], WireError> {
    value
        .try_into()
        .map_err(|_| coolbase_codec::CodecError::InvalidValueLength {
            expected: N,
            got: value.len(),
        })
        .map_err(WireError::from)
}

fn take_once<T>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<(), WireError> {
    if slot.is_some() {
        return Err(WireError::DuplicateElement(name));
    }
    *slot = Some(value);
    Ok(())
}

fn require<T>(slot: Option<T>, name: &'static str) -> Result<T, WireError> {
    slot.ok_or(WireError::MissingElement(name))
}

/// The kind of modification an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Insert,
    Update,
    Delete,
}

impl EntryType {
    /// The wire code.
    pub fn code(&self) -> u64 {
        match self {
            Self::Insert => 1,
            Self::Update => 2,
            Self::Delete => 3,
        }
    }

    /// Decode from the wire code.
    pub fn from_code(code: u64) -> Result<Self, WireError> {
        match code {
            1 => Ok(Self::Insert),
            2 => Ok(Self::Update),
            3 => Ok(Self::Delete),
            other => Err(WireError::InvalidEntryType(other)),
        }
    }
}

/// The signed header of a data entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntryHeader {
    pub tablespace: String,
    pub table: String,
    /// Monotonic per-record modification counter.
    pub entry_version: u64,
    pub entry_type: EntryType,
    /// Date-epoch nanoseconds.
    pub timestamp: i64,
    /// Root of the fields trie.
    pub fields_hash: Hash256,
}

impl DataEntryHeader {
    /// The write graph for this header.
    pub fn to_writer(&self) -> ElementWriter {
        ElementWriter::container(tags::ENTRY_HEADER)
            .with(ElementWriter::leaf(
                tags::TABLESPACE_NAME,
                encode_string(&self.tablespace),
            ))
            .with(ElementWriter::leaf(
                tags::TABLE_NAME,
                encode_string(&self.table),
            ))
            .with(ElementWriter::leaf(
                tags::ENTRY_VERSION,
                encode_unsigned(self.entry_version),
            ))
            .with(ElementWriter::leaf(
                tags::ENTRY_TYPE,
                encode_unsigned(self.entry_type.code()),
            ))
            .with(ElementWriter::leaf(
                tags::TIMESTAMP,
                encode_date(self.timestamp),
            ))
            .with(ElementWriter::leaf(
                tags::FIELDS_HASH,
                self.fields_hash.as_bytes().to_vec(),
            ))
    }

    /// The hash the header signature is made over: Keccak-256 of the full
    /// encoded `EntryHeader` element, header bytes included.
    pub fn signing_hash(&self) -> Result<Hash256, WireError> {
        Ok(keccak256(&self.to_writer().to_bytes()?))
    }

    /// Decode from an `EntryHeader` element's value bytes.
    pub fn decode(value: &[u8], policy: UnknownTagPolicy) -> Result<Self, WireError> {
        let mut reader = ElementReader::new(value, &tags::ENTRY_HEADER_CONTEXT, policy);
        let mut tablespace = None;
        let mut table = None;
        let mut entry_version = None;
        let mut entry_type = None;
        let mut timestamp = None;
        let mut fields_hash = None;

        while let Some(element) = reader.next_element()? {
            match element.tag {
                t if t == tags::TABLESPACE_NAME => {
                    take_once(&mut tablespace, decode_string(element.value)?, "TablespaceName")?
                }
                t if t == tags::TABLE_NAME => {
                    take_once(&mut table, decode_string(element.value)?, "TableName")?
                }
                t if t == tags::ENTRY_VERSION => take_once(
                    &mut entry_version,
                    decode_unsigned(element.value)?,
                    "EntryVersion",
                )?,
                t if t == tags::ENTRY_TYPE => take_once(
                    &mut entry_type,
                    EntryType::from_code(decode_unsigned(element.value)?)?,
                    "EntryType",
                )?,
                t if t == tags::TIMESTAMP => {
                    take_once(&mut timestamp, decode_date(element.value)?, "Timestamp")?
                }
                t if t == tags::FIELDS_HASH => take_once(
                    &mut fields_hash,
                    Hash256::from_bytes(fixed(element.value)?),
                    "FieldsHash",
                )?,
                _ => {}
            }
        }

        Ok(Self {
            tablespace: require(tablespace, "TablespaceName")?,
            table: require(table, "TableName")?,
            entry_version: require(entry_version, "EntryVersion")?,
            entry_type: require(entry_type, "EntryType")?,
            timestamp: require(timestamp, "Timestamp")?,
            fields_hash: require(fields_hash, "FieldsHash")?,
        })
    }
}

/// A field's typed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    /// Application-defined type code.
    pub value_type: u64,
    pub data: Bytes,
}

impl FieldValue {
    pub fn new(value_type: u64, data: impl Into<Bytes>) -> Self {
        Self {
            value_type,
            data: data.into(),
        }
    }

    fn to_writer(&self) -> ElementWriter {
        ElementWriter::container(tags::FIELD_VALUE)
            .with(ElementWriter::leaf(
                tags::VALUE_TYPE,
                encode_unsigned(self.value_type),
            ))
            .with(ElementWriter::leaf(tags::VALUE_DATA, self.data.to_vec()))
    }

    fn decode(value: &[u8], policy: UnknownTagPolicy) -> Result<Self, WireError> {
        let mut reader = ElementReader::new(value, &tags::FIELD_VALUE_CONTEXT, policy);
        let mut value_type = None;
        let mut data = None;
        while let Some(element) = reader.next_element()? {
            match element.tag {
                t if t == tags::VALUE_TYPE => {
                    take_once(&mut value_type, decode_unsigned(element.value)?, "ValueType")?
                }
                t if t == tags::VALUE_DATA => take_once(
                    &mut data,
                    Bytes::copy_from_slice(element.value),
                    "ValueData",
                )?,
                _ => {}
            }
        }
        Ok(Self {
            value_type: require(value_type, "ValueType")?,
            data: require(data, "ValueData")?,
        })
    }
}

/// One named field of an entry, carrying its own content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntryField {
    pub name: String,
    pub value: FieldValue,
    pub field_hash: Hash256,
}

impl DataEntryField {
    /// Create a field with its hash computed from name and value.
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        let name = name.into();
        let field_hash = Self::compute_hash(&name, &value);
        Self {
            name,
            value,
            field_hash,
        }
    }

    /// Keccak-256 over length-prefixed name, type code, and data, so no
    /// boundary ambiguity can alias two distinct fields to the same hash.
    pub fn compute_hash(name: &str, value: &FieldValue) -> Hash256 {
        let type_bytes = encode_unsigned(value.value_type);
        let mut buf =
            Vec::with_capacity(12 + name.len() + type_bytes.len() + value.data.len());
        buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf.extend_from_slice(&(type_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&type_bytes);
        buf.extend_from_slice(&(value.data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&value.data);
        keccak256(&buf)
    }

    /// True if the carried hash matches the name and value.
    pub fn verify_hash(&self) -> bool {
        self.field_hash == Self::compute_hash(&self.name, &self.value)
    }

    /// The field's position in the fields trie: the first 16 bytes of
    /// Keccak-256 of the field name.
    pub fn trie_key(&self) -> EntryKey {
        let hash = keccak256(self.name.as_bytes());
        let mut key = [0u8; 16];
        key.copy_from_slice(&hash.as_bytes()[..16]);
        EntryKey::from_bytes(key)
    }

    fn to_writer(&self) -> ElementWriter {
        ElementWriter::container(tags::ENTRY_FIELD)
            .with(ElementWriter::leaf(
                tags::FIELD_NAME,
                encode_string(&self.name),
            ))
            .with(self.value.to_writer())
            .with(ElementWriter::leaf(
                tags::FIELD_HASH,
                self.field_hash.as_bytes().to_vec(),
            ))
    }

    fn decode(value: &[u8], policy: UnknownTagPolicy) -> Result<Self, WireError> {
        let mut reader = ElementReader::new(value, &tags::ENTRY_FIELD_CONTEXT, policy);
        let mut name = None;
        let mut field_value = None;
        let mut field_hash = None;
        while let Some(element) = reader.next_element()? {
            match element.tag {
                t if t == tags::FIELD_NAME => {
                    take_once(&mut name, decode_string(element.value)?, "FieldName")?
                }
                t if t == tags::FIELD_VALUE => take_once(
                    &mut field_value,
                    FieldValue::decode(element.value, policy)?,
                    "FieldValue",
                )?,
                t if t == tags::FIELD_HASH => take_once(
                    &mut field_hash,
                    Hash256::from_bytes(fixed(element.value)?),
                    "FieldHash",
                )?,
                _ => {}
            }
        }
        Ok(Self {
            name: require(name, "FieldName")?,
            value: require(field_value, "FieldValue")?,
            field_hash: require(field_hash, "FieldHash")?,
        })
    }
}

/// Root of the fields trie for a field set.
///
/// Keys are [`DataEntryField::trie_key`], payloads the field hashes, so the
/// root commits to the complete field set regardless of wire order.
pub fn fields_root_hash(fields: &[DataEntryField]) -> Hash256 {
    let mut trie = BinaryTrie::new();
    for field in fields {
        // A freshly built trie is never frozen.
        let _ = trie.insert(field.trie_key(), field.field_hash.as_bytes().to_vec());
    }
    trie.root_hash()
}

/// A storage promise: the range a node set commits to hold, with the
/// receipt list naming the committing nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cheque {
    /// Date-epoch nanoseconds.
    pub timestamp: i64,
    /// Start of the key range the cheque covers.
    pub range: EntryKey,
    /// Monotonic cheque counter for the issuing node.
    pub number: u64,
    pub amount: u64,
    pub receipt_nodes: Vec<NodeAddress>,
}

impl Cheque {
    fn to_writer(&self) -> ElementWriter {
        let mut writer = ElementWriter::container(tags::CHEQUE)
            .with(ElementWriter::leaf(
                tags::CHEQUE_TIMESTAMP,
                encode_date(self.timestamp),
            ))
            .with(ElementWriter::leaf(
                tags::CHEQUE_RANGE,
                self.range.as_bytes().to_vec(),
            ))
            .with(ElementWriter::leaf(
                tags::CHEQUE_NUMBER,
                encode_unsigned(self.number),
            ))
            .with(ElementWriter::leaf(
                tags::CHEQUE_AMOUNT,
                encode_unsigned(self.amount),
            ));
        for node in &self.receipt_nodes {
            writer.push(ElementWriter::leaf(
                tags::RECEIPT_NODE,
                node.as_bytes().to_vec(),
            ));
        }
        writer
    }

    fn decode(value: &[u8], policy: UnknownTagPolicy) -> Result<Self, WireError> {
        let mut reader = ElementReader::new(value, &tags::CHEQUE_CONTEXT, policy);
        let mut timestamp = None;
        let mut range = None;
        let mut number = None;
        let mut amount = None;
        let mut receipt_nodes = Vec::new();
        while let Some(element) = reader.next_element()? {
            match element.tag {
                t if t == tags::CHEQUE_TIMESTAMP => {
                    take_once(&mut timestamp, decode_date(element.value)?, "ChequeTimestamp")?
                }
                t if t == tags::CHEQUE_RANGE => take_once(
                    &mut range,
                    EntryKey::from_bytes(fixed(element.value)?),
                    "ChequeRange",
                )?,
                t if t == tags::CHEQUE_NUMBER => {
                    take_once(&mut number, decode_unsigned(element.value)?, "ChequeNumber")?
                }
                t if t == tags::CHEQUE_AMOUNT => {
                    take_once(&mut amount, decode_unsigned(element.value)?, "ChequeAmount")?
                }
                t if t == tags::RECEIPT_NODE => {
                    receipt_nodes.push(NodeAddress::from_bytes(fixed(element.value)?))
                }
                _ => {}
            }
        }
        Ok(Self {
            timestamp: require(timestamp, "ChequeTimestamp")?,
            range: require(range, "ChequeRange")?,
            number: require(number, "ChequeNumber")?,
            amount: require(amount, "ChequeAmount")?,
            receipt_nodes,
        })
    }
}

/// The hash the cheques signature is made over: Keccak-256 of the encoded
/// `Cheque` elements concatenated in wire order.
pub fn cheques_signing_hash(cheques: &[Cheque]) -> Result<Hash256, WireError> {
    let mut buf = Vec::new();
    for cheque in cheques {
        cheque.to_writer().encode_into(&mut buf)?;
    }
    Ok(keccak256(&buf))
}

/// A complete, doubly signed data entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntry {
    pub header: DataEntryHeader,
    pub header_signature: RecoverableSignature,
    pub cheques: Vec<Cheque>,
    pub cheques_signature: RecoverableSignature,
    pub fields: Vec<DataEntryField>,
}

impl DataEntry {
    /// The write graph for this entry.
    pub fn to_writer(&self) -> ElementWriter {
        let mut writer = ElementWriter::container(tags::DATA_ENTRY)
            .with(self.header.to_writer())
            .with(ElementWriter::leaf(
                tags::HEADER_SIGNATURE,
                self.header_signature.to_bytes().to_vec(),
            ));
        for cheque in &self.cheques {
            writer.push(cheque.to_writer());
        }
        writer.push(ElementWriter::leaf(
            tags::CHEQUES_SIGNATURE,
            self.cheques_signature.to_bytes().to_vec(),
        ));
        for field in &self.fields {
            writer.push(field.to_writer());
        }
        writer
    }

    /// Recover the address that signed the header.
    pub fn header_signer(&self) -> Result<Address, WireError> {
        let hash = self.header.signing_hash()?;
        Ok(self.header_signature.recover_address(&hash)?)
    }

    /// Recover the address that signed the cheque list.
    pub fn cheques_signer(&self) -> Result<Address, WireError> {
        let hash = cheques_signing_hash(&self.cheques)?;
        Ok(self.cheques_signature.recover_address(&hash)?)
    }

    /// Decode from a `DataEntry` element's value bytes.
    pub fn decode(value: &[u8], policy: UnknownTagPolicy) -> Result<Self, WireError> {
        let mut reader = ElementReader::new(value, &tags::DATA_ENTRY_CONTEXT, policy);
        let mut header = None;
        let mut header_signature = None;
        let mut cheques = Vec::new();
        let mut cheques_signature = None;
        let mut fields = Vec::new();
        while let Some(element) = reader.next_element()? {
            match element.tag {
                t if t == tags::ENTRY_HEADER => take_once(
                    &mut header,
                    DataEntryHeader::decode(element.value, policy)?,
                    "EntryHeader",
                )?,
                t if t == tags::HEADER_SIGNATURE => take_once(
                    &mut header_signature,
                    decode_signature(element.value)?,
                    "HeaderSignature",
                )?,
                t if t == tags::CHEQUE => cheques.push(Cheque::decode(element.value, policy)?),
                t if t == tags::CHEQUES_SIGNATURE => take_once(
                    &mut cheques_signature,
                    decode_signature(element.value)?,
                    "ChequesSignature",
                )?,
                t if t == tags::ENTRY_FIELD => {
                    fields.push(DataEntryField::decode(element.value, policy)?)
                }
                _ => {}
            }
        }
        Ok(Self {
            header: require(header, "EntryHeader")?,
            header_signature: require(header_signature, "HeaderSignature")?,
            cheques,
            cheques_signature: require(cheques_signature, "ChequesSignature")?,
            fields,
        })
    }
}

fn decode_signature(value: &[u8]) -> Result<RecoverableSignature, WireError> {
    let bytes: [u8; SIGNATURE_WIRE_LEN] = fixed(value)?;
    Ok(RecoverableSignature::from_bytes(&bytes)?)
}

/// A modification request: a consistency requirement plus the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataModificationRequest {
    pub consistency: ConsistencyLevel,
    pub entry: DataEntry,
}

impl DataModificationRequest {
    /// The write graph for the full request element.
    pub fn to_writer(&self) -> ElementWriter {
        ElementWriter::container(tags::MODIFICATION_REQUEST)
            .with(ElementWriter::leaf(
                tags::REQUEST_CONSISTENCY,
                vec![self.consistency.to_byte() as u8],
            ))
            .with(self.entry.to_writer())
    }

    /// Encode the full request element to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        Ok(self.to_writer().to_bytes()?)
    }

    /// Decode from a `ModificationRequest` element's value bytes.
    pub fn decode(value: &[u8], policy: UnknownTagPolicy) -> Result<Self, WireError> {
        let mut reader = ElementReader::new(value, &tags::MODIFICATION_REQUEST_CONTEXT, policy);
        let mut consistency = None;
        let mut entry = None;
        while let Some(element) = reader.next_element()? {
            match element.tag {
                t if t == tags::REQUEST_CONSISTENCY => {
                    let byte: [u8; 1] = fixed(element.value)?;
                    take_once(
                        &mut consistency,
                        ConsistencyLevel::from_byte(byte[0] as i8)?,
                        "RequestConsistency",
                    )?
                }
                t if t == tags::DATA_ENTRY => take_once(
                    &mut entry,
                    DataEntry::decode(element.value, policy)?,
                    "DataEntry",
                )?,
                _ => {}
            }
        }
        Ok(Self {
            consistency: require(consistency, "RequestConsistency")?,
            entry: require(entry, "DataEntry")?,
        })
    }
}

/// Assembles and signs a [`DataEntry`].
pub struct DataEntryBuilder {
    tablespace: String,
    table: String,
    entry_version: u64,
    entry_type: EntryType,
    timestamp: i64,
    cheques: Vec<Cheque>,
    fields: Vec<DataEntryField>,
}

impl DataEntryBuilder {
    pub fn new(tablespace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            tablespace: tablespace.into(),
            table: table.into(),
            entry_version: 1,
            entry_type: EntryType::Insert,
            timestamp: 0,
            cheques: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn entry_version(mut self, version: u64) -> Self {
        self.entry_version = version;
        self
    }

    pub fn entry_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = entry_type;
        self
    }

    /// Timestamp in date-epoch nanoseconds.
    pub fn timestamp(mut self, nanos: i64) -> Self {
        self.timestamp = nanos;
        self
    }

    /// Add a field; its hash is computed here.
    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.push(DataEntryField::new(name, value));
        self
    }

    pub fn cheque(mut self, cheque: Cheque) -> Self {
        self.cheques.push(cheque);
        self
    }

    /// Compute the fields hash and sign both regions.
    pub fn sign(
        self,
        header_keypair: &Keypair,
        cheques_keypair: &Keypair,
    ) -> Result<DataEntry, WireError> {
        let header = DataEntryHeader {
            tablespace: self.tablespace,
            table: self.table,
            entry_version: self.entry_version,
            entry_type: self.entry_type,
            timestamp: self.timestamp,
            fields_hash: fields_root_hash(&self.fields),
        };
        let header_signature = header_keypair.sign_hash(&header.signing_hash()?)?;
        let cheques_signature =
            cheques_keypair.sign_hash(&cheques_signing_hash(&self.cheques)?)?;
        Ok(DataEntry {
            header,
            header_signature,
            cheques: self.cheques,
            cheques_signature,
            fields: self.fields,
        })
    }
}
