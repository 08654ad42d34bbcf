//! # Record codec
//!
//! Maps a [`Task`] to and from the contract's packed box record.
//!
//! ## Layout `PackedV1`
//!
//! One box per task, named by the big-endian task id (8 bytes). All integers
//! are unsigned big-endian; fields follow each other with no padding.
//!
//! | Field         | Size          | Notes                                 |
//! |---------------|---------------|---------------------------------------|
//! | `client`      | 32            | raw address                           |
//! | `freelancer`  | 32            | all-zero while unassigned             |
//! | `amount`      | 8             | minor units                           |
//! | `deadline`    | 8             | Unix seconds                          |
//! | `status`      | 1             | `0..=5`, see [`TaskStatus`]           |
//! | `titleLen`    | 2             |                                       |
//! | `title`       | `titleLen`    | UTF-8                                 |
//! | `descLen`     | 2             |                                       |
//! | `description` | `descLen`     | UTF-8                                 |
//! | `proofLen`    | 2             |                                       |
//! | `proof`       | `proofLen`    | UTF-8                                 |
//!
//! Boxes are allocated at a fixed size, so anything after `proof` is padding
//! and ignored on decode.

use crate::address::{Address, ADDRESS_LEN};
use crate::errors::{BoardError, Result};
use crate::types::{Assignee, Task, TaskStatus};

/// Upper bound for any length-prefixed text field.
pub const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// Size of a record with three empty text fields.
pub const FIXED_PART_LEN: usize = ADDRESS_LEN * 2 + 8 + 8 + 1 + 2 * 3;

/// Global-state key holding the number of tasks ever created.
pub const TASK_COUNTER_KEY: &[u8] = b"task_counter";

/// Versioned identifier of the on-ledger record shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordLayout {
    /// Single packed box per task (the only layout this crate reads or writes).
    PackedV1,
}

impl RecordLayout {
    pub const CURRENT: RecordLayout = RecordLayout::PackedV1;

    pub fn version(self) -> u8 {
        match self {
            RecordLayout::PackedV1 => 1,
        }
    }
}

/// Box name for a task record.
pub fn task_box_name(task_id: u64) -> [u8; 8] {
    task_id.to_be_bytes()
}

/// Decode a packed record fetched for `task_id`.
pub fn decode(task_id: u64, bytes: &[u8]) -> Result<Task> {
    let mut reader = Reader::new(bytes);

    let client = reader.address("client")?;
    let freelancer = reader.address("freelancer")?;
    let amount = reader.u64("amount")?;
    let deadline = reader.u64("deadline")?;
    let status = TaskStatus::from_byte(reader.u8("status")?)?;
    let title = reader.text("title")?;
    let description = reader.text("description")?;
    let proof_hash = reader.text("proof")?;

    Ok(Task {
        task_id,
        client,
        freelancer: Assignee::from_wire(freelancer),
        amount,
        deadline,
        status,
        title,
        description,
        proof_hash,
    })
}

/// Encode a task into its packed record. The task id is not part of the
/// record; it lives in the box name.
pub fn encode(task: &Task) -> Result<Vec<u8>> {
    debug_assert!(
        !matches!(task.freelancer, Assignee::Assigned(a) if a.is_zero()),
        "task {} is assigned to the zero address",
        task.task_id
    );
    let title = checked_text("title", &task.title)?;
    let description = checked_text("description", &task.description)?;
    let proof = checked_text("proof", &task.proof_hash)?;

    let mut out =
        Vec::with_capacity(FIXED_PART_LEN + title.len() + description.len() + proof.len());
    out.extend_from_slice(task.client.as_bytes());
    out.extend_from_slice(task.freelancer.to_wire().as_bytes());
    out.extend_from_slice(&task.amount.to_be_bytes());
    out.extend_from_slice(&task.deadline.to_be_bytes());
    out.push(task.status.as_byte());
    for text in [title, description, proof] {
        out.extend_from_slice(&(text.len() as u16).to_be_bytes());
        out.extend_from_slice(text);
    }
    Ok(out)
}

/// Reject text that cannot be length-prefixed with a `u16`.
pub fn checked_text<'a>(field: &'static str, text: &'a str) -> Result<&'a [u8]> {
    let bytes = text.as_bytes();
    if bytes.len() > MAX_FIELD_LEN {
        return Err(BoardError::FieldTooLarge {
            field,
            len: bytes.len(),
        });
    }
    Ok(bytes)
}

/// Bounds-checked cursor over a record.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, offset: 0 }
    }

    fn take(&mut self, field: &'static str, len: usize) -> Result<&'a [u8]> {
        let available = self.bytes.len().saturating_sub(self.offset);
        if len > available {
            return Err(BoardError::TruncatedRecord {
                field,
                offset: self.offset,
                needed: len,
                available,
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    fn address(&mut self, field: &'static str) -> Result<Address> {
        Ok(Address::from_bytes(self.array::<ADDRESS_LEN>(field)?))
    }

    fn u64(&mut self, field: &'static str) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array(field)?))
    }

    fn u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.array::<1>(field)?[0])
    }

    fn text(&mut self, field: &'static str) -> Result<String> {
        let len = u16::from_be_bytes(self.array(field)?) as usize;
        let raw = self.take(field, len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| BoardError::InvalidEncoding { field })
    }
}
