//! On-disk bag layout.
//!
//! The bag itself does not know how it is stored; this module owns the
//! record format.  A bag file is a JSON array of records, one per message,
//! each carrying the topic, the split timestamp, and the raw payload.
//! Schema validation happens here on the way in: every record's topic must
//! be registered, and filtered topics are dropped before the bag is built.

use crate::bag::BagError;
use crate::message::{Message, Timestamp};
use crate::schema::{TopicFilter, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// One stored message record.
#[derive(Debug, Serialize, Deserialize)]
struct BagRecord {
    topic: String,
    secs: u64,
    nsecs: u32,
    data: Vec<u8>,
}

impl From<&Message> for BagRecord {
    fn from(message: &Message) -> Self {
        Self {
            topic: message.topic.clone(),
            secs: message.time.secs,
            nsecs: message.time.nsecs,
            data: message.data.clone(),
        }
    }
}

impl From<BagRecord> for Message {
    fn from(record: BagRecord) -> Self {
        Message::new(
            record.topic,
            Timestamp::new(record.secs, u64::from(record.nsecs)),
            record.data,
        )
    }
}

/// Read and validate the messages stored in a bag file.
pub(crate) fn read_messages(
    registry: &TypeRegistry,
    path: &Path,
    filter: Option<&TopicFilter>,
) -> Result<Vec<Message>, BagError> {
    let file = File::open(path).map_err(|source| BagError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records: Vec<BagRecord> =
        serde_json::from_reader(BufReader::new(file)).map_err(|err| BagError::Format {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

    let mut messages = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        if !registry.contains(&record.topic) {
            return Err(BagError::Format {
                path: path.display().to_string(),
                reason: format!("record {i} has unregistered topic {:?}", record.topic),
            });
        }
        if let Some(filter) = filter {
            if !filter.admits(&record.topic) {
                continue;
            }
        }
        messages.push(Message::from(record));
    }
    Ok(messages)
}

/// Write messages to a bag file, replacing any existing contents.
pub(crate) fn write_messages(path: &Path, messages: &[Message]) -> Result<(), BagError> {
    let file = File::create(path).map_err(|source| BagError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let records: Vec<BagRecord> = messages.iter().map(BagRecord::from).collect();
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &records).map_err(|err| BagError::Format {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    writer.flush().map_err(|source| BagError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.bag");
        std::fs::write(&path, b"not json at all").unwrap();

        let registry = TypeRegistry::new().with("/pos", "geometry_msgs/Vector3");
        assert!(matches!(
            read_messages(&registry, &path, None),
            Err(BagError::Format { .. })
        ));
    }

    #[test]
    fn record_round_trip_preserves_fields() {
        let message = Message::new("/pos", Timestamp::new(3, 14), vec![1, 2, 3]);
        let record = BagRecord::from(&message);
        let back = Message::from(record);
        assert_eq!(back, message);
    }
}
