use crate::domain::model::Record;
use crate::domain::ports::RecordMapper;
use crate::utils::error::{EtlError, Result};

/// A single-input, single-output stage between a [`ReadStream`](crate::core::stream::ReadStream)
/// and a [`WriteStream`](crate::core::stream::WriteStream).
///
/// The orchestrator pushes chunks in source order and writes whatever comes back
/// before pulling the next one.
pub trait ChunkTransform: Send {
    /// Feeds one input chunk; returns the bytes ready for the sink (possibly none).
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<u8>>;

    /// Signals end of input; returns whatever is still buffered.
    fn finish(&mut self) -> Result<Vec<u8>>;

    fn records_processed(&self) -> usize;
}

/// Runs `record` through the mapper, tagging any failure with the record's position.
pub(crate) fn apply_mapper(
    mapper: Option<&dyn RecordMapper>,
    record: Record,
    index: usize,
) -> Result<Record> {
    let Some(mapper) = mapper else {
        return Ok(record);
    };
    mapper.map_record(record).map_err(|e| match e {
        EtlError::MapperError { message, .. } => EtlError::mapper(index, message),
        other => EtlError::mapper(index, other),
    })
}

/// Parses every chunk as a complete JSON value on its own.
///
/// Arrays are mapped element by element; any other value passes through. Each
/// input chunk yields exactly one serialized output chunk, so a source that is
/// read in more than one chunk produces concatenated documents.
pub struct ChunkTransformer<'m> {
    mapper: Option<&'m dyn RecordMapper>,
    chunk_index: usize,
    records_processed: usize,
}

impl<'m> ChunkTransformer<'m> {
    pub fn new(mapper: Option<&'m dyn RecordMapper>) -> Self {
        Self {
            mapper,
            chunk_index: 0,
            records_processed: 0,
        }
    }

    fn map_chunk(&mut self, value: Record) -> Result<Record> {
        match value {
            Record::Array(items) if self.mapper.is_some() => {
                let mut mapped = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    mapped.push(apply_mapper(self.mapper, item, index)?);
                }
                self.records_processed += mapped.len();
                Ok(Record::Array(mapped))
            }
            Record::Array(items) => {
                self.records_processed += items.len();
                Ok(Record::Array(items))
            }
            other => Ok(other),
        }
    }
}

impl ChunkTransform for ChunkTransformer<'_> {
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let location = format!("chunk {}", self.chunk_index);
        self.chunk_index += 1;

        let parsed: Record =
            serde_json::from_slice(chunk).map_err(|e| EtlError::parse(location, e))?;
        let mapped = self.map_chunk(parsed)?;
        Ok(serde_json::to_vec(&mapped)?)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn records_processed(&self) -> usize {
        self.records_processed
    }
}
