use crate::core::transformer::{apply_mapper, ChunkTransform};
use crate::domain::model::Record;
use crate::domain::ports::RecordMapper;
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing but whitespace seen so far.
    Start,
    InArray,
    AfterArray,
    /// Top-level value is not an array; buffered until end of input.
    Value,
}

/// Streams a top-level JSON array element by element, regardless of where the
/// chunk boundaries fall.
///
/// The scanner only tracks string and nesting state to find element boundaries;
/// each element is then parsed by `serde_json`, mapped, and written out as soon
/// as its closing delimiter arrives. Memory use is bounded by the largest single
/// element rather than the file.
pub struct IncrementalTransformer<'m> {
    mapper: Option<&'m dyn RecordMapper>,
    state: State,
    element: Vec<u8>,
    element_start: u64,
    depth: usize,
    in_string: bool,
    escaped: bool,
    after_comma: bool,
    offset: u64,
    records_processed: usize,
}

impl<'m> IncrementalTransformer<'m> {
    pub fn new(mapper: Option<&'m dyn RecordMapper>) -> Self {
        Self {
            mapper,
            state: State::Start,
            element: Vec::new(),
            element_start: 0,
            depth: 0,
            in_string: false,
            escaped: false,
            after_comma: false,
            offset: 0,
            records_processed: 0,
        }
    }

    fn emit_element(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let index = self.records_processed;
        let text = self.element.trim_ascii();
        if text.is_empty() {
            return Err(EtlError::parse(
                format!("byte {}", self.offset),
                "expected a value between commas",
            ));
        }

        let record: Record = serde_json::from_slice(text).map_err(|e| {
            EtlError::parse(format!("record {} (byte {})", index, self.element_start), e)
        })?;
        let mapped = apply_mapper(self.mapper, record, index)?;

        if index > 0 {
            out.push(b',');
        }
        serde_json::to_writer(&mut *out, &mapped)?;

        self.records_processed += 1;
        self.element.clear();
        Ok(())
    }

    fn scan_array_byte(&mut self, byte: u8, out: &mut Vec<u8>) -> Result<()> {
        if self.in_string {
            self.element.push(byte);
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return Ok(());
        }

        match byte {
            b',' if self.depth == 0 => {
                self.emit_element(out)?;
                self.after_comma = true;
            }
            b']' if self.depth == 0 => {
                // Only `[]` may close with nothing pending.
                if !self.element.is_empty() || self.after_comma {
                    self.emit_element(out)?;
                }
                out.push(b']');
                self.state = State::AfterArray;
            }
            b if b.is_ascii_whitespace() && self.depth == 0 && self.element.is_empty() => {}
            _ => {
                if self.element.is_empty() {
                    self.element_start = self.offset;
                    self.after_comma = false;
                }
                match byte {
                    b'"' => self.in_string = true,
                    b'[' | b'{' => self.depth += 1,
                    b']' | b'}' => self.depth = self.depth.saturating_sub(1),
                    _ => {}
                }
                self.element.push(byte);
            }
        }
        Ok(())
    }
}

impl ChunkTransform for IncrementalTransformer<'_> {
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();

        for &byte in chunk {
            match self.state {
                State::Start => {
                    if byte == b'[' {
                        out.push(b'[');
                        self.state = State::InArray;
                    } else if !byte.is_ascii_whitespace() {
                        self.element.push(byte);
                        self.state = State::Value;
                    }
                }
                State::InArray => self.scan_array_byte(byte, &mut out)?,
                State::AfterArray => {
                    if !byte.is_ascii_whitespace() {
                        return Err(EtlError::parse(
                            format!("byte {}", self.offset),
                            "trailing characters after top-level array",
                        ));
                    }
                }
                State::Value => self.element.push(byte),
            }
            self.offset += 1;
        }

        Ok(out)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        match self.state {
            State::AfterArray => Ok(Vec::new()),
            State::Start => Err(EtlError::parse(
                format!("byte {}", self.offset),
                "empty input, expected a JSON value",
            )),
            State::InArray => Err(EtlError::parse(
                format!("byte {}", self.offset),
                "input ended before the top-level array was closed",
            )),
            State::Value => {
                let value: Record = serde_json::from_slice(&self.element)
                    .map_err(|e| EtlError::parse("top-level value", e))?;
                self.element.clear();
                Ok(serde_json::to_vec(&value)?)
            }
        }
    }

    fn records_processed(&self) -> usize {
        self.records_processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapper::FieldProjection;
    use serde_json::json;

    fn run(tx: &mut IncrementalTransformer<'_>, chunks: &[&[u8]]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(tx.push(chunk)?);
        }
        out.extend(tx.finish()?);
        Ok(out)
    }

    #[test]
    fn test_single_chunk_projection() {
        let projection = FieldProjection::keep(["id", "title"]);
        let mut tx = IncrementalTransformer::new(Some(&projection));

        let out = run(
            &mut tx,
            &[br#"[{"id":1,"title":"A","extra":"x"},{"id":2,"title":"B","extra":"y"}]"#],
        )
        .unwrap();

        assert_eq!(out, br#"[{"id":1,"title":"A"},{"id":2,"title":"B"}]"#.to_vec());
        assert_eq!(tx.records_processed(), 2);
    }

    #[test]
    fn test_elements_reassembled_across_chunks() {
        let projection = FieldProjection::keep(["id", "title"]);
        let mut tx = IncrementalTransformer::new(Some(&projection));

        let out = run(
            &mut tx,
            &[
                br#"  [ {"id":1,"ti"#,
                br#"tle":"A, [still] a \"string\"","body":{"x":[1,"#,
                br#"2]}} , {"id":2,"#,
                br#""title":"B"}"#,
                b"]\n",
            ],
        )
        .unwrap();

        let parsed: Record = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            parsed,
            json!([
                {"id": 1, "title": "A, [still] a \"string\""},
                {"id": 2, "title": "B"}
            ])
        );
    }

    #[test]
    fn test_records_emitted_as_soon_as_complete() {
        let mut tx = IncrementalTransformer::new(None);

        assert_eq!(tx.push(b"[1,").unwrap(), b"[1".to_vec());
        assert_eq!(tx.push(b"22").unwrap(), Vec::<u8>::new());
        assert_eq!(tx.push(b",3]").unwrap(), b",22,3]".to_vec());
        assert!(tx.finish().unwrap().is_empty());
    }

    #[test]
    fn test_empty_array() {
        let mut tx = IncrementalTransformer::new(None);
        assert_eq!(run(&mut tx, &[b"[", b" ", b"]"]).unwrap(), b"[]".to_vec());
        assert_eq!(tx.records_processed(), 0);
    }

    #[test]
    fn test_top_level_object_passes_through() {
        let projection = FieldProjection::keep(["id"]);
        let mut tx = IncrementalTransformer::new(Some(&projection));

        let out = run(&mut tx, &[br#"{"id":1,"#, br#""title":"kept"}"#]).unwrap();
        let parsed: Record = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, json!({"id": 1, "title": "kept"}));
    }

    #[test]
    fn test_source_key_order_is_kept() {
        let mut tx = IncrementalTransformer::new(None);
        let input = br#"[{"title":"A","id":1,"zeta":0,"alpha":2}]"#;

        assert_eq!(run(&mut tx, &[input]).unwrap(), input.to_vec());
    }

    #[test]
    fn test_malformed_element_is_parse_error() {
        let mut tx = IncrementalTransformer::new(None);
        let err = run(&mut tx, &[br#"[{"id":1},{"id":}]"#]).unwrap_err();
        match err {
            EtlError::ParseError { location, .. } => assert!(location.starts_with("record 1")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_comma_is_parse_error() {
        let mut tx = IncrementalTransformer::new(None);
        assert!(matches!(
            run(&mut tx, &[b"[1,2,]"]),
            Err(EtlError::ParseError { .. })
        ));

        let mut tx = IncrementalTransformer::new(None);
        assert!(matches!(
            run(&mut tx, &[b"[1,,2]"]),
            Err(EtlError::ParseError { .. })
        ));
    }

    #[test]
    fn test_unterminated_array_is_parse_error() {
        let mut tx = IncrementalTransformer::new(None);
        assert!(matches!(
            run(&mut tx, &[br#"[{"id":1}"#]),
            Err(EtlError::ParseError { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage_is_parse_error() {
        let mut tx = IncrementalTransformer::new(None);
        assert!(matches!(
            run(&mut tx, &[b"[1] [2]"]),
            Err(EtlError::ParseError { .. })
        ));
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        let mut tx = IncrementalTransformer::new(None);
        assert!(matches!(
            run(&mut tx, &[b"  \n"]),
            Err(EtlError::ParseError { .. })
        ));
    }

    #[test]
    fn test_mapper_error_uses_global_index() {
        let projection = FieldProjection::keep(["id"]);
        let mut tx = IncrementalTransformer::new(Some(&projection));

        let err = run(&mut tx, &[br#"[{"id":1},"#, br#"{"id":2},7]"#]).unwrap_err();
        assert!(matches!(err, EtlError::MapperError { index: 2, .. }));
    }
}
