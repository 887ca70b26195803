use std::io::Write;

use csv::{Writer, WriterBuilder};

use super::{SinkError, TrajectorySink};
use crate::trial::reaction_network::solution::Name;

/// Writes a trajectory as delimited text: a `#time` header followed by one row per snapshot.
///
/// Space separated unless another delimiter is given.
pub struct CsvSink<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_delimiter(writer, b' ')
    }

    pub fn with_delimiter(writer: W, delimiter: u8) -> Self {
        Self {
            writer: WriterBuilder::new().delimiter(delimiter).from_writer(writer),
        }
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer.into_inner().map_err(|error| SinkError::Io(error.into_error()))
    }
}

impl<W: Write> TrajectorySink for CsvSink<W> {
    fn header(&mut self, species: &[Name]) -> Result<(), SinkError> {
        let mut record = Vec::with_capacity(species.len() + 1);
        record.push("#time");
        record.extend(species.iter().map(|name| name.0.as_str()));
        self.writer.write_record(&record)?;
        Ok(())
    }

    fn snapshot(&mut self, time: f64, quantities: &[f64]) -> Result<(), SinkError> {
        self.writer.write_field(time.to_string())?;
        for quantity in quantities {
            self.writer.write_field(quantity.to_string())?;
        }
        self.writer.write_record(None::<&[u8]>)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let mut sink = CsvSink::new(Vec::new());
        sink.header(&[Name::from("A"), Name::from("B")]).unwrap();
        sink.snapshot(0.0, &[100.0, 0.0]).unwrap();
        sink.snapshot(0.5, &[97.0, 3.25]).unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(text, "#time A B\n0 100 0\n0.5 97 3.25\n");
    }

    #[test]
    fn delimiter_is_configurable() {
        let mut sink = CsvSink::with_delimiter(Vec::new(), b',');
        sink.header(&[Name::from("X")]).unwrap();
        sink.snapshot(1.0, &[2.0]).unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(text, "#time,X\n1,2\n");
    }
}
