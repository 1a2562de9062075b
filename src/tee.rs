//! Fan-out writer: one encode pass, two destinations.
//!
//! The transcoder writes its JPEG into a [`TeeWriter`], which forwards every
//! chunk to a *primary* sink (the HTTP response) and a *secondary* sink (the
//! cache entry). The two have different failure policies:
//!
//! - A primary failure aborts the write, since the client is the reason the
//!   work is being done at all.
//! - A secondary failure is recorded and the secondary is dropped from the
//!   fan-out; the primary keeps receiving bytes. The caller inspects
//!   [`TeeWriter::into_parts`] afterwards to decide whether to commit the
//!   secondary.

use std::io::{self, Write};

pub struct TeeWriter<P, S> {
    primary: P,
    secondary: Option<S>,
    secondary_error: Option<io::Error>,
}

impl<P: Write, S: Write> TeeWriter<P, S> {
    pub fn new(primary: P, secondary: Option<S>) -> Self {
        Self {
            primary,
            secondary,
            secondary_error: None,
        }
    }

    /// Split into the primary sink and either the intact secondary or the
    /// error that knocked it out. `Ok(None)` means there never was one.
    pub fn into_parts(self) -> (P, Result<Option<S>, io::Error>) {
        let secondary = match self.secondary_error {
            Some(e) => Err(e),
            None => Ok(self.secondary),
        };
        (self.primary, secondary)
    }

    fn fail_secondary(&mut self, err: io::Error) {
        self.secondary = None;
        self.secondary_error = Some(err);
    }
}

impl<P: Write, S: Write> Write for TeeWriter<P, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.primary.write(buf)?;
        if let Some(secondary) = self.secondary.as_mut()
            && let Err(e) = secondary.write_all(&buf[..n])
        {
            self.fail_secondary(e);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        if let Some(secondary) = self.secondary.as_mut()
            && let Err(e) = secondary.flush()
        {
            self.fail_secondary(e);
        }
        Ok(())
    }
}
