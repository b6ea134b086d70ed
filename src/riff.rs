//! There's an abomination called RMID, MIDI embedded in a RIFF file.
//! Support for these files is provided by unwrapping the input slice, stripping away the RIFF
//! wrappers around the raw SMF file.

use crate::prelude::*;

/// Reads RIFF chunks: a 4-byte id, a little-endian length and a payload padded to an even size.
struct RiffChunks<'a>(ByteCursor<'a>);
impl<'a> Iterator for RiffChunks<'a> {
    type Item = ([u8; 4], &'a [u8]);
    fn next(&mut self) -> Option<([u8; 4], &'a [u8])> {
        let head = self.0.take(8).ok()?;
        let id = [head[0], head[1], head[2], head[3]];
        let len = u32::from_le_bytes([head[4], head[5], head[6], head[7]]) as usize;
        let data = match self.0.take(len) {
            Ok(data) => data,
            //Truncated chunk, use whatever is left
            Err(_) => self.0.take(self.0.remain()).ok()?,
        };
        if len % 2 == 1 {
            let _pad = self.0.take(1);
        }
        Some((id, data))
    }
}

/// Extract the SMF bytes from the `data` chunk of an RMID file.
pub fn unwrap(raw: &[u8]) -> Result<&[u8]> {
    let (id, riff) = RiffChunks(ByteCursor::new(raw))
        .next()
        .ok_or(err_invalid!("no main riff chunk"))?;
    ensure!(&id == b"RIFF", err_invalid!("invalid main riff chunk"));
    let mut riff = ByteCursor::new(riff);
    let formtype = riff
        .take(4)
        .map_err(|_| err_invalid!("failed to read riff formtype"))?;
    ensure!(formtype == b"RMID", err_invalid!("not an rmid riff file"));
    for (id, chunk) in RiffChunks(riff) {
        if &id == b"data" {
            return Ok(chunk);
        }
    }
    bail!(err_invalid!("no rmid data chunk"))
}
