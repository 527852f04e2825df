//! Wire format for IPC and extension bridges
//!
//! A small little-endian codec: fixed-width numeric fields plus
//! length-prefixed (u32) UTF-8 strings and byte arrays. Truncated or
//! oversized frames produce an error rather than a panic, and the error
//! surfaces as an unsuccessful [`Response`].

use crate::error::{EngineError, Result};

/// Command identifiers understood by the control bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    SetBypass = 0,
    SetPreset = 1,
    SetNormalizerTarget = 2,
    SetCompressionMode = 3,
    SetNoiseMode = 4,
    SetEqBand = 5,
    StartNoiseLearn = 6,
    StopNoiseLearn = 7,
    Reset = 8,
    GetState = 9,
    GetLevels = 10,
}

impl TryFrom<u8> for CommandType {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::SetBypass),
            1 => Ok(Self::SetPreset),
            2 => Ok(Self::SetNormalizerTarget),
            3 => Ok(Self::SetCompressionMode),
            4 => Ok(Self::SetNoiseMode),
            5 => Ok(Self::SetEqBand),
            6 => Ok(Self::StartNoiseLearn),
            7 => Ok(Self::StopNoiseLearn),
            8 => Ok(Self::Reset),
            9 => Ok(Self::GetState),
            10 => Ok(Self::GetLevels),
            other => Err(EngineError::UnknownCommand(other)),
        }
    }
}

/// A control command as it travels over the bridge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub cmd_type: u8,
    pub param_int: i32,
    pub param_float: f32,
    pub param_string: String,
    pub param_bytes: Vec<u8>,
}

impl Command {
    /// Command with no parameters
    pub fn simple(cmd_type: CommandType) -> Self {
        Self {
            cmd_type: cmd_type as u8,
            ..Self::default()
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            1 + 4 + 4 + 4 + self.param_string.len() + 4 + self.param_bytes.len(),
        );
        out.push(self.cmd_type);
        out.extend_from_slice(&self.param_int.to_le_bytes());
        out.extend_from_slice(&self.param_float.to_le_bytes());
        write_string(&mut out, &self.param_string);
        write_bytes(&mut out, &self.param_bytes);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let cmd = Self {
            cmd_type: reader.u8()?,
            param_int: reader.i32()?,
            param_float: reader.f32()?,
            param_string: reader.string()?,
            param_bytes: reader.bytes()?,
        };
        reader.finish()?;
        Ok(cmd)
    }
}

/// Engine state as reported over the bridge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateInfo {
    pub is_active: bool,
    pub is_bypassed: bool,
    pub input_db: f32,
    pub output_db: f32,
    pub gain_reduction_db: f32,
    pub preset_name: String,
}

impl StateInfo {
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.is_active as u8);
        out.push(self.is_bypassed as u8);
        out.extend_from_slice(&self.input_db.to_le_bytes());
        out.extend_from_slice(&self.output_db.to_le_bytes());
        out.extend_from_slice(&self.gain_reduction_db.to_le_bytes());
        write_string(out, &self.preset_name);
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            is_active: reader.u8()? != 0,
            is_bypassed: reader.u8()? != 0,
            input_db: reader.f32()?,
            output_db: reader.f32()?,
            gain_reduction_db: reader.f32()?,
            preset_name: reader.string()?,
        })
    }
}

/// Reply to a bridge command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub success: bool,
    pub error_message: String,
    pub state: StateInfo,
    pub data: Vec<u8>,
}

impl Response {
    /// Successful response carrying the given state
    pub fn ok(state: StateInfo) -> Self {
        Self {
            success: true,
            state,
            ..Self::default()
        }
    }

    /// Failed response with an error message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: message.into(),
            ..Self::default()
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.error_message.len() + self.data.len());
        out.push(self.success as u8);
        write_string(&mut out, &self.error_message);
        self.state.encode_into(&mut out);
        write_bytes(&mut out, &self.data);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let response = Self {
            success: reader.u8()? != 0,
            error_message: reader.string()?,
            state: StateInfo::decode_from(&mut reader)?,
            data: reader.bytes()?,
        };
        reader.finish()?;
        Ok(response)
    }
}

/// One block of audio as carried over the bridge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u8,
    pub frame_count: u32,
    pub timestamp_ms: u64,
}

impl AudioData {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.samples.len() * 4 + 17);
        out.extend_from_slice(&(self.samples.len() as u32).to_le_bytes());
        for sample in &self.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.push(self.channels);
        out.extend_from_slice(&self.frame_count.to_le_bytes());
        out.extend_from_slice(&self.timestamp_ms.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let count = reader.u32()? as usize;
        if count > reader.remaining() / 4 {
            return Err(EngineError::MalformedCommand(format!(
                "sample count {} exceeds payload",
                count
            )));
        }
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            samples.push(reader.f32()?);
        }
        let audio = Self {
            samples,
            sample_rate: reader.u32()?,
            channels: reader.u8()?,
            frame_count: reader.u32()?,
            timestamp_ms: reader.u64()?,
        };
        reader.finish()?;
        Ok(audio)
    }
}

/// Meter snapshot as carried over the bridge
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterData {
    pub input_peak_db: f32,
    pub input_rms_db: f32,
    pub output_peak_db: f32,
    pub output_rms_db: f32,
    pub gain_reduction: f32,
    pub timestamp_ms: u64,
}

impl MeterData {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(28);
        out.extend_from_slice(&self.input_peak_db.to_le_bytes());
        out.extend_from_slice(&self.input_rms_db.to_le_bytes());
        out.extend_from_slice(&self.output_peak_db.to_le_bytes());
        out.extend_from_slice(&self.output_rms_db.to_le_bytes());
        out.extend_from_slice(&self.gain_reduction.to_le_bytes());
        out.extend_from_slice(&self.timestamp_ms.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let meters = Self {
            input_peak_db: reader.f32()?,
            input_rms_db: reader.f32()?,
            output_peak_db: reader.f32()?,
            output_rms_db: reader.f32()?,
            gain_reduction: reader.f32()?,
            timestamp_ms: reader.u64()?,
        };
        reader.finish()?;
        Ok(meters)
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Bounds-checked little-endian reader
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(EngineError::MalformedCommand(format!(
                "truncated frame: needed {} bytes at offset {}, {} available",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| EngineError::MalformedCommand(format!("invalid utf-8: {}", e)))
    }

    fn bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn finish(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(EngineError::MalformedCommand(format!(
                "{} trailing bytes after frame",
                self.remaining()
            )));
        }
        Ok(())
    }
}
