//! Scenario catalog.
//!
//! Every scenario drives [`FileStream`] against real files in a scratch
//! directory and returns the bytes of the file it produced, so runs can be
//! compared by digest.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use widestream_core::{FileStream, OpenMode, StreamError, Whence};

/// Scenario failure.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("scratch file: {0}")]
    Io(#[from] io::Error),
    #[error("{step}: expected {expected}, got {actual}")]
    Mismatch {
        step: String,
        expected: String,
        actual: String,
    },
}

/// One named scenario.
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    run: fn(&Path) -> Result<Vec<u8>, ScenarioError>,
}

impl Scenario {
    /// Run inside `scratch` and return the produced file contents.
    pub fn run(&self, scratch: &Path) -> Result<Vec<u8>, ScenarioError> {
        (self.run)(scratch)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario").field("name", &self.name).finish()
    }
}

/// All scenarios, in run order.
pub const CATALOG: &[Scenario] = &[
    Scenario {
        name: "open_close",
        description: "open on an open stream fails without creating the file",
        run: open_close,
    },
    Scenario {
        name: "seek_fuzz",
        description: "seeded absolute, relative and end-relative seeks with peeks",
        run: seek_fuzz,
    },
    Scenario {
        name: "seek_64bit",
        description: "relative seek past 2^32, or a clean out-of-range refusal",
        run: seek_64bit,
    },
    Scenario {
        name: "read_write_switch_text",
        description: "read/write switching via seek and sync produces 1b3cd6e890",
        run: read_write_switch_text,
    },
    Scenario {
        name: "read_write_switch_binary",
        description: "read/write switching in binary mode",
        run: read_write_switch_binary,
    },
    Scenario {
        name: "singlechar_positioning",
        description: "per-byte positions survive a 3-byte buffer",
        run: singlechar_positioning,
    },
    Scenario {
        name: "small_buffer_sync",
        description: "mixed single-byte and block writes through a 3-byte buffer",
        run: small_buffer_sync,
    },
    Scenario {
        name: "swap_buffers",
        description: "swap with pending output and borrowed buffers",
        run: swap_buffers,
    },
    Scenario {
        name: "eof_query",
        description: "reads at end of file do not move the position",
        run: eof_query,
    },
    Scenario {
        name: "append",
        description: "append mode writes at end after reading",
        run: append,
    },
];

/// Look up a scenario by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static Scenario> {
    CATALOG.iter().find(|s| s.name == name)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn expect<T: PartialEq + fmt::Debug>(step: &str, expected: T, actual: T) -> Result<(), ScenarioError> {
    if expected == actual {
        return Ok(());
    }
    Err(ScenarioError::Mismatch {
        step: step.to_string(),
        expected: format!("{expected:?}"),
        actual: format!("{actual:?}"),
    })
}

fn scratch_file(dir: &Path, name: &str) -> Result<PathBuf, ScenarioError> {
    let path = dir.join(name);
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(path)
}

/// Deterministic bytes (minstd_rand).
fn seeded_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state * 48_271 % 2_147_483_647;
            state as u8
        })
        .collect()
}

fn text_data() -> Vec<u8> {
    let mut data = b"1234567890".to_vec();
    for c in b'a'..=b'z' {
        data.extend_from_slice(&[c, b'\n']);
    }
    data.extend_from_slice(b"\n\n\n\n");
    data
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

fn open_close(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    let first = scratch_file(dir, "open_close.bin")?;
    let second = scratch_file(dir, "open_close.2.bin")?;

    let mut s = FileStream::new();
    s.open_path(&first, OpenMode::OUT)?;
    match s.open_path(&second, OpenMode::OUT) {
        Err(StreamError::AlreadyOpen) => {}
        other => {
            return Err(ScenarioError::Mismatch {
                step: "second open".into(),
                expected: "AlreadyOpen".into(),
                actual: format!("{other:?}"),
            });
        }
    }
    expect("still open", true, s.is_open())?;
    s.close()?;
    expect("second file created", false, second.exists())?;

    s.open_path(&second, OpenMode::OUT)?;
    s.write_block(b"reopened")?;
    s.close()?;
    Ok(fs::read(&second)?)
}

fn seek_fuzz(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    let path = scratch_file(dir, "seek_fuzz.bin")?;
    let data = seeded_bytes(8192 * 4, 1);
    fs::write(&path, &data)?;

    let mut s = FileStream::new();
    s.open_path(&path, OpenMode::IN | OpenMode::BINARY)?;
    let eof = data.len() as i64;
    let mut rng = 12_345u64;
    let mut next = || {
        rng = rng * 48_271 % 2_147_483_647;
        (rng % eof as u64) as i64
    };
    for i in 0..100 {
        let pos = next();
        expect(&format!("seek start #{i}"), pos as u64, s.seek(pos, Whence::Start)?)?;
        expect(&format!("peek start #{i}"), Some(data[pos as usize]), s.peek_byte()?)?;

        let target = next();
        expect(&format!("seek cur #{i}"), target as u64, s.seek(target - pos, Whence::Current)?)?;
        expect(&format!("tell cur #{i}"), target as u64, s.seek(0, Whence::Current)?)?;
        expect(&format!("peek cur #{i}"), Some(data[target as usize]), s.peek_byte()?)?;

        let target = next();
        expect(&format!("seek end #{i}"), target as u64, s.seek(target - eof, Whence::End)?)?;
        expect(&format!("peek end #{i}"), Some(data[target as usize]), s.peek_byte()?)?;
    }
    expect("seek eof", eof as u64, s.seek(0, Whence::End)?)?;
    expect("peek eof", None, s.peek_byte()?)?;
    s.close()?;
    Ok(fs::read(&path)?)
}

fn seek_64bit(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    let path = scratch_file(dir, "seek_64bit.bin")?;
    fs::write(&path, b"test")?;

    let mut s = FileStream::new();
    s.open_path(&path, OpenMode::IN | OpenMode::BINARY)?;
    expect("known position", 2, s.seek(2, Whence::Start)?)?;
    let offset: i64 = 1 << 33;
    match s.seek(offset, Whence::Current) {
        Ok(pos) => {
            expect("wide seek", offset as u64 + 2, pos)?;
            expect("wide tell", pos, s.seek(0, Whence::Current)?)?;
        }
        Err(StreamError::SeekOutOfRange { .. }) => {
            expect("narrow tell", 2, s.seek(0, Whence::Current)?)?;
        }
        Err(e) => return Err(e.into()),
    }
    s.close()?;
    Ok(fs::read(&path)?)
}

fn read_write_switch(dir: &Path, binary: bool) -> Result<Vec<u8>, ScenarioError> {
    let name = if binary { "switch_binary.bin" } else { "switch_text.txt" };
    let path = scratch_file(dir, name)?;
    let mut mode = OpenMode::IN | OpenMode::OUT | OpenMode::TRUNC;
    if binary {
        mode |= OpenMode::BINARY;
    }

    let mut s = FileStream::new();
    s.open_path(&path, mode)?;
    expect("initial write", 10, s.write_block(b"1234567890")?)?;
    s.seek(0, Whence::Start)?;
    expect("read 1", Some(b'1'), s.read_byte()?)?;
    s.seek(0, Whence::Current)?;
    s.write_byte(b'b')?;
    s.sync()?;
    expect("read 3", Some(b'3'), s.read_byte()?)?;
    let pos2 = s.seek(0, Whence::Current)?;
    s.write_byte(b'c')?;
    s.seek(pos2 as i64, Whence::Start)?;
    expect("read back c", Some(b'c'), s.read_byte()?)?;
    s.seek(0, Whence::Current)?;
    s.write_byte(b'd')?;
    s.sync()?;
    s.seek(0, Whence::Current)?;
    expect("read 6", Some(b'6'), s.read_byte()?)?;
    s.seek(0, Whence::Current)?;
    s.write_byte(b'e')?;
    s.seek(0, Whence::Current)?;
    s.sync()?;
    expect("read 8", Some(b'8'), s.read_byte()?)?;
    s.close()?;

    let produced = fs::read(&path)?;
    expect("file contents", b"1b3cd6e890".as_slice(), produced.as_slice())?;
    Ok(produced)
}

fn read_write_switch_text(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    read_write_switch(dir, false)
}

fn read_write_switch_binary(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    read_write_switch(dir, true)
}

fn singlechar_positioning(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    let path = scratch_file(dir, "singlechar.txt")?;
    let data = text_data();
    let mut storage = [0u8; 3];
    let mut s = FileStream::with_buffer(&mut storage);
    s.open_path(&path, OpenMode::IN | OpenMode::OUT | OpenMode::TRUNC)?;

    let mut positions = Vec::with_capacity(data.len());
    for &b in &data {
        s.write_byte(b)?;
        positions.push(s.seek(0, Whence::Current)?);
    }
    s.seek(0, Whence::Start)?;
    for (i, &b) in data.iter().enumerate() {
        expect(&format!("byte {i}"), Some(b), s.read_byte()?)?;
        expect(&format!("position {i}"), positions[i], s.seek(0, Whence::Current)?)?;
    }
    s.close()?;
    Ok(fs::read(&path)?)
}

fn small_buffer_sync(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    let path = scratch_file(dir, "small_buffer_sync.txt")?;
    let data = text_data();
    for single_ops in 0..=3usize {
        for block in [0usize, 2, 3, 6, 7] {
            if single_ops + block == 0 {
                continue;
            }
            let mut storage = [0u8; 3];
            let mut s = FileStream::with_buffer(&mut storage);
            s.open_path(&path, OpenMode::OUT | OpenMode::TRUNC)?;
            let mut i = 0;
            while i < data.len() {
                for _ in 0..single_ops {
                    if i == data.len() {
                        break;
                    }
                    s.write_byte(data[i])?;
                    i += 1;
                }
                if block != 0 {
                    let n = (data.len() - i).min(block);
                    s.write_block(&data[i..i + n])?;
                    i += n;
                }
                s.sync()?;
                let step = format!("sc:{single_ops} buf:{block} i:{i}");
                expect(&step, &data[..i], fs::read(&path)?.as_slice())?;
            }
            s.close()?;
        }
    }
    Ok(fs::read(&path)?)
}

fn swap_buffers(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    let foo = scratch_file(dir, "swap_foo.txt")?;
    let hello = scratch_file(dir, "swap_hello.txt")?;

    let mut buffer1 = [0u8; 3];
    let mut buffer2 = [0u8; 5];
    let mut buf1 = FileStream::with_buffer(&mut buffer1);
    let mut buf2 = FileStream::with_buffer(&mut buffer2);

    buf1.open_path(&foo, OpenMode::OUT)?;
    buf1.swap(&mut buf2);
    expect("swapped open state", (false, true), (buf1.is_open(), buf2.is_open()))?;
    buf1.open_path(&hello, OpenMode::OUT | OpenMode::BINARY)?;

    buf1.write_byte(b'H')?;
    buf1.write_block(b"ello")?;
    buf2.write_byte(b'F')?;
    buf2.write_block(b"oo")?;
    buf2.swap(&mut buf1);
    buf1.write_byte(b'B')?;
    buf1.write_block(b"ar")?;
    buf2.write_byte(b'W')?;
    buf2.write_block(b"orld")?;

    buf1.close()?;
    buf1.swap(&mut buf2);
    buf1.close()?;
    expect("both closed", (false, false), (buf1.is_open(), buf2.is_open()))?;

    let mut produced = fs::read(&foo)?;
    expect("first file", b"FooBar".as_slice(), produced.as_slice())?;
    let second = fs::read(&hello)?;
    expect("second file", b"HelloWorld".as_slice(), second.as_slice())?;
    produced.extend_from_slice(&second);
    Ok(produced)
}

fn eof_query(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    let path = scratch_file(dir, "eof_query.txt")?;
    fs::write(&path, b"xyz")?;

    let mut s = FileStream::new();
    s.open_path(&path, OpenMode::IN)?;
    expect("seek end", 3, s.seek(0, Whence::End)?)?;
    expect("read at eof", None, s.read_byte()?)?;
    expect("tell after eof", 3, s.seek(0, Whence::Current)?)?;
    let mut block = [0u8; 8];
    expect("block at eof", 0, s.read_block(&mut block)?)?;
    expect("tell after block", 3, s.seek(0, Whence::Current)?)?;
    s.close()?;
    Ok(fs::read(&path)?)
}

fn append(dir: &Path) -> Result<Vec<u8>, ScenarioError> {
    let path = scratch_file(dir, "append.txt")?;
    fs::write(&path, b"head")?;

    let mut s = FileStream::new();
    s.open_path(&path, OpenMode::IN | OpenMode::APP)?;
    expect("initial position", 4, s.seek(0, Whence::Current)?)?;
    s.seek(0, Whence::Start)?;
    expect("first byte", Some(b'h'), s.read_byte()?)?;
    s.write_block(b"-tail")?;
    expect("position after append", 9, s.seek(0, Whence::Current)?)?;
    s.close()?;

    let produced = fs::read(&path)?;
    expect("file contents", b"head-tail".as_slice(), produced.as_slice())?;
    Ok(produced)
}
