#![cfg(unix)]

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use widestream_core::{FileStream, OpenMode, StreamError};

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(tag: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let name = format!("widestream-swap-{tag}-{}-{nanos}.txt", std::process::id());
        Self {
            path: std::env::temp_dir().join(name),
        }
    }

    fn name(&self) -> &str {
        self.path.to_str().unwrap()
    }

    fn read(&self) -> Vec<u8> {
        fs::read(&self.path).unwrap()
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Writes "FooBar" and "HelloWorld" through two streams, swapping handles
/// and borrowed buffers while output is pending. Returns the two files.
fn write_foobar_helloworld() -> (TempFile, TempFile) {
    let foo = TempFile::new("foo");
    let hello = TempFile::new("hello");

    let mut buffer1 = [0u8; 3];
    let mut buffer2 = [0u8; 5];
    let mut buf1 = FileStream::with_buffer(&mut buffer1);
    let mut buf2 = FileStream::with_buffer(&mut buffer2);

    buf1.open(foo.name(), OpenMode::OUT).unwrap();
    buf1.swap(&mut buf2);
    assert!(!buf1.is_open());
    assert!(buf2.is_open());
    assert_eq!(buf1.buffer_capacity(), 5);
    assert_eq!(buf2.buffer_capacity(), 3);
    buf1.open(hello.name(), OpenMode::OUT | OpenMode::BINARY).unwrap();

    buf1.write_byte(b'H').unwrap();
    buf1.write_block(b"ello").unwrap();
    buf2.write_byte(b'F').unwrap();
    buf2.write_block(b"oo").unwrap();
    buf2.swap(&mut buf1);
    buf1.write_byte(b'B').unwrap();
    buf1.write_block(b"ar").unwrap();
    buf2.write_byte(b'W').unwrap();
    buf2.write_block(b"orld").unwrap();

    buf1.close().unwrap();
    assert!(!buf1.is_open());
    assert!(buf2.is_open());
    buf1.swap(&mut buf2);
    assert!(buf1.is_open());
    assert!(!buf2.is_open());
    buf1.close().unwrap();
    assert!(!buf1.is_open());
    assert!(!buf2.is_open());

    assert_eq!(foo.read(), b"FooBar");
    assert_eq!(hello.read(), b"HelloWorld");
    (foo, hello)
}

#[test]
fn swap_exchanges_handles_and_buffers() {
    write_foobar_helloworld();
}

#[test]
fn swap_exchanges_mode_and_buffer_ownership() {
    let (foo, hello) = write_foobar_helloworld();

    let mut buffer = [0u8; 3];
    let mut buf1 = FileStream::with_buffer(&mut buffer);
    let mut buf2 = FileStream::new();
    buf1.open(foo.name(), OpenMode::OUT).unwrap();
    buf2.open(hello.name(), OpenMode::IN).unwrap();
    buf1.write_byte(b'B').unwrap();
    assert_eq!(buf2.read_byte().unwrap(), Some(b'H'));

    buf1.swap(&mut buf2);
    assert!(buf1.owns_buffer());
    assert!(!buf2.owns_buffer());
    assert!(matches!(buf1.write_byte(b'x'), Err(StreamError::NotWritable)));
    assert!(matches!(buf2.read_byte(), Err(StreamError::NotReadable)));
    assert_eq!(buf1.read_byte().unwrap(), Some(b'e'));
    buf2.write_byte(b'a').unwrap();

    buf2.swap(&mut buf1);
    assert!(matches!(buf2.write_byte(b'x'), Err(StreamError::NotWritable)));
    assert!(matches!(buf1.read_byte(), Err(StreamError::NotReadable)));
    assert_eq!(buf2.read_byte().unwrap(), Some(b'l'));
    assert_eq!(buf1.write_block(b"zXYZ").unwrap(), 4);

    std::mem::swap(&mut buf2, &mut buf1);
    buf1.close().unwrap();
    buf2.close().unwrap();
    assert_eq!(foo.read(), b"BazXYZ");
    assert_eq!(hello.read(), b"HelloWorld");
}

#[test]
fn swap_keeps_unbuffered_look_ahead() {
    let foo = TempFile::new("peek-a");
    let hello = TempFile::new("peek-b");
    fs::write(&foo.path, b"BazXYZ").unwrap();
    fs::write(&hello.path, b"HelloWorld").unwrap();

    let mut buf1 = FileStream::unbuffered();
    let mut buf2 = FileStream::new();
    buf1.open(foo.name(), OpenMode::IN).unwrap();
    buf2.open(hello.name(), OpenMode::IN).unwrap();

    assert_eq!(buf1.peek_byte().unwrap(), Some(b'B'));
    assert_eq!(buf2.peek_byte().unwrap(), Some(b'H'));
    buf1.swap(&mut buf2);
    assert_eq!(buf2.peek_byte().unwrap(), Some(b'B'));
    assert_eq!(buf1.peek_byte().unwrap(), Some(b'H'));

    assert_eq!(buf2.read_byte().unwrap(), Some(b'B'));
    assert_eq!(buf1.read_byte().unwrap(), Some(b'H'));
    assert_eq!(buf2.read_byte().unwrap(), Some(b'a'));
    assert_eq!(buf1.read_byte().unwrap(), Some(b'e'));
    buf1.swap(&mut buf2);
    assert_eq!(buf1.read_byte().unwrap(), Some(b'z'));
    assert_eq!(buf2.read_byte().unwrap(), Some(b'l'));
    buf1.swap(&mut buf2);
    assert_eq!(buf2.peek_byte().unwrap(), Some(b'X'));
    assert_eq!(buf1.peek_byte().unwrap(), Some(b'l'));
}

#[test]
fn swap_keeps_pending_unbuffered_and_buffered_output() {
    let one = TempFile::new("out-1");
    let two = TempFile::new("out-a");

    let mut buf1 = FileStream::unbuffered();
    let mut buf2 = FileStream::new();
    buf1.open(one.name(), OpenMode::OUT).unwrap();
    buf2.open(two.name(), OpenMode::OUT).unwrap();
    buf1.write_byte(b'1').unwrap();
    buf2.write_byte(b'a').unwrap();

    buf1.swap(&mut buf2);
    let before = (buf1.stats(), buf2.stats());
    buf1.write_byte(b'b').unwrap();
    buf2.write_byte(b'2').unwrap();
    buf1.sync().unwrap();
    assert_eq!(two.read(), b"ab");
    buf2.sync().unwrap();
    assert_eq!(one.read(), b"12");
    assert_ne!(before, (buf1.stats(), buf2.stats()));

    buf1.swap(&mut buf2);
    buf1.sync().unwrap();
    assert_eq!(one.read(), b"12");
    buf2.sync().unwrap();
    assert_eq!(two.read(), b"ab");
    buf1.write_byte(b'3').unwrap();
    buf2.write_byte(b'c').unwrap();

    buf1.swap(&mut buf2);
    buf1.sync().unwrap();
    assert_eq!(two.read(), b"abc");
    buf2.sync().unwrap();
    assert_eq!(one.read(), b"123");
}
