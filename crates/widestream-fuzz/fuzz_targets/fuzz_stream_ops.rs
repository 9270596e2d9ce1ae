#![no_main]
use libfuzzer_sys::fuzz_target;
use widestream_core::{BufferedFileStream, MemFile, Whence, parse_mode};

/// Plain file model: contents plus a cursor.
struct Model {
    data: Vec<u8>,
    pos: usize,
}

impl Model {
    fn write(&mut self, src: &[u8]) {
        let end = self.pos + src.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(src);
        self.pos = end;
    }

    fn read(&mut self, n: usize) -> &[u8] {
        let start = self.pos.min(self.data.len());
        let end = (start + n).min(self.data.len());
        self.pos = self.pos.max(end);
        &self.data[start..end]
    }

    fn seek(&mut self, target: i64) -> Option<u64> {
        let pos = usize::try_from(target).ok()?;
        self.pos = pos;
        Some(pos as u64)
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&cap, ops)) = data.split_first() else {
        return;
    };
    let Some(flags) = parse_mode(b"w+b") else {
        return;
    };
    let file = MemFile::new();
    let mut stream: BufferedFileStream<'_, MemFile> = BufferedFileStream::new();
    if stream.set_buffer_capacity(usize::from(cap % 9)).is_err() {
        return;
    }
    if stream.attach(file.clone(), flags).is_err() {
        return;
    }
    let mut model = Model {
        data: Vec::new(),
        pos: 0,
    };

    let mut ops = ops.iter().copied();
    while let (Some(op), Some(arg)) = (ops.next(), ops.next()) {
        match op % 8 {
            0 => {
                stream.write_byte(arg).unwrap();
                model.write(&[arg]);
            }
            1 => {
                let block: Vec<u8> = (0..arg % 17).map(|i| arg.wrapping_add(i)).collect();
                assert_eq!(stream.write_block(&block).unwrap(), block.len());
                model.write(&block);
            }
            2 => {
                let got = stream.read_byte().unwrap();
                assert_eq!(got, model.read(1).first().copied());
            }
            3 => {
                let mut dest = vec![0u8; usize::from(arg % 17)];
                let n = stream.read_block(&mut dest).unwrap();
                assert_eq!(&dest[..n], model.read(dest.len()));
            }
            4 => {
                let target = i64::from(arg % 64);
                assert_eq!(stream.seek(target, Whence::Start).ok(), model.seek(target));
            }
            5 => {
                let delta = i64::from(arg as i8 % 16);
                let target = model.pos as i64 + delta;
                assert_eq!(stream.seek(delta, Whence::Current).ok(), model.seek(target));
            }
            6 => {
                let delta = i64::from(arg as i8 % 8);
                let target = model.data.len() as i64 + delta;
                assert_eq!(stream.seek(delta, Whence::End).ok(), model.seek(target));
            }
            _ => {
                if arg % 2 == 0 {
                    stream.sync().unwrap();
                } else {
                    let peeked = stream.peek_byte().unwrap();
                    assert_eq!(peeked, model.data.get(model.pos).copied());
                }
            }
        }
        assert_eq!(stream.position().unwrap(), model.pos as u64);
    }

    stream.close().unwrap();
    assert_eq!(file.contents(), model.data);
});
