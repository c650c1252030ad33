use std::fmt::Debug;

use bootplane::xdr::{deserialize, Deserialize, Serialize};

#[derive(Default)]
struct Context {
    buf: Vec<u8>,
}

trait TestValue: Deserialize + Serialize + Eq + Default + Debug + Clone {}
impl<T: Deserialize + Serialize + Eq + Default + Debug + Clone> TestValue for T {}

impl Context {
    fn check<T: TestValue>(&mut self, src_value: &T) {
        for capacity in 0..32 {
            for exist in 0..capacity {
                self.buf = Vec::with_capacity(capacity);
                self.buf.resize(exist, Default::default());

                src_value.serialize(&mut self.buf).expect("cannot serialize");
                assert_eq!((self.buf.len() - exist) % 4, 0);

                let result_value =
                    deserialize::<T>(&mut &self.buf[exist..]).expect("cannot deserialize");

                assert_eq!(src_value, &result_value);
            }
        }
    }

    fn check_multi<T: TestValue>(&mut self, src_values: &[T]) {
        src_values.iter().for_each(|i| self.check(i));
    }
}

#[derive(Default, PartialEq, Eq, Debug, Clone)]
struct TestForVecU8(Vec<u8>);

impl Serialize for TestForVecU8 {
    fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.0.serialize(dest)
    }
}

impl Deserialize for TestForVecU8 {
    fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.0.deserialize(src)
    }
}

#[derive(Default, PartialEq, Eq, Debug, Clone)]
struct TestForString(String);

impl Serialize for TestForString {
    fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.0.serialize(dest)
    }
}

impl Deserialize for TestForString {
    fn deserialize<R: std::io::Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.0.deserialize(src)
    }
}

#[test]
fn test_scalar_bijection() {
    let mut ctx = Context::default();

    ctx.check_multi(&[true, false]);
    ctx.check_multi(&[i32::MIN, -1i32, 0i32, 1i32, i32::MAX]);
    ctx.check_multi(&[u32::MIN, 0u32, 1u32, 2u32, u32::MAX]);
}

#[test]
fn test_fixed_opaque_bijection() {
    let mut ctx = Context::default();

    ctx.check(&[1u8]);
    ctx.check(&[1u8, 2u8, 3u8]);
    ctx.check(&[1u8, 2u8, 3u8, 4u8, 5u8, 6u8]);
    ctx.check(&[0u8; 32]);
}

#[test]
fn test_str_bijection() {
    let mut ctx = Context::default();

    ctx.check_multi(&[
        TestForString(String::from("")),
        TestForString(String::from("abc1234+-")),
        TestForString(String::from("/export/boot")),
    ]);
}

#[test]
fn test_vec_bijection() {
    let mut ctx = Context::default();

    ctx.check_multi(&[
        TestForVecU8(vec![]),
        TestForVecU8(vec![1u8]),
        TestForVecU8(vec![1u8, 2u8, 3u8]),
        TestForVecU8(vec![1u8, 2u8, 3u8, 4u8]),
        TestForVecU8(vec![1u8, 2u8, 3u8, 4u8, 5u8]),
    ]);
}

/// Counted opaques pad to a 4-byte boundary with zero bytes.
#[test]
fn test_opaque_padding_is_zero() {
    let mut buf = Vec::new();
    [0xff_u8, 0xff, 0xff, 0xff, 0xff]
        .as_slice()
        .serialize(&mut buf)
        .expect("serialize");

    // length word + 5 payload bytes + 3 padding bytes
    assert_eq!(buf.len(), 12);
    assert_eq!(&buf[..4], &[0, 0, 0, 5]);
    assert_eq!(&buf[9..], &[0, 0, 0]);
}

/// A zero-length opaque is just its length word; no padding follows.
#[test]
fn test_empty_opaque_is_length_word_only() {
    let mut buf = Vec::new();
    let empty: &[u8] = &[];
    empty.serialize(&mut buf).expect("serialize");
    assert_eq!(buf, vec![0, 0, 0, 0]);

    let mut src = buf.as_slice();
    let value = deserialize::<Vec<u8>>(&mut src).expect("deserialize");
    assert!(value.is_empty());
    assert!(src.is_empty(), "reader must advance exactly 4 bytes");
}

/// Reads past the end of input fail instead of inventing data.
#[test]
fn test_short_input_fails() {
    let buf = [0_u8, 0, 0, 9, 1, 2];
    assert!(deserialize::<Vec<u8>>(&mut buf.as_slice()).is_err());
    assert!(deserialize::<u32>(&mut [0_u8, 1].as_slice()).is_err());
}
