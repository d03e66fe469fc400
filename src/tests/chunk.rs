use crate::chunk::op_codes::OpCode;
use crate::chunk::{Chunk, ConstantPos};
use crate::memory::GarbageCollector;
use crate::objects::Value;

#[test]
fn line_table_is_run_length_encoded() {
    let mut chunk = Chunk::new();

    // Three bytes on line 1, two on line 2, one on line 7.
    for _ in 0..3 {
        chunk.write_byte(0, 1);
    }
    for _ in 0..2 {
        chunk.write_byte(0, 2);
    }
    chunk.write_byte(0, 7);

    assert_eq!(chunk.get_line(0), 1);
    assert_eq!(chunk.get_line(2), 1);
    assert_eq!(chunk.get_line(3), 2);
    assert_eq!(chunk.get_line(4), 2);
    assert_eq!(chunk.get_line(5), 7);
}

#[test]
fn shorts_are_big_endian() {
    let mut chunk = Chunk::new();
    chunk.write_byte(0x12, 1);
    chunk.write_byte(0x34, 1);

    assert_eq!(chunk.get_short(0), 0x1234);
}

#[test]
fn constant_pool_deduplicates_equal_values() {
    let gc = GarbageCollector::new();
    let mut chunk = Chunk::new();

    let first = match chunk.add_constant(Value::Number(8.9), &gc) {
        ConstantPos::Pos(idx) => idx,
        ConstantPos::Error => panic!("The pool should not be full."),
    };
    let second = match chunk.add_constant(Value::Number(8.9), &gc) {
        ConstantPos::Pos(idx) => idx,
        ConstantPos::Error => panic!("The pool should not be full."),
    };

    assert_eq!(first, second);
    assert_eq!(chunk.get_pool_size(), 1);
}

#[test]
fn constant_pool_rejects_entry_257() {
    let gc = GarbageCollector::new();
    let mut chunk = Chunk::new();

    for i in 0..256 {
        match chunk.add_constant(Value::Number(i as f64), &gc) {
            ConstantPos::Pos(idx) => assert_eq!(idx as usize, i),
            ConstantPos::Error => panic!("The first 256 constants should fit."),
        }
    }

    assert!(matches!(
        chunk.add_constant(Value::Number(256.0), &gc),
        ConstantPos::Error
    ));
}

#[test]
fn string_constants_are_found_by_contents() {
    let mut gc = GarbageCollector::new();
    let mut chunk = Chunk::new();

    let id = gc.alloc_string(String::from("answer"), None);
    let idx = match chunk.add_constant(Value::Obj(id), &gc) {
        ConstantPos::Pos(idx) => idx,
        ConstantPos::Error => panic!("The pool should not be full."),
    };

    assert_eq!(chunk.find_string_constant("answer", &gc), Some(idx));
    assert_eq!(chunk.find_string_constant("question", &gc), None);
}

#[test]
fn disassembles_operand_instructions() {
    let mut gc = GarbageCollector::new();
    let mut chunk = Chunk::new();

    let idx = match chunk.add_constant(Value::Number(3.0), &gc) {
        ConstantPos::Pos(idx) => idx,
        ConstantPos::Error => panic!("The pool should not be full."),
    };

    chunk.write_op_code(OpCode::OP_CONSTANT, 1);
    chunk.write_byte(idx, 1);
    chunk.write_op_code(OpCode::OP_PRINT, 1);
    chunk.write_op_code(OpCode::OP_RETURN, 1);

    let listing = chunk.disassemble("test", &mut gc);

    assert!(listing.contains("OP_CONSTANT"));
    assert!(listing.contains("OP_PRINT"));
    assert!(listing.contains("OP_RETURN"));
}
