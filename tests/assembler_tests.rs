// tests/assembler_tests.rs
//
// Tests for the assembly parser: instruction forms, labels, comments, and
// the error cases a malformed program must surface.

use tomasulo_rust::errors::SimulatorError;
use tomasulo_rust::processor::instructions::Opcode;
use tomasulo_rust::Parser;

#[test]
fn test_parse_basic_forms() {
    let source = "\
        ADD R1, R2, R3\n\
        SUB R4, R5, R6\n\
        NAND R7, R0, R1\n\
        MUL R2, R3, R4\n\
        LOAD R1, 4(R2)\n\
        STORE R3, -2(R4)\n\
        RET\n";
    let program = Parser::parse_str(source).expect("program should parse");

    assert_eq!(program.instructions.len(), 7);
    assert_eq!(program.instructions[0].opcode, Opcode::Add);
    assert_eq!(program.instructions[0].ra, Some(1));
    assert_eq!(program.instructions[0].rb, Some(2));
    assert_eq!(program.instructions[0].rc, Some(3));
    assert_eq!(program.instructions[4].opcode, Opcode::Load);
    assert_eq!(program.instructions[4].immediate, Some(4));
    assert_eq!(program.instructions[5].immediate, Some(-2));
    assert_eq!(program.instructions[6].opcode, Opcode::Ret);

    // Instruction ids are unique and 1-based
    for (index, instruction) in program.instructions.iter().enumerate() {
        assert_eq!(instruction.id, index + 1);
    }
}

#[test]
fn test_mnemonics_are_case_insensitive() {
    let program = Parser::parse_str("add r1, r2, r3\nLoAd R4, 0(r0)\n").expect("should parse");
    assert_eq!(program.instructions[0].opcode, Opcode::Add);
    assert_eq!(program.instructions[1].opcode, Opcode::Load);
}

#[test]
fn test_comments_and_blank_lines() {
    let source = "\
        # leading comment\n\
        \n\
        ADD R1, R2, R3 # trailing comment\n\
        # another\n";
    let program = Parser::parse_str(source).expect("should parse");
    assert_eq!(program.instructions.len(), 1);
}

#[test]
fn test_labels_own_line_and_inline() {
    let source = "\
        START:\n\
        ADD R1, R2, R3\n\
        MID: SUB R4, R5, R6\n\
        BEQ R1, R4, MID\n";
    let program = Parser::parse_str(source).expect("should parse");

    assert_eq!(program.labels.get("START"), Some(&0));
    assert_eq!(program.labels.get("MID"), Some(&1));
    // BEQ keeps the symbolic label and gets the derived offset
    assert_eq!(program.instructions[2].label.as_deref(), Some("MID"));
    assert_eq!(program.instructions[2].immediate, Some(-2));
}

#[test]
fn test_trailing_label_binds_past_program() {
    let source = "\
        BEQ R1, R2, END\n\
        ADD R3, R4, R5\n\
        END:\n";
    let program = Parser::parse_str(source).expect("should parse");
    assert_eq!(program.labels.get("END"), Some(&2));
    assert_eq!(program.instructions[0].immediate, Some(1));
}

#[test]
fn test_call_offset_derived_from_label() {
    let source = "\
        FUNC: ADD R2, R2, R2\n\
        RET\n\
        CALL FUNC\n";
    let program = Parser::parse_str(source).expect("should parse");
    assert_eq!(program.instructions[2].opcode, Opcode::Call);
    assert_eq!(program.instructions[2].immediate, Some(-3));
}

#[test]
fn test_unknown_mnemonic_is_error() {
    let err = Parser::parse_str("XOR R1, R2, R3\n").unwrap_err();
    match err {
        SimulatorError::ParseError { line, .. } => assert_eq!(line, 1),
        other => panic!("expected ParseError, got {:?}", other),
    }
}

#[test]
fn test_bad_register_is_error() {
    assert!(Parser::parse_str("ADD R1, R2, R8\n").is_err());
    assert!(Parser::parse_str("ADD R1, R2, X3\n").is_err());
}

#[test]
fn test_bad_displacement_is_error() {
    assert!(Parser::parse_str("LOAD R1, 4[R2]\n").is_err());
    assert!(Parser::parse_str("LOAD R1, (R2)\n").is_err());
    assert!(Parser::parse_str("LOAD R1, 4(R2\n").is_err());
}

#[test]
fn test_wrong_operand_count_is_error() {
    assert!(Parser::parse_str("ADD R1, R2\n").is_err());
    assert!(Parser::parse_str("RET R1\n").is_err());
    assert!(Parser::parse_str("CALL\n").is_err());
}

#[test]
fn test_duplicate_label_is_error() {
    let source = "\
        L: ADD R1, R2, R3\n\
        L: SUB R1, R2, R3\n";
    assert!(Parser::parse_str(source).is_err());
}

#[test]
fn test_undefined_label_is_error() {
    assert!(Parser::parse_str("BEQ R1, R2, NOWHERE\n").is_err());
    assert!(Parser::parse_str("CALL NOWHERE\n").is_err());
}

#[test]
fn test_beq_offset_range_enforced() {
    // 17 instructions between the BEQ and its target push the offset past
    // the 5-bit signed range
    let mut source = String::from("BEQ R1, R2, FAR\n");
    for _ in 0..16 {
        source.push_str("ADD R1, R1, R1\n");
    }
    source.push_str("FAR: RET\n");
    let err = Parser::parse_str(&source).unwrap_err();
    match err {
        SimulatorError::ParseError { message, .. } => {
            assert!(message.contains("offset"), "unexpected message: {}", message)
        },
        other => panic!("expected ParseError, got {:?}", other),
    }

    // One instruction fewer fits exactly
    let mut fits = String::from("BEQ R1, R2, FAR\n");
    for _ in 0..15 {
        fits.push_str("ADD R1, R1, R1\n");
    }
    fits.push_str("FAR: RET\n");
    assert!(Parser::parse_str(&fits).is_ok());
}

#[test]
fn test_instruction_display_round_trip() {
    let source = "\
        ADD R1, R2, R3\n\
        LOAD R1, 4(R2)\n\
        BEQ R1, R2, L\n\
        L: RET\n";
    let program = Parser::parse_str(source).expect("should parse");
    assert_eq!(program.instructions[0].to_string(), "ADD R1, R2, R3");
    assert_eq!(program.instructions[1].to_string(), "LOAD R1, 4(R2)");
    assert_eq!(program.instructions[2].to_string(), "BEQ R1, R2, L");
    assert_eq!(program.instructions[3].to_string(), "RET");
}
