//! Simple two-pass assembler for 6502 programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//!         .org $8000      ; Set origin address
//! start:  LDX #$08        ; Immediate
//! loop:   STA $0200,X     ; Absolute, X-indexed
//!         LDA ($10),Y     ; Indirect, Y-indexed
//!         ASL A           ; Accumulator
//!         DEX
//!         BNE loop        ; Relative
//!         JMP (vector)    ; Indirect
//! vector: .word start     ; Little-endian data word
//!         .byte $01, 2, %11, <start, >start
//! ```
//!
//! Numbers are decimal, `$` hex or `%` binary. A one- or two-digit hex
//! number (or a decimal below 256) picks the zero-page form when the
//! instruction has one. Label operands always use the absolute form and
//! are patched in the second pass. `<expr` and `>expr` take the low and
//! high byte.

use std::collections::HashMap;
use thiserror::Error;
use crate::binary::{Byte, Word};
use crate::cpu::addressing::{AddressingMode, Index};
use crate::cpu::decode::{DecodeError, Mnemonic, OpCode};

/// Assemble source code to a program image.
pub fn assemble(source: &str) -> Result<Program, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// An assembled, contiguous block of machine code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    origin: Word,
    bytes: Vec<u8>,
}

impl Program {
    /// Address of the first byte.
    pub fn origin(&self) -> Word {
        self.origin
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// An operand value as written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    /// A literal; `wide` when written with more than two hex digits or above $FF.
    Number { value: i32, wide: bool },
    /// A label reference plus a constant offset, resolved in pass 2.
    Label { name: String, offset: i32 },
}

/// Which part of a resolved value a fixup writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Word,
    ZeroPage,
    Low,
    High,
    /// Branch displacement measured from `next`.
    Relative { next: u16 },
}

/// A label reference waiting for pass 2.
#[derive(Debug, Clone)]
struct Fixup {
    offset: usize,
    label: String,
    addend: i32,
    part: Part,
    line: usize,
}

/// The assembler state.
struct Assembler {
    /// Current address.
    current_addr: u32,
    /// Address of the first emitted byte.
    origin: Option<u16>,
    /// Symbol table (label -> address).
    symbols: HashMap<String, u16>,
    /// Pending references.
    pending: Vec<Fixup>,
    /// Output bytes.
    output: Vec<u8>,
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            origin: None,
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Program, AssemblerError> {
        // Pass 1: Collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: Resolve label references
        self.resolve_references()?;

        Ok(Program {
            origin: Word::from_u16(self.origin.unwrap_or(0)),
            bytes: std::mem::take(&mut self.output),
        })
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        // Check for label definition
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if !is_identifier(&label) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label name: {:?}", label),
                });
            }
            let address = self.address(line_num)?;
            if self.symbols.insert(label.clone(), address).is_some() {
                return Err(AssemblerError::DuplicateLabel { line: line_num, label });
            }

            // Process rest of line if any
            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_statement(rest, line_num);
            }
            return Ok(());
        }

        self.process_statement(line, line_num)
    }

    fn process_statement(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (head, rest) = match line.find(char::is_whitespace) {
            Some(idx) => (&line[..idx], line[idx..].trim()),
            None => (line, ""),
        };

        match head.to_ascii_lowercase().as_str() {
            // Directives
            ".org" => {
                let target = match self.parse_value(rest, line_num)? {
                    Value::Number { value, .. } => value,
                    Value::Label { .. } => {
                        return Err(AssemblerError::SyntaxError {
                            line: line_num,
                            message: ".org requires a number".into(),
                        })
                    }
                };
                self.set_origin(target, line_num)?;
            }

            ".byte" => {
                for item in split_list(rest, ".byte", line_num)? {
                    self.emit_byte_value(item, line_num)?;
                }
            }

            ".word" => {
                for item in split_list(rest, ".word", line_num)? {
                    let value = self.parse_value(item, line_num)?;
                    self.emit_value(value, Part::Word, line_num)?;
                }
            }

            directive if directive.starts_with('.') => {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("unknown directive {}", head),
                });
            }

            // Instructions
            _ => self.process_instruction(head, rest, line_num)?,
        }

        Ok(())
    }

    fn process_instruction(&mut self, name: &str, operand: &str, line_num: usize) -> Result<(), AssemblerError> {
        let mnemonic: Mnemonic = name.parse().map_err(|_| AssemblerError::UnknownMnemonic {
            line: line_num,
            mnemonic: name.to_string(),
        })?;
        let operand: String = operand.chars().filter(|c| !c.is_whitespace()).collect();
        let upper = operand.to_ascii_uppercase();

        // No operand, or the accumulator
        if operand.is_empty() || upper == "A" {
            let mode = if upper == "A" || OpCode::from_mnemonic(mnemonic).is_err() {
                AddressingMode::Accumulator
            } else {
                AddressingMode::Implied
            };
            let opcode = lookup(mnemonic, mode, line_num)?;
            return self.emit(opcode.code(), line_num);
        }

        // #value
        if let Some(immediate) = operand.strip_prefix('#') {
            let opcode = lookup(mnemonic, AddressingMode::Immediate, line_num)?;
            self.emit(opcode.code(), line_num)?;
            return self.emit_byte_value(immediate, line_num);
        }

        // (value,X) / (value),Y / (value)
        if operand.starts_with('(') {
            let (inner, mode) = if let Some(inner) = strip_suffix_ci(&operand, ",X)") {
                (&inner[1..], AddressingMode::IndirectX)
            } else if let Some(inner) = strip_suffix_ci(&operand, "),Y") {
                (&inner[1..], AddressingMode::IndirectY)
            } else if let Some(inner) = operand.strip_suffix(')') {
                (&inner[1..], AddressingMode::Indirect)
            } else {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("unbalanced parentheses in {}", operand),
                });
            };
            let opcode = lookup(mnemonic, mode, line_num)?;
            let value = self.parse_value(inner, line_num)?;
            self.emit(opcode.code(), line_num)?;
            let part = if mode == AddressingMode::Indirect { Part::Word } else { Part::ZeroPage };
            return self.emit_value(value, part, line_num);
        }

        // value / value,X / value,Y
        let (text, index) = if let Some(text) = strip_suffix_ci(&operand, ",X") {
            (text, Some(Index::X))
        } else if let Some(text) = strip_suffix_ci(&operand, ",Y") {
            (text, Some(Index::Y))
        } else {
            (operand.as_str(), None)
        };
        let value = self.parse_value(text, line_num)?;

        if mnemonic.is_branch() {
            if index.is_some() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("{} takes a plain target", mnemonic),
                });
            }
            let opcode = lookup(mnemonic, AddressingMode::Relative, line_num)?;
            self.emit(opcode.code(), line_num)?;
            let next = self.address(line_num)?.wrapping_add(1);
            return self.emit_value(value, Part::Relative { next }, line_num);
        }

        let narrow = matches!(value, Value::Number { wide: false, .. });
        let opcode = if narrow {
            indexed(AddressingMode::ZeroPage, index, line_num)
                .and_then(|mode| lookup(mnemonic, mode, line_num))
                .or_else(|_| {
                    indexed(AddressingMode::Absolute, index, line_num)
                        .and_then(|mode| lookup(mnemonic, mode, line_num))
                })?
        } else {
            let mode = indexed(AddressingMode::Absolute, index, line_num)?;
            lookup(mnemonic, mode, line_num)?
        };

        self.emit(opcode.code(), line_num)?;
        let part = if opcode.mode().operand_bytes() == 1 { Part::ZeroPage } else { Part::Word };
        self.emit_value(value, part, line_num)
    }

    /// `value`, `<value` or `>value` as one byte.
    fn emit_byte_value(&mut self, text: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (part, text) = if let Some(rest) = text.strip_prefix('<') {
            (Part::Low, rest)
        } else if let Some(rest) = text.strip_prefix('>') {
            (Part::High, rest)
        } else {
            (Part::ZeroPage, text)
        };
        let value = self.parse_value(text, line_num)?;
        match (part, value) {
            (Part::ZeroPage, Value::Number { value, .. }) => {
                if !(Byte::MIN_SIGNED..=0xFF).contains(&value) {
                    return Err(AssemblerError::ValueOutOfRange { line: line_num, value });
                }
                self.emit(Byte::from_raw(value).raw(), line_num)
            }
            (part, value) => self.emit_value(value, part, line_num),
        }
    }

    /// Emit the bytes of `part`, or placeholders plus a fixup for a label.
    fn emit_value(&mut self, value: Value, part: Part, line_num: usize) -> Result<(), AssemblerError> {
        let offset = self.output.len();
        let width = if part == Part::Word { 2 } else { 1 };
        for _ in 0..width {
            self.emit(0, line_num)?;
        }

        match value {
            Value::Number { value, .. } => self.patch(offset, value, part, line_num),
            Value::Label { name, offset: addend } => {
                self.pending.push(Fixup {
                    offset,
                    label: name,
                    addend,
                    part,
                    line: line_num,
                });
                Ok(())
            }
        }
    }

    /// Write the resolved `value` into the output at `offset`.
    fn patch(&mut self, offset: usize, value: i32, part: Part, line_num: usize) -> Result<(), AssemblerError> {
        let out_of_range = AssemblerError::ValueOutOfRange { line: line_num, value };
        match part {
            Part::Word => {
                let word = u16::try_from(value).map_err(|_| out_of_range)?;
                self.output[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
            }
            Part::ZeroPage => {
                self.output[offset] = u8::try_from(value).map_err(|_| out_of_range)?;
            }
            Part::Low | Part::High => {
                let word = u16::try_from(value).map_err(|_| out_of_range)?;
                let [low, high] = word.to_le_bytes();
                self.output[offset] = if part == Part::Low { low } else { high };
            }
            Part::Relative { next } => {
                u16::try_from(value).map_err(|_| out_of_range)?;
                let displacement = value - i32::from(next);
                if !(Byte::MIN_SIGNED..=Byte::MAX_SIGNED).contains(&displacement) {
                    return Err(AssemblerError::BranchOutOfRange { line: line_num, offset: displacement });
                }
                self.output[offset] = Byte::from_raw(displacement).raw();
            }
        }
        Ok(())
    }

    fn parse_value(&self, text: &str, line_num: usize) -> Result<Value, AssemblerError> {
        let text = text.trim();
        let invalid = |message: String| AssemblerError::SyntaxError { line: line_num, message };

        if text.is_empty() {
            return Err(invalid("missing operand".into()));
        }

        // Check for hex literal
        if let Some(digits) = text.strip_prefix('$') {
            let value = i32::from_str_radix(digits, 16)
                .map_err(|_| invalid(format!("invalid hex literal {}", text)))?;
            return Ok(Value::Number { value, wide: digits.len() > 2 || value > 0xFF });
        }

        // Check for binary literal
        if let Some(digits) = text.strip_prefix('%') {
            let value = i32::from_str_radix(digits, 2)
                .map_err(|_| invalid(format!("invalid binary literal {}", text)))?;
            return Ok(Value::Number { value, wide: value > 0xFF });
        }

        // Check for decimal number
        if let Ok(value) = text.parse::<i32>() {
            return Ok(Value::Number { value, wide: value > 0xFF });
        }

        // Must be a label reference, optionally with an offset
        let (name, addend) = match text.find(['+', '-']) {
            Some(idx) => {
                let amount = match self.parse_value(&text[idx + 1..], line_num)? {
                    Value::Number { value, .. } => value,
                    Value::Label { .. } => return Err(invalid(format!("label offset must be a number: {}", text))),
                };
                let sign = if text[idx..].starts_with('-') { -1 } else { 1 };
                let addend = amount.checked_mul(sign)
                    .ok_or(AssemblerError::ValueOutOfRange { line: line_num, value: amount })?;
                (&text[..idx], addend)
            }
            None => (text, 0),
        };
        let name = name.trim().to_uppercase();
        if !is_identifier(&name) {
            return Err(invalid(format!("invalid operand {}", text)));
        }
        Ok(Value::Label { name, offset: addend })
    }

    /// The current address, which must still be inside the address space.
    fn address(&self, line_num: usize) -> Result<u16, AssemblerError> {
        u16::try_from(self.current_addr).map_err(|_| AssemblerError::ValueOutOfRange {
            line: line_num,
            value: self.current_addr as i32,
        })
    }

    fn set_origin(&mut self, target: i32, line_num: usize) -> Result<(), AssemblerError> {
        let target = u16::try_from(target)
            .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value: target })?;
        if self.origin.is_none() {
            self.current_addr = u32::from(target);
            return Ok(());
        }
        if u32::from(target) < self.current_addr {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!(".org ${:04X} is behind the current address ${:04X}", target, self.current_addr),
            });
        }
        // Fill the gap so the program stays contiguous
        while self.current_addr < u32::from(target) {
            self.emit(0, line_num)?;
        }
        Ok(())
    }

    fn emit(&mut self, byte: u8, line_num: usize) -> Result<(), AssemblerError> {
        let address = self.address(line_num)?;
        self.origin.get_or_insert(address);
        self.output.push(byte);
        self.current_addr += 1;
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for fixup in std::mem::take(&mut self.pending) {
            let address = self.symbols.get(&fixup.label).ok_or_else(|| AssemblerError::UndefinedLabel {
                line: fixup.line,
                label: fixup.label.clone(),
            })?;
            let value = i32::from(*address).checked_add(fixup.addend).ok_or(AssemblerError::ValueOutOfRange {
                line: fixup.line,
                value: fixup.addend,
            })?;
            self.patch(fixup.offset, value, fixup.part, fixup.line)?;
        }
        Ok(())
    }
}

fn lookup(mnemonic: Mnemonic, mode: AddressingMode, line_num: usize) -> Result<OpCode, AssemblerError> {
    OpCode::from_mnemonic_and_mode(mnemonic, mode)
        .map_err(|source| AssemblerError::Decode { line: line_num, source })
}

fn indexed(mode: AddressingMode, index: Option<Index>, line_num: usize) -> Result<AddressingMode, AssemblerError> {
    let result = match index {
        None => Ok(mode),
        Some(Index::X) => mode.x_indexed(),
        Some(Index::Y) => mode.y_indexed(),
    };
    result.map_err(|source| AssemblerError::Decode { line: line_num, source })
}

fn strip_suffix_ci<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    if text.is_char_boundary(split) && text[split..].eq_ignore_ascii_case(suffix) {
        Some(&text[..split])
    } else {
        None
    }
}

fn split_list<'a>(text: &'a str, directive: &str, line_num: usize) -> Result<Vec<&'a str>, AssemblerError> {
    let items: Vec<&str> = text.split(',').map(str::trim).collect();
    if items.iter().any(|item| item.is_empty()) {
        return Err(AssemblerError::SyntaxError {
            line: line_num,
            message: format!("{} requires a comma-separated list of values", directive),
        });
    }
    Ok(items)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("label defined twice on line {line}: {label}")]
    DuplicateLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i32 },

    #[error("branch out of range on line {line}: offset {offset}")]
    BranchOutOfRange { line: usize, offset: i32 },

    #[error("on line {line}: {source}")]
    Decode { line: usize, source: DecodeError },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(source: &str) -> Vec<u8> {
        assemble(source).unwrap().into_bytes()
    }

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Simple test program
            LDA #$AA
            ADC #1
            STA $10
            BRK
        "#;

        let program = assemble(source).unwrap();
        assert_eq!(program.origin(), 0u16);
        assert_eq!(program.bytes(), &[0xA9, 0xAA, 0x69, 0x01, 0x85, 0x10, 0x00]);
    }

    #[test]
    fn test_every_addressing_mode() {
        let source = r#"
            .org $C000
            NOP
            ROL A
            LSR
            LDA #%1010
            LDA $12
            LDA $12,X
            LDX $12,Y
            LDA $1234
            LDA $0012
            LDA $1234,x
            LDA $1234,Y
            JMP ($1234)
            LDA ($12,X)
            LDA ($12),Y
        "#;

        assert_eq!(bytes(source), vec![
            0xEA,
            0x2A,
            0x4A,
            0xA9, 0x0A,
            0xA5, 0x12,
            0xB5, 0x12,
            0xB6, 0x12,
            0xAD, 0x34, 0x12,
            0xAD, 0x12, 0x00,
            0xBD, 0x34, 0x12,
            0xB9, 0x34, 0x12,
            0x6C, 0x34, 0x12,
            0xA1, 0x12,
            0xB1, 0x12,
        ]);
    }

    #[test]
    fn test_zero_page_falls_back_to_absolute() {
        // LDA has no zero-page,Y form
        assert_eq!(bytes("LDA $12,Y"), vec![0xB9, 0x12, 0x00]);
        // JMP has no zero-page form at all
        assert_eq!(bytes("JMP $12"), vec![0x4C, 0x12, 0x00]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
            .org $8000
        start:
            LDX #$03
        loop: DEX
            BNE loop
            JMP end
            NOP
        end:
            JSR start
        "#;

        let program = assemble(source).unwrap();
        assert_eq!(program.origin(), 0x8000u16);
        assert_eq!(program.bytes(), &[
            0xA2, 0x03,
            0xCA,
            0xD0, 0xFD,
            0x4C, 0x09, 0x80,
            0xEA,
            0x20, 0x00, 0x80,
        ]);
    }

    #[test]
    fn test_forward_branch() {
        let source = r#"
            BEQ skip
            NOP
            NOP
        skip:
            RTS
        "#;
        assert_eq!(bytes(source), vec![0xF0, 0x02, 0xEA, 0xEA, 0x60]);
    }

    #[test]
    fn test_assemble_data() {
        let source = r#"
            .org $0200
        table:
            .byte 42, -1, $7F, <table, >table
            .word table+2, $1234
        "#;

        assert_eq!(bytes(source), vec![42, 0xFF, 0x7F, 0x00, 0x02, 0x02, 0x02, 0x34, 0x12]);
    }

    #[test]
    fn test_org_fills_gap() {
        let source = r#"
            .org $10
            NOP
            .org $13
            RTS
        "#;
        let program = assemble(source).unwrap();
        assert_eq!(program.origin(), 0x10u16);
        assert_eq!(program.bytes(), &[0xEA, 0x00, 0x00, 0x60]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(assemble("FOO #1"), Err(AssemblerError::UnknownMnemonic { line: 1, .. })));
        assert!(matches!(assemble("JMP nowhere"), Err(AssemblerError::UndefinedLabel { line: 1, .. })));
        assert!(matches!(assemble("LDA #$100"), Err(AssemblerError::ValueOutOfRange { line: 1, value: 0x100 })));
        assert!(matches!(
            assemble("STA #1"),
            Err(AssemblerError::Decode { line: 1, source: DecodeError::UnknownInstruction { .. } })
        ));
        assert!(matches!(
            assemble("a:\na: NOP"),
            Err(AssemblerError::DuplicateLabel { line: 2, .. })
        ));
        assert!(matches!(
            assemble(".org $10\nNOP\n.org $08"),
            Err(AssemblerError::SyntaxError { line: 3, .. })
        ));
    }

    #[test]
    fn test_branch_out_of_range() {
        let mut source = String::from("start:\n");
        for _ in 0..130 {
            source.push_str("NOP\n");
        }
        source.push_str("BNE start\n");

        assert!(matches!(
            assemble(&source),
            Err(AssemblerError::BranchOutOfRange { line: 132, offset: -132 })
        ));
    }

    #[test]
    fn test_extreme_label_offsets_are_rejected() {
        assert!(matches!(
            assemble("NOP\nx: JMP x+2147483647"),
            Err(AssemblerError::ValueOutOfRange { line: 2, value: i32::MAX })
        ));
        assert!(matches!(
            assemble("x: JMP x--2147483648"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: i32::MIN })
        ));
        assert!(matches!(
            assemble("x: JMP x-1"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: -1 })
        ));
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        assert_eq!(bytes("Here: JMP HERE"), vec![0x4C, 0x00, 0x00]);
    }
}
