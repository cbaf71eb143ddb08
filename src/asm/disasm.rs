//! Disassembler for 6502 programs.
//!
//! Converts machine code back to the syntax the assembler accepts.

use crate::binary::{Byte, Word};
use crate::cpu::addressing::AddressingMode;
use crate::cpu::decode::OpCode;

/// Disassemble the instruction at the start of `bytes`, loaded at `address`.
///
/// Returns the text and how many bytes it used. Unknown opcodes and
/// instructions cut short by the end of input come out as `.byte`.
pub fn disassemble_instruction(bytes: &[u8], address: u16) -> (String, usize) {
    let Some(&first) = bytes.first() else {
        return (String::new(), 0);
    };
    let opcode = match OpCode::try_from(first) {
        Ok(opcode) => opcode,
        Err(_) => return (format!(".byte ${:02X}", first), 1),
    };
    let len = usize::from(opcode.len());
    if bytes.len() < len {
        return (format!(".byte ${:02X}", first), 1);
    }

    let text = match format_operand(opcode, &bytes[1..len], address) {
        Some(operand) => format!("{} {}", opcode.mnemonic(), operand),
        None => opcode.mnemonic().to_string(),
    };
    (text, len)
}

/// Disassemble a whole program loaded at `origin`.
pub fn disassemble(bytes: &[u8], origin: u16) -> String {
    let mut output = String::new();
    output.push_str("; 6502 Disassembly\n");
    output.push_str("; ----------------\n\n");

    let mut offset = 0;
    while offset < bytes.len() {
        let address = origin.wrapping_add(offset as u16);
        let (text, len) = disassemble_instruction(&bytes[offset..], address);
        let raw: Vec<String> = bytes[offset..offset + len]
            .iter()
            .map(|byte| format!("{:02X}", byte))
            .collect();

        let comment = OpCode::try_from(bytes[offset])
            .ok()
            .filter(|opcode| usize::from(opcode.len()) == len)
            .map(|opcode| format!("  ; {}", opcode.description()))
            .unwrap_or_default();

        output.push_str(&format!("{:04X}: {:<8}  {:<14}{}\n", address, raw.join(" "), text, comment));
        offset += len;
    }

    output
}

/// Format operand bytes in assembler syntax, or `None` for implied.
fn format_operand(opcode: OpCode, operand: &[u8], address: u16) -> Option<String> {
    let byte = || operand.first().copied().unwrap_or_default();
    let word = || match operand {
        [low, high, ..] => u16::from_le_bytes([*low, *high]),
        _ => u16::from(byte()),
    };

    let text = match opcode.mode() {
        AddressingMode::Implied => return None,
        AddressingMode::Accumulator => "A".to_string(),
        AddressingMode::Immediate => format!("#${:02X}", byte()),
        AddressingMode::Relative => {
            let next = Word::from_u16(address.wrapping_add(2));
            format!("${:04X}", next.offset_by(Byte::from_u8(byte())).raw())
        }
        AddressingMode::ZeroPage => format!("${:02X}", byte()),
        AddressingMode::ZeroPageX => format!("${:02X},X", byte()),
        AddressingMode::ZeroPageY => format!("${:02X},Y", byte()),
        AddressingMode::Absolute => format!("${:04X}", word()),
        AddressingMode::AbsoluteX => format!("${:04X},X", word()),
        AddressingMode::AbsoluteY => format!("${:04X},Y", word()),
        AddressingMode::Indirect => format!("(${:04X})", word()),
        AddressingMode::IndirectX => format!("(${:02X},X)", byte()),
        AddressingMode::IndirectY => format!("(${:02X}),Y", byte()),
    };
    Some(text)
}
