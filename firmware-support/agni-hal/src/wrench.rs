// SPDX-FileCopyrightText: 2025 Google LLC
//
// SPDX-License-Identifier: Apache-2.0

//! Compute-issue encoding for the Wrench systolic array.
//!
//! The Wrench is driven through RoCC custom instructions. Every instruction
//! word uses the standard R-type layout:
//!
//! ```text
//! funct7[31:25] rs2[24:20] rs1[19:15] funct3[14:12] rd[11:7] opcode[6:0]
//! ```
//!
//! where `opcode` is always the custom-0 tag and `funct7` selects the
//! operation. Operands are passed in `a0` (`x10`) and `a1` (`x11`).
//!
//! From the firmware's point of view [`WrenchOp::Execute`] retires
//! synchronously: the result is assumed to be valid in Wrench scratch as soon
//! as the instruction has been issued. The hardware does not expose a
//! completion flag for it.

use ufmt::derive::uDebug;

/// Opcode of the RISC-V custom-0 instruction class.
pub const CUSTOM0_OPCODE: u32 = 0b000_1011;

/// Register index of `a0`.
pub const REG_A0: u8 = 10;
/// Register index of `a1`.
pub const REG_A1: u8 = 11;

/// Side length of the systolic array.
pub const ARRAY_DIM: u8 = 8;

const FUNCT7_MASK: u32 = 0x7f;
const REG_MASK: u32 = 0x1f;

/// A 32-bit RoCC instruction word.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct RoccInstruction(u32);

impl RoccInstruction {
    /// Pack the operation selector and register indices into an instruction
    /// word. Bits beyond each field's width are discarded.
    pub const fn encode(funct7: u8, rd: u8, rs1: u8, rs2: u8) -> RoccInstruction {
        RoccInstruction(
            ((funct7 as u32 & FUNCT7_MASK) << 25)
                | ((rs2 as u32 & REG_MASK) << 20)
                | ((rs1 as u32 & REG_MASK) << 15)
                | ((rd as u32 & REG_MASK) << 7)
                | CUSTOM0_OPCODE,
        )
    }

    pub const fn from_bits(bits: u32) -> RoccInstruction {
        RoccInstruction(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn opcode(self) -> u32 {
        self.0 & 0x7f
    }

    pub const fn funct7(self) -> u8 {
        ((self.0 >> 25) & FUNCT7_MASK) as u8
    }

    pub const fn rs2(self) -> u8 {
        ((self.0 >> 20) & REG_MASK) as u8
    }

    pub const fn rs1(self) -> u8 {
        ((self.0 >> 15) & REG_MASK) as u8
    }

    pub const fn funct3(self) -> u8 {
        ((self.0 >> 12) & 0b111) as u8
    }

    pub const fn rd(self) -> u8 {
        ((self.0 >> 7) & REG_MASK) as u8
    }

    /// Whether the word belongs to the custom-0 instruction class.
    pub const fn is_custom0(self) -> bool {
        self.opcode() == CUSTOM0_OPCODE
    }
}

/// The Wrench operations, in the order they are issued for a task.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub enum WrenchOp {
    Configure,
    LoadA,
    LoadB,
    Execute,
}

impl WrenchOp {
    pub const SEQUENCE: [WrenchOp; 4] = [
        WrenchOp::Configure,
        WrenchOp::LoadA,
        WrenchOp::LoadB,
        WrenchOp::Execute,
    ];

    pub const fn funct7(self) -> u8 {
        match self {
            WrenchOp::Configure => 0b000_1011,
            WrenchOp::LoadA => 0b000_1111,
            WrenchOp::LoadB => 0b010_1111,
            WrenchOp::Execute => 0b110_1111,
        }
    }

    /// Look up the operation for a `funct7` selector.
    pub const fn from_funct7(funct7: u8) -> Option<WrenchOp> {
        match funct7 {
            0b000_1011 => Some(WrenchOp::Configure),
            0b000_1111 => Some(WrenchOp::LoadA),
            0b010_1111 => Some(WrenchOp::LoadB),
            0b110_1111 => Some(WrenchOp::Execute),
            _ => None,
        }
    }

    /// The instruction word issued for this operation.
    ///
    /// `Configure` reads rows and columns from `a0` and `a1`, the others read
    /// an address from `a0`.
    pub const fn instruction(self) -> RoccInstruction {
        match self {
            WrenchOp::Configure => RoccInstruction::encode(self.funct7(), 0, REG_A0, REG_A1),
            _ => RoccInstruction::encode(self.funct7(), 0, REG_A0, 0),
        }
    }
}

/// Dimensions of a matrix tile, bounded by the array size.
#[derive(uDebug, Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArrayShape {
    rows: u8,
    cols: u8,
}

impl ArrayShape {
    /// The full 8x8 array.
    pub const FULL: ArrayShape = ArrayShape {
        rows: ARRAY_DIM,
        cols: ARRAY_DIM,
    };

    /// Returns `None` if either dimension is zero or exceeds [`ARRAY_DIM`].
    pub const fn new(rows: u8, cols: u8) -> Option<ArrayShape> {
        if rows == 0 || cols == 0 || rows > ARRAY_DIM || cols > ARRAY_DIM {
            None
        } else {
            Some(ArrayShape { rows, cols })
        }
    }

    pub const fn rows(&self) -> u8 {
        self.rows
    }

    pub const fn cols(&self) -> u8 {
        self.cols
    }
}

/// Something that can issue Wrench instructions.
pub trait WrenchPort {
    /// Issue the instruction for `op` with `a0 = rs1` and `a1 = rs2`.
    fn issue(&mut self, op: WrenchOp, rs1: u64, rs2: u64);

    fn configure(&mut self, shape: ArrayShape) {
        self.issue(WrenchOp::Configure, shape.rows as u64, shape.cols as u64);
    }

    fn load_operand_a(&mut self, addr: u64) {
        self.issue(WrenchOp::LoadA, addr, 0);
    }

    fn load_operand_b(&mut self, addr: u64) {
        self.issue(WrenchOp::LoadB, addr, 0);
    }

    fn execute(&mut self, result_addr: u64) {
        self.issue(WrenchOp::Execute, result_addr, 0);
    }
}

impl<P: WrenchPort + ?Sized> WrenchPort for &mut P {
    fn issue(&mut self, op: WrenchOp, rs1: u64, rs2: u64) {
        (**self).issue(op, rs1, rs2)
    }
}

/// Issue the full compute sequence for `C = A * B`.
pub fn issue_matmul(
    port: &mut impl WrenchPort,
    shape: ArrayShape,
    operand_a: u64,
    operand_b: u64,
    result: u64,
) {
    port.configure(shape);
    port.load_operand_a(operand_a);
    port.load_operand_b(operand_b);
    port.execute(result);
}

/// The Wrench attached to the Foreman's RoCC interface.
#[derive(uDebug, Debug, Default)]
pub struct RoccWrench;

#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
macro_rules! rocc {
    ($op:expr, $rs1:expr, $rs2:expr) => {
        unsafe {
            core::arch::asm!(
                ".word {word}",
                word = const $op.instruction().bits(),
                in("a0") $rs1,
                in("a1") $rs2,
                options(nostack),
            )
        }
    };
}

impl WrenchPort for RoccWrench {
    #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
    fn issue(&mut self, op: WrenchOp, rs1: u64, rs2: u64) {
        let rs1 = rs1 as usize;
        let rs2 = rs2 as usize;
        // The instruction word has to be an immediate.
        match op {
            WrenchOp::Configure => rocc!(WrenchOp::Configure, rs1, rs2),
            WrenchOp::LoadA => rocc!(WrenchOp::LoadA, rs1, rs2),
            WrenchOp::LoadB => rocc!(WrenchOp::LoadB, rs1, rs2),
            WrenchOp::Execute => rocc!(WrenchOp::Execute, rs1, rs2),
        }
    }

    #[cfg(not(any(target_arch = "riscv32", target_arch = "riscv64")))]
    fn issue(&mut self, op: WrenchOp, _rs1: u64, _rs2: u64) {
        panic!("Wrench {:?} can only be issued on the Foreman", op)
    }
}
