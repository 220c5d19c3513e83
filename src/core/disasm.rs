/// Thumb disassembler.
///
/// Mirrors the executor's 256+16 dispatch tables, producing one line of
/// text per opcode. It never touches architectural state: the only side
/// channel is an uncounted bus read to show literal-pool values.

use super::Cpu;
use crate::bus::Bus;
use crate::common::u16::test_bit;

pub const REG_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7",
    "r8", "r9", "r10", "r11", "r12", "sp", "lr", "pc",
];

const ALU_NAMES: [&str; 16] = [
    "ands", "eors", "lsls", "lsrs", "asrs", "adcs", "sbcs", "rors",
    "tst", "negs", "cmp", "cmn", "orrs", "muls", "bics", "mvn",
];

const COND_NAMES: [&str; 14] = [
    "beq", "bne", "bhs", "blo", "bmi", "bpl", "bvs", "bvc",
    "bhi", "bls", "bge", "blt", "bgt", "ble",
];

fn reg(n: u16) -> &'static str {
    REG_NAMES[(n & 0xF) as usize]
}

fn reg_list(mask: u16) -> String {
    let mut out = String::from("{");
    let mut first = true;
    for i in 0..16 {
        if test_bit(mask, i) {
            if !first {
                out.push_str(", ");
            }
            out.push_str(REG_NAMES[i]);
            first = false;
        }
    }
    out.push('}');
    out
}

type ThumbDis<B> = fn(&mut Cpu<B>, u16, u32) -> String;

impl<B: Bus> Cpu<B> {
    /// Render the instruction `op` as fetched from `pc`.
    pub fn disasm_thumb(&mut self, op: u16, pc: u32) -> String {
        Self::DISASM_TABLE[(op >> 8) as usize](self, op, pc)
    }

    /// Fetch and render the Thumb instruction at `addr`.
    pub fn disassemble_thumb_at(&mut self, addr: u32) -> String {
        let op = self.bus.fetch16(addr);
        self.disasm_thumb(op, addr)
    }

    const DISASM_TABLE: [ThumbDis<B>; 256] = [
        // 0x00
        Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm,
        Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm,
        Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm,
        Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm,
        // 0x10
        Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm,
        Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm, Self::dis_shift_imm,
        Self::dis_add_sub_reg, Self::dis_add_sub_reg, Self::dis_add_sub_reg, Self::dis_add_sub_reg,
        Self::dis_add_sub_imm3, Self::dis_add_sub_imm3, Self::dis_add_sub_imm3, Self::dis_add_sub_imm3,
        // 0x20
        Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8,
        Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8,
        Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8,
        Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8,
        // 0x30
        Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8,
        Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8,
        Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8,
        Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8, Self::dis_alu_imm8,
        // 0x40
        Self::dis_alu, Self::dis_alu, Self::dis_alu, Self::dis_alu,
        Self::dis_add_hi, Self::dis_cmp_hi, Self::dis_mov_hi, Self::dis_bx,
        Self::dis_ldr_pc, Self::dis_ldr_pc, Self::dis_ldr_pc, Self::dis_ldr_pc,
        Self::dis_ldr_pc, Self::dis_ldr_pc, Self::dis_ldr_pc, Self::dis_ldr_pc,
        // 0x50
        Self::dis_transfer_reg, Self::dis_transfer_reg, Self::dis_transfer_reg, Self::dis_transfer_reg,
        Self::dis_transfer_reg, Self::dis_transfer_reg, Self::dis_transfer_reg, Self::dis_transfer_reg,
        Self::dis_transfer_reg, Self::dis_transfer_reg, Self::dis_transfer_reg, Self::dis_transfer_reg,
        Self::dis_transfer_reg, Self::dis_transfer_reg, Self::dis_transfer_reg, Self::dis_transfer_reg,
        // 0x60
        Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm,
        Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm,
        Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm,
        Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm,
        // 0x70
        Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm,
        Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm,
        Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm,
        Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm, Self::dis_transfer_imm,
        // 0x80
        Self::dis_transfer_half, Self::dis_transfer_half, Self::dis_transfer_half, Self::dis_transfer_half,
        Self::dis_transfer_half, Self::dis_transfer_half, Self::dis_transfer_half, Self::dis_transfer_half,
        Self::dis_transfer_half, Self::dis_transfer_half, Self::dis_transfer_half, Self::dis_transfer_half,
        Self::dis_transfer_half, Self::dis_transfer_half, Self::dis_transfer_half, Self::dis_transfer_half,
        // 0x90
        Self::dis_transfer_sp, Self::dis_transfer_sp, Self::dis_transfer_sp, Self::dis_transfer_sp,
        Self::dis_transfer_sp, Self::dis_transfer_sp, Self::dis_transfer_sp, Self::dis_transfer_sp,
        Self::dis_transfer_sp, Self::dis_transfer_sp, Self::dis_transfer_sp, Self::dis_transfer_sp,
        Self::dis_transfer_sp, Self::dis_transfer_sp, Self::dis_transfer_sp, Self::dis_transfer_sp,
        // 0xA0
        Self::dis_add_addr, Self::dis_add_addr, Self::dis_add_addr, Self::dis_add_addr,
        Self::dis_add_addr, Self::dis_add_addr, Self::dis_add_addr, Self::dis_add_addr,
        Self::dis_add_addr, Self::dis_add_addr, Self::dis_add_addr, Self::dis_add_addr,
        Self::dis_add_addr, Self::dis_add_addr, Self::dis_add_addr, Self::dis_add_addr,
        // 0xB0
        Self::dis_add_sp_imm7, Self::dis_undefined, Self::dis_undefined, Self::dis_undefined,
        Self::dis_push, Self::dis_push, Self::dis_undefined, Self::dis_undefined,
        Self::dis_undefined, Self::dis_undefined, Self::dis_undefined, Self::dis_undefined,
        Self::dis_pop, Self::dis_pop, Self::dis_undefined, Self::dis_undefined,
        // 0xC0
        Self::dis_stm, Self::dis_stm, Self::dis_stm, Self::dis_stm,
        Self::dis_stm, Self::dis_stm, Self::dis_stm, Self::dis_stm,
        Self::dis_ldm, Self::dis_ldm, Self::dis_ldm, Self::dis_ldm,
        Self::dis_ldm, Self::dis_ldm, Self::dis_ldm, Self::dis_ldm,
        // 0xD0
        Self::dis_b_cond, Self::dis_b_cond, Self::dis_b_cond, Self::dis_b_cond,
        Self::dis_b_cond, Self::dis_b_cond, Self::dis_b_cond, Self::dis_b_cond,
        Self::dis_b_cond, Self::dis_b_cond, Self::dis_b_cond, Self::dis_b_cond,
        Self::dis_b_cond, Self::dis_b_cond, Self::dis_undefined, Self::dis_swi,
        // 0xE0
        Self::dis_b, Self::dis_b, Self::dis_b, Self::dis_b,
        Self::dis_b, Self::dis_b, Self::dis_b, Self::dis_b,
        Self::dis_bl_tail, Self::dis_bl_tail, Self::dis_bl_tail, Self::dis_bl_tail,
        Self::dis_bl_tail, Self::dis_bl_tail, Self::dis_bl_tail, Self::dis_bl_tail,
        // 0xF0
        Self::dis_bl_head, Self::dis_bl_head, Self::dis_bl_head, Self::dis_bl_head,
        Self::dis_bl_head, Self::dis_bl_head, Self::dis_bl_head, Self::dis_bl_head,
        Self::dis_bl_tail, Self::dis_bl_tail, Self::dis_bl_tail, Self::dis_bl_tail,
        Self::dis_bl_tail, Self::dis_bl_tail, Self::dis_bl_tail, Self::dis_bl_tail,
    ];

    fn dis_shift_imm(&mut self, op: u16, _pc: u32) -> String {
        let name = ["lsl", "lsr", "asr"][((op >> 11) & 3) as usize];
        format!(
            "{:<10}{}, {}, #{}",
            name,
            reg(op & 7),
            reg((op >> 3) & 7),
            (op >> 6) & 0x1F
        )
    }

    fn dis_add_sub_reg(&mut self, op: u16, _pc: u32) -> String {
        let name = if test_bit(op, 9) { "sub" } else { "add" };
        format!(
            "{:<10}{}, {}, {}",
            name,
            reg(op & 7),
            reg((op >> 3) & 7),
            reg((op >> 6) & 7)
        )
    }

    fn dis_add_sub_imm3(&mut self, op: u16, _pc: u32) -> String {
        let name = if test_bit(op, 9) { "sub" } else { "add" };
        format!(
            "{:<10}{}, {}, #{}",
            name,
            reg(op & 7),
            reg((op >> 3) & 7),
            (op >> 6) & 7
        )
    }

    fn dis_alu_imm8(&mut self, op: u16, _pc: u32) -> String {
        let name = ["mov", "cmp", "add", "sub"][((op >> 11) & 3) as usize];
        format!("{:<10}{}, #0x{:x}", name, reg((op >> 8) & 7), op & 0xFF)
    }

    // All sixteen register-ALU operations render the same two operands, so
    // one routine covers the whole secondary table.
    fn dis_alu(&mut self, op: u16, _pc: u32) -> String {
        let name = ALU_NAMES[((op >> 6) & 0xF) as usize];
        format!("{:<10}{}, {}", name, reg(op & 7), reg((op >> 3) & 7))
    }

    fn dis_add_hi(&mut self, op: u16, _pc: u32) -> String {
        format!(
            "{:<10}{}, {}",
            "add",
            reg((op & 7) | ((op & 0x80) >> 4)),
            reg((op >> 3) & 0xF)
        )
    }

    fn dis_cmp_hi(&mut self, op: u16, _pc: u32) -> String {
        format!(
            "{:<10}{}, {}",
            "cmp",
            reg((op & 7) | ((op & 0x80) >> 4)),
            reg((op >> 3) & 0xF)
        )
    }

    fn dis_mov_hi(&mut self, op: u16, _pc: u32) -> String {
        format!(
            "{:<10}{}, {}",
            "mov",
            reg((op & 7) | ((op & 0x80) >> 4)),
            reg((op >> 3) & 0xF)
        )
    }

    fn dis_bx(&mut self, op: u16, _pc: u32) -> String {
        let name = if test_bit(op, 7) { "blx" } else { "bx" };
        format!("{:<10}{}", name, reg((op >> 3) & 0xF))
    }

    fn dis_ldr_pc(&mut self, op: u16, pc: u32) -> String {
        let addr = (pc.wrapping_add(4) & !2).wrapping_add(u32::from(op & 0xFF) * 4);
        let value = self.bus.read32(addr);
        format!("{:<10}{}, = 0x{:x}", "ldr", reg((op >> 8) & 7), value)
    }

    fn dis_transfer_reg(&mut self, op: u16, _pc: u32) -> String {
        let name = if test_bit(op, 9) {
            ["strh", "ldsb", "ldrh", "ldsh"][((op >> 10) & 3) as usize]
        } else {
            ["str", "strb", "ldr", "ldrb"][((op >> 10) & 3) as usize]
        };
        format!(
            "{:<10}{}, [{}, {}]",
            name,
            reg(op & 7),
            reg((op >> 3) & 7),
            reg((op >> 6) & 7)
        )
    }

    fn dis_transfer_imm(&mut self, op: u16, _pc: u32) -> String {
        let name = ["str", "ldr", "strb", "ldrb"][((op >> 11) & 3) as usize];
        let scale = if test_bit(op, 12) { 1 } else { 4 };
        format!(
            "{:<10}{}, [{}, #0x{:x}]",
            name,
            reg(op & 7),
            reg((op >> 3) & 7),
            u32::from((op >> 6) & 0x1F) * scale
        )
    }

    fn dis_transfer_half(&mut self, op: u16, _pc: u32) -> String {
        let name = if test_bit(op, 11) { "ldrh" } else { "strh" };
        format!(
            "{:<10}{}, [{}, #0x{:x}]",
            name,
            reg(op & 7),
            reg((op >> 3) & 7),
            u32::from((op >> 6) & 0x1F) * 2
        )
    }

    fn dis_transfer_sp(&mut self, op: u16, _pc: u32) -> String {
        let name = if test_bit(op, 11) { "ldr" } else { "str" };
        format!(
            "{:<10}{}, [sp, #0x{:x}]",
            name,
            reg((op >> 8) & 7),
            u32::from(op & 0xFF) * 4
        )
    }

    fn dis_add_addr(&mut self, op: u16, _pc: u32) -> String {
        let base = if test_bit(op, 11) { "sp" } else { "pc" };
        format!(
            "{:<10}{}, {}, #0x{:x}",
            "add",
            reg((op >> 8) & 7),
            base,
            u32::from(op & 0xFF) * 4
        )
    }

    fn dis_add_sp_imm7(&mut self, op: u16, _pc: u32) -> String {
        let name = if test_bit(op, 7) { "sub" } else { "add" };
        format!("{:<10}sp, #0x{:x}", name, u32::from(op & 0x7F) * 4)
    }

    fn dis_push(&mut self, op: u16, _pc: u32) -> String {
        let mask = (op & 0xFF) | ((op & 0x100) << 6);
        format!("{:<10}{}", "push", reg_list(mask))
    }

    fn dis_pop(&mut self, op: u16, _pc: u32) -> String {
        let mask = (op & 0xFF) | ((op & 0x100) << 7);
        format!("{:<10}{}", "pop", reg_list(mask))
    }

    fn dis_stm(&mut self, op: u16, _pc: u32) -> String {
        format!(
            "{:<10}{}!, {}",
            "stm",
            reg((op >> 8) & 7),
            reg_list(op & 0xFF)
        )
    }

    fn dis_ldm(&mut self, op: u16, _pc: u32) -> String {
        // Writeback is suppressed when the base is in the list.
        let rbx = (op >> 8) & 7;
        let bang = if test_bit(op, rbx as usize) { "" } else { "!" };
        format!(
            "{:<10}{}{}, {}",
            "ldm",
            reg(rbx),
            bang,
            reg_list(op & 0xFF)
        )
    }

    fn dis_b_cond(&mut self, op: u16, pc: u32) -> String {
        let name = COND_NAMES[((op >> 8) & 0xF) as usize];
        let offset = i32::from((op & 0xFF) as u8 as i8) * 2;
        let target = pc.wrapping_add(4).wrapping_add(offset as u32);
        format!("{:<10}{:x}", name, target)
    }

    fn dis_swi(&mut self, op: u16, _pc: u32) -> String {
        format!("{:<10}#0x{:x}", "swi", op & 0xFF)
    }

    fn dis_b(&mut self, op: u16, pc: u32) -> String {
        let offset = i32::from((op << 5) as i16 >> 4);
        let target = pc.wrapping_add(4).wrapping_add(offset as u32);
        format!("{:<10}{:x}", "b", target)
    }

    fn dis_bl_head(&mut self, op: u16, pc: u32) -> String {
        // Peek at the second halfword to resolve the full target.
        let op2 = self.bus.fetch16(pc.wrapping_add(2));
        let name = if test_bit(op2, 12) { "bl" } else { "blx" };
        let offset = (((u32::from(op & 0x7FF) << 23) as i32) >> 11)
            .wrapping_add(i32::from(op2 & 0x7FF) << 1);
        let target = pc.wrapping_add(4).wrapping_add(offset as u32);
        format!("{:<10}{:x}", name, target)
    }

    fn dis_bl_tail(&mut self, _op: u16, _pc: u32) -> String {
        String::from("[continued]")
    }

    fn dis_undefined(&mut self, op: u16, _pc: u32) -> String {
        format!("dw {:x}", op)
    }
}
