/// Thumb (16-bit) instruction set executor.
///
/// Dispatch is a 256-entry table keyed on the high byte of the opcode, so
/// every one of the 65536 encodings resolves to exactly one handler. The
/// register-ALU format encodes its operation below bit 8 and goes through a
/// second 16-entry table keyed on bits 6-9.

use super::constants::*;
use super::{Arch, Cpu, Exception};
use crate::bus::Bus;
use crate::common::u16::test_bit;

type ThumbOp<B> = fn(&mut Cpu<B>, u16);

impl<B: Bus> Cpu<B> {
    /// Decode and execute the instruction.
    pub(super) fn execute_thumb(&mut self, op: u16) {
        Self::THUMB_TABLE[(op >> 8) as usize](self, op);
    }

    const THUMB_TABLE: [ThumbOp<B>; 256] = [
        // 0x00: shift by immediate
        Self::op_lsl_imm, Self::op_lsl_imm, Self::op_lsl_imm, Self::op_lsl_imm,
        Self::op_lsl_imm, Self::op_lsl_imm, Self::op_lsl_imm, Self::op_lsl_imm,
        Self::op_lsr_imm, Self::op_lsr_imm, Self::op_lsr_imm, Self::op_lsr_imm,
        Self::op_lsr_imm, Self::op_lsr_imm, Self::op_lsr_imm, Self::op_lsr_imm,
        // 0x10
        Self::op_asr_imm, Self::op_asr_imm, Self::op_asr_imm, Self::op_asr_imm,
        Self::op_asr_imm, Self::op_asr_imm, Self::op_asr_imm, Self::op_asr_imm,
        Self::op_add_reg, Self::op_add_reg, Self::op_sub_reg, Self::op_sub_reg,
        Self::op_add_imm3, Self::op_add_imm3, Self::op_sub_imm3, Self::op_sub_imm3,
        // 0x20: ALU with 8-bit immediate
        Self::op_mov_imm8, Self::op_mov_imm8, Self::op_mov_imm8, Self::op_mov_imm8,
        Self::op_mov_imm8, Self::op_mov_imm8, Self::op_mov_imm8, Self::op_mov_imm8,
        Self::op_cmp_imm8, Self::op_cmp_imm8, Self::op_cmp_imm8, Self::op_cmp_imm8,
        Self::op_cmp_imm8, Self::op_cmp_imm8, Self::op_cmp_imm8, Self::op_cmp_imm8,
        // 0x30
        Self::op_add_imm8, Self::op_add_imm8, Self::op_add_imm8, Self::op_add_imm8,
        Self::op_add_imm8, Self::op_add_imm8, Self::op_add_imm8, Self::op_add_imm8,
        Self::op_sub_imm8, Self::op_sub_imm8, Self::op_sub_imm8, Self::op_sub_imm8,
        Self::op_sub_imm8, Self::op_sub_imm8, Self::op_sub_imm8, Self::op_sub_imm8,
        // 0x40: register ALU (second-level dispatch), hi-register ops, BX
        Self::op_alu, Self::op_alu, Self::op_alu, Self::op_alu,
        Self::op_add_hi, Self::op_cmp_hi, Self::op_mov_hi, Self::op_bx,
        Self::op_ldr_pc, Self::op_ldr_pc, Self::op_ldr_pc, Self::op_ldr_pc,
        Self::op_ldr_pc, Self::op_ldr_pc, Self::op_ldr_pc, Self::op_ldr_pc,
        // 0x50: register-offset loads and stores
        Self::op_str_reg, Self::op_str_reg, Self::op_strh_reg, Self::op_strh_reg,
        Self::op_strb_reg, Self::op_strb_reg, Self::op_ldsb_reg, Self::op_ldsb_reg,
        Self::op_ldr_reg, Self::op_ldr_reg, Self::op_ldrh_reg, Self::op_ldrh_reg,
        Self::op_ldrb_reg, Self::op_ldrb_reg, Self::op_ldsh_reg, Self::op_ldsh_reg,
        // 0x60: immediate-offset loads and stores
        Self::op_str_imm, Self::op_str_imm, Self::op_str_imm, Self::op_str_imm,
        Self::op_str_imm, Self::op_str_imm, Self::op_str_imm, Self::op_str_imm,
        Self::op_ldr_imm, Self::op_ldr_imm, Self::op_ldr_imm, Self::op_ldr_imm,
        Self::op_ldr_imm, Self::op_ldr_imm, Self::op_ldr_imm, Self::op_ldr_imm,
        // 0x70
        Self::op_strb_imm, Self::op_strb_imm, Self::op_strb_imm, Self::op_strb_imm,
        Self::op_strb_imm, Self::op_strb_imm, Self::op_strb_imm, Self::op_strb_imm,
        Self::op_ldrb_imm, Self::op_ldrb_imm, Self::op_ldrb_imm, Self::op_ldrb_imm,
        Self::op_ldrb_imm, Self::op_ldrb_imm, Self::op_ldrb_imm, Self::op_ldrb_imm,
        // 0x80: halfword loads and stores
        Self::op_strh_imm, Self::op_strh_imm, Self::op_strh_imm, Self::op_strh_imm,
        Self::op_strh_imm, Self::op_strh_imm, Self::op_strh_imm, Self::op_strh_imm,
        Self::op_ldrh_imm, Self::op_ldrh_imm, Self::op_ldrh_imm, Self::op_ldrh_imm,
        Self::op_ldrh_imm, Self::op_ldrh_imm, Self::op_ldrh_imm, Self::op_ldrh_imm,
        // 0x90: SP-relative loads and stores
        Self::op_str_sp, Self::op_str_sp, Self::op_str_sp, Self::op_str_sp,
        Self::op_str_sp, Self::op_str_sp, Self::op_str_sp, Self::op_str_sp,
        Self::op_ldr_sp, Self::op_ldr_sp, Self::op_ldr_sp, Self::op_ldr_sp,
        Self::op_ldr_sp, Self::op_ldr_sp, Self::op_ldr_sp, Self::op_ldr_sp,
        // 0xA0: address generation
        Self::op_add_pc, Self::op_add_pc, Self::op_add_pc, Self::op_add_pc,
        Self::op_add_pc, Self::op_add_pc, Self::op_add_pc, Self::op_add_pc,
        Self::op_add_sp, Self::op_add_sp, Self::op_add_sp, Self::op_add_sp,
        Self::op_add_sp, Self::op_add_sp, Self::op_add_sp, Self::op_add_sp,
        // 0xB0: SP adjust, push/pop
        Self::op_add_sp_imm7, Self::op_undefined, Self::op_undefined, Self::op_undefined,
        Self::op_push, Self::op_push, Self::op_undefined, Self::op_undefined,
        Self::op_undefined, Self::op_undefined, Self::op_undefined, Self::op_undefined,
        Self::op_pop, Self::op_pop, Self::op_undefined, Self::op_undefined,
        // 0xC0: multiple loads and stores
        Self::op_stm, Self::op_stm, Self::op_stm, Self::op_stm,
        Self::op_stm, Self::op_stm, Self::op_stm, Self::op_stm,
        Self::op_ldm, Self::op_ldm, Self::op_ldm, Self::op_ldm,
        Self::op_ldm, Self::op_ldm, Self::op_ldm, Self::op_ldm,
        // 0xD0: conditional branches, SWI
        Self::op_b_cond, Self::op_b_cond, Self::op_b_cond, Self::op_b_cond,
        Self::op_b_cond, Self::op_b_cond, Self::op_b_cond, Self::op_b_cond,
        Self::op_b_cond, Self::op_b_cond, Self::op_b_cond, Self::op_b_cond,
        Self::op_b_cond, Self::op_b_cond, Self::op_undef_cond, Self::op_swi,
        // 0xE0: unconditional branch, long branch
        Self::op_b, Self::op_b, Self::op_b, Self::op_b,
        Self::op_b, Self::op_b, Self::op_b, Self::op_b,
        Self::op_bl_tail, Self::op_bl_tail, Self::op_bl_tail, Self::op_bl_tail,
        Self::op_bl_tail, Self::op_bl_tail, Self::op_bl_tail, Self::op_bl_tail,
        // 0xF0
        Self::op_bl_head, Self::op_bl_head, Self::op_bl_head, Self::op_bl_head,
        Self::op_bl_head, Self::op_bl_head, Self::op_bl_head, Self::op_bl_head,
        Self::op_bl_tail, Self::op_bl_tail, Self::op_bl_tail, Self::op_bl_tail,
        Self::op_bl_tail, Self::op_bl_tail, Self::op_bl_tail, Self::op_bl_tail,
    ];

    const THUMB_ALU_TABLE: [ThumbOp<B>; 16] = [
        Self::alu_and, Self::alu_eor, Self::alu_lsl, Self::alu_lsr,
        Self::alu_asr, Self::alu_adc, Self::alu_sbc, Self::alu_ror,
        Self::alu_tst, Self::alu_neg, Self::alu_cmp, Self::alu_cmn,
        Self::alu_orr, Self::alu_mul, Self::alu_bic, Self::alu_mvn,
    ];

    // Shift by immediate.
    // A zero shift amount leaves C unchanged for LSL, but means
    // "shift by 32" for LSR and ASR.

    fn op_lsl_imm(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let offset = u32::from((op >> 6) & 0x1F);
        if offset != 0 {
            self.cpsr.set_c((rs & (1 << (32 - offset))) != 0);
        }
        let res = rs << offset;
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn op_lsr_imm(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let mut offset = u32::from((op >> 6) & 0x1F);
        if offset == 0 {
            offset = 32;
        }
        self.cpsr.set_c((rs & (1 << (offset - 1))) != 0);
        let res = rs.checked_shr(offset).unwrap_or(0);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn op_asr_imm(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let mut offset = u32::from((op >> 6) & 0x1F);
        if offset == 0 {
            offset = 32;
        }
        self.cpsr.set_c((rs & (1 << (offset - 1))) != 0);
        let res = ((rs as i32) >> offset.min(31)) as u32;
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    // Three-operand add/subtract, register or 3-bit immediate.

    fn op_add_reg(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let val = self.regs[((op >> 6) & 7) as usize];
        self.do_add(op, rs, val);
    }

    fn op_sub_reg(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let val = self.regs[((op >> 6) & 7) as usize];
        self.do_sub(op, rs, val);
    }

    fn op_add_imm3(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let val = u32::from((op >> 6) & 7);
        self.do_add(op, rs, val);
    }

    fn op_sub_imm3(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let val = u32::from((op >> 6) & 7);
        self.do_sub(op, rs, val);
    }

    fn do_add(&mut self, op: u16, rs: u32, val: u32) {
        let res = rs.wrapping_add(val);
        self.cpsr.set_c(res < rs);
        self.cpsr.set_v_add(rs, val, res);
        self.cpsr.set_nz(res);
        self.regs[(op & 7) as usize] = res;
    }

    fn do_sub(&mut self, op: u16, rs: u32, val: u32) {
        let res = rs.wrapping_sub(val);
        self.cpsr.set_c(res <= rs);
        self.cpsr.set_v_sub(rs, val, res);
        self.cpsr.set_nz(res);
        self.regs[(op & 7) as usize] = res;
    }

    // Move/compare/add/subtract with 8-bit immediate.

    fn op_mov_imm8(&mut self, op: u16) {
        let rdx = ((op >> 8) & 7) as usize;
        let res = u32::from(op & 0xFF);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn op_cmp_imm8(&mut self, op: u16) {
        let rd = self.regs[((op >> 8) & 7) as usize];
        let imm = u32::from(op & 0xFF);
        let res = rd.wrapping_sub(imm);
        self.cpsr.set_c(res <= rd);
        self.cpsr.set_v_sub(rd, imm, res);
        self.cpsr.set_nz(res);
    }

    fn op_add_imm8(&mut self, op: u16) {
        let rdx = ((op >> 8) & 7) as usize;
        let rd = self.regs[rdx];
        let imm = u32::from(op & 0xFF);
        let res = rd.wrapping_add(imm);
        self.cpsr.set_c(res < rd);
        self.cpsr.set_v_add(rd, imm, res);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn op_sub_imm8(&mut self, op: u16) {
        let rdx = ((op >> 8) & 7) as usize;
        let rd = self.regs[rdx];
        let imm = u32::from(op & 0xFF);
        let res = rd.wrapping_sub(imm);
        self.cpsr.set_c(res <= rd);
        self.cpsr.set_v_sub(rd, imm, res);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    // Register ALU: the operation lives in bits 6-9, below the reach of the
    // primary table, so dispatch a second time instead of decoding at
    // runtime.

    fn op_alu(&mut self, op: u16) {
        Self::THUMB_ALU_TABLE[((op >> 6) & 0xF) as usize](self, op);
    }

    fn alu_and(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let res = self.regs[rdx] & rs;
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_eor(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let res = self.regs[rdx] ^ rs;
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    // Shifts by register take the low byte of Rs, so the amount can reach
    // 255; anything past 32 shifts every bit (and the carry) out.

    fn alu_lsl(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let rd = self.regs[rdx];
        let shift = rs & 0xFF;
        if shift != 0 {
            self.cpsr.set_c(shift <= 32 && (rd & (1 << (32 - shift))) != 0);
        }
        let res = rd.checked_shl(shift).unwrap_or(0);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_lsr(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let rd = self.regs[rdx];
        let shift = rs & 0xFF;
        if shift != 0 {
            self.cpsr.set_c(shift <= 32 && (rd & (1 << (shift - 1))) != 0);
        }
        let res = rd.checked_shr(shift).unwrap_or(0);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_asr(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let rd = self.regs[rdx];
        let shift = rs & 0xFF;
        if shift != 0 {
            self.cpsr.set_c(shift <= 32 && (rd & (1 << (shift - 1))) != 0);
        }
        let res = (rd as i32).checked_shr(shift).unwrap_or((rd as i32) >> 31) as u32;
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    // ADC/SBC: C and V capture the pre-carry step, the carry is folded in
    // afterwards. NZ reflect the final result.

    fn alu_adc(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let rd = self.regs[rdx];
        let cf = self.cpsr.carry();
        let mut res = rd.wrapping_add(rs);
        self.cpsr.set_c(res < rd);
        self.cpsr.set_v_add(rd, rs, res);
        res = res.wrapping_add(cf);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_sbc(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let rd = self.regs[rdx];
        let cf = self.cpsr.carry();
        let mut res = rd.wrapping_sub(rs);
        self.cpsr.set_c(res <= rd);
        self.cpsr.set_v_sub(rd, rs, res);
        res = res.wrapping_add(cf).wrapping_sub(1);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_ror(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let rd = self.regs[rdx];
        let shift = rs & 0xFF;
        if shift != 0 {
            self.cpsr.set_c(shift <= 32 && (rd & (1 << (shift - 1))) != 0);
        }
        let res = rd.rotate_right(rs & 0x1F);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_tst(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rd = self.regs[(op & 7) as usize];
        self.cpsr.set_nz(rd & rs);
    }

    fn alu_neg(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let res = 0u32.wrapping_sub(rs);
        self.cpsr.set_c(true);
        self.cpsr.set_v_sub(0, rs, res);
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_cmp(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rd = self.regs[(op & 7) as usize];
        let res = rd.wrapping_sub(rs);
        self.cpsr.set_c(res <= rd);
        self.cpsr.set_v_sub(rd, rs, res);
        self.cpsr.set_nz(res);
    }

    fn alu_cmn(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rd = self.regs[(op & 7) as usize];
        let res = rd.wrapping_add(rs);
        self.cpsr.set_c(res < rd);
        self.cpsr.set_v_add(rd, rs, res);
        self.cpsr.set_nz(res);
    }

    fn alu_orr(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let res = self.regs[rdx] | rs;
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_mul(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let res = self.regs[rdx].wrapping_mul(rs);
        // ARMv4 leaves C meaningless after a multiply; ARMv5 preserves it.
        if self.arch <= Arch::ARMv4 {
            self.cpsr.set_c(false);
        }
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_bic(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let res = self.regs[rdx] & !rs;
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    fn alu_mvn(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 7) as usize];
        let rdx = (op & 7) as usize;
        let res = !rs;
        self.cpsr.set_nz(res);
        self.regs[rdx] = res;
    }

    // Hi-register operations. The destination index gains bit 7 of the
    // opcode as its high bit. ADD and MOV do not touch the flags.

    fn op_add_hi(&mut self, op: u16) {
        let rdx = ((op & 7) | ((op & 0x80) >> 4)) as usize;
        let rs = self.regs[((op >> 3) & 0xF) as usize];
        self.regs[rdx] = self.regs[rdx].wrapping_add(rs);
        if rdx == PC_REG {
            self.pc = self.regs[PC_REG] & !1;
        }
    }

    fn op_cmp_hi(&mut self, op: u16) {
        let rdx = ((op & 7) | ((op & 0x80) >> 4)) as usize;
        let rs = self.regs[((op >> 3) & 0xF) as usize];
        let rd = self.regs[rdx];
        let res = rd.wrapping_sub(rs);
        self.cpsr.set_nz(res);
        self.cpsr.set_c(res <= rd);
        self.cpsr.set_v_sub(rd, rs, res);
    }

    fn op_mov_hi(&mut self, op: u16) {
        let rdx = ((op & 7) | ((op & 0x80) >> 4)) as usize;
        let rs = self.regs[((op >> 3) & 0xF) as usize];
        self.regs[rdx] = rs;
        if rdx == PC_REG {
            self.pc = rs & !1;
        }
    }

    /// BX/BLX: bit 0 of the target selects the instruction set to continue
    /// in. BLX (bit 7) also links.
    fn op_bx(&mut self, op: u16) {
        let rs = self.regs[((op >> 3) & 0xF) as usize];
        if test_bit(op, 7) {
            self.regs[LINK_REG] = self.regs[PC_REG].wrapping_add(1);
        }
        self.pc = rs & !1;
        if (rs & 1) == 0 {
            self.cpsr.set_t(false);
            self.pc &= !3;
        }
    }

    /// LDR from the literal pool: the base is the prefetch PC with bit 1
    /// forced clear.
    fn op_ldr_pc(&mut self, op: u16) {
        let rdx = ((op >> 8) & 7) as usize;
        let addr = (self.regs[PC_REG] & !2).wrapping_add(u32::from(op & 0xFF) * 4);
        self.regs[rdx] = self.op_read32(addr);
    }

    // Loads and stores with register offset.

    fn op_str_reg(&mut self, op: u16) {
        let addr = self.reg_offset_addr(op);
        let data = self.regs[(op & 7) as usize];
        self.op_write32(addr, data);
    }

    fn op_strb_reg(&mut self, op: u16) {
        let addr = self.reg_offset_addr(op);
        let data = self.regs[(op & 7) as usize];
        self.op_write8(addr, data as u8);
    }

    fn op_ldr_reg(&mut self, op: u16) {
        let addr = self.reg_offset_addr(op);
        self.regs[(op & 7) as usize] = self.op_read32(addr);
    }

    fn op_ldrb_reg(&mut self, op: u16) {
        let addr = self.reg_offset_addr(op);
        self.regs[(op & 7) as usize] = u32::from(self.op_read8(addr));
    }

    fn op_strh_reg(&mut self, op: u16) {
        let addr = self.reg_offset_addr(op);
        let data = self.regs[(op & 7) as usize];
        self.op_write16(addr, data as u16);
    }

    fn op_ldrh_reg(&mut self, op: u16) {
        let addr = self.reg_offset_addr(op);
        self.regs[(op & 7) as usize] = u32::from(self.op_read16(addr));
    }

    fn op_ldsb_reg(&mut self, op: u16) {
        let addr = self.reg_offset_addr(op);
        self.regs[(op & 7) as usize] = self.op_read8(addr) as i8 as u32;
    }

    fn op_ldsh_reg(&mut self, op: u16) {
        let addr = self.reg_offset_addr(op);
        self.regs[(op & 7) as usize] = self.op_read16(addr) as i16 as u32;
    }

    fn reg_offset_addr(&self, op: u16) -> u32 {
        let rb = self.regs[((op >> 3) & 7) as usize];
        let ro = self.regs[((op >> 6) & 7) as usize];
        rb.wrapping_add(ro)
    }

    // Loads and stores with immediate offset, scaled by the access size.

    fn op_str_imm(&mut self, op: u16) {
        let addr = self.imm_offset_addr(op, 4);
        let data = self.regs[(op & 7) as usize];
        self.op_write32(addr, data);
    }

    fn op_ldr_imm(&mut self, op: u16) {
        let addr = self.imm_offset_addr(op, 4);
        self.regs[(op & 7) as usize] = self.op_read32(addr);
    }

    fn op_strb_imm(&mut self, op: u16) {
        let addr = self.imm_offset_addr(op, 1);
        let data = self.regs[(op & 7) as usize];
        self.op_write8(addr, data as u8);
    }

    fn op_ldrb_imm(&mut self, op: u16) {
        let addr = self.imm_offset_addr(op, 1);
        self.regs[(op & 7) as usize] = u32::from(self.op_read8(addr));
    }

    fn op_strh_imm(&mut self, op: u16) {
        let addr = self.imm_offset_addr(op, 2);
        let data = self.regs[(op & 7) as usize];
        self.op_write16(addr, data as u16);
    }

    fn op_ldrh_imm(&mut self, op: u16) {
        let addr = self.imm_offset_addr(op, 2);
        self.regs[(op & 7) as usize] = u32::from(self.op_read16(addr));
    }

    fn imm_offset_addr(&self, op: u16, scale: u32) -> u32 {
        let rb = self.regs[((op >> 3) & 7) as usize];
        let offset = u32::from((op >> 6) & 0x1F) * scale;
        rb.wrapping_add(offset)
    }

    // SP-relative loads and stores.

    fn op_str_sp(&mut self, op: u16) {
        let addr = self.regs[SP_REG].wrapping_add(u32::from(op & 0xFF) * 4);
        let data = self.regs[((op >> 8) & 7) as usize];
        self.op_write32(addr, data);
    }

    fn op_ldr_sp(&mut self, op: u16) {
        let addr = self.regs[SP_REG].wrapping_add(u32::from(op & 0xFF) * 4);
        self.regs[((op >> 8) & 7) as usize] = self.op_read32(addr);
    }

    // Address generation.

    fn op_add_pc(&mut self, op: u16) {
        let rdx = ((op >> 8) & 7) as usize;
        let offset = u32::from(op & 0xFF) * 4;
        self.regs[rdx] = (self.regs[PC_REG] & !2).wrapping_add(offset);
    }

    fn op_add_sp(&mut self, op: u16) {
        let rdx = ((op >> 8) & 7) as usize;
        let offset = u32::from(op & 0xFF) * 4;
        self.regs[rdx] = self.regs[SP_REG].wrapping_add(offset);
    }

    fn op_add_sp_imm7(&mut self, op: u16) {
        let offset = u32::from(op & 0x7F) * 4;
        if test_bit(op, 7) {
            self.regs[SP_REG] = self.regs[SP_REG].wrapping_sub(offset);
        } else {
            self.regs[SP_REG] = self.regs[SP_REG].wrapping_add(offset);
        }
    }

    // Push/pop. Bit 8 of the opcode extends the list with LR (push) or
    // PC (pop).

    fn op_push(&mut self, op: u16) {
        let count = u32::from(op & 0x1FF).count_ones();
        let mut sp = self.regs[SP_REG].wrapping_sub(count * 4);
        self.regs[SP_REG] = sp;
        for i in 0..9 {
            if test_bit(op, i) {
                let reg = if i == 8 { LINK_REG } else { i };
                let data = self.regs[reg];
                self.op_write32(sp, data);
                sp = sp.wrapping_add(4);
            }
        }
    }

    /// POP. Loading PC differs by revision: ARMv4 stays in Thumb state no
    /// matter what, ARMv5 honors bit 0 of the loaded value like BX.
    fn op_pop(&mut self, op: u16) {
        let mut sp = self.regs[SP_REG];
        for i in 0..9 {
            if test_bit(op, i) {
                if i == 8 {
                    let pc = self.op_read32(sp);
                    match self.arch {
                        Arch::ARMv4 => self.pc = pc & !1,
                        Arch::ARMv5 => {
                            if (pc & 1) == 0 {
                                self.cpsr.set_t(false);
                                self.pc = pc & !3;
                            } else {
                                self.pc = pc & !1;
                            }
                        }
                    }
                } else {
                    self.regs[i] = self.op_read32(sp);
                }
                sp = sp.wrapping_add(4);
            }
        }
        self.regs[SP_REG] = sp;
    }

    // Multiple loads and stores.
    //
    // An empty register list is a hardware edge case: ARMv4 transfers R15,
    // ARMv5 transfers nothing; both step the base by 0x40.

    fn op_stm(&mut self, op: u16) {
        let rbx = ((op >> 8) & 7) as usize;
        let mut ptr = self.regs[rbx];

        if (op & 0xFF) == 0 {
            match self.arch {
                Arch::ARMv4 => {
                    let data = self.regs[PC_REG];
                    self.op_write32(ptr, data);
                    ptr = ptr.wrapping_add(0x40);
                }
                Arch::ARMv5 => ptr = ptr.wrapping_add(0x40),
            }
            self.regs[rbx] = ptr;
            return;
        }

        // When the base appears in the list, the first-listed register
        // stores the original base and any later position stores the
        // written-back value.
        let final_base = ptr.wrapping_add(u32::from(op & 0xFF).count_ones() * 4);
        let first = u32::from(op & 0xFF).trailing_zeros() as usize;
        for i in 0..8 {
            if test_bit(op, i) {
                let data = if i == rbx && i != first {
                    final_base
                } else {
                    self.regs[i]
                };
                self.op_write32(ptr, data);
                ptr = ptr.wrapping_add(4);
            }
        }
        self.regs[rbx] = ptr;
    }

    fn op_ldm(&mut self, op: u16) {
        let rbx = ((op >> 8) & 7) as usize;
        let mut ptr = self.regs[rbx];

        if (op & 0xFF) == 0 {
            match self.arch {
                Arch::ARMv4 => {
                    self.regs[PC_REG] = self.op_read32(ptr);
                    ptr = ptr.wrapping_add(0x40);
                }
                Arch::ARMv5 => ptr = ptr.wrapping_add(0x40),
            }
            self.regs[rbx] = ptr;
            return;
        }

        // Writeback is suppressed when the base is in the list: the loaded
        // value wins.
        let mut wb = true;
        for i in 0..8 {
            if test_bit(op, i) {
                self.regs[i] = self.op_read32(ptr);
                if i == rbx {
                    wb = false;
                }
                ptr = ptr.wrapping_add(4);
            }
        }
        if wb {
            self.regs[rbx] = ptr;
        }
    }

    // Branches.

    fn op_b_cond(&mut self, op: u16) {
        let cond = u32::from((op >> 8) & 0xF);
        if self.check_cond(cond) {
            let offset = i32::from((op & 0xFF) as u8 as i8) * 2;
            self.pc = self.regs[PC_REG].wrapping_add(offset as u32);
        }
    }

    fn check_cond(&self, cond: u32) -> bool {
        let cpsr = self.cpsr;
        match cond {
            0x0 => cpsr.z(),              // EQ
            0x1 => !cpsr.z(),             // NE
            0x2 => cpsr.c(),              // HS
            0x3 => !cpsr.c(),             // LO
            0x4 => cpsr.n(),              // MI
            0x5 => !cpsr.n(),             // PL
            0x6 => cpsr.v(),              // VS
            0x7 => !cpsr.v(),             // VC
            0x8 => cpsr.c() && !cpsr.z(), // HI
            0x9 => !cpsr.c() || cpsr.z(), // LS
            0xA => cpsr.n() == cpsr.v(),  // GE
            0xB => cpsr.n() != cpsr.v(),  // LT
            0xC => !cpsr.z() && (cpsr.n() == cpsr.v()), // GT
            0xD => cpsr.z() || (cpsr.n() != cpsr.v()),  // LE
            _ => unreachable!(),
        }
    }

    fn op_undef_cond(&mut self, op: u16) {
        self.invalid_op_thumb(op, "branch with reserved condition");
    }

    fn op_swi(&mut self, _op: u16) {
        self.exception(Exception::Swi);
    }

    fn op_b(&mut self, op: u16) {
        let offset = i32::from((op << 5) as i16 >> 4);
        self.pc = self.regs[PC_REG].wrapping_add(offset as u32);
    }

    // Long branch with link, two halfwords. The first stages the
    // sign-extended upper part in LR; the second finishes the target from
    // LR and re-links. A BLX suffix additionally drops to ARM state.

    fn op_bl_head(&mut self, op: u16) {
        let offset = ((u32::from(op & 0x7FF) << 23) as i32) >> 11;
        self.regs[LINK_REG] = self.regs[PC_REG].wrapping_add(offset as u32);
    }

    fn op_bl_tail(&mut self, op: u16) {
        self.pc = self.regs[LINK_REG].wrapping_add(u32::from(op & 0x7FF) << 1);
        self.regs[LINK_REG] = self.regs[PC_REG].wrapping_sub(2) | 1;
        if !test_bit(op, 12) {
            self.pc &= !2;
            self.cpsr.set_t(false);
        }
    }

    fn op_undefined(&mut self, op: u16) {
        self.invalid_op_thumb(op, "not implemented");
    }
}
