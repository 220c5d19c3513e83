use super::test_utils::*;
use super::Arch;
use crate::bus::Bus;

#[test]
fn test_disasm_covers_every_opcode() {
    // Every 16-bit pattern resolves to exactly one renderer, and rendering
    // is deterministic and free of architectural side effects.
    let mut cpu = thumb_cpu(Arch::ARMv5, &[]);
    for op in 0..=0xFFFFu16 {
        let first = cpu.disasm_thumb(op, CODE_BASE);
        let second = cpu.disasm_thumb(op, CODE_BASE);
        assert!(!first.is_empty(), "op {:04x} rendered nothing", op);
        assert_eq!(first, second, "op {:04x} rendered differently", op);
    }
    assert_eq!(cpu.clock, 0);
    assert_eq!(cpu.regs, [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, CODE_BASE]);
}

#[test]
fn test_disasm_alu_and_shifts() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    assert_eq!(cpu.disasm_thumb(0x0000, 0x100), "lsl       r0, r0, #0");
    assert_eq!(cpu.disasm_thumb(0x0108, 0x100), "lsl       r0, r1, #4");
    assert_eq!(cpu.disasm_thumb(0x1840, 0x100), "add       r0, r0, r1");
    assert_eq!(cpu.disasm_thumb(0x1E48, 0x100), "sub       r0, r1, #1");
    assert_eq!(cpu.disasm_thumb(0x2105, 0x100), "mov       r1, #0x5");
    assert_eq!(cpu.disasm_thumb(0x2806, 0x100), "cmp       r0, #0x6");
    assert_eq!(cpu.disasm_thumb(0x4011, 0x100), "ands      r1, r2");
    assert_eq!(cpu.disasm_thumb(0x4248, 0x100), "negs      r0, r1");
    assert_eq!(cpu.disasm_thumb(0x43D1, 0x100), "mvn       r1, r2");
}

#[test]
fn test_disasm_hi_reg_and_bx() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    assert_eq!(cpu.disasm_thumb(0x4488, 0x100), "add       r8, r1");
    assert_eq!(cpu.disasm_thumb(0x4691, 0x100), "mov       r9, r2");
    assert_eq!(cpu.disasm_thumb(0x4708, 0x100), "bx        r1");
    assert_eq!(cpu.disasm_thumb(0x4788, 0x100), "blx       r1");
}

#[test]
fn test_disasm_resolves_literal_pool() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.bus.write32(0x108, 0xDEAD_BEEF);
    assert_eq!(cpu.disasm_thumb(0x4B01, 0x100), "ldr       r3, = 0xdeadbeef");
    assert_eq!(cpu.clock, 0);
}

#[test]
fn test_disasm_transfers() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    assert_eq!(cpu.disasm_thumb(0x5088, 0x100), "str       r0, [r1, r2]");
    assert_eq!(cpu.disasm_thumb(0x56CB, 0x100), "ldsb      r3, [r1, r2]");
    // Immediate offsets display scaled by the access size.
    assert_eq!(cpu.disasm_thumb(0x6048, 0x100), "str       r0, [r1, #0x4]");
    assert_eq!(cpu.disasm_thumb(0x7048, 0x100), "strb      r0, [r1, #0x1]");
    assert_eq!(cpu.disasm_thumb(0x8048, 0x100), "strh      r0, [r1, #0x2]");
    assert_eq!(cpu.disasm_thumb(0x9002, 0x100), "str       r0, [sp, #0x8]");
    assert_eq!(cpu.disasm_thumb(0xA004, 0x100), "add       r0, pc, #0x10");
    assert_eq!(cpu.disasm_thumb(0xA804, 0x100), "add       r0, sp, #0x10");
}

#[test]
fn test_disasm_stack_and_multiple() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    assert_eq!(cpu.disasm_thumb(0xB006, 0x100), "add       sp, #0x18");
    assert_eq!(cpu.disasm_thumb(0xB086, 0x100), "sub       sp, #0x18");
    assert_eq!(cpu.disasm_thumb(0xB407, 0x100), "push      {r0, r1, r2}");
    assert_eq!(cpu.disasm_thumb(0xB500, 0x100), "push      {lr}");
    assert_eq!(cpu.disasm_thumb(0xBD01, 0x100), "pop       {r0, pc}");
    assert_eq!(cpu.disasm_thumb(0xC10C, 0x100), "stm       r1!, {r2, r3}");
    assert_eq!(cpu.disasm_thumb(0xC802, 0x100), "ldm       r0!, {r1}");
    // No writeback bang when the base is in the list.
    assert_eq!(cpu.disasm_thumb(0xC902, 0x100), "ldm       r1, {r1}");
}

#[test]
fn test_disasm_branches() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    assert_eq!(cpu.disasm_thumb(0xD0FE, 0x100), "beq       100");
    assert_eq!(cpu.disasm_thumb(0xD101, 0x100), "bne       106");
    assert_eq!(cpu.disasm_thumb(0xDF10, 0x100), "swi       #0x10");
    assert_eq!(cpu.disasm_thumb(0xE7FE, 0x100), "b         100");
}

#[test]
fn test_disasm_long_branch() {
    let mut cpu = thumb_cpu(Arch::ARMv5, &[0xF000, 0xF820]);
    assert_eq!(cpu.disassemble_thumb_at(CODE_BASE), "bl        144");
    assert_eq!(cpu.disassemble_thumb_at(CODE_BASE + 2), "[continued]");

    let mut cpu = thumb_cpu(Arch::ARMv5, &[0xF000, 0xE820]);
    assert_eq!(cpu.disassemble_thumb_at(CODE_BASE), "blx       144");
}

#[test]
fn test_disasm_invalid_as_data() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    assert_eq!(cpu.disasm_thumb(0xB100, 0x100), "dw b100");
    // The reserved branch condition renders as data too.
    assert_eq!(cpu.disasm_thumb(0xDE00, 0x100), "dw de00");
}
