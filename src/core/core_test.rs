use super::test_utils::*;
use super::{Arch, Cpu, Exception, Line, Mode};
use crate::bus::Bus;
use crate::coproc::Coprocessor;

#[test]
fn test_mode_swap_round_trip() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.regs[13] = 0x1111;
    cpu.regs[14] = 0x2222;
    cpu.regs[8] = 0x80;
    cpu.regs[12] = 0xC0;

    cpu.swap_mode(Mode::FIQ);
    assert_eq!(cpu.cpsr.mode(), Mode::FIQ);
    assert_eq!(cpu.regs[13], 0);
    cpu.regs[13] = 0x9999;
    cpu.regs[8] = 0x77;

    cpu.swap_mode(Mode::SVC);
    assert_eq!(cpu.regs[13], 0x1111);
    assert_eq!(cpu.regs[14], 0x2222);
    assert_eq!(cpu.regs[8], 0x80);
    assert_eq!(cpu.regs[12], 0xC0);

    // The FIQ copies survive for the next visit.
    cpu.swap_mode(Mode::FIQ);
    assert_eq!(cpu.regs[13], 0x9999);
    assert_eq!(cpu.regs[8], 0x77);
}

#[test]
fn test_non_fiq_modes_share_r8_r12() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.regs[8] = 0x88;
    cpu.swap_mode(Mode::IRQ);
    assert_eq!(cpu.regs[8], 0x88);
    cpu.swap_mode(Mode::UND);
    assert_eq!(cpu.regs[8], 0x88);
}

#[test]
fn test_user_and_system_share_bank() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.swap_mode(Mode::USR);
    cpu.regs[13] = 0x5555;
    cpu.swap_mode(Mode::SYS);
    assert_eq!(cpu.regs[13], 0x5555);
}

#[test]
#[should_panic]
fn test_spsr_for_user_is_fatal() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.spsr_for_mode(Mode::USR);
}

#[test]
#[should_panic]
fn test_spsr_for_system_is_fatal() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.spsr_for_mode(Mode::SYS);
}

#[test]
fn test_exception_entry_thumb_offsets() {
    let cases = [
        (Exception::Reset, Mode::SVC, 0u32),
        (Exception::Undefined, Mode::UND, 0),
        (Exception::Swi, Mode::SVC, 0),
        (Exception::PrefetchAbort, Mode::ABT, 2),
        (Exception::DataAbort, Mode::ABT, 4),
        (Exception::AddressOverflow, Mode::SVC, 0),
        (Exception::Irq, Mode::IRQ, 2),
        (Exception::Fiq, Mode::FIQ, 2),
    ];
    for &(exc, mode, off) in cases.iter() {
        let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
        cpu.pc = 0x3000;
        cpu.exception(exc);
        assert_eq!(cpu.cpsr.mode(), mode, "{:?}", exc);
        assert_eq!(cpu.regs[14], 0x3000 + off, "{:?}", exc);
        assert_eq!(cpu.regs[15], exc as u32 * 4, "{:?}", exc);
        assert!(!cpu.cpsr.t(), "{:?}", exc);
        assert!(cpu.cpsr.i(), "{:?}", exc);
        let f_set = exc == Exception::Reset || exc == Exception::Fiq;
        assert_eq!(cpu.cpsr.f(), f_set, "{:?}", exc);
    }
}

#[test]
fn test_exception_entry_arm_offsets() {
    // Only the data abort adjusts the return address in ARM state.
    for &(exc, off) in [(Exception::DataAbort, 4u32), (Exception::Irq, 0)].iter() {
        let mut cpu = Cpu::new(Arch::ARMv5, TestBus::new());
        cpu.pc = 0x3000;
        cpu.exception(exc);
        assert_eq!(cpu.regs[14], 0x3000 + off, "{:?}", exc);
    }
}

#[test]
fn test_exception_saves_spsr() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.cpsr.set_c(true);
    let before = cpu.cpsr;
    cpu.pc = 0x3000;
    cpu.exception(Exception::Irq);
    assert_eq!(*cpu.spsr_for_mode(Mode::IRQ), before);
    assert_eq!(cpu.spsr().bits(), before.bits());
}

#[test]
fn test_masked_interrupts_are_ignored() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.cpsr.set_i(true);
    cpu.cpsr.set_f(true);
    let before = cpu.cpsr;

    cpu.exception(Exception::Irq);
    assert_eq!(cpu.cpsr, before);
    assert_eq!(cpu.regs[15], CODE_BASE);

    cpu.exception(Exception::Fiq);
    assert_eq!(cpu.cpsr, before);
    assert_eq!(cpu.regs[15], CODE_BASE);
}

#[test]
fn test_swi_from_user_mode() {
    let mut cpu = thumb_cpu(Arch::ARMv5, &[0xDF00]);
    cpu.swap_mode(Mode::USR);
    let before = cpu.cpsr;
    cpu.step();

    assert_eq!(cpu.cpsr.mode(), Mode::SVC);
    assert!(!cpu.cpsr.t());
    assert!(cpu.cpsr.i());
    assert!(!cpu.cpsr.f());
    assert_eq!(*cpu.spsr_for_mode(Mode::SVC), before);
    assert_eq!(cpu.regs[14], 0x102);
    assert_eq!(cpu.regs[15], 0x8);
}

#[test]
fn test_cp15_relocates_vectors() {
    let mut cpu = thumb_cpu(Arch::ARMv5, &[]);
    let cp15 = cpu.enable_cp15();
    cp15.borrow_mut().set_high_vectors(true);
    cpu.pc = 0x200;
    cpu.exception(Exception::Undefined);
    assert_eq!(cpu.regs[15], 0xFFFF_0004);
}

#[test]
fn test_irq_line_respects_mask() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[0x2005]);
    cpu.cpsr.set_i(true);
    cpu.set_line(Line::IRQ, true);
    cpu.step();
    // The instruction ran, no exception was taken.
    assert_eq!(cpu.regs[0], 5);
    assert_eq!(cpu.cpsr.mode(), Mode::SVC);
}

#[test]
fn test_irq_line_delivers() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[0x2005]);
    cpu.set_line(Line::IRQ, true);
    cpu.step();
    // Delivered before the fetch: the pending instruction never ran and the
    // IRQ bank holds the adjusted return address.
    assert_eq!(cpu.regs[0], 0);
    assert_eq!(cpu.spsr_for_mode(Mode::IRQ).mode(), Mode::SVC);
    assert_eq!(*cpu.lr_for_mode(Mode::IRQ), CODE_BASE + 2);
}

#[test]
fn test_fiq_beats_irq() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.set_line(Line::IRQ, true);
    cpu.set_line(Line::FIQ, true);
    cpu.step();
    assert_eq!(cpu.spsr_for_mode(Mode::FIQ).mode(), Mode::SVC);
    assert!(cpu.spsr_for_mode(Mode::IRQ).is_empty());
    // The lines are level-sensitive and stay asserted.
    assert!(cpu.lines.contains(Line::IRQ));
}

#[test]
fn test_halt_idles_until_interrupt() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[0x2005]);
    cpu.set_line(Line::HALT, true);
    for _ in 0..3 {
        assert_eq!(cpu.step(), 1);
    }
    assert_eq!(cpu.regs[15], CODE_BASE);
    assert_eq!(cpu.regs[0], 0);
    assert_eq!(cpu.clock, 3);

    // An unmasked interrupt clears the halt.
    cpu.set_line(Line::IRQ, true);
    cpu.step();
    assert!(!cpu.lines.contains(Line::HALT));
    assert_eq!(cpu.spsr_for_mode(Mode::IRQ).mode(), Mode::SVC);
}

#[test]
fn test_clock_charges_wait_states() {
    let mut bus = TestBus::new();
    bus.wait = 1;
    bus.write16(CODE_BASE, 0x2005); // mov r0, #5
    bus.write16(CODE_BASE + 2, 0x6848); // ldr r0, [r1, #4]
    let mut cpu = Cpu::new(Arch::ARMv4, bus);
    cpu.cpsr.set_t(true);
    cpu.set_pc(CODE_BASE);
    cpu.regs[1] = 0x1000;

    // One instruction cycle plus a two-cycle fetch.
    assert_eq!(cpu.step(), 3);
    // The load pays for the fetch and the data access.
    assert_eq!(cpu.step(), 5);
    assert_eq!(cpu.clock, 8);
}

#[test]
fn test_run_until_deadline() {
    // mov r8, r8 as a nop.
    let mut cpu = thumb_cpu(Arch::ARMv4, &[0x46C0; 8]);
    cpu.run(6);
    assert_eq!(cpu.clock, 6);
    assert_eq!(cpu.regs[15], CODE_BASE + 6);
}

#[test]
fn test_reset() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.swap_mode(Mode::USR);
    cpu.reset();
    assert_eq!(cpu.cpsr.mode(), Mode::SVC);
    assert!(cpu.cpsr.i());
    assert!(cpu.cpsr.f());
    assert!(!cpu.cpsr.t());
    assert_eq!(cpu.regs[15], 0);
}

#[test]
fn test_set_line_toggles() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.set_line(Line::HALT, true);
    assert!(cpu.lines.contains(Line::HALT));
    cpu.set_line(Line::HALT, false);
    assert!(cpu.lines.is_empty());
}

// Single-register coprocessor for the slot plumbing.
struct TestCop {
    reg: u32,
}

impl Coprocessor for TestCop {
    fn mcr(&mut self, _reg_cn: usize, _reg_cm: usize, data: u32, _op: u32, _info: u32) {
        self.reg = data;
    }
    fn mrc(&mut self, _reg_cn: usize, _reg_cm: usize, _op: u32, _info: u32) -> u32 {
        self.reg
    }
    fn cdp(&mut self, _op: u32, _reg_cn: usize, _reg_cd: usize, _info: u32, _reg_cm: usize) {}
}

#[test]
fn test_map_coprocessor_round_trip() {
    let mut cpu = thumb_cpu(Arch::ARMv4, &[]);
    cpu.map_coprocessor(2, Box::new(TestCop { reg: 0 }));

    let cop = cpu.coprocessor(2).unwrap();
    cop.mcr(1, 0, 0x1234_5678, 0, 0);
    assert_eq!(cop.mrc(1, 0, 0, 0), 0x1234_5678);
    // Vector queries fall back to the default when no override is given.
    assert_eq!(cop.exception_vector(), 0x0000_0000);

    assert!(cpu.coprocessor(3).is_none());
}
