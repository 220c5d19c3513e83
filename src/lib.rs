mod common;
mod bus;
mod coproc;
mod cp15;
mod core;


pub use crate::bus::Bus;

pub use crate::coproc::Coprocessor;

pub use crate::cp15::{
    Cp15, Cp15Handle
};

pub use crate::core::{
    Arch, Cpu, Exception, Line, Mode, CPSR
};
