//! Closed per-architecture register name sets.
//!
//! Union-matched case-insensitively by [`is_register`]. The x86/x86-64
//! list is grounded directly on the original tool's `REGISTERS` set; the
//! ARM/AArch64, MIPS, and RISC-V lists extend it to the other
//! architectures the tokenizer's operation contract names but the
//! preserved original source predates.

/// x86 and x86-64 general purpose, segment, and control/debug registers.
const X86: &[&str] = &[
    // 8-bit
    "al", "ah", "bl", "bh", "cl", "ch", "dl", "dh", "sil", "dil", "bpl", "spl", "r8b", "r9b",
    "r10b", "r11b", "r12b", "r13b", "r14b", "r15b",
    // 16-bit
    "ax", "bx", "cx", "dx", "si", "di", "bp", "sp", "r8w", "r9w", "r10w", "r11w", "r12w", "r13w",
    "r14w", "r15w",
    // 32-bit
    "eax", "ebx", "ecx", "edx", "esi", "edi", "ebp", "esp", "r8d", "r9d", "r10d", "r11d", "r12d",
    "r13d", "r14d", "r15d", "eip", "eflags",
    // 64-bit
    "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rbp", "rsp", "r8", "r9", "r10", "r11", "r12",
    "r13", "r14", "r15", "rip", "rflags",
    // Segment / control / debug
    "cs", "ds", "es", "fs", "gs", "ss", "cr0", "cr1", "cr2", "cr3", "cr4", "dr0", "dr1", "dr2",
    "dr3", "dr6", "dr7",
];

/// ARM / AArch64 general purpose and special registers.
const ARM: &[&str] = &[
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "r13", "r14",
    "r15", "sp", "lr", "pc", "cpsr",
];

fn aarch64_register(token: &str) -> bool {
    if token == "sp" || token == "lr" || token == "pc" || token == "xzr" || token == "wzr" {
        return true;
    }
    let Some(rest) = token.strip_prefix('x').or_else(|| token.strip_prefix('w')) else {
        return false;
    };
    rest.parse::<u32>().map(|n| n <= 30).unwrap_or(false)
}

/// MIPS general purpose registers, both ABI names and numeric `$N` form.
const MIPS_ABI: &[&str] = &[
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp",
    "fp", "ra",
];

fn mips_register(token: &str) -> bool {
    let Some(rest) = token.strip_prefix('$') else {
        return false;
    };
    if MIPS_ABI.contains(&rest) {
        return true;
    }
    rest.parse::<u32>().map(|n| n <= 31).unwrap_or(false)
}

/// RISC-V ABI register names; the numeric `xN` form overlaps with
/// AArch64's and is matched by [`aarch64_register`] already, so only the
/// ABI mnemonics need a dedicated list here.
const RISCV_ABI: &[&str] = &[
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Returns true if `token` belongs to any of the supported architectures'
/// register sets, matched case-insensitively.
pub fn is_register(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    X86.contains(&lower.as_str())
        || ARM.contains(&lower.as_str())
        || RISCV_ABI.contains(&lower.as_str())
        || aarch64_register(&lower)
        || mips_register(&lower)
}
