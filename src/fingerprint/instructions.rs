//! Disjoint rare/common instruction mnemonic sets used by shingle
//! weighting.

use std::collections::HashSet;
use std::sync::LazyLock;

/// System/privileged/uncommon mnemonics that boost a shingle's weight to
/// 3 when any token in it is a member.
pub static RARE_INSTRUCTIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "CPUID", "RDTSC", "RDTSCP", "SYSCALL", "SYSENTER", "SYSEXIT", "SYSRET", "VMCALL",
        "VMLAUNCH", "VMRESUME", "VMXON", "VMXOFF", "HLT", "INT", "INT3", "IN", "OUT", "INS",
        "OUTS", "LGDT", "SGDT", "LIDT", "SIDT", "LTR", "STR", "LMSW", "SMSW", "INVLPG", "WBINVD",
        "RDMSR", "WRMSR", "RDPMC", "XGETBV", "XSETBV", "CLTS", "RSM", "UD2",
    ]
    .into_iter()
    .collect()
});

/// Ubiquitous mnemonics (plus the normalization placeholders) that keep a
/// shingle's weight at 1 when every token in it is a member.
pub static COMMON_INSTRUCTIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "MOV", "PUSH", "POP", "ADD", "SUB", "XOR", "AND", "OR", "CMP", "TEST", "LEA", "NOP",
        "INC", "DEC", "JMP", "CALL", "RET", "JE", "JNE", "JZ", "JNZ", "JG", "JL", "JGE", "JLE",
        "REG", "IMM", "MEM_SIZE", "LABEL",
    ]
    .into_iter()
    .collect()
});

/// True if `token` is in [`RARE_INSTRUCTIONS`].
pub fn is_rare(token: &str) -> bool {
    RARE_INSTRUCTIONS.contains(token)
}

/// True if `token` is in [`COMMON_INSTRUCTIONS`].
pub fn is_common(token: &str) -> bool {
    COMMON_INSTRUCTIONS.contains(token)
}
