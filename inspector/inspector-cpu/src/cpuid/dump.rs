use super::{CpuidResult, CpuidSource};
use crate::CpuError;
use std::collections::BTreeMap;

/// Register values captured from `cpuid -r`.
///
/// The tool prints one `CPU <n>:` header per logical processor followed by
/// one line per query:
///
/// ```text
/// CPU 0:
///    0x00000001 0x00: eax=0x000906ea ebx=0x00100800 ecx=0x7ffafbbf edx=0xbfebfbff
/// ```
///
/// Lines that are neither headers nor register lines are skipped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CpuidDump {
    entries: BTreeMap<(u32, u32, u32), CpuidResult>,
}

impl CpuidDump {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the textual output of the register-dump tool.
    ///
    /// # Errors
    /// [`CpuError::ToolOutput`] for a register line before any `CPU` header,
    /// a malformed hex value, or a missing register.
    pub fn parse(text: &str) -> Result<Self, CpuError> {
        let mut dump = Self::new();
        let mut cpu = None;
        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if let Some(rest) = trimmed.strip_prefix("CPU ")
                && let Some(number) = rest.strip_suffix(':')
            {
                let parsed = number.trim().parse::<u32>().map_err(|_| CpuError::ToolOutput {
                    line,
                    reason: format!("bad CPU number `{number}`"),
                })?;
                cpu = Some(parsed);
                continue;
            }
            if !trimmed.contains("eax=") {
                continue;
            }
            let Some(cpu) = cpu else {
                return Err(CpuError::ToolOutput {
                    line,
                    reason: "register line outside of a CPU block".into(),
                });
            };
            let (leaf, subleaf, result) = parse_register_line(trimmed, line)?;
            dump.insert(cpu, leaf, subleaf, result);
        }
        log::debug!("parsed {} CPUID entries", dump.entries.len());
        Ok(dump)
    }

    pub fn insert(&mut self, cpu: u32, leaf: u32, subleaf: u32, result: CpuidResult) {
        self.entries.insert((cpu, leaf, subleaf), result);
    }

    /// Logical CPUs present in the dump, ascending.
    #[must_use]
    pub fn cpus(&self) -> Vec<u32> {
        let mut cpus: Vec<u32> = self.entries.keys().map(|&(cpu, _, _)| cpu).collect();
        cpus.dedup();
        cpus
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CpuidSource for CpuidDump {
    fn cpuid(&self, cpu: u32, leaf: u32, subleaf: u32) -> Option<CpuidResult> {
        self.entries.get(&(cpu, leaf, subleaf)).copied()
    }
}

fn parse_hex(token: &str, line: usize) -> Result<u32, CpuError> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(digits, 16).map_err(|_| CpuError::ToolOutput {
        line,
        reason: format!("bad hex value `{token}`"),
    })
}

fn parse_register_line(text: &str, line: usize) -> Result<(u32, u32, CpuidResult), CpuError> {
    let Some((selector, registers)) = text.split_once(':') else {
        return Err(CpuError::ToolOutput {
            line,
            reason: "missing `leaf subleaf:` prefix".into(),
        });
    };
    let mut selector = selector.split_whitespace();
    let (Some(leaf), Some(subleaf)) = (selector.next(), selector.next()) else {
        return Err(CpuError::ToolOutput {
            line,
            reason: "missing leaf or subleaf".into(),
        });
    };
    let leaf = parse_hex(leaf, line)?;
    let subleaf = parse_hex(subleaf, line)?;

    let mut regs = [None; 4];
    for token in registers.split_whitespace() {
        let Some((name, value)) = token.split_once('=') else {
            continue;
        };
        let slot = match name {
            "eax" => 0,
            "ebx" => 1,
            "ecx" => 2,
            "edx" => 3,
            _ => continue,
        };
        regs[slot] = Some(parse_hex(value, line)?);
    }
    let [Some(eax), Some(ebx), Some(ecx), Some(edx)] = regs else {
        return Err(CpuError::ToolOutput {
            line,
            reason: "incomplete register set".into(),
        });
    };
    Ok((leaf, subleaf, CpuidResult::new(eax, ebx, ecx, edx)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
CPU 0:
   0x00000000 0x00: eax=0x00000016 ebx=0x756e6547 ecx=0x6c65746e edx=0x49656e69
   0x00000004 0x01: eax=0x1c004122 ebx=0x01c0003f ecx=0x0000003f edx=0x00000000
CPU 1:
   0x00000000 0x00: eax=0x00000016 ebx=0x756e6547 ecx=0x6c65746e edx=0x49656e69
";

    #[test]
    fn parses_blocks_per_cpu() {
        let dump = CpuidDump::parse(SAMPLE).expect("valid dump");
        assert_eq!(dump.len(), 3);
        assert_eq!(dump.cpus(), vec![0, 1]);
        assert_eq!(
            dump.cpuid(0, 4, 1),
            Some(CpuidResult::new(0x1C00_4122, 0x01C0_003F, 0x3F, 0))
        );
        assert_eq!(dump.cpuid(1, 4, 1), None);
    }

    #[test]
    fn register_line_needs_cpu_header() {
        let err = CpuidDump::parse("   0x00000000 0x00: eax=0x1 ebx=0x2 ecx=0x3 edx=0x4\n")
            .expect_err("no header");
        assert!(matches!(err, CpuError::ToolOutput { line: 1, .. }));
    }

    #[test]
    fn bad_hex_is_reported_with_line() {
        let err = CpuidDump::parse("CPU 0:\n 0x1 0x0: eax=0xZZ ebx=0 ecx=0 edx=0\n")
            .expect_err("bad hex");
        assert!(matches!(err, CpuError::ToolOutput { line: 2, .. }));
    }

    #[test]
    fn missing_register_is_an_error() {
        assert!(CpuidDump::parse("CPU 0:\n 0x1 0x0: eax=0x1 ebx=0x2 ecx=0x3\n").is_err());
    }
}
