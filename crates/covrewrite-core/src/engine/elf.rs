//! ELF engine backend.
//!
//! Symbolization is done with `goblin`, exit-site discovery with `capstone`.
//!
//! - The opened object is one module, named by its file name; it is a shared
//!   library when it is `ET_DYN` without a program interpreter.
//! - Every `DT_NEEDED` entry is a further (function-less) shared library module.
//! - Functions are the defined `STT_FUNC` symbols, from `.symtab` when present
//!   and `.dynsym` otherwise, deduplicated by address. A zero-size symbol
//!   extends to the next function start or the end of its section.
//! - A function's entry point is its start address; its exit points are the
//!   return instructions and outward tail-call jumps found by disassembling
//!   its body.
//!
//! Inserted calls are recorded as probe sites. [`ElfSession::write`] emits the
//! original image followed by a probe table trailer naming the probe library
//! and every site; the runtime loader that applies the sites reads it back
//! with [`read_probe_table`].

use super::{CallPlacement, Engine, EngineError, PointKind, Session, SnippetHandle};
use capstone::prelude::*;
use goblin::elf::{self, Elf};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Footer magic closing the probe table trailer
pub const PROBE_TABLE_MAGIC: &[u8; 8] = b"COVPROBE";

const PROBE_TABLE_HEADER: &str = "covprobe v1";

/// Instruction sets whose return sites can be located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    /// 32-bit x86
    X86,
    /// x86-64
    X86_64,
    /// AArch64
    Arm64,
}

impl Arch {
    /// Maps an ELF `e_machine` value
    pub fn from_machine(machine: u16) -> Option<Self> {
        match machine {
            elf::header::EM_386 => Some(Self::X86),
            elf::header::EM_X86_64 => Some(Self::X86_64),
            elf::header::EM_AARCH64 => Some(Self::Arm64),
            _ => None,
        }
    }

    fn disassembler(self) -> Result<Capstone, EngineError> {
        let built = match self {
            Self::X86 => Capstone::new().x86().mode(arch::x86::ArchMode::Mode32).build(),
            Self::X86_64 => Capstone::new().x86().mode(arch::x86::ArchMode::Mode64).build(),
            Self::Arm64 => Capstone::new().arm64().mode(arch::arm64::ArchMode::Arm).build(),
        };
        built.map_err(|e| EngineError::rejected(format!("capstone init failed: {e}")))
    }

    fn is_unconditional_jump(self, mnemonic: &str) -> bool {
        match self {
            Self::X86 | Self::X86_64 => mnemonic == "jmp",
            Self::Arm64 => mnemonic == "b",
        }
    }
}

/// Addresses of the exit sites in `code`, which starts at `address`
///
/// An exit site is a return instruction, or an unconditional direct jump
/// whose target lies outside `code` (a tail call).
pub fn find_exit_sites(arch: Arch, code: &[u8], address: u64) -> Result<Vec<u64>, EngineError> {
    let cs = arch.disassembler()?;
    let insns = cs
        .disasm_all(code, address)
        .map_err(|e| EngineError::malformed(format!("disassembly failed at 0x{address:x}: {e}")))?;

    let end = address.saturating_add(code.len() as u64);
    Ok(insns
        .iter()
        .filter(|insn| {
            // prefixed forms such as `repz ret` or `bnd jmp` end with the bare mnemonic
            let Some(mnemonic) = insn.mnemonic().and_then(|m| m.split_whitespace().last()) else {
                return false;
            };
            if mnemonic.starts_with("ret") {
                return true;
            }
            arch.is_unconditional_jump(mnemonic)
                && insn
                    .op_str()
                    .and_then(direct_target)
                    .is_some_and(|target| target < address || target >= end)
        })
        .map(|insn| insn.address())
        .collect())
}

/// Immediate target of a direct branch operand such as `0x1030` or `#0x400`
fn direct_target(op_str: &str) -> Option<u64> {
    let hex = op_str.trim().trim_start_matches('#').strip_prefix("0x")?;
    u64::from_str_radix(hex, 16).ok()
}

/// A defined function symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfFunction {
    /// Symbol name
    pub name: String,
    /// Start address
    pub address: u64,
    /// Symbol size, zero when unknown
    pub size: u64,
    /// Byte range of the body within the file
    file_range: Option<(usize, usize)>,
}

#[derive(Debug, Clone)]
struct ElfModule {
    name: String,
    shared_library: bool,
    functions: Vec<ElfFunction>,
}

/// One recorded probe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSite {
    /// Placement relative to the addresses
    pub placement: CallPlacement,
    /// Called hook
    pub hook: String,
    /// Literal argument
    pub literal: String,
    /// Instruction addresses the call is attached to
    pub addresses: Vec<u64>,
}

/// Decoded probe table trailer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeTable {
    /// Libraries the rewritten image requires
    pub needed: Vec<String>,
    /// Recorded probe sites
    pub sites: Vec<ProbeSite>,
}

impl ProbeTable {
    fn encode(&self) -> Result<Vec<u8>, EngineError> {
        let mut body = String::new();
        let _ = writeln!(body, "{PROBE_TABLE_HEADER}");
        for library in &self.needed {
            let _ = writeln!(body, "needs\t{library}");
        }
        for site in &self.sites {
            let addresses: Vec<String> = site.addresses.iter().map(|a| format!("{a:x}")).collect();
            let _ = writeln!(
                body,
                "{}\t{}\t{}\t{}",
                site.placement.as_str(),
                site.hook,
                addresses.join(","),
                site.literal
            );
        }

        let mut out = body.into_bytes();
        let len = trailer_len(out.len())?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(PROBE_TABLE_MAGIC);
        Ok(out)
    }

    fn decode(body: &str) -> Option<Self> {
        let mut lines = body.lines();
        if lines.next()? != PROBE_TABLE_HEADER {
            return None;
        }

        let mut table = Self::default();
        for line in lines {
            let fields: Vec<&str> = line.splitn(4, '\t').collect();
            match fields.as_slice() {
                ["needs", library] => table.needed.push(library.to_string()),
                [placement, hook, addresses, literal] => {
                    let placement = match *placement {
                        "before" => CallPlacement::Before,
                        "after" => CallPlacement::After,
                        _ => return None,
                    };
                    let addresses = addresses
                        .split(',')
                        .map(|a| u64::from_str_radix(a, 16).ok())
                        .collect::<Option<Vec<_>>>()?;
                    table.sites.push(ProbeSite {
                        placement,
                        hook: hook.to_string(),
                        literal: literal.to_string(),
                        addresses,
                    });
                }
                _ => return None,
            }
        }
        Some(table)
    }
}

fn trailer_len(len: usize) -> Result<u32, EngineError> {
    u32::try_from(len)
        .map_err(|_| EngineError::rejected(format!("probe table of {len} bytes does not fit the trailer")))
}

/// Reads the probe table trailer of a rewritten image, if it has one
pub fn read_probe_table(bytes: &[u8]) -> Option<ProbeTable> {
    let footer = PROBE_TABLE_MAGIC.len() + 4;
    if bytes.len() < footer || &bytes[bytes.len() - PROBE_TABLE_MAGIC.len()..] != PROBE_TABLE_MAGIC {
        return None;
    }

    let len_at = bytes.len() - footer;
    let len = u32::from_le_bytes(bytes[len_at..len_at + 4].try_into().ok()?) as usize;
    let start = len_at.checked_sub(len)?;
    let body = std::str::from_utf8(&bytes[start..len_at]).ok()?;
    ProbeTable::decode(body)
}

/// Engine opening ELF objects from disk
#[derive(Debug, Clone, Default)]
pub struct ElfEngine {
    search_dirs: Vec<PathBuf>,
}

impl ElfEngine {
    /// Creates an engine that looks for auxiliary libraries in `search_dirs`
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let direct = Path::new(name);
        if direct.components().count() > 1 && direct.is_file() {
            return Some(direct.to_path_buf());
        }
        self.search_dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl Engine for ElfEngine {
    type Session = ElfSession;

    fn name(&self) -> &str {
        "elf"
    }

    fn open(&self, path: &Path) -> Result<ElfSession, EngineError> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let (arch, modules) = {
            let elf = Elf::parse(&bytes).map_err(|e| EngineError::malformed(e.to_string()))?;
            let shared_library =
                elf.header.e_type == elf::header::ET_DYN && elf.interpreter.is_none();
            let arch = Arch::from_machine(elf.header.e_machine);
            if arch.is_none() {
                debug!("No return-site support for e_machine {}", elf.header.e_machine);
            }

            let mut modules = vec![ElfModule {
                name,
                shared_library,
                functions: defined_functions(&elf, bytes.len()),
            }];
            modules.extend(elf.libraries.iter().map(|needed| ElfModule {
                name: needed.to_string(),
                shared_library: true,
                functions: Vec::new(),
            }));
            (arch, modules)
        };

        debug!(
            "Opened {}: {} module(s), {} function(s) in the main object",
            path.display(),
            modules.len(),
            modules[0].functions.len()
        );

        Ok(ElfSession {
            engine: self.clone(),
            arch,
            bytes,
            modules,
            needed: Vec::new(),
            sites: Vec::new(),
        })
    }
}

fn defined_functions(elf: &Elf<'_>, bytes_len: usize) -> Vec<ElfFunction> {
    let (syms, strtab) = if elf.syms.is_empty() {
        (&elf.dynsyms, &elf.dynstrtab)
    } else {
        (&elf.syms, &elf.strtab)
    };

    let defined: Vec<_> = syms
        .iter()
        .filter(|sym| {
            sym.is_function()
                && sym.st_value != 0
                && sym.st_shndx != elf::section_header::SHN_UNDEF as usize
        })
        .collect();

    // crt stubs and `_init`/`_fini` carry no size; they extend to the next function or the section end
    let mut starts: Vec<u64> = defined.iter().map(|sym| sym.st_value).collect();
    starts.sort_unstable();
    starts.dedup();

    let mut seen = BTreeSet::new();
    let mut functions = Vec::new();
    for sym in defined {
        let Some(name) = strtab.get_at(sym.st_name).filter(|n| !n.is_empty()) else {
            continue;
        };
        if !seen.insert(sym.st_value) {
            continue;
        }

        let file_range = elf
            .section_headers
            .get(sym.st_shndx)
            .filter(|sh| sh.sh_type != elf::section_header::SHT_NOBITS)
            .and_then(|sh| {
                let extent = if sym.st_size > 0 {
                    sym.st_size
                } else {
                    starts
                        .get(starts.partition_point(|&start| start <= sym.st_value))
                        .map_or(u64::MAX, |next| next - sym.st_value)
                };
                section_file_range(sym.st_value, extent, sh.sh_addr, sh.sh_size, sh.sh_offset, bytes_len)
            });

        functions.push(ElfFunction {
            name: name.to_string(),
            address: sym.st_value,
            size: sym.st_size,
            file_range,
        });
    }
    functions
}

fn section_file_range(
    addr: u64,
    size: u64,
    sec_addr: u64,
    sec_size: u64,
    sec_offset: u64,
    bytes_len: usize,
) -> Option<(usize, usize)> {
    if addr < sec_addr || addr >= sec_addr.saturating_add(sec_size) {
        return None;
    }
    let offset_in_section = addr - sec_addr;
    let start = sec_offset.checked_add(offset_in_section)?;
    let available = sec_size - offset_in_section;
    let end = start.checked_add(size.min(available))?.min(bytes_len as u64);
    if start >= end {
        return None;
    }
    Some((start as usize, end as usize))
}

/// Function handle of an ELF session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfFunctionRef {
    module: usize,
    index: usize,
}

/// Editing session over one ELF image
#[derive(Debug)]
pub struct ElfSession {
    engine: ElfEngine,
    arch: Option<Arch>,
    bytes: Vec<u8>,
    modules: Vec<ElfModule>,
    needed: Vec<String>,
    sites: Vec<ProbeSite>,
}

impl ElfSession {
    fn function(&self, function: &ElfFunctionRef) -> &ElfFunction {
        &self.modules[function.module].functions[function.index]
    }

    /// Probe sites recorded so far
    pub fn sites(&self) -> &[ProbeSite] {
        &self.sites
    }
}

impl Session for ElfSession {
    type Module = usize;
    type Function = ElfFunctionRef;
    type Point = u64;

    fn load_library(&mut self, name: &str) -> Result<(), EngineError> {
        let path = self
            .engine
            .locate(name)
            .ok_or_else(|| EngineError::not_found(name))?;
        let bytes = fs::read(&path)?;
        let library = Elf::parse(&bytes).map_err(|e| EngineError::malformed(e.to_string()))?;

        let mut functions = Vec::new();
        for sym in library.dynsyms.iter() {
            if !sym.is_function() || sym.st_shndx == elf::section_header::SHN_UNDEF as usize {
                continue;
            }
            if let Some(export) = library.dynstrtab.get_at(sym.st_name).filter(|n| !n.is_empty()) {
                functions.push(ElfFunction {
                    name: export.to_string(),
                    address: sym.st_value,
                    size: sym.st_size,
                    file_range: None,
                });
            }
        }

        debug!("Loaded {} ({} export(s))", path.display(), functions.len());
        self.modules.push(ElfModule {
            name: name.to_string(),
            shared_library: true,
            functions,
        });
        self.needed.push(name.to_string());
        Ok(())
    }

    fn find_function(&self, name: &str) -> Option<ElfFunctionRef> {
        self.modules.iter().enumerate().find_map(|(module, m)| {
            m.functions
                .iter()
                .position(|f| f.name == name)
                .map(|index| ElfFunctionRef { module, index })
        })
    }

    fn modules(&self) -> Vec<usize> {
        (0..self.modules.len()).collect()
    }

    fn module_name(&self, module: &usize) -> String {
        self.modules[*module].name.clone()
    }

    fn is_shared_library(&self, module: &usize) -> bool {
        self.modules[*module].shared_library
    }

    fn functions(&self, module: &usize) -> Vec<ElfFunctionRef> {
        (0..self.modules[*module].functions.len())
            .map(|index| ElfFunctionRef {
                module: *module,
                index,
            })
            .collect()
    }

    fn function_name(&self, function: &ElfFunctionRef) -> String {
        self.function(function).name.clone()
    }

    fn find_points(&self, function: &ElfFunctionRef, kind: PointKind) -> Vec<u64> {
        let f = self.function(function);
        let Some((start, end)) = f.file_range else {
            return Vec::new();
        };

        match kind {
            PointKind::Entry => vec![f.address],
            PointKind::Exit => {
                let Some(arch) = self.arch else {
                    return Vec::new();
                };
                match find_exit_sites(arch, &self.bytes[start..end], f.address) {
                    Ok(sites) => sites,
                    Err(e) => {
                        debug!("{}: {}", f.name, e);
                        Vec::new()
                    }
                }
            }
        }
    }

    fn insert_call(
        &mut self,
        hook: &ElfFunctionRef,
        literal: &str,
        points: &[u64],
        placement: CallPlacement,
    ) -> Result<SnippetHandle, EngineError> {
        if points.is_empty() {
            return Err(EngineError::rejected("no points to insert at"));
        }
        if literal.contains(['\t', '\n']) {
            return Err(EngineError::rejected(format!(
                "literal {literal:?} cannot be encoded in the probe table"
            )));
        }

        let hook = self.function(hook).name.clone();
        trace!("elf: {} {}({:?}) at {:x?}", placement.as_str(), hook, literal, points);
        self.sites.push(ProbeSite {
            placement,
            hook,
            literal: literal.to_string(),
            addresses: points.to_vec(),
        });
        Ok(SnippetHandle(self.sites.len() as u64))
    }

    fn write(&mut self, path: &Path) -> Result<(), EngineError> {
        let table = ProbeTable {
            needed: self.needed.clone(),
            sites: self.sites.clone(),
        };

        let trailer = table.encode()?;
        let mut out = Vec::with_capacity(self.bytes.len() + trailer.len());
        out.extend_from_slice(&self.bytes);
        out.extend_from_slice(&trailer);
        fs::write(path, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_arch_from_machine() {
        assert_eq!(Arch::from_machine(elf::header::EM_X86_64), Some(Arch::X86_64));
        assert_eq!(Arch::from_machine(elf::header::EM_AARCH64), Some(Arch::Arm64));
        assert_eq!(Arch::from_machine(elf::header::EM_RISCV), None);
    }

    #[test]
    fn test_exit_sites_x86_64() {
        // push rbp; mov rbp, rsp; pop rbp; ret
        let code = [0x55, 0x48, 0x89, 0xe5, 0x5d, 0xc3];
        assert_eq!(find_exit_sites(Arch::X86_64, &code, 0x1000).unwrap(), vec![0x1005]);

        // test edi, edi; je +1; ret; xor eax, eax; ret
        let code = [0x85, 0xff, 0x74, 0x01, 0xc3, 0x31, 0xc0, 0xc3];
        assert_eq!(
            find_exit_sites(Arch::X86_64, &code, 0x2000).unwrap(),
            vec![0x2004, 0x2007]
        );

        // add edi, 1; jmp g@plt
        let code = [0x83, 0xc7, 0x01, 0xe9, 0xc8, 0xff, 0xff, 0xff];
        assert_eq!(find_exit_sites(Arch::X86_64, &code, 0x1130).unwrap(), vec![0x1133]);

        // xor eax, eax; jmp back into the body; ret
        let code = [0x31, 0xc0, 0xeb, 0xfc, 0xc3];
        assert_eq!(find_exit_sites(Arch::X86_64, &code, 0x3000).unwrap(), vec![0x3004]);

        // jmp rax has no static target
        let code = [0xff, 0xe0];
        assert!(find_exit_sites(Arch::X86_64, &code, 0x4000).unwrap().is_empty());
    }

    #[test]
    fn test_exit_sites_arm64() {
        // mov x0, #0; ret
        let code = [0x00, 0x00, 0x80, 0xd2, 0xc0, 0x03, 0x5f, 0xd6];
        assert_eq!(find_exit_sites(Arch::Arm64, &code, 0x400).unwrap(), vec![0x404]);

        // b #0x410
        let code = [0x04, 0x00, 0x00, 0x14];
        assert_eq!(find_exit_sites(Arch::Arm64, &code, 0x400).unwrap(), vec![0x400]);
    }

    #[test]
    fn test_direct_target() {
        assert_eq!(direct_target("0x1030"), Some(0x1030));
        assert_eq!(direct_target("#0x410"), Some(0x410));
        assert_eq!(direct_target("rax"), None);
        assert_eq!(direct_target("qword ptr [rip + 0x2fca]"), None);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_table_is_rejected() {
        assert_eq!(trailer_len(0x20).unwrap(), 0x20);
        let err = trailer_len(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, EngineError::Rejected(_)));
    }

    #[test]
    fn test_section_file_range() {
        assert_eq!(section_file_range(0x1010, 0x20, 0x1000, 0x100, 0x400, 0x1000), Some((0x410, 0x430)));
        assert_eq!(section_file_range(0x2000, 0x20, 0x1000, 0x100, 0x400, 0x1000), None);
        // clipped to the section end
        assert_eq!(section_file_range(0x10f0, 0x40, 0x1000, 0x100, 0x400, 0x1000), Some((0x4f0, 0x500)));
    }

    #[test]
    fn test_probe_table_trailer() {
        let table = ProbeTable {
            needed: vec!["libInst.so".into()],
            sites: vec![
                ProbeSite {
                    placement: CallPlacement::Before,
                    hook: "FEntryCoverage".into(),
                    literal: "compute(int)".into(),
                    addresses: vec![0x1130],
                },
                ProbeSite {
                    placement: CallPlacement::After,
                    hook: "FExitCoverage".into(),
                    literal: "compute(int)".into(),
                    addresses: vec![0x1140, 0x115c],
                },
            ],
        };

        let mut image = b"\x7fELF-not-really".to_vec();
        image.extend_from_slice(&table.encode().unwrap());

        assert_eq!(read_probe_table(&image), Some(table));
        assert_eq!(read_probe_table(b"\x7fELF-plain"), None);
    }

    #[test]
    fn test_open_rejects_non_elf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "definitely not an object file").unwrap();

        let err = ElfEngine::default().open(&path).unwrap_err();
        assert!(matches!(err, EngineError::Malformed(_)));
    }

    #[test]
    fn test_open_missing_file() {
        let err = ElfEngine::default()
            .open(Path::new("/nonexistent/libA.so"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }

    fn fixture(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    #[test]
    fn test_every_function_of_a_gcc_library_has_points() {
        let session = ElfEngine::default().open(&fixture("libcovfixture.so")).unwrap();
        let library = session.modules()[0];
        assert_eq!(session.module_name(&library), "libcovfixture.so");
        assert!(session.is_shared_library(&library));

        let functions = session.functions(&library);
        assert_eq!(functions.len(), 9);
        for function in &functions {
            let name = session.function_name(function);
            assert_eq!(session.find_points(function, PointKind::Entry).len(), 1, "{name}");
            assert!(!session.find_points(function, PointKind::Exit).is_empty(), "{name}");
        }

        let exits = |name: &str| {
            let function = session.find_function(name).unwrap();
            session.find_points(&function, PointKind::Exit)
        };
        // zero-size crt stubs
        assert_eq!(exits("deregister_tm_clones"), vec![0x1078]);
        assert_eq!(exits("__do_global_dtors_aux"), vec![0x10f4, 0x10f8]);
        assert_eq!(exits("frame_dummy"), vec![0x1104]);
        assert_eq!(exits("_init"), vec![0x1016]);
        assert_eq!(exits("_fini"), vec![0x1150]);
        // tail call into the PLT
        assert_eq!(exits("forward"), vec![0x1143]);
        assert_eq!(exits("clamp"), vec![0x1131]);
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn test_session_over_test_executable() {
        let exe = std::env::current_exe().unwrap();
        let mut session = ElfEngine::default().open(&exe).unwrap();

        let main_module = session.modules()[0];
        assert_eq!(
            session.module_name(&main_module),
            exe.file_name().unwrap().to_string_lossy()
        );
        assert!(!session.is_shared_library(&main_module));
        assert!(!session.functions(&main_module).is_empty());

        let main = session.find_function("main").unwrap();
        let entry = session.find_points(&main, PointKind::Entry);
        assert_eq!(entry.len(), 1);

        session
            .insert_call(&main, "main", &entry, CallPlacement::Before)
            .unwrap();
        assert_eq!(session.sites().len(), 1);

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("rewritten");
        session.write(&out).unwrap();

        let bytes = fs::read(&out).unwrap();
        let table = read_probe_table(&bytes).unwrap();
        assert!(table.needed.is_empty());
        assert_eq!(table.sites, session.sites().to_vec());
        assert!(bytes.starts_with(&fs::read(&exe).unwrap()));
    }

    #[test]
    fn test_locate_searches_dirs_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("libInst.so"), b"").unwrap();

        let engine = ElfEngine::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(engine.locate("libInst.so"), Some(second.path().join("libInst.so")));
        assert_eq!(engine.locate("libMissing.so"), None);
    }
}
