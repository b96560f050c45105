//! Backend artifact: the opaque object produced after MIR, described just well
//! enough to check symbol resolution and ABI consistency.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub module_name: String,
    pub abi: AbiDescriptor,
    pub symbols: Vec<Symbol>,
    pub relocations: Vec<Relocation>,
    /// Opaque object payload. Integrity checking never interprets it.
    #[serde(default)]
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|symbol| symbol.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDescriptor {
    pub target_triple: String,
    pub calling_convention: CallingConvention,
    pub pointer_width: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallingConvention {
    SystemV,
    Win64,
    WasmBasic,
}

impl CallingConvention {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallingConvention::SystemV => "system-v",
            CallingConvention::Win64 => "win64",
            CallingConvention::WasmBasic => "wasm-basic",
        }
    }
}

impl std::fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Resolved address or section offset. `None` means unresolved, which a
    /// finished artifact may not contain.
    pub address: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub offset: u64,
    pub symbol: String,
}
