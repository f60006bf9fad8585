use async_trait::async_trait;
use specgen_symbols::{
    unique_name, CompilerError, CompilerService, SymbolResolver, SymbolStrategy,
};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted compiler that records what it was asked to compile
struct ScriptedCompiler {
    reply: fn() -> Result<Vec<String>, CompilerError>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedCompiler {
    fn new(reply: fn() -> Result<Vec<String>, CompilerError>) -> Self {
        Self {
            reply,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompilerService for ScriptedCompiler {
    async fn declared_symbols(&self, source: &str) -> Result<Vec<String>, CompilerError> {
        self.seen.lock().unwrap().push(source.to_string());
        (self.reply)()
    }
}

const RAW: &str = "pragma solidity ^0.8.0;\nimport \"./Base.sol\";\nabstract contract Vault is Base {}\n";
const FLAT: &str = "pragma solidity ^0.8.0;\nimport \"@oz/Ownable.sol\";\ncontract Base {}\nabstract contract Vault is Base {}\n";

#[tokio::test]
async fn compiler_names_win_when_present() {
    let resolver = SymbolResolver::new(ScriptedCompiler::new(|| {
        Ok(vec!["Base".to_string(), "Vault".to_string()])
    }));
    let result = resolver.resolve("0xabc", FLAT, RAW).await;
    assert_eq!(result.strategy, SymbolStrategy::Compiler);
    assert_eq!(result.symbol_name.as_deref(), Some("Base"));

    let seen = resolver.compiler().seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].contains("import"), "imports must be stripped: {}", seen[0]);
}

#[tokio::test]
async fn empty_compiler_answer_falls_back_to_original_text() {
    let resolver = SymbolResolver::new(ScriptedCompiler::new(|| Ok(Vec::new())));
    let result = resolver.resolve("0xabc", FLAT, RAW).await;
    assert_eq!(result.strategy, SymbolStrategy::Fallback);
    // `Base` is only declared in the flattened text
    assert_eq!(result.symbol_name.as_deref(), Some("Vault"));
}

#[tokio::test]
async fn compiler_failures_are_swallowed() {
    for reply in [
        (|| Err(CompilerError::Timeout(Duration::from_secs(1))))
            as fn() -> Result<Vec<String>, CompilerError>,
        || {
            Err(CompilerError::Rejected {
                code: Some(1),
                stderr: "boom".to_string(),
            })
        },
        || {
            Err(CompilerError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "solc",
            )))
        },
    ] {
        let resolver = SymbolResolver::new(ScriptedCompiler::new(reply));
        let result = resolver.resolve("0xabc", FLAT, RAW).await;
        assert_eq!(result.strategy, SymbolStrategy::Fallback);
        assert_eq!(result.symbol_name.as_deref(), Some("Vault"));
    }
}

#[tokio::test]
async fn fragments_without_declarations_are_unnameable() {
    let resolver = SymbolResolver::new(ScriptedCompiler::new(|| Ok(Vec::new())));
    let result = resolver
        .resolve("frag", "function f() {}", "function f() {}")
        .await;
    assert_eq!(result.strategy, SymbolStrategy::None);
    assert_eq!(result.symbol_name, None);
    assert_eq!(result.unit_id, "frag");
}

#[test]
fn identically_named_symbols_stay_distinct_across_origins() {
    let origins = ["0x01", "0x02", "0x03"];
    let names: std::collections::HashSet<String> =
        origins.iter().map(|o| unique_name(o, "Token")).collect();
    assert_eq!(names.len(), origins.len());
}
