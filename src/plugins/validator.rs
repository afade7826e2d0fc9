//! Pre-compile checks on a candidate plugin source
//!
//! The checks are textual: regular expressions over the raw file contents, not
//! a C++ parse. A rule can be satisfied by a comment or defeated by unusual
//! formatting. The authoritative check is symbol resolution at load time; this
//! pass exists to reject obviously wrong files before paying for a compile.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use super::error::ValidationError;
use super::kind::{ExtensionKind, SourceContract};
use super::layout::canonical_path;

/// Extension every plugin source must carry
pub const SOURCE_EXTENSION: &str = "cpp";

/// A source file that passed validation
#[derive(Debug, Clone)]
pub struct CandidateSource {
    /// Absolute, normalized path
    pub path: PathBuf,
    pub content: String,
}

/// Checks sources against one kind's [`SourceContract`]
#[derive(Debug)]
pub struct SourceValidator {
    contract: SourceContract,
    include: Regex,
    base_class: Regex,
    overrides: Vec<(&'static str, Regex)>,
    factory: Regex,
}

impl SourceValidator {
    /// Validator for the given extension kind
    #[must_use]
    pub fn for_kind<K: ExtensionKind>() -> Self {
        Self::new(K::CONTRACT)
    }

    #[must_use]
    pub fn new(contract: SourceContract) -> Self {
        Self {
            contract,
            include: word_regex(&format!(
                r#"#\s*include\s*[<"][^>"]*\b{}[>"]"#,
                regex::escape(contract.header)
            )),
            base_class: word_regex(&format!(r"\bpublic\s+{}\b", regex::escape(contract.base_class))),
            overrides: contract
                .overrides
                .iter()
                .map(|method| (*method, call_regex(method)))
                .collect(),
            factory: call_regex(contract.factory_symbol),
        }
    }

    #[must_use]
    pub fn contract(&self) -> &SourceContract {
        &self.contract
    }

    /// Run every rule in order; the first failure wins.
    ///
    /// # Errors
    /// Returns the [`ValidationError`] naming the first rule the file breaks.
    pub fn validate(&self, path: &Path) -> Result<CandidateSource, ValidationError> {
        let path = canonical_path(path);
        let result = self.check(&path);
        match &result {
            Ok(_) => info!("Validated {} source {}", self.contract.base_class, path.display()),
            Err(e) => debug!("Rejected {}: {}", path.display(), e),
        }
        result
    }

    fn check(&self, path: &Path) -> Result<CandidateSource, ValidationError> {
        let metadata = fs::metadata(path).map_err(|_| ValidationError::FileNotFound {
            path: path.to_path_buf(),
        })?;
        if !metadata.is_file() {
            return Err(ValidationError::NotRegularFile {
                path: path.to_path_buf(),
            });
        }

        if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
            return Err(ValidationError::WrongExtension {
                path: path.to_path_buf(),
                expected: SOURCE_EXTENSION,
            });
        }

        let content = fs::read_to_string(path).map_err(|source| ValidationError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyFile {
                path: path.to_path_buf(),
            });
        }

        self.check_content(&content)?;

        Ok(CandidateSource {
            path: path.to_path_buf(),
            content,
        })
    }

    /// Content rules only (include, base class, overrides, factory symbol)
    ///
    /// # Errors
    /// Returns the first content rule that fails.
    pub fn check_content(&self, content: &str) -> Result<(), ValidationError> {
        if !self.include.is_match(content) {
            return Err(ValidationError::MissingInclude {
                header: self.contract.header,
            });
        }
        if !self.base_class.is_match(content) {
            return Err(ValidationError::MissingBaseClass {
                phrase: self.contract.base_phrase,
            });
        }
        if let Some((method, _)) = self.overrides.iter().find(|(_, re)| !re.is_match(content)) {
            return Err(ValidationError::MissingOverride { method });
        }
        if !self.factory.is_match(content) {
            return Err(ValidationError::MissingFactorySymbolDeclaration {
                symbol: self.contract.factory_symbol,
            });
        }
        Ok(())
    }
}

/// `name(` with a word boundary in front, whitespace allowed before the paren
fn call_regex(name: &str) -> Regex {
    word_regex(&format!(r"\b{}\s*\(", regex::escape(name)))
}

fn word_regex(pattern: &str) -> Regex {
    // Patterns are built from escaped compile-time identifiers
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid validator pattern {pattern:?}: {e}"))
}
