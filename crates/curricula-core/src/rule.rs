//! # Symbolic Rule References
//!
//! A transition rule's predicate is executable logic, which a document
//! cannot carry. Instead a predicate is written as its qualified name,
//! `"<module-path>.<symbol-name>"`, and restored on load by looking that name
//! up in a [`RuleRegistry`].
//!
//! ## Closed World
//!
//! Only named functions registered up front can be rules. A bare function
//! pointer or a non-capturing closure coerced to [`Predicate`] has no name of
//! its own; it is accepted only if the same pointer was registered under a
//! name, and fails with `UnresolvableSymbol` otherwise. A registered predicate
//! may use closures internally; its serialized identity is always the
//! enclosing function.
//!
//! ## Registration
//!
//! ```
//! use curricula_core::{Metrics, RuleRegistry, named_predicate};
//!
//! fn always(_: &Metrics) -> bool {
//!     true
//! }
//!
//! let registry = RuleRegistry::new();
//! let name = registry.register(named_predicate!(always)).expect("register");
//! assert!(name.as_str().ends_with(".always"));
//! ```
//!
//! The process-wide registry ([`RuleRegistry::global`]) is append-only and
//! safe for concurrent lookups once startup registration has finished.

use crate::Metrics;
use crate::primitives::{QUALIFIED_NAME_SEPARATOR, RUST_PATH_SEPARATOR};
use crate::types::{CurriculumError, SymbolPart};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};

/// An invocable transition predicate.
pub type Predicate = fn(&Metrics) -> bool;

// =============================================================================
// QUALIFIED NAME
// =============================================================================

/// A rule's symbolic identity: `module.path.symbol`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Parse and validate a qualified name.
    ///
    /// Splits on the last separator; both halves must be non-empty.
    pub fn parse(value: &str) -> Result<Self, CurriculumError> {
        match value.rsplit_once(QUALIFIED_NAME_SEPARATOR) {
            Some((module, symbol)) if !module.is_empty() && !symbol.is_empty() => {
                Ok(Self(value.to_string()))
            }
            _ => Err(CurriculumError::MalformedReference(value.to_string())),
        }
    }

    /// Build from a Rust module path (`a::b`) and a function name.
    #[must_use]
    pub fn from_rust_path(module_path: &str, symbol: &str) -> Self {
        let module = module_path.replace(RUST_PATH_SEPARATOR, ".");
        Self(format!("{}{}{}", module, QUALIFIED_NAME_SEPARATOR, symbol))
    }

    /// The module-path half.
    pub fn module(&self) -> &str {
        self.split().0
    }

    /// The symbol-name half.
    pub fn symbol(&self) -> &str {
        self.split().1
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        self.0
            .rsplit_once(QUALIFIED_NAME_SEPARATOR)
            .unwrap_or(("", self.0.as_str()))
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// NAMED PREDICATE
// =============================================================================

/// A predicate together with the module path and name it was declared under.
///
/// Build with [`named_predicate!`](crate::named_predicate).
#[derive(Clone, Copy)]
pub struct NamedPredicate {
    module_path: &'static str,
    name: &'static str,
    func: Predicate,
}

impl NamedPredicate {
    /// Pair a predicate with its declaring module path and name.
    #[must_use]
    pub const fn new(module_path: &'static str, name: &'static str, func: Predicate) -> Self {
        Self {
            module_path,
            name,
            func,
        }
    }

    /// The dotted qualified name of this predicate.
    #[must_use]
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::from_rust_path(self.module_path, self.name)
    }

    pub fn func(&self) -> Predicate {
        self.func
    }
}

impl std::fmt::Debug for NamedPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedPredicate")
            .field("name", &self.qualified_name().as_str())
            .finish()
    }
}

/// Capture a top-level predicate function together with its qualified name.
///
/// Must be invoked in the module that declares the function so that
/// `module_path!()` names the right module.
#[macro_export]
macro_rules! named_predicate {
    ($func:ident) => {
        $crate::NamedPredicate::new(module_path!(), stringify!($func), $func)
    };
}

// =============================================================================
// RULE
// =============================================================================

/// What a rule can be built from: a symbolic name or a live predicate.
#[derive(Clone)]
pub enum RuleSource {
    /// A qualified name read from a document.
    Symbol(String),
    /// A named predicate from live code.
    Named(NamedPredicate),
    /// A bare function pointer; needs a registered name.
    Pointer(Predicate),
}

impl std::fmt::Debug for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSource::Symbol(symbol) => f.debug_tuple("Symbol").field(symbol).finish(),
            RuleSource::Named(named) => f.debug_tuple("Named").field(named).finish(),
            RuleSource::Pointer(_) => f.write_str("Pointer(..)"),
        }
    }
}

impl From<&str> for RuleSource {
    fn from(value: &str) -> Self {
        RuleSource::Symbol(value.to_string())
    }
}

impl From<String> for RuleSource {
    fn from(value: String) -> Self {
        RuleSource::Symbol(value)
    }
}

impl From<NamedPredicate> for RuleSource {
    fn from(value: NamedPredicate) -> Self {
        RuleSource::Named(value)
    }
}

impl From<Predicate> for RuleSource {
    fn from(value: Predicate) -> Self {
        RuleSource::Pointer(value)
    }
}

/// A symbolic rule reference: always resolvable to a callable, always
/// serializable to its qualified name.
#[derive(Clone)]
pub struct Rule {
    name: QualifiedName,
    predicate: Predicate,
}

impl Rule {
    /// Build a rule from either form, resolving names against `registry`.
    pub fn new(
        source: impl Into<RuleSource>,
        registry: &RuleRegistry,
    ) -> Result<Self, CurriculumError> {
        match source.into() {
            RuleSource::Symbol(symbol) => registry.resolve(&symbol),
            RuleSource::Named(named) => Ok(Self::from_named(named)),
            RuleSource::Pointer(func) => Ok(Self {
                name: registry.name_of(func)?,
                predicate: func,
            }),
        }
    }

    /// Build from a named predicate. Always succeeds.
    #[must_use]
    pub fn from_named(named: NamedPredicate) -> Self {
        Self {
            name: named.qualified_name(),
            predicate: named.func,
        }
    }

    /// Resolve a qualified name against the process-wide registry.
    pub fn parse(symbol: &str) -> Result<Self, CurriculumError> {
        RuleRegistry::global().resolve(symbol)
    }

    /// The symbolic identity written to documents.
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// The resolved callable.
    pub fn callable(&self) -> Predicate {
        self.predicate
    }

    /// Invoke the predicate.
    pub fn evaluate(&self, metrics: &Metrics) -> bool {
        (self.predicate)(metrics)
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Rule {}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Rule").field(&self.name.as_str()).finish()
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name.as_str())
    }
}

// =============================================================================
// RULE REGISTRY
// =============================================================================

/// Append-only table of `module -> symbol -> predicate`.
#[derive(Default)]
pub struct RuleRegistry {
    modules: RwLock<BTreeMap<String, BTreeMap<String, Predicate>>>,
}

static GLOBAL_REGISTRY: OnceLock<RuleRegistry> = OnceLock::new();

impl RuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static RuleRegistry {
        GLOBAL_REGISTRY.get_or_init(RuleRegistry::new)
    }

    /// Register a predicate under its qualified name.
    ///
    /// Re-registering the same function is a no-op. Registering a different
    /// function under an existing name fails with `SymbolConflict`.
    pub fn register(&self, named: NamedPredicate) -> Result<QualifiedName, CurriculumError> {
        let name = named.qualified_name();
        let mut modules = self
            .modules
            .write()
            .map_err(|_| CurriculumError::RegistryPoisoned)?;

        let symbols = modules.entry(name.module().to_string()).or_default();
        if let Some(existing) = symbols.get(name.symbol()) {
            if std::ptr::fn_addr_eq(*existing, named.func) {
                return Ok(name);
            }
            return Err(CurriculumError::SymbolConflict(name.to_string()));
        }
        symbols.insert(name.symbol().to_string(), named.func);

        tracing::debug!("Registered rule {}", name);
        Ok(name)
    }

    /// Register several predicates, stopping at the first failure.
    pub fn register_all(
        &self,
        predicates: impl IntoIterator<Item = NamedPredicate>,
    ) -> Result<(), CurriculumError> {
        for named in predicates {
            self.register(named)?;
        }
        Ok(())
    }

    /// Resolve a qualified name to a rule.
    pub fn resolve(&self, symbol: &str) -> Result<Rule, CurriculumError> {
        let name = QualifiedName::parse(symbol)?;
        let modules = self
            .modules
            .read()
            .map_err(|_| CurriculumError::RegistryPoisoned)?;

        let symbols =
            modules
                .get(name.module())
                .ok_or_else(|| CurriculumError::SymbolResolution {
                    reference: symbol.to_string(),
                    part: SymbolPart::Module,
                })?;
        let predicate =
            symbols
                .get(name.symbol())
                .copied()
                .ok_or_else(|| CurriculumError::SymbolResolution {
                    reference: symbol.to_string(),
                    part: SymbolPart::Symbol,
                })?;

        Ok(Rule { name, predicate })
    }

    /// Find the registered name of a bare predicate.
    pub fn name_of(&self, func: Predicate) -> Result<QualifiedName, CurriculumError> {
        let modules = self
            .modules
            .read()
            .map_err(|_| CurriculumError::RegistryPoisoned)?;

        modules
            .iter()
            .flat_map(|(module, symbols)| {
                symbols
                    .iter()
                    .map(move |(symbol, registered)| (module, symbol, registered))
            })
            .find(|(_, _, registered)| std::ptr::fn_addr_eq(**registered, func))
            .map(|(module, symbol, _)| {
                QualifiedName(format!("{}{}{}", module, QUALIFIED_NAME_SEPARATOR, symbol))
            })
            .ok_or(CurriculumError::UnresolvableSymbol)
    }

    /// Whether `symbol` resolves in this registry.
    pub fn contains(&self, symbol: &str) -> bool {
        self.resolve(symbol).is_ok()
    }

    /// All registered qualified names, in sorted order.
    pub fn symbols(&self) -> Result<Vec<String>, CurriculumError> {
        let modules = self
            .modules
            .read()
            .map_err(|_| CurriculumError::RegistryPoisoned)?;

        Ok(modules
            .iter()
            .flat_map(|(module, symbols)| {
                symbols
                    .keys()
                    .map(move |symbol| format!("{}{}{}", module, QUALIFIED_NAME_SEPARATOR, symbol))
            })
            .collect())
    }

    /// Number of registered predicates.
    pub fn len(&self) -> Result<usize, CurriculumError> {
        let modules = self
            .modules
            .read()
            .map_err(|_| CurriculumError::RegistryPoisoned)?;
        Ok(modules.values().map(BTreeMap::len).sum())
    }

    pub fn is_empty(&self) -> Result<bool, CurriculumError> {
        Ok(self.len()? == 0)
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("RuleRegistry");
        match self.symbols() {
            Ok(symbols) => debug.field("symbols", &symbols),
            Err(_) => debug.field("symbols", &"<poisoned>"),
        };
        debug.finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
